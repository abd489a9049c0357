//! Tax regime comparison for construction companies.
//!
//! Each regime is an independent pure function of [`TaxInputs`] and
//! [`TaxRates`]; [`compare_tax_regimes`] evaluates all four and picks the one
//! leaving the highest net profit.

use crate::markup::FinancialResult;
use plan_core::{PayrollChoice, SimplesTier, TaxRates};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The four regimes, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxRegime {
    SimplesNacional,
    LucroPresumido,
    LucroReal,
    /// Regime Especial de Tributação (real-estate development).
    Ret,
}

impl TaxRegime {
    pub const ALL: [TaxRegime; 4] = [
        TaxRegime::SimplesNacional,
        TaxRegime::LucroPresumido,
        TaxRegime::LucroReal,
        TaxRegime::Ret,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaxRegime::SimplesNacional => "Simples Nacional",
            TaxRegime::LucroPresumido => "Lucro Presumido",
            TaxRegime::LucroReal => "Lucro Real",
            TaxRegime::Ret => "RET (Incorporação)",
        }
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Figures a regime is computed from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxInputs {
    /// Sale price of the project.
    pub gross_revenue: Decimal,
    pub direct_cost: Decimal,
    pub indirect_costs_value: Decimal,
    /// Payroll base for the employer levy.
    pub labor_cost: Decimal,
    pub payroll: PayrollChoice,
}

impl TaxInputs {
    /// Revenue, direct and indirect costs taken from a priced project.
    pub fn from_financials(
        financials: &FinancialResult,
        labor_cost: Decimal,
        payroll: PayrollChoice,
    ) -> Self {
        Self {
            gross_revenue: financials.final_price,
            direct_cost: financials.direct_cost,
            indirect_costs_value: financials.indirect_costs_value,
            labor_cost,
            payroll,
        }
    }

    /// Revenue minus direct and indirect costs, before tax.
    pub fn operating_profit(&self) -> Decimal {
        self.gross_revenue - self.direct_cost - self.indirect_costs_value
    }
}

/// One itemized levy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    pub label: String,
    pub amount: Decimal,
}

impl TaxLine {
    fn new(label: &str, amount: Decimal) -> Self {
        Self {
            label: label.to_string(),
            amount,
        }
    }
}

/// Tax burden and resulting profit under one regime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxRegimeResult {
    pub regime: TaxRegime,
    /// Sum of `lines`.
    pub total_tax: Decimal,
    /// Operating profit minus `total_tax`.
    pub net_profit: Decimal,
    pub lines: Vec<TaxLine>,
}

impl TaxRegimeResult {
    fn from_lines(regime: TaxRegime, inputs: &TaxInputs, lines: Vec<TaxLine>) -> Self {
        let total_tax: Decimal = lines.iter().map(|l| l.amount).sum();
        Self {
            regime,
            total_tax,
            net_profit: inputs.operating_profit() - total_tax,
            lines,
        }
    }
}

/// All four regimes side by side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxComparison {
    pub simples: TaxRegimeResult,
    pub presumido: TaxRegimeResult,
    pub real: TaxRegimeResult,
    pub ret: TaxRegimeResult,
    /// Regime with the highest net profit; ties go to the earlier regime.
    pub best: TaxRegime,
}

impl TaxComparison {
    /// Results in evaluation order.
    pub fn regimes(&self) -> [&TaxRegimeResult; 4] {
        [&self.simples, &self.presumido, &self.real, &self.ret]
    }

    pub fn get(&self, regime: TaxRegime) -> &TaxRegimeResult {
        match regime {
            TaxRegime::SimplesNacional => &self.simples,
            TaxRegime::LucroPresumido => &self.presumido,
            TaxRegime::LucroReal => &self.real,
            TaxRegime::Ret => &self.ret,
        }
    }

    pub fn best_option(&self) -> &TaxRegimeResult {
        self.get(self.best)
    }
}

/// Annual revenue used to pick a Simples bracket.
///
/// Approximation: twice the project revenue, capped at the top ceiling; revenue
/// already above the ceiling is used as is. A trailing-12-month figure would be
/// the legal base but is not available here.
pub fn simples_annualized_revenue(gross_revenue: Decimal, tiers: &[SimplesTier]) -> Decimal {
    let Some(top) = tiers.last().map(|t| t.ceiling) else {
        return gross_revenue;
    };
    if gross_revenue > top {
        gross_revenue
    } else {
        (gross_revenue * Decimal::from(2)).min(top)
    }
}

/// Effective Simples rate: `(annual × rate − deduction) / annual`.
pub fn simples_effective_rate(gross_revenue: Decimal, tiers: &[SimplesTier]) -> Decimal {
    let annual = simples_annualized_revenue(gross_revenue, tiers);
    let tier = tiers
        .iter()
        .find(|t| annual <= t.ceiling)
        .or_else(|| tiers.last());
    match tier {
        Some(t) if annual > Decimal::ZERO => annual
            .checked_mul(t.rate.fraction())
            .and_then(|gross| gross.checked_sub(t.deduction))
            .and_then(|net| net.checked_div(annual))
            .unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

fn payroll_line(inputs: &TaxInputs, rates: &TaxRates) -> TaxLine {
    let amount = match inputs.payroll {
        PayrollChoice::PayrollInss => rates.employer_payroll_levy.of(inputs.labor_cost),
        PayrollChoice::RevenueCprb => rates.cprb_revenue_levy.of(inputs.gross_revenue),
    };
    TaxLine::new("INSS/CPRB", amount)
}

/// Simples Nacional (Anexo IV): DAS at the effective bracket rate, employer
/// INSS on payroll paid separately regardless of the payroll choice.
pub fn simples_nacional(inputs: &TaxInputs, rates: &TaxRates) -> TaxRegimeResult {
    let rate = simples_effective_rate(inputs.gross_revenue, &rates.simples_tiers);
    let lines = vec![
        TaxLine::new("DAS", inputs.gross_revenue * rate),
        TaxLine::new(
            "INSS Patronal",
            rates.employer_payroll_levy.of(inputs.labor_cost),
        ),
    ];
    TaxRegimeResult::from_lines(TaxRegime::SimplesNacional, inputs, lines)
}

/// Lucro Presumido: IRPJ and CSLL on presumed profit bases, cumulative
/// PIS/COFINS, ISS and the payroll levy.
pub fn lucro_presumido(inputs: &TaxInputs, rates: &TaxRates) -> TaxRegimeResult {
    let revenue = inputs.gross_revenue;
    let lines = vec![
        TaxLine::new("IRPJ", rates.irpj_rate.of(rates.presumed_irpj_base.of(revenue))),
        TaxLine::new("CSLL", rates.csll_rate.of(rates.presumed_csll_base.of(revenue))),
        TaxLine::new("PIS/COFINS", rates.presumed_pis_cofins.of(revenue)),
        TaxLine::new("ISS", rates.iss_rate.of(revenue)),
        payroll_line(inputs, rates),
    ];
    TaxRegimeResult::from_lines(TaxRegime::LucroPresumido, inputs, lines)
}

/// Lucro Real: IRPJ and CSLL on actual profit (none on a loss), PIS/COFINS
/// without credit netting, ISS and the payroll levy.
pub fn lucro_real(inputs: &TaxInputs, rates: &TaxRates) -> TaxRegimeResult {
    let revenue = inputs.gross_revenue;
    let profit = inputs.operating_profit().max(Decimal::ZERO);
    let lines = vec![
        TaxLine::new("IRPJ", rates.irpj_rate.of(profit)),
        TaxLine::new("CSLL", rates.csll_rate.of(profit)),
        TaxLine::new("PIS/COFINS", rates.real_pis_cofins.of(revenue)),
        TaxLine::new("ISS", rates.iss_rate.of(revenue)),
        payroll_line(inputs, rates),
    ];
    TaxRegimeResult::from_lines(TaxRegime::LucroReal, inputs, lines)
}

/// RET: one unified federal rate; ISS and the payroll levy stay outside it.
pub fn ret(inputs: &TaxInputs, rates: &TaxRates) -> TaxRegimeResult {
    let revenue = inputs.gross_revenue;
    let lines = vec![
        TaxLine::new("RET (Unificado)", rates.ret_unified_rate.of(revenue)),
        TaxLine::new("ISS", rates.iss_rate.of(revenue)),
        payroll_line(inputs, rates),
    ];
    TaxRegimeResult::from_lines(TaxRegime::Ret, inputs, lines)
}

/// Evaluate every regime and select the most profitable.
pub fn compare_tax_regimes(inputs: &TaxInputs, rates: &TaxRates) -> TaxComparison {
    let simples = simples_nacional(inputs, rates);
    let presumido = lucro_presumido(inputs, rates);
    let real = lucro_real(inputs, rates);
    let ret = ret(inputs, rates);

    let mut best = &simples;
    for candidate in [&presumido, &real, &ret] {
        if candidate.net_profit > best.net_profit {
            best = candidate;
        }
    }
    let best = best.regime;
    debug!(%best, revenue = %inputs.gross_revenue, "tax regimes compared");

    TaxComparison {
        simples,
        presumido,
        real,
        ret,
        best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(revenue: i64, direct: i64, indirect: i64, labor: i64) -> TaxInputs {
        TaxInputs {
            gross_revenue: Decimal::from(revenue),
            direct_cost: Decimal::from(direct),
            indirect_costs_value: Decimal::from(indirect),
            labor_cost: Decimal::from(labor),
            payroll: PayrollChoice::PayrollInss,
        }
    }

    #[test]
    fn simples_annualization() {
        let tiers = TaxRates::default().simples_tiers;
        assert_eq!(
            simples_annualized_revenue(Decimal::from(100_000), &tiers),
            Decimal::from(200_000)
        );
        assert_eq!(
            simples_annualized_revenue(Decimal::from(3_000_000), &tiers),
            Decimal::from(4_800_000)
        );
        assert_eq!(
            simples_annualized_revenue(Decimal::from(6_000_000), &tiers),
            Decimal::from(6_000_000)
        );
    }

    #[test]
    fn simples_effective_rate_by_bracket() {
        let tiers = TaxRates::default().simples_tiers;
        // 80k annualizes to 160k: first bracket, flat 4.5%
        assert_eq!(
            simples_effective_rate(Decimal::from(80_000), &tiers),
            Decimal::new(45, 3)
        );
        // 150k annualizes to 300k: (300k × 9% − 8 100) / 300k = 6.3%
        assert_eq!(
            simples_effective_rate(Decimal::from(150_000), &tiers),
            Decimal::new(63, 3)
        );
        assert_eq!(simples_effective_rate(Decimal::ZERO, &tiers), Decimal::ZERO);
        assert_eq!(simples_effective_rate(Decimal::from(1000), &[]), Decimal::ZERO);
    }

    #[test]
    fn simples_above_top_ceiling_uses_last_bracket() {
        let tiers = TaxRates::default().simples_tiers;
        let revenue = Decimal::from(6_000_000);
        let expected = (revenue * Decimal::new(33, 2) - Decimal::from(828_000)) / revenue;
        assert_eq!(simples_effective_rate(revenue, &tiers), expected);
    }

    #[test]
    fn simples_rate_with_unrepresentable_bracket_is_zero() {
        let tiers = vec![SimplesTier {
            ceiling: Decimal::from(1_000),
            rate: plan_core::Percent::ZERO,
            deduction: Decimal::MAX,
        }];
        assert_eq!(
            simples_effective_rate(Decimal::new(1, 28), &tiers),
            Decimal::ZERO
        );
    }

    #[test]
    fn presumido_lines() {
        let r = lucro_presumido(&inputs(1_000_000, 600_000, 50_000, 200_000), &TaxRates::default());
        let amounts: Vec<Decimal> = r.lines.iter().map(|l| l.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Decimal::from(12_000),
                Decimal::from(10_800),
                Decimal::from(36_500),
                Decimal::from(50_000),
                Decimal::from(40_000),
            ]
        );
        assert_eq!(r.total_tax, Decimal::from(149_300));
        assert_eq!(r.net_profit, Decimal::from(200_700));
    }

    #[test]
    fn real_has_no_profit_levies_on_a_loss() {
        let rates = TaxRates::default();
        let r = lucro_real(&inputs(500_000, 480_000, 40_000, 100_000), &rates);
        assert_eq!(r.lines[0].amount, Decimal::ZERO);
        assert_eq!(r.lines[1].amount, Decimal::ZERO);
        assert_eq!(r.lines[2].amount, Decimal::new(4_625_000, 2));
    }

    #[test]
    fn payroll_choice_switches_base() {
        let rates = TaxRates::default();
        let mut i = inputs(1_000_000, 600_000, 50_000, 200_000);
        let inss = ret(&i, &rates);
        i.payroll = PayrollChoice::RevenueCprb;
        let cprb = ret(&i, &rates);
        assert_eq!(inss.lines[2].amount, Decimal::from(40_000));
        assert_eq!(cprb.lines[2].amount, Decimal::from(45_000));
        // Simples pays employer INSS whatever the choice
        assert_eq!(
            simples_nacional(&i, &rates).lines[1].amount,
            Decimal::from(40_000)
        );
    }

    #[test]
    fn ret_wins_for_a_typical_development() {
        let c = compare_tax_regimes(&inputs(1_000_000, 600_000, 50_000, 200_000), &TaxRates::default());
        assert_eq!(c.ret.total_tax, Decimal::from(130_000));
        assert_eq!(c.best, TaxRegime::Ret);
        assert_eq!(c.best_option().net_profit, Decimal::from(220_000));
        for r in c.regimes() {
            assert!(c.best_option().net_profit >= r.net_profit);
        }
    }

    #[test]
    fn ties_go_to_evaluation_order() {
        let zero = TaxRates {
            simples_tiers: vec![],
            employer_payroll_levy: plan_core::Percent::ZERO,
            cprb_revenue_levy: plan_core::Percent::ZERO,
            presumed_irpj_base: plan_core::Percent::ZERO,
            presumed_csll_base: plan_core::Percent::ZERO,
            irpj_rate: plan_core::Percent::ZERO,
            csll_rate: plan_core::Percent::ZERO,
            presumed_pis_cofins: plan_core::Percent::ZERO,
            real_pis_cofins: plan_core::Percent::ZERO,
            iss_rate: plan_core::Percent::ZERO,
            ret_unified_rate: plan_core::Percent::ZERO,
        };
        let c = compare_tax_regimes(&inputs(1_000, 500, 100, 200), &zero);
        assert_eq!(c.best, TaxRegime::SimplesNacional);
    }

    #[test]
    fn from_financials_uses_price_as_revenue() {
        let f = FinancialResult {
            direct_cost: Decimal::from(100),
            final_price: Decimal::from(160),
            indirect_costs_value: Decimal::from(5),
            ..FinancialResult::default()
        };
        let i = TaxInputs::from_financials(&f, Decimal::from(30), PayrollChoice::RevenueCprb);
        assert_eq!(i.gross_revenue, Decimal::from(160));
        assert_eq!(i.operating_profit(), Decimal::from(55));
    }

    proptest! {
        #[test]
        fn lines_sum_to_total(revenue in 0i64..50_000_000, direct in 0i64..50_000_000, labor in 0i64..10_000_000, cprb in any::<bool>()) {
            let mut i = inputs(revenue, direct, direct / 20, labor);
            if cprb { i.payroll = PayrollChoice::RevenueCprb; }
            let c = compare_tax_regimes(&i, &TaxRates::default());
            for r in c.regimes() {
                let sum: Decimal = r.lines.iter().map(|l| l.amount).sum();
                prop_assert_eq!(sum, r.total_tax);
                prop_assert_eq!(r.net_profit, i.operating_profit() - r.total_tax);
            }
            prop_assert_eq!(c.clone(), compare_tax_regimes(&i, &TaxRates::default()));
        }

        #[test]
        fn real_profit_never_grows_with_direct_cost(
            revenue in 1i64..20_000_000,
            direct in 0i64..20_000_000,
            step in 1i64..1_000_000,
            labor in 0i64..5_000_000,
        ) {
            let rates = TaxRates::default();
            let low = lucro_real(&inputs(revenue, direct, 0, labor), &rates);
            let high = lucro_real(&inputs(revenue, direct + step, 0, labor), &rates);
            prop_assert!(high.net_profit <= low.net_profit);
        }
    }
}
