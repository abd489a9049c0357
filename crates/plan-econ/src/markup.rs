//! BDI markup (Benefícios e Despesas Indiretas).
//!
//! Finds the sale price that, after paying indirect costs, revenue taxes and
//! the net profit target, leaves exactly the direct cost:
//! `price = direct × (1 + I) / (1 − (T + P))`.

use plan_core::{CostRatioSet, Percent, PricingConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pricing outcome for one direct cost. Every field is derived from the inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialResult {
    pub direct_cost: Decimal,
    pub final_price: Decimal,
    /// Markup over direct cost as a fraction (0.5609 for 56.09%).
    pub bdi_rate: Decimal,
    /// `final_price − direct_cost`.
    pub gross_margin: Decimal,
    /// `direct_cost × I`.
    pub indirect_costs_value: Decimal,
    /// `gross_margin − indirect_costs_value`.
    pub ebitda: Decimal,
    /// `final_price × T`.
    pub taxes_on_revenue: Decimal,
    /// `final_price × P`.
    pub net_profit: Decimal,
    /// Net profit over direct cost, in percent.
    pub roi: Decimal,
}

impl FinancialResult {
    /// Zeroed result carrying only the direct cost.
    fn unpriced(direct_cost: Decimal) -> Self {
        Self {
            direct_cost,
            ..Self::default()
        }
    }

    /// True when there is a cost to price but the ratios leave no room for it.
    pub fn is_infeasible(&self) -> bool {
        self.final_price.is_zero() && self.direct_cost > Decimal::ZERO
    }

    /// BDI as displayed to users (56.09 for a 0.5609 rate).
    pub fn bdi_percent(&self) -> Decimal {
        self.bdi_rate * Decimal::ONE_HUNDRED
    }
}

/// Price `direct_cost` under the given ratio sets and net profit margin.
///
/// Returns a zeroed result when `direct_cost <= 0` or when taxes plus margin
/// consume all revenue (`T + P >= 1`), as well as when the price would not fit
/// in a `Decimal`; see [`FinancialResult::is_infeasible`].
///
/// Example:
/// let r = compute_markup(Decimal::from(1000), &CostRatioSet::new(), &CostRatioSet::new(), Percent::parse("20"));
/// assert_eq!(r.final_price, Decimal::from(1250));
pub fn compute_markup(
    direct_cost: Decimal,
    indirect_ratios: &CostRatioSet,
    tax_ratios: &CostRatioSet,
    net_profit_margin: Percent,
) -> FinancialResult {
    let indirect = indirect_ratios.total_fraction();
    let taxes = tax_ratios.total_fraction();
    let profit = net_profit_margin.fraction();
    let denominator = Decimal::ONE - (taxes + profit);

    if direct_cost <= Decimal::ZERO {
        debug!(%direct_cost, "nothing to price");
        return FinancialResult::unpriced(direct_cost);
    }
    if denominator <= Decimal::ZERO {
        warn!(%taxes, %profit, "taxes and profit target consume all revenue; cannot price");
        return FinancialResult::unpriced(direct_cost);
    }

    let Some(result) = price(direct_cost, indirect, taxes, profit, denominator) else {
        warn!(%direct_cost, %denominator, "price exceeds the representable range; cannot price");
        return FinancialResult::unpriced(direct_cost);
    };
    let (final_price, bdi_rate) = (result.final_price, result.bdi_rate);
    debug!(%direct_cost, %final_price, %bdi_rate, "priced");
    result
}

/// Markup arithmetic for a feasible configuration; `None` on overflow.
fn price(
    direct_cost: Decimal,
    indirect: Decimal,
    taxes: Decimal,
    profit: Decimal,
    denominator: Decimal,
) -> Option<FinancialResult> {
    let bdi_rate = (Decimal::ONE + indirect).checked_div(denominator)? - Decimal::ONE;
    let final_price = direct_cost.checked_mul(Decimal::ONE + bdi_rate)?;
    let gross_margin = final_price - direct_cost;
    let indirect_costs_value = direct_cost.checked_mul(indirect)?;
    let net_profit = final_price.checked_mul(profit)?;
    let roi = net_profit
        .checked_div(direct_cost)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(FinancialResult {
        direct_cost,
        final_price,
        bdi_rate,
        gross_margin,
        indirect_costs_value,
        ebitda: gross_margin.checked_sub(indirect_costs_value)?,
        taxes_on_revenue: final_price.checked_mul(taxes)?,
        net_profit,
        roi,
    })
}

/// [`compute_markup`] with ratios and margin taken from a config.
pub fn compute_markup_with(direct_cost: Decimal, config: &PricingConfig) -> FinancialResult {
    compute_markup(
        direct_cost,
        &config.indirect_ratios,
        &config.tax_ratios,
        config.net_profit_margin,
    )
}
