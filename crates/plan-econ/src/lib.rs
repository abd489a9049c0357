#![deny(warnings)]

//! Financial and tax modeling for construction projects.
//!
//! This crate provides pure, deterministic engines for:
//! - BDI markup: sale price from direct cost and cost ratios
//! - Tax regime comparison (Simples Nacional, Lucro Presumido, Lucro Real, RET)
//! - Unit mix allocation by largest remainder for feasibility studies
//! - Daily cumulative cost/progress curves over the project timeline
//!
//! None of them keep state between calls; degenerate inputs resolve to
//! inspectable sentinel values instead of panics.

pub mod markup;
pub mod progress;
pub mod tax;
pub mod unit_mix;

pub use markup::{compute_markup, compute_markup_with, FinancialResult};
pub use progress::{project_cost_progress, CostProgressPoint};
pub use tax::{compare_tax_regimes, TaxComparison, TaxInputs, TaxLine, TaxRegime, TaxRegimeResult};
pub use unit_mix::{allocate_unit_mix, apportion, MixError, TypologyAllocation, UnitMixPlan, UnitMixTotals};

use plan_core::{direct_cost, project_duration_days, FeasibilityStudy, Scenario};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Everything derived from a scenario in one recomputation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub direct_cost: Decimal,
    pub duration_days: i64,
    pub financials: FinancialResult,
    pub taxes: TaxComparison,
    pub progress: Vec<CostProgressPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feasibility: Option<Result<UnitMixPlan, MixError>>,
}

/// Run a feasibility study through the unit mix allocator.
pub fn run_feasibility(study: &FeasibilityStudy) -> Result<UnitMixPlan, MixError> {
    allocate_unit_mix(
        study.total_units,
        &study.typologies,
        study.cost_per_area,
        study.sale_price_per_area,
        &study.mix,
    )
}

/// Direct cost → markup → tax comparison → progress curve (→ unit mix).
///
/// Labor cost for the payroll levy comes from the budget snapshot; the
/// progress curve is normalized by the budget total.
pub fn analyze_project(scenario: &Scenario) -> ProjectAnalysis {
    let direct_cost = direct_cost(&scenario.tasks);
    let financials = compute_markup_with(direct_cost, &scenario.pricing);
    let tax_inputs = TaxInputs::from_financials(&financials, scenario.budget.labor, scenario.payroll);
    let taxes = compare_tax_regimes(&tax_inputs, &scenario.tax_rates);
    let progress = project_cost_progress(
        &scenario.tasks,
        scenario.project_start_date,
        scenario.project_end_date,
        scenario.budget.total,
    );
    let feasibility = scenario.feasibility.as_ref().map(run_feasibility);
    info!(
        project = %scenario.name,
        %direct_cost,
        price = %financials.final_price,
        best = %taxes.best,
        "project analyzed"
    );
    ProjectAnalysis {
        direct_cost,
        duration_days: project_duration_days(scenario.project_start_date, scenario.project_end_date),
        financials,
        taxes,
        progress,
        feasibility,
    }
}
