//! Housing unit mix for feasibility studies.
//!
//! Splits a fixed unit count across typologies by percentage using the
//! largest-remainder (Hamilton) method, so allocations always add up to the
//! declared total.

use plan_core::{MixConfig, Percent, Typology};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons a mix cannot be allocated. No partial allocation is ever returned.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum MixError {
    /// Typology percentages must add up to 100.
    #[error("typology percentages add up to {total}%, expected 100%")]
    InvalidPercentTotal { total: Decimal },
    #[error("total unit count must be > 0")]
    NoUnits,
    #[error("at least one typology is required")]
    NoTypologies,
    /// Cost and sale price per m² must be > 0.
    #[error("cost and sale price per area must be > 0")]
    NonPositivePrice,
}

/// Units and per-unit economics of one typology.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypologyAllocation {
    pub label: String,
    pub percent_of_mix: Percent,
    pub unit_area: Decimal,
    pub unit_count: u32,
    pub unit_cost: Decimal,
    pub sale_price: Decimal,
    pub gross_profit: Decimal,
}

/// Aggregates over every allocated unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitMixTotals {
    pub total_units: u32,
    /// Total private area in m².
    pub total_area: Decimal,
    pub total_cost: Decimal,
    /// VGV: total potential sales value.
    pub total_vgv: Decimal,
    pub total_gross_profit: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMixPlan {
    /// One entry per typology, in input order.
    pub allocations: Vec<TypologyAllocation>,
    pub totals: UnitMixTotals,
}

/// Largest-remainder apportionment of `total_units` by `percents`.
///
/// Each share is floored, then the units lost to flooring go one by one to the
/// shares with the largest fractional remainder (earlier entries first on
/// ties). The result always sums to `total_units` for a non-empty input, even
/// when the percentages are only approximately 100.
///
/// Example:
/// let shares = apportion(7, &[Percent::parse("33.3"), Percent::parse("33.3"), Percent::parse("33.4")]);
/// assert_eq!(shares, vec![2, 2, 3]);
pub fn apportion(total_units: u32, percents: &[Percent]) -> Vec<u32> {
    if percents.is_empty() {
        return Vec::new();
    }
    let total = Decimal::from(total_units);
    let raw: Vec<Decimal> = percents.iter().map(|p| p.of(total)).collect();
    let mut counts: Vec<u64> = raw
        .iter()
        .map(|r| r.floor().to_u64().unwrap_or(0))
        .collect();
    let remainders: Vec<Decimal> = raw.iter().map(|r| *r - r.floor()).collect();

    // stable: equal remainders keep input order
    let mut order: Vec<usize> = (0..percents.len()).collect();
    order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));

    let assigned: u64 = counts.iter().sum();
    let target = u64::from(total_units);
    if assigned < target {
        for &i in order.iter().cycle().take((target - assigned) as usize) {
            counts[i] += 1;
        }
    } else {
        // percentages slightly above 100: take back from the smallest remainders
        let mut excess = assigned - target;
        while excess > 0 {
            let before = excess;
            for &i in order.iter().rev() {
                if excess == 0 {
                    break;
                }
                if counts[i] > 0 {
                    counts[i] -= 1;
                    excess -= 1;
                }
            }
            if excess == before {
                break;
            }
        }
    }

    counts
        .into_iter()
        .map(|c| u32::try_from(c).unwrap_or(total_units))
        .collect()
}

/// Sum of the typology percentages, as entered.
pub fn mix_percent_total(typologies: &[Typology]) -> Decimal {
    typologies.iter().map(|t| t.percent_of_mix.value()).sum()
}

/// Allocate `total_units` across `typologies` and price every unit.
pub fn allocate_unit_mix(
    total_units: u32,
    typologies: &[Typology],
    cost_per_area: Decimal,
    sale_price_per_area: Decimal,
    config: &MixConfig,
) -> Result<UnitMixPlan, MixError> {
    if total_units == 0 {
        return Err(MixError::NoUnits);
    }
    if typologies.is_empty() {
        return Err(MixError::NoTypologies);
    }
    if cost_per_area <= Decimal::ZERO || sale_price_per_area <= Decimal::ZERO {
        return Err(MixError::NonPositivePrice);
    }
    let total = mix_percent_total(typologies);
    if (total - Decimal::ONE_HUNDRED).abs() > config.tolerance {
        warn!(%total, "unit mix does not add up to 100%");
        return Err(MixError::InvalidPercentTotal { total });
    }

    let percents: Vec<Percent> = typologies.iter().map(|t| t.percent_of_mix).collect();
    let counts = apportion(total_units, &percents);

    let mut totals = UnitMixTotals {
        total_units,
        ..UnitMixTotals::default()
    };
    let allocations: Vec<TypologyAllocation> = typologies
        .iter()
        .zip(counts)
        .map(|(t, unit_count)| {
            let unit_cost = t.unit_area * cost_per_area;
            let sale_price = t.unit_area * sale_price_per_area;
            let gross_profit = sale_price - unit_cost;
            let n = Decimal::from(unit_count);
            totals.total_area += n * t.unit_area;
            totals.total_cost += n * unit_cost;
            totals.total_vgv += n * sale_price;
            totals.total_gross_profit += n * gross_profit;
            TypologyAllocation {
                label: t.label(),
                percent_of_mix: t.percent_of_mix,
                unit_area: t.unit_area,
                unit_count,
                unit_cost,
                sale_price,
                gross_profit,
            }
        })
        .collect();

    debug!(total_units, vgv = %totals.total_vgv, "unit mix allocated");
    Ok(UnitMixPlan {
        allocations,
        totals,
    })
}
