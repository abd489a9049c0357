#![deny(warnings)]

//! Core domain values for construction project planning.
//!
//! This crate defines the serializable schedule, budget and percentage types
//! consumed by the financial engines, together with configuration structs
//! carrying documented defaults. Parsing at the boundary is lenient: text that
//! does not hold a number is read as zero and an unreadable date as missing,
//! so a half-edited form never fails to load.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Percentages must lie within [0, 100].
    #[error("percentage {0} is outside [0, 100]")]
    PercentOutOfRange(Decimal),
    /// Price or cost must be non-negative.
    #[error("negative monetary value in {0}")]
    NegativeMoney(String),
    /// Names and ids must not be blank.
    #[error("blank {0}")]
    Blank(&'static str),
    /// Task ids must be unique within a schedule.
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),
    /// A task ends before it starts.
    #[error("task {0} ends before it starts")]
    InvertedDates(String),
    /// Text that does not hold a number.
    #[error("not a number: {0:?}")]
    Unparsable(String),
}

/// Parse a human-entered number.
///
/// Accepts surrounding whitespace, a comma as decimal separator and
/// scientific notation. Returns `None` for anything else.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    Decimal::from_str(t)
        .ok()
        .or_else(|| Decimal::from_str(&t.replace(',', ".")).ok())
        .or_else(|| Decimal::from_scientific(t).ok())
}

/// Parse an ISO `YYYY-MM-DD` date, tolerating a trailing time part.
pub fn parse_plan_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    NaiveDate::from_str(t)
        .ok()
        .or_else(|| t.get(..10).and_then(|d| NaiveDate::from_str(d).ok()))
}

/// A human-entered percentage in [0, 100], e.g. `4.5` meaning 4.5%.
///
/// The stored value is the percentage itself; [`Percent::fraction`] is the
/// single place where it is divided by 100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);
    pub const HUNDRED: Percent = Percent(Decimal::ONE_HUNDRED);

    /// Strict constructor: rejects values outside [0, 100].
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValidationError::PercentOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Lenient constructor for form input. Unparsable or out-of-range text is 0%.
    pub fn parse(text: &str) -> Self {
        parse_decimal(text).map_or(Self::ZERO, Self::or_zero)
    }

    fn or_zero(value: Decimal) -> Self {
        Self::new(value).unwrap_or_else(|_| {
            warn!(%value, "percentage outside [0, 100] treated as 0");
            Self::ZERO
        })
    }

    /// Built-in rate tables; values are known to be in range.
    fn scaled(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    /// The percentage as entered (4.5 for 4.5%).
    pub fn value(self) -> Decimal {
        self.0
    }

    /// The percentage as a fraction (0.045 for 4.5%).
    pub fn fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    /// `amount × self`.
    pub fn of(self, amount: Decimal) -> Decimal {
        amount * self.fraction()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_decimal(s).ok_or_else(|| ValidationError::Unparsable(s.to_string()))?;
        Self::new(value)
    }
}

/// Any scalar a form might hand us for a numeric field.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(Decimal),
    Text(String),
    Other(IgnoredAny),
}

impl LenientNumber {
    fn into_decimal(self) -> Option<Decimal> {
        match self {
            LenientNumber::Number(v) => Some(v),
            LenientNumber::Text(s) => parse_decimal(&s),
            LenientNumber::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LenientText {
    Text(String),
    Integer(i64),
    Float(f64),
    Other(IgnoredAny),
}

impl LenientText {
    fn into_text(self) -> Option<String> {
        match self {
            LenientText::Text(s) => Some(s),
            LenientText::Integer(i) => Some(i.to_string()),
            LenientText::Float(f) => Some(f.to_string()),
            LenientText::Other(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(LenientNumber::deserialize(deserializer)?
            .into_decimal()
            .map_or(Percent::ZERO, Percent::or_zero))
    }
}

/// Deserialize a monetary or area field; unparsable input is zero.
pub fn lenient_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    Ok(LenientNumber::deserialize(deserializer)?
        .into_decimal()
        .unwrap_or(Decimal::ZERO))
}

/// Deserialize an optional ISO date; unparsable input is `None`.
pub fn lenient_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<LenientText> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(LenientText::into_text)
        .and_then(|s| parse_plan_date(&s)))
}

/// Deserialize an identifier given as text or number.
pub fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(LenientText::deserialize(deserializer)?
        .into_text()
        .unwrap_or_default())
}

/// A named set of cost ratios, each a percentage of revenue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostRatioSet(BTreeMap<String, Percent>);

impl CostRatioSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from form-style `(name, text)` pairs, parsing each leniently.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .map(|(name, text)| (name.to_string(), Percent::parse(text)))
            .collect()
    }

    /// Insert or replace a ratio, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, ratio: Percent) -> Option<Percent> {
        self.0.insert(name.into(), ratio)
    }

    pub fn get(&self, name: &str) -> Option<Percent> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Percent)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all ratios as a fraction (2% + 1% -> 0.03).
    pub fn total_fraction(&self) -> Decimal {
        self.0.values().map(|p| p.fraction()).sum()
    }
}

impl FromIterator<(String, Percent)> for CostRatioSet {
    fn from_iter<T: IntoIterator<Item = (String, Percent)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Execution state of a scheduled task.
///
/// The Portuguese labels used by the planning front-end are accepted on input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "Não Iniciado", alias = "A Fazer")]
    NotStarted,
    #[serde(alias = "Em Andamento")]
    InProgress,
    #[serde(alias = "Concluído")]
    Done,
}

/// One line of the construction schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier, unique within a schedule.
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    /// Construction phase label, e.g. "Fundação".
    #[serde(default)]
    pub phase: String,
    /// Task name.
    pub name: String,
    /// Planned start; `None` when missing or unparsable.
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    /// Planned end; `None` when missing or unparsable.
    #[serde(default, deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,
    /// Material cost (>= 0).
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub cost_materials: Decimal,
    /// Labor cost (>= 0).
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub cost_labor: Decimal,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Materials plus labor.
    pub fn total_cost(&self) -> Decimal {
        self.cost_materials + self.cost_labor
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

/// Budget snapshot from the planning report. Not cross-checked by the engines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub materials: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub labor: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub manager_fee: Decimal,
}

impl Budget {
    /// materials + labor + manager fee; normally close to `total`.
    pub fn components_total(&self) -> Decimal {
        self.materials + self.labor + self.manager_fee
    }
}

/// A unit type in a real-estate product mix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typology {
    /// Optional display label; defaults to the unit area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Share of the total unit count.
    pub percent_of_mix: Percent,
    /// Private area of one unit in m².
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub unit_area: Decimal,
}

impl Typology {
    pub fn new(percent_of_mix: Percent, unit_area: Decimal) -> Self {
        Self {
            name: None,
            percent_of_mix,
            unit_area,
        }
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Apto {}m²", self.unit_area.normalize()),
        }
    }
}

/// How employer payroll contributions are levied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayrollChoice {
    /// 20% of payroll (INSS).
    #[default]
    #[serde(alias = "inss", alias = "INSS")]
    PayrollInss,
    /// 4.5% of gross revenue (CPRB, payroll exemption).
    #[serde(alias = "cprb", alias = "CPRB")]
    RevenueCprb,
}

impl FromStr for PayrollChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inss" | "payroll" => Ok(PayrollChoice::PayrollInss),
            "cprb" | "revenue" => Ok(PayrollChoice::RevenueCprb),
            other => Err(format!("unknown payroll choice: {other}")),
        }
    }
}

/// Ratio sets and target margin used to price a project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PricingConfig {
    /// Indirect costs as a share of direct cost.
    pub indirect_ratios: CostRatioSet,
    /// Taxes built into the price as a share of revenue.
    pub tax_ratios: CostRatioSet,
    /// Net profit target as a share of revenue.
    pub net_profit_margin: Percent,
}

impl Default for PricingConfig {
    /// Administration 2%, insurance 1%, guarantee 0.5%, risk 1.5%;
    /// IRPJ 1.2%, CSLL 1.08%, PIS 0.65%, COFINS 3%, ISS 5%, INSS 4.5%;
    /// net margin 22%.
    fn default() -> Self {
        Self {
            indirect_ratios: CostRatioSet::from_pairs([
                ("admin", "2"),
                ("insurance", "1"),
                ("guarantee", "0.5"),
                ("risk", "1.5"),
            ]),
            tax_ratios: CostRatioSet::from_pairs([
                ("irpj", "1.2"),
                ("csll", "1.08"),
                ("pis", "0.65"),
                ("cofins", "3"),
                ("iss", "5"),
                ("inss", "4.5"),
            ]),
            net_profit_margin: Percent::scaled(22, 0),
        }
    }
}

/// One bracket of the Simples Nacional table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimplesTier {
    /// Upper bound of annual revenue for this bracket.
    pub ceiling: Decimal,
    /// Nominal rate.
    pub rate: Percent,
    /// Amount subtracted from `annual × rate`.
    pub deduction: Decimal,
}

/// Rates of the four tax regimes compared by the simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaxRates {
    /// Ascending brackets; the last one is also the annualization cap.
    pub simples_tiers: Vec<SimplesTier>,
    /// Employer INSS on payroll.
    pub employer_payroll_levy: Percent,
    /// CPRB on gross revenue.
    pub cprb_revenue_levy: Percent,
    /// Presumed profit base for IRPJ.
    pub presumed_irpj_base: Percent,
    /// Presumed profit base for CSLL.
    pub presumed_csll_base: Percent,
    pub irpj_rate: Percent,
    pub csll_rate: Percent,
    /// PIS/COFINS, cumulative (Lucro Presumido).
    pub presumed_pis_cofins: Percent,
    /// PIS/COFINS, non-cumulative without credits (Lucro Real).
    pub real_pis_cofins: Percent,
    /// Municipal service tax.
    pub iss_rate: Percent,
    /// RET unified federal rate.
    pub ret_unified_rate: Percent,
}

impl Default for TaxRates {
    fn default() -> Self {
        let tier = |ceiling: i64, rate: Percent, deduction: i64| SimplesTier {
            ceiling: Decimal::from(ceiling),
            rate,
            deduction: Decimal::from(deduction),
        };
        Self {
            simples_tiers: vec![
                tier(180_000, Percent::scaled(45, 1), 0),
                tier(360_000, Percent::scaled(9, 0), 8_100),
                tier(720_000, Percent::scaled(102, 1), 12_420),
                tier(1_800_000, Percent::scaled(14, 0), 39_780),
                tier(3_600_000, Percent::scaled(22, 0), 183_780),
                tier(4_800_000, Percent::scaled(33, 0), 828_000),
            ],
            employer_payroll_levy: Percent::scaled(20, 0),
            cprb_revenue_levy: Percent::scaled(45, 1),
            presumed_irpj_base: Percent::scaled(8, 0),
            presumed_csll_base: Percent::scaled(12, 0),
            irpj_rate: Percent::scaled(15, 0),
            csll_rate: Percent::scaled(9, 0),
            presumed_pis_cofins: Percent::scaled(365, 2),
            real_pis_cofins: Percent::scaled(925, 2),
            iss_rate: Percent::scaled(5, 0),
            ret_unified_rate: Percent::scaled(4, 0),
        }
    }
}

/// Unit-mix allocation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Accepted distance, in percentage points, between the mix total and 100.
    pub tolerance: Decimal,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 3),
        }
    }
}

/// Inputs of a real-estate feasibility study.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityStudy {
    pub total_units: u32,
    pub typologies: Vec<Typology>,
    #[serde(deserialize_with = "lenient_decimal")]
    pub cost_per_area: Decimal,
    #[serde(deserialize_with = "lenient_decimal")]
    pub sale_price_per_area: Decimal,
    #[serde(default)]
    pub mix: MixConfig,
}

/// A complete project as loaded from a scenario file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub project_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub project_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub tax_rates: TaxRates,
    #[serde(default)]
    pub payroll: PayrollChoice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feasibility: Option<FeasibilityStudy>,
}

/// Direct construction cost: materials plus labor over every task.
pub fn direct_cost(tasks: &[Task]) -> Decimal {
    tasks.iter().map(Task::total_cost).sum()
}

/// Whole days from `start` to `end`; 0 when either is missing or `end < start`.
pub fn project_duration_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    match (start, end) {
        (Some(s), Some(e)) if e >= s => (e - s).num_days(),
        _ => 0,
    }
}

/// `start + days`, or `None` past the calendar range.
pub fn offset_date(start: NaiveDate, days: u64) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(days))
}

/// Validate one task.
pub fn validate_task(task: &Task) -> Result<(), ValidationError> {
    if task.id.trim().is_empty() {
        return Err(ValidationError::Blank("task id"));
    }
    if task.name.trim().is_empty() {
        return Err(ValidationError::Blank("task name"));
    }
    if task.cost_materials < Decimal::ZERO || task.cost_labor < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney(task.id.clone()));
    }
    if let (Some(s), Some(e)) = (task.start_date, task.end_date) {
        if e < s {
            return Err(ValidationError::InvertedDates(task.id.clone()));
        }
    }
    Ok(())
}

/// Validate a scenario, including unique task ids.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    let mut ids: BTreeSet<&str> = BTreeSet::new();
    for task in &scenario.tasks {
        validate_task(task)?;
        if !ids.insert(task.id.as_str()) {
            return Err(ValidationError::DuplicateTaskId(task.id.clone()));
        }
    }
    let b = &scenario.budget;
    if [b.total, b.materials, b.labor, b.manager_fee]
        .iter()
        .any(|v| *v < Decimal::ZERO)
    {
        return Err(ValidationError::NegativeMoney("budget".to_string()));
    }
    if let Some(study) = &scenario.feasibility {
        if study.cost_per_area < Decimal::ZERO || study.sale_price_per_area < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney("feasibility".to_string()));
        }
    }
    Ok(())
}
