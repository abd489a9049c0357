//! Cumulative cost and completion curve over the project timeline.

use chrono::NaiveDate;
use plan_core::{offset_date, project_duration_days, Task};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Planned and executed progress on one day of the project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostProgressPoint {
    pub date: NaiveDate,
    /// Cost of tasks due by `date`, as a percent of the budget.
    pub planned_cost_percent: Decimal,
    /// Cost of tasks due by `date` and done, as a percent of the budget.
    pub actual_cost_percent: Decimal,
    /// Tasks due by `date` and done, as a percent of all tasks.
    pub completion_percent: Decimal,
}

/// `part / whole` in percent; 0 for a non-positive whole or on overflow.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// One point per day from `start` to `end` inclusive.
///
/// A task counts toward a day once its end date is on or before that day;
/// tasks without an end date never count. Each day is accumulated from
/// scratch, so the series does not depend on task order. Returns an empty
/// series when a date is missing, `end < start` or there are no tasks. A
/// non-positive budget yields 0% cost figures.
///
/// A project starting and ending on the same day has exactly one point.
pub fn project_cost_progress(
    tasks: &[Task],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    total_budget: Decimal,
) -> Vec<CostProgressPoint> {
    let (Some(start_date), Some(end_date)) = (start, end) else {
        warn!("project dates missing; no progress series");
        return Vec::new();
    };
    if end_date < start_date || tasks.is_empty() {
        warn!(%start_date, %end_date, tasks = tasks.len(), "insufficient data for progress series");
        return Vec::new();
    }

    let duration = project_duration_days(start, end);
    let task_count = Decimal::from(tasks.len());
    let mut series = Vec::with_capacity(duration as usize + 1);
    for day in 0..=duration as u64 {
        let Some(date) = offset_date(start_date, day) else {
            break;
        };
        let mut planned = Decimal::ZERO;
        let mut actual = Decimal::ZERO;
        let mut completed: u64 = 0;
        for task in tasks {
            if task.end_date.is_some_and(|due| due <= date) {
                let cost = task.total_cost();
                planned += cost;
                if task.is_done() {
                    actual += cost;
                    completed += 1;
                }
            }
        }
        series.push(CostProgressPoint {
            date,
            planned_cost_percent: percent_of(planned, total_budget),
            actual_cost_percent: percent_of(actual, total_budget),
            completion_percent: percent_of(Decimal::from(completed), task_count),
        });
    }
    debug!(points = series.len(), "progress series projected");
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use plan_core::TaskStatus;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn task(id: &str, end: Option<NaiveDate>, cost: i64, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            phase: String::new(),
            name: id.to_string(),
            start_date: Some(d(1)),
            end_date: end,
            cost_materials: Decimal::from(cost),
            cost_labor: Decimal::ZERO,
            status,
        }
    }

    fn schedule() -> Vec<Task> {
        vec![
            task("a", Some(d(2)), 100, TaskStatus::Done),
            task("b", Some(d(4)), 300, TaskStatus::InProgress),
            task("c", Some(d(5)), 600, TaskStatus::Done),
            task("d", None, 1000, TaskStatus::Done),
        ]
    }

    #[test]
    fn daily_cumulative_series() {
        let s = project_cost_progress(&schedule(), Some(d(1)), Some(d(5)), Decimal::from(2000));
        assert_eq!(s.len(), 5);
        assert_eq!(s[0].date, d(1));
        assert_eq!(s[0].planned_cost_percent, Decimal::ZERO);
        assert_eq!(s[1].planned_cost_percent, Decimal::from(5));
        assert_eq!(s[1].actual_cost_percent, Decimal::from(5));
        assert_eq!(s[1].completion_percent, Decimal::from(25));
        assert_eq!(s[3].planned_cost_percent, Decimal::from(20));
        assert_eq!(s[3].actual_cost_percent, Decimal::from(5));
        assert_eq!(s[4].date, d(5));
        assert_eq!(s[4].planned_cost_percent, Decimal::from(50));
        assert_eq!(s[4].actual_cost_percent, Decimal::from(35));
        assert_eq!(s[4].completion_percent, Decimal::from(50));
    }

    #[test]
    fn task_order_does_not_matter() {
        let mut reversed = schedule();
        reversed.reverse();
        let budget = Decimal::from(2000);
        assert_eq!(
            project_cost_progress(&schedule(), Some(d(1)), Some(d(5)), budget),
            project_cost_progress(&reversed, Some(d(1)), Some(d(5)), budget)
        );
    }

    #[test]
    fn degenerate_schedules_are_empty() {
        let budget = Decimal::from(2000);
        assert!(project_cost_progress(&schedule(), Some(d(5)), Some(d(1)), budget).is_empty());
        assert!(project_cost_progress(&schedule(), None, Some(d(5)), budget).is_empty());
        assert!(project_cost_progress(&schedule(), Some(d(1)), None, budget).is_empty());
        assert!(project_cost_progress(&[], Some(d(1)), Some(d(5)), budget).is_empty());
    }

    #[test]
    fn single_day_project_has_one_point() {
        let s = project_cost_progress(&schedule(), Some(d(5)), Some(d(5)), Decimal::from(2000));
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].planned_cost_percent, Decimal::from(50));
    }

    #[test]
    fn zero_budget_reports_no_cost_progress() {
        let s = project_cost_progress(&schedule(), Some(d(1)), Some(d(5)), Decimal::ZERO);
        assert!(s.iter().all(|p| p.planned_cost_percent.is_zero()));
        assert_eq!(s[4].completion_percent, Decimal::from(50));
    }

    #[test]
    fn tiny_budget_does_not_overflow() {
        let s = project_cost_progress(&schedule(), Some(d(1)), Some(d(5)), Decimal::new(1, 28));
        assert_eq!(s.len(), 5);
        assert_eq!(s[4].planned_cost_percent, Decimal::ZERO);
        assert_eq!(s[4].completion_percent, Decimal::from(50));
    }

    fn status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::NotStarted),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Done),
        ]
    }

    proptest! {
        #[test]
        fn bounded_and_non_decreasing(
            specs in prop::collection::vec((0u64..120, 0i64..1_000_000, status()), 1..40),
            fee in 0i64..500_000,
            span in 0u64..120,
        ) {
            let start = d(1);
            let tasks: Vec<Task> = specs
                .iter()
                .enumerate()
                .map(|(i, (offset, cost, st))| task(&i.to_string(), offset_date(start, *offset), *cost, *st))
                .collect();
            let budget = plan_core::direct_cost(&tasks) + Decimal::from(fee);
            let end = offset_date(start, span);
            let series = project_cost_progress(&tasks, Some(start), end, budget);
            prop_assert_eq!(series.len() as u64, span + 1);
            let hundred = Decimal::ONE_HUNDRED;
            for p in &series {
                for v in [p.planned_cost_percent, p.actual_cost_percent, p.completion_percent] {
                    prop_assert!(v >= Decimal::ZERO && v <= hundred);
                }
                prop_assert!(p.actual_cost_percent <= p.planned_cost_percent);
            }
            for w in series.windows(2) {
                prop_assert!(w[1].planned_cost_percent >= w[0].planned_cost_percent);
                prop_assert!(w[1].actual_cost_percent >= w[0].actual_cost_percent);
                prop_assert!(w[1].completion_percent >= w[0].completion_percent);
            }
            prop_assert_eq!(series.clone(), project_cost_progress(&tasks, Some(start), end, budget));
        }
    }
}
