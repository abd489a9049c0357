use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

fn year_long_scenario() -> plan_core::Scenario {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let tasks = (0..200u64)
        .map(|i| plan_core::Task {
            id: format!("t{i}"),
            phase: format!("Fase {}", i / 20),
            name: format!("Tarefa {i}"),
            start_date: plan_core::offset_date(start, i),
            end_date: plan_core::offset_date(start, i + 30),
            cost_materials: Decimal::new(1_250_000 + i as i64 * 100, 2),
            cost_labor: Decimal::new(830_000, 2),
            status: if i < 80 {
                plan_core::TaskStatus::Done
            } else {
                plan_core::TaskStatus::NotStarted
            },
        })
        .collect::<Vec<_>>();
    let direct = plan_core::direct_cost(&tasks);
    plan_core::Scenario {
        name: "bench".into(),
        project_start_date: Some(start),
        project_end_date: plan_core::offset_date(start, 365),
        budget: plan_core::Budget {
            total: direct * Decimal::new(11, 1),
            labor: Decimal::new(830_000, 2) * Decimal::from(200),
            ..plan_core::Budget::default()
        },
        tasks,
        ..plan_core::Scenario::default()
    }
}

fn bench_analysis(c: &mut Criterion) {
    let scenario = year_long_scenario();
    c.bench_function("analyze_project_200_tasks", |b| {
        b.iter(|| {
            let _ = plan_econ::analyze_project(&scenario);
        })
    });

    let percents: Vec<plan_core::Percent> = ["12.5", "27.3", "33.1", "27.1"]
        .iter()
        .map(|p| plan_core::Percent::parse(p))
        .collect();
    c.bench_function("apportion_100k_units", |b| {
        b.iter(|| {
            let _ = plan_econ::apportion(100_000, &percents);
        })
    });
}

criterion_group!(benches, bench_analysis);
criterion_main!(benches);
