#![deny(warnings)]

//! Headless CLI: load a scenario, price it, compare tax regimes and print the
//! feasibility and progress summary.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use plan_core::*;
use plan_econ::{analyze_project, ProjectAnalysis, TaxRegime};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: plan-cli [--scenario PATH] [--margin PCT] [--payroll inss|cprb] [--json] [--version]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    scenario: Option<PathBuf>,
    margin: Option<Percent>,
    payroll: Option<PayrollChoice>,
    json: bool,
    version: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => {
                parsed.scenario = Some(it.next().context("--scenario needs a path")?.into())
            }
            "--margin" => {
                let raw = it.next().context("--margin needs a percentage")?;
                parsed.margin = Some(raw.parse().with_context(|| format!("bad --margin {raw}"))?);
            }
            "--payroll" => {
                let raw = it.next().context("--payroll needs inss or cprb")?;
                parsed.payroll = Some(raw.parse().map_err(|e: String| anyhow!(e))?);
            }
            "--json" => parsed.json = true,
            "--version" | "-V" => parsed.version = true,
            other => return Err(anyhow!("unknown argument {other}\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn demo_scenario() -> Scenario {
    let date = |m, d| NaiveDate::from_ymd_opt(2025, m, d);
    let task = |id: &str, phase: &str, name: &str, span: (u32, u32, u32, u32), cost: (i64, i64), status| Task {
        id: id.to_string(),
        phase: phase.to_string(),
        name: name.to_string(),
        start_date: date(span.0, span.1),
        end_date: date(span.2, span.3),
        cost_materials: Decimal::from(cost.0),
        cost_labor: Decimal::from(cost.1),
        status,
    };
    Scenario {
        name: "Casa térrea 120m²".to_string(),
        project_start_date: date(3, 3),
        project_end_date: date(8, 29),
        tasks: vec![
            task("1", "Fundação", "Radier", (3, 3, 3, 28), (28_000, 17_000), TaskStatus::Done),
            task("2", "Estrutura", "Alvenaria estrutural", (3, 31, 5, 30), (34_000, 21_000), TaskStatus::InProgress),
            task("3", "Cobertura", "Telhado", (6, 2, 6, 27), (15_000, 8_000), TaskStatus::NotStarted),
            task("4", "Acabamento", "Pisos e pintura", (6, 30, 8, 29), (22_000, 15_000), TaskStatus::NotStarted),
        ],
        budget: Budget {
            total: Decimal::from(176_000),
            materials: Decimal::from(99_000),
            labor: Decimal::from(61_000),
            manager_fee: Decimal::from(16_000),
        },
        feasibility: Some(FeasibilityStudy {
            total_units: 200,
            typologies: vec![
                Typology::new(Percent::parse("50"), Decimal::from(50)),
                Typology::new(Percent::parse("25"), Decimal::from(35)),
                Typology::new(Percent::parse("25"), Decimal::from(45)),
            ],
            cost_per_area: Decimal::new(233_152, 2),
            sale_price_per_area: Decimal::from(8_000),
            mix: MixConfig::default(),
        }),
        ..Scenario::default()
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
}

fn money(v: Decimal) -> Decimal {
    v.round_dp(2)
}

fn print_summary(scenario: &Scenario, a: &ProjectAnalysis) {
    let f = &a.financials;
    println!(
        "Project '{}' | tasks: {} | duration: {} days",
        scenario.name,
        scenario.tasks.len(),
        a.duration_days
    );
    if f.is_infeasible() {
        println!(
            "Pricing | direct: R$ {} | cannot price: taxes plus margin reach 100% of revenue",
            money(f.direct_cost)
        );
    } else {
        println!(
            "Pricing | direct: R$ {} | BDI: {}% | price: R$ {} | EBITDA: R$ {} | net: R$ {} | ROI: {}%",
            money(f.direct_cost),
            money(f.bdi_percent()),
            money(f.final_price),
            money(f.ebitda),
            money(f.net_profit),
            money(f.roi)
        );
    }
    for regime in TaxRegime::ALL {
        let r = a.taxes.get(regime);
        let marker = if regime == a.taxes.best { " *" } else { "" };
        println!(
            "Tax | {:<20} | tax: R$ {:>14} | net: R$ {:>14}{}",
            regime.name(),
            money(r.total_tax),
            money(r.net_profit),
            marker
        );
    }
    println!("Best regime: {}", a.taxes.best);

    match &a.feasibility {
        Some(Ok(plan)) => {
            for t in &plan.allocations {
                println!(
                    "Mix | {:<16} | {:>6} | units: {:>5} | cost: R$ {} | price: R$ {}",
                    t.label,
                    t.percent_of_mix.to_string(),
                    t.unit_count,
                    money(t.unit_cost),
                    money(t.sale_price)
                );
            }
            println!(
                "Mix totals | units: {} | area: {}m² | VGV: R$ {} | gross profit: R$ {}",
                plan.totals.total_units,
                plan.totals.total_area.normalize(),
                money(plan.totals.total_vgv),
                money(plan.totals.total_gross_profit)
            );
        }
        Some(Err(e)) => println!("Mix | invalid: {e}"),
        None => {}
    }

    match a.progress.last() {
        Some(p) => println!(
            "Progress @ {} | planned: {}% | actual: {}% | completion: {}%",
            p.date,
            money(p.planned_cost_percent),
            money(p.actual_cost_percent),
            money(p.completion_percent)
        ),
        None => println!("Progress | not enough schedule data"),
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "plan-cli {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(scenario = ?args.scenario, margin = ?args.margin, payroll = ?args.payroll, "starting CLI");

    let mut scenario = match &args.scenario {
        Some(path) => load_scenario(path)?,
        None => demo_scenario(),
    };
    if let Some(margin) = args.margin {
        scenario.pricing.net_profit_margin = margin;
    }
    if let Some(payroll) = args.payroll {
        scenario.payroll = payroll;
    }
    validate_scenario(&scenario)?;

    let analysis = analyze_project(&scenario);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_summary(&scenario, &analysis);
    }
    Ok(())
}
