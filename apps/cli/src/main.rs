#![deny(warnings)]

//! Headless CLI: evaluates a die scenario and prints KPIs or a JSON report.

mod scenario;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use scenario::{Scenario, BUILTIN};
use serde::Serialize;
use sim_core::DieLibrary;
use sim_econ::{contract_pricing, foundry_by_id, plan_batch, BatchPlan, ContractPricing};
use sim_perf::PerformanceRecord;
use sim_yield::WaferPlacement;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => {
                args.scenario = Some(it.next().context("--scenario needs a path")?.into());
            }
            "--seed" => {
                let v = it.next().context("--seed needs a value")?;
                args.seed = Some(v.parse().with_context(|| format!("bad seed {v:?}"))?);
            }
            "--json" => args.json = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    Ok(args)
}

#[derive(Serialize)]
struct Report {
    performance: PerformanceRecord,
    wafer: WaferPlacement,
    batch: BatchPlan,
    contract: Option<ContractPricing>,
}

fn run(scenario: &Scenario, library: &DieLibrary) -> Result<Report> {
    scenario.validate()?;
    let die = scenario.resolve_die(library)?;
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.config.rng_seed);

    let performance = sim_perf::performance(&die, &scenario.config, &mut rng)?;
    let wafer = sim_yield::place_dies(&scenario.wafer_config(&die), &mut rng)?;
    let batch = plan_batch(
        scenario.batch.name.clone(),
        &die,
        scenario.batch.wafer_size_mm,
        scenario.batch.reticle,
    )?;

    let contract = match &scenario.contract {
        Some(c) => {
            let foundry = foundry_by_id(&c.foundry).ok_or_else(|| anyhow!("unknown foundry {:?}", c.foundry))?;
            if let Some(year) = c.year {
                if !foundry.offers(year, die.process_node) {
                    warn!(foundry = foundry.name, year, node = die.process_node, "foundry does not offer this node");
                }
            }
            Some(contract_pricing(
                foundry.pricing_multiplier(),
                c.contract_type,
                die.process_node,
                c.wafers_per_week,
                c.weeks,
            )?)
        }
        None => None,
    };

    Ok(Report {
        performance,
        wafer,
        batch,
        contract,
    })
}

fn print_kpis(sku: &str, scenario: &Scenario, r: &Report) {
    let p = &r.performance;
    println!(
        "Die {} | {} | {}-core CPU, {} GPU SMs | {} / {}",
        sku, p.process_label, p.cpu_cores, p.gpu_cores, p.chip_class, p.chip_grade
    );
    println!(
        "Perf | score: {} | base: {:.2} GHz | boost: {:.2} GHz | IPC: {:.2} | TDP: {:.1} W | {:.2} W/mm²{}",
        p.performance_score,
        p.base_clock_ghz,
        p.boost_clock_ghz,
        p.ipc,
        p.tdp_w,
        p.power_density_w_mm2,
        if p.throttled { " (throttled)" } else { "" }
    );
    println!(
        "Yield | monte carlo: {:.1}% | theoretical: {:.1}% | cost x{:.2}",
        p.yield_percent,
        p.theoretical_yield * 100.0,
        p.cost_multiplier
    );
    let b = &r.wafer.yield_breakdown;
    println!(
        "Wafer | dies: {} | perfect: {} | diminished: {} | damaged: {} | unusable: {} | yield: {:.1}%",
        r.wafer.total_dies, b.perfect, b.diminished, b.damaged, b.unusable, r.wafer.overall_yield
    );
    let maturity = scenario.batch.maturity;
    let unit_cost = r
        .batch
        .cost_per_good_die_kusd(maturity)
        .map_or_else(|| "n/a".to_string(), |k| format!("${:.2}", k * rust_decimal::Decimal::ONE_THOUSAND));
    println!(
        "Batch | {} | {} dies/wafer | {} shots | {:.1}% util | {} yield: {:.1}% | ${}k/wafer | {} per good die",
        r.batch.name,
        r.batch.metrics.dies_per_wafer,
        r.batch.metrics.reticle_shots_per_wafer,
        r.batch.metrics.wafer_area_utilization,
        maturity.label(),
        r.batch.yield_by_maturity.get(maturity) * 100.0,
        r.batch.cost_per_wafer_kusd,
        unit_cost
    );
    if let Some(c) = &r.contract {
        println!(
            "Contract | {} | {} wafers | ${}/wafer | total: ${} | deposit: ${}",
            c.contract_type, c.total_wafers, c.price_per_wafer, c.total_value, c.deposit
        );
    }
    if let Some(w) = &p.thermal_warning {
        println!("Warning | {w}");
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    info!(scenario = ?args.scenario, seed = ?args.seed, "starting CLI");

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::parse(BUILTIN)?,
    };
    if let Some(seed) = args.seed {
        scenario.config.rng_seed = seed;
    }

    // Fixed timestamp keeps library records identical across runs.
    let epoch = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid library timestamp")?;
    let library = DieLibrary::with_default_dies(epoch)?;

    let report = run(&scenario, &library)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_kpis(&report.batch.die_sku, &scenario, &report);
    }
    Ok(())
}
