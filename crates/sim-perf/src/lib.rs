#![deny(warnings)]

//! Die performance engine.
//!
//! [`performance`] turns a die layout into clocks, power, IPC, a composite
//! score, manufacturing yield and a market classification. It is a pure
//! function of the die and the constant tables except for the Monte Carlo
//! yield draw, which uses the caller's RNG.

pub mod classify;
pub mod layout;
pub mod power;

pub use classify::{classify_class, classify_grade, ClassificationMetrics};
pub use layout::EfficiencyFactors;
pub use power::PowerBreakdown;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::tables::{process_node_info, transistor_density};
use sim_core::{ChipClass, ChipGrade, ComponentType, Die, SimConfig, ValidationError};
use sim_yield::{cost_multiplier, simulate_defects, theoretical_yield, DefectSimulation};
use tracing::{debug, warn};

/// Boost headroom over the base clock, capped at the node maximum.
pub const BOOST_FACTOR: f64 = 1.15;
/// Bandwidth ratio below which the die is flagged as memory bound.
pub const MEMORY_BOTTLENECK_RATIO: f64 = 0.8;

/// Everything [`performance`] derives from a die.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub process_node: u32,
    pub process_label: String,
    pub process_year: i32,

    /// MTr/mm² at the node.
    pub transistor_density: f64,
    /// Million transistors.
    pub total_transistors: f64,

    pub base_clock_ghz: f64,
    pub boost_clock_ghz: f64,
    pub max_clock_ghz: f64,

    /// After throttling.
    pub tdp_w: f64,
    pub power_density_w_mm2: f64,
    pub voltage: f64,
    pub dynamic_power_w: f64,
    pub leakage_power_w: f64,

    pub performance_score: u64,
    pub ipc: f64,
    pub single_thread_perf: f64,
    pub multi_thread_perf: f64,
    pub gpu_perf: f64,
    pub efficiency: EfficiencyFactors,

    /// Monte Carlo effective yield in percent.
    pub yield_percent: f64,
    /// Closed-form effective yield, 0 to 1.
    pub theoretical_yield: f64,
    pub cost_multiplier: f64,
    pub defect_simulation: DefectSimulation,

    pub chip_class: ChipClass,
    pub chip_grade: ChipGrade,
    pub classification: ClassificationMetrics,

    pub thermal_warning: Option<String>,
    pub throttled: bool,
    pub memory_bottleneck: bool,
    pub cpu_cores: u32,
    pub gpu_cores: u32,
}

/// Evaluates a die.
///
/// Fails only on structurally invalid input: non-positive or non-finite
/// geometry, or a config with zero Monte Carlo trials. Empty dies evaluate to
/// zero transistors and a zero score.
pub fn performance<R: Rng + ?Sized>(
    die: &Die,
    config: &SimConfig,
    rng: &mut R,
) -> Result<PerformanceRecord, ValidationError> {
    config.validate()?;
    die.validate_geometry()?;

    let node = die.process_node;
    let info = process_node_info(node);
    let area = die.area();
    let cpu_cores = die.count_of(ComponentType::CpuCore) as u32;
    let gpu_cores = die.count_of(ComponentType::GpuSm) as u32;

    let total_transistors = power::total_transistors(die);
    let efficiency = EfficiencyFactors::evaluate(die);
    let clock = layout::clock_model(die, efficiency.interconnect_penalty);

    let mut base_clock_ghz = clock.base_clock_ghz;
    let mut breakdown = power::power_at(die, base_clock_ghz, total_transistors);
    let mut tdp_w = breakdown.total_w;
    let thermal = power::check_thermal(tdp_w, area, config.thermal_profile.limit_w_per_mm2());
    if thermal.throttled() {
        base_clock_ghz *= thermal.throttle_ratio;
        tdp_w *= thermal.throttle_ratio;
        breakdown = power::power_at(die, base_clock_ghz, total_transistors);
        warn!(
            sku = %die.sku,
            ratio = thermal.throttle_ratio,
            density = thermal.power_density,
            "thermal throttling"
        );
    }
    let boost_clock_ghz = clock.max_clock_ghz.min(base_clock_ghz * BOOST_FACTOR);

    let ipc = layout::ipc(die);
    let single_thread_perf = base_clock_ghz * ipc * 1000.0;
    let multi_thread_perf = if cpu_cores > 0 {
        single_thread_perf * f64::from(cpu_cores) * 0.95
    } else {
        0.0
    };
    let gpu_perf = f64::from(gpu_cores) * base_clock_ghz * 1500.0;
    let raw_score = (multi_thread_perf + gpu_perf)
        * efficiency.layout_efficiency
        * efficiency.bandwidth_ratio
        * efficiency.die_size_factor
        * efficiency.utilization_factor;
    let performance_score = raw_score.round().max(0.0) as u64;

    let defect_simulation = simulate_defects(die, info.base_defect_density, config.monte_carlo_trials, rng)?;
    let theoretical = theoretical_yield(die, info.base_defect_density)?;

    let classification = ClassificationMetrics::measure(die, base_clock_ghz, clock.max_clock_ghz, tdp_w);
    let chip_class = classify_class(cpu_cores, tdp_w);
    let chip_grade = classify_grade(&classification);

    debug!(
        sku = %die.sku,
        node,
        score = performance_score,
        clock = base_clock_ghz,
        tdp = tdp_w,
        %chip_class,
        %chip_grade,
        "performance evaluated"
    );

    Ok(PerformanceRecord {
        process_node: node,
        process_label: info.label.to_string(),
        process_year: info.year,
        transistor_density: transistor_density(node),
        total_transistors,
        base_clock_ghz,
        boost_clock_ghz,
        max_clock_ghz: clock.max_clock_ghz,
        tdp_w,
        power_density_w_mm2: tdp_w / area,
        voltage: breakdown.voltage,
        dynamic_power_w: breakdown.dynamic_w,
        leakage_power_w: breakdown.leakage_w,
        performance_score,
        ipc,
        single_thread_perf,
        multi_thread_perf,
        gpu_perf,
        efficiency,
        yield_percent: defect_simulation.effective_yield * 100.0,
        theoretical_yield: theoretical.effective_yield,
        cost_multiplier: cost_multiplier(defect_simulation.effective_yield),
        defect_simulation,
        chip_class,
        chip_grade,
        classification,
        thermal_warning: thermal.warning,
        throttled: thermal.throttle_ratio < 1.0,
        memory_bottleneck: efficiency.bandwidth_ratio < MEMORY_BOTTLENECK_RATIO,
        cpu_cores,
        gpu_cores,
    })
}
