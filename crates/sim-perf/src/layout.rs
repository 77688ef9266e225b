//! Floorplan-driven efficiency factors, IPC and the base clock.

use serde::{Deserialize, Serialize};
use sim_core::sizing::size_scaling;
use sim_core::tables::{interconnect_requirements, max_clock_ghz, memory_bandwidth_per_controller};
use sim_core::{Component, ComponentType, Die};

/// Die area with neither bonus nor penalty, mm².
pub const OPTIMAL_DIE_AREA_MM2: f64 = 200.0;
/// Average sustained demand per CPU core, GB/s.
pub const CPU_CORE_DEMAND_GBPS: f64 = 15.0;
/// Average sustained demand per GPU SM, GB/s.
pub const GPU_CORE_DEMAND_GBPS: f64 = 50.0;

/// The five independent layout factors plus their combination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyFactors {
    /// Mean distance-driven latency penalty, 0 to 0.15.
    pub interconnect_penalty: f64,
    /// 1.0 to 1.10.
    pub clustering_bonus: f64,
    /// Supplied over demanded memory bandwidth, at most 1.0.
    pub bandwidth_ratio: f64,
    pub die_size_factor: f64,
    pub utilization_factor: f64,
    /// `(1 - interconnect_penalty) * clustering_bonus`.
    pub layout_efficiency: f64,
}

impl EfficiencyFactors {
    pub fn evaluate(die: &Die) -> Self {
        let interconnect_penalty = interconnect_penalty(die);
        let clustering_bonus = clustering_bonus(die);
        Self {
            interconnect_penalty,
            clustering_bonus,
            bandwidth_ratio: bandwidth_ratio(die),
            die_size_factor: die_size_factor(die.area()),
            utilization_factor: utilization_factor(die.stats().utilization_percent / 100.0),
            layout_efficiency: (1.0 - interconnect_penalty) * clustering_bonus,
        }
    }
}

fn nearest_distance(die: &Die, from: &Component, target: ComponentType) -> Option<f64> {
    die.components_of(target)
        .map(|t| from.distance_to(t))
        .min_by(|a, b| a.total_cmp(b))
}

/// Average latency penalty over every (component, required target) pair present on the die.
///
/// A pair contributes `min(0.15, d / 20 * 0.15) * weight`, with `d` the distance to the
/// nearest block of the target type. Pairs whose target type is absent are skipped.
pub fn interconnect_penalty(die: &Die) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0u32;
    for c in &die.components {
        for req in interconnect_requirements(c.component_type) {
            if let Some(d) = nearest_distance(die, c, req.target) {
                total += (d / 20.0 * 0.15).min(0.15) * req.latency.weight();
                pairs += 1;
            }
        }
    }
    if pairs > 0 {
        total / f64::from(pairs)
    } else {
        0.0
    }
}

/// Bonus for CPU cores packed around their centroid: +10 % at distance 0, none from 15 mm.
pub fn clustering_bonus(die: &Die) -> f64 {
    let n = die.count_of(ComponentType::CpuCore);
    if n <= 1 {
        return 1.0;
    }
    let n = n as f64;
    let (sx, sy) = die
        .components_of(ComponentType::CpuCore)
        .map(Component::center)
        .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
    let (cx, cy) = (sx / n, sy / n);
    let avg = die
        .components_of(ComponentType::CpuCore)
        .map(|c| {
            let (x, y) = c.center();
            (x - cx).hypot(y - cy)
        })
        .sum::<f64>()
        / n;
    1.0 + (0.10 * (1.0 - avg / 15.0)).max(0.0)
}

/// Controller bandwidth over core demand, capped at 1.0; 0.5 without any controller.
pub fn bandwidth_ratio(die: &Die) -> f64 {
    let node = die.process_node;
    let per_ctrl = memory_bandwidth_per_controller(node);
    let mut controllers = die.components_of(ComponentType::MemCtrl).peekable();
    if controllers.peek().is_none() {
        return 0.5;
    }
    let supply: f64 = controllers.map(|c| per_ctrl * size_scaling(c, node)).sum();
    let demand = die.count_of(ComponentType::CpuCore) as f64 * CPU_CORE_DEMAND_GBPS
        + die.count_of(ComponentType::GpuSm) as f64 * GPU_CORE_DEMAND_GBPS;
    (supply / demand.max(1.0)).min(1.0)
}

/// Up to +5 % below the optimal area, down to -20 % at 1200 mm² and beyond.
pub fn die_size_factor(area_mm2: f64) -> f64 {
    if area_mm2 <= OPTIMAL_DIE_AREA_MM2 {
        1.0 + (OPTIMAL_DIE_AREA_MM2 - area_mm2) / OPTIMAL_DIE_AREA_MM2 * 0.05
    } else {
        1.0 - ((area_mm2 - OPTIMAL_DIE_AREA_MM2) / 1000.0 * 0.20).min(0.20)
    }
}

/// Wasted space below 50 % utilisation, congestion above 85 %.
pub fn utilization_factor(utilization: f64) -> f64 {
    if utilization < 0.50 {
        0.80 + utilization * 0.40
    } else if utilization <= 0.85 {
        1.0
    } else {
        1.0 - ((utilization - 0.85) * 0.75).min(0.15)
    }
}

/// Area of one type weighted by each block's size scaling.
pub fn effective_area(die: &Die, t: ComponentType) -> f64 {
    die.components_of(t)
        .map(|c| c.area() * size_scaling(c, die.process_node))
        .sum()
}

/// Baseline 4.0 plus cache bonuses capped at +0.5 (L2) and +0.3 (L3).
pub fn ipc(die: &Die) -> f64 {
    let l2 = effective_area(die, ComponentType::L2Cache);
    let l3 = effective_area(die, ComponentType::L3Cache);
    4.0 + (l2 / 10.0 * 0.1).min(0.5) + (l3 / 50.0 * 0.1).min(0.3)
}

/// Clock terms before any thermal throttling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockModel {
    pub max_clock_ghz: f64,
    pub core_count_penalty: f64,
    pub layout_clock_bonus: f64,
    pub core_clock_scaling: f64,
    pub base_clock_ghz: f64,
}

pub fn clock_model(die: &Die, interconnect_penalty: f64) -> ClockModel {
    let node = die.process_node;
    let max_clock_ghz = max_clock_ghz(node);
    let cores = die.count_of(ComponentType::CpuCore);
    let core_count_penalty = if cores == 0 {
        1.0
    } else {
        (1.0 - (cores as f64).log2() * 0.02).max(0.90)
    };
    let layout_clock_bonus = (1.0 - interconnect_penalty * 0.15).max(0.85);
    let avg_core_scaling = if cores == 0 {
        1.0
    } else {
        die.components_of(ComponentType::CpuCore)
            .map(|c| size_scaling(c, node))
            .sum::<f64>()
            / cores as f64
    };
    let core_clock_scaling = 0.90 + (avg_core_scaling - 1.0) * 0.1;
    ClockModel {
        max_clock_ghz,
        core_count_penalty,
        layout_clock_bonus,
        core_clock_scaling,
        base_clock_ghz: max_clock_ghz * 0.90 * core_count_penalty * layout_clock_bonus * core_clock_scaling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{DieType, Dimensions, Position};

    fn comp(t: ComponentType, x: f64, y: f64, w: f64, h: f64) -> Component {
        Component::new(t, t.label(), Position { x, y }, Dimensions::new(w, h))
    }

    fn die(components: Vec<Component>) -> Die {
        let mut d = Die::new("T", DieType::Cpu, Dimensions::new(20.0, 20.0), 7);
        d.components = components;
        d
    }

    #[test]
    fn interconnect_penalty_weights_by_latency() {
        // Core and L2 centres 10 mm apart: 0.075 at critical weight 1.0.
        let d = die(vec![
            comp(ComponentType::CpuCore, 0.0, 0.0, 2.0, 2.0),
            comp(ComponentType::L2Cache, 10.0, 0.0, 2.0, 2.0),
        ]);
        assert!((interconnect_penalty(&d) - 0.075).abs() < 1e-12);
        // Power management is low criticality: (0.075 + 0.0075) / 2.
        let d = die(vec![
            comp(ComponentType::CpuCore, 0.0, 0.0, 2.0, 2.0),
            comp(ComponentType::L2Cache, 10.0, 0.0, 2.0, 2.0),
            comp(ComponentType::PowerMgmt, 0.0, 10.0, 2.0, 2.0),
        ]);
        assert!((interconnect_penalty(&d) - 0.04125).abs() < 1e-12);
        assert_eq!(interconnect_penalty(&die(vec![])), 0.0);
    }

    #[test]
    fn clustering_needs_two_cores() {
        let one = die(vec![comp(ComponentType::CpuCore, 0.0, 0.0, 2.0, 2.0)]);
        assert_eq!(clustering_bonus(&one), 1.0);
        // Two cores 6 mm apart: 3 mm from the centroid -> 1 + 0.1 * 0.8.
        let two = die(vec![
            comp(ComponentType::CpuCore, 0.0, 0.0, 2.0, 2.0),
            comp(ComponentType::CpuCore, 6.0, 0.0, 2.0, 2.0),
        ]);
        assert!((clustering_bonus(&two) - 1.08).abs() < 1e-12);
    }

    #[test]
    fn bandwidth_without_controllers_is_halved() {
        let d = die(vec![comp(ComponentType::CpuCore, 0.0, 0.0, 1.0, 1.0)]);
        assert_eq!(bandwidth_ratio(&d), 0.5);
        // One default-size 7 nm controller (0.8 scaling) feeding one core: 51.2 * 0.8 / 15 > 1.
        let d = die(vec![
            comp(ComponentType::CpuCore, 0.0, 0.0, 1.0, 1.0),
            comp(ComponentType::MemCtrl, 2.0, 0.0, 0.5, 0.5),
        ]);
        assert_eq!(bandwidth_ratio(&d), 1.0);
        // Sixteen GPU SMs want 800 GB/s.
        let mut comps: Vec<_> = (0..16)
            .map(|i| comp(ComponentType::GpuSm, f64::from(i), 5.0, 1.0, 1.0))
            .collect();
        comps.push(comp(ComponentType::MemCtrl, 0.0, 0.0, 0.5, 0.5));
        let r = bandwidth_ratio(&die(comps));
        assert!((r - 51.2 * 0.8 / 800.0).abs() < 1e-12);
    }

    #[test]
    fn size_and_utilization_curves() {
        assert_eq!(die_size_factor(200.0), 1.0);
        assert!((die_size_factor(0.0) - 1.05).abs() < 1e-12);
        assert!((die_size_factor(700.0) - 0.9).abs() < 1e-12);
        assert!((die_size_factor(5000.0) - 0.8).abs() < 1e-12);
        assert_eq!(utilization_factor(0.0), 0.8);
        assert_eq!(utilization_factor(0.7), 1.0);
        assert!((utilization_factor(0.95) - 0.925).abs() < 1e-12);
        assert!((utilization_factor(1.2) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn ipc_caps_cache_bonuses() {
        assert_eq!(ipc(&die(vec![])), 4.0);
        let big = die(vec![
            comp(ComponentType::L2Cache, 0.0, 0.0, 10.0, 10.0),
            comp(ComponentType::L3Cache, 10.0, 0.0, 10.0, 10.0),
        ]);
        assert!((ipc(&big) - 4.8).abs() < 1e-12);
    }

    #[test]
    fn clock_terms_for_empty_die() {
        let m = clock_model(&die(vec![]), 0.0);
        assert_eq!(m.core_count_penalty, 1.0);
        assert_eq!(m.layout_clock_bonus, 1.0);
        assert!((m.core_clock_scaling - 0.9).abs() < 1e-12);
        assert!((m.base_clock_ghz - 5.0 * 0.9 * 0.9).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn factors_stay_in_range(
            cores in 0usize..12,
            ctrls in 0usize..3,
            side in 0.5f64..1.5,
        ) {
            let mut comps = Vec::new();
            for i in 0..cores {
                comps.push(comp(ComponentType::CpuCore, (i % 6) as f64 * 2.0, (i / 6) as f64 * 2.0, side, side));
            }
            for i in 0..ctrls {
                comps.push(comp(ComponentType::MemCtrl, 14.0, i as f64 * 2.0, side, side));
            }
            let d = die(comps);
            let f = EfficiencyFactors::evaluate(&d);
            prop_assert!((0.0..=0.15).contains(&f.interconnect_penalty));
            prop_assert!((1.0..=1.10 + 1e-12).contains(&f.clustering_bonus));
            prop_assert!(f.bandwidth_ratio > 0.0 && f.bandwidth_ratio <= 1.0);
            let m = clock_model(&d, f.interconnect_penalty);
            prop_assert!(m.base_clock_ghz > 0.0 && m.base_clock_ghz <= m.max_clock_ghz);
        }
    }
}
