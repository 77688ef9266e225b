//! Two-axis market classification: performance class and market grade.

use serde::{Deserialize, Serialize};
use sim_core::tables::{ClassTier, GradeCriteria, CLASS_TIERS, GRADE_CRITERIA};
use sim_core::{ChipClass, ChipGrade, ComponentType, Die};

/// Layout ratios the grade criteria are checked against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub cpu_cores: u32,
    pub gpu_cores: u32,
    /// 0 when there are no memory controllers.
    pub cores_per_controller: f64,
    /// L3 mm² per CPU core; 0 when there are no cores.
    pub l3_per_core_mm2: f64,
    /// Power management area over die area.
    pub power_mgmt_ratio: f64,
    /// Base clock over the node's maximum clock.
    pub clock_ratio: f64,
    pub process_node: u32,
    pub tdp_w: f64,
}

impl ClassificationMetrics {
    pub fn measure(die: &Die, base_clock_ghz: f64, max_clock_ghz: f64, tdp_w: f64) -> Self {
        let cpu_cores = die.count_of(ComponentType::CpuCore) as u32;
        let controllers = die.count_of(ComponentType::MemCtrl);
        let area = die.area();
        Self {
            cpu_cores,
            gpu_cores: die.count_of(ComponentType::GpuSm) as u32,
            cores_per_controller: if controllers > 0 {
                f64::from(cpu_cores) / controllers as f64
            } else {
                0.0
            },
            l3_per_core_mm2: if cpu_cores > 0 {
                die.area_of(ComponentType::L3Cache) / f64::from(cpu_cores)
            } else {
                0.0
            },
            power_mgmt_ratio: if area > 0.0 {
                die.area_of(ComponentType::PowerMgmt) / area
            } else {
                0.0
            },
            clock_ratio: if max_clock_ghz > 0.0 {
                base_clock_ghz / max_clock_ghz
            } else {
                1.0
            },
            process_node: die.process_node,
            tdp_w,
        }
    }
}

fn within(v: f64, range: Option<(f64, f64)>) -> bool {
    range.map_or(true, |(lo, hi)| v >= lo && v <= hi)
}

/// Closeness to the centre of `[lo, hi]`: 1 at the midpoint, 0 at either edge.
fn centre_closeness(v: f64, lo: f64, hi: f64) -> f64 {
    let half = (hi - lo) / 2.0;
    if half > 0.0 {
        1.0 - (v - (lo + hi) / 2.0).abs() / half
    } else {
        1.0
    }
}

fn distance_outside(v: f64, lo: f64, hi: f64) -> f64 {
    if v < lo {
        lo - v
    } else {
        v - hi
    }
}

/// Fit of a core count and TDP to one tier; core count dominates.
pub fn class_score(tier: &ClassTier, cpu_cores: u32, tdp_w: f64) -> f64 {
    let cores = f64::from(cpu_cores);
    let (c_lo, c_hi) = (f64::from(tier.cores.0), f64::from(tier.cores.1));
    let core_score = if (c_lo..=c_hi).contains(&cores) {
        100.0 + 50.0 * centre_closeness(cores, c_lo, c_hi)
    } else {
        -100.0 - 10.0 * distance_outside(cores, c_lo, c_hi)
    };
    let (t_lo, t_hi) = tier.tdp_w;
    let tdp_score = if (t_lo..=t_hi).contains(&tdp_w) {
        40.0 + 20.0 * centre_closeness(tdp_w, t_lo, t_hi)
    } else {
        let width = t_hi - t_lo;
        let rel = if width > 0.0 {
            (distance_outside(tdp_w, t_lo, t_hi) / width).min(1.0)
        } else {
            1.0
        };
        -40.0 - 20.0 * rel
    };
    core_score + tdp_score
}

/// Best-scoring tier; on equal scores the earlier tier is kept.
pub fn classify_class(cpu_cores: u32, tdp_w: f64) -> ChipClass {
    let mut best = CLASS_TIERS[0].class;
    let mut best_score = f64::NEG_INFINITY;
    for tier in &CLASS_TIERS {
        let score = class_score(tier, cpu_cores, tdp_w);
        if score > best_score {
            best = tier.class;
            best_score = score;
        }
    }
    best
}

/// Whether the metrics satisfy every populated window of `criteria`.
pub fn meets_grade(criteria: &GradeCriteria, m: &ClassificationMetrics) -> bool {
    within(m.cores_per_controller, criteria.cores_per_controller)
        && within(m.l3_per_core_mm2, criteria.l3_per_core_mm2)
        && within(m.power_mgmt_ratio, criteria.power_mgmt_ratio)
        && criteria.min_process_node.map_or(true, |n| m.process_node >= n)
        && criteria.max_clock_ratio.map_or(true, |r| m.clock_ratio <= r)
}

/// First grade in priority order whose criteria hold; Consumer otherwise.
pub fn classify_grade(m: &ClassificationMetrics) -> ChipGrade {
    GRADE_CRITERIA
        .iter()
        .find(|c| meets_grade(c, m))
        .map_or(ChipGrade::Consumer, |c| c.grade)
}
