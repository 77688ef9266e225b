//! Wafer tiling: grid placement of a die across a circular wafer with per-die yield.

use crate::poisson::{effective_defect_density, expected_defects, sample_poisson};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::ValidationError;
use tracing::debug;

/// Defect count recorded for dies inside the edge exclusion ring.
pub const EDGE_EXCLUDED_DEFECTS: u32 = 999;
/// `k` in `density ≈ k / node²`, transistors per mm² per nm².
pub const DENSITY_SCALING_FACTOR: f64 = 2.5e7;
/// Largest `nx * ny` candidate grid a wafer plan may walk.
pub const MAX_GRID_CELLS: f64 = 1_000_000.0;

/// Inputs of one wafer plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaferConfig {
    pub wafer_diameter_mm: f64,
    pub die_width_mm: f64,
    pub die_height_mm: f64,
    pub process_node: u32,
    /// Defects per cm² before maturity.
    pub base_defect_density: f64,
    /// 0 to 100.
    pub process_maturity: f64,
    pub edge_exclusion_mm: f64,
}

impl Default for WaferConfig {
    fn default() -> Self {
        Self {
            wafer_diameter_mm: 300.0,
            die_width_mm: 10.0,
            die_height_mm: 10.0,
            process_node: 14,
            base_defect_density: 3.5,
            process_maturity: 50.0,
            edge_exclusion_mm: 3.0,
        }
    }
}

impl WaferConfig {
    pub fn radius(&self) -> f64 {
        self.wafer_diameter_mm / 2.0
    }

    pub fn die_area_mm2(&self) -> f64 {
        self.die_width_mm * self.die_height_mm
    }

    /// Candidate grid `(nx, ny)` spanning the wafer diameter, as unrounded counts.
    fn grid_extent(&self) -> (f64, f64) {
        (
            (self.wafer_diameter_mm / self.die_width_mm).ceil().max(1.0),
            (self.wafer_diameter_mm / self.die_height_mm).ceil().max(1.0),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for v in [
            self.wafer_diameter_mm,
            self.die_width_mm,
            self.die_height_mm,
            self.edge_exclusion_mm,
        ] {
            if !v.is_finite() {
                return Err(ValidationError::NonFinite);
            }
        }
        if self.wafer_diameter_mm <= 0.0 {
            return Err(ValidationError::NonPositiveDimension("wafer".into()));
        }
        if self.die_width_mm <= 0.0 || self.die_height_mm <= 0.0 {
            return Err(ValidationError::NonPositiveDimension("die".into()));
        }
        if self.edge_exclusion_mm < 0.0 || self.edge_exclusion_mm >= self.radius() {
            return Err(ValidationError::EdgeExclusionTooLarge);
        }
        let (nx, ny) = self.grid_extent();
        if nx * ny > MAX_GRID_CELLS {
            return Err(ValidationError::GridTooLarge(nx * ny));
        }
        Ok(())
    }
}

/// Yield bucket of a placed die.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldCategory {
    /// No defects.
    Perfect,
    /// 1 to 2 defects; still sellable.
    Diminished,
    /// 3 to 5 defects.
    Damaged,
    /// 6 or more defects, or edge-excluded.
    Unusable,
}

impl YieldCategory {
    pub fn from_defects(defects: u32) -> Self {
        match defects {
            0 => YieldCategory::Perfect,
            1..=2 => YieldCategory::Diminished,
            3..=5 => YieldCategory::Damaged,
            _ => YieldCategory::Unusable,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            YieldCategory::Perfect => "Perfect",
            YieldCategory::Diminished => "Diminished",
            YieldCategory::Damaged => "Damaged",
            YieldCategory::Unusable => "Unusable",
        }
    }

    /// Inclusive defect range; `None` upper bound is open-ended.
    pub fn defect_range(self) -> (u32, Option<u32>) {
        match self {
            YieldCategory::Perfect => (0, Some(0)),
            YieldCategory::Diminished => (1, Some(2)),
            YieldCategory::Damaged => (3, Some(5)),
            YieldCategory::Unusable => (6, None),
        }
    }

    /// `(min, max)` functionality within the bucket.
    pub fn functionality_range(self) -> (f64, f64) {
        match self {
            YieldCategory::Perfect => (1.0, 1.0),
            YieldCategory::Diminished => (0.5, 0.99),
            YieldCategory::Damaged => (0.01, 0.49),
            YieldCategory::Unusable => (0.0, 0.0),
        }
    }

    /// Whether the die counts toward overall yield.
    pub fn is_usable(self) -> bool {
        matches!(self, YieldCategory::Perfect | YieldCategory::Diminished)
    }
}

/// Fraction of a die that still works, interpolated linearly inside its category.
pub fn functionality(defects: u32, category: YieldCategory) -> f64 {
    if defects == 0 {
        return 1.0;
    }
    let (lo, hi) = category.functionality_range();
    match category.defect_range() {
        (_, None) => 0.0,
        (min, Some(max)) if max == min => hi,
        (min, Some(max)) => {
            let pos = f64::from(defects.saturating_sub(min)) / f64::from(max - min);
            hi - pos * (hi - lo)
        }
    }
}

/// One die site on the wafer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedDie {
    /// 1-based, in row-major placement order.
    pub id: u32,
    pub row: u32,
    pub col: u32,
    /// Centre in mm from the wafer centre.
    pub x: f64,
    pub y: f64,
    pub defect_count: u32,
    pub category: YieldCategory,
    pub functionality: f64,
    pub in_edge_exclusion: bool,
}

/// Die counts per yield category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldBreakdown {
    pub perfect: u32,
    pub diminished: u32,
    pub damaged: u32,
    pub unusable: u32,
}

impl YieldBreakdown {
    pub fn record(&mut self, category: YieldCategory) {
        match category {
            YieldCategory::Perfect => self.perfect += 1,
            YieldCategory::Diminished => self.diminished += 1,
            YieldCategory::Damaged => self.damaged += 1,
            YieldCategory::Unusable => self.unusable += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.perfect + self.diminished + self.damaged + self.unusable
    }

    pub fn usable(&self) -> u32 {
        self.perfect + self.diminished
    }
}

/// Result of [`place_dies`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaferPlacement {
    pub dies: Vec<PlacedDie>,
    pub total_dies: u32,
    pub yield_breakdown: YieldBreakdown,
    /// Usable dies as a percentage of all placed dies; 0 for an empty wafer.
    pub overall_yield: f64,
    /// MTr/mm² from the `k / node²` scaling rule.
    pub transistor_density: f64,
    /// MTr per die.
    pub transistors_per_die: f64,
    /// Poisson mean per die after maturity.
    pub expected_defects: f64,
    pub effective_defect_density: f64,
}

/// Squared distance from the wafer centre to the farthest corner of a die.
fn farthest_corner_sq(x: f64, y: f64, w: f64, h: f64) -> f64 {
    let cx = x.abs() + w / 2.0;
    let cy = y.abs() + h / 2.0;
    cx * cx + cy * cy
}

/// True when all four corners of the die centred at `(x, y)` lie within `radius`.
pub fn die_fits_in_wafer(x: f64, y: f64, w: f64, h: f64, radius: f64) -> bool {
    farthest_corner_sq(x, y, w, h) <= radius * radius
}

/// True when any corner lies beyond `radius - exclusion_mm`.
pub fn in_edge_exclusion(x: f64, y: f64, w: f64, h: f64, radius: f64, exclusion_mm: f64) -> bool {
    let usable = radius - exclusion_mm;
    farthest_corner_sq(x, y, w, h) > usable * usable
}

/// Transistor density in MTr/mm² from the inverse-square node rule.
pub fn scaled_transistor_density(process_node: u32) -> f64 {
    let n = f64::from(process_node.max(1));
    DENSITY_SCALING_FACTOR / (n * n) / 1e6
}

/// Centre offset of grid cell `i` out of `n`, symmetric about zero.
fn grid_offset(i: u32, n: u32, size: f64) -> f64 {
    (f64::from(i) - f64::from(n - 1) / 2.0) * size
}

/// Tiles the wafer with the configured die and samples each kept die's defects.
pub fn place_dies<R: Rng + ?Sized>(config: &WaferConfig, rng: &mut R) -> Result<WaferPlacement, ValidationError> {
    config.validate()?;
    let density = effective_defect_density(config.base_defect_density, config.process_maturity)?;
    let lambda = expected_defects(config.die_area_mm2(), density);
    let radius = config.radius();
    let (w, h) = (config.die_width_mm, config.die_height_mm);
    let (nx, ny) = config.grid_extent();
    let (nx, ny) = (nx as u32, ny as u32);

    let mut dies = Vec::new();
    let mut breakdown = YieldBreakdown::default();
    let mut next_id = 1u32;
    for row in 0..ny {
        let y = grid_offset(row, ny, h);
        for col in 0..nx {
            let x = grid_offset(col, nx, w);
            if !die_fits_in_wafer(x, y, w, h, radius) {
                continue;
            }
            let excluded = in_edge_exclusion(x, y, w, h, radius, config.edge_exclusion_mm);
            let (defect_count, category) = if excluded {
                (EDGE_EXCLUDED_DEFECTS, YieldCategory::Unusable)
            } else {
                let k = sample_poisson(lambda, rng);
                (k, YieldCategory::from_defects(k))
            };
            breakdown.record(category);
            dies.push(PlacedDie {
                id: next_id,
                row,
                col,
                x,
                y,
                defect_count,
                category,
                functionality: functionality(defect_count, category),
                in_edge_exclusion: excluded,
            });
            next_id += 1;
        }
    }

    let total_dies = breakdown.total();
    let overall_yield = if total_dies > 0 {
        f64::from(breakdown.usable()) / f64::from(total_dies) * 100.0
    } else {
        0.0
    };
    let transistor_density = scaled_transistor_density(config.process_node);
    debug!(
        total_dies,
        perfect = breakdown.perfect,
        unusable = breakdown.unusable,
        overall_yield,
        "wafer placed"
    );
    Ok(WaferPlacement {
        dies,
        total_dies,
        yield_breakdown: breakdown,
        overall_yield,
        transistor_density,
        transistors_per_die: config.die_area_mm2() * transistor_density,
        expected_defects: lambda,
        effective_defect_density: density,
    })
}
