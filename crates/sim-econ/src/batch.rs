//! Fabrication batch planning: reticle packing, maturity yields, wafer cost.

use crate::EconError;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::tables::{nearest_key, process_node_info};
use sim_core::{Die, DieId, Dimensions};
use std::f64::consts::PI;
use tracing::debug;

/// Handling ring lost at the wafer edge, mm.
pub const WAFER_EDGE_MARGIN_MM: f64 = 5.0;
/// Fraction of the usable disc that whole reticle shots cover.
pub const RETICLE_PACKING_EFFICIENCY: f64 = 0.85;
/// Cost in k$ when the node table yields nothing.
pub const DEFAULT_WAFER_COST_KUSD: Decimal = Decimal::TEN;

/// Wafer cost in hundredths of k$, keyed by node.
const WAFER_COST_CENTI_KUSD: &[(u32, i64)] = &[
    (3, 5000),
    (5, 4000),
    (7, 3000),
    (10, 2500),
    (12, 2200),
    (14, 2000),
    (22, 1600),
    (32, 1200),
    (45, 900),
    (65, 650),
    (90, 450),
    (130, 300),
    (180, 200),
    (250, 150),
    (350, 100),
    (600, 75),
    (800, 50),
    (1000, 35),
    (1500, 20),
    (3000, 12),
    (6000, 8),
    (10000, 5),
];

/// Cost of one processed wafer in thousands of dollars, at the nearest listed node.
pub fn wafer_cost_kusd(process_node: u32) -> Decimal {
    nearest_key(WAFER_COST_CENTI_KUSD, process_node).map_or(DEFAULT_WAFER_COST_KUSD, |(_, v)| Decimal::new(*v, 2))
}

/// How long a process has been in volume production.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMaturity {
    New,
    Early,
    Mature,
    Optimized,
}

impl ProcessMaturity {
    pub const ALL: [ProcessMaturity; 4] = [
        ProcessMaturity::New,
        ProcessMaturity::Early,
        ProcessMaturity::Mature,
        ProcessMaturity::Optimized,
    ];

    /// Factor applied to the base yield.
    pub fn multiplier(self) -> f64 {
        match self {
            ProcessMaturity::New => 0.75,
            ProcessMaturity::Early => 1.00,
            ProcessMaturity::Mature => 1.15,
            ProcessMaturity::Optimized => 1.25,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcessMaturity::New => "New Process (0-3 months)",
            ProcessMaturity::Early => "Early (3-6 months)",
            ProcessMaturity::Mature => "Mature (6-18 months)",
            ProcessMaturity::Optimized => "Optimized (18+ months)",
        }
    }
}

/// Base yield scaled by each maturity level. Values are not capped at 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaturityYields {
    pub new: f64,
    pub early: f64,
    pub mature: f64,
    pub optimized: f64,
}

impl MaturityYields {
    pub fn from_base(base_yield: f64) -> Self {
        Self {
            new: base_yield * ProcessMaturity::New.multiplier(),
            early: base_yield * ProcessMaturity::Early.multiplier(),
            mature: base_yield * ProcessMaturity::Mature.multiplier(),
            optimized: base_yield * ProcessMaturity::Optimized.multiplier(),
        }
    }

    pub fn get(&self, maturity: ProcessMaturity) -> f64 {
        match maturity {
            ProcessMaturity::New => self.new,
            ProcessMaturity::Early => self.early,
            ProcessMaturity::Mature => self.mature,
            ProcessMaturity::Optimized => self.optimized,
        }
    }
}

/// Reticle and wafer packing for one die size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub dies_per_reticle_x: u32,
    pub dies_per_reticle_y: u32,
    pub dies_per_reticle: u32,
    pub reticle_shots_per_wafer: u32,
    pub dies_per_wafer: u32,
    /// Die area over usable wafer area, percent, capped at 100.
    pub wafer_area_utilization: f64,
}

/// Floors a packing ratio into a count; ratios past `u32::MAX` are rejected.
fn whole_count(ratio: f64) -> Result<u32, EconError> {
    let n = ratio.floor();
    if !n.is_finite() || n > f64::from(u32::MAX) {
        return Err(EconError::DegenerateGeometry);
    }
    Ok(n.max(0.0) as u32)
}

/// Packs dies into the reticle on a grid, then reticle shots into the usable disc.
///
/// A die larger than the reticle packs zero dies; that is a valid plan, not an
/// error.
pub fn batch_metrics(die: Dimensions, wafer_size_mm: f64, reticle: Dimensions) -> Result<BatchMetrics, EconError> {
    die.validate("die")?;
    reticle.validate("reticle")?;
    if !wafer_size_mm.is_finite() {
        return Err(EconError::NonFinite);
    }
    let usable_radius = wafer_size_mm / 2.0 - WAFER_EDGE_MARGIN_MM;
    if usable_radius <= 0.0 {
        return Err(EconError::InvalidWaferSize(wafer_size_mm));
    }

    let dies_per_reticle_x = whole_count(reticle.width / die.width)?;
    let dies_per_reticle_y = whole_count(reticle.height / die.height)?;
    let dies_per_reticle = dies_per_reticle_x
        .checked_mul(dies_per_reticle_y)
        .ok_or(EconError::DegenerateGeometry)?;

    let usable_area = PI * usable_radius * usable_radius;
    let reticle_shots_per_wafer = whole_count(usable_area / reticle.area() * RETICLE_PACKING_EFFICIENCY)?;
    let dies_per_wafer = dies_per_reticle
        .checked_mul(reticle_shots_per_wafer)
        .ok_or(EconError::DegenerateGeometry)?;
    let utilization = f64::from(dies_per_wafer) * die.area() / usable_area * 100.0;

    Ok(BatchMetrics {
        dies_per_reticle_x,
        dies_per_reticle_y,
        dies_per_reticle,
        reticle_shots_per_wafer,
        dies_per_wafer,
        wafer_area_utilization: utilization.min(100.0),
    })
}

/// A planned wafer run for one die design.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub name: String,
    pub die_id: DieId,
    pub die_sku: String,
    pub wafer_size_mm: f64,
    pub process_node: u32,
    pub reticle_size: Dimensions,
    pub metrics: BatchMetrics,
    /// Poisson yield `exp(-D·A)` at the node's defect density.
    pub base_yield: f64,
    pub yield_by_maturity: MaturityYields,
    pub cost_per_wafer_kusd: Decimal,
}

impl BatchPlan {
    /// Good dies per wafer at `maturity`, yield capped at 1.
    pub fn good_dies_per_wafer(&self, maturity: ProcessMaturity) -> f64 {
        f64::from(self.metrics.dies_per_wafer) * self.yield_by_maturity.get(maturity).min(1.0)
    }

    /// Wafer cost spread over the good dies, in k$. `None` when nothing yields.
    pub fn cost_per_good_die_kusd(&self, maturity: ProcessMaturity) -> Option<Decimal> {
        let good = Decimal::from_f64(self.good_dies_per_wafer(maturity))?;
        if good.is_zero() {
            return None;
        }
        Some(self.cost_per_wafer_kusd / good)
    }
}

/// Plans a batch of `die` on wafers of `wafer_size_mm` exposed through `reticle`.
pub fn plan_batch(
    name: impl Into<String>,
    die: &Die,
    wafer_size_mm: f64,
    reticle: Dimensions,
) -> Result<BatchPlan, EconError> {
    let metrics = batch_metrics(die.dimensions, wafer_size_mm, reticle)?;
    let defect_density = process_node_info(die.process_node).base_defect_density;
    let base_yield = (-defect_density * die.area() / 100.0).exp();
    let cost_per_wafer_kusd = wafer_cost_kusd(die.process_node);
    let name = name.into();

    debug!(
        batch = %name,
        sku = %die.sku,
        dies_per_wafer = metrics.dies_per_wafer,
        shots = metrics.reticle_shots_per_wafer,
        base_yield,
        "batch planned"
    );

    Ok(BatchPlan {
        name,
        die_id: die.id,
        die_sku: die.sku.clone(),
        wafer_size_mm,
        process_node: die.process_node,
        reticle_size: reticle,
        metrics,
        base_yield,
        yield_by_maturity: MaturityYields::from_base(base_yield),
        cost_per_wafer_kusd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::{DieType, DEFAULT_RETICLE};

    #[test]
    fn ten_mm_die_on_300mm_wafer() {
        let m = batch_metrics(Dimensions::new(10.0, 10.0), 300.0, DEFAULT_RETICLE).unwrap();
        assert_eq!((m.dies_per_reticle_x, m.dies_per_reticle_y), (2, 3));
        assert_eq!(m.dies_per_reticle, 6);
        assert_eq!(m.reticle_shots_per_wafer, 65);
        assert_eq!(m.dies_per_wafer, 390);
        assert!((m.wafer_area_utilization - 59.04).abs() < 0.01);
    }

    #[test]
    fn oversized_die_packs_nothing() {
        let m = batch_metrics(Dimensions::new(30.0, 30.0), 300.0, DEFAULT_RETICLE).unwrap();
        assert_eq!(m.dies_per_reticle, 0);
        assert_eq!(m.dies_per_wafer, 0);
        assert_eq!(m.wafer_area_utilization, 0.0);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(matches!(
            batch_metrics(Dimensions::new(0.0, 10.0), 300.0, DEFAULT_RETICLE),
            Err(EconError::Geometry(_))
        ));
        assert_eq!(
            batch_metrics(Dimensions::new(1.0, 1.0), 10.0, DEFAULT_RETICLE),
            Err(EconError::InvalidWaferSize(10.0))
        );
        assert_eq!(
            batch_metrics(Dimensions::new(1.0, 1.0), f64::NAN, DEFAULT_RETICLE),
            Err(EconError::NonFinite)
        );
    }

    #[test]
    fn microscopic_die_fails_instead_of_overflowing() {
        // 26000 x 33000 dies per reticle times 65 shots exceeds u32.
        assert_eq!(
            batch_metrics(Dimensions::new(0.001, 0.001), 300.0, DEFAULT_RETICLE),
            Err(EconError::DegenerateGeometry)
        );
        assert_eq!(
            batch_metrics(Dimensions::new(1e-12, 1.0), 300.0, DEFAULT_RETICLE),
            Err(EconError::DegenerateGeometry)
        );
        let m = batch_metrics(Dimensions::new(0.01, 0.01), 300.0, DEFAULT_RETICLE).unwrap();
        assert_eq!(m.dies_per_reticle, 2_600 * 3_300);
        assert_eq!(m.dies_per_wafer, 2_600 * 3_300 * 65);
    }

    #[test]
    fn maturity_multipliers_are_ordered() {
        let y = MaturityYields::from_base(0.8);
        assert_eq!(y.early, 0.8);
        assert!(y.new < y.early && y.early < y.mature && y.mature < y.optimized);
        for pair in ProcessMaturity::ALL.windows(2) {
            assert!(pair[0].multiplier() < pair[1].multiplier());
        }
    }

    #[test]
    fn wafer_cost_uses_nearest_node() {
        assert_eq!(wafer_cost_kusd(7), Decimal::new(30, 0));
        assert_eq!(wafer_cost_kusd(8), Decimal::new(30, 0));
        // Equidistant from 3 and 5: lower node wins.
        assert_eq!(wafer_cost_kusd(4), Decimal::new(50, 0));
        assert_eq!(wafer_cost_kusd(28), Decimal::new(12, 0));
        assert_eq!(wafer_cost_kusd(20000), Decimal::new(5, 2));
    }

    #[test]
    fn plan_for_seven_nm_die() {
        let die = Die::new("Plan", DieType::Cpu, Dimensions::new(10.0, 10.0), 7);
        let plan = plan_batch("Run A", &die, 300.0, DEFAULT_RETICLE).unwrap();
        assert_eq!(plan.name, "Run A");
        assert_eq!(plan.metrics.dies_per_wafer, 390);
        assert!((plan.base_yield - (-0.6f64).exp()).abs() < 1e-12);
        assert!((plan.yield_by_maturity.new - 0.75 * plan.base_yield).abs() < 1e-12);
        assert_eq!(plan.cost_per_wafer_kusd, Decimal::new(30, 0));
        let per_die = plan.cost_per_good_die_kusd(ProcessMaturity::Early).unwrap();
        assert!(per_die > Decimal::ZERO);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["metrics"]["dies_per_reticle"], 6);
    }

    #[test]
    fn no_good_dies_has_no_unit_cost() {
        let die = Die::new("Big", DieType::Gpu, Dimensions::new(30.0, 30.0), 7);
        let plan = plan_batch("Too big", &die, 300.0, DEFAULT_RETICLE).unwrap();
        assert_eq!(plan.cost_per_good_die_kusd(ProcessMaturity::Optimized), None);
    }

    proptest! {
        #[test]
        fn utilization_is_a_percentage(
            w in 0.5f64..40.0,
            h in 0.5f64..40.0,
            wafer in prop::sample::select(vec![100.0f64, 150.0, 200.0, 300.0, 450.0]),
        ) {
            let m = batch_metrics(Dimensions::new(w, h), wafer, DEFAULT_RETICLE).unwrap();
            prop_assert!((0.0..=100.0).contains(&m.wafer_area_utilization));
            prop_assert_eq!(m.dies_per_wafer, m.dies_per_reticle * m.reticle_shots_per_wafer);
        }

        #[test]
        fn tiny_dies_never_panic(w in 1e-6f64..0.5, h in 1e-6f64..0.5) {
            match batch_metrics(Dimensions::new(w, h), 450.0, DEFAULT_RETICLE) {
                Ok(m) => prop_assert_eq!(
                    u64::from(m.dies_per_wafer),
                    u64::from(m.dies_per_reticle) * u64::from(m.reticle_shots_per_wafer)
                ),
                Err(e) => prop_assert_eq!(e, EconError::DegenerateGeometry),
            }
        }
    }
}
