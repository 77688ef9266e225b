//! Per-die Monte Carlo defect simulation and the closed-form yield estimate.

use crate::poisson::{check_defect_density, expected_defects, sample_poisson};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{ComponentType, Die, ValidationError};
use std::collections::BTreeMap;
use tracing::debug;

/// Share of blank-area-only defective dies recovered by binning.
pub const BLANK_SALVAGE_RATE: f64 = 0.5;
/// Yield floor used when turning yield into a cost multiplier.
pub const MIN_COST_YIELD: f64 = 0.3;

/// Outcome tallies of [`simulate_defects`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefectSimulation {
    /// Trials with zero defects.
    pub perfect_dies: u32,
    /// Trials with defects that all landed in blank space.
    pub binnable_dies: u32,
    /// Trials where a defect hit a component.
    pub failed_dies: u32,
    pub total_simulations: u32,
    pub perfect_yield: f64,
    /// (perfect + binnable) / trials.
    pub effective_yield: f64,
    /// Poisson mean per die.
    pub expected_defects: f64,
    pub blank_area_percent: f64,
    /// First-hit counts per component type, over all failed trials.
    pub component_hits: BTreeMap<ComponentType, u32>,
}

/// Closed-form yield of a die at a defect density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TheoreticalYield {
    /// `exp(-D * A)`.
    pub base_yield: f64,
    /// Base yield plus half of the blank-area-only defective dies.
    pub effective_yield: f64,
}

fn blank_fraction(die: &Die) -> f64 {
    let area = die.area();
    if area > 0.0 {
        (1.0 - die.components_area() / area).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Closed-form Poisson yield with binning credit for blank-area defects.
pub fn theoretical_yield(die: &Die, defect_density: f64) -> Result<TheoreticalYield, ValidationError> {
    die.dimensions.validate("die")?;
    check_defect_density(defect_density)?;
    let base_yield = (-expected_defects(die.area(), defect_density)).exp();
    let effective_yield = base_yield + (1.0 - base_yield) * blank_fraction(die) * BLANK_SALVAGE_RATE;
    Ok(TheoreticalYield {
        base_yield,
        effective_yield,
    })
}

/// Murphy's clustered-defect yield `((1 - e^-DA) / DA)^alpha`; 1.0 when `DA` is zero.
pub fn murphy_yield(area_cm2: f64, defect_density: f64, alpha: f64) -> f64 {
    let da = defect_density * area_cm2;
    if da <= 0.0 {
        return 1.0;
    }
    ((1.0 - (-da).exp()) / da).powf(alpha)
}

/// Relative unit cost of a die given its yield; yields below 30 % are floored.
pub fn cost_multiplier(yield_fraction: f64) -> f64 {
    1.0 / yield_fraction.max(MIN_COST_YIELD)
}

/// Runs `trials` independent defect draws over `die`.
///
/// Each trial samples a Poisson defect count, then drops each defect on a
/// uniform point of the die. Points inside the components' cumulative area
/// mark the trial failed and end it; the remaining defects of that trial are
/// not drawn.
pub fn simulate_defects<R: Rng + ?Sized>(
    die: &Die,
    defect_density: f64,
    trials: u32,
    rng: &mut R,
) -> Result<DefectSimulation, ValidationError> {
    if trials == 0 {
        return Err(ValidationError::InvalidTrials);
    }
    die.validate_geometry()?;
    check_defect_density(defect_density)?;

    let die_area = die.area();
    let covered = die.components_area();
    let lambda = expected_defects(die_area, defect_density);

    let mut perfect = 0u32;
    let mut binnable = 0u32;
    let mut failed = 0u32;
    let mut hits = [0u32; ComponentType::ALL.len()];

    for _ in 0..trials {
        let defects = sample_poisson(lambda, rng);
        if defects == 0 {
            perfect += 1;
            continue;
        }
        let mut hit = None;
        for _ in 0..defects {
            let r = rng.gen::<f64>() * die_area;
            if r < covered {
                hit = Some(component_at(die, r));
                break;
            }
        }
        match hit {
            Some(t) => {
                failed += 1;
                hits[type_index(t)] += 1;
            }
            None => binnable += 1,
        }
    }

    let n = f64::from(trials);
    let component_hits = ComponentType::ALL
        .iter()
        .zip(hits)
        .filter(|(_, count)| *count > 0)
        .map(|(t, count)| (*t, count))
        .collect();
    let sim = DefectSimulation {
        perfect_dies: perfect,
        binnable_dies: binnable,
        failed_dies: failed,
        total_simulations: trials,
        perfect_yield: f64::from(perfect) / n,
        effective_yield: f64::from(perfect + binnable) / n,
        expected_defects: lambda,
        blank_area_percent: blank_fraction(die) * 100.0,
        component_hits,
    };
    debug!(
        sku = %die.sku,
        lambda,
        perfect,
        binnable,
        failed,
        "monte carlo defect simulation"
    );
    Ok(sim)
}

/// Component owning offset `r` along the cumulative component area.
fn component_at(die: &Die, r: f64) -> ComponentType {
    let mut acc = 0.0;
    for c in &die.components {
        acc += c.area();
        if r < acc {
            return c.component_type;
        }
    }
    // Only reachable through float drift at the very end of the range.
    die.components
        .last()
        .map_or(ComponentType::CpuCore, |c| c.component_type)
}

fn type_index(t: ComponentType) -> usize {
    ComponentType::ALL.iter().position(|x| *x == t).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{Component, DieType, Dimensions, Position};

    fn die_with_cover(side: f64, covered_w: f64) -> Die {
        let mut die = Die::new("T", DieType::Cpu, Dimensions::new(side, side), 7);
        if covered_w > 0.0 {
            die = die.with_component(Component::new(
                ComponentType::CpuCore,
                "CPU Core 0",
                Position::default(),
                Dimensions::new(covered_w, side),
            ));
        }
        die
    }

    #[test]
    fn tallies_sum_to_trials() {
        let die = die_with_cover(10.0, 5.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sim = simulate_defects(&die, 0.6, 1000, &mut rng).unwrap();
        assert_eq!(sim.perfect_dies + sim.binnable_dies + sim.failed_dies, 1000);
        assert_eq!(sim.total_simulations, 1000);
        assert!((sim.blank_area_percent - 50.0).abs() < 1e-9);
        assert!((sim.expected_defects - 0.6).abs() < 1e-12);
        assert_eq!(sim.component_hits.get(&ComponentType::CpuCore).copied(), Some(sim.failed_dies));
        let json = serde_json::to_string(&sim).unwrap();
        assert!(json.contains("\"component_hits\":{\"cpu_core\":"));
    }

    #[test]
    fn blank_die_never_fails() {
        let die = die_with_cover(10.0, 0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sim = simulate_defects(&die, 2.0, 500, &mut rng).unwrap();
        assert_eq!(sim.failed_dies, 0);
        assert_eq!(sim.effective_yield, 1.0);
        assert!(sim.component_hits.is_empty());
    }

    #[test]
    fn zero_density_is_all_perfect() {
        let die = die_with_cover(10.0, 10.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sim = simulate_defects(&die, 0.0, 200, &mut rng).unwrap();
        assert_eq!(sim.perfect_dies, 200);
        assert_eq!(sim.perfect_yield, 1.0);
    }

    #[test]
    fn fully_covered_die_converges_to_closed_form() {
        let die = die_with_cover(10.0, 10.0);
        let closed = theoretical_yield(&die, 0.8).unwrap();
        assert_eq!(closed.base_yield, closed.effective_yield);
        for seed in 0..4 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_defects(&die, 0.8, 20_000, &mut rng).unwrap();
            assert!(
                (sim.effective_yield - closed.base_yield).abs() < 0.015,
                "seed {seed}: {} vs {}",
                sim.effective_yield,
                closed.base_yield
            );
        }
    }

    #[test]
    fn rejects_bad_input() {
        let die = die_with_cover(10.0, 5.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(simulate_defects(&die, 0.5, 0, &mut rng), Err(ValidationError::InvalidTrials));
        assert!(simulate_defects(&die, f64::NAN, 10, &mut rng).is_err());
        let flat = die_with_cover(0.0, 0.0);
        assert!(simulate_defects(&flat, 0.5, 10, &mut rng).is_err());
    }

    #[test]
    fn theoretical_credits_half_of_blank_defects() {
        let die = die_with_cover(10.0, 5.0);
        let t = theoretical_yield(&die, 1.0).unwrap();
        let base = (-1.0f64).exp();
        assert!((t.base_yield - base).abs() < 1e-12);
        assert!((t.effective_yield - (base + (1.0 - base) * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn cost_multiplier_floors_yield() {
        assert_eq!(cost_multiplier(1.0), 1.0);
        assert_eq!(cost_multiplier(0.5), 2.0);
        assert!((cost_multiplier(0.1) - 1.0 / 0.3).abs() < 1e-12);
        assert!((cost_multiplier(0.0) - 1.0 / 0.3).abs() < 1e-12);
    }

    #[test]
    fn murphy_matches_limits() {
        assert_eq!(murphy_yield(1.0, 0.0, 3.0), 1.0);
        let y = murphy_yield(1.0, 0.5, 1.0);
        assert!((y - (1.0 - (-0.5f64).exp()) / 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn yields_are_fractions(cover in 0.0f64..10.0, density in 0.0f64..5.0, seed in any::<u64>()) {
            let die = die_with_cover(10.0, cover);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sim = simulate_defects(&die, density, 200, &mut rng).unwrap();
            prop_assert!(sim.perfect_yield <= sim.effective_yield);
            prop_assert!((0.0..=1.0).contains(&sim.effective_yield));
            prop_assert_eq!(sim.perfect_dies + sim.binnable_dies + sim.failed_dies, 200);
        }
    }
}
