#![deny(warnings)]

//! Manufacturing yield models.
//!
//! Two distinct engines share one Poisson sampler:
//! - [`simulate_defects`] hit-tests defects against a die's component layout
//!   (one trial ends at the first component hit);
//! - [`place_dies`] tiles a wafer and buckets every die by its full defect count.

pub mod monte_carlo;
pub mod poisson;
pub mod wafer;

pub use monte_carlo::{
    cost_multiplier, murphy_yield, simulate_defects, theoretical_yield, DefectSimulation, TheoreticalYield,
};
pub use poisson::{effective_defect_density, expected_defects, sample_poisson};
pub use wafer::{
    die_fits_in_wafer, functionality, in_edge_exclusion, place_dies, PlacedDie, WaferConfig, WaferPlacement,
    YieldBreakdown, YieldCategory,
};
