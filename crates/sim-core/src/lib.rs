#![deny(warnings)]

//! Core domain models and invariants for Silicon Tycoon.
//!
//! This crate defines the serializable die/component records, the compiled-in
//! physical constant tables, the component sizing model and the die library.
//! Engine crates (`sim-yield`, `sim-perf`) build on these types and share
//! [`ValidationError`] and [`SimConfig`].

pub mod library;
pub mod model;
pub mod sizing;
pub mod tables;

pub use library::{DieConfig, DieLibrary};
pub use model::{
    Component, ComponentCategory, ComponentType, Die, DieId, DieStats, DieType, Dimensions, Position,
    DEFAULT_RETICLE,
};
pub use tables::{nearest_key, ChipClass, ChipGrade, ThermalProfile};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for domain invariants and engine preconditions.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Width or height must be strictly positive.
    #[error("{0} dimensions must be > 0")]
    NonPositiveDimension(String),
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
    #[error("component {0} lies outside the die")]
    ComponentOutOfBounds(String),
    #[error("component {0} overlaps {1}")]
    ComponentOverlap(String, String),
    /// Die outline larger than its reticle field.
    #[error("die exceeds the reticle size")]
    ExceedsReticle,
    #[error("trial count must be > 0")]
    InvalidTrials,
    /// Process maturity outside [0, 100].
    #[error("process maturity {0} is outside [0, 100]")]
    InvalidMaturity(f64),
    #[error("defect density {0} must be finite and >= 0")]
    InvalidDefectDensity(f64),
    /// Edge exclusion must leave a usable radius.
    #[error("edge exclusion must be >= 0 and smaller than the wafer radius")]
    EdgeExclusionTooLarge,
    /// Die so small relative to the wafer that the placement grid is unbounded.
    #[error("wafer grid of {0} cells exceeds the placement limit")]
    GridTooLarge(f64),
    #[error("die not found: {0}")]
    DieNotFound(DieId),
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
    /// Monte Carlo trials per yield simulation (> 0).
    pub monte_carlo_trials: u32,
    /// Wafer edge exclusion ring in mm.
    pub edge_exclusion_mm: f64,
    /// Thermal limit the performance engine throttles against.
    pub thermal_profile: ThermalProfile,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            monte_carlo_trials: 1000,
            edge_exclusion_mm: 3.0,
            thermal_profile: ThermalProfile::ConsumerCpu,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.monte_carlo_trials == 0 {
            return Err(ValidationError::InvalidTrials);
        }
        if !self.edge_exclusion_mm.is_finite() {
            return Err(ValidationError::NonFinite);
        }
        if self.edge_exclusion_mm < 0.0 {
            return Err(ValidationError::EdgeExclusionTooLarge);
        }
        Ok(())
    }
}
