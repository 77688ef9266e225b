#![deny(warnings)]

//! Batch and market arithmetic for Silicon Tycoon.
//!
//! This crate provides validated helpers for:
//! - Reticle packing and dies per wafer for a fabrication batch
//! - Maturity-scaled yield and per-node wafer cost
//! - Foundry contract pricing, deposits and volume discounts
//! - Foundry capacity and node availability by year
//!
//! Money is carried as [`rust_decimal::Decimal`]; geometry and yields stay `f64`.

pub mod batch;
pub mod contract;
pub mod foundry;

pub use batch::{
    batch_metrics, plan_batch, wafer_cost_kusd, BatchMetrics, BatchPlan, MaturityYields, ProcessMaturity,
};
pub use contract::{base_wafer_price, contract_pricing, ContractPricing, ContractType};
pub use foundry::{available_foundries, available_nodes, foundry_by_id, interpolate_capacity, Foundry, FoundryTier};

use sim_core::ValidationError;
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Die or reticle geometry rejected by the core model.
    #[error(transparent)]
    Geometry(#[from] ValidationError),
    /// Wafer diameter must leave a usable area inside the 5 mm handling ring.
    #[error("wafer size {0} mm leaves no usable area")]
    InvalidWaferSize(f64),
    /// Prices and multipliers must be strictly positive.
    #[error("invalid price or multiplier value")]
    InvalidPrice,
    /// Die so small that its packing counts overflow.
    #[error("die too small to count per wafer")]
    DegenerateGeometry,
    #[error("unknown contract type: {0}")]
    UnknownContractType(String),
    /// Numeric conversion to or from `Decimal` failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}
