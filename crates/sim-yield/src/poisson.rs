//! Poisson defect sampling shared by the Monte Carlo and wafer engines.

use rand::Rng;
use sim_core::ValidationError;
use std::f64::consts::TAU;

/// Fraction of the base defect density removed at 100 % maturity.
pub const MATURITY_REDUCTION_FACTOR: f64 = 0.90;
/// Floor on effective defect density, defects/cm².
pub const MIN_DEFECT_DENSITY: f64 = 0.01;
/// Above this mean the sampler switches to the normal approximation.
pub const NORMAL_APPROX_THRESHOLD: f64 = 10.0;

/// Expected defects (Poisson λ) for an area in mm² at a density in defects/cm².
pub fn expected_defects(area_mm2: f64, defects_per_cm2: f64) -> f64 {
    area_mm2 / 100.0 * defects_per_cm2
}

/// Defect density after process maturity, floored at [`MIN_DEFECT_DENSITY`].
pub fn effective_defect_density(base: f64, maturity_percent: f64) -> Result<f64, ValidationError> {
    check_defect_density(base)?;
    if !(0.0..=100.0).contains(&maturity_percent) {
        return Err(ValidationError::InvalidMaturity(maturity_percent));
    }
    let reduction = maturity_percent / 100.0 * MATURITY_REDUCTION_FACTOR;
    Ok((base * (1.0 - reduction)).max(MIN_DEFECT_DENSITY))
}

pub(crate) fn check_defect_density(d: f64) -> Result<(), ValidationError> {
    if d.is_finite() && d >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidDefectDensity(d))
    }
}

/// Draws a defect count with mean `lambda`.
///
/// Inverse-transform sampling below [`NORMAL_APPROX_THRESHOLD`], otherwise a
/// Box-Muller normal approximation rounded to the nearest count and floored at zero.
/// Non-positive or non-finite means yield zero.
pub fn sample_poisson<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    if !(lambda.is_finite() && lambda > 0.0) {
        return 0;
    }
    if lambda < NORMAL_APPROX_THRESHOLD {
        inverse_transform(lambda, rng)
    } else {
        let z = standard_normal(rng);
        (lambda + lambda.sqrt() * z).round().max(0.0) as u32
    }
}

fn inverse_transform<R: Rng + ?Sized>(lambda: f64, rng: &mut R) -> u32 {
    let u: f64 = rng.gen();
    let mut k = 0u32;
    let mut p = (-lambda).exp();
    let mut cdf = p;
    // p underflows long before k gets large for lambda < 10.
    while u > cdf && p > 0.0 {
        k += 1;
        p *= lambda / f64::from(k);
        cdf += p;
    }
    k
}

fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0,1) keeps u1 away from zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
