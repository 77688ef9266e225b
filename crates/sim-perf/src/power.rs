//! Transistor budget, power model and thermal throttling.

use serde::{Deserialize, Serialize};
use sim_core::tables::{activity_factor, density_multiplier, leakage_per_mtr, node_voltage, transistor_density};
use sim_core::{Component, Die};

/// Voltage the dynamic power constant is calibrated at.
pub const REFERENCE_VOLTAGE: f64 = 0.75;
/// Watts per billion transistors at 1 GHz and the reference voltage.
pub const WATTS_PER_BTR_GHZ: f64 = 10.0;

/// Million transistors in one component.
pub fn component_transistors(c: &Component, process_node: u32) -> f64 {
    c.area() * transistor_density(process_node) * density_multiplier(c.component_type)
}

/// Million transistors across the die.
pub fn total_transistors(die: &Die) -> f64 {
    die.components
        .iter()
        .map(|c| component_transistors(c, die.process_node))
        .sum()
}

/// Power split at one clock.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerBreakdown {
    pub dynamic_w: f64,
    pub leakage_w: f64,
    pub total_w: f64,
    pub voltage: f64,
}

/// Per-component switching power plus node leakage at `clock_ghz`.
pub fn power_at(die: &Die, clock_ghz: f64, total_mtr: f64) -> PowerBreakdown {
    let voltage = node_voltage(die.process_node);
    let v_scale = (voltage / REFERENCE_VOLTAGE).powi(2);
    let dynamic_w: f64 = die
        .components
        .iter()
        .map(|c| {
            component_transistors(c, die.process_node) / 1000.0
                * WATTS_PER_BTR_GHZ
                * v_scale
                * clock_ghz
                * activity_factor(c.component_type)
        })
        .sum();
    let leakage_w = total_mtr * leakage_per_mtr(die.process_node);
    PowerBreakdown {
        dynamic_w,
        leakage_w,
        total_w: dynamic_w + leakage_w,
        voltage,
    }
}

/// Outcome of comparing power density against a thermal limit.
#[derive(Clone, Debug, PartialEq)]
pub struct ThermalCheck {
    pub power_density: f64,
    pub limit: f64,
    /// `limit / power_density` when over the limit, else 1.0.
    pub throttle_ratio: f64,
    pub warning: Option<String>,
}

impl ThermalCheck {
    pub fn throttled(&self) -> bool {
        self.warning.is_some()
    }
}

pub fn check_thermal(tdp_w: f64, die_area_mm2: f64, limit_w_per_mm2: f64) -> ThermalCheck {
    let power_density = tdp_w / die_area_mm2;
    if power_density > limit_w_per_mm2 {
        ThermalCheck {
            power_density,
            limit: limit_w_per_mm2,
            throttle_ratio: limit_w_per_mm2 / power_density,
            warning: Some(format!(
                "Power density {power_density:.2} W/mm² exceeds {limit_w_per_mm2:.2} W/mm² limit"
            )),
        }
    } else {
        ThermalCheck {
            power_density,
            limit: limit_w_per_mm2,
            throttle_ratio: 1.0,
            warning: None,
        }
    }
}
