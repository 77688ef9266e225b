//! Compiled-in physical and market constant tables.
//!
//! Node-keyed tables are sparse slices sorted by node size in nm. Every lookup
//! goes through [`nearest_key`], so an absent node resolves to the closest one
//! listed rather than to an interpolated value. Ties resolve to the lower key.

use crate::model::ComponentType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry of the table whose key is closest to `target`.
///
/// Distance is `|key - target|`; on a tie the lower key wins, independent of
/// slice order. Returns `None` only for an empty table.
pub fn nearest_key<V>(table: &[(u32, V)], target: u32) -> Option<(u32, &V)> {
    table
        .iter()
        .min_by_key(|(k, _)| (k.abs_diff(target), *k))
        .map(|(k, v)| (*k, v))
}

/// Value at the nearest key, or `default` for an empty table.
pub fn nearest_value(table: &[(u32, f64)], target: u32, default: f64) -> f64 {
    nearest_key(table, target).map_or(default, |(_, v)| *v)
}

/// Transistor density, million transistors per mm².
pub const TRANSISTOR_DENSITY: &[(u32, f64)] = &[
    (3, 175.0),
    (5, 125.8),
    (7, 60.1),
    (10, 72.3),
    (12, 23.7),
    (14, 19.7),
    (22, 8.33),
    (32, 4.47),
    (45, 3.39),
    (65, 1.61),
    (90, 1.00),
    (130, 0.54),
    (180, 0.25),
    (250, 1.5),
    (350, 0.800),
    (600, 0.350),
    (800, 0.180),
    (1000, 0.100),
    (1500, 0.035),
    (3000, 0.010),
    (6000, 0.003),
    (10000, 0.001),
];

/// Maximum achievable clock in GHz.
pub const MAX_CLOCK_GHZ: &[(u32, f64)] = &[
    (3, 5.8),
    (5, 5.5),
    (7, 5.0),
    (10, 4.8),
    (12, 4.6),
    (14, 4.5),
    (22, 4.2),
    (32, 4.0),
    (45, 3.8),
    (65, 3.6),
    (90, 3.2),
    (130, 2.2),
    (180, 1.3),
    (250, 0.750),
    (350, 0.450),
    (600, 0.200),
    (800, 0.100),
    (1000, 0.050),
    (1500, 0.025),
    (3000, 0.008),
    (6000, 0.001),
    (10000, 0.0001),
];

/// Core supply voltage in volts.
pub const NODE_VOLTAGE: &[(u32, f64)] = &[
    (3, 0.65),
    (5, 0.70),
    (7, 0.72),
    (10, 0.75),
    (12, 0.80),
    (14, 0.85),
    (22, 0.9),
    (32, 0.9),
    (45, 1.0),
    (65, 1.0),
    (90, 1.0),
    (130, 1.2),
    (180, 1.5),
    (250, 1.8),
    (350, 2.5),
    (600, 2.5),
    (800, 2.5),
    (1000, 3.3),
    (1500, 3.3),
    (3000, 5.0),
    (6000, 5.0),
    (10000, 5.0),
];

/// Static leakage in W per million transistors.
pub const LEAKAGE_PER_MTR: &[(u32, f64)] = &[
    (3, 0.002),
    (5, 0.0025),
    (7, 0.003),
    (10, 0.004),
    (12, 0.007),
    (14, 0.006),
    (22, 0.005),
    (32, 0.004),
    (45, 0.0032),
    (65, 0.0024),
    (90, 0.0016),
    (130, 0.0008),
    (180, 0.0004),
    (250, 0.0005),
    (350, 0.0002),
    (600, 0.0001),
    (800, 0.00005),
    (1000, 0.00002),
    (1500, 0.00001),
    (3000, 0.000005),
    (6000, 0.000002),
    (10000, 0.000001),
];

/// Memory bandwidth per controller in GB/s, by DRAM generation.
pub const MEMORY_BANDWIDTH_PER_CONTROLLER: &[(u32, f64)] = &[
    (3, 85.3),
    (5, 68.3),
    (7, 51.2),
    (10, 42.7),
    (12, 38.4),
    (14, 34.1),
    (22, 25.6),
    (32, 21.3),
    (45, 17.0),
    (65, 12.8),
    (90, 10.6),
    (130, 6.4),
    (180, 3.2),
];

/// Component footprint scale relative to the 14 nm base sizes.
pub const NODE_SCALE_FACTOR: &[(u32, f64)] = &[
    (3, 0.2),
    (5, 0.25),
    (7, 0.3),
    (10, 0.35),
    (12, 0.38),
    (14, 0.4),
    (22, 0.45),
    (32, 0.5),
    (45, 0.6),
    (65, 0.7),
    (90, 0.85),
    (130, 1.0),
    (180, 1.3),
    (250, 1.8),
    (350, 2.5),
    (600, 4.0),
    (800, 5.5),
    (1000, 7.0),
    (1500, 11.0),
    (3000, 21.0),
    (6000, 42.0),
    (10000, 70.0),
];

pub const DEFAULT_DENSITY: f64 = 60.1;
pub const DEFAULT_MAX_CLOCK_GHZ: f64 = 5.0;
pub const DEFAULT_VOLTAGE: f64 = 0.75;
pub const DEFAULT_LEAKAGE_PER_MTR: f64 = 0.003;
pub const DEFAULT_BANDWIDTH_GBPS: f64 = 25.6;

pub fn transistor_density(node: u32) -> f64 {
    nearest_value(TRANSISTOR_DENSITY, node, DEFAULT_DENSITY)
}

pub fn max_clock_ghz(node: u32) -> f64 {
    nearest_value(MAX_CLOCK_GHZ, node, DEFAULT_MAX_CLOCK_GHZ)
}

pub fn node_voltage(node: u32) -> f64 {
    nearest_value(NODE_VOLTAGE, node, DEFAULT_VOLTAGE)
}

pub fn leakage_per_mtr(node: u32) -> f64 {
    nearest_value(LEAKAGE_PER_MTR, node, DEFAULT_LEAKAGE_PER_MTR)
}

pub fn memory_bandwidth_per_controller(node: u32) -> f64 {
    nearest_value(MEMORY_BANDWIDTH_PER_CONTROLLER, node, DEFAULT_BANDWIDTH_GBPS)
}

pub fn node_scale_factor(node: u32) -> f64 {
    nearest_value(NODE_SCALE_FACTOR, node, 1.0)
}

/// Historical process node with its early-production defect density.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ProcessNodeInfo {
    pub node: u32,
    pub label: &'static str,
    pub year: i32,
    /// Defects per cm².
    pub base_defect_density: f64,
}

const fn pn(node: u32, label: &'static str, year: i32, base_defect_density: f64) -> (u32, ProcessNodeInfo) {
    (
        node,
        ProcessNodeInfo {
            node,
            label,
            year,
            base_defect_density,
        },
    )
}

pub const PROCESS_NODES: &[(u32, ProcessNodeInfo)] = &[
    pn(3, "3nm", 2022, 0.80),
    pn(5, "5nm", 2020, 0.70),
    pn(7, "7nm", 2018, 0.60),
    pn(10, "10nm", 2016, 0.55),
    pn(12, "12nm", 2017, 0.50),
    pn(14, "14nm", 2014, 0.45),
    pn(22, "22nm", 2012, 0.40),
    pn(32, "32nm", 2010, 0.35),
    pn(45, "45nm", 2008, 0.30),
    pn(65, "65nm", 2006, 0.25),
    pn(90, "90nm", 2004, 0.20),
    pn(130, "130nm", 2001, 0.18),
    pn(180, "180nm", 1999, 0.15),
    pn(250, "250nm", 1997, 0.25),
    pn(350, "350nm", 1995, 0.22),
    pn(600, "600nm", 1994, 0.20),
    pn(800, "800nm", 1989, 0.18),
    pn(1000, "1μm", 1985, 0.15),
    pn(1500, "1.5μm", 1982, 0.12),
    pn(3000, "3μm", 1977, 0.10),
    pn(6000, "6μm", 1974, 0.08),
    pn(10000, "10μm", 1971, 0.05),
];

/// 7 nm entry, used when the table lookup comes back empty.
pub const FALLBACK_PROCESS_NODE: ProcessNodeInfo = ProcessNodeInfo {
    node: 7,
    label: "7nm",
    year: 2018,
    base_defect_density: 0.60,
};

pub fn process_node_info(node: u32) -> ProcessNodeInfo {
    nearest_key(PROCESS_NODES, node).map_or(FALLBACK_PROCESS_NODE, |(_, info)| *info)
}

/// Transistor density multiplier of a component type relative to the node baseline.
pub fn density_multiplier(t: ComponentType) -> f64 {
    use ComponentType::*;
    match t {
        CpuCore => 1.2,
        GpuSm => 0.9,
        L2Cache => 1.5,
        L3Cache => 1.3,
        MemoryArray => 1.6,
        MemCtrl => 0.7,
        IoCtrl => 0.6,
        Interconnect => 0.5,
        PowerMgmt => 0.4,
        Igpu => 0.9,
        TextureUnit => 0.9,
        DisplayEngine => 0.8,
        ControlLogic => 0.8,
        Npu => 1.0,
    }
}

/// Fraction of transistors switching per cycle.
pub fn activity_factor(t: ComponentType) -> f64 {
    use ComponentType::*;
    match t {
        GpuSm => 0.45,
        CpuCore | Igpu | Npu => 0.40,
        TextureUnit => 0.35,
        Interconnect => 0.30,
        MemCtrl | ControlLogic => 0.25,
        IoCtrl | DisplayEngine => 0.20,
        L2Cache => 0.15,
        L3Cache | MemoryArray | PowerMgmt => 0.10,
    }
}

/// Cooling envelope a die is designed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThermalProfile {
    #[default]
    ConsumerCpu,
    ServerCpu,
    LaptopCpu,
    Gpu,
    MobileSoc,
}

impl ThermalProfile {
    /// Sustainable power density in W/mm².
    pub fn limit_w_per_mm2(self) -> f64 {
        match self {
            ThermalProfile::ConsumerCpu => 1.00,
            ThermalProfile::ServerCpu => 1.20,
            ThermalProfile::LaptopCpu => 0.60,
            ThermalProfile::Gpu => 0.65,
            ThermalProfile::MobileSoc => 0.40,
        }
    }
}

/// How sensitive a link is to wire delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatencyClass {
    Critical,
    High,
    Medium,
    Low,
}

impl LatencyClass {
    pub fn weight(self) -> f64 {
        match self {
            LatencyClass::Critical => 1.0,
            LatencyClass::High => 0.5,
            LatencyClass::Medium => 0.25,
            LatencyClass::Low => 0.1,
        }
    }
}

/// A component's need to talk to the nearest block of `target` type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterconnectRequirement {
    pub target: ComponentType,
    pub bandwidth_gbps: f64,
    pub latency: LatencyClass,
}

const fn link(target: ComponentType, bandwidth_gbps: f64, latency: LatencyClass) -> InterconnectRequirement {
    InterconnectRequirement {
        target,
        bandwidth_gbps,
        latency,
    }
}

/// Links a component type needs; empty for types with no requirements.
pub fn interconnect_requirements(t: ComponentType) -> &'static [InterconnectRequirement] {
    use ComponentType::*;
    use LatencyClass::*;
    const CPU_CORE: &[InterconnectRequirement] = &[
        link(L2Cache, 500.0, Critical),
        link(L3Cache, 200.0, High),
        link(MemCtrl, 50.0, Medium),
        link(Interconnect, 100.0, High),
        link(PowerMgmt, 1.0, Low),
    ];
    const GPU_SM: &[InterconnectRequirement] = &[
        link(L2Cache, 300.0, High),
        link(MemCtrl, 200.0, Critical),
        link(TextureUnit, 400.0, Critical),
        link(Interconnect, 150.0, High),
    ];
    const IGPU: &[InterconnectRequirement] = &[
        link(L2Cache, 200.0, High),
        link(MemCtrl, 150.0, Critical),
        link(Interconnect, 100.0, Medium),
    ];
    const L3: &[InterconnectRequirement] = &[link(MemCtrl, 100.0, Medium), link(Interconnect, 50.0, Medium)];
    match t {
        CpuCore => CPU_CORE,
        GpuSm => GPU_SM,
        Igpu => IGPU,
        L3Cache => L3,
        _ => &[],
    }
}

/// Performance tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipClass {
    #[serde(rename = "Low-Power")]
    LowPower,
    Budget,
    #[serde(rename = "Mid-Range")]
    MidRange,
    #[serde(rename = "High-End")]
    HighEnd,
    Halo,
}

impl ChipClass {
    pub fn label(self) -> &'static str {
        match self {
            ChipClass::LowPower => "Low-Power",
            ChipClass::Budget => "Budget",
            ChipClass::MidRange => "Mid-Range",
            ChipClass::HighEnd => "High-End",
            ChipClass::Halo => "Halo",
        }
    }
}

impl fmt::Display for ChipClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Market segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChipGrade {
    #[serde(rename = "Military/Aerospace")]
    Military,
    #[serde(rename = "Enterprise/Server")]
    Enterprise,
    Workstation,
    Consumer,
}

impl ChipGrade {
    pub fn label(self) -> &'static str {
        match self {
            ChipGrade::Military => "Military/Aerospace",
            ChipGrade::Enterprise => "Enterprise/Server",
            ChipGrade::Workstation => "Workstation",
            ChipGrade::Consumer => "Consumer",
        }
    }
}

impl fmt::Display for ChipGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Core-count and TDP window of a performance tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassTier {
    pub class: ChipClass,
    pub cores: (u32, u32),
    pub tdp_w: (f64, f64),
}

/// Tiers in evaluation order; earlier tiers win ties.
pub const CLASS_TIERS: [ClassTier; 5] = [
    ClassTier {
        class: ChipClass::LowPower,
        cores: (1, 2),
        tdp_w: (0.0, 15.0),
    },
    ClassTier {
        class: ChipClass::Budget,
        cores: (2, 4),
        tdp_w: (15.0, 80.0),
    },
    ClassTier {
        class: ChipClass::MidRange,
        cores: (4, 8),
        tdp_w: (60.0, 125.0),
    },
    ClassTier {
        class: ChipClass::HighEnd,
        cores: (8, 16),
        tdp_w: (100.0, 200.0),
    },
    ClassTier {
        class: ChipClass::Halo,
        cores: (16, 256),
        tdp_w: (180.0, 1000.0),
    },
];

/// Ratio windows a die must satisfy to qualify for a grade. `None` means unchecked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradeCriteria {
    pub grade: ChipGrade,
    pub cores_per_controller: Option<(f64, f64)>,
    pub l3_per_core_mm2: Option<(f64, f64)>,
    pub power_mgmt_ratio: Option<(f64, f64)>,
    /// Oldest-allowed lower bound: the node must be at least this many nm.
    pub min_process_node: Option<u32>,
    /// Ceiling on base clock / max node clock.
    pub max_clock_ratio: Option<f64>,
}

/// Grades in priority order; Consumer is the fallback and has no entry.
pub const GRADE_CRITERIA: [GradeCriteria; 3] = [
    GradeCriteria {
        grade: ChipGrade::Military,
        cores_per_controller: Some((2.0, 6.0)),
        l3_per_core_mm2: Some((1.0, 4.0)),
        power_mgmt_ratio: Some((0.12, 0.30)),
        min_process_node: Some(22),
        max_clock_ratio: Some(0.7),
    },
    GradeCriteria {
        grade: ChipGrade::Enterprise,
        cores_per_controller: Some((1.5, 4.0)),
        l3_per_core_mm2: Some((3.0, 8.0)),
        // Enterprise grading never checks power management; the 0.03..0.08 band is unused.
        power_mgmt_ratio: None,
        min_process_node: None,
        max_clock_ratio: None,
    },
    GradeCriteria {
        grade: ChipGrade::Workstation,
        cores_per_controller: Some((2.0, 5.0)),
        l3_per_core_mm2: Some((2.0, 4.0)),
        power_mgmt_ratio: Some((0.05, 0.10)),
        min_process_node: None,
        max_clock_ratio: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_keys_resolve_to_themselves() {
        assert_eq!(transistor_density(7), 60.1);
        assert_eq!(max_clock_ghz(14), 4.5);
        assert_eq!(node_voltage(10), 0.75);
        assert_eq!(process_node_info(22).label, "22nm");
    }

    #[test]
    fn absent_nodes_use_nearest() {
        // 28 is 6 from 22 and 4 from 32.
        assert_eq!(max_clock_ghz(28), 4.0);
        // 16 nm sits 2 from 14 and 6 from 22.
        assert_eq!(node_voltage(16), 0.85);
        // Bandwidth table stops at 180 nm.
        assert_eq!(memory_bandwidth_per_controller(10000), 3.2);
    }

    #[test]
    fn ties_go_to_the_lower_key() {
        // 6 is equidistant from 5 and 7.
        assert_eq!(nearest_key(TRANSISTOR_DENSITY, 6).map(|(k, _)| k), Some(5));
        let reversed: Vec<(u32, f64)> = TRANSISTOR_DENSITY.iter().rev().copied().collect();
        assert_eq!(nearest_key(&reversed, 6).map(|(k, _)| k), Some(5));
    }

    #[test]
    fn empty_table_falls_back() {
        assert_eq!(nearest_value(&[], 7, 1.5), 1.5);
        assert!(nearest_key::<f64>(&[], 7).is_none());
    }

    #[test]
    fn tables_are_sorted_and_sized() {
        for table in [
            TRANSISTOR_DENSITY,
            MAX_CLOCK_GHZ,
            NODE_VOLTAGE,
            LEAKAGE_PER_MTR,
            NODE_SCALE_FACTOR,
        ] {
            assert_eq!(table.len(), 22);
            assert!(table.windows(2).all(|w| w[0].0 < w[1].0));
        }
        assert_eq!(PROCESS_NODES.len(), 22);
    }

    #[test]
    fn activity_factors_in_band() {
        for t in ComponentType::ALL {
            let a = activity_factor(t);
            assert!((0.10..=0.45).contains(&a), "{t:?} -> {a}");
        }
    }

    proptest! {
        #[test]
        fn nearest_key_minimizes_distance(target in 0u32..20_000) {
            let (k, _) = nearest_key(MAX_CLOCK_GHZ, target).unwrap();
            let best = MAX_CLOCK_GHZ.iter().map(|(key, _)| key.abs_diff(target)).min().unwrap();
            prop_assert_eq!(k.abs_diff(target), best);
            // No lower key at the same distance.
            prop_assert!(MAX_CLOCK_GHZ.iter().all(|(key, _)| key.abs_diff(target) > best || *key >= k));
        }
    }
}
