//! YAML scenario files.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use sim_core::tables::process_node_info;
use sim_core::{Die, DieLibrary, Dimensions, SimConfig, DEFAULT_RETICLE};
use sim_econ::{ContractType, ProcessMaturity};
use sim_yield::WaferConfig;
use std::path::Path;

/// Scenario used when no `--scenario` is given.
pub const BUILTIN: &str = include_str!("../scenarios/default.yaml");

/// A die either picked from the sample library by SKU or written out in full.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DieSource {
    Library { library: String },
    Inline(Box<Die>),
}

/// Wafer plan settings; die size and node always come from the die.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WaferSection {
    pub wafer_diameter_mm: Option<f64>,
    /// Defaults to the node's early-production density.
    pub base_defect_density: Option<f64>,
    pub process_maturity: Option<f64>,
    pub edge_exclusion_mm: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BatchSection {
    pub name: String,
    pub wafer_size_mm: f64,
    pub reticle: Dimensions,
    pub maturity: ProcessMaturity,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            name: "Unnamed Batch".into(),
            wafer_size_mm: 300.0,
            reticle: DEFAULT_RETICLE,
            maturity: ProcessMaturity::Early,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContractSection {
    pub foundry: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub wafers_per_week: u32,
    pub weeks: u32,
    /// When set, the foundry must offer the die's node in this year.
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: SimConfig,
    pub die: DieSource,
    #[serde(default)]
    pub wafer: WaferSection,
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub contract: Option<ContractSection>,
}

impl Scenario {
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid scenario YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn resolve_die(&self, library: &DieLibrary) -> Result<Die> {
        match &self.die {
            DieSource::Inline(die) => {
                die.validate_layout()?;
                Ok(die.as_ref().clone())
            }
            DieSource::Library { library: sku } => library
                .all()
                .iter()
                .find(|d| d.sku == *sku)
                .cloned()
                .ok_or_else(|| anyhow!("no library die with SKU {sku:?}")),
        }
    }

    /// Wafer plan for `die`, with unset fields taken from the die, its node
    /// and the batch section.
    pub fn wafer_config(&self, die: &Die) -> WaferConfig {
        let w = &self.wafer;
        WaferConfig {
            wafer_diameter_mm: w.wafer_diameter_mm.unwrap_or(self.batch.wafer_size_mm),
            die_width_mm: die.dimensions.width,
            die_height_mm: die.dimensions.height,
            process_node: die.process_node,
            base_defect_density: w
                .base_defect_density
                .unwrap_or_else(|| process_node_info(die.process_node).base_defect_density),
            process_maturity: w.process_maturity.unwrap_or(WaferConfig::default().process_maturity),
            edge_exclusion_mm: w.edge_exclusion_mm.unwrap_or(self.config.edge_exclusion_mm),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if let Some(c) = &self.contract {
            if c.wafers_per_week == 0 || c.weeks == 0 {
                bail!("contract needs at least one wafer per week for at least one week");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn library() -> DieLibrary {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        DieLibrary::with_default_dies(now).unwrap()
    }

    #[test]
    fn builtin_scenario_resolves() {
        let s = Scenario::parse(BUILTIN).unwrap();
        s.validate().unwrap();
        let die = s.resolve_die(&library()).unwrap();
        assert_eq!(die.sku, "Example 8-Core CPU");
        let wafer = s.wafer_config(&die);
        assert_eq!(wafer.die_width_mm, 12.0);
        assert_eq!(wafer.process_node, 7);
        assert_eq!(wafer.base_defect_density, 0.6);
        assert!(s.contract.is_some());
    }

    #[test]
    fn bundled_scenarios_parse() {
        for text in [
            include_str!("../scenarios/gpu_spot.yaml"),
            include_str!("../scenarios/custom_die.yaml"),
        ] {
            let s = Scenario::parse(text).unwrap();
            s.validate().unwrap();
            s.resolve_die(&library()).unwrap();
        }
    }

    #[test]
    fn minimal_inline_die() {
        let yaml = r#"
die:
  sku: Tiny
  type: cpu
  dimensions: { width: 4.0, height: 4.0 }
  process_node: 22
  components:
    - type: cpu_core
      name: CPU Core 0
      position: { x: 0.0, y: 0.0 }
      dimensions: { width: 2.0, height: 2.0 }
wafer:
  process_maturity: 90
"#;
        let s = Scenario::parse(yaml).unwrap();
        assert_eq!(s.config, SimConfig::default());
        assert_eq!(s.batch.wafer_size_mm, 300.0);
        let die = s.resolve_die(&library()).unwrap();
        assert_eq!(die.components.len(), 1);
        let wafer = s.wafer_config(&die);
        assert_eq!(wafer.process_maturity, 90.0);
        assert_eq!(wafer.edge_exclusion_mm, 3.0);
    }

    #[test]
    fn unknown_library_die_is_an_error() {
        let s = Scenario::parse("die: { library: Missing }").unwrap();
        assert!(s.resolve_die(&library()).is_err());
    }

    #[test]
    fn overlapping_inline_die_is_rejected() {
        let yaml = r#"
die:
  sku: Bad
  type: cpu
  dimensions: { width: 4.0, height: 4.0 }
  process_node: 22
  components:
    - { type: cpu_core, name: A, position: { x: 0.0, y: 0.0 }, dimensions: { width: 2.0, height: 2.0 } }
    - { type: cpu_core, name: B, position: { x: 1.0, y: 1.0 }, dimensions: { width: 2.0, height: 2.0 } }
"#;
        let s = Scenario::parse(yaml).unwrap();
        assert!(s.resolve_die(&library()).is_err());
    }
}
