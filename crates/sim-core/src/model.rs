//! Die and component records shared by every engine crate.

use crate::ValidationError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a die inside a [`DieLibrary`](crate::DieLibrary).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DieId(pub u64);

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "die-{}", self.0)
    }
}

/// Kind of die being designed. Drives which components the palette offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DieType {
    Cpu,
    Gpu,
    Memory,
    IoDie,
    Npu,
    Custom,
}

impl DieType {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            DieType::Cpu => "CPU",
            DieType::Gpu => "GPU",
            DieType::Memory => "Memory",
            DieType::IoDie => "I/O Die",
            DieType::Npu => "NPU",
            DieType::Custom => "Custom",
        }
    }
}

/// Palette category of a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentCategory {
    Common,
    Cpu,
    Gpu,
    Memory,
    Npu,
}

/// Functional block that can be placed on a die.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    CpuCore,
    GpuSm,
    L2Cache,
    L3Cache,
    MemCtrl,
    Interconnect,
    PowerMgmt,
    IoCtrl,
    Igpu,
    TextureUnit,
    DisplayEngine,
    MemoryArray,
    ControlLogic,
    Npu,
}

impl ComponentType {
    /// Every component type, in palette order.
    pub const ALL: [ComponentType; 14] = [
        ComponentType::CpuCore,
        ComponentType::L2Cache,
        ComponentType::L3Cache,
        ComponentType::MemCtrl,
        ComponentType::Interconnect,
        ComponentType::PowerMgmt,
        ComponentType::IoCtrl,
        ComponentType::Igpu,
        ComponentType::GpuSm,
        ComponentType::TextureUnit,
        ComponentType::DisplayEngine,
        ComponentType::MemoryArray,
        ComponentType::ControlLogic,
        ComponentType::Npu,
    ];

    /// Label used when naming placed components ("CPU Core 3").
    pub fn label(self) -> &'static str {
        match self {
            ComponentType::CpuCore => "CPU Core",
            ComponentType::GpuSm => "GPU SM/CU",
            ComponentType::L2Cache => "L2 Cache",
            ComponentType::L3Cache => "L3 Cache",
            ComponentType::MemCtrl => "Memory Controller",
            ComponentType::Interconnect => "Interconnect",
            ComponentType::PowerMgmt => "Power Management",
            ComponentType::IoCtrl => "I/O Controller",
            ComponentType::Igpu => "Integrated GPU",
            ComponentType::TextureUnit => "Texture Units",
            ComponentType::DisplayEngine => "Display Engine",
            ComponentType::MemoryArray => "Memory Array",
            ComponentType::ControlLogic => "Control Logic",
            ComponentType::Npu => "NPU Core",
        }
    }

    pub fn category(self) -> ComponentCategory {
        match self {
            ComponentType::CpuCore | ComponentType::Igpu => ComponentCategory::Cpu,
            ComponentType::GpuSm | ComponentType::TextureUnit | ComponentType::DisplayEngine => {
                ComponentCategory::Gpu
            }
            ComponentType::MemoryArray | ComponentType::ControlLogic => ComponentCategory::Memory,
            ComponentType::Npu => ComponentCategory::Npu,
            ComponentType::L2Cache
            | ComponentType::L3Cache
            | ComponentType::MemCtrl
            | ComponentType::Interconnect
            | ComponentType::PowerMgmt
            | ComponentType::IoCtrl => ComponentCategory::Common,
        }
    }

    /// Whether the designer palette offers this type for the given die type.
    pub fn available_for(self, die_type: DieType) -> bool {
        match (self.category(), die_type) {
            (ComponentCategory::Common, _) => true,
            (ComponentCategory::Cpu, DieType::Cpu) => true,
            (ComponentCategory::Gpu, DieType::Gpu) => true,
            (ComponentCategory::Memory, DieType::Memory) => true,
            (ComponentCategory::Npu, DieType::Npu) => true,
            _ => false,
        }
    }
}

/// Top-left corner of a component in mm, relative to the die origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Width and height in mm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Area in mm².
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Fails unless both sides are finite and strictly positive.
    pub fn validate(&self, what: &str) -> Result<(), ValidationError> {
        if !(self.width.is_finite() && self.height.is_finite()) {
            return Err(ValidationError::NonFinite);
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ValidationError::NonPositiveDimension(what.to_string()));
        }
        Ok(())
    }
}

/// Default lithography field used by new dies.
pub const DEFAULT_RETICLE: Dimensions = Dimensions::new(26.0, 33.0);

fn default_reticle() -> Dimensions {
    DEFAULT_RETICLE
}

/// A placed functional block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    pub position: Position,
    pub dimensions: Dimensions,
}

impl Component {
    pub fn new(
        component_type: ComponentType,
        name: impl Into<String>,
        position: Position,
        dimensions: Dimensions,
    ) -> Self {
        Self {
            component_type,
            name: name.into(),
            position,
            dimensions,
        }
    }

    pub fn area(&self) -> f64 {
        self.dimensions.area()
    }

    /// Centre point in die coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.position.x + self.dimensions.width / 2.0,
            self.position.y + self.dimensions.height / 2.0,
        )
    }

    /// Centre-to-centre distance in mm.
    pub fn distance_to(&self, other: &Component) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (bx - ax).hypot(by - ay)
    }

    /// Axis-aligned overlap test; touching edges do not overlap.
    pub fn overlaps(&self, other: &Component) -> bool {
        let a = self;
        let b = other;
        !(a.position.x + a.dimensions.width <= b.position.x
            || a.position.x >= b.position.x + b.dimensions.width
            || a.position.y + a.dimensions.height <= b.position.y
            || a.position.y >= b.position.y + b.dimensions.height)
    }

    /// Numeric suffix of the name, e.g. 5 for "CPU Core 5".
    fn ordinal(&self) -> Option<u32> {
        self.name.rsplit(' ').next().and_then(|s| s.parse().ok())
    }
}

/// A rectangular chip design with positioned sub-components.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Die {
    #[serde(default)]
    pub id: DieId,
    pub sku: String,
    #[serde(rename = "type")]
    pub die_type: DieType,
    #[serde(default)]
    pub description: String,
    pub dimensions: Dimensions,
    #[serde(default = "default_reticle")]
    pub reticle_size: Dimensions,
    /// Process node in nm; key into the constant tables.
    pub process_node: u32,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_modified: Option<NaiveDateTime>,
}

/// Summary statistics of a die layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DieStats {
    pub area: f64,
    pub components_area: f64,
    pub utilization_percent: f64,
    pub component_count: usize,
}

/// Minimum count of one component type a die type must carry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DieRequirement {
    pub component_type: ComponentType,
    pub min_count: usize,
    pub label: &'static str,
}

/// Outcome of checking one [`DieRequirement`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RequirementStatus {
    pub requirement: DieRequirement,
    pub count: usize,
    pub met: bool,
}

const fn req(component_type: ComponentType, label: &'static str) -> DieRequirement {
    DieRequirement {
        component_type,
        min_count: 1,
        label,
    }
}

/// Required components per die type.
pub fn die_requirements(die_type: DieType) -> &'static [DieRequirement] {
    use ComponentType::*;
    const CPU: &[DieRequirement] = &[
        req(CpuCore, "CPU Core(s)"),
        req(L2Cache, "L2 Cache"),
        req(MemCtrl, "Memory Controller"),
        req(PowerMgmt, "Power Management"),
    ];
    const GPU: &[DieRequirement] = &[
        req(GpuSm, "GPU SM/CU"),
        req(MemCtrl, "Memory Controller"),
        req(PowerMgmt, "Power Management"),
    ];
    const MEMORY: &[DieRequirement] = &[
        req(MemoryArray, "Memory Array"),
        req(ControlLogic, "Control Logic"),
    ];
    const IO_DIE: &[DieRequirement] = &[req(IoCtrl, "I/O Controller"), req(Interconnect, "Interconnect")];
    const NPU: &[DieRequirement] = &[req(PowerMgmt, "Power Management")];
    match die_type {
        DieType::Cpu => CPU,
        DieType::Gpu => GPU,
        DieType::Memory => MEMORY,
        DieType::IoDie => IO_DIE,
        DieType::Npu => NPU,
        DieType::Custom => &[],
    }
}

impl Die {
    /// A fresh, empty die with the default reticle and an unassigned id.
    pub fn new(sku: impl Into<String>, die_type: DieType, dimensions: Dimensions, process_node: u32) -> Self {
        Self {
            id: DieId::default(),
            sku: sku.into(),
            die_type,
            description: String::new(),
            dimensions,
            reticle_size: DEFAULT_RETICLE,
            process_node,
            components: Vec::new(),
            created_at: None,
            last_modified: None,
        }
    }

    /// Builder-style component append without layout checks.
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn area(&self) -> f64 {
        self.dimensions.area()
    }

    /// Components of one type, in placement order.
    pub fn components_of(&self, t: ComponentType) -> impl Iterator<Item = &Component> + '_ {
        self.components.iter().filter(move |c| c.component_type == t)
    }

    pub fn count_of(&self, t: ComponentType) -> usize {
        self.components_of(t).count()
    }

    /// Summed footprint of one component type in mm².
    pub fn area_of(&self, t: ComponentType) -> f64 {
        self.components_of(t).map(Component::area).sum()
    }

    pub fn components_area(&self) -> f64 {
        self.components.iter().map(Component::area).sum()
    }

    pub fn stats(&self) -> DieStats {
        let area = self.area();
        let components_area = self.components_area();
        let utilization_percent = if area > 0.0 {
            components_area / area * 100.0
        } else {
            0.0
        };
        DieStats {
            area,
            components_area,
            utilization_percent,
            component_count: self.components.len(),
        }
    }

    /// Checks the die outline and every component footprint are positive and finite.
    ///
    /// Placement (bounds, overlap) is not checked here; see [`Die::validate_layout`].
    pub fn validate_geometry(&self) -> Result<(), ValidationError> {
        self.dimensions.validate("die")?;
        for c in &self.components {
            c.dimensions.validate(&c.name)?;
            if !(c.position.x.is_finite() && c.position.y.is_finite()) {
                return Err(ValidationError::NonFinite);
            }
        }
        Ok(())
    }

    /// Full edit-time check: geometry, bounds and pairwise overlap.
    pub fn validate_layout(&self) -> Result<(), ValidationError> {
        self.validate_geometry()?;
        for (i, c) in self.components.iter().enumerate() {
            self.check_bounds(c)?;
            if let Some(other) = self.components[i + 1..].iter().find(|o| c.overlaps(o)) {
                return Err(ValidationError::ComponentOverlap(c.name.clone(), other.name.clone()));
            }
        }
        Ok(())
    }

    fn check_bounds(&self, c: &Component) -> Result<(), ValidationError> {
        let inside = c.position.x >= 0.0
            && c.position.y >= 0.0
            && c.position.x + c.dimensions.width <= self.dimensions.width
            && c.position.y + c.dimensions.height <= self.dimensions.height;
        if inside {
            Ok(())
        } else {
            Err(ValidationError::ComponentOutOfBounds(c.name.clone()))
        }
    }

    /// Places a component after checking bounds and overlap.
    pub fn add_component(&mut self, component: Component) -> Result<(), ValidationError> {
        component.dimensions.validate(&component.name)?;
        self.check_bounds(&component)?;
        if let Some(other) = self.components.iter().find(|o| component.overlaps(o)) {
            return Err(ValidationError::ComponentOverlap(
                component.name.clone(),
                other.name.clone(),
            ));
        }
        self.components.push(component);
        Ok(())
    }

    /// Next free name for a type: one past the highest existing ordinal.
    pub fn next_component_name(&self, t: ComponentType) -> String {
        let next = self
            .components_of(t)
            .filter_map(Component::ordinal)
            .max()
            .map_or(0, |n| n + 1);
        format!("{} {}", t.label(), next)
    }

    /// Renames components of a type to `label 0..n` in ordinal order, closing gaps.
    pub fn renumber(&mut self, t: ComponentType) {
        let mut numbered: Vec<(u32, usize)> = self
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.component_type == t)
            .filter_map(|(i, c)| c.ordinal().map(|n| (n, i)))
            .collect();
        numbered.sort_unstable();
        for (seq, (_, idx)) in numbered.into_iter().enumerate() {
            self.components[idx].name = format!("{} {}", t.label(), seq);
        }
    }

    /// Removes the named component and renumbers the remaining ones of its type.
    pub fn remove_component(&mut self, name: &str) -> Option<Component> {
        let idx = self.components.iter().position(|c| c.name == name)?;
        let removed = self.components.remove(idx);
        self.renumber(removed.component_type);
        Some(removed)
    }

    pub fn requirements_report(&self) -> Vec<RequirementStatus> {
        die_requirements(self.die_type)
            .iter()
            .map(|r| {
                let count = self.count_of(r.component_type);
                RequirementStatus {
                    requirement: *r,
                    count,
                    met: count >= r.min_count,
                }
            })
            .collect()
    }

    pub fn meets_requirements(&self) -> bool {
        self.requirements_report().iter().all(|s| s.met)
    }
}
