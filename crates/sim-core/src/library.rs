//! In-memory die library: the designs a player owns.
//!
//! Timestamps are passed in by the caller so the library stays deterministic.

use crate::model::{Component, Die, DieId, DieType, Dimensions, Position, DEFAULT_RETICLE};
use crate::sizing::default_size;
use crate::ValidationError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// SKU given to dies created without one.
pub const UNTITLED_SKU: &str = "Untitled Die";

/// Creation parameters; every field is optional and falls back to the library defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DieConfig {
    pub sku: Option<String>,
    pub die_type: Option<DieType>,
    pub description: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub reticle_size: Option<Dimensions>,
    pub process_node: Option<u32>,
}

/// Owned collection of dies with monotonically assigned ids.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DieLibrary {
    dies: Vec<Die>,
    next_id: u64,
}

impl DieLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library pre-seeded with the two sample designs.
    pub fn with_default_dies(now: NaiveDateTime) -> Result<Self, ValidationError> {
        let mut lib = Self::new();
        let cpu = lib.create(
            DieConfig {
                sku: Some("Example 8-Core CPU".into()),
                die_type: Some(DieType::Cpu),
                description: Some("Sample 8-core desktop processor".into()),
                dimensions: Some(Dimensions::new(12.0, 10.0)),
                process_node: Some(7),
                ..DieConfig::default()
            },
            now,
        )?;
        lib.populate_sample_cpu(cpu, now)?;
        let gpu = lib.create(
            DieConfig {
                sku: Some("Example GPU".into()),
                die_type: Some(DieType::Gpu),
                description: Some("Sample graphics processor".into()),
                dimensions: Some(Dimensions::new(18.0, 15.0)),
                process_node: Some(7),
                ..DieConfig::default()
            },
            now,
        )?;
        lib.populate_sample_gpu(gpu, now)?;
        Ok(lib)
    }

    fn populate_sample_cpu(&mut self, id: DieId, now: NaiveDateTime) -> Result<(), ValidationError> {
        use crate::model::ComponentType::*;
        // Two rows of four cores, caches and uncore underneath.
        for i in 0..8 {
            let x = (i % 4) as f64 * 2.5;
            let y = (i / 4) as f64 * 2.5;
            self.place(id, CpuCore, x, y, now)?;
        }
        for i in 0..4 {
            self.place(id, L2Cache, i as f64 * 2.5, 5.0, now)?;
        }
        self.place_sized(id, L3Cache, Position { x: 0.0, y: 6.5 }, Dimensions::new(6.0, 2.0), now)?;
        self.place(id, MemCtrl, 10.0, 0.0, now)?;
        self.place(id, MemCtrl, 10.0, 2.0, now)?;
        self.place(id, PowerMgmt, 10.0, 4.0, now)?;
        self.place(id, IoCtrl, 10.0, 6.0, now)?;
        Ok(())
    }

    fn populate_sample_gpu(&mut self, id: DieId, now: NaiveDateTime) -> Result<(), ValidationError> {
        use crate::model::ComponentType::*;
        for i in 0..16 {
            let x = (i % 8) as f64 * 2.0;
            let y = (i / 8) as f64 * 2.0;
            self.place(id, GpuSm, x, y, now)?;
        }
        self.place_sized(id, L2Cache, Position { x: 0.0, y: 4.5 }, Dimensions::new(8.0, 2.0), now)?;
        for i in 0..4 {
            self.place(id, MemCtrl, i as f64 * 2.5, 8.0, now)?;
        }
        self.place(id, PowerMgmt, 16.5, 0.0, now)?;
        self.place(id, DisplayEngine, 16.0, 2.0, now)?;
        Ok(())
    }

    fn place(
        &mut self,
        id: DieId,
        t: crate::model::ComponentType,
        x: f64,
        y: f64,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        let node = self.get(id).ok_or(ValidationError::DieNotFound(id))?.process_node;
        self.place_sized(id, t, Position { x, y }, default_size(t, node), now)
    }

    fn place_sized(
        &mut self,
        id: DieId,
        t: crate::model::ComponentType,
        position: Position,
        dimensions: Dimensions,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        let name = self
            .get(id)
            .ok_or(ValidationError::DieNotFound(id))?
            .next_component_name(t);
        self.add_component(id, Component::new(t, name, position, dimensions), now)
    }

    /// Creates a die from `config`, filling defaults (cpu, 10x10 mm, 7 nm, 26x33 reticle).
    pub fn create(&mut self, config: DieConfig, now: NaiveDateTime) -> Result<DieId, ValidationError> {
        let sku = config
            .sku
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| UNTITLED_SKU.to_string());
        let dimensions = config.dimensions.unwrap_or(Dimensions::new(10.0, 10.0));
        let reticle = config.reticle_size.unwrap_or(DEFAULT_RETICLE);
        dimensions.validate("die")?;
        reticle.validate("reticle")?;
        if dimensions.width > reticle.width || dimensions.height > reticle.height {
            return Err(ValidationError::ExceedsReticle);
        }
        self.next_id += 1;
        let id = DieId(self.next_id);
        let mut die = Die::new(
            sku,
            config.die_type.unwrap_or(DieType::Cpu),
            dimensions,
            config.process_node.unwrap_or(7),
        );
        die.id = id;
        die.description = config.description.unwrap_or_default();
        die.reticle_size = reticle;
        die.created_at = Some(now);
        die.last_modified = Some(now);
        debug!(%id, sku = %die.sku, "die created");
        self.dies.push(die);
        Ok(id)
    }

    /// Inserts an externally built die, assigning it a fresh id.
    pub fn insert(&mut self, mut die: Die, now: NaiveDateTime) -> Result<DieId, ValidationError> {
        die.validate_layout()?;
        self.next_id += 1;
        die.id = DieId(self.next_id);
        die.created_at.get_or_insert(now);
        die.last_modified = Some(now);
        let id = die.id;
        self.dies.push(die);
        Ok(id)
    }

    pub fn get(&self, id: DieId) -> Option<&Die> {
        self.dies.iter().find(|d| d.id == id)
    }

    pub fn all(&self) -> &[Die] {
        &self.dies
    }

    pub fn len(&self) -> usize {
        self.dies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }

    pub fn by_type(&self, die_type: DieType) -> impl Iterator<Item = &Die> + '_ {
        self.dies.iter().filter(move |d| d.die_type == die_type)
    }

    /// Case-insensitive match on SKU or description, optionally narrowed to one die type.
    pub fn search<'a>(&'a self, term: &str, die_type: Option<DieType>) -> Vec<&'a Die> {
        let needle = term.to_lowercase();
        self.dies
            .iter()
            .filter(|d| die_type.map_or(true, |t| d.die_type == t))
            .filter(|d| {
                needle.is_empty()
                    || d.sku.to_lowercase().contains(&needle)
                    || d.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Applies `edit` to a die and stamps `last_modified`. The id cannot be changed.
    pub fn update<F>(&mut self, id: DieId, now: NaiveDateTime, edit: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut Die),
    {
        let die = self
            .dies
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(ValidationError::DieNotFound(id))?;
        edit(&mut *die);
        die.id = id;
        die.last_modified = Some(now);
        Ok(())
    }

    /// Copies a die under a new id with " (Copy)" appended to its SKU.
    pub fn clone_die(&mut self, id: DieId, now: NaiveDateTime) -> Result<DieId, ValidationError> {
        let mut copy = self.get(id).cloned().ok_or(ValidationError::DieNotFound(id))?;
        self.next_id += 1;
        copy.id = DieId(self.next_id);
        copy.sku.push_str(" (Copy)");
        copy.created_at = Some(now);
        copy.last_modified = Some(now);
        let new_id = copy.id;
        debug!(from = %id, to = %new_id, "die cloned");
        self.dies.push(copy);
        Ok(new_id)
    }

    pub fn delete(&mut self, id: DieId) -> Option<Die> {
        let idx = self.dies.iter().position(|d| d.id == id)?;
        debug!(%id, "die deleted");
        Some(self.dies.remove(idx))
    }

    /// Places a component on a stored die with bounds and overlap checks.
    pub fn add_component(
        &mut self,
        id: DieId,
        component: Component,
        now: NaiveDateTime,
    ) -> Result<(), ValidationError> {
        let die = self
            .dies
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(ValidationError::DieNotFound(id))?;
        die.add_component(component)?;
        die.last_modified = Some(now);
        Ok(())
    }

    /// Removes a component by name; remaining components of its type are renumbered.
    pub fn remove_component(
        &mut self,
        id: DieId,
        name: &str,
        now: NaiveDateTime,
    ) -> Result<Option<Component>, ValidationError> {
        let die = self
            .dies
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(ValidationError::DieNotFound(id))?;
        let removed = die.remove_component(name);
        if removed.is_some() {
            die.last_modified = Some(now);
        }
        Ok(removed)
    }
}
