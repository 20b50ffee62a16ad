//! Entity store — dynamic component bags and the live-entity list.
//!
//! Components are not Rust types: an entity is a mapping from component
//! name to an opaque `serde_json::Value` payload, and only key presence
//! participates in filtering. Entities become *live* (visible to systems)
//! only when the world's reconciliation runs; components can be staged on
//! a freshly spawned entity before that.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::entity::{Entity, EntityAllocator};
use crate::world::WorldError;

/// A single entity's component set.
#[derive(Debug, Clone, Default)]
pub(crate) struct EntityData {
    pub components: HashMap<String, Value>,
}

/// Storage for all entities known to a world.
///
/// `data` holds every allocated entity, including ones still pending
/// their first refresh; `live` is the insertion-ordered list of entities
/// currently visible to systems. Live-list changes happen only inside
/// the world's reconciliation.
#[derive(Debug, Default)]
pub struct EntityStore {
    allocator: EntityAllocator,
    data: HashMap<Entity, EntityData>,
    live: Vec<Entity>,
    live_set: HashSet<Entity>,
}

impl EntityStore {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity with an empty component bag.
    ///
    /// The entity is known (components can be set) but not yet live.
    pub(crate) fn allocate(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.data.insert(entity, EntityData::default());
        entity
    }

    /// Returns `true` if the entity is known to the store (live or staged).
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.data.contains_key(&entity)
    }

    /// Returns `true` if the entity is live (visible to systems).
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        self.live_set.contains(&entity)
    }

    /// The live entities in insertion order.
    #[must_use]
    pub fn live_entities(&self) -> &[Entity] {
        &self.live
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Promote a known entity to the live list. No-op if already live or
    /// unknown.
    pub(crate) fn make_live(&mut self, entity: Entity) {
        if self.data.contains_key(&entity) && self.live_set.insert(entity) {
            self.live.push(entity);
        }
    }

    /// Drop an entity entirely: component bag and live-list slot.
    pub(crate) fn remove(&mut self, entity: Entity) {
        self.data.remove(&entity);
        if self.live_set.remove(&entity) {
            if let Some(pos) = self.live.iter().position(|&e| e == entity) {
                self.live.remove(pos);
            }
        }
    }

    // -- Component operations --

    /// Set a component on an entity. Overwrites any previous value.
    pub fn set_component(
        &mut self,
        entity: Entity,
        component: &str,
        value: Value,
    ) -> Result<(), WorldError> {
        let data = self
            .data
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        data.components.insert(component.to_string(), value);
        Ok(())
    }

    /// Get a component value from an entity.
    pub fn get_component(&self, entity: Entity, component: &str) -> Result<&Value, WorldError> {
        let data = self
            .data
            .get(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        data.components
            .get(component)
            .ok_or_else(|| WorldError::ComponentNotFound(component.to_string(), entity))
    }

    /// Remove a component from an entity.
    pub fn remove_component(&mut self, entity: Entity, component: &str) -> Result<(), WorldError> {
        let data = self
            .data
            .get_mut(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        if data.components.remove(component).is_none() {
            return Err(WorldError::ComponentNotFound(component.to_string(), entity));
        }
        Ok(())
    }

    /// Check if an entity has a specific component.
    #[must_use]
    pub fn has_component(&self, entity: Entity, component: &str) -> bool {
        self.data
            .get(&entity)
            .map(|d| d.components.contains_key(component))
            .unwrap_or(false)
    }

    /// Get all component names on an entity.
    pub fn component_names(&self, entity: Entity) -> Result<Vec<String>, WorldError> {
        let data = self
            .data
            .get(&entity)
            .ok_or(WorldError::EntityNotFound(entity))?;
        Ok(data.components.keys().cloned().collect())
    }

    /// The entity's whole component bag, if the entity is known.
    ///
    /// Filters evaluate against this map; key presence is all that
    /// matters to them.
    #[must_use]
    pub fn components(&self, entity: Entity) -> Option<&HashMap<String, Value>> {
        self.data.get(&entity).map(|d| &d.components)
    }
}
