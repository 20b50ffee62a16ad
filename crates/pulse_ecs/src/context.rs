//! Per-callback execution context.
//!
//! Every system callback receives a [`SystemContext`]: direct read/write
//! access to the entity store plus the *deferred* structural operations.
//! Component mutation through the context is immediate (filters observe
//! it at the next reconciliation); adding or removing entities and
//! systems is queued and applied by the next reconciliation, never
//! mid-tick.

use serde_json::Value;

use crate::entity::Entity;
use crate::store::EntityStore;
use crate::system::SystemId;
use crate::world::{OpQueue, WorldError};

/// Context provided to system callbacks.
pub struct SystemContext<'w> {
    pub(crate) entities: &'w mut EntityStore,
    pub(crate) ops: &'w mut OpQueue,
}

impl<'w> SystemContext<'w> {
    /// Read-only view of the entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        self.entities
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    // -- Deferred structural operations --

    /// Allocate a new entity and queue it for addition.
    ///
    /// Components can be set on it immediately; it becomes visible to
    /// systems at the next reconciliation.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.entities.allocate();
        self.ops.queue_entity_add(entity, false);
        entity
    }

    /// Re-queue an entity for addition. Cancels a pending removal; a
    /// no-op for an entity that is already live.
    pub fn add_entity(&mut self, entity: Entity) -> Entity {
        self.ops
            .queue_entity_add(entity, self.entities.is_live(entity));
        entity
    }

    /// Queue an entity for removal. Returns `false` if the entity is not
    /// known to the world.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.exists(entity) {
            return false;
        }
        self.ops.queue_entity_remove(entity);
        true
    }

    /// Queue a system for removal at the next reconciliation.
    pub fn remove_system(&mut self, system: SystemId) {
        self.ops.queue_system_remove(system);
    }

    // -- Component operations (immediate) --

    /// Set a component on an entity.
    pub fn set_component(
        &mut self,
        entity: Entity,
        component: &str,
        value: Value,
    ) -> Result<(), WorldError> {
        self.entities.set_component(entity, component, value)
    }

    /// Get a component value from an entity.
    pub fn get_component(&self, entity: Entity, component: &str) -> Result<&Value, WorldError> {
        self.entities.get_component(entity, component)
    }

    /// Remove a component from an entity.
    pub fn remove_component(&mut self, entity: Entity, component: &str) -> Result<(), WorldError> {
        self.entities.remove_component(entity, component)
    }

    /// Check if an entity has a specific component.
    #[must_use]
    pub fn has_component(&self, entity: Entity, component: &str) -> bool {
        self.entities.has_component(entity, component)
    }
}
