//! World — the owning container coordinating entities, systems, and the
//! deferred refresh/update protocol.
//!
//! Structural changes (entity/system additions and removals) are queued
//! and applied by [`World::refresh`] or at the start of [`World::update`];
//! until then systems keep seeing the previous state. Component mutation
//! is immediate but only observed by filters at the next reconciliation.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use pulse_filter::Filter;

use crate::context::SystemContext;
use crate::entity::Entity;
use crate::registry::SystemRegistry;
use crate::scheduler;
use crate::store::EntityStore;
use crate::system::{Behavior, System, SystemId};

/// Errors reported by world operations.
#[derive(Debug, Clone, Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
    #[error("component '{0}' not found on entity {1}")]
    ComponentNotFound(String, Entity),
    #[error("system {0} not found")]
    SystemNotFound(SystemId),
}

/// Structural operations recorded since the last reconciliation.
#[derive(Default)]
pub(crate) struct OpQueue {
    pub entity_adds: Vec<Entity>,
    pub entity_removes: Vec<Entity>,
    pub system_adds: Vec<(SystemId, System)>,
    pub system_removes: Vec<SystemId>,
}

impl OpQueue {
    /// Queue an entity addition. Cancels a pending removal; a no-op for
    /// an already-live entity.
    pub fn queue_entity_add(&mut self, entity: Entity, is_live: bool) {
        self.entity_removes.retain(|&e| e != entity);
        if !is_live && !self.entity_adds.contains(&entity) {
            self.entity_adds.push(entity);
        }
    }

    pub fn queue_entity_remove(&mut self, entity: Entity) {
        if !self.entity_removes.contains(&entity) {
            self.entity_removes.push(entity);
        }
    }

    pub fn queue_system_remove(&mut self, id: SystemId) {
        if !self.system_removes.contains(&id) {
            self.system_removes.push(id);
        }
    }
}

/// A container managing entities and systems. Typically a program uses
/// one world at a time.
#[derive(Default)]
pub struct World {
    pub(crate) entities: EntityStore,
    pub(crate) systems: SystemRegistry,
    pub(crate) ops: OpQueue,
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Structural operations (deferred) --

    /// Allocate a new entity and queue it for addition.
    ///
    /// Components can be staged on it immediately; it becomes visible to
    /// systems at the next reconciliation.
    pub fn spawn(&mut self) -> Entity {
        let entity = self.entities.allocate();
        self.ops.queue_entity_add(entity, false);
        entity
    }

    /// Re-queue an entity for addition.
    ///
    /// Cancels a pending removal; a no-op for an entity that is already
    /// live. Returns the entity for chaining.
    pub fn add_entity(&mut self, entity: Entity) -> Entity {
        self.ops
            .queue_entity_add(entity, self.entities.is_live(entity));
        entity
    }

    /// Queue an entity for removal. Systems that matched it fire
    /// `on_remove` at the next reconciliation.
    ///
    /// Returns `false` if the entity is not known to this world.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.exists(entity) {
            return false;
        }
        self.ops.queue_entity_remove(entity);
        true
    }

    /// Queue a system for addition, returning its handle.
    pub fn add_system(&mut self, system: System) -> SystemId {
        let id = self.systems.reserve_id();
        self.ops.system_adds.push((id, system));
        id
    }

    /// Queue several systems for addition, returning their handles in
    /// order.
    pub fn add_systems(&mut self, systems: impl IntoIterator<Item = System>) -> Vec<SystemId> {
        systems.into_iter().map(|s| self.add_system(s)).collect()
    }

    /// Queue a system for removal. The system stops running immediately
    /// (its active flag clears); callbacks fire at the next
    /// reconciliation.
    ///
    /// Removing a system that was queued for addition but never
    /// reconciled simply cancels the addition.
    ///
    /// Returns `false` if the handle is unknown.
    pub fn remove_system(&mut self, id: SystemId) -> bool {
        if let Some(slot) = self.systems.get_mut(id) {
            slot.active = false;
            self.ops.queue_system_remove(id);
            return true;
        }
        if let Some(pos) = self.ops.system_adds.iter().position(|(i, _)| *i == id) {
            self.ops.system_adds.remove(pos);
            return true;
        }
        false
    }

    /// Cancel a pending system removal, reactivating the system.
    ///
    /// Returns `false` if no removal was pending for this handle.
    pub fn restore_system(&mut self, id: SystemId) -> bool {
        if let Some(pos) = self.ops.system_removes.iter().position(|&s| s == id) {
            self.ops.system_removes.remove(pos);
            if let Some(slot) = self.systems.get_mut(id) {
                slot.active = true;
            }
            true
        } else {
            false
        }
    }

    /// Queue removal of every entity, live or staged.
    pub fn clear_entities(&mut self) {
        let staged: Vec<Entity> = self.ops.entity_adds.clone();
        for &entity in self.entities.live_entities() {
            self.ops.queue_entity_remove(entity);
        }
        for entity in staged {
            self.ops.queue_entity_remove(entity);
        }
    }

    /// Queue removal of every system, live or staged.
    pub fn clear_systems(&mut self) {
        for id in self.systems.ids() {
            self.remove_system(id);
        }
        self.ops.system_adds.clear();
    }

    // -- Counts & inspection --

    /// Number of live entities (as of the last reconciliation).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    /// Number of systems in the world (as of the last reconciliation).
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Read-only view of the entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.entities
    }

    /// Change a system's ordering index, returning the previous value.
    ///
    /// Lower-indexed systems run first; equal indices keep insertion
    /// order. Reordering takes effect on the very next update.
    pub fn set_system_index(&mut self, id: SystemId, index: i64) -> Result<i64, WorldError> {
        self.systems
            .set_index(id, index)
            .ok_or(WorldError::SystemNotFound(id))
    }

    // -- Component operations (immediate) --

    /// Set a component on an entity. Filters observe the change at the
    /// next reconciliation.
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

    // -- Reconciliation & ticking --

    /// Apply all queued structural changes and recompute system
    /// membership.
    ///
    /// Call this between ticks, after modifying entities or systems
    /// outside of [`World::update`] (which performs the same
    /// reconciliation itself before running systems). Callbacks receive
    /// only a [`SystemContext`], so this method cannot be re-entered
    /// from inside a tick — the exclusive borrow enforces the contract.
    pub fn refresh(&mut self) {
        self.reconcile(0.0);
    }

    /// Update the world by `dt` (delta time): reconcile queued changes,
    /// then run every system in index order through the wrap-phase
    /// schedule. Put this in your main loop.
    pub fn update(&mut self, dt: f64) {
        self.tick(dt, None);
    }

    /// Like [`World::update`], but only runs systems whose tag set
    /// matches `filter`.
    pub fn update_filtered(&mut self, dt: f64, filter: &Filter) {
        self.tick(dt, Some(filter));
    }

    fn tick(&mut self, dt: f64, filter: Option<&Filter>) {
        self.reconcile(dt);
        let selected = scheduler::select(&self.systems, filter);
        debug!(dt, systems = selected.len(), "tick");
        scheduler::run_tick(
            &mut self.entities,
            &mut self.systems,
            &mut self.ops,
            &selected,
            dt,
        );
    }

    /// The five-step reconciliation: system removals, system additions,
    /// entity removals, entity additions + membership re-evaluation for
    /// all live entities, then one batched modify notification per
    /// changed system. Structural ops queued by callbacks during this
    /// pass land in fresh queues and apply at the next reconciliation.
    fn reconcile(&mut self, dt: f64) {
        let mut changed: HashSet<SystemId> = HashSet::new();

        // 1. Queued system removals: entity-level callbacks first, then
        //    the world-level one.
        let system_removes = std::mem::take(&mut self.ops.system_removes);
        let systems_removed = system_removes.len();
        for id in system_removes {
            let Some(mut slot) = self.systems.remove(id) else {
                continue;
            };
            for entity in slot.matched.drain(..) {
                if let Some(f) = slot.system.hooks.on_remove.as_mut() {
                    let mut ctx = SystemContext {
                        entities: &mut self.entities,
                        ops: &mut self.ops,
                    };
                    f(&mut ctx, entity);
                }
            }
            if let Some(f) = slot.system.hooks.on_removed_from_world.as_mut() {
                let mut ctx = SystemContext {
                    entities: &mut self.entities,
                    ops: &mut self.ops,
                };
                f(&mut ctx);
            }
        }

        // 2. Queued system additions, before any entities reach them.
        let system_adds = std::mem::take(&mut self.ops.system_adds);
        let systems_added = system_adds.len();
        for (id, system) in system_adds {
            self.systems.insert(id, system);
            if let Some(slot) = self.systems.get_mut(id) {
                if let Some(f) = slot.system.hooks.on_add_to_world.as_mut() {
                    let mut ctx = SystemContext {
                        entities: &mut self.entities,
                        ops: &mut self.ops,
                    };
                    f(&mut ctx);
                }
            }
        }

        // 3. Queued entity removals.
        let entity_removes = std::mem::take(&mut self.ops.entity_removes);
        let entities_removed = entity_removes.len();
        for entity in entity_removes {
            for slot in self.systems.slots_mut() {
                let Some(pos) = slot.matched.iter().position(|&m| m == entity) else {
                    continue;
                };
                slot.matched.remove(pos);
                changed.insert(slot.id);
                if let Some(f) = slot.system.hooks.on_remove.as_mut() {
                    let mut ctx = SystemContext {
                        entities: &mut self.entities,
                        ops: &mut self.ops,
                    };
                    f(&mut ctx, entity);
                }
            }
            self.entities.remove(entity);
        }

        // 4. Queued entity additions, then membership re-evaluation for
        //    every live entity against every active system — external
        //    component mutation is picked up here too.
        let entity_adds = std::mem::take(&mut self.ops.entity_adds);
        let entities_added = entity_adds.len();
        for entity in entity_adds {
            self.entities.make_live(entity);
        }
        let live: Vec<Entity> = self.entities.live_entities().to_vec();
        for slot in self.systems.slots_mut() {
            if !slot.active {
                continue;
            }
            let id = slot.id;
            for &entity in &live {
                let matches = self
                    .entities
                    .components(entity)
                    .is_some_and(|bag| slot.system.filter.matches(bag));
                let pos = slot.matched.iter().position(|&m| m == entity);
                match (matches, pos) {
                    (true, None) => {
                        slot.matched.push(entity);
                        changed.insert(id);
                        if let Some(f) = slot.system.hooks.on_add.as_mut() {
                            let mut ctx = SystemContext {
                                entities: &mut self.entities,
                                ops: &mut self.ops,
                            };
                            f(&mut ctx, entity);
                        }
                    }
                    (false, Some(pos)) => {
                        slot.matched.remove(pos);
                        changed.insert(id);
                        if let Some(f) = slot.system.hooks.on_remove.as_mut() {
                            let mut ctx = SystemContext {
                                entities: &mut self.entities,
                                ops: &mut self.ops,
                            };
                            f(&mut ctx, entity);
                        }
                    }
                    _ => {}
                }
            }
        }

        // 5. One modify notification per changed system, after all of
        //    its add/remove callbacks. Sorted systems re-sort here
        //    instead.
        for slot in self.systems.slots_mut() {
            if !changed.contains(&slot.id) {
                continue;
            }
            match &mut slot.system.behavior {
                Behavior::SortedProcessing { compare, .. } => {
                    scheduler::sort_matched(&mut slot.matched, compare, &self.entities);
                }
                _ => {
                    if let Some(f) = slot.system.hooks.on_modify.as_mut() {
                        let mut ctx = SystemContext {
                            entities: &mut self.entities,
                            ops: &mut self.ops,
                        };
                        f(&mut ctx, dt);
                    }
                }
            }
        }

        if systems_removed + systems_added + entities_removed + entities_added > 0 {
            debug!(
                systems_removed,
                systems_added,
                entities_removed,
                entities_added,
                systems_changed = changed.len(),
                "reconciled queued changes"
            );
        }
    }
}
