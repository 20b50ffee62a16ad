//! System model — callbacks, capability variants, and the builder.
//!
//! A system is a filter plus a bundle of per-tick behavior. The shape of
//! that behavior is fixed at construction time as one of three capability
//! sets:
//!
//! - **Plain** — an optional `update(dt)` called once per tick.
//! - **Processing** — `pre_process(dt)`, then `process(entity, dt)` for
//!   every matched entity, then `post_process(dt)`.
//! - **Sorted processing** — a processing system whose matched entities
//!   are kept in comparator order.
//!
//! Required callbacks are validated by [`SystemBuilder::build`], so a
//! malformed system fails before it ever reaches a tick.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use pulse_filter::Filter;

use crate::context::SystemContext;
use crate::entity::Entity;
use crate::store::EntityStore;

/// A unique handle for a system added to a world.
///
/// Returned by `World::add_system` and used for removal and re-indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(pub(crate) u64);

impl SystemId {
    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemId({})", self.0)
    }
}

/// Per-tick callback: `(ctx, dt)`.
pub type TickFn = Box<dyn FnMut(&mut SystemContext<'_>, f64)>;
/// Entity membership callback: `(ctx, entity)`.
pub type EntityHookFn = Box<dyn FnMut(&mut SystemContext<'_>, Entity)>;
/// World membership callback: `(ctx)`.
pub type WorldHookFn = Box<dyn FnMut(&mut SystemContext<'_>)>;
/// Per-entity processing callback: `(ctx, entity, dt)`.
pub type ProcessFn = Box<dyn FnMut(&mut SystemContext<'_>, Entity, f64)>;
/// Ordering predicate: returns `true` iff the first entity sorts before
/// the second. Must be a strict weak ordering; ties keep their prior
/// relative order.
pub type CompareFn = Box<dyn FnMut(&EntityStore, Entity, Entity) -> bool>;

/// Optional lifecycle hooks shared by every capability set.
#[derive(Default)]
pub(crate) struct Hooks {
    pub on_add: Option<EntityHookFn>,
    pub on_remove: Option<EntityHookFn>,
    pub on_modify: Option<TickFn>,
    pub on_add_to_world: Option<WorldHookFn>,
    pub on_removed_from_world: Option<WorldHookFn>,
    pub pre_wrap: Option<TickFn>,
    pub post_wrap: Option<TickFn>,
}

/// The per-tick behavior of a system, dispatched on by the scheduler.
pub(crate) enum Behavior {
    Plain {
        update: Option<TickFn>,
    },
    Processing {
        pre_process: Option<TickFn>,
        process: ProcessFn,
        post_process: Option<TickFn>,
    },
    SortedProcessing {
        compare: CompareFn,
        pre_process: Option<TickFn>,
        process: ProcessFn,
        post_process: Option<TickFn>,
    },
}

impl Behavior {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Behavior::Plain { .. } => "plain",
            Behavior::Processing { .. } => "processing",
            Behavior::SortedProcessing { .. } => "sorted_processing",
        }
    }
}

/// A unit of per-tick behavior with an entity filter, an optional tag set
/// for system-level selection, lifecycle hooks, and a capability variant.
pub struct System {
    pub(crate) filter: Filter,
    pub(crate) tags: HashSet<String>,
    pub(crate) hooks: Hooks,
    pub(crate) behavior: Behavior,
}

impl System {
    /// Start building a system that matches entities with `filter`.
    #[must_use]
    pub fn builder(filter: Filter) -> SystemBuilder {
        SystemBuilder::new(filter)
    }

    /// The entity filter this system was built with.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// The tags declared on this system.
    #[must_use]
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("kind", &self.behavior.kind())
            .field("filter", &self.filter)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Errors detected while constructing a [`System`].
#[derive(Debug, Clone, Error)]
pub enum SystemError {
    #[error("missing required callback: {0}")]
    MissingCallback(&'static str),
    #[error("conflicting callbacks: {0} and {1}")]
    ConflictingCallbacks(&'static str, &'static str),
}

/// Builder for [`System`] values.
///
/// Setting `process` makes the system a processing system; additionally
/// setting `compare` makes it a sorted processing system. `build`
/// validates the resulting capability set.
pub struct SystemBuilder {
    filter: Filter,
    tags: HashSet<String>,
    update: Option<TickFn>,
    pre_process: Option<TickFn>,
    process: Option<ProcessFn>,
    post_process: Option<TickFn>,
    compare: Option<CompareFn>,
    hooks: Hooks,
}

impl SystemBuilder {
    #[must_use]
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            tags: HashSet::new(),
            update: None,
            pre_process: None,
            process: None,
            post_process: None,
            compare: None,
            hooks: Hooks::default(),
        }
    }

    /// Declare a tag on this system. Tags are what the system-selecting
    /// filter of `World::update_filtered` evaluates.
    #[must_use]
    pub fn tag(mut self, name: impl Into<String>) -> Self {
        self.tags.insert(name.into());
        self
    }

    /// Per-tick update for a plain system. Mutually exclusive with
    /// [`process`](Self::process).
    #[must_use]
    pub fn update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.update = Some(Box::new(f));
        self
    }

    /// Called before entity iteration on each tick.
    #[must_use]
    pub fn pre_process<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.pre_process = Some(Box::new(f));
        self
    }

    /// Process one matched entity. Makes this a processing system.
    #[must_use]
    pub fn process<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, Entity, f64) + 'static,
    {
        self.process = Some(Box::new(f));
        self
    }

    /// Called after entity iteration on each tick.
    #[must_use]
    pub fn post_process<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.post_process = Some(Box::new(f));
        self
    }

    /// Ordering predicate over matched entities. Makes this a sorted
    /// processing system; requires [`process`](Self::process).
    #[must_use]
    pub fn compare<F>(mut self, f: F) -> Self
    where
        F: FnMut(&EntityStore, Entity, Entity) -> bool + 'static,
    {
        self.compare = Some(Box::new(f));
        self
    }

    /// Called when an entity is added to the system's matched set.
    #[must_use]
    pub fn on_add<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, Entity) + 'static,
    {
        self.hooks.on_add = Some(Box::new(f));
        self
    }

    /// Called when an entity is removed from the system's matched set.
    #[must_use]
    pub fn on_remove<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, Entity) + 'static,
    {
        self.hooks.on_remove = Some(Box::new(f));
        self
    }

    /// Called once per reconciliation in which the matched set changed,
    /// after all of this system's add/remove callbacks. Sorted systems
    /// use this point to re-sort instead; supplying both is an error.
    #[must_use]
    pub fn on_modify<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.hooks.on_modify = Some(Box::new(f));
        self
    }

    /// Called when the system joins a world, before any entities are
    /// added to it.
    #[must_use]
    pub fn on_add_to_world<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>) + 'static,
    {
        self.hooks.on_add_to_world = Some(Box::new(f));
        self
    }

    /// Called when the system leaves a world, after all entities have
    /// been removed from it.
    #[must_use]
    pub fn on_removed_from_world<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>) + 'static,
    {
        self.hooks.on_removed_from_world = Some(Box::new(f));
        self
    }

    /// Called on every selected system, in ascending order, before any
    /// system's update runs. Paired with [`post_wrap`](Self::post_wrap)
    /// this lets a later-indexed system decorate the whole batch of
    /// sibling updates.
    #[must_use]
    pub fn pre_wrap<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.hooks.pre_wrap = Some(Box::new(f));
        self
    }

    /// Called on every selected system, in descending order, after every
    /// system's update has run.
    #[must_use]
    pub fn post_wrap<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, f64) + 'static,
    {
        self.hooks.post_wrap = Some(Box::new(f));
        self
    }

    /// Validate the callback set and produce the system.
    ///
    /// # Errors
    ///
    /// - [`SystemError::MissingCallback`] if `compare` was set without
    ///   `process`.
    /// - [`SystemError::ConflictingCallbacks`] if both `update` and
    ///   `process` were set, or a sorted system also set `on_modify`.
    pub fn build(self) -> Result<System, SystemError> {
        if self.compare.is_some() && self.process.is_none() {
            return Err(SystemError::MissingCallback("process"));
        }
        if self.process.is_some() && self.update.is_some() {
            return Err(SystemError::ConflictingCallbacks("update", "process"));
        }
        if self.compare.is_some() && self.hooks.on_modify.is_some() {
            return Err(SystemError::ConflictingCallbacks("on_modify", "compare"));
        }
        if self.process.is_none()
            && (self.pre_process.is_some() || self.post_process.is_some())
        {
            return Err(SystemError::MissingCallback("process"));
        }

        let behavior = match (self.process, self.compare) {
            (Some(process), Some(compare)) => Behavior::SortedProcessing {
                compare,
                pre_process: self.pre_process,
                process,
                post_process: self.post_process,
            },
            (Some(process), None) => Behavior::Processing {
                pre_process: self.pre_process,
                process,
                post_process: self.post_process,
            },
            (None, _) => Behavior::Plain {
                update: self.update,
            },
        };

        Ok(System {
            filter: self.filter,
            tags: self.tags,
            hooks: self.hooks,
            behavior,
        })
    }
}

#[cfg(test)]
mod tests {
    use pulse_filter::require_all;

    use super::*;

    #[test]
    fn test_plain_system_builds() {
        let sys = System::builder(require_all(["a"]))
            .update(|_ctx, _dt| {})
            .build()
            .unwrap();
        assert_eq!(sys.behavior.kind(), "plain");
    }

    #[test]
    fn test_plain_system_with_no_update_builds() {
        // Hook-only systems are legal.
        let sys = System::builder(require_all(["a"]))
            .on_add(|_ctx, _e| {})
            .build()
            .unwrap();
        assert_eq!(sys.behavior.kind(), "plain");
    }

    #[test]
    fn test_processing_system_builds() {
        let sys = System::builder(require_all(["a"]))
            .pre_process(|_ctx, _dt| {})
            .process(|_ctx, _e, _dt| {})
            .post_process(|_ctx, _dt| {})
            .build()
            .unwrap();
        assert_eq!(sys.behavior.kind(), "processing");
    }

    #[test]
    fn test_sorted_processing_system_builds() {
        let sys = System::builder(require_all(["a"]))
            .process(|_ctx, _e, _dt| {})
            .compare(|_store, a, b| a.id() < b.id())
            .build()
            .unwrap();
        assert_eq!(sys.behavior.kind(), "sorted_processing");
    }

    #[test]
    fn test_compare_requires_process() {
        let err = System::builder(require_all(["a"]))
            .compare(|_store, a, b| a.id() < b.id())
            .build()
            .unwrap_err();
        assert!(matches!(err, SystemError::MissingCallback("process")));
    }

    #[test]
    fn test_pre_process_requires_process() {
        let err = System::builder(require_all(["a"]))
            .pre_process(|_ctx, _dt| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, SystemError::MissingCallback("process")));
    }

    #[test]
    fn test_update_and_process_conflict() {
        let err = System::builder(require_all(["a"]))
            .update(|_ctx, _dt| {})
            .process(|_ctx, _e, _dt| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, SystemError::ConflictingCallbacks(_, _)));
    }

    #[test]
    fn test_sorted_system_rejects_custom_on_modify() {
        let err = System::builder(require_all(["a"]))
            .process(|_ctx, _e, _dt| {})
            .compare(|_store, a, b| a.id() < b.id())
            .on_modify(|_ctx, _dt| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, SystemError::ConflictingCallbacks(_, _)));
    }

    #[test]
    fn test_tags_recorded() {
        let sys = System::builder(require_all(["a"]))
            .tag("draw")
            .tag("debug")
            .build()
            .unwrap();
        assert!(sys.tags().contains("draw"));
        assert!(sys.tags().contains("debug"));
    }
}
