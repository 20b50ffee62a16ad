//! Embeddable entity-component-system kernel.
//!
//! Entities are component bags keyed by string name; filters from
//! [`pulse_filter`] decide which entities each system sees. All
//! structural changes are deferred: spawning, despawning, and system
//! registration queue up and apply at the next [`World::refresh`] or at
//! the head of [`World::update`], which then runs every system through
//! the wrap-phase schedule.
//!
//! ```no_run
//! use pulse_ecs::{System, World};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut world = World::new();
//! world.add_system(
//!     System::builder(pulse_filter::parse("position & velocity")?)
//!         .process(|_ctx, _entity, _dt| {
//!             // integrate positions here
//!         })
//!         .build()?,
//! );
//!
//! let e = world.spawn();
//! world.set_component(e, "position", json!({"x": 0.0, "y": 0.0}))?;
//! world.set_component(e, "velocity", json!({"x": 1.0, "y": 0.0}))?;
//!
//! world.update(1.0 / 60.0);
//! # Ok(())
//! # }
//! ```

mod context;
mod entity;
mod registry;
mod scheduler;
mod store;
mod system;
mod world;

pub use context::SystemContext;
pub use entity::Entity;
pub use store::EntityStore;
pub use system::{
    CompareFn, EntityHookFn, ProcessFn, System, SystemBuilder, SystemError, SystemId, TickFn,
    WorldHookFn,
};
pub use world::{World, WorldError};

pub use pulse_filter::{
    parse, reject_all, reject_any, require_all, require_any, Filter, FilterError,
};
