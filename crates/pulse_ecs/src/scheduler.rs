//! Scheduler — system selection and the wrap-phase tick.
//!
//! One tick runs in three phases over the selected systems:
//!
//! 1. `pre_wrap(dt)` in ascending index order.
//! 2. Each system's own update behavior, in ascending index order.
//! 3. `post_wrap(dt)` in **descending** index order.
//!
//! The reversed third phase is what lets a later-indexed system wrap the
//! whole batch: its `pre_wrap` runs after every earlier system's, and its
//! `post_wrap` runs before theirs, bracketing all sibling updates.

use std::cmp::Ordering;

use tracing::trace;

use pulse_filter::Filter;

use crate::context::SystemContext;
use crate::entity::Entity;
use crate::registry::{SystemRegistry, SystemSlot};
use crate::store::EntityStore;
use crate::system::{Behavior, CompareFn, SystemId};
use crate::world::OpQueue;

/// Select the active systems whose tag set matches `filter`, in
/// execution order. `None` selects all active systems.
pub(crate) fn select(registry: &SystemRegistry, filter: Option<&Filter>) -> Vec<SystemId> {
    registry
        .slots()
        .iter()
        .filter(|slot| slot.active)
        .filter(|slot| filter.is_none_or(|f| f.matches(&slot.system.tags)))
        .map(|slot| slot.id)
        .collect()
}

/// Run one tick over the selected systems.
pub(crate) fn run_tick(
    entities: &mut EntityStore,
    registry: &mut SystemRegistry,
    ops: &mut OpQueue,
    selected: &[SystemId],
    dt: f64,
) {
    // Phase 1: pre-wrap, ascending.
    for &id in selected {
        let Some(slot) = registry.get_mut(id) else {
            continue;
        };
        if let Some(f) = slot.system.hooks.pre_wrap.as_mut() {
            let mut ctx = SystemContext {
                entities: &mut *entities,
                ops: &mut *ops,
            };
            f(&mut ctx, dt);
        }
    }

    // Phase 2: per-system update behavior, ascending.
    for &id in selected {
        let Some(slot) = registry.get_mut(id) else {
            continue;
        };
        trace!(system = %id, kind = slot.system.behavior.kind(), "running system");
        run_behavior(slot, entities, ops, dt);
    }

    // Phase 3: post-wrap, descending.
    for &id in selected.iter().rev() {
        let Some(slot) = registry.get_mut(id) else {
            continue;
        };
        if let Some(f) = slot.system.hooks.post_wrap.as_mut() {
            let mut ctx = SystemContext {
                entities: &mut *entities,
                ops: &mut *ops,
            };
            f(&mut ctx, dt);
        }
    }
}

fn run_behavior(slot: &mut SystemSlot, entities: &mut EntityStore, ops: &mut OpQueue, dt: f64) {
    let SystemSlot {
        matched, system, ..
    } = slot;

    match &mut system.behavior {
        Behavior::Plain { update } => {
            if let Some(f) = update {
                let mut ctx = SystemContext {
                    entities: &mut *entities,
                    ops: &mut *ops,
                };
                f(&mut ctx, dt);
            }
        }
        Behavior::Processing {
            pre_process,
            process,
            post_process,
        } => {
            run_processing(
                matched,
                pre_process.as_mut(),
                process,
                post_process.as_mut(),
                entities,
                ops,
                dt,
            );
        }
        Behavior::SortedProcessing {
            compare,
            pre_process,
            process,
            post_process,
        } => {
            // Comparator-relevant components may have changed since the
            // last reconciliation; keep the order honest every tick.
            sort_matched(matched, compare, entities);
            run_processing(
                matched,
                pre_process.as_mut(),
                process,
                post_process.as_mut(),
                entities,
                ops,
                dt,
            );
        }
    }
}

fn run_processing(
    matched: &[Entity],
    pre_process: Option<&mut crate::system::TickFn>,
    process: &mut crate::system::ProcessFn,
    post_process: Option<&mut crate::system::TickFn>,
    entities: &mut EntityStore,
    ops: &mut OpQueue,
    dt: f64,
) {
    if let Some(f) = pre_process {
        let mut ctx = SystemContext {
            entities: &mut *entities,
            ops: &mut *ops,
        };
        f(&mut ctx, dt);
    }
    for &entity in matched {
        let mut ctx = SystemContext {
            entities: &mut *entities,
            ops: &mut *ops,
        };
        process(&mut ctx, entity, dt);
    }
    if let Some(f) = post_process {
        let mut ctx = SystemContext {
            entities: &mut *entities,
            ops: &mut *ops,
        };
        f(&mut ctx, dt);
    }
}

/// Stable-sort a matched set with a system's comparator. Entities the
/// comparator considers equivalent keep their prior relative order.
pub(crate) fn sort_matched(
    matched: &mut Vec<Entity>,
    compare: &mut CompareFn,
    entities: &EntityStore,
) {
    matched.sort_by(|&a, &b| {
        if compare(entities, a, b) {
            Ordering::Less
        } else if compare(entities, b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use pulse_filter::{require_all, require_any};

    use crate::system::System;
    use crate::world::World;

    type Log = Rc<RefCell<Vec<String>>>;

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    /// A plain system that records its wrap and update callbacks under
    /// the given name.
    fn wrapped_system(log: &Log, name: &'static str) -> System {
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        System::builder(require_all(["a"]))
            .pre_wrap(move |_ctx, _dt| l1.borrow_mut().push(format!("pre {name}")))
            .update(move |_ctx, _dt| l2.borrow_mut().push(format!("update {name}")))
            .post_wrap(move |_ctx, _dt| l3.borrow_mut().push(format!("post {name}")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_wrap_phases_bracket_all_updates() {
        let log = new_log();
        let mut world = World::new();
        world.add_system(wrapped_system(&log, "a"));
        world.add_system(wrapped_system(&log, "b"));
        world.update(1.0 / 60.0);

        assert_eq!(
            *log.borrow(),
            vec!["pre a", "pre b", "update a", "update b", "post b", "post a"]
        );

        // Deterministic across repeated ticks.
        log.borrow_mut().clear();
        world.update(1.0 / 60.0);
        assert_eq!(
            *log.borrow(),
            vec!["pre a", "pre b", "update a", "update b", "post b", "post a"]
        );
    }

    #[test]
    fn test_set_system_index_reorders_next_update() {
        let log = new_log();
        let mut world = World::new();
        world.add_system(wrapped_system(&log, "a"));
        let b = world.add_system(wrapped_system(&log, "b"));
        world.refresh();

        let old = world.set_system_index(b, -1).unwrap();
        assert_eq!(old, 1);

        world.update(0.1);
        assert_eq!(
            *log.borrow(),
            vec!["pre b", "pre a", "update b", "update a", "post a", "post b"]
        );
    }

    #[test]
    fn test_processing_protocol_order() {
        let log = new_log();
        let mut world = World::new();
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        world.add_system(
            System::builder(require_all(["a"]))
                .pre_process(move |_ctx, _dt| l1.borrow_mut().push("pre".to_string()))
                .process(move |_ctx, e, _dt| l2.borrow_mut().push(format!("process {e}")))
                .post_process(move |_ctx, _dt| l3.borrow_mut().push("post".to_string()))
                .build()
                .unwrap(),
        );
        let e1 = world.spawn();
        let e2 = world.spawn();
        world.set_component(e1, "a", json!(null)).unwrap();
        world.set_component(e2, "a", json!(null)).unwrap();
        world.update(0.1);

        assert_eq!(
            *log.borrow(),
            vec![
                "pre".to_string(),
                format!("process {e1}"),
                format!("process {e2}"),
                "post".to_string()
            ]
        );
    }

    #[test]
    fn test_processing_receives_dt() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        let mut world = World::new();
        world.add_system(
            System::builder(require_all(["a"]))
                .process(move |_ctx, _e, dt| s.borrow_mut().push(dt))
                .build()
                .unwrap(),
        );
        let e = world.spawn();
        world.set_component(e, "a", json!(null)).unwrap();
        world.update(0.25);
        assert_eq!(*seen.borrow(), vec![0.25]);
    }

    fn priority_sorted_system(log: &Log) -> System {
        let l = log.clone();
        System::builder(require_all(["priority"]))
            .process(move |ctx, e, _dt| {
                let p = ctx.get_component(e, "priority").unwrap().clone();
                l.borrow_mut().push(format!("{p}"));
            })
            .compare(|store, a, b| {
                let pa = store
                    .get_component(a, "priority")
                    .ok()
                    .and_then(|v| v.as_f64())
                    .unwrap_or(f64::MAX);
                let pb = store
                    .get_component(b, "priority")
                    .ok()
                    .and_then(|v| v.as_f64())
                    .unwrap_or(f64::MAX);
                pa < pb
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_sorted_processing_orders_by_priority() {
        let log = new_log();
        let mut world = World::new();
        world.add_system(priority_sorted_system(&log));
        for p in [3, 1, 2] {
            let e = world.spawn();
            world.set_component(e, "priority", json!(p)).unwrap();
        }
        world.update(0.1);
        assert_eq!(*log.borrow(), vec!["1", "2", "3"]);

        // Entities added out of order across a refresh stay sorted.
        log.borrow_mut().clear();
        let e = world.spawn();
        world.set_component(e, "priority", json!(0)).unwrap();
        world.refresh();
        world.update(0.1);
        assert_eq!(*log.borrow(), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn test_sorted_processing_tracks_component_mutation() {
        let log = new_log();
        let mut world = World::new();
        world.add_system(priority_sorted_system(&log));
        let e1 = world.spawn();
        let e2 = world.spawn();
        world.set_component(e1, "priority", json!(1)).unwrap();
        world.set_component(e2, "priority", json!(2)).unwrap();
        world.update(0.1);
        assert_eq!(*log.borrow(), vec!["1", "2"]);

        // Swap priorities without a structural change; the pre-process
        // sort picks it up on the very next tick.
        log.borrow_mut().clear();
        world.set_component(e1, "priority", json!(5)).unwrap();
        world.update(0.1);
        assert_eq!(*log.borrow(), vec!["2", "5"]);
    }

    #[test]
    fn test_update_filtered_selects_by_tag() {
        let log = new_log();
        let mut world = World::new();
        let l = log.clone();
        world.add_system(
            System::builder(require_all(["a"]))
                .tag("draw")
                .update(move |_ctx, _dt| l.borrow_mut().push("draw".to_string()))
                .build()
                .unwrap(),
        );
        let l = log.clone();
        world.add_system(
            System::builder(require_all(["a"]))
                .tag("logic")
                .update(move |_ctx, _dt| l.borrow_mut().push("logic".to_string()))
                .build()
                .unwrap(),
        );

        world.update_filtered(0.1, &require_any(["draw"]));
        assert_eq!(*log.borrow(), vec!["draw"]);

        log.borrow_mut().clear();
        world.update(0.1);
        assert_eq!(*log.borrow(), vec!["draw", "logic"]);
    }

    #[test]
    fn test_pending_removal_system_does_not_run() {
        let log = new_log();
        let mut world = World::new();
        let id = world.add_system(wrapped_system(&log, "a"));
        world.refresh();
        world.remove_system(id);

        // The removal itself reconciles at the head of update, so the
        // system is gone before phases run; either way nothing fires.
        world.update(0.1);
        assert!(log.borrow().iter().all(|l| !l.contains('a')));
    }

    #[test]
    fn test_despawn_during_process_is_deferred() {
        let mut world = World::new();
        world.add_system(
            System::builder(require_all(["a"]))
                .process(|ctx, e, _dt| {
                    ctx.despawn(e);
                })
                .build()
                .unwrap(),
        );
        let e = world.spawn();
        world.set_component(e, "a", json!(null)).unwrap();
        world.update(0.1);

        // Still live until the next reconciliation.
        assert_eq!(world.entity_count(), 1);
        world.refresh();
        assert_eq!(world.entity_count(), 0);
        assert!(!world.store().exists(e));
    }
}
