//! Bouncing-particles demo: a processing system integrating positions, a
//! sorted processing system reporting the highest particles first, and a
//! wrap system timing the whole batch.
//!
//! Run with `RUST_LOG=debug` to watch the reconciliation and tick logs.

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulse_ecs::{parse, System, World};

const FLOOR: f64 = 0.0;
const GRAVITY: f64 = -9.81;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulse_ecs=info".parse()?))
        .init();

    let mut world = World::new();

    // Integrate velocity and position; bounce off the floor.
    world.add_system(
        System::builder(parse("position & velocity")?)
            .process(|ctx, entity, dt| {
                let vy = ctx
                    .get_component(entity, "velocity")
                    .ok()
                    .and_then(|v| v["y"].as_f64())
                    .unwrap_or(0.0);
                let y = ctx
                    .get_component(entity, "position")
                    .ok()
                    .and_then(|v| v["y"].as_f64())
                    .unwrap_or(0.0);

                let mut vy = vy + GRAVITY * dt;
                let mut y = y + vy * dt;
                if y < FLOOR {
                    y = FLOOR;
                    vy = -vy * 0.8;
                }

                let _ = ctx.set_component(entity, "velocity", json!({ "y": vy }));
                let _ = ctx.set_component(entity, "position", json!({ "y": y }));
            })
            .build()?,
    );

    // Report particles from highest to lowest.
    world.add_system(
        System::builder(parse("position")?)
            .compare(|store, a, b| {
                let height = |e| {
                    store
                        .get_component(e, "position")
                        .ok()
                        .and_then(|v| v["y"].as_f64())
                        .unwrap_or(0.0)
                };
                height(a) > height(b)
            })
            .process(|ctx, entity, _dt| {
                if let Ok(pos) = ctx.get_component(entity, "position") {
                    info!(%entity, y = pos["y"].as_f64(), "particle");
                }
            })
            .build()?,
    );

    // Bracket each frame with a marker, regardless of sibling order.
    world.add_system(
        System::builder(parse("position")?)
            .pre_wrap(|_ctx, _dt| info!("frame begin"))
            .post_wrap(|_ctx, _dt| info!("frame end"))
            .build()?,
    );

    for i in 0..3 {
        let e = world.spawn();
        world.set_component(e, "position", json!({ "y": 10.0 + f64::from(i) }))?;
        world.set_component(e, "velocity", json!({ "y": 0.0 }))?;
    }

    for _ in 0..120 {
        world.update(1.0 / 60.0);
    }

    info!(entities = world.entity_count(), "simulation finished");
    Ok(())
}
