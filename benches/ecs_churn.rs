//! Create/destroy churn and iteration timings for the ECS
//!
//! Run with: cargo bench --bench ecs_churn

use std::hint::black_box;
use std::time::Instant;

use tilecs::components::{register_all, Position, Velocity};
use tilecs::ecs::{EntityWorld, Query};

const ENTITIES: usize = 50_000;
const ROUNDS: usize = 20;

fn main() {
    let mut world = EntityWorld::with_max_entities(ENTITIES as u32);
    if let Err(err) = register_all(&mut world) {
        eprintln!("setup failed: {err}");
        return;
    }

    let start = Instant::now();
    for _ in 0..ROUNDS {
        let entities = world.create_many(ENTITIES);
        for &e in &entities {
            world.add_component(e, Position::new(1.0, 2.0));
            world.add_component(e, Velocity { dx: 0.5, dy: 0.5 });
        }
        for e in entities {
            world.destroy(e);
        }
    }
    let elapsed = start.elapsed();
    println!(
        "churn: {:.1} ns per create+add+destroy",
        elapsed.as_nanos() as f64 / (ROUNDS * ENTITIES) as f64
    );

    let entities = world.create_many(ENTITIES);
    for &e in &entities {
        world.add_component(e, Position::default());
        world.add_component(e, Velocity { dx: 1.0, dy: 1.0 });
    }
    let query = world.query().with::<(Position, Velocity)>().build();

    let start = Instant::now();
    for _ in 0..ROUNDS {
        world.for_each(query, |w, e| {
            let Some(velocity) = w.get::<Velocity>(e).copied() else {
                return;
            };
            if let Some(position) = w.get_mut::<Position>(e) {
                position.x += velocity.dx;
                position.y += velocity.dy;
            }
        });
    }
    let elapsed = start.elapsed();
    println!(
        "iteration: {:.1} ns per entity visit",
        elapsed.as_nanos() as f64 / (ROUNDS * ENTITIES) as f64
    );
    black_box(world.iter(Query::ALL).count());
}
