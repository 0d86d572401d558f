use std::cell::RefCell;
use std::rc::Rc;

use tilecs::components::{register_all, Lifetime, Position, Velocity};
use tilecs::ecs::{Entity, EntityWorld, Query, Signature};

fn world() -> EntityWorld {
    let mut world = EntityWorld::with_max_entities(64);
    register_all(&mut world).expect("components register");
    world
}

type Trace = Rc<RefCell<Vec<String>>>;

fn traced(world: &mut EntityWorld) -> Trace {
    let trace: Trace = Rc::default();
    let sink = Rc::clone(&trace);
    world.on_add::<Position>(move |_, e| sink.borrow_mut().push(format!("add {}", e.id)));
    let sink = Rc::clone(&trace);
    world.before_remove::<Position>(move |w, e| {
        let x = w.get::<Position>(e).map(|p| p.x);
        sink.borrow_mut().push(format!("remove {} at {:?}", e.id, x));
    });
    trace
}

#[test]
fn hooks_fire_synchronously_outside_deferral() {
    let mut world = world();
    let trace = traced(&mut world);
    let e = world.create();

    world.add_component(e, Position::new(3.0, 0.0));
    assert_eq!(trace.borrow().len(), 1);
    world.remove_component::<Position>(e);
    assert_eq!(
        *trace.borrow(),
        vec!["add 0".to_string(), "remove 0 at Some(3.0)".to_string()]
    );
}

#[test]
fn deferred_events_replay_fifo_after_stop() {
    let mut world = world();
    let trace = traced(&mut world);
    let entities = world.create_many(3);

    world.start_deferring();
    for &e in &entities {
        world.add_component(e, Position::new(e.id as f32, 0.0));
    }
    world.remove_component::<Position>(entities[1]);
    assert!(trace.borrow().is_empty());
    world.stop_deferring();

    // the remove hook ran after eviction, so the value is gone
    assert_eq!(
        *trace.borrow(),
        vec!["add 0", "add 1", "add 2", "remove 1 at None"]
    );
    assert_eq!(world.pending_events(), 0);
}

#[test]
fn unmatched_stop_is_ignored() {
    let mut world = world();
    world.stop_deferring();
    assert!(!world.is_deferring());

    let trace = traced(&mut world);
    let e = world.create();
    world.add_component(e, Position::default());
    assert_eq!(trace.borrow().len(), 1);
}

#[test]
fn destroy_runs_remove_hooks_before_eviction() {
    let mut world = world();
    let trace = traced(&mut world);
    let e = world.create();
    world.add_component(e, Position::new(7.0, 0.0));
    world.destroy(e);

    assert_eq!(trace.borrow().last().map(String::as_str), Some("remove 0 at Some(7.0)"));
}

#[test]
fn hook_can_mutate_world() {
    let mut world = world();
    // every positioned entity gets a lifetime
    world.on_add::<Position>(|w, e| {
        w.add_component(e, Lifetime { remaining_ticks: 5 });
    });

    let e = world.create();
    world.add_component(e, Position::default());
    assert_eq!(world.get::<Lifetime>(e).map(|l| l.remaining_ticks), Some(5));
}

#[test]
fn destroy_during_iteration_is_safe() {
    let mut world = world();
    let entities = world.create_many(10);
    for &e in &entities {
        world.add_component(e, Velocity::default());
    }
    let query = world.query().with::<(Velocity,)>().build();

    let mut visited: Vec<Entity> = Vec::new();
    world.deferred(|w| {
        w.for_each(query, |w, e| {
            visited.push(e);
            if e.id % 2 == 0 {
                w.destroy(e);
            }
        });
    });

    // no entity visited twice and nothing dead remains
    let mut unique = visited.clone();
    unique.sort_by_key(|e| e.id);
    unique.dedup();
    assert_eq!(unique.len(), visited.len());
    assert!(world.iter(Query::ALL).all(|e| world.exists(e)));
    assert_eq!(world.pool_len::<Velocity>(), world.entity_count());
}

#[test]
fn entities_created_during_iteration_are_not_visited() {
    let mut world = world();
    world.create_many(4);

    let mut visited = 0;
    world.for_each(|_: Signature| true, |w, _| {
        visited += 1;
        w.create();
    });
    assert_eq!(visited, 4);
    assert_eq!(world.entity_count(), 8);
}

#[test]
fn entity_created_into_freed_slot_is_not_visited() {
    let mut world = world();
    let entities = world.create_many(3);

    let mut visited = Vec::new();
    let mut created = Vec::new();
    world.for_each(|_: Signature| true, |w, e| {
        visited.push(e);
        if e == entities[0] {
            w.destroy(e);
            created.push(w.create());
        }
    });

    // the new entity reuses id 0 and lands in the live array below the start count
    assert_eq!(created, vec![Entity::new(entities[0].id, entities[0].version + 1)]);
    assert!(visited.iter().all(|e| !created.contains(e)));
    assert_eq!(visited, vec![entities[0], entities[1]]);
    assert_eq!(world.entity_count(), 3);
}

#[test]
fn before_remove_hook_may_destroy_its_entity() {
    let mut world = world();
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    world.before_remove::<Position>(move |w, e| {
        *sink.borrow_mut() += 1;
        if w.exists(e) {
            w.destroy(e);
        }
    });

    let removed = world.create();
    world.add_component(removed, Position::default());
    world.add_component(removed, Velocity::default());
    assert!(world.remove_component::<Position>(removed));
    assert!(!world.exists(removed));
    // once for the removal, once for the destroy it triggered
    assert_eq!(*calls.borrow(), 2);

    let destroyed = world.create();
    world.add_component(destroyed, Position::default());
    assert!(world.destroy(destroyed));
    assert!(!world.exists(destroyed));
    assert_eq!(*calls.borrow(), 3);

    assert_eq!(world.pool_len::<Position>(), 0);
    assert_eq!(world.pool_len::<Velocity>(), 0);
    assert_eq!(world.entity_count(), 0);
}

#[test]
fn early_return_stops_at_match() {
    let mut world = world();
    let entities = world.create_many(6);
    world.add_component(entities[3], Position::default());

    let found = world.for_each_early_return(Query::ALL, |w, e| w.has_component::<Position>(e));
    assert_eq!(found, Some(entities[3]));
    assert_eq!(world.for_each_early_return(Query::ALL, |_, _| false), None);
}
