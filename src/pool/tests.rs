use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::{config::CacheConfig, utils::{Quat, Vec3}};

// ----------------------------------------------
// Test helpers
// ----------------------------------------------

struct Projectile {
    damage: u32,
    spawn_count: u32,
    despawn_count: u32,
    kills: Rc<Cell<u32>>,
}

impl Spawnable for Projectile {
    fn on_spawned(&mut self, _transform: &Transform) {
        self.spawn_count += 1;
    }

    fn on_despawned(&mut self) {
        self.despawn_count += 1;
    }

    fn on_killed(&mut self) {
        self.kills.set(self.kills.get() + 1);
    }
}

fn projectile_template(name: &str, kills: &Rc<Cell<u32>>) -> Template<Projectile> {
    let kills = Rc::clone(kills);
    Template::new(name, move || {
        Some(Projectile { damage: 10, spawn_count: 0, despawn_count: 0, kills: Rc::clone(&kills) })
    })
}

fn at(x: f32) -> Transform {
    Transform::from_position(Vec3::new(x, 0.0, 0.0))
}

// Every instance a cache knows about is in exactly one of its two sets.
fn assert_exclusive(pool: &SpawnPool<Projectile>, prefab_id: PrefabId) {
    let cache = pool.find_cache(prefab_id).unwrap();
    for id in cache.iter_active() {
        assert!(!cache.is_free(id), "{id} is both active and free");
        assert!(pool.is_spawned(id));
    }
    for id in cache.iter_free() {
        assert!(!cache.is_active(id), "{id} is both free and active");
        assert!(!pool.is_spawned(id));
        assert!(!pool.get(id).unwrap().is_active());
    }
    let mut free: Vec<InstanceId> = cache.iter_free().collect();
    free.sort_by_key(|id| id.index());
    free.dedup();
    assert_eq!(free.len(), cache.free_count(), "duplicate entries in the free set");
}

// ----------------------------------------------
// Cache growth and recycling
// ----------------------------------------------

#[test]
fn test_grow_and_recycle_scenario() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("arrow", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();
    assert_eq!(pool.find_cache(prefab_id).unwrap().free_count(), 2);

    let a = pool.spawn(&template, at(1.0), None).unwrap();
    let b = pool.spawn(&template, at(2.0), None).unwrap();
    {
        let cache = pool.find_cache(prefab_id).unwrap();
        assert_eq!(cache.active_count(), 2);
        assert_eq!(cache.free_count(), 0);
    }

    // Free set is exhausted; grows by resize_buffer.
    let c = pool.spawn(&template, at(3.0), None).unwrap();
    {
        let cache = pool.find_cache(prefab_id).unwrap();
        assert_eq!(cache.active_count(), 3);
        assert_eq!(cache.free_count(), 0);
    }

    for id in [a, b, c] {
        assert_eq!(pool.despawn(id), Ok(true));
    }

    let cache = pool.find_cache(prefab_id).unwrap();
    assert_eq!(cache.active_count(), 0);
    assert_eq!(cache.free_count(), 3);
    assert_eq!(kills.get(), 0);
    assert_exclusive(&pool, prefab_id);
}

#[test]
fn test_growth_policy_respects_limit() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("shell", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(0, 3, 5)).unwrap();
    assert_eq!(pool.find_cache(prefab_id).unwrap().total_count(), 0);

    // First spawn grows the free set by 3 before handing one out.
    let first = pool.spawn(&template, at(0.0), None).unwrap();
    {
        let cache = pool.find_cache(prefab_id).unwrap();
        assert_eq!(cache.total_count(), 3);
        assert_eq!(cache.active_count(), 1);
        assert_eq!(cache.free_count(), 2);
        assert!(pool.controller(first).unwrap().is_spawned());
        assert!(!pool.controller(first).unwrap().is_cached());
    }

    let mut spawned = vec![first];
    for i in 1..5 {
        spawned.push(pool.spawn(&template, at(i as f32), None).unwrap());
    }
    {
        let cache = pool.find_cache(prefab_id).unwrap();
        assert_eq!(cache.cached_count(), 5);
        assert_eq!(cache.free_count(), 0);
    }

    // Sixth request is past the limit: transient instance.
    let sixth = pool.spawn(&template, at(6.0), None).unwrap();
    let cache = pool.find_cache(prefab_id).unwrap();
    assert_eq!(cache.cached_count(), 5);
    assert_eq!(cache.overflow_count(), 1);
    assert_eq!(cache.active_count(), 6);
    assert!(cache.is_active(sixth));
    assert!(pool.controller(sixth).unwrap().is_transient());
    assert_exclusive(&pool, prefab_id);
}

#[test]
fn test_overflow_instance_is_destroyed_on_despawn() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("flare", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 1, 1)).unwrap();

    let pooled = pool.spawn(&template, at(0.0), None).unwrap();
    let overflow = pool.spawn(&template, at(1.0), None).unwrap();
    assert!(pool.controller(overflow).unwrap().is_transient());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    pool.add_instance_listener(overflow, move |event, _| seen_clone.borrow_mut().push(event.kind)).unwrap();

    assert_eq!(pool.despawn(overflow), Ok(true));
    assert_eq!(kills.get(), 1);
    assert_eq!(*seen.borrow(), vec![SpawnEventKind::Despawned, SpawnEventKind::Killed]);
    assert!(pool.get(overflow).is_none());

    assert_eq!(pool.despawn(pooled), Ok(true));
    let cache = pool.find_cache(prefab_id).unwrap();
    assert_eq!(cache.total_count(), 1);
    assert_eq!(cache.overflow_count(), 0);
    assert_eq!(kills.get(), 1);
}

#[test]
fn test_hard_limit_rejects_spawn() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("mine", &kills);

    let mut pool = SpawnPool::new("test");
    let settings = CacheSettings::new(2, 1, 2).with_hard_limit(true);
    let prefab_id = pool.register(&template, settings).unwrap();

    assert!(pool.spawn(&template, at(0.0), None).is_some());
    let last = pool.spawn(&template, at(0.0), None).unwrap();
    assert!(pool.spawn(&template, at(0.0), None).is_none());
    assert_eq!(pool.find_cache(prefab_id).unwrap().active_count(), 2);

    // Room again once something is returned.
    assert_eq!(pool.despawn(last), Ok(true));
    assert_eq!(pool.spawn(&template, at(0.0), None), Some(last));
}

#[test]
fn test_round_trip_recycles_same_instance() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("orb", &kills);

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(3, 1, 0)).unwrap();

    let parent = ParentId(42);
    let first = pool.spawn(&template, at(1.0), Some(parent)).unwrap();
    {
        let object = pool.get(first).unwrap();
        assert!(object.is_active());
        assert_eq!(object.parent(), Some(parent));
        assert_eq!(object.transform(), at(1.0));
        assert!(object.controller().is_cached());
    }

    pool.object_mut(first).unwrap().damage = 99;
    assert_eq!(pool.despawn(first), Ok(true));
    {
        let object = pool.get(first).unwrap();
        assert!(!object.is_active());
        assert_eq!(object.parent(), None);
        assert_eq!(object.controller().state(), SpawnState::Cached);
    }

    let second = pool.spawn(&template, at(5.0), None).unwrap();
    assert_eq!(first, second);

    let projectile = pool.object(second).unwrap();
    assert_eq!(projectile.damage, 99); // Same underlying instance.
    assert_eq!(projectile.spawn_count, 2);
    assert_eq!(projectile.despawn_count, 1);
    assert_eq!(pool.get(second).unwrap().transform(), at(5.0));
}

#[test]
fn test_despawn_twice_returns_false() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("dart", &kills);

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let id = pool.spawn(&template, at(0.0), None).unwrap();
    assert_eq!(pool.despawn(id), Ok(true));
    assert_eq!(pool.despawn(id), Ok(false));
}

#[test]
fn test_exclusivity_under_churn() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("spark", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 2, 6)).unwrap();

    let mut live = Vec::new();
    for step in 0..40 {
        match step % 5 {
            0 | 1 | 2 => {
                if let Some(id) = pool.spawn(&template, at(step as f32), None) {
                    live.push(id);
                }
            },
            3 => {
                if let Some(id) = live.pop() {
                    assert_eq!(pool.despawn(id), Ok(true));
                }
            },
            _ => {
                if live.len() > 4 {
                    let id = live.remove(0);
                    assert_eq!(pool.purge(id), Ok(true));
                    assert!(pool.destroy(id));
                }
            },
        }
        assert_exclusive(&pool, prefab_id);
    }
}

// ----------------------------------------------
// Purge / destroy
// ----------------------------------------------

#[test]
fn test_purge_is_terminal() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("bolt", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let id = pool.spawn(&template, at(0.0), None).unwrap();
    assert_eq!(pool.purge(id), Ok(true));

    // Out of both sets, but still alive for the caller to destroy.
    let cache = pool.find_cache(prefab_id).unwrap();
    assert!(!cache.owns(id));
    assert_eq!(pool.controller(id).unwrap().state(), SpawnState::Purged);
    assert!(pool.get(id).unwrap().is_active());

    assert_eq!(pool.despawn(id), Ok(false));
    assert_eq!(pool.purge(id), Ok(false));
    assert_eq!(pool.clone_instance(id), Ok(None));

    // A new spawn never resurrects the purged instance.
    let other = pool.spawn(&template, at(0.0), None).unwrap();
    assert_ne!(other, id);
    let cache = pool.find_cache(prefab_id).unwrap();
    assert!(!cache.owns(id));

    assert_eq!(kills.get(), 0);
    assert!(pool.destroy(id));
    assert_eq!(kills.get(), 1);
    assert!(!pool.destroy(id));
    assert!(pool.get(id).is_none());
}

#[test]
fn test_purge_free_instance() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("pellet", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();

    let free_id = pool.find_cache(prefab_id).unwrap().iter_free().next().unwrap();
    assert_eq!(pool.purge(free_id), Ok(true));
    assert_eq!(pool.find_cache(prefab_id).unwrap().free_count(), 1);

    // The remaining free instance is handed out, never the purged one.
    let spawned = pool.spawn(&template, at(0.0), None).unwrap();
    assert_ne!(spawned, free_id);
}

#[test]
fn test_destroy_active_instance_fires_killed() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("rocket", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let events_clone = Rc::clone(&events);
    pool.add_listener(move |event, _| events_clone.borrow_mut().push(event.kind));

    let id = pool.spawn(&template, at(0.0), None).unwrap();
    assert!(pool.destroy(id));

    assert_eq!(*events.borrow(), vec![SpawnEventKind::Spawned, SpawnEventKind::Killed]);
    assert_eq!(kills.get(), 1);
    assert_eq!(pool.find_cache(prefab_id).unwrap().total_count(), 0);
    assert_eq!(pool.despawn(id), Ok(false));
}

// ----------------------------------------------
// Registration
// ----------------------------------------------

#[test]
fn test_duplicate_registration_is_rejected() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("laser", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();

    let result = pool.register(&template, CacheSettings::new(10, 5, 0));
    assert!(matches!(result, Err(PoolError::DuplicateRegistration { id, .. }) if id == prefab_id));

    // No partial mutation.
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.instance_count(), 2);
    assert_eq!(pool.find_cache(prefab_id).unwrap().settings().cache_size, 2);
}

#[test]
fn test_invalid_arguments() {
    let mut pool: SpawnPool<Projectile> = SpawnPool::new("test");

    let nameless: Template<Projectile> = Template::new("", || None);
    assert!(matches!(pool.register(&nameless, CacheSettings::default()), Err(PoolError::InvalidArgument(_))));
    assert!(pool.spawn(&nameless, at(0.0), None).is_none());
    assert!(pool.is_empty());

    assert!(matches!(pool.despawn(InstanceId::invalid()), Err(PoolError::InvalidArgument(_))));
    assert!(matches!(pool.purge(InstanceId::invalid()), Err(PoolError::InvalidArgument(_))));
    assert!(matches!(pool.clone_instance(InstanceId::invalid()), Err(PoolError::InvalidOperation(_))));
    assert!(!pool.destroy(InstanceId::invalid()));
}

#[test]
fn test_unregister_destroys_instances() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("grenade", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(3, 1, 0)).unwrap();

    let active = pool.spawn(&template, at(0.0), None).unwrap();
    assert!(pool.contains(prefab_id));

    assert!(pool.unregister(prefab_id));
    assert!(!pool.contains(prefab_id));
    assert!(pool.find_cache(prefab_id).is_none());
    assert_eq!(kills.get(), 3);
    assert_eq!(pool.instance_count(), 0);
    assert!(pool.get(active).is_none());
    assert_eq!(pool.despawn(active), Ok(false));

    assert!(!pool.unregister(prefab_id));
}

#[test]
fn test_reload_cache_prewarms_again() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("ember", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();
    let active = pool.spawn(&template, at(0.0), None).unwrap();

    assert!(pool.reload_cache(prefab_id));
    assert_eq!(kills.get(), 2);
    assert!(pool.get(active).is_none());

    let cache = pool.find_cache(prefab_id).unwrap();
    assert_eq!(cache.free_count(), 2);
    assert_eq!(cache.active_count(), 0);

    assert!(pool.clear_cache(prefab_id));
    assert_eq!(pool.find_cache(prefab_id).unwrap().total_count(), 0);
    assert!(pool.contains(prefab_id));
}

#[test]
fn test_register_from_config() {
    let kills = Rc::new(Cell::new(0));
    let templates = [
        projectile_template("bullet", &kills),
        projectile_template("casing", &kills),
    ];

    let configs = PoolConfigs {
        caches: vec![CacheConfig::new("bullet", CacheSettings::new(4, 2, 16))],
        ..PoolConfigs::default()
    };

    let mut pool = SpawnPool::new("test");
    assert_eq!(pool.register_from_config(&templates, &configs), Ok(1));
    assert!(pool.contains(templates[0].id()));
    assert!(!pool.contains(templates[1].id()));
    assert_eq!(pool.find_cache(templates[0].id()).unwrap().free_count(), 4);
}

// ----------------------------------------------
// Transient and foreign instances
// ----------------------------------------------

#[test]
fn test_unregistered_template_spawns_transient() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("debris", &kills);

    let mut pool = SpawnPool::new("test");
    let id = pool.spawn(&template, at(2.0), None).unwrap();

    assert!(pool.is_spawned(id));
    assert!(pool.controller(id).unwrap().is_transient());
    assert!(pool.is_empty());
    assert_eq!(pool.instance_count(), 1);

    // Not in any cache's active set.
    assert_eq!(pool.despawn(id), Ok(false));

    assert!(pool.destroy(id));
    assert_eq!(kills.get(), 1);
}

#[test]
fn test_instantiation_failure_yields_none() {
    let budget = Rc::new(Cell::new(2));
    let budget_clone = Rc::clone(&budget);
    let kills = Rc::new(Cell::new(0));
    let kills_clone = Rc::clone(&kills);

    let template = Template::new("limited", move || {
        if budget_clone.get() == 0 {
            return None;
        }
        budget_clone.set(budget_clone.get() - 1);
        Some(Projectile { damage: 1, spawn_count: 0, despawn_count: 0, kills: Rc::clone(&kills_clone) })
    });

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(0, 1, 0)).unwrap();

    assert!(pool.spawn(&template, at(0.0), None).is_some());
    assert!(pool.spawn(&template, at(0.0), None).is_some());
    assert!(pool.spawn(&template, at(0.0), None).is_none());
}

#[test]
fn test_foreign_handles_are_ignored() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("shard", &kills);

    let mut pool_a = SpawnPool::new("a");
    let mut pool_b = SpawnPool::new("b");
    pool_a.register(&template, CacheSettings::new(1, 1, 0)).unwrap();
    pool_b.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let id = pool_a.spawn(&template, at(0.0), None).unwrap();
    assert_eq!(pool_b.despawn(id), Ok(false));
    assert_eq!(pool_b.purge(id), Ok(false));
    assert_eq!(pool_b.clone_instance(id), Ok(None));
    assert!(!pool_b.destroy(id));
    assert!(pool_b.add_instance_listener(id, |_, _| {}).is_none());

    assert!(pool_a.is_spawned(id));
    assert_eq!(pool_a.despawn(id), Ok(true));
}

#[test]
fn test_clone_instance() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("clone", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();

    let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_yaw(0.5));
    let source = pool.spawn(&template, transform, Some(ParentId(7))).unwrap();
    let copy = pool.clone_instance(source).unwrap().unwrap();

    assert_ne!(source, copy);
    let object = pool.get(copy).unwrap();
    assert_eq!(object.transform(), transform);
    assert_eq!(object.parent(), Some(ParentId(7)));
    assert_eq!(object.controller().prefab_id(), prefab_id);
    assert_eq!(pool.find_cache(prefab_id).unwrap().active_count(), 2);
}

// ----------------------------------------------
// Notifications
// ----------------------------------------------

#[test]
fn test_despawn_notification_order() {
    events::clear_global_listeners();

    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("beam", &kills);

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let trace = Rc::new(RefCell::new(Vec::<String>::new()));

    let pool_trace = Rc::clone(&trace);
    pool.add_listener(move |event, object| {
        // Still active while listeners run.
        pool_trace.borrow_mut().push(format!("pool:{}:{}", event.kind, object.is_active()));
    });

    let id = pool.spawn(&template, at(0.0), None).unwrap();

    let instance_trace = Rc::clone(&trace);
    pool.add_instance_listener(id, move |event, object| {
        instance_trace.borrow_mut().push(format!("instance:{}:{}", event.kind, object.is_spawned()));
    }).unwrap();

    let global_trace = Rc::clone(&trace);
    let global_key = events::add_global_listener(move |event| {
        global_trace.borrow_mut().push(format!("global:{}", event.kind));
    });

    trace.borrow_mut().clear();
    assert_eq!(pool.despawn(id), Ok(true));

    assert_eq!(*trace.borrow(), vec![
        "pool:Despawned:true".to_string(),
        "instance:Despawned:true".to_string(),
        "global:Despawned".to_string(),
    ]);

    // Purge is bookkeeping only.
    trace.borrow_mut().clear();
    let id = pool.spawn(&template, at(0.0), None).unwrap();
    trace.borrow_mut().clear();
    assert_eq!(pool.purge(id), Ok(true));
    assert!(trace.borrow().is_empty());

    assert!(events::remove_global_listener(global_key));
    events::clear_global_listeners();
}

#[test]
fn test_spawn_event_carries_placement() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("probe", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let seen = Rc::new(RefCell::new(None));
    let seen_clone = Rc::clone(&seen);
    let key = pool.add_listener(move |event, _| *seen_clone.borrow_mut() = Some(*event));

    let id = pool.spawn(&template, at(4.0), None).unwrap();
    let event = seen.borrow().unwrap();
    assert_eq!(event.kind, SpawnEventKind::Spawned);
    assert_eq!(event.pool, pool.id());
    assert_eq!(event.prefab, prefab_id);
    assert_eq!(event.instance, id);
    assert_eq!(event.transform, at(4.0));

    assert!(pool.remove_listener(key));
    assert!(!pool.remove_listener(key));
}

#[test]
fn test_instance_listener_removal() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("wisp", &kills);

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let count = Rc::new(Cell::new(0));
    let count_clone = Rc::clone(&count);

    let id = pool.spawn(&template, at(0.0), None).unwrap();
    let key = pool.add_instance_listener(id, move |_, _| count_clone.set(count_clone.get() + 1)).unwrap();
    assert_eq!(pool.get(id).unwrap().listener_count(), 1);

    assert_eq!(pool.despawn(id), Ok(true));
    assert_eq!(count.get(), 1);

    // Listeners stay attached across recycling until removed.
    let again = pool.spawn(&template, at(0.0), None).unwrap();
    assert_eq!(again, id);
    assert_eq!(count.get(), 2);

    assert!(pool.remove_instance_listener(id, key));
    assert_eq!(pool.despawn(id), Ok(true));
    assert_eq!(count.get(), 2);
}

#[test]
fn test_teardown_on_drop() {
    events::clear_global_listeners();

    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("husk", &kills);
    let stray = projectile_template("stray", &kills);

    let killed_events = Rc::new(Cell::new(0));
    let killed_clone = Rc::clone(&killed_events);
    events::add_global_listener(move |event| {
        if event.kind == SpawnEventKind::Killed {
            killed_clone.set(killed_clone.get() + 1);
        }
    });

    {
        let mut pool = SpawnPool::new("test");
        pool.register(&template, CacheSettings::new(3, 1, 0)).unwrap();
        pool.spawn(&template, at(0.0), None).unwrap();
        pool.spawn(&stray, at(0.0), None).unwrap();
    }

    assert_eq!(kills.get(), 4);
    assert_eq!(killed_events.get(), 4);

    events::clear_global_listeners();
}

// ----------------------------------------------
// Registry
// ----------------------------------------------

#[test]
fn test_registry_default_pool_lifecycle() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("coin", &kills);

    let mut registry: PoolRegistry<Projectile> = PoolRegistry::new();
    assert!(!registry.has_default());
    assert!(registry.try_get().is_none());

    let pool = registry.get_or_create();
    assert_eq!(pool.name(), registry::DEFAULT_POOL_NAME);
    pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();
    let id = pool.spawn(&template, at(0.0), None).unwrap();
    let pool_id = pool.id();

    // Lazy access does not create a second pool.
    assert_eq!(registry.get_or_create().id(), pool_id);
    assert!(matches!(registry.create_and_register("other"), Err(PoolError::InvalidOperation(_))));

    // Handles route back to their owner.
    assert_eq!(registry.owner_of(id).map(|pool| pool.id()), Some(pool_id));
    assert_eq!(registry.despawn(id), Ok(true));

    assert!(registry.reset());
    assert!(!registry.has_default());
    assert_eq!(kills.get(), 1);

    // The owning pool is gone; nothing to route to.
    assert_eq!(registry.despawn(id), Ok(false));
    assert!(!registry.destroy(id));
    assert!(!registry.reset());

    let fresh = registry.create_and_register("Fresh").unwrap();
    assert_ne!(fresh.id(), pool_id);
    assert!(registry.has_default());
}

#[test]
fn test_registry_named_pools() {
    let mut registry: PoolRegistry<Projectile> = PoolRegistry::new();

    let effects_id = registry.insert_named(SpawnPool::new("effects")).unwrap();
    assert!(matches!(registry.insert_named(SpawnPool::new("effects")), Err(PoolError::InvalidOperation(_))));
    assert!(matches!(registry.insert_named(SpawnPool::new("")), Err(PoolError::InvalidArgument(_))));

    assert_eq!(registry.find_named("effects").map(|pool| pool.id()), Some(effects_id));
    assert!(registry.find_by_id(effects_id).is_some());
    assert_eq!(registry.pools().count(), 1);

    registry.get_or_create();
    assert_eq!(registry.pools().count(), 2);

    assert!(registry.remove_named("effects").is_some());
    assert!(registry.find_named_mut("effects").is_none());

    registry.reset_all();
    assert_eq!(registry.pools().count(), 0);
}

#[test]
fn test_registry_replace_default() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("ghost", &kills);

    let mut registry: PoolRegistry<Projectile> = PoolRegistry::new();
    assert!(registry.try_get_mut().is_none());
    assert!(registry.replace_default(SpawnPool::new("first")).is_none());

    let first_id = {
        let pool = registry.try_get_mut().unwrap();
        pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();
        pool.id()
    };

    let previous = registry.replace_default(SpawnPool::new("second")).unwrap();
    assert_eq!(previous.id(), first_id);
    assert_eq!(registry.try_get().unwrap().name(), "second");

    // The caller decides when the old pool goes away.
    assert_eq!(kills.get(), 0);
    drop(previous);
    assert_eq!(kills.get(), 2);
}

#[test]
fn test_registry_names_are_unique() {
    let mut registry: PoolRegistry<Projectile> = PoolRegistry::new();
    registry.create_and_register("effects").unwrap();

    assert!(matches!(registry.insert_named(SpawnPool::new("effects")), Err(PoolError::InvalidOperation(_))));
    assert!(registry.insert_named(SpawnPool::new("sounds")).is_ok());

    assert!(registry.reset());
    assert!(matches!(registry.create_and_register("sounds"), Err(PoolError::InvalidOperation(_))));
    assert!(!registry.has_default());
}

// ----------------------------------------------
// Cached state and registration helpers
// ----------------------------------------------

#[test]
fn test_free_instances_are_cached() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("mote", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 2, 0)).unwrap();

    let prewarmed: Vec<InstanceId> = pool.find_cache(prefab_id).unwrap().iter_free().collect();
    assert_eq!(prewarmed.len(), 1);
    for id in &prewarmed {
        assert_eq!(pool.controller(*id).unwrap().state(), SpawnState::Cached);
        assert!(pool.controller(*id).unwrap().is_cached());
    }

    // Second spawn finds the free set empty and grows it by two.
    pool.spawn(&template, at(0.0), None).unwrap();
    pool.spawn(&template, at(0.0), None).unwrap();

    let grown: Vec<InstanceId> = pool.find_cache(prefab_id).unwrap().iter_free().collect();
    assert_eq!(grown.len(), 1);
    for id in &grown {
        assert_eq!(pool.controller(*id).unwrap().state(), SpawnState::Cached);
        assert!(!pool.controller(*id).unwrap().is_cached());
    }
    assert_exclusive(&pool, prefab_id);
}

#[test]
fn test_spawn_registered() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("needle", &kills);

    let mut pool = SpawnPool::new("test");
    let prefab_id = pool.register(&template, CacheSettings::new(1, 1, 0)).unwrap();

    let id = pool.spawn_registered(prefab_id, at(2.0), Some(ParentId(3))).unwrap();
    assert!(pool.is_spawned(id));
    assert!(pool.find_cache(prefab_id).unwrap().is_active(id));
    assert_eq!(pool.get(id).unwrap().parent(), Some(ParentId(3)));

    assert!(pool.spawn_registered(PrefabId::from_name("unknown"), at(0.0), None).is_none());
    assert!(pool.spawn_registered(PrefabId::invalid(), at(0.0), None).is_none());
    assert_eq!(pool.instance_count(), 1);
}

#[test]
fn test_unregister_template() {
    let kills = Rc::new(Cell::new(0));
    let template = projectile_template("spike", &kills);

    let mut pool = SpawnPool::new("test");
    pool.register(&template, CacheSettings::new(2, 1, 0)).unwrap();

    assert!(pool.unregister_template(&template));
    assert!(!pool.contains(template.id()));
    assert_eq!(kills.get(), 2);
    assert!(!pool.unregister_template(&template));

    // Can be registered again afterwards.
    assert!(pool.register(&template, CacheSettings::new(1, 1, 0)).is_ok());
}
