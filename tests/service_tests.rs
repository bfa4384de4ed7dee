//! Tests for container lifecycle, entity isolation and listener fan-out.

use parking_lot::Mutex;
use statcore::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

fn id(s: &str) -> StatId {
    StatId::new(s).unwrap()
}

fn src(s: &str) -> StatSourceId {
    StatSourceId::new(s).unwrap()
}

fn service() -> StatService {
    StatService::new(Arc::new(StatRegistry::with_defaults()))
}

fn recorder(log: &Arc<Mutex<Vec<StatChange>>>) -> Arc<dyn StatChangeListener> {
    let log = log.clone();
    Arc::new(move |change: &StatChange| -> Result<(), StatError> {
        log.lock().push(change.clone());
        Ok(())
    })
}

// ============================================================================
// Container lifecycle
// ============================================================================

#[test]
fn test_remove_then_get_starts_fresh() {
    let service = service();
    let entity = EntityKey::random();
    let armor = id("armor");

    let container = service.get_container(entity);
    container.set_base(id("max_health"), 40.0).unwrap();
    container
        .add_modifier(StatModifier::flat(armor.clone(), src("item:chest"), 6.0).unwrap())
        .unwrap();

    assert!(service.remove_container(&entity).is_some());
    assert!(!service.contains(&entity));

    let fresh = service.get_container(entity);
    assert!(!Arc::ptr_eq(&container, &fresh));
    assert_eq!(fresh.final_value(&armor), 0.0);
    assert_eq!(fresh.final_value(&id("max_health")), 20.0);
    assert!(fresh.debug_view().is_empty());
    assert!(fresh.source_ids().is_empty());
}

#[test]
fn test_entity_keys_sorted() {
    let service = service();
    let mut keys: Vec<EntityKey> = (0..5).map(|_| EntityKey::random()).collect();
    for key in &keys {
        service.get_container(*key);
    }
    keys.sort();
    assert_eq!(service.entity_keys(), keys);
    assert_eq!(service.container_count(), 5);
}

#[test]
fn test_concurrent_get_container_returns_one_instance() {
    let service = service();
    let entity = EntityKey::random();

    let containers: Vec<Arc<StatContainer>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| service.get_container(entity)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(service.container_count(), 1);
    for container in &containers[1..] {
        assert!(Arc::ptr_eq(&containers[0], container));
    }
}

// ============================================================================
// Isolation
// ============================================================================

#[test]
fn test_entities_do_not_interfere() {
    let service = service();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.add_listener(recorder(&log));

    let a = EntityKey::random();
    let b = EntityKey::random();
    let armor = id("armor");
    let container_b = service.get_container(b);

    service
        .get_container(a)
        .add_modifier(StatModifier::flat(armor.clone(), src("item:chest"), 6.0).unwrap())
        .unwrap();

    assert_eq!(container_b.final_value(&armor), 0.0);
    assert!(container_b.debug_view().is_empty());
    assert!(log.lock().iter().all(|change| change.entity == a));
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn test_parallel_entities() {
    let service = service();
    let armor = id("armor");
    let entities: Vec<EntityKey> = (0..6).map(|_| EntityKey::random()).collect();

    thread::scope(|scope| {
        for (n, entity) in entities.iter().enumerate() {
            let service = &service;
            let armor = armor.clone();
            scope.spawn(move || {
                let container = service.get_container(*entity);
                for i in 0..=n {
                    container
                        .add_modifier(
                            StatModifier::flat(armor.clone(), src(&format!("piece:{i}")), 1.0)
                                .unwrap(),
                        )
                        .unwrap();
                }
            });
        }
    });

    for (n, entity) in entities.iter().enumerate() {
        let value = service.get_container(*entity).final_value(&armor);
        assert_eq!(value, (n + 1) as f64);
    }
}

// ============================================================================
// Listeners
// ============================================================================

#[test]
fn test_duplicate_listener_registration_is_noop() {
    let service = service();
    let log = Arc::new(Mutex::new(Vec::new()));
    let listener = recorder(&log);
    service.add_listener(listener.clone());
    service.add_listener(listener.clone());
    assert_eq!(service.listener_count(), 1);

    service
        .get_container(EntityKey::random())
        .set_base(id("luck"), 1.0)
        .unwrap();
    assert_eq!(log.lock().len(), 1);

    assert!(service.remove_listener(&listener));
    assert!(!service.remove_listener(&listener));
    service
        .get_container(EntityKey::random())
        .set_base(id("luck"), 1.0)
        .unwrap();
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn test_listeners_called_in_registration_order() {
    let service = service();
    let order = Arc::new(Mutex::new(Vec::new()));
    for tag in 0..4 {
        let order = order.clone();
        service.add_listener(Arc::new(move |_: &StatChange| -> Result<(), StatError> {
            order.lock().push(tag);
            Ok(())
        }));
    }

    service
        .get_container(EntityKey::random())
        .set_base(id("armor"), 1.0)
        .unwrap();
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
}

#[test]
fn test_listener_error_reaches_caller() {
    let service = service();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.add_listener(Arc::new(|_: &StatChange| -> Result<(), StatError> {
        Err(StatError::Listener("scoreboard offline".into()))
    }));
    service.add_listener(recorder(&log));

    let container = service.get_container(EntityKey::random());
    let err = container.set_base(id("armor"), 4.0).unwrap_err();

    assert_eq!(err, StatError::Listener("scoreboard offline".into()));
    assert!(log.lock().is_empty(), "later listeners are skipped");
    assert_eq!(container.final_value(&id("armor")), 4.0, "mutation is kept");
}

#[test]
fn test_listener_added_during_dispatch_sees_only_later_changes() {
    let service = Arc::new(service());
    let late_log = Arc::new(Mutex::new(Vec::new()));
    let late = recorder(&late_log);

    let weak = Arc::downgrade(&service);
    let to_add = late.clone();
    service.add_listener(Arc::new(move |_: &StatChange| -> Result<(), StatError> {
        if let Some(service) = weak.upgrade() {
            service.add_listener(to_add.clone());
        }
        Ok(())
    }));

    let container = service.get_container(EntityKey::random());
    container.set_base(id("armor"), 1.0).unwrap();
    assert!(late_log.lock().is_empty());
    assert_eq!(service.listener_count(), 2);

    container.set_base(id("armor"), 2.0).unwrap();
    assert_eq!(late_log.lock().len(), 1);
}

#[test]
fn test_removed_container_no_longer_reachable() {
    let service = service();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.add_listener(recorder(&log));
    let entity = EntityKey::random();

    let stale = service.get_container(entity);
    service.remove_container(&entity);
    stale.set_base(id("armor"), 9.0).unwrap();

    assert_eq!(service.get_container(entity).final_value(&id("armor")), 0.0);
}

// ============================================================================
// Cross-container dispatch
// ============================================================================

#[test]
fn test_cross_entity_listeners_do_not_deadlock() {
    let service = Arc::new(service());
    let (first, second) = (EntityKey::random(), EntityKey::random());
    let barrier = Arc::new(Barrier::new(2));

    // Mirror each entity's armor into the other entity's luck
    let weak = Arc::downgrade(&service);
    let gate = barrier.clone();
    service.add_listener(Arc::new(move |change: &StatChange| -> Result<(), StatError> {
        if change.stat_id.as_str() != "armor" {
            return Ok(());
        }
        gate.wait();
        let Some(service) = weak.upgrade() else {
            return Ok(());
        };
        let other = if change.entity == first { second } else { first };
        service
            .get_container(other)
            .set_base(StatId::new("luck")?, change.new_value)
    }));

    let (done_tx, done_rx) = mpsc::channel();
    for (entity, armor) in [(first, 1.0), (second, 2.0)] {
        let container = service.get_container(entity);
        let done_tx = done_tx.clone();
        thread::spawn(move || {
            container.set_base(id("armor"), armor).unwrap();
            done_tx.send(()).unwrap();
        });
    }

    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("cross-entity listener deadlocked");
    }
    assert_eq!(service.get_container(first).final_value(&id("luck")), 2.0);
    assert_eq!(service.get_container(second).final_value(&id("luck")), 1.0);
}

#[test]
fn test_concurrent_mutations_are_atomic_and_ordered() {
    let service = service();
    let log = Arc::new(Mutex::new(Vec::new()));
    service.add_listener(recorder(&log));

    let entity = EntityKey::random();
    let container = service.get_container(entity);
    let plate = src("item:chest:plate");
    let writing = AtomicBool::new(true);

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..200 {
                container
                    .add_modifiers([
                        StatModifier::flat(id("armor"), plate.clone(), 8.0).unwrap(),
                        StatModifier::flat(id("max_health"), plate.clone(), 4.0).unwrap(),
                        StatModifier::percent_add(id("attack_damage"), plate.clone(), 0.5).unwrap(),
                    ])
                    .unwrap();
                container.clear_source(&plate).unwrap();
            }
            writing.store(false, Ordering::Release);
        });

        scope.spawn(|| {
            let mut i = 0u32;
            while writing.load(Ordering::Acquire) {
                let modifier =
                    StatModifier::flat(id("armor"), src("buff:resistance"), f64::from(i % 5));
                container.add_modifier(modifier.unwrap()).unwrap();
                i += 1;
            }
        });

        scope.spawn(|| {
            while writing.load(Ordering::Acquire) {
                let carrying = container
                    .debug_view()
                    .iter()
                    .filter(|snapshot| snapshot.sources().contains(&plate))
                    .count();
                assert!(carrying == 0 || carrying == 3, "saw {carrying} of 3 plate stats");
            }
        });
    });

    // Each stat's notifications form an unbroken chain
    let mut last: HashMap<StatId, f64> = HashMap::new();
    for change in log.lock().iter() {
        assert_eq!(change.entity, entity);
        if let Some(previous) = last.get(&change.stat_id) {
            assert_eq!(change.old_value, *previous, "gap in {}", change.stat_id);
        }
        last.insert(change.stat_id.clone(), change.new_value);
    }
    for (stat_id, value) in last {
        assert_eq!(container.final_value(&stat_id), value);
    }
}
