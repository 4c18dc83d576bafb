//! Integration tests for epoch invalidation, the shutdown window, and the
//! idle (passive) phase.

mod common;

use common::{capture_events, count_code, rig, AudioDirector, SaveVault};
use session_singleton::{HostHandle, ObjectHost, Policy, SessionEpoch, SingletonError, Strictness};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn persistent_instance_is_revalidated_across_sessions() {
    let rig = rig(Strictness::Strict);
    let events = capture_events(&rig.context);
    rig.host.add_factory(|| Arc::new(AudioDirector::default()));
    rig.registry.register::<AudioDirector>(Policy::Persistent);

    rig.context.begin_session(1);
    let first = rig.registry.get::<AudioDirector>().unwrap();
    assert_eq!(first.session_starts.load(Ordering::SeqCst), 1);

    // The host tears down the transient object graph; the persistent
    // instance survives into the next session.
    rig.host.sweep_session();
    rig.context.begin_session(2);

    let second = rig.registry.get::<AudioDirector>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    // Session hook fired again for the new epoch; construction did not.
    assert_eq!(first.session_starts.load(Ordering::SeqCst), 2);
    assert_eq!(first.constructed.load(Ordering::SeqCst), 1);
    assert_eq!(count_code(&events, "slot_invalidated"), 1);
    assert_eq!(count_code(&events, "established"), 2);
}

#[test]
fn scoped_instance_dies_with_its_session() {
    let rig = rig(Strictness::Strict);
    rig.registry.register::<SaveVault>(Policy::ScopedToSession);

    rig.context.begin_session(1);
    let placed = Arc::new(SaveVault::default());
    rig.host.place(placed.clone());
    let resolved = rig.registry.get::<SaveVault>().unwrap();
    assert!(Arc::ptr_eq(&placed, &resolved));

    // Scoped instances are not marked persistent, so the sweep takes them.
    rig.host.sweep_session();
    rig.context.begin_session(2);

    assert!(rig.registry.try_get::<SaveVault>().is_none());
    assert_eq!(
        rig.registry.get::<SaveVault>().unwrap_err(),
        SingletonError::MissingRequiredPlacement {
            type_name: std::any::type_name::<SaveVault>()
        }
    );
}

#[test]
fn shutdown_window_resolves_empty_without_searching() {
    let rig = rig(Strictness::Strict);
    rig.host.add_factory(|| Arc::new(AudioDirector::default()));
    rig.registry.register::<AudioDirector>(Policy::Persistent);
    rig.context.begin_session(1);

    let live = rig.registry.get::<AudioDirector>().unwrap();
    rig.context.notify_shutting_down();

    // The instance still exists, but the window rejects resurrection.
    assert_eq!(
        rig.registry.get::<AudioDirector>().unwrap_err(),
        SingletonError::ShuttingDown
    );
    assert!(rig.registry.try_get::<AudioDirector>().is_none());
    assert_eq!(rig.host.live_count(), 1);
    assert!(!rig.host.was_destroyed(common::instance_addr(&live)));
}

#[test]
fn next_session_clears_the_shutdown_window() {
    let rig = rig(Strictness::Strict);
    rig.host.add_factory(|| Arc::new(AudioDirector::default()));
    rig.registry.register::<AudioDirector>(Policy::Persistent);

    rig.context.begin_session(1);
    let first = rig.registry.get::<AudioDirector>().unwrap();
    rig.context.notify_shutting_down();

    rig.context.begin_session(2);
    let second = rig.registry.get::<AudioDirector>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn duplicate_begin_notifications_in_one_tick_collapse() {
    let rig = rig(Strictness::Strict);
    rig.host.add_factory(|| Arc::new(AudioDirector::default()));
    rig.registry.register::<AudioDirector>(Policy::Persistent);

    assert!(rig.context.begin_session(42));
    let epoch = rig.context.current_epoch();
    let instance = rig.registry.get::<AudioDirector>().unwrap();

    // Same tick, delivered twice: no epoch advance, no invalidation, no
    // extra session hook.
    assert!(!rig.context.begin_session(42));
    assert_eq!(rig.context.current_epoch(), epoch);
    let cached = rig.registry.get::<AudioDirector>().unwrap();
    assert!(Arc::ptr_eq(&instance, &cached));
    assert_eq!(instance.session_starts.load(Ordering::SeqCst), 1);
}

#[test]
fn epoch_observed_by_lookups_differs_after_every_session_start() {
    let rig = rig(Strictness::Strict);
    let mut seen: Vec<SessionEpoch> = vec![rig.context.current_epoch()];
    for tick in 1..=5 {
        rig.context.begin_session(tick);
        let epoch = rig.context.current_epoch();
        assert!(!seen.contains(&epoch));
        seen.push(epoch);
    }
}

#[test]
fn repeated_lookups_fire_the_session_hook_once_per_epoch() {
    let rig = rig(Strictness::Strict);
    rig.host.add_factory(|| Arc::new(AudioDirector::default()));
    rig.registry.register::<AudioDirector>(Policy::Persistent);
    rig.context.begin_session(1);

    for _ in 0..10 {
        rig.registry.get::<AudioDirector>().unwrap();
        rig.registry.try_get::<AudioDirector>().unwrap();
    }
    let instance = rig.registry.get::<AudioDirector>().unwrap();
    assert_eq!(instance.session_starts.load(Ordering::SeqCst), 1);
}

#[test]
fn destruction_report_clears_the_slot_and_fires_the_teardown_hook() {
    let rig = rig(Strictness::Strict);
    let events = capture_events(&rig.context);
    rig.registry.register::<SaveVault>(Policy::ScopedToSession);
    rig.context.begin_session(1);

    let placed = Arc::new(SaveVault::default());
    let handle = rig.host.place(placed.clone());
    rig.registry.get::<SaveVault>().unwrap();

    // Host tears the object down and reports it.
    rig.host.destroy(handle.clone());
    assert!(rig.registry.notify_destroyed(&handle));
    assert_eq!(placed.teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(count_code(&events, "instance_destroyed"), 1);

    // Second report is a no-op; the slot is already clear.
    assert!(!rig.registry.notify_destroyed(&handle));
    assert!(rig.registry.try_get::<SaveVault>().is_none());
}

#[test]
fn destruction_report_for_a_bystander_leaves_the_slot_alone() {
    let rig = rig(Strictness::Strict);
    rig.registry.register::<SaveVault>(Policy::ScopedToSession);
    rig.context.begin_session(1);

    let established = Arc::new(SaveVault::default());
    rig.host.place(established.clone());
    rig.registry.get::<SaveVault>().unwrap();

    // A different instance of the same type is torn down elsewhere.
    let bystander: HostHandle = Arc::new(SaveVault::default());
    assert!(!rig.registry.notify_destroyed(&bystander));

    let still_cached = rig.registry.get::<SaveVault>().unwrap();
    assert!(Arc::ptr_eq(&established, &still_cached));
    assert_eq!(established.teardowns.load(Ordering::SeqCst), 0);
}

#[test]
fn idle_phase_is_a_passive_query() {
    let rig = rig(Strictness::Strict);
    let events = capture_events(&rig.context);
    rig.registry.register::<SaveVault>(Policy::ScopedToSession);

    // No session yet: lookups are pure locate calls.
    assert!(rig.registry.try_get::<SaveVault>().is_none());

    let placed = Arc::new(SaveVault::default());
    rig.host.place(placed.clone());
    let seen = rig.registry.get::<SaveVault>().unwrap();
    assert!(Arc::ptr_eq(&placed, &seen));

    // No establishment happened: no hooks, no persistence, no events.
    assert_eq!(placed.constructed.load(Ordering::SeqCst), 0);
    assert_eq!(placed.session_starts.load(Ordering::SeqCst), 0);
    assert!(rig.host.persisted.lock().unwrap().is_empty());
    assert!(events.lock().unwrap().is_empty());
}
