use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value as JsonValue};

use winsync_core::{
    Coordinator, FixedShape, ManualClock, MemoryMedium, Reader, Registry, RegistryConfig, Shape,
    State, WindowId, Writer,
};

/// One simulated browser window attached to the shared medium.
struct Context {
    window: Coordinator<MemoryMedium>,
    shape: FixedShape,
}

impl Context {
    fn new(medium: &MemoryMedium, clock: &ManualClock, x: f64) -> Self {
        let handle = medium.connect();
        let shape = FixedShape::new(Shape::new(x, 0.0, 300.0, 200.0));
        let window = Coordinator::new(handle.clone(), shape.clone(), RegistryConfig::default())
            .unwrap()
            .with_clock(clock.clone())
            .with_notifier(handle);
        Self { window, shape }
    }

    fn id(&self) -> WindowId {
        self.window.id().cloned().unwrap()
    }

    fn ids(&self) -> BTreeSet<WindowId> {
        self.window.windows().iter().map(|d| d.id.clone()).collect()
    }

    fn shape_of(&self, id: &WindowId) -> Option<Shape> {
        self.window
            .windows()
            .iter()
            .find(|d| &d.id == id)
            .map(|d| d.shape)
    }
}

fn shared_registry(raw: &mut MemoryMedium) -> Registry {
    let blob = raw.get("windows").unwrap().unwrap_or_else(|| "[]".to_string());
    serde_json::from_str(&blob).unwrap()
}

fn tick_all(contexts: &mut [Context], clock: &ManualClock, step: u64) {
    clock.advance(step);
    for context in contexts.iter_mut() {
        context.window.update();
    }
}

#[test]
fn concurrent_inits_converge_to_distinct_ids() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut contexts: Vec<Context> = (0..6)
        .map(|i| Context::new(&medium, &clock, i as f64 * 100.0))
        .collect();

    // Every context registers against the same empty snapshot, so each write
    // clobbers the previous one.
    for (i, context) in contexts.iter_mut().enumerate() {
        raw.remove("windows").unwrap();
        context.window.init(json!({ "index": i }));
        assert_eq!(context.window.state(), State::Active);
    }
    assert_eq!(shared_registry(&mut raw).len(), 1);

    tick_all(&mut contexts, &clock, 16);
    tick_all(&mut contexts, &clock, 16);

    let expected: BTreeSet<WindowId> = contexts.iter().map(Context::id).collect();
    assert_eq!(expected.len(), 6);
    for context in &contexts {
        assert_eq!(context.ids(), expected);
    }
    assert_eq!(shared_registry(&mut raw).len(), 6);
}

#[test]
fn two_contexts_see_the_same_windows() {
    let medium = MemoryMedium::new();
    let clock = ManualClock::new(0);

    let mut a = Context::new(&medium, &clock, 0.0);
    let mut b = Context::new(&medium, &clock, 400.0);
    a.window.init(json!({"tag": "A"}));
    b.window.init(json!({"tag": "B"}));

    for _ in 0..2 {
        clock.advance(16);
        a.window.update();
        b.window.update();
    }

    assert_eq!(a.ids(), b.ids());
    assert_eq!(a.ids().len(), 2);

    let tags: Vec<&JsonValue> = a.window.windows().iter().map(|d| &d.meta_data["tag"]).collect();
    assert_eq!(tags, vec![&json!("A"), &json!("B")]);
}

#[test]
fn arrival_order_is_stable() {
    let medium = MemoryMedium::new();
    let clock = ManualClock::new(0);

    let mut contexts: Vec<Context> = (0..3)
        .map(|i| Context::new(&medium, &clock, i as f64))
        .collect();
    for context in contexts.iter_mut() {
        context.window.init(JsonValue::Null);
    }
    tick_all(&mut contexts, &clock, 16);

    let order: Vec<WindowId> = contexts.iter().map(Context::id).collect();
    for context in &contexts {
        let seen: Vec<WindowId> = context.window.windows().iter().map(|d| d.id.clone()).collect();
        assert_eq!(seen, order);
    }
}

#[test]
fn graceful_departure_propagates() {
    let medium = MemoryMedium::new();
    let clock = ManualClock::new(0);

    let mut contexts: Vec<Context> = (0..3)
        .map(|i| Context::new(&medium, &clock, i as f64))
        .collect();
    for context in contexts.iter_mut() {
        context.window.init(JsonValue::Null);
    }
    tick_all(&mut contexts, &clock, 16);

    let mut leaving = contexts.pop().unwrap();
    let gone = leaving.id();
    leaving.window.depart();
    assert_eq!(leaving.window.state(), State::Departed);

    tick_all(&mut contexts, &clock, 16);
    for context in &contexts {
        assert!(!context.ids().contains(&gone));
        assert_eq!(context.ids().len(), 2);
    }
}

#[test]
fn crashed_context_is_reaped_after_liveness_timeout() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);
    let liveness = RegistryConfig::default().liveness_timeout_ms;

    let mut contexts: Vec<Context> = (0..3)
        .map(|i| Context::new(&medium, &clock, i as f64))
        .collect();
    for context in contexts.iter_mut() {
        context.window.init(JsonValue::Null);
    }
    tick_all(&mut contexts, &clock, 16);

    // Vanish without deregistering.
    let crashed = contexts.pop().unwrap();
    let gone = crashed.id();
    drop(crashed);

    let mut elapsed = 0;
    while elapsed <= liveness {
        tick_all(&mut contexts, &clock, 250);
        elapsed += 250;
        if elapsed < liveness - 250 {
            assert!(contexts[0].ids().contains(&gone), "reaped too early at {}ms", elapsed);
        }
    }
    tick_all(&mut contexts, &clock, 250);

    for context in &contexts {
        assert!(!context.ids().contains(&gone));
    }
    assert!(!shared_registry(&mut raw).contains(&gone));
}

#[test]
fn peer_shape_changes_do_not_fire_shape_callback() {
    let medium = MemoryMedium::new();
    let clock = ManualClock::new(0);

    let mut a = Context::new(&medium, &clock, 0.0);
    let mut b = Context::new(&medium, &clock, 400.0);

    let local_changes = Arc::new(Mutex::new(0));
    let counter = local_changes.clone();
    a.window
        .set_shape_change_callback(move |_| *counter.lock().unwrap() += 1);

    let layouts = Arc::new(Mutex::new(Vec::new()));
    let sink = layouts.clone();
    a.window.set_windows_change_callback(move |windows| {
        sink.lock().unwrap().push(windows.len());
    });

    a.window.init(JsonValue::Null);
    b.window.init(JsonValue::Null);

    b.shape.set(Shape::new(450.0, 10.0, 300.0, 200.0));
    clock.advance(16);
    b.window.update();
    a.window.update();

    assert_eq!(*local_changes.lock().unwrap(), 0);
    assert_eq!(a.shape_of(&b.id()), Some(Shape::new(450.0, 10.0, 300.0, 200.0)));
    assert_eq!(*layouts.lock().unwrap(), vec![1, 2]);
}

#[test]
fn corrupted_blob_falls_back_to_own_descriptor() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);

    let mut a = Context::new(&medium, &clock, 0.0);
    let mut b = Context::new(&medium, &clock, 400.0);
    a.window.init(JsonValue::Null);
    b.window.init(JsonValue::Null);

    raw.set("windows", "{\"this is\": not json".to_string()).unwrap();

    clock.advance(16);
    a.window.update();
    assert_eq!(a.window.state(), State::Active);
    assert!(a.ids().contains(&a.id()));

    // The rewrite from `a` repaired the blob; `b` re-asserts itself.
    clock.advance(16);
    b.window.update();
    clock.advance(16);
    a.window.update();

    assert_eq!(a.ids().len(), 2);
    assert_eq!(a.ids(), b.ids());
    assert_eq!(shared_registry(&mut raw).len(), 2);
}

#[test]
fn clobbered_publish_heals_within_two_ticks() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);

    let mut a = Context::new(&medium, &clock, 0.0);
    let mut b = Context::new(&medium, &clock, 400.0);
    a.window.init(JsonValue::Null);
    b.window.init(JsonValue::Null);
    clock.advance(16);
    a.window.update();

    let moved_a = Shape::new(50.0, 50.0, 300.0, 200.0);
    let moved_b = Shape::new(600.0, 50.0, 300.0, 200.0);
    a.shape.set(moved_a);
    b.shape.set(moved_b);

    // Both read the same snapshot, then both write: `b` never sees `a`'s write.
    let before = raw.get("windows").unwrap().unwrap();
    clock.advance(16);
    a.window.update();
    raw.set("windows", before).unwrap();
    b.window.update();

    let clobbered = shared_registry(&mut raw);
    assert_ne!(clobbered.get(&a.id()).unwrap().shape, moved_a);
    assert_eq!(clobbered.get(&b.id()).unwrap().shape, moved_b);

    for _ in 0..2 {
        clock.advance(16);
        a.window.update();
        b.window.update();
    }

    let healed = shared_registry(&mut raw);
    assert_eq!(healed.get(&a.id()).unwrap().shape, moved_a);
    assert_eq!(healed.get(&b.id()).unwrap().shape, moved_b);
    for context in [&a, &b] {
        assert_eq!(context.shape_of(&a.id()), Some(moved_a));
        assert_eq!(context.shape_of(&b.id()), Some(moved_b));
    }
}

#[test]
fn polling_converges_without_notifications() {
    let medium = MemoryMedium::new();
    let clock = ManualClock::new(0);
    let config = RegistryConfig::default();

    let mut quiet: Vec<Coordinator<MemoryMedium>> = (0..2)
        .map(|_| {
            Coordinator::new(medium.connect(), FixedShape::default(), config.clone())
                .unwrap()
                .with_clock(clock.clone())
        })
        .collect();
    for window in quiet.iter_mut() {
        window.init(JsonValue::Null);
    }

    clock.advance(10);
    quiet[0].update();
    assert_eq!(quiet[0].windows().len(), 1, "no notifier, poll not yet due");

    clock.advance(config.poll_interval_ms);
    quiet[0].update();
    assert_eq!(quiet[0].windows().len(), 2);
}

#[test]
fn reset_departs_every_context() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);

    let mut a = Context::new(&medium, &clock, 0.0);
    let mut b = Context::new(&medium, &clock, 400.0);

    let resets = Arc::new(Mutex::new(0));
    let counter = resets.clone();
    b.window
        .set_reset_callback(move || *counter.lock().unwrap() += 1);

    a.window.init(JsonValue::Null);
    b.window.init(JsonValue::Null);

    clock.advance(16);
    a.window.reset();
    assert_eq!(a.window.state(), State::Departed);
    assert!(raw.get("windows").unwrap().is_none());

    clock.advance(16);
    b.window.update();
    assert_eq!(b.window.state(), State::Departed);
    assert_eq!(*resets.lock().unwrap(), 1);
    assert!(raw.get("windows").unwrap().is_none());

    // A fresh context registers under the new marker and stays active.
    let mut again = Context::new(&medium, &clock, 0.0);
    again.window.init(JsonValue::Null);
    clock.advance(16);
    again.window.update();
    assert_eq!(again.window.state(), State::Active);
    assert_ne!(again.id(), b.id());
    assert_eq!(shared_registry(&mut raw).len(), 1);
}

#[test]
fn republish_between_reset_writes_is_withdrawn() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);

    let mut b = Context::new(&medium, &clock, 400.0);
    b.window.init(JsonValue::Null);

    // The resetter clears the registry first; `b` heals back into it.
    raw.remove("windows").unwrap();
    clock.advance(16);
    b.window.update();
    assert_eq!(b.window.state(), State::Active);
    assert_eq!(shared_registry(&mut raw).len(), 1);

    // Then the marker lands.
    raw.set("windows_reset", "123".to_string()).unwrap();
    clock.advance(16);
    b.window.update();

    assert_eq!(b.window.state(), State::Departed);
    assert!(shared_registry(&mut raw).is_empty());
}

#[test]
fn reset_marker_is_checked_on_every_read() {
    let medium = MemoryMedium::new();
    let mut raw = medium.connect();
    let clock = ManualClock::new(0);

    // No notifier and well inside the poll interval: only the shape change
    // forces a read.
    let shape = FixedShape::new(Shape::new(0.0, 0.0, 300.0, 200.0));
    let mut window =
        Coordinator::new(medium.connect(), shape.clone(), RegistryConfig::default())
            .unwrap()
            .with_clock(clock.clone());
    window.init(JsonValue::Null);

    raw.set("windows_reset", "1".to_string()).unwrap();
    shape.set(Shape::new(50.0, 0.0, 300.0, 200.0));
    clock.advance(16);
    window.update();

    assert_eq!(window.state(), State::Departed);
    assert!(shared_registry(&mut raw).is_empty());
}
