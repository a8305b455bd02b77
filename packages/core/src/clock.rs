//! Clocks and the window's own environment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::model::Shape;

/// Wall-clock time in unix milliseconds.
///
/// Heartbeat stamps are compared across contexts on the same host, so every
/// context must use the same time base.
pub trait Clock: Send {
    fn now_millis(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Where a context learns its own on-screen rectangle.
pub trait ShapeSource: Send {
    fn current_shape(&self) -> Shape;
}

/// A shape set from outside, e.g. by a resize handler. Clones share it.
#[derive(Debug, Clone, Default)]
pub struct FixedShape {
    shape: Arc<Mutex<Shape>>,
}

impl FixedShape {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape: Arc::new(Mutex::new(shape)),
        }
    }

    pub fn set(&self, shape: Shape) {
        *self
            .shape
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = shape;
    }
}

impl ShapeSource for FixedShape {
    fn current_shape(&self) -> Shape {
        *self
            .shape
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<F> ShapeSource for F
where
    F: Fn() -> Shape + Send,
{
    fn current_shape(&self) -> Shape {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(other.now_millis(), 150);
        other.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn fixed_shape_updates_are_visible_to_clones() {
        let source = FixedShape::new(Shape::new(0.0, 0.0, 1.0, 1.0));
        let handle = source.clone();
        handle.set(Shape::new(5.0, 5.0, 2.0, 2.0));
        assert_eq!(source.current_shape(), Shape::new(5.0, 5.0, 2.0, 2.0));
    }

    #[test]
    fn closures_are_shape_sources() {
        let source = || Shape::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(source.current_shape().width, 3.0);
    }
}
