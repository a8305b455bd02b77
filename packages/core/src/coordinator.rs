//! The coordinator facade: one context's membership in the shared registry.
//!
//! ```text
//! Uninitialized --init--> Registering --first publish--> Active --depart/reset--> Departed
//! ```
//!
//! The coordinator owns no timer. The host calls [`Coordinator::update`] from
//! its own loop (once per frame, or on an interval) and every step of a tick
//! runs synchronously inside that call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, ShapeSource, SystemClock};
use crate::config::RegistryConfig;
use crate::heartbeat::{HeartbeatPublisher, Observation};
use crate::identity::{IdentityAssigner, RandomIdentity};
use crate::listener::PeerChangeListener;
use crate::merge::merge;
use crate::model::{Registry, Shape, WindowDescriptor, WindowId};
use crate::reaper::StalenessReaper;
use crate::store::RegistryStore;
use crate::traits::{Medium, Notifier};
use crate::Error;

/// Lifecycle of one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    /// Id assigned, first publish not yet accepted by the medium.
    Registering,
    Active,
    /// Terminal. A new context needs a new coordinator.
    Departed,
}

type ShapeCallback = Box<dyn FnMut(&Shape) + Send>;
type WindowsCallback = Box<dyn FnMut(&[WindowDescriptor]) + Send>;
type ResetCallback = Box<dyn FnMut() + Send>;

/// Keeps this context's descriptor published and the local view of every
/// other context current.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use winsync_core::{Coordinator, FixedShape, MemoryMedium, RegistryConfig, Shape};
///
/// let medium = MemoryMedium::new();
/// let shape = FixedShape::new(Shape::new(0.0, 0.0, 800.0, 600.0));
///
/// let mut window = Coordinator::new(medium.clone(), shape.clone(), RegistryConfig::default())
///     .unwrap()
///     .with_notifier(medium);
/// window.init(json!({"foo": "bar"}));
///
/// shape.set(Shape::new(40.0, 0.0, 800.0, 600.0));
/// window.update();
/// assert_eq!(window.windows()[0].shape.x, 40.0);
/// ```
pub struct Coordinator<M: Medium> {
    store: RegistryStore<M>,
    config: RegistryConfig,
    clock: Box<dyn Clock>,
    shape_source: Box<dyn ShapeSource>,
    identity: Box<dyn IdentityAssigner>,
    notifier: Option<Box<dyn Notifier>>,
    listener: PeerChangeListener,
    heartbeat: HeartbeatPublisher,
    reaper: StalenessReaper,
    state: State,
    own: Option<WindowDescriptor>,
    view: Registry,
    reported: Option<Registry>,
    reset_marker: Option<u64>,
    on_shape_change: Option<ShapeCallback>,
    on_windows_change: Option<WindowsCallback>,
    on_reset: Option<ResetCallback>,
}

impl<M: Medium> Coordinator<M> {
    pub fn new(
        medium: M,
        shape_source: impl ShapeSource + 'static,
        config: RegistryConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let store = RegistryStore::new(medium, config.registry_key.clone())?;

        Ok(Self {
            store,
            clock: Box::new(SystemClock),
            shape_source: Box::new(shape_source),
            identity: Box::new(RandomIdentity),
            notifier: None,
            listener: PeerChangeListener::new(config.poll_interval_ms),
            heartbeat: HeartbeatPublisher::new(config.heartbeat_interval_ms),
            reaper: StalenessReaper::new(config.liveness_timeout_ms),
            config,
            state: State::Uninitialized,
            own: None,
            view: Registry::new(),
            reported: None,
            reset_marker: None,
            on_shape_change: None,
            on_windows_change: None,
            on_reset: None,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_identity(mut self, identity: impl IdentityAssigner + 'static) -> Self {
        self.identity = Box::new(identity);
        self
    }

    /// Subscribe to change notifications once `init` runs. Without a
    /// notifier the coordinator relies on polling alone.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Observer for this context's own shape changes. Replaces any previous one.
    pub fn set_shape_change_callback(&mut self, callback: impl FnMut(&Shape) + Send + 'static) {
        self.on_shape_change = Some(Box::new(callback));
    }

    /// Observer for changes in membership, order or any window's shape.
    /// Replaces any previous one.
    pub fn set_windows_change_callback(
        &mut self,
        callback: impl FnMut(&[WindowDescriptor]) + Send + 'static,
    ) {
        self.on_windows_change = Some(Box::new(callback));
    }

    /// Observer fired when a reset wipes the registry. The context is
    /// `Departed` by then; the host should start a fresh coordinator.
    pub fn set_reset_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_reset = Some(Box::new(callback));
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// This context's id, fixed once registration has published.
    pub fn id(&self) -> Option<&WindowId> {
        self.own.as_ref().map(|own| &own.id)
    }

    pub fn meta_data(&self) -> Option<&JsonValue> {
        self.own.as_ref().map(|own| &own.meta_data)
    }

    /// Latest merged view, in arrival order.
    pub fn windows(&self) -> &[WindowDescriptor] {
        self.view.as_slice()
    }

    /// Register this context and publish its first descriptor.
    ///
    /// Calling it again is ignored: a context only ever holds one id.
    pub fn init(&mut self, meta_data: JsonValue) {
        if self.state != State::Uninitialized {
            warn!("Coordinator already initialized ({:?}); ignoring init", self.state);
            return;
        }

        if let Some(notifier) = self.notifier.as_mut() {
            self.listener.attach(&mut **notifier);
        }

        self.reset_marker = self.store.reset_marker();

        let id = self.identity.assign(&*self.clock);
        let shape = self.shape_source.current_shape();
        self.own = Some(WindowDescriptor::new(id, shape, meta_data));
        self.state = State::Registering;

        let now = self.clock.now_millis();
        self.tick(now);
    }

    /// Run one heartbeat / merge / reap cycle.
    pub fn update(&mut self) {
        match self.state {
            State::Uninitialized => debug!("update() before init(); nothing to do"),
            State::Departed => {}
            State::Registering | State::Active => {
                let now = self.clock.now_millis();
                self.tick(now);
            }
        }
    }

    /// Remove this context's descriptor from the medium and stop.
    ///
    /// Best effort: if the write fails, peers drop the descriptor once it
    /// times out.
    pub fn depart(&mut self) {
        if !matches!(self.state, State::Registering | State::Active) {
            return;
        }

        if let Some(id) = self.id().cloned() {
            self.deregister(&id);
            info!("Window {} departed", id);
        }

        self.state = State::Departed;
        self.view = Registry::new();
    }

    /// Wipe the shared registry and tell every context to start over.
    pub fn reset(&mut self) {
        if !matches!(self.state, State::Registering | State::Active) {
            return;
        }

        let now = self.clock.now_millis();
        let stamp = match self.reset_marker {
            Some(previous) if previous >= now => previous + 1,
            _ => now,
        };

        match self.store.broadcast_reset(stamp) {
            Ok(()) => info!("Registry '{}' reset", self.store.key()),
            Err(err) => warn!("Failed to reset registry '{}': {}", self.store.key(), err),
        }

        self.reset_marker = Some(stamp);
        self.enter_reset();
    }

    fn enter_reset(&mut self) {
        self.state = State::Departed;
        self.view = Registry::new();
        if let Some(callback) = self.on_reset.as_mut() {
            guarded("reset", || callback());
        }
    }

    /// Depart if some other context broadcast a newer reset marker.
    ///
    /// The resetter clears the registry and writes the marker separately, so
    /// this context may have republished in between; that copy is removed.
    fn observe_reset(&mut self, id: &WindowId) -> bool {
        let marker = self.store.reset_marker();
        if marker.is_none() || marker == self.reset_marker {
            return false;
        }

        info!("Registry '{}' was reset by another window", self.store.key());
        self.reset_marker = marker;
        self.deregister(id);
        self.enter_reset();
        true
    }

    /// Best-effort removal of `id` from the shared registry.
    fn deregister(&mut self, id: &WindowId) {
        let mut remote = self.store.load();
        if remote.remove(id).is_some() {
            if let Err(err) = self.store.save(&remote) {
                warn!("Failed to deregister window {}: {}", id, err);
            }
        }
    }

    fn tick(&mut self, now: u64) {
        let Some(mut own) = self.own.take() else {
            return;
        };

        let shape = self.shape_source.current_shape();
        let shape_changed = own.shape != shape;
        own.shape = shape;

        let wake = self
            .listener
            .wake(now, self.store.key(), self.store.reset_key());

        let registering = self.state == State::Registering;
        let must_read = registering
            || wake.any()
            || self.heartbeat.is_unpublished(&own.shape)
            || self.heartbeat.keepalive_due(now);

        if must_read && self.observe_reset(&own.id) {
            self.own = Some(own);
            return;
        }

        if must_read {
            let remote = self.store.load();
            self.listener.mark_read(now);

            if registering {
                self.claim_unique_id(&mut own, &remote);
            }

            let mut merged = merge(&self.view, &remote, &own, now);
            let pruned = self.reaper.reap(&mut merged, now, &own.id);

            let seen = Observation {
                registering,
                remote_in_sync: remote
                    .get(&own.id)
                    .is_some_and(|copy| copy.shape == own.shape),
                pruned_remote: pruned.iter().any(|id| remote.contains(id)),
            };

            if let Some(reason) = self.heartbeat.decide(&own.shape, now, seen) {
                own.last_seen = Some(now);
                merged.upsert(own.clone());

                match self.store.save(&merged) {
                    Ok(()) => {
                        debug!("Published window {} ({})", own.id, reason);
                        self.heartbeat.record(own.shape, now);
                        if registering {
                            self.state = State::Active;
                            info!("Window {} registered at {}", own.id, own.shape);
                        }
                    }
                    Err(err) => warn!("Failed to publish window {} ({}): {}", own.id, reason, err),
                }
            }

            self.view = merged;
        } else {
            self.view.upsert(own.clone());
            self.reaper.reap(&mut self.view, now, &own.id);
        }

        self.own = Some(own);

        if shape_changed {
            if let Some(callback) = self.on_shape_change.as_mut() {
                guarded("shape_changed", || callback(&shape));
            }
        }

        self.report_windows();
    }

    /// Re-draw the id while it collides with an entry already in the medium.
    ///
    /// Only called before the first publish, so any existing entry with our
    /// id belongs to someone else.
    fn claim_unique_id(&mut self, own: &mut WindowDescriptor, remote: &Registry) {
        let mut attempts = 1;
        while remote.contains(&own.id) {
            let collision = Error::DuplicateIdentity {
                id: own.id.to_string(),
            };
            if attempts >= self.config.max_identity_attempts {
                warn!("{}; giving up after {} attempts", collision, attempts);
                return;
            }
            own.id = self.identity.assign(&*self.clock);
            debug!("{}; reassigned as {}", collision, own.id);
            attempts += 1;
        }
    }

    fn report_windows(&mut self) {
        if self.state != State::Active {
            return;
        }

        let unchanged = self
            .reported
            .as_ref()
            .is_some_and(|reported| reported.same_layout(&self.view));
        if unchanged {
            return;
        }

        self.reported = Some(self.view.clone());
        if let Some(callback) = self.on_windows_change.as_mut() {
            let windows = self.view.as_slice();
            guarded("windows_changed", || callback(windows));
        }
    }
}

/// Run a caller-supplied callback, containing any panic it raises.
fn guarded<F: FnOnce()>(name: &'static str, callback: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        let failure = Error::CallbackFailure {
            callback: name,
            message: panic_message(payload.as_ref()),
        };
        error!("{}", failure);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
