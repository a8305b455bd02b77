//! # winsync-core
//!
//! Keeps a shared, eventually-consistent registry of "known windows" across
//! isolated contexts that can only talk through a shared key-value medium.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  Coordinator (init / update / windows / depart) │
//! ├───────────────┬───────────────┬────────────────┤
//! │  Heartbeat    │  PeerChange   │  Staleness     │
//! │  Publisher    │  Listener     │  Reaper        │
//! ├───────────────┴───────────────┴────────────────┤
//! │  merge(local, remote, own)   RegistryStore     │
//! ├────────────────────────────────────────────────┤
//! │  Medium (Reader + Writer)  +  Notifier         │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Each context owns exactly one descriptor and is the only writer of its
//! shape. There is no locking on the medium: concurrent writers may clobber
//! each other, and every owner re-asserts its descriptor on the next tick, so
//! lost updates are transient.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use winsync_core::{Coordinator, FixedShape, MemoryMedium, RegistryConfig, Shape};
//!
//! let medium = MemoryMedium::new();
//!
//! let mut a = Coordinator::new(
//!     medium.clone(),
//!     FixedShape::new(Shape::new(0.0, 0.0, 400.0, 300.0)),
//!     RegistryConfig::default(),
//! )
//! .unwrap()
//! .with_notifier(medium.clone());
//!
//! let other = medium.connect();
//! let mut b = Coordinator::new(
//!     other.clone(),
//!     FixedShape::new(Shape::new(500.0, 0.0, 400.0, 300.0)),
//!     RegistryConfig::default(),
//! )
//! .unwrap()
//! .with_notifier(other);
//!
//! a.init(json!({"tag": "A"}));
//! b.init(json!({"tag": "B"}));
//! a.update();
//!
//! assert_eq!(a.windows().len(), 2);
//! assert_eq!(b.windows().len(), 2);
//! ```

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod heartbeat;
pub mod identity;
pub mod listener;
pub mod memory;
pub mod merge;
pub mod model;
pub mod reaper;
pub mod store;
pub mod traits;

pub use clock::{Clock, FixedShape, ManualClock, ShapeSource, SystemClock};
pub use config::RegistryConfig;
pub use coordinator::{Coordinator, State};
pub use error::Error;
pub use heartbeat::{HeartbeatPublisher, PublishReason};
pub use identity::{IdentityAssigner, RandomIdentity, ScriptedIdentity};
pub use listener::{PeerChangeListener, Wake};
pub use memory::MemoryMedium;
pub use merge::merge;
pub use model::{Registry, Shape, WindowDescriptor, WindowId};
pub use reaper::{is_stale, StalenessReaper};
pub use store::RegistryStore;
pub use traits::{validate_key, ChangeSink, Medium, Notifier, Reader, Writer};
