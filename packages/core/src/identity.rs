//! Window id assignment.

use uuid::Uuid;

use crate::clock::Clock;
use crate::model::WindowId;

/// Produces fresh window ids.
///
/// The coordinator caches the first id it gets and only asks again when
/// that id turns out to be taken before it was ever published.
pub trait IdentityAssigner: Send {
    fn assign(&mut self, clock: &dyn Clock) -> WindowId;
}

/// `<unix millis as 13 hex digits>-<12 random hex digits>`.
///
/// Ids sort by creation time and two contexts starting in the same
/// millisecond still differ in the 48-bit random suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdentity;

impl IdentityAssigner for RandomIdentity {
    fn assign(&mut self, clock: &dyn Clock) -> WindowId {
        let suffix = Uuid::new_v4().simple().to_string();
        WindowId::new(format!("{:013x}-{}", clock.now_millis(), &suffix[..12]))
    }
}

/// Hands out a fixed list of ids, then falls back to [`RandomIdentity`].
///
/// Lets tests force collisions deterministically.
#[derive(Debug, Clone, Default)]
pub struct ScriptedIdentity {
    queue: std::collections::VecDeque<WindowId>,
}

impl ScriptedIdentity {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<WindowId>,
    {
        Self {
            queue: ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl IdentityAssigner for ScriptedIdentity {
    fn assign(&mut self, clock: &dyn Clock) -> WindowId {
        self.queue
            .pop_front()
            .unwrap_or_else(|| RandomIdentity.assign(clock))
    }
}
