//! Window descriptors and the ordered registry they live in.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Screen-relative rectangle of a window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub x: f64,
    pub y: f64,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
}

impl Shape {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Opaque identifier of one participating context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WindowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One context's entry in the shared registry.
///
/// Only the owning context mutates `shape` and `last_seen`; everyone else
/// treats the descriptor as read-only. `meta_data` is fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub id: WindowId,
    pub shape: Shape,
    #[serde(rename = "metaData", default)]
    pub meta_data: JsonValue,
    /// Unix millis of the owner's most recent publish.
    ///
    /// Absent on blobs written by peers that do not stamp heartbeats; the
    /// reader fills it in while merging.
    #[serde(rename = "lastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<u64>,
}

impl WindowDescriptor {
    pub fn new(id: WindowId, shape: Shape, meta_data: JsonValue) -> Self {
        Self {
            id,
            shape,
            meta_data,
            last_seen: None,
        }
    }
}

/// Ordered sequence of descriptors keyed by id, in arrival order.
///
/// Index 0 is the earliest registered window still alive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry(Vec<WindowDescriptor>);

impl Registry {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WindowDescriptor> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[WindowDescriptor] {
        &self.0
    }

    pub fn position(&self, id: &WindowId) -> Option<usize> {
        self.0.iter().position(|d| &d.id == id)
    }

    pub fn get(&self, id: &WindowId) -> Option<&WindowDescriptor> {
        self.0.iter().find(|d| &d.id == id)
    }

    pub fn get_mut(&mut self, id: &WindowId) -> Option<&mut WindowDescriptor> {
        self.0.iter_mut().find(|d| &d.id == id)
    }

    pub fn contains(&self, id: &WindowId) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> Vec<&WindowId> {
        self.0.iter().map(|d| &d.id).collect()
    }

    /// Append a descriptor, replacing in place if the id is already present.
    pub fn upsert(&mut self, descriptor: WindowDescriptor) {
        match self.position(&descriptor.id) {
            Some(index) => self.0[index] = descriptor,
            None => self.0.push(descriptor),
        }
    }

    /// Insert at `index` (clamped to the length). The caller guarantees the
    /// id is not already present.
    pub(crate) fn insert(&mut self, index: usize, descriptor: WindowDescriptor) {
        let index = index.min(self.0.len());
        self.0.insert(index, descriptor);
    }

    pub fn remove(&mut self, id: &WindowId) -> Option<WindowDescriptor> {
        let index = self.position(id)?;
        Some(self.0.remove(index))
    }

    /// Whether both registries list the same ids with the same shapes in the
    /// same order. Heartbeat stamps and metadata are ignored.
    pub fn same_layout(&self, other: &Registry) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.id == b.id && a.shape == b.shape)
    }
}

impl From<Vec<WindowDescriptor>> for Registry {
    fn from(descriptors: Vec<WindowDescriptor>) -> Self {
        Self(descriptors)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a WindowDescriptor;
    type IntoIter = std::slice::Iter<'a, WindowDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
