//! Strong type definitions for Satchel.
//!
//! Store identities and resource ids are newtypes to prevent misuse at
//! compile time; values are `serde_json::Value` end to end.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// A host-assigned identifier for a live store instance.
///
/// Unique for the lifetime of the host process. The client holds a
/// non-owning reference; the host owns the namespace. Once issued, a
/// `ResourceId` is an immutable opaque value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Create from the raw host-assigned integer.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw integer.
    pub const fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rid:{}", self.0)
    }
}

impl From<u32> for ResourceId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// The addressing key distinguishing one store instance from another.
///
/// Exactly one scheme is active per store instance: the legacy wire
/// generation addresses stores by filesystem path, the current one by
/// [`ResourceId`]. The two are never mixed within one proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreId {
    /// Legacy addressing: the store's filesystem path, host-relative.
    Path(String),
    /// Current addressing: a host-assigned resource handle.
    Handle(ResourceId),
}

impl StoreId {
    /// Build a path identity.
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Build a handle identity.
    pub const fn handle(rid: ResourceId) -> Self {
        Self::Handle(rid)
    }

    /// The path, if this is a path identity.
    pub fn as_path(&self) -> Option<&str> {
        match self {
            Self::Path(p) => Some(p),
            Self::Handle(_) => None,
        }
    }

    /// The resource id, if this is a handle identity.
    pub fn as_handle(&self) -> Option<ResourceId> {
        match self {
            Self::Path(_) => None,
            Self::Handle(rid) => Some(*rid),
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{p}"),
            Self::Handle(rid) => write!(f, "{rid}"),
        }
    }
}

/// When the host flushes in-memory state to its backing storage.
///
/// Forwarded verbatim at creation time; the host owns the actual
/// debouncing and persistence timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutosavePolicy {
    /// Mutations stay in memory until an explicit `save`.
    Off,
    /// Autosave with the host's default debounce interval.
    On,
    /// Autosave debounced by the given interval in milliseconds.
    DebounceMs(u64),
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self::On
    }
}

/// Opaque configuration forwarded to the host at store creation.
///
/// The client does not interpret any of this; it only threads it
/// through. Note that options only take effect if no other client
/// already created a store for the same identity — that race is
/// host-side and cannot be resolved locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Autosave policy.
    pub autosave: AutosavePolicy,
    /// Name of a serialize hook registered host-side.
    pub serialize_with: Option<String>,
    /// Name of a deserialize hook registered host-side.
    pub deserialize_with: Option<String>,
    /// Discard any persisted state and recreate from defaults.
    pub create_new: bool,
    /// Default entries the host seeds the store with and restores on `reset`.
    pub defaults: Option<Map<String, JsonValue>>,
}

impl StoreOptions {
    /// Options with everything at its host default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the autosave policy.
    pub fn autosave(mut self, policy: AutosavePolicy) -> Self {
        self.autosave = policy;
        self
    }

    /// Name the host-side serialize/deserialize hook pair.
    pub fn codec(mut self, serialize_with: impl Into<String>, deserialize_with: impl Into<String>) -> Self {
        self.serialize_with = Some(serialize_with.into());
        self.deserialize_with = Some(deserialize_with.into());
        self
    }

    /// Discard persisted state and recreate from defaults.
    pub fn create_new(mut self) -> Self {
        self.create_new = true;
        self
    }

    /// Seed a default entry.
    pub fn default_entry(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.defaults
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

/// The result of looking a key up: present with a value, or absent.
///
/// `Present(Value::Null)` and `Absent` are distinct states and both
/// survive the get path and the change-delivery path. Collapsing them
/// is exactly the bug this type exists to prevent.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The key exists; its value may legitimately be `null`.
    Present(JsonValue),
    /// The key does not exist in the store.
    Absent,
}

impl Lookup {
    /// Whether the key exists.
    pub fn exists(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The value, if present.
    pub fn value(&self) -> Option<&JsonValue> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }

    /// Convert into `Option`, forgetting the null/absent distinction.
    pub fn into_option(self) -> Option<JsonValue> {
        match self {
            Self::Present(v) => Some(v),
            Self::Absent => None,
        }
    }
}

/// One observable mutation, as delivered to subscribers.
///
/// Transient: published once per mutation the host considers
/// observable, delivered at most once per live subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotice {
    /// Which store changed.
    pub store: StoreId,
    /// Which key changed.
    pub key: String,
    /// The key's state after the mutation.
    pub lookup: Lookup,
}
