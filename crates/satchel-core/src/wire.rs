//! Wire contract: request/response unions and the change-payload encodings.
//!
//! The contract evolved once. The legacy generation addresses stores by
//! path and signals absence with JSON `null`; the current generation
//! addresses stores by resource handle and carries an explicit `exists`
//! flag. A bridge speaks exactly one generation, chosen at construction
//! time, never inferred from traffic.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::error::WireError;
use crate::types::{ChangeNotice, Lookup, ResourceId, StoreId, StoreOptions};

/// The single well-known topic all change notifications are published on.
pub const CHANGE_TOPIC: &str = "store://change";

/// Which historical wire contract a bridge speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireGeneration {
    /// Stores addressed by path; absence encoded as JSON `null`.
    ///
    /// Under this generation a present `null` value and an absent key
    /// are indistinguishable on the wire; decoding maps `null` to
    /// [`Lookup::Absent`].
    PathAddressed,
    /// Stores addressed by resource handle; explicit `exists` flag.
    HandleAddressed,
}

/// A request to the host engine. One request, one round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostRequest {
    /// Create or open a store. The host answers `Handle` under the
    /// current generation and plain `Ok` under the legacy one.
    Load {
        path: String,
        options: StoreOptions,
    },
    /// Look up an already-created store without creating one.
    GetStore { path: String },
    Set {
        store: StoreId,
        key: String,
        value: JsonValue,
    },
    Get { store: StoreId, key: String },
    Has { store: StoreId, key: String },
    Delete { store: StoreId, key: String },
    Clear { store: StoreId },
    /// Restore configured defaults. Observationally `Clear` when the
    /// host has no defaults for the store, but a distinct operation on
    /// the wire.
    Reset { store: StoreId },
    Keys { store: StoreId },
    Values { store: StoreId },
    Entries { store: StoreId },
    Length { store: StoreId },
    /// Replace in-memory state from disk. Never publishes changes.
    Reload { store: StoreId },
    Save { store: StoreId },
    /// Release a host-side resource slot.
    Close { rid: ResourceId },
}

impl HostRequest {
    /// The operation name, for logs and request accounting.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::GetStore { .. } => "get_store",
            Self::Set { .. } => "set",
            Self::Get { .. } => "get",
            Self::Has { .. } => "has",
            Self::Delete { .. } => "delete",
            Self::Clear { .. } => "clear",
            Self::Reset { .. } => "reset",
            Self::Keys { .. } => "keys",
            Self::Values { .. } => "values",
            Self::Entries { .. } => "entries",
            Self::Length { .. } => "length",
            Self::Reload { .. } => "reload",
            Self::Save { .. } => "save",
            Self::Close { .. } => "close",
        }
    }
}

/// A host engine response. Each request expects exactly one variant;
/// anything else is a shape violation surfaced as
/// [`WireError::UnexpectedResponse`] at the decode boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostResponse {
    Ok,
    Handle(ResourceId),
    MaybeHandle(Option<ResourceId>),
    Lookup(WireLookup),
    Flag(bool),
    Keys(Vec<String>),
    Values(Vec<JsonValue>),
    Entries(Vec<(String, JsonValue)>),
    Length(u64),
}

impl HostResponse {
    /// The response shape name, for error reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Handle(_) => "handle",
            Self::MaybeHandle(_) => "maybe_handle",
            Self::Lookup(_) => "lookup",
            Self::Flag(_) => "flag",
            Self::Keys(_) => "keys",
            Self::Values(_) => "values",
            Self::Entries(_) => "entries",
            Self::Length(_) => "length",
        }
    }
}

/// A key lookup as it crosses the wire, in either generation's encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireLookup {
    /// Legacy: `null` means absent.
    Nullable(JsonValue),
    /// Current: explicit existence flag; `value` is `null` when absent.
    Flagged { value: JsonValue, exists: bool },
}

impl WireLookup {
    /// Encode a lookup in the given generation's representation.
    ///
    /// The legacy encoding is lossy: `Present(null)` becomes plain
    /// `null` and will decode as `Absent`.
    pub fn encode(lookup: &Lookup, generation: WireGeneration) -> Self {
        match generation {
            WireGeneration::PathAddressed => match lookup {
                Lookup::Present(v) => Self::Nullable(v.clone()),
                Lookup::Absent => Self::Nullable(JsonValue::Null),
            },
            WireGeneration::HandleAddressed => match lookup {
                Lookup::Present(v) => Self::Flagged {
                    value: v.clone(),
                    exists: true,
                },
                Lookup::Absent => Self::Flagged {
                    value: JsonValue::Null,
                    exists: false,
                },
            },
        }
    }

    /// Decode into the client-facing representation.
    pub fn decode(self) -> Lookup {
        match self {
            Self::Nullable(JsonValue::Null) => Lookup::Absent,
            Self::Nullable(v) => Lookup::Present(v),
            Self::Flagged { exists: false, .. } => Lookup::Absent,
            Self::Flagged { value, exists: true } => Lookup::Present(value),
        }
    }
}

impl ChangeNotice {
    /// Encode as the change-topic payload for the given generation.
    ///
    /// Legacy payloads require a path-addressed store; the legacy host
    /// never issued handles.
    pub fn to_payload(&self, generation: WireGeneration) -> Result<JsonValue, WireError> {
        match generation {
            WireGeneration::PathAddressed => {
                let path = self.store.as_path().ok_or_else(|| {
                    WireError::MalformedPayload(
                        "legacy change payload requires a path-addressed store".into(),
                    )
                })?;
                let value = match &self.lookup {
                    Lookup::Present(v) => v.clone(),
                    Lookup::Absent => JsonValue::Null,
                };
                Ok(json!({ "path": path, "key": self.key, "value": value }))
            }
            WireGeneration::HandleAddressed => {
                let mut payload = json!({
                    "key": self.key,
                    "value": self.lookup.value().cloned().unwrap_or(JsonValue::Null),
                    "exists": self.lookup.exists(),
                });
                match &self.store {
                    StoreId::Handle(rid) => payload["rid"] = json!(rid.as_raw()),
                    StoreId::Path(path) => payload["path"] = json!(path),
                }
                Ok(payload)
            }
        }
    }

    /// Decode a change-topic payload published under the given generation.
    pub fn from_payload(
        generation: WireGeneration,
        payload: &JsonValue,
    ) -> Result<Self, WireError> {
        let key = payload
            .get("key")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| WireError::MalformedPayload("missing string `key`".into()))?
            .to_string();

        match generation {
            WireGeneration::PathAddressed => {
                let path = payload
                    .get("path")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| WireError::MalformedPayload("missing string `path`".into()))?;
                let value = payload
                    .get("value")
                    .cloned()
                    .unwrap_or(JsonValue::Null);
                Ok(Self {
                    store: StoreId::path(path),
                    key,
                    lookup: WireLookup::Nullable(value).decode(),
                })
            }
            WireGeneration::HandleAddressed => {
                let store = if let Some(rid) = payload.get("rid").and_then(JsonValue::as_u64) {
                    StoreId::handle(ResourceId::from_raw(rid as u32))
                } else if let Some(path) = payload.get("path").and_then(JsonValue::as_str) {
                    StoreId::path(path)
                } else {
                    return Err(WireError::MalformedPayload(
                        "missing `rid` or `path`".into(),
                    ));
                };
                let exists = payload
                    .get("exists")
                    .and_then(JsonValue::as_bool)
                    .ok_or_else(|| WireError::MalformedPayload("missing bool `exists`".into()))?;
                let value = payload
                    .get("value")
                    .cloned()
                    .unwrap_or(JsonValue::Null);
                Ok(Self {
                    store,
                    key,
                    lookup: WireLookup::Flagged { value, exists }.decode(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_flagged_preserves_present_null() {
        let wire = WireLookup::encode(&Lookup::Present(JsonValue::Null), WireGeneration::HandleAddressed);
        assert_eq!(wire.decode(), Lookup::Present(JsonValue::Null));

        let wire = WireLookup::encode(&Lookup::Absent, WireGeneration::HandleAddressed);
        assert_eq!(wire.decode(), Lookup::Absent);
    }

    #[test]
    fn test_nullable_collapses_present_null() {
        // The legacy generation cannot represent a present null.
        let wire = WireLookup::encode(&Lookup::Present(JsonValue::Null), WireGeneration::PathAddressed);
        assert_eq!(wire.decode(), Lookup::Absent);
    }

    #[test]
    fn test_legacy_change_payload() {
        let notice = ChangeNotice {
            store: StoreId::path("settings.json"),
            key: "theme".into(),
            lookup: Lookup::Present(json!("dark")),
        };
        let payload = notice.to_payload(WireGeneration::PathAddressed).unwrap();
        assert_eq!(payload, json!({"path": "settings.json", "key": "theme", "value": "dark"}));

        let decoded = ChangeNotice::from_payload(WireGeneration::PathAddressed, &payload).unwrap();
        assert_eq!(decoded, notice);
    }

    #[test]
    fn test_legacy_change_payload_rejects_handle_store() {
        let notice = ChangeNotice {
            store: StoreId::handle(ResourceId::from_raw(3)),
            key: "theme".into(),
            lookup: Lookup::Absent,
        };
        assert!(notice.to_payload(WireGeneration::PathAddressed).is_err());
    }

    #[test]
    fn test_current_change_payload_carries_exists() {
        let notice = ChangeNotice {
            store: StoreId::handle(ResourceId::from_raw(3)),
            key: "theme".into(),
            lookup: Lookup::Present(JsonValue::Null),
        };
        let payload = notice.to_payload(WireGeneration::HandleAddressed).unwrap();
        assert_eq!(payload["exists"], json!(true));

        let decoded = ChangeNotice::from_payload(WireGeneration::HandleAddressed, &payload).unwrap();
        assert_eq!(decoded.lookup, Lookup::Present(JsonValue::Null));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let err = ChangeNotice::from_payload(WireGeneration::HandleAddressed, &json!({"key": "a"}));
        assert!(err.is_err());

        let err = ChangeNotice::from_payload(WireGeneration::PathAddressed, &json!({"value": 1}));
        assert!(err.is_err());
    }

    fn arb_json_leaf() -> impl Strategy<Value = JsonValue> {
        prop_oneof![
            Just(JsonValue::Null),
            any::<bool>().prop_map(JsonValue::from),
            any::<i64>().prop_map(JsonValue::from),
            "[a-z]{0,12}".prop_map(JsonValue::from),
        ]
    }

    proptest! {
        #[test]
        fn current_generation_roundtrips_any_lookup(value in arb_json_leaf(), absent in any::<bool>()) {
            let lookup = if absent { Lookup::Absent } else { Lookup::Present(value) };
            let wire = WireLookup::encode(&lookup, WireGeneration::HandleAddressed);
            prop_assert_eq!(wire.decode(), lookup);
        }

        #[test]
        fn legacy_generation_roundtrips_non_null(value in arb_json_leaf()) {
            prop_assume!(value != JsonValue::Null);
            let lookup = Lookup::Present(value);
            let wire = WireLookup::encode(&lookup, WireGeneration::PathAddressed);
            prop_assert_eq!(wire.decode(), lookup);
        }
    }
}
