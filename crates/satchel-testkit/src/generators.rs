//! Proptest strategies for keys, values, and store options.

use proptest::collection;
use proptest::prelude::*;
use serde_json::{Map, Value as JsonValue};

use satchel_core::{AutosavePolicy, StoreOptions};

/// Keys as stores see them: non-empty, printable, no structure assumed.
pub fn arb_key() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,24}"
}

/// Leaf JSON values, `null` included — the interesting case.
pub fn arb_leaf_value() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::from),
        any::<i64>().prop_map(JsonValue::from),
        "[ -~]{0,32}".prop_map(JsonValue::from),
    ]
}

/// Shallow JSON values: leaves, arrays of leaves, objects of leaves.
pub fn arb_value() -> impl Strategy<Value = JsonValue> {
    prop_oneof![
        arb_leaf_value(),
        collection::vec(arb_leaf_value(), 0..4).prop_map(JsonValue::Array),
        collection::btree_map(arb_key(), arb_leaf_value(), 0..4).prop_map(|map| {
            JsonValue::Object(map.into_iter().collect::<Map<_, _>>())
        }),
    ]
}

/// Autosave policies.
pub fn arb_autosave() -> impl Strategy<Value = AutosavePolicy> {
    prop_oneof![
        Just(AutosavePolicy::Off),
        Just(AutosavePolicy::On),
        (1u64..60_000).prop_map(AutosavePolicy::DebounceMs),
    ]
}

/// Store options as callers build them.
pub fn arb_options() -> impl Strategy<Value = StoreOptions> {
    (
        arb_autosave(),
        proptest::option::of("[a-z]{1,8}"),
        any::<bool>(),
        proptest::option::of(collection::btree_map(arb_key(), arb_leaf_value(), 0..4)),
    )
        .prop_map(|(autosave, codec, create_new, defaults)| StoreOptions {
            autosave,
            serialize_with: codec.clone(),
            deserialize_with: codec,
            create_new,
            defaults: defaults.map(|d| d.into_iter().collect()),
        })
}
