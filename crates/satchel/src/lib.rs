//! # Satchel
//!
//! A client bridge to a persistent key-value store owned by a host
//! process. The client never touches storage media: every operation is
//! one asynchronous round trip on a call channel, and mutations come
//! back as notifications on a shared event topic.
//!
//! ## Key Concepts
//!
//! - **Store**: a named key-value map living in the host process,
//!   addressed by path (legacy) or resource handle (current).
//! - **Handle**: host-assigned ownership of a store instance; must be
//!   released on every exit path or its slot leaks until teardown.
//! - **Lazy store**: created on first operation, single-flight.
//! - **Change watch**: store- or key-scoped subscription over the one
//!   shared change topic, with no cross-talk between subscribers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use satchel::{Bridge, BridgeConfig, CallChannel, EventChannel, StoreOptions};
//! use serde_json::json;
//!
//! async fn example(call: Arc<dyn CallChannel>, events: Arc<dyn EventChannel>) {
//!     let bridge = Bridge::new(call, events, BridgeConfig::default());
//!
//!     let store = bridge.open("settings.json", StoreOptions::new()).await.unwrap();
//!     let _watch = bridge.watch_key(store.store_id(), "theme", |notice| {
//!         println!("theme changed: {:?}", notice.lookup);
//!     });
//!
//!     store.set("theme", json!("dark")).await.unwrap();
//!     store.save().await.unwrap();
//!
//!     // Handles hold a host-side slot; release on every exit path.
//!     store.close().await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `satchel::core` - identities, options, existence encoding, wire unions
//! - `satchel::channel` - the call/event channel seams
//! - `satchel::client` - handles, proxies, lazy stores, the change router

pub mod bridge;
pub mod error;

// Re-export component crates
pub use satchel_channel as channel;
pub use satchel_client as client;
pub use satchel_core as core;

// Re-export main types for convenience
pub use bridge::{Bridge, BridgeConfig};
pub use error::{BridgeError, Result};

// Re-export commonly used component types
pub use satchel_channel::{CallChannel, ChannelError, EventChannel, Subscription};
pub use satchel_client::{ChangeRouter, ClientError, LazyStore, RemoteHandle, StoreProxy};
pub use satchel_core::{
    AutosavePolicy, ChangeNotice, Lookup, ResourceId, StoreId, StoreOptions, WireGeneration,
    CHANGE_TOPIC,
};
