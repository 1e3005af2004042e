//! # Satchel Testkit
//!
//! Testing utilities for Satchel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **[`MemoryHost`]**: an in-memory host engine implementing the call
//!   channel with the host's observable semantics in either wire
//!   generation, publishing change notifications on an internal bus
//! - **Fixtures**: a wired-up host + bridge pair for scenario tests
//! - **Generators**: proptest strategies for keys, values, and options
//!
//! ## Usage
//!
//! ```rust
//! use satchel_testkit::TestFixture;
//! use satchel::StoreOptions;
//! use serde_json::json;
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let store = fixture.bridge.lazy("settings.json", StoreOptions::new());
//! store.set("theme", json!("dark")).await.unwrap();
//! assert_eq!(fixture.host.count("load"), 1);
//! # }
//! ```

pub mod fixtures;
pub mod generators;
pub mod host;

pub use fixtures::{change_log, TestFixture};
pub use generators::{arb_key, arb_leaf_value, arb_options, arb_value};
pub use host::MemoryHost;
