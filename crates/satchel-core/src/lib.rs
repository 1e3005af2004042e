//! # Satchel Core
//!
//! Pure primitives for Satchel: store identities, creation options, the
//! value-existence encoding, and the wire contract unions.
//!
//! This crate contains no I/O, no async, no channels. It is pure data
//! and the encode/decode logic between the two wire generations.
//!
//! ## Key Types
//!
//! - [`StoreId`] - The addressing key for a store instance (path or handle)
//! - [`ResourceId`] - Host-assigned identifier for a live store instance
//! - [`Lookup`] - A key's state: present (possibly `null`) or absent
//! - [`HostRequest`] / [`HostResponse`] - The tagged call-channel unions
//! - [`ChangeNotice`] - One observable mutation, as delivered to subscribers
//!
//! ## Wire Generations
//!
//! The contract evolved from path-addressed stores with `null`-as-absent
//! to handle-addressed stores with an explicit `exists` flag. Both live
//! behind [`WireGeneration`]; see the [`wire`] module.

pub mod error;
pub mod types;
pub mod wire;

pub use error::WireError;
pub use types::{AutosavePolicy, ChangeNotice, Lookup, ResourceId, StoreId, StoreOptions};
pub use wire::{HostRequest, HostResponse, WireGeneration, WireLookup, CHANGE_TOPIC};
