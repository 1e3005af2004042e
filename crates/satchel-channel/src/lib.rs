//! # Satchel Channel
//!
//! The two transport seams Satchel is built on:
//!
//! - [`CallChannel`] - asynchronous request/response to the host engine
//! - [`EventChannel`] - publish/subscribe delivery of host notifications
//!
//! Both are black-box primitives from the client's point of view: the
//! client issues exactly one call per store operation and registers
//! handlers on one well-known change topic. Implementations may sit on
//! any IPC or network transport the host bridge provides.
//!
//! [`memory::MemoryBus`] is an in-memory [`EventChannel`] used by the
//! test suites; the matching in-memory [`CallChannel`] lives in
//! `satchel-testkit`, where the emulated host engine is.

pub mod call;
pub mod error;
pub mod events;

pub use call::CallChannel;
pub use error::{ChannelError, Result};
pub use events::{memory, memory::MemoryBus, EventChannel, EventHandler, Subscription};
