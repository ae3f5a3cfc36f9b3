//! Transport abstraction.
//!
//! This module provides the contract the binding layer expects from the
//! underlying realtime client:
//! - `Transport` for the connection and global bindings
//! - `TransportChannel` for per-channel bindings
//! - `TransportDelegate` for lifecycle notifications
//!
//! `MemoryTransport` is an in-process implementation that lets hosts and
//! tests drive the network side by hand.

mod transport;

pub use transport::{
    RawCallback, SubscriptionHandle, Transport, TransportChannel, TransportDelegate,
    TransportState,
};

/// In-process loopback transport
pub mod memory;

pub use memory::{MemoryChannel, MemoryTransport};
