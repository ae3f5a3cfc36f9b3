//! # Pusher Binding
//!
//! Callback-based objects over a Pusher-compatible realtime transport, for
//! hosts that hand callbacks in as opaque handles and need to take them back
//! out again.
//!
//! ## Features
//!
//! - Per-scope event registries (client, channel, connection) keyed by
//!   callback identity
//! - Idempotent unbind: unknown or already removed callbacks are ignored
//! - Demultiplexing of `pusher:error` / `pusher:ping` / `pusher:pong` from
//!   the transport's single global slot into logical connection events
//! - Connection status tracking through a weakly-held lifecycle adapter
//! - Subscription outcome callbacks
//! - An in-process loopback transport for hosts and tests
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use pusher_binding::{
//!     Client, ClientOptions, ConnectionCallback, ConnectionEvent, ConnectionPayload,
//!     ConnectionStatus, MemoryTransport, RawEvent,
//! };
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let client = Client::new(ClientOptions::new("app-key").cluster("mt1"), transport.clone())?;
//!
//! let on_ping: ConnectionCallback = Arc::new(|payload: &ConnectionPayload| {
//!     assert_eq!(payload.as_literal(), Some("ping"));
//! });
//! client.connection().bind(ConnectionEvent::Ping, &on_ping);
//!
//! client.connect();
//! assert_eq!(client.state(), ConnectionStatus::Connected);
//!
//! transport.deliver(&RawEvent::new("pusher:ping"));
//! client.connection().unbind(ConnectionEvent::Ping, &on_ping);
//! # Ok::<(), pusher_binding::BindingError>(())
//! ```

pub mod channels;
pub mod connection;
pub mod events;
pub mod protocol;
pub mod transports;

mod delegate;
mod error;
mod options;
mod pusher;

// Re-exports
pub use channels::{Channel, ChannelType, SubscriptionCallback, SubscriptionOutcome};
pub use connection::{
    Connection, ConnectionCallback, ConnectionPayload, ConnectionStatus, StateChangeCallback,
};
pub use delegate::DelegateAdapter;
pub use error::{BindingError, Result};
pub use events::{event_callback, BindingTarget, CallbackKey, EventCallback, EventRegistry};
pub use options::ClientOptions;
pub use protocol::{ConnectionEvent, Protocol, PusherEvent, RawEvent};
pub use pusher::{Client, Pusher};
pub use transports::{
    MemoryTransport, RawCallback, SubscriptionHandle, Transport, TransportChannel,
    TransportDelegate, TransportState,
};
