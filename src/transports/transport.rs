//! Transport trait definitions.
//!
//! The transport owns the socket, the handshake and reconnection. This crate
//! only needs its binding primitives and its lifecycle notifications.

use std::sync::Arc;

use crate::error::Result;
use crate::options::ClientOptions;
use crate::protocol::RawEvent;

/// Callback the transport invokes with undecoded payloads
pub type RawCallback = Arc<dyn Fn(&RawEvent) + Send + Sync>;

/// Opaque identifier issued by the transport for one binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(String);

impl SubscriptionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-native connection states.
///
/// Mapped onto [`ConnectionStatus`](crate::ConnectionStatus) by the delegate
/// adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    Initialized,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Reconnecting,
    /// Network unreachable, waiting to retry
    Unavailable,
    Failed,
}

/// The realtime client the binding layer sits on.
///
/// All methods are non-blocking: they register state or issue a command and
/// return. Callbacks arrive on the transport's own dispatch context.
pub trait Transport: Send + Sync {
    /// Take the client's configuration. Called once from `Client::new`,
    /// before the delegate is installed; an error aborts client creation.
    fn configure(&self, options: &ClientOptions) -> Result<()>;

    fn connect(&self);

    fn disconnect(&self);

    /// Bind to every event the connection receives
    fn bind(&self, callback: RawCallback) -> SubscriptionHandle;

    /// Remove a global binding. No further invocation of its callback may
    /// start once this returns.
    fn unbind(&self, handle: &SubscriptionHandle);

    fn subscribe(&self, name: &str) -> Arc<dyn TransportChannel>;

    fn unsubscribe(&self, name: &str);

    fn unsubscribe_all(&self);

    /// Install the lifecycle observer. The transport keeps it alive.
    fn set_delegate(&self, delegate: Arc<dyn TransportDelegate>);
}

/// Native handle for one subscribed channel
pub trait TransportChannel: Send + Sync {
    fn name(&self) -> &str;

    fn bind(&self, event_name: &str, callback: RawCallback) -> SubscriptionHandle;

    fn unbind(&self, event_name: &str, handle: &SubscriptionHandle);
}

/// Lifecycle notifications emitted by the transport
pub trait TransportDelegate: Send + Sync {
    fn connection_state_changed(&self, old: TransportState, new: TransportState);

    fn debug_log(&self, message: &str);

    fn subscribed(&self, name: &str);

    fn subscription_failed(
        &self,
        name: &str,
        status: Option<u16>,
        data: Option<&str>,
        error: Option<&str>,
    );
}
