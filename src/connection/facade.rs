//! Connection facade: lifecycle status and internal protocol events.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::state::ConnectionStatus;
use crate::error::Result;
use crate::events::{invoke_guarded, CallbackKey, EventRegistry, GlobalTarget};
use crate::protocol::{ConnectionEvent, Protocol, PusherEvent};
use crate::transports::{RawCallback, Transport};

/// What a connection-scope callback receives
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionPayload {
    /// `"ping"` or `"pong"`; the frame itself carries nothing useful
    Literal(&'static str),
    /// Decoded `pusher:error` frame
    Event(PusherEvent),
}

impl ConnectionPayload {
    pub fn as_literal(&self) -> Option<&'static str> {
        match self {
            Self::Literal(s) => Some(*s),
            Self::Event(_) => None,
        }
    }

    pub fn as_event(&self) -> Option<&PusherEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::Literal(_) => None,
        }
    }
}

/// Callback for connection-scope logical events
pub type ConnectionCallback = Arc<dyn Fn(&ConnectionPayload) + Send + Sync + 'static>;

/// Callback for status transitions: `(previous, current)`
pub type StateChangeCallback =
    Arc<dyn Fn(ConnectionStatus, ConnectionStatus) + Send + Sync + 'static>;

/// The client's single lifecycle channel.
///
/// The transport delivers `pusher:error`, `pusher:ping` and `pusher:pong` on
/// its one global callback slot. Every `bind` installs its own global
/// subscription whose closure filters on the `event` discriminator, so
/// unbinding one `(event, callback)` pair removes exactly that subscription.
pub struct Connection {
    registry: EventRegistry,
    state: RwLock<ConnectionStatus>,
    state_listeners: RwLock<Vec<(CallbackKey, StateChangeCallback)>>,
}

impl Connection {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            registry: EventRegistry::new("connection", GlobalTarget(transport)),
            state: RwLock::new(ConnectionStatus::default()),
            state_listeners: RwLock::new(Vec::new()),
        }
    }

    /// Get current status
    pub fn state(&self) -> ConnectionStatus {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Bind `callback` to one logical connection event.
    ///
    /// Returns `false` if this callback is already bound to `event`.
    pub fn bind(&self, event: ConnectionEvent, callback: &ConnectionCallback) -> bool {
        let cb = callback.clone();
        let demux: RawCallback = Arc::new(move |raw| {
            if Protocol::internal_event(raw) != Some(event) {
                return;
            }
            match event {
                ConnectionEvent::Ping | ConnectionEvent::Pong => {
                    let payload = ConnectionPayload::Literal(event.name());
                    invoke_guarded(event.name(), || cb(&payload));
                }
                ConnectionEvent::Error => match Protocol::deserialize(raw) {
                    Ok(parsed) => {
                        let payload = ConnectionPayload::Event(parsed);
                        invoke_guarded(event.name(), || cb(&payload));
                    }
                    Err(e) => warn!("Dropping undecodable error frame: {}", e),
                },
            }
        });
        self.registry.bind_raw(callback, Some(event.name()), demux)
    }

    /// [`bind`](Self::bind) by logical name (`"error"`, `"ping"`, `"pong"`)
    pub fn bind_named(&self, event_name: &str, callback: &ConnectionCallback) -> Result<bool> {
        Ok(self.bind(event_name.parse()?, callback))
    }

    /// Unbind `callback` from one logical event. Unknown pairs are ignored.
    pub fn unbind(&self, event: ConnectionEvent, callback: &ConnectionCallback) -> bool {
        self.registry.unbind(callback, Some(event.name()))
    }

    pub fn unbind_named(&self, event_name: &str, callback: &ConnectionCallback) -> Result<bool> {
        Ok(self.unbind(event_name.parse()?, callback))
    }

    /// Listen for status transitions
    pub fn bind_state_change(&self, callback: &StateChangeCallback) -> bool {
        let key = CallbackKey::of(callback);
        let mut listeners = self.state_listeners.write();
        if listeners.iter().any(|(k, _)| *k == key) {
            return false;
        }
        listeners.push((key, callback.clone()));
        true
    }

    pub fn unbind_state_change(&self, callback: &StateChangeCallback) -> bool {
        let key = CallbackKey::of(callback);
        let mut listeners = self.state_listeners.write();
        let before = listeners.len();
        listeners.retain(|(k, _)| *k != key);
        listeners.len() != before
    }

    /// Drop every binding and state listener
    pub fn unbind_all(&self) {
        self.registry.clear();
        self.state_listeners.write().clear();
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }

    /// Record a new status. Only the delegate adapter calls this.
    pub(crate) fn set_state(&self, status: ConnectionStatus) {
        let previous = std::mem::replace(&mut *self.state.write(), status);
        if previous == status {
            return;
        }

        info!("Connection state changed: {} -> {}", previous, status);
        let listeners: Vec<StateChangeCallback> = self
            .state_listeners
            .read()
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        debug!("Notifying {} state listeners", listeners.len());
        for listener in listeners {
            invoke_guarded("state_change", || listener(previous, status));
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("bindings", &self.binding_count())
            .finish()
    }
}
