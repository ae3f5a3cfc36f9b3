//! Channel facade over a native channel handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::events::{ChannelTarget, EventCallback, EventRegistry};
use crate::transports::TransportChannel;

/// Channel type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    /// Public channel - no authentication required
    Public,
    /// Private channel - requires authentication
    Private,
    /// Presence channel - private with member tracking
    Presence,
    /// Private encrypted channel - end-to-end encryption
    PrivateEncrypted,
}

impl ChannelType {
    /// Determine channel type from name
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("private-encrypted-") {
            Self::PrivateEncrypted
        } else if name.starts_with("private-") {
            Self::Private
        } else if name.starts_with("presence-") {
            Self::Presence
        } else {
            Self::Public
        }
    }
}

/// One subscribed topic.
///
/// Bindings go through the native channel handle, so they only see events
/// published on this channel. The channel does not track whether the
/// subscription succeeded; see
/// [`Client::subscribe_with_outcome`](crate::Client::subscribe_with_outcome).
pub struct Channel {
    name: String,
    channel_type: ChannelType,
    registry: EventRegistry,
}

impl Channel {
    pub(crate) fn new(native: Arc<dyn TransportChannel>) -> Self {
        let name = native.name().to_string();
        Self {
            channel_type: ChannelType::from_name(&name),
            registry: EventRegistry::new(format!("channel:{}", name), ChannelTarget(native)),
            name,
        }
    }

    /// Get channel name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get channel type
    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    /// Bind a callback to an event on this channel.
    ///
    /// Returns `false` if this callback is already bound to `event_name`.
    pub fn bind(&self, event_name: &str, callback: &EventCallback) -> bool {
        self.registry.bind(callback, Some(event_name))
    }

    /// Unbind a callback. Unknown pairs are ignored.
    pub fn unbind(&self, event_name: &str, callback: &EventCallback) -> bool {
        self.registry.unbind(callback, Some(event_name))
    }

    /// Unbind all callbacks
    pub fn unbind_all(&self) {
        self.registry.clear();
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("channel_type", &self.channel_type)
            .field("bindings", &self.binding_count())
            .finish()
    }
}
