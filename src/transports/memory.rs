//! In-process loopback transport.
//!
//! Nothing goes over the network: the host (or a test) plays the server side
//! by calling [`MemoryTransport::deliver`], [`MemoryTransport::set_state`] and
//! the subscription acknowledgement helpers. Callbacks run synchronously on
//! the calling thread, which stands in for the transport's dispatch queue.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use super::transport::{
    RawCallback, SubscriptionHandle, Transport, TransportChannel, TransportDelegate,
    TransportState,
};
use crate::error::{BindingError, Result};
use crate::options::ClientOptions;
use crate::protocol::RawEvent;

fn next_handle() -> SubscriptionHandle {
    SubscriptionHandle::new(Uuid::new_v4().to_string())
}

/// Loopback transport
pub struct MemoryTransport {
    options: RwLock<Option<ClientOptions>>,
    endpoint: RwLock<Option<Url>>,
    state: RwLock<TransportState>,
    /// Global bindings in registration order
    global_callbacks: RwLock<Vec<(SubscriptionHandle, RawCallback)>>,
    channels: DashMap<String, Arc<MemoryChannel>>,
    delegate: RwLock<Option<Arc<dyn TransportDelegate>>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            options: RwLock::new(None),
            endpoint: RwLock::new(None),
            state: RwLock::new(TransportState::Initialized),
            global_callbacks: RwLock::new(Vec::new()),
            channels: DashMap::new(),
            delegate: RwLock::new(None),
        }
    }

    fn delegate(&self) -> Option<Arc<dyn TransportDelegate>> {
        self.delegate.read().clone()
    }

    pub fn state(&self) -> TransportState {
        *self.state.read()
    }

    /// Move to `new` and notify the delegate if the state changed
    pub fn set_state(&self, new: TransportState) {
        let old = std::mem::replace(&mut *self.state.write(), new);
        if old == new {
            return;
        }

        debug!("Transport state changed: {:?} -> {:?}", old, new);
        if let Some(delegate) = self.delegate() {
            delegate.connection_state_changed(old, new);
        }
    }

    /// Simulate the server going away while connected.
    ///
    /// With `auto_reconnect` on (the default) the transport parks in
    /// `Reconnecting` until the next `connect`; otherwise it goes straight to
    /// `Disconnected`.
    pub fn drop_connection(&self) {
        if self.state() != TransportState::Connected {
            return;
        }
        let auto_reconnect = self
            .options
            .read()
            .as_ref()
            .map_or(true, ClientOptions::is_auto_reconnect);
        if auto_reconnect {
            self.set_state(TransportState::Reconnecting);
        } else {
            self.set_state(TransportState::Disconnected);
        }
    }

    /// Deliver a payload as if it had arrived from the server.
    ///
    /// Global bindings see every payload; if it names a subscribed channel it
    /// is then routed to that channel's bindings for its event name.
    pub fn deliver(&self, raw: &RawEvent) {
        let handles: Vec<SubscriptionHandle> = self
            .global_callbacks
            .read()
            .iter()
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in handles {
            // Re-check each binding right before invoking it, so a callback
            // unbound by an earlier one in this round is not called.
            let callback = self
                .global_callbacks
                .read()
                .iter()
                .find(|(h, _)| *h == handle)
                .map(|(_, cb)| cb.clone());
            if let Some(callback) = callback {
                callback(raw);
            }
        }

        let channel_name = raw.get("channel").and_then(|v| v.as_str());
        if let Some(name) = channel_name {
            let channel = self.channels.get(name).map(|c| c.value().clone());
            match channel {
                Some(channel) => channel.dispatch(raw),
                None => trace!("Dropping payload for unsubscribed channel '{}'", name),
            }
        }
    }

    /// Deliver a payload on a channel
    pub fn deliver_to_channel(&self, name: &str, raw: RawEvent) {
        self.deliver(&raw.with_channel(name));
    }

    /// Report a successful subscription acknowledgement
    pub fn acknowledge_subscription(&self, name: &str) {
        if let Some(delegate) = self.delegate() {
            delegate.subscribed(name);
        }
    }

    /// Report a rejected subscription
    pub fn fail_subscription(
        &self,
        name: &str,
        status: Option<u16>,
        data: Option<&str>,
        error: Option<&str>,
    ) {
        if let Some(delegate) = self.delegate() {
            delegate.subscription_failed(name, status, data, error);
        }
    }

    /// Emit a debug line through the delegate
    pub fn log(&self, message: &str) {
        if let Some(delegate) = self.delegate() {
            delegate.debug_log(message);
        }
    }

    /// Options received from the client, if it has configured this transport
    pub fn options(&self) -> Option<ClientOptions> {
        self.options.read().clone()
    }

    /// Endpoint derived from the configured options
    pub fn endpoint(&self) -> Option<Url> {
        self.endpoint.read().clone()
    }

    pub fn global_binding_count(&self) -> usize {
        self.global_callbacks.read().len()
    }

    pub fn is_subscribed(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channel(&self, name: &str) -> Option<Arc<MemoryChannel>> {
        self.channels.get(name).map(|c| c.value().clone())
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.read().is_some()
    }
}

impl Transport for MemoryTransport {
    fn configure(&self, options: &ClientOptions) -> Result<()> {
        if !matches!(
            self.state(),
            TransportState::Initialized | TransportState::Disconnected
        ) {
            return Err(BindingError::transport(
                "Cannot reconfigure a transport that is connected",
            ));
        }

        let endpoint = options
            .endpoint_url()
            .map_err(|e| BindingError::transport(format!("Bad endpoint: {}", e)))?;
        debug!("Loopback transport configured for {}", endpoint);

        *self.endpoint.write() = Some(endpoint);
        *self.options.write() = Some(options.clone());
        Ok(())
    }

    fn connect(&self) {
        if matches!(
            self.state(),
            TransportState::Connecting | TransportState::Connected
        ) {
            return;
        }
        self.log("Connecting loopback transport");
        self.set_state(TransportState::Connecting);
        self.set_state(TransportState::Connected);
    }

    fn disconnect(&self) {
        if matches!(
            self.state(),
            TransportState::Disconnected | TransportState::Initialized
        ) {
            return;
        }
        self.set_state(TransportState::Disconnecting);
        self.set_state(TransportState::Disconnected);
    }

    fn bind(&self, callback: RawCallback) -> SubscriptionHandle {
        let handle = next_handle();
        self.global_callbacks
            .write()
            .push((handle.clone(), callback));
        handle
    }

    fn unbind(&self, handle: &SubscriptionHandle) {
        self.global_callbacks.write().retain(|(h, _)| h != handle);
    }

    fn subscribe(&self, name: &str) -> Arc<dyn TransportChannel> {
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryChannel::new(name)))
            .value()
            .clone();
        debug!("Subscribed loopback channel: {}", name);
        channel
    }

    fn unsubscribe(&self, name: &str) {
        self.channels.remove(name);
    }

    fn unsubscribe_all(&self) {
        self.channels.clear();
    }

    fn set_delegate(&self, delegate: Arc<dyn TransportDelegate>) {
        *self.delegate.write() = Some(delegate);
    }
}

/// Channel handle issued by [`MemoryTransport`]
pub struct MemoryChannel {
    name: String,
    bindings: RwLock<Vec<(String, SubscriptionHandle, RawCallback)>>,
}

impl MemoryChannel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bindings: RwLock::new(Vec::new()),
        }
    }

    fn dispatch(&self, raw: &RawEvent) {
        let Some(event_name) = raw.event_name() else {
            return;
        };

        let handles: Vec<SubscriptionHandle> = self
            .bindings
            .read()
            .iter()
            .filter(|(name, _, _)| name == event_name)
            .map(|(_, handle, _)| handle.clone())
            .collect();

        for handle in handles {
            let callback = self
                .bindings
                .read()
                .iter()
                .find(|(_, h, _)| *h == handle)
                .map(|(_, _, cb)| cb.clone());
            if let Some(callback) = callback {
                callback(raw);
            }
        }
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }
}

impl TransportChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&self, event_name: &str, callback: RawCallback) -> SubscriptionHandle {
        let handle = next_handle();
        self.bindings
            .write()
            .push((event_name.to_string(), handle.clone(), callback));
        handle
    }

    fn unbind(&self, event_name: &str, handle: &SubscriptionHandle) {
        self.bindings
            .write()
            .retain(|(name, h, _)| !(name == event_name && h == handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> RawCallback {
        let counter = counter.clone();
        Arc::new(move |_: &RawEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_handles_are_unique() {
        let transport = MemoryTransport::new();
        let a = transport.bind(Arc::new(|_: &RawEvent| {}));
        let b = transport.bind(Arc::new(|_: &RawEvent| {}));
        assert_ne!(a, b);
        assert_eq!(transport.global_binding_count(), 2);
    }

    #[test]
    fn test_global_unbind_stops_delivery() {
        let transport = MemoryTransport::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = transport.bind(counting(&counter));

        transport.deliver(&RawEvent::new("anything"));
        transport.unbind(&handle);
        transport.deliver(&RawEvent::new("anything"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_routing_by_event_name() {
        let transport = MemoryTransport::new();
        let channel = transport.subscribe("room");
        let counter = Arc::new(AtomicUsize::new(0));
        channel.bind("message", counting(&counter));

        transport.deliver_to_channel("room", RawEvent::new("message"));
        transport.deliver_to_channel("room", RawEvent::new("other"));
        transport.deliver_to_channel("lobby", RawEvent::new("message"));

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_drops_channel_traffic() {
        let transport = MemoryTransport::new();
        let channel = transport.subscribe("room");
        let counter = Arc::new(AtomicUsize::new(0));
        channel.bind("message", counting(&counter));

        transport.unsubscribe("room");
        transport.deliver_to_channel("room", RawEvent::new("message"));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!transport.is_subscribed("room"));
    }

    #[test]
    fn test_configure_records_endpoint() {
        let transport = MemoryTransport::new();
        let options = ClientOptions::new("test-key").host("localhost").port(6001);
        transport.configure(&options).unwrap();

        assert_eq!(transport.options(), Some(options));
        let endpoint = transport.endpoint().unwrap();
        assert_eq!(endpoint.host_str(), Some("localhost"));
        assert_eq!(endpoint.port(), Some(6001));
    }

    #[test]
    fn test_configure_rejects_bad_host() {
        let transport = MemoryTransport::new();
        let err = transport
            .configure(&ClientOptions::new("test-key").host("bad host"))
            .unwrap_err();
        assert!(matches!(err, BindingError::TransportError { .. }));
        assert!(transport.options().is_none());
    }

    #[test]
    fn test_configure_rejected_while_connected() {
        let transport = MemoryTransport::new();
        transport.connect();
        let err = transport
            .configure(&ClientOptions::new("test-key"))
            .unwrap_err();
        assert!(matches!(err, BindingError::TransportError { .. }));
    }

    #[test]
    fn test_drop_connection_follows_auto_reconnect() {
        let transport = MemoryTransport::new();
        transport.connect();
        transport.drop_connection();
        assert_eq!(transport.state(), TransportState::Reconnecting);
        transport.connect();
        assert_eq!(transport.state(), TransportState::Connected);

        let transport = MemoryTransport::new();
        transport
            .configure(&ClientOptions::new("test-key").auto_reconnect(false))
            .unwrap();
        transport.connect();
        transport.drop_connection();
        assert_eq!(transport.state(), TransportState::Disconnected);
    }

    #[test]
    fn test_connect_walks_states() {
        let transport = MemoryTransport::new();
        transport.connect();
        assert_eq!(transport.state(), TransportState::Connected);
        transport.disconnect();
        assert_eq!(transport.state(), TransportState::Disconnected);
    }
}
