//! Top-level client handle.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::channels::{Channel, SubscriptionCallback, SubscriptionOutcome};
use crate::connection::{Connection, ConnectionStatus};
use crate::delegate::DelegateAdapter;
use crate::error::{BindingError, Result};
use crate::events::{invoke_guarded, EventCallback, EventRegistry, GlobalTarget};
use crate::options::ClientOptions;
use crate::transports::Transport;

/// State the delegate adapter reaches through its weak reference
pub(crate) struct ClientShared {
    transport: Arc<dyn Transport>,
    connection: OnceLock<Arc<Connection>>,
    outcome_callbacks: DashMap<String, SubscriptionCallback>,
}

impl ClientShared {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            connection: OnceLock::new(),
            outcome_callbacks: DashMap::new(),
        }
    }

    /// Connection facade, created on first use
    pub(crate) fn connection(&self) -> &Arc<Connection> {
        self.connection
            .get_or_init(|| Arc::new(Connection::new(self.transport.clone())))
    }

    pub(crate) fn report_outcome(&self, name: &str, outcome: &SubscriptionOutcome) {
        debug!("Subscription outcome for '{}': {:?}", name, outcome);
        let callback = self
            .outcome_callbacks
            .get(name)
            .map(|cb| cb.value().clone());
        if let Some(callback) = callback {
            invoke_guarded(name, || callback(name, outcome));
        }
    }
}

/// Client for a Pusher-compatible realtime service.
///
/// Every operation returns immediately; connection progress, payloads and
/// subscription acknowledgements arrive later through callbacks driven by
/// the transport.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pusher_binding::{event_callback, Client, ClientOptions, MemoryTransport, RawEvent};
///
/// let transport = Arc::new(MemoryTransport::new());
/// let client = Client::new(
///     ClientOptions::new("app-key").cluster("mt1").encrypted(true),
///     transport.clone(),
/// )?;
///
/// let channel = client.subscribe("order-42");
/// let on_price = event_callback(|event| println!("{:?}", event.data));
/// channel.bind("price-update", &on_price);
///
/// client.connect();
/// transport.deliver_to_channel("order-42", RawEvent::new("price-update"));
///
/// channel.unbind("price-update", &on_price);
/// # Ok::<(), pusher_binding::BindingError>(())
/// ```
pub struct Client {
    options: ClientOptions,
    shared: Arc<ClientShared>,
    /// Client-scope (global) bindings
    registry: EventRegistry,
    channels: DashMap<String, Arc<Channel>>,
    disposed: AtomicBool,
}

impl Client {
    /// Create a client over `transport`, hand it the options and install the
    /// lifecycle adapter on it.
    ///
    /// Only the app key is checked here; endpoint settings are the
    /// transport's to accept or reject.
    pub fn new(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        if options.app_key.is_empty() {
            return Err(BindingError::config("App key is required"));
        }

        transport.configure(&options)?;

        let shared = Arc::new(ClientShared::new(transport.clone()));
        transport.set_delegate(Arc::new(DelegateAdapter::new(Arc::downgrade(&shared))));

        info!(
            "Creating client for app '{}' (cluster: {:?}, host: {:?})",
            options.app_key, options.cluster, options.host
        );

        Ok(Self {
            options,
            shared,
            registry: EventRegistry::new("client", GlobalTarget(transport)),
            channels: DashMap::new(),
            disposed: AtomicBool::new(false),
        })
    }

    /// Get the application key.
    pub fn key(&self) -> &str {
        &self.options.app_key
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn connect(&self) {
        debug!("Connect requested");
        self.shared.transport.connect();
    }

    pub fn disconnect(&self) {
        debug!("Disconnect requested");
        self.shared.transport.disconnect();
    }

    /// Connection facade, created on first access and kept for the client's
    /// lifetime.
    pub fn connection(&self) -> Arc<Connection> {
        self.shared.connection().clone()
    }

    /// Shorthand for `connection().state()`
    pub fn state(&self) -> ConnectionStatus {
        self.shared.connection().state()
    }

    /// Subscribe to a channel.
    ///
    /// Subscribing to a name that is already subscribed returns the existing
    /// channel.
    pub fn subscribe(&self, name: &str) -> Arc<Channel> {
        if let Some(channel) = self.channel(name) {
            return channel;
        }

        // No map guard across this call: the transport may acknowledge
        // synchronously and the outcome callback may come back to the client.
        let native = self.shared.transport.subscribe(name);
        info!("Subscribed to channel: {}", name);
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Channel::new(native)))
            .value()
            .clone()
    }

    /// Subscribe and get told whether the server accepted the subscription.
    pub fn subscribe_with_outcome(&self, name: &str, callback: &SubscriptionCallback) -> Arc<Channel> {
        self.shared
            .outcome_callbacks
            .insert(name.to_string(), callback.clone());
        self.subscribe(name)
    }

    /// Unsubscribe from a channel.
    ///
    /// The channel's bindings are left as they are; events stop because the
    /// transport stops routing them.
    pub fn unsubscribe(&self, name: &str) {
        self.channels.remove(name);
        self.shared.outcome_callbacks.remove(name);
        self.shared.transport.unsubscribe(name);
        info!("Unsubscribed from channel: {}", name);
    }

    pub fn unsubscribe_all(&self) {
        self.channels.clear();
        self.shared.outcome_callbacks.clear();
        self.shared.transport.unsubscribe_all();
        info!("Unsubscribed from all channels");
    }

    /// Find a subscribed channel by name
    pub fn channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|ch| ch.value().clone())
    }

    pub fn channels(&self) -> Vec<Arc<Channel>> {
        self.channels.iter().map(|ch| ch.value().clone()).collect()
    }

    /// Bind a callback to every event the client receives
    pub fn bind(&self, callback: &EventCallback) -> &Self {
        self.registry.bind(callback, None);
        self
    }

    /// Unbind a global callback. Unknown callbacks are ignored.
    pub fn unbind(&self, callback: &EventCallback) -> bool {
        self.registry.unbind(callback, None)
    }

    /// Disconnect and drop every binding this client made. Runs on drop;
    /// later calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shared.transport.disconnect();
        self.registry.clear();
        if let Some(connection) = self.shared.connection.get() {
            connection.unbind_all();
        }
        for channel in self.channels.iter() {
            channel.unbind_all();
        }
        self.shared.outcome_callbacks.clear();
        info!("Client for app '{}' disposed", self.options.app_key);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("key", &self.options.app_key)
            .field("state", &self.state())
            .field("channels", &self.channels.len())
            .finish()
    }
}

/// Pusher-style alias
pub type Pusher = Client;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_callback;
    use crate::transports::{
        MemoryTransport, RawCallback, SubscriptionHandle, TransportChannel, TransportDelegate,
    };
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::sync::Weak;
    use std::time::Duration;

    /// Acknowledges every subscription before `subscribe` returns
    struct EagerAckTransport(MemoryTransport);

    impl Transport for EagerAckTransport {
        fn configure(&self, options: &ClientOptions) -> Result<()> {
            self.0.configure(options)
        }

        fn connect(&self) {
            self.0.connect();
        }

        fn disconnect(&self) {
            self.0.disconnect();
        }

        fn bind(&self, callback: RawCallback) -> SubscriptionHandle {
            self.0.bind(callback)
        }

        fn unbind(&self, handle: &SubscriptionHandle) {
            self.0.unbind(handle);
        }

        fn subscribe(&self, name: &str) -> Arc<dyn TransportChannel> {
            let channel = self.0.subscribe(name);
            self.0.acknowledge_subscription(name);
            channel
        }

        fn unsubscribe(&self, name: &str) {
            self.0.unsubscribe(name);
        }

        fn unsubscribe_all(&self) {
            self.0.unsubscribe_all();
        }

        fn set_delegate(&self, delegate: Arc<dyn TransportDelegate>) {
            self.0.set_delegate(delegate);
        }
    }

    fn create_test_client() -> (Arc<MemoryTransport>, Client) {
        let transport = Arc::new(MemoryTransport::new());
        let client = Client::new(ClientOptions::new("test-key"), transport.clone())
            .expect("Failed to create client");
        (transport, client)
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = Client::new(ClientOptions::default(), Arc::new(MemoryTransport::new()))
            .unwrap_err();
        assert!(matches!(err, BindingError::ConfigurationError { .. }));
    }

    #[test]
    fn test_options_reach_transport() {
        let transport = Arc::new(MemoryTransport::new());
        let options = ClientOptions::new("test-key").cluster("mt1").encrypted(true);
        let _client = Client::new(options.clone(), transport.clone()).unwrap();

        assert_eq!(transport.options(), Some(options));
        let endpoint = transport.endpoint().unwrap();
        assert_eq!(endpoint.scheme(), "wss");
        assert_eq!(endpoint.host_str(), Some("ws-mt1.pusher.com"));
    }

    #[test]
    fn test_transport_configure_error_is_returned() {
        let transport = Arc::new(MemoryTransport::new());
        let err = Client::new(ClientOptions::new("test-key").host("bad host"), transport.clone())
            .unwrap_err();

        assert!(matches!(err, BindingError::TransportError { .. }));
        assert!(!transport.has_delegate());
    }

    #[test]
    fn test_synchronous_ack_can_reenter_client() {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let transport = Arc::new(EagerAckTransport(MemoryTransport::new()));
            let client = Arc::new(Client::new(ClientOptions::new("test-key"), transport).unwrap());
            let slot: Arc<Mutex<Weak<Client>>> = Arc::new(Mutex::new(Weak::new()));
            *slot.lock() = Arc::downgrade(&client);

            let seen = Arc::new(Mutex::new(Vec::new()));
            let on_outcome: SubscriptionCallback = {
                let slot = slot.clone();
                let seen = seen.clone();
                Arc::new(move |name: &str, outcome: &SubscriptionOutcome| {
                    if let Some(client) = slot.lock().upgrade() {
                        client.channel(name);
                        client.channels();
                    }
                    seen.lock().push(outcome.clone());
                })
            };

            let channel = client.subscribe_with_outcome("room", &on_outcome);
            let cached = client.channel("room").unwrap();
            let outcomes = seen.lock().clone();
            let _ = tx.send((Arc::ptr_eq(&channel, &cached), outcomes));
        });

        let (same_channel, outcomes) = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("subscribe blocked on re-entrant outcome callback");
        assert!(same_channel);
        assert_eq!(outcomes, vec![SubscriptionOutcome::Succeeded]);
    }

    #[test]
    fn test_delegate_installed() {
        let (transport, _client) = create_test_client();
        assert!(transport.has_delegate());
    }

    #[test]
    fn test_connection_is_memoized() {
        let (_transport, client) = create_test_client();
        assert!(Arc::ptr_eq(&client.connection(), &client.connection()));
    }

    #[test]
    fn test_subscribe_returns_cached_channel() {
        let (transport, client) = create_test_client();
        let a = client.subscribe("room");
        let b = client.subscribe("room");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(transport.is_subscribed("room"));
        assert_eq!(client.channels().len(), 1);
    }

    #[test]
    fn test_unsubscribe_removes_lookup() {
        let (transport, client) = create_test_client();
        client.subscribe("room");
        client.unsubscribe("room");
        assert!(client.channel("room").is_none());
        assert!(!transport.is_subscribed("room"));
    }

    #[test]
    fn test_bind_chains() {
        let (transport, client) = create_test_client();
        let a = event_callback(|_| {});
        let b = event_callback(|_| {});
        client.bind(&a).bind(&b);
        assert_eq!(transport.global_binding_count(), 2);
        assert!(client.unbind(&a));
        assert!(!client.unbind(&a));
        assert_eq!(transport.global_binding_count(), 1);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (transport, client) = create_test_client();
        client.connect();
        client.bind(&event_callback(|_| {}));

        client.dispose();
        client.dispose();

        assert!(client.is_disposed());
        assert_eq!(transport.global_binding_count(), 0);
        assert_eq!(client.state(), ConnectionStatus::Disconnected);
    }
}
