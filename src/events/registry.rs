//! Event registry: callback identity to transport subscription handle.

use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::callback::{invoke_guarded, CallbackKey, EventCallback};
use crate::protocol::Protocol;
use crate::transports::{RawCallback, SubscriptionHandle, Transport, TransportChannel};

/// The binding primitive a registry drives
pub trait BindingTarget: Send + Sync {
    fn bind(&self, event_name: Option<&str>, callback: RawCallback) -> SubscriptionHandle;

    fn unbind(&self, event_name: Option<&str>, handle: &SubscriptionHandle);
}

/// Global bindings on the transport connection. Event names are ignored:
/// every payload reaches every global binding.
pub(crate) struct GlobalTarget(pub Arc<dyn Transport>);

impl BindingTarget for GlobalTarget {
    fn bind(&self, _event_name: Option<&str>, callback: RawCallback) -> SubscriptionHandle {
        self.0.bind(callback)
    }

    fn unbind(&self, _event_name: Option<&str>, handle: &SubscriptionHandle) {
        self.0.unbind(handle);
    }
}

/// Bindings on one native channel
pub(crate) struct ChannelTarget(pub Arc<dyn TransportChannel>);

impl BindingTarget for ChannelTarget {
    fn bind(&self, event_name: Option<&str>, callback: RawCallback) -> SubscriptionHandle {
        self.0.bind(event_name.unwrap_or_default(), callback)
    }

    fn unbind(&self, event_name: Option<&str>, handle: &SubscriptionHandle) {
        self.0.unbind(event_name.unwrap_or_default(), handle);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    callback: CallbackKey,
    event: Option<String>,
}

struct Binding {
    handle: SubscriptionHandle,
    /// Keeps the callback allocation alive so its address cannot be reused
    /// by another callback while this entry exists.
    _pin: Box<dyn Any + Send + Sync>,
}

/// Maps callbacks to the handles the transport issued for them, within one
/// scope (client, channel or connection).
///
/// Keys are `(callback identity, event name)`. Binding a pair that is
/// already bound is rejected, so a scope never holds two transport
/// subscriptions for the same pair. Unbinding something that is not bound
/// does nothing.
pub struct EventRegistry {
    scope: String,
    target: Box<dyn BindingTarget>,
    bindings: Mutex<HashMap<BindingKey, Binding>>,
}

impl EventRegistry {
    pub fn new(scope: impl Into<String>, target: impl BindingTarget + 'static) -> Self {
        Self {
            scope: scope.into(),
            target: Box::new(target),
            bindings: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Bind `callback` so it receives decoded payloads for `event_name`.
    ///
    /// Returns `false` if the pair was already bound.
    pub fn bind(&self, callback: &EventCallback, event_name: Option<&str>) -> bool {
        let cb = callback.clone();
        let label = event_name.unwrap_or("*").to_string();
        let translate: RawCallback = Arc::new(move |raw| match Protocol::deserialize(raw) {
            Ok(event) => invoke_guarded(&label, || cb(&event)),
            Err(e) => warn!("Dropping undecodable payload for '{}': {}", label, e),
        });
        self.bind_raw(callback, event_name, translate)
    }

    /// Bind with a caller-built translation closure, keyed by `callback`.
    pub fn bind_raw<C>(&self, callback: &Arc<C>, event_name: Option<&str>, raw: RawCallback) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let key = BindingKey {
            callback: CallbackKey::of(callback),
            event: event_name.map(str::to_string),
        };

        // Held across the transport call so check-and-insert is atomic;
        // transports do not invoke callbacks from inside `bind`.
        let mut bindings = self.bindings.lock();
        if bindings.contains_key(&key) {
            debug!(
                "[{}] Callback already bound for {:?}, ignoring",
                self.scope, event_name
            );
            return false;
        }

        let handle = self.target.bind(event_name, raw);
        debug!("[{}] Bound {:?} as {}", self.scope, event_name, handle);
        bindings.insert(
            key,
            Binding {
                handle,
                _pin: Box::new(callback.clone()),
            },
        );
        true
    }

    /// Remove the binding for `callback` on `event_name`, or every binding of
    /// `callback` in this scope when `event_name` is `None`.
    ///
    /// Returns whether anything was removed.
    pub fn unbind<C: ?Sized>(&self, callback: &Arc<C>, event_name: Option<&str>) -> bool {
        let id = CallbackKey::of(callback);
        let removed: Vec<(BindingKey, Binding)> = {
            let mut bindings = self.bindings.lock();
            match event_name {
                Some(name) => {
                    let key = BindingKey {
                        callback: id,
                        event: Some(name.to_string()),
                    };
                    bindings.remove_entry(&key).into_iter().collect()
                }
                None => {
                    let keys: Vec<BindingKey> = bindings
                        .keys()
                        .filter(|k| k.callback == id)
                        .cloned()
                        .collect();
                    keys.into_iter()
                        .filter_map(|k| bindings.remove_entry(&k))
                        .collect()
                }
            }
        };

        if removed.is_empty() {
            trace!("[{}] Unbind of unknown callback ignored", self.scope);
            return false;
        }

        for (key, binding) in &removed {
            self.target.unbind(key.event.as_deref(), &binding.handle);
            debug!("[{}] Unbound {:?} ({})", self.scope, key.event, binding.handle);
        }
        true
    }

    /// Unbind everything in this scope
    pub fn clear(&self) {
        let drained: Vec<(BindingKey, Binding)> = self.bindings.lock().drain().collect();
        for (key, binding) in &drained {
            self.target.unbind(key.event.as_deref(), &binding.handle);
        }
        if !drained.is_empty() {
            debug!("[{}] Cleared {} bindings", self.scope, drained.len());
        }
    }

    pub fn is_bound<C: ?Sized>(&self, callback: &Arc<C>, event_name: Option<&str>) -> bool {
        let key = BindingKey {
            callback: CallbackKey::of(callback),
            event: event_name.map(str::to_string),
        };
        self.bindings.lock().contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("scope", &self.scope)
            .field("bindings", &self.len())
            .finish()
    }
}
