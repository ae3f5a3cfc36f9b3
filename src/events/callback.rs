//! Callback types and identity.

use std::sync::Arc;
use tracing::warn;

use crate::protocol::PusherEvent;

/// Callback receiving decoded events.
///
/// Registrations are keyed by the `Arc` allocation, so keep the `Arc` around
/// to unbind later. Clones of it refer to the same registration.
pub type EventCallback = Arc<dyn Fn(&PusherEvent) + Send + Sync + 'static>;

/// Identity of a callback, taken from its `Arc` data pointer.
///
/// Two closures with identical bodies are still two keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackKey(usize);

impl CallbackKey {
    pub fn of<C: ?Sized>(callback: &Arc<C>) -> Self {
        Self(Arc::as_ptr(callback) as *const () as usize)
    }
}

/// Wrap a plain closure as an [`EventCallback`]
pub fn event_callback(f: impl Fn(&PusherEvent) + Send + Sync + 'static) -> EventCallback {
    Arc::new(f)
}

/// Run a user callback, containing any panic so the transport's dispatch
/// loop keeps running.
pub(crate) fn invoke_guarded(label: &str, f: impl FnOnce()) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        warn!("Callback for '{}' panicked: {:?}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_per_allocation() {
        let a = event_callback(|_| {});
        let b = event_callback(|_| {});
        let a2 = a.clone();

        assert_ne!(CallbackKey::of(&a), CallbackKey::of(&b));
        assert_eq!(CallbackKey::of(&a), CallbackKey::of(&a2));
    }

    #[test]
    fn test_invoke_guarded_contains_panic() {
        let mut ran_after = false;
        invoke_guarded("boom", || panic!("boom"));
        invoke_guarded("ok", || ran_after = true);
        assert!(ran_after);
    }
}
