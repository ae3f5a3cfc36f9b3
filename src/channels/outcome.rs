//! Subscription outcome notifications.

use std::sync::Arc;

/// Result of a subscription request, as acknowledged by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    Succeeded,
    Failed {
        /// HTTP status of the authorization response, if there was one
        status: Option<u16>,
        data: Option<String>,
        error: Option<String>,
    },
}

impl SubscriptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Callback receiving `(channel name, outcome)`
pub type SubscriptionCallback = Arc<dyn Fn(&str, &SubscriptionOutcome) + Send + Sync + 'static>;
