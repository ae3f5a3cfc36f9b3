//! Lifecycle observer installed on the transport.

use std::sync::Weak;
use tracing::{debug, trace};

use crate::channels::SubscriptionOutcome;
use crate::connection::ConnectionStatus;
use crate::pusher::ClientShared;
use crate::transports::{TransportDelegate, TransportState};

/// Translates transport lifecycle notifications for the owning client.
///
/// The transport owns the adapter; the adapter only holds a weak reference
/// back to the client, resolved on every notification. Once the client is
/// gone, notifications are dropped.
pub struct DelegateAdapter {
    owner: Weak<ClientShared>,
}

impl DelegateAdapter {
    pub(crate) fn new(owner: Weak<ClientShared>) -> Self {
        Self { owner }
    }

    fn with_owner(&self, what: &str, f: impl FnOnce(&ClientShared)) {
        match self.owner.upgrade() {
            Some(owner) => f(&owner),
            None => trace!("Client released, dropping {} notification", what),
        }
    }
}

impl TransportDelegate for DelegateAdapter {
    fn connection_state_changed(&self, old: TransportState, new: TransportState) {
        trace!("Transport state {:?} -> {:?}", old, new);
        self.with_owner("state change", |owner| {
            owner.connection().set_state(ConnectionStatus::from(new));
        });
    }

    fn debug_log(&self, message: &str) {
        debug!(target: "pusher_binding::transport", "{}", message);
    }

    fn subscribed(&self, name: &str) {
        self.with_owner("subscription", |owner| {
            owner.report_outcome(name, &SubscriptionOutcome::Succeeded);
        });
    }

    fn subscription_failed(
        &self,
        name: &str,
        status: Option<u16>,
        data: Option<&str>,
        error: Option<&str>,
    ) {
        self.with_owner("subscription failure", |owner| {
            let outcome = SubscriptionOutcome::Failed {
                status,
                data: data.map(str::to_string),
                error: error.map(str::to_string),
            };
            owner.report_outcome(name, &outcome);
        });
    }
}
