//! Channel types and subscription outcomes.

mod channel;
mod outcome;

pub use channel::{Channel, ChannelType};
pub use outcome::{SubscriptionCallback, SubscriptionOutcome};
