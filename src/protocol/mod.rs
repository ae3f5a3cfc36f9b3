//! Pusher protocol types.

pub mod message_types;

pub use message_types::*;
