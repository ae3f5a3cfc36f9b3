//! Connection facade and status.

mod facade;
mod state;

pub use facade::{Connection, ConnectionCallback, ConnectionPayload, StateChangeCallback};
pub use state::ConnectionStatus;
