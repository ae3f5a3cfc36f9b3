//! Callback identity and the per-scope event registry.

mod callback;
mod registry;

pub use callback::{event_callback, CallbackKey, EventCallback};
pub(crate) use callback::invoke_guarded;
pub(crate) use registry::{ChannelTarget, GlobalTarget};
pub use registry::{BindingTarget, EventRegistry};
pub use crate::protocol::PusherEvent;
