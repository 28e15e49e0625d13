//! Message bus — event types and the async queue connecting channels to the
//! agent loop.

pub mod queue;
pub mod types;

pub use queue::MessageBus;
pub use types::{InboundMessage, OutboundMessage};
