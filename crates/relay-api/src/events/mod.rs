//! Storage event routing
//!
//! Matches newly created objects against the path convention and
//! announces the matching ones on the message bus.

mod handler;
mod publisher;

pub use handler::{EventRouter, RouteOutcome};
pub use publisher::{PubSubPublisher, Publisher};
