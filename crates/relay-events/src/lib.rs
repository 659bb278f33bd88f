//! Run event bus for relay transfer workflows.
//!
//! Every stage transition of a run is published as a [`RunEvent`] wrapped in an
//! [`EventEnvelope`] carrying a sequence number and timestamp. Live subscribers
//! receive envelopes over `tokio::broadcast`; a bounded history ring lets late
//! subscribers and tests recover what a run already emitted.

mod bus;
mod event;

pub use bus::{EventBus, EventStream};
pub use event::{EventEnvelope, EventId, RunEvent};
