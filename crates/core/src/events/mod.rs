//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful ledger postings and snapshot captures.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::{DomainEventSink, NoOpDomainEventSink};

#[cfg(test)]
pub(crate) use sink::RecordingEventSink;
