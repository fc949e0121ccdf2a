//! Domain events runtime bridge for the worker.
//!
//! Receives domain events via DomainEventSink and hands them to a queue
//! worker that publishes snapshot notifications and triggers follow-up
//! captures after ledger postings.

mod queue_worker;
mod sink;

pub use queue_worker::{event_queue_worker, handle_event, QueueWorkerDeps};
pub use sink::WorkerDomainEventSink;
