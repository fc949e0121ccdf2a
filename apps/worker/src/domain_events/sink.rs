use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tradeledger_core::events::{DomainEvent, DomainEventSink};

/// Forwards domain events to the queue worker without blocking the emitter.
///
/// Events emitted while no worker is attached (before [`attach`](Self::attach)
/// or after [`detach`](Self::detach)) are buffered.
pub struct WorkerDomainEventSink {
    state: Mutex<SinkState>,
}

enum SinkState {
    Buffering(Vec<DomainEvent>),
    Attached(mpsc::UnboundedSender<DomainEvent>),
}

impl WorkerDomainEventSink {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SinkState::Buffering(Vec::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SinkState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Connects the sink to a running worker and flushes buffered events.
    pub fn attach(&self, tx: mpsc::UnboundedSender<DomainEvent>) {
        let mut state = self.state();
        if let SinkState::Buffering(buffered) = &mut *state {
            for event in buffered.drain(..) {
                let _ = tx.send(event);
            }
        }
        *state = SinkState::Attached(tx);
    }

    /// Drops the sender so the worker stops once its queue is empty.
    /// Later events are buffered again.
    pub fn detach(&self) {
        let mut state = self.state();
        if matches!(&*state, SinkState::Attached(_)) {
            *state = SinkState::Buffering(Vec::new());
        }
    }

    /// Takes the events buffered while detached.
    pub fn take_buffered(&self) -> Vec<DomainEvent> {
        match &mut *self.state() {
            SinkState::Buffering(buffered) => std::mem::take(buffered),
            SinkState::Attached(_) => Vec::new(),
        }
    }
}

impl Default for WorkerDomainEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainEventSink for WorkerDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        match &mut *self.state() {
            SinkState::Buffering(buffered) => buffered.push(event),
            SinkState::Attached(tx) => {
                if tx.send(event).is_err() {
                    tracing::debug!("Domain event queue worker has stopped; event dropped");
                }
            }
        }
    }
}
