//! Where core services send their domain events.

use super::DomainEvent;

/// Receives events after a posting or capture has been committed.
///
/// `emit` is called on the hot path of the service that produced the event:
/// it must not block, and a lost event never fails the operation.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Drops every event. Default sink of the services.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

#[cfg(test)]
pub(crate) use recording::RecordingEventSink;


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_recording_sink_splits_events_by_kind() {
        let sink = RecordingEventSink::default();
        assert!(sink.is_empty());

        let bucket = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        sink.emit(DomainEvent::ledger_posted(
            "acc-1".to_string(),
            "evt-1".to_string(),
            "trade_buy".to_string(),
        ));
        sink.emit(DomainEvent::snapshot_updated(
            "acc-1".to_string(),
            dec!(1000),
            dec!(400),
            bucket,
        ));

        assert_eq!(
            sink.postings(),
            vec![("acc-1".to_string(), "trade_buy".to_string())]
        );
        assert_eq!(
            sink.snapshot_values(),
            vec![("acc-1".to_string(), dec!(1000), 1_704_067_260_000)]
        );
        assert_eq!(sink.snapshot_updates().len(), 1);

        NoOpDomainEventSink.emit(DomainEvent::ledger_posted(
            "acc-1".to_string(),
            "evt-2".to_string(),
            "fee".to_string(),
        ));
    }
}
