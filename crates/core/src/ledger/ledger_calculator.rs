//! Pure ledger arithmetic: planning a posting and replaying an event log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::ledger_model::{
    AccountProjection, LedgerBalances, LedgerEvent, LedgerVerification, PlannedPosting,
    PostingAttributes,
};
use crate::constants::{DEFAULT_EVENT_STATUS, LEDGER_EPSILON};
use crate::errors::{LedgerError, Result};
use crate::utils::time_utils::resolve_occurred_at;

/// Computes the next projection and the event recording it.
///
/// `next_sequence` is the position the event will take in the account's
/// ledger. Fails without side effects when the posting is malformed or would
/// overdraw cash.
pub fn plan_posting(
    current: &AccountProjection,
    next_sequence: i64,
    event_type: &str,
    attributes: &PostingAttributes,
    now: DateTime<Utc>,
) -> Result<PlannedPosting> {
    let event_type = event_type.trim();
    if event_type.is_empty() {
        return Err(LedgerError::InvalidAttributes("event type cannot be empty".to_string()).into());
    }

    let occurred_at = resolve_occurred_at(attributes.occurred_at.as_deref(), now);
    let deltas = attributes.deltas();
    let next = current
        .balances
        .checked_apply(&deltas)
        .filter(|next| next.checked_investing_total().is_some())
        .ok_or_else(|| {
            LedgerError::InvalidAttributes(format!(
                "posting to account {} would overflow its balances",
                current.account_id
            ))
        })?;

    if !attributes.allow_overdraft && deltas.cash < Decimal::ZERO && next.cash < -LEDGER_EPSILON {
        return Err(LedgerError::InsufficientFunds {
            account_id: current.account_id.clone(),
            available: current.balances.cash,
            requested: -deltas.cash,
        }
        .into());
    }

    let projection = current.with_balances(next, occurred_at, now);
    let status = attributes
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_EVENT_STATUS)
        .to_string();

    let event = LedgerEvent {
        id: uuid::Uuid::now_v7().to_string(),
        account_id: current.account_id.clone(),
        projection_id: current.id.clone(),
        sequence: next_sequence,
        event_type: event_type.to_string(),
        source_type: attributes.source_type.clone(),
        source_id: attributes.source_id.clone(),
        status,
        occurred_at,
        deltas,
        resulting: next,
        metadata: attributes.metadata.clone(),
        admin_id: attributes.admin_id.clone(),
        created_at: now,
    };

    Ok(PlannedPosting { projection, event })
}

/// Applies every event's deltas to `seed`, in the order given.
pub fn replay_balances(seed: &LedgerBalances, events: &[LedgerEvent]) -> LedgerBalances {
    events
        .iter()
        .fold(*seed, |balances, event| balances.apply(&event.deltas))
}

/// Replays `events` (ordered by sequence) and compares the outcome with the
/// stored projection.
///
/// The seed is the pre-state of the first event, so the check covers every
/// posting made since the projection was created.
pub fn verify_ledger(
    account_id: &str,
    projection: &AccountProjection,
    events: &[LedgerEvent],
) -> LedgerVerification {
    let seed = events
        .first()
        .map(LedgerEvent::previous_balances)
        .unwrap_or(projection.balances);

    let mut broken_links = Vec::new();
    let mut running = seed;
    for event in events {
        running = running.apply(&event.deltas);
        if !running.drift_from(&event.resulting).is_empty() {
            broken_links.push(event.sequence);
            running = event.resulting;
        }
    }

    let replayed = replay_balances(&seed, events);
    LedgerVerification {
        account_id: account_id.to_string(),
        event_count: events.len(),
        replayed,
        projected: projection.balances,
        drift: replayed.drift_from(&projection.balances),
        broken_links,
        derived_fields_consistent: projection.derived_fields_consistent(),
    }
}
