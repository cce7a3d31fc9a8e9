//! Turns the ordered event log into time spent per label.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    storage::{entities::Event, event_log::EventLog},
    utils::clock::Clock,
};

/// Whole seconds spent per label. Ordered so that serialized output is stable.
pub type DurationMap = BTreeMap<String, u64>;

/// Attributes every interval to the label of the event that opened it. The last event is still
/// running and is measured until `now`.
pub fn compute_durations(events: &[Event], now: DateTime<Utc>) -> DurationMap {
    let mut totals = BTreeMap::<Arc<str>, Duration>::new();

    let closing_stamps = events.iter().skip(1).map(|v| v.stamp).chain([now]);
    for (event, end) in events.iter().zip(closing_stamps) {
        *totals.entry(event.id.clone()).or_insert_with(Duration::zero) += end - event.stamp;
    }

    totals
        .into_iter()
        // Truncated, and a clock that went backwards never yields negative time.
        .map(|(label, duration)| {
            (
                label.to_string(),
                u64::try_from(duration.num_seconds()).unwrap_or(0),
            )
        })
        .collect()
}

/// Computes sums over the live log and keeps the most recent result.
pub struct SumsCalculator {
    log: Arc<EventLog>,
    clock: Box<dyn Clock>,
    latest: Mutex<DurationMap>,
}

impl SumsCalculator {
    pub fn new(log: Arc<EventLog>, clock: Box<dyn Clock>) -> Self {
        Self {
            log,
            clock,
            latest: Mutex::new(DurationMap::new()),
        }
    }

    /// Recomputes everything from the current snapshot.
    pub async fn calculate(&self) -> DurationMap {
        let mut latest = self.latest.lock().await;
        let events = self.log.snapshot().await;
        let sums = compute_durations(&events, self.clock.time());
        debug!("Calculated sums over {} events: {sums:?}", events.len());
        *latest = sums.clone();
        sums
    }

    /// Result of the last [SumsCalculator::calculate] call, without recomputing. Empty until the
    /// first calculation.
    pub async fn latest(&self) -> DurationMap {
        self.latest.lock().await.clone()
    }
}
