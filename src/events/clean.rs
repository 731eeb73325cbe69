//! Data-quality filter applied before labelling.

use super::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    pub kept: usize,
    /// Logged-out traffic
    pub empty_entity: usize,
    pub missing_registration: usize,
}

/// Drops events without an entity id or registration timestamp.
pub fn clean(events: Vec<Event>) -> (Vec<Event>, CleanReport) {
    let mut report = CleanReport::default();
    let kept: Vec<Event> = events
        .into_iter()
        .filter(|e| {
            if e.entity_id.trim().is_empty() {
                report.empty_entity += 1;
                false
            } else if e.registration.is_none() {
                report.missing_registration += 1;
                false
            } else {
                true
            }
        })
        .collect();
    report.kept = kept.len();

    tracing::info!(
        kept = report.kept,
        empty_entity = report.empty_entity,
        missing_registration = report.missing_registration,
        "cleaned events"
    );
    (kept, report)
}
