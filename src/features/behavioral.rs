//! Per-entity behavioral statistics, folded from that entity's labeled events.
//!
//! Every field is reduced with min/max/sum so two partial aggregates of the
//! same entity can be merged in any order.

use crate::config::ActionCounter;
use crate::events::DatasetBounds;
use crate::label::{Label, LabeledEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MS_PER_DAY: f64 = 86_400_000.0;
pub const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAggregate {
    pub label: Label,
    pub registration: Option<i64>,
    /// Timestamp of the entity's final event
    pub last_ts: i64,
    /// Final event is the terminal action
    pub last_is_terminal: bool,
    /// session id -> (first ts, last ts)
    pub sessions: HashMap<i64, (i64, i64)>,
    /// One slot per configured counter
    pub counts: Vec<u64>,
    /// Most recent subscription level with its timestamp
    pub level: Option<(i64, String)>,
    pub gender: Option<String>,
}

/// Span over which an entity's daily rates are normalised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub start: i64,
    pub end: i64,
}

impl ObservationWindow {
    /// Length in days; may be zero or negative for degenerate histories.
    pub fn days(&self) -> f64 {
        (self.end - self.start) as f64 / MS_PER_DAY
    }
}

impl EntityAggregate {
    pub fn new(n_counters: usize) -> Self {
        Self {
            label: Label::Retained,
            registration: None,
            last_ts: i64::MIN,
            last_is_terminal: false,
            sessions: HashMap::new(),
            counts: vec![0; n_counters],
            level: None,
            gender: None,
        }
    }

    pub fn observe(&mut self, le: &LabeledEvent, counters: &[ActionCounter], terminal_action: &str) {
        let e = &le.event;
        self.label = self.label.max(le.label);
        self.registration = min_opt(self.registration, e.registration);

        let terminal = e.page == terminal_action;
        if e.ts > self.last_ts {
            self.last_ts = e.ts;
            self.last_is_terminal = terminal;
        } else if e.ts == self.last_ts {
            self.last_is_terminal |= terminal;
        }

        self.sessions
            .entry(e.session_id)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(e.ts);
                *hi = (*hi).max(e.ts);
            })
            .or_insert((e.ts, e.ts));

        for (slot, counter) in self.counts.iter_mut().zip(counters) {
            if counter.matches(&e.page) {
                *slot += 1;
            }
        }

        if let Some(level) = &e.level {
            self.level = latest_level(self.level.take(), Some((e.ts, level.clone())));
        }
        if let Some(gender) = &e.gender {
            self.gender = min_opt(self.gender.take(), Some(gender.clone()));
        }
    }

    pub fn merge(mut self, other: EntityAggregate) -> EntityAggregate {
        self.label = self.label.max(other.label);
        self.registration = min_opt(self.registration, other.registration);

        if other.last_ts > self.last_ts {
            self.last_ts = other.last_ts;
            self.last_is_terminal = other.last_is_terminal;
        } else if other.last_ts == self.last_ts {
            self.last_is_terminal |= other.last_is_terminal;
        }

        for (session, (lo, hi)) in other.sessions {
            self.sessions
                .entry(session)
                .and_modify(|(a, b)| {
                    *a = (*a).min(lo);
                    *b = (*b).max(hi);
                })
                .or_insert((lo, hi));
        }

        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }

        self.level = latest_level(self.level, other.level);
        self.gender = min_opt(self.gender, other.gender);
        self
    }

    /// (last event − registration) in days
    pub fn registration_days(&self) -> Option<f64> {
        self.registration
            .map(|reg| (self.last_ts - reg) as f64 / MS_PER_DAY)
    }

    /// Mean session length in hours
    pub fn avg_session_hours(&self) -> f64 {
        if self.sessions.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .sessions
            .values()
            .map(|(lo, hi)| (hi - lo) as f64 / MS_PER_HOUR)
            .sum();
        total / self.sessions.len() as f64
    }

    /// Start at registration unless it predates the dataset; end at the last
    /// event only when that event is the cancellation, otherwise the entity is
    /// censored at the dataset end.
    pub fn window(&self, bounds: &DatasetBounds) -> ObservationWindow {
        let start = match self.registration {
            Some(reg) if reg > bounds.min_ts => reg,
            _ => bounds.min_ts,
        };
        let end = if self.last_is_terminal {
            self.last_ts
        } else {
            bounds.max_ts
        };
        ObservationWindow { start, end }
    }

    pub fn is_paid(&self) -> bool {
        matches!(&self.level, Some((_, level)) if level == "paid")
    }

    pub fn is_male(&self) -> bool {
        self.gender.as_deref() == Some("M")
    }
}

fn min_opt<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Later timestamp wins; equal timestamps fall back to the larger value.
fn latest_level(a: Option<(i64, String)>, b: Option<(i64, String)>) -> Option<(i64, String)> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
