//! Dataset-wide timestamp bounds, reduced once before window computation.

use super::Event;
use crate::error::{ChurnError, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub min_ts: i64,
    pub max_ts: i64,
}

impl DatasetBounds {
    pub fn compute(events: &[Event]) -> Result<Self> {
        if events.is_empty() {
            return Err(ChurnError::EmptyDataset);
        }
        let (min_ts, max_ts) = events
            .par_iter()
            .map(|e| (e.ts, e.ts))
            .reduce(
                || (i64::MAX, i64::MIN),
                |a, b| (a.0.min(b.0), a.1.max(b.1)),
            );
        let bounds = Self { min_ts, max_ts };
        tracing::debug!(
            start = %bounds.start().map(|d| d.to_rfc3339()).unwrap_or_default(),
            end = %bounds.end().map(|d| d.to_rfc3339()).unwrap_or_default(),
            "dataset bounds"
        );
        Ok(bounds)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.min_ts)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.max_ts)
    }
}
