//! Raw activity events: JSON-lines loading, cleaning and dataset-wide bounds.

mod bounds;
mod clean;

pub use bounds::DatasetBounds;
pub use clean::{clean, CleanReport};

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One row of the activity log. Keys follow the log's camelCase field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Empty for logged-out traffic
    #[serde(rename = "userId", default)]
    pub entity_id: String,
    /// Epoch milliseconds
    pub ts: i64,
    #[serde(default)]
    pub page: String,
    /// Epoch milliseconds; null for guests
    #[serde(default)]
    pub registration: Option<i64>,
    #[serde(rename = "sessionId")]
    pub session_id: i64,
    /// "free" / "paid"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Event {
    pub fn new(
        entity_id: impl Into<String>,
        ts: i64,
        page: impl Into<String>,
        registration: Option<i64>,
        session_id: i64,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            ts,
            page: page.into(),
            registration,
            session_id,
            level: None,
            gender: None,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }
}

/// Reader for the JSON-lines event log (one object per line).
pub struct EventLog;

impl EventLog {
    pub fn load(path: &Path) -> Result<Vec<Event>> {
        let file = File::open(path).map_err(|source| ChurnError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let events = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), count = events.len(), "loaded event log");
        Ok(events)
    }

    /// Blank lines are skipped; a malformed line fails the whole load.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event = serde_json::from_str::<Event>(trimmed).map_err(|source| ChurnError::Parse {
                line: idx + 1,
                source,
            })?;
            events.push(event);
        }
        Ok(events)
    }
}
