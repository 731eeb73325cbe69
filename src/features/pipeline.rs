//! Feature pipeline: labeled events → per-entity aggregates → feature table.

use super::{EntityAggregate, FeatureTable, FeatureVector};
use crate::config::{FeaturesConfig, LabelConfig};
use crate::error::{ChurnError, Result};
use crate::events::DatasetBounds;
use crate::label::LabeledEvent;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

pub const REGISTRATION_DAYS: &str = "registration_days";
pub const AVG_SESSION_HOURS: &str = "avg_session_hours";
pub const PAID: &str = "paid";
pub const MALE: &str = "male";

const DEFAULT_DEGENERATE_WINDOW_DAYS: f64 = 1.0;

pub struct FeatureBuilder {
    config: FeaturesConfig,
    label_column: String,
    terminal_action: String,
}

impl FeatureBuilder {
    /// A non-positive or non-finite `degenerate_window_days` falls back to one day.
    pub fn new(mut config: FeaturesConfig, label: &LabelConfig) -> Self {
        let days = config.degenerate_window_days;
        if !(days.is_finite() && days > 0.0) {
            tracing::warn!(
                degenerate_window_days = days,
                fallback = DEFAULT_DEGENERATE_WINDOW_DAYS,
                "degenerate window length must be positive"
            );
            config.degenerate_window_days = DEFAULT_DEGENERATE_WINDOW_DAYS;
        }
        Self {
            config,
            label_column: label.column.clone(),
            terminal_action: label.terminal_action.clone(),
        }
    }

    /// Output columns, label first
    pub fn columns(&self) -> Vec<String> {
        let mut cols = vec![
            self.label_column.clone(),
            REGISTRATION_DAYS.to_string(),
            AVG_SESSION_HOURS.to_string(),
        ];
        cols.extend(self.config.counters.iter().map(|c| c.rate_column()));
        if self.config.binary_features {
            cols.push(PAID.to_string());
            cols.push(MALE.to_string());
        }
        cols
    }

    /// Fold events into one aggregate per entity, partition by partition.
    pub fn aggregate(&self, events: &[LabeledEvent]) -> BTreeMap<String, EntityAggregate> {
        let counters = &self.config.counters;
        let terminal = self.terminal_action.as_str();
        let merged = events
            .par_chunks(self.config.partition_size.max(1))
            .map(|chunk| {
                let mut partial: HashMap<String, EntityAggregate> = HashMap::new();
                for le in chunk {
                    match partial.get_mut(&le.event.entity_id) {
                        Some(agg) => agg.observe(le, counters, terminal),
                        None => {
                            let mut agg = EntityAggregate::new(counters.len());
                            agg.observe(le, counters, terminal);
                            partial.insert(le.event.entity_id.clone(), agg);
                        }
                    }
                }
                partial
            })
            .reduce(HashMap::new, |mut acc, other| {
                for (entity, agg) in other {
                    let combined = match acc.remove(&entity) {
                        Some(existing) => existing.merge(agg),
                        None => agg,
                    };
                    acc.insert(entity, combined);
                }
                acc
            });
        merged.into_iter().collect()
    }

    /// One row per entity with a registration timestamp, ordered by entity id.
    pub fn build(&self, events: &[LabeledEvent], bounds: &DatasetBounds) -> Result<FeatureTable> {
        let aggregates = self.aggregate(events);
        let mut rows = Vec::with_capacity(aggregates.len());
        let mut skipped = 0usize;
        let mut degenerate = 0usize;

        for (entity_id, agg) in aggregates {
            let Some(registration_days) = agg.registration_days() else {
                tracing::warn!(entity_id = %entity_id, "entity has no registration timestamp; skipped");
                skipped += 1;
                continue;
            };

            let window = agg.window(bounds);
            let mut obs_days = window.days();
            if obs_days <= 0.0 {
                tracing::debug!(
                    entity_id = %entity_id,
                    start = window.start,
                    end = window.end,
                    "empty observation window; using degenerate window length"
                );
                obs_days = self.config.degenerate_window_days;
                degenerate += 1;
            }

            let mut values = Vec::with_capacity(3 + agg.counts.len() + 2);
            values.push(agg.label.as_f64());
            values.push(registration_days);
            values.push(agg.avg_session_hours());
            values.extend(agg.counts.iter().map(|&c| c as f64 / obs_days));
            if self.config.binary_features {
                values.push(indicator(agg.is_paid()));
                values.push(indicator(agg.is_male()));
            }
            rows.push(FeatureVector { entity_id, values });
        }

        if rows.is_empty() {
            return Err(ChurnError::EmptyDataset);
        }

        tracing::info!(
            entities = rows.len(),
            skipped,
            degenerate_windows = degenerate,
            columns = self.columns().len(),
            "built feature table"
        );
        FeatureTable::from_rows(self.columns(), rows)
    }
}

fn indicator(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}
