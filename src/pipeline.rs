//! End-to-end run: clean → bounds → label → features → prune.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::events::{clean, CleanReport, DatasetBounds, Event};
use crate::features::{FeatureBuilder, FeatureTable};
use crate::label::{EntityLabels, Labeler};
use crate::reduce::{RedundancyReducer, Reduction};
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Result of one run, ready for the store or an external trainer
pub struct PipelineOutput {
    pub clean: CleanReport,
    pub bounds: DatasetBounds,
    pub labels: EntityLabels,
    /// Table before pruning
    pub features: FeatureTable,
    pub reduction: Reduction,
}

/// One-line run summary for logs and stdout
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub events: usize,
    pub entities: usize,
    pub churned: usize,
    pub features_built: usize,
    pub features_kept: usize,
    pub dropped: &'a [String],
    pub degenerate: &'a [String],
    pub label_degenerate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<&'a str>,
}

impl PipelineOutput {
    pub fn report<'a>(&'a self, run_id: Option<&'a str>) -> RunReport<'a> {
        RunReport {
            events: self.clean.kept,
            entities: self.features.n_rows(),
            churned: self.labels.churned(),
            features_built: self.features.n_cols(),
            features_kept: self.reduction.table.n_cols(),
            dropped: &self.reduction.plan.dropped,
            degenerate: &self.reduction.plan.degenerate,
            label_degenerate: self.reduction.plan.label_degenerate,
            run_id,
        }
    }
}

pub struct ChurnPipeline {
    config: PipelineConfig,
}

impl ChurnPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, events: Vec<Event>) -> Result<PipelineOutput> {
        let started = Instant::now();
        let (events, clean) = clean(events);

        // global scalars must be known before any window is computed
        let bounds = DatasetBounds::compute(&events)?;

        let labeler = Labeler::new(&self.config.label, self.config.features.partition_size);
        let (labels, labeled) = labeler.label(events);

        let builder = FeatureBuilder::new(self.config.features.clone(), &self.config.label);
        let features = builder.build(&labeled, &bounds)?;

        let reducer = RedundancyReducer::new(&self.config.reduce);
        let reduction = reducer.reduce(&features, &self.config.label.column)?;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            entities = features.n_rows(),
            kept = reduction.table.n_cols(),
            "pipeline complete"
        );
        Ok(PipelineOutput {
            clean,
            bounds,
            labels,
            features,
            reduction,
        })
    }
}
