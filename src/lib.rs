//! Churn feature pipeline: label users from an activity log, derive per-user
//! behavioral features, and prune multicollinear ones before training.
//!
//! Modular structure:
//! - [`events`] — JSON-lines event loading, cleaning, dataset bounds
//! - [`label`] — Whole-history churn labelling
//! - [`features`] — Per-entity aggregation into a feature table
//! - [`reduce`] — Correlation-graph redundancy pruning
//! - [`storage`] — SQLite feature store
//! - [`pipeline`] — End-to-end orchestration
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod label;
pub mod logging;
pub mod pipeline;
pub mod reduce;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{ChurnError, Result};
pub use events::{Event, EventLog};
pub use features::{FeatureBuilder, FeatureTable, FeatureVector};
pub use label::{Label, Labeler};
pub use logging::StructuredLogger;
pub use pipeline::ChurnPipeline;
pub use reduce::RedundancyReducer;
pub use storage::FeatureStore;
