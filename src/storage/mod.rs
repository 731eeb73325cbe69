//! Local SQLite store for feature tables produced by pipeline runs.

mod sqlite;

pub use sqlite::{FeatureStore, RunSummary};
