//! Redundant feature removal by correlation grouping.

mod correlation;
mod engine;

pub use correlation::correlation_matrix;
pub use engine::{RedundancyReducer, RedundantGroup, Reduction, ReductionPlan};
