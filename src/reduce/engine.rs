//! Multicollinearity pruning: link features whose absolute correlation exceeds
//! the threshold, take connected components, and keep one feature per
//! component (the one most correlated with the label).

use super::correlation::correlation_matrix;
use crate::config::ReduceConfig;
use crate::error::{ChurnError, Result};
use crate::features::FeatureTable;
use ndarray::Array2;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connected component of two or more correlated features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedundantGroup {
    /// In table column order
    pub members: Vec<String>,
    pub kept: String,
    /// |corr(kept, label)|, NaN read as 0
    pub label_correlation: f64,
}

/// What to drop, decided from a correlation matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReductionPlan {
    pub groups: Vec<RedundantGroup>,
    pub dropped: Vec<String>,
    /// Zero-variance features; their correlations are undefined
    pub degenerate: Vec<String>,
    /// Constant label column; every group then falls back to the name tie-break
    #[serde(default)]
    pub label_degenerate: bool,
}

#[derive(Debug, Clone)]
pub struct Reduction {
    pub table: FeatureTable,
    pub plan: ReductionPlan,
}

pub struct RedundancyReducer {
    threshold: f64,
}

impl RedundancyReducer {
    pub fn new(config: &ReduceConfig) -> Self {
        Self::with_threshold(config.threshold)
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reduce(&self, table: &FeatureTable, label_column: &str) -> Result<Reduction> {
        let label_idx = table
            .column_index(label_column)
            .ok_or_else(|| ChurnError::UnknownColumn(label_column.to_string()))?;
        let corr = correlation_matrix(table.values());
        let plan = self.plan(table.columns(), &corr, label_idx)?;

        if plan.label_degenerate {
            tracing::warn!(
                label = %label_column,
                "label has zero variance; redundant groups keep the lexicographically smallest feature"
            );
        }
        for name in &plan.degenerate {
            tracing::warn!(feature = %name, "degenerate feature: zero variance, correlation undefined");
        }
        for group in &plan.groups {
            tracing::debug!(
                members = ?group.members,
                kept = %group.kept,
                label_correlation = group.label_correlation,
                "redundant feature group"
            );
        }
        tracing::info!(
            threshold = self.threshold,
            groups = plan.groups.len(),
            dropped = plan.dropped.len(),
            remaining = table.n_cols() - plan.dropped.len(),
            "pruned correlated features"
        );

        Ok(Reduction {
            table: table.drop_columns(&plan.dropped),
            plan,
        })
    }

    /// Decide the drops from a precomputed `columns.len()` square matrix.
    pub fn plan(&self, columns: &[String], corr: &Array2<f64>, label_idx: usize) -> Result<ReductionPlan> {
        let k = columns.len();
        if corr.dim() != (k, k) {
            return Err(ChurnError::Shape(format!(
                "correlation matrix is {:?}, expected {}x{}",
                corr.dim(),
                k,
                k
            )));
        }
        if label_idx >= k {
            return Err(ChurnError::Shape(format!("label index {} out of range", label_idx)));
        }

        let features: Vec<usize> = (0..k).filter(|&i| i != label_idx).collect();
        let degenerate = features
            .iter()
            .filter(|&&i| corr[[i, i]].is_nan())
            .map(|&i| columns[i].clone())
            .collect();

        let mut components = UnionFind::<usize>::new(k);
        for (a, &i) in features.iter().enumerate() {
            for &j in &features[a + 1..] {
                // NaN never exceeds the threshold
                if corr[[i, j]].abs() > self.threshold {
                    components.union(i, j);
                }
            }
        }

        let mut by_root: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &i in &features {
            by_root.entry(components.find(i)).or_default().push(i);
        }

        let mut groups = Vec::new();
        let mut dropped = Vec::new();
        for members in by_root.into_values().filter(|m| m.len() >= 2) {
            let score = |i: usize| {
                let c = corr[[i, label_idx]].abs();
                if c.is_nan() {
                    0.0
                } else {
                    c
                }
            };
            let mut best = members[0];
            for &m in &members[1..] {
                let (s, b) = (score(m), score(best));
                if s > b || (s == b && columns[m] < columns[best]) {
                    best = m;
                }
            }
            dropped.extend(
                members
                    .iter()
                    .filter(|&&m| m != best)
                    .map(|&m| columns[m].clone()),
            );
            groups.push(RedundantGroup {
                members: members.iter().map(|&m| columns[m].clone()).collect(),
                kept: columns[best].clone(),
                label_correlation: score(best),
            });
        }

        Ok(ReductionPlan {
            groups,
            dropped,
            degenerate,
            label_degenerate: corr[[label_idx, label_idx]].is_nan(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn transitive_group_keeps_feature_closest_to_label() {
        // columns: label, A, B, C
        let corr = array![
            [1.0, 0.30, 0.60, 0.20],
            [0.30, 1.0, 0.90, 0.05],
            [0.60, 0.90, 1.0, 0.90],
            [0.20, 0.05, 0.90, 1.0],
        ];
        let plan = RedundancyReducer::with_threshold(0.85)
            .plan(&names(&["label", "A", "B", "C"]), &corr, 0)
            .unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].members, names(&["A", "B", "C"]));
        assert_eq!(plan.groups[0].kept, "B");
        assert_eq!(plan.dropped, names(&["A", "C"]));
    }

    #[test]
    fn label_is_never_dropped_even_when_correlated() {
        let corr = array![[1.0, 0.99, 0.2], [0.99, 1.0, 0.1], [0.2, 0.1, 1.0]];
        let plan = RedundancyReducer::with_threshold(0.85)
            .plan(&names(&["label", "x", "y"]), &corr, 0)
            .unwrap();
        assert!(plan.groups.is_empty());
        assert!(plan.dropped.is_empty());
    }

    #[test]
    fn equal_label_correlation_keeps_smallest_name() {
        let corr = array![[1.0, 0.5, -0.5], [0.5, 1.0, 0.95], [-0.5, 0.95, 1.0]];
        let plan = RedundancyReducer::with_threshold(0.85)
            .plan(&names(&["label", "zeta", "alpha"]), &corr, 0)
            .unwrap();
        assert_eq!(plan.groups[0].kept, "alpha");
        assert_eq!(plan.dropped, names(&["zeta"]));
    }

    #[test]
    fn negative_correlation_links_features() {
        let corr = array![[1.0, 0.1, 0.4], [0.1, 1.0, -0.9], [0.4, -0.9, 1.0]];
        let plan = RedundancyReducer::with_threshold(0.85)
            .plan(&names(&["label", "a", "b"]), &corr, 0)
            .unwrap();
        assert_eq!(plan.dropped, names(&["a"]));
    }

    #[test]
    fn degenerate_features_are_reported_not_linked() {
        let m = array![[1.0, 1.0, 5.0], [0.0, 2.0, 5.0], [1.0, 3.0, 5.0], [0.0, 4.0, 5.0]];
        let table = FeatureTable::new(
            names(&["label", "x", "flat"]),
            names(&["u1", "u2", "u3", "u4"]),
            m,
        )
        .unwrap();
        let out = RedundancyReducer::with_threshold(0.85)
            .reduce(&table, "label")
            .unwrap();
        assert_eq!(out.plan.degenerate, names(&["flat"]));
        assert_eq!(out.table.columns(), table.columns());
    }

    #[test]
    fn constant_label_falls_back_to_name_order() {
        // every entity retained; a and z move together
        let m = array![[0.0, 1.0, 1.1], [0.0, 2.0, 2.0], [0.0, 3.0, 3.2], [0.0, 4.0, 3.9]];
        let table = FeatureTable::new(
            names(&["label", "z", "a"]),
            names(&["u1", "u2", "u3", "u4"]),
            m,
        )
        .unwrap();
        let out = RedundancyReducer::with_threshold(0.85)
            .reduce(&table, "label")
            .unwrap();
        assert!(out.plan.label_degenerate);
        assert!(out.plan.degenerate.is_empty());
        assert_eq!(out.plan.groups.len(), 1);
        assert_eq!(out.plan.groups[0].kept, "a");
        assert_eq!(out.plan.groups[0].label_correlation, 0.0);
        assert_eq!(out.plan.dropped, names(&["z"]));
        assert_eq!(out.table.columns(), names(&["label", "a"]).as_slice());
    }

    #[test]
    fn single_row_marks_everything_degenerate() {
        let table = FeatureTable::new(
            names(&["label", "x", "y"]),
            names(&["u1"]),
            array![[1.0, 2.0, 3.0]],
        )
        .unwrap();
        let out = RedundancyReducer::with_threshold(0.85)
            .reduce(&table, "label")
            .unwrap();
        assert!(out.plan.label_degenerate);
        assert_eq!(out.plan.degenerate, names(&["x", "y"]));
        assert!(out.plan.groups.is_empty());
        assert!(out.plan.dropped.is_empty());
        assert_eq!(out.table, table);
    }

    #[test]
    fn unknown_label_column_is_an_error() {
        let table = FeatureTable::new(names(&["x"]), names(&["u1"]), array![[1.0]]).unwrap();
        assert!(matches!(
            RedundancyReducer::with_threshold(0.85).reduce(&table, "label"),
            Err(ChurnError::UnknownColumn(_))
        ));
    }

    #[test]
    fn reducing_twice_removes_nothing_more() {
        // a and b track each other, c is independent
        let m = array![
            [1.0, 1.0, 1.1, 3.0],
            [0.0, 2.0, 2.1, 1.0],
            [1.0, 3.0, 2.9, 4.0],
            [0.0, 4.0, 4.2, 1.0],
            [1.0, 5.0, 5.0, 5.0],
            [0.0, 6.0, 6.1, 9.0],
        ];
        let table = FeatureTable::new(
            names(&["label", "a", "b", "c"]),
            names(&["u1", "u2", "u3", "u4", "u5", "u6"]),
            m,
        )
        .unwrap();
        let reducer = RedundancyReducer::with_threshold(0.85);
        let once = reducer.reduce(&table, "label").unwrap();
        assert_eq!(once.plan.dropped.len(), 1);
        let twice = reducer.reduce(&once.table, "label").unwrap();
        assert!(twice.plan.dropped.is_empty());
        assert_eq!(twice.table, once.table);
    }
}
