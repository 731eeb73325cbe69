//! Per-entity behavioral feature extraction and the feature table it produces.

mod behavioral;
mod pipeline;

pub use behavioral::{EntityAggregate, ObservationWindow, MS_PER_DAY, MS_PER_HOUR};
pub use pipeline::{FeatureBuilder, AVG_SESSION_HOURS, MALE, PAID, REGISTRATION_DAYS};

use crate::error::{ChurnError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of the feature table, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub entity_id: String,
    pub values: Vec<f64>,
}

/// Column-named numeric matrix, one row per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    entity_ids: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>, entity_ids: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ChurnError::Shape("feature table needs at least one column".into()));
        }
        {
            let mut seen = HashSet::new();
            if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(ChurnError::Shape(format!("duplicate column '{}'", dup)));
            }
        }
        if values.dim() != (entity_ids.len(), columns.len()) {
            return Err(ChurnError::Shape(format!(
                "expected {}x{} values, got {:?}",
                entity_ids.len(),
                columns.len(),
                values.dim()
            )));
        }
        Ok(Self {
            columns,
            entity_ids,
            values,
        })
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<FeatureVector>) -> Result<Self> {
        let width = columns.len();
        let mut entity_ids = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.values.len() != width {
                return Err(ChurnError::Shape(format!(
                    "row '{}' has {} values, expected {}",
                    row.entity_id,
                    row.values.len(),
                    width
                )));
            }
            entity_ids.push(row.entity_id);
            flat.extend(row.values);
        }
        let values = Array2::from_shape_vec((entity_ids.len(), width), flat)
            .map_err(|e| ChurnError::Shape(e.to_string()))?;
        Self::new(columns, entity_ids, values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn entity_ids(&self) -> &[String] {
        &self.entity_ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.entity_ids.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name).map(|i| self.values.column(i))
    }

    pub fn get(&self, entity_id: &str, column: &str) -> Option<f64> {
        let row = self.entity_ids.iter().position(|e| e == entity_id)?;
        let col = self.column_index(column)?;
        Some(self.values[[row, col]])
    }

    pub fn row(&self, idx: usize) -> Option<FeatureVector> {
        let entity_id = self.entity_ids.get(idx)?.clone();
        Some(FeatureVector {
            entity_id,
            values: self.values.row(idx).to_vec(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureVector> + '_ {
        (0..self.n_rows()).filter_map(move |i| self.row(i))
    }

    /// Keep the columns at `indices`, in that order.
    pub fn select_columns(&self, indices: &[usize]) -> Self {
        Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            entity_ids: self.entity_ids.clone(),
            values: self.values.select(Axis(1), indices),
        }
    }

    /// Unknown names are ignored.
    pub fn drop_columns(&self, names: &[String]) -> Self {
        let keep: Vec<usize> = (0..self.n_cols())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();
        self.select_columns(&keep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn table() -> FeatureTable {
        FeatureTable::new(
            vec!["label".into(), "a".into(), "b".into()],
            vec!["u1".into(), "u2".into()],
            array![[1.0, 2.0, 3.0], [0.0, 4.0, 5.0]],
        )
        .unwrap()
    }

    #[test]
    fn drop_columns_keeps_order_and_rows() {
        let t = table().drop_columns(&["a".to_string(), "missing".to_string()]);
        assert_eq!(t.columns(), &["label".to_string(), "b".to_string()]);
        assert_eq!(t.get("u2", "b"), Some(5.0));
        assert_eq!(t.n_rows(), 2);
    }

    #[test]
    fn rejects_duplicate_and_misshapen_columns() {
        let dup = FeatureTable::new(
            vec!["a".into(), "a".into()],
            vec!["u1".into()],
            array![[1.0, 2.0]],
        );
        assert!(matches!(dup, Err(ChurnError::Shape(_))));

        let short = FeatureTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![FeatureVector {
                entity_id: "u1".into(),
                values: vec![1.0],
            }],
        );
        assert!(matches!(short, Err(ChurnError::Shape(_))));
    }
}
