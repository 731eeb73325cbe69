//! SQLite-backed feature store. Each pipeline run is saved under a uuid with
//! its column layout and the features the reducer dropped.

use crate::error::{ChurnError, Result};
use crate::features::{FeatureTable, FeatureVector};
use crate::reduce::Reduction;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Run metadata as stored in the `runs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub created_at: i64,
    pub label_column: String,
    pub threshold: f64,
    pub columns: Vec<String>,
    pub dropped: Vec<String>,
    pub rows: usize,
    /// Rows whose stored label is churned
    pub churned: usize,
}

pub struct FeatureStore {
    conn: Mutex<Connection>,
}

impl FeatureStore {
    /// Open or create DB at path.
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL,
                label_column TEXT NOT NULL,
                threshold REAL NOT NULL,
                columns_json TEXT NOT NULL,
                dropped_json TEXT NOT NULL,
                rows INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_runs_created ON runs(created_at);
            CREATE TABLE IF NOT EXISTS features (
                run_id TEXT NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
                row_idx INTEGER NOT NULL,
                entity_id TEXT NOT NULL,
                label REAL,
                values_json TEXT NOT NULL,
                PRIMARY KEY (run_id, row_idx)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist the reduced table; returns the new run id.
    pub fn save_run(&self, reduction: &Reduction, label_column: &str, threshold: f64) -> Result<String> {
        let table = &reduction.table;
        let label_idx = table
            .column_index(label_column)
            .ok_or_else(|| ChurnError::UnknownColumn(label_column.to_string()))?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp_millis();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (id, created_at, label_column, threshold, columns_json, dropped_json, rows)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                created_at,
                label_column,
                threshold,
                serde_json::to_string(table.columns())?,
                serde_json::to_string(&reduction.plan.dropped)?,
                table.n_rows() as i64,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO features (run_id, row_idx, entity_id, label, values_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (idx, row) in table.rows().enumerate() {
                stmt.execute(params![
                    id,
                    idx as i64,
                    row.entity_id,
                    row.values[label_idx],
                    serde_json::to_string(&row.values)?,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(run_id = %id, rows = table.n_rows(), "saved feature table");
        Ok(id)
    }

    pub fn run_summary(&self, run_id: &str) -> Result<Option<RunSummary>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, created_at, label_column, threshold, columns_json, dropped_json, rows,
                        (SELECT COUNT(*) FROM features f WHERE f.run_id = runs.id AND f.label >= 0.5)
                 FROM runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, created_at, label_column, threshold, columns, dropped, rows, churned)) = row else {
            return Ok(None);
        };
        Ok(Some(RunSummary {
            id,
            created_at,
            label_column,
            threshold,
            columns: serde_json::from_str(&columns)?,
            dropped: serde_json::from_str(&dropped)?,
            rows: rows as usize,
            churned: churned as usize,
        }))
    }

    /// Rebuild a saved table with its original column and row order.
    pub fn load_run(&self, run_id: &str) -> Result<Option<FeatureTable>> {
        let Some(summary) = self.run_summary(run_id)? else {
            return Ok(None);
        };
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT entity_id, values_json FROM features WHERE run_id = ?1 ORDER BY row_idx",
        )?;
        let mut rows = stmt.query(params![run_id])?;
        let mut out = Vec::with_capacity(summary.rows);
        while let Some(row) = rows.next()? {
            let entity_id: String = row.get(0)?;
            let json: String = row.get(1)?;
            // NaN is written as null
            let values: Vec<Option<f64>> = serde_json::from_str(&json)?;
            out.push(FeatureVector {
                entity_id,
                values: values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            });
        }
        FeatureTable::from_rows(summary.columns, out).map(Some)
    }

    /// Ids of all runs, newest first
    pub fn list_runs(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id FROM runs ORDER BY created_at DESC, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Retention: delete runs (and their rows) created before `ts` (epoch ms)
    pub fn prune_before(&self, ts: i64) -> Result<u64> {
        let n = self
            .conn()
            .execute("DELETE FROM runs WHERE created_at < ?1", params![ts])?;
        Ok(n as u64)
    }
}
