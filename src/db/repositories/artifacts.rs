use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde_json::{from_str, to_string};

use crate::db::{
    helpers::{parse_artifact_kind, parse_datetime},
    models::ArtifactRecord,
    Database,
};
use crate::models::BoundingBox;

fn insert_artifact_row(conn: &mut Connection, record: &ArtifactRecord) -> Result<()> {
    let bounds_json = record
        .bounds
        .as_ref()
        .map(to_string)
        .transpose()
        .context("failed to serialize artifact bounds")?;

    conn.execute(
        "INSERT INTO artifacts (run_id, kind, path, timestamp, x, y, bounds_json, text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.run_id,
            record.kind.as_str(),
            record.path,
            record.timestamp.to_rfc3339(),
            record.x,
            record.y,
            bounds_json,
            record.text,
        ],
    )
    .with_context(|| "failed to insert artifact")?;
    Ok(())
}

impl Database {
    /// Fire-and-forget insert used by the sink on the hot path.
    pub fn record_artifact(&self, record: ArtifactRecord) {
        self.submit("artifact", move |conn| insert_artifact_row(conn, &record));
    }

    pub async fn insert_artifact(&self, record: &ArtifactRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| insert_artifact_row(conn, &record))
            .await
    }

    /// Most recent artifacts that carry recognized text, newest first.
    pub async fn recent_texts(&self, limit: usize) -> Result<Vec<ArtifactRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, run_id, kind, path, timestamp, x, y, bounds_json, text
                 FROM artifacts
                 WHERE text IS NOT NULL
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )?;
            let mut rows = stmt.query(params![limit])?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let kind: String = row.get(2)?;
                let timestamp: String = row.get(4)?;
                let bounds_json: Option<String> = row.get(7)?;

                records.push(ArtifactRecord {
                    id: Some(row.get(0)?),
                    run_id: row.get(1)?,
                    kind: parse_artifact_kind(&kind)?,
                    path: row.get(3)?,
                    timestamp: parse_datetime(&timestamp, "artifacts.timestamp")?,
                    x: row.get(5)?,
                    y: row.get(6)?,
                    bounds: bounds_json
                        .as_deref()
                        .map(|raw| from_str::<BoundingBox>(raw))
                        .transpose()
                        .context("failed to parse artifact bounds")?,
                    text: row.get(8)?,
                });
            }
            Ok(records)
        })
        .await
    }

    pub async fn count_artifacts_for_run(&self, run_id: &str) -> Result<u64> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM artifacts WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}
