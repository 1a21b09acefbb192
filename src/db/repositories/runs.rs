use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_run_status, to_i64, to_u64},
    models::{Run, RunStatus},
    Database,
};

fn run_from_row(row: &Row<'_>) -> Result<Run> {
    let started_at: String = row.get(1)?;
    let stopped_at: Option<String> = row.get(2)?;
    let status: String = row.get(3)?;
    let interval: i64 = row.get(4)?;
    let radius: i64 = row.get(5)?;

    Ok(Run {
        id: row.get(0)?,
        started_at: parse_datetime(&started_at, "runs.started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "runs.stopped_at")?,
        status: parse_run_status(&status)?,
        capture_interval_ms: to_u64(interval, "runs.capture_interval_ms")?,
        extraction_radius: u32::try_from(to_u64(radius, "runs.extraction_radius")?)
            .context("runs.extraction_radius out of range")?,
    })
}

impl Database {
    pub async fn insert_run(&self, run: &Run) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO runs
                     (id, started_at, stopped_at, status, capture_interval_ms, extraction_radius)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.capture_interval_ms)?,
                    i64::from(record.extraction_radius),
                ],
            )
            .with_context(|| "failed to insert run")?;
            Ok(())
        })
        .await
    }

    pub async fn mark_run_status(
        &self,
        run_id: &str,
        status: RunStatus,
        stopped_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE runs SET status = ?1, stopped_at = ?2 WHERE id = ?3",
                params![status.as_str(), stopped_at.map(|dt| dt.to_rfc3339()), run_id],
            )
            .with_context(|| "failed to update run status")?;
            Ok(())
        })
        .await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<Run>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, capture_interval_ms, extraction_radius
                 FROM runs WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![run_id])?;
            match rows.next()? {
                Some(row) => run_from_row(row).map(Some),
                None => Ok(None),
            }
        })
        .await
    }

    /// Runs still marked `Running`, i.e. ones whose process died without stopping.
    pub async fn get_incomplete_runs(&self) -> Result<Vec<Run>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, capture_interval_ms, extraction_radius
                 FROM runs WHERE status = 'Running' ORDER BY started_at ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut runs = Vec::new();
            while let Some(row) = rows.next()? {
                runs.push(run_from_row(row)?);
            }
            Ok(runs)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_db() -> (Database, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("screenshot-ocr-db-{}", uuid::Uuid::new_v4()));
        let db = Database::new(dir.join("catalog.sqlite3")).unwrap();
        (db, dir)
    }

    fn run(id: &str) -> Run {
        Run {
            id: id.into(),
            started_at: Utc::now(),
            stopped_at: None,
            status: RunStatus::Running,
            capture_interval_ms: 5000,
            extraction_radius: 100,
        }
    }

    #[tokio::test]
    async fn run_lifecycle_round_trips_through_catalog() {
        let (db, dir) = scratch_db();
        db.insert_run(&run("a")).await.unwrap();
        db.insert_run(&run("b")).await.unwrap();

        let stopped_at = Utc::now();
        db.mark_run_status("a", RunStatus::Completed, Some(stopped_at))
            .await
            .unwrap();

        let a = db.get_run("a").await.unwrap().unwrap();
        assert_eq!(a.status, RunStatus::Completed);
        assert!(a.stopped_at.is_some());
        assert_eq!(a.capture_interval_ms, 5000);

        let incomplete = db.get_incomplete_runs().await.unwrap();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].id, "b");

        assert!(db.get_run("missing").await.unwrap().is_none());

        drop(db);
        std::fs::remove_dir_all(dir).ok();
    }
}
