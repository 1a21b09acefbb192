use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::{
    capture::XcapDisplay,
    db::{Database, Run, RunStatus, CATALOG_FILE},
    input::{ConsoleObserver, RdevInputSource},
    recognition::TesseractCli,
    settings::RunConfig,
    storage::FileSink,
    supervisor::{Collaborators, StatusReport, Supervisor},
};

pub const STATUS_FILE: &str = "status.json";

fn load_config(config_path: &Path) -> Result<RunConfig> {
    RunConfig::load(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))
}

/// Opens the catalog and finalises runs a previous crash left open.
async fn open_catalog(config: &RunConfig) -> Result<Database> {
    let db = Database::new(config.output_dir.join(CATALOG_FILE))?;

    let now = Utc::now();
    for run in db.get_incomplete_runs().await? {
        warn!("Recovered incomplete run {}; marking as Interrupted", run.id);
        db.mark_run_status(&run.id, RunStatus::Interrupted, Some(now))
            .await?;
    }
    Ok(db)
}

fn write_status(path: &Path, report: &StatusReport) {
    let result = serde_json::to_string_pretty(report)
        .map_err(anyhow::Error::from)
        .and_then(|json| fs::write(path, json).map_err(anyhow::Error::from));
    if let Err(err) = result {
        warn!("Failed to write status file {}: {err}", path.display());
    }
}

fn print_status(report: &StatusReport) {
    println!("\n=== Screenshot OCR Status ===");
    println!("Running: {}", report.running);
    println!("Capture Interval: {} seconds", report.capture_interval_secs);
    println!("Extraction Radius: {} pixels", report.extraction_radius);
    println!("Output Directory: {}", report.output_dir.display());
    println!("Clicks Recorded: {}", report.click_count);
    match report.last_frame_size {
        Some((width, height)) if report.last_frame_available => {
            println!("Last Screenshot: Available");
            println!("Screenshot Size: {width}x{height}");
        }
        _ => println!("Last Screenshot: None"),
    }
    println!("Frames Captured: {}", report.frames_captured);
    println!("Capture Failures: {}", report.capture_failures);
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    Ok("Ctrl-C")
}

/// Closes a cataloged run. Failing to update the row is logged; the next
/// startup marks anything left `Running` as interrupted.
async fn finish_run(db: &Database, run_id: &str, status: RunStatus) {
    if let Err(err) = db.mark_run_status(run_id, status, Some(Utc::now())).await {
        warn!("Failed to mark run {run_id} as {}: {err:#}", status.as_str());
    }

    let failed = db.failed_writes();
    if failed > 0 {
        warn!("{failed} artifact rows could not be cataloged for run {run_id}");
    }
}

/// Runs until Ctrl-C or SIGTERM, then shuts down in order.
pub async fn start(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let sink = FileSink::new(&config)?;

    if !config.catalog {
        return supervise(config, sink).await;
    }

    let db = open_catalog(&config).await?;
    let run_id = Uuid::new_v4().to_string();
    db.insert_run(&Run {
        id: run_id.clone(),
        started_at: Utc::now(),
        stopped_at: None,
        status: RunStatus::Running,
        capture_interval_ms: config.capture_interval().as_millis() as u64,
        extraction_radius: config.extraction_radius,
    })
    .await?;

    let sink = sink.with_catalog(db.clone(), run_id.clone());
    let result = supervise(config, sink).await;
    let status = if result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Interrupted
    };
    finish_run(&db, &run_id, status).await;
    result
}

async fn supervise(config: RunConfig, sink: FileSink) -> Result<()> {
    let recognizer = Arc::new(TesseractCli::from_config(&config));
    {
        let engine = Arc::clone(&recognizer);
        tokio::task::spawn_blocking(move || engine.warm_up())
            .await
            .context("recognition engine warm-up panicked")?;
    }

    let status_path = config.output_dir.join(STATUS_FILE);
    let interval = config.capture_interval();
    let supervisor = Supervisor::new(
        config,
        Collaborators {
            display: Arc::new(XcapDisplay::new()),
            recognizer,
            sink: Arc::new(sink),
            input: Arc::new(RdevInputSource::new()),
            observer: Arc::new(ConsoleObserver),
        },
    );

    supervisor.start().await?;

    let settings = supervisor.config();
    println!("Screenshot OCR system started!");
    println!("- Taking screenshots every {} seconds", settings.capture_interval);
    println!(
        "- Extracting text around mouse clicks with radius {} pixels",
        settings.extraction_radius
    );
    println!("- Output directory: {}", settings.output_dir.display());
    println!("Press Ctrl+C to stop...");

    let mut ticker = tokio::time::interval(interval);
    let signal = shutdown_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            received = &mut signal => {
                match received {
                    Ok(name) => info!("Received {name}, shutting down"),
                    Err(err) => warn!("Signal handling failed ({err:#}); shutting down"),
                }
                break;
            }
            _ = ticker.tick() => {
                write_status(&status_path, &supervisor.status_report().await);
            }
        }
    }

    supervisor.stop().await;
    write_status(&status_path, &supervisor.status_report().await);

    println!("\nScreenshot OCR system stopped.");
    println!("Total clicks recorded: {}", supervisor.clicks().len());
    Ok(())
}

/// Prints the snapshot last written by `start` for this output directory.
pub fn status(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let status_path: PathBuf = config.output_dir.join(STATUS_FILE);

    let contents = match fs::read_to_string(&status_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            println!("No status recorded yet in {}", config.output_dir.display());
            return Ok(());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", status_path.display()))
        }
    };

    let report: StatusReport = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", status_path.display()))?;
    print_status(&report);
    Ok(())
}

/// Prints the most recent cataloged recognitions, newest first.
pub async fn history(config_path: &Path, limit: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog_path = config.output_dir.join(CATALOG_FILE);
    if !catalog_path.exists() {
        println!("No catalog found at {}", catalog_path.display());
        return Ok(());
    }

    let db = Database::new(catalog_path)?;
    let records = db.recent_texts(limit).await?;
    if records.is_empty() {
        println!("No recognized text recorded yet");
        return Ok(());
    }

    for record in records {
        let text = record.text.unwrap_or_default();
        let preview = text.lines().next().unwrap_or("").trim();
        match (record.x, record.y) {
            (Some(x), Some(y)) => println!(
                "{} [{}] ({x}, {y}) {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.kind.as_str(),
                preview
            ),
            _ => println!(
                "{} [{}] {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.kind.as_str(),
                preview
            ),
        }
        println!("    {}", record.path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_file_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("screenshot-ocr-status-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(STATUS_FILE);

        let report = StatusReport {
            running: false,
            capture_interval_secs: 2.5,
            extraction_radius: 40,
            output_dir: dir.clone(),
            click_count: 7,
            last_frame_available: false,
            last_frame_size: None,
            frames_captured: 0,
            capture_failures: 4,
        };
        write_status(&path, &report);

        let parsed: StatusReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report);

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn finish_run_closes_the_catalog_row() {
        let dir = std::env::temp_dir().join(format!("screenshot-ocr-run-{}", Uuid::new_v4()));
        let db = Database::new(dir.join(CATALOG_FILE)).unwrap();
        db.insert_run(&Run {
            id: "failed-start".into(),
            started_at: Utc::now(),
            stopped_at: None,
            status: RunStatus::Running,
            capture_interval_ms: 5000,
            extraction_radius: 100,
        })
        .await
        .unwrap();

        finish_run(&db, "failed-start", RunStatus::Interrupted).await;

        let run = db.get_run("failed-start").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
        assert!(run.stopped_at.is_some());
        assert!(db.get_incomplete_runs().await.unwrap().is_empty());

        drop(db);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn status_without_snapshot_is_not_an_error() {
        let dir = std::env::temp_dir().join(format!("screenshot-ocr-status-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("config.json");
        fs::write(
            &config_path,
            format!(r#"{{"output_dir": {}}}"#, serde_json::to_string(&dir.join("out")).unwrap()),
        )
        .unwrap();

        assert!(status(&config_path).is_ok());
        fs::remove_dir_all(dir).ok();
    }
}
