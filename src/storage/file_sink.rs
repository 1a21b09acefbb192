use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{ArtifactMeta, ImageCategory, PersistenceError, PersistenceSink};
use crate::{
    db::{ArtifactKind, ArtifactRecord, Database},
    models::ClickEvent,
    settings::RunConfig,
};

const RULE_WIDTH: usize = 50;
pub const EVENT_LOG_FILE: &str = "click_summary.json";

/// Run-scoped handle on the SQLite catalog.
#[derive(Clone)]
struct Catalog {
    db: Database,
    run_id: String,
}

/// Writes artifacts into the directory layout under `output_dir`:
///
/// ```text
/// screenshots/        full frames
/// extracted_regions/  annotated click crops
/// ocr_text/           recognized text with a metadata header
/// click_summary.json  click log, written on shutdown
/// ```
pub struct FileSink {
    output_dir: PathBuf,
    screenshots_dir: PathBuf,
    extracted_dir: PathBuf,
    text_dir: PathBuf,
    format: ImageFormat,
    extension: &'static str,
    catalog: Option<Catalog>,
}

impl FileSink {
    /// Creates the output directories. Failing here is a startup failure.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let output_dir = config.output_dir.clone();
        let sink = Self {
            screenshots_dir: output_dir.join("screenshots"),
            extracted_dir: output_dir.join("extracted_regions"),
            text_dir: output_dir.join("ocr_text"),
            output_dir,
            format: config.image_format(),
            extension: config.image_extension(),
            catalog: None,
        };

        for dir in [
            &sink.output_dir,
            &sink.screenshots_dir,
            &sink.extracted_dir,
            &sink.text_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        }

        log::info!("Output directories created in: {}", sink.output_dir.display());
        Ok(sink)
    }

    /// Also record every written artifact in the catalog under `run_id`.
    pub fn with_catalog(mut self, db: Database, run_id: impl Into<String>) -> Self {
        self.catalog = Some(Catalog {
            db,
            run_id: run_id.into(),
        });
        self
    }

    fn record(&self, kind: ArtifactKind, path: &Path, meta: &ArtifactMeta, text: Option<&str>) {
        let Some(catalog) = &self.catalog else {
            return;
        };

        let record = ArtifactRecord {
            id: None,
            run_id: catalog.run_id.clone(),
            kind,
            path: path.display().to_string(),
            timestamp: meta.timestamp,
            x: meta.click.map(|c| c.x),
            y: meta.click.map(|c| c.y),
            bounds: meta.click.map(|c| c.bounds),
            text: text.map(String::from),
        };
        catalog.db.record_artifact(record);
    }
}

fn stamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d_%H%M%S_%3f").to_string()
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl PersistenceSink for FileSink {
    fn save_image(
        &self,
        image: &RgbaImage,
        category: ImageCategory,
        meta: &ArtifactMeta,
    ) -> Result<PathBuf, PersistenceError> {
        let ts = stamp(&meta.timestamp);
        let path = match (category, meta.click) {
            (ImageCategory::Region, Some(click)) => self.extracted_dir.join(format!(
                "region_{ts}_x{}_y{}.{}",
                click.x, click.y, self.extension
            )),
            (ImageCategory::Region, None) => {
                self.extracted_dir.join(format!("region_{ts}.{}", self.extension))
            }
            (ImageCategory::Screenshot, _) => {
                self.screenshots_dir.join(format!("screenshot_{ts}.{}", self.extension))
            }
        };

        // JPEG has no alpha channel.
        let encoded = match self.format {
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
                .to_rgb8()
                .save_with_format(&path, self.format),
            _ => image.save_with_format(&path, self.format),
        };
        encoded.map_err(|e| PersistenceError::Encoding {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let kind = match category {
            ImageCategory::Screenshot => ArtifactKind::Screenshot,
            ImageCategory::Region => ArtifactKind::Region,
        };
        self.record(kind, &path, meta, None);
        Ok(path)
    }

    fn save_text(&self, text: &str, meta: &ArtifactMeta) -> Result<PathBuf, PersistenceError> {
        let ts = stamp(&meta.timestamp);
        let iso = meta.timestamp.to_rfc3339();
        let rule = "-".repeat(RULE_WIDTH);

        let (path, body, kind) = match meta.click {
            Some(click) => {
                let b = click.bounds;
                let body = format!(
                    "Click Position: ({}, {})\n\
                     Extraction Radius: {}\n\
                     Timestamp: {iso}\n\
                     Region Bounds: ({}, {}, {}, {})\n\
                     {rule}\n{text}",
                    click.x, click.y, click.radius, b.left, b.top, b.right, b.bottom
                );
                let path = self
                    .text_dir
                    .join(format!("text_{ts}_x{}_y{}.txt", click.x, click.y));
                (path, body, ArtifactKind::RegionText)
            }
            None => {
                let body = format!("Full Screenshot OCR - {iso}\n{rule}\n{text}");
                let path = self.text_dir.join(format!("full_ocr_{ts}.txt"));
                (path, body, ArtifactKind::FullText)
            }
        };

        fs::write(&path, body).map_err(io_error(&path))?;
        self.record(kind, &path, meta, Some(text));
        Ok(path)
    }

    fn save_event_log(&self, entries: &[ClickEvent]) -> Result<PathBuf, PersistenceError> {
        let path = self.output_dir.join(EVENT_LOG_FILE);
        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(&path, serialized).map_err(io_error(&path))?;
        Ok(path)
    }
}
