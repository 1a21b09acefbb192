use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BoundingBox;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Screenshot,
    Region,
    FullText,
    RegionText,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Screenshot => "screenshot",
            ArtifactKind::Region => "region",
            ArtifactKind::FullText => "full_text",
            ArtifactKind::RegionText => "region_text",
        }
    }
}

/// A file written by the sink. Click fields are set for region artifacts only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: Option<i64>,
    pub run_id: String,
    pub kind: ArtifactKind,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub bounds: Option<BoundingBox>,
    pub text: Option<String>,
}
