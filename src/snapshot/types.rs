// Core types for screenshot evidence

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What gets written next to each screenshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Write `<name>.json` with the snapshot metadata
    pub include_manifest: bool,

    /// Write `<name>.txt` with a human-readable description
    pub include_description: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            include_manifest: true,
            include_description: true,
        }
    }
}

impl SnapshotConfig {
    /// Only the PNG files
    pub fn images_only() -> Self {
        Self {
            include_manifest: false,
            include_description: false,
        }
    }
}

/// A screenshot saved to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Path to the image file
    pub image_path: PathBuf,

    /// Source type (e.g., "chrome", "fake")
    pub source: String,

    /// Scenario, step and page details
    pub metadata: Option<serde_json::Value>,

    /// Timestamp when the snapshot was created
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(image_path: PathBuf, source: String, metadata: Option<serde_json::Value>) -> Self {
        Self {
            image_path,
            source,
            metadata,
            timestamp: Utc::now(),
        }
    }
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Error types for snapshot operations
#[derive(Debug)]
pub enum SnapshotError {
    /// Capturing or encoding the image failed
    Capture(String),

    /// I/O error
    Io(std::io::Error),

    /// Serialization error
    Serialization(serde_json::Error),
}

// Manual implementation of Serialize for SnapshotError
impl Serialize for SnapshotError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            SnapshotError::Capture(msg) => map.serialize_entry("Capture", msg)?,
            SnapshotError::Io(err) => map.serialize_entry("Io", &err.to_string())?,
            SnapshotError::Serialization(err) => map.serialize_entry("Serialization", &err.to_string())?,
        }
        map.end()
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Capture(msg) => write!(f, "Capture error: {}", msg),
            SnapshotError::Io(err) => write!(f, "I/O error: {}", err),
            SnapshotError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Capture(_) => None,
            SnapshotError::Io(err) => Some(err),
            SnapshotError::Serialization(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err)
    }
}

impl From<image::ImageError> for SnapshotError {
    fn from(err: image::ImageError) -> Self {
        SnapshotError::Capture(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_error_serializes_variant() {
        let err = SnapshotError::Capture("not a PNG".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["Capture"], "not a PNG");
    }

    #[test]
    fn test_snapshot_config_default_writes_everything() {
        let config = SnapshotConfig::default();
        assert!(config.include_manifest && config.include_description);
        assert_ne!(config, SnapshotConfig::images_only());
    }
}
