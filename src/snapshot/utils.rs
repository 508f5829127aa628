use chrono::Utc;
use std::fs;
use std::path::Path;

use crate::snapshot::framebuffer::CaptureResult;
use crate::snapshot::types::{Snapshot, SnapshotConfig, SnapshotResult};

/// Generate a timestamp string in YYYYMMDD_HHMMSS format
pub fn generate_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Create base metadata map for snapshots
pub fn create_base_metadata(
    width: u32,
    height: u32,
    source: &str,
    timestamp: &str,
) -> serde_json::Map<String, serde_json::Value> {
    let mut meta = serde_json::Map::new();
    meta.insert("width".to_string(), width.into());
    meta.insert("height".to_string(), height.into());
    meta.insert("source".to_string(), source.into());
    meta.insert("timestamp".to_string(), timestamp.into());
    meta
}

/// Write a capture to `path`, plus manifest and description files when configured.
///
/// `context` is merged into the snapshot metadata (scenario, step, URL, ...).
pub fn save_capture(
    capture: &CaptureResult,
    path: &Path,
    source: &str,
    context: serde_json::Map<String, serde_json::Value>,
    config: &SnapshotConfig,
) -> SnapshotResult<Snapshot> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &capture.image_data)?;

    let mut meta = create_base_metadata(capture.width, capture.height, source, &generate_timestamp());
    if let Some(serde_json::Value::Object(extra)) = &capture.metadata {
        meta.extend(extra.clone());
    }
    meta.extend(context);

    let snapshot = Snapshot::new(path.to_path_buf(), source.to_string(), Some(serde_json::Value::Object(meta)));
    write_manifest(&snapshot, config)?;
    write_description(&snapshot, config)?;
    Ok(snapshot)
}

/// Write the JSON manifest for a snapshot if configured
pub fn write_manifest(snapshot: &Snapshot, config: &SnapshotConfig) -> SnapshotResult<()> {
    if config.include_manifest {
        let manifest_path = snapshot.image_path.with_extension("json");
        fs::write(manifest_path, serde_json::to_string_pretty(snapshot)?)?;
    }
    Ok(())
}

/// Write a text description file for a snapshot if configured
pub fn write_description(snapshot: &Snapshot, config: &SnapshotConfig) -> SnapshotResult<()> {
    if !config.include_description {
        return Ok(());
    }
    let description_path = snapshot.image_path.with_extension("txt");
    let field = |key: &str| {
        snapshot
            .metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    let mut description = match (field("scenario"), field("step")) {
        (Some(scenario), Some(step)) => format!("Scenario: {scenario}\nStep: {step}\n"),
        (Some(scenario), None) => format!("Scenario: {scenario}\n"),
        _ => format!("{} screenshot\n", snapshot.source),
    };
    if let Some(url) = field("url") {
        description.push_str(&format!("URL: {url}\n"));
    }
    if let Some(error) = field("error") {
        description.push_str(&format!("Failure: {error}\n"));
    }
    description.push_str(&format!(
        "Source: {}\nTimestamp: {}\n",
        snapshot.source,
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    fs::write(description_path, description)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::framebuffer::MockFramebuffer;
    use tempfile::TempDir;

    #[test]
    fn test_save_capture_writes_evidence_files() {
        let tmp = TempDir::new().unwrap();
        let capture = MockFramebuffer::with_color(16, 16, [0, 0, 0]).capture(None).unwrap();
        let path = tmp.path().join("nested").join("01_initial.png");

        let mut context = serde_json::Map::new();
        context.insert("scenario".to_string(), "app".into());
        context.insert("step".to_string(), "screenshot 01_initial.png".into());
        let snapshot = save_capture(&capture, &path, "fake", context, &SnapshotConfig::default()).unwrap();

        assert!(path.exists());
        assert!(path.with_extension("json").exists());
        let text = fs::read_to_string(path.with_extension("txt")).unwrap();
        assert!(text.starts_with("Scenario: app\nStep: screenshot 01_initial.png\n"));

        let meta = snapshot.metadata.unwrap();
        assert_eq!(meta["width"], 16);
        assert_eq!(meta["source"], "fake");
    }

    #[test]
    fn test_save_capture_images_only() {
        let tmp = TempDir::new().unwrap();
        let capture = MockFramebuffer::with_color(4, 4, [0, 0, 0]).capture(None).unwrap();
        let path = tmp.path().join("shot.png");

        save_capture(&capture, &path, "fake", serde_json::Map::new(), &SnapshotConfig::images_only()).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json").exists());
        assert!(!path.with_extension("txt").exists());
    }
}
