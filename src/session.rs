//! Evidence directories for scenario runs.
//!
//! Every run gets its own directory under the configured screenshot base:
//! `<scenario>_<YYYYMMDD_HHMMSS>_<pid>_<seq>`. The sequence number keeps
//! concurrent runs of the same scenario in one process apart.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

static RUN_SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// Name of the metadata file written into every run directory
pub const SESSION_FILE: &str = ".session.json";

/// Name of the run report written at the end of every run
pub const REPORT_FILE: &str = "result.json";

/// A run's evidence directory
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique run ID (also the directory name)
    pub id: String,
    /// Root directory for this run
    pub dir: PathBuf,
    /// Scenario the directory belongs to
    pub scenario: Option<String>,
}

impl Session {
    /// Create a uniquely named session for a scenario run under `base`
    pub fn for_run(base: impl AsRef<Path>, scenario: &str) -> Self {
        let seq = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}_{}_{}_{}",
            sanitize_name(scenario),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            std::process::id(),
            seq
        );
        let dir = base.as_ref().join(&id);

        Self {
            id,
            dir,
            scenario: Some(scenario.to_string()),
        }
    }

    /// Use an existing directory as the session
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "session".to_string());

        Self {
            id,
            dir,
            scenario: None,
        }
    }

    /// Create the directory and write session metadata
    pub fn init(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "scenario": self.scenario,
            "created": chrono::Utc::now().to_rfc3339(),
            "pid": std::process::id(),
        });
        fs::write(self.dir.join(SESSION_FILE), serde_json::to_string_pretty(&metadata)?)?;
        Ok(())
    }

    /// Where a screenshot step writes its image
    ///
    /// Relative paths land in the session directory; absolute paths are used as given.
    pub fn screenshot_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Path of the screenshot taken when a run fails
    pub fn error_screenshot_path(&self, step: Option<usize>) -> PathBuf {
        match step {
            Some(step) => self.dir.join(format!("error_step_{}.png", step)),
            None => self.dir.join("error.png"),
        }
    }

    /// Path of the machine-readable run report
    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILE)
    }

    /// List all PNG files in the session
    pub fn list_captures(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut captures = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "png") {
                    captures.push(path);
                }
            }
        }
        captures.sort();
        Ok(captures)
    }
}

/// Whether a relative screenshot path would clash with files the harness writes
///
/// Screenshots get `<stem>.json` manifests next to them, so a top-level
/// `result.*` or `.session.*` would overwrite run metadata, and `error.*` or
/// `error_step_N.*` would collide with the error screenshot.
pub fn is_reserved_screenshot_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    let mut parts = path.components().filter(|c| !matches!(c, Component::CurDir));
    let (Some(Component::Normal(name)), None) = (parts.next(), parts.next()) else {
        return false;
    };
    let Some(stem) = Path::new(name).file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let report_stem = REPORT_FILE.trim_end_matches(".json");
    let session_stem = SESSION_FILE.trim_end_matches(".json");
    stem == report_stem
        || stem == session_stem
        || stem == "error"
        || stem
            .strip_prefix("error_step_")
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Sanitize a name for use in filenames
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect();
    if sanitized.is_empty() {
        "scenario".to_string()
    } else {
        sanitized
    }
}

/// Remove run directories under `base` older than `max_age`
///
/// Only directories carrying a session metadata file are considered.
pub fn cleanup_old_sessions(base: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut cleaned = 0;

    for path in list_sessions(base)? {
        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        let expired = now.duration_since(modified).is_ok_and(|age| age > max_age);
        if expired && fs::remove_dir_all(&path).is_ok() {
            cleaned += 1;
        }
    }

    Ok(cleaned)
}

/// List run directories under `base`
pub fn list_sessions(base: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if path.is_dir() && path.join(SESSION_FILE).exists() {
            sessions.push(path);
        }
    }
    sessions.sort();
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_for_run_ids_are_unique() {
        let a = Session::for_run("/tmp/evidence", "env modal");
        let b = Session::for_run("/tmp/evidence", "env modal");
        assert!(a.id.starts_with("env_modal_"));
        assert_ne!(a.id, b.id);
        assert!(a.dir.starts_with("/tmp/evidence"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("hello world"), "hello_world");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_name("   "), "scenario");
    }

    #[test]
    fn test_screenshot_paths() {
        let session = Session::in_dir("/tmp/run");
        assert_eq!(session.screenshot_path(Path::new("01.png")), PathBuf::from("/tmp/run/01.png"));
        assert_eq!(session.screenshot_path(Path::new("/abs/x.png")), PathBuf::from("/abs/x.png"));
        assert!(session.error_screenshot_path(Some(3)).ends_with("error_step_3.png"));
        assert!(session.error_screenshot_path(None).ends_with("error.png"));
    }

    #[test]
    fn test_list_and_cleanup_sessions() {
        let tmp = TempDir::new().unwrap();
        let session = Session::for_run(tmp.path(), "app");
        session.init().unwrap();
        fs::create_dir_all(tmp.path().join("unrelated")).unwrap();

        let sessions = list_sessions(tmp.path()).unwrap();
        assert_eq!(sessions, vec![session.dir.clone()]);

        assert_eq!(cleanup_old_sessions(tmp.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(cleanup_old_sessions(tmp.path(), Duration::ZERO).unwrap() <= 1);
    }

    #[test]
    fn test_reserved_screenshot_paths() {
        for reserved in ["result.png", "./result.png", ".session.png", "error.png", "error_step_12.png"] {
            assert!(is_reserved_screenshot_path(Path::new(reserved)), "{reserved}");
        }
        for allowed in ["results.png", "shots/result.png", "error_step_x.png", "/tmp/result.png", "01.png"] {
            assert!(!is_reserved_screenshot_path(Path::new(allowed)), "{allowed}");
        }
    }
}
