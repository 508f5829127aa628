//! Types for scenario run results.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::harness::HarnessError;

/// Outcome of one executed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
}

/// Record of a single executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    /// Position in the scenario (0-based)
    pub index: usize,

    /// Action name, as written in scenario files
    pub action: String,

    /// Human-readable rendering of the step
    pub description: String,

    pub status: StepStatus,

    /// Error message when the step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// Screenshot written by this step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
}

/// Why a run failed
#[derive(Debug)]
pub struct StepFailure {
    /// Index of the failing step; `None` when the failure is not tied to one
    /// (browser launch, mock verification after the last step)
    pub step: Option<usize>,

    /// Rendering of the failing step, or what was being done
    pub description: String,

    pub error: HarnessError,
}

impl StepFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.step {
            Some(step) => write!(f, "step {} ({}) failed: {}", step, self.description, self.error),
            None => write!(f, "{}: {}", self.description, self.error),
        }
    }
}

// HarnessError is not Clone/Deserialize, so reports get kind + message
impl Serialize for StepFailure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("step", &self.step)?;
        map.serialize_entry("description", &self.description)?;
        map.serialize_entry("kind", self.error.kind())?;
        map.serialize_entry("message", &self.error.to_string())?;
        map.end()
    }
}

/// Result of a complete scenario run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Scenario name
    pub scenario: String,

    /// Unique id of this run (also the evidence directory name)
    pub run_id: String,

    /// Whether every step passed and the mock was used as expected
    pub success: bool,

    /// Executed steps, in order; stops at the first failure
    pub steps: Vec<StepOutcome>,

    /// Screenshots produced by screenshot steps
    pub screenshots: Vec<PathBuf>,

    /// Screenshot taken when the run failed, if one could be captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_screenshot: Option<PathBuf>,

    /// Directory holding this run's evidence
    pub evidence_dir: PathBuf,

    /// Requests received by the mocked boundary
    pub mock_calls: Vec<serde_json::Value>,

    /// Machine the run executed on
    pub host: String,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl RunResult {
    /// An empty result for a run that is about to start
    pub fn started(scenario: &str, run_id: &str, evidence_dir: PathBuf) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_id: run_id.to_string(),
            success: false,
            steps: Vec::new(),
            screenshots: Vec::new(),
            error_screenshot: None,
            evidence_dir,
            mock_calls: Vec::new(),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            started_at: Utc::now(),
            duration_ms: 0,
            failure: None,
        }
    }

    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status == StepStatus::Passed).count()
    }

    /// Error of the failure, if any
    pub fn error(&self) -> Option<&HarnessError> {
        self.failure.as_ref().map(|f| &f.error)
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        match &self.failure {
            None => format!(
                "PASS {} ({} steps, {} screenshots, {}ms)",
                self.scenario,
                self.steps.len(),
                self.screenshots.len(),
                self.duration_ms
            ),
            Some(failure) => format!("FAIL {}: {}", self.scenario, failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_kind_and_message() {
        let mut result = RunResult::started("app", "app_1", PathBuf::from("/tmp/app_1"));
        result.failure = Some(StepFailure {
            step: Some(2),
            description: "click `text=Auth`".to_string(),
            error: HarnessError::AmbiguousElement {
                selector: "text=Auth".to_string(),
                matches: 2,
            },
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["failure"]["step"], 2);
        assert_eq!(json["failure"]["kind"], "AmbiguousElementError");
        assert!(result.summary().starts_with("FAIL app: step 2"));
    }

    #[test]
    fn test_summary_for_passing_run() {
        let mut result = RunResult::started("app", "app_1", PathBuf::from("/tmp/app_1"));
        result.success = true;
        result.steps.push(StepOutcome {
            index: 0,
            action: "navigate".to_string(),
            description: "navigate".to_string(),
            status: StepStatus::Passed,
            error: None,
            duration_ms: 5,
            screenshot_path: None,
        });
        assert_eq!(result.passed_steps(), 1);
        assert!(result.summary().starts_with("PASS app (1 steps"));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("failure").is_none());
        assert_eq!(json["steps"][0]["status"], "passed");
    }
}
