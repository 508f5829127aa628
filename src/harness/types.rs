use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::mock::{DialogResponse, MockConfig};
use super::selector::Selector;
use crate::config;
use crate::session::is_reserved_screenshot_path;
use crate::snapshot::{SnapshotConfig, SnapshotError};

/// A named, ordered sequence of steps run against one browser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Name of the scenario (also used for the evidence directory)
    pub name: String,

    /// What the scenario verifies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Address loaded by `navigate` steps without an explicit URL
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Replacement for the application's request-execution capability
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock: Option<MockConfig>,

    /// Canned answers for `prompt` / `confirm` / `alert`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dialogs: Vec<DialogResponse>,

    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_target_url() -> String {
    config::DEFAULT_BASE_URL.to_string()
}

impl Scenario {
    pub fn new(name: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            target_url: target_url.into(),
            mock: None,
            dialogs: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn mock(mut self, mock: MockConfig) -> Self {
        self.mock = Some(mock);
        self
    }

    pub fn dialog(mut self, dialog: DialogResponse) -> Self {
        self.dialogs.push(dialog);
        self
    }

    /// Parse a scenario from JSON and validate it
    pub fn from_json(json: &str) -> HarnessResult<Self> {
        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| HarnessError::InvalidScenario(format!("invalid scenario JSON: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load and validate a scenario file
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| match e {
            HarnessError::InvalidScenario(msg) => HarnessError::InvalidScenario(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Check everything that can be checked without a browser
    pub fn validate(&self) -> HarnessResult<()> {
        if self.name.trim().is_empty() {
            return Err(HarnessError::InvalidScenario("scenario name is empty".to_string()));
        }
        url::Url::parse(&self.target_url).map_err(|e| {
            HarnessError::InvalidScenario(format!("target URL `{}` is invalid: {e}", self.target_url))
        })?;
        if let Some(mock) = &self.mock {
            mock.validate()?;
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|msg| HarnessError::InvalidScenario(format!("step {index} ({step}): {msg}")))?;
        }
        Ok(())
    }
}

/// One navigate / interact / assert / capture operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Load a URL (the run's base URL when absent; relative URLs are joined onto it)
    Navigate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Set the value of an input or textarea
    Fill { selector: Selector, value: String },
    /// Click an element
    Click { selector: Selector },
    /// Wait until an element exists and is visible
    WaitForVisible {
        selector: Selector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Check an input's value equals `expected`
    AssertValue { selector: Selector, expected: String },
    /// Check an element is visible
    AssertVisible { selector: Selector },
    /// Check an element's text (or value) contains `contains`
    AssertText { selector: Selector, contains: String },
    /// Check how many elements match
    AssertCount { selector: Selector, expected: usize },
    /// Choose an option of a `<select>` by value
    SelectOption { selector: Selector, value: String },
    /// Capture a screenshot
    Screenshot {
        path: PathBuf,
        #[serde(default = "default_full_page")]
        full_page: bool,
    },
}

fn default_full_page() -> bool {
    true
}

impl Step {
    pub fn navigate() -> Self {
        Step::Navigate { url: None }
    }

    pub fn navigate_to(url: impl Into<String>) -> Self {
        Step::Navigate { url: Some(url.into()) }
    }

    pub fn fill(selector: Selector, value: impl Into<String>) -> Self {
        Step::Fill {
            selector,
            value: value.into(),
        }
    }

    pub fn click(selector: Selector) -> Self {
        Step::Click { selector }
    }

    pub fn wait_for_visible(selector: Selector, timeout_ms: Option<u64>) -> Self {
        Step::WaitForVisible { selector, timeout_ms }
    }

    pub fn assert_value(selector: Selector, expected: impl Into<String>) -> Self {
        Step::AssertValue {
            selector,
            expected: expected.into(),
        }
    }

    pub fn assert_visible(selector: Selector) -> Self {
        Step::AssertVisible { selector }
    }

    pub fn assert_text(selector: Selector, contains: impl Into<String>) -> Self {
        Step::AssertText {
            selector,
            contains: contains.into(),
        }
    }

    pub fn assert_count(selector: Selector, expected: usize) -> Self {
        Step::AssertCount { selector, expected }
    }

    pub fn select_option(selector: Selector, value: impl Into<String>) -> Self {
        Step::SelectOption {
            selector,
            value: value.into(),
        }
    }

    pub fn screenshot(path: impl Into<PathBuf>) -> Self {
        Step::Screenshot {
            path: path.into(),
            full_page: true,
        }
    }

    /// Short action name, as written in scenario files
    pub fn action(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Fill { .. } => "fill",
            Step::Click { .. } => "click",
            Step::WaitForVisible { .. } => "waitForVisible",
            Step::AssertValue { .. } => "assertValue",
            Step::AssertVisible { .. } => "assertVisible",
            Step::AssertText { .. } => "assertText",
            Step::AssertCount { .. } => "assertCount",
            Step::SelectOption { .. } => "selectOption",
            Step::Screenshot { .. } => "screenshot",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Step::AssertCount { selector, .. } if selector.nth.is_some() => {
                Err("`nth` cannot be combined with assertCount".to_string())
            }
            Step::Screenshot { path, .. } if path.as_os_str().is_empty() => {
                Err("screenshot path is empty".to_string())
            }
            Step::Screenshot { path, .. } if is_reserved_screenshot_path(path) => Err(format!(
                "screenshot path `{}` clashes with a file the harness writes into the run directory",
                path.display()
            )),
            Step::Navigate { url: Some(url) } if url.trim().is_empty() => Err("navigate URL is empty".to_string()),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Navigate { url: Some(url) } => write!(f, "navigate {url}"),
            Step::Navigate { url: None } => write!(f, "navigate"),
            Step::Fill { selector, value } => write!(f, "fill `{selector}` with {value:?}"),
            Step::Click { selector } => write!(f, "click `{selector}`"),
            Step::WaitForVisible { selector, timeout_ms: Some(ms) } => {
                write!(f, "wait for `{selector}` to be visible ({ms}ms)")
            }
            Step::WaitForVisible { selector, timeout_ms: None } => write!(f, "wait for `{selector}` to be visible"),
            Step::AssertValue { selector, expected } => write!(f, "assert `{selector}` has value {expected:?}"),
            Step::AssertVisible { selector } => write!(f, "assert `{selector}` is visible"),
            Step::AssertText { selector, contains } => write!(f, "assert `{selector}` contains {contains:?}"),
            Step::AssertCount { selector, expected } => write!(f, "assert `{selector}` matches {expected} element(s)"),
            Step::SelectOption { selector, value } => write!(f, "select {value:?} in `{selector}`"),
            Step::Screenshot { path, .. } => write!(f, "screenshot {}", path.display()),
        }
    }
}

/// Options for a scenario run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Overrides the scenario's target URL when set
    pub base_url: Option<String>,

    /// Launch the browser without a window
    pub headless: bool,

    /// Default timeout for navigation and every locating/asserting step
    pub timeout_ms: u64,

    /// Interval between condition checks
    pub poll_interval_ms: u64,

    /// Base directory for run evidence
    pub screenshot_dir: PathBuf,

    /// Explicit browser executable
    pub chrome_path: Option<PathBuf>,

    /// Viewport (width, height) in pixels
    pub viewport: (u32, u32),

    /// Mock installed instead of the scenario's own, if any
    pub mock: Option<MockConfig>,

    /// Manifest/description files written next to screenshots
    pub snapshot: SnapshotConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        config::Config::defaults().run_options()
    }
}

impl RunOptions {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms.max(1);
        self
    }

    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    pub fn mock(mut self, mock: MockConfig) -> Self {
        self.mock = Some(mock);
        self
    }

    /// Which files accompany each screenshot
    pub fn snapshot(mut self, snapshot: SnapshotConfig) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug)]
pub enum HarnessError {
    /// The target page did not load within the timeout
    Navigation { url: String, reason: String },

    /// No (visible) element matched the selector within the timeout
    ElementNotFound {
        selector: String,
        timeout_ms: u64,
        /// Matches that existed but were never visible
        hidden: usize,
    },

    /// More than one element matched and no `nth` was given
    AmbiguousElement { selector: String, matches: usize },

    /// A check did not hold within the timeout
    Assertion {
        selector: String,
        expected: String,
        actual: String,
    },

    /// The mock boundary was never used, or used with an unexpected shape
    MockConfiguration(String),

    /// The browser or driver failed
    Browser(String),

    /// The scenario (or a selector in it) cannot be run as written
    InvalidScenario(String),

    /// Screenshot encoding or evidence writing failed
    Snapshot(SnapshotError),

    /// I/O error
    Io(std::io::Error),

    /// JSON error
    Serialization(serde_json::Error),
}

impl HarnessError {
    /// Stable error kind name used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Navigation { .. } => "NavigationError",
            HarnessError::ElementNotFound { .. } => "ElementNotFoundError",
            HarnessError::AmbiguousElement { .. } => "AmbiguousElementError",
            HarnessError::Assertion { .. } => "AssertionError",
            HarnessError::MockConfiguration(_) => "MockConfigurationError",
            HarnessError::Browser(_) => "BrowserError",
            HarnessError::InvalidScenario(_) => "InvalidScenarioError",
            HarnessError::Snapshot(_) => "SnapshotError",
            HarnessError::Io(_) => "IoError",
            HarnessError::Serialization(_) => "SerializationError",
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Navigation { url, reason } => write!(f, "Navigation to {url} failed: {reason}"),
            HarnessError::ElementNotFound {
                selector,
                timeout_ms,
                hidden: 0,
            } => write!(f, "No element matches `{selector}` after {timeout_ms}ms"),
            HarnessError::ElementNotFound {
                selector,
                timeout_ms,
                hidden,
            } => write!(
                f,
                "No visible element matches `{selector}` after {timeout_ms}ms ({hidden} hidden match(es))"
            ),
            HarnessError::AmbiguousElement { selector, matches } => write!(
                f,
                "Selector `{selector}` matches {matches} elements; add `>> nth=N` to pick one"
            ),
            HarnessError::Assertion {
                selector,
                expected,
                actual,
            } => write!(f, "Assertion on `{selector}` failed: expected {expected}, got {actual}"),
            HarnessError::MockConfiguration(msg) => write!(f, "Mock configuration error: {msg}"),
            HarnessError::Browser(msg) => write!(f, "Browser error: {msg}"),
            HarnessError::InvalidScenario(msg) => write!(f, "Invalid scenario: {msg}"),
            HarnessError::Snapshot(err) => write!(f, "Snapshot error: {err}"),
            HarnessError::Io(err) => write!(f, "I/O error: {err}"),
            HarnessError::Serialization(err) => write!(f, "Serialization error: {err}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Snapshot(err) => Some(err),
            HarnessError::Io(err) => Some(err),
            HarnessError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Reports carry the kind and the rendered message
impl Serialize for HarnessError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("kind", self.kind())?;
        map.serialize_entry("message", &self.to_string())?;
        map.end()
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err)
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Serialization(err)
    }
}

impl From<SnapshotError> for HarnessError {
    fn from(err: SnapshotError) -> Self {
        HarnessError::Snapshot(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_json_shape() {
        let json = r#"[
            {"action": "navigate"},
            {"action": "fill", "selector": "placeholder=Enter request URL", "value": "https://example.com/api/1"},
            {"action": "waitForVisible", "selector": ".app-container", "timeoutMs": 2000},
            {"action": "screenshot", "path": "01_initial.png"}
        ]"#;
        let steps: Vec<Step> = serde_json::from_str(json).unwrap();
        assert_eq!(
            steps,
            vec![
                Step::navigate(),
                Step::fill(Selector::placeholder("Enter request URL"), "https://example.com/api/1"),
                Step::wait_for_visible(Selector::css(".app-container"), Some(2000)),
                Step::screenshot("01_initial.png"),
            ]
        );
    }

    #[test]
    fn test_scenario_defaults_target_url() {
        let scenario = Scenario::from_json(r#"{"name": "empty"}"#).unwrap();
        assert_eq!(scenario.target_url, config::DEFAULT_BASE_URL);
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_scenario_validation() {
        assert!(Scenario::from_json(r#"{"name": "  "}"#).is_err());
        assert!(Scenario::from_json(r#"{"name": "x", "targetUrl": "not a url"}"#).is_err());

        let bad_count = r#"{"name": "x", "steps": [
            {"action": "assertCount", "selector": "placeholder=Variable >> nth=1", "expected": 2}
        ]}"#;
        let err = Scenario::from_json(bad_count).unwrap_err();
        assert!(err.to_string().contains("step 0"), "{err}");

        let bad_selector = r#"{"name": "x", "steps": [{"action": "click", "selector": "text="}]}"#;
        assert!(matches!(Scenario::from_json(bad_selector), Err(HarnessError::InvalidScenario(_))));
    }

    #[test]
    fn test_screenshot_cannot_overwrite_run_files() {
        for name in ["result.png", "error.png", "error_step_1.png", ".session.png"] {
            let scenario = Scenario::new("x", "http://localhost:5173").step(Step::screenshot(name));
            let err = scenario.validate().unwrap_err();
            assert!(err.to_string().contains(name), "{err}");
        }
        let nested = Scenario::new("x", "http://localhost:5173").step(Step::screenshot("shots/result.png"));
        assert!(nested.validate().is_ok());
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::click(Selector::text("Auth")).to_string(), "click `text=Auth`");
        assert_eq!(
            Step::assert_value(Selector::placeholder("Key"), "foo").to_string(),
            "assert `placeholder=Key` has value \"foo\""
        );
        assert_eq!(Step::navigate().action(), "navigate");
    }

    #[test]
    fn test_error_kinds_and_messages() {
        let err = HarnessError::ElementNotFound {
            selector: "text=Auth".to_string(),
            timeout_ms: 500,
            hidden: 0,
        };
        assert_eq!(err.kind(), "ElementNotFoundError");
        assert!(err.to_string().contains("text=Auth"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "ElementNotFoundError");
    }
}
