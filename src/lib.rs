//! UI Probe - browser-driven UI verification harness.
//!
//! This crate provides:
//! - Scenarios of navigate / fill / click / wait / assert / screenshot steps
//! - Playwright-style selectors (`text=`, `placeholder=`, `role=...[name=...]`, CSS)
//! - A mock for the application's request-execution boundary, installed before
//!   the first document loads
//! - Screenshot evidence in a unique directory per run
//! - A headless Chromium driver and an in-memory fake for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use ui_probe::harness::{MockConfig, MockResponse, RunOptions, Scenario, Selector, Step, run_scenario};
//!
//! # async fn demo() {
//! let scenario = Scenario::new("send", "http://localhost:5173")
//!     .mock(MockConfig::always(MockResponse::json(serde_json::json!({"message": "Hello"}))))
//!     .step(Step::navigate())
//!     .step(Step::fill(Selector::placeholder("Enter request URL"), "https://example.com/api/1"))
//!     .step(Step::click(Selector::text("Send")))
//!     .step(Step::assert_text(Selector::css(".response-viewer"), "Hello"))
//!     .step(Step::screenshot("sent.png"));
//!
//! let result = run_scenario(&scenario, &RunOptions::default()).await;
//! assert!(result.success, "{}", result.summary());
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod harness;
pub mod runner;
pub mod session;
pub mod snapshot;

// Re-export runner types
pub use runner::{RunResult, StepFailure, StepOutcome, StepStatus};

// Re-export harness types
pub use harness::{
    DialogResponse, HarnessError, HarnessResult, MockConfig, MockResponse, MockRule, RunOptions, Scenario, Selector,
    Step, run_scenario, run_scenario_with,
};

// Re-export drivers
pub use driver::{ChromeDriver, FakeDom, FakeDriver, FakeElement, PageDriver};

// Re-export snapshot types
pub use snapshot::{CaptureResult, MockFramebuffer, Snapshot, SnapshotConfig, SnapshotError, SnapshotResult};

// Re-export session management
pub use session::{Session, cleanup_old_sessions, list_sessions};
