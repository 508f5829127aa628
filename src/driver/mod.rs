//! Page drivers.
//!
//! The executor talks to the browser only through [`PageDriver`]. Element
//! lookup always returns every match so that the executor applies the same
//! ambiguity and `nth` rules to every backend:
//!
//! - [`chrome::ChromeDriver`] drives headless Chromium over CDP
//! - [`fake::FakeDriver`] runs against an in-memory page model for tests

pub mod chrome;
pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::harness::mock::{MockLog, PageInit};
use crate::harness::selector::Target;
use crate::harness::HarnessResult;
use crate::snapshot::CaptureResult;

pub use chrome::ChromeDriver;
pub use fake::{FakeDom, FakeDriver, FakeElement};

/// What the executor needs to know about one matching element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lower-case tag name
    pub tag: String,
    /// Rendered with a non-empty box and not hidden by style
    pub visible: bool,
    /// Whitespace-normalized text content
    pub text: String,
    /// Current value for form controls
    #[serde(default)]
    pub value: Option<String>,
}

/// A browser page the harness can drive
#[async_trait]
pub trait PageDriver: Send {
    /// Source identifier recorded in screenshot metadata
    fn source_type(&self) -> &str;

    /// Install the mock and dialog handlers; runs before the first navigation
    async fn prepare(&mut self, init: &PageInit) -> HarnessResult<()>;

    /// Load `url` and wait for the load event, bounded by `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> HarnessResult<()>;

    /// Address of the current document
    async fn current_url(&mut self) -> HarnessResult<String>;

    /// Every element currently matching `target`, in document order
    async fn query(&mut self, target: &Target) -> HarnessResult<Vec<ElementInfo>>;

    /// Set the value of the `index`-th match and fire input/change events
    async fn fill(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()>;

    /// Click the `index`-th match
    async fn click(&mut self, target: &Target, index: usize) -> HarnessResult<()>;

    /// Choose the option with `value` in the `index`-th match
    async fn select_option(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()>;

    /// Capture the page as PNG
    async fn screenshot(&mut self, full_page: bool) -> HarnessResult<CaptureResult>;

    /// Calls recorded by the mocked request boundary
    async fn mock_log(&mut self) -> HarnessResult<MockLog>;

    /// Tear the session down; called exactly once on every exit path
    async fn close(&mut self) -> HarnessResult<()>;
}
