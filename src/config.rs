//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for ui-probe, supporting:
//! - Environment variables for every run option
//! - Defaults that target a local Vite dev server
//! - Conversion into [`RunOptions`](crate::harness::RunOptions)
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `UI_PROBE_BASE_URL` | Overrides every scenario's target URL | unset |
//! | `UI_PROBE_HEADLESS` | Run the browser without a window | `true` |
//! | `UI_PROBE_TIMEOUT_MS` | Default wait timeout per step (ms) | `10000` |
//! | `UI_PROBE_POLL_INTERVAL_MS` | Condition polling interval (ms) | `50` |
//! | `UI_PROBE_SCREENSHOT_DIR` | Base directory for run evidence | `./verification_screenshots` |
//! | `UI_PROBE_CHROME_PATH` | Chromium/Chrome executable | auto-detected |
//! | `UI_PROBE_VIEWPORT` | Viewport size as `WxH` | `1280x800` |
//!
//! # Example
//!
//! ```bash
//! # Point the harness at a preview build and watch it run
//! export UI_PROBE_BASE_URL="http://127.0.0.1:4173"
//! export UI_PROBE_HEADLESS=false
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::harness::RunOptions;
use crate::snapshot::SnapshotConfig;

// ============================================================================
// Default Values
// ============================================================================

/// Default target of scenarios that do not name one (the renderer dev server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5173";

/// Default headless mode
pub const DEFAULT_HEADLESS: bool = true;

/// Default wait timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default condition polling interval (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default base directory for screenshots and run metadata
pub const DEFAULT_SCREENSHOT_DIR: &str = "./verification_screenshots";

/// Default viewport width (pixels)
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Default viewport height (pixels)
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_BASE_URL: &str = "UI_PROBE_BASE_URL";
pub const ENV_HEADLESS: &str = "UI_PROBE_HEADLESS";
pub const ENV_TIMEOUT_MS: &str = "UI_PROBE_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "UI_PROBE_POLL_INTERVAL_MS";
pub const ENV_SCREENSHOT_DIR: &str = "UI_PROBE_SCREENSHOT_DIR";
pub const ENV_CHROME_PATH: &str = "UI_PROBE_CHROME_PATH";
pub const ENV_VIEWPORT: &str = "UI_PROBE_VIEWPORT";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for ui-probe
#[derive(Debug, Clone)]
pub struct Config {
    /// Browser and navigation settings
    pub browser: BrowserSettings,
    /// Timing settings for waits and polled assertions
    pub timing: TimingSettings,
    /// Evidence output settings
    pub evidence: EvidenceSettings,
}

/// Browser-related settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Overrides the target URL of every scenario when set
    pub base_url: Option<String>,
    /// Whether to launch without a visible window
    pub headless: bool,
    /// Explicit browser executable, if any
    pub chrome_path: Option<PathBuf>,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
}

/// Wait/poll timing
#[derive(Debug, Clone)]
pub struct TimingSettings {
    /// Default timeout for every locating or asserting step (ms)
    pub timeout_ms: u64,
    /// Interval between condition checks (ms)
    pub poll_interval_ms: u64,
}

/// Evidence output
#[derive(Debug, Clone)]
pub struct EvidenceSettings {
    /// Base directory; each run gets its own subdirectory
    pub screenshot_dir: PathBuf,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            browser: BrowserSettings::from_env(),
            timing: TimingSettings::from_env(),
            evidence: EvidenceSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            browser: BrowserSettings::defaults(),
            timing: TimingSettings::defaults(),
            evidence: EvidenceSettings::defaults(),
        }
    }

    /// Build run options from this configuration
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            base_url: self.browser.base_url.clone(),
            headless: self.browser.headless,
            timeout_ms: self.timing.timeout_ms,
            poll_interval_ms: self.timing.poll_interval_ms,
            screenshot_dir: self.evidence.screenshot_dir.clone(),
            chrome_path: self.browser.chrome_path.clone(),
            viewport: (self.browser.viewport_width, self.browser.viewport_height),
            mock: None,
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        let (viewport_width, viewport_height) = env::var(ENV_VIEWPORT)
            .ok()
            .and_then(|s| parse_viewport(&s))
            .unwrap_or((DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT));

        Self {
            base_url: env::var(ENV_BASE_URL).ok().filter(|s| !s.trim().is_empty()),
            headless: env::var(ENV_HEADLESS)
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(DEFAULT_HEADLESS),
            chrome_path: env::var(ENV_CHROME_PATH)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            viewport_width,
            viewport_height,
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_url: None,
            headless: DEFAULT_HEADLESS,
            chrome_path: None,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

impl TimingSettings {
    pub fn from_env() -> Self {
        Self {
            timeout_ms: env::var(ENV_TIMEOUT_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            poll_interval_ms: env::var(ENV_POLL_INTERVAL_MS)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl EvidenceSettings {
    pub fn from_env() -> Self {
        Self {
            screenshot_dir: env::var(ENV_SCREENSHOT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCREENSHOT_DIR)),
        }
    }

    pub fn defaults() -> Self {
        Self {
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a viewport string `WxH` into (width, height)
pub fn parse_viewport(size: &str) -> Option<(u32, u32)> {
    let lower = size.trim().to_lowercase();
    let (w, h) = lower.split_once('x')?;
    let w: u32 = w.parse().ok()?;
    let h: u32 = h.parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

/// Parse a boolean flag as commonly written in environment variables
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the screenshot base directory (convenience function)
pub fn screenshot_dir() -> PathBuf {
    get().evidence.screenshot_dir.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_viewport() {
        assert_eq!(parse_viewport("1280x800"), Some((1280, 800)));
        assert_eq!(parse_viewport(" 800X600 "), Some((800, 600)));
        assert_eq!(parse_viewport("0x600"), None);
        assert_eq!(parse_viewport("wide"), None);
        assert_eq!(parse_viewport("100"), None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.browser.base_url, None);
        assert!(config.browser.headless);
        assert_eq!(config.timing.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.evidence.screenshot_dir, PathBuf::from(DEFAULT_SCREENSHOT_DIR));
    }

    #[test]
    fn test_run_options_from_defaults() {
        let options = Config::defaults().run_options();
        assert_eq!(options.base_url, None);
        assert_eq!(options.viewport, (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT));
        assert!(options.mock.is_none());
    }
}
