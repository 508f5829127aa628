//! Headless Chromium driver over the DevTools protocol (chromiumoxide).
//!
//! Element lookup and form manipulation run as page-side JavaScript built
//! from [`Target::to_js_collection`]; clicks are dispatched as real mouse
//! events at the element's center so overlays and hit testing behave like a
//! user's click.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::js::EvaluationResult;
use chromiumoxide::layout::Point;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{ElementInfo, PageDriver};
use crate::harness::mock::{MockLog, PageInit, mock_log_script};
use crate::harness::selector::{Target, js_string};
use crate::harness::{HarnessError, HarnessResult, RunOptions};
use crate::snapshot::CaptureResult;

const SOURCE_TYPE: &str = "chrome";

/// Interval between TCP connection attempts while waiting for the target server
const REACHABILITY_POLL: Duration = Duration::from_millis(100);

/// Shared helpers prepended to every page-side script
const PAGE_HELPERS: &str = r#"
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const isVisible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.visibility === 'collapse') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const valueOf = (el) => ('value' in el && typeof el.value === 'string') ? el.value : null;
"#;

/// A Chromium instance with a single page
pub struct ChromeDriver {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(options: &RunOptions) -> HarnessResult<Self> {
        let (width, height) = options.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Default::default()
            })
            .request_timeout(options.timeout().max(Duration::from_secs(5)))
            // Containers commonly run as root, where the sandbox refuses to start
            .no_sandbox();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| HarnessError::Browser(format!("invalid browser configuration: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| HarnessError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(HarnessError::Browser(format!("failed to open a page: {e}")));
            }
        };

        debug!(width, height, headless = options.headless, "Chromium launched");
        Ok(Self {
            browser: Some(browser),
            page,
            handler,
        })
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> HarnessResult<T> {
        // Always an expression; scripts here are IIFEs, never function declarations
        let result = self
            .page
            .evaluate_expression(EvaluateParams::new(expression))
            .await
            .map_err(cdp_error)?;
        Ok(result.into_value::<T>()?)
    }

    /// Run `body` against the `index`-th match; `body` returns null or an error message
    async fn act(&self, target: &Target, index: usize, body: &str) -> HarnessResult<()> {
        let script = element_script(target, index, body);
        let result = self
            .page
            .evaluate_expression(EvaluateParams::new(script))
            .await
            .map_err(cdp_error)?;
        action_outcome(&result).map_err(|reason| HarnessError::Browser(format!("`{target}`: {reason}")))
    }
}

/// Interpret an action script's return value.
///
/// A `null` result arrives as a remote object without a value, which
/// `into_value` rejects, so the raw value is inspected instead.
fn action_outcome(result: &EvaluationResult) -> Result<(), String> {
    match result.value() {
        None | Some(serde_json::Value::Null) => Ok(()),
        Some(serde_json::Value::String(reason)) => Err(reason.clone()),
        Some(other) => Err(format!("unexpected action result {other}")),
    }
}

fn element_script(target: &Target, index: usize, body: &str) -> String {
    format!(
        "(() => {{{PAGE_HELPERS}  const el = ({collection})[{index}];\n\
         if (!el) return 'element is no longer attached';\n{body}\n}})()",
        collection = target.to_js_collection(),
    )
}

fn cdp_error(err: chromiumoxide::error::CdpError) -> HarnessError {
    HarnessError::Browser(err.to_string())
}

/// Poll a TCP connection to the URL's host until it accepts or `deadline` passes
async fn wait_until_reachable(url: &str, deadline: Instant) -> HarnessResult<()> {
    let parsed = url::Url::parse(url).map_err(|e| HarnessError::Navigation {
        url: url.to_string(),
        reason: format!("invalid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Ok(());
    }
    let (Some(host), Some(port)) = (parsed.host(), parsed.port_or_known_default()) else {
        return Ok(());
    };
    let host = match host {
        url::Host::Ipv6(addr) => addr.to_string(),
        other => other.to_string(),
    };

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let connect = TcpStream::connect((host.as_str(), port));
        let attempt = tokio::time::timeout(remaining.min(Duration::from_secs(1)), connect);
        if let Ok(Ok(_)) = attempt.await {
            return Ok(());
        }
        if Instant::now() + REACHABILITY_POLL >= deadline {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: format!("{host}:{port} is not reachable"),
            });
        }
        tokio::time::sleep(REACHABILITY_POLL).await;
    }
}

#[derive(Deserialize)]
struct ClickPoint {
    error: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[async_trait]
impl PageDriver for ChromeDriver {
    fn source_type(&self) -> &str {
        SOURCE_TYPE
    }

    async fn prepare(&mut self, init: &PageInit) -> HarnessResult<()> {
        // Installed even without a mock so stray dialogs never block the page
        let script = init.script()?;
        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> HarnessResult<()> {
        let deadline = Instant::now() + timeout;
        wait_until_reachable(url, deadline).await?;

        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: format!("page did not finish loading within {}ms", timeout.as_millis()),
            }),
        }
    }

    async fn current_url(&mut self) -> HarnessResult<String> {
        Ok(self.page.url().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn query(&mut self, target: &Target) -> HarnessResult<Vec<ElementInfo>> {
        let script = format!(
            "(() => {{{PAGE_HELPERS}  return ({collection}).map((el) => ({{ \
             tag: el.tagName.toLowerCase(), visible: isVisible(el), \
             text: norm(el.textContent), value: valueOf(el) }}));\n}})()",
            collection = target.to_js_collection(),
        );
        self.eval(script).await
    }

    async fn fill(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()> {
        let body = format!(
            r#"  const value = {value};
  el.scrollIntoView({{ block: 'center', inline: 'center' }});
  el.focus();
  if (el.isContentEditable) {{
    el.textContent = value;
    el.dispatchEvent(new InputEvent('input', {{ bubbles: true }}));
    return null;
  }}
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
    : el instanceof HTMLInputElement ? HTMLInputElement.prototype : null;
  if (!proto) return 'element <' + el.tagName.toLowerCase() + '> cannot be filled';
  if (el instanceof HTMLInputElement && el.type === 'file') return 'file inputs cannot be filled';
  if (el.disabled || el.readOnly) return 'element is disabled or read-only';
  Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, value);
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return null;"#,
            value = js_string(value)
        );
        self.act(target, index, &body).await
    }

    async fn click(&mut self, target: &Target, index: usize) -> HarnessResult<()> {
        let body = r#"  if (el.disabled) return { error: 'element is disabled' };
  el.scrollIntoView({ block: 'center', inline: 'center' });
  const rect = el.getBoundingClientRect();
  return { error: null, x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };"#;
        let script = element_script(target, index, body).replace(
            "return 'element is no longer attached'",
            "return { error: 'element is no longer attached' }",
        );
        let point: ClickPoint = self.eval(script).await?;
        if let Some(reason) = point.error {
            return Err(HarnessError::Browser(format!("`{target}`: {reason}")));
        }
        self.page
            .click(Point { x: point.x, y: point.y })
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn select_option(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()> {
        let body = format!(
            r#"  const want = {value};
  if (!(el instanceof HTMLSelectElement)) return 'element <' + el.tagName.toLowerCase() + '> is not a <select>';
  const options = Array.from(el.options);
  const option = options.find((o) => o.value === want) || options.find((o) => norm(o.textContent) === want);
  if (!option) return 'no option ' + JSON.stringify(want) + ' (have ' + options.map((o) => o.value).join(', ') + ')';
  el.value = option.value;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return null;"#,
            value = js_string(value)
        );
        self.act(target, index, &body).await
    }

    async fn screenshot(&mut self, full_page: bool) -> HarnessResult<CaptureResult> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        let bytes = self.page.screenshot(params).await.map_err(cdp_error)?;
        let url = self.page.url().await.ok().flatten();
        Ok(CaptureResult::from_png(
            bytes,
            Some(serde_json::json!({ "url": url, "full_page": full_page })),
        )?)
    }

    async fn mock_log(&mut self) -> HarnessResult<MockLog> {
        self.eval(mock_log_script()).await
    }

    async fn close(&mut self) -> HarnessResult<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "waiting for Chromium to exit failed");
        }
        self.handler.abort();
        closed.map(|_| ()).map_err(cdp_error)
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if self.browser.is_some() {
            // The browser kills its child process on drop; stop the event loop too
            self.handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_script_indexes_collection() {
        let script = element_script(&Target::Placeholder("Key".to_string()), 1, "  return null;");
        assert!(script.contains(")[1];"));
        assert!(script.contains("\"Key\""));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }

    fn evaluation(remote_object: &str) -> EvaluationResult {
        EvaluationResult::new(serde_json::from_str(remote_object).unwrap())
    }

    #[test]
    fn test_action_null_result_is_success() {
        // What Runtime.evaluate returns for `return null;`
        let null = evaluation(r#"{"type":"object","subtype":"null","value":null}"#);
        assert_eq!(action_outcome(&null), Ok(()));
        assert_eq!(action_outcome(&evaluation(r#"{"type":"undefined"}"#)), Ok(()));
    }

    #[test]
    fn test_action_message_is_failure() {
        let failed = evaluation(r#"{"type":"string","value":"element is disabled or read-only"}"#);
        assert_eq!(action_outcome(&failed), Err("element is disabled or read-only".to_string()));
        assert!(action_outcome(&evaluation(r#"{"type":"number","value":3}"#)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_within_deadline() {
        // Port 9 (discard) on localhost is closed on any sane test machine
        let started = Instant::now();
        let err = wait_until_reachable("http://127.0.0.1:9/", Instant::now() + Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Navigation { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_non_http_urls_skip_reachability() {
        assert!(wait_until_reachable("file:///tmp/index.html", Instant::now()).await.is_ok());
        assert!(wait_until_reachable("about:blank", Instant::now()).await.is_ok());
    }
}
