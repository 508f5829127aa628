//! Scenario execution.
//!
//! Steps run strictly in order against one page and the run stops at the
//! first failure. Every locating step polls until its selector resolves or
//! the timeout elapses; a selector matching several elements without
//! `>> nth=N` fails immediately. Whatever happens, a failed run leaves an
//! error screenshot (best effort) and the driver is closed before returning.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::mock::{MockConfig, PageInit};
use super::selector::{Selector, normalize_text};
use super::types::{HarnessError, HarnessResult, RunOptions, Scenario, Step};
use crate::driver::{ChromeDriver, ElementInfo, PageDriver};
use crate::runner::{RunResult, StepFailure, StepOutcome, StepStatus};
use crate::session::Session;
use crate::snapshot::save_capture;

/// Run a scenario in a freshly launched Chromium
pub async fn run_scenario(scenario: &Scenario, options: &RunOptions) -> RunResult {
    if scenario.steps.is_empty() {
        return empty_run(scenario, options);
    }
    match ChromeDriver::launch(options).await {
        Ok(driver) => run_scenario_with(driver, scenario, options).await,
        Err(error) => {
            let session = Session::for_run(&options.screenshot_dir, &scenario.name);
            let mut result = RunResult::started(&scenario.name, &session.id, session.dir.clone());
            warn!(scenario = %scenario.name, error = %error, "browser launch failed");
            result.failure = Some(StepFailure {
                step: None,
                description: "launching browser".to_string(),
                error,
            });
            result
        }
    }
}

/// Run a scenario against an already created page driver
///
/// The driver is closed before this returns.
pub async fn run_scenario_with<D: PageDriver>(mut driver: D, scenario: &Scenario, options: &RunOptions) -> RunResult {
    if scenario.steps.is_empty() {
        close_driver(&mut driver).await;
        return empty_run(scenario, options);
    }

    let started = Instant::now();
    let session = Session::for_run(&options.screenshot_dir, &scenario.name);
    let mut result = RunResult::started(&scenario.name, &session.id, session.dir.clone());
    info!(
        scenario = %scenario.name,
        run_id = %session.id,
        steps = scenario.steps.len(),
        source = driver.source_type(),
        "running scenario"
    );

    if let Err(failure) = execute(&mut driver, scenario, options, &session, &mut result).await {
        warn!(scenario = %scenario.name, "{failure}");
        result.error_screenshot = capture_error_screenshot(&mut driver, scenario, options, &session, &failure).await;
        result.failure = Some(failure);
    }

    match driver.mock_log().await {
        Ok(log) => result.mock_calls = log.calls,
        Err(e) => debug!(error = %e, "mock call log unavailable"),
    }
    close_driver(&mut driver).await;

    result.success = result.failure.is_none();
    result.duration_ms = started.elapsed().as_millis() as u64;
    write_report(&session, &result);
    info!(
        scenario = %scenario.name,
        success = result.success,
        steps = result.steps.len(),
        duration_ms = result.duration_ms,
        "scenario finished"
    );
    result
}

/// A scenario without steps passes once it validates; nothing is launched or written
fn empty_run(scenario: &Scenario, options: &RunOptions) -> RunResult {
    let session = Session::for_run(&options.screenshot_dir, &scenario.name);
    let mut result = RunResult::started(&scenario.name, &session.id, session.dir.clone());
    match scenario.validate() {
        Ok(()) => {
            result.success = true;
            info!(scenario = %scenario.name, "scenario has no steps");
        }
        Err(error) => {
            warn!(scenario = %scenario.name, error = %error, "invalid scenario");
            result.failure = Some(StepFailure {
                step: None,
                description: "validating scenario".to_string(),
                error,
            });
        }
    }
    result
}

async fn close_driver<D: PageDriver>(driver: &mut D) {
    if let Err(e) = driver.close().await {
        warn!(error = %e, "closing the browser failed");
    }
}

fn write_report(session: &Session, result: &RunResult) {
    if !session.dir.exists() {
        return;
    }
    let written = serde_json::to_string_pretty(result)
        .map_err(HarnessError::from)
        .and_then(|json| std::fs::write(session.report_path(), json).map_err(HarnessError::from));
    if let Err(e) = written {
        warn!(error = %e, "could not write run report");
    }
}

async fn execute<D: PageDriver>(
    driver: &mut D,
    scenario: &Scenario,
    options: &RunOptions,
    session: &Session,
    result: &mut RunResult,
) -> Result<(), StepFailure> {
    let setup = |description: &str| {
        let description = description.to_string();
        move |error: HarnessError| StepFailure {
            step: None,
            description,
            error,
        }
    };

    scenario.validate().map_err(setup("validating scenario"))?;
    session
        .init()
        .map_err(HarnessError::from)
        .map_err(setup("creating evidence directory"))?;

    let mock = options.mock.clone().or_else(|| scenario.mock.clone());
    let init = PageInit {
        mock: mock.clone(),
        dialogs: scenario.dialogs.clone(),
    };
    driver.prepare(&init).await.map_err(setup("installing page init script"))?;

    let base_url = options.base_url.clone().unwrap_or_else(|| scenario.target_url.clone());
    let ctx = StepContext {
        scenario,
        options,
        session,
        base_url: &base_url,
    };

    let mut interacted = false;
    for (index, step) in scenario.steps.iter().enumerate() {
        debug!(index, step = %step, "step");
        let step_started = Instant::now();
        let outcome = run_step(driver, step, &ctx).await;
        let duration_ms = step_started.elapsed().as_millis() as u64;

        match outcome {
            Ok(screenshot_path) => {
                if let Some(path) = &screenshot_path {
                    result.screenshots.push(path.clone());
                }
                interacted |= matches!(step, Step::Click { .. } | Step::SelectOption { .. });
                result.steps.push(StepOutcome {
                    index,
                    action: step.action().to_string(),
                    description: step.to_string(),
                    status: StepStatus::Passed,
                    error: None,
                    duration_ms,
                    screenshot_path,
                });
            }
            Err(error) => {
                let error = match mock.as_ref().filter(|_| interacted) {
                    Some(mock) => attribute_to_mock(driver, step, mock, error).await,
                    None => error,
                };
                result.steps.push(StepOutcome {
                    index,
                    action: step.action().to_string(),
                    description: step.to_string(),
                    status: StepStatus::Failed,
                    error: Some(error.to_string()),
                    duration_ms,
                    screenshot_path: None,
                });
                return Err(StepFailure {
                    step: Some(index),
                    description: step.to_string(),
                    error,
                });
            }
        }
    }

    if let Some(mock) = &mock {
        let log = driver.mock_log().await.map_err(setup("reading mock call log"))?;
        mock.verify(&log)
            .map_err(setup(&format!("verifying `{}` mock", mock.boundary())))?;
        debug!(calls = log.calls.len(), "mock verified");
    }
    Ok(())
}

/// A failed assertion after the page was clicked, while an expected mock was
/// never called, points at the mock
async fn attribute_to_mock<D: PageDriver>(
    driver: &mut D,
    step: &Step,
    mock: &MockConfig,
    error: HarnessError,
) -> HarnessError {
    let is_assertion = matches!(
        step,
        Step::AssertValue { .. } | Step::AssertVisible { .. } | Step::AssertText { .. } | Step::AssertCount { .. }
    );
    if !mock.expect_invocation || !is_assertion {
        return error;
    }
    match driver.mock_log().await {
        Ok(log) if log.calls.is_empty() => HarnessError::MockConfiguration(format!(
            "`{}` was mocked but never invoked before the assertion failed: {error}",
            mock.boundary()
        )),
        _ => error,
    }
}

struct StepContext<'a> {
    scenario: &'a Scenario,
    options: &'a RunOptions,
    session: &'a Session,
    base_url: &'a str,
}

/// Resolve a navigate step's URL against the run's base URL
pub fn resolve_url(base: &str, url: Option<&str>) -> HarnessResult<String> {
    let Some(url) = url else {
        return Ok(base.to_string());
    };
    match url::Url::parse(url) {
        Ok(absolute) => Ok(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = url::Url::parse(base)
                .map_err(|e| HarnessError::InvalidScenario(format!("base URL `{base}` is invalid: {e}")))?;
            base.join(url)
                .map(|joined| joined.to_string())
                .map_err(|e| HarnessError::InvalidScenario(format!("cannot join `{url}` onto `{base}`: {e}")))
        }
        Err(e) => Err(HarnessError::InvalidScenario(format!("URL `{url}` is invalid: {e}"))),
    }
}

async fn run_step<D: PageDriver>(driver: &mut D, step: &Step, ctx: &StepContext<'_>) -> HarnessResult<Option<PathBuf>> {
    let timeout = ctx.options.timeout();
    let poll = ctx.options.poll_interval();

    match step {
        Step::Navigate { url } => {
            let target = resolve_url(ctx.base_url, url.as_deref())?;
            driver.navigate(&target, timeout).await?;
        }
        Step::Fill { selector, value } => {
            let index = locate(driver, selector, timeout, poll).await?;
            driver.fill(&selector.target, index, value).await?;
        }
        Step::Click { selector } => {
            let index = locate(driver, selector, timeout, poll).await?;
            driver.click(&selector.target, index).await?;
        }
        Step::SelectOption { selector, value } => {
            let index = locate(driver, selector, timeout, poll).await?;
            driver.select_option(&selector.target, index, value).await?;
        }
        Step::WaitForVisible { selector, timeout_ms } => {
            let timeout = timeout_ms.map(Duration::from_millis).unwrap_or(timeout);
            locate(driver, selector, timeout, poll).await?;
        }
        Step::AssertVisible { selector } => {
            let check = Check {
                require_visible: false,
                expected: "visible".to_string(),
            };
            poll_element(driver, selector, timeout, poll, &check, |el| {
                if el.visible { Ok(()) } else { Err("hidden".to_string()) }
            })
            .await?;
        }
        Step::AssertValue { selector, expected } => {
            let check = Check {
                require_visible: false,
                expected: format!("value {expected:?}"),
            };
            poll_element(driver, selector, timeout, poll, &check, |el| match &el.value {
                Some(value) if value == expected => Ok(()),
                Some(value) => Err(format!("value {value:?}")),
                None => Err(format!("<{}> without a value", el.tag)),
            })
            .await?;
        }
        Step::AssertText { selector, contains } => {
            let want = normalize_text(contains);
            let check = Check {
                require_visible: false,
                expected: format!("text containing {want:?}"),
            };
            poll_element(driver, selector, timeout, poll, &check, |el| {
                let in_value = el.value.as_deref().is_some_and(|v| normalize_text(v).contains(&want));
                if el.text.contains(&want) || in_value {
                    Ok(())
                } else {
                    Err(format!("text {:?}", el.text))
                }
            })
            .await?;
        }
        Step::AssertCount { selector, expected } => {
            assert_count(driver, selector, *expected, timeout, poll).await?;
        }
        Step::Screenshot { path, full_page } => {
            let capture = driver.screenshot(*full_page).await?;
            let target = ctx.session.screenshot_path(path);
            let mut context = serde_json::Map::new();
            context.insert("scenario".to_string(), ctx.scenario.name.clone().into());
            context.insert("step".to_string(), step.to_string().into());
            if let Ok(url) = driver.current_url().await {
                context.insert("url".to_string(), url.into());
            }
            let snapshot = save_capture(&capture, &target, driver.source_type(), context, &ctx.options.snapshot)?;
            return Ok(Some(snapshot.image_path));
        }
    }
    Ok(None)
}

/// What a polled element check expects, for error messages
struct Check {
    require_visible: bool,
    expected: String,
}

/// Why the last poll did not succeed
enum Pending {
    Missing { hidden: usize },
    Mismatch { actual: String },
}

/// Wait until the selector resolves to one visible element; returns its match index
async fn locate<D: PageDriver>(
    driver: &mut D,
    selector: &Selector,
    timeout: Duration,
    poll: Duration,
) -> HarnessResult<usize> {
    let check = Check {
        require_visible: true,
        expected: "visible".to_string(),
    };
    poll_element(driver, selector, timeout, poll, &check, |_| Ok(())).await
}

/// Poll until the selected element passes `check`, or the timeout elapses
async fn poll_element<D, F>(
    driver: &mut D,
    selector: &Selector,
    timeout: Duration,
    poll: Duration,
    check: &Check,
    accept: F,
) -> HarnessResult<usize>
where
    D: PageDriver,
    F: Fn(&ElementInfo) -> Result<(), String>,
{
    let started = Instant::now();
    loop {
        let matches = driver.query(&selector.target).await?;
        if selector.nth.is_none() && matches.len() > 1 {
            return Err(HarnessError::AmbiguousElement {
                selector: selector.to_string(),
                matches: matches.len(),
            });
        }

        let index = selector.nth.unwrap_or(0);
        let pending = match matches.get(index) {
            None => Pending::Missing { hidden: 0 },
            Some(el) if check.require_visible && !el.visible => Pending::Missing { hidden: 1 },
            Some(el) => match accept(el) {
                Ok(()) => return Ok(index),
                Err(actual) => Pending::Mismatch { actual },
            },
        };

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(match pending {
                Pending::Missing { hidden } => HarnessError::ElementNotFound {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                    hidden,
                },
                Pending::Mismatch { actual } => HarnessError::Assertion {
                    selector: selector.to_string(),
                    expected: check.expected.clone(),
                    actual,
                },
            });
        }
        tokio::time::sleep(poll.min(timeout - elapsed)).await;
    }
}

async fn assert_count<D: PageDriver>(
    driver: &mut D,
    selector: &Selector,
    expected: usize,
    timeout: Duration,
    poll: Duration,
) -> HarnessResult<()> {
    let started = Instant::now();
    loop {
        let count = driver.query(&selector.target).await?.len();
        if count == expected {
            return Ok(());
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(HarnessError::Assertion {
                selector: selector.to_string(),
                expected: format!("{expected} element(s)"),
                actual: format!("{count} element(s)"),
            });
        }
        tokio::time::sleep(poll.min(timeout - elapsed)).await;
    }
}

async fn capture_error_screenshot<D: PageDriver>(
    driver: &mut D,
    scenario: &Scenario,
    options: &RunOptions,
    session: &Session,
    failure: &StepFailure,
) -> Option<PathBuf> {
    let path = session.error_screenshot_path(failure.step);
    let capture = match driver.screenshot(true).await {
        Ok(capture) => capture,
        Err(e) => {
            warn!(error = %e, "could not capture error screenshot");
            return None;
        }
    };

    let mut context = serde_json::Map::new();
    context.insert("scenario".to_string(), scenario.name.clone().into());
    context.insert("step".to_string(), failure.description.clone().into());
    context.insert("error".to_string(), failure.error.to_string().into());
    if let Ok(url) = driver.current_url().await {
        context.insert("url".to_string(), url.into());
    }
    match save_capture(&capture, &path, driver.source_type(), context, &options.snapshot) {
        Ok(snapshot) => Some(snapshot.image_path),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "could not save error screenshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolve_url() {
        let base = "http://localhost:5173";
        assert_eq!(resolve_url(base, None).unwrap(), base);
        assert_eq!(resolve_url(base, Some("/settings")).unwrap(), "http://localhost:5173/settings");
        assert_eq!(
            resolve_url("http://localhost:5173/app/", Some("history")).unwrap(),
            "http://localhost:5173/app/history"
        );
        assert_eq!(
            resolve_url(base, Some("https://example.com/x")).unwrap(),
            "https://example.com/x"
        );
        assert!(resolve_url("not a url", Some("/x")).is_err());
    }
}
