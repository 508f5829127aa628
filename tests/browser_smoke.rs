//! Runs against a real Chromium. Ignored by default:
//! `cargo test --test browser_smoke -- --ignored`

use std::path::Path;

use ui_probe::harness::{DialogResponse, MockConfig, MockResponse, RunOptions, Scenario, Selector, Step, run_scenario};

fn fixture_url() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/renderer.html");
    url::Url::from_file_path(&path).map(|u| u.to_string()).unwrap()
}

fn options(dir: &Path) -> RunOptions {
    ui_probe::config::get()
        .run_options()
        .base_url(fixture_url())
        .screenshot_dir(dir)
        .timeout_ms(5_000)
}

#[tokio::test]
#[ignore]
async fn test_mocked_send_in_chromium() {
    let tmp = tempfile::tempdir().unwrap();
    let scenario = Scenario::new("smoke-send", "http://localhost:5173")
        .mock(MockConfig::always(MockResponse::json(serde_json::json!({"message": "Hello"}))))
        .steps([
            Step::navigate(),
            Step::fill(Selector::placeholder("Enter request URL"), "https://example.com/api/1"),
            Step::click(Selector::role("button", Some("Send"))),
            Step::assert_text(Selector::css("textarea[readonly]"), "Hello"),
            Step::assert_text(Selector::css("#status"), "Status: 200 OK"),
            Step::screenshot("send.png"),
        ]);

    let result = run_scenario(&scenario, &options(tmp.path())).await;

    assert!(result.success, "{}", result.summary());
    assert_eq!(result.mock_calls.len(), 1);
    assert_eq!(result.mock_calls[0]["url"], "https://example.com/api/1");
    assert!(result.screenshots[0].exists());
}

#[tokio::test]
#[ignore]
async fn test_params_tabs_and_prompt_in_chromium() {
    let tmp = tempfile::tempdir().unwrap();
    let scenario = Scenario::new("smoke-ui", "http://localhost:5173")
        .dialog(DialogResponse::accept_prompt("Enter environment name", "Test Env"))
        .steps([
            Step::navigate(),
            Step::fill(Selector::placeholder("Enter request URL"), "https://jsonplaceholder.typicode.com/todos/1"),
            Step::fill(Selector::placeholder("Key"), "foo"),
            Step::fill(Selector::placeholder("Value"), "bar"),
            Step::assert_value(
                Selector::placeholder("Enter request URL"),
                "https://jsonplaceholder.typicode.com/todos/1?foo=bar",
            ),
            Step::click(Selector::text("Params (1)")),
            Step::click(Selector::text("Body")),
            Step::assert_visible(Selector::label("JSON")),
            Step::assert_count(Selector::css("input[type='radio']"), 2),
            Step::click(Selector::title("New Environment")),
            Step::wait_for_visible(Selector::text("Test Env"), None),
            Step::screenshot("ui.png"),
        ]);

    let result = run_scenario(&scenario, &options(tmp.path())).await;
    assert!(result.success, "{}", result.summary());
}

#[tokio::test]
#[ignore]
async fn test_missing_element_in_chromium() {
    let tmp = tempfile::tempdir().unwrap();
    let scenario = Scenario::new("smoke-missing", "http://localhost:5173").steps([
        Step::navigate(),
        Step::wait_for_visible(Selector::text("Collections"), Some(500)),
    ]);

    let result = run_scenario(&scenario, &options(tmp.path())).await;

    assert!(!result.success);
    assert_eq!(result.failure.as_ref().unwrap().kind(), "ElementNotFoundError");
    assert!(result.error_screenshot.as_ref().unwrap().exists());
}
