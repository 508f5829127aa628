//! Mock of the application's request-execution boundary.
//!
//! The renderer under test sends HTTP requests through a capability exposed
//! on `window` by the desktop shell (`window.electronAPI.makeRequest`). A
//! [`MockConfig`] replaces that capability with a table of canned responses
//! before the first document loads, so the application believes it talked
//! to the network while nothing leaves the page.
//!
//! Every call is recorded (in `sessionStorage`, so reloads keep the log) and
//! read back with [`MockLog`] to confirm the boundary was actually used.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::selector::js_string;
use super::types::{HarnessError, HarnessResult};

/// Key used for the page-side call log
pub const MOCK_STATE_KEY: &str = "__uiProbe";

/// Canned response, shaped like the desktop shell's request handler output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body; strings are passed through, other JSON values as-is
    #[serde(default)]
    pub data: serde_json::Value,
}

impl MockResponse {
    pub fn new(status: u16, data: impl Into<serde_json::Value>) -> Self {
        Self {
            status,
            status_text: default_status_text(status).to_string(),
            headers: BTreeMap::new(),
            data: data.into(),
        }
    }

    /// A 200 response carrying a JSON body
    pub fn json(body: serde_json::Value) -> Self {
        Self::new(200, body.to_string()).header("content-type", "application/json")
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Response returned for calls no rule answers
    pub fn unmocked() -> Self {
        Self {
            status: 0,
            status_text: "Unmocked".to_string(),
            headers: BTreeMap::new(),
            data: serde_json::Value::String(String::new()),
        }
    }
}

fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// One row of the response table; the first matching rule answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRule {
    /// Substring the request URL must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,
    /// HTTP method (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub response: MockResponse,
}

impl MockRule {
    pub fn matches(&self, url: &str, method: &str) -> bool {
        self.url_contains.as_deref().is_none_or(|needle| url.contains(needle))
            && self
                .method
                .as_deref()
                .is_none_or(|m| m.eq_ignore_ascii_case(method))
    }
}

/// Configuration of the mocked request-execution capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Global object exposing the capability
    #[serde(default = "default_api")]
    pub api: String,
    /// Method on that object performing the request
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub rules: Vec<MockRule>,
    /// Answer for requests no rule matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<MockResponse>,
    /// Fail the run when the capability is never called
    #[serde(default = "default_expect_invocation")]
    pub expect_invocation: bool,
}

fn default_api() -> String {
    "electronAPI".to_string()
}

fn default_method() -> String {
    "makeRequest".to_string()
}

fn default_expect_invocation() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            method: default_method(),
            rules: Vec::new(),
            fallback: None,
            expect_invocation: default_expect_invocation(),
        }
    }
}

impl MockConfig {
    /// Answer every request with the same response
    pub fn always(response: MockResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Default::default()
        }
    }

    pub fn rule(mut self, rule: MockRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn expect_invocation(mut self, expect: bool) -> Self {
        self.expect_invocation = expect;
        self
    }

    /// Boundary name as shown in messages, e.g. `electronAPI.makeRequest`
    pub fn boundary(&self) -> String {
        format!("{}.{}", self.api, self.method)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        let is_ident = |s: &str| {
            let mut chars = s.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        };
        if !is_ident(&self.api) || !is_ident(&self.method) {
            return Err(HarnessError::MockConfiguration(format!(
                "`{}` is not a valid boundary name",
                self.boundary()
            )));
        }
        if self.rules.is_empty() && self.fallback.is_none() {
            return Err(HarnessError::MockConfiguration(format!(
                "mock for `{}` has neither rules nor a fallback response",
                self.boundary()
            )));
        }
        Ok(())
    }

    /// Response for a request, mirroring the page-side lookup
    pub fn respond(&self, url: &str, method: &str) -> Option<&MockResponse> {
        self.rules
            .iter()
            .find(|rule| rule.matches(url, method))
            .map(|rule| &rule.response)
            .or(self.fallback.as_ref())
    }

    /// Check the recorded calls after a run
    pub fn verify(&self, log: &MockLog) -> HarnessResult<()> {
        if let Some((index, call)) = log.calls.iter().enumerate().find(|(_, call)| !is_request_shaped(call)) {
            return Err(HarnessError::MockConfiguration(format!(
                "call {index} to `{}` has an unexpected shape \
                 (expected an object with string `url` and `method`): {call}",
                self.boundary()
            )));
        }
        if log.unmatched > 0 {
            return Err(HarnessError::MockConfiguration(format!(
                "{} call(s) to `{}` matched no rule and no fallback",
                log.unmatched,
                self.boundary()
            )));
        }
        if self.expect_invocation && log.calls.is_empty() {
            return Err(HarnessError::MockConfiguration(format!(
                "`{}` was mocked but never invoked",
                self.boundary()
            )));
        }
        Ok(())
    }
}

fn is_request_shaped(call: &serde_json::Value) -> bool {
    call.get("url").is_some_and(serde_json::Value::is_string)
        && call.get("method").is_some_and(serde_json::Value::is_string)
}

/// Canned answer for a browser dialog whose message contains `contains`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResponse {
    pub contains: String,
    #[serde(default = "default_accept")]
    pub accept: bool,
    /// Text returned from `prompt`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn default_accept() -> bool {
    true
}

impl DialogResponse {
    pub fn accept_prompt(contains: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            accept: true,
            text: Some(text.into()),
        }
    }

    pub fn dismiss(contains: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            accept: false,
            text: None,
        }
    }
}

/// First matching dialog response for a message
pub fn find_dialog<'a>(dialogs: &'a [DialogResponse], message: &str) -> Option<&'a DialogResponse> {
    dialogs.iter().find(|d| message.contains(&d.contains))
}

/// Calls recorded by the page-side mock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockLog {
    #[serde(default)]
    pub calls: Vec<serde_json::Value>,
    #[serde(default)]
    pub unmatched: usize,
}

/// Everything installed into the page before the first navigation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInit {
    pub mock: Option<MockConfig>,
    pub dialogs: Vec<DialogResponse>,
}

impl PageInit {
    /// Script evaluated on every new document, before the application's own scripts
    pub fn script(&self) -> HarnessResult<String> {
        let mut script = String::from("(() => {\n");
        script.push_str(&format!("  const key = {};\n", js_string(MOCK_STATE_KEY)));
        script.push_str(
            r#"  const load = () => {
    try { return JSON.parse(sessionStorage.getItem(key)) || { calls: [], unmatched: 0 }; }
    catch (_) { return { calls: [], unmatched: 0 }; }
  };
  const state = load();
  const save = () => { try { sessionStorage.setItem(key, JSON.stringify(state)); } catch (_) {} };
  window[key] = state;
"#,
        );

        if let Some(mock) = &self.mock {
            mock.validate()?;
            script.push_str(&format!(
                "  const rules = {};\n  const fallback = {};\n  const unmocked = {};\n",
                serde_json::to_string(&mock.rules)?,
                serde_json::to_string(&mock.fallback)?,
                serde_json::to_string(&MockResponse::unmocked())?,
            ));
            script.push_str(&format!(
                "  const apiName = {};\n  const methodName = {};\n",
                js_string(&mock.api),
                js_string(&mock.method)
            ));
            script.push_str(
                r#"  const matches = (rule, url, method) =>
    (rule.urlContains == null || String(url).includes(rule.urlContains)) &&
    (rule.method == null || String(method).toUpperCase() === rule.method.toUpperCase());
  const api = window[apiName] || {};
  api[methodName] = async (request) => {
    let recorded;
    try { recorded = JSON.parse(JSON.stringify(request)); } catch (_) { recorded = String(request); }
    state.calls.push(recorded === undefined ? null : recorded);
    const url = request && request.url;
    const method = (request && request.method) || 'GET';
    const rule = rules.find((r) => matches(r, url, method));
    const response = rule ? rule.response : fallback;
    if (!response) state.unmatched += 1;
    save();
    return JSON.parse(JSON.stringify(response || unmocked));
  };
  if (!api.cancelRequest) api.cancelRequest = async () => true;
  if (!api.getFilePath) api.getFilePath = (file) => '/mock/' + ((file && file.name) || 'file');
  window[apiName] = api;
"#,
            );
        }

        script.push_str(&format!("  const dialogs = {};\n", serde_json::to_string(&self.dialogs)?));
        script.push_str(
            r#"  const findDialog = (message) => dialogs.find((d) => String(message).includes(d.contains));
  window.prompt = (message, defaultValue) => {
    const d = findDialog(message);
    if (!d || !d.accept) return null;
    return d.text != null ? d.text : (defaultValue != null ? String(defaultValue) : '');
  };
  window.confirm = (message) => { const d = findDialog(message); return !!(d && d.accept); };
  window.alert = () => {};
})();
"#,
        );
        Ok(script)
    }
}

/// Script reading the recorded call log back out of the page
pub fn mock_log_script() -> String {
    format!(
        "(() => {{ const s = window[{key}]; \
         return s ? {{ calls: s.calls, unmatched: s.unmatched }} : {{ calls: [], unmatched: 0 }}; }})()",
        key = js_string(MOCK_STATE_KEY)
    )
}
