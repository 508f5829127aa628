//! In-memory page model for running scenarios without a browser.
//!
//! A [`FakeDom`] is a flat list of [`FakeElement`]s plus reactions: closures
//! run when an element is clicked, filled or changed, standing in for the
//! application's event handlers. The request boundary works like the real
//! init script: once a mock is prepared, [`FakeDom::invoke_request`] records
//! the call and answers from the mock's rules.
//!
//! Supported CSS is a comma-separated list of compound selectors
//! (`tag#id.class[attr=value]`); combinators and pseudo-classes are rejected.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{ElementInfo, PageDriver};
use crate::harness::mock::{DialogResponse, MockConfig, MockLog, MockResponse, PageInit, find_dialog};
use crate::harness::selector::{Target, normalize_text};
use crate::harness::{HarnessError, HarnessResult};
use crate::snapshot::{CaptureResult, MockFramebuffer};

const SOURCE_TYPE: &str = "fake";
const SCREEN_WIDTH: u32 = 640;
const SCREEN_HEIGHT: u32 = 480;
const LINE_HEIGHT: u32 = 12;

/// Handler run when an element is interacted with
pub type Reaction = Box<dyn FnMut(&mut FakeDom) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Click,
    Fill,
    Change,
}

/// One element of the fake page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub value: Option<String>,
    pub visible: bool,
    /// Text of an associated `<label>`
    pub label: Option<String>,
    /// Option values of a `<select>`
    pub options: Vec<String>,
    pub disabled: bool,
    /// Becomes visible this long after the page loads
    pub visible_after: Option<Duration>,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn div(class: &str) -> Self {
        Self::new("div").class(class)
    }

    pub fn button(text: &str) -> Self {
        Self::new("button").text(text)
    }

    pub fn input(id: &str) -> Self {
        Self::new("input").id(id).value("")
    }

    pub fn textarea(id: &str) -> Self {
        Self::new("textarea").id(id).value("")
    }

    pub fn select(id: &str, options: &[&str]) -> Self {
        let mut el = Self::new("select").id(id);
        el.options = options.iter().map(|o| o.to_string()).collect();
        el.value = el.options.first().cloned();
        el
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.extend(class.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn placeholder(self, text: &str) -> Self {
        self.attr("placeholder", text)
    }

    pub fn title(self, text: &str) -> Self {
        self.attr("title", text)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn visible_after(mut self, delay: Duration) -> Self {
        self.visible_after = Some(delay);
        self
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self.attributes.get(name).cloned(),
        }
    }

    fn is_visible(&self, loaded_at: Instant) -> bool {
        self.visible && self.visible_after.is_none_or(|delay| loaded_at.elapsed() >= delay)
    }

    fn is_button_input(&self) -> bool {
        self.tag == "input"
            && matches!(self.attributes.get("type").map(String::as_str), Some("button" | "submit" | "reset"))
    }

    fn implicit_role(&self) -> Option<&'static str> {
        let input_type = self.attributes.get("type").map(String::as_str).unwrap_or("");
        match self.tag.as_str() {
            "button" => Some("button"),
            "input" if self.is_button_input() || input_type == "image" => Some("button"),
            "input" if input_type == "checkbox" => Some("checkbox"),
            "input" if input_type == "radio" => Some("radio"),
            "input" if matches!(input_type, "" | "text" | "email" | "search" | "tel" | "url" | "password") => {
                Some("textbox")
            }
            "textarea" => Some("textbox"),
            "select" => Some("combobox"),
            "a" if self.attributes.contains_key("href") => Some("link"),
            "img" => Some("img"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some("heading"),
            _ => None,
        }
    }

    fn accessible_name(&self) -> String {
        if let Some(aria) = self.attributes.get("aria-label") {
            return normalize_text(aria);
        }
        if let Some(label) = &self.label {
            return normalize_text(label);
        }
        if self.tag == "input" {
            let value = self.value.clone().filter(|v| !v.is_empty());
            return normalize_text(&value.or_else(|| self.attributes.get("placeholder").cloned()).unwrap_or_default());
        }
        normalize_text(&self.text)
    }

    fn matches(&self, target: &Target) -> HarnessResult<bool> {
        Ok(match target {
            Target::Css(css) => css_matches(css, self)?,
            Target::Text(want) => {
                if self.is_button_input() {
                    normalize_text(self.value.as_deref().unwrap_or("")) == *want
                } else {
                    normalize_text(&self.text) == *want
                }
            }
            Target::Placeholder(want) => self.attributes.get("placeholder") == Some(want),
            Target::Title(want) => self.attributes.get("title") == Some(want),
            Target::TestId(want) => self.attributes.get("data-testid") == Some(want),
            Target::Label(want) => {
                self.label.as_deref().map(normalize_text).as_ref() == Some(want)
                    || self.attributes.get("aria-label").map(|l| normalize_text(l)).as_ref() == Some(want)
            }
            Target::Role { role, name } => {
                let own_role = self.attributes.get("role").map(String::as_str).or(self.implicit_role());
                own_role == Some(role.as_str()) && name.as_ref().is_none_or(|n| self.accessible_name() == *n)
            }
        })
    }
}

/// State of the fake page, shared between the driver and test code
pub struct FakeDom {
    /// Elements restored on every navigation
    template: Vec<FakeElement>,
    elements: Vec<FakeElement>,
    reactions: Vec<(Trigger, String, Reaction)>,
    url: String,
    loaded_at: Instant,
    unreachable: bool,
    fail_screenshots: bool,
    mock: Option<MockConfig>,
    dialogs: Vec<DialogResponse>,
    mock_log: MockLog,
    navigations: usize,
    closed: bool,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    pub fn new() -> Self {
        Self {
            template: Vec::new(),
            elements: Vec::new(),
            reactions: Vec::new(),
            url: "about:blank".to_string(),
            loaded_at: Instant::now(),
            unreachable: false,
            fail_screenshots: false,
            mock: None,
            dialogs: Vec::new(),
            mock_log: MockLog::default(),
            navigations: 0,
            closed: false,
        }
    }

    /// Add an element to the page loaded by every navigation
    pub fn element(mut self, element: FakeElement) -> Self {
        self.template.push(element);
        self
    }

    pub fn on_click(self, id: &str, reaction: impl FnMut(&mut FakeDom) + Send + 'static) -> Self {
        self.reaction(Trigger::Click, id, reaction)
    }

    pub fn on_fill(self, id: &str, reaction: impl FnMut(&mut FakeDom) + Send + 'static) -> Self {
        self.reaction(Trigger::Fill, id, reaction)
    }

    pub fn on_change(self, id: &str, reaction: impl FnMut(&mut FakeDom) + Send + 'static) -> Self {
        self.reaction(Trigger::Change, id, reaction)
    }

    fn reaction(mut self, trigger: Trigger, id: &str, reaction: impl FnMut(&mut FakeDom) + Send + 'static) -> Self {
        self.reactions.push((trigger, id.to_string(), Box::new(reaction)));
        self
    }

    /// Make every navigation fail as if the server were down
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    pub fn element_by_id(&self, id: &str) -> Option<&FakeElement> {
        self.elements.iter().find(|el| el.id.as_deref() == Some(id))
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut FakeElement> {
        self.elements.iter_mut().find(|el| el.id.as_deref() == Some(id))
    }

    pub fn value_of(&self, id: &str) -> Option<String> {
        self.element_by_id(id).and_then(|el| el.value.clone())
    }

    pub fn set_value(&mut self, id: &str, value: &str) {
        if let Some(el) = self.element_by_id_mut(id) {
            el.value = Some(value.to_string());
        }
    }

    pub fn set_text(&mut self, id: &str, text: &str) {
        if let Some(el) = self.element_by_id_mut(id) {
            el.text = text.to_string();
        }
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(el) = self.element_by_id_mut(id) {
            el.visible = visible;
            el.visible_after = None;
        }
    }

    /// Insert an element into the current page (gone after the next navigation)
    pub fn insert(&mut self, element: FakeElement) {
        self.elements.push(element);
    }

    pub fn remove(&mut self, id: &str) {
        self.elements.retain(|el| el.id.as_deref() != Some(id));
    }

    /// Call the request boundary the way the application would.
    ///
    /// Returns `None` when no mock is installed (the capability does not exist).
    pub fn invoke_request(&mut self, request: serde_json::Value) -> Option<MockResponse> {
        let mock = self.mock.as_ref()?;
        let url = request.get("url").and_then(|v| v.as_str()).unwrap_or_default();
        let method = request.get("method").and_then(|v| v.as_str()).unwrap_or("GET");
        let response = mock.respond(url, method).cloned();
        if response.is_none() {
            self.mock_log.unmatched += 1;
        }
        self.mock_log.calls.push(request);
        Some(response.unwrap_or_else(MockResponse::unmocked))
    }

    /// `window.prompt` as seen by the application
    pub fn prompt(&self, message: &str) -> Option<String> {
        find_dialog(&self.dialogs, message)
            .filter(|d| d.accept)
            .map(|d| d.text.clone().unwrap_or_default())
    }

    /// `window.confirm` as seen by the application
    pub fn confirm(&self, message: &str) -> bool {
        find_dialog(&self.dialogs, message).is_some_and(|d| d.accept)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn navigations(&self) -> usize {
        self.navigations
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn mock_calls(&self) -> &[serde_json::Value] {
        &self.mock_log.calls
    }

    fn matching(&self, target: &Target) -> HarnessResult<Vec<usize>> {
        let mut hits = Vec::new();
        for (index, el) in self.elements.iter().enumerate() {
            if el.matches(target)? {
                hits.push(index);
            }
        }
        Ok(hits)
    }

    fn resolve(&self, target: &Target, index: usize) -> HarnessResult<usize> {
        self.matching(target)?
            .get(index)
            .copied()
            .ok_or_else(|| HarnessError::Browser(format!("`{target}`: element is no longer attached")))
    }

    fn fire(&mut self, trigger: Trigger, element: usize) {
        let Some(id) = self.elements.get(element).and_then(|el| el.id.clone()) else {
            return;
        };
        let mut reactions = std::mem::take(&mut self.reactions);
        for (t, rid, reaction) in reactions.iter_mut() {
            if *t == trigger && *rid == id {
                reaction(self);
            }
        }
        // Keep reactions registered while running
        reactions.append(&mut self.reactions);
        self.reactions = reactions;
    }

    fn render(&self, full_page: bool) -> HarnessResult<CaptureResult> {
        if self.fail_screenshots {
            return Err(HarnessError::Browser("screenshot capture failed".to_string()));
        }
        let visible: Vec<&FakeElement> = self.elements.iter().filter(|el| el.is_visible(self.loaded_at)).collect();
        let content_height = (visible.len() as u32 + 2) * LINE_HEIGHT;
        let height = if full_page { content_height.max(SCREEN_HEIGHT) } else { SCREEN_HEIGHT };

        let mut fb = MockFramebuffer::with_color(SCREEN_WIDTH, height, [255, 255, 255]);
        fb.draw_rect(0, 0, SCREEN_WIDTH, LINE_HEIGHT, [40, 44, 52]);
        fb.draw_text(2, 2, &self.url, [255, 255, 255], [40, 44, 52]);
        for (row, el) in visible.iter().enumerate() {
            let line = match &el.value {
                Some(value) => format!("<{}> {} [{}]", el.tag, normalize_text(&el.text), value),
                None => format!("<{}> {}", el.tag, normalize_text(&el.text)),
            };
            fb.draw_text(4, (row as u32 + 2) * LINE_HEIGHT, &line, [0, 0, 0], [255, 255, 255]);
        }
        Ok(fb.capture(Some(serde_json::json!({
            "url": self.url,
            "elements": visible.len(),
            "full_page": full_page,
        })))?)
    }
}

fn css_matches(selector: &str, el: &FakeElement) -> HarnessResult<bool> {
    for part in split_selector_list(selector) {
        if compound_matches(part.trim(), el)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Split on commas outside brackets and quotes
fn split_selector_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut depth, mut quote, mut start) = (0usize, None, 0);
    for (i, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts
}

fn unsupported(selector: &str) -> HarnessError {
    HarnessError::InvalidScenario(format!("CSS selector `{selector}` is not supported by the fake driver"))
}

fn compound_matches(selector: &str, el: &FakeElement) -> HarnessResult<bool> {
    let chars: Vec<char> = selector.chars().collect();
    if chars.is_empty() {
        return Err(unsupported(selector));
    }
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    let read_ident = |start: usize| {
        let mut end = start;
        while end < chars.len() && is_ident(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect::<String>(), end)
    };

    let mut pos = 0;
    let mut matched = true;
    if chars[0] == '*' {
        pos = 1;
    } else if is_ident(chars[0]) {
        let (tag, end) = read_ident(0);
        matched &= el.tag.eq_ignore_ascii_case(&tag);
        pos = end;
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                let (id, end) = read_ident(pos + 1);
                if id.is_empty() {
                    return Err(unsupported(selector));
                }
                matched &= el.id.as_deref() == Some(id.as_str());
                pos = end;
            }
            '.' => {
                let (class, end) = read_ident(pos + 1);
                if class.is_empty() {
                    return Err(unsupported(selector));
                }
                matched &= el.classes.contains(&class);
                pos = end;
            }
            '[' => {
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| unsupported(selector))?;
                let inner: String = chars[pos + 1..close].iter().collect();
                matched &= match inner.split_once('=') {
                    None => el.attribute(inner.trim()).is_some(),
                    Some((name, value)) => {
                        let value = value.trim();
                        let value = value
                            .strip_prefix(['\'', '"'])
                            .and_then(|v| v.strip_suffix(['\'', '"']))
                            .unwrap_or(value);
                        el.attribute(name.trim()).as_deref() == Some(value)
                    }
                };
                pos = close + 1;
            }
            _ => return Err(unsupported(selector)),
        }
    }
    Ok(matched)
}

/// Driver over a shared [`FakeDom`]
pub struct FakeDriver {
    dom: Arc<Mutex<FakeDom>>,
}

impl FakeDriver {
    pub fn new(dom: FakeDom) -> Self {
        Self {
            dom: Arc::new(Mutex::new(dom)),
        }
    }

    /// Shared handle for inspecting the page after a run
    pub fn handle(&self) -> Arc<Mutex<FakeDom>> {
        Arc::clone(&self.dom)
    }

    fn dom(&self) -> HarnessResult<MutexGuard<'_, FakeDom>> {
        self.dom
            .lock()
            .map_err(|_| HarnessError::Browser("fake page state is poisoned".to_string()))
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    fn source_type(&self) -> &str {
        SOURCE_TYPE
    }

    async fn prepare(&mut self, init: &PageInit) -> HarnessResult<()> {
        // Same validation the browser init script applies
        init.script()?;
        let mut dom = self.dom()?;
        dom.mock = init.mock.clone();
        dom.dialogs = init.dialogs.clone();
        Ok(())
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> HarnessResult<()> {
        let mut dom = self.dom()?;
        if dom.unreachable {
            return Err(HarnessError::Navigation {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        dom.url = url.to_string();
        dom.elements = dom.template.clone();
        dom.loaded_at = Instant::now();
        dom.navigations += 1;
        Ok(())
    }

    async fn current_url(&mut self) -> HarnessResult<String> {
        Ok(self.dom()?.url.clone())
    }

    async fn query(&mut self, target: &Target) -> HarnessResult<Vec<ElementInfo>> {
        let dom = self.dom()?;
        let hits = dom.matching(target)?;
        Ok(hits
            .into_iter()
            .map(|i| {
                let el = &dom.elements[i];
                ElementInfo {
                    tag: el.tag.clone(),
                    visible: el.is_visible(dom.loaded_at),
                    text: normalize_text(&el.text),
                    value: el.value.clone(),
                }
            })
            .collect())
    }

    async fn fill(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()> {
        let mut dom = self.dom()?;
        let element = dom.resolve(target, index)?;
        let el = &mut dom.elements[element];
        if !matches!(el.tag.as_str(), "input" | "textarea") {
            return Err(HarnessError::Browser(format!("`{target}`: element <{}> cannot be filled", el.tag)));
        }
        if el.disabled {
            return Err(HarnessError::Browser(format!("`{target}`: element is disabled or read-only")));
        }
        el.value = Some(value.to_string());
        dom.fire(Trigger::Fill, element);
        Ok(())
    }

    async fn click(&mut self, target: &Target, index: usize) -> HarnessResult<()> {
        let mut dom = self.dom()?;
        let element = dom.resolve(target, index)?;
        if dom.elements[element].disabled {
            return Err(HarnessError::Browser(format!("`{target}`: element is disabled")));
        }
        dom.fire(Trigger::Click, element);
        Ok(())
    }

    async fn select_option(&mut self, target: &Target, index: usize, value: &str) -> HarnessResult<()> {
        let mut dom = self.dom()?;
        let element = dom.resolve(target, index)?;
        let el = &mut dom.elements[element];
        if el.tag != "select" {
            return Err(HarnessError::Browser(format!("`{target}`: element <{}> is not a <select>", el.tag)));
        }
        if !el.options.iter().any(|o| o == value) {
            return Err(HarnessError::Browser(format!(
                "`{target}`: no option {value:?} (have {})",
                el.options.join(", ")
            )));
        }
        el.value = Some(value.to_string());
        dom.fire(Trigger::Change, element);
        Ok(())
    }

    async fn screenshot(&mut self, full_page: bool) -> HarnessResult<CaptureResult> {
        self.dom()?.render(full_page)
    }

    async fn mock_log(&mut self) -> HarnessResult<MockLog> {
        Ok(self.dom()?.mock_log.clone())
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.dom()?.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el() -> FakeElement {
        FakeElement::input("url")
            .class("url-input wide")
            .placeholder("Enter request URL")
            .attr("type", "text")
    }

    #[test]
    fn test_compound_css() {
        let el = el();
        assert!(css_matches("input", &el).unwrap());
        assert!(css_matches("#url", &el).unwrap());
        assert!(css_matches("input.url-input.wide", &el).unwrap());
        assert!(css_matches("input[placeholder='Enter request URL']", &el).unwrap());
        assert!(css_matches("textarea, input[type=text]", &el).unwrap());
        assert!(!css_matches("textarea", &el).unwrap());
        assert!(!css_matches("input[type=file]", &el).unwrap());
        assert!(css_matches(".sidebar .item", &el).is_err());
        assert!(css_matches("input:focus", &el).is_err());
    }

    #[test]
    fn test_target_matching() {
        let button = FakeElement::button("  Send ").id("send");
        assert!(button.matches(&Target::Text("Send".to_string())).unwrap());
        assert!(button
            .matches(&Target::Role {
                role: "button".to_string(),
                name: Some("Send".to_string())
            })
            .unwrap());

        let input = el();
        assert!(input
            .matches(&Target::Role {
                role: "textbox".to_string(),
                name: Some("Enter request URL".to_string())
            })
            .unwrap());
        assert!(!input.matches(&Target::Text("Send".to_string())).unwrap());

        let radio = FakeElement::new("input").attr("type", "radio").label("Raw (Text)");
        assert!(radio.matches(&Target::Label("Raw (Text)".to_string())).unwrap());
    }

    #[tokio::test]
    async fn test_page_edits_from_reactions() {
        let dom = FakeDom::new()
            .element(FakeElement::button("Save").id("save"))
            .element(FakeElement::button("Delete").id("delete").disabled())
            .element(FakeElement::div("toast").id("toast").hidden())
            .element(FakeElement::div("status").id("status").text("idle"))
            .on_click("save", |dom| {
                dom.set_visible("toast", true);
                dom.set_text("status", "saved");
                dom.remove("delete");
            });
        let mut driver = FakeDriver::new(dom);
        driver.navigate("http://localhost:5173", Duration::from_secs(1)).await.unwrap();

        let delete = Target::Text("Delete".to_string());
        assert!(driver.click(&delete, 0).await.is_err());

        driver.click(&Target::Text("Save".to_string()), 0).await.unwrap();
        let toast = driver.query(&Target::Css(".toast".to_string())).await.unwrap();
        assert!(toast[0].visible);
        assert_eq!(driver.query(&Target::Text("saved".to_string())).await.unwrap().len(), 1);
        assert!(driver.query(&delete).await.unwrap().is_empty());

        // Navigation restores the original page
        driver.navigate("http://localhost:5173", Duration::from_secs(1)).await.unwrap();
        assert_eq!(driver.query(&delete).await.unwrap().len(), 1);
        assert_eq!(driver.handle().lock().unwrap().navigations(), 2);
    }

    #[test]
    fn test_invoke_request_without_mock() {
        let mut dom = FakeDom::new();
        assert!(dom.invoke_request(serde_json::json!({"url": "x", "method": "GET"})).is_none());
        assert!(dom.mock_calls().is_empty());
    }

    #[test]
    fn test_invoke_request_records_unmatched() {
        let mut dom = FakeDom::new();
        dom.mock = Some(MockConfig::default().rule(crate::harness::mock::MockRule {
            url_contains: Some("/users".to_string()),
            method: None,
            response: MockResponse::new(200, "ok"),
        }));

        let response = dom
            .invoke_request(serde_json::json!({"url": "https://x.test/other", "method": "GET"}))
            .unwrap();
        assert_eq!(response.status, 0);
        assert_eq!(dom.mock_log.unmatched, 1);
        assert_eq!(dom.mock_calls().len(), 1);
    }

    #[test]
    fn test_prompt_uses_dialog_responses() {
        let mut dom = FakeDom::new();
        dom.dialogs = vec![DialogResponse::accept_prompt("environment name", "Test Env")];
        assert_eq!(dom.prompt("Enter environment name"), Some("Test Env".to_string()));
        assert_eq!(dom.prompt("Rename collection"), None);
        assert!(!dom.confirm("Delete?"));
    }
}
