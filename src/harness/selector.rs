//! Element selectors.
//!
//! A selector is written as a single string, Playwright style:
//!
//! | Form | Matches |
//! |------|---------|
//! | `text=Auth` | innermost elements whose visible text is exactly `Auth` |
//! | `placeholder=Key` | elements whose `placeholder` attribute is `Key` |
//! | `title=Edit` | elements whose `title` attribute is `Edit` |
//! | `label=JSON` | form controls labelled `JSON` (`<label>` or `aria-label`) |
//! | `role=button[name="History"]` | elements with that ARIA role and accessible name |
//! | `testid=send` | elements with `data-testid="send"` |
//! | `css=.sidebar` or `.sidebar` | CSS selector |
//!
//! Any selector may end with ` >> nth=N` to pick the N-th (0-based) match
//! explicitly. Without it, a selector that matches more than one element is
//! rejected as ambiguous.
//!
//! Text comparisons are exact after collapsing runs of whitespace.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::types::HarnessError;

const NTH_SEPARATOR: &str = ">>";

/// What a selector matches, without the disambiguation index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// CSS selector
    Css(String),
    /// Exact (whitespace-normalized) visible text
    Text(String),
    /// `placeholder` attribute
    Placeholder(String),
    /// `title` attribute
    Title(String),
    /// Associated `<label>` text or `aria-label`
    Label(String),
    /// ARIA role, explicit or implicit, with optional accessible name
    Role { role: String, name: Option<String> },
    /// `data-testid` attribute
    TestId(String),
}

/// A parsed selector: a target plus an optional explicit match index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub target: Target,
    pub nth: Option<usize>,
}

impl Selector {
    pub fn new(target: Target) -> Self {
        Self { target, nth: None }
    }

    /// Parse the string form
    pub fn parse(input: &str) -> Result<Self, HarnessError> {
        input.parse()
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Target::Css(selector.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Target::Text(text.into()))
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::new(Target::Placeholder(text.into()))
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::new(Target::Title(text.into()))
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::new(Target::Label(text.into()))
    }

    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::new(Target::Role {
            role: role.into(),
            name: name.map(str::to_string),
        })
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::new(Target::TestId(id.into()))
    }

    /// Pick the N-th (0-based) match instead of requiring a unique one
    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    /// JavaScript expression evaluating to an `Array` of every matching element.
    ///
    /// The expression ignores `nth`; index selection happens in the harness so
    /// that ambiguity is detected the same way for every driver.
    pub fn to_js_collection(&self) -> String {
        self.target.to_js_collection()
    }
}

impl Target {
    fn prefix(&self) -> &'static str {
        match self {
            Target::Css(_) => "css",
            Target::Text(_) => "text",
            Target::Placeholder(_) => "placeholder",
            Target::Title(_) => "title",
            Target::Label(_) => "label",
            Target::Role { .. } => "role",
            Target::TestId(_) => "testid",
        }
    }

    /// JavaScript expression evaluating to an `Array` of matching elements
    pub fn to_js_collection(&self) -> String {
        match self {
            Target::Css(css) => format!("Array.from(document.querySelectorAll({}))", js_string(css)),
            Target::Text(text) => format!(
                r#"(() => {{
  const want = {want};
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const skip = ['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'HEAD', 'TITLE'];
  const hits = Array.from(document.querySelectorAll('body *')).filter((el) => {{
    if (skip.includes(el.tagName)) return false;
    if (el.tagName === 'INPUT' && ['button', 'submit', 'reset'].includes(el.type)) return norm(el.value) === want;
    return norm(el.textContent) === want;
  }});
  return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
}})()"#,
                want = js_string(text)
            ),
            Target::Placeholder(value) => attribute_collection("placeholder", value),
            Target::Title(value) => attribute_collection("title", value),
            Target::TestId(value) => attribute_collection("data-testid", value),
            Target::Label(text) => format!(
                r#"(() => {{
  const want = {want};
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const out = [];
  for (const label of document.querySelectorAll('label')) {{
    if (norm(label.textContent) !== want) continue;
    const control = label.htmlFor
      ? document.getElementById(label.htmlFor)
      : label.querySelector('input, textarea, select, button');
    if (control && !out.includes(control)) out.push(control);
  }}
  for (const el of document.querySelectorAll('[aria-label]')) {{
    if (norm(el.getAttribute('aria-label')) === want && !out.includes(el)) out.push(el);
  }}
  return out;
}})()"#,
                want = js_string(text)
            ),
            Target::Role { role, name } => format!(
                r#"(() => {{
  const role = {role};
  const name = {name};
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const implicitRole = (el) => {{
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute('type') || '').toLowerCase();
    if (tag === 'button') return 'button';
    if (tag === 'input' && ['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
    if (tag === 'input' && type === 'checkbox') return 'checkbox';
    if (tag === 'input' && type === 'radio') return 'radio';
    if (tag === 'input' && ['', 'text', 'email', 'search', 'tel', 'url', 'password'].includes(type)) return 'textbox';
    if (tag === 'textarea') return 'textbox';
    if (tag === 'select') return 'combobox';
    if (tag === 'a' && el.hasAttribute('href')) return 'link';
    if (/^h[1-6]$/.test(tag)) return 'heading';
    if (tag === 'img') return 'img';
    return null;
  }};
  const accessibleName = (el) => {{
    const aria = el.getAttribute('aria-label');
    if (aria) return norm(aria);
    if (el.id) {{
      const label = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
      if (label) return norm(label.textContent);
    }}
    if (el.tagName === 'INPUT') return norm(el.value || el.getAttribute('placeholder'));
    return norm(el.textContent);
  }};
  return Array.from(document.querySelectorAll('body *')).filter((el) =>
    (el.getAttribute('role') || implicitRole(el)) === role && (name === null || accessibleName(el) === name));
}})()"#,
                role = js_string(role),
                name = name.as_deref().map(js_string).unwrap_or_else(|| "null".to_string())
            ),
        }
    }
}

fn attribute_collection(attribute: &str, value: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll('[{attribute}]')).filter((el) => el.getAttribute('{attribute}') === {})",
        js_string(value)
    )
}

/// Encode a Rust string as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Collapse runs of whitespace and trim, as the page-side matchers do
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_role(body: &str) -> Result<Target, HarnessError> {
    let body = body.trim();
    let (role, rest) = match body.find('[') {
        Some(pos) => (&body[..pos], Some(&body[pos..])),
        None => (body, None),
    };
    let role = role.trim();
    if role.is_empty() {
        return Err(HarnessError::InvalidScenario(format!("role selector has no role: `role={body}`")));
    }

    let name = match rest {
        None => None,
        Some(filter) => {
            let inner = filter
                .strip_prefix('[')
                .and_then(|f| f.strip_suffix(']'))
                .ok_or_else(|| HarnessError::InvalidScenario(format!("malformed role filter `{filter}`")))?;
            let (key, value) = inner
                .split_once('=')
                .ok_or_else(|| HarnessError::InvalidScenario(format!("malformed role filter `{filter}`")))?;
            if key.trim() != "name" {
                return Err(HarnessError::InvalidScenario(format!(
                    "unsupported role filter `{}` (only `name` is supported)",
                    key.trim()
                )));
            }
            Some(strip_quotes(value).to_string())
        }
    };

    Ok(Target::Role {
        role: role.to_lowercase(),
        name,
    })
}

impl FromStr for Selector {
    type Err = HarnessError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(HarnessError::InvalidScenario("empty selector".to_string()));
        }

        let (body, nth) = match trimmed.rsplit_once(NTH_SEPARATOR) {
            Some((body, suffix)) => {
                let suffix = suffix.trim();
                let index = suffix
                    .strip_prefix("nth=")
                    .and_then(|n| n.trim().parse::<usize>().ok())
                    .ok_or_else(|| {
                        HarnessError::InvalidScenario(format!(
                            "unsupported selector chain `{suffix}` in `{trimmed}` (only `>> nth=N` is allowed)"
                        ))
                    })?;
                if body.contains(NTH_SEPARATOR) {
                    return Err(HarnessError::InvalidScenario(format!(
                        "selector `{trimmed}` chains more than one `>>` segment"
                    )));
                }
                (body.trim(), Some(index))
            }
            None => (trimmed, None),
        };

        let target = match body.split_once('=') {
            Some((prefix, value)) if is_engine(prefix) => {
                let value = strip_quotes(value);
                if value.is_empty() {
                    return Err(HarnessError::InvalidScenario(format!("selector `{body}` has an empty value")));
                }
                match prefix {
                    "css" => Target::Css(value.to_string()),
                    "text" => Target::Text(normalize_text(value)),
                    "placeholder" => Target::Placeholder(value.to_string()),
                    "title" => Target::Title(value.to_string()),
                    "label" => Target::Label(normalize_text(value)),
                    "testid" => Target::TestId(value.to_string()),
                    _ => parse_role(value)?,
                }
            }
            _ => Target::Css(body.to_string()),
        };

        Ok(Selector { target, nth })
    }
}

fn is_engine(prefix: &str) -> bool {
    matches!(prefix, "css" | "text" | "placeholder" | "title" | "label" | "role" | "testid")
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Css(css) => {
                // Plain CSS is written bare unless it would read as another engine
                match css.split_once('=') {
                    Some((prefix, _)) if is_engine(prefix) => write!(f, "css={css}"),
                    _ => write!(f, "{css}"),
                }
            }
            Target::Role { role, name: Some(name) } => write!(f, "role={role}[name=\"{name}\"]"),
            Target::Role { role, name: None } => write!(f, "role={role}"),
            Target::Text(v)
            | Target::Placeholder(v)
            | Target::Title(v)
            | Target::Label(v)
            | Target::TestId(v) => write!(f, "{}={}", self.prefix(), v),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if let Some(n) = self.nth {
            write!(f, " >> nth={n}")?;
        }
        Ok(())
    }
}

impl Serialize for Selector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_engines() {
        assert_eq!(Selector::parse("text=Auth").unwrap(), Selector::text("Auth"));
        assert_eq!(Selector::parse("placeholder=Key").unwrap(), Selector::placeholder("Key"));
        assert_eq!(Selector::parse("title='New Environment'").unwrap(), Selector::title("New Environment"));
        assert_eq!(Selector::parse("label=Raw (Text)").unwrap(), Selector::label("Raw (Text)"));
        assert_eq!(Selector::parse("testid=send").unwrap(), Selector::test_id("send"));
        assert_eq!(Selector::parse(".app-container").unwrap(), Selector::css(".app-container"));
        assert_eq!(
            Selector::parse("input[placeholder='Enter request URL']").unwrap(),
            Selector::css("input[placeholder='Enter request URL']")
        );
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(
            Selector::parse(r#"role=button[name="History"]"#).unwrap(),
            Selector::role("button", Some("History"))
        );
        assert_eq!(Selector::parse("role=Heading").unwrap(), Selector::role("heading", None));
        assert!(Selector::parse("role=button[level=2]").is_err());
        assert!(Selector::parse("role=[name=x]").is_err());
    }

    #[test]
    fn test_parse_nth() {
        let sel = Selector::parse("placeholder=Key >> nth=1").unwrap();
        assert_eq!(sel, Selector::placeholder("Key").nth(1));
        assert!(Selector::parse("text=A >> text=B").is_err());
        assert!(Selector::parse("text=A >> nth=1 >> nth=2").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("text=").is_err());
        assert!(Selector::parse("title=''").is_err());
    }

    #[test]
    fn test_text_is_whitespace_normalized() {
        assert_eq!(Selector::parse("text=  Generate   Code ").unwrap(), Selector::text("Generate Code"));
        assert_eq!(normalize_text("\n Hello \t world "), "Hello world");
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Selector::text("Auth").to_string(), "text=Auth");
        assert_eq!(Selector::role("button", Some("Save")).to_string(), r#"role=button[name="Save"]"#);
        assert_eq!(Selector::placeholder("Value").nth(0).to_string(), "placeholder=Value >> nth=0");
        assert_eq!(Selector::css("[title=\"Edit\"]").to_string(), "[title=\"Edit\"]");
        assert_eq!(Selector::css("text=odd").to_string(), "css=text=odd");
        for raw in ["text=Auth", "placeholder=Key >> nth=2", r#"role=button[name="History"]"#, "css=text=odd"] {
            assert_eq!(Selector::parse(raw).unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_serde_uses_string_form() {
        let sel: Selector = serde_json::from_str(r#""label=JSON""#).unwrap();
        assert_eq!(sel, Selector::label("JSON"));
        assert_eq!(serde_json::to_string(&sel).unwrap(), r#""label=JSON""#);
        assert!(serde_json::from_str::<Selector>(r#""text=""#).is_err());
    }

    #[test]
    fn test_js_collection_escapes_values() {
        let js = Selector::text("say \"hi\"").to_js_collection();
        assert!(js.contains(r#""say \"hi\"""#));
        let js = Selector::placeholder("it's").to_js_collection();
        assert!(js.contains("getAttribute('placeholder') === \"it's\""));
        let js = Selector::role("button", None).to_js_collection();
        assert!(js.contains("const name = null;"));
    }
}
