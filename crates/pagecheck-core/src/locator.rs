//! Role-based element locators.
//!
//! A [`Locator`] finds elements by ARIA role and accessible name. The page
//! side only reports candidates (`{ name, visible }`) for elements carrying
//! the role; name matching happens here so it stays deterministic and
//! testable without a browser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PagecheckError;

/// ARIA roles understood by [`Locator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    Link,
    Heading,
    Button,
    Checkbox,
    Textbox,
    Img,
    Navigation,
    Main,
    List,
    Listitem,
}

impl AriaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Heading => "heading",
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::Textbox => "textbox",
            Self::Img => "img",
            Self::Navigation => "navigation",
            Self::Main => "main",
            Self::List => "list",
            Self::Listitem => "listitem",
        }
    }

    /// CSS selector covering the explicit `role` attribute and the
    /// implicit HTML elements that carry this role.
    pub fn selector(&self) -> String {
        let implicit: &[&str] = match self {
            Self::Link => &["a[href]", "area[href]"],
            Self::Heading => &["h1", "h2", "h3", "h4", "h5", "h6"],
            Self::Button => &[
                "button",
                "input[type=button]",
                "input[type=submit]",
                "input[type=reset]",
                "summary",
            ],
            Self::Checkbox => &["input[type=checkbox]"],
            Self::Textbox => &[
                "textarea",
                "input:not([type])",
                "input[type=text]",
                "input[type=email]",
                "input[type=tel]",
                "input[type=url]",
            ],
            Self::Img => &["img[alt]:not([alt=''])"],
            Self::Navigation => &["nav"],
            Self::Main => &["main"],
            Self::List => &["ul", "ol"],
            Self::Listitem => &["li"],
        };

        let explicit = format!("[role=\"{}\"]", self.as_str());
        // Elements whose explicit role overrides the implicit one must not match.
        let implicit = implicit
            .iter()
            .map(|sel| format!("{sel}:not([role])"));

        std::iter::once(explicit)
            .chain(implicit)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AriaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AriaRole {
    type Err = PagecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link" => Ok(Self::Link),
            "heading" => Ok(Self::Heading),
            "button" => Ok(Self::Button),
            "checkbox" => Ok(Self::Checkbox),
            "textbox" => Ok(Self::Textbox),
            "img" => Ok(Self::Img),
            "navigation" => Ok(Self::Navigation),
            "main" => Ok(Self::Main),
            "list" => Ok(Self::List),
            "listitem" => Ok(Self::Listitem),
            other => Err(PagecheckError::Scenario(format!("Unknown ARIA role: {other}"))),
        }
    }
}

/// An element reported by the page for a role query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    /// Non-empty bounding box and not `visibility: hidden`.
    pub visible: bool,
    /// Excluded from the accessibility tree: `display: none` or
    /// `visibility: hidden` on the element or an ancestor, or inside an
    /// `aria-hidden="true"` subtree. Such elements never match a role query.
    #[serde(default)]
    pub hidden: bool,
}

impl Candidate {
    pub fn new(name: impl Into<String>, visible: bool) -> Self {
        Self {
            name: name.into(),
            visible,
            hidden: false,
        }
    }

    /// An element the accessibility tree leaves out.
    pub fn hidden(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: false,
            hidden: true,
        }
    }
}

/// Finds elements by role and accessible name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub role: AriaRole,
    pub name: String,
    /// Case-sensitive whole-name match instead of a case-insensitive substring.
    #[serde(default)]
    pub exact: bool,
}

impl Locator {
    pub fn by_role(role: AriaRole, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
            exact: false,
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Whether an accessible name satisfies this locator.
    pub fn matches_name(&self, accessible_name: &str) -> bool {
        let wanted = normalize_whitespace(&self.name);
        let actual = normalize_whitespace(accessible_name);
        if self.exact {
            actual == wanted
        } else {
            actual.to_lowercase().contains(&wanted.to_lowercase())
        }
    }

    /// Keep only the accessible candidates whose name matches.
    pub fn resolve(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|c| !c.hidden && self.matches_name(&c.name))
            .collect()
    }

    /// JavaScript expression that evaluates to an array of [`Candidate`]s
    /// for every element on the page carrying this locator's role.
    pub fn query_script(&self) -> String {
        // serde_json produces a valid JS string literal.
        let selector = serde_json::Value::String(self.role.selector()).to_string();
        format!(
            r#"(() => {{
  const textOf = (el) => (el.innerText ?? el.textContent ?? "");
  const nameOf = (el) => {{
    const labelledBy = el.getAttribute("aria-labelledby");
    if (labelledBy) {{
      const parts = labelledBy.split(/\s+/)
        .map((id) => document.getElementById(id))
        .filter(Boolean)
        .map(textOf);
      if (parts.length) return parts.join(" ");
    }}
    const label = el.getAttribute("aria-label");
    if (label && label.trim()) return label;
    if (el.tagName === "IMG" || el.tagName === "AREA") return el.getAttribute("alt") ?? "";
    if (el.tagName === "INPUT" && el.value) return el.value;
    const text = textOf(el);
    if (text.trim()) return text;
    return el.getAttribute("title") ?? "";
  }};
  const visibleOf = (el) => {{
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    return rect.width > 0 && rect.height > 0 && style.visibility !== "hidden";
  }};
  const hiddenOf = (el) => {{
    if (el.closest("[aria-hidden=true]") !== null) return true;
    if (window.getComputedStyle(el).visibility === "hidden") return true;
    for (let node = el; node; node = node.parentElement) {{
      if (window.getComputedStyle(node).display === "none") return true;
    }}
    return false;
  }};
  return Array.from(document.querySelectorAll({selector}))
    .map((el) => ({{ name: nameOf(el), visible: visibleOf(el), hidden: hiddenOf(el) }}));
}})()"#
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "getByRole('{}', {{ name: '{}'", self.role, self.name)?;
        if self.exact {
            f.write_str(", exact: true")?;
        }
        f.write_str(" })")
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
