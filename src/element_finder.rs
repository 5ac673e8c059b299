use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::scraper::PageSession;

/// Classes that mark calendar cells outside the selectable month.
pub const INACTIVE_DAY_CLASSES: [&str; 3] = ["disabled", "old", "new"];

/// How to find one element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "query", rename_all = "snake_case")]
pub enum Locator {
    /// First element matching a CSS selector
    Css(String),
    /// First node matching an XPath expression
    XPath(String),
    /// First visible element matching a CSS selector
    FirstVisible(String),
    /// First `<label>` whose text contains the given fragment
    LabelContaining(String),
    /// First element matching `css` whose trimmed text equals `text`,
    /// skipping elements carrying any of `skip_classes`
    CssWithText {
        css: String,
        text: String,
        skip_classes: Vec<String>,
    },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    pub fn first_visible(selector: impl Into<String>) -> Self {
        Locator::FirstVisible(selector.into())
    }

    pub fn label_containing(text: impl Into<String>) -> Self {
        Locator::LabelContaining(text.into())
    }

    /// A selectable calendar cell showing `day`.
    pub fn day_cell(selector: impl Into<String>, day: u32) -> Self {
        Locator::CssWithText {
            css: selector.into(),
            text: day.to_string(),
            skip_classes: INACTIVE_DAY_CLASSES.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// JavaScript expression evaluating to the element or `null`.
    pub fn resolve_expression(&self) -> String {
        match self {
            Locator::Css(selector) => {
                format!("document.querySelector({})", js_string(selector))
            }
            Locator::XPath(expression) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                js_string(expression)
            ),
            Locator::FirstVisible(selector) => format!(
                "Array.from(document.querySelectorAll({})).find(el => el.offsetParent !== null || el.getClientRects().length > 0) || null",
                js_string(selector)
            ),
            Locator::LabelContaining(text) => format!(
                "Array.from(document.querySelectorAll('label')).find(el => (el.textContent || '').includes({})) || null",
                js_string(text)
            ),
            Locator::CssWithText { css, text, skip_classes } => format!(
                "Array.from(document.querySelectorAll({})).find(el => (el.textContent || '').trim() === {} && !{}.some(c => el.classList.contains(c))) || null",
                js_string(css),
                js_string(text),
                serde_json::Value::from(skip_classes.clone())
            ),
        }
    }

    /// Script that clicks the element if present; evaluates to whether it did.
    pub fn click_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) {{ return false; }} el.click(); return true; }})()",
            self.resolve_expression()
        )
    }

    /// Script that focuses the element if present; evaluates to whether it did.
    pub fn focus_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (!el) {{ return false; }} el.focus(); return true; }})()",
            self.resolve_expression()
        )
    }

    /// Script evaluating to whether the element currently exists.
    pub fn exists_script(&self) -> String {
        format!("(() => {} !== null)()", self.resolve_expression())
    }

    /// Script evaluating to the element's trimmed text, or `null`.
    pub fn text_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; return el ? (el.textContent || '').trim() : null; }})()",
            self.resolve_expression()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css={}", selector),
            Locator::XPath(expression) => write!(f, "xpath={}", expression),
            Locator::FirstVisible(selector) => write!(f, "first-visible={}", selector),
            Locator::LabelContaining(text) => write!(f, "label~={}", text),
            Locator::CssWithText { css, text, .. } => write!(f, "css={} text={}", css, text),
        }
    }
}

/// Encode as a JavaScript string literal; JSON strings are valid JS.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// A named way of finding a UI target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorStrategy {
    pub name: String,
    pub locator: Locator,
}

impl LocatorStrategy {
    pub fn new(name: impl Into<String>, locator: Locator) -> Self {
        Self {
            name: name.into(),
            locator,
        }
    }
}

/// Which strategy, if any, resolved a UI target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LocatorOutcome {
    Resolved { strategy: String, position: usize },
    Exhausted,
}

impl LocatorOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, LocatorOutcome::Resolved { .. })
    }

    /// True when a strategy other than the first one was needed.
    pub fn is_fallback(&self) -> bool {
        matches!(self, LocatorOutcome::Resolved { position, .. } if *position > 0)
    }
}

/// Ordered strategies for one UI target, tried until one resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    pub target: String,
    pub strategies: Vec<LocatorStrategy>,
}

impl LocatorChain {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            strategies: Vec::new(),
        }
    }

    pub fn then(mut self, name: impl Into<String>, locator: Locator) -> Self {
        self.strategies.push(LocatorStrategy::new(name, locator));
        self
    }
}

pub struct ElementFinder;

impl ElementFinder {
    /// Click the first strategy in `chain` that resolves to an element.
    ///
    /// Errors from individual strategies are logged and treated as a miss,
    /// so the next strategy still gets its turn.
    pub async fn click_first(session: &mut dyn PageSession, chain: &LocatorChain) -> LocatorOutcome {
        for (position, strategy) in chain.strategies.iter().enumerate() {
            match session.click(&strategy.locator).await {
                Ok(true) => {
                    debug!("{} resolved by {} ({})", chain.target, strategy.name, strategy.locator);
                    return LocatorOutcome::Resolved {
                        strategy: strategy.name.clone(),
                        position,
                    };
                }
                Ok(false) => {
                    debug!("{}: {} matched nothing", chain.target, strategy.name);
                }
                Err(e) => {
                    warn!("{}: {} failed: {}", chain.target, strategy.name, e);
                }
            }
        }
        LocatorOutcome::Exhausted
    }
}
