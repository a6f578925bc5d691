use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Element state that `wait_for` polls toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// Snapshot of the first element matching a selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementInfo {
    pub visible: bool,
    pub focused: bool,
    /// Rendered text content, trimmed.
    pub text: String,
    /// Current input value, empty for non-inputs.
    pub value: String,
    pub attributes: HashMap<String, String>,
}

impl ElementInfo {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

/// Browser-automation interface the scenarios are written against.
///
/// This is the whole surface the suite needs from a browser: navigation,
/// form interaction, element inspection, script evaluation, viewport
/// control, and waiting. One implementation drives Playwright through a
/// Node bridge; another runs an in-memory page model so the suite can be
/// exercised without a browser.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Driver name for banners and logs (e.g. "playwright", "simulated").
    fn name(&self) -> &str;

    /// Load `url` and wait for the page to settle.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current page URL, including any query string.
    async fn current_url(&mut self) -> Result<String>;

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()>;

    /// Replace the content of the input matching `selector`.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<()>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Send a key press (e.g. "Enter", "Tab") to the page.
    async fn press(&mut self, key: &str) -> Result<()>;

    /// Inspect the first element matching `selector`, or `None` when absent.
    async fn query(&mut self, selector: &str) -> Result<Option<ElementInfo>>;

    /// Evaluate a JavaScript expression in the page and return its value.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;

    /// Wait until the first match reaches `state`. Returns false on timeout
    /// rather than erroring, so callers can assert on the outcome.
    async fn wait_for(&mut self, selector: &str, state: WaitState, timeout_ms: u64)
        -> Result<bool>;

    /// Fresh page and session: cookies, storage, and viewport reset.
    async fn reset(&mut self) -> Result<()>;

    /// Shut the driver down and release its resources.
    async fn close(&mut self) -> Result<()>;

    /// Whether the element exists and is visible.
    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        Ok(self
            .query(selector)
            .await?
            .map(|e| e.visible)
            .unwrap_or(false))
    }

    /// Whether the element exists and holds focus.
    async fn is_focused(&mut self, selector: &str) -> Result<bool> {
        Ok(self
            .query(selector)
            .await?
            .map(|e| e.focused)
            .unwrap_or(false))
    }
}
