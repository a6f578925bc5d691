use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::report::DEFAULT_REPORT_DIR;

/// Suite configuration: target, credentials, selectors, viewports, timeouts.
///
/// Loaded from YAML, optionally overridden from the environment, and passed
/// into scenarios as a value. Scenarios never read shared globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuiteConfig {
    /// Base URL of the application under test.
    pub base_url: String,

    /// Path joined onto `base_url` to reach the login page.
    pub login_path: String,

    pub credentials: Credentials,

    pub selectors: Selectors,

    /// Viewport profiles exercised by the responsive scenario, smallest first.
    pub viewports: Vec<ViewportProfile>,

    /// Default element-wait timeout (ms).
    pub default_timeout_ms: u64,

    /// Where report sinks and machine-readable artifacts land.
    pub report_dir: String,

    /// Record a security failure when the target is served over plain HTTP.
    pub require_https: bool,

    /// Minimum tap-target height (px), checked on the smallest viewport.
    pub min_touch_target_px: u32,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            login_path: "/login".to_string(),
            credentials: Credentials::default(),
            selectors: Selectors::default(),
            viewports: ViewportProfile::standard(),
            default_timeout_ms: 5000,
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            require_https: false,
            min_touch_target_px: 44,
        }
    }
}

impl SuiteConfig {
    /// Load configuration from a YAML file. Missing keys fall back to the
    /// defaults, so a partial file is fine.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: SuiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Apply `AUTHPROBE_*` environment overrides on top of the loaded values.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("AUTHPROBE_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(username) = std::env::var("AUTHPROBE_USERNAME") {
            self.credentials.username = username;
        }
        if let Ok(password) = std::env::var("AUTHPROBE_PASSWORD") {
            self.credentials.password = password;
        }
        if let Ok(dir) = std::env::var("AUTHPROBE_REPORT_DIR") {
            self.report_dir = dir;
        }
    }

    /// Full login page URL: base and path joined without doubled slashes.
    pub fn login_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.login_path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Smallest configured viewport, used for touch-target checks.
    pub fn smallest_viewport(&self) -> Option<&ViewportProfile> {
        self.viewports.iter().min_by_key(|v| v.width)
    }
}

/// Accounts the suite logs in with. The valid pair must exist on the target;
/// the unknown/wrong values must not authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub unknown_username: String,
    pub wrong_password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "testuser".to_string(),
            password: "correct-horse-battery".to_string(),
            unknown_username: "no_such_user".to_string(),
            wrong_password: "definitely-wrong".to_string(),
        }
    }
}

/// CSS selectors for the login page under test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selectors {
    pub form: String,
    pub username: String,
    pub password: String,
    pub submit: String,
    pub error: String,
    /// Element that only exists after a successful login.
    pub success: String,
    pub csrf_token: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            form: "#login-form".to_string(),
            username: "#username".to_string(),
            password: "#password".to_string(),
            submit: "button[type=submit]".to_string(),
            error: ".error-message".to_string(),
            success: "#dashboard".to_string(),
            csrf_token: "input[name=csrf_token]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl ViewportProfile {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }

    /// Mobile, tablet, desktop.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::new("mobile", 375, 667),
            Self::new("tablet", 768, 1024),
            Self::new("desktop", 1920, 1080),
        ]
    }
}
