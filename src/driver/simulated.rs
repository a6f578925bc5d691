use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::probes;
use super::traits::{BrowserDriver, ElementInfo, WaitState};
use crate::config::SuiteConfig;

/// A deliberate flaw injected into the simulated login page.
///
/// A well-behaved page passes every scenario; each defect makes exactly the
/// checks probing for it fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defect {
    /// Echo the submitted username into the page unescaped.
    XssReflection,
    /// Authenticate any credentials carrying a classic `' OR` payload.
    SqlInjectionBypass,
    /// Render the form without a CSRF token field.
    MissingCsrfToken,
    /// Render the password input as `type="text"`.
    UnmaskedPassword,
    /// Drop the labels from the username/password fields.
    MissingLabels,
    /// Do not focus any field on page load.
    NoAutofocus,
    /// Render the logo image without an alt attribute.
    MissingAltText,
    /// Omit the document `lang` attribute.
    MissingLangAttr,
    /// Tab visits password before username.
    BrokenTabOrder,
    /// Content overflows horizontally on viewports narrower than this.
    OverflowBelow(u32),
    /// Put the submitted credentials into the post-login URL.
    CredentialsInUrl,
    /// Show a stack-trace-flavored error message on failed login.
    LeakyErrorMessage,
}

/// In-memory login page implementing [`BrowserDriver`].
///
/// Elements are keyed by the selectors from the suite configuration, login
/// transitions follow the configured credentials, and every driver call is
/// appended to a log the tests can assert on. No browser, no network.
pub struct SimulatedDriver {
    config: SuiteConfig,
    defects: Vec<Defect>,

    current_url: String,
    viewport: (u32, u32),
    loaded: bool,
    logged_in: bool,
    error_visible: bool,
    username_value: String,
    password_value: String,
    focused: Option<Field>,
    xss_fired: bool,
    calls: Vec<String>,
}

/// Focusable pieces of the page, in default tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
    Submit,
}

impl SimulatedDriver {
    /// A page with no defects: every scenario passes against it.
    pub fn well_behaved(config: &SuiteConfig) -> Self {
        Self::defective(config, Vec::new())
    }

    /// A page carrying the given defects.
    pub fn defective(config: &SuiteConfig, defects: Vec<Defect>) -> Self {
        Self {
            config: config.clone(),
            defects,
            current_url: "about:blank".to_string(),
            viewport: (1280, 720),
            loaded: false,
            logged_in: false,
            error_visible: false,
            username_value: String::new(),
            password_value: String::new(),
            focused: None,
            xss_fired: false,
            calls: Vec::new(),
        }
    }

    /// Every driver call made so far, oldest first.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    fn has(&self, defect: Defect) -> bool {
        self.defects.contains(&defect)
    }

    fn overflow_threshold(&self) -> Option<u32> {
        self.defects.iter().find_map(|d| match d {
            Defect::OverflowBelow(width) => Some(*width),
            _ => None,
        })
    }

    fn log(&mut self, call: String) {
        self.calls.push(call);
    }

    fn field_for(&self, selector: &str) -> Option<Field> {
        let s = &self.config.selectors;
        if selector == s.username {
            Some(Field::Username)
        } else if selector == s.password {
            Some(Field::Password)
        } else if selector == s.submit {
            Some(Field::Submit)
        } else {
            None
        }
    }

    fn tab_order(&self) -> [Field; 3] {
        if self.has(Defect::BrokenTabOrder) {
            [Field::Password, Field::Username, Field::Submit]
        } else {
            [Field::Username, Field::Password, Field::Submit]
        }
    }

    fn require_page(&self) -> Result<()> {
        if !self.loaded {
            bail!("No page loaded; navigate first");
        }
        Ok(())
    }

    fn submit(&mut self) {
        let injected = self.username_value.contains("' OR") || self.password_value.contains("' OR");
        let valid = self.username_value == self.config.credentials.username
            && self.password_value == self.config.credentials.password;

        if valid || (self.has(Defect::SqlInjectionBypass) && injected) {
            self.logged_in = true;
            self.error_visible = false;
            let base = self.config.base_url.trim_end_matches('/');
            self.current_url = if self.has(Defect::CredentialsInUrl) {
                format!(
                    "{}/dashboard?username={}&password={}",
                    base, self.username_value, self.password_value
                )
            } else {
                format!("{}/dashboard", base)
            };
        } else {
            self.error_visible = true;
            // Reflected markup executes when the page echoes it raw.
            if self.has(Defect::XssReflection) && self.username_value.contains("onerror") {
                self.xss_fired = true;
            }
        }
    }

    fn error_text(&self) -> String {
        if self.has(Defect::LeakyErrorMessage) {
            "SQLSTATE[28000]: authentication failed for user at AuthController.php:42 \
             (stack trace follows)"
                .to_string()
        } else if self.has(Defect::XssReflection) {
            format!("Login failed for {}", self.username_value)
        } else {
            "Invalid username or password.".to_string()
        }
    }

    fn page_html(&self) -> String {
        let lang = if self.has(Defect::MissingLangAttr) {
            String::new()
        } else {
            " lang=\"en\"".to_string()
        };
        let alt = if self.has(Defect::MissingAltText) {
            String::new()
        } else {
            " alt=\"Company logo\"".to_string()
        };

        let mut body = format!("<img src=\"/logo.png\"{}>", alt);
        body.push_str("<form id=\"login-form\" method=\"post\">");
        if !self.has(Defect::MissingLabels) {
            body.push_str("<label for=\"username\">Username</label>");
        }
        body.push_str("<input id=\"username\" type=\"text\" placeholder=\"Username\">");
        if !self.has(Defect::MissingLabels) {
            body.push_str("<label for=\"password\">Password</label>");
        }
        let password_type = if self.has(Defect::UnmaskedPassword) {
            "text"
        } else {
            "password"
        };
        body.push_str(&format!(
            "<input id=\"password\" type=\"{}\" placeholder=\"Password\">",
            password_type
        ));
        if !self.has(Defect::MissingCsrfToken) {
            body.push_str("<input type=\"hidden\" name=\"csrf_token\" value=\"tok-5f2d9c\">");
        }
        body.push_str("<button type=\"submit\">Sign in</button></form>");

        if self.error_visible {
            let text = self.error_text();
            let rendered = if self.has(Defect::XssReflection) {
                text
            } else {
                escape_html(&text)
            };
            body.push_str(&format!("<div class=\"error-message\">{}</div>", rendered));
        }
        format!("<html{}><body>{}</body></html>", lang, body)
    }

    fn element(&self, selector: &str) -> Option<ElementInfo> {
        let s = &self.config.selectors;

        if selector == s.form {
            return Some(ElementInfo {
                visible: true,
                ..Default::default()
            });
        }
        if selector == s.username {
            return Some(ElementInfo {
                visible: true,
                focused: self.focused == Some(Field::Username),
                value: self.username_value.clone(),
                attributes: attrs(&[
                    ("id", "username"),
                    ("type", "text"),
                    ("placeholder", "Username"),
                ]),
                ..Default::default()
            });
        }
        if selector == s.password {
            let input_type = if self.has(Defect::UnmaskedPassword) {
                "text"
            } else {
                "password"
            };
            return Some(ElementInfo {
                visible: true,
                focused: self.focused == Some(Field::Password),
                value: self.password_value.clone(),
                attributes: attrs(&[
                    ("id", "password"),
                    ("type", input_type),
                    ("placeholder", "Password"),
                ]),
                ..Default::default()
            });
        }
        if selector == s.submit {
            return Some(ElementInfo {
                visible: true,
                focused: self.focused == Some(Field::Submit),
                text: "Sign in".to_string(),
                attributes: attrs(&[("type", "submit")]),
                ..Default::default()
            });
        }
        if selector == s.error {
            if !self.error_visible {
                return None;
            }
            return Some(ElementInfo {
                visible: true,
                text: self.error_text(),
                ..Default::default()
            });
        }
        if selector == s.csrf_token {
            if self.has(Defect::MissingCsrfToken) {
                return None;
            }
            return Some(ElementInfo {
                visible: false,
                value: "tok-5f2d9c".to_string(),
                attributes: attrs(&[("type", "hidden"), ("name", "csrf_token")]),
                ..Default::default()
            });
        }
        if selector == s.success {
            if !self.logged_in {
                return None;
            }
            return Some(ElementInfo {
                visible: true,
                text: "Welcome back".to_string(),
                ..Default::default()
            });
        }
        None
    }

    fn element_height(&self, selector: &str) -> f64 {
        let s = &self.config.selectors;
        if selector == s.submit {
            48.0
        } else if selector == s.username || selector == s.password {
            40.0
        } else if self.element(selector).is_some() {
            20.0
        } else {
            0.0
        }
    }

    fn label_present(&self, selector: &str) -> bool {
        match self.field_for(selector) {
            Some(Field::Username) | Some(Field::Password) => !self.has(Defect::MissingLabels),
            // The button is its own label.
            Some(Field::Submit) => true,
            None => false,
        }
    }
}

#[async_trait]
impl BrowserDriver for SimulatedDriver {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log(format!("navigate {}", url));
        self.current_url = url.to_string();
        self.loaded = true;
        self.logged_in = false;
        self.error_visible = false;
        self.username_value.clear();
        self.password_value.clear();
        self.xss_fired = false;
        self.focused = if self.has(Defect::NoAutofocus) {
            None
        } else {
            Some(Field::Username)
        };
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current_url.clone())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.log(format!("set_viewport {}x{}", width, height));
        self.viewport = (width, height);
        Ok(())
    }

    async fn fill(&mut self, selector: &str, text: &str) -> Result<()> {
        self.require_page()?;
        self.log(format!("fill {}", selector));
        match self.field_for(selector) {
            Some(Field::Username) => {
                self.username_value = text.to_string();
                self.focused = Some(Field::Username);
                Ok(())
            }
            Some(Field::Password) => {
                self.password_value = text.to_string();
                self.focused = Some(Field::Password);
                Ok(())
            }
            _ => bail!("No fillable element matches selector: {}", selector),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.require_page()?;
        self.log(format!("click {}", selector));
        match self.field_for(selector) {
            Some(Field::Submit) => {
                self.focused = Some(Field::Submit);
                self.submit();
                Ok(())
            }
            Some(field) => {
                self.focused = Some(field);
                Ok(())
            }
            None if self.element(selector).is_some() => Ok(()),
            None => bail!("No element matches selector: {}", selector),
        }
    }

    async fn press(&mut self, key: &str) -> Result<()> {
        self.require_page()?;
        self.log(format!("press {}", key));
        match key {
            "Enter" => {
                if self.focused.is_some() {
                    self.submit();
                }
            }
            "Tab" => {
                let order = self.tab_order();
                let next = match self.focused.and_then(|f| order.iter().position(|o| *o == f)) {
                    Some(i) if i + 1 < order.len() => order[i + 1],
                    Some(_) => order[0],
                    None => order[0],
                };
                self.focused = Some(next);
            }
            _ => {}
        }
        Ok(())
    }

    async fn query(&mut self, selector: &str) -> Result<Option<ElementInfo>> {
        self.require_page()?;
        Ok(self.element(selector))
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value> {
        self.require_page()?;

        if script == probes::HORIZONTAL_OVERFLOW {
            let overflows = self
                .overflow_threshold()
                .map(|width| self.viewport.0 < width)
                .unwrap_or(false);
            return Ok(json!(overflows));
        }
        if script == probes::DOCUMENT_LANG {
            let lang = if self.has(Defect::MissingLangAttr) { "" } else { "en" };
            return Ok(json!(lang));
        }
        if script == probes::IMAGES_WITHOUT_ALT {
            let count = if self.has(Defect::MissingAltText) { 1 } else { 0 };
            return Ok(json!(count));
        }
        if script == probes::PAGE_PROTOCOL {
            let protocol = if self.current_url.starts_with("https:") {
                "https:"
            } else {
                "http:"
            };
            return Ok(json!(protocol));
        }
        if script == probes::PAGE_HTML {
            return Ok(json!(self.page_html()));
        }
        if script == probes::xss_executed() {
            return Ok(json!(self.xss_fired));
        }

        // Selector-parameterized probes: rebuild each candidate and compare.
        let s = self.config.selectors.clone();
        for selector in [&s.form, &s.username, &s.password, &s.submit, &s.error] {
            if script == probes::element_height(selector) {
                return Ok(json!(self.element_height(selector)));
            }
            if script == probes::has_accessible_label(selector) {
                return Ok(json!(self.label_present(selector)));
            }
        }

        bail!("Simulated page cannot evaluate: {}", script)
    }

    async fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        _timeout_ms: u64,
    ) -> Result<bool> {
        self.require_page()?;
        let info = self.element(selector);
        let satisfied = match state {
            WaitState::Visible => info.map(|e| e.visible).unwrap_or(false),
            WaitState::Hidden => !info.map(|e| e.visible).unwrap_or(false),
            WaitState::Attached => info.is_some(),
            WaitState::Detached => info.is_none(),
        };
        Ok(satisfied)
    }

    async fn reset(&mut self) -> Result<()> {
        self.log("reset".to_string());
        self.current_url = "about:blank".to_string();
        self.viewport = (1280, 720);
        self.loaded = false;
        self.logged_in = false;
        self.error_visible = false;
        self.username_value.clear();
        self.password_value.clear();
        self.focused = None;
        self.xss_fired = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log("close".to_string());
        Ok(())
    }
}

fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SuiteConfig {
        SuiteConfig::default()
    }

    async fn login(driver: &mut SimulatedDriver, username: &str, password: &str) {
        let config = config();
        driver.navigate(&config.login_url()).await.unwrap();
        driver
            .fill(&config.selectors.username, username)
            .await
            .unwrap();
        driver
            .fill(&config.selectors.password, password)
            .await
            .unwrap();
        driver.click(&config.selectors.submit).await.unwrap();
    }

    #[tokio::test]
    async fn test_valid_login_reaches_dashboard() {
        let config = config();
        let mut driver = SimulatedDriver::well_behaved(&config);
        login(
            &mut driver,
            &config.credentials.username,
            &config.credentials.password,
        )
        .await;

        assert!(driver.is_visible(&config.selectors.success).await.unwrap());
        let url = driver.current_url().await.unwrap();
        assert!(url.ends_with("/dashboard"));
        assert!(!url.contains("password"));
    }

    #[tokio::test]
    async fn test_invalid_login_shows_error_and_stays() {
        let config = config();
        let mut driver = SimulatedDriver::well_behaved(&config);
        login(
            &mut driver,
            &config.credentials.username,
            &config.credentials.wrong_password,
        )
        .await;

        assert!(!driver.is_visible(&config.selectors.success).await.unwrap());
        let error = driver
            .query(&config.selectors.error)
            .await
            .unwrap()
            .expect("error element should appear");
        assert!(error.visible);
        assert_eq!(error.text, "Invalid username or password.");
    }

    #[tokio::test]
    async fn test_enter_submits_from_password_field() {
        let config = config();
        let mut driver = SimulatedDriver::well_behaved(&config);
        driver.navigate(&config.login_url()).await.unwrap();
        driver
            .fill(&config.selectors.username, &config.credentials.username)
            .await
            .unwrap();
        driver
            .fill(&config.selectors.password, &config.credentials.password)
            .await
            .unwrap();
        driver.press("Enter").await.unwrap();

        assert!(driver.is_visible(&config.selectors.success).await.unwrap());
    }

    #[tokio::test]
    async fn test_xss_canary_fires_only_with_defect() {
        let config = config();
        let payload = probes::xss_payload();

        let mut clean = SimulatedDriver::well_behaved(&config);
        login(&mut clean, &payload, "whatever").await;
        assert_eq!(clean.evaluate(&probes::xss_executed()).await.unwrap(), json!(false));
        let html = clean.evaluate(probes::PAGE_HTML).await.unwrap();
        assert!(!html.as_str().unwrap().contains(&payload));

        let mut leaky = SimulatedDriver::defective(&config, vec![Defect::XssReflection]);
        login(&mut leaky, &payload, "whatever").await;
        assert_eq!(leaky.evaluate(&probes::xss_executed()).await.unwrap(), json!(true));
        let html = leaky.evaluate(probes::PAGE_HTML).await.unwrap();
        assert!(html.as_str().unwrap().contains(&payload));
    }

    #[tokio::test]
    async fn test_sql_injection_only_bypasses_with_defect() {
        let config = config();
        let payload = "' OR '1'='1' --";

        let mut clean = SimulatedDriver::well_behaved(&config);
        login(&mut clean, payload, payload).await;
        assert!(!clean.is_visible(&config.selectors.success).await.unwrap());

        let mut broken = SimulatedDriver::defective(&config, vec![Defect::SqlInjectionBypass]);
        login(&mut broken, payload, payload).await;
        assert!(broken.is_visible(&config.selectors.success).await.unwrap());
    }

    #[tokio::test]
    async fn test_password_masking_and_csrf_presence() {
        let config = config();

        let mut clean = SimulatedDriver::well_behaved(&config);
        clean.navigate(&config.login_url()).await.unwrap();
        let password = clean
            .query(&config.selectors.password)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(password.attr("type"), Some("password"));
        assert!(clean
            .query(&config.selectors.csrf_token)
            .await
            .unwrap()
            .is_some());

        let mut broken = SimulatedDriver::defective(
            &config,
            vec![Defect::UnmaskedPassword, Defect::MissingCsrfToken],
        );
        broken.navigate(&config.login_url()).await.unwrap();
        let password = broken
            .query(&config.selectors.password)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(password.attr("type"), Some("text"));
        assert!(broken
            .query(&config.selectors.csrf_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_tab_order_and_autofocus() {
        let config = config();

        let mut clean = SimulatedDriver::well_behaved(&config);
        clean.navigate(&config.login_url()).await.unwrap();
        assert!(clean.is_focused(&config.selectors.username).await.unwrap());
        clean.press("Tab").await.unwrap();
        assert!(clean.is_focused(&config.selectors.password).await.unwrap());
        clean.press("Tab").await.unwrap();
        assert!(clean.is_focused(&config.selectors.submit).await.unwrap());

        let mut broken = SimulatedDriver::defective(
            &config,
            vec![Defect::NoAutofocus, Defect::BrokenTabOrder],
        );
        broken.navigate(&config.login_url()).await.unwrap();
        assert!(!broken.is_focused(&config.selectors.username).await.unwrap());
        broken.press("Tab").await.unwrap();
        // Broken order starts at the password field.
        assert!(broken.is_focused(&config.selectors.password).await.unwrap());
    }

    #[tokio::test]
    async fn test_overflow_depends_on_viewport() {
        let config = config();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::OverflowBelow(600)]);
        driver.navigate(&config.login_url()).await.unwrap();

        driver.set_viewport(375, 667).await.unwrap();
        assert_eq!(
            driver.evaluate(probes::HORIZONTAL_OVERFLOW).await.unwrap(),
            json!(true)
        );

        driver.set_viewport(1920, 1080).await.unwrap();
        assert_eq!(
            driver.evaluate(probes::HORIZONTAL_OVERFLOW).await.unwrap(),
            json!(false)
        );
    }

    #[tokio::test]
    async fn test_credentials_leak_into_url_with_defect() {
        let config = config();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::CredentialsInUrl]);
        login(
            &mut driver,
            &config.credentials.username,
            &config.credentials.password,
        )
        .await;

        let url = driver.current_url().await.unwrap();
        assert!(url.contains(&config.credentials.password));
    }

    #[tokio::test]
    async fn test_call_log_records_interactions() {
        let config = config();
        let mut driver = SimulatedDriver::well_behaved(&config);
        login(
            &mut driver,
            &config.credentials.username,
            &config.credentials.password,
        )
        .await;

        let calls = driver.calls();
        assert!(calls[0].starts_with("navigate "));
        assert!(calls.iter().any(|c| c == &format!("fill {}", config.selectors.username)));
        assert!(calls.iter().any(|c| c == &format!("click {}", config.selectors.submit)));
    }

    #[tokio::test]
    async fn test_interaction_before_navigate_is_an_error() {
        let config = config();
        let mut driver = SimulatedDriver::well_behaved(&config);
        let err = driver
            .fill(&config.selectors.username, "anyone")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("navigate first"));
    }
}
