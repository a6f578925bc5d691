use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use super::{attempt_login, open_login, Scenario};
use crate::config::SuiteConfig;
use crate::driver::{probes, BrowserDriver, WaitState};
use crate::report::{CaseOutcome, Reporter};

/// Security probes against the login form. Every outcome is recorded with the
/// security flag, so failures surface in the report's SECURITY CONCERNS list.
#[derive(Debug)]
pub struct SecurityScenario;

#[async_trait]
impl Scenario for SecurityScenario {
    fn name(&self) -> &'static str {
        "Login Security Probes"
    }

    fn slug(&self) -> &'static str {
        "security"
    }

    async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        config: &SuiteConfig,
        reporter: &mut Reporter,
    ) -> Result<()> {
        let selectors = config.selectors.clone();
        let timeout = config.default_timeout_ms;
        let credentials = config.credentials.clone();

        open_login(driver, config).await?;
        let input_type = driver
            .query(&selectors.password)
            .await?
            .and_then(|e| e.attr("type").map(str::to_string))
            .unwrap_or_default();
        reporter.add_result(if input_type == "password" {
            CaseOutcome::pass("password field masked", "input uses type=\"password\"").security()
        } else {
            CaseOutcome::fail("password field masked", "typed password is readable on screen")
                .security()
                .diff("type=\"password\"", format!("type=\"{}\"", input_type))
        })?;

        // Reflected XSS: submit a payload that sets a window flag if it runs.
        attempt_login(driver, config, &probes::xss_payload(), "irrelevant").await?;
        driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        let executed = driver
            .evaluate(&probes::xss_executed())
            .await?
            .as_bool()
            .unwrap_or(false);
        let html = driver
            .evaluate(probes::PAGE_HTML)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string();
        let reflected = Regex::new(r"<img[^>]*onerror")?.is_match(&html);
        reporter.add_result(if executed {
            CaseOutcome::fail("xss probe", "script executed").security()
        } else if reflected {
            CaseOutcome::fail("xss probe", "payload reflected without encoding").security()
        } else {
            CaseOutcome::pass("xss probe", "payload neither executed nor reflected").security()
        })?;

        let injection = "' OR '1'='1' --";
        attempt_login(driver, config, injection, injection).await?;
        driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        let bypassed = driver.is_visible(&selectors.success).await?;
        reporter.add_result(if bypassed {
            CaseOutcome::fail(
                "sql injection rejected",
                "injected credentials bypassed authentication",
            )
            .security()
        } else {
            CaseOutcome::pass("sql injection rejected", "injected credentials were refused")
                .security()
        })?;

        open_login(driver, config).await?;
        let token = driver.query(&selectors.csrf_token).await?;
        reporter.add_result(if token.is_some() {
            CaseOutcome::pass("csrf token present", "login form carries a CSRF token").security()
        } else {
            CaseOutcome::fail("csrf token present", "login form has no CSRF token").security()
        })?;

        attempt_login(driver, config, &credentials.username, &credentials.password).await?;
        driver
            .wait_for(&selectors.success, WaitState::Visible, timeout)
            .await?;
        let url = driver.current_url().await?;
        let leaked = url.contains(&credentials.password) || url.contains("password=");
        reporter.add_result(if leaked {
            CaseOutcome::fail(
                "credentials kept out of url",
                "submitted credentials appear in the address bar",
            )
            .security()
            .diff("credentials absent from URL", url)
        } else {
            CaseOutcome::pass("credentials kept out of url", "post-login URL is clean").security()
        })?;

        if config.require_https {
            open_login(driver, config).await?;
            let protocol = driver
                .evaluate(probes::PAGE_PROTOCOL)
                .await?
                .as_str()
                .unwrap_or_default()
                .to_string();
            reporter.add_result(if protocol == "https:" {
                CaseOutcome::pass("https enforced", "login page served over HTTPS").security()
            } else {
                CaseOutcome::fail("https enforced", "login page served over plain HTTP")
                    .security()
                    .diff("https:", protocol)
            })?;
        }

        Ok(())
    }
}
