use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

use super::{attempt_login, open_login, Scenario};
use crate::config::SuiteConfig;
use crate::driver::{BrowserDriver, WaitState};
use crate::report::{CaseOutcome, Reporter};

/// Usability checks: focus handling, input hints, and whether a failed login
/// tells the user something useful.
#[derive(Debug)]
pub struct UsabilityScenario;

/// Telltale fragments of internal errors leaking into user-facing text.
const JARGON_PATTERN: &str =
    r"(?i)(sqlstate|stack trace|traceback|exception|syntax error|ora-\d|\.php|\.java|at line \d)";

#[async_trait]
impl Scenario for UsabilityScenario {
    fn name(&self) -> &'static str {
        "Login Usability"
    }

    fn slug(&self) -> &'static str {
        "usability"
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
        let focused = driver.is_focused(&selectors.username).await?;
        reporter.add_result(if focused {
            CaseOutcome::pass(
                "username field receives focus on load",
                "typing can start immediately",
            )
        } else {
            CaseOutcome::fail(
                "username field receives focus on load",
                "user must click before typing",
            )
        })?;

        let mut missing = Vec::new();
        for (label, selector) in [
            ("username", &selectors.username),
            ("password", &selectors.password),
        ] {
            let has_placeholder = driver
                .query(selector)
                .await?
                .and_then(|e| e.attr("placeholder").map(str::to_string))
                .map(|p| !p.trim().is_empty())
                .unwrap_or(false);
            if !has_placeholder {
                missing.push(label);
            }
        }
        reporter.add_result(if missing.is_empty() {
            CaseOutcome::pass(
                "input placeholders guide the user",
                "both fields show a hint",
            )
        } else {
            CaseOutcome::fail(
                "input placeholders guide the user",
                format!("missing placeholder on: {}", missing.join(", ")),
            )
        })?;

        let submit_text = driver
            .query(&selectors.submit)
            .await?
            .map(|e| e.text)
            .unwrap_or_default();
        reporter.add_result(if !submit_text.trim().is_empty() {
            CaseOutcome::pass(
                "submit button clearly labelled",
                format!("button reads \"{}\"", submit_text.trim()),
            )
        } else {
            CaseOutcome::fail("submit button clearly labelled", "button has no visible text")
        })?;

        attempt_login(
            driver,
            config,
            &credentials.username,
            &credentials.wrong_password,
        )
        .await?;
        let error_visible = driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        let error_text = driver
            .query(&selectors.error)
            .await?
            .map(|e| e.text)
            .unwrap_or_default();
        reporter.add_result(if error_visible && !error_text.trim().is_empty() {
            CaseOutcome::pass("failed login explains itself", "a visible message tells the user")
        } else {
            CaseOutcome::fail(
                "failed login explains itself",
                "no readable message after a failed attempt",
            )
        })?;

        let jargon = Regex::new(JARGON_PATTERN)?;
        reporter.add_result(if !jargon.is_match(&error_text) {
            CaseOutcome::pass("error text free of jargon", "message reads as plain language")
        } else {
            CaseOutcome::fail(
                "error text free of jargon",
                "internal details leak into the error message",
            )
            .diff("plain-language message", error_text)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Defect, SimulatedDriver};
    use crate::report::{sink::MemoryWriter, RunSummary};

    async fn run_scenario(driver: &mut SimulatedDriver, config: &SuiteConfig) -> RunSummary {
        let mut reporter =
            Reporter::with_writer("usability", Box::new(MemoryWriter::new())).unwrap();
        UsabilityScenario
            .run(driver, config, &mut reporter)
            .await
            .unwrap();
        reporter.generate_summary().unwrap()
    }

    #[tokio::test]
    async fn test_well_behaved_page_passes_every_case() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::well_behaved(&config);
        let summary = run_scenario(&mut driver, &config).await;

        assert_eq!(summary.total, 5);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_missing_autofocus_fails_the_focus_case() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::NoAutofocus]);
        let summary = run_scenario(&mut driver, &config).await;

        let failed: Vec<&str> = summary
            .failed_cases()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(failed, vec!["username field receives focus on load"]);
    }

    #[tokio::test]
    async fn test_leaky_error_fails_the_jargon_case_with_the_text() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::LeakyErrorMessage]);
        let summary = run_scenario(&mut driver, &config).await;

        let failed: Vec<&str> = summary
            .failed_cases()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(failed, vec!["error text free of jargon"]);

        let jargon = summary
            .entries
            .iter()
            .find(|e| e.case_name == "error text free of jargon")
            .unwrap();
        assert!(jargon.actual.contains("SQLSTATE"));
        assert!(!jargon.is_security_issue());
    }
}
