use anyhow::Result;
use async_trait::async_trait;

use super::{attempt_login, open_login, Scenario};
use crate::config::SuiteConfig;
use crate::driver::{BrowserDriver, WaitState};
use crate::report::{CaseOutcome, Reporter};

/// Core login flow: the form renders, good credentials get in, bad ones stay
/// out, and the keyboard path works.
#[derive(Debug)]
pub struct FunctionalScenario;

#[async_trait]
impl Scenario for FunctionalScenario {
    fn name(&self) -> &'static str {
        "Login Functional Flow"
    }

    fn slug(&self) -> &'static str {
        "functional"
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
        let form_visible = driver
            .wait_for(&selectors.form, WaitState::Visible, timeout)
            .await?;
        reporter.add_result(if form_visible {
            CaseOutcome::pass(
                "page loads",
                format!("login form visible at {}", config.login_url()),
            )
        } else {
            CaseOutcome::fail("page loads", "login form did not become visible")
                .diff("login form visible", "form absent or hidden")
        })?;

        attempt_login(driver, config, &credentials.username, &credentials.password).await?;
        let signed_in = driver
            .wait_for(&selectors.success, WaitState::Visible, timeout)
            .await?;
        let landed_at = driver.current_url().await?;
        reporter.add_result(if signed_in {
            CaseOutcome::pass("valid login", format!("signed in, landed at {}", landed_at))
        } else {
            CaseOutcome::fail("valid login", "success element never appeared")
                .diff("post-login page", format!("still at {}", landed_at))
        })?;

        attempt_login(
            driver,
            config,
            &credentials.username,
            &credentials.wrong_password,
        )
        .await?;
        let error_shown = driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        reporter.add_result(if error_shown {
            CaseOutcome::pass("invalid password rejected", "error message shown")
        } else {
            CaseOutcome::fail(
                "invalid password rejected",
                "no visible error after wrong password",
            )
            .diff("visible error message", "no error element")
        })?;

        attempt_login(
            driver,
            config,
            &credentials.unknown_username,
            &credentials.password,
        )
        .await?;
        let error_shown = driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        reporter.add_result(if error_shown {
            CaseOutcome::pass("unknown username rejected", "error message shown")
        } else {
            CaseOutcome::fail(
                "unknown username rejected",
                "no visible error for unknown account",
            )
            .diff("visible error message", "no error element")
        })?;

        attempt_login(driver, config, "", &credentials.password).await?;
        driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        let signed_in = driver.is_visible(&selectors.success).await?;
        reporter.add_result(if !signed_in {
            CaseOutcome::pass("empty username rejected", "submission did not sign in")
        } else {
            CaseOutcome::fail("empty username rejected", "signed in with empty username")
        })?;

        attempt_login(driver, config, &credentials.username, "").await?;
        driver
            .wait_for(&selectors.error, WaitState::Visible, timeout)
            .await?;
        let signed_in = driver.is_visible(&selectors.success).await?;
        reporter.add_result(if !signed_in {
            CaseOutcome::pass("empty password rejected", "submission did not sign in")
        } else {
            CaseOutcome::fail("empty password rejected", "signed in with empty password")
        })?;

        open_login(driver, config).await?;
        driver
            .fill(&selectors.username, &credentials.username)
            .await?;
        driver
            .fill(&selectors.password, &credentials.password)
            .await?;
        driver.press("Enter").await?;
        let signed_in = driver
            .wait_for(&selectors.success, WaitState::Visible, timeout)
            .await?;
        reporter.add_result(if signed_in {
            CaseOutcome::pass("enter key submits", "Enter in the password field signed in")
        } else {
            CaseOutcome::fail("enter key submits", "Enter did not submit the form")
                .diff("form submitted on Enter", "no navigation observed")
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::report::{sink::MemoryWriter, RunSummary};

    async fn run_scenario(driver: &mut SimulatedDriver, config: &SuiteConfig) -> RunSummary {
        let mut reporter =
            Reporter::with_writer("functional", Box::new(MemoryWriter::new())).unwrap();
        FunctionalScenario
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

        assert_eq!(summary.total, 7);
        assert_eq!(summary.failed, 0);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_case_names_in_recording_order() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::well_behaved(&config);
        let summary = run_scenario(&mut driver, &config).await;

        let names: Vec<&str> = summary
            .entries
            .iter()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "page loads",
                "valid login",
                "invalid password rejected",
                "unknown username rejected",
                "empty username rejected",
                "empty password rejected",
                "enter key submits",
            ]
        );
    }
}
