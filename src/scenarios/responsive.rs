use anyhow::Result;
use async_trait::async_trait;

use super::Scenario;
use crate::config::SuiteConfig;
use crate::driver::{probes, BrowserDriver, WaitState};
use crate::report::{CaseOutcome, Reporter};

/// Layout checks across the configured viewport profiles, plus a touch-target
/// check on the smallest one.
#[derive(Debug)]
pub struct ResponsiveScenario;

#[async_trait]
impl Scenario for ResponsiveScenario {
    fn name(&self) -> &'static str {
        "Login Responsive Layout"
    }

    fn slug(&self) -> &'static str {
        "responsive"
    }

    async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        config: &SuiteConfig,
        reporter: &mut Reporter,
    ) -> Result<()> {
        let selectors = config.selectors.clone();
        let timeout = config.default_timeout_ms;

        for viewport in &config.viewports {
            // Viewport must be set before the page renders.
            driver.reset().await?;
            driver.set_viewport(viewport.width, viewport.height).await?;
            driver.navigate(&config.login_url()).await?;

            let form_visible = driver
                .wait_for(&selectors.form, WaitState::Visible, timeout)
                .await?;
            let case = format!(
                "form visible on {} ({}x{})",
                viewport.name, viewport.width, viewport.height
            );
            reporter.add_result(if form_visible {
                CaseOutcome::pass(case, "login form renders at this size")
            } else {
                CaseOutcome::fail(case, "login form missing or hidden at this size")
            })?;

            let overflows = driver
                .evaluate(probes::HORIZONTAL_OVERFLOW)
                .await?
                .as_bool()
                .unwrap_or(false);
            let case = format!("no horizontal overflow on {}", viewport.name);
            reporter.add_result(if !overflows {
                CaseOutcome::pass(case, "content fits the viewport width")
            } else {
                CaseOutcome::fail(case, "content forces horizontal scrolling").diff(
                    format!("content within {}px", viewport.width),
                    "scrollWidth exceeds viewport",
                )
            })?;
        }

        if let Some(smallest) = config.smallest_viewport() {
            driver.reset().await?;
            driver.set_viewport(smallest.width, smallest.height).await?;
            driver.navigate(&config.login_url()).await?;

            let height = driver
                .evaluate(&probes::element_height(&selectors.submit))
                .await?
                .as_f64()
                .unwrap_or(0.0);
            let minimum = f64::from(config.min_touch_target_px);
            let case = format!("submit touch target on {}", smallest.name);
            reporter.add_result(if height >= minimum {
                CaseOutcome::pass(case, format!("submit is {:.0}px tall", height))
            } else {
                CaseOutcome::fail(case, "submit button is too small to tap reliably").diff(
                    format!("height >= {}px", config.min_touch_target_px),
                    format!("{:.0}px", height),
                )
            })?;
        }

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
            Reporter::with_writer("responsive", Box::new(MemoryWriter::new())).unwrap();
        ResponsiveScenario
            .run(driver, config, &mut reporter)
            .await
            .unwrap();
        reporter.generate_summary().unwrap()
    }

    #[tokio::test]
    async fn test_well_behaved_page_fits_every_profile() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::well_behaved(&config);
        let summary = run_scenario(&mut driver, &config).await;

        // Two cases per profile plus the touch-target check.
        assert_eq!(summary.total, 7);
        assert!(summary.all_passed());
    }

    #[tokio::test]
    async fn test_overflow_defect_fails_only_narrow_profiles() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::OverflowBelow(600)]);
        let summary = run_scenario(&mut driver, &config).await;

        let failed: Vec<&str> = summary
            .failed_cases()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(failed, vec!["no horizontal overflow on mobile"]);
    }

    #[tokio::test]
    async fn test_touch_target_threshold_comes_from_config() {
        let mut config = SuiteConfig::default();
        config.min_touch_target_px = 60;
        let mut driver = SimulatedDriver::well_behaved(&config);
        let summary = run_scenario(&mut driver, &config).await;

        let touch = summary
            .entries
            .iter()
            .find(|e| e.case_name == "submit touch target on mobile")
            .unwrap();
        assert!(!touch.passed);
        assert_eq!(touch.expected, "height >= 60px");
    }
}
