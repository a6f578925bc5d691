use anyhow::Result;
use async_trait::async_trait;

use super::{open_login, Scenario};
use crate::config::SuiteConfig;
use crate::driver::{probes, BrowserDriver};
use crate::report::{CaseOutcome, Reporter};

/// Accessibility checks on the login form: labelling, keyboard order,
/// document language, image alt text.
#[derive(Debug)]
pub struct AccessibilityScenario;

#[async_trait]
impl Scenario for AccessibilityScenario {
    fn name(&self) -> &'static str {
        "Login Accessibility"
    }

    fn slug(&self) -> &'static str {
        "accessibility"
    }

    async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        config: &SuiteConfig,
        reporter: &mut Reporter,
    ) -> Result<()> {
        let selectors = config.selectors.clone();

        open_login(driver, config).await?;

        for (case, selector) in [
            ("username field labelled", &selectors.username),
            ("password field labelled", &selectors.password),
        ] {
            let labelled = driver
                .evaluate(&probes::has_accessible_label(selector))
                .await?
                .as_bool()
                .unwrap_or(false);
            reporter.add_result(if labelled {
                CaseOutcome::pass(case, "field has an accessible label")
            } else {
                CaseOutcome::fail(case, "no aria-label, aria-labelledby, or <label> found")
                    .diff("accessible label", "none")
            })?;
        }

        let submit = driver.query(&selectors.submit).await?;
        let named = submit
            .as_ref()
            .map(|e| !e.text.trim().is_empty() || e.has_attr("aria-label"))
            .unwrap_or(false);
        reporter.add_result(if named {
            CaseOutcome::pass("submit has accessible name", "button exposes a readable name")
        } else {
            CaseOutcome::fail("submit has accessible name", "button has no text or aria-label")
        })?;

        // Keyboard order: focus the first field, then Tab through the form.
        driver.click(&selectors.username).await?;
        driver.press("Tab").await?;
        let second = driver.is_focused(&selectors.password).await?;
        driver.press("Tab").await?;
        let third = driver.is_focused(&selectors.submit).await?;
        reporter.add_result(if second && third {
            CaseOutcome::pass(
                "tab order follows the form",
                "Tab visits username, password, submit",
            )
        } else {
            CaseOutcome::fail("tab order follows the form", "Tab leaves the expected order")
                .diff(
                    "username -> password -> submit",
                    format!(
                        "after username, Tab reached {}",
                        if second { "password, then elsewhere" } else { "another element" }
                    ),
                )
        })?;

        let lang = driver
            .evaluate(probes::DOCUMENT_LANG)
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string();
        reporter.add_result(if !lang.is_empty() {
            CaseOutcome::pass(
                "document declares language",
                format!("document language is \"{}\"", lang),
            )
        } else {
            CaseOutcome::fail("document declares language", "html element has no lang attribute")
        })?;

        let missing_alt = driver
            .evaluate(probes::IMAGES_WITHOUT_ALT)
            .await?
            .as_u64()
            .unwrap_or(0);
        reporter.add_result(if missing_alt == 0 {
            CaseOutcome::pass("images carry alt text", "every image has an alt attribute")
        } else {
            CaseOutcome::fail(
                "images carry alt text",
                format!("{} image(s) lack an alt attribute", missing_alt),
            )
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
            Reporter::with_writer("accessibility", Box::new(MemoryWriter::new())).unwrap();
        AccessibilityScenario
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

        assert_eq!(summary.total, 6);
        assert!(summary.all_passed());
        assert_eq!(summary.security_issues, 0);
    }

    #[tokio::test]
    async fn test_missing_labels_fail_both_field_cases() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::defective(&config, vec![Defect::MissingLabels]);
        let summary = run_scenario(&mut driver, &config).await;

        let failed: Vec<&str> = summary
            .failed_cases()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(failed, vec!["username field labelled", "password field labelled"]);
    }

    #[tokio::test]
    async fn test_structural_defects_fail_their_cases() {
        let config = SuiteConfig::default();
        let mut driver = SimulatedDriver::defective(
            &config,
            vec![
                Defect::BrokenTabOrder,
                Defect::MissingLangAttr,
                Defect::MissingAltText,
            ],
        );
        let summary = run_scenario(&mut driver, &config).await;

        let failed: Vec<&str> = summary
            .failed_cases()
            .map(|e| e.case_name.as_str())
            .collect();
        assert_eq!(
            failed,
            vec![
                "tab order follows the form",
                "document declares language",
                "images carry alt text",
            ]
        );
    }
}
