use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::SuiteConfig;
use crate::driver::BrowserDriver;
use crate::report::{json, junit, CaseOutcome, Reporter, RunSummary};
use crate::scenarios::Scenario;

/// Aggregate outcome of one suite session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteOutcome {
    pub session_id: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub interrupted: bool,
    pub scenarios: Vec<RunSummary>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub security_issues: usize,
}

impl SuiteOutcome {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Sequences scenarios against one driver session.
///
/// The runner owns the reporter lifecycle: one reporter per scenario,
/// constructed before the scenario runs and finalized after it, so every
/// scenario gets its summary even when it aborts or the run is interrupted.
pub struct SuiteRunner {
    config: SuiteConfig,
    session_id: String,
    continue_on_failure: bool,
    interrupt: Arc<AtomicBool>,
}

impl SuiteRunner {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
            continue_on_failure: true,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a failed scenario stops the run. Defaults to true.
    pub fn continue_on_failure(mut self, yes: bool) -> Self {
        self.continue_on_failure = yes;
        self
    }

    /// Shared flag checked between scenarios, meant to be set from a Ctrl-C
    /// handler. The in-flight scenario still gets its summary.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        scenarios: &[Box<dyn Scenario>],
    ) -> Result<SuiteOutcome> {
        let started_at = Local::now();
        println!(
            "\n{} Suite session started: {}",
            "▶".green().bold(),
            self.session_id.cyan()
        );
        info!(
            "running {} scenario(s) against {} at {}",
            scenarios.len(),
            driver.name(),
            self.config.base_url
        );

        let mut summaries = Vec::new();
        let mut interrupted = false;

        for scenario in scenarios {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!("interrupt requested, skipping '{}'", scenario.slug());
                interrupted = true;
                break;
            }

            println!(
                "\n{} {} ({})",
                "▶".green().bold(),
                scenario.name(),
                scenario.slug()
            );

            driver
                .reset()
                .await
                .context("Failed to reset the driver between scenarios")?;

            let mut reporter = Reporter::new(scenario.name(), &self.config.report_dir)?;
            if let Err(err) = scenario.run(driver, &self.config, &mut reporter).await {
                warn!("scenario '{}' aborted: {:#}", scenario.slug(), err);
                reporter.add_result(CaseOutcome::fail(
                    "scenario aborted",
                    format!("driver error: {:#}", err),
                ))?;
            }
            let summary = reporter.generate_summary()?;

            let glyph = if summary.all_passed() {
                "✓".green()
            } else {
                "✗".red()
            };
            println!(
                "{} {}: {}/{} passed",
                glyph,
                scenario.name(),
                summary.passed,
                summary.total
            );

            let scenario_failed = !summary.all_passed();
            summaries.push(summary);

            if self.interrupt.load(Ordering::SeqCst) {
                interrupted = true;
                break;
            }
            if scenario_failed && !self.continue_on_failure {
                warn!("stopping after failed scenario '{}'", scenario.slug());
                break;
            }
        }

        let outcome = self.outcome(started_at, Local::now(), interrupted, summaries);
        self.write_artifacts(&outcome)?;
        print_outcome(&outcome);
        Ok(outcome)
    }

    fn outcome(
        &self,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
        interrupted: bool,
        scenarios: Vec<RunSummary>,
    ) -> SuiteOutcome {
        SuiteOutcome {
            session_id: self.session_id.clone(),
            started_at,
            finished_at,
            interrupted,
            total: scenarios.iter().map(|s| s.total).sum(),
            passed: scenarios.iter().map(|s| s.passed).sum(),
            failed: scenarios.iter().map(|s| s.failed).sum(),
            security_issues: scenarios.iter().map(|s| s.security_issues).sum(),
            scenarios,
        }
    }

    fn write_artifacts(&self, outcome: &SuiteOutcome) -> Result<()> {
        let dir = Path::new(&self.config.report_dir);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;

        let junit_path = junit::write_report(outcome, dir)?;
        info!("wrote {}", junit_path.display());
        let json_path = json::write_report(outcome, dir)?;
        info!("wrote {}", json_path.display());
        Ok(())
    }
}

fn print_outcome(outcome: &SuiteOutcome) {
    println!("\n{} Suite session finished", "■".blue().bold());
    println!("  Scenarios: {}", outcome.scenarios.len());
    println!("  Total cases: {}", outcome.total);
    println!(
        "  {} passed, {} failed",
        outcome.passed.to_string().green(),
        outcome.failed.to_string().red()
    );
    if outcome.security_issues > 0 {
        println!(
            "  {} security issue(s)",
            outcome.security_issues.to_string().yellow()
        );
    }
    if outcome.interrupted {
        println!("  {}", "Run interrupted before completion".yellow());
    }
    println!("  Duration: {:.2}s", outcome.duration_seconds());
}

/// Poll the target until it answers HTTP, so a suite does not start against a
/// server that is still booting. Any HTTP status counts as ready.
pub async fn wait_until_ready(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;
    let deadline = Instant::now() + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match client.get(base_url).send().await {
            Ok(response) => {
                info!(
                    "target {} answered {} after {} attempt(s)",
                    base_url,
                    response.status(),
                    attempt
                );
                return Ok(());
            }
            Err(err) if Instant::now() < deadline => {
                debug!("target not ready (attempt {}): {}", attempt, err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Target {} did not become ready within {:?}", base_url, timeout)
                });
            }
        }
    }
}
