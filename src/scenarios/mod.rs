pub mod accessibility;
pub mod functional;
pub mod responsive;
pub mod security;
pub mod usability;

pub use accessibility::AccessibilityScenario;
pub use functional::FunctionalScenario;
pub use responsive::ResponsiveScenario;
pub use security::SecurityScenario;
pub use usability::UsabilityScenario;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::SuiteConfig;
use crate::driver::BrowserDriver;
use crate::report::Reporter;

/// One suite of login checks, reported through a single [`Reporter`].
///
/// Scenarios only record outcomes; the runner owns the reporter lifecycle
/// (construction before `run`, summary after it) and the driver session.
#[async_trait]
pub trait Scenario: Send + Sync + std::fmt::Debug {
    /// Human-readable subject, used as the report subject.
    fn name(&self) -> &'static str;

    /// Short identifier for CLI filtering.
    fn slug(&self) -> &'static str;

    async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        config: &SuiteConfig,
        reporter: &mut Reporter,
    ) -> Result<()>;
}

/// All scenarios in suite execution order.
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(FunctionalScenario),
        Box::new(AccessibilityScenario),
        Box::new(ResponsiveScenario),
        Box::new(SecurityScenario),
        Box::new(UsabilityScenario),
    ]
}

/// Resolve slugs to scenarios, preserving suite order. An empty filter means
/// the full suite; an unknown slug is an error.
pub fn by_slugs(slugs: &[String]) -> Result<Vec<Box<dyn Scenario>>> {
    let mut picked = all();
    if slugs.is_empty() {
        return Ok(picked);
    }

    let known: Vec<&'static str> = picked.iter().map(|s| s.slug()).collect();
    for slug in slugs {
        if !known.iter().any(|k| k.eq_ignore_ascii_case(slug)) {
            bail!(
                "Unknown scenario '{}'. Available scenarios: {}",
                slug,
                known.join(", ")
            );
        }
    }
    picked.retain(|s| slugs.iter().any(|w| w.eq_ignore_ascii_case(s.slug())));
    Ok(picked)
}

/// Start a clean session on the login page.
pub(crate) async fn open_login(
    driver: &mut dyn BrowserDriver,
    config: &SuiteConfig,
) -> Result<()> {
    driver.reset().await?;
    driver.navigate(&config.login_url()).await?;
    Ok(())
}

/// Clean session, then submit the given credentials through the form.
pub(crate) async fn attempt_login(
    driver: &mut dyn BrowserDriver,
    config: &SuiteConfig,
    username: &str,
    password: &str,
) -> Result<()> {
    open_login(driver, config).await?;
    driver.fill(&config.selectors.username, username).await?;
    driver.fill(&config.selectors.password, password).await?;
    driver.click(&config.selectors.submit).await?;
    Ok(())
}
