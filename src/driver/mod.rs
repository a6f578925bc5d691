pub mod playwright;
pub mod probes;
pub mod simulated;
pub mod traits;

pub use playwright::{Browser, LaunchOptions, PlaywrightDriver};
pub use simulated::{Defect, SimulatedDriver};
pub use traits::{BrowserDriver, ElementInfo, WaitState};

use anyhow::{bail, Result};
use std::str::FromStr;

use crate::config::SuiteConfig;

/// Which driver backend to run the suite against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Real browser via the Playwright sidecar.
    Playwright,
    /// In-memory login page, no browser required.
    Simulated,
}

impl FromStr for DriverKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "playwright" | "browser" => Ok(DriverKind::Playwright),
            "simulated" | "mock" => Ok(DriverKind::Simulated),
            other => bail!(
                "Unknown driver '{}'. Supported drivers: playwright, simulated",
                other
            ),
        }
    }
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Playwright => "playwright",
            DriverKind::Simulated => "simulated",
        }
    }
}

/// Build the driver backend for a suite run.
pub async fn build_driver(
    kind: DriverKind,
    options: &LaunchOptions,
    config: &SuiteConfig,
) -> Result<Box<dyn BrowserDriver>> {
    match kind {
        DriverKind::Playwright => {
            let driver = PlaywrightDriver::launch(options).await?;
            Ok(Box::new(driver))
        }
        DriverKind::Simulated => Ok(Box::new(SimulatedDriver::well_behaved(config))),
    }
}
