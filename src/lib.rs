pub mod config;
pub mod driver;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod utils;

// Re-export common items
pub use config::SuiteConfig;
pub use report::{CaseOutcome, Reporter, RunSummary, StorageError};
pub use runner::{SuiteOutcome, SuiteRunner};
