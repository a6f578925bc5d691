use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One recorded test-case outcome, as supplied by the caller.
///
/// `CaseOutcome` is the builder half of an entry: it carries everything
/// except the timestamp, which the reporter stamps at record time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOutcome {
    pub case_name: String,
    pub passed: bool,
    pub details: String,
    pub security_concern: bool,
    /// Empty when the case has no expected/actual discrepancy to show.
    pub expected: String,
    pub actual: String,
}

impl CaseOutcome {
    /// A passing case.
    pub fn pass(case_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(case_name, true, details)
    }

    /// A failing case.
    pub fn fail(case_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(case_name, false, details)
    }

    fn new(case_name: impl Into<String>, passed: bool, details: impl Into<String>) -> Self {
        Self {
            case_name: case_name.into(),
            passed,
            details: details.into(),
            security_concern: false,
            expected: String::new(),
            actual: String::new(),
        }
    }

    /// Flag this outcome as security-relevant. Only a flagged *failure* is
    /// counted as a security issue; a flagged pass is recorded as-is.
    pub fn security(mut self) -> Self {
        self.security_concern = true;
        self
    }

    /// Attach an expected/actual discrepancy to the outcome.
    pub fn diff(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = expected.into();
        self.actual = actual.into();
        self
    }
}

/// One entry in a report run: a `CaseOutcome` plus the moment it was observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub case_name: String,
    pub passed: bool,
    pub details: String,
    pub security_concern: bool,
    pub expected: String,
    pub actual: String,
    pub observed_at: DateTime<Local>,
}

impl ResultEntry {
    pub fn from_outcome(outcome: CaseOutcome, observed_at: DateTime<Local>) -> Self {
        Self {
            case_name: outcome.case_name,
            passed: outcome.passed,
            details: outcome.details,
            security_concern: outcome.security_concern,
            expected: outcome.expected,
            actual: outcome.actual,
            observed_at,
        }
    }

    /// A security issue is a security-flagged failure; the flag alone is not
    /// enough.
    pub fn is_security_issue(&self) -> bool {
        self.security_concern && !self.passed
    }
}

/// Aggregate of a finished report run.
///
/// Everything except `ended_at`/`duration_seconds` is a pure function of the
/// entry sequence, so two summaries generated back-to-back agree on every
/// count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub subject: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub duration_seconds: f64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub security_issues: usize,
    pub entries: Vec<ResultEntry>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed cases, in recording order.
    pub fn failed_cases(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter().filter(|e| !e.passed)
    }

    /// Security-flagged failures, in recording order.
    pub fn security_concerns(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter().filter(|e| e.is_security_issue())
    }
}
