pub mod json;
pub mod junit;
pub mod sink;
pub mod types;

pub use sink::{ConsoleWriter, FileWriter, MemoryWriter, RecordWriter, StorageError};
pub use types::{CaseOutcome, ResultEntry, RunSummary};

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Directory used for report sinks when the caller does not pick one.
pub const DEFAULT_REPORT_DIR: &str = "test_reports";

/// Timestamps as shown inside reports.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamps as embedded in sink file names.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Replace every character that is not ASCII-alphanumeric with `_`,
/// preserving length and order. Idempotent, so an already-sanitized
/// name passes through unchanged.
pub fn sanitize(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Accumulates named test-case outcomes for one scenario run, mirrors each
/// one to the console and a durable file sink as it arrives, and closes the
/// run out with an aggregate summary.
///
/// One reporter per scenario: the sink path is derived from the subject and
/// the construction timestamp, so concurrent runs with different subjects or
/// start times never collide. Entries are append-only and never reordered;
/// the summary is a pure function of the entry sequence except for its end
/// timestamp.
///
/// Storage failures are never swallowed. A reporter that cannot persist is
/// unusable, so directory creation, sink open, and every append surface
/// their [`StorageError`] to the caller.
pub struct Reporter {
    subject: String,
    started_at: DateTime<Local>,
    sink_path: Option<PathBuf>,
    entries: Vec<ResultEntry>,
    writers: Vec<Box<dyn RecordWriter>>,
}

impl Reporter {
    /// Create a reporter writing to the console and to
    /// `report_dir/<sanitized subject>_<YYYYMMDD_HHMMSS>.txt`.
    ///
    /// The directory is created if absent (parents included). On return the
    /// sink exists and already contains the header block.
    pub fn new(
        subject: impl Into<String>,
        report_dir: impl AsRef<Path>,
    ) -> Result<Self, StorageError> {
        let subject = subject.into();
        let started_at = Local::now();
        let file_name = format!(
            "{}_{}.txt",
            sanitize(&subject),
            started_at.format(STAMP_FORMAT)
        );
        let sink_path = report_dir.as_ref().join(file_name);
        let file = FileWriter::open(&sink_path)?;

        let mut reporter = Self {
            subject,
            started_at,
            sink_path: Some(sink_path),
            entries: Vec::new(),
            writers: vec![Box::new(ConsoleWriter), Box::new(file)],
        };
        let header = reporter.header_block();
        reporter.emit(&header)?;
        Ok(reporter)
    }

    /// Build a reporter around a caller-supplied writer instead of the
    /// console/file pair. Record and summary behavior is identical, but no
    /// `Report saved to:` line is emitted since nothing lands on disk.
    pub fn with_writer(
        subject: impl Into<String>,
        writer: Box<dyn RecordWriter>,
    ) -> Result<Self, StorageError> {
        let mut reporter = Self {
            subject: subject.into(),
            started_at: Local::now(),
            sink_path: None,
            entries: Vec::new(),
            writers: vec![writer],
        };
        let header = reporter.header_block();
        reporter.emit(&header)?;
        Ok(reporter)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Where this run persists, when a file sink is attached.
    pub fn sink_path(&self) -> Option<&Path> {
        self.sink_path.as_deref()
    }

    /// Recorded entries, in observation order.
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    /// Record one case outcome: append it to the run, then emit its block
    /// through every writer. Exactly one sink append per call.
    ///
    /// The entry is kept in memory even when the sink append fails, so the
    /// aggregate stays truthful; the failure itself still propagates.
    pub fn add_result(&mut self, outcome: CaseOutcome) -> Result<(), StorageError> {
        let entry = ResultEntry::from_outcome(outcome, Local::now());
        let block = entry_block(&entry);
        self.entries.push(entry);
        self.emit(&block)
    }

    /// Close out the run: compute the aggregate over all entries, emit the
    /// summary block (plus the sink location when one exists), and return
    /// the summary value.
    ///
    /// May be called more than once; each call appends a fresh block whose
    /// counts are identical, with a non-decreasing end time. A failed
    /// summary append is atomic: the error is returned and no summary value
    /// escapes, keeping durability and result reporting in lockstep.
    pub fn generate_summary(&mut self) -> Result<RunSummary, StorageError> {
        let ended_at = Local::now();
        let total = self.entries.len();
        let passed = self.entries.iter().filter(|e| e.passed).count();
        let security_issues = self.entries.iter().filter(|e| e.is_security_issue()).count();

        let summary = RunSummary {
            subject: self.subject.clone(),
            started_at: self.started_at,
            ended_at,
            duration_seconds: (ended_at - self.started_at).num_milliseconds() as f64 / 1000.0,
            total,
            passed,
            failed: total - passed,
            security_issues,
            entries: self.entries.clone(),
        };

        let block = summary_block(&summary);
        let saved_line = self.sink_path.as_ref().map(|path| {
            let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
            format!("\nReport saved to: {}", resolved.display())
        });

        self.emit(&block)?;
        if let Some(line) = saved_line {
            self.emit(&line)?;
        }
        Ok(summary)
    }

    fn emit(&mut self, block: &str) -> Result<(), StorageError> {
        for writer in &mut self.writers {
            writer.append(block)?;
        }
        Ok(())
    }

    fn header_block(&self) -> String {
        format!(
            "{}\nTEST: {}\nStart Time: {}\n{}",
            "=".repeat(80),
            self.subject.to_uppercase(),
            self.started_at.format(TIME_FORMAT),
            "-".repeat(80),
        )
    }
}

fn entry_block(entry: &ResultEntry) -> String {
    let status = if entry.passed { "PASS" } else { "FAIL" };
    let mut block = format!("\n{}:\n", entry.case_name);
    if entry.is_security_issue() {
        block.push_str(&format!("Result: {} (Security Issue)\n", status));
    } else {
        block.push_str(&format!("Result: {}\n", status));
    }
    block.push_str(&format!("Details: {}\n", entry.details));
    if !entry.expected.is_empty() {
        block.push_str(&format!("Expected: {}\n", entry.expected));
    }
    if !entry.actual.is_empty() {
        block.push_str(&format!("Actual: {}\n", entry.actual));
    }
    if entry.is_security_issue() {
        block.push_str("⚠️  SECURITY CONCERN: This failure may indicate a security vulnerability\n");
    }
    block.push_str(&"-".repeat(40));
    block
}

fn summary_block(summary: &RunSummary) -> String {
    let mut block = format!("\n{}\nTEST SUMMARY\n{}\n", "=".repeat(80), "-".repeat(80));
    block.push_str(&format!("Test: {}\n", summary.subject));
    block.push_str(&format!(
        "Start Time: {}\n",
        summary.started_at.format(TIME_FORMAT)
    ));
    block.push_str(&format!(
        "End Time: {}\n",
        summary.ended_at.format(TIME_FORMAT)
    ));
    block.push_str(&format!("Duration: {:.2} seconds\n", summary.duration_seconds));
    block.push_str(&format!("Total Cases: {}\n", summary.total));
    block.push_str(&format!("✅ Passed: {}\n", summary.passed));
    block.push_str(&format!("❌ Failed: {}", summary.failed));
    if summary.security_issues > 0 {
        block.push_str(&format!(
            "\n⚠️  Security Issues: {}",
            summary.security_issues
        ));
    }
    if summary.failed > 0 {
        block.push_str("\n\nFAILED CASES:");
        for entry in summary.failed_cases() {
            block.push_str(&format!("\n- {}", entry.case_name));
        }
    }
    if summary.security_issues > 0 {
        block.push_str("\n\nSECURITY CONCERNS:");
        for entry in summary.security_concerns() {
            block.push_str(&format!("\n- {}: {}", entry.case_name, entry.details));
        }
    }
    block.push('\n');
    block.push_str(&"=".repeat(80));
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Writer that starts failing after a fixed number of successful appends.
    struct FailAfter {
        remaining: usize,
    }

    impl RecordWriter for FailAfter {
        fn append(&mut self, _block: &str) -> Result<(), StorageError> {
            if self.remaining == 0 {
                return Err(StorageError::Append {
                    path: PathBuf::from("/nowhere/sink.txt"),
                    source: io::Error::new(io::ErrorKind::Other, "disk full"),
                });
            }
            self.remaining -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_sanitize_replaces_and_is_idempotent() {
        assert_eq!(sanitize("Login Flow #2!"), "Login_Flow__2_");
        assert_eq!(sanitize("already_clean_123"), "already_clean_123");
        // Length and order preserved, one filler per character.
        assert_eq!(sanitize("héllo").chars().count(), 5);

        for s in ["Login Flow #2!", "héllo wörld", "", "___", "a.b/c"] {
            assert_eq!(sanitize(&sanitize(s)), sanitize(s));
        }
    }

    #[test]
    fn test_entries_append_only_in_call_order() {
        let capture = MemoryWriter::new();
        let mut reporter = Reporter::with_writer("ordering", Box::new(capture)).unwrap();

        reporter
            .add_result(CaseOutcome::pass("first", "ok"))
            .unwrap();
        reporter
            .add_result(CaseOutcome::fail("second", "broke"))
            .unwrap();
        reporter
            .add_result(CaseOutcome::pass("first", "repeat names allowed"))
            .unwrap();

        let names: Vec<&str> = reporter.entries().iter().map(|e| e.case_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "first"]);
        assert!(reporter.entries()[0].passed);
        assert!(!reporter.entries()[1].passed);
        assert_eq!(reporter.entries()[1].details, "broke");

        // Timestamps never go backwards across the sequence.
        for pair in reporter.entries().windows(2) {
            assert!(pair[0].observed_at <= pair[1].observed_at);
        }
    }

    #[test]
    fn test_counts_are_consistent() {
        let capture = MemoryWriter::new();
        let mut reporter = Reporter::with_writer("counts", Box::new(capture)).unwrap();

        reporter.add_result(CaseOutcome::pass("a", "ok")).unwrap();
        reporter
            .add_result(CaseOutcome::fail("b", "bad").security())
            .unwrap();
        reporter.add_result(CaseOutcome::fail("c", "bad")).unwrap();
        reporter
            .add_result(CaseOutcome::pass("d", "ok").security())
            .unwrap();

        let summary = reporter.generate_summary().unwrap();
        assert_eq!(summary.passed + summary.failed, summary.total);
        assert!(summary.security_issues <= summary.failed);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        // The flagged pass is not a security issue.
        assert_eq!(summary.security_issues, 1);
    }

    #[test]
    fn test_sink_paths_never_collide_across_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let a = Reporter::new("Login Functional Flow", dir.path()).unwrap();
        let b = Reporter::new("Login Security Probes", dir.path()).unwrap();

        let a_path = a.sink_path().unwrap();
        let b_path = b.sink_path().unwrap();
        assert_ne!(a_path, b_path);
        assert!(a_path.exists());
        assert!(b_path.exists());

        let name = a_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Login_Functional_Flow_"));
        assert!(name.ends_with(".txt"));
        // Stamp segment: YYYYMMDD_HHMMSS.
        let stamp = a.started_at().format(STAMP_FORMAT).to_string();
        assert!(name.contains(&stamp));
    }

    #[test]
    fn test_header_written_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new("Smoke", dir.path()).unwrap();

        let content = std::fs::read_to_string(reporter.sink_path().unwrap()).unwrap();
        assert!(!content.is_empty());
        assert!(content.starts_with(&"=".repeat(80)));
        assert!(content.contains("TEST: SMOKE"));
        assert!(content.contains("Start Time: "));
        assert!(content.contains(&"-".repeat(80)));
    }

    #[test]
    fn test_summary_is_pure_over_entries() {
        let capture = MemoryWriter::new();
        let mut reporter = Reporter::with_writer("purity", Box::new(capture)).unwrap();
        reporter.add_result(CaseOutcome::pass("a", "ok")).unwrap();
        reporter.add_result(CaseOutcome::fail("b", "bad")).unwrap();

        let first = reporter.generate_summary().unwrap();
        let second = reporter.generate_summary().unwrap();

        assert_eq!(first.total, second.total);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.failed, second.failed);
        assert_eq!(first.security_issues, second.security_issues);
        assert_eq!(first.started_at, second.started_at);
        assert!(second.ended_at >= first.ended_at);
        assert!(second.duration_seconds >= first.duration_seconds);
    }

    #[test]
    fn test_all_pass_run_omits_failure_sections() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = Reporter::new("Smoke", dir.path()).unwrap();
        for _ in 0..3 {
            reporter
                .add_result(CaseOutcome::pass("login works", "ok"))
                .unwrap();
        }

        let summary = reporter.generate_summary().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.security_issues, 0);
        assert!(summary.all_passed());

        let content = std::fs::read_to_string(reporter.sink_path().unwrap()).unwrap();
        assert!(content.contains("Total Cases: 3"));
        assert!(content.contains("✅ Passed: 3"));
        assert!(content.contains("❌ Failed: 0"));
        assert!(!content.contains("FAILED CASES:"));
        assert!(!content.contains("SECURITY CONCERNS:"));
        assert!(!content.contains("Security Issues:"));
        assert!(content.contains("Report saved to: "));
    }

    #[test]
    fn test_security_failure_is_listed_with_details() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = Reporter::new("Login Security Probes", dir.path()).unwrap();
        reporter
            .add_result(
                CaseOutcome::fail("xss probe", "script executed")
                    .security()
                    .diff("no execution", "alert fired"),
            )
            .unwrap();
        reporter
            .add_result(CaseOutcome::pass("valid login", "dashboard shown"))
            .unwrap();

        let summary = reporter.generate_summary().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.security_issues, 1);

        let content = std::fs::read_to_string(reporter.sink_path().unwrap()).unwrap();
        assert!(content.contains("Result: FAIL (Security Issue)"));
        assert!(content.contains("Expected: no execution"));
        assert!(content.contains("Actual: alert fired"));
        assert!(content.contains("⚠️  Security Issues: 1"));
        assert!(content.contains("FAILED CASES:\n- xss probe"));
        assert!(content.contains("SECURITY CONCERNS:\n- xss probe: script executed"));
    }

    #[test]
    fn test_empty_run_summarizes_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = Reporter::new("Empty", dir.path()).unwrap();
        let summary = reporter.generate_summary().unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.passed, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.security_issues, 0);
        assert!(summary.all_passed());

        let content = std::fs::read_to_string(reporter.sink_path().unwrap()).unwrap();
        assert!(content.contains("Total Cases: 0"));
        assert!(!content.contains("FAILED CASES:"));
        assert!(!content.contains("SECURITY CONCERNS:"));
    }

    #[test]
    fn test_expected_actual_lines_only_when_provided() {
        let capture = MemoryWriter::new();
        let mut reporter =
            Reporter::with_writer("diff lines", Box::new(capture.clone())).unwrap();

        reporter
            .add_result(CaseOutcome::fail("plain", "no diff attached"))
            .unwrap();
        assert!(!capture.contents().contains("Expected: "));
        assert!(!capture.contents().contains("Actual: "));

        reporter
            .add_result(CaseOutcome::fail("with diff", "mismatch").diff("200", "500"))
            .unwrap();
        assert!(capture.contents().contains("Expected: 200"));
        assert!(capture.contents().contains("Actual: 500"));
    }

    #[test]
    fn test_append_failure_propagates_but_keeps_entry() {
        // One successful append allowed: the header.
        let mut reporter =
            Reporter::with_writer("failing sink", Box::new(FailAfter { remaining: 1 })).unwrap();

        let err = reporter
            .add_result(CaseOutcome::pass("recorded anyway", "ok"))
            .expect_err("append should fail");
        assert!(matches!(err, StorageError::Append { .. }));
        assert!(err.to_string().contains("/nowhere/sink.txt"));
        assert_eq!(reporter.entries().len(), 1);

        // Summary append is atomic: error out, no summary value.
        assert!(reporter.generate_summary().is_err());
    }

    #[test]
    fn test_console_and_memory_sink_carry_identical_content() {
        let capture = MemoryWriter::new();
        let mut reporter =
            Reporter::with_writer("mirroring", Box::new(capture.clone())).unwrap();
        reporter.add_result(CaseOutcome::pass("one", "ok")).unwrap();
        reporter.generate_summary().unwrap();

        let content = capture.contents();
        // Header, entry, summary: three blocks, no saved-to line without a file.
        assert_eq!(capture.block_count(), 3);
        assert!(content.contains("TEST: MIRRORING"));
        assert!(content.contains("\none:\nResult: PASS\nDetails: ok\n"));
        assert!(content.contains("TEST SUMMARY"));
        assert!(!content.contains("Report saved to:"));
    }
}
