use super::types::{ResultEntry, RunSummary};
use crate::runner::SuiteOutcome;
use anyhow::Result;
use chrono::{DateTime, Local};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Generate a JUnit XML document for a finished suite run: one `<testsuite>`
/// per scenario, one `<testcase>` per recorded entry.
pub fn generate_junit_xml(outcome: &SuiteOutcome) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "authprobe-run"));
    suites_start.push_attribute(("tests", outcome.total.to_string().as_str()));
    suites_start.push_attribute(("failures", outcome.failed.to_string().as_str()));
    suites_start.push_attribute(("skipped", "0"));
    suites_start.push_attribute((
        "time",
        format!("{:.3}", outcome.duration_seconds()).as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    for summary in &outcome.scenarios {
        write_test_suite(&mut writer, &outcome.session_id, summary)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    session_id: &str,
    summary: &RunSummary,
) -> Result<()> {
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", summary.subject.as_str()));
    suite_start.push_attribute(("tests", summary.total.to_string().as_str()));
    suite_start.push_attribute(("failures", summary.failed.to_string().as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("id", session_id));
    suite_start.push_attribute((
        "time",
        format!("{:.3}", summary.duration_seconds).as_str(),
    ));
    suite_start.push_attribute((
        "timestamp",
        summary
            .started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .as_str(),
    ));
    writer.write_event(Event::Start(suite_start))?;

    // Per-case time is the gap since the previous observation.
    let mut previous = summary.started_at;
    for entry in &summary.entries {
        write_test_case(writer, &summary.subject, entry, previous)?;
        previous = entry.observed_at;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    subject: &str,
    entry: &ResultEntry,
    previous: DateTime<Local>,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", entry.case_name.as_str()));
    case_start.push_attribute(("classname", subject));
    let elapsed = (entry.observed_at - previous).num_milliseconds().max(0) as f64 / 1000.0;
    case_start.push_attribute(("time", format!("{:.3}", elapsed).as_str()));
    writer.write_event(Event::Start(case_start))?;

    if !entry.passed {
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", entry.details.as_str()));
        let kind = if entry.is_security_issue() {
            "SecurityConcern"
        } else {
            "AssertionFailure"
        };
        fail_start.push_attribute(("type", kind));
        writer.write_event(Event::Start(fail_start))?;

        let body = if entry.expected.is_empty() && entry.actual.is_empty() {
            entry.details.clone()
        } else {
            format!(
                "{}\nexpected: {}\nactual: {}",
                entry.details, entry.expected, entry.actual
            )
        };
        writer.write_event(Event::Text(BytesText::new(&body)))?;

        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into the output directory.
pub fn write_report(outcome: &SuiteOutcome, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(outcome)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    Ok(path)
}
