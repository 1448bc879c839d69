//! JUnit XML reporter (spec §4.6 "JUnit XML format"), built with
//! `quick-xml`'s writer API rather than hand-assembled strings.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use quick_xml::Error as XmlError;
use runbook_exec::CaseStatus;

use crate::RunbookReport;

/// Render every runbook's results as one `<testsuites>` document, one
/// `<testsuite>` per runbook.
pub fn render_junit(reports: &[RunbookReport]) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Start(BytesStart::new("testsuites")))?;

    for report in reports {
        write_suite(&mut writer, report)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let bytes = writer.into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_suite(writer: &mut Writer<Vec<u8>>, report: &RunbookReport) -> Result<(), XmlError> {
    let failures = report
        .results
        .iter()
        .filter(|r| r.status == CaseStatus::Failed)
        .count();
    let skipped = report
        .results
        .iter()
        .filter(|r| r.status == CaseStatus::Skipped)
        .count();

    let mut suite = BytesStart::new("testsuite");
    suite.push_attribute(("name", report.name.as_str()));
    suite.push_attribute(("tests", report.results.len().to_string().as_str()));
    suite.push_attribute(("failures", failures.to_string().as_str()));
    suite.push_attribute(("skipped", skipped.to_string().as_str()));
    writer.write_event(Event::Start(suite))?;

    for case in &report.results {
        write_case(writer, case)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn write_case(writer: &mut Writer<Vec<u8>>, case: &runbook_exec::TestResult) -> Result<(), XmlError> {
    let mut testcase = BytesStart::new("testcase");
    testcase.push_attribute(("name", case.name.as_str()));
    // Seconds with millisecond precision (spec §4.6).
    let time = format!("{:.3}", case.duration.as_secs_f64());
    testcase.push_attribute(("time", time.as_str()));

    match case.status {
        CaseStatus::Passed => {
            writer.write_event(Event::Empty(testcase))?;
        }
        CaseStatus::Skipped => {
            writer.write_event(Event::Start(testcase))?;
            writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
            writer.write_event(Event::End(BytesEnd::new("testcase")))?;
        }
        CaseStatus::Failed => {
            writer.write_event(Event::Start(testcase))?;

            let mut failure = BytesStart::new("failure");
            let message = case.error.as_deref().unwrap_or("test case failed");
            failure.push_attribute(("message", message));
            writer.write_event(Event::Start(failure))?;
            let body = case.error_lines().join("\n");
            writer.write_event(Event::Text(BytesText::new(&body)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;

            writer.write_event(Event::End(BytesEnd::new("testcase")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook_exec::TestResult;
    use std::time::Duration;

    fn case(name: &str, status: CaseStatus, error: Option<&str>) -> TestResult {
        TestResult {
            name: name.to_string(),
            status,
            duration: Duration::from_millis(125),
            error: error.map(str::to_string),
            steps: Vec::new(),
            assertions: Vec::new(),
        }
    }

    #[test]
    fn passed_case_is_a_self_closing_testcase() {
        let report = RunbookReport::new("demo.md", vec![case("a", CaseStatus::Passed, None)]);
        let xml = render_junit(&[report]).unwrap();
        assert!(xml.contains("<testcase name=\"a\""));
        assert!(!xml.contains("<failure"));
    }

    #[test]
    fn failed_case_emits_a_failure_element_with_message() {
        let report = RunbookReport::new("demo.md", vec![case("b", CaseStatus::Failed, Some("boom"))]);
        let xml = render_junit(&[report]).unwrap();
        assert!(xml.contains("<failure message=\"boom\">"));
    }

    #[test]
    fn skipped_case_emits_an_empty_skipped_element() {
        let report = RunbookReport::new("demo.md", vec![case("c", CaseStatus::Skipped, None)]);
        let xml = render_junit(&[report]).unwrap();
        assert!(xml.contains("<skipped/>"));
    }

    #[test]
    fn suite_attributes_count_failures_and_skips() {
        let report = RunbookReport::new(
            "demo.md",
            vec![
                case("a", CaseStatus::Passed, None),
                case("b", CaseStatus::Failed, Some("x")),
                case("c", CaseStatus::Skipped, None),
            ],
        );
        let xml = render_junit(&[report]).unwrap();
        assert!(xml.contains("tests=\"3\""));
        assert!(xml.contains("failures=\"1\""));
        assert!(xml.contains("skipped=\"1\""));
    }
}
