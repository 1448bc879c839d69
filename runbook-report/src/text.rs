//! Text reporter (spec §4.6 "Text format").

use std::fmt::Write as _;

use runbook_commons::styling::{styled_glyph, Outcome};
use runbook_exec::{ActualStatus, CaseStatus, TestResult};

use crate::RunbookReport;

fn case_outcome(status: CaseStatus) -> Outcome {
    match status {
        CaseStatus::Passed => Outcome::Passed,
        CaseStatus::Failed => Outcome::Failed,
        CaseStatus::Skipped => Outcome::Skipped,
    }
}

fn step_outcome(actual: ActualStatus, passed: bool) -> Outcome {
    if actual == ActualStatus::Skipped {
        return Outcome::Skipped;
    }
    if !passed {
        return Outcome::Failed;
    }
    if actual == ActualStatus::Warn {
        return Outcome::Warn;
    }
    Outcome::Passed
}

fn write_case(out: &mut String, case: &TestResult, verbose: bool) {
    let glyph = styled_glyph(case_outcome(case.status));
    let _ = writeln!(out, "  {glyph} {} ({:.3}s)", case.name, case.duration.as_secs_f64());

    if let Some(error) = &case.error {
        let _ = writeln!(out, "      {error}");
    }

    if !verbose {
        return;
    }

    for step in &case.steps {
        let glyph = styled_glyph(step_outcome(step.actual, step.passed));
        let _ = writeln!(
            out,
            "      {glyph} {} expected={} actual={:?} outputs={}",
            step.block_id,
            step.expected,
            step.actual,
            step.outputs.len(),
        );
        if !step.passed {
            if let Some(error) = &step.error {
                let _ = writeln!(out, "          {error}");
            }
            for assertion in step.assertions.iter().filter(|a| !a.passed) {
                let _ = writeln!(out, "          {}: {}", assertion.kind, assertion.message);
            }
        }
    }

    for assertion in case.assertions.iter().filter(|a| !a.passed) {
        let _ = writeln!(out, "      {}: {}", assertion.kind, assertion.message);
    }
}

/// Render a grouped text report (spec §4.6). In verbose mode every step is
/// listed with its actual status and output count; failed steps and
/// assertions get an indented error line. The final line is the aggregate
/// count and total wall-clock duration.
pub fn render_text(reports: &[RunbookReport], verbose: bool) -> String {
    let mut out = String::new();
    let mut passed = 0usize;
    let mut failed = 0usize;
    let mut skipped = 0usize;
    let mut total = std::time::Duration::ZERO;

    for report in reports {
        let _ = writeln!(out, "{}", report.name);
        for case in &report.results {
            write_case(&mut out, case, verbose);
            total += case.duration;
            match case.status {
                CaseStatus::Passed => passed += 1,
                CaseStatus::Failed => failed += 1,
                CaseStatus::Skipped => skipped += 1,
            }
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "{passed} passed, {failed} failed, {skipped} skipped in {:.3}s",
        total.as_secs_f64()
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook_exec::{ActualStatus, CaseStatus, StepResult};
    use std::collections::HashMap;
    use std::time::Duration;

    fn case(name: &str, status: CaseStatus) -> TestResult {
        TestResult {
            name: name.to_string(),
            status,
            duration: Duration::from_millis(250),
            error: None,
            steps: Vec::new(),
            assertions: Vec::new(),
        }
    }

    #[test]
    fn aggregate_line_counts_by_status() {
        let report = RunbookReport::new(
            "demo.md",
            vec![case("a", CaseStatus::Passed), case("b", CaseStatus::Failed)],
        );
        let text = render_text(&[report], false);
        assert!(text.contains("1 passed, 1 failed, 0 skipped"));
    }

    #[test]
    fn verbose_mode_lists_failed_step_errors() {
        let mut failing = case("b", CaseStatus::Failed);
        failing.error = Some("top-level failure".to_string());
        failing.steps.push(StepResult {
            block_id: "check-one".to_string(),
            expected: "success".to_string(),
            actual: ActualStatus::Fail,
            passed: false,
            exit_code: Some(1),
            outputs: HashMap::new(),
            log: String::new(),
            duration: Duration::from_millis(10),
            assertions: Vec::new(),
            error: Some("block `check-one` exited with status 1".to_string()),
        });
        let report = RunbookReport::new("demo.md", vec![failing]);
        let text = render_text(&[report], true);
        assert!(text.contains("check-one"));
        assert!(text.contains("exited with status 1"));
    }
}
