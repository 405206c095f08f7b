//! Report rendering and exit-code mapping

use std::fmt::Write as _;
use std::io::Write;

use serde::{Deserialize, Serialize};

use irsa_model::TestResult;

use crate::harness::Report;
use crate::Result;

/// Exit code when every check passed
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code when any check failed or coverage was insufficient
pub const EXIT_FAILURE: u8 = 1;

const RULE: &str = "========================================";
const THIN_RULE: &str = "----------------------------------------";

/// Output format for reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Pretty-printed JSON of the full report
    Json,
}

/// Formats reports and maps them to exit codes
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportSink {
    format: ReportFormat,
}

impl ReportSink {
    /// Create a sink for the given format
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Render `report` in the configured format
    pub fn render(&self, report: &Report) -> Result<String> {
        match self.format {
            ReportFormat::Text => Ok(render_text(report)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)? + "\n"),
        }
    }

    /// Write the rendered report and return the exit code it maps to
    pub fn emit(&self, report: &Report, out: &mut dyn Write) -> Result<u8> {
        out.write_all(self.render(report)?.as_bytes())?;
        out.flush()?;
        Ok(exit_code(report))
    }
}

/// 0 for a successful run, 1 otherwise
pub fn exit_code(report: &Report) -> u8 {
    if report.is_success() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn render_text(report: &Report) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "  IRSA VERIFICATION (seed {})", report.seed);
    let _ = writeln!(out, "{RULE}");

    section(&mut out, "Scenarios", &report.scenario_results);
    section(&mut out, "Resources", &report.resource_results);

    let _ = writeln!(out, "{THIN_RULE}");
    let _ = writeln!(
        out,
        "  {} total, {} passed, {} failed ({:.1}% pass rate)",
        report.total(),
        report.passed,
        report.failed,
        report.pass_rate() * 100.0
    );
    if report.iterations_requested > 0 {
        let _ = writeln!(
            out,
            "  {} of {} iterations completed",
            report.iterations_completed, report.iterations_requested
        );
    }
    if report.insufficient_coverage {
        let _ = writeln!(
            out,
            "  InsufficientCoverage: {} iterations requested, minimum is {}",
            report.iterations_requested, report.min_iterations
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "  Run cancelled before completion");
    }
    let _ = writeln!(out, "  Verdict: {:?}", report.verdict);
    let _ = writeln!(out, "{RULE}");
    out
}

/// Failing results are listed individually; passing ones only counted.
fn section(out: &mut String, title: &str, results: &[TestResult]) {
    if results.is_empty() {
        return;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    let _ = writeln!(out, "  {title}: {passed}/{} passed", results.len());
    for r in results.iter().filter(|r| !r.passed) {
        let _ = writeln!(
            out,
            "  FAIL  {:40} expected {}, got {}",
            r.scenario_id, r.expected_outcome, r.actual_outcome
        );
        let _ = writeln!(out, "        -> {}", r.detail);
    }
}

// =============================================================================
// Tests
// =============================================================================
