//! Rendering of analysis results.
//!
//! Plain colored text by default; when the host supplies the source
//! text, warnings are rendered as ariadne span reports pointing at the
//! offending location.

use ariadne::{Color, Label, Report, ReportKind, Source};
use colored::Colorize;

use sol_fv_analysis::{Diagnostic, Severity};

use crate::AnalysisReport;

/// Print every diagnostic to stderr. `source` is the file name and full
/// text of the analyzed unit, when available.
pub fn render_diagnostics(report: &AnalysisReport, source: Option<(&str, &str)>) {
    for diagnostic in &report.diagnostics {
        match source {
            Some((name, text)) if diagnostic.location.end <= text.len() && !text.is_empty() => {
                render_with_source(diagnostic, name, text);
            }
            _ => render_text_only(diagnostic),
        }
    }
}

/// Serialize the report for machine consumption.
pub fn to_json(report: &AnalysisReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn report_kind(severity: Severity) -> ReportKind<'static> {
    match severity {
        Severity::Warning => ReportKind::Warning,
        Severity::Error => ReportKind::Error,
    }
}

fn render_with_source(diagnostic: &Diagnostic, name: &str, text: &str) {
    let start = diagnostic.location.start;
    let end = diagnostic.location.end.max(start + 1);
    let color = match diagnostic.severity {
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    };
    let result = Report::build(report_kind(diagnostic.severity), name, start)
        .with_message(diagnostic.message.clone())
        .with_label(
            Label::new((name, start..end))
                .with_message(diagnostic.message.clone())
                .with_color(color),
        )
        .finish()
        .eprint((name, Source::from(text)));
    if result.is_err() {
        render_text_only(diagnostic);
    }
}

fn render_text_only(diagnostic: &Diagnostic) {
    let header = match diagnostic.severity {
        Severity::Warning => "warning".yellow().bold(),
        Severity::Error => "error".red().bold(),
    };
    eprintln!(
        "{}: {} ({}..{})",
        header, diagnostic.message, diagnostic.location.start, diagnostic.location.end
    );
}
