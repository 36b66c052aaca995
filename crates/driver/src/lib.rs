//! # sol-fv-driver
//!
//! Drives one CHC analysis per source unit: assembles the configured
//! Horn back-ends, runs the rule emitter over every contract, collects
//! diagnostics and unanswered queries into an [`AnalysisReport`], and
//! renders or serializes the result.

pub mod config;
pub mod diagnostics;

use serde::Serialize;

use sol_fv_analysis::ast::{SourceLocation, SourceUnit};
use sol_fv_analysis::{ChcEngine, Diagnostic, ErrorReporter};
use sol_fv_solver::{HornBackend, Portfolio, SmtLib2Horn, SpacerSolver};

pub use config::{ModelCheckerSettings, SolverChoice};

/// Everything one analysis produced.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Serialized queries no enabled back-end could answer; hosts can
    /// forward these to an external Horn solver.
    pub unhandled_queries: Vec<String>,
}

/// Analyze a source unit under the given settings.
///
/// Internal invariant violations abort the unit (and surface as an
/// error diagnostic) without touching the process.
pub fn analyze_source_unit(unit: &SourceUnit, settings: ModelCheckerSettings) -> AnalysisReport {
    let mut backend = build_backend(settings);
    let mut reporter = ErrorReporter::new();
    let mut engine = ChcEngine::new(unit, backend.as_mut(), &mut reporter);
    let outcome = engine.analyze();
    let unhandled_queries = engine.unhandled_queries();
    if let Err(e) = outcome {
        tracing::warn!(error = %e, "CHC analysis aborted for this source unit");
        reporter.error(
            SourceLocation::default(),
            format!("CHC analysis of this source unit was aborted: {e}"),
        );
    }
    if !unhandled_queries.is_empty() {
        reporter.warning(
            SourceLocation::default(),
            format!(
                "{} CHC verification queries were not answered by the enabled back-ends; \
                 forward them to an external Horn solver to complete the analysis.",
                unhandled_queries.len()
            ),
        );
    }

    AnalysisReport {
        diagnostics: reporter.into_diagnostics(),
        unhandled_queries,
    }
}

/// Assemble the configured back-ends; several are cross-checked through
/// the portfolio adapter. Falls back to the text back-end when nothing
/// else is available so the analysis can always run.
fn build_backend(settings: ModelCheckerSettings) -> Box<dyn HornBackend> {
    let ModelCheckerSettings {
        solvers,
        smtlib2_responses,
        smt_callback,
    } = settings;

    let mut backends: Vec<Box<dyn HornBackend>> = Vec::new();
    if solvers.spacer {
        match SpacerSolver::with_default_config() {
            Ok(solver) => {
                tracing::debug!("Spacer back-end enabled");
                backends.push(Box::new(solver));
            }
            Err(e) => tracing::warn!(error = %e, "Spacer back-end unavailable"),
        }
    }
    if solvers.smtlib2 || backends.is_empty() {
        tracing::debug!("SMT-LIB2 text back-end enabled");
        backends.push(Box::new(SmtLib2Horn::new(smtlib2_responses, smt_callback)));
    }
    if backends.len() == 1 {
        return backends.remove(0);
    }
    Box::new(Portfolio::new(backends))
}
