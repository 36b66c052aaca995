//! Meta back-end fanning out to several solvers and cross-checking
//! their answers.

use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

use crate::backend::HornBackend;
use crate::result::{CheckResult, QueryResponse};

/// Runs every query against all member back-ends.
///
/// Disagreement between definite answers yields
/// [`CheckResult::Conflicting`], which callers surface as a soundness
/// warning rather than a hard failure. With agreement, the definite
/// answer wins over unknowns and errors.
pub struct Portfolio {
    backends: Vec<Box<dyn HornBackend>>,
}

impl Portfolio {
    pub fn new(backends: Vec<Box<dyn HornBackend>>) -> Self {
        Self { backends }
    }

    fn combine(results: &[CheckResult]) -> CheckResult {
        let any_sat = results.iter().any(|r| r.is_satisfiable());
        let any_unsat = results.iter().any(|r| r.is_unsatisfiable());
        match (any_sat, any_unsat) {
            (true, true) => CheckResult::Conflicting,
            (true, false) => CheckResult::Satisfiable,
            (false, true) => CheckResult::Unsatisfiable,
            (false, false) => {
                if results.iter().all(|r| *r == CheckResult::Error) && !results.is_empty() {
                    CheckResult::Error
                } else {
                    CheckResult::Unknown
                }
            }
        }
    }
}

impl HornBackend for Portfolio {
    fn register_relation(&mut self, name: &str, domain: &[Sort]) {
        for backend in &mut self.backends {
            backend.register_relation(name, domain);
        }
    }

    fn add_rule(&mut self, rule: &Expr, name: &str) {
        for backend in &mut self.backends {
            backend.add_rule(rule, name);
        }
    }

    fn query(&mut self, goal: &Expr) -> QueryResponse {
        let responses: Vec<QueryResponse> = self
            .backends
            .iter_mut()
            .map(|b| b.query(goal))
            .collect();
        let results: Vec<CheckResult> = responses.iter().map(|r| r.result).collect();
        let combined = Self::combine(&results);
        if combined == CheckResult::Conflicting {
            tracing::warn!(goal = %goal.name(), "back-ends returned conflicting answers");
        }
        let values = responses.into_iter().flat_map(|r| r.values).collect();
        QueryResponse::with_values(combined, values)
    }

    fn unhandled_queries(&self) -> Vec<String> {
        self.backends
            .iter()
            .flat_map(|b| b.unhandled_queries())
            .collect()
    }
}
