//! The capability trait every Horn back-end implements.

use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

use crate::result::QueryResponse;

/// A Horn-clause solver back-end.
///
/// The rule emitter registers every predicate symbol before it appears in
/// a rule, streams rules as it walks the program, and asks reachability
/// questions about goal predicates. Back-ends must tolerate queries
/// arriving interleaved with further rules.
pub trait HornBackend {
    /// Declare an uninterpreted relation `name : domain -> Bool`.
    fn register_relation(&mut self, name: &str, domain: &[Sort]);

    /// Add one Horn rule. `name` is used for diagnostics only and need
    /// not be unique.
    fn add_rule(&mut self, rule: &Expr, name: &str);

    /// Ask whether `goal` is reachable from the rules added so far.
    fn query(&mut self, goal: &Expr) -> QueryResponse;

    /// Queries this back-end could not answer itself, serialized for the
    /// host to forward to an external solver. Empty for back-ends that
    /// always answer.
    fn unhandled_queries(&self) -> Vec<String> {
        Vec::new()
    }
}
