//! Serialization of a Horn-clause system to SMT-LIB2 text.
//!
//! Both concrete back-ends feed the same store: relation declarations
//! plus named, universally quantified rules, kept in emission order.
//! Each reachability question then renders the accumulated system and a
//! negated goal into one self-contained `(check-sat)` query.

use std::fmt::Write as _;

use sol_fv_smtlib::command::Command;
use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

use crate::result::CheckResult;

/// Declarations and rules of one clause system.
#[derive(Debug, Default)]
pub struct RuleStore {
    declarations: Vec<Command>,
    /// Rule name (diagnostics only) paired with its quantified assertion.
    rules: Vec<(String, Command)>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_relation(&mut self, name: &str, domain: &[Sort]) {
        self.declarations.push(Command::DeclareFun(
            name.to_string(),
            domain.to_vec(),
            Sort::Bool,
        ));
    }

    /// Record a rule, universally quantified over its free variables.
    pub fn add_rule(&mut self, rule: &Expr, name: &str) {
        let bound = rule.free_variables().into_iter().collect::<Vec<_>>();
        self.rules.push((
            name.to_string(),
            Command::AssertForall(bound, rule.clone()),
        ));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Render the full system with `goal` negated, ready for `(check-sat)`.
    ///
    /// The clause system is satisfiable exactly when the goal is
    /// unreachable, so the textual answer is interpreted by
    /// [`interpret_check_sat`] with sat and unsat swapped relative to the
    /// reachability question.
    pub fn render_query(&self, goal: &Expr) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", Command::SetLogic("HORN".to_string()));
        for decl in &self.declarations {
            let _ = writeln!(out, "{decl}");
        }
        for (name, rule) in &self.rules {
            let _ = writeln!(out, "{}", Command::Comment(name.clone()));
            let _ = writeln!(out, "{rule}");
        }
        let bound = goal.free_variables().into_iter().collect::<Vec<_>>();
        let negated = Command::AssertForall(
            bound,
            Expr::implies(goal.clone(), Expr::BoolLit(false)),
        );
        let _ = writeln!(out, "{negated}");
        let _ = writeln!(out, "{}", Command::CheckSat);
        out
    }
}

/// Map a `(check-sat)` answer on the negated-goal query back to the
/// reachability question: a model of the clauses refutes reachability of
/// the goal, so textual `sat` means the goal is unreachable.
pub fn interpret_check_sat(response: &str) -> CheckResult {
    let response = response.trim_start();
    if response.starts_with("unsat") {
        CheckResult::Satisfiable
    } else if response.starts_with("sat") {
        CheckResult::Unsatisfiable
    } else if response.starts_with("unknown") {
        CheckResult::Unknown
    } else {
        CheckResult::Error
    }
}
