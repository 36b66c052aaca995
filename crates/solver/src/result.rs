use std::fmt;

/// Outcome of a reachability query against a Horn back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// The goal predicate is reachable: the property can be violated.
    Satisfiable,
    /// The goal predicate is unreachable: the property is proved.
    Unsatisfiable,
    /// The back-end could not decide (timeout, resource limit, ...).
    Unknown,
    /// Multiple back-ends disagreed; soundness is degraded.
    Conflicting,
    /// The back-end failed to run or produced unparseable output.
    Error,
}

impl CheckResult {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, CheckResult::Satisfiable)
    }

    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, CheckResult::Unsatisfiable)
    }

    /// Whether this is a definite answer rather than a failure mode.
    pub fn is_definite(&self) -> bool {
        matches!(self, CheckResult::Satisfiable | CheckResult::Unsatisfiable)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Satisfiable => write!(f, "sat"),
            CheckResult::Unsatisfiable => write!(f, "unsat"),
            CheckResult::Unknown => write!(f, "unknown"),
            CheckResult::Conflicting => write!(f, "conflicting"),
            CheckResult::Error => write!(f, "error"),
        }
    }
}

/// Result of a query plus whatever model or raw answer text the back-end
/// could produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub result: CheckResult,
    /// Raw answer lines, when the back-end has them (empty otherwise).
    pub values: Vec<String>,
}

impl QueryResponse {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            values: Vec::new(),
        }
    }

    pub fn with_values(result: CheckResult, values: Vec<String>) -> Self {
        Self { result, values }
    }
}
