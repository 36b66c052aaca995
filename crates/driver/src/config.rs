//! Model-checker configuration.
//!
//! No CLI, environment variables or on-disk state: hosts construct a
//! [`ModelCheckerSettings`] value and hand it to the driver.

use std::collections::HashMap;

use sol_fv_solver::smtlib2::QueryCallback;

/// Which Horn back-ends to run. Enabling both cross-checks their
/// answers through the portfolio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverChoice {
    /// Direct solving through a system z3 process.
    pub spacer: bool,
    /// SMT-LIB2 text exchange via callback / recorded responses.
    pub smtlib2: bool,
}

impl SolverChoice {
    pub fn all() -> Self {
        Self {
            spacer: true,
            smtlib2: true,
        }
    }

    pub fn only_smtlib2() -> Self {
        Self {
            spacer: false,
            smtlib2: true,
        }
    }
}

impl Default for SolverChoice {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-analysis settings.
pub struct ModelCheckerSettings {
    pub solvers: SolverChoice,
    /// Pre-recorded solver answers keyed by the SHA-256 hex digest of the
    /// serialized query, for offline replay.
    pub smtlib2_responses: HashMap<String, String>,
    /// Host hook that forwards a serialized query to whatever solver the
    /// host can invoke.
    pub smt_callback: Option<QueryCallback>,
}

impl Default for ModelCheckerSettings {
    fn default() -> Self {
        Self {
            solvers: SolverChoice::default(),
            smtlib2_responses: HashMap::new(),
            smt_callback: None,
        }
    }
}
