use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Failure modes of the Spacer process back-end.
///
/// None of these abort an analysis: the back-end folds them into an
/// `unknown` or `error` query outcome and the driver keeps going, so a
/// machine without z3 still produces a report (with the text back-end
/// caching the queries it could not answer).
#[derive(Debug)]
pub enum SolverError {
    /// No Horn-capable solver binary at the probed location.
    MissingSolver(PathBuf),
    /// The solver process could not be started, or a pipe to it broke
    /// while the clause system was in flight.
    Pipe(String),
    /// The process exited without an interpretable `(check-sat)` answer;
    /// carries whatever it wrote to stderr instead.
    GarbledAnswer(String),
    /// The hard deadline expired and the process was killed.
    DeadlineExpired(Duration),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::MissingSolver(path) => write!(
                f,
                "no Horn solver found at {}; install z3 or configure an explicit path",
                path.display()
            ),
            SolverError::Pipe(reason) => write!(f, "lost the solver process: {reason}"),
            SolverError::GarbledAnswer(stderr) => {
                write!(f, "solver produced no usable answer: {stderr:?}")
            }
            SolverError::DeadlineExpired(limit) => write!(
                f,
                "solver exceeded its {}ms deadline and was killed",
                limit.as_millis()
            ),
        }
    }
}

impl std::error::Error for SolverError {}
