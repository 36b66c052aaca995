//! Direct Horn solving through a system `z3` process.
//!
//! Each query pipes the accumulated clause system into `z3 -in` and
//! reads the `(check-sat)` answer back. The process is bounded by an
//! OS-level deadline and killed if it overruns; a missing or broken
//! binary degrades to [`CheckResult::Error`] instead of failing the
//! analysis.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

use crate::backend::HornBackend;
use crate::error::SolverError;
use crate::render::{interpret_check_sat, RuleStore};
use crate::result::{CheckResult, QueryResponse};

/// Configuration of the Spacer process back-end.
#[derive(Debug, Clone)]
pub struct SpacerConfig {
    /// Path to the z3 binary.
    pub solver_path: PathBuf,
    /// Per-query timeout in milliseconds (0 = no timeout).
    pub timeout_ms: u64,
}

impl SpacerConfig {
    pub fn new(solver_path: PathBuf) -> Self {
        Self {
            solver_path,
            timeout_ms: 0,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Locate z3 via PATH lookup, then common installation paths.
    pub fn auto_detect() -> Result<Self, SolverError> {
        if let Ok(output) = Command::new("which").arg("z3").output() {
            if output.status.success() {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(&path_str);
                    if path.exists() {
                        return Ok(Self::new(path));
                    }
                }
            }
        }

        for candidate in ["/opt/homebrew/bin/z3", "/usr/local/bin/z3", "/usr/bin/z3"] {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(Self::new(path));
            }
        }

        Err(SolverError::MissingSolver(PathBuf::from("z3")))
    }
}

/// Horn back-end driving z3's Spacer engine over a pipe.
pub struct SpacerSolver {
    config: SpacerConfig,
    store: RuleStore,
}

impl SpacerSolver {
    pub fn new(config: SpacerConfig) -> Self {
        Self {
            config,
            store: RuleStore::new(),
        }
    }

    /// Create a solver with an auto-detected z3 binary.
    pub fn with_default_config() -> Result<Self, SolverError> {
        Ok(Self::new(SpacerConfig::auto_detect()?))
    }

    fn run_solver(&self, input: &str) -> Result<String, SolverError> {
        let mut args = vec!["-in".to_string()];
        if self.config.timeout_ms > 0 {
            args.push(format!("-t:{}", self.config.timeout_ms));
        }

        let mut child = Command::new(&self.config.solver_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SolverError::Pipe(format!(
                    "could not start {}: {e}",
                    self.config.solver_path.display()
                ))
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| SolverError::Pipe("solver refused a stdin pipe".to_string()))?;
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| SolverError::Pipe(format!("writing the query failed: {e}")))?;
            // Dropping stdin closes the pipe and signals EOF.
        }

        self.wait_with_deadline(&mut child)?;

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout)
                .map_err(|e| SolverError::Pipe(format!("reading the answer failed: {e}")))?;
        }
        if stdout.trim().is_empty() {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                let _ = err.read_to_string(&mut stderr);
            }
            return Err(SolverError::GarbledAnswer(stderr.trim().to_string()));
        }
        Ok(stdout)
    }

    /// Wait for the child, enforcing an OS-level deadline on top of z3's
    /// own `-t:` flag, which older versions ignore on hard problems.
    fn wait_with_deadline(&self, child: &mut Child) -> Result<(), SolverError> {
        let hard_limit = if self.config.timeout_ms > 0 {
            // z3's soft timeout gets a head start before the hard kill.
            let ms = (self.config.timeout_ms * 3).max(10_000);
            Some(Duration::from_millis(ms))
        } else {
            None
        };
        let started = Instant::now();

        loop {
            match child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => {
                    if let Some(limit) = hard_limit {
                        if started.elapsed() > limit {
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(SolverError::DeadlineExpired(limit));
                        }
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    return Err(SolverError::Pipe(format!(
                        "waiting on the solver failed: {e}"
                    )));
                }
            }
        }
    }
}

impl HornBackend for SpacerSolver {
    fn register_relation(&mut self, name: &str, domain: &[Sort]) {
        self.store.declare_relation(name, domain);
    }

    fn add_rule(&mut self, rule: &Expr, name: &str) {
        self.store.add_rule(rule, name);
    }

    fn query(&mut self, goal: &Expr) -> QueryResponse {
        let script = self.store.render_query(goal);
        match self.run_solver(&script) {
            Ok(answer) => {
                let result = interpret_check_sat(&answer);
                tracing::debug!(goal = %goal.name(), %result, "spacer answered");
                QueryResponse::with_values(result, vec![answer.trim().to_string()])
            }
            Err(SolverError::DeadlineExpired(limit)) => {
                tracing::warn!(goal = %goal.name(), ?limit, "spacer hit its deadline");
                QueryResponse::new(CheckResult::Unknown)
            }
            Err(e) => {
                tracing::warn!(goal = %goal.name(), error = %e, "spacer failed");
                QueryResponse::new(CheckResult::Error)
            }
        }
    }
}
