//! SMT-LIB2 text back-end.
//!
//! This adapter never runs a solver itself. Each query is serialized and
//! answered from one of two places: a pre-recorded response map keyed by
//! the query's SHA-256 digest (replay mode), or a host-provided callback
//! that forwards the text to whatever solver the host can reach. Queries
//! neither source can answer are cached verbatim so the driver can report
//! them for offline solving.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

use crate::backend::HornBackend;
use crate::render::{interpret_check_sat, RuleStore};
use crate::result::{CheckResult, QueryResponse};

/// Host hook invoked with the serialized query text; `None` means the
/// host could not produce an answer.
pub type QueryCallback = Box<dyn FnMut(&str) -> Option<String>>;

/// Horn back-end speaking the SMT-LIB2 text dialect.
pub struct SmtLib2Horn {
    store: RuleStore,
    responses: HashMap<String, String>,
    callback: Option<QueryCallback>,
    unhandled: Vec<String>,
}

impl SmtLib2Horn {
    pub fn new(responses: HashMap<String, String>, callback: Option<QueryCallback>) -> Self {
        Self {
            store: RuleStore::new(),
            responses,
            callback,
            unhandled: Vec::new(),
        }
    }

    /// Hex SHA-256 digest of a serialized query; the key of the replay map.
    pub fn query_hash(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn answer(&mut self, query: &str) -> Option<String> {
        let hash = Self::query_hash(query);
        if let Some(response) = self.responses.get(&hash) {
            tracing::debug!(%hash, "query answered from recorded responses");
            return Some(response.clone());
        }
        if let Some(callback) = self.callback.as_mut() {
            return callback(query);
        }
        None
    }
}

impl HornBackend for SmtLib2Horn {
    fn register_relation(&mut self, name: &str, domain: &[Sort]) {
        self.store.declare_relation(name, domain);
    }

    fn add_rule(&mut self, rule: &Expr, name: &str) {
        self.store.add_rule(rule, name);
    }

    fn query(&mut self, goal: &Expr) -> QueryResponse {
        let query = self.store.render_query(goal);
        match self.answer(&query) {
            Some(response) => {
                let result = interpret_check_sat(&response);
                QueryResponse::with_values(result, vec![response.trim().to_string()])
            }
            None => {
                tracing::debug!(goal = %goal.name(), "query left unhandled");
                self.unhandled.push(query);
                QueryResponse::new(CheckResult::Unknown)
            }
        }
    }

    fn unhandled_queries(&self) -> Vec<String> {
        self.unhandled.clone()
    }
}
