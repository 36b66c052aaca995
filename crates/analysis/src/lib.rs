//! # sol-fv-analysis
//!
//! The CHC encoding at the center of the sol-fv model checker.
//!
//! [`chc::ChcEngine`] walks the typed AST of a source unit
//! ([`ast::SourceUnit`]), emits Horn rules over predicate symbols through
//! a [`sol_fv_solver::HornBackend`], queries each public function's error
//! predicate, and reports outcomes through [`report::ErrorReporter`].
//! The [`context::EncodingContext`] and [`encoder`] carry the SSA and
//! assumption machinery the encoding is built on.

pub mod ast;
pub mod chc;
pub mod context;
pub mod encoder;
pub mod error;
pub mod report;
pub mod symbolic;

pub use chc::ChcEngine;
pub use context::EncodingContext;
pub use error::ChcError;
pub use report::{Diagnostic, ErrorReporter, Severity};
