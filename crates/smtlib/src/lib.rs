//! # sol-fv-smtlib
//!
//! Solver-independent building blocks for the sol-fv model checker:
//! sorts, a first-order expression algebra, and the SMT-LIB commands a
//! Horn-clause query is made of, with text formatting.
//!
//! The expression algebra deliberately performs no simplification and no
//! normalization of associativity/commutativity; back-end solvers are
//! expected to normalize. The text form is used only for rule naming and
//! SMT-LIB2 serialization.

pub mod command;
pub mod expr;
pub mod formatter;
pub mod sort;

pub use command::Command;
pub use expr::Expr;
pub use sort::{FunctionSort, Sort};
