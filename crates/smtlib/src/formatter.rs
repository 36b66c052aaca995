//! SMT-LIB2 text formatting.
//!
//! Implements `Display` for [`Sort`], [`Expr`] and [`Command`],
//! producing text that Horn-capable solvers accept.

use std::fmt;

use crate::command::Command;
use crate::expr::Expr;
use crate::sort::Sort;

// ---------------------------------------------------------------------------
// Sort
// ---------------------------------------------------------------------------

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Array(index, element) => write!(f, "(Array {index} {element})"),
            Sort::Tuple(components) => {
                write!(f, "(Tuple")?;
                for c in components {
                    write!(f, " {c}")?;
                }
                write!(f, ")")
            }
            Sort::Function(fun) => {
                // Function sorts never appear as argument sorts; this
                // arrow form is for debugging output only.
                write!(f, "(")?;
                for (i, d) in fun.domain.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{d}")?;
                }
                write!(f, ") -> {}", fun.codomain)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

/// Write a binary operator: `(op lhs rhs)`.
fn fmt_binop(op: &str, lhs: &Expr, rhs: &Expr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({op} {lhs} {rhs})")
}

/// Write an n-ary operator; the empty conjunction/disjunction collapses
/// to its neutral element.
fn fmt_nary(op: &str, neutral: &str, terms: &[Expr], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if terms.is_empty() {
        return write!(f, "{neutral}");
    }
    if terms.len() == 1 {
        return write!(f, "{}", terms[0]);
    }
    write!(f, "({op}")?;
    for t in terms {
        write!(f, " {t}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BoolLit(true) => write!(f, "true"),
            Expr::BoolLit(false) => write!(f, "false"),
            Expr::IntLit(n) => {
                if *n < 0 {
                    // SMT-LIB has no negative literals
                    write!(f, "(- {})", n.unsigned_abs())
                } else {
                    write!(f, "{n}")
                }
            }
            Expr::Var(name, _) => write!(f, "{name}"),
            Expr::Not(a) => write!(f, "(not {a})"),
            Expr::And(terms) => fmt_nary("and", "true", terms, f),
            Expr::Or(terms) => fmt_nary("or", "false", terms, f),
            Expr::Implies(a, b) => fmt_binop("=>", a, b, f),
            Expr::Eq(a, b) => fmt_binop("=", a, b, f),
            Expr::Lt(a, b) => fmt_binop("<", a, b, f),
            Expr::Le(a, b) => fmt_binop("<=", a, b, f),
            Expr::Gt(a, b) => fmt_binop(">", a, b, f),
            Expr::Ge(a, b) => fmt_binop(">=", a, b, f),
            Expr::Add(a, b) => fmt_binop("+", a, b, f),
            Expr::Sub(a, b) => fmt_binop("-", a, b, f),
            Expr::Mul(a, b) => fmt_binop("*", a, b, f),
            Expr::Div(a, b) => fmt_binop("div", a, b, f),
            Expr::Mod(a, b) => fmt_binop("mod", a, b, f),
            Expr::Neg(a) => write!(f, "(- {a})"),
            Expr::App(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "({name}")?;
                    for a in args {
                        write!(f, " {a}")?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

fn fmt_sorted_vars(vars: &[(String, Sort)], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "(")?;
    for (i, (name, sort)) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "({name} {sort})")?;
    }
    write!(f, ")")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetLogic(logic) => write!(f, "(set-logic {logic})"),
            Command::DeclareFun(name, params, ret) => {
                write!(f, "(declare-fun {name} (")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {ret})")
            }
            Command::AssertForall(vars, body) => {
                // A forall with no binders is not well-formed SMT-LIB;
                // ground rules are asserted directly.
                if vars.is_empty() {
                    write!(f, "(assert {body})")
                } else {
                    write!(f, "(assert (forall ")?;
                    fmt_sorted_vars(vars, f)?;
                    write!(f, " {body}))")
                }
            }
            Command::CheckSat => write!(f, "(check-sat)"),
            Command::Comment(text) => write!(f, "; {text}"),
        }
    }
}
