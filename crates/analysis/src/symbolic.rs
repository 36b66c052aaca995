//! SSA-indexed symbolic values.
//!
//! A [`SymbolicVariable`] stands for one source variable; every write
//! advances its index so each assignment produces a fresh logical name.
//! A [`SymbolicFunctionVariable`] is a named predicate symbol ("block")
//! with the same index mechanism, used to refresh relations such as a
//! contract's error predicate between queries.

use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;

/// A source variable as a family of solver constants `name_0, name_1, ...`.
#[derive(Debug, Clone)]
pub struct SymbolicVariable {
    name: String,
    sort: Sort,
    index: usize,
}

impl SymbolicVariable {
    pub fn new(name: impl Into<String>, sort: Sort) -> Self {
        Self {
            name: name.into(),
            sort,
            index: 0,
        }
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn name_at(&self, index: usize) -> String {
        format!("{}_{}", self.name, index)
    }

    /// The term at the current SSA index.
    pub fn current_value(&self) -> Expr {
        Expr::var(self.name_at(self.index), self.sort.clone())
    }

    /// The term at an earlier index; `None` for indices never reached.
    pub fn value_at(&self, index: usize) -> Option<Expr> {
        if index > self.index {
            return None;
        }
        Some(Expr::var(self.name_at(index), self.sort.clone()))
    }

    pub fn increase_index(&mut self) {
        self.index += 1;
    }

    pub fn reset_index(&mut self) {
        self.index = 0;
    }

    /// Assumption equating the index-0 term with the sort's zero, when
    /// the sort has one.
    pub fn zero_assumption(&self) -> Option<Expr> {
        let zero = self.sort.zero_value()?;
        let at_zero = self.value_at(0)?;
        Some(Expr::eq(at_zero, zero))
    }
}

/// A named predicate symbol with an SSA index of its own.
#[derive(Debug, Clone)]
pub struct SymbolicFunctionVariable {
    name: String,
    domain: Vec<Sort>,
    index: usize,
}

impl SymbolicFunctionVariable {
    pub fn new(name: impl Into<String>, domain: Vec<Sort>) -> Self {
        Self {
            name: name.into(),
            domain,
            index: 0,
        }
    }

    pub fn domain(&self) -> &[Sort] {
        &self.domain
    }

    /// The relation sort `domain -> Bool`.
    pub fn sort(&self) -> Sort {
        Sort::relation(self.domain.clone())
    }

    /// Name of the current relation instance.
    pub fn current_name(&self) -> String {
        format!("{}_{}", self.name, self.index)
    }

    /// Apply the current instance to an argument vector.
    pub fn apply(&self, args: Vec<Expr>) -> Expr {
        Expr::app(self.current_name(), args)
    }

    /// Refresh to a new relation instance; the caller re-registers it.
    pub fn increase_index(&mut self) {
        self.index += 1;
    }
}
