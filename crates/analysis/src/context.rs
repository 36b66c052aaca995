//! Per-analysis scratch state shared by the expression encoder and the
//! rule emitter.
//!
//! The context owns the arena of symbolic variables (one per source
//! declaration, keyed by the declaration's stable id) and a stack of
//! assumption scopes. During Horn encoding, assumption accumulation is
//! disabled: assumptions exist only to build the rule currently being
//! emitted and vanish when the scope is popped.

use std::collections::HashMap;

use sol_fv_smtlib::expr::Expr;

use crate::ast::{VarId, VariableDeclaration};
use crate::error::ChcError;
use crate::symbolic::SymbolicVariable;

struct Entry {
    declaration: VariableDeclaration,
    symbolic: SymbolicVariable,
}

/// Variable registry plus scoped assumptions.
pub struct EncodingContext {
    variables: HashMap<VarId, Entry>,
    /// Assumption frames; the base frame is never popped.
    scopes: Vec<Vec<Expr>>,
    accumulate_assertions: bool,
}

impl Default for EncodingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingContext {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
            scopes: vec![Vec::new()],
            accumulate_assertions: true,
        }
    }

    /// When disabled, assumptions dropped by [`pop_solver`] are discarded;
    /// when enabled they fold into the parent frame and survive the pop.
    ///
    /// [`pop_solver`]: EncodingContext::pop_solver
    pub fn set_assertion_accumulation(&mut self, accumulate: bool) {
        self.accumulate_assertions = accumulate;
    }

    /// Forget all variables and assumptions.
    pub fn clear(&mut self) {
        self.variables.clear();
        self.scopes = vec![Vec::new()];
    }

    /// Register a declaration, creating its symbolic variable lazily from
    /// the declaration's sort. Idempotent.
    pub fn create_variable(&mut self, declaration: &VariableDeclaration) {
        self.variable(declaration);
    }

    /// The symbolic variable for a declaration, created on first use.
    pub fn variable(&mut self, declaration: &VariableDeclaration) -> &mut SymbolicVariable {
        let entry = self
            .variables
            .entry(declaration.id)
            .or_insert_with(|| Entry {
                declaration: declaration.clone(),
                symbolic: SymbolicVariable::new(
                    format!("{}_{}", declaration.name, declaration.id),
                    declaration.ty.smt_sort(),
                ),
            });
        &mut entry.symbolic
    }

    pub fn known_variable(&self, id: VarId) -> bool {
        self.variables.contains_key(&id)
    }

    pub fn variable_by_id(&self, id: VarId) -> Option<&SymbolicVariable> {
        self.variables.get(&id).map(|e| &e.symbolic)
    }

    pub fn variable_by_id_mut(&mut self, id: VarId) -> Option<&mut SymbolicVariable> {
        self.variables.get_mut(&id).map(|e| &mut e.symbolic)
    }

    /// Push an assumption into the current scope.
    pub fn add_assertion(&mut self, assumption: Expr) {
        // The base frame always exists.
        if let Some(frame) = self.scopes.last_mut() {
            frame.push(assumption);
        }
    }

    pub fn push_solver(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Drop the innermost assumption scope.
    ///
    /// Popping the base frame is an invariant violation: pushes and pops
    /// must balance on every exit path of a visitor scope.
    pub fn pop_solver(&mut self) -> Result<(), ChcError> {
        if self.scopes.len() <= 1 {
            return Err(ChcError::invariant("assumption scope underflow"));
        }
        let popped = self.scopes.pop().unwrap_or_default();
        if self.accumulate_assertions {
            if let Some(frame) = self.scopes.last_mut() {
                frame.extend(popped);
            }
        }
        Ok(())
    }

    /// Number of open scopes above the base frame.
    pub fn scope_depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Conjunction of every active assumption, innermost last.
    pub fn assertions(&self) -> Expr {
        let all: Vec<Expr> = self.scopes.iter().flatten().cloned().collect();
        Expr::conj(all)
    }

    /// Advance the index of every registered variable whose declaration
    /// matches, giving each a fresh unconstrained value.
    pub fn reset_variables(&mut self, predicate: impl Fn(&VariableDeclaration) -> bool) {
        for entry in self.variables.values_mut() {
            if predicate(&entry.declaration) {
                entry.symbolic.increase_index();
            }
        }
    }

    /// Reset every registered variable to SSA index 0.
    pub fn reset_all_indices(&mut self) {
        for entry in self.variables.values_mut() {
            entry.symbolic.reset_index();
        }
    }

    /// Assume the index-0 term of a variable equals its sort's zero.
    pub fn set_zero_value(&mut self, id: VarId) {
        let assumption = self
            .variables
            .get(&id)
            .and_then(|e| e.symbolic.zero_assumption());
        if let Some(assumption) = assumption {
            self.add_assertion(assumption);
        }
    }
}
