//! Horn-clause encoding of contract programs.
//!
//! Walks the typed AST of a source unit and emits, for each contract, a
//! predicate graph: `genesis` feeds an implicit-constructor predicate,
//! constructor bodies thread into the contract's `interface` predicate
//! (its quiescent between-transactions state), every function body
//! becomes a chain of basic-block predicates from a genesis-fed entry to
//! the function's summary, and public functions additionally connect the
//! interface to a per-function error predicate guarded by the error
//! index. Reachability of an error predicate is then a reachability
//! query against the back-end.
//!
//! ## SSA and scope discipline
//!
//! Every rule is self-contained: switching to a new source block pops
//! the assumption scope, resets all variable indices (state variables
//! keep index 0 reserved for their value at the start of the current
//! transaction) and pushes a fresh scope. The error index is the one
//! piece of state that survives block switches; it is reset per
//! contract.

use std::collections::HashMap;

use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;
use sol_fv_solver::backend::HornBackend;
use sol_fv_solver::result::{CheckResult, QueryResponse};

use crate::ast::{
    Block, CallKind, ContractDefinition, ContractKind, Expression, ExpressionKind, ForStatement,
    FunctionCall, FunctionDefinition, FunctionRef, IfStatement, NodeId, SourceLocation,
    SourceUnit, Statement, VariableDeclaration, VariableDeclarationStatement, WhileStatement,
};
use crate::context::EncodingContext;
use crate::encoder;
use crate::error::ChcError;
use crate::report::ErrorReporter;
use crate::symbolic::{SymbolicFunctionVariable, SymbolicVariable};

/// Handle to a predicate symbol in the engine's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredId(usize);

/// How to build the argument vector when entering a block.
enum BlockArgs {
    /// Error index, state, parameters and locals of the current function.
    Block,
    /// Current state variables only (interface-sorted predicates).
    CurrentState,
    /// State variables at index 0.
    InitialState,
}

#[derive(Debug, Clone)]
struct VerificationTarget {
    function: NodeId,
    location: SourceLocation,
}

#[derive(Debug, Clone)]
struct FunctionError {
    function: NodeId,
    location: SourceLocation,
    predicate: Expr,
}

/// The rule emitter: one instance analyzes one source unit.
pub struct ChcEngine<'a> {
    unit: &'a SourceUnit,
    backend: &'a mut dyn HornBackend,
    reporter: &'a mut ErrorReporter,
    ctx: EncodingContext,

    /// Arena of predicate symbols, indexed by [`PredId`].
    predicates: Vec<SymbolicFunctionVariable>,
    genesis: Option<PredId>,

    // Per-contract state.
    current_contract: Option<usize>,
    state_variables: Vec<VariableDeclaration>,
    state_sorts: Vec<Sort>,
    interface_pred: Option<PredId>,
    error_pred: Option<PredId>,
    constructor_pred: Option<PredId>,
    summaries: HashMap<NodeId, PredId>,
    verification_targets: Vec<VerificationTarget>,
    function_errors: Vec<FunctionError>,
    /// Index of the first fired verification target along a path;
    /// 0 while none has fired.
    error: SymbolicVariable,
    block_counter: usize,

    // Visitor state.
    current_block: Expr,
    current_function: Option<FunctionRef>,
    break_dest: Option<PredId>,
    continue_dest: Option<PredId>,
    unknown_call_seen: bool,
}

impl<'a> ChcEngine<'a> {
    pub fn new(
        unit: &'a SourceUnit,
        backend: &'a mut dyn HornBackend,
        reporter: &'a mut ErrorReporter,
    ) -> Self {
        Self {
            unit,
            backend,
            reporter,
            ctx: EncodingContext::new(),
            predicates: Vec::new(),
            genesis: None,
            current_contract: None,
            state_variables: Vec::new(),
            state_sorts: Vec::new(),
            interface_pred: None,
            error_pred: None,
            constructor_pred: None,
            summaries: HashMap::new(),
            verification_targets: Vec::new(),
            function_errors: Vec::new(),
            error: SymbolicVariable::new("error", Sort::Int),
            block_counter: 0,
            current_block: Expr::BoolLit(true),
            current_function: None,
            break_dest: None,
            continue_dest: None,
            unknown_call_seen: false,
        }
    }

    /// Encode every contract of the unit and query its error predicates.
    pub fn analyze(&mut self) -> Result<(), ChcError> {
        self.ctx.clear();
        self.ctx.set_assertion_accumulation(false);

        let genesis = self.create_predicate("genesis".to_string(), Vec::new());
        self.genesis = Some(genesis);
        let fact = self.apply(genesis, Vec::new());
        self.backend.add_rule(&fact, "genesis");

        for idx in 0..self.unit.contracts.len() {
            self.visit_contract(idx)?;
        }
        Ok(())
    }

    /// Queries the back-end could not answer, serialized for the host.
    pub fn unhandled_queries(&self) -> Vec<String> {
        self.backend.unhandled_queries()
    }

    /// Scratch state, exposed for invariant checks in tests.
    pub fn context(&self) -> &EncodingContext {
        &self.ctx
    }

    // -----------------------------------------------------------------
    // Contract level
    // -----------------------------------------------------------------

    fn visit_contract(&mut self, idx: usize) -> Result<(), ChcError> {
        let contract = self.contract_def(idx);
        if !matches!(contract.kind, ContractKind::Contract) {
            tracing::debug!(contract = %contract.name, "skipping library or interface");
            return Ok(());
        }
        tracing::info!(contract = %contract.name, "encoding contract");

        self.reset_contract_state();
        self.current_contract = Some(idx);

        self.state_variables = contract
            .state_variables_including_inherited(self.unit)
            .into_iter()
            .cloned()
            .collect();
        for var in &self.state_variables {
            self.ctx.create_variable(var);
        }
        self.state_sorts = self
            .state_variables
            .iter()
            .map(|v| v.ty.smt_sort())
            .collect();

        // One summary per function defined anywhere in the hierarchy, so
        // call sites can reason over pre/post relations.
        for &base in &contract.bases {
            let base_contract = self.contract_def(base);
            for function in &base_contract.functions {
                let name = format!(
                    "summary_{}_{}",
                    self.unique_prefix(),
                    function_predicate_name(function)
                );
                let domain = self.summary_sort(function);
                let pred = self.create_predicate(name, domain);
                self.summaries.insert(function.id, pred);
            }
        }

        self.clear_indices();

        let suffix = format!("{}_{}", contract.name, contract.id);
        let interface =
            self.create_predicate(format!("interface_{suffix}"), self.state_sorts.clone());
        self.interface_pred = Some(interface);
        let error = self.create_predicate(format!("error_{suffix}"), Vec::new());
        self.error_pred = Some(error);
        let constructor = self.create_predicate(
            format!("implicit_constructor_{}", contract.id),
            self.state_sorts.clone(),
        );
        self.constructor_pred = Some(constructor);

        self.ctx.push_solver();

        // State variables hold their zero value at genesis.
        let state_ids: Vec<_> = self.state_variables.iter().map(|v| v.id).collect();
        for id in state_ids {
            self.ctx.set_zero_value(id);
        }
        let genesis_app = self.genesis_application()?;
        let constructor_app = self.constructor_application()?;
        self.connect(genesis_app, constructor_app.clone(), Expr::BoolLit(true));
        self.current_block = constructor_app;

        if let Some(ctor) = contract.constructor() {
            self.visit_function(idx, ctor)?;
        } else {
            self.inline_constructor_hierarchy(contract)?;
        }

        let interface_app = self.interface_application()?;
        self.connect(self.current_block.clone(), interface_app, Expr::BoolLit(true));

        // The zero-state assumptions (and any constructor leftovers)
        // belong to the deployment rules only; function entries start
        // from a clean scope.
        self.ctx.pop_solver()?;
        self.ctx.push_solver();

        for (fidx, function) in contract.functions.iter().enumerate() {
            if !function.is_constructor {
                self.visit_function(idx, fidx)?;
            }
        }

        let function_errors = std::mem::take(&mut self.function_errors);
        for fe in &function_errors {
            // A function without verification targets has nothing to ask.
            let has_targets = self
                .verification_targets
                .iter()
                .any(|t| t.function == fe.function);
            if !has_targets {
                continue;
            }
            let response = self.backend.query(&fe.predicate);
            self.report_query(fe, &response);
        }
        self.function_errors = function_errors;

        self.ctx.pop_solver()?;
        self.current_contract = None;
        Ok(())
    }

    /// Visit base constructors base-most first when the contract has no
    /// explicit constructor of its own.
    fn inline_constructor_hierarchy(
        &mut self,
        contract: &'a ContractDefinition,
    ) -> Result<(), ChcError> {
        for &base in contract.bases.iter().rev() {
            let base_contract = self.contract_def(base);
            if let Some(ctor) = base_contract.constructor() {
                self.visit_function(base, ctor)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Function level
    // -----------------------------------------------------------------

    fn visit_function(&mut self, contract_idx: usize, fn_idx: usize) -> Result<(), ChcError> {
        let function = self.function_def(FunctionRef {
            contract: contract_idx,
            function: fn_idx,
        });
        if !function.is_implemented {
            return Ok(());
        }

        // A base constructor may be visited while a derived constructor
        // frame is already open; it inlines into that frame.
        if let Some(active) = self.current_function {
            let active_def = self.function_def(active);
            let current_contract = self
                .current_contract
                .ok_or_else(|| ChcError::invariant("function visit outside any contract"))?;
            if !active_def.is_constructor
                || !function.is_constructor
                || function.scope == current_contract
            {
                return Err(ChcError::invariant(
                    "function visited while another function frame is active",
                ));
            }
            self.init_function_variables(function);
            self.visit_block(&function.body)?;
            return Ok(());
        }

        tracing::info!(function = %function.name, constructor = function.is_constructor, "encoding function");
        self.current_function = Some(FunctionRef {
            contract: contract_idx,
            function: fn_idx,
        });
        self.init_function_variables(function);
        self.clear_indices();

        if function.is_constructor {
            self.visit_constructor(function)?;
        } else {
            self.visit_regular_function(function)?;
        }
        self.current_function = None;
        Ok(())
    }

    /// Constructors thread the current block (implicit constructor or a
    /// preceding constructor's exit) through their body into a dedicated
    /// exit predicate; they emit no summary and no genesis entry.
    fn visit_constructor(&mut self, function: &'a FunctionDefinition) -> Result<(), ChcError> {
        let contract_idx = self
            .current_contract
            .ok_or_else(|| ChcError::invariant("constructor visit outside any contract"))?;
        // The most-derived constructor inlines its base constructors
        // before its own body. Base constructors reached through the
        // hierarchy walk must not re-inline theirs.
        if function.scope == contract_idx {
            let contract = self.contract_def(contract_idx);
            for &base in contract.bases.iter().rev() {
                if base == contract_idx {
                    continue;
                }
                let base_contract = self.contract_def(base);
                if let Some(ctor) = base_contract.constructor() {
                    self.visit_function(base, ctor)?;
                }
            }
        }

        self.visit_block(&function.body)?;

        let exit_name = format!("constructor_exit_{}_{}", self.unique_prefix(), function.id);
        let exit = self.create_predicate(exit_name, self.state_sorts.clone());
        let exit_app = self.apply(exit, self.current_state_variables()?);
        self.connect(self.current_block.clone(), exit_app, Expr::BoolLit(true));
        self.set_current_block(exit, BlockArgs::CurrentState)
    }

    fn visit_regular_function(&mut self, function: &'a FunctionDefinition) -> Result<(), ChcError> {
        let entry = self.create_function_block(function);
        let body_block = self.create_block("", function.body.id)?;

        let entry_app = self.apply(entry, self.current_function_variables()?);
        let genesis_app = self.genesis_application()?;
        self.connect(genesis_app, entry_app.clone(), Expr::BoolLit(true));

        // At entry the error index is clear and every state variable
        // still has its transaction-start value.
        self.ctx
            .add_assertion(Expr::eq(self.error.current_value(), Expr::IntLit(0)));
        for var in &self.state_variables {
            let sym = self
                .ctx
                .variable_by_id(var.id)
                .ok_or_else(|| ChcError::invariant("state variable not registered"))?;
            let at_zero = sym
                .value_at(0)
                .ok_or_else(|| ChcError::invariant("state variable lost its initial index"))?;
            let current = sym.current_value();
            self.ctx.add_assertion(Expr::eq(at_zero, current));
        }
        let body_app = self.block_application(body_block)?;
        self.connect(entry_app, body_app, Expr::BoolLit(true));

        self.set_current_block(body_block, BlockArgs::Block)?;
        self.visit_block(&function.body)?;

        // Normal exit binds the summary at the body's final indices.
        let interface_tail = self.interface_application()?;
        let summary_tail = self.summary_application(function)?;
        self.connect(
            self.current_block.clone(),
            summary_tail.clone(),
            Expr::BoolLit(true),
        );

        let interface = self
            .interface_pred
            .ok_or_else(|| ChcError::invariant("no interface predicate"))?;
        self.set_current_block(interface, BlockArgs::InitialState)?;

        if function.is_public {
            self.create_error_block()?;
            let error_app = self.error_application()?;
            let err = self.error.current_value();
            self.connect(
                self.current_block.clone(),
                error_app.clone(),
                Expr::and(summary_tail.clone(), Expr::gt(err.clone(), Expr::IntLit(0))),
            );
            self.connect(
                self.current_block.clone(),
                interface_tail,
                Expr::and(summary_tail, Expr::eq(err, Expr::IntLit(0))),
            );
            self.function_errors.push(FunctionError {
                function: function.id,
                location: function.location,
                predicate: error_app,
            });
        }
        Ok(())
    }

    fn init_function_variables(&mut self, function: &'a FunctionDefinition) {
        for var in function.parameters.iter().chain(function.returns.iter()) {
            self.ctx.create_variable(var);
        }
        for var in function.local_variables() {
            self.ctx.create_variable(var);
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn visit_block(&mut self, block: &'a Block) -> Result<(), ChcError> {
        for stmt in &block.statements {
            self.visit_statement(stmt)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, stmt: &'a Statement) -> Result<(), ChcError> {
        match stmt {
            Statement::Block(b) => self.visit_block(b),
            Statement::If(s) => self.visit_if(s),
            Statement::While(s) => self.visit_while(s),
            Statement::For(s) => self.visit_for(s),
            Statement::Break { id, location } => self.visit_break(*id, *location),
            Statement::Continue { id, location } => self.visit_continue(*id, *location),
            Statement::VariableDeclaration(s) => self.visit_variable_declaration(s),
            Statement::Expression(s) => {
                self.expr(&s.expression)?;
                Ok(())
            }
        }
    }

    fn visit_if(&mut self, s: &'a IfStatement) -> Result<(), ChcError> {
        let saved_unknown = self.unknown_call_seen;
        self.unknown_call_seen = false;

        let body_id = self.current_function_def()?.body.id;
        let if_header = self.create_block("if_header_", s.id)?;
        let if_true = self.create_block("if_true_", s.true_branch.id)?;
        let if_false = match &s.false_branch {
            Some(branch) => Some(self.create_block("if_false_", branch.id)?),
            None => None,
        };
        let after_if = self.create_block("", body_id)?;

        let header_app = self.block_application(if_header)?;
        self.connect(self.current_block.clone(), header_app, Expr::BoolLit(true));

        // Condition side effects land in the header block.
        self.set_current_block(if_header, BlockArgs::Block)?;
        let condition = self.expr(&s.condition)?;

        let true_app = self.block_application(if_true)?;
        self.connect(self.current_block.clone(), true_app, condition.clone());
        let negated = Expr::not(condition);
        match if_false {
            Some(pred) => {
                let false_app = self.block_application(pred)?;
                self.connect(self.current_block.clone(), false_app, negated);
            }
            None => {
                let after_app = self.block_application(after_if)?;
                self.connect(self.current_block.clone(), after_app, negated);
            }
        }

        self.set_current_block(if_true, BlockArgs::Block)?;
        self.visit_block(&s.true_branch)?;
        let after_app = self.block_application(after_if)?;
        self.connect(self.current_block.clone(), after_app, Expr::BoolLit(true));

        if let (Some(pred), Some(branch)) = (if_false, &s.false_branch) {
            self.set_current_block(pred, BlockArgs::Block)?;
            self.visit_block(branch)?;
            let after_app = self.block_application(after_if)?;
            self.connect(self.current_block.clone(), after_app, Expr::BoolLit(true));
        }

        self.set_current_block(after_if, BlockArgs::Block)?;

        if self.unknown_call_seen {
            self.erase_knowledge();
        }
        self.unknown_call_seen = saved_unknown || self.unknown_call_seen;
        Ok(())
    }

    fn visit_while(&mut self, s: &'a WhileStatement) -> Result<(), ChcError> {
        let saved_unknown = self.unknown_call_seen;
        self.unknown_call_seen = false;

        let body_id = self.current_function_def()?.body.id;
        let prefix = if s.is_do_while { "do_while" } else { "while" };
        let loop_header = self.create_block(&format!("{prefix}_header_"), s.id)?;
        let loop_body = self.create_block(&format!("{prefix}_body_"), s.body.id)?;
        let after_loop = self.create_block("", body_id)?;

        // A do-while executes its body once before the header is reached.
        if s.is_do_while {
            self.with_loop_dests(after_loop, loop_header, |me| me.visit_block(&s.body))?;
        }

        let header_app = self.block_application(loop_header)?;
        self.connect(self.current_block.clone(), header_app, Expr::BoolLit(true));
        self.set_current_block(loop_header, BlockArgs::Block)?;
        let condition = self.expr(&s.condition)?;

        let body_app = self.block_application(loop_body)?;
        self.connect(self.current_block.clone(), body_app, condition.clone());
        let after_app = self.block_application(after_loop)?;
        self.connect(self.current_block.clone(), after_app, Expr::not(condition));

        self.set_current_block(loop_body, BlockArgs::Block)?;
        self.with_loop_dests(after_loop, loop_header, |me| me.visit_block(&s.body))?;

        // Back edge.
        let header_app = self.block_application(loop_header)?;
        self.connect(self.current_block.clone(), header_app, Expr::BoolLit(true));
        self.set_current_block(after_loop, BlockArgs::Block)?;

        if self.unknown_call_seen {
            self.erase_knowledge();
        }
        self.unknown_call_seen = saved_unknown || self.unknown_call_seen;
        Ok(())
    }

    fn visit_for(&mut self, s: &'a ForStatement) -> Result<(), ChcError> {
        let saved_unknown = self.unknown_call_seen;
        self.unknown_call_seen = false;

        let body_id = self.current_function_def()?.body.id;
        let loop_header = self.create_block("for_header_", s.id)?;
        let loop_body = self.create_block("for_body_", s.body.id)?;
        let after_loop = self.create_block("", body_id)?;
        let post_block = match &s.post {
            Some(post) => Some(self.create_block("for_post_", post.id)?),
            None => None,
        };

        if let Some(init) = &s.init {
            self.visit_statement(init)?;
        }

        let header_app = self.block_application(loop_header)?;
        self.connect(self.current_block.clone(), header_app, Expr::BoolLit(true));
        self.set_current_block(loop_header, BlockArgs::Block)?;
        let condition = match &s.condition {
            Some(c) => self.expr(c)?,
            None => Expr::BoolLit(true),
        };

        let body_app = self.block_application(loop_body)?;
        self.connect(self.current_block.clone(), body_app, condition.clone());
        let after_app = self.block_application(after_loop)?;
        self.connect(self.current_block.clone(), after_app, Expr::not(condition));

        self.set_current_block(loop_body, BlockArgs::Block)?;
        let continue_dest = post_block.unwrap_or(loop_header);
        self.with_loop_dests(after_loop, continue_dest, |me| {
            me.visit_block(&s.body)?;
            if let (Some(pred), Some(post)) = (post_block, &s.post) {
                let post_app = me.block_application(pred)?;
                me.connect(me.current_block.clone(), post_app, Expr::BoolLit(true));
                me.set_current_block(pred, BlockArgs::Block)?;
                me.expr(post)?;
            }
            Ok(())
        })?;

        // Back edge.
        let header_app = self.block_application(loop_header)?;
        self.connect(self.current_block.clone(), header_app, Expr::BoolLit(true));
        self.set_current_block(after_loop, BlockArgs::Block)?;

        if self.unknown_call_seen {
            self.erase_knowledge();
        }
        self.unknown_call_seen = saved_unknown || self.unknown_call_seen;
        Ok(())
    }

    /// Edge to the destination, then a ghost sink so the rest of the
    /// dead block encodes somewhere unreachable.
    fn visit_break(&mut self, id: NodeId, _location: SourceLocation) -> Result<(), ChcError> {
        let dest = self
            .break_dest
            .ok_or_else(|| ChcError::invariant("break outside of a loop"))?;
        let dest_app = self.block_application(dest)?;
        self.connect(self.current_block.clone(), dest_app, Expr::BoolLit(true));
        let ghost = self.create_block("break_ghost_", id)?;
        self.current_block = self.block_application(ghost)?;
        Ok(())
    }

    fn visit_continue(&mut self, id: NodeId, _location: SourceLocation) -> Result<(), ChcError> {
        let dest = self
            .continue_dest
            .ok_or_else(|| ChcError::invariant("continue outside of a loop"))?;
        let dest_app = self.block_application(dest)?;
        self.connect(self.current_block.clone(), dest_app, Expr::BoolLit(true));
        let ghost = self.create_block("continue_ghost_", id)?;
        self.current_block = self.block_application(ghost)?;
        Ok(())
    }

    fn visit_variable_declaration(
        &mut self,
        s: &'a VariableDeclarationStatement,
    ) -> Result<(), ChcError> {
        self.ctx.create_variable(&s.declaration);
        match &s.initial_value {
            Some(init) => {
                let value = self.expr(init)?;
                encoder::assign(&mut self.ctx, s.declaration.id, value)?;
            }
            None => self.ctx.set_zero_value(s.declaration.id),
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Expressions and calls
    // -----------------------------------------------------------------

    /// Encode an expression, routing calls to the rule emitter.
    fn expr(&mut self, e: &'a Expression) -> Result<Expr, ChcError> {
        match &e.kind {
            ExpressionKind::Call(call) => self.visit_call(call),
            ExpressionKind::Assignment { lhs, rhs }
                if matches!(rhs.kind, ExpressionKind::Call(_)) =>
            {
                let value = self.expr(rhs)?;
                encoder::assign(&mut self.ctx, *lhs, value)
            }
            _ => encoder::encode_expression(&mut self.ctx, e),
        }
    }

    fn visit_call(&mut self, call: &'a FunctionCall) -> Result<Expr, ChcError> {
        match call.kind {
            CallKind::Assert => self.visit_assert(call),
            CallKind::Internal => self.visit_internal_call(call),
            _ => self.visit_unknown_call(call),
        }
    }

    /// An `assert(cond)`: the violating branch jumps straight to the
    /// function summary with the error index set to this target's
    /// 1-based position; the continuation assumes the condition.
    fn visit_assert(&mut self, call: &'a FunctionCall) -> Result<Expr, ChcError> {
        if call.arguments.len() != 1 {
            return Err(ChcError::invariant("assert takes exactly one argument"));
        }
        let function = self.current_function_def()?;
        let condition = self.expr(&call.arguments[0])?;

        self.verification_targets.push(VerificationTarget {
            function: function.id,
            location: call.location,
        });
        let target_index = self.verification_targets.len() as i128;

        let previous_error = self.error.current_value();
        self.error.increase_index();
        let err = self.error.current_value();

        let summary = self.summary_application(function)?;
        self.connect(
            self.current_block.clone(),
            summary,
            Expr::and(
                Expr::not(condition.clone()),
                Expr::eq(err.clone(), Expr::IntLit(target_index)),
            ),
        );

        self.ctx.add_assertion(condition);
        self.ctx.add_assertion(Expr::eq(err, previous_error));

        let assert_entry = self.create_block("", call.id)?;
        let entry_app = self.block_application(assert_entry)?;
        self.connect(self.current_block.clone(), entry_app, Expr::BoolLit(true));
        self.set_current_block(assert_entry, BlockArgs::Block)?;
        Ok(Expr::BoolLit(true))
    }

    /// An internal call: assume the callee's summary, propagate failure
    /// to the caller's summary, then continue with the error index as a
    /// fresh symbol constrained to its pre-call value.
    fn visit_internal_call(&mut self, call: &'a FunctionCall) -> Result<Expr, ChcError> {
        let previous_error = self.error.current_value();

        let mut arg_values = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            arg_values.push(self.expr(arg)?);
        }

        let (call_predicate, return_value) = match call.target {
            Some(target) => self.call_predicate(target, arg_values)?,
            None => (Expr::BoolLit(true), Expr::BoolLit(true)),
        };
        self.ctx.add_assertion(call_predicate);

        let function = self.current_function_def()?;
        let summary = self.summary_application(function)?;
        self.connect(
            self.current_block.clone(),
            summary,
            Expr::gt(self.error.current_value(), Expr::IntLit(0)),
        );

        self.ctx
            .add_assertion(Expr::eq(self.error.current_value(), Expr::IntLit(0)));
        self.error.increase_index();
        self.ctx
            .add_assertion(Expr::eq(self.error.current_value(), previous_error));

        let post_call = self.create_block("", call.id)?;
        let post_app = self.block_application(post_call)?;
        self.connect(self.current_block.clone(), post_app, Expr::BoolLit(true));
        self.set_current_block(post_call, BlockArgs::Block)?;
        Ok(return_value)
    }

    /// The callee's summary applied to {fresh error, current state, the
    /// encoded arguments, havoced state, fresh returns}. Also yields the
    /// first return value for assignments at the call site.
    fn call_predicate(
        &mut self,
        target: FunctionRef,
        arg_values: Vec<Expr>,
    ) -> Result<(Expr, Expr), ChcError> {
        let callee = self.function_def(target);

        self.error.increase_index();
        let mut args = vec![self.error.current_value()];
        args.extend(self.current_state_variables()?);
        args.extend(arg_values);

        for var in &self.state_variables {
            if let Some(sym) = self.ctx.variable_by_id_mut(var.id) {
                sym.increase_index();
            }
        }
        args.extend(self.current_state_variables()?);

        let mut first_return = Expr::BoolLit(true);
        for (i, ret) in callee.returns.iter().enumerate() {
            let known = self.ctx.known_variable(ret.id);
            let sym = self.ctx.variable(ret);
            if known {
                sym.increase_index();
            }
            let value = sym.current_value();
            if i == 0 {
                first_return = value.clone();
            }
            args.push(value);
        }

        let summary = self
            .summaries
            .get(&callee.id)
            .copied()
            .ok_or_else(|| ChcError::invariant("internal call to a function without a summary"))?;
        Ok((self.apply(summary, args), first_return))
    }

    /// Calls the analysis cannot resolve: erase knowledge instead of
    /// modeling the callee.
    fn visit_unknown_call(&mut self, call: &'a FunctionCall) -> Result<Expr, ChcError> {
        for arg in &call.arguments {
            self.expr(arg)?;
        }
        self.reporter.warning(
            call.location,
            "Unknown function call: all knowledge about state variables and references \
             is erased. The analysis may miss assertion violations that depend on the \
             called code.",
        );
        self.erase_knowledge();
        self.unknown_call_seen = true;
        Ok(Expr::BoolLit(true))
    }

    // -----------------------------------------------------------------
    // Predicates, rules and queries
    // -----------------------------------------------------------------

    fn create_predicate(&mut self, name: String, domain: Vec<Sort>) -> PredId {
        let pred = SymbolicFunctionVariable::new(name, domain);
        self.backend
            .register_relation(&pred.current_name(), pred.domain());
        self.predicates.push(pred);
        PredId(self.predicates.len() - 1)
    }

    fn apply(&self, pred: PredId, args: Vec<Expr>) -> Expr {
        self.predicates[pred.0].apply(args)
    }

    fn create_function_block(&mut self, function: &FunctionDefinition) -> PredId {
        let name = format!(
            "block_{}_{}",
            self.unique_prefix(),
            function_predicate_name(function)
        );
        let domain = self.function_sort(function);
        self.create_predicate(name, domain)
    }

    fn create_block(&mut self, prefix: &str, node: NodeId) -> Result<PredId, ChcError> {
        let name = format!(
            "block_{}_{}{}",
            self.unique_prefix(),
            prefix,
            self.predicate_name(node)?
        );
        let domain = self.block_sort()?;
        Ok(self.create_predicate(name, domain))
    }

    /// SSA-refresh the error predicate and register the new instance.
    fn create_error_block(&mut self) -> Result<(), ChcError> {
        let pred = self
            .error_pred
            .ok_or_else(|| ChcError::invariant("no error predicate"))?;
        let relation = &mut self.predicates[pred.0];
        relation.increase_index();
        self.backend
            .register_relation(&relation.current_name(), relation.domain());
        Ok(())
    }

    /// Emit `from ∧ assertions ∧ constraints ⟹ to`.
    fn connect(&mut self, from: Expr, to: Expr, constraints: Expr) {
        let name = format!("{}_to_{}", from.name(), to.name());
        let body = Expr::And(vec![from, self.ctx.assertions(), constraints]);
        let rule = Expr::implies(body, to);
        self.backend.add_rule(&rule, &name);
    }

    /// Switch to a new source block: drop the previous block's
    /// assumptions, reset indices to their canonical values and point
    /// `current_block` at the new predicate.
    fn set_current_block(&mut self, pred: PredId, args: BlockArgs) -> Result<(), ChcError> {
        self.ctx.pop_solver()?;
        self.clear_indices();
        self.ctx.push_solver();
        let app = match args {
            BlockArgs::Block => self.block_application(pred)?,
            BlockArgs::CurrentState => {
                let state = self.current_state_variables()?;
                self.apply(pred, state)
            }
            BlockArgs::InitialState => {
                let state = self.initial_state_variables()?;
                self.apply(pred, state)
            }
        };
        self.current_block = app;
        Ok(())
    }

    /// Reset every variable to index 0, then advance state variables so
    /// index 0 stays reserved for their transaction-start value. The
    /// error index deliberately survives.
    fn clear_indices(&mut self) {
        self.ctx.reset_all_indices();
        for var in &self.state_variables {
            if let Some(sym) = self.ctx.variable_by_id_mut(var.id) {
                sym.increase_index();
            }
        }
    }

    /// Forget everything: state variables and reference-typed values get
    /// fresh unconstrained indices.
    fn erase_knowledge(&mut self) {
        for var in &self.state_variables {
            if let Some(sym) = self.ctx.variable_by_id_mut(var.id) {
                sym.increase_index();
            }
        }
        self.ctx.reset_variables(|decl| decl.ty.is_reference());
    }

    fn with_loop_dests(
        &mut self,
        break_dest: PredId,
        continue_dest: PredId,
        f: impl FnOnce(&mut Self) -> Result<(), ChcError>,
    ) -> Result<(), ChcError> {
        let saved = (self.break_dest, self.continue_dest);
        self.break_dest = Some(break_dest);
        self.continue_dest = Some(continue_dest);
        let result = f(self);
        self.break_dest = saved.0;
        self.continue_dest = saved.1;
        result
    }

    fn report_query(&mut self, fe: &FunctionError, response: &QueryResponse) {
        match response.result {
            CheckResult::Unsatisfiable => {}
            CheckResult::Satisfiable => {
                let locations: Vec<_> = self
                    .verification_targets
                    .iter()
                    .filter(|t| t.function == fe.function)
                    .map(|t| t.location)
                    .collect();
                if locations.is_empty() {
                    self.reporter
                        .warning(fe.location, "Assertion violation happens here.");
                }
                for location in locations {
                    self.reporter
                        .warning(location, "Assertion violation happens here.");
                }
            }
            CheckResult::Unknown => self.reporter.warning(
                fe.location,
                "Could not prove the assertions in this function: the Horn solver \
                 answered unknown.",
            ),
            CheckResult::Conflicting => self.reporter.warning(
                fe.location,
                "At least two solver back-ends provided conflicting answers. \
                 Results might not be sound.",
            ),
            CheckResult::Error => self
                .reporter
                .warning(fe.location, "Error trying to invoke the Horn solver."),
        }
    }

    // -----------------------------------------------------------------
    // Sorts and argument vectors
    // -----------------------------------------------------------------

    /// Entry sort of a function: error index, immutable state and inputs
    /// at transaction start, then their current counterparts, then
    /// outputs.
    fn function_sort(&self, function: &FunctionDefinition) -> Vec<Sort> {
        let params: Vec<Sort> = function
            .parameters
            .iter()
            .map(|p| p.ty.smt_sort())
            .collect();
        let returns: Vec<Sort> = function.returns.iter().map(|r| r.ty.smt_sort()).collect();
        let mut domain = vec![Sort::Int];
        domain.extend(self.state_sorts.iter().cloned());
        domain.extend(params.iter().cloned());
        domain.extend(self.state_sorts.iter().cloned());
        domain.extend(params);
        domain.extend(returns);
        domain
    }

    /// Block sort: the enclosing function's sort extended with locals.
    fn block_sort(&self) -> Result<Vec<Sort>, ChcError> {
        let function = self.current_function_def()?;
        let mut domain = self.function_sort(function);
        domain.extend(
            function
                .local_variables()
                .iter()
                .map(|v| v.ty.smt_sort()),
        );
        Ok(domain)
    }

    /// Summary sort: error index, pre-state, inputs, post-state, outputs.
    fn summary_sort(&self, function: &FunctionDefinition) -> Vec<Sort> {
        let params: Vec<Sort> = function
            .parameters
            .iter()
            .map(|p| p.ty.smt_sort())
            .collect();
        let returns: Vec<Sort> = function.returns.iter().map(|r| r.ty.smt_sort()).collect();
        let mut domain = vec![Sort::Int];
        domain.extend(self.state_sorts.iter().cloned());
        domain.extend(params);
        domain.extend(self.state_sorts.iter().cloned());
        domain.extend(returns);
        domain
    }

    fn current_state_variables(&self) -> Result<Vec<Expr>, ChcError> {
        self.state_variables
            .iter()
            .map(|var| {
                self.ctx
                    .variable_by_id(var.id)
                    .map(|sym| sym.current_value())
                    .ok_or_else(|| ChcError::invariant("state variable not registered"))
            })
            .collect()
    }

    fn initial_state_variables(&self) -> Result<Vec<Expr>, ChcError> {
        self.state_variables
            .iter()
            .map(|var| {
                self.ctx
                    .variable_by_id(var.id)
                    .and_then(|sym| sym.value_at(0))
                    .ok_or_else(|| ChcError::invariant("state variable not registered"))
            })
            .collect()
    }

    fn current_function_variables(&self) -> Result<Vec<Expr>, ChcError> {
        let function = self.current_function_def()?;
        let mut args = vec![self.error.current_value()];
        args.extend(self.initial_state_variables()?);
        for param in &function.parameters {
            args.push(
                self.ctx
                    .variable_by_id(param.id)
                    .and_then(|sym| sym.value_at(0))
                    .ok_or_else(|| ChcError::invariant("parameter not registered"))?,
            );
        }
        args.extend(self.current_state_variables()?);
        for param in &function.parameters {
            args.push(encoder::current_value(&self.ctx, param.id)?);
        }
        for ret in &function.returns {
            args.push(encoder::current_value(&self.ctx, ret.id)?);
        }
        Ok(args)
    }

    fn current_block_variables(&self) -> Result<Vec<Expr>, ChcError> {
        let function = self.current_function_def()?;
        let mut args = self.current_function_variables()?;
        for local in function.local_variables() {
            args.push(encoder::current_value(&self.ctx, local.id)?);
        }
        Ok(args)
    }

    fn block_application(&self, pred: PredId) -> Result<Expr, ChcError> {
        Ok(self.apply(pred, self.current_block_variables()?))
    }

    fn summary_application(&self, function: &FunctionDefinition) -> Result<Expr, ChcError> {
        let mut args = vec![self.error.current_value()];
        args.extend(self.initial_state_variables()?);
        for param in &function.parameters {
            args.push(
                self.ctx
                    .variable_by_id(param.id)
                    .and_then(|sym| sym.value_at(0))
                    .ok_or_else(|| ChcError::invariant("parameter not registered"))?,
            );
        }
        args.extend(self.current_state_variables()?);
        for ret in &function.returns {
            args.push(encoder::current_value(&self.ctx, ret.id)?);
        }
        let pred = self
            .summaries
            .get(&function.id)
            .copied()
            .ok_or_else(|| ChcError::invariant("function has no summary predicate"))?;
        Ok(self.apply(pred, args))
    }

    fn interface_application(&self) -> Result<Expr, ChcError> {
        let pred = self
            .interface_pred
            .ok_or_else(|| ChcError::invariant("no interface predicate"))?;
        Ok(self.apply(pred, self.current_state_variables()?))
    }

    fn constructor_application(&self) -> Result<Expr, ChcError> {
        let pred = self
            .constructor_pred
            .ok_or_else(|| ChcError::invariant("no implicit constructor predicate"))?;
        Ok(self.apply(pred, self.current_state_variables()?))
    }

    fn error_application(&self) -> Result<Expr, ChcError> {
        let pred = self
            .error_pred
            .ok_or_else(|| ChcError::invariant("no error predicate"))?;
        Ok(self.apply(pred, Vec::new()))
    }

    fn genesis_application(&self) -> Result<Expr, ChcError> {
        let pred = self
            .genesis
            .ok_or_else(|| ChcError::invariant("genesis predicate missing"))?;
        Ok(self.apply(pred, Vec::new()))
    }

    // -----------------------------------------------------------------
    // Naming and lookup helpers
    // -----------------------------------------------------------------

    fn unique_prefix(&mut self) -> String {
        let n = self.block_counter;
        self.block_counter += 1;
        n.to_string()
    }

    fn predicate_name(&self, node: NodeId) -> Result<String, ChcError> {
        let function = self.current_function_def()?;
        if function.name.is_empty() {
            Ok(node.to_string())
        } else {
            Ok(format!("{}_{}", function.name, node))
        }
    }

    fn contract_def(&self, idx: usize) -> &'a ContractDefinition {
        &self.unit.contracts[idx]
    }

    fn function_def(&self, r: FunctionRef) -> &'a FunctionDefinition {
        &self.unit.contracts[r.contract].functions[r.function]
    }

    fn current_function_def(&self) -> Result<&'a FunctionDefinition, ChcError> {
        self.current_function
            .map(|r| self.function_def(r))
            .ok_or_else(|| ChcError::invariant("no function frame is active"))
    }

    fn reset_contract_state(&mut self) {
        self.state_variables.clear();
        self.state_sorts.clear();
        self.summaries.clear();
        self.verification_targets.clear();
        self.function_errors.clear();
        self.unknown_call_seen = false;
        self.break_dest = None;
        self.continue_dest = None;
        self.current_function = None;
        self.interface_pred = None;
        self.error_pred = None;
        self.constructor_pred = None;
        self.error.reset_index();
        self.current_block = Expr::BoolLit(true);
    }
}

fn function_predicate_name(function: &FunctionDefinition) -> String {
    if function.name.is_empty() {
        format!("{}_{}", function.kind_name(), function.id)
    } else {
        format!("{}_{}_{}", function.kind_name(), function.name, function.id)
    }
}
