//! Structural tests over the emitted predicate graph.
//!
//! A recording back-end captures registered relations, rules and queries
//! so the tests can check the shape of the graph without any solver:
//! boundary cases (empty contracts, skipped libraries), registration and
//! query invariants, loop/break targeting, and determinism across runs.

use sol_fv_analysis::ast::{
    AstFactory, BinaryOperator, CallKind, ContractKind, FunctionRef, SourceLocation, SourceUnit,
    Type,
};
use sol_fv_analysis::{ChcEngine, ErrorReporter};
use sol_fv_smtlib::expr::Expr;
use sol_fv_smtlib::sort::Sort;
use sol_fv_solver::backend::HornBackend;
use sol_fv_solver::result::{CheckResult, QueryResponse};

struct RecordingBackend {
    relations: Vec<String>,
    rules: Vec<(String, Expr)>,
    queries: Vec<String>,
    answer: CheckResult,
}

impl RecordingBackend {
    fn new(answer: CheckResult) -> Self {
        Self {
            relations: Vec::new(),
            rules: Vec::new(),
            queries: Vec::new(),
            answer,
        }
    }

    /// `(from, to)` names of every emitted edge.
    fn edges(&self) -> Vec<(String, String)> {
        self.rules
            .iter()
            .filter_map(|(_, rule)| edge_of(rule))
            .collect()
    }
}

fn edge_of(rule: &Expr) -> Option<(String, String)> {
    match rule {
        Expr::Implies(body, head) => match body.as_ref() {
            Expr::And(terms) => terms.first().map(|from| (from.name(), head.name())),
            other => Some((other.name(), head.name())),
        },
        _ => None,
    }
}

impl HornBackend for RecordingBackend {
    fn register_relation(&mut self, name: &str, _domain: &[Sort]) {
        self.relations.push(name.to_string());
    }

    fn add_rule(&mut self, rule: &Expr, name: &str) {
        self.rules.push((name.to_string(), rule.clone()));
    }

    fn query(&mut self, goal: &Expr) -> QueryResponse {
        self.queries.push(goal.name());
        QueryResponse::new(self.answer)
    }
}

fn analyze(unit: &SourceUnit, backend: &mut RecordingBackend) -> ErrorReporter {
    let mut reporter = ErrorReporter::new();
    let mut engine = ChcEngine::new(unit, backend, &mut reporter);
    engine.analyze().expect("analysis should succeed");
    assert_eq!(
        engine.context().scope_depth(),
        0,
        "assumption scopes must balance after analysis"
    );
    reporter
}

// ---------------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------------

#[test]
fn empty_contract_emits_constructor_and_interface_edges_only() {
    let mut f = AstFactory::new();
    let contract = f.contract("C", vec![], vec![]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    let names: Vec<&str> = backend.rules.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert_eq!(names[0], "genesis");
    assert!(names[1].starts_with("genesis_0_to_implicit_constructor_"));
    assert!(names[2].contains("implicit_constructor_"));
    assert!(names[2].contains("_to_interface_"));
    assert!(backend.queries.is_empty());
}

#[test]
fn libraries_and_interfaces_are_skipped_entirely() {
    let mut f = AstFactory::new();
    let body = f.block(vec![]);
    let lib_fn = f.function("helper", vec![], vec![], body);
    let mut library = f.contract("L", vec![], vec![lib_fn]);
    library.kind = ContractKind::Library;
    let mut iface = f.contract("I", vec![], vec![]);
    iface.kind = ContractKind::Interface;
    let contract = f.contract("C", vec![], vec![]);
    let unit = f.source_unit(vec![library, iface, contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    // Only the genesis fact plus C's two skeleton edges.
    assert_eq!(backend.rules.len(), 3);
    assert!(backend
        .rules
        .iter()
        .all(|(name, _)| !name.contains("helper")));
    assert!(backend.queries.is_empty());
}

#[test]
fn function_without_asserts_emits_summary_but_queries_nothing() {
    let mut f = AstFactory::new();
    let x = f.var("x", Type::Integer);
    let body = f.block(vec![]);
    let func = f.function("noop", vec![x], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    assert!(backend.queries.is_empty());
    let edges = backend.edges();
    // genesis feeds the function entry,
    assert!(edges
        .iter()
        .any(|(from, to)| from == "genesis_0" && to.contains("function_noop")));
    // and the body tail reaches the summary.
    assert!(edges.iter().any(|(_, to)| to.starts_with("summary_")));
    // Public entry: interface advances to interface when no error fired.
    assert!(edges
        .iter()
        .any(|(from, to)| from.starts_with("interface_") && to.starts_with("interface_")));
    assert!(edges
        .iter()
        .any(|(from, to)| from.starts_with("interface_") && to.starts_with("error_")));
}

// ---------------------------------------------------------------------------
// Registration and query invariants
// ---------------------------------------------------------------------------

#[test]
fn every_applied_predicate_was_registered_first() {
    let mut f = AstFactory::new();
    let s = f.var("s", Type::Integer);
    let cond = {
        let lhs = f.ident(&s);
        let rhs = f.number(0);
        f.binary(BinaryOperator::Gt, lhs, rhs)
    };
    let one = f.number(1);
    let store = f.assign(&s, one);
    let store_stmt = f.expr_stmt(store);
    let assert_stmt = f.assert_stmt(cond, SourceLocation::new(10, 20));
    let true_branch = f.block(vec![assert_stmt]);
    let if_cond = f.boolean(true);
    let if_stmt = f.if_stmt(if_cond, true_branch, None);
    let body = f.block(vec![store_stmt, if_stmt]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![s], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    for (name, rule) in &backend.rules {
        for symbol in rule.applied_symbols() {
            assert!(
                backend.relations.contains(&symbol),
                "rule {name} applies unregistered predicate {symbol}"
            );
        }
    }
    for goal in &backend.queries {
        assert!(backend.relations.contains(goal));
    }
}

#[test]
fn each_public_function_error_predicate_is_queried_exactly_once() {
    let mut f = AstFactory::new();
    let cond_a = f.boolean(true);
    let assert_a = f.assert_stmt(cond_a, SourceLocation::new(1, 2));
    let body_a = f.block(vec![assert_a]);
    let fa = f.function("fa", vec![], vec![], body_a);
    let cond_b = f.boolean(true);
    let assert_b = f.assert_stmt(cond_b, SourceLocation::new(3, 4));
    let body_b = f.block(vec![assert_b]);
    let fb = f.function("fb", vec![], vec![], body_b);
    let contract = f.contract("C", vec![], vec![fa, fb]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    assert_eq!(backend.queries.len(), 2);
    assert!(backend.queries.iter().all(|q| q.starts_with("error_C_")));
    // SSA refresh gives each public function its own error instance.
    assert_ne!(backend.queries[0], backend.queries[1]);
}

#[test]
fn assertion_violation_edge_carries_error_index() {
    let mut f = AstFactory::new();
    let x = f.var("x", Type::Integer);
    let cond = {
        let lhs = f.ident(&x);
        let rhs = f.number(0);
        f.binary(BinaryOperator::Gt, lhs, rhs)
    };
    let assert_stmt = f.assert_stmt(cond, SourceLocation::new(5, 15));
    let body = f.block(vec![assert_stmt]);
    let func = f.function("g", vec![x], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    // The violating branch jumps to the summary under ¬cond with the
    // error index equal to the target's 1-based position.
    let violation = backend
        .rules
        .iter()
        .find(|(_, rule)| {
            edge_of(rule).is_some_and(|(from, to)| {
                from.starts_with("block_") && to.starts_with("summary_")
            }) && rule.to_string().contains("(= error_1 1)")
        })
        .map(|(_, rule)| rule.to_string())
        .expect("missing assertion violation edge");
    assert!(violation.contains("(not (>"));
}

// ---------------------------------------------------------------------------
// Loops, break, continue
// ---------------------------------------------------------------------------

#[test]
fn break_in_nested_loop_targets_the_inner_after_loop() {
    let mut f = AstFactory::new();
    let brk = f.break_stmt();
    let inner_body = f.block(vec![brk]);
    let inner_body_id = inner_body.id;
    let inner_cond = f.boolean(true);
    let inner_while = f.while_stmt(inner_cond, inner_body);
    let inner_id = match &inner_while {
        sol_fv_analysis::ast::Statement::While(w) => w.id,
        _ => unreachable!(),
    };
    let outer_body = f.block(vec![inner_while]);
    let outer_cond = f.boolean(true);
    let outer_while = f.while_stmt(outer_cond, outer_body);
    let outer_id = match &outer_while {
        sol_fv_analysis::ast::Statement::While(w) => w.id,
        _ => unreachable!(),
    };
    let body = f.block(vec![outer_while]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    let edges = backend.edges();
    let inner_header = format!("while_header_g_{inner_id}_");
    let outer_header = format!("while_header_g_{outer_id}_");

    // The first edge out of a loop header goes to the body; the exit
    // edge is the one that leaves the loop.
    let inner_exit = edges
        .iter()
        .find(|(from, to)| from.contains(&inner_header) && !to.contains("while_body"))
        .map(|(_, to)| to.clone())
        .expect("inner loop has an exit edge");
    let outer_exit = edges
        .iter()
        .find(|(from, to)| from.contains(&outer_header) && !to.contains("while_body"))
        .map(|(_, to)| to.clone())
        .expect("outer loop has an exit edge");
    let break_target = edges
        .iter()
        .find(|(from, _)| from.contains(&format!("while_body_g_{inner_body_id}_")))
        .map(|(_, to)| to.clone())
        .expect("break emits an edge from the inner body");

    assert_eq!(break_target, inner_exit);
    assert_ne!(break_target, outer_exit);
}

#[test]
fn do_while_false_with_break_has_no_feasible_back_edge() {
    let mut f = AstFactory::new();
    let brk = f.break_stmt();
    let brk_branch = f.block(vec![brk]);
    let c = f.var("c", Type::Bool);
    let if_cond = f.ident(&c);
    let if_stmt = f.if_stmt(if_cond, brk_branch, None);
    let loop_body = f.block(vec![if_stmt]);
    let loop_cond = f.boolean(false);
    let do_while = f.do_while_stmt(loop_cond, loop_body);
    let decl = f.var_decl_stmt(c, None);
    let body = f.block(vec![decl, do_while]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    // The header-to-body edge exists but is guarded by the literal false
    // condition, so the back edge can never be traversed.
    let entry = backend
        .rules
        .iter()
        .find(|(_, rule)| {
            edge_of(rule)
                .is_some_and(|(from, to)| from.contains("do_while_header") && to.contains("do_while_body"))
        })
        .map(|(_, rule)| rule.clone())
        .expect("do-while header connects to its body");
    match entry {
        Expr::Implies(body, _) => match *body {
            Expr::And(terms) => {
                assert_eq!(terms.last(), Some(&Expr::BoolLit(false)));
            }
            other => panic!("expected conjunction body, got {other}"),
        },
        other => panic!("expected implication, got {other}"),
    }
}

#[test]
fn continue_targets_the_loop_header() {
    let mut f = AstFactory::new();
    let cont = f.continue_stmt();
    let loop_body = f.block(vec![cont]);
    let loop_cond = f.boolean(true);
    let while_stmt = f.while_stmt(loop_cond, loop_body);
    let while_id = match &while_stmt {
        sol_fv_analysis::ast::Statement::While(w) => w.id,
        _ => unreachable!(),
    };
    let body = f.block(vec![while_stmt]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    let header = format!("while_header_g_{while_id}_");
    let continue_edge = backend
        .edges()
        .into_iter()
        .find(|(from, to)| from.contains("while_body") && to.contains(&header));
    assert!(continue_edge.is_some(), "continue must edge to the header");
}

#[test]
fn for_loop_post_block_is_the_continue_destination() {
    let mut f = AstFactory::new();
    let i = f.var("i", Type::Integer);
    let init_value = f.number(0);
    let init = f.var_decl_stmt(i.clone(), Some(init_value));
    let cond = {
        let lhs = f.ident(&i);
        let rhs = f.number(3);
        f.binary(BinaryOperator::Lt, lhs, rhs)
    };
    let post = {
        let read = f.ident(&i);
        let one = f.number(1);
        let inc = f.binary(BinaryOperator::Add, read, one);
        f.assign(&i, inc)
    };
    let cont = f.continue_stmt();
    let loop_body = f.block(vec![cont]);
    let for_stmt = f.for_stmt(Some(init), Some(cond), Some(post), loop_body);
    let body = f.block(vec![for_stmt]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    let edges = backend.edges();
    // continue from the body lands in the post block,
    assert!(edges
        .iter()
        .any(|(from, to)| from.contains("for_body") && to.contains("for_post")));
    // and the post block closes the back edge to the header.
    assert!(edges
        .iter()
        .any(|(from, to)| from.contains("for_post") && to.contains("for_header")));
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[test]
fn unknown_call_warns_and_advances_state_indices() {
    let mut f = AstFactory::new();
    let s = f.var("s", Type::Integer);
    let s_id = s.id;
    let one = f.number(1);
    let store = f.assign(&s, one);
    let store_stmt = f.expr_stmt(store);
    let call = f.call(CallKind::BareCall, None, vec![], SourceLocation::new(30, 40));
    let call_stmt = f.expr_stmt(call);
    let cond = {
        let lhs = f.ident(&s);
        let rhs = f.number(0);
        f.binary(BinaryOperator::Eq, lhs, rhs)
    };
    let assert_stmt = f.assert_stmt(cond, SourceLocation::new(50, 60));
    let body = f.block(vec![store_stmt, call_stmt, assert_stmt]);
    let func = f.function("g", vec![], vec![], body);
    let contract = f.contract("C", vec![s], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    let reporter = analyze(&unit, &mut backend);

    // Scenario: the unknown call warns about erased knowledge.
    assert!(reporter
        .diagnostics()
        .iter()
        .any(|d| d.location == SourceLocation::new(30, 40)
            && d.message.contains("Unknown function call")));

    // The state variable was written (index 2) and then havoced by the
    // call (index 3), so the assertion reads s at index 3.
    let violation = backend
        .rules
        .iter()
        .find(|(_, rule)| rule.to_string().contains("(= error_1 1)"))
        .map(|(_, rule)| rule.to_string())
        .expect("assertion emits its violation edge");
    assert!(
        violation.contains(&format!("s_{s_id}_3")),
        "assertion must read the havoced state: {violation}"
    );
}

#[test]
fn internal_call_assumes_summary_and_propagates_failure() {
    let mut f = AstFactory::new();
    let callee_body = f.block(vec![]);
    let callee = f.function("callee", vec![], vec![], callee_body);
    let callee_ref = FunctionRef {
        contract: 0,
        function: 0,
    };
    let call = f.call(
        CallKind::Internal,
        Some(callee_ref),
        vec![],
        SourceLocation::new(70, 80),
    );
    let call_stmt = f.expr_stmt(call);
    let caller_body = f.block(vec![call_stmt]);
    let caller = f.function("caller", vec![], vec![], caller_body);
    let contract = f.contract("C", vec![], vec![callee, caller]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    // Failure propagation: an edge into the caller's summary guarded by
    // a positive error index, with the callee's summary assumed in the
    // body.
    let propagation = backend
        .rules
        .iter()
        .find(|(_, rule)| {
            let text = rule.to_string();
            edge_of(rule).is_some_and(|(_, to)| to.starts_with("summary_"))
                && text.contains("(> error_1 0)")
                && text.contains("summary_")
        })
        .map(|(_, rule)| rule.to_string())
        .expect("internal call must propagate callee failure");
    // The callee summary application appears in the rule body.
    assert!(propagation.contains("_callee_"));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn reanalysis_emits_an_identical_rule_set() {
    let mut f = AstFactory::new();
    let x = f.var("x", Type::Integer);
    let cond = {
        let lhs = f.ident(&x);
        let rhs = f.ident(&x);
        f.binary(BinaryOperator::Eq, lhs, rhs)
    };
    let assert_stmt = f.assert_stmt(cond, SourceLocation::new(0, 9));
    let body = f.block(vec![assert_stmt]);
    let func = f.function("g", vec![x], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut first = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut first);
    let mut second = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut second);

    let render = |b: &RecordingBackend| {
        b.rules
            .iter()
            .map(|(name, rule)| format!("{name}: {rule}"))
            .collect::<Vec<_>>()
    };
    assert_eq!(render(&first), render(&second));
    assert_eq!(first.relations, second.relations);
    assert_eq!(first.queries, second.queries);
}

// ---------------------------------------------------------------------------
// Query outcome reporting
// ---------------------------------------------------------------------------

#[test]
fn satisfiable_query_warns_at_the_assert_location() {
    let mut f = AstFactory::new();
    let x = f.var("x", Type::Integer);
    let cond = {
        let lhs = f.ident(&x);
        let rhs = f.number(0);
        f.binary(BinaryOperator::Gt, lhs, rhs)
    };
    let assert_stmt = f.assert_stmt(cond, SourceLocation::new(42, 57));
    let body = f.block(vec![assert_stmt]);
    let func = f.function("g", vec![x], vec![], body);
    let contract = f.contract("C", vec![], vec![func]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Satisfiable);
    let reporter = analyze(&unit, &mut backend);

    let diags = reporter.diagnostics();
    assert!(diags
        .iter()
        .any(|d| d.location == SourceLocation::new(42, 57)
            && d.message.contains("Assertion violation")));
}

#[test]
fn unknown_and_conflicting_results_surface_as_warnings() {
    for (answer, fragment) in [
        (CheckResult::Unknown, "unknown"),
        (CheckResult::Conflicting, "conflicting answers"),
        (CheckResult::Error, "Error trying to invoke"),
    ] {
        let mut f = AstFactory::new();
        let cond = f.boolean(true);
        let assert_stmt = f.assert_stmt(cond, SourceLocation::new(1, 2));
        let body = f.block(vec![assert_stmt]);
        let func = f.function("g", vec![], vec![], body);
        let contract = f.contract("C", vec![], vec![func]);
        let unit = f.source_unit(vec![contract]);

        let mut backend = RecordingBackend::new(answer);
        let reporter = analyze(&unit, &mut backend);
        assert!(
            reporter
                .diagnostics()
                .iter()
                .any(|d| d.message.contains(fragment)),
            "{answer:?} should produce a warning mentioning {fragment:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// Constructors and inheritance
// ---------------------------------------------------------------------------

#[test]
fn explicit_constructor_threads_into_the_interface() {
    let mut f = AstFactory::new();
    let s = f.var("s", Type::Integer);
    let init = f.number(7);
    let store = f.assign(&s, init);
    let store_stmt = f.expr_stmt(store);
    let ctor_body = f.block(vec![store_stmt]);
    let ctor = f.constructor(vec![], ctor_body);
    let contract = f.contract("C", vec![s], vec![ctor]);
    let unit = f.source_unit(vec![contract]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    let edges = backend.edges();
    // implicit constructor -> ... -> constructor_exit -> interface
    assert!(edges
        .iter()
        .any(|(from, _)| from.starts_with("implicit_constructor_")));
    assert!(edges
        .iter()
        .any(|(from, to)| from.starts_with("constructor_exit_") && to.starts_with("interface_")));
    // Constructors never start from genesis directly.
    assert!(!edges
        .iter()
        .any(|(from, to)| from == "genesis_0" && to.starts_with("constructor_")));
}

#[test]
fn base_constructors_run_base_most_first() {
    let mut f = AstFactory::new();
    let base_s = f.var("bs", Type::Integer);
    let one = f.number(1);
    let store_base = f.assign(&base_s, one);
    let store_base_stmt = f.expr_stmt(store_base);
    let base_ctor_body = f.block(vec![store_base_stmt]);
    let base_ctor = f.constructor(vec![], base_ctor_body);
    let base = f.contract("Base", vec![base_s], vec![base_ctor]);

    let mut derived = f.contract("Derived", vec![], vec![]);
    derived.bases = vec![1, 0];
    let unit = f.source_unit(vec![base, derived]);

    let mut backend = RecordingBackend::new(CheckResult::Unsatisfiable);
    analyze(&unit, &mut backend);

    // The derived contract (visited second) inlines the base constructor:
    // a constructor_exit for it appears and reaches Derived's interface.
    let edges = backend.edges();
    assert!(edges
        .iter()
        .any(|(from, to)| from.starts_with("constructor_exit_")
            && to.starts_with("interface_Derived")));
}
