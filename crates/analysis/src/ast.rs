//! Typed AST of the contract language, decoupled from any parser.
//!
//! This mirrors the front-end's annotated AST but carries only what the
//! Horn encoding consumes: contracts with linearized bases and state
//! variables, functions with bodies, the structured statements of the
//! language, and expressions whose calls arrive pre-classified. Hosts
//! (and tests) construct units programmatically through [`AstFactory`].

use serde::Serialize;

/// Stable identity of an AST node within one source unit.
pub type NodeId = usize;

/// Stable identity of a variable declaration within one source unit.
pub type VarId = usize;

/// Byte span of a node in its source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceLocation {
    pub start: usize,
    pub end: usize,
}

impl SourceLocation {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A source unit: the ordered list of contracts in one file.
#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub contracts: Vec<ContractDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

#[derive(Debug, Clone)]
pub struct ContractDefinition {
    pub id: NodeId,
    pub name: String,
    pub kind: ContractKind,
    /// Linearized inheritance, most derived first; entry 0 is the
    /// contract itself.
    pub bases: Vec<usize>,
    pub state_variables: Vec<VariableDeclaration>,
    pub functions: Vec<FunctionDefinition>,
    pub location: SourceLocation,
}

impl ContractDefinition {
    /// Index of the explicit constructor among `functions`, if any.
    pub fn constructor(&self) -> Option<usize> {
        self.functions.iter().position(|f| f.is_constructor)
    }

    /// State variables of this contract and all bases, base-most first.
    pub fn state_variables_including_inherited<'a>(
        &'a self,
        unit: &'a SourceUnit,
    ) -> Vec<&'a VariableDeclaration> {
        let mut vars = Vec::new();
        for &base in self.bases.iter().rev() {
            vars.extend(unit.contracts[base].state_variables.iter());
        }
        vars
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub id: NodeId,
    /// Empty for constructors.
    pub name: String,
    /// Index of the defining contract within the source unit.
    pub scope: usize,
    pub is_constructor: bool,
    pub is_public: bool,
    pub is_implemented: bool,
    pub parameters: Vec<VariableDeclaration>,
    pub returns: Vec<VariableDeclaration>,
    pub body: Block,
    pub location: SourceLocation,
}

impl FunctionDefinition {
    pub fn kind_name(&self) -> &'static str {
        if self.is_constructor {
            "constructor"
        } else {
            "function"
        }
    }

    /// All local variables declared anywhere in the body, in source order.
    pub fn local_variables(&self) -> Vec<&VariableDeclaration> {
        let mut locals = Vec::new();
        collect_locals_block(&self.body, &mut locals);
        locals
    }
}

fn collect_locals_block<'a>(block: &'a Block, out: &mut Vec<&'a VariableDeclaration>) {
    for stmt in &block.statements {
        collect_locals_statement(stmt, out);
    }
}

fn collect_locals_statement<'a>(stmt: &'a Statement, out: &mut Vec<&'a VariableDeclaration>) {
    match stmt {
        Statement::Block(b) => collect_locals_block(b, out),
        Statement::If(s) => {
            collect_locals_block(&s.true_branch, out);
            if let Some(fb) = &s.false_branch {
                collect_locals_block(fb, out);
            }
        }
        Statement::While(s) => collect_locals_block(&s.body, out),
        Statement::For(s) => {
            if let Some(init) = &s.init {
                collect_locals_statement(init, out);
            }
            collect_locals_block(&s.body, out);
        }
        Statement::VariableDeclaration(s) => out.push(&s.declaration),
        Statement::Break { .. } | Statement::Continue { .. } | Statement::Expression(_) => {}
    }
}

/// Declared type of a source variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    /// Signed and unsigned machine integers are both abstracted to the
    /// mathematical integer sort.
    Integer,
    Address,
    Mapping(Box<Type>, Box<Type>),
    DynamicArray(Box<Type>),
}

impl Type {
    /// Abstraction of this type into a solver sort.
    pub fn smt_sort(&self) -> sol_fv_smtlib::Sort {
        use sol_fv_smtlib::Sort;
        match self {
            Type::Bool => Sort::Bool,
            Type::Integer | Type::Address => Sort::Int,
            Type::Mapping(key, value) => Sort::array(key.smt_sort(), value.smt_sort()),
            Type::DynamicArray(element) => Sort::array(Sort::Int, element.smt_sort()),
        }
    }

    /// Whether values of this type are references into storage.
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Mapping(_, _) | Type::DynamicArray(_))
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Block),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Break { id: NodeId, location: SourceLocation },
    Continue { id: NodeId, location: SourceLocation },
    VariableDeclaration(VariableDeclarationStatement),
    Expression(ExpressionStatement),
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub id: NodeId,
    pub condition: Expression,
    pub true_branch: Block,
    pub false_branch: Option<Block>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub id: NodeId,
    pub condition: Expression,
    pub body: Block,
    pub is_do_while: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub id: NodeId,
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    /// Post-iteration expression, e.g. the `i++` of a counting loop.
    pub post: Option<Expression>,
    pub body: Block,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct VariableDeclarationStatement {
    pub id: NodeId,
    pub declaration: VariableDeclaration,
    pub initial_value: Option<Expression>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub id: NodeId,
    pub expression: Expression,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub id: NodeId,
    pub kind: ExpressionKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    BoolLiteral(bool),
    NumberLiteral(i128),
    Identifier(VarId),
    Assignment { lhs: VarId, rhs: Box<Expression> },
    Binary {
        op: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Call(FunctionCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

/// Reference to a function definition within the source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRef {
    pub contract: usize,
    pub function: usize,
}

/// Kind of a call expression, classified by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Assert,
    Internal,
    External,
    DelegateCall,
    BareCall,
    BareCallCode,
    BareDelegateCall,
    BareStaticCall,
    Creation,
    Keccak256,
    EcRecover,
    Sha256,
    Ripemd160,
    BlockHash,
    AddMod,
    MulMod,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub id: NodeId,
    pub kind: CallKind,
    /// Resolved target; present exactly for internal calls the front-end
    /// could resolve.
    pub target: Option<FunctionRef>,
    pub arguments: Vec<Expression>,
    pub location: SourceLocation,
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Allocates node ids and assembles well-formed AST pieces.
#[derive(Debug, Default)]
pub struct AstFactory {
    next_id: usize,
}

impl AstFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn var(&mut self, name: impl Into<String>, ty: Type) -> VariableDeclaration {
        VariableDeclaration {
            id: self.fresh(),
            name: name.into(),
            ty,
            location: SourceLocation::default(),
        }
    }

    pub fn number(&mut self, value: i128) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::NumberLiteral(value),
            location: SourceLocation::default(),
        }
    }

    pub fn boolean(&mut self, value: bool) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::BoolLiteral(value),
            location: SourceLocation::default(),
        }
    }

    pub fn ident(&mut self, decl: &VariableDeclaration) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::Identifier(decl.id),
            location: SourceLocation::default(),
        }
    }

    pub fn assign(&mut self, lhs: &VariableDeclaration, rhs: Expression) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::Assignment {
                lhs: lhs.id,
                rhs: Box::new(rhs),
            },
            location: SourceLocation::default(),
        }
    }

    pub fn binary(&mut self, op: BinaryOperator, lhs: Expression, rhs: Expression) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            location: SourceLocation::default(),
        }
    }

    pub fn unary(&mut self, op: UnaryOperator, operand: Expression) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            location: SourceLocation::default(),
        }
    }

    pub fn call(
        &mut self,
        kind: CallKind,
        target: Option<FunctionRef>,
        arguments: Vec<Expression>,
        location: SourceLocation,
    ) -> Expression {
        Expression {
            id: self.fresh(),
            kind: ExpressionKind::Call(FunctionCall {
                id: self.fresh(),
                kind,
                target,
                arguments,
                location,
            }),
            location,
        }
    }

    /// `assert(condition);` as a statement, located at `location`.
    pub fn assert_stmt(&mut self, condition: Expression, location: SourceLocation) -> Statement {
        let call = self.call(CallKind::Assert, None, vec![condition], location);
        self.expr_stmt(call)
    }

    pub fn expr_stmt(&mut self, expression: Expression) -> Statement {
        Statement::Expression(ExpressionStatement {
            id: self.fresh(),
            location: expression.location,
            expression,
        })
    }

    pub fn var_decl_stmt(
        &mut self,
        declaration: VariableDeclaration,
        initial_value: Option<Expression>,
    ) -> Statement {
        Statement::VariableDeclaration(VariableDeclarationStatement {
            id: self.fresh(),
            location: declaration.location,
            declaration,
            initial_value,
        })
    }

    pub fn block(&mut self, statements: Vec<Statement>) -> Block {
        Block {
            id: self.fresh(),
            statements,
        }
    }

    pub fn if_stmt(
        &mut self,
        condition: Expression,
        true_branch: Block,
        false_branch: Option<Block>,
    ) -> Statement {
        Statement::If(IfStatement {
            id: self.fresh(),
            condition,
            true_branch,
            false_branch,
            location: SourceLocation::default(),
        })
    }

    pub fn while_stmt(&mut self, condition: Expression, body: Block) -> Statement {
        Statement::While(WhileStatement {
            id: self.fresh(),
            condition,
            body,
            is_do_while: false,
            location: SourceLocation::default(),
        })
    }

    pub fn do_while_stmt(&mut self, condition: Expression, body: Block) -> Statement {
        Statement::While(WhileStatement {
            id: self.fresh(),
            condition,
            body,
            is_do_while: true,
            location: SourceLocation::default(),
        })
    }

    pub fn for_stmt(
        &mut self,
        init: Option<Statement>,
        condition: Option<Expression>,
        post: Option<Expression>,
        body: Block,
    ) -> Statement {
        Statement::For(ForStatement {
            id: self.fresh(),
            init: init.map(Box::new),
            condition,
            post,
            body,
            location: SourceLocation::default(),
        })
    }

    pub fn break_stmt(&mut self) -> Statement {
        Statement::Break {
            id: self.fresh(),
            location: SourceLocation::default(),
        }
    }

    pub fn continue_stmt(&mut self) -> Statement {
        Statement::Continue {
            id: self.fresh(),
            location: SourceLocation::default(),
        }
    }

    /// A public, implemented, non-constructor function. The `scope` field
    /// is fixed up by [`AstFactory::source_unit`].
    pub fn function(
        &mut self,
        name: impl Into<String>,
        parameters: Vec<VariableDeclaration>,
        returns: Vec<VariableDeclaration>,
        body: Block,
    ) -> FunctionDefinition {
        FunctionDefinition {
            id: self.fresh(),
            name: name.into(),
            scope: 0,
            is_constructor: false,
            is_public: true,
            is_implemented: true,
            parameters,
            returns,
            body,
            location: SourceLocation::default(),
        }
    }

    pub fn constructor(
        &mut self,
        parameters: Vec<VariableDeclaration>,
        body: Block,
    ) -> FunctionDefinition {
        FunctionDefinition {
            id: self.fresh(),
            name: String::new(),
            scope: 0,
            is_constructor: true,
            is_public: true,
            is_implemented: true,
            parameters,
            returns: Vec::new(),
            body,
            location: SourceLocation::default(),
        }
    }

    pub fn contract(
        &mut self,
        name: impl Into<String>,
        state_variables: Vec<VariableDeclaration>,
        functions: Vec<FunctionDefinition>,
    ) -> ContractDefinition {
        ContractDefinition {
            id: self.fresh(),
            name: name.into(),
            kind: ContractKind::Contract,
            bases: Vec::new(),
            state_variables,
            functions,
            location: SourceLocation::default(),
        }
    }

    /// Assemble a unit, defaulting each contract's linearization to
    /// itself and pointing every function's scope at its contract.
    pub fn source_unit(&mut self, mut contracts: Vec<ContractDefinition>) -> SourceUnit {
        for (idx, contract) in contracts.iter_mut().enumerate() {
            if contract.bases.is_empty() {
                contract.bases = vec![idx];
            }
            for function in &mut contract.functions {
                function.scope = idx;
            }
        }
        SourceUnit { contracts }
    }
}
