//! The standardized AST consumed by every phase after the parser adapter.
//!
//! Nodes are plain, allocator-free, owned trees — deliberately decoupled from
//! `oxc_ast`'s arena-backed representation so that the feature gate, canvas
//! preprocessor, symbol analyzer, and lowerer never need to carry an
//! `oxc_allocator::Allocator` lifetime. `scratchc::parser` is the only module
//! that talks to `oxc_ast`.

use serde::{Deserialize, Serialize};

/// A 1-based source position, matching the convention of most JavaScript
/// tooling (and of the target environment's own error reporting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// A span used for nodes synthesized by a rewrite pass (the canvas
    /// preprocessor, for example) that have no direct source location.
    pub const SYNTHETIC: Self = Self { line: 0, column: 0 };
}

/// A complete, parsed program: an ordered list of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let`/`const`/`var` declarations. Only single-declarator forms are
    /// produced by the parser adapter; `let a = 1, b = 2;` is split into two
    /// consecutive `VarDecl` statements during adaptation.
    VarDecl {
        name: String,
        init: Option<Expr>,
        span: Span,
    },
    /// An expression used as a full statement (assignments, calls).
    Expr { expr: Expr, span: Span },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        span: Span,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    Block { body: Vec<Stmt>, span: Span },
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        is_async: bool,
        span: Span,
    },
    Return { argument: Option<Expr>, span: Span },
    /// Any statement kind not named above (`try`/`switch`/`class`/...).
    /// Carried through so the feature gate and lowerer can each apply their
    /// own "silent skip" or "reject" policy; never matched by name.
    Other { span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Block { span, .. }
            | Stmt::FunctionDecl { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Other { span } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    NumberLiteral { value: f64, span: Span },
    StringLiteral { value: String, span: Span },
    BoolLiteral { value: bool, span: Span },
    Identifier { name: String, span: Span },
    ArrayLiteral { elements: Vec<Expr>, span: Span },
    ObjectLiteral {
        properties: Vec<(String, Expr)>,
        span: Span,
    },
    /// `a = b`, `a.b = c`, `a[b] = c`.
    Assign {
        target: Box<AssignTarget>,
        value: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Callee>,
        arguments: Vec<Expr>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: MemberKey,
        span: Span,
    },
    /// `(a, b) => expr_or_block` and `function(a, b) { ... }` expressions.
    /// The analyzer only ever sees this as the initializer of a
    /// `VarDecl`; it is not itself a statement.
    FunctionExpr {
        params: Vec<String>,
        body: FunctionBody,
        is_async: bool,
        span: Span,
    },
    /// `await expr`. Always rejected by the feature gate; carried as its own
    /// variant (rather than folded into `Other`) so the gate can name it
    /// precisely, per §4.2.
    Await { argument: Box<Expr>, span: Span },
    /// Any expression kind not named above (template literals, spread,
    /// `new`, `typeof`, ...). Lowering treats it with the safe numeric-zero
    /// fallback per the distilled spec's §4.5.2 "otherwise" rule.
    Other { span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::NumberLiteral { span, .. }
            | Expr::StringLiteral { span, .. }
            | Expr::BoolLiteral { span, .. }
            | Expr::Identifier { span, .. }
            | Expr::ArrayLiteral { span, .. }
            | Expr::ObjectLiteral { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. }
            | Expr::FunctionExpr { span, .. }
            | Expr::Await { span, .. }
            | Expr::Other { span } => *span,
        }
    }
}

/// Body of an arrow/function expression: either a single implicit-return
/// expression (`(a, b) => a + b`) or a block of statements.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Identifier(String),
    Member { object: Expr, property: MemberKey },
}

/// `obj.prop` uses `Name`; `obj["prop"]` and `arr[i]` use `Computed`.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    Name(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// A plain identifier call: `f(...)`.
    Identifier(String),
    /// A method call `obj.method(...)`, retained whole so call-site
    /// lowering rules (`scratch_say`, `arr.push`, ...) can match on both
    /// the receiver and the method name.
    Member { object: Expr, property: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}
