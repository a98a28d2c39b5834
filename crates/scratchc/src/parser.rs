//! Parser adapter (§4.1): a thin wrapper over an ECMAScript-compatible
//! parser, producing the standardized [`crate::ast`] consumed by every later
//! phase. `oxc_parser`/`oxc_ast` do the lexing and grammar work; this module
//! only walks the resulting arena-allocated tree once, copying out the shape
//! described in the data model and discarding everything else.

use oxc_allocator::Allocator;
use oxc_ast::ast as oxc;
use oxc_parser::Parser as OxcParser;
use oxc_span::{GetSpan, SourceType, Span as OxcSpan};

use crate::ast::{AssignTarget, BinOp, Callee, Expr, FunctionBody, MemberKey, Program, Span, Stmt, UnaryOp};
use crate::error::CompileError;

/// Parses `source` as a JavaScript program and lowers the parser's arena AST
/// into the allocator-free [`Program`] used by the rest of the pipeline.
///
/// Only the first parser diagnostic is surfaced, matching the deterministic
/// first-error policy used by the feature gate (§4.2).
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let allocator = Allocator::default();
    let source_type = SourceType::default();
    let result = OxcParser::new(&allocator, source, source_type).parse();

    let lines = LineIndex::new(source);
    if let Some(diagnostic) = result.errors.into_iter().next() {
        let position = lines.span(0);
        return Err(CompileError::parse(diagnostic.to_string(), position));
    }

    let body = lower_stmts(&result.program.body, &lines);
    Ok(Program { body })
}

/// Maps UTF-8 byte offsets to 1-based `(line, column)` pairs. Built once per
/// parse; every node lowering call reuses it.
struct LineIndex {
    /// Byte offset of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    fn span(&self, offset: u32) -> Span {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let column = offset - self.line_starts[line];
        Span::new(line as u32 + 1, column + 1)
    }
}

fn span_of(lines: &LineIndex, span: OxcSpan) -> Span {
    lines.span(span.start)
}

/// Lowers a statement list, flattening multi-declarator `let a = 1, b = 2;`
/// forms into one `VarDecl` per declarator so every later phase (which walks
/// `Vec<Stmt>`, never a single `Stmt`) sees them as consecutive statements.
fn lower_stmts(stmts: &[oxc::Statement], lines: &LineIndex) -> Vec<Stmt> {
    stmts.iter().flat_map(|stmt| lower_stmt_multi(stmt, lines)).collect()
}

fn lower_stmt_multi(stmt: &oxc::Statement, lines: &LineIndex) -> Vec<Stmt> {
    match stmt {
        oxc::Statement::VariableDeclaration(decl) => decl
            .declarations
            .iter()
            .map(|d| lower_single_var_decl(d, lines, d.span))
            .collect(),
        other => vec![lower_stmt(other, lines)],
    }
}

fn lower_stmt(stmt: &oxc::Statement, lines: &LineIndex) -> Stmt {
    match stmt {
        // Handled by `lower_stmt_multi` at statement-list positions; a bare
        // `lower_stmt` call only ever reaches here from a single-statement
        // position (`if`/`while`/`for` body without braces), where the
        // source grammar does not permit a variable declaration anyway, so
        // only the first declarator is representable.
        oxc::Statement::VariableDeclaration(decl) => lower_single_var_decl(&decl.declarations[0], lines, decl.span),
        oxc::Statement::ExpressionStatement(expr_stmt) => Stmt::Expr {
            expr: lower_expr(&expr_stmt.expression, lines),
            span: span_of(lines, expr_stmt.span),
        },
        oxc::Statement::IfStatement(if_stmt) => Stmt::If {
            test: lower_expr(&if_stmt.test, lines),
            consequent: Box::new(lower_stmt(&if_stmt.consequent, lines)),
            span: span_of(lines, if_stmt.span),
        },
        oxc::Statement::WhileStatement(while_stmt) => Stmt::While {
            test: lower_expr(&while_stmt.test, lines),
            body: Box::new(lower_stmt(&while_stmt.body, lines)),
            span: span_of(lines, while_stmt.span),
        },
        oxc::Statement::ForStatement(for_stmt) => Stmt::For {
            init: for_stmt.init.as_ref().map(|init| Box::new(lower_for_init(init, lines))),
            test: for_stmt.test.as_ref().map(|e| lower_expr(e, lines)),
            update: for_stmt.update.as_ref().map(|e| lower_expr(e, lines)),
            body: Box::new(lower_stmt(&for_stmt.body, lines)),
            span: span_of(lines, for_stmt.span),
        },
        oxc::Statement::BlockStatement(block) => Stmt::Block {
            body: lower_stmts(&block.body, lines),
            span: span_of(lines, block.span),
        },
        oxc::Statement::FunctionDeclaration(func) => lower_function_decl(func, lines),
        oxc::Statement::ReturnStatement(ret) => Stmt::Return {
            argument: ret.argument.as_ref().map(|e| lower_expr(e, lines)),
            span: span_of(lines, ret.span),
        },
        other => Stmt::Other {
            span: span_of(lines, other.span()),
        },
    }
}

fn lower_for_init(init: &oxc::ForStatementInit, lines: &LineIndex) -> Stmt {
    match init {
        oxc::ForStatementInit::VariableDeclaration(decl) => {
            lower_single_var_decl(&decl.declarations[0], lines, decl.span)
        }
        // `for (i = 0; ...)` with a pre-declared variable is not part of
        // the simple-for / general-for normalization tables in §4.5.1,
        // which both assume a `let` initializer; treated as a silent skip
        // like any other unrecognized statement position.
        other => Stmt::Other {
            span: span_of(lines, other.span()),
        },
    }
}

fn lower_single_var_decl(decl: &oxc::VariableDeclarator, lines: &LineIndex, span: OxcSpan) -> Stmt {
    let name = binding_identifier_name(&decl.id);
    Stmt::VarDecl {
        name,
        init: decl.init.as_ref().map(|e| lower_expr(e, lines)),
        span: span_of(lines, span),
    }
}

fn binding_identifier_name(pattern: &oxc::BindingPattern) -> String {
    match &pattern.kind {
        oxc::BindingPatternKind::BindingIdentifier(id) => id.name.to_string(),
        // Destructuring patterns are not part of the supported subset; the
        // symbol analyzer and lowerer never see a name for them, which
        // causes the feature gate/lowerer to treat the declaration as a
        // no-op rather than panicking.
        _ => String::new(),
    }
}

fn lower_function_decl(func: &oxc::Function, lines: &LineIndex) -> Stmt {
    let name = func.id.as_ref().map_or_else(String::new, |id| id.name.to_string());
    let params = function_params(&func.params);
    let body = func
        .body
        .as_ref()
        .map(|b| lower_stmts(&b.statements, lines))
        .unwrap_or_default();
    Stmt::FunctionDecl {
        name,
        params,
        body,
        is_async: func.r#async,
        span: span_of(lines, func.span),
    }
}

fn function_params(params: &oxc::FormalParameters) -> Vec<String> {
    params.items.iter().map(|p| binding_identifier_name(&p.pattern)).collect()
}

fn lower_expr(expr: &oxc::Expression, lines: &LineIndex) -> Expr {
    match expr {
        oxc::Expression::NumericLiteral(lit) => Expr::NumberLiteral {
            value: lit.value,
            span: span_of(lines, lit.span),
        },
        oxc::Expression::StringLiteral(lit) => Expr::StringLiteral {
            value: lit.value.to_string(),
            span: span_of(lines, lit.span),
        },
        oxc::Expression::BooleanLiteral(lit) => Expr::BoolLiteral {
            value: lit.value,
            span: span_of(lines, lit.span),
        },
        oxc::Expression::Identifier(id) => Expr::Identifier {
            name: id.name.to_string(),
            span: span_of(lines, id.span),
        },
        oxc::Expression::ArrayExpression(arr) => Expr::ArrayLiteral {
            elements: arr
                .elements
                .iter()
                .filter_map(|el| el.as_expression().map(|e| lower_expr(e, lines)))
                .collect(),
            span: span_of(lines, arr.span),
        },
        oxc::Expression::ObjectExpression(obj) => Expr::ObjectLiteral {
            properties: obj
                .properties
                .iter()
                .filter_map(|prop| lower_object_property(prop, lines))
                .collect(),
            span: span_of(lines, obj.span),
        },
        oxc::Expression::AssignmentExpression(assign) => lower_assignment(assign, lines),
        oxc::Expression::BinaryExpression(bin) => lower_binary(bin, lines),
        oxc::Expression::UnaryExpression(unary) if matches!(unary.operator, oxc::UnaryOperator::LogicalNot) => {
            Expr::Unary {
                op: UnaryOp::Not,
                argument: Box::new(lower_expr(&unary.argument, lines)),
                span: span_of(lines, unary.span),
            }
        }
        oxc::Expression::CallExpression(call) => lower_call(call, lines),
        oxc::Expression::StaticMemberExpression(member) => Expr::Member {
            object: Box::new(lower_expr(&member.object, lines)),
            property: MemberKey::Name(member.property.name.to_string()),
            span: span_of(lines, member.span),
        },
        oxc::Expression::ComputedMemberExpression(member) => Expr::Member {
            object: Box::new(lower_expr(&member.object, lines)),
            property: MemberKey::Computed(Box::new(lower_expr(&member.expression, lines))),
            span: span_of(lines, member.span),
        },
        oxc::Expression::ArrowFunctionExpression(arrow) => Expr::FunctionExpr {
            params: function_params(&arrow.params),
            body: if arrow.expression {
                arrow
                    .body
                    .statements
                    .first()
                    .and_then(|s| match s {
                        oxc::Statement::ExpressionStatement(e) => Some(FunctionBody::Expr(Box::new(lower_expr(
                            &e.expression,
                            lines,
                        )))),
                        _ => None,
                    })
                    .unwrap_or_else(|| FunctionBody::Block(Vec::new()))
            } else {
                FunctionBody::Block(lower_stmts(&arrow.body.statements, lines))
            },
            is_async: arrow.r#async,
            span: span_of(lines, arrow.span),
        },
        oxc::Expression::FunctionExpression(func) => Expr::FunctionExpr {
            params: function_params(&func.params),
            body: FunctionBody::Block(
                func.body
                    .as_ref()
                    .map(|b| lower_stmts(&b.statements, lines))
                    .unwrap_or_default(),
            ),
            is_async: func.r#async,
            span: span_of(lines, func.span),
        },
        oxc::Expression::AwaitExpression(await_expr) => Expr::Await {
            argument: Box::new(lower_expr(&await_expr.argument, lines)),
            span: span_of(lines, await_expr.span),
        },
        oxc::Expression::UpdateExpression(update) => lower_update(update, lines),
        other => Expr::Other {
            span: span_of(lines, other.span()),
        },
    }
}

fn lower_object_property(prop: &oxc::ObjectPropertyKind, lines: &LineIndex) -> Option<(String, Expr)> {
    match prop {
        oxc::ObjectPropertyKind::ObjectProperty(p) => {
            let key = match &p.key {
                oxc::PropertyKey::StaticIdentifier(id) => Some(id.name.to_string()),
                oxc::PropertyKey::StringLiteral(lit) => Some(lit.value.to_string()),
                _ => None,
            }?;
            Some((key, lower_expr(&p.value, lines)))
        }
        oxc::ObjectPropertyKind::SpreadProperty(_) => None,
    }
}

fn lower_assignment(assign: &oxc::AssignmentExpression, lines: &LineIndex) -> Expr {
    let span = span_of(lines, assign.span);
    let target = match &assign.left {
        oxc::AssignmentTarget::AssignmentTargetIdentifier(id) => AssignTarget::Identifier(id.name.to_string()),
        oxc::AssignmentTarget::StaticMemberExpression(member) => AssignTarget::Member {
            object: lower_expr(&member.object, lines),
            property: MemberKey::Name(member.property.name.to_string()),
        },
        oxc::AssignmentTarget::ComputedMemberExpression(member) => AssignTarget::Member {
            object: lower_expr(&member.object, lines),
            property: MemberKey::Computed(Box::new(lower_expr(&member.expression, lines))),
        },
        _ => AssignTarget::Identifier(String::new()),
    };
    let rhs = lower_expr(&assign.right, lines);
    // Compound assignment (`x += e`) is desugared to `x = x op e` right here,
    // so the lowerer only ever needs to recognize plain `Assign` + `Binary` —
    // this is also what makes `i += 1` and `i++` produce the identical shape
    // the simple-for detector looks for.
    let value = match compound_op(assign.operator) {
        Some(op) => Expr::Binary {
            op,
            left: Box::new(target_as_expr(&target, span)),
            right: Box::new(rhs),
            span,
        },
        None => rhs,
    };
    Expr::Assign {
        target: Box::new(target),
        value: Box::new(value),
        span,
    }
}

fn compound_op(operator: oxc::AssignmentOperator) -> Option<BinOp> {
    match operator {
        oxc::AssignmentOperator::Addition => Some(BinOp::Add),
        oxc::AssignmentOperator::Subtraction => Some(BinOp::Sub),
        oxc::AssignmentOperator::Multiplication => Some(BinOp::Mul),
        oxc::AssignmentOperator::Division => Some(BinOp::Div),
        _ => None,
    }
}

fn target_as_expr(target: &AssignTarget, span: Span) -> Expr {
    match target {
        AssignTarget::Identifier(name) => Expr::Identifier {
            name: name.clone(),
            span,
        },
        AssignTarget::Member { object, property } => Expr::Member {
            object: Box::new(object.clone()),
            property: property.clone(),
            span,
        },
    }
}

/// `i++` / `i--` desugar the same way compound assignment does: `i = i + 1`.
/// Member-expression update targets (`obj.x++`) are not part of the
/// supported subset and fall back to `Other`.
fn lower_update(update: &oxc::UpdateExpression, lines: &LineIndex) -> Expr {
    let span = span_of(lines, update.span);
    let oxc::SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = &update.argument else {
        return Expr::Other { span };
    };
    let name = id.name.to_string();
    let op = match update.operator {
        oxc::UpdateOperator::Increment => BinOp::Add,
        oxc::UpdateOperator::Decrement => BinOp::Sub,
    };
    Expr::Assign {
        target: Box::new(AssignTarget::Identifier(name.clone())),
        value: Box::new(Expr::Binary {
            op,
            left: Box::new(Expr::Identifier { name, span }),
            right: Box::new(Expr::NumberLiteral { value: 1.0, span }),
            span,
        }),
        span,
    }
}

fn lower_binary(bin: &oxc::BinaryExpression, lines: &LineIndex) -> Expr {
    let op = match bin.operator {
        oxc::BinaryOperator::Addition => BinOp::Add,
        oxc::BinaryOperator::Subtraction => BinOp::Sub,
        oxc::BinaryOperator::Multiplication => BinOp::Mul,
        oxc::BinaryOperator::Division => BinOp::Div,
        oxc::BinaryOperator::LessThan => BinOp::Lt,
        oxc::BinaryOperator::GreaterThan => BinOp::Gt,
        oxc::BinaryOperator::LessEqualThan => BinOp::Le,
        oxc::BinaryOperator::GreaterEqualThan => BinOp::Ge,
        oxc::BinaryOperator::Equality | oxc::BinaryOperator::StrictEquality => BinOp::Eq,
        oxc::BinaryOperator::Inequality | oxc::BinaryOperator::StrictInequality => BinOp::Ne,
        // Any other operator (bitwise, `in`, `instanceof`, ...) has no
        // lowering rule; represented as `Other` so the lowerer's fallback
        // applies instead of panicking here.
        _ => {
            return Expr::Other {
                span: span_of(lines, bin.span),
            };
        }
    };
    Expr::Binary {
        op,
        left: Box::new(lower_expr(&bin.left, lines)),
        right: Box::new(lower_expr(&bin.right, lines)),
        span: span_of(lines, bin.span),
    }
}

fn lower_call(call: &oxc::CallExpression, lines: &LineIndex) -> Expr {
    let callee = match &call.callee {
        oxc::Expression::Identifier(id) => Callee::Identifier(id.name.to_string()),
        oxc::Expression::StaticMemberExpression(member) => Callee::Member {
            object: lower_expr(&member.object, lines),
            property: member.property.name.to_string(),
        },
        other => Callee::Member {
            object: lower_expr(other, lines),
            property: String::new(),
        },
    };
    Expr::Call {
        callee: Box::new(callee),
        arguments: call
            .arguments
            .iter()
            .filter_map(|a| a.as_expression().map(|e| lower_expr(e, lines)))
            .collect(),
        span: span_of(lines, call.span),
    }
}
