//! Feature gate (§4.2): the compiler's allow-list. Walks the AST in
//! deterministic lexical pre-order and reports the first banned construct it
//! finds. Lowering itself never rejects anything — this is the only phase
//! that can fail a program for "using too much JavaScript".

use crate::ast::{Callee, Expr, FunctionBody, MemberKey, Program, Span, Stmt};
use crate::error::CompileError;

/// Dotted-prefix banned list, matched exactly against the *full* chain of a
/// member expression (`window.location.href` matches `window.location`).
const BANNED_PREFIXES: &[&str] = &[
    "window.location",
    "window.alert",
    "window.confirm",
    "window.prompt",
    "document.getElementById",
    "document.querySelector",
    "console.log",
    "localStorage",
    "sessionStorage",
    "fetch",
    "XMLHttpRequest",
    "setTimeout",
    "setInterval",
    "Promise",
];

/// Walks `program` and returns `Ok(())` if it only uses allowed features, or
/// the first `CompileError::UnsupportedFeature` encountered otherwise.
pub fn check(program: &Program) -> Result<(), CompileError> {
    for stmt in &program.body {
        check_stmt(stmt)?;
    }
    Ok(())
}

fn check_stmt(stmt: &Stmt) -> Result<(), CompileError> {
    match stmt {
        Stmt::VarDecl { init, .. } => {
            if let Some(expr) = init {
                check_expr(expr)?;
            }
        }
        Stmt::Expr { expr, .. } => check_expr(expr)?,
        Stmt::If { test, consequent, .. } => {
            check_expr(test)?;
            check_stmt(consequent)?;
        }
        Stmt::While { test, body, .. } => {
            check_expr(test)?;
            check_stmt(body)?;
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                check_stmt(init)?;
            }
            if let Some(test) = test {
                check_expr(test)?;
            }
            if let Some(update) = update {
                check_expr(update)?;
            }
            check_stmt(body)?;
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                check_stmt(stmt)?;
            }
        }
        Stmt::FunctionDecl { body, is_async, span, .. } => {
            if *is_async {
                return Err(CompileError::unsupported_feature("async", *span));
            }
            for stmt in body {
                check_stmt(stmt)?;
            }
        }
        Stmt::Return { argument, .. } => {
            if let Some(argument) = argument {
                check_expr(argument)?;
            }
        }
        Stmt::Other { .. } => {}
    }
    Ok(())
}

fn check_expr(expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::ArrayLiteral { elements, .. } => {
            for element in elements {
                check_expr(element)?;
            }
        }
        Expr::ObjectLiteral { properties, .. } => {
            for (_, value) in properties {
                check_expr(value)?;
            }
        }
        Expr::Assign { target, value, .. } => {
            if let crate::ast::AssignTarget::Member { object, property } = target.as_ref() {
                check_expr(object)?;
                if let MemberKey::Computed(key) = property {
                    check_expr(key)?;
                }
            }
            check_expr(value)?;
        }
        Expr::Binary { left, right, .. } => {
            check_expr(left)?;
            check_expr(right)?;
        }
        Expr::Unary { argument, .. } => check_expr(argument)?,
        Expr::Call { callee, arguments, .. } => {
            check_callee(callee, expr.span())?;
            for argument in arguments {
                check_expr(argument)?;
            }
        }
        Expr::Member { object, property, .. } => {
            if let Some(name) = dotted_prefix(expr) {
                reject_if_banned(&name, expr.span())?;
            }
            check_expr(object)?;
            if let MemberKey::Computed(key) = property {
                check_expr(key)?;
            }
        }
        Expr::FunctionExpr { body, is_async, .. } => {
            if *is_async {
                return Err(CompileError::unsupported_feature("async", expr.span()));
            }
            match body {
                FunctionBody::Expr(expr) => check_expr(expr)?,
                FunctionBody::Block(stmts) => {
                    for stmt in stmts {
                        check_stmt(stmt)?;
                    }
                }
            }
        }
        Expr::Await { .. } => {
            return Err(CompileError::unsupported_feature("await", expr.span()));
        }
        Expr::NumberLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Identifier { .. }
        | Expr::Other { .. } => {}
    }
    Ok(())
}

fn check_callee(callee: &Callee, span: Span) -> Result<(), CompileError> {
    match callee {
        Callee::Identifier(name) => reject_if_banned(name, span),
        Callee::Member { object, property } => {
            let mut full = member_chain(object);
            full.push(property.clone());
            reject_if_banned(&full.join("."), span)?;
            check_expr(object)
        }
    }
}

/// Builds the dotted-prefix string for a member-expression chain, e.g.
/// `window.location.href` for `window.location.href`. Returns `None` when
/// the base of the chain is not a plain identifier (computed or
/// non-identifier receivers can never match the banned list).
fn dotted_prefix(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Member { object, property, .. } => {
            let MemberKey::Name(name) = property else {
                return None;
            };
            let mut prefix = dotted_prefix(object).or_else(|| identifier_name(object))?;
            prefix.push('.');
            prefix.push_str(name);
            Some(prefix)
        }
        _ => None,
    }
}

fn identifier_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier { name, .. } => Some(name.clone()),
        _ => None,
    }
}

fn member_chain(expr: &Expr) -> Vec<String> {
    match expr {
        Expr::Identifier { name, .. } => vec![name.clone()],
        Expr::Member { object, property, .. } => {
            let mut chain = member_chain(object);
            if let MemberKey::Name(name) = property {
                chain.push(name.clone());
            }
            chain
        }
        _ => Vec::new(),
    }
}

fn reject_if_banned(name: &str, position: Span) -> Result<(), CompileError> {
    for banned in BANNED_PREFIXES {
        if name == *banned || name.starts_with(&format!("{banned}.")) {
            return Err(CompileError::unsupported_feature((*banned).to_string(), position));
        }
    }
    Ok(())
}
