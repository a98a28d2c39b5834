//! Canvas preprocessor (§4.3): an AST-to-AST rewrite that replaces a fixed
//! set of canvas-2D-context calls with calls/assignments in a private
//! `scratch_*` namespace, so programs written against `<canvas>` still
//! compile instead of tripping the feature gate on `document.getElementById`.
//!
//! Implemented as a direct AST transform rather than a textual
//! rewrite-then-reparse: by the time this phase runs, the program has
//! already parsed successfully (phase 1), so there is no second parse that
//! can fail here. The "parsing failure returns source unchanged" clause of
//! §4.3 is satisfied one level up, in [`crate::compile`]: a phase-1 parse
//! failure aborts the whole compilation before this phase is ever reached,
//! which is observationally identical to "the canvas rewrite was skipped".

use std::collections::HashSet;

use crate::ast::{AssignTarget, Callee, Expr, MemberKey, Program, Stmt};

const PATH_OR_DRAW_CALLS: &[&str] = &[
    "fillRect",
    "strokeRect",
    "clearRect",
    "rect",
    "arc",
    "beginPath",
    "closePath",
    "moveTo",
    "lineTo",
    "quadraticCurveTo",
    "bezierCurveTo",
    "stroke",
    "fill",
    "save",
    "restore",
    "translate",
    "rotate",
    "scale",
    "drawImage",
];

#[derive(Default)]
struct Bindings {
    elements: HashSet<String>,
    contexts: HashSet<String>,
}

/// Rewrites `program` in place (conceptually — consumes and returns) if it
/// contains any canvas-element or canvas-context bindings; returns it
/// unchanged otherwise, per §4.3's "no canvas bindings at all" clause.
pub fn preprocess(program: Program) -> Program {
    let bindings = collect_bindings(&program);
    if bindings.elements.is_empty() && bindings.contexts.is_empty() {
        return program;
    }
    Program {
        body: rewrite_stmts(program.body, &bindings),
    }
}

fn collect_bindings(program: &Program) -> Bindings {
    let mut bindings = Bindings::default();
    collect_in_stmts(&program.body, &mut bindings);
    bindings
}

fn collect_in_stmts(stmts: &[Stmt], bindings: &mut Bindings) {
    for stmt in stmts {
        collect_in_stmt(stmt, bindings);
    }
}

fn collect_in_stmt(stmt: &Stmt, bindings: &mut Bindings) {
    match stmt {
        Stmt::VarDecl { name, init: Some(init), .. } => {
            if is_get_element_by_id(init) {
                bindings.elements.insert(name.clone());
            } else if is_get_context(init, &bindings.elements) {
                bindings.contexts.insert(name.clone());
            }
        }
        Stmt::VarDecl { .. } | Stmt::Return { .. } | Stmt::Expr { .. } | Stmt::Other { .. } => {}
        Stmt::If { consequent, .. } => collect_in_stmt(consequent, bindings),
        Stmt::While { body, .. } => collect_in_stmt(body, bindings),
        Stmt::For { init, body, .. } => {
            if let Some(init) = init {
                collect_in_stmt(init, bindings);
            }
            collect_in_stmt(body, bindings);
        }
        Stmt::Block { body, .. } | Stmt::FunctionDecl { body, .. } => collect_in_stmts(body, bindings),
    }
}

fn is_get_element_by_id(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Call { callee, .. }
            if matches!(callee.as_ref(), Callee::Member { object: Expr::Identifier { name, .. }, property }
                if name == "document" && property == "getElementById")
    )
}

fn is_get_context(expr: &Expr, elements: &HashSet<String>) -> bool {
    match expr {
        Expr::Call { callee, .. } => match callee.as_ref() {
            Callee::Member { object, property } if property == "getContext" => match object {
                Expr::Identifier { name, .. } => elements.contains(name) || name == "canvas",
                _ => false,
            },
            _ => false,
        },
        _ => false,
    }
}

fn rewrite_stmts(stmts: Vec<Stmt>, bindings: &Bindings) -> Vec<Stmt> {
    stmts.into_iter().filter_map(|stmt| rewrite_stmt(stmt, bindings)).collect()
}

/// Returns `None` when the statement should be dropped (canvas/element
/// bindings themselves, and the removed-call table entries).
fn rewrite_stmt(stmt: Stmt, bindings: &Bindings) -> Option<Stmt> {
    match stmt {
        Stmt::VarDecl { name, .. } if bindings.elements.contains(&name) || bindings.contexts.contains(&name) => None,
        Stmt::Expr { expr, span } => rewrite_expr_stmt(expr, bindings).map(|expr| Stmt::Expr { expr, span }),
        Stmt::If {
            test,
            consequent,
            span,
        } => Some(Stmt::If {
            test,
            consequent: Box::new(rewrite_stmt(*consequent, bindings)?),
            span,
        }),
        Stmt::While { test, body, span } => Some(Stmt::While {
            test,
            body: Box::new(rewrite_stmt(*body, bindings)?),
            span,
        }),
        Stmt::For {
            init,
            test,
            update,
            body,
            span,
        } => Some(Stmt::For {
            init: init.and_then(|s| rewrite_stmt(*s, bindings)).map(Box::new),
            test,
            update,
            body: Box::new(rewrite_stmt(*body, bindings)?),
            span,
        }),
        Stmt::Block { body, span } => Some(Stmt::Block {
            body: rewrite_stmts(body, bindings),
            span,
        }),
        Stmt::FunctionDecl {
            name,
            params,
            body,
            is_async,
            span,
        } => Some(Stmt::FunctionDecl {
            name,
            params,
            body: rewrite_stmts(body, bindings),
            is_async,
            span,
        }),
        other => Some(other),
    }
}

fn rewrite_expr_stmt(expr: Expr, bindings: &Bindings) -> Option<Expr> {
    match expr {
        Expr::Assign { target, value, span } => match *target {
            AssignTarget::Member {
                object: Expr::Identifier { name: obj, .. },
                property: MemberKey::Name(prop),
            } if bindings.contexts.contains(&obj) => rewrite_context_assignment(&prop, *value, span),
            target => Some(Expr::Assign {
                target: Box::new(target),
                value,
                span,
            }),
        },
        Expr::Call {
            callee,
            arguments,
            span,
        } => match *callee {
            Callee::Member {
                object: Expr::Identifier { name: obj, .. },
                property,
            } if bindings.contexts.contains(&obj) => rewrite_context_call(&property, arguments, span),
            callee => Some(Expr::Call {
                callee: Box::new(callee),
                arguments,
                span,
            }),
        },
        other => Some(other),
    }
}

fn rewrite_context_assignment(prop: &str, value: Expr, span: crate::ast::Span) -> Option<Expr> {
    let target_name = match prop {
        "fillStyle" => "scratch_pen_color",
        "strokeStyle" => "scratch_stroke_color",
        "lineWidth" => "scratch_line_width",
        "font" => return rewrite_font_assignment(value, span),
        "textAlign" | "textBaseline" => return None,
        _ => return None,
    };
    Some(Expr::Assign {
        target: Box::new(AssignTarget::Identifier(target_name.to_string())),
        value: Box::new(value),
        span,
    })
}

/// `ctx.font = "<n>px ..."` becomes `scratch_text_size = <n>` with `<n>`
/// materialized as a numeric literal, per §4.3's table. Anything that isn't
/// a string literal matching `"<digits>px..."` is dropped (best-effort).
fn rewrite_font_assignment(value: Expr, span: crate::ast::Span) -> Option<Expr> {
    let Expr::StringLiteral { value: text, span: lit_span } = &value else {
        return None;
    };
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || !text[digits.len()..].starts_with("px") {
        return None;
    }
    let size: f64 = digits.parse().ok()?;
    Some(Expr::Assign {
        target: Box::new(AssignTarget::Identifier("scratch_text_size".to_string())),
        value: Box::new(Expr::NumberLiteral {
            value: size,
            span: *lit_span,
        }),
        span,
    })
}

fn rewrite_context_call(property: &str, arguments: Vec<Expr>, span: crate::ast::Span) -> Option<Expr> {
    match property {
        "fillText" | "strokeText" => Some(Expr::Call {
            callee: Box::new(Callee::Identifier("scratch_say".to_string())),
            arguments,
            span,
        }),
        p if PATH_OR_DRAW_CALLS.contains(&p) => None,
        _ => None,
    }
}
