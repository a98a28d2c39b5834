//! Symbol analyzer (§4.4): the three-pass walk that classifies every name
//! into a plain variable, a list, a flattened object property, an inlinable
//! function, or a recursive procedure.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{Expr, FunctionBody, Program, Stmt};

/// A function or arrow/function-expression binding collected during pass A.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: FunctionBody,
}

/// The symbol tables collected for one compilation unit (§3 "Symbol
/// tables").
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub variables: IndexSet<String>,
    pub lists: IndexSet<String>,
    pub list_initial_values: IndexMap<String, Vec<String>>,
    /// `obj -> ordered set of property names`, source order preserved.
    pub object_mappings: IndexMap<String, Vec<String>>,
    /// Initial value for each flattened `obj_prop` variable, keyed by the
    /// flattened name itself.
    pub object_initial_values: IndexMap<String, f64>,
    pub function_definitions: IndexMap<String, FunctionDef>,
    pub recursive_functions: IndexSet<String>,
}

impl SymbolTable {
    /// The materialized initial value for a flattened object property
    /// `obj_prop`, used by both this table's own bookkeeping and by the
    /// project assembler. Zero unless the source literal had a numeric
    /// property value.
    pub fn flattened_name(obj: &str, prop: &str) -> String {
        format!("{obj}_{prop}")
    }

    pub fn is_function_or_param(&self, name: &str) -> bool {
        if self.function_definitions.contains_key(name) {
            return true;
        }
        self.function_definitions
            .values()
            .any(|def| def.params.iter().any(|p| p == name))
    }
}

/// Runs all three passes over `program` and returns the resulting table.
pub fn analyze(program: &Program) -> SymbolTable {
    let mut table = SymbolTable::default();
    // Pass A: declarations.
    for stmt in &program.body {
        pass_a_stmt(stmt, &mut table);
    }
    // Pass B: assignment references.
    for stmt in &program.body {
        pass_b_stmt(stmt, &mut table);
    }
    // Pass C: recursion detection, then cleanup.
    pass_c(&mut table);
    table
}

fn pass_a_stmt(stmt: &Stmt, table: &mut SymbolTable) {
    match stmt {
        Stmt::VarDecl { name, init, .. } => classify_declaration(name, init.as_ref(), table),
        Stmt::FunctionDecl {
            name, params, body, ..
        } => {
            table.function_definitions.insert(
                name.clone(),
                FunctionDef {
                    params: params.clone(),
                    body: FunctionBody::Block(body.clone()),
                },
            );
            for stmt in body {
                pass_a_stmt(stmt, table);
            }
        }
        Stmt::Expr { expr, .. } => pass_a_expr(expr, table),
        Stmt::If { test, consequent, .. } => {
            pass_a_expr(test, table);
            pass_a_stmt(consequent, table);
        }
        Stmt::While { test, body, .. } => {
            pass_a_expr(test, table);
            pass_a_stmt(body, table);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                pass_a_stmt(init, table);
            }
            if let Some(test) = test {
                pass_a_expr(test, table);
            }
            if let Some(update) = update {
                pass_a_expr(update, table);
            }
            pass_a_stmt(body, table);
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                pass_a_stmt(stmt, table);
            }
        }
        Stmt::Return { argument, .. } => {
            if let Some(argument) = argument {
                pass_a_expr(argument, table);
            }
        }
        Stmt::Other { .. } => {}
    }
}

/// Classifies a single declaration's initializer per §4.4 pass A.
fn classify_declaration(name: &str, init: Option<&Expr>, table: &mut SymbolTable) {
    match init {
        Some(Expr::FunctionExpr { params, body, .. }) => {
            table.function_definitions.insert(
                name.to_string(),
                FunctionDef {
                    params: params.clone(),
                    body: body.clone(),
                },
            );
        }
        Some(Expr::ArrayLiteral { elements, .. }) => {
            table.lists.insert(name.to_string());
            let values = elements.iter().map(literal_stringify).collect();
            table.list_initial_values.insert(name.to_string(), values);
        }
        Some(Expr::ObjectLiteral { properties, .. }) => {
            let mut ordered = Vec::new();
            for (prop, value) in properties {
                let flattened = SymbolTable::flattened_name(name, prop);
                table.variables.insert(flattened.clone());
                table.object_initial_values.insert(flattened, literal_numeric_value(value));
                ordered.push(prop.clone());
                pass_a_expr(value, table);
            }
            table.object_mappings.insert(name.to_string(), ordered);
        }
        Some(other) => {
            table.variables.insert(name.to_string());
            pass_a_expr(other, table);
        }
        None => {
            table.variables.insert(name.to_string());
        }
    }
}

fn literal_stringify(expr: &Expr) -> String {
    match expr {
        Expr::NumberLiteral { value, .. } => format_number(*value),
        Expr::StringLiteral { value, .. } => value.clone(),
        Expr::BoolLiteral { value, .. } => value.to_string(),
        _ => String::new(),
    }
}

fn literal_numeric_value(expr: &Expr) -> f64 {
    match expr {
        Expr::NumberLiteral { value, .. } => *value,
        _ => 0.0,
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn pass_a_expr(expr: &Expr, table: &mut SymbolTable) {
    match expr {
        Expr::ArrayLiteral { elements, .. } => {
            for e in elements {
                pass_a_expr(e, table);
            }
        }
        Expr::ObjectLiteral { properties, .. } => {
            for (_, value) in properties {
                pass_a_expr(value, table);
            }
        }
        Expr::Assign { target, value, .. } => {
            if let crate::ast::AssignTarget::Member { object, property } = target.as_ref() {
                pass_a_expr(object, table);
                if let crate::ast::MemberKey::Computed(key) = property {
                    pass_a_expr(key, table);
                }
            }
            pass_a_expr(value, table);
        }
        Expr::Binary { left, right, .. } => {
            pass_a_expr(left, table);
            pass_a_expr(right, table);
        }
        Expr::Unary { argument, .. } => pass_a_expr(argument, table),
        Expr::Call { callee, arguments, .. } => {
            if let crate::ast::Callee::Member { object, property } = callee.as_ref() {
                // `x.push/pop/shift/unshift/splice/slice(...)` registers `x`
                // as a list, per §4.4 pass A.
                if let Expr::Identifier { name, .. } = object {
                    if matches!(
                        property.as_str(),
                        "push" | "pop" | "shift" | "unshift" | "splice" | "slice"
                    ) {
                        table.lists.insert(name.clone());
                    }
                }
                pass_a_expr(object, table);
            }
            for arg in arguments {
                pass_a_expr(arg, table);
            }
        }
        Expr::Member { object, property, .. } => {
            pass_a_expr(object, table);
            if let crate::ast::MemberKey::Computed(key) = property {
                pass_a_expr(key, table);
            }
        }
        Expr::FunctionExpr { body, .. } => match body {
            FunctionBody::Expr(expr) => pass_a_expr(expr, table),
            FunctionBody::Block(stmts) => {
                for stmt in stmts {
                    pass_a_stmt(stmt, table);
                }
            }
        },
        Expr::NumberLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Identifier { .. }
        | Expr::Await { .. }
        | Expr::Other { .. } => {}
    }
}

fn pass_b_stmt(stmt: &Stmt, table: &mut SymbolTable) {
    match stmt {
        Stmt::VarDecl { init, .. } => {
            if let Some(init) = init {
                pass_b_expr(init, table);
            }
        }
        Stmt::Expr { expr, .. } => pass_b_expr(expr, table),
        Stmt::If { test, consequent, .. } => {
            pass_b_expr(test, table);
            pass_b_stmt(consequent, table);
        }
        Stmt::While { test, body, .. } => {
            pass_b_expr(test, table);
            pass_b_stmt(body, table);
        }
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            if let Some(init) = init {
                pass_b_stmt(init, table);
            }
            if let Some(test) = test {
                pass_b_expr(test, table);
            }
            if let Some(update) = update {
                pass_b_expr(update, table);
            }
            pass_b_stmt(body, table);
        }
        Stmt::Block { body, .. } => {
            for stmt in body {
                pass_b_stmt(stmt, table);
            }
        }
        Stmt::FunctionDecl { body, .. } => {
            for stmt in body {
                pass_b_stmt(stmt, table);
            }
        }
        Stmt::Return { argument, .. } => {
            if let Some(argument) = argument {
                pass_b_expr(argument, table);
            }
        }
        Stmt::Other { .. } => {}
    }
}

fn pass_b_expr(expr: &Expr, table: &mut SymbolTable) {
    match expr {
        Expr::Assign { target, value, .. } => {
            if let crate::ast::AssignTarget::Identifier(name) = target.as_ref() {
                table.variables.insert(name.clone());
            }
            pass_b_expr(value, table);
        }
        Expr::ArrayLiteral { elements, .. } => {
            for e in elements {
                pass_b_expr(e, table);
            }
        }
        Expr::ObjectLiteral { properties, .. } => {
            for (_, value) in properties {
                pass_b_expr(value, table);
            }
        }
        Expr::Binary { left, right, .. } => {
            pass_b_expr(left, table);
            pass_b_expr(right, table);
        }
        Expr::Unary { argument, .. } => pass_b_expr(argument, table),
        Expr::Call { arguments, .. } => {
            for arg in arguments {
                pass_b_expr(arg, table);
            }
        }
        Expr::Member { object, .. } => pass_b_expr(object, table),
        Expr::FunctionExpr { body, .. } => match body {
            FunctionBody::Expr(expr) => pass_b_expr(expr, table),
            FunctionBody::Block(stmts) => {
                for stmt in stmts {
                    pass_b_stmt(stmt, table);
                }
            }
        },
        Expr::NumberLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Identifier { .. }
        | Expr::Await { .. }
        | Expr::Other { .. } => {}
    }
}

fn pass_c(table: &mut SymbolTable) {
    let names: Vec<String> = table.function_definitions.keys().cloned().collect();
    for name in &names {
        let def = &table.function_definitions[name];
        if body_calls(&def.body, name) {
            table.recursive_functions.insert(name.clone());
        }
    }

    let function_names: IndexSet<String> = table.function_definitions.keys().cloned().collect();
    let param_names: IndexSet<String> = table
        .function_definitions
        .values()
        .flat_map(|def| def.params.iter().cloned())
        .collect();
    table.variables.retain(|name| !function_names.contains(name) && !param_names.contains(name));
}

fn body_calls(body: &FunctionBody, target: &str) -> bool {
    match body {
        FunctionBody::Expr(expr) => expr_calls(expr, target),
        FunctionBody::Block(stmts) => stmts.iter().any(|s| stmt_calls(s, target)),
    }
}

fn stmt_calls(stmt: &Stmt, target: &str) -> bool {
    match stmt {
        Stmt::VarDecl { init, .. } => init.as_ref().is_some_and(|e| expr_calls(e, target)),
        Stmt::Expr { expr, .. } => expr_calls(expr, target),
        Stmt::If { test, consequent, .. } => expr_calls(test, target) || stmt_calls(consequent, target),
        Stmt::While { test, body, .. } => expr_calls(test, target) || stmt_calls(body, target),
        Stmt::For {
            init,
            test,
            update,
            body,
            ..
        } => {
            init.as_ref().is_some_and(|s| stmt_calls(s, target))
                || test.as_ref().is_some_and(|e| expr_calls(e, target))
                || update.as_ref().is_some_and(|e| expr_calls(e, target))
                || stmt_calls(body, target)
        }
        Stmt::Block { body, .. } | Stmt::FunctionDecl { body, .. } => body.iter().any(|s| stmt_calls(s, target)),
        Stmt::Return { argument, .. } => argument.as_ref().is_some_and(|e| expr_calls(e, target)),
        Stmt::Other { .. } => false,
    }
}

fn expr_calls(expr: &Expr, target: &str) -> bool {
    match expr {
        Expr::Call { callee, arguments, .. } => {
            let is_target = matches!(callee.as_ref(), crate::ast::Callee::Identifier(name) if name == target);
            is_target || arguments.iter().any(|a| expr_calls(a, target))
        }
        Expr::ArrayLiteral { elements, .. } => elements.iter().any(|e| expr_calls(e, target)),
        Expr::ObjectLiteral { properties, .. } => properties.iter().any(|(_, v)| expr_calls(v, target)),
        Expr::Assign { value, .. } => expr_calls(value, target),
        Expr::Binary { left, right, .. } => expr_calls(left, target) || expr_calls(right, target),
        Expr::Unary { argument, .. } => expr_calls(argument, target),
        Expr::Member { object, .. } => expr_calls(object, target),
        Expr::FunctionExpr { body, .. } => body_calls(body, target),
        Expr::NumberLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Identifier { .. }
        | Expr::Await { .. }
        | Expr::Other { .. } => false,
    }
}
