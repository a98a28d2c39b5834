//! Tests for the parser adapter (§4.1): syntax errors surface as
//! `CompileError::Parse` with a source position, and each literal kind
//! reaches the lowerer as the expected shadow encoding.

use scratchc::{compile_source, CompileError};

fn blocks_json(source: &str) -> serde_json::Value {
    let envelope = compile_source(source).unwrap();
    serde_json::to_value(&envelope.targets[1]).unwrap()["blocks"].clone()
}

// =============================================================================
// 1. syntax errors
// =============================================================================

#[test]
fn unbalanced_braces_is_a_parse_error() {
    let err = compile_source("function f( { let x = 1;").unwrap_err();
    assert!(matches!(err, CompileError::Parse { .. }));
}

#[test]
fn parse_error_carries_a_position() {
    let err = compile_source("let x = ;").unwrap_err();
    let CompileError::Parse { position, .. } = err else {
        panic!("expected a parse error, got {err:?}");
    };
    assert!(position.line >= 1);
}

// =============================================================================
// 2. literal encoding
// =============================================================================

#[test]
fn numeric_literal_is_a_number_shadow() {
    let blocks = blocks_json("let x = 42;");
    let value = blocks.as_object().unwrap().values().find(|b| b["opcode"] == "data_setvariableto").unwrap();
    assert_eq!(value["inputs"]["VALUE"], serde_json::json!([1, [4, "42"]]));
}

#[test]
fn string_literal_is_a_text_shadow() {
    let blocks = blocks_json(r#"let s = "hi";"#);
    let value = blocks.as_object().unwrap().values().find(|b| b["opcode"] == "data_setvariableto").unwrap();
    assert_eq!(value["inputs"]["VALUE"], serde_json::json!([1, [10, "hi"]]));
}

#[test]
fn bool_literal_is_a_text_shadow() {
    let blocks = blocks_json("let done = true;");
    let value = blocks.as_object().unwrap().values().find(|b| b["opcode"] == "data_setvariableto").unwrap();
    assert_eq!(value["inputs"]["VALUE"], serde_json::json!([1, [10, "true"]]));
}

// =============================================================================
// 3. desugaring performed by the parser adapter
// =============================================================================

/// `i++` desugars to `i = i + 1` before lowering ever sees it, so a `for`
/// loop using it is still recognized by the simple-for pattern.
#[test]
fn increment_update_is_recognized_as_simple_for() {
    let blocks = blocks_json("for (let i = 0; i < 3; i++) { }");
    let opcodes: Vec<_> = blocks.as_object().unwrap().values().map(|b| b["opcode"].as_str().unwrap()).collect();
    assert!(opcodes.contains(&"control_repeat"));
    assert!(!opcodes.contains(&"control_repeat_until"));
}

/// `let a = 1, b = 2;` is split into two consecutive `VarDecl` statements
/// by the parser adapter, so both variables materialize independently.
#[test]
fn multi_declarator_var_decl_splits_into_separate_statements() {
    let blocks = blocks_json("let a = 1, b = 2;");
    let assigns: Vec<_> = blocks
        .as_object()
        .unwrap()
        .values()
        .filter(|b| b["opcode"] == "data_setvariableto")
        .collect();
    assert_eq!(assigns.len(), 2);
    assert!(assigns.iter().any(|b| b["fields"]["VARIABLE"][0] == "a" && b["inputs"]["VALUE"] == serde_json::json!([1, [4, "1"]])));
    assert!(assigns.iter().any(|b| b["fields"]["VARIABLE"][0] == "b" && b["inputs"]["VALUE"] == serde_json::json!([1, [4, "2"]])));
}

/// Compound assignment `total += 1` desugars to `total = total + 1`,
/// observable as a `data_setvariableto` whose value is an `operator_add`.
#[test]
fn compound_assignment_desugars_to_plain_assignment() {
    let blocks = blocks_json("let total = 0; total += 1;");
    let add_id = blocks
        .as_object()
        .unwrap()
        .iter()
        .find(|(_, b)| b["opcode"] == "operator_add")
        .map(|(id, _)| id.clone())
        .expect("operator_add block");
    let assigns_from_add = blocks
        .as_object()
        .unwrap()
        .values()
        .any(|b| b["opcode"] == "data_setvariableto" && b["inputs"]["VALUE"][1] == serde_json::json!(add_id));
    assert!(assigns_from_add);
}
