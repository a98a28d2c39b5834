//! Tests for block lowering (§4.5): operator lowering with negation
//! wrapping, `for`-loop normalization, and statement edge wiring, observed
//! through the assembled project envelope.

use pretty_assertions::assert_eq;
use scratchc::compile_source;
use serde_json::Value;

fn blocks_map(source: &str) -> serde_json::Map<String, Value> {
    let envelope = compile_source(source).unwrap();
    serde_json::to_value(&envelope.targets[1]).unwrap()["blocks"].as_object().unwrap().clone()
}

/// Recursively replaces every block-reference id inside `inputs` with the
/// referenced block's own shape (opcode + recursively-resolved inputs),
/// erasing the specific fresh ids so two structurally identical subgraphs
/// compare equal even when their ids differ.
fn shape(blocks: &serde_json::Map<String, Value>, id: &str) -> Value {
    let block = &blocks[id];
    let mut inputs = serde_json::Map::new();
    for (name, input) in block["inputs"].as_object().into_iter().flatten() {
        inputs.insert(name.clone(), resolve_input(blocks, input));
    }
    serde_json::json!({
        "opcode": block["opcode"],
        "inputs": inputs,
        "fields": block["fields"],
    })
}

fn resolve_input(blocks: &serde_json::Map<String, Value>, input: &Value) -> Value {
    let tag = input[0].as_u64().unwrap();
    match tag {
        1 => input.clone(),
        2 => match input[1].as_str() {
            Some(id) if blocks.contains_key(id) => shape(blocks, id),
            _ => input.clone(),
        },
        3 => match input[1][0].as_u64() {
            Some(12) => input.clone(), // variable reporter, not a block id
            _ => match input[1].as_str() {
                Some(id) if blocks.contains_key(id) => shape(blocks, id),
                _ => input.clone(),
            },
        },
        _ => input.clone(),
    }
}

fn condition_shape(blocks: &serde_json::Map<String, Value>) -> Value {
    let (_, block) = blocks.iter().find(|(_, b)| b["opcode"] == "control_if" || b["opcode"] == "control_repeat_until").unwrap();
    let condition = &block["inputs"]["CONDITION"];
    resolve_input(blocks, condition)
}

// =============================================================================
// 1. operator lowering table
// =============================================================================

#[test]
fn less_equal_lowers_to_negated_operator_gt() {
    let blocks = blocks_map("let a = 0; if (a <= 5) { }");
    let shape = condition_shape(&blocks);
    assert_eq!(shape["opcode"], "operator_not");
    let inner = &shape["inputs"]["OPERAND"];
    assert_eq!(inner["opcode"], "operator_gt");
}

#[test]
fn greater_equal_lowers_to_negated_operator_lt() {
    let blocks = blocks_map("let a = 0; if (a >= 5) { }");
    let shape = condition_shape(&blocks);
    assert_eq!(shape["opcode"], "operator_not");
    assert_eq!(shape["inputs"]["OPERAND"]["opcode"], "operator_lt");
}

#[test]
fn not_equal_lowers_to_negated_operator_equals() {
    let blocks = blocks_map("let a = 0; if (a != 5) { }");
    let shape = condition_shape(&blocks);
    assert_eq!(shape["opcode"], "operator_not");
    assert_eq!(shape["inputs"]["OPERAND"]["opcode"], "operator_equals");
}

#[test]
fn strict_less_and_equals_are_not_wrapped() {
    let blocks = blocks_map("let a = 0; if (a < 5) { }");
    assert_eq!(condition_shape(&blocks)["opcode"], "operator_lt");

    let blocks = blocks_map("let a = 0; if (a == 5) { }");
    assert_eq!(condition_shape(&blocks)["opcode"], "operator_equals");
}

// =============================================================================
// 2. negation equivalence (§8 "Laws")
// =============================================================================

/// `encode(¬(a < b)) == encode(a >= b)`, modulo fresh ids — both must lower
/// through the exact same comparison table entry.
#[test]
fn negating_less_than_matches_direct_greater_equal() {
    let negated = blocks_map("let a = 0; while (a < 5) { a = a + 1; }");
    let direct = blocks_map("let a = 0; if (a >= 5) { }");
    assert_eq!(condition_shape(&negated), condition_shape(&direct));
}

#[test]
fn negating_less_equal_matches_direct_greater_than() {
    let negated = blocks_map("let a = 0; for (; a <= 5; ) { a = a + 1; }");
    let direct = blocks_map("let a = 0; if (a > 5) { }");
    assert_eq!(condition_shape(&negated), condition_shape(&direct));
}

#[test]
fn negating_equals_matches_direct_not_equal() {
    let negated = blocks_map("let a = 0; for (; a == 5; ) { }");
    let direct = blocks_map("let a = 0; if (a != 5) { }");
    assert_eq!(condition_shape(&negated), condition_shape(&direct));
}

// =============================================================================
// 3. for-loop normalization
// =============================================================================

#[test]
fn simple_counting_for_becomes_control_repeat() {
    let blocks = blocks_map("for (let i = 0; i < 5; i = i + 1) { }");
    assert!(blocks.values().any(|b| b["opcode"] == "control_repeat"));
    assert!(!blocks.values().any(|b| b["opcode"] == "control_repeat_until"));
}

#[test]
fn simple_for_with_le_adds_one_to_the_count() {
    let blocks = blocks_map("for (let i = 0; i <= 5; i = i + 1) { }");
    let (_, repeat) = blocks.iter().find(|(_, b)| b["opcode"] == "control_repeat").unwrap();
    // TIMES = encode(end - start + 1) = operator_add(operator_subtract(5, 0), 1)
    let times = resolve_input(&blocks, &repeat["inputs"]["TIMES"]);
    assert_eq!(times["opcode"], "operator_add");
    assert_eq!(times["inputs"]["NUM1"]["opcode"], "operator_subtract");
}

#[test]
fn general_for_becomes_control_repeat_until() {
    let blocks = blocks_map("for (let i = 0; i < 10; i = i + 2) { }");
    assert!(blocks.values().any(|b| b["opcode"] == "control_repeat_until"));
    assert!(!blocks.values().any(|b| b["opcode"] == "control_repeat"));
}

#[test]
fn for_with_missing_clauses_still_lowers() {
    let blocks = blocks_map("let i = 0; for (;;) { i = i + 1; }");
    assert!(blocks.values().any(|b| b["opcode"] == "control_repeat_until"));
}

// =============================================================================
// 4. inlining idempotence (§8 "Laws")
// =============================================================================

#[test]
fn inlined_call_matches_direct_expression() {
    let inlined = blocks_map("const add = (a, b) => a + b; let total = add(3, 4);");
    let direct = blocks_map("let total = 3 + 4;");
    let value_shape = |blocks: &serde_json::Map<String, Value>| {
        let (_, block) = blocks.iter().find(|(_, b)| b["opcode"] == "data_setvariableto").unwrap();
        resolve_input(blocks, &block["inputs"]["VALUE"])
    };
    assert_eq!(value_shape(&inlined), value_shape(&direct));
}

#[test]
fn missing_argument_defaults_to_zero_shadow() {
    let blocks = blocks_map("const add = (a, b) => a + b; let total = add(3);");
    let (_, block) = blocks.iter().find(|(_, b)| b["opcode"] == "data_setvariableto").unwrap();
    let value = resolve_input(&blocks, &block["inputs"]["VALUE"]);
    assert_eq!(value["opcode"], "operator_add");
}

#[test]
fn function_with_no_return_inlines_as_zero() {
    let blocks = blocks_map("function f(a) { let unused = a; } let total = f(9);");
    let (_, block) = blocks.iter().find(|(_, b)| b["opcode"] == "data_setvariableto" && b["fields"]["VARIABLE"][0] == "total").unwrap();
    assert_eq!(block["inputs"]["VALUE"], serde_json::json!([1, [4, "0"]]));
}
