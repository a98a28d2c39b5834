//! End-to-end scenarios: literal source in, observable block shape out.
//! Each test compiles one full program and inspects the assembled envelope
//! as JSON, the same black-box approach used by the other phase test files.

use pretty_assertions::assert_eq;
use scratchc::compile_source;
use serde_json::Value;

fn sprite(source: &str) -> Value {
    let envelope = compile_source(source).unwrap();
    serde_json::to_value(&envelope.targets[1]).unwrap()
}

#[test]
fn scenario_1_plain_assignment() {
    let sprite = sprite("let x = 10;");
    let blocks = sprite["blocks"].as_object().unwrap();

    let assign = blocks.values().find(|b| b["opcode"] == "data_setvariableto").unwrap();
    assert_eq!(assign["fields"]["VARIABLE"], serde_json::json!(["x", "x"]));
    assert_eq!(assign["inputs"]["VALUE"], serde_json::json!([1, [4, "10"]]));

    assert_eq!(sprite["variables"]["x"], serde_json::json!(["x", 0.0]));
    assert_eq!(sprite["visible"], true);
}

/// A negated `<` comparison lowers through the same table entry as a direct
/// `>=` comparison: `operator_not` wrapping `operator_lt`. See DESIGN.md's
/// "operator_gt/operator_lt asymmetry" note for why this, not a bare
/// `operator_gt`, is the block the lowerer actually produces.
#[test]
fn scenario_2_while_loop_becomes_repeat_until() {
    let sprite = sprite("let counter = 0; while (counter < 5) { counter = counter + 1; }");
    let blocks = sprite["blocks"].as_object().unwrap();

    let repeat_until = blocks.values().find(|b| b["opcode"] == "control_repeat_until").unwrap();
    let condition_id = repeat_until["inputs"]["CONDITION"][1].as_str().unwrap();
    let condition = &blocks[condition_id];
    assert_eq!(condition["opcode"], "operator_not");
    let operand_id = condition["inputs"]["OPERAND"][1].as_str().unwrap();
    let operand = &blocks[operand_id];
    assert_eq!(operand["opcode"], "operator_lt");
    assert_eq!(operand["inputs"]["OPERAND1"], serde_json::json!([2, [12, "counter", "counter"]]));
    // Comparison operands use a text shadow, not a number shadow (§4.5.3).
    assert_eq!(operand["inputs"]["OPERAND2"], serde_json::json!([1, [10, "5"]]));

    let substack_id = repeat_until["inputs"]["SUBSTACK"][1].as_str().unwrap();
    let first_body_block = &blocks[substack_id];
    assert_eq!(first_body_block["opcode"], "data_setvariableto");
    assert_eq!(first_body_block["fields"]["VARIABLE"], serde_json::json!(["counter", "counter"]));
    let value_id = first_body_block["inputs"]["VALUE"][1].as_str().unwrap();
    assert_eq!(blocks[value_id]["opcode"], "operator_add");
}

#[test]
fn scenario_3_non_recursive_call_is_inlined() {
    let sprite = sprite("const add = (a, b) => a + b; const total = add(40, 35);");
    assert!(sprite["variables"].get("add").is_none());

    let blocks = sprite["blocks"].as_object().unwrap();
    let assign = blocks
        .values()
        .find(|b| b["opcode"] == "data_setvariableto" && b["fields"]["VARIABLE"][0] == "total")
        .unwrap();
    let value_id = assign["inputs"]["VALUE"][1].as_str().unwrap();
    let value = &blocks[value_id];
    assert_eq!(value["opcode"], "operator_add");
    assert_eq!(value["inputs"]["NUM1"], serde_json::json!([1, [4, "40"]]));
    assert_eq!(value["inputs"]["NUM2"], serde_json::json!([1, [4, "35"]]));
}

#[test]
fn scenario_4_recursive_call_becomes_a_procedure() {
    let sprite = sprite("function fact(n){ if (n <= 1) return 1; return n * fact(n-1); } let r = fact(5);");
    let blocks = sprite["blocks"].as_object().unwrap();

    let definition = blocks.values().find(|b| b["opcode"] == "procedures_definition").unwrap();
    assert_eq!(definition["mutation"]["proccode"], "fact");
    let call = blocks.values().find(|b| b["opcode"] == "procedures_call").unwrap();
    assert_eq!(call["mutation"]["proccode"], "fact");

    assert!(sprite["variables"].as_object().unwrap().contains_key("fact_result"));
}

#[test]
fn scenario_5_list_push_and_index() {
    let sprite = sprite("let arr = [1,2,3]; arr.push(4); let y = arr[0];");
    assert_eq!(sprite["lists"]["arr"], serde_json::json!(["arr", ["1", "2", "3"]]));

    let blocks = sprite["blocks"].as_object().unwrap();
    let add_to_list = blocks.values().find(|b| b["opcode"] == "data_addtolist").unwrap();
    assert_eq!(add_to_list["inputs"]["ITEM"], serde_json::json!([1, [4, "4"]]));

    let assign_y = blocks
        .values()
        .find(|b| b["opcode"] == "data_setvariableto" && b["fields"]["VARIABLE"][0] == "y")
        .unwrap();
    let value_id = assign_y["inputs"]["VALUE"][1].as_str().unwrap();
    let item_of_list = &blocks[value_id];
    assert_eq!(item_of_list["opcode"], "data_itemoflist");
    assert_eq!(item_of_list["inputs"]["INDEX"], serde_json::json!([1, [4, "0"]]));
}

#[test]
fn scenario_6_canvas_text_becomes_say_and_hides_the_sprite() {
    let source = r#"
        var canvas = document.getElementById('stage');
        var ctx = canvas.getContext('2d');
        ctx.font = '30px Arial';
        ctx.fillText('Hi', 10, 20);
    "#;
    let sprite = sprite(source);
    let blocks = sprite["blocks"].as_object().unwrap();
    assert!(blocks.values().any(|b| b["opcode"] == "looks_say"));
    assert_eq!(sprite["visible"], false);
}
