//! Tests for the project assembler (§4.6): the two-target envelope shape,
//! fixed costume/meta fields, and the `visible` flag tying back to whether
//! any `looks_say` block was emitted.

use pretty_assertions::assert_eq;
use scratchc::compile_source;

#[test]
fn envelope_has_exactly_a_stage_and_one_sprite_in_order() {
    let envelope = compile_source("let x = 1;").unwrap();
    assert_eq!(envelope.targets.len(), 2);
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["targets"][0]["isStage"], true);
    assert_eq!(value["targets"][0]["name"], "Stage");
    assert_eq!(value["targets"][1]["isStage"], false);
    assert_eq!(value["targets"][1]["name"], "Sprite1");
}

#[test]
fn stage_carries_the_backdrop_costume_and_no_scripts() {
    let envelope = compile_source("let x = 1;").unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    let stage = &value["targets"][0];
    assert_eq!(stage["costumes"][0]["assetId"], "cd21514d0531fdffb22204e0ec5ed84a");
    assert_eq!(stage["costumes"][0]["md5ext"], "cd21514d0531fdffb22204e0ec5ed84a.svg");
    assert_eq!(stage["blocks"], serde_json::json!({}));
    assert_eq!(stage["tempo"], 60.0);
    assert_eq!(stage["videoTransparency"], 50.0);
}

#[test]
fn sprite_carries_the_costume_and_fixed_placement_defaults() {
    let envelope = compile_source("let x = 1;").unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    let sprite = &value["targets"][1];
    assert_eq!(sprite["costumes"][0]["assetId"], "bcf454acf82e4504149f7ffe07b4c785");
    assert_eq!(sprite["x"], 0.0);
    assert_eq!(sprite["y"], 0.0);
    assert_eq!(sprite["size"], 100.0);
    assert_eq!(sprite["direction"], 90.0);
    assert_eq!(sprite["draggable"], false);
    assert_eq!(sprite["rotationStyle"], "all around");
}

#[test]
fn sprite_is_visible_when_the_program_never_says_anything() {
    let envelope = compile_source("let x = 1;").unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["targets"][1]["visible"], true);
}

#[test]
fn sprite_is_hidden_when_the_program_emits_a_say() {
    let source = r#"
        var canvas = document.getElementById('stage');
        var ctx = canvas.getContext('2d');
        ctx.fillText('Hi', 10, 20);
    "#;
    let envelope = compile_source(source).unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["targets"][1]["visible"], false);
}

#[test]
fn meta_block_is_fixed() {
    let envelope = compile_source("let x = 1;").unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["meta"]["semver"], "3.0.0");
    assert_eq!(value["meta"]["vm"], "0.2.0");
    assert_eq!(value["meta"]["agent"], "scratchc");
}

#[test]
fn asset_filenames_lists_both_costumes_in_target_order() {
    let envelope = compile_source("let x = 1;").unwrap();
    assert_eq!(
        envelope.asset_filenames(),
        vec!["cd21514d0531fdffb22204e0ec5ed84a.svg", "bcf454acf82e4504149f7ffe07b4c785.svg"],
    );
}

#[test]
fn list_variables_carry_their_initial_values_as_strings() {
    let envelope = compile_source("let arr = [1, 2, 3];").unwrap();
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["targets"][1]["lists"]["arr"], serde_json::json!(["arr", ["1", "2", "3"]]));
}
