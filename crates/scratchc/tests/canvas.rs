//! Tests for the canvas preprocessor (§4.3): canvas-2D binding and call
//! rewriting runs before the feature gate, so `document.getElementById` and
//! `getContext` bindings never trip it, and drawing calls become `scratch_*`
//! calls or private variable assignments.

use scratchc::compile_source;

const CANVAS_SETUP: &str = r#"
    var canvas = document.getElementById('stage');
    var ctx = canvas.getContext('2d');
"#;

fn sprite_blocks(source: &str) -> serde_json::Value {
    let envelope = compile_source(source).unwrap();
    serde_json::to_value(&envelope.targets[1]).unwrap()["blocks"].clone()
}

#[test]
fn canvas_bindings_are_stripped_and_never_trip_the_gate() {
    let source = format!("{CANVAS_SETUP} ctx.fillText('Hi', 10, 20);");
    // Without the canvas rewrite this would fail on `document.getElementById`.
    assert!(compile_source(&source).is_ok());
}

#[test]
fn fill_text_becomes_looks_say() {
    let source = format!("{CANVAS_SETUP} ctx.fillText('Hi', 10, 20);");
    let blocks = sprite_blocks(&source);
    let says = blocks.as_object().unwrap().values().any(|b| b["opcode"] == "looks_say");
    assert!(says);
}

#[test]
fn stroke_text_also_becomes_looks_say() {
    let source = format!("{CANVAS_SETUP} ctx.strokeText('Bye', 0, 0);");
    let blocks = sprite_blocks(&source);
    let says = blocks.as_object().unwrap().values().any(|b| b["opcode"] == "looks_say");
    assert!(says);
}

#[test]
fn font_assignment_becomes_a_private_variable_assignment() {
    let source = format!("{CANVAS_SETUP} ctx.font = '30px Arial';");
    let blocks = sprite_blocks(&source);
    let assigns_text_size = blocks
        .as_object()
        .unwrap()
        .values()
        .any(|b| b["opcode"] == "data_setvariableto" && b["fields"]["VARIABLE"][0] == "scratch_text_size");
    assert!(assigns_text_size);
}

#[test]
fn path_and_draw_calls_are_dropped_without_error() {
    let source = format!("{CANVAS_SETUP} ctx.beginPath(); ctx.moveTo(0, 0); ctx.lineTo(10, 10); ctx.stroke();");
    let envelope = compile_source(&source).unwrap();
    let blocks = serde_json::to_value(&envelope.targets[1]).unwrap()["blocks"].clone();
    // Only the event root and stop-all block remain.
    assert_eq!(blocks.as_object().unwrap().len(), 2);
}

#[test]
fn program_with_no_canvas_bindings_is_unaffected() {
    assert!(compile_source("let x = 1;").is_ok());
}
