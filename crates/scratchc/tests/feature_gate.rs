//! Tests for the feature gate (§4.2): the closed allow-list of banned dotted
//! prefixes plus `async`/`await`, and the guarantee that everything else
//! compiles.

use scratchc::{compile_source, CompileError};

fn unsupported_name(source: &str) -> String {
    match compile_source(source).unwrap_err() {
        CompileError::UnsupportedFeature { name, .. } => name,
        other => panic!("expected UnsupportedFeature, got {other:?}"),
    }
}

#[test]
fn console_log_is_rejected() {
    assert_eq!(unsupported_name("console.log('hi');"), "console.log");
}

#[test]
fn fetch_is_rejected() {
    assert_eq!(unsupported_name("fetch('/api');"), "fetch");
}

#[test]
fn banned_prefix_matches_nested_members() {
    // `window.location.href` is rejected because it starts with the banned
    // prefix `window.location`, not because it matches exactly.
    assert_eq!(unsupported_name("let h = window.location.href;"), "window.location");
}

#[test]
fn local_storage_is_rejected() {
    assert_eq!(unsupported_name("localStorage.setItem('k', 'v');"), "localStorage");
}

#[test]
fn set_timeout_is_rejected() {
    assert_eq!(unsupported_name("setTimeout(function() {}, 100);"), "setTimeout");
}

#[test]
fn async_function_declaration_is_rejected() {
    assert_eq!(unsupported_name("async function f() { }"), "async");
}

#[test]
fn await_expression_is_rejected() {
    assert_eq!(unsupported_name("async function f() { await g(); }"), "async");
}

#[test]
fn unrelated_identifier_with_a_banned_substring_is_allowed() {
    // `fetchData` is not `fetch`; the gate matches whole dotted segments.
    assert!(compile_source("let fetchData = 1;").is_ok());
}

#[test]
fn plain_arithmetic_and_control_flow_compiles() {
    assert!(compile_source("let x = 1; if (x < 10) { x = x + 1; }").is_ok());
}
