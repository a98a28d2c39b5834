//! Top-level orchestration (§4): the fixed phase sequence from source text to
//! a finished project envelope. Every phase after the parser sees the
//! standardized [`crate::ast::Program`]; the feature gate runs once, after
//! the canvas rewrite, so canvas-2D calls never trip it (§4.3).

use tracing::instrument;

use crate::assemble::{self, ProjectEnvelope};
use crate::canvas;
use crate::error::CompileError;
use crate::feature_gate;
use crate::lower;
use crate::parser;
use crate::symbols;

/// Compiles one source string end to end. Per §7, any phase failure is
/// propagated to the caller as-is and produces no partial output — there is
/// no step at which a half-built envelope is returned.
#[instrument(skip_all, fields(source_len = source.len()))]
pub fn compile_source(source: &str) -> Result<ProjectEnvelope, CompileError> {
    let program = parser::parse(source)?;
    tracing::debug!(statements = program.body.len(), "parsed program");

    let program = canvas::preprocess(program);
    feature_gate::check(&program)?;

    let symbol_table = symbols::analyze(&program);
    tracing::debug!(
        variables = symbol_table.variables.len(),
        lists = symbol_table.lists.len(),
        functions = symbol_table.function_definitions.len(),
        "analyzed symbols"
    );

    let lowered = lower::lower(&program, &symbol_table);
    lowered.blocks.validate()?;
    tracing::debug!(blocks = lowered.blocks.len(), "lowered blocks");

    Ok(assemble::assemble(lowered, &symbol_table))
}
