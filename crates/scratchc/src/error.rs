//! Error taxonomy for the core translation pipeline.
//!
//! Grounded on the teacher's hand-rolled `ReplError`/`ParseError` style: a
//! plain enum with manual `Display` and `std::error::Error` impls rather than
//! `thiserror`. The teacher crate never pulls in `thiserror`, and the surface
//! here is small enough that hand-written impls stay just as readable.

use std::fmt;

use crate::ast::Span;

/// Errors that can occur while compiling one program. Per the distilled
/// spec's §7, there is no partial output and no recovery on any of these —
/// the caller gets the first violation and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// The source text is not valid JavaScript syntax.
    Parse { message: String, position: Span },
    /// A banned construct was observed by the feature gate. `name` is the
    /// matched dotted prefix (or `async`/`await`).
    UnsupportedFeature { name: String, position: Span },
    /// An invariant the lowerer is supposed to guarantee by construction was
    /// violated. Never expected to surface; if it does, it indicates a bug
    /// in `scratchc`, not in the input program.
    Internal { message: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { message, position } => {
                write!(f, "parse error at {}:{}: {message}", position.line, position.column)
            }
            Self::UnsupportedFeature { name, position } => {
                write!(
                    f,
                    "unsupported feature `{name}` at {}:{}",
                    position.line, position.column
                )
            }
            Self::Internal { message } => write!(f, "internal compiler error: {message}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub(crate) fn parse(message: impl Into<String>, position: Span) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn unsupported_feature(name: impl Into<String>, position: Span) -> Self {
        Self::UnsupportedFeature {
            name: name.into(),
            position,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
