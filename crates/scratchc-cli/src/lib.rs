//! `scratchc-cli`'s ambient stack, split into a library so the packager and
//! source collector (§4.7/§4.8) can be exercised by `tests/` integration
//! tests without driving the `scratchc` binary as a subprocess — the same
//! reason the teacher keeps its own translation logic in a library crate
//! (`ouros`) behind a thin `ouros-cli` binary.

pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod logging;
pub mod package;
