//! Error taxonomy for the CLI binary. Follows the same hand-rolled style as
//! `scratchc::CompileError`: a plain enum, manual `Display` and
//! `std::error::Error`, `From` impls for each phase's own error type rather
//! than a derive macro.

use std::fmt;
use std::path::PathBuf;

use scratchc::CompileError;

use crate::collect::CollectError;
use crate::package::PackageError;

/// Everything that can go wrong between parsing argv and a finished `.sb3`
/// on disk. Exit code mapping lives in `main`, not here.
#[derive(Debug)]
pub enum CliError {
    Compile(CompileError),
    Collect(CollectError),
    Package(PackageError),
    Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile(err) => write!(f, "{err}"),
            Self::Collect(err) => write!(f, "{err}"),
            Self::Package(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "i/o error on {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compile(err) => Some(err),
            Self::Collect(err) => Some(err),
            Self::Package(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<CompileError> for CliError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<CollectError> for CliError {
    fn from(err: CollectError) -> Self {
        Self::Collect(err)
    }
}

impl From<PackageError> for CliError {
    fn from(err: PackageError) -> Self {
        Self::Package(err)
    }
}
