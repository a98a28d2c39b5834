//! Non-functional configuration (§4.11): the one `scratchc.toml` knob set
//! that changes where the packager looks for bundled assets and how
//! verbosely it logs — never the compiler's own behavior, which stays a
//! closed, versioned vocabulary per §6.
//!
//! Grounded on the teacher pack's `core-config` crate: a `Deserialize`
//! struct with `#[serde(default)]` fields, loaded from a local file via
//! `toml`, unknown fields tolerated for forward compatibility.

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "scratchc.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScratchcConfig {
    /// Directory the packager copies costume assets from, relative to the
    /// current working directory unless absolute.
    pub assets_dir: PathBuf,
    /// Overrides `SCRATCHC_LOG` when set; the environment variable still
    /// wins if present, matching the teacher's discovery-then-override
    /// convention for configuration precedence.
    pub log_level: Option<String>,
}

impl Default for ScratchcConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            log_level: None,
        }
    }
}

/// Loads `scratchc.toml` from the current directory if present, otherwise
/// returns the default configuration. A present-but-unparsable file is a
/// hard error; a missing file is not.
pub fn load() -> Result<ScratchcConfig, ConfigError> {
    load_from(Path::new(CONFIG_FILE_NAME))
}

fn load_from(path: &Path) -> Result<ScratchcConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ScratchcConfig::default()),
        Err(err) => return Err(ConfigError::Io(path.to_path_buf(), err)),
    };
    toml::from_str(&content).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, err) => write!(f, "could not read {}: {err}", path.display()),
            Self::Parse(path, err) => write!(f, "could not parse {}: {err}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}
