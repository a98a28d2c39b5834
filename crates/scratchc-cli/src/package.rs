//! Packager (§4.7, named as an external collaborator in the distilled
//! spec's §6): serializes the project envelope to `project.json`, copies
//! the opaque costume assets verbatim, and zips both into a `.sb3` archive.
//!
//! A `tempfile::TempDir` stages the archive's contents for one invocation
//! and is removed on drop, including on the error paths below — matching
//! §5's "bound to a single request ... deleted before the request returns,
//! including on failure; deletion failures are logged and swallowed".

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use scratchc::ProjectEnvelope;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const PROJECT_JSON: &str = "project.json";
const SB3_EXTENSION: &str = "sb3";

#[derive(Debug)]
pub enum PackageError {
    Io { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
    Zip(zip::result::ZipError),
    MissingAsset { name: String, assets_dir: PathBuf },
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error writing {}: {source}", path.display()),
            Self::Json(err) => write!(f, "could not serialize project envelope: {err}"),
            Self::Zip(err) => write!(f, "could not write sb3 archive: {err}"),
            Self::MissingAsset { name, assets_dir } => {
                write!(f, "asset {name} not found in {}", assets_dir.display())
            }
        }
    }
}

impl std::error::Error for PackageError {}

impl From<serde_json::Error> for PackageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<zip::result::ZipError> for PackageError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Zip(err)
    }
}

/// Ensures `path` ends in `.sb3`, appending the suffix if the caller omitted
/// it (§6 "ensures the output suffix").
pub fn ensure_sb3_suffix(path: PathBuf) -> PathBuf {
    if path.extension().and_then(OsStr::to_str) == Some(SB3_EXTENSION) {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(".");
    name.push(SB3_EXTENSION);
    PathBuf::from(name)
}

/// Writes `envelope` and its referenced assets to `output` as a `.sb3` zip
/// archive. On any failure, a partially written `output` is unlinked before
/// the error propagates, per §7.
pub fn write_sb3(envelope: &ProjectEnvelope, assets_dir: &Path, output: &Path) -> Result<(), PackageError> {
    match write_sb3_inner(envelope, assets_dir, output) {
        Ok(()) => Ok(()),
        Err(err) => {
            if output.exists() {
                if let Err(unlink_err) = fs::remove_file(output) {
                    tracing::warn!(path = %output.display(), error = %unlink_err, "failed to unlink partial output");
                }
            }
            Err(err)
        }
    }
}

fn write_sb3_inner(envelope: &ProjectEnvelope, assets_dir: &Path, output: &Path) -> Result<(), PackageError> {
    let staging = tempfile::tempdir().map_err(|source| PackageError::Io {
        path: std::env::temp_dir(),
        source,
    })?;

    let project_json_path = staging.path().join(PROJECT_JSON);
    let json = serde_json::to_string(envelope)?;
    fs::write(&project_json_path, &json).map_err(|source| PackageError::Io {
        path: project_json_path.clone(),
        source,
    })?;

    for asset_name in envelope.asset_filenames() {
        let source_path = assets_dir.join(asset_name);
        if !source_path.is_file() {
            return Err(PackageError::MissingAsset {
                name: asset_name.to_string(),
                assets_dir: assets_dir.to_path_buf(),
            });
        }
        let bytes = fs::read(&source_path).map_err(|source| PackageError::Io {
            path: source_path.clone(),
            source,
        })?;
        tracing::debug!(asset = asset_name, sha256 = %content_digest(&bytes), "staged asset");
        let dest_path = staging.path().join(asset_name);
        fs::write(&dest_path, &bytes).map_err(|source| PackageError::Io {
            path: dest_path,
            source,
        })?;
    }

    zip_directory(staging.path(), output)?;

    if let Err(err) = staging.close() {
        tracing::warn!(error = %err, "failed to remove temporary staging directory");
    }
    Ok(())
}

fn zip_directory(staging: &Path, output: &Path) -> Result<(), PackageError> {
    let file = fs::File::create(output).map_err(|source| PackageError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries: Vec<PathBuf> = fs::read_dir(staging)
        .map_err(|source| PackageError::Io {
            path: staging.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for entry in entries {
        let Some(name) = entry.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        writer.start_file(name, options)?;
        let bytes = fs::read(&entry).map_err(|source| PackageError::Io {
            path: entry.clone(),
            source,
        })?;
        writer.write_all(&bytes).map_err(|source| PackageError::Io {
            path: entry.clone(),
            source,
        })?;
    }
    writer.finish()?;
    Ok(())
}

/// Debug-only provenance for staged assets; the asset id itself stays the
/// fixed hash baked into the envelope (§6), this is purely diagnostic.
fn content_digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sb3_suffix_is_added_when_missing() {
        assert_eq!(ensure_sb3_suffix(PathBuf::from("out")), PathBuf::from("out.sb3"));
        assert_eq!(ensure_sb3_suffix(PathBuf::from("out.sb3")), PathBuf::from("out.sb3"));
    }

    #[test]
    fn missing_asset_directory_fails_without_partial_output() {
        let envelope = scratchc::compile_source("let x = 1;").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("project.sb3");
        let assets_dir = dir.path().join("nonexistent-assets");

        let err = write_sb3(&envelope, &assets_dir, &output).unwrap_err();
        assert!(matches!(err, PackageError::MissingAsset { .. }));
        assert!(!output.exists());
    }
}
