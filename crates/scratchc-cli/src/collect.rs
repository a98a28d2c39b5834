//! Source collection (§4.8, named as an external collaborator in the
//! distilled spec's §6): concatenates `.js` files, extracts JavaScript out
//! of `<script>…</script>` regions of `.html` files, or reads the
//! root-level entries of a single bundle archive — never a mix of the two
//! input shapes.

use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

#[derive(Debug)]
pub enum CollectError {
    Io { path: PathBuf, source: std::io::Error },
    Utf8 { path: PathBuf },
    Zip { path: PathBuf, source: zip::result::ZipError },
    /// A bundle archive was given alongside one or more loose file paths.
    MixedInputs,
    /// No input paths were given at all.
    NoInputs,
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "could not read {}: {source}", path.display()),
            Self::Utf8 { path } => write!(f, "{} is not valid UTF-8", path.display()),
            Self::Zip { path, source } => write!(f, "could not read bundle {}: {source}", path.display()),
            Self::MixedInputs => write!(f, "cannot mix a bundle archive with loose source files"),
            Self::NoInputs => write!(f, "no input files given"),
        }
    }
}

impl std::error::Error for CollectError {}

/// Concatenates every input into a single JavaScript source string, in the
/// order given. A single `.zip` bundle is read by its root-level entries
/// instead of loose files; the two input shapes never mix (§4.8).
pub fn collect_sources(inputs: &[PathBuf]) -> Result<String, CollectError> {
    match inputs {
        [] => Err(CollectError::NoInputs),
        [single] if is_bundle(single) => collect_bundle(single),
        paths if paths.iter().any(|p| is_bundle(p)) => Err(CollectError::MixedInputs),
        paths => collect_loose_files(paths),
    }
}

fn is_bundle(path: &Path) -> bool {
    path.extension().and_then(OsStr::to_str).is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

fn collect_loose_files(paths: &[PathBuf]) -> Result<String, CollectError> {
    let mut chunks = Vec::with_capacity(paths.len());
    for path in paths {
        let text = read_utf8(path)?;
        chunks.push(source_for(path, &text));
    }
    Ok(chunks.join("\n"))
}

fn collect_bundle(path: &Path) -> Result<String, CollectError> {
    let file = fs::File::open(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| CollectError::Zip {
        path: path.to_path_buf(),
        source,
    })?;

    let mut chunks = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| CollectError::Zip {
            path: path.to_path_buf(),
            source,
        })?;
        let entry_name = entry.name().to_string();
        let entry_path = Path::new(&entry_name);
        // Archive entries are considered only at the root level (§6): a
        // name containing a path separator lives inside a subdirectory.
        if entry_path.components().count() != 1 {
            continue;
        }
        if !matches!(extension_of(entry_path), Some("js") | Some("html") | Some("htm")) {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(|source| CollectError::Io {
            path: entry_path.to_path_buf(),
            source,
        })?;
        chunks.push(source_for(entry_path, &text));
    }
    Ok(chunks.join("\n"))
}

fn read_utf8(path: &Path) -> Result<String, CollectError> {
    let bytes = fs::read(path).map_err(|source| CollectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| CollectError::Utf8 { path: path.to_path_buf() })
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(OsStr::to_str)
}

/// Dispatches on extension: `.html`/`.htm` have their `<script>` regions
/// extracted, everything else (`.js`) is used verbatim.
fn source_for(path: &Path, text: &str) -> String {
    match extension_of(path) {
        Some(ext) if ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm") => extract_scripts(text),
        _ => text.to_string(),
    }
}

/// Extracts every `<script>…</script>` region that has no `src` attribute
/// (inline scripts only), concatenated in document order (§4.8, §6).
fn extract_scripts(html: &str) -> String {
    let mut scripts = Vec::new();
    let mut rest = html;
    while let Some(open_start) = rest.find("<script") {
        let Some(tag_end_rel) = rest[open_start..].find('>') else { break };
        let tag_end = open_start + tag_end_rel;
        let open_tag = &rest[open_start..tag_end];
        let body_start = tag_end + 1;
        let Some(close_rel) = rest[body_start..].find("</script>") else { break };
        let close_start = body_start + close_rel;

        if !open_tag.contains("src=") && !open_tag.contains("src =") {
            scripts.push(rest[body_start..close_start].to_string());
        }
        rest = &rest[close_start + "</script>".len()..];
    }
    scripts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_inline_scripts_only() {
        let html = r#"<html><head>
            <script src="external.js"></script>
            <script>let x = 1;</script>
            <body><script>let y = 2;</script></body>
            </head></html>"#;
        let extracted = extract_scripts(html);
        assert!(extracted.contains("let x = 1;"));
        assert!(extracted.contains("let y = 2;"));
        assert!(!extracted.contains("external.js"));
    }

    #[test]
    fn mixed_bundle_and_loose_file_is_rejected() {
        let err = collect_sources(&[PathBuf::from("a.js"), PathBuf::from("b.zip")]).unwrap_err();
        assert!(matches!(err, CollectError::MixedInputs));
    }

    #[test]
    fn no_inputs_is_rejected() {
        let err = collect_sources(&[]).unwrap_err();
        assert!(matches!(err, CollectError::NoInputs));
    }
}
