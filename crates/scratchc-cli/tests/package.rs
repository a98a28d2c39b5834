//! Tests for the packager (§4.7): staging a project envelope and its
//! costume assets into a `.sb3` zip archive, and the partial-output cleanup
//! rule on failure.

use std::io::Read;

use pretty_assertions::assert_eq;
use scratchc::compile_source;
use scratchc_cli::package::{ensure_sb3_suffix, write_sb3, PackageError};

fn stage_asset(assets_dir: &std::path::Path, hash: &str) {
    std::fs::write(assets_dir.join(format!("{hash}.svg")), b"<svg></svg>").unwrap();
}

#[test]
fn successful_package_contains_project_json_and_every_costume_asset() {
    let envelope = compile_source("let x = 1;").unwrap();
    let assets_dir = tempfile::tempdir().unwrap();
    for asset in envelope.asset_filenames() {
        let hash = asset.strip_suffix(".svg").unwrap();
        stage_asset(assets_dir.path(), hash);
    }

    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("project.sb3");
    write_sb3(&envelope, assets_dir.path(), &output).unwrap();

    let file = std::fs::File::open(&output).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
    names.sort();

    assert!(names.contains(&"project.json".to_string()));
    for asset in envelope.asset_filenames() {
        assert!(names.contains(&asset.to_string()));
    }

    let mut project_json = String::new();
    archive.by_name("project.json").unwrap().read_to_string(&mut project_json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&project_json).unwrap();
    assert_eq!(value["meta"]["agent"], "scratchc");
}

#[test]
fn missing_asset_fails_and_leaves_no_partial_output() {
    let envelope = compile_source("let x = 1;").unwrap();
    let assets_dir = tempfile::tempdir().unwrap(); // empty: no costume assets staged
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("project.sb3");

    let err = write_sb3(&envelope, assets_dir.path(), &output).unwrap_err();
    assert!(matches!(err, PackageError::MissingAsset { .. }));
    assert!(!output.exists());
}

#[test]
fn ensure_sb3_suffix_is_idempotent() {
    assert_eq!(ensure_sb3_suffix("game".into()), std::path::PathBuf::from("game.sb3"));
    assert_eq!(ensure_sb3_suffix("game.sb3".into()), std::path::PathBuf::from("game.sb3"));
}

