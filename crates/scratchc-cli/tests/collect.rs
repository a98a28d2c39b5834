//! Tests for source collection (§4.8): concatenating loose `.js`/`.html`
//! inputs versus reading a single bundle archive, and the rule that the two
//! input shapes never mix.

use std::io::Write;
use std::path::PathBuf;

use scratchc_cli::collect::{collect_sources, CollectError};
use zip::write::SimpleFileOptions;

fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loose_js_files_are_concatenated_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.js", "let a = 1;");
    let b = write_file(dir.path(), "b.js", "let b = 2;");

    let source = collect_sources(&[a, b]).unwrap();
    assert!(source.find("let a = 1;").unwrap() < source.find("let b = 2;").unwrap());
}

#[test]
fn html_input_has_only_inline_scripts_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let html = write_file(
        dir.path(),
        "page.html",
        r#"<html><script src="ext.js"></script><script>let x = 1;</script></html>"#,
    );

    let source = collect_sources(&[html]).unwrap();
    assert!(source.contains("let x = 1;"));
    assert!(!source.contains("ext.js"));
}

#[test]
fn bundle_archive_is_read_by_its_root_level_entries() {
    let dir = tempfile::tempdir().unwrap();
    let zip_path = dir.path().join("bundle.zip");
    let file = std::fs::File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    writer.start_file("main.js", options).unwrap();
    writer.write_all(b"let x = 1;").unwrap();
    writer.start_file("nested/other.js", options).unwrap();
    writer.write_all(b"let y = 2;").unwrap();
    writer.start_file("readme.txt", options).unwrap();
    writer.write_all(b"not javascript").unwrap();
    writer.finish().unwrap();

    let source = collect_sources(&[zip_path]).unwrap();
    assert!(source.contains("let x = 1;"));
    assert!(!source.contains("let y = 2;"));
    assert!(!source.contains("not javascript"));
}

#[test]
fn bundle_and_loose_files_together_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let js = write_file(dir.path(), "a.js", "let a = 1;");
    let zip_path = dir.path().join("bundle.zip");
    std::fs::File::create(&zip_path).unwrap();

    let err = collect_sources(&[js, zip_path]).unwrap_err();
    assert!(matches!(err, CollectError::MixedInputs));
}

#[test]
fn no_inputs_is_rejected() {
    let err = collect_sources(&[]).unwrap_err();
    assert!(matches!(err, CollectError::NoInputs));
}

#[test]
fn non_utf8_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.js");
    std::fs::write(&path, [0xff, 0xfe, 0x00, 0xff]).unwrap();

    let err = collect_sources(&[path]).unwrap_err();
    assert!(matches!(err, CollectError::Utf8 { .. }));
}
