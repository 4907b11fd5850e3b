use std::fs;
use std::path::Path;

use bintag::{canonicalize_or_current, infer_tag_name, resolve_layout, sha256_file};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_absolute_path() {
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");

    let subdir_str = subdir.to_str().expect("utf8 path");
    let result = canonicalize_or_current(subdir_str).expect("canonicalize");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));
}

#[test]
fn canonicalize_or_current_joins_missing_relative_path() {
    let result = canonicalize_or_current("definitely-missing-dir").expect("canonicalize");
    let cwd = std::env::current_dir().expect("cwd");
    assert_eq!(result, cwd.join("definitely-missing-dir"));
}

#[test]
fn infer_tag_name_uses_last_path_component() {
    assert_eq!(infer_tag_name(Path::new("/opt/bins/libcrypto.so.1.1")), "libcrypto.so.1.1");
    assert_eq!(infer_tag_name(Path::new("/")), "unnamed-tag");
}

#[test]
fn resolve_layout_prefers_explicit_store() {
    let tmp = tempdir().expect("tempdir");
    let layout = resolve_layout(tmp.path().to_str()).expect("layout");
    assert_eq!(layout.base_dir, tmp.path().canonicalize().expect("canon"));
    assert_eq!(layout.tags_dir, layout.base_dir.join("tags"));
}

#[test]
fn sha256_file_hashes_contents() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("abc.bin");
    fs::write(&path, b"abc").expect("write");
    assert_eq!(
        sha256_file(&path).expect("hash"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert!(sha256_file(&tmp.path().join("missing")).is_err());
}
