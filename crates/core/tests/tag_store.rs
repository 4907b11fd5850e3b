use std::fs;
use std::path::Path;

use bintag_core::model::{ArchFlags, FeatureSet, MnemonicCounts, MnemonicHistogram, Tag};
use bintag_core::store::{
    load_tags_from_dir, parse_tag, validate_tag_name, StoreError, TagStore, WriteOutcome,
};
use tempfile::tempdir;

const VALID_TAG: &str = r#"{
    "tag": "zlib",
    "description": "zlib 1.2.11\nstatic build",
    "histogram": {"inflate": {"mov": 5, "add": 2}},
    "arch": {"is_32bit": false, "is_64bit": true},
    "imports": ["malloc", "free"]
}"#;

const EMPTY_HISTOGRAM_TAG: &str = r#"{
    "tag": "empty",
    "description": "",
    "histogram": {},
    "arch": {"is_32bit": true, "is_64bit": false},
    "imports": []
}"#;

fn sample_tag(name: &str) -> Tag {
    let counts: MnemonicCounts =
        [("mov".to_string(), 5), ("add".to_string(), 2)].into_iter().collect();
    let histogram: MnemonicHistogram = [("f1", counts)].into_iter().collect();
    let features = FeatureSet {
        arch: ArchFlags::from_bitness(64),
        imports: vec!["CreateFileA".into()],
        histogram,
    };
    Tag::from_features(name, "sample tag", features)
}

fn always(answer: bool) -> impl FnMut(&Path) -> bool {
    move |_| answer
}

#[test]
fn loader_keeps_only_valid_non_empty_tags() {
    let temp = tempdir().expect("tempdir");
    let tags_dir = temp.path();
    fs::write(tags_dir.join("zlib"), VALID_TAG).expect("write valid");
    fs::write(tags_dir.join("empty"), EMPTY_HISTOGRAM_TAG).expect("write empty");
    fs::write(tags_dir.join("broken"), "{ not json").expect("write broken");
    fs::create_dir(tags_dir.join("nested")).expect("nested dir");
    fs::write(tags_dir.join("nested").join("inner"), VALID_TAG).expect("write nested");

    let tags = load_tags_from_dir(tags_dir);
    assert_eq!(tags.len(), 1);
    let tag = &tags[0];
    assert_eq!(tag.name, "zlib");
    assert_eq!(tag.description, "zlib 1.2.11\nstatic build");
    assert_eq!(tag.arch, ArchFlags::new(false, true));
    assert_eq!(tag.imports, vec!["malloc".to_string(), "free".to_string()]);
    assert_eq!(tag.histogram.get("inflate").and_then(|c| c.get("mov")), Some(&5));
}

#[test]
fn loader_rejects_documents_with_missing_or_mistyped_fields() {
    let temp = tempdir().expect("tempdir");
    let missing_arch = r#"{"tag":"a","description":"","histogram":{"f":{"mov":1}},"imports":[]}"#;
    let negative_count = concat!(
        r#"{"tag":"b","description":"","histogram":{"f":{"mov":-1}},"#,
        r#""arch":{"is_32bit":false,"is_64bit":true},"imports":[]}"#
    );
    fs::write(temp.path().join("a"), missing_arch).expect("write a");
    fs::write(temp.path().join("b"), negative_count).expect("write b");

    assert!(load_tags_from_dir(temp.path()).is_empty());
    assert!(matches!(parse_tag(missing_arch), Err(StoreError::Parse(_))));
}

#[test]
fn loader_tolerates_unknown_metadata_fields() {
    let body = VALID_TAG.replace("\"imports\"", "\"analyst\": \"someone\", \"imports\"");
    let tag = parse_tag(&body).expect("parse with extra field");
    assert_eq!(tag.name, "zlib");
    assert!(tag.captured_at.is_none());
}

#[test]
fn missing_directory_yields_no_tags() {
    let temp = tempdir().expect("tempdir");
    assert!(load_tags_from_dir(&temp.path().join("does-not-exist")).is_empty());
    assert!(TagStore::at(temp.path().join("nowhere")).load_tags().is_empty());
}

#[test]
fn loader_visits_files_in_name_order() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    for name in ["charlie", "alpha", "bravo"] {
        store.write_tag(&sample_tag(name), &mut always(true)).expect("write");
    }
    let names: Vec<String> = store.load_tags().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
    assert_eq!(store.list_tags().expect("list"), vec!["alpha", "bravo", "charlie"]);
}

#[test]
fn write_creates_directories_and_round_trips() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path().join("store"));
    let tag = sample_tag("libfoo").with_captured_at(Some("2024-01-01T00:00:00+00:00".into()));

    let outcome = store.write_tag(&tag, &mut always(false)).expect("write");
    assert_eq!(outcome, WriteOutcome::Written);
    assert!(store.layout().tags_dir.is_dir());
    assert_eq!(store.load_tag("libfoo").expect("load"), tag);
}

#[test]
fn overwrite_requires_confirmation() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    let original = sample_tag("libfoo");
    store.write_tag(&original, &mut always(true)).expect("first write");

    let mut replacement = sample_tag("libfoo");
    replacement.description = "updated".into();

    let mut asked = Vec::new();
    let mut decline = |path: &Path| {
        asked.push(path.to_path_buf());
        false
    };
    let outcome = store.write_tag(&replacement, &mut decline).expect("declined write");
    assert_eq!(outcome, WriteOutcome::Declined);
    assert_eq!(asked, vec![store.layout().tag_path("libfoo")]);
    assert_eq!(store.load_tag("libfoo").expect("load").description, "sample tag");

    let outcome = store.write_tag(&replacement, &mut always(true)).expect("confirmed write");
    assert_eq!(outcome, WriteOutcome::Overwritten);
    assert_eq!(store.load_tag("libfoo").expect("load").description, "updated");
}

#[test]
fn write_fails_when_base_is_a_file() {
    let temp = tempdir().expect("tempdir");
    let base = temp.path().join("occupied");
    fs::write(&base, b"not a directory").expect("write file");

    let store = TagStore::at(&base);
    let err = store.write_tag(&sample_tag("x"), &mut always(true)).expect_err("should fail");
    assert!(matches!(err, StoreError::Io { .. } | StoreError::NotADirectory(_)), "{err:?}");
}

#[test]
fn write_fails_when_name_is_taken_by_a_directory() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    fs::create_dir_all(store.layout().tag_path("dir")).expect("create dir");

    let err = store.write_tag(&sample_tag("dir"), &mut always(true)).expect_err("should fail");
    assert!(matches!(err, StoreError::NotARegularFile(_)), "{err:?}");
}

#[test]
fn tag_names_must_be_plain_file_names() {
    for bad in ["", " ", ".", "..", "a/b", "a\\b", "nul\0"] {
        assert!(
            matches!(validate_tag_name(bad), Err(StoreError::InvalidTagName(_))),
            "{bad:?} should be rejected"
        );
    }
    assert!(validate_tag_name("openssl-1.1.1k").is_ok());

    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    let err = store.write_tag(&sample_tag("../escape"), &mut always(true)).expect_err("reject");
    assert!(matches!(err, StoreError::InvalidTagName(_)));
    assert!(!temp.path().join("escape").exists());
}

#[test]
fn delete_removes_tag_and_reports_missing() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    store.write_tag(&sample_tag("gone"), &mut always(true)).expect("write");

    store.delete_tag("gone").expect("delete");
    assert!(store.list_tags().expect("list").is_empty());
    assert!(matches!(store.delete_tag("gone"), Err(StoreError::TagNotFound(_))));
    assert!(matches!(store.load_tag("gone"), Err(StoreError::TagNotFound(_))));
}

#[test]
fn written_document_uses_tag_field_names() {
    let temp = tempdir().expect("tempdir");
    let store = TagStore::at(temp.path());
    store.write_tag(&sample_tag("fields"), &mut always(true)).expect("write");

    let body = fs::read_to_string(store.layout().tag_path("fields")).expect("read");
    let value: serde_json::Value = serde_json::from_str(&body).expect("json");
    assert_eq!(value["tag"], "fields");
    assert_eq!(value["arch"]["is_64bit"], true);
    assert_eq!(value["histogram"]["f1"]["mov"], 5);
    assert!(value.get("sha256").is_none());
}
