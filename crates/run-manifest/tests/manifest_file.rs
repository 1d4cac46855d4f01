use std::fs;

use run_manifest::{
    manifest_path, scan_run_directories, ManifestError, RunDirectory, RunKey, RunManifest,
    SENTINEL_FILE_NAME,
};

#[test]
fn missing_manifest_loads_empty() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let manifest = RunManifest::load(&manifest_path(dir.path())).expect("absent file is fine");
    assert!(manifest.is_empty());
}

#[test]
fn malformed_manifest_is_rejected() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = manifest_path(dir.path());

    for body in ["{\"1\": \"2024-01-01", "[\"1\"]", "{\"1\": 5}"] {
        fs::write(&path, body).unwrap();
        let err = RunManifest::load(&path).expect_err("should not parse");
        assert!(matches!(err, ManifestError::Malformed { .. }), "{body}: {err}");
    }
}

#[test]
fn empty_timestamps_are_dropped_on_load() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = manifest_path(dir.path());
    fs::write(&path, r#"{"3": "", "4": "2024-03-04T00:00:00Z"}"#).unwrap();

    let manifest = RunManifest::load(&path).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.get("4"), Some("2024-03-04T00:00:00Z"));
    assert_eq!(manifest.get("3"), None);
}

#[test]
fn persisted_body_is_canonical_pretty_json() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = manifest_path(dir.path());
    let manifest: RunManifest = [
        ("legacy", "2023-01-01T00:00:00Z"),
        ("10", "2024-01-10T00:00:00Z"),
        ("2", "2024-01-02T00:00:00Z"),
    ]
    .into_iter()
    .map(|(k, v)| (RunKey::from(k), v.to_string()))
    .collect();

    manifest.persist(&path).unwrap();

    let expected = "{\n  \"2\": \"2024-01-02T00:00:00Z\",\n  \"10\": \"2024-01-10T00:00:00Z\",\n  \"legacy\": \"2023-01-01T00:00:00Z\"\n}\n";
    assert_eq!(fs::read_to_string(&path).unwrap(), expected);

    let reloaded = RunManifest::load(&path).unwrap();
    assert_eq!(reloaded, manifest);
}

#[test]
fn empty_manifest_persists_as_empty_object() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = manifest_path(dir.path());
    RunManifest::new().persist(&path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
}

#[test]
fn insert_if_absent_never_overwrites() {
    let mut manifest = RunManifest::new();
    assert!(manifest.insert_if_absent(RunKey::from("5"), "T0"));
    assert!(!manifest.insert_if_absent(RunKey::from("5"), "T1"));
    assert!(!manifest.insert_if_absent(RunKey::from("6"), ""));
    assert_eq!(manifest.get("5"), Some("T0"));
    assert_eq!(manifest.len(), 1);
}

#[test]
fn scan_only_returns_numeric_directories_in_order() {
    let dir = tempfile::tempdir().expect("tmpdir");
    for name in ["10", "2", "latest", "1a", "1"] {
        fs::create_dir(dir.path().join(name)).unwrap();
    }
    fs::write(dir.path().join("3"), "not a directory").unwrap();
    fs::write(manifest_path(dir.path()), "{}").unwrap();

    let runs = scan_run_directories(dir.path()).unwrap();
    let keys: Vec<&str> = runs.iter().map(|run| run.key().as_str()).collect();
    assert_eq!(keys, vec!["1", "2", "10"]);
}

#[test]
fn scanning_a_missing_root_fails() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let err = scan_run_directories(&dir.path().join("absent")).expect_err("missing root");
    assert!(matches!(err, ManifestError::Scan { .. }));
}

#[test]
fn sentinel_read_trims_and_reports_absence() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let run = RunDirectory::new(RunKey::from("7"), dir.path().join("7"));
    fs::create_dir(run.path()).unwrap();

    assert_eq!(run.read_sentinel().unwrap(), None);

    fs::write(run.sentinel_path(), "  2024-05-06T07:08:09Z \n\n").unwrap();
    assert_eq!(
        run.read_sentinel().unwrap().as_deref(),
        Some("2024-05-06T07:08:09Z")
    );
}

#[test]
fn sentinel_write_does_not_clobber_existing_file() {
    let dir = tempfile::tempdir().expect("tmpdir");
    let run = RunDirectory::new(RunKey::from("8"), dir.path().join("8"));
    fs::create_dir(run.path()).unwrap();

    assert!(run.write_sentinel_if_absent("2024-08-08T00:00:00Z").unwrap());
    assert!(!run.write_sentinel_if_absent("2099-01-01T00:00:00Z").unwrap());
    assert_eq!(
        fs::read_to_string(run.path().join(SENTINEL_FILE_NAME)).unwrap(),
        "2024-08-08T00:00:00Z\n"
    );
}
