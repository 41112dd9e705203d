use dapp_registry::core::error::RegistryError;
use dapp_registry::core::ids;
use dapp_registry::core::output::OutputFormat;
use dapp_registry::core::store::RegistryStore;
use dapp_registry::plugins::validate::{Severity, run_validate, validate_registry};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn hash(c: char) -> String {
    std::iter::repeat(c).take(56).collect()
}

fn script_json(h: &str) -> serde_json::Value {
    json!({
        "id": ids::script_id(h),
        "name": "Pool",
        "purpose": "SPEND",
        "type": "PLUTUS",
        "scriptHash": h,
        "fullScriptHash": format!("71{}", h),
        "plutusVersion": 2
    })
}

fn write_doc(dir: &std::path::Path, file: &str, name: &str, scripts: Vec<serde_json::Value>) {
    let doc = json!({
        "id": ids::project_id(name),
        "projectName": name,
        "scripts": scripts
    });
    fs::write(dir.join(file), serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

#[test]
fn clean_registry_validates() {
    let tmp = TempDir::new().expect("tempdir");
    write_doc(tmp.path(), "Minswap.json", "Minswap", vec![script_json(&hash('a'))]);
    write_doc(tmp.path(), "Splash.json", "Splash", vec![script_json(&hash('b'))]);
    fs::write(tmp.path().join("metadata-mapping.json"), r#"{"mappings":{}}"#).unwrap();

    let report = run_validate(
        tmp.path(),
        &tmp.path().join("metadata-mapping.json"),
        OutputFormat::Json,
    )
    .expect("valid registry");
    assert_eq!(report.documents, 2);
    assert_eq!(report.scripts, 2);
    assert!(report.findings.is_empty());
}

#[test]
fn script_id_collision_is_only_a_warning() {
    let tmp = TempDir::new().expect("tempdir");
    // Same leading 12 hex characters, different hashes.
    let first = format!("abcdabcdabcd{}", "0".repeat(44));
    let second = format!("abcdabcdabcd{}", "1".repeat(44));
    assert_eq!(ids::script_id(&first), ids::script_id(&second));
    write_doc(tmp.path(), "A.json", "A", vec![script_json(&first)]);
    write_doc(tmp.path(), "B.json", "B", vec![script_json(&second)]);

    let report = validate_registry(&RegistryStore::new(tmp.path()), &[]).unwrap();
    assert!(report.is_ok());
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(warnings[0].file, "B.json");
}

#[test]
fn same_script_in_two_documents_is_not_a_collision() {
    let tmp = TempDir::new().expect("tempdir");
    write_doc(tmp.path(), "A.json", "A", vec![script_json(&hash('a'))]);
    write_doc(tmp.path(), "B.json", "B", vec![script_json(&hash('a'))]);
    let report = validate_registry(&RegistryStore::new(tmp.path()), &[]).unwrap();
    assert!(report.findings.is_empty());
}

#[test]
fn broken_registry_fails() {
    let tmp = TempDir::new().expect("tempdir");
    let mut bad = script_json(&hash('a'));
    bad["fullScriptHash"] = json!("71deadbeef");
    write_doc(tmp.path(), "A.json", "A", vec![bad]);
    write_doc(tmp.path(), "Dup.json", "A", vec![]);
    fs::write(tmp.path().join("Broken.json"), "{").unwrap();

    let err = run_validate(
        tmp.path(),
        &tmp.path().join("metadata-mapping.json"),
        OutputFormat::Text,
    )
    .unwrap_err();
    assert!(matches!(err, RegistryError::ValidationError(_)));
    assert!(err.to_string().contains("3 problem(s)"));
}
