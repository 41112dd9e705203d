//! Consistency checks over the canonical registry directory.
//!
//! Errors make the command fail; warnings (script id collisions between
//! different hashes) are reported only.

use crate::core::error::RegistryError;
use crate::core::ids;
use crate::core::model::{DApp, FULL_HASH_PREFIX, SCRIPT_HASH_LEN, ScriptType};
use crate::core::output::{self, OutputFormat};
use crate::core::store::RegistryStore;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct ValidateCli {
    /// Registry directory to check (defaults to `paths.registry_dir`).
    #[clap(long)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub documents: usize,
    pub scripts: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    fn error(&mut self, file: &str, message: String) {
        self.findings.push(Finding {
            severity: Severity::Error,
            file: file.to_string(),
            message,
        });
    }

    fn warning(&mut self, file: &str, message: String) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            file: file.to_string(),
            message,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }
}

fn is_script_hash(hash: &str) -> bool {
    hash.len() == SCRIPT_HASH_LEN && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

fn check_document(file: &str, dapp: &DApp, report: &mut ValidationReport) {
    if !ids::is_valid_id(&dapp.id) {
        report.error(file, format!("dApp id '{}' is not an 8-character base62 id", dapp.id));
    }
    if dapp.project_name.trim().is_empty() {
        report.error(file, "projectName is empty".to_string());
    }

    let mut hashes = HashSet::new();
    for script in &dapp.scripts {
        let label = format!("script '{}' ({})", script.name, script.id);
        if !ids::is_valid_id(&script.id) {
            report.error(file, format!("{}: id is not an 8-character base62 id", label));
        }
        if !is_script_hash(&script.script_hash) {
            report.error(file, format!("{}: scriptHash must be {} hex characters", label, SCRIPT_HASH_LEN));
            continue;
        }
        let expected = format!("{}{}", FULL_HASH_PREFIX, script.script_hash);
        if script.full_script_hash != expected {
            report.error(file, format!("{}: fullScriptHash does not match scriptHash", label));
        }
        if script.script_type == ScriptType::Plutus && script.plutus_version.is_none() {
            report.error(file, format!("{}: PLUTUS script without plutusVersion", label));
        }
        if !hashes.insert(script.script_hash.as_str()) {
            report.error(file, format!("{}: scriptHash listed more than once", label));
        }
    }
}

/// Check every document under `store`. Fails only when the directory is missing.
pub fn validate_registry(store: &RegistryStore, exclude: &[&str]) -> Result<ValidationReport, RegistryError> {
    let files = store.list_documents(exclude)?;
    let mut report = ValidationReport::default();
    let mut dapp_ids: HashMap<String, String> = HashMap::new();
    let mut script_ids: HashMap<String, (String, String)> = HashMap::new();

    for file in files {
        let dapp = match store.read_dapp(&file) {
            Ok(Some(dapp)) => dapp,
            Ok(None) => continue,
            Err(e) => {
                report.error(&file, e.to_string());
                continue;
            }
        };
        report.documents += 1;
        report.scripts += dapp.scripts.len();
        check_document(&file, &dapp, &mut report);

        if let Some(other) = dapp_ids.insert(dapp.id.clone(), file.clone()) {
            report.error(&file, format!("dApp id '{}' is also used by {}", dapp.id, other));
        }
        for script in &dapp.scripts {
            match script_ids.get(&script.id) {
                Some((hash, other)) if *hash != script.script_hash => report.warning(
                    &file,
                    format!("script id '{}' collides with a different hash in {}", script.id, other),
                ),
                Some(_) => {}
                None => {
                    script_ids.insert(script.id.clone(), (script.script_hash.clone(), file.clone()));
                }
            }
        }
    }
    tracing::info!(documents = report.documents, findings = report.findings.len(), "registry validated");
    Ok(report)
}

pub fn print_validation_report(report: &ValidationReport, format: OutputFormat) -> Result<(), RegistryError> {
    if format == OutputFormat::Json {
        return output::print_json(report);
    }
    for finding in &report.findings {
        let tag = match finding.severity {
            Severity::Error => "error".bright_red().bold(),
            Severity::Warning => "warning".bright_yellow().bold(),
        };
        println!("{} {}: {}", tag, finding.file.bright_white(), finding.message);
    }
    let errors = report.errors().count();
    let warnings = report.warnings().count();
    let status = if errors == 0 { "✓".bright_green() } else { "✗".bright_red() };
    println!(
        "{} {} documents, {} scripts, {} errors, {} warnings",
        status, report.documents, report.scripts, errors, warnings
    );
    Ok(())
}

/// Validate `dir`, print the report, and fail when any error was found.
pub fn run_validate(dir: &Path, metadata_path: &Path, format: OutputFormat) -> Result<ValidationReport, RegistryError> {
    let store = RegistryStore::new(dir);
    let metadata_name = metadata_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let report = validate_registry(&store, &[metadata_name.as_str()])?;
    print_validation_report(&report, format)?;
    if !report.is_ok() {
        return Err(RegistryError::ValidationError(format!(
            "{} problem(s) in {}",
            report.errors().count(),
            dir.display()
        )));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{ProjectProfile, Purpose, Script};
    use serde_json::Map;
    use tempfile::tempdir;

    fn script(c: char) -> Script {
        let hash: String = std::iter::repeat(c).take(56).collect();
        Script {
            id: ids::script_id(&hash),
            name: "S".to_string(),
            purpose: Purpose::Spend,
            script_type: ScriptType::Plutus,
            full_script_hash: format!("71{}", hash),
            script_hash: hash,
            plutus_version: Some(2),
            protocol_version: None,
            extra: Map::new(),
        }
    }

    fn dapp(name: &str, scripts: Vec<Script>) -> DApp {
        let profile = ProjectProfile {
            project_name: name.to_string(),
            ..Default::default()
        };
        let mut d = DApp::from_profile(ids::project_id(name), &profile);
        d.scripts = scripts;
        d
    }

    #[test]
    fn clean_document_passes() {
        let mut report = ValidationReport::default();
        check_document("A.json", &dapp("A", vec![script('a'), script('b')]), &mut report);
        assert!(report.is_ok(), "{:?}", report.findings);
    }

    #[test]
    fn broken_scripts_are_errors() {
        let mut bad_full = script('a');
        bad_full.full_script_hash = "71ff".to_string();
        let mut no_version = script('b');
        no_version.plutus_version = None;
        let mut short = script('c');
        short.script_hash = "abc".to_string();

        let mut report = ValidationReport::default();
        check_document(
            "A.json",
            &dapp("A", vec![bad_full, no_version, short, script('d'), script('d')]),
            &mut report,
        );
        assert_eq!(report.errors().count(), 4);
    }

    #[test]
    fn registry_level_checks() {
        let tmp = tempdir().unwrap();
        let store = RegistryStore::new(tmp.path());
        store.write_dapp("A.json", &dapp("A", vec![script('a')])).unwrap();
        store.write_dapp("B.json", &dapp("A", vec![script('b')])).unwrap();
        std::fs::write(tmp.path().join("C.json"), "[]").unwrap();
        std::fs::write(tmp.path().join("metadata-mapping.json"), "{}").unwrap();

        let report = validate_registry(&store, &["metadata-mapping.json"]).unwrap();
        assert_eq!(report.documents, 2);
        let messages: Vec<_> = report.errors().map(|f| f.file.as_str()).collect();
        assert_eq!(messages, vec!["B.json", "C.json"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempdir().unwrap();
        let store = RegistryStore::new(tmp.path().join("absent"));
        assert!(validate_registry(&store, &[]).is_err());
    }
}
