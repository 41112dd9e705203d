//! Legacy migration: nested `scripts[].versions[]` documents into flat scripts.
//!
//! Every `*.json` under the legacy directory is converted independently and
//! merged into the document of the same file name in the registry directory.
//! A legacy file that fails to parse is counted and skipped.

use crate::core::config::RegistryConfig;
use crate::core::error::RegistryError;
use crate::core::flatten;
use crate::core::metadata::{AliasTable, MetadataMapping, MetadataTable};
use crate::core::model::{LegacyDApp, ProjectProfile};
use crate::core::pipeline::{self, Batches, IdSeed, RunReport};
use crate::core::resolver::{ClassificationResolver, ResolverSession, SqliteResolver};
use crate::core::store::{self, RegistryStore};
use clap::Args;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct MigrateCli {
    /// Legacy document directory (defaults to `paths.legacy_dir`).
    #[clap(long)]
    pub source: Option<PathBuf>,
    /// Registry directory to merge into (defaults to `paths.registry_dir`).
    #[clap(long)]
    pub target: Option<PathBuf>,
}

/// A parsed legacy document and the names it is filed under.
#[derive(Debug)]
pub struct LegacyDocument {
    pub file: String,
    pub key: String,
    pub profile: ProjectProfile,
    pub dapp: LegacyDApp,
}

fn file_stem(file: &str) -> &str {
    file.strip_suffix(".json").unwrap_or(file)
}

pub fn read_legacy(path: &Path) -> Result<LegacyDApp, RegistryError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        RegistryError::InvalidInput(format!("legacy document {}: {}", path.display(), e))
    })
}

/// Convert every legacy document in `source_dir` with an open resolver.
pub fn migrate_documents<R: ClassificationResolver + ?Sized>(
    source_dir: &Path,
    resolver: &R,
    metadata: &mut MetadataTable,
    metadata_path: &Path,
    store: &RegistryStore,
    report: &mut RunReport,
) -> Result<(), RegistryError> {
    let metadata_name = metadata_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let files = store::list_json_files(source_dir, &[metadata_name.as_str()])?;
    tracing::info!(dir = %source_dir.display(), files = files.len(), "legacy documents found");

    let mut batches = Batches::default();
    let mut profiles: HashMap<String, ProjectProfile> = HashMap::new();
    let mut total_versions = 0usize;

    for file in files {
        report.inputs += 1;
        let dapp = match read_legacy(&source_dir.join(&file)) {
            Ok(dapp) => dapp,
            Err(e) => {
                report.counters.record_rejected(&file, &e);
                continue;
            }
        };
        let profile = dapp.profile(file_stem(&file));
        let project = metadata.ensure_project_entry_with(&profile.project_name, |_| {
            MetadataMapping::from_profile(&profile)
        });
        let doc = LegacyDocument {
            file,
            key: project.key,
            profile,
            dapp,
        };

        batches.ensure(&doc.key, &doc.file);
        for script in &doc.dapp.scripts {
            for version in &script.versions {
                total_versions += 1;
                let origin = format!(
                    "{} {}",
                    doc.file,
                    script.name.as_deref().unwrap_or(flatten::UNKNOWN_SCRIPT_NAME)
                );
                match flatten::flatten_legacy_version(&doc.key, &doc.file, script, version, resolver) {
                    Ok(outcome) => {
                        pipeline::record_outcome(outcome, &origin, &mut report.counters, &mut batches)
                    }
                    Err(e) if e.is_row_level() => report.counters.record_rejected(&origin, &e),
                    Err(e) => return Err(e),
                }
                pipeline::log_progress(&report.counters, total_versions);
            }
        }
        tracing::debug!(file = %doc.file, key = %doc.key, scripts = doc.dapp.scripts.len(), "legacy document flattened");
        profiles.insert(doc.file, doc.profile);
    }

    report.metadata_saved = metadata.save_if_modified(metadata_path)?;

    pipeline::commit_batches(
        batches.into_vec(),
        store,
        IdSeed::ProjectName,
        |batch| profiles.get(&batch.file).cloned(),
        report,
    );
    if report.is_suspicious() {
        tracing::warn!(inputs = report.inputs, "no legacy scripts were accepted");
    }
    Ok(())
}

pub fn run_migrate<R: ClassificationResolver>(
    config: &RegistryConfig,
    source_dir: &Path,
    target: &Path,
    session: ResolverSession<R>,
) -> Result<RunReport, RegistryError> {
    pipeline::with_session(session, |resolver| {
        let aliases = AliasTable::with_overrides(&config.aliases);
        let mut metadata = MetadataTable::load(&config.paths.metadata, aliases)?;
        let store = RegistryStore::new(target);
        let mut report = RunReport::new("migrate");
        migrate_documents(
            source_dir,
            resolver,
            &mut metadata,
            &config.paths.metadata,
            &store,
            &mut report,
        )?;
        Ok(report)
    })
}

pub fn run_migrate_cli(cli: &MigrateCli, config: &RegistryConfig) -> Result<RunReport, RegistryError> {
    let db = config.require_resolver_database()?;
    let source = cli
        .source
        .clone()
        .unwrap_or_else(|| config.paths.legacy_dir.clone());
    let target = cli
        .target
        .clone()
        .unwrap_or_else(|| config.paths.registry_dir.clone());
    if !source.is_dir() {
        return Err(RegistryError::NotFound(format!(
            "legacy directory not found: {}",
            source.display()
        )));
    }
    let session = ResolverSession::new(SqliteResolver::open(db)?);
    run_migrate(config, &source, &target, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::MemoryResolver;
    use tempfile::tempdir;

    fn hash(c: char) -> String {
        std::iter::repeat(c).take(56).collect()
    }

    #[test]
    fn file_stem_strips_json_suffix() {
        assert_eq!(file_stem("Minswap.json"), "Minswap");
        assert_eq!(file_stem("README"), "README");
    }

    #[test]
    fn unparseable_legacy_file_is_rejected_and_run_continues() {
        let tmp = tempdir().unwrap();
        let legacy = tmp.path().join("legacy");
        fs::create_dir_all(&legacy).unwrap();
        fs::write(legacy.join("Broken.json"), "{ nope").unwrap();
        fs::write(
            legacy.join("Good.json"),
            serde_json::json!({
                "projectName": "Good",
                "category": "DEFI",
                "scripts": [{ "name": "Pool", "versions": [{ "scriptHash": hash('a') }] }]
            })
            .to_string(),
        )
        .unwrap();

        let resolver = MemoryResolver::new().with(&hash('a'), "plutusV2");
        let mut metadata = MetadataTable::new(AliasTable::default());
        let store = RegistryStore::new(tmp.path().join("out"));
        let mut report = RunReport::new("migrate");
        migrate_documents(
            &legacy,
            &resolver,
            &mut metadata,
            &tmp.path().join("out/metadata-mapping.json"),
            &store,
            &mut report,
        )
        .unwrap();

        assert_eq!(report.inputs, 2);
        assert_eq!(report.counters.rejected, 1);
        assert_eq!(report.counters.processed, 1);
        let doc = store.read_dapp("Good.json").unwrap().unwrap();
        assert_eq!(doc.project_name, "Good");
        assert_eq!(doc.scripts[0].name, "Pool");
        assert!(store.read_dapp("Broken.json").unwrap().is_none());
    }
}
