//! Shared run machinery for the import and migration drivers.
//!
//! A run is strictly sequential: every entry is flattened (one blocking
//! lookup each), accepted scripts are grouped per project in first-seen
//! order, the metadata side-table is persisted if it changed, and each
//! project group is then merged into its registry document.

use crate::core::error::RegistryError;
use crate::core::flatten::FlattenOutcome;
use crate::core::merge::{self, MergeOutcome};
use crate::core::model::{ProjectProfile, Script};
use crate::core::output::compact_line;
use crate::core::resolver::{ClassificationResolver, ResolverSession};
use crate::core::store::RegistryStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Log a progress line every this many entries.
pub const PROGRESS_EVERY: usize = 50;

/// Per-run terminal outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Accepted entries (merged or duplicate-skipped later).
    pub processed: usize,
    pub not_found: usize,
    pub skipped_non_plutus: usize,
    /// Malformed rows, unparseable input files, versions without a hash.
    pub rejected: usize,
    /// `origin: error` line per rejected entry, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<String>,
}

impl RunCounters {
    pub fn seen(&self) -> usize {
        self.processed + self.not_found + self.skipped_non_plutus + self.rejected
    }

    pub fn record_rejected(&mut self, origin: &str, err: &RegistryError) {
        self.rejected += 1;
        self.rejections.push(format!("{}: {}", origin, err));
        tracing::warn!(origin = origin, error = %err, "entry rejected");
    }
}

/// Accepted scripts for one output document.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectBatch {
    pub key: String,
    pub file: String,
    pub scripts: Vec<Script>,
}

impl ProjectBatch {
    /// Script count per protocol version (absent counts as 1).
    pub fn by_protocol(&self) -> BTreeMap<u32, usize> {
        let mut out = BTreeMap::new();
        for script in &self.scripts {
            *out.entry(script.protocol_version.unwrap_or(1)).or_insert(0) += 1;
        }
        out
    }
}

/// Project batches in first-seen order, keyed by `(key, file)`.
#[derive(Debug, Default)]
pub struct Batches {
    order: Vec<ProjectBatch>,
    index: HashMap<(String, String), usize>,
}

impl Batches {
    pub fn ensure(&mut self, key: &str, file: &str) -> &mut ProjectBatch {
        let id = (key.to_string(), file.to_string());
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.order.push(ProjectBatch {
                    key: key.to_string(),
                    file: file.to_string(),
                    scripts: Vec::new(),
                });
                self.index.insert(id, self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[slot]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectBatch> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<ProjectBatch> {
        self.order
    }
}

/// Fold one flatten outcome into the counters and batches.
pub fn record_outcome(
    outcome: FlattenOutcome,
    origin: &str,
    counters: &mut RunCounters,
    batches: &mut Batches,
) {
    match outcome {
        FlattenOutcome::Accepted { key, file, script } => {
            counters.processed += 1;
            batches.ensure(&key, &file).scripts.push(script);
        }
        FlattenOutcome::NotFound { script_hash } => {
            counters.not_found += 1;
            tracing::info!(
                origin = origin,
                hash = %compact_line(&script_hash, 16),
                "not found in classification database"
            );
        }
        FlattenOutcome::SkippedNonPlutus {
            script_hash,
            script_type,
        } => {
            counters.skipped_non_plutus += 1;
            tracing::debug!(
                origin = origin,
                hash = %compact_line(&script_hash, 16),
                script_type = %script_type,
                "skipped non-Plutus script"
            );
        }
    }
}

pub fn log_progress(counters: &RunCounters, total: usize) {
    let seen = counters.seen();
    if seen > 0 && seen % PROGRESS_EVERY == 0 {
        tracing::info!(seen, total, "progress");
    }
}

/// Name a newly synthesized document's id is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSeed {
    /// The canonical metadata key (tabular import).
    CanonicalKey,
    /// The profile's `projectName` (legacy migration).
    ProjectName,
}

/// Per-document merge result as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReport {
    pub key: String,
    pub file: String,
    pub project_name: String,
    pub added: usize,
    pub duplicates: usize,
    pub created: bool,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub by_protocol: BTreeMap<u32, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub command: String,
    pub inputs: usize,
    #[serde(flatten)]
    pub counters: RunCounters,
    pub files_written: usize,
    pub write_failures: usize,
    pub metadata_saved: bool,
    pub projects: Vec<ProjectReport>,
}

impl RunReport {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            inputs: 0,
            counters: RunCounters::default(),
            files_written: 0,
            write_failures: 0,
            metadata_saved: false,
            projects: Vec::new(),
        }
    }

    /// Input was present but nothing was accepted.
    pub fn is_suspicious(&self) -> bool {
        self.inputs > 0 && self.counters.processed == 0
    }

    pub fn project(&self, key: &str) -> Option<&ProjectReport> {
        self.projects.iter().find(|p| p.key == key)
    }

    pub fn total_added(&self) -> usize {
        self.projects.iter().map(|p| p.added).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.projects.iter().map(|p| p.duplicates).sum()
    }
}

/// Merge every batch into its registry document and write changed documents.
///
/// A project whose existing document cannot be read, or whose write fails,
/// is reported with an error; its file is left as it was and the run
/// continues with the next project.
pub fn commit_batches<F>(
    batches: Vec<ProjectBatch>,
    store: &RegistryStore,
    id_seed: IdSeed,
    profile_for: F,
    report: &mut RunReport,
) where
    F: Fn(&ProjectBatch) -> Option<ProjectProfile>,
{
    for batch in batches {
        let by_protocol = batch.by_protocol();
        let mut project = ProjectReport {
            key: batch.key.clone(),
            file: batch.file.clone(),
            project_name: batch.key.clone(),
            added: 0,
            duplicates: 0,
            created: false,
            written: false,
            content_hash: None,
            error: None,
            by_protocol,
        };

        let Some(profile) = profile_for(&batch) else {
            project.error = Some(format!("no metadata found for '{}'", batch.key));
            tracing::warn!(key = %batch.key, "skipping project without metadata");
            report.write_failures += 1;
            report.projects.push(project);
            continue;
        };

        let existing = match store.read_dapp(&batch.file) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(file = %batch.file, error = %e, "existing document unreadable; leaving it untouched");
                project.error = Some(e.to_string());
                report.write_failures += 1;
                report.projects.push(project);
                continue;
            }
        };
        if let Some(doc) = &existing {
            tracing::debug!(file = %batch.file, scripts = doc.scripts.len(), "merging into existing document");
        }

        let MergeOutcome {
            document,
            added,
            duplicates,
            created,
        } = merge::merge_scripts(
            existing,
            || {
                let seed = match id_seed {
                    IdSeed::CanonicalKey => batch.key.as_str(),
                    IdSeed::ProjectName => profile.project_name.as_str(),
                };
                merge::new_shell(seed, &profile)
            },
            batch.scripts,
        );
        project.project_name = document.project_name.clone();
        project.added = added;
        project.duplicates = duplicates;
        project.created = created;

        if created || added > 0 {
            match store.write_dapp(&batch.file, &document) {
                Ok(receipt) => {
                    project.written = true;
                    project.content_hash = Some(receipt.content_hash);
                    report.files_written += 1;
                }
                Err(e) => {
                    tracing::warn!(file = %batch.file, error = %e, "write failed");
                    project.error = Some(e.to_string());
                    report.write_failures += 1;
                }
            }
        }
        report.projects.push(project);
    }
}

/// Run `body` against the session's resolver and close the session on every path.
///
/// A close failure is surfaced only when the body itself succeeded.
pub fn with_session<R, T, F>(session: ResolverSession<R>, body: F) -> Result<T, RegistryError>
where
    R: ClassificationResolver,
    F: FnOnce(&R) -> Result<T, RegistryError>,
{
    let result = body(session.resolver());
    let closed = session.close();
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "resolver close failed after run error");
            Err(e)
        }
    }
}
