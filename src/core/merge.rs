//! Duplicate-safe merge of new scripts into a dApp document.
//!
//! The existing document always wins: its shell fields are never touched
//! and a script whose `scriptHash` is already listed is discarded, however
//! the incoming record differs. Re-merging the same scripts is a no-op.

use crate::core::ids;
use crate::core::model::{DApp, ProjectProfile, Script};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub document: DApp,
    pub added: usize,
    pub duplicates: usize,
    /// A new document was synthesized because none existed.
    pub created: bool,
}

impl MergeOutcome {
    /// Whether the document must be persisted.
    pub fn changed(&self) -> bool {
        self.created || self.added > 0
    }
}

/// New document shell: id from `id_seed`, profile fields only when non-empty.
pub fn new_shell(id_seed: &str, profile: &ProjectProfile) -> DApp {
    DApp::from_profile(ids::project_id(id_seed), profile)
}

/// Append each incoming script whose hash is not yet present, in order.
pub fn merge_scripts<I>(existing: Option<DApp>, shell: impl FnOnce() -> DApp, incoming: I) -> MergeOutcome
where
    I: IntoIterator<Item = Script>,
{
    let created = existing.is_none();
    let mut document = existing.unwrap_or_else(shell);

    let mut seen: HashSet<String> = document
        .scripts
        .iter()
        .map(|s| s.script_hash.to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect();

    let mut added = 0;
    let mut duplicates = 0;
    for script in incoming {
        if !seen.insert(script.script_hash.to_ascii_lowercase()) {
            duplicates += 1;
            continue;
        }
        document.scripts.push(script);
        added += 1;
    }

    MergeOutcome {
        document,
        added,
        duplicates,
        created,
    }
}
