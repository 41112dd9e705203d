//! Conversion of raw entries into canonical `Script` records.
//!
//! Each raw entry (a tabular row or one legacy version entry) runs
//! normalize → classify → enrich → build, and ends in exactly one
//! `FlattenOutcome`. Only Plutus scripts reach the registry; anything the
//! resolver classifies otherwise is dropped silently and counted.

use crate::core::error::RegistryError;
use crate::core::ids;
use crate::core::metadata::MetadataTable;
use crate::core::model::{
    FULL_HASH_PREFIX, LegacyScript, LegacyVersion, Purpose, SCRIPT_HASH_LEN, Script, ScriptType,
    SourceRow, parse_label,
};
use crate::core::resolver::ClassificationResolver;
use regex::Regex;
use serde_json::Map;
use std::sync::OnceLock;

/// Name given to legacy scripts that never had one.
pub const UNKNOWN_SCRIPT_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum FlattenOutcome {
    /// A canonical script for the project under `key`, written to `file`.
    Accepted {
        key: String,
        file: String,
        script: Script,
    },
    /// The resolver has no record of the hash.
    NotFound { script_hash: String },
    /// The resolver classified the hash as something other than Plutus.
    SkippedNonPlutus {
        script_hash: String,
        script_type: String,
    },
}

/// Trim, lowercase, and keep only the trailing 56 characters of a longer hash.
///
/// Fails on non-hex input or input shorter than a full script hash.
pub fn normalize_hash(raw: &str) -> Result<String, RegistryError> {
    let trimmed = raw.trim();
    if !trimmed.is_ascii() || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RegistryError::InvalidInput(format!(
            "script hash '{}' is not hex",
            trimmed
        )));
    }
    if trimmed.len() < SCRIPT_HASH_LEN {
        return Err(RegistryError::InvalidInput(format!(
            "script hash '{}' is shorter than {} hex characters",
            trimmed, SCRIPT_HASH_LEN
        )));
    }
    Ok(trimmed[trimmed.len() - SCRIPT_HASH_LEN..].to_ascii_lowercase())
}

fn version_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"V(\d+)$").expect("static regex"))
}

/// Protocol version encoded as a trailing `V<digits>` in a source identifier
/// (`MinswapV2` → 2). Version 1 and unversioned names yield `None`.
pub fn protocol_version_from_source(identifier: &str) -> Option<u32> {
    let caps = version_suffix_re().captures(identifier.trim())?;
    let version: u32 = caps.get(1)?.as_str().parse().ok()?;
    explicit_protocol_version(version)
}

/// Protocol version 1 is implied and never stored.
fn explicit_protocol_version(version: u32) -> Option<u32> {
    (version >= 2).then_some(version)
}

fn plutus_script(
    hash: String,
    name: String,
    purpose: Purpose,
    plutus_version: u8,
    protocol_version: Option<u32>,
) -> Script {
    Script {
        id: ids::script_id(&hash),
        name,
        purpose,
        script_type: ScriptType::Plutus,
        full_script_hash: format!("{}{}", FULL_HASH_PREFIX, hash),
        script_hash: hash,
        plutus_version: Some(plutus_version),
        protocol_version,
        extra: Map::new(),
    }
}

/// Classify a normalized hash: `Ok(Err(outcome))` carries a terminal non-accept outcome.
fn classify<R: ClassificationResolver + ?Sized>(
    resolver: &R,
    hash: &str,
) -> Result<Result<u8, FlattenOutcome>, RegistryError> {
    let Some(record) = resolver.lookup(hash)? else {
        return Ok(Err(FlattenOutcome::NotFound {
            script_hash: hash.to_string(),
        }));
    };
    match record.plutus_version() {
        Some(v) => Ok(Ok(v)),
        None => Ok(Err(FlattenOutcome::SkippedNonPlutus {
            script_hash: hash.to_string(),
            script_type: record.script_type,
        })),
    }
}

/// Flatten one tabular row (`dex, class, script_hash`).
///
/// Display name and purpose come from the metadata side-table, which is
/// extended with defaults for unseen projects and classes.
pub fn flatten_row<R: ClassificationResolver + ?Sized>(
    row: &SourceRow,
    resolver: &R,
    metadata: &mut MetadataTable,
) -> Result<FlattenOutcome, RegistryError> {
    let hash = normalize_hash(&row.script_hash)?;
    let plutus_version = match classify(resolver, &hash)? {
        Ok(v) => v,
        Err(outcome) => return Ok(outcome),
    };

    let project = metadata.ensure_project_entry(&row.dex);
    let class = row.class.trim();
    metadata.ensure_script_class_mapping(&project.key, class, Purpose::Spend)?;
    let (name, purpose) = metadata
        .get(&project.key)
        .and_then(|m| m.class_mapping(class))
        .map(|(n, p)| (n.to_string(), p))
        .ok_or_else(|| RegistryError::NotFound(format!("class mapping {}/{}", project.key, class)))?;

    let script = plutus_script(
        hash,
        name,
        purpose,
        plutus_version,
        protocol_version_from_source(&row.dex),
    );
    Ok(FlattenOutcome::Accepted {
        key: project.key,
        file: project.file,
        script,
    })
}

/// Flatten one version entry of a legacy script.
///
/// The legacy document is itself curated, so its own name, purpose and
/// explicit `protocolVersion` are kept; the side-table is not consulted for
/// naming. Returns `InvalidInput` when the version carries no hash.
pub fn flatten_legacy_version<R: ClassificationResolver + ?Sized>(
    key: &str,
    file: &str,
    script: &LegacyScript,
    version: &LegacyVersion,
    resolver: &R,
) -> Result<FlattenOutcome, RegistryError> {
    let raw = version.hash().ok_or_else(|| {
        RegistryError::InvalidInput(format!(
            "legacy script '{}' has a version without scriptHash or mintPolicyID",
            script.name.as_deref().unwrap_or(UNKNOWN_SCRIPT_NAME)
        ))
    })?;
    let hash = normalize_hash(raw)?;
    let plutus_version = match classify(resolver, &hash)? {
        Ok(v) => v,
        Err(outcome) => return Ok(outcome),
    };

    let name = script
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_SCRIPT_NAME)
        .to_string();
    let purpose = match script.purpose.as_deref() {
        None => Purpose::Spend,
        Some(label) => parse_label::<Purpose>(label).unwrap_or_else(|| {
            tracing::warn!(script = %name, purpose = label, "unknown purpose; using SPEND");
            Purpose::Spend
        }),
    };
    if let Some(t) = script.script_type.as_deref() {
        if parse_label::<ScriptType>(t) != Some(ScriptType::Plutus) {
            tracing::debug!(script = %name, legacy_type = t, "classification overrides legacy type");
        }
    }
    if let Some(full) = version.full_script_hash.as_deref() {
        let expected = format!("{}{}", FULL_HASH_PREFIX, hash);
        if !full.trim().eq_ignore_ascii_case(&expected) {
            tracing::debug!(script = %name, legacy = full, "replacing legacy fullScriptHash");
        }
    }

    let protocol_version = script.protocol_version.and_then(explicit_protocol_version);
    Ok(FlattenOutcome::Accepted {
        key: key.to_string(),
        file: file.to_string(),
        script: plutus_script(hash, name, purpose, plutus_version, protocol_version),
    })
}
