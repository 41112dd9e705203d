//! Curated display metadata keyed by canonical project key.
//!
//! The side-table (`metadata-mapping.json`) is edited by hand between runs.
//! The enricher only ever *adds* to it: missing projects and missing
//! script-class mappings are created with defaults, existing entries are
//! never rewritten. Every auto-creation is logged and reported back to the
//! caller.

use crate::core::config::AliasConfig;
use crate::core::error::RegistryError;
use crate::core::model::{
    Category, CuratedLabel, Description, ProjectProfile, Purpose, SubCategory,
};
use crate::core::store;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Built-in aliases: raw source name, canonical metadata key, output file.
const BUILTIN_ALIASES: &[(&str, &str, &str)] = &[
    ("Minswap", "Minswap", "Minswap.json"),
    ("MinswapV2", "Minswap", "Minswap.json"),
    ("MuesliSwap", "MuesliSwap", "MuesliSwap.json"),
    ("Spectrum", "Spectrum", "SpectrumFinance.json"),
    ("Splash", "Splash", "SplashProtocol.json"),
    ("SundaeSwap", "SundaeSwap", "SundaeSwap.json"),
    ("SundaeSwapV3", "SundaeSwap", "SundaeSwap.json"),
    ("VyFi", "VyFinance", "VyFinance.json"),
    ("WingRiders", "Wingriders", "Wingriders.json"),
    ("WingRidersV2", "Wingriders", "Wingriders.json"),
    ("GeniusYield", "GeniusYield", "GeniusYield.json"),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScriptMappings {
    #[serde(default)]
    pub names: BTreeMap<String, String>,
    #[serde(default)]
    pub purposes: BTreeMap<String, Purpose>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMapping {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "CuratedLabel::is_absent")]
    pub category: CuratedLabel<Category>,
    #[serde(default, skip_serializing_if = "CuratedLabel::is_absent")]
    pub sub_category: CuratedLabel<SubCategory>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub script_mappings: ScriptMappings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataMapping {
    /// Entry created for a project seen for the first time.
    pub fn with_defaults(key: &str) -> Self {
        Self {
            project_name: key.to_string(),
            category: CuratedLabel::Known(Category::Defi),
            sub_category: CuratedLabel::Known(SubCategory::AmmDex),
            link: String::new(),
            twitter: String::new(),
            description: Description::default(),
            script_mappings: ScriptMappings::default(),
            extra: Map::new(),
        }
    }

    /// Entry seeded from an existing profile (used when migrating legacy documents).
    pub fn from_profile(profile: &ProjectProfile) -> Self {
        Self {
            project_name: profile.project_name.clone(),
            category: profile.category.into(),
            sub_category: profile.sub_category.into(),
            link: profile.link.clone(),
            twitter: profile.twitter.clone(),
            description: Description {
                short: profile.description_short.clone(),
                extra: Map::new(),
            },
            script_mappings: ScriptMappings::default(),
            extra: Map::new(),
        }
    }

    pub fn profile(&self) -> ProjectProfile {
        ProjectProfile {
            project_name: self.project_name.clone(),
            link: self.link.clone(),
            twitter: self.twitter.clone(),
            category: self.category.known(),
            sub_category: self.sub_category.known(),
            description_short: self.description.short.clone(),
        }
    }

    /// Display name and purpose recorded for a script class.
    pub fn class_mapping(&self, class_label: &str) -> Option<(&str, Purpose)> {
        let name = self.script_mappings.names.get(class_label)?;
        let purpose = self.script_mappings.purposes.get(class_label)?;
        Some((name.as_str(), *purpose))
    }
}

/// Resolution of a raw source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub key: String,
    pub file: String,
}

/// Raw source name → canonical key and output file.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: BTreeMap<String, ResolvedKey>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let entries = BUILTIN_ALIASES
            .iter()
            .map(|(raw, key, file)| {
                (
                    raw.to_string(),
                    ResolvedKey {
                        key: key.to_string(),
                        file: file.to_string(),
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl AliasTable {
    /// Built-in aliases extended (and overridden) by configured ones.
    pub fn with_overrides(overrides: &BTreeMap<String, AliasConfig>) -> Self {
        let mut table = Self::default();
        for (raw, alias) in overrides {
            let file = alias
                .file
                .clone()
                .unwrap_or_else(|| default_file_for(&alias.key));
            table.entries.insert(
                raw.clone(),
                ResolvedKey {
                    key: alias.key.clone(),
                    file,
                },
            );
        }
        table
    }

    /// Unknown names map to themselves and `<name>.json`.
    pub fn resolve(&self, raw: &str) -> ResolvedKey {
        let raw = raw.trim();
        self.entries.get(raw).cloned().unwrap_or_else(|| ResolvedKey {
            key: raw.to_string(),
            file: default_file_for(raw),
        })
    }
}

fn default_file_for(key: &str) -> String {
    format!("{}.json", key)
}

/// In-memory side-table plus the snapshot it was loaded from.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    doc: MetadataDocument,
    loaded: MetadataDocument,
    aliases: AliasTable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
struct MetadataDocument {
    #[serde(default)]
    mappings: BTreeMap<String, MetadataMapping>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl MetadataTable {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            doc: MetadataDocument::default(),
            loaded: MetadataDocument::default(),
            aliases,
        }
    }

    /// Load the side-table. An absent file is an empty table; an unreadable
    /// or malformed one is a setup error.
    pub fn load(path: &Path, aliases: AliasTable) -> Result<Self, RegistryError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no metadata mapping found; starting empty");
            return Ok(Self::new(aliases));
        }
        let raw = fs::read_to_string(path).map_err(RegistryError::IoError)?;
        let doc: MetadataDocument = serde_json::from_str(&raw).map_err(|e| {
            RegistryError::ConfigError(format!(
                "invalid metadata mapping {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!(entries = doc.mappings.len(), "metadata mapping loaded");
        Ok(Self {
            loaded: doc.clone(),
            doc,
            aliases,
        })
    }

    /// True when the table differs from what was loaded.
    pub fn is_modified(&self) -> bool {
        self.doc != self.loaded
    }

    /// Write the table atomically if it changed. Returns whether a write happened.
    pub fn save_if_modified(&mut self, path: &Path) -> Result<bool, RegistryError> {
        if !self.is_modified() {
            return Ok(false);
        }
        store::write_json_atomic(path, &self.doc)?;
        self.loaded = self.doc.clone();
        tracing::info!(path = %path.display(), "metadata mapping saved");
        Ok(true)
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn get(&self, key: &str) -> Option<&MetadataMapping> {
        self.doc.mappings.get(key)
    }

    pub fn len(&self) -> usize {
        self.doc.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.mappings.is_empty()
    }

    /// Resolve `raw` to its canonical key, creating a default entry if missing.
    pub fn ensure_project_entry(&mut self, raw: &str) -> EnsuredProject {
        self.ensure_project_entry_with(raw, MetadataMapping::with_defaults)
    }

    /// Like `ensure_project_entry`, with a caller-supplied seed for new entries.
    pub fn ensure_project_entry_with<F>(&mut self, raw: &str, seed: F) -> EnsuredProject
    where
        F: FnOnce(&str) -> MetadataMapping,
    {
        let resolved = self.aliases.resolve(raw);
        let created = !self.doc.mappings.contains_key(&resolved.key);
        if created {
            let entry = seed(&resolved.key);
            tracing::info!(
                key = %resolved.key,
                raw = raw,
                category = ?entry.category,
                sub_category = ?entry.sub_category,
                "created metadata entry"
            );
            self.doc.mappings.insert(resolved.key.clone(), entry);
        }
        EnsuredProject {
            key: resolved.key,
            file: resolved.file,
            created,
        }
    }

    /// Fill in a missing display name (the label itself) and purpose
    /// (`default_purpose`) for a script class. Never overwrites either.
    pub fn ensure_script_class_mapping(
        &mut self,
        key: &str,
        class_label: &str,
        default_purpose: Purpose,
    ) -> Result<ClassMappingChange, RegistryError> {
        let entry = self.doc.mappings.get_mut(key).ok_or_else(|| {
            RegistryError::NotFound(format!("metadata entry '{}' (ensure the project first)", key))
        })?;
        let mut change = ClassMappingChange::default();
        if !entry.script_mappings.names.contains_key(class_label) {
            entry
                .script_mappings
                .names
                .insert(class_label.to_string(), class_label.to_string());
            change.name_created = true;
        }
        if !entry.script_mappings.purposes.contains_key(class_label) {
            entry
                .script_mappings
                .purposes
                .insert(class_label.to_string(), default_purpose);
            change.purpose_created = true;
        }
        if change.any() {
            tracing::info!(
                key = key,
                class = class_label,
                name_created = change.name_created,
                purpose_created = change.purpose_created,
                "created script class mapping"
            );
        }
        Ok(change)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredProject {
    pub key: String,
    pub file: String,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassMappingChange {
    pub name_created: bool,
    pub purpose_created: bool,
}

impl ClassMappingChange {
    pub fn any(&self) -> bool {
        self.name_created || self.purpose_created
    }
}
