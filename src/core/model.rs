//! Document shapes handled by the registry.
//!
//! Three families are kept apart:
//! - canonical documents (`DApp`, `Script`) written to the registry,
//! - legacy documents (`LegacyDApp` and friends) read during migration,
//! - tabular source rows (`SourceRow`) read during import.
//!
//! Legacy shapes only become canonical through `core::flatten`.

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Network tag prepended to a script hash to form `fullScriptHash`.
pub const FULL_HASH_PREFIX: &str = "71";

/// Length of a canonical script hash in hex characters.
pub const SCRIPT_HASH_LEN: usize = 56;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Purpose {
    #[default]
    #[serde(rename = "SPEND")]
    Spend,
    #[serde(rename = "MINT")]
    Mint,
    #[serde(rename = "MANAGE")]
    Manage,
    #[serde(rename = "STAKE")]
    Stake,
    #[serde(rename = "WITHDRAW/PUBLISH/VOTE")]
    WithdrawPublishVote,
    #[serde(rename = "SPEND/MINT")]
    SpendMint,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Spend => "SPEND",
            Purpose::Mint => "MINT",
            Purpose::Manage => "MANAGE",
            Purpose::Stake => "STAKE",
            Purpose::WithdrawPublishVote => "WITHDRAW/PUBLISH/VOTE",
            Purpose::SpendMint => "SPEND/MINT",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptType {
    Plutus,
    Native,
    Timelock,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Defi,
    Marketplace,
    Collection,
    Gaming,
    Community,
    TokenDistribution,
    Stablecoin,
    MobileNetwork,
    Generic,
    SmartWallet,
    #[serde(rename = "LAYER_2")]
    Layer2,
    Blockchain,
    NftMintingPlatform,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubCategory {
    AmmDex,
    OrderbookDex,
    HybridDex,
    LendingBorrowing,
    Nft,
    Oracle,
    WrappedAssets,
    Dex,
    Charity,
    Staking,
    Perpetuals,
    Launchpad,
    DexAggregator,
    Mining,
    ConcentratedLiquidityDex,
    Synthetics,
    #[serde(rename = "OPTION")]
    OptionProtocol,
    StealthWallet,
    Unknown,
}

/// Parse a closed-enumeration label such as `"AMM_DEX"` or `"SPEND/MINT"`.
pub fn parse_label<T: DeserializeOwned>(label: &str) -> Option<T> {
    let de: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        label.trim().into_deserializer();
    T::deserialize(de).ok()
}

/// Enumeration field of a hand-edited document. A blank `""` is read and
/// written back as-is; only `Known` carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuratedLabel<T> {
    Absent,
    Blank,
    Known(T),
}

impl<T> Default for CuratedLabel<T> {
    fn default() -> Self {
        CuratedLabel::Absent
    }
}

impl<T> CuratedLabel<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, CuratedLabel::Absent)
    }
}

impl<T: Copy> CuratedLabel<T> {
    pub fn known(&self) -> Option<T> {
        match self {
            CuratedLabel::Known(value) => Some(*value),
            CuratedLabel::Absent | CuratedLabel::Blank => None,
        }
    }
}

impl<T> From<Option<T>> for CuratedLabel<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(CuratedLabel::Absent, CuratedLabel::Known)
    }
}

impl<T: Serialize> Serialize for CuratedLabel<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CuratedLabel::Known(value) => value.serialize(serializer),
            CuratedLabel::Blank => serializer.serialize_str(""),
            CuratedLabel::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for CuratedLabel<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None => Ok(CuratedLabel::Absent),
            Some("") => Ok(CuratedLabel::Blank),
            Some(label) => {
                let de: serde::de::value::StrDeserializer<'_, D::Error> = label.into_deserializer();
                T::deserialize(de).map(CuratedLabel::Known)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Description {
    #[serde(default)]
    pub short: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical, flat script record. One record per script hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub id: String,
    pub name: String,
    pub purpose: Purpose,
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    pub script_hash: String,
    pub full_script_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plutus_version: Option<u8>,
    /// Absent means protocol version 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical dApp document, serialized in field order
/// `id, projectName, link, twitter, category, subCategory, description, scripts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DApp {
    pub id: String,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "CuratedLabel::is_absent")]
    pub category: CuratedLabel<Category>,
    #[serde(default, skip_serializing_if = "CuratedLabel::is_absent")]
    pub sub_category: CuratedLabel<SubCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Description>,
    #[serde(default)]
    pub scripts: Vec<Script>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Display fields used to synthesize a new dApp shell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectProfile {
    pub project_name: String,
    pub link: String,
    pub twitter: String,
    pub category: Option<Category>,
    pub sub_category: Option<SubCategory>,
    pub description_short: String,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl DApp {
    /// New document with no scripts, carrying only the non-empty profile fields.
    pub fn from_profile(id: String, profile: &ProjectProfile) -> Self {
        DApp {
            id,
            project_name: profile.project_name.clone(),
            link: non_empty(&profile.link),
            twitter: non_empty(&profile.twitter),
            category: profile.category.into(),
            sub_category: profile.sub_category.into(),
            description: non_empty(&profile.description_short).map(|short| Description {
                short,
                extra: Map::new(),
            }),
            scripts: Vec::new(),
            extra: Map::new(),
        }
    }
}

// --- Legacy shapes ---

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LegacyDescription {
    #[serde(default)]
    pub short: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVersion {
    #[serde(default)]
    pub script_hash: Option<String>,
    #[serde(default, rename = "mintPolicyID")]
    pub mint_policy_id: Option<String>,
    #[serde(default)]
    pub full_script_hash: Option<String>,
}

impl LegacyVersion {
    /// The hash this version is keyed by: `scriptHash`, else `mintPolicyID`.
    pub fn hash(&self) -> Option<&str> {
        [self.script_hash.as_deref(), self.mint_policy_id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyScript {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default, rename = "type")]
    pub script_type: Option<String>,
    #[serde(default)]
    pub protocol_version: Option<u32>,
    #[serde(default)]
    pub versions: Vec<LegacyVersion>,
}

/// Pre-migration dApp document: one entry per script name, hashes nested in `versions`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDApp {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub description: Option<LegacyDescription>,
    #[serde(default)]
    pub scripts: Vec<LegacyScript>,
}

impl LegacyDApp {
    /// Profile carried by the legacy document. Unrecognized category labels are dropped.
    pub fn profile(&self, fallback_name: &str) -> ProjectProfile {
        let project_name = self
            .project_name
            .as_deref()
            .and_then(non_empty)
            .unwrap_or_else(|| fallback_name.to_string());
        let category = self.category.as_deref().and_then(|c| {
            let parsed = parse_label::<Category>(c);
            if parsed.is_none() && !c.trim().is_empty() {
                tracing::warn!(project = %project_name, category = c, "dropping unknown category");
            }
            parsed
        });
        let sub_category = self.sub_category.as_deref().and_then(|c| {
            let parsed = parse_label::<SubCategory>(c);
            if parsed.is_none() && !c.trim().is_empty() {
                tracing::warn!(project = %project_name, sub_category = c, "dropping unknown subCategory");
            }
            parsed
        });
        ProjectProfile {
            project_name,
            link: self.link.clone().unwrap_or_default(),
            twitter: self.twitter.clone().unwrap_or_default(),
            category,
            sub_category,
            description_short: self
                .description
                .as_ref()
                .and_then(|d| d.short.clone())
                .unwrap_or_default(),
        }
    }
}

/// One data row of a tabular source (`dex,class,script_hash`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// Label of the file the row came from, e.g. `orders`.
    pub source: String,
    /// 1-based line number within the source file.
    pub line: usize,
    pub dex: String,
    pub class: String,
    pub script_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_labels_round_trip_through_serde() {
        let p: Purpose = serde_json::from_str("\"WITHDRAW/PUBLISH/VOTE\"").unwrap();
        assert_eq!(p, Purpose::WithdrawPublishVote);
        assert_eq!(serde_json::to_string(&Purpose::SpendMint).unwrap(), "\"SPEND/MINT\"");
        assert_eq!(parse_label::<Purpose>("MINT"), Some(Purpose::Mint));
        assert_eq!(parse_label::<Purpose>("BURN"), None);
    }

    #[test]
    fn category_labels_parse() {
        assert_eq!(parse_label::<Category>("LAYER_2"), Some(Category::Layer2));
        assert_eq!(parse_label::<SubCategory>("AMM_DEX"), Some(SubCategory::AmmDex));
        assert_eq!(parse_label::<Category>("defi"), None);
    }

    #[test]
    fn dapp_serializes_in_stable_field_order_and_omits_empty() {
        let profile = ProjectProfile {
            project_name: "Minswap".to_string(),
            link: "https://minswap.org".to_string(),
            category: Some(Category::Defi),
            ..Default::default()
        };
        let dapp = DApp::from_profile("01FzMcJJ".to_string(), &profile);
        let json = serde_json::to_string(&dapp).unwrap();
        assert_eq!(
            json,
            r#"{"id":"01FzMcJJ","projectName":"Minswap","link":"https://minswap.org","category":"DEFI","scripts":[]}"#
        );
    }

    #[test]
    fn dapp_keeps_unknown_fields_and_blank_category() {
        let raw = r#"{"id":"x","projectName":"P","category":"","audits":[1],"scripts":[]}"#;
        let dapp: DApp = serde_json::from_str(raw).unwrap();
        assert_eq!(dapp.category, CuratedLabel::Blank);
        assert_eq!(dapp.category.known(), None);
        assert_eq!(dapp.sub_category, CuratedLabel::Absent);
        assert_eq!(dapp.extra.get("audits"), Some(&serde_json::json!([1])));
        let back = serde_json::to_value(&dapp).unwrap();
        assert_eq!(back["audits"], serde_json::json!([1]));
        assert_eq!(back["category"], "");
        assert!(back.get("subCategory").is_none());
    }

    #[test]
    fn script_omits_protocol_version_when_absent() {
        let script = Script {
            id: "rdgd7meb".to_string(),
            name: "Pool".to_string(),
            purpose: Purpose::Spend,
            script_type: ScriptType::Plutus,
            script_hash: "ab".repeat(28),
            full_script_hash: format!("71{}", "ab".repeat(28)),
            plutus_version: Some(2),
            protocol_version: None,
            extra: Map::new(),
        };
        let v = serde_json::to_value(&script).unwrap();
        assert_eq!(v["type"], "PLUTUS");
        assert_eq!(v["plutusVersion"], 2);
        assert!(v.get("protocolVersion").is_none());
    }

    #[test]
    fn legacy_version_prefers_script_hash_then_policy_id() {
        let v: LegacyVersion =
            serde_json::from_str(r#"{"mintPolicyID":"bb","scriptHash":""}"#).unwrap();
        assert_eq!(v.hash(), Some("bb"));
        let v: LegacyVersion =
            serde_json::from_str(r#"{"mintPolicyID":"bb","scriptHash":"aa"}"#).unwrap();
        assert_eq!(v.hash(), Some("aa"));
        assert_eq!(LegacyVersion::default().hash(), None);
    }

    #[test]
    fn legacy_profile_drops_unknown_category() {
        let legacy: LegacyDApp = serde_json::from_str(
            r#"{"projectName":"Old","category":"WEIRD","subCategory":"AMM_DEX","description":{"short":"hi"}}"#,
        )
        .unwrap();
        let profile = legacy.profile("Old.json");
        assert_eq!(profile.project_name, "Old");
        assert_eq!(profile.category, None);
        assert_eq!(profile.sub_category, Some(SubCategory::AmmDex));
        assert_eq!(profile.description_short, "hi");
    }
}
