//! dApp registry: a canonical, flat registry of Cardano dApp smart-contract scripts.
//!
//! Each dApp lives in one JSON document (`<registry_dir>/<Project>.json`)
//! listing its Plutus scripts with deterministic ids. Two drivers feed it:
//!
//! - `migrate` converts legacy documents whose scripts nest hashes under
//!   `versions`.
//! - `import` reads tabular `dex,class,script_hash` sources and names each
//!   script through the metadata side-table (`metadata-mapping.json`).
//!
//! Both classify every hash against the chain-index mirror (a SQLite `script`
//! table), keep only Plutus scripts, and merge without ever replacing or
//! duplicating an entry already in the registry.
//!
//! # Examples
//!
//! ```bash
//! # Import the default sources listed in registry.toml
//! dapp-registry import
//!
//! # Migrate legacy documents into a scratch directory
//! dapp-registry migrate --source dApps --target /tmp/dApps_v2
//!
//! # Check the registry
//! dapp-registry validate --format json
//!
//! # Derive ids
//! dapp-registry ids --name Minswap
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: ids, data model, resolver, metadata, flatten/merge, persistence
//! - [`plugins`]: command drivers (import, migrate, validate)

pub mod core;
pub mod plugins;

mod cli;

use crate::cli::{Cli, Command, IdsCli};
use crate::core::config::RegistryConfig;
use crate::core::error::RegistryError;
use crate::core::{flatten, ids};
use crate::core::output::{self, OutputFormat};
use crate::plugins::{import, migrate, validate};

use clap::Parser;
use serde::Serialize;

#[derive(Serialize)]
struct IdsOutput {
    input: String,
    kind: &'static str,
    id: String,
}

/// Id for `--hash` (normalized like imported hashes) or `--name`.
fn derive_id(ids_cli: &IdsCli) -> Result<IdsOutput, RegistryError> {
    match (&ids_cli.hash, &ids_cli.name) {
        (Some(hash), _) => {
            let normalized = flatten::normalize_hash(hash)?;
            Ok(IdsOutput {
                id: ids::script_id(&normalized),
                input: normalized,
                kind: "script",
            })
        }
        (None, Some(name)) => Ok(IdsOutput {
            input: name.clone(),
            kind: "dapp",
            id: ids::project_id(name),
        }),
        (None, None) => Err(RegistryError::InvalidInput(
            "either --hash or --name is required".to_string(),
        )),
    }
}

fn print_ids(ids_cli: &IdsCli, format: OutputFormat) -> Result<(), RegistryError> {
    let out = derive_id(ids_cli)?;
    match format {
        OutputFormat::Json => output::print_json(&out),
        OutputFormat::Text => {
            println!("{}", out.id);
            Ok(())
        }
    }
}

pub fn run() -> Result<(), RegistryError> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Ids(ids_cli) => return print_ids(ids_cli, cli.format),
        _ => {}
    }

    let config = RegistryConfig::load(&cli.config)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.command {
        Command::Import(import_cli) => {
            let report = import::run_import_cli(&import_cli, &config)?;
            output::print_run_report(&report, cli.format)?;
        }
        Command::Migrate(migrate_cli) => {
            let report = migrate::run_migrate_cli(&migrate_cli, &config)?;
            output::print_run_report(&report, cli.format)?;
        }
        Command::Validate(validate_cli) => {
            let dir = validate_cli
                .dir
                .clone()
                .unwrap_or_else(|| config.paths.registry_dir.clone());
            validate::run_validate(&dir, &config.paths.metadata, cli.format)?;
        }
        Command::Ids(_) | Command::Version => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_for(hash: Option<&str>, name: Option<&str>) -> Result<IdsOutput, RegistryError> {
        derive_id(&IdsCli {
            hash: hash.map(str::to_string),
            name: name.map(str::to_string),
        })
    }

    #[test]
    fn hash_ids_match_imported_scripts() {
        let hash = "ab".repeat(28);
        let plain = ids_for(Some(&hash), None).unwrap();
        let tagged = ids_for(Some(&format!("71{}", hash.to_ascii_uppercase())), None).unwrap();
        assert_eq!(plain.id, ids::script_id(&hash));
        assert_eq!(tagged.id, plain.id);
        assert_eq!(tagged.input, hash);
    }

    #[test]
    fn short_or_non_hex_hash_is_rejected() {
        assert!(ids_for(Some("abcdef"), None).is_err());
        assert!(ids_for(Some(&"zz".repeat(28)), None).is_err());
    }

    #[test]
    fn name_ids_use_project_scheme() {
        assert_eq!(ids_for(None, Some("Minswap")).unwrap().id, "01FzMcJJ");
    }
}
