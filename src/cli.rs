//! CLI struct definitions for the `dapp-registry` command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::core::output::OutputFormat;
use crate::plugins::import::ImportCli;
use crate::plugins::migrate::MigrateCli;
use crate::plugins::validate::ValidateCli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "dapp-registry",
    version = env!("CARGO_PKG_VERSION"),
    about = "Maintain the canonical registry of Cardano dApp smart-contract scripts.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// Path to the registry configuration file.
    #[clap(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug)]
#[clap(group(clap::ArgGroup::new("input").required(true).args(["hash", "name"])))]
pub(crate) struct IdsCli {
    /// Script hash to derive a script id from.
    #[clap(long)]
    pub hash: Option<String>,
    /// Project name to derive a dApp id from.
    #[clap(long)]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Import tabular sources, classify each script, and merge into the registry
    Import(ImportCli),
    /// Convert legacy nested documents into the flat registry format
    Migrate(MigrateCli),
    /// Check registry documents for id, hash and duplicate problems
    Validate(ValidateCli),
    /// Print the deterministic id for a script hash or project name
    Ids(IdsCli),
    /// Print the version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dapp-registry",
            "import",
            "orders.csv",
            "--format",
            "json",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        let Command::Import(import) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(import.sources, vec![PathBuf::from("orders.csv")]);
    }

    #[test]
    fn ids_requires_an_input() {
        assert!(Cli::try_parse_from(["dapp-registry", "ids"]).is_err());
        assert!(Cli::try_parse_from(["dapp-registry", "ids", "--name", "Minswap"]).is_ok());
    }
}
