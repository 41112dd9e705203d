use anyhow::Context;
use dapp_registry::core::error::RegistryError;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn with_cli_context(result: Result<(), RegistryError>) -> anyhow::Result<()> {
    result.context("dapp-registry failed")
}

fn main() -> anyhow::Result<()> {
    init_logging();
    with_cli_context(dapp_registry::run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_keep_their_cause() {
        let err = with_cli_context(Err(RegistryError::ConfigError(
            "missing required configuration: resolver.database".to_string(),
        )))
        .unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "dapp-registry failed: Configuration error: missing required configuration: resolver.database"
        );
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::ConfigError(_))
        ));
    }

    #[test]
    fn success_passes_through() {
        assert!(with_cli_context(Ok(())).is_ok());
    }
}
