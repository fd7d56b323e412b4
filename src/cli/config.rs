//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ApiKey, ClientConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Convert CLI arguments to a `ClientConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `ClientConfig` from CLI arguments layered over the environment
    pub(crate) fn from_cli(cli: &Cli) -> Result<ClientConfig> {
        let base = ClientConfig::from_env().context("Invalid environment configuration")?;
        Self::from_cli_with_base(cli, base)
    }

    /// Layer CLI arguments over an existing configuration
    pub(crate) fn from_cli_with_base(cli: &Cli, base: ClientConfig) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder().endpoint(
            cli.api_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(base.endpoint),
        );

        let api_key = cli
            .api_key
            .as_deref()
            .or(base.api_key.as_ref().map(ApiKey::expose));
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }

        if let Some(timeout) = cli.timeout_secs.map(Duration::from_secs).or(base.timeout) {
            builder = builder.timeout(timeout);
        }

        builder.build().context("Invalid configuration")
    }

    /// Directory downloads are written to
    pub(crate) fn output_dir(cli: &Cli) -> PathBuf {
        cli.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
