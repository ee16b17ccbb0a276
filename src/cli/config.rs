//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliOutputFormat};
use crate::{config::PureBgConfig, services::MatteFormat};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to `PureBgConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `PureBgConfig` from CLI arguments
    ///
    /// Without `--api-key` the key stays unresolved and is read from the
    /// environment when the request is made.
    pub(crate) fn from_cli(cli: &Cli) -> Result<PureBgConfig> {
        let mut builder = PureBgConfig::builder()
            .model(cli.model.clone())
            .endpoint(cli.endpoint.clone())
            .white_threshold(cli.threshold)
            .output_format(Self::output_format(cli.format))
            .request_timeout(Duration::from_secs(cli.timeout));

        if let Some(key) = &cli.api_key {
            builder = builder.api_key(key.clone());
        }

        builder.build().context("Invalid configuration")
    }

    fn output_format(format: CliOutputFormat) -> MatteFormat {
        match format {
            CliOutputFormat::Png => MatteFormat::Png,
            #[cfg(feature = "webp-support")]
            CliOutputFormat::Webp => MatteFormat::WebP,
            CliOutputFormat::Tiff => MatteFormat::Tiff,
        }
    }
}
