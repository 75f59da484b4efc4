//! CLI configuration loading

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use nutrilabel_http::ClientConfig;
use std::path::Path;

/// Environment variable prefix, e.g. `NUTRILABEL_BASE_URL`
pub const ENV_PREFIX: &str = "NUTRILABEL";

/// Load client configuration
///
/// Sources, later ones winning: built-in defaults, the optional config file,
/// `NUTRILABEL_*` environment variables.
pub fn load_client_config(path: Option<&Path>) -> Result<ClientConfig> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .ignore_empty(true),
    );

    builder
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")
}
