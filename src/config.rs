use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use serde::Deserialize;

use crate::cli::Cli;

/// Immutable run configuration, built once at startup.
///
/// Everything downstream (token issuer, dispatcher, HTTP client) borrows
/// from this struct; nothing reads arguments or the environment after load.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Milliseconds between sends.
    pub interval: u64,
    /// Path of the JSON array of messages.
    pub file: PathBuf,
    pub verbose: bool,
    /// Re-append consumed messages and cycle forever.
    pub repeat: bool,
    /// Target channel id.
    pub channel: String,
    /// Extension owner id, signed into each token as `user_id`.
    pub owner: String,
    /// Extension client id, sent as the `Client-Id` header.
    pub extension: String,
    /// Extension secret, base64 encoded.
    pub secret: String,
}

impl Config {
    /// Merge defaults, `BROADCASTER_*` environment variables, and CLI
    /// arguments (highest precedence) into one configuration.
    ///
    /// `file`, `secret`, and `extension` have no default; loading fails if
    /// neither the environment nor the CLI supplies them.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        Self::load_with_sources(cli, None)
    }

    fn load_with_sources(
        cli: &Cli,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::set_defaults()?;
        // If env_vars is provided, we use it instead of system environment
        // to avoid variable pollution across tests.
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            builder = builder.add_source(Environment::with_prefix("BROADCASTER"));
        }
        builder = Self::apply_cli(builder, cli)?;

        builder.build()?.try_deserialize()
    }

    fn set_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("interval", 1000_i64)?
            .set_default("verbose", false)?
            .set_default("repeat", false)?
            .set_default("channel", "173220974")?
            .set_default("owner", "173220974")
    }

    fn apply_cli(
        mut builder: ConfigBuilder<DefaultState>,
        cli: &Cli,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        if let Some(interval) = cli.interval {
            builder = builder.set_override("interval", interval as i64)?;
        }
        if let Some(file) = &cli.file {
            builder = builder.set_override("file", file.to_string_lossy().into_owned())?;
        }
        // Flags can only switch these on; unset means "use env or default".
        if cli.verbose {
            builder = builder.set_override("verbose", true)?;
        }
        if cli.repeat {
            builder = builder.set_override("repeat", true)?;
        }
        if let Some(channel) = &cli.channel {
            builder = builder.set_override("channel", channel.as_str())?;
        }
        if let Some(owner) = &cli.owner {
            builder = builder.set_override("owner", owner.as_str())?;
        }
        if let Some(extension) = &cli.extension {
            builder = builder.set_override("extension", extension.as_str())?;
        }
        if let Some(secret) = &cli.secret {
            builder = builder.set_override("secret", secret.as_str())?;
        }
        Ok(builder)
    }
}
