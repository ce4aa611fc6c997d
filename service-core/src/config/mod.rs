//! Shared service configuration.
//!
//! Settings are layered: an optional `configuration` file first, then
//! `APP__`-prefixed environment variables (`APP__PORT=8085`), which win.
//! Service crates wrap this common core with their own env-driven
//! sections (database, log level) in their `config` module.

use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Port the HTTP listener binds when none is configured. Tests bind port 0
/// to get an ephemeral one.
pub const DEFAULT_PORT: u16 = 8080;

/// Settings shared by every service in the workspace.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Config {
    /// Load the layered configuration. Missing file and missing variables
    /// are fine; only unparseable values are an error.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
