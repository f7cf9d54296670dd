pub mod check;
pub mod init;
pub mod run;
pub mod serve;
pub mod tools;

use std::path::Path;

use anyhow::Context;
use ironjudge_config::AppConfig;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("Failed to load config")
}
