//! `ironjudge init`: write a default config file.

use std::path::Path;

use anyhow::{Context, bail};
use ironjudge_config::AppConfig;

pub fn run(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config_path.map_or_else(AppConfig::config_path, Path::to_path_buf);
    write_default(&path, force)?;

    println!("Wrote default config to {}", path.display());
    println!("Set OPENAI_API_KEY (or api_key in the file) and run:");
    println!("  ironjudge run \"<objective>\"");
    Ok(())
}

fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))
}
