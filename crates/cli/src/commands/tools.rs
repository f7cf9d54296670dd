//! `ironjudge tools`: print the catalog exactly as the model sees it.

use std::path::Path;
use std::sync::Arc;

use ironjudge_agent::prompt::render_catalog;
use ironjudge_memory::InMemoryVectorStore;
use ironjudge_tools::default_registry;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let registry = default_registry(
        &config,
        None,
        Arc::new(InMemoryVectorStore::new(config.memory.dimensions)),
    );

    println!("Registered tools ({}):\n", registry.len());
    println!("{}", render_catalog(&registry.describe_all()));
    Ok(())
}
