//! `ironjudge serve`: start the HTTP/SSE gateway.

use std::path::Path;

use anyhow::anyhow;
use tracing::info;

pub async fn run(config_path: Option<&Path>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        anyhow::bail!("No API key found. Set OPENAI_API_KEY or IRONJUDGE_API_KEY.");
    }

    println!(
        "IronJudge gateway listening on http://{}:{}",
        config.gateway.host, config.gateway.port
    );
    println!("  POST /api/v1/judge/execute   (SSE telemetry)");
    println!("  GET  /api/v1/tools");
    println!("  GET  /api/v1/status");
    info!(model = %config.model, "Starting gateway");

    ironjudge_gateway::start(config)
        .await
        .map_err(|e| anyhow!("Gateway failed: {e}"))
}
