mod config;
mod prompts;
mod setup;

use anyhow::Context;
use clap::Parser;
use config::{AgentsConfig, Cli};
use deskflow_server::{ServerConfig, create_app};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let agents_config = AgentsConfig::load(&cli.agents_config)?;

    let tools = setup::connect_mcp_tools(&agents_config.servers).await?;
    info!(tools = tools.len(), "tool discovery complete");

    let agents = setup::build_agents(&cli, &agents_config, tools)?;
    let app = create_app(agents.supervisor, agents.single, ServerConfig::default());

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "deskflow listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
