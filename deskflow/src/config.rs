//! Process configuration: CLI flags with environment fallbacks, plus the
//! agents TOML (MCP servers, role tool allow-lists, approval gates).

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "deskflow", about = "Multi-agent customer-support assistant")]
pub struct Cli {
    #[arg(long, env = "DESKFLOW_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(long, env = "DESKFLOW_PORT", default_value_t = 2707)]
    pub port: u16,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    #[arg(long, env = "GEMINI_MODEL_NAME", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_index_host: Option<String>,

    #[arg(long, env = "PINECONE_NAMESPACE", default_value = "default")]
    pub pinecone_namespace: String,

    /// Rewrite budget of the RAG loop before it generates regardless.
    #[arg(long, env = "DESKFLOW_MAX_REWRITES", default_value_t = 3)]
    pub max_rewrite_iterations: i64,

    #[arg(long, env = "DESKFLOW_SKILLS_DIR", default_value = "skills")]
    pub skills_dir: PathBuf,

    #[arg(long, env = "DESKFLOW_AGENTS_CONFIG", default_value = "agents.toml")]
    pub agents_config: PathBuf,
}

/// The agents TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    #[serde(default)]
    pub servers: Vec<McpServerSpec>,
    pub roles: RoleTools,
    /// Sensitive tool name to the description shown when approval is
    /// requested. Applies to whichever agent ends up holding the tool.
    #[serde(default)]
    pub approval: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpServerSpec {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Tool allow-list per agent role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleTools {
    pub ask: Vec<String>,
    pub create: Vec<String>,
    pub modify: Vec<String>,
}

impl AgentsConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading agents config {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("parsing agents config {}", path.display()))
    }
}
