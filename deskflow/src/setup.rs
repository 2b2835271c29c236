//! Startup assembly: MCP connections, role agents, supervisor, generalist.

use crate::config::{AgentsConfig, Cli, McpServerSpec};
use crate::prompts;
use anyhow::Context;
use deskflow_agent::{AgentBuilder, ApprovalPolicy};
use deskflow_core::{GenerateConfig, Llm, Tool};
use deskflow_graph::{Graph, MemoryCheckpointer};
use deskflow_model::GeminiModel;
use deskflow_rag::{PineconeIndex, RagConfig, build_rag_graph, rag_search_tool};
use deskflow_skill::{SkillCatalog, load_skill_tool};
use deskflow_tool::{AgentTool, McpToolset, filter_tools};
use rmcp::ServiceExt;
use rmcp::transport::TokioChildProcess;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

/// Generation settings used by every agent.
fn generate_config() -> GenerateConfig {
    GenerateConfig {
        temperature: Some(0.4),
        top_p: Some(1.0),
        top_k: Some(32),
        max_output_tokens: None,
        response_schema: None,
    }
}

/// Connect every configured MCP server and collect the exposed tools.
pub async fn connect_mcp_tools(servers: &[McpServerSpec]) -> anyhow::Result<Vec<Arc<dyn Tool>>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

    for spec in servers {
        let mut command = Command::new(&spec.command);
        command.args(&spec.args);

        let client = ()
            .serve(
                TokioChildProcess::new(command)
                    .with_context(|| format!("spawning MCP server '{}'", spec.name))?,
            )
            .await
            .with_context(|| format!("initializing MCP server '{}'", spec.name))?;

        let toolset = McpToolset::new(client).with_name(&spec.name);
        let discovered = toolset
            .tools()
            .await
            .with_context(|| format!("listing tools from MCP server '{}'", spec.name))?;

        info!(server = %spec.name, tools = discovered.len(), "connected MCP server");
        tools.extend(discovered);
    }

    Ok(tools)
}

/// Approval policy over the subset of `tool_names` present in the config.
fn policy_for(approval: &HashMap<String, String>, tool_names: &[String]) -> ApprovalPolicy {
    let mut policy = ApprovalPolicy::new();
    for name in tool_names {
        if let Some(description) = approval.get(name) {
            policy = policy.guard(name, description);
        }
    }
    policy
}

fn names_of(tools: &[Arc<dyn Tool>]) -> Vec<String> {
    tools.iter().map(|t| t.name().to_string()).collect()
}

/// One specialized role agent, runnable standalone via an [`AgentTool`].
fn role_agent(
    name: &str,
    model: Arc<dyn Llm>,
    prompt: &str,
    tools: Vec<Arc<dyn Tool>>,
) -> deskflow_graph::Result<Arc<Graph>> {
    Ok(Arc::new(
        AgentBuilder::new(name, model)
            .system_prompt(prompt)
            .tools(tools)
            .generate_config(generate_config())
            .build()?,
    ))
}

pub struct Agents {
    pub supervisor: Arc<Graph>,
    pub single: Arc<Graph>,
}

/// Build the supervisor and single-agent graphs from the flat tool list.
pub fn build_agents(
    cli: &Cli,
    config: &AgentsConfig,
    tools: Vec<Arc<dyn Tool>>,
) -> anyhow::Result<Agents> {
    let model: Arc<dyn Llm> =
        Arc::new(GeminiModel::new(&cli.gemini_api_key, &cli.gemini_model));

    // --- sub-agents and the supervisor -----------------------------------
    let ask = role_agent(
        "ask_agent",
        model.clone(),
        prompts::ASK_AGENT_PROMPT,
        filter_tools(&tools, &config.roles.ask),
    )?;
    let create = role_agent(
        "create_agent",
        model.clone(),
        prompts::CREATE_AGENT_PROMPT,
        filter_tools(&tools, &config.roles.create),
    )?;
    let modify = role_agent(
        "modify_agent",
        model.clone(),
        prompts::MODIFY_AGENT_PROMPT,
        filter_tools(&tools, &config.roles.modify),
    )?;

    let dispatch_tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AgentTool::new("ask_agents", prompts::ASK_AGENTS_TOOL_DESC, ask)),
        Arc::new(AgentTool::new("create_agents", prompts::CREATE_AGENTS_TOOL_DESC, create)),
        Arc::new(AgentTool::new("modify_agents", prompts::MODIFY_AGENTS_TOOL_DESC, modify)),
    ];

    let supervisor_policy = policy_for(&config.approval, &names_of(&dispatch_tools));
    let supervisor = Arc::new(
        AgentBuilder::new("supervisor", model.clone())
            .system_prompt(prompts::SUPERVISOR_PROMPT)
            .tools(dispatch_tools)
            .approval(supervisor_policy)
            .generate_config(generate_config())
            .checkpointer(Arc::new(MemoryCheckpointer::new()))
            .build()?,
    );

    // --- the generalist single agent -------------------------------------
    let mut single_tools = tools;

    match (&cli.pinecone_api_key, &cli.pinecone_index_host) {
        (Some(api_key), Some(host)) => {
            let index =
                Arc::new(PineconeIndex::new(api_key, host, &cli.pinecone_namespace));
            let rag_graph = Arc::new(build_rag_graph(
                model.clone(),
                index,
                RagConfig {
                    max_rewrite_iterations: cli.max_rewrite_iterations,
                    ..Default::default()
                },
            )?);
            single_tools.push(rag_search_tool(rag_graph));
        }
        _ => warn!("Pinecone not configured; rag_search is disabled"),
    }

    let catalog = match SkillCatalog::load(&cli.skills_dir) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!(dir = %cli.skills_dir.display(), error = %e, "failed to load skills");
            SkillCatalog::default()
        }
    };

    let mut single_builder = AgentBuilder::new("assistant", model)
        .system_prompt(prompts::SINGLE_AGENT_PROMPT)
        .generate_config(generate_config())
        .checkpointer(Arc::new(MemoryCheckpointer::new()));

    if !catalog.is_empty() {
        let catalog = Arc::new(catalog);
        single_tools.push(load_skill_tool(catalog.clone()));
        single_builder = single_builder.middleware(catalog.middleware());
    }

    let single_policy = policy_for(&config.approval, &names_of(&single_tools));
    let single =
        Arc::new(single_builder.tools(single_tools).approval(single_policy).build()?);

    Ok(Agents { supervisor, single })
}
