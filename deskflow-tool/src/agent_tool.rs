//! AgentTool: expose a compiled agent graph as a callable tool.
//!
//! The supervisor's "sub-agents" are exactly this: each specialized agent
//! graph wrapped as a tool the supervisor's model can invoke. Every call
//! runs on a throwaway thread, so sub-agent invocations carry no history of
//! their own; context travels in the query text the supervisor writes.

use async_trait::async_trait;
use deskflow_core::{DeskError, Result, Tool, transcript};
use deskflow_graph::{Graph, RunConfig};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

pub struct AgentTool {
    name: String,
    description: String,
    graph: Arc<Graph>,
}

impl AgentTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, graph: Arc<Graph>) -> Self {
        Self { name: name.into(), description: description.into(), graph }
    }

    fn extract_query(&self, args: &Value) -> String {
        if let Some(query) = args.get("query").and_then(Value::as_str) {
            return query.to_string();
        }
        match args {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": format!("The request to hand to the {} agent", self.name)
                }
            },
            "required": ["query"]
        }))
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let query = self.extract_query(&args);
        let thread_id = format!("{}-{}", self.name, uuid::Uuid::new_v4());
        debug!(agent = %self.name, %thread_id, "dispatching to sub-agent");

        let state = self
            .graph
            .invoke(transcript::user_turn(&query), RunConfig::new(&thread_id))
            .await
            .map_err(|e| DeskError::Agent(format!("sub-agent '{}' failed: {e}", self.name)))?;

        let answer = transcript::final_model_text(&state)
            .unwrap_or_else(|| "No response from agent".to_string());
        Ok(json!({ "response": answer }))
    }
}
