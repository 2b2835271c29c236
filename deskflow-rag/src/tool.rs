//! `rag_search`: the retrieval graph exposed as an agent tool.

use crate::graph::{ANSWER_CHANNEL, QUERY_CHANNEL};
use deskflow_core::{DeskError, Tool};
use deskflow_graph::{Graph, RunConfig, State};
use deskflow_tool::FunctionTool;
use serde_json::{Value, json};
use std::sync::Arc;

/// Each search runs the graph on a throwaway thread; the knowledge base is
/// stateless from the agent's point of view.
pub fn rag_search_tool(graph: Arc<Graph>) -> Arc<dyn Tool> {
    Arc::new(
        FunctionTool::new(
            "rag_search",
            "Answer questions by searching the knowledge base. Retrieves relevant documents \
             and generates an answer based on them.",
            move |args: Value| {
                let graph = graph.clone();
                async move {
                    let query = args
                        .get("query")
                        .and_then(Value::as_str)
                        .ok_or_else(|| DeskError::Tool("query is required".to_string()))?;

                    let mut input = State::new();
                    input.insert(QUERY_CHANNEL.to_string(), json!(query));

                    let thread_id = format!("rag-{}", uuid::Uuid::new_v4());
                    let out = graph
                        .invoke(input, RunConfig::new(&thread_id))
                        .await
                        .map_err(|e| DeskError::Retrieval(e.to_string()))?;

                    let answer = out
                        .get(ANSWER_CHANNEL)
                        .and_then(Value::as_str)
                        .unwrap_or("No answer produced")
                        .to_string();
                    Ok(json!({ "answer": answer }))
                }
            },
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to look up in the knowledge base"
                }
            },
            "required": ["query"]
        })),
    )
}
