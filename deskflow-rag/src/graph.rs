//! The self-correcting retrieval graph:
//! `rewrite → retrieve → grade → {generate | rewrite}`.
//!
//! The first pass uses the original query unchanged; every later pass asks
//! the model for a better phrasing. Grading is an LLM judgment with two
//! deterministic guards in front of it: the iteration cap forces generation
//! (fail-open, the loop always terminates with an answer) and an empty
//! retrieval forces another rewrite.

use crate::index::VectorIndex;
use deskflow_core::{Content, Llm, LlmRequest, Result as CoreResult};
use deskflow_graph::prelude::*;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const QUERY_CHANNEL: &str = "query";
pub const DOCS_CHANNEL: &str = "retrieved_docs";
pub const ITERATIONS_CHANNEL: &str = "iteration_count";
pub const ANSWER_CHANNEL: &str = "final_answer";
const ROUTE_CHANNEL: &str = "route";

const REWRITE_PROMPT: &str = "Rephrase the following question so a semantic search over a \
support knowledge base is more likely to find relevant documents. Reply with the rephrased \
question only.\n\nQuestion: {question}";

const GRADE_PROMPT: &str = "You are grading retrieved documents for relevance to a question. \
Question: {question}\n\nDocuments:\n{context}\n\nAnswer with JSON: {\"binary_score\": \"yes\"} \
if the documents contain information relevant to answering the question, otherwise \
{\"binary_score\": \"no\"}.";

const GENERATE_PROMPT: &str = "Answer the question using the retrieved context. If the context \
does not contain the answer, say what is known and note the gap.\n\nQuestion: {question}\n\n\
Context:\n{context}";

#[derive(Clone, Debug)]
pub struct RagConfig {
    pub top_k: usize,
    /// Rewrite budget; generation is forced once iterations reach it.
    pub max_rewrite_iterations: i64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { top_k: 10, max_rewrite_iterations: 3 }
    }
}

/// One unary model call, text in/text out.
async fn complete_text(model: &Arc<dyn Llm>, prompt: String) -> CoreResult<String> {
    let req = LlmRequest::new(model.name(), vec![Content::user(prompt)]);
    let mut stream = model.generate(req, false).await?;
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        if let Some(content) = chunk?.content {
            text.push_str(&content.text());
        }
    }
    Ok(text)
}

fn joined_docs(ctx: &NodeContext) -> String {
    ctx.get(DOCS_CHANNEL)
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("\n")
        })
        .unwrap_or_default()
}

pub fn build_rag_graph(
    model: Arc<dyn Llm>,
    index: Arc<dyn VectorIndex>,
    config: RagConfig,
) -> Result<Graph> {
    let schema = StateSchema::new([
        Channel::value(QUERY_CHANNEL),
        Channel::list(DOCS_CHANNEL),
        Channel::counter(ITERATIONS_CHANNEL),
        Channel::value(ANSWER_CHANNEL),
        Channel::value(ROUTE_CHANNEL),
    ]);

    let rewrite_model = model.clone();
    let grade_model = model.clone();
    let generate_model = model;
    let grade_config = config.clone();

    GraphBuilder::new(schema)
        .node_fn("rewrite", move |ctx| {
            let model = rewrite_model.clone();
            async move {
                let iteration = ctx.get_i64(ITERATIONS_CHANNEL).unwrap_or(0);
                // First pass: the original query goes through untouched.
                if iteration == 0 {
                    return Ok(StepUpdate::new().set(ITERATIONS_CHANNEL, json!(1)));
                }

                let question = ctx.get_str(QUERY_CHANNEL).unwrap_or_default().to_string();
                let rewritten =
                    complete_text(&model, REWRITE_PROMPT.replace("{question}", &question))
                        .await
                        .map_err(GraphError::Core)?;
                debug!(iteration, "rewrote query");

                Ok(StepUpdate::new()
                    .set(QUERY_CHANNEL, json!(rewritten.trim()))
                    .set(ITERATIONS_CHANNEL, json!(1)))
            }
        })
        .node_fn("retrieve", {
            let index = index.clone();
            let top_k = config.top_k;
            move |ctx| {
                let index = index.clone();
                async move {
                    let query = ctx.get_str(QUERY_CHANNEL).unwrap_or_default().to_string();
                    let docs = index.search(&query, top_k).await.map_err(GraphError::Core)?;
                    let texts: Vec<Value> = docs.into_iter().map(|d| json!(d.text)).collect();
                    Ok(StepUpdate::new().set(DOCS_CHANNEL, Value::Array(texts)))
                }
            }
        })
        .node_fn("grade", move |ctx| {
            let model = grade_model.clone();
            let config = grade_config.clone();
            async move {
                let iteration = ctx.get_i64(ITERATIONS_CHANNEL).unwrap_or(0);
                if iteration >= config.max_rewrite_iterations {
                    debug!(iteration, "rewrite budget spent, generating anyway");
                    return Ok(StepUpdate::new().set(ROUTE_CHANNEL, json!("generate")));
                }

                let context = joined_docs(&ctx);
                if context.is_empty() {
                    return Ok(StepUpdate::new().set(ROUTE_CHANNEL, json!("rewrite")));
                }

                let question = ctx.get_str(QUERY_CHANNEL).unwrap_or_default();
                let prompt = GRADE_PROMPT
                    .replace("{question}", question)
                    .replace("{context}", &context);

                let req = LlmRequest::new(model.name(), vec![Content::user(prompt)])
                    .with_response_schema(json!({
                        "type": "object",
                        "properties": {
                            "binary_score": {"type": "string", "enum": ["yes", "no"]}
                        },
                        "required": ["binary_score"]
                    }));

                let mut stream = model.generate(req, false).await.map_err(GraphError::Core)?;
                let mut text = String::new();
                while let Some(chunk) = stream.next().await {
                    if let Some(content) = chunk.map_err(GraphError::Core)?.content {
                        text.push_str(&content.text());
                    }
                }

                let relevant = match serde_json::from_str::<Value>(text.trim()) {
                    Ok(verdict) => verdict["binary_score"] == json!("yes"),
                    Err(e) => {
                        // Unparseable judgment: fail open to generation.
                        warn!(error = %e, "grade output was not valid JSON");
                        true
                    }
                };

                let route = if relevant { "generate" } else { "rewrite" };
                debug!(iteration, route, "graded retrieval");
                Ok(StepUpdate::new().set(ROUTE_CHANNEL, json!(route)))
            }
        })
        .node_fn("generate", move |ctx| {
            let model = generate_model.clone();
            async move {
                let question = ctx.get_str(QUERY_CHANNEL).unwrap_or_default();
                let prompt = GENERATE_PROMPT
                    .replace("{question}", question)
                    .replace("{context}", &joined_docs(&ctx));
                let answer = complete_text(&model, prompt).await.map_err(GraphError::Core)?;
                Ok(StepUpdate::new().set(ANSWER_CHANNEL, json!(answer.trim())))
            }
        })
        .edge(START, "rewrite")
        .edge("rewrite", "retrieve")
        .edge("retrieve", "grade")
        .conditional(
            "grade",
            Router::by_field(ROUTE_CHANNEL),
            [("generate", "generate"), ("rewrite", "rewrite")],
        )
        .edge("generate", END)
        .build()
        // Three nodes per pass plus the terminal generation.
        .map(|g| g.with_step_limit(config.max_rewrite_iterations.max(1) as usize * 3 + 2))
}
