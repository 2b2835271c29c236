//! Loop behavior of the retrieval graph against scripted models and indexes.

use async_trait::async_trait;
use deskflow_core::Result as CoreResult;
use deskflow_graph::{RunConfig, State};
use deskflow_model::MockLlm;
use deskflow_rag::graph::{ANSWER_CHANNEL, ITERATIONS_CHANNEL, QUERY_CHANNEL};
use deskflow_rag::{RagConfig, RetrievedDoc, VectorIndex, build_rag_graph, rag_search_tool};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted index: each search pops the next result set; repeats the last
/// one once the script runs out.
struct ScriptedIndex {
    results: Vec<Vec<&'static str>>,
    searches: AtomicUsize,
}

impl ScriptedIndex {
    fn new(results: Vec<Vec<&'static str>>) -> Arc<Self> {
        Arc::new(Self { results, searches: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn search(&self, _query: &str, _top_k: usize) -> CoreResult<Vec<RetrievedDoc>> {
        let call = self.searches.fetch_add(1, Ordering::SeqCst);
        let batch = self.results.get(call).or_else(|| self.results.last());
        Ok(batch
            .map(|docs| docs.iter().map(|d| RetrievedDoc { text: d.to_string() }).collect())
            .unwrap_or_default())
    }
}

fn query_input(q: &str) -> State {
    let mut state = State::new();
    state.insert(QUERY_CHANNEL.to_string(), json!(q));
    state
}

#[tokio::test]
async fn relevant_docs_generate_on_the_first_pass() {
    // Model script: grade says yes, then generation.
    let model = Arc::new(
        MockLlm::new("mock")
            .reply(r#"{"binary_score": "yes"}"#)
            .reply("Restart the router to fix the connection."),
    );
    let index = ScriptedIndex::new(vec![vec!["Router restarts fix most connection drops."]]);

    let graph = build_rag_graph(model, index.clone(), RagConfig::default()).unwrap();
    let out = graph.invoke(query_input("wifi keeps dropping"), RunConfig::new("r1")).await.unwrap();

    assert_eq!(
        out.get(ANSWER_CHANNEL),
        Some(&json!("Restart the router to fix the connection."))
    );
    // One retrieval, no rewrite of the original query.
    assert_eq!(index.searches.load(Ordering::SeqCst), 1);
    assert_eq!(out.get(ITERATIONS_CHANNEL), Some(&json!(1)));
    assert_eq!(out.get(QUERY_CHANNEL), Some(&json!("wifi keeps dropping")));
}

#[tokio::test]
async fn irrelevant_docs_loop_until_the_cap_then_fail_open() {
    // Script per pass: grade "no" → rewrite → grade "no" → rewrite → cap
    // reached → generate without a third grade.
    let model = Arc::new(
        MockLlm::new("mock")
            .reply(r#"{"binary_score": "no"}"#)
            .reply("rephrased query one")
            .reply(r#"{"binary_score": "no"}"#)
            .reply("rephrased query two")
            .reply("Best effort answer from what was found."),
    );
    let index = ScriptedIndex::new(vec![vec!["unrelated doc"]]);

    let config = RagConfig { max_rewrite_iterations: 3, ..Default::default() };
    let graph = build_rag_graph(model.clone(), index.clone(), config).unwrap();
    let out = graph.invoke(query_input("obscure question"), RunConfig::new("r1")).await.unwrap();

    assert_eq!(out.get(ANSWER_CHANNEL), Some(&json!("Best effort answer from what was found.")));
    assert_eq!(out.get(ITERATIONS_CHANNEL), Some(&json!(3)));
    assert_eq!(index.searches.load(Ordering::SeqCst), 3);
    assert_eq!(out.get(QUERY_CHANNEL), Some(&json!("rephrased query two")));
    // Every scripted call was consumed; the loop never exceeded the budget.
    assert_eq!(model.remaining(), 0);
}

#[tokio::test]
async fn empty_retrieval_rewrites_without_grading() {
    // First search returns nothing: no grade call happens, straight to
    // rewrite. Second search hits, grade approves, generation runs.
    let model = Arc::new(
        MockLlm::new("mock")
            .reply("better phrased question")
            .reply(r#"{"binary_score": "yes"}"#)
            .reply("Found it."),
    );
    let index = ScriptedIndex::new(vec![vec![], vec!["the relevant doc"]]);

    let graph = build_rag_graph(model, index.clone(), RagConfig::default()).unwrap();
    let out = graph.invoke(query_input("q"), RunConfig::new("r1")).await.unwrap();

    assert_eq!(out.get(ANSWER_CHANNEL), Some(&json!("Found it.")));
    assert_eq!(index.searches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unparseable_grade_fails_open_to_generation() {
    let model = Arc::new(
        MockLlm::new("mock")
            .reply("I think these documents look relevant!")
            .reply("Answer anyway."),
    );
    let index = ScriptedIndex::new(vec![vec!["some doc"]]);

    let graph = build_rag_graph(model, index, RagConfig::default()).unwrap();
    let out = graph.invoke(query_input("q"), RunConfig::new("r1")).await.unwrap();

    assert_eq!(out.get(ANSWER_CHANNEL), Some(&json!("Answer anyway.")));
}

#[tokio::test]
async fn rag_search_tool_returns_the_final_answer() {
    let model = Arc::new(
        MockLlm::new("mock")
            .reply(r#"{"binary_score": "yes"}"#)
            .reply("Tool-level answer."),
    );
    let index = ScriptedIndex::new(vec![vec!["doc"]]);
    let graph = Arc::new(build_rag_graph(model, index, RagConfig::default()).unwrap());

    let tool = rag_search_tool(graph);
    let out = tool.call(json!({"query": "how do I reset my password"})).await.unwrap();
    assert_eq!(out["answer"], "Tool-level answer.");

    assert!(tool.call(json!({})).await.is_err());
}
