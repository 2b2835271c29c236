//! Endpoint behavior with scripted agents behind the real router.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use deskflow_agent::{AgentBuilder, ApprovalPolicy};
use deskflow_graph::{Graph, MemoryCheckpointer};
use deskflow_model::MockLlm;
use deskflow_server::{ServerConfig, create_app};
use deskflow_tool::FunctionTool;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn agent_with(model: MockLlm) -> Arc<Graph> {
    Arc::new(
        AgentBuilder::new("assistant", Arc::new(model))
            .system_prompt("You are a ticketing assistant.")
            .checkpointer(Arc::new(MemoryCheckpointer::new()))
            .build()
            .unwrap(),
    )
}

fn guarded_agent(model: MockLlm) -> Arc<Graph> {
    let delete = Arc::new(FunctionTool::new("delete_ticket", "Delete a ticket", |_| async {
        Ok(json!({"deleted": true}))
    }));
    Arc::new(
        AgentBuilder::new("assistant", Arc::new(model))
            .tool(delete)
            .approval(ApprovalPolicy::new().guard("delete_ticket", "Permanently deletes a ticket"))
            .checkpointer(Arc::new(MemoryCheckpointer::new()))
            .build()
            .unwrap(),
    )
}

fn app(single: Arc<Graph>) -> Router {
    // Multi-agent side gets an inert agent; these tests drive /single-agent.
    let supervisor = agent_with(MockLlm::new("idle"));
    create_app(supervisor, single, ServerConfig::default())
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = app(agent_with(MockLlm::new("m")));
    let response =
        app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn generate_answer_success_envelope() {
    let app = app(agent_with(MockLlm::new("m").reply("Ticket 7 is open.")));

    let (status, body) = post_json(
        app,
        "/single-agent/generate-answer",
        json!({"session_id": "s1", "query": "status of ticket 7?"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["final_answer"], "Ticket 7 is open.");
}

#[tokio::test]
async fn guarded_call_returns_interrupted_envelope() {
    let model = MockLlm::new("m").reply_with_call("delete_ticket", json!({"id": 9}));
    let app = app(guarded_agent(model));

    let (status, body) = post_json(
        app,
        "/single-agent/generate-answer",
        json!({"session_id": "s1", "query": "delete ticket 9"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "interrupted");
    assert_eq!(body["data"]["tool_name"], "delete_ticket");
    assert_eq!(body["data"]["tool_args"]["id"], 9);
    assert_eq!(body["data"]["requires_approval"], true);
    assert_eq!(body["data"]["session_id"], "s1");
}

#[tokio::test]
async fn continue_answer_resumes_after_approval() {
    let model = MockLlm::new("m")
        .reply_with_call("delete_ticket", json!({"id": 9}))
        .reply("Ticket 9 deleted.");
    let agent = guarded_agent(model);
    let app = app(agent);

    let (_, first) = post_json(
        app.clone(),
        "/single-agent/generate-answer",
        json!({"session_id": "s1", "query": "delete ticket 9"}),
    )
    .await;
    assert_eq!(first["status"], "interrupted");

    let (_, second) = post_json(
        app,
        "/single-agent/continue-answer",
        json!({"session_id": "s1", "query": "approve"}),
    )
    .await;
    assert_eq!(second["status"], "success");
    assert_eq!(second["data"]["final_answer"], "Ticket 9 deleted.");
}

#[tokio::test]
async fn continue_answer_rejects_bad_decision() {
    let app = app(agent_with(MockLlm::new("m")));

    let (status, body) = post_json(
        app,
        "/single-agent/continue-answer",
        json!({"session_id": "s1", "query": "do it anyway"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["data"]["final_answer"].as_str().unwrap().contains("approve or reject"));
}

#[tokio::test]
async fn turn_failures_become_error_envelopes() {
    // Empty script: the first model call fails.
    let app = app(agent_with(MockLlm::new("m")));

    let (status, body) = post_json(
        app,
        "/single-agent/generate-answer",
        json!({"session_id": "s1", "query": "anything"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["data"]["final_answer"].as_str().unwrap().contains("mock script exhausted"));
}

#[tokio::test]
async fn sse_stream_emits_typed_chunks() {
    let app = app(agent_with(MockLlm::new("m").reply("streamed answer")));

    let response = app
        .oneshot(
            Request::post("/single-agent/stream/generate-answer")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"session_id": "s1", "query": "hi"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#""type":"assistant""#));
    assert!(text.contains("streamed answer"));
}
