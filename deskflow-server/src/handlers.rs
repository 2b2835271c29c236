//! Turn handlers: one agent graph, four routes.

use crate::envelope::ApiResponse;
use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use deskflow_core::transcript;
use deskflow_graph::{Decision, Graph, GraphError, GraphEvent, RunConfig};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{Instrument, error, info_span};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    /// The user query; on continue endpoints it carries the decision
    /// (`approve` / `reject`).
    pub query: String,
}

fn turn_span(session_id: &str, run_id: &str) -> tracing::Span {
    info_span!("turn", run = %format!("{session_id}_{run_id}"))
}

pub async fn generate_answer(
    State(agent): State<Arc<Graph>>,
    Json(req): Json<ChatRequest>,
) -> Json<ApiResponse> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = turn_span(&req.session_id, &run_id);

    let result = agent
        .invoke(transcript::user_turn(&req.query), RunConfig::new(&req.session_id))
        .instrument(span)
        .await;

    Json(match result {
        Ok(state) => match transcript::final_model_text(&state) {
            Some(answer) => ApiResponse::success(answer),
            None => ApiResponse::error("No model response found"),
        },
        Err(GraphError::Paused(paused)) => {
            let partial = transcript::final_model_text(&paused.state);
            ApiResponse::interrupted(&paused, partial)
        }
        Err(e) => {
            error!(error = %e, session = %req.session_id, "turn failed");
            ApiResponse::error(e.to_string())
        }
    })
}

pub async fn continue_answer(
    State(agent): State<Arc<Graph>>,
    Json(req): Json<ChatRequest>,
) -> Json<ApiResponse> {
    let Some(decision) = Decision::parse(&req.query) else {
        return Json(ApiResponse::error(format!(
            "Expected a decision of approve or reject, got '{}'",
            req.query
        )));
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    let span = turn_span(&req.session_id, &run_id);

    let result = agent.resume(&req.session_id, decision).instrument(span).await;

    Json(match result {
        Ok(state) => match transcript::final_model_text(&state) {
            Some(answer) => ApiResponse::success(answer),
            None => ApiResponse::error("No model response found"),
        },
        Err(GraphError::Paused(paused)) => {
            let partial = transcript::final_model_text(&paused.state);
            ApiResponse::interrupted(&paused, partial)
        }
        Err(e) => {
            error!(error = %e, session = %req.session_id, "resume failed");
            ApiResponse::error(e.to_string())
        }
    })
}

pub async fn stream_generate_answer(
    State(agent): State<Arc<Graph>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let run_id = uuid::Uuid::new_v4().to_string();
    let span = turn_span(&req.session_id, &run_id);
    let _guard = span.enter();
    let stream = agent
        .clone()
        .stream(transcript::user_turn(&req.query), RunConfig::new(&req.session_id));
    sse_response(stream)
}

pub async fn stream_continue_answer(
    State(agent): State<Arc<Graph>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let Some(decision) = Decision::parse(&req.query) else {
        let message = format!("Expected a decision of approve or reject, got '{}'", req.query);
        let single = futures::stream::iter([Ok::<_, GraphError>(GraphEvent::Chunk {
            node: "error".to_string(),
            content: message,
        })]);
        return sse_response(single);
    };

    let run_id = uuid::Uuid::new_v4().to_string();
    let span = turn_span(&req.session_id, &run_id);
    let _guard = span.enter();
    sse_response(agent.clone().resume_stream(&req.session_id, decision))
}

/// Map graph events onto the `data: {"type", "content"}` SSE protocol.
fn sse_response(
    stream: impl Stream<Item = deskflow_graph::Result<GraphEvent>> + Send + 'static,
) -> Response {
    let events = stream.filter_map(|item| async move {
        let payload = match item {
            Ok(GraphEvent::Chunk { node, content }) => json!({
                "type": node,
                "content": content,
            }),
            Ok(GraphEvent::Interrupted { .. }) => json!({
                "type": "interrupt",
                "content": "interrupt received",
            }),
            Ok(_) => return None,
            Err(e) => json!({
                "type": "error",
                "content": e.to_string(),
            }),
        };
        Some(Ok::<_, Infallible>(Event::default().data(payload.to_string())))
    });

    (
        [(axum::http::header::CACHE_CONTROL, "no-cache")],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
