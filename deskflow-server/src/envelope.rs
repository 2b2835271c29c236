//! The `{status, data}` envelope every JSON endpoint speaks.

use deskflow_graph::PausedRun;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub data: Value,
}

impl ApiResponse {
    pub fn success(final_answer: impl Into<String>) -> Self {
        Self { status: "success", data: json!({ "final_answer": final_answer.into() }) }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: "error", data: json!({ "final_answer": message.into() }) }
    }

    /// The approval payload surfaced when a turn pauses.
    pub fn interrupted(paused: &PausedRun, final_answer: Option<String>) -> Self {
        Self {
            status: "interrupted",
            data: json!({
                "final_answer": final_answer.unwrap_or_default(),
                "message": format!("About to execute: {}", paused.request.tool_name),
                "description": paused.request.description,
                "tool_name": paused.request.tool_name,
                "tool_args": paused.request.args,
                "allowed_decisions": paused.request.allowed,
                "session_id": paused.thread_id,
                "requires_approval": true,
            }),
        }
    }
}
