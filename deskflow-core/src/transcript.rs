//! The transcript convention shared by every agent graph: conversation
//! messages live in the `messages` state channel as serialized [`Content`].

use crate::types::{Content, ROLE_MODEL};
use serde_json::Value;
use std::collections::HashMap;

/// State channel holding the conversation transcript.
pub const MESSAGES_CHANNEL: &str = "messages";

/// Deserialize the transcript out of graph state. Malformed entries are
/// skipped rather than failing the turn.
pub fn messages(state: &HashMap<String, Value>) -> Vec<Content> {
    state
        .get(MESSAGES_CHANNEL)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Text of the last model-authored message, the turn's final answer.
pub fn final_model_text(state: &HashMap<String, Value>) -> Option<String> {
    messages(state)
        .iter()
        .rev()
        .find(|m| m.role == ROLE_MODEL && !m.text().is_empty())
        .map(|m| m.text())
}

/// Turn input: a single user message, ready to merge into an append channel.
pub fn user_turn(query: &str) -> HashMap<String, Value> {
    let mut state = HashMap::new();
    state.insert(
        MESSAGES_CHANNEL.to_string(),
        serde_json::json!([serde_json::to_value(Content::user(query)).unwrap_or(Value::Null)]),
    );
    state
}
