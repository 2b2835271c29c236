use serde::{Deserialize, Serialize};

/// Role of the human side of the conversation.
pub const ROLE_USER: &str = "user";
/// Role of model-authored messages.
pub const ROLE_MODEL: &str = "model";
/// Role of tool/function results fed back to the model.
pub const ROLE_FUNCTION: &str = "function";

/// One conversation message: a role plus an ordered list of parts.
///
/// Deskflow is a text chat system, so parts are text, tool invocations,
/// or tool results. Messages serialize directly into graph state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    FunctionResponse {
        name: String,
        response: serde_json::Value,
    },
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    /// Shorthand for a user message with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ROLE_USER).with_text(text)
    }

    /// Shorthand for a function-response message.
    pub fn function_response(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            role: ROLE_FUNCTION.to_string(),
            parts: vec![Part::FunctionResponse { name: name.into(), response }],
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    pub fn with_function_call(mut self, name: impl Into<String>, args: serde_json::Value) -> Self {
        self.parts.push(Part::FunctionCall { name: name.into(), args });
        self
    }

    /// All text parts joined together.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("")
    }

    /// Function calls carried by this message, in order.
    pub fn function_calls(&self) -> Vec<(&str, &serde_json::Value)> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::FunctionCall { name, args } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }

    pub fn has_function_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::FunctionCall { .. }))
    }
}

impl Part {
    /// Returns the text if this is a text part.
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }
}
