//! Edges: how control flows between nodes.

use crate::state::State;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Pseudo-node marking the entry of a graph.
pub const START: &str = "__start__";
/// Pseudo-node marking termination.
pub const END: &str = "__end__";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EdgeTarget {
    Node(String),
    End,
}

impl EdgeTarget {
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Node(name) => Some(name),
            Self::End => None,
        }
    }
}

impl From<&str> for EdgeTarget {
    fn from(s: &str) -> Self {
        if s == END { Self::End } else { Self::Node(s.to_string()) }
    }
}

/// Synchronous routing function over state, returning a route label.
pub type RouterFn = Arc<dyn Fn(&State) -> String + Send + Sync>;

#[derive(Clone)]
pub enum Edge {
    /// Always flow from source to target.
    Direct { source: String, target: EdgeTarget },
    /// Route by a function of state. Labels not present in `targets`
    /// terminate the path.
    Conditional { source: String, router: RouterFn, targets: HashMap<String, EdgeTarget> },
    /// From START to the first node.
    Entry { target: String },
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { source, target } => {
                f.debug_struct("Direct").field("source", source).field("target", target).finish()
            }
            Self::Conditional { source, targets, .. } => f
                .debug_struct("Conditional")
                .field("source", source)
                .field("targets", targets)
                .finish(),
            Self::Entry { target } => f.debug_struct("Entry").field("target", target).finish(),
        }
    }
}

/// Router constructors for the common routing shapes.
pub struct Router;

impl Router {
    /// Route by the string value of a state field; missing field routes to END.
    pub fn by_field(field: &str) -> impl Fn(&State) -> String + Send + Sync + Clone {
        let field = field.to_string();
        move |state: &State| {
            state.get(&field).and_then(Value::as_str).unwrap_or(END).to_string()
        }
    }

    /// Route by whether the last message in a list channel carries function
    /// calls (the ReAct continue-or-stop decision).
    pub fn last_message_calls_tools(
        messages_field: &str,
        if_calls: &str,
        otherwise: &str,
    ) -> impl Fn(&State) -> String + Send + Sync + Clone {
        let messages_field = messages_field.to_string();
        let if_calls = if_calls.to_string();
        let otherwise = otherwise.to_string();

        move |state: &State| {
            let has_calls = state
                .get(&messages_field)
                .and_then(Value::as_array)
                .and_then(|msgs| msgs.last())
                .and_then(|msg| serde_json::from_value::<deskflow_core::Content>(msg.clone()).ok())
                .map(|content| content.has_function_calls())
                .unwrap_or(false);

            if has_calls { if_calls.clone() } else { otherwise.clone() }
        }
    }
}
