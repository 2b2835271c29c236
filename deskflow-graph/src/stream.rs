//! Events emitted while a graph run streams.

use crate::interrupt::ApprovalRequest;
use crate::state::State;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    NodeStart {
        node: String,
        step: usize,
    },

    /// A token/text fragment from a streaming node.
    Chunk {
        node: String,
        content: String,
    },

    NodeEnd {
        node: String,
        step: usize,
    },

    /// The run paused awaiting approval; terminal for this turn.
    Interrupted {
        node: String,
        request: ApprovalRequest,
    },

    /// The run completed; terminal.
    Done {
        state: State,
        steps: usize,
    },
}

impl GraphEvent {
    pub fn node_start(node: &str, step: usize) -> Self {
        Self::NodeStart { node: node.to_string(), step }
    }

    pub fn chunk(node: &str, content: &str) -> Self {
        Self::Chunk { node: node.to_string(), content: content.to_string() }
    }

    pub fn node_end(node: &str, step: usize) -> Self {
        Self::NodeEnd { node: node.to_string(), step }
    }

    pub fn interrupted(node: &str, request: ApprovalRequest) -> Self {
        Self::Interrupted { node: node.to_string(), request }
    }

    pub fn done(state: State, steps: usize) -> Self {
        Self::Done { state, steps }
    }
}
