//! # deskflow-graph
//!
//! A small checkpointed state-graph runtime, the execution substrate for
//! every agent in Deskflow.
//!
//! A graph is a set of named async nodes connected by direct and conditional
//! edges, executing over a shared state of named channels. After every step
//! the state is checkpointed under the run's thread id, so a run can pause
//! on a human-approval interrupt and later resume from exactly where it
//! stopped.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use deskflow_graph::prelude::*;
//!
//! let graph = GraphBuilder::with_channels(&["value"])
//!     .node_fn("double", |ctx| async move {
//!         let v = ctx.get_i64("value").unwrap_or(0);
//!         Ok(StepUpdate::new().set("value", json!(v * 2)))
//!     })
//!     .edge(START, "double")
//!     .edge("double", END)
//!     .build()?;
//!
//! let mut input = State::new();
//! input.insert("value".to_string(), json!(21));
//! let out = graph.invoke(input, RunConfig::new("thread-1")).await?;
//! ```
//!
//! ## Pause and resume
//!
//! A node may return an [`ApprovalRequest`] instead of updates. The executor
//! checkpoints the run and surfaces a [`PausedRun`]; calling
//! [`Graph::resume`] with a [`Decision`] continues from the checkpoint.

pub mod builder;
pub mod checkpoint;
pub mod edge;
pub mod error;
pub mod executor;
pub mod interrupt;
pub mod node;
pub mod state;
pub mod stream;

pub use builder::{Graph, GraphBuilder};
pub use checkpoint::{Checkpoint, Checkpointer, MemoryCheckpointer};
pub use edge::{END, Edge, EdgeTarget, Router, START};
pub use error::{GraphError, PausedRun, Result};
pub use interrupt::{ApprovalRequest, CURSOR_CHANNEL, DECISION_CHANNEL, Decision};
pub use node::{FnNode, Node, NodeContext, NodeEvent, RunConfig, StepUpdate};
pub use state::{Channel, Reducer, State, StateSchema};
pub use stream::GraphEvent;

/// Prelude for building and running graphs.
pub mod prelude {
    pub use crate::builder::{Graph, GraphBuilder};
    pub use crate::checkpoint::{Checkpoint, Checkpointer, MemoryCheckpointer};
    pub use crate::edge::{END, Router, START};
    pub use crate::error::{GraphError, PausedRun, Result};
    pub use crate::interrupt::{ApprovalRequest, Decision};
    pub use crate::node::{FnNode, Node, NodeContext, NodeEvent, RunConfig, StepUpdate};
    pub use crate::state::{Channel, Reducer, State, StateSchema};
    pub use crate::stream::GraphEvent;
    pub use serde_json::{Value, json};
}
