//! Error types for graph construction and execution.

use crate::interrupt::ApprovalRequest;
use crate::state::State;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("No entry point defined (missing edge from START)")]
    NoEntryPoint,

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge target not found: {0}")]
    EdgeTargetNotFound(String),

    #[error("Step limit exceeded after {0} steps")]
    StepLimitExceeded(usize),

    #[error("Execution paused awaiting approval of '{}'", .0.request.tool_name)]
    Paused(Box<PausedRun>),

    #[error("Node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    #[error("No checkpoint found for thread '{0}'")]
    NoCheckpoint(String),

    #[error("Nothing awaiting approval for thread '{0}'")]
    NothingPending(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error(transparent)]
    Core(#[from] deskflow_core::DeskError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A run paused on an approval interrupt, everything needed to resume it.
#[derive(Debug, Clone)]
pub struct PausedRun {
    pub thread_id: String,
    pub checkpoint_id: String,
    pub request: ApprovalRequest,
    /// State at the pause point.
    pub state: State,
    pub step: usize,
}
