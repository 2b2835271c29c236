//! Human-in-the-loop approval interrupts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved state channel holding the caller's decision while a paused run
/// resumes. Consumed by the node that raised the interrupt.
pub const DECISION_CHANNEL: &str = "__approval__";

/// Reserved state channel recording how far a node got before pausing, so a
/// resumed node can skip work it already did. Cleared at every turn start.
pub const CURSOR_CHANNEL: &str = "__approval_cursor__";

/// A request for human approval of a pending tool call.
///
/// Raised by a node instead of updates when execution must pause. The
/// executor embeds it in the checkpoint so the resuming turn can match the
/// decision against the exact pending call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Name of the tool awaiting approval.
    pub tool_name: String,
    /// Arguments the tool would be called with.
    pub args: Value,
    /// Human-readable description of what approving would do.
    pub description: String,
    /// Decisions the caller may submit.
    pub allowed: Vec<Decision>,
}

impl ApprovalRequest {
    pub fn new(tool_name: impl Into<String>, args: Value, description: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
            description: description.into(),
            allowed: vec![Decision::Approve, Decision::Reject],
        }
    }
}

/// Caller decision on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    /// Parse a caller-supplied decision string. Case-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" | "accept" => Some(Self::Approve),
            "reject" | "rejected" | "deny" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Reject => write!(f, "reject"),
        }
    }
}
