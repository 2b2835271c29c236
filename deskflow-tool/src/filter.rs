use deskflow_core::Tool;
use std::sync::Arc;

/// Keep only the tools whose names appear in `allowed`. Order follows the
/// input list; unknown names in `allowed` are ignored.
pub fn filter_tools(tools: &[Arc<dyn Tool>], allowed: &[String]) -> Vec<Arc<dyn Tool>> {
    tools
        .iter()
        .filter(|tool| allowed.iter().any(|name| name == tool.name()))
        .cloned()
        .collect()
}
