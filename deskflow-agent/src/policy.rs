//! Which tools need a human in the loop before they run.

use std::collections::HashMap;

/// Sensitive-tool configuration: tool name to the description shown in the
/// approval prompt.
#[derive(Clone, Debug, Default)]
pub struct ApprovalPolicy {
    guarded: HashMap<String, String>,
}

impl ApprovalPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require approval before `tool_name` executes.
    pub fn guard(mut self, tool_name: impl Into<String>, description: impl Into<String>) -> Self {
        self.guarded.insert(tool_name.into(), description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.guarded.is_empty()
    }

    pub fn is_guarded(&self, tool_name: &str) -> bool {
        self.guarded.contains_key(tool_name)
    }

    pub fn describe(&self, tool_name: &str) -> String {
        self.guarded
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| format!("Execute tool '{tool_name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_lookup() {
        let policy = ApprovalPolicy::new()
            .guard("delete_ticket", "Permanently deletes a ticket")
            .guard("execute_sql", "Runs arbitrary SQL");

        assert!(policy.is_guarded("delete_ticket"));
        assert!(!policy.is_guarded("get_ticket"));
        assert_eq!(policy.describe("execute_sql"), "Runs arbitrary SQL");
        assert_eq!(policy.describe("other"), "Execute tool 'other'");
    }
}
