use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A callable capability exposed to an agent.
///
/// Tools are context-free: everything a call needs arrives in `args`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON schema for the arguments object, if the tool declares one.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn call(&self, args: Value) -> Result<Value>;
}

/// The wire-format declaration handed to the model for one tool.
pub fn declaration(tool: &dyn Tool) -> Value {
    let mut decl = serde_json::json!({
        "name": tool.name(),
        "description": tool.description(),
    });
    if let Some(params) = tool.parameters_schema() {
        decl["parameters"] = params;
    }
    decl
}
