//! MCP toolset: discover tools on an MCP server and proxy calls to it.
//!
//! Deskflow's ticketing operations live in MCP servers; this is the bridge
//! that turns them into [`Tool`]s an agent can hold.

use async_trait::async_trait;
use deskflow_core::{DeskError, Result, Tool};
use rmcp::{
    RoleClient,
    model::{CallToolRequestParams, RawContent, ResourceContents},
    service::RunningService,
};
use serde_json::{Value, json};
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Predicate selecting which discovered tools to expose.
pub type ToolFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Strip schema fields some model APIs reject.
fn sanitize_schema(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("$schema");
        map.remove("definitions");
        map.remove("$ref");
        map.remove("additionalProperties");

        for (_, v) in map.iter_mut() {
            sanitize_schema(v);
        }
    } else if let Value::Array(arr) = value {
        for v in arr.iter_mut() {
            sanitize_schema(v);
        }
    }
}

/// Connects to one MCP server (an already-running rmcp client service) and
/// exposes its tools.
pub struct McpToolset<S = ()>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    client: Arc<RunningService<RoleClient, S>>,
    name: String,
    tool_filter: Option<ToolFilter>,
}

impl<S> McpToolset<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    /// Wrap a connected client. Use `rmcp::ServiceExt::serve()` to create it.
    pub fn new(client: RunningService<RoleClient, S>) -> Self {
        Self { client: Arc::new(client), name: "mcp".to_string(), tool_filter: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.tool_filter = Some(Arc::new(filter));
        self
    }

    /// Expose only the named tools.
    pub fn with_tools(self, tool_names: &[&str]) -> Self {
        let names: Vec<String> = tool_names.iter().map(|s| s.to_string()).collect();
        self.with_filter(move |name| names.iter().any(|n| n == name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discover the server's tools, filtered and schema-sanitized.
    pub async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let mcp_tools = self
            .client
            .list_all_tools()
            .await
            .map_err(|e| DeskError::Tool(format!("Failed to list MCP tools: {e}")))?;

        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        for mcp_tool in mcp_tools {
            let tool_name = mcp_tool.name.to_string();

            if let Some(filter) = &self.tool_filter {
                if !filter(&tool_name) {
                    continue;
                }
            }

            let mut input_schema = Value::Object(mcp_tool.input_schema.as_ref().clone());
            sanitize_schema(&mut input_schema);

            debug!(toolset = %self.name, tool = %tool_name, "discovered MCP tool");
            tools.push(Arc::new(McpTool {
                name: tool_name,
                description: mcp_tool.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema,
                client: self.client.clone(),
            }) as Arc<dyn Tool>);
        }

        Ok(tools)
    }
}

/// One proxied MCP tool.
struct McpTool<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    name: String,
    description: String,
    input_schema: Value,
    client: Arc<RunningService<RoleClient, S>>,
}

#[async_trait]
impl<S> Tool for McpTool<S>
where
    S: rmcp::service::Service<RoleClient> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(self.input_schema.clone())
    }

    async fn call(&self, args: Value) -> Result<Value> {
        let arguments = if args.is_null() || args == json!({}) {
            None
        } else {
            match args {
                Value::Object(map) => Some(map),
                _ => return Err(DeskError::Tool("Tool arguments must be an object".to_string())),
            }
        };

        let result = self
            .client
            .call_tool({
                let mut params = CallToolRequestParams::new(self.name.clone());
                params.arguments = arguments;
                params
            })
            .await
            .map_err(|e| DeskError::Tool(format!("MCP tool '{}' failed: {e}", self.name)))?;

        if result.is_error.unwrap_or(false) {
            let mut message = format!("MCP tool '{}' execution failed", self.name);
            for content in &result.content {
                if let Some(text) = content.deref().as_text() {
                    message.push_str(": ");
                    message.push_str(&text.text);
                    break;
                }
            }
            return Err(DeskError::Tool(message));
        }

        if let Some(structured) = result.structured_content {
            return Ok(json!({ "output": structured }));
        }

        let mut text_parts: Vec<String> = Vec::new();
        for content in &result.content {
            match content.deref() {
                RawContent::Text(text) => text_parts.push(text.text.clone()),
                RawContent::Image(image) => text_parts.push(format!(
                    "[Image: {} bytes, mime: {}]",
                    image.data.len(),
                    image.mime_type
                )),
                RawContent::Resource(resource) => {
                    let uri = match &resource.resource {
                        ResourceContents::TextResourceContents { uri, .. } => uri,
                        ResourceContents::BlobResourceContents { uri, .. } => uri,
                    };
                    text_parts.push(format!("[Resource: {uri}]"));
                }
                RawContent::Audio(_) => text_parts.push("[Audio content]".to_string()),
                RawContent::ResourceLink(link) => {
                    text_parts.push(format!("[ResourceLink: {}]", link.uri));
                }
            }
        }

        if text_parts.is_empty() {
            return Err(DeskError::Tool(format!("MCP tool '{}' returned no content", self.name)));
        }

        Ok(json!({ "output": text_parts.join("\n") }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_meta_fields() {
        let mut schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "id": {"type": "integer", "$ref": "#/definitions/id"}
            },
            "definitions": {"id": {"type": "integer"}}
        });
        sanitize_schema(&mut schema);

        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());
        assert!(schema.get("additionalProperties").is_none());
        assert!(schema["properties"]["id"].get("$ref").is_none());
        assert_eq!(schema["properties"]["id"]["type"], "integer");
    }
}
