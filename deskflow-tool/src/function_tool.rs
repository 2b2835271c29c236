use async_trait::async_trait;
use deskflow_core::{Result, Tool};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

type AsyncHandler =
    Box<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// Wraps an async function as a [`Tool`].
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: Option<Value>,
    handler: AsyncHandler,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
            handler: Box::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        self.parameters.clone()
    }

    async fn call(&self, args: Value) -> Result<Value> {
        (self.handler)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_function_tool_calls_handler() {
        let tool = FunctionTool::new("double", "Double a number", |args: Value| async move {
            let n = args["n"].as_i64().unwrap_or(0);
            Ok(json!({"result": n * 2}))
        })
        .with_parameters(json!({
            "type": "object",
            "properties": {"n": {"type": "integer"}},
            "required": ["n"]
        }));

        assert_eq!(tool.name(), "double");
        assert!(tool.parameters_schema().is_some());

        let out = tool.call(json!({"n": 21})).await.unwrap();
        assert_eq!(out["result"], 42);
    }
}
