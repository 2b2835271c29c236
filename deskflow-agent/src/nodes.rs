//! The two nodes of the tool-loop agent.

use crate::middleware::RequestMiddleware;
use crate::policy::ApprovalPolicy;
use async_trait::async_trait;
use deskflow_core::{
    Content, GenerateConfig, Llm, LlmRequest, MESSAGES_CHANNEL, Tool, transcript,
};
use deskflow_graph::interrupt::{CURSOR_CHANNEL, DECISION_CHANNEL};
use deskflow_graph::node::{Node, NodeContext, NodeEvent, NodeEventStream, StepUpdate};
use deskflow_graph::{ApprovalRequest, Decision, GraphError};
use futures::StreamExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Calls the model with the system prompt and transcript, appending the
/// assistant message it produces. Named after the agent so streamed chunks
/// are attributed correctly.
pub struct ModelNode {
    name: String,
    model: Arc<dyn Llm>,
    system_prompt: String,
    declarations: Vec<Value>,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
    config: Option<GenerateConfig>,
}

impl ModelNode {
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn Llm>,
        system_prompt: impl Into<String>,
        declarations: Vec<Value>,
        middleware: Vec<Arc<dyn RequestMiddleware>>,
        config: Option<GenerateConfig>,
    ) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: system_prompt.into(),
            declarations,
            middleware,
            config,
        }
    }

    async fn build_request(&self, ctx: &NodeContext) -> deskflow_graph::Result<LlmRequest> {
        let mut req =
            LlmRequest::new(self.model.name(), transcript::messages(&ctx.state))
                .with_system_instruction(self.system_prompt.clone())
                .with_tools(self.declarations.clone());
        if let Some(config) = &self.config {
            req = req.with_config(config.clone());
        }
        for mw in &self.middleware {
            req = mw.before_model(req).await?;
        }
        Ok(req)
    }

    fn assistant_update(content: Content) -> StepUpdate {
        let message = serde_json::to_value(content).unwrap_or(Value::Null);
        StepUpdate::new().set(MESSAGES_CHANNEL, json!([message]))
    }
}

fn merge_chunk(accumulated: &mut Option<Content>, chunk: Option<Content>) {
    if let Some(content) = chunk {
        match accumulated {
            Some(acc) => acc.parts.extend(content.parts),
            None => *accumulated = Some(content),
        }
    }
}

#[async_trait]
impl Node for ModelNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: NodeContext) -> deskflow_graph::Result<StepUpdate> {
        let req = self.build_request(&ctx).await?;
        debug!(agent = %self.name, messages = req.contents.len(), "calling model");

        let mut stream = self
            .model
            .generate(req, false)
            .await
            .map_err(GraphError::Core)?;

        let mut accumulated: Option<Content> = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(GraphError::Core)?;
            merge_chunk(&mut accumulated, chunk.content);
        }

        let content = accumulated
            .unwrap_or_else(|| Content::new(deskflow_core::ROLE_MODEL).with_text(""));
        Ok(Self::assistant_update(content))
    }

    fn run_stream(&self, ctx: NodeContext) -> NodeEventStream<'_> {
        Box::pin(async_stream::stream! {
            let req = match self.build_request(&ctx).await {
                Ok(req) => req,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut stream = match self.model.generate(req, true).await {
                Ok(stream) => stream,
                Err(e) => {
                    yield Err(GraphError::Core(e));
                    return;
                }
            };

            let mut accumulated: Option<Content> = None;
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(chunk) => {
                        if let Some(content) = &chunk.content {
                            let text = content.text();
                            if !text.is_empty() {
                                yield Ok(NodeEvent::Chunk(text));
                            }
                        }
                        merge_chunk(&mut accumulated, chunk.content);
                    }
                    Err(e) => {
                        yield Err(GraphError::Core(e));
                        return;
                    }
                }
            }

            let content = accumulated
                .unwrap_or_else(|| Content::new(deskflow_core::ROLE_MODEL).with_text(""));
            yield Ok(NodeEvent::Output(Self::assistant_update(content)));
        })
    }
}

/// Name every agent gives its tool-execution node.
pub const TOOLS_NODE: &str = "tools";

/// Executes the calls from the last assistant message, pausing for approval
/// on guarded tools.
pub struct ToolsNode {
    tools: HashMap<String, Arc<dyn Tool>>,
    policy: ApprovalPolicy,
}

/// A decision loaded from the reserved channel, tied to the call it approves.
struct PendingDecision {
    decision: Decision,
    tool_name: String,
    args: Value,
}

impl ToolsNode {
    pub fn new(tools: Vec<Arc<dyn Tool>>, policy: ApprovalPolicy) -> Self {
        let tools = tools.into_iter().map(|t| (t.name().to_string(), t)).collect();
        Self { tools, policy }
    }

    fn load_decision(ctx: &NodeContext) -> Option<PendingDecision> {
        let raw = ctx.get(DECISION_CHANNEL)?.as_object()?;
        let decision = raw.get("decision")?.as_str().and_then(Decision::parse)?;
        Some(PendingDecision {
            decision,
            tool_name: raw.get("tool_name")?.as_str()?.to_string(),
            args: raw.get("args").cloned().unwrap_or(Value::Null),
        })
    }

    async fn execute(&self, name: &str, args: &Value) -> Value {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "model called an unknown tool");
            return json!({ "error": format!("Tool {name} not found") });
        };
        match tool.call(args.clone()).await {
            Ok(result) => result,
            Err(e) => json!({ "error": e.to_string() }),
        }
    }
}

#[async_trait]
impl Node for ToolsNode {
    fn name(&self) -> &str {
        TOOLS_NODE
    }

    async fn run(&self, ctx: NodeContext) -> deskflow_graph::Result<StepUpdate> {
        let messages = transcript::messages(&ctx.state);
        let Some(last) = messages.last() else {
            return Ok(StepUpdate::new());
        };
        let calls: Vec<(String, Value)> = last
            .function_calls()
            .into_iter()
            .map(|(name, args)| (name.to_string(), args.clone()))
            .collect();

        // A resumed run skips the calls it already performed before pausing.
        let start = ctx.get_i64(CURSOR_CHANNEL).map(|c| c as usize).unwrap_or(0);
        let mut decision = Self::load_decision(&ctx);

        let mut results: Vec<Value> = Vec::new();
        for (index, (name, args)) in calls.iter().enumerate().skip(start) {
            if self.policy.is_guarded(name) {
                // Taking the decision means one approval can never cover
                // two different calls.
                let matched =
                    decision.take_if(|d| d.tool_name == *name && d.args == *args);
                if let Some(d) = matched {
                    match d.decision {
                        Decision::Approve => {
                            debug!(tool = %name, "approved, executing");
                            let outcome = self.execute(name, args).await;
                            results.push(tool_message(name, outcome));
                        }
                        Decision::Reject => {
                            debug!(tool = %name, "rejected, skipping execution");
                            results.push(tool_message(
                                name,
                                json!({
                                    "rejected": "The user rejected this tool call; the action was not performed."
                                }),
                            ));
                        }
                    }
                } else {
                    // Pause here. Results so far are committed with the
                    // checkpoint; the cursor makes the resume skip them.
                    let request =
                        ApprovalRequest::new(name, args.clone(), self.policy.describe(name));
                    let mut update = StepUpdate::new()
                        .set(CURSOR_CHANNEL, json!(index))
                        .set(DECISION_CHANNEL, Value::Null);
                    if !results.is_empty() {
                        update = update.set(MESSAGES_CHANNEL, Value::Array(results));
                    }
                    return Ok(update.with_pause(request));
                }
            } else {
                let outcome = self.execute(name, args).await;
                results.push(tool_message(name, outcome));
            }
        }

        let mut update = StepUpdate::new()
            .set(CURSOR_CHANNEL, Value::Null)
            .set(DECISION_CHANNEL, Value::Null);
        if !results.is_empty() {
            update = update.set(MESSAGES_CHANNEL, Value::Array(results));
        }
        Ok(update)
    }
}

fn tool_message(name: &str, response: Value) -> Value {
    serde_json::to_value(Content::function_response(name, response)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskflow_graph::RunConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        name: String,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "counts calls"
        }
        async fn call(&self, args: Value) -> deskflow_core::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"echo": args}))
        }
    }

    fn state_with_call(tool: &str, args: Value) -> deskflow_graph::State {
        let mut state = deskflow_graph::State::new();
        let msg = Content::new(deskflow_core::ROLE_MODEL).with_function_call(tool, args);
        state.insert(
            MESSAGES_CHANNEL.to_string(),
            json!([serde_json::to_value(msg).unwrap()]),
        );
        state
    }

    fn counting(name: &str) -> (Arc<dyn Tool>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let tool = Arc::new(CountingTool { name: name.to_string(), calls: calls.clone() });
        (tool as Arc<dyn Tool>, calls)
    }

    #[tokio::test]
    async fn unguarded_tool_executes_directly() {
        let (tool, calls) = counting("get_ticket");
        let node = ToolsNode::new(vec![tool], ApprovalPolicy::new());

        let ctx = NodeContext::new(state_with_call("get_ticket", json!({"id": 1})), RunConfig::new("t"), 0);
        let out = node.run(ctx).await.unwrap();

        assert!(out.pause.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let messages = out.updates.get(MESSAGES_CHANNEL).unwrap().as_array().unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn guarded_tool_pauses_without_decision() {
        let (tool, calls) = counting("delete_ticket");
        let policy = ApprovalPolicy::new().guard("delete_ticket", "Deletes a ticket");
        let node = ToolsNode::new(vec![tool], policy);

        let ctx =
            NodeContext::new(state_with_call("delete_ticket", json!({"id": 9})), RunConfig::new("t"), 0);
        let out = node.run(ctx).await.unwrap();

        let pause = out.pause.expect("should pause");
        assert_eq!(pause.tool_name, "delete_ticket");
        assert_eq!(pause.description, "Deletes a ticket");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn decision_must_match_the_pending_call() {
        let (tool, calls) = counting("delete_ticket");
        let policy = ApprovalPolicy::new().guard("delete_ticket", "Deletes a ticket");
        let node = ToolsNode::new(vec![tool], policy);

        let mut state = state_with_call("delete_ticket", json!({"id": 9}));
        state.insert(
            DECISION_CHANNEL.to_string(),
            json!({"decision": "approve", "tool_name": "delete_ticket", "args": {"id": 999}}),
        );

        let out = node.run(NodeContext::new(state, RunConfig::new("t"), 0)).await.unwrap();
        assert!(out.pause.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_call_reports_without_executing() {
        let (tool, calls) = counting("delete_ticket");
        let policy = ApprovalPolicy::new().guard("delete_ticket", "Deletes a ticket");
        let node = ToolsNode::new(vec![tool], policy);

        let mut state = state_with_call("delete_ticket", json!({"id": 9}));
        state.insert(
            DECISION_CHANNEL.to_string(),
            json!({"decision": "reject", "tool_name": "delete_ticket", "args": {"id": 9}}),
        );

        let out = node.run(NodeContext::new(state, RunConfig::new("t"), 0)).await.unwrap();
        assert!(out.pause.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let messages = out.updates.get(MESSAGES_CHANNEL).unwrap().as_array().unwrap();
        let text = messages[0].to_string();
        assert!(text.contains("rejected"));
    }
}
