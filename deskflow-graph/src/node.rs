//! Nodes: the computational units of a graph.

use crate::error::Result;
use crate::interrupt::ApprovalRequest;
use crate::state::State;
use async_trait::async_trait;
use futures::stream::Stream;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Per-run configuration.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Thread identifier; checkpoints are stored under it.
    pub thread_id: String,
    /// Maximum number of executor steps before aborting. `None` uses the
    /// graph's configured limit.
    pub step_limit: Option<usize>,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self { thread_id: thread_id.into(), step_limit: None }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Read-only view handed to a node.
#[derive(Clone)]
pub struct NodeContext {
    pub state: State,
    pub config: RunConfig,
    pub step: usize,
}

impl NodeContext {
    pub fn new(state: State, config: RunConfig, step: usize) -> Self {
        Self { state, config, step }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.state.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.state.get(key).and_then(Value::as_i64)
    }

    /// Deserialize a state value into a concrete type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// What a node produced: state updates, or a request to pause.
#[derive(Debug, Default)]
pub struct StepUpdate {
    pub updates: HashMap<String, Value>,
    pub pause: Option<ApprovalRequest>,
}

impl StepUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.updates.insert(key.to_string(), value.into());
        self
    }

    /// Pause the run awaiting approval. Updates returned alongside a pause
    /// are applied before the checkpoint is taken, so progress made earlier
    /// in the node is not lost.
    pub fn pause(request: ApprovalRequest) -> Self {
        Self { updates: HashMap::new(), pause: Some(request) }
    }

    pub fn with_pause(mut self, request: ApprovalRequest) -> Self {
        self.pause = Some(request);
        self
    }
}

/// Events emitted by a streaming node.
#[derive(Debug)]
pub enum NodeEvent {
    /// A token/text fragment produced mid-execution.
    Chunk(String),
    /// Final output; always the last event.
    Output(StepUpdate),
}

pub type NodeEventStream<'a> = Pin<Box<dyn Stream<Item = Result<NodeEvent>> + Send + 'a>>;

#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: NodeContext) -> Result<StepUpdate>;

    /// Streaming execution. The default adapter runs [`Node::run`] once and
    /// yields only the final output; nodes that produce tokens (the model
    /// node) override this.
    fn run_stream(&self, ctx: NodeContext) -> NodeEventStream<'_> {
        Box::pin(async_stream::stream! {
            yield self.run(ctx).await.map(NodeEvent::Output);
        })
    }
}

type AsyncNodeFn =
    Box<dyn Fn(NodeContext) -> Pin<Box<dyn Future<Output = Result<StepUpdate>> + Send>> + Send + Sync>;

/// Wraps an async function as a node.
pub struct FnNode {
    name: String,
    func: AsyncNodeFn,
}

impl FnNode {
    pub fn new<F, Fut>(name: &str, func: F) -> Self
    where
        F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepUpdate>> + Send + 'static,
    {
        Self { name: name.to_string(), func: Box::new(move |ctx| Box::pin(func(ctx))) }
    }
}

#[async_trait]
impl Node for FnNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: NodeContext) -> Result<StepUpdate> {
        (self.func)(ctx).await
    }
}
