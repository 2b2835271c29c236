//! Graph execution: sequential steps, checkpoint after every step, pause on
//! approval interrupts, resume from the recorded pending nodes.

use crate::builder::Graph;
use crate::checkpoint::{Checkpoint, require_latest};
use crate::error::{GraphError, PausedRun, Result};
use crate::interrupt::{ApprovalRequest, CURSOR_CHANNEL, DECISION_CHANNEL, Decision};
use crate::node::{NodeContext, NodeEvent, RunConfig};
use crate::state::State;
use crate::stream::GraphEvent;
use futures::StreamExt;
use futures::stream::Stream;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Where a run starts from: a fresh turn or a recorded pause.
enum Entry {
    Fresh { input: State },
    Resume { decision: Decision },
}

impl Graph {
    /// Run one turn to completion. Prior state for the thread (the session
    /// transcript) is loaded from the checkpointer before `input` merges in.
    ///
    /// Pausing surfaces as [`GraphError::Paused`].
    pub async fn invoke(&self, input: State, config: RunConfig) -> Result<State> {
        let (state, pending, step) = self.prepare(Entry::Fresh { input }, &config).await?;
        self.run_from(state, pending, step, config).await
    }

    /// Resume a paused run with the caller's decision.
    pub async fn resume(&self, thread_id: &str, decision: Decision) -> Result<State> {
        let config = RunConfig::new(thread_id);
        let (state, pending, step) = self.prepare(Entry::Resume { decision }, &config).await?;
        self.run_from(state, pending, step, config).await
    }

    async fn run_from(
        &self,
        state: State,
        pending: Vec<String>,
        step: usize,
        config: RunConfig,
    ) -> Result<State> {
        let mut state = state;
        let mut pending = pending;
        let mut step = step;
        let step_limit = config.step_limit.unwrap_or(self.default_step_limit);

        loop {
            if pending.is_empty() {
                break;
            }
            if step >= step_limit {
                return Err(GraphError::StepLimitExceeded(step));
            }

            let names = std::mem::take(&mut pending);
            let mut executed = Vec::with_capacity(names.len());

            for (i, name) in names.iter().enumerate() {
                let node = self
                    .nodes
                    .get(name)
                    .ok_or_else(|| GraphError::NodeNotFound(name.clone()))?;

                debug!(node = %name, step, "running node");
                let ctx = NodeContext::new(state.clone(), config.clone(), step);
                let out = node.run(ctx).await.map_err(|e| GraphError::NodeFailed {
                    node: name.clone(),
                    message: e.to_string(),
                })?;

                for (key, value) in out.updates {
                    self.schema.apply(&mut state, &key, value);
                }

                if let Some(request) = out.pause {
                    let mut resume_nodes = vec![name.clone()];
                    resume_nodes.extend(names[i + 1..].iter().cloned());
                    let checkpoint_id = self
                        .save_checkpoint(&config.thread_id, &state, step, resume_nodes, Some(&request))
                        .await?;
                    return Err(GraphError::Paused(Box::new(PausedRun {
                        thread_id: config.thread_id.clone(),
                        checkpoint_id,
                        request,
                        state,
                        step,
                    })));
                }

                executed.push(name.clone());
            }

            pending = self.next_nodes(&executed, &state);
            self.save_checkpoint(&config.thread_id, &state, step, pending.clone(), None).await?;
            step += 1;
        }

        Ok(state)
    }

    /// Streaming turn: node start/end, token chunks, interrupt, done.
    pub fn stream(
        self: Arc<Self>,
        input: State,
        config: RunConfig,
    ) -> impl Stream<Item = Result<GraphEvent>> + Send + 'static {
        self.stream_inner(Entry::Fresh { input }, config)
    }

    /// Streaming resume of a paused run.
    pub fn resume_stream(
        self: Arc<Self>,
        thread_id: &str,
        decision: Decision,
    ) -> impl Stream<Item = Result<GraphEvent>> + Send + 'static {
        let config = RunConfig::new(thread_id);
        self.stream_inner(Entry::Resume { decision }, config)
    }

    fn stream_inner(
        self: Arc<Self>,
        entry: Entry,
        config: RunConfig,
    ) -> impl Stream<Item = Result<GraphEvent>> + Send + 'static {
        async_stream::stream! {
            let (mut state, mut pending, mut step) = match self.prepare(entry, &config).await {
                Ok(prepared) => prepared,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let step_limit = config.step_limit.unwrap_or(self.default_step_limit);
            loop {
                if pending.is_empty() {
                    break;
                }
                if step >= step_limit {
                    yield Err(GraphError::StepLimitExceeded(step));
                    return;
                }

                let names = std::mem::take(&mut pending);
                let mut executed = Vec::with_capacity(names.len());
                let mut paused = false;

                'nodes: for (i, name) in names.iter().enumerate() {
                    let Some(node) = self.nodes.get(name) else {
                        yield Err(GraphError::NodeNotFound(name.clone()));
                        return;
                    };

                    yield Ok(GraphEvent::node_start(name, step));

                    let ctx = NodeContext::new(state.clone(), config.clone(), step);
                    let mut output = None;
                    let mut events = node.run_stream(ctx);
                    while let Some(event) = events.next().await {
                        match event {
                            Ok(NodeEvent::Chunk(text)) => {
                                yield Ok(GraphEvent::chunk(name, &text));
                            }
                            Ok(NodeEvent::Output(out)) => {
                                output = Some(out);
                            }
                            Err(e) => {
                                yield Err(GraphError::NodeFailed {
                                    node: name.clone(),
                                    message: e.to_string(),
                                });
                                return;
                            }
                        }
                    }
                    drop(events);

                    let Some(out) = output else {
                        yield Err(GraphError::NodeFailed {
                            node: name.clone(),
                            message: "node stream ended without output".to_string(),
                        });
                        return;
                    };

                    for (key, value) in out.updates {
                        self.schema.apply(&mut state, &key, value);
                    }

                    yield Ok(GraphEvent::node_end(name, step));

                    if let Some(request) = out.pause {
                        let mut resume_nodes = vec![name.clone()];
                        resume_nodes.extend(names[i + 1..].iter().cloned());
                        match self
                            .save_checkpoint(&config.thread_id, &state, step, resume_nodes, Some(&request))
                            .await
                        {
                            Ok(_) => yield Ok(GraphEvent::interrupted(name, request)),
                            Err(e) => yield Err(e),
                        }
                        paused = true;
                        break 'nodes;
                    }

                    executed.push(name.clone());
                }

                if paused {
                    return;
                }

                pending = self.next_nodes(&executed, &state);
                if let Err(e) = self
                    .save_checkpoint(&config.thread_id, &state, step, pending.clone(), None)
                    .await
                {
                    yield Err(e);
                    return;
                }
                step += 1;
            }

            yield Ok(GraphEvent::done(state, step));
        }
    }

    /// Latest state for a thread, if any turn has run.
    pub async fn state(&self, thread_id: &str) -> Result<Option<State>> {
        match &self.checkpointer {
            Some(cp) => Ok(cp.latest(thread_id).await?.map(|c| c.state)),
            None => Ok(None),
        }
    }

    /// The approval the thread is waiting on, if it is paused.
    pub async fn pending_interrupt(&self, thread_id: &str) -> Result<Option<ApprovalRequest>> {
        match &self.checkpointer {
            Some(cp) => Ok(cp.latest(thread_id).await?.and_then(|c| c.interrupt)),
            None => Ok(None),
        }
    }

    /// Resolve the starting point of a run.
    async fn prepare(&self, entry: Entry, config: &RunConfig) -> Result<(State, Vec<String>, usize)> {
        match entry {
            Entry::Fresh { input } => {
                let mut state = self.schema.initial_state();

                if let Some(cp) = &self.checkpointer {
                    if let Some(checkpoint) = cp.latest(&config.thread_id).await? {
                        state = checkpoint.state;
                        // A new turn starts clean: stale decisions from a
                        // previous pause must not leak into this one.
                        state.remove(DECISION_CHANNEL);
                        state.remove(CURSOR_CHANNEL);
                    }
                }

                for (key, value) in input {
                    self.schema.apply(&mut state, &key, value);
                }

                Ok((state, self.entry_nodes(), 0))
            }
            Entry::Resume { decision } => {
                let Some(cp) = &self.checkpointer else {
                    return Err(GraphError::NoCheckpoint(config.thread_id.clone()));
                };
                let checkpoint = require_latest(cp.as_ref(), &config.thread_id).await?;
                let Some(request) = checkpoint.interrupt else {
                    return Err(GraphError::NothingPending(config.thread_id.clone()));
                };

                let mut state = checkpoint.state;
                state.insert(
                    DECISION_CHANNEL.to_string(),
                    json!({
                        "decision": decision,
                        "tool_name": request.tool_name,
                        "args": request.args,
                    }),
                );

                Ok((state, checkpoint.pending_nodes, checkpoint.step))
            }
        }
    }

    async fn save_checkpoint(
        &self,
        thread_id: &str,
        state: &State,
        step: usize,
        pending_nodes: Vec<String>,
        interrupt: Option<&ApprovalRequest>,
    ) -> Result<String> {
        let Some(cp) = &self.checkpointer else {
            return Ok(String::new());
        };
        let mut checkpoint = Checkpoint::new(thread_id, state.clone(), step, pending_nodes);
        if let Some(request) = interrupt {
            checkpoint = checkpoint.with_interrupt(request.clone());
        }
        cp.save(checkpoint).await
    }
}
