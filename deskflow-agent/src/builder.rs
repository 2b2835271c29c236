//! Assembles the model ⇄ tools graph for one agent.

use crate::middleware::RequestMiddleware;
use crate::nodes::{ModelNode, TOOLS_NODE, ToolsNode};
use crate::policy::ApprovalPolicy;
use deskflow_core::{GenerateConfig, Llm, MESSAGES_CHANNEL, Tool, declaration};
use deskflow_graph::{Channel, Checkpointer, END, Graph, GraphBuilder, Router, START, StateSchema};
use std::sync::Arc;

/// Builds a tool-loop agent graph.
pub struct AgentBuilder {
    name: String,
    model: Arc<dyn Llm>,
    system_prompt: String,
    tools: Vec<Arc<dyn Tool>>,
    approval: ApprovalPolicy,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    generate_config: Option<GenerateConfig>,
    model_call_limit: usize,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>, model: Arc<dyn Llm>) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: String::new(),
            tools: Vec::new(),
            approval: ApprovalPolicy::new(),
            middleware: Vec::new(),
            checkpointer: None,
            generate_config: None,
            model_call_limit: 10,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn approval(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = policy;
        self
    }

    pub fn middleware(mut self, middleware: Arc<dyn RequestMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Persist transcripts and support pause/resume under this store.
    pub fn checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn generate_config(mut self, config: GenerateConfig) -> Self {
        self.generate_config = Some(config);
        self
    }

    /// Cap on model calls per turn; exceeding it aborts the turn.
    pub fn model_call_limit(mut self, limit: usize) -> Self {
        self.model_call_limit = limit;
        self
    }

    pub fn build(self) -> deskflow_graph::Result<Graph> {
        let agent_name = self.name.clone();
        let declarations = self.tools.iter().map(|t| declaration(t.as_ref())).collect();

        let model_node = ModelNode::new(
            &agent_name,
            self.model,
            self.system_prompt,
            declarations,
            self.middleware,
            self.generate_config,
        );
        let tools_node = ToolsNode::new(self.tools, self.approval);

        // model → tools while the model keeps calling tools, else END;
        // tools always loops back to the model. Each model+tools round is
        // two executor steps, so the step limit encodes the call cap.
        let mut graph = GraphBuilder::new(StateSchema::new([Channel::list(MESSAGES_CHANNEL)]))
            .node(model_node)
            .node(tools_node)
            .edge(START, &agent_name)
            .conditional(
                &agent_name,
                Router::last_message_calls_tools(MESSAGES_CHANNEL, TOOLS_NODE, END),
                [(TOOLS_NODE, TOOLS_NODE), (END, END)],
            )
            .edge(TOOLS_NODE, &agent_name)
            .build()?
            .with_step_limit(self.model_call_limit * 2 + 1);

        if let Some(checkpointer) = self.checkpointer {
            graph = graph.with_checkpointer(checkpointer);
        }
        Ok(graph)
    }
}
