//! # deskflow-agent
//!
//! The tool-loop agent: a two-node cyclic graph in the ReAct shape.
//!
//! The `model` node (named after the agent) calls the LLM with the system
//! prompt and transcript; the `tools` node executes whatever calls the model
//! asked for, pausing for human approval on tools named in the agent's
//! [`ApprovalPolicy`]. A conditional edge loops until the model answers
//! without calling tools.
//!
//! ```rust,ignore
//! let agent = AgentBuilder::new("supervisor", model)
//!     .system_prompt(SUPERVISOR_PROMPT)
//!     .tool(ask_agent_tool)
//!     .tool(create_agent_tool)
//!     .tool(modify_agent_tool)
//!     .approval(ApprovalPolicy::new().guard("modify_agents", "Updates or deletes tickets"))
//!     .checkpointer(checkpointer)
//!     .build()?;
//! ```

pub mod builder;
pub mod middleware;
pub mod nodes;
pub mod policy;

pub use builder::AgentBuilder;
pub use middleware::{RequestMiddleware, SystemPromptAddendum};
pub use policy::ApprovalPolicy;
