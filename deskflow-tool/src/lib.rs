//! # deskflow-tool
//!
//! The tool system for Deskflow agents.
//!
//! - [`FunctionTool`] - wrap an async closure as a [`deskflow_core::Tool`]
//! - [`AgentTool`] - expose a compiled agent graph as a callable tool, the
//!   mechanism the supervisor uses to dispatch to sub-agents
//! - [`McpToolset`] - discover and proxy tools from an MCP server
//! - [`filter_tools`] - select a role's allow-listed subset of a flat list

pub mod agent_tool;
pub mod filter;
pub mod function_tool;
pub mod mcp;

pub use agent_tool::AgentTool;
pub use filter::filter_tools;
pub use function_tool::FunctionTool;
pub use mcp::McpToolset;
