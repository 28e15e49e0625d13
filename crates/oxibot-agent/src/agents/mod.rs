//! Named, reusable sub-agent configurations dispatched to via the `spawn` tool.
//!

pub mod base;
pub mod explore;
pub mod librarian;
pub mod registry;

pub use base::{AgentConfig, AgentMode};
pub use registry::{get_agent, has_agent, list_agents, register_agent, AgentFactory};
