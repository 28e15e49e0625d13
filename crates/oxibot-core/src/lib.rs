//! Core types, message bus, session persistence, config, and shared
//! utilities for Oxibot.
//!
//! This crate has no knowledge of any specific LLM provider, channel, or
//! tool — it's the substrate every other crate in the workspace builds on.

pub mod bus;
pub mod config;
pub mod heartbeat;
pub mod session;
pub mod types;
pub mod utils;
pub mod workspace;
