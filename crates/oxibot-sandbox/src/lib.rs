//! Isolated per-session sandbox subprocesses for shell execution.
//!
//! - [`backend::SandboxBackend`] — the trait every backend implements, plus
//!   the name → constructor registry backends register into.
//! - [`backends::srt::SrtBackend`] — the built-in backend driving
//!   `@anthropic-ai/sandbox-runtime` over newline-delimited JSON.
//! - [`manager::SandboxManager`] — creates/caches backend instances per
//!   session (or a single shared one) and bootstraps their workspaces.

pub mod backend;
pub mod backends;
pub mod error;
pub mod manager;

pub use backend::{get_backend, has_backend, register_backend, BackendFactory, SandboxBackend};
pub use error::SandboxError;
pub use manager::SandboxManager;
