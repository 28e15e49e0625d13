//! Sandbox error taxonomy.

use thiserror::Error;

/// Errors raised by sandbox backends and the manager.
///
/// Tools that delegate to a sandbox turn these into plain strings for the
/// LLM rather than propagating them — only the manager/backend layers deal
/// in typed errors.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Sandboxing is disabled in config; callers should not have reached here.
    #[error("sandbox is disabled")]
    Disabled,

    /// A command was issued before `start()` completed (or after `stop()`).
    #[error("sandbox has not been started")]
    NotStarted,

    /// `config.backend` names a backend with no registered factory.
    #[error("unsupported sandbox backend: {0}")]
    UnsupportedBackend(String),

    /// The backend's subprocess failed to start or reported an init error.
    #[error("sandbox failed to start: {0}")]
    StartFailed(String),

    /// A command ran but the backend reported an execution-level error.
    #[error("sandbox execution error: {0}")]
    Execution(String),

    /// The backend didn't respond within the configured timeout.
    #[error("timed out waiting for sandbox response")]
    Timeout,

    /// The wire protocol broke down (bad JSON, unexpected message type).
    #[error("sandbox protocol error: {0}")]
    Protocol(String),

    /// Any I/O failure talking to the subprocess.
    #[error("sandbox io error: {0}")]
    Io(#[from] std::io::Error),
}
