//! The `SandboxBackend` trait and the name → constructor registry backends
//! register themselves into.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;
use oxibot_core::config::schema::SandboxConfig;

use crate::error::SandboxError;

/// A single isolated execution environment: one running subprocess per
/// instance, scoped to one session (or shared, per `SandboxConfig::mode`).
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    /// Start the backend's subprocess and block until it reports readiness.
    async fn start(&self) -> Result<(), SandboxError>;

    /// Run `command` inside the sandbox, returning combined stdout/stderr
    /// (with an exit-code suffix on nonzero exit). Never panics on a
    /// misbehaving command — failures surface as `Err`.
    async fn execute(&self, command: &str, timeout_secs: u64) -> Result<String, SandboxError>;

    /// Stop the backend, releasing its subprocess and any resources.
    async fn stop(&self) -> Result<(), SandboxError>;

    /// Whether the backend's subprocess is currently alive.
    async fn is_running(&self) -> bool;

    /// The workspace directory this sandbox operates in.
    fn workspace(&self) -> &Path;
}

/// Constructs a boxed backend instance for a given session.
pub type BackendFactory =
    fn(config: SandboxConfig, session_key: String, workspace: PathBuf) -> Box<dyn SandboxBackend>;

fn registry() -> &'static Mutex<HashMap<String, BackendFactory>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, BackendFactory>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<String, BackendFactory> = HashMap::new();
        map.insert("srt".to_string(), crate::backends::srt::SrtBackend::boxed as BackendFactory);
        Mutex::new(map)
    })
}

/// Register a new backend factory under `name`. Registering over an
/// existing name replaces it — callers needing strict idempotence should
/// check [`has_backend`] first.
pub fn register_backend(name: &str, factory: BackendFactory) {
    registry().lock().unwrap().insert(name.to_string(), factory);
}

/// Look up a registered backend factory by name.
pub fn get_backend(name: &str) -> Option<BackendFactory> {
    registry().lock().unwrap().get(name).copied()
}

/// Whether a backend name is registered.
pub fn has_backend(name: &str) -> bool {
    registry().lock().unwrap().contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srt_registered_by_default() {
        assert!(has_backend("srt"));
    }

    #[test]
    fn test_unknown_backend_not_registered() {
        assert!(!has_backend("nonexistent-backend"));
    }

    #[test]
    fn test_register_custom_backend() {
        fn factory(config: SandboxConfig, session_key: String, workspace: PathBuf) -> Box<dyn SandboxBackend> {
            crate::backends::srt::SrtBackend::boxed(config, session_key, workspace)
        }
        register_backend("test-custom", factory);
        assert!(has_backend("test-custom"));
    }
}
