//! Sandbox manager — creates and caches backend instances per session (or
//! one shared instance), and bootstraps each sandbox's workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxibot_core::config::schema::SandboxConfig;
use oxibot_core::utils::sanitize_session_key;
use oxibot_core::workspace::materialize_bootstrap;
use tokio::sync::Mutex;
use tracing::warn;

use crate::backend::{get_backend, BackendFactory, SandboxBackend};
use crate::error::SandboxError;

/// Creates and owns sandbox backend instances.
///
/// Per `config.mode`:
/// - `"per-session"`: one backend per distinct session key, created lazily.
/// - `"shared"`: one backend shared across every session.
pub struct SandboxManager {
    config: SandboxConfig,
    /// Parent directory under which per-session sandbox workspaces live.
    sandbox_parent: PathBuf,
    /// The workspace bootstrap files/skills are copied from.
    source_workspace: PathBuf,
    /// Directory of builtin skills, copied in after the source workspace's
    /// own `skills/` so user skills always take precedence.
    builtin_skills_dir: Option<PathBuf>,
    backend_factory: BackendFactory,
    sessions: Mutex<HashMap<String, Arc<dyn SandboxBackend>>>,
    shared: Mutex<Option<Arc<dyn SandboxBackend>>>,
}

impl SandboxManager {
    /// Construct a manager. Fails immediately if `config.backend` names an
    /// unregistered backend, rather than deferring the error to first use.
    pub fn new(
        config: SandboxConfig,
        sandbox_parent: PathBuf,
        source_workspace: PathBuf,
        builtin_skills_dir: Option<PathBuf>,
    ) -> Result<Self, SandboxError> {
        let backend_factory =
            get_backend(&config.backend).ok_or_else(|| SandboxError::UnsupportedBackend(config.backend.clone()))?;

        Ok(Self {
            config,
            sandbox_parent,
            source_workspace,
            builtin_skills_dir,
            backend_factory,
            sessions: Mutex::new(HashMap::new()),
            shared: Mutex::new(None),
        })
    }

    /// Get (creating if necessary) the sandbox backend for `session_key`,
    /// per the configured mode.
    pub async fn get_sandbox(&self, session_key: &str) -> Result<Arc<dyn SandboxBackend>, SandboxError> {
        if !self.config.enabled {
            return Err(SandboxError::Disabled);
        }

        match self.config.mode.as_str() {
            "per-session" => self.get_or_create_session_sandbox(session_key).await,
            "shared" => self.get_or_create_shared_sandbox().await,
            _ => Err(SandboxError::Disabled),
        }
    }

    async fn get_or_create_session_sandbox(&self, session_key: &str) -> Result<Arc<dyn SandboxBackend>, SandboxError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(existing) = sessions.get(session_key) {
            return Ok(existing.clone());
        }
        let instance = self.create_sandbox(session_key).await?;
        sessions.insert(session_key.to_string(), instance.clone());
        Ok(instance)
    }

    async fn get_or_create_shared_sandbox(&self) -> Result<Arc<dyn SandboxBackend>, SandboxError> {
        let mut shared = self.shared.lock().await;
        if let Some(existing) = shared.as_ref() {
            return Ok(existing.clone());
        }
        let instance = self.create_sandbox("shared").await?;
        *shared = Some(instance.clone());
        Ok(instance)
    }

    async fn create_sandbox(&self, session_key: &str) -> Result<Arc<dyn SandboxBackend>, SandboxError> {
        let workspace = self.sandbox_parent.join(sanitize_session_key(session_key));
        let instance: Arc<dyn SandboxBackend> =
            Arc::from((self.backend_factory)(self.config.clone(), session_key.to_string(), workspace.clone()));

        // Unlike a bare try/print-and-continue, a failed start is a real
        // error: a caller holding this instance would otherwise see every
        // execute() call fail with a confusing NotStarted instead of the
        // actual root cause.
        instance.start().await?;

        if let Err(e) = materialize_bootstrap(&self.source_workspace, &workspace, self.builtin_skills_dir.as_deref()) {
            warn!(error = %e, session = %session_key, "failed to materialize sandbox bootstrap files");
        }

        Ok(instance)
    }

    /// Stop and drop the sandbox for one session (no-op if none exists).
    pub async fn cleanup_session(&self, session_key: &str) -> Result<(), SandboxError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(instance) = sessions.remove(session_key) {
            instance.stop().await?;
        }
        Ok(())
    }

    /// Stop and drop every managed sandbox, session and shared alike.
    pub async fn cleanup_all(&self) -> Result<(), SandboxError> {
        let mut sessions = self.sessions.lock().await;
        for (_, instance) in sessions.drain() {
            instance.stop().await?;
        }
        drop(sessions);

        let mut shared = self.shared.lock().await;
        if let Some(instance) = shared.take() {
            instance.stop().await?;
        }
        Ok(())
    }

    /// The parent directory sandbox workspaces are created under.
    pub fn sandbox_parent(&self) -> &Path {
        &self.sandbox_parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> SandboxConfig {
        SandboxConfig {
            enabled: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_sandbox_errors() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SandboxManager::new(disabled_config(), dir.path().to_path_buf(), dir.path().to_path_buf(), None).unwrap();
        let result = manager.get_sandbox("telegram:1").await;
        assert!(matches!(result, Err(SandboxError::Disabled)));
    }

    #[test]
    fn test_unknown_backend_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = SandboxConfig {
            enabled: true,
            backend: "nonexistent".to_string(),
            ..Default::default()
        };
        let result = SandboxManager::new(config, dir.path().to_path_buf(), dir.path().to_path_buf(), None);
        assert!(matches!(result, Err(SandboxError::UnsupportedBackend(_))));
    }

    #[tokio::test]
    async fn test_cleanup_session_without_instance_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SandboxManager::new(disabled_config(), dir.path().to_path_buf(), dir.path().to_path_buf(), None).unwrap();
        manager.cleanup_session("nobody:here").await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_all_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SandboxManager::new(disabled_config(), dir.path().to_path_buf(), dir.path().to_path_buf(), None).unwrap();
        manager.cleanup_all().await.unwrap();
    }
}
