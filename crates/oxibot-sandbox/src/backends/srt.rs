//! SRT backend — drives `@anthropic-ai/sandbox-runtime` via a small Node.js
//! wrapper process over a newline-delimited JSON control protocol.
//!
//! Wire protocol (parent → wrapper): `{"type":"initialize","config":{...}}`,
//! `{"type":"execute","command":"...","timeout":ms,"customConfig":...}`,
//! `{"type":"reset"}`. Wrapper → parent: `{"type":"ready"}`,
//! `{"type":"initialized","warnings":[...]}`, `{"type":"initialize_failed","errors":[...]}`,
//! `{"type":"executed","stdout":"","stderr":"","exitCode":0,"violations":[...]}`,
//! `{"type":"error","message":"..."}`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, Mutex as TokioMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use oxibot_core::config::schema::SandboxConfig;
use oxibot_core::utils::{get_sandboxes_path, sanitize_session_key};

use crate::backend::SandboxBackend;
use crate::error::SandboxError;

const DEFAULT_WAIT_SECS: u64 = 30;
const MAX_OUTPUT_LEN: usize = 10_000;

struct RunningProcess {
    child: Child,
    stdin: ChildStdin,
    responses: mpsc::Receiver<Value>,
    reader_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

/// SRT (`@anthropic-ai/sandbox-runtime`) sandbox backend.
pub struct SrtBackend {
    config: SandboxConfig,
    session_key: String,
    workspace: PathBuf,
    settings_path: PathBuf,
    process: TokioMutex<Option<RunningProcess>>,
}

impl SrtBackend {
    /// Construct a new (not-yet-started) SRT backend instance.
    pub fn new(config: SandboxConfig, session_key: String, workspace: PathBuf) -> Self {
        let settings_path = Self::generate_settings(&config, &session_key);
        Self {
            config,
            session_key,
            workspace,
            settings_path,
            process: TokioMutex::new(None),
        }
    }

    /// Factory entry point registered under the `"srt"` backend name.
    pub fn boxed(config: SandboxConfig, session_key: String, workspace: PathBuf) -> Box<dyn SandboxBackend> {
        Box::new(Self::new(config, session_key, workspace))
    }

    /// Write the backend's settings file to `~/.vikingbot/sandboxes/{key}-srt-settings.json`
    /// and return its path. Failure to write is logged, not fatal — `start()`
    /// will surface the real problem when it tries to launch the wrapper.
    fn generate_settings(config: &SandboxConfig, session_key: &str) -> PathBuf {
        let srt_config = json!({
            "network": {
                "allowedDomains": config.network.allowed_domains,
                "deniedDomains": config.network.denied_domains,
                "allowLocalBinding": config.network.allow_local_binding,
            },
            "filesystem": {
                "denyRead": config.filesystem.deny_read,
                "allowWrite": config.filesystem.allow_write,
                "denyWrite": config.filesystem.deny_write,
            },
        });

        let dir = get_sandboxes_path();
        let path = dir.join(format!("{}-srt-settings.json", sanitize_session_key(session_key)));

        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(error = %e, "failed to create sandboxes directory");
        }
        match serde_json::to_string_pretty(&srt_config) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&path, contents) {
                    warn!(error = %e, path = %path.display(), "failed to write SRT settings file");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize SRT settings"),
        }

        path
    }

    /// Build the `initialize` payload: the static config plus the sandbox's
    /// own workspace and `/tmp` auto-injected into `allowWrite` (deduped).
    fn load_config(&self) -> Value {
        let workspace_str = self
            .workspace
            .canonicalize()
            .unwrap_or_else(|_| self.workspace.clone())
            .to_string_lossy()
            .to_string();

        let mut allow_write = self.config.filesystem.allow_write.clone();
        if !allow_write.contains(&workspace_str) {
            allow_write.push(workspace_str);
        }
        let tmp_dir = "/tmp".to_string();
        if !allow_write.contains(&tmp_dir) {
            allow_write.push(tmp_dir);
        }

        json!({
            "network": {
                "allowedDomains": self.config.network.allowed_domains,
                "deniedDomains": self.config.network.denied_domains,
                "allowLocalBinding": self.config.network.allow_local_binding,
            },
            "filesystem": {
                "denyRead": self.config.filesystem.deny_read,
                "allowWrite": allow_write,
                "denyWrite": self.config.filesystem.deny_write,
            },
        })
    }

    async fn send_message(proc: &mut RunningProcess, message: &Value) -> Result<(), SandboxError> {
        let mut data = serde_json::to_vec(message).map_err(|e| SandboxError::Protocol(e.to_string()))?;
        data.push(b'\n');
        proc.stdin.write_all(&data).await?;
        proc.stdin.flush().await?;
        Ok(())
    }

    async fn wait_for_response(proc: &mut RunningProcess, timeout_secs: u64) -> Result<Value, SandboxError> {
        match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), proc.responses.recv()).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(SandboxError::Protocol("wrapper response stream closed".to_string())),
            Err(_) => Err(SandboxError::Timeout),
        }
    }

    fn spawn_reader(stdout: tokio::process::ChildStdout) -> (mpsc::Receiver<Value>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Value>(&line) {
                            Ok(value) => {
                                if tx.send(value).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!(error = %e, line = %line, "failed to parse sandbox wrapper response"),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "error reading sandbox wrapper stdout");
                        break;
                    }
                }
            }
        });
        (rx, task)
    }

    fn spawn_stderr_logger(stderr: tokio::process::ChildStderr) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    error!("[SRT wrapper stderr] {}", line);
                }
            }
        })
    }
}

#[async_trait]
impl SandboxBackend for SrtBackend {
    async fn start(&self) -> Result<(), SandboxError> {
        tokio::fs::create_dir_all(&self.workspace).await?;

        let cmd_args = vec![
            self.config.backends.srt.wrapper_path.clone(),
            self.settings_path.to_string_lossy().to_string(),
            self.workspace.to_string_lossy().to_string(),
        ];
        info!(cmd = ?cmd_args, node = %self.config.backends.srt.node_path, "starting SRT sandbox");

        let mut child = Command::new(&self.config.backends.srt.node_path)
            .args(&cmd_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| SandboxError::StartFailed("no stdin handle".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| SandboxError::StartFailed("no stdout handle".to_string()))?;
        let stderr = child.stderr.take().ok_or_else(|| SandboxError::StartFailed("no stderr handle".to_string()))?;

        let (responses, reader_task) = Self::spawn_reader(stdout);
        let stderr_task = Self::spawn_stderr_logger(stderr);

        let mut proc = RunningProcess {
            child,
            stdin,
            responses,
            reader_task,
            stderr_task,
        };

        let ready = Self::wait_for_response(&mut proc, DEFAULT_WAIT_SECS).await?;
        if ready.get("type").and_then(Value::as_str) != Some("ready") {
            return Err(SandboxError::StartFailed(format!("unexpected response from wrapper: {ready}")));
        }

        let init_msg = json!({"type": "initialize", "config": self.load_config()});
        Self::send_message(&mut proc, &init_msg).await?;

        let response = Self::wait_for_response(&mut proc, DEFAULT_WAIT_SECS).await?;
        match response.get("type").and_then(Value::as_str) {
            Some("initialize_failed") => {
                let errors = response.get("errors").cloned().unwrap_or(Value::Null);
                if let Some(warnings) = response.get("warnings") {
                    warn!(?warnings, "sandbox warnings during failed initialization");
                }
                return Err(SandboxError::StartFailed(format!("failed to initialize sandbox: {errors}")));
            }
            Some("initialized") => {
                if let Some(warnings) = response.get("warnings") {
                    if warnings.as_array().map(|a| !a.is_empty()).unwrap_or(false) {
                        warn!(?warnings, "sandbox initialization warnings");
                    }
                }
                info!(session = %self.session_key, "SRT sandbox initialized successfully");
            }
            _ => return Err(SandboxError::StartFailed(format!("unexpected response from wrapper: {response}"))),
        }

        *self.process.lock().await = Some(proc);
        Ok(())
    }

    async fn execute(&self, command: &str, timeout_secs: u64) -> Result<String, SandboxError> {
        if command.trim() == "pwd" {
            return Ok("/".to_string());
        }

        let mut guard = self.process.lock().await;
        let proc = guard.as_mut().ok_or(SandboxError::NotStarted)?;

        let msg = json!({
            "type": "execute",
            "command": command,
            "timeout": timeout_secs * 1000,
            "customConfig": Value::Null,
        });
        Self::send_message(proc, &msg).await?;

        let response = Self::wait_for_response(proc, timeout_secs + 5).await?;

        match response.get("type").and_then(Value::as_str) {
            Some("error") => {
                let message = response.get("message").and_then(Value::as_str).unwrap_or("unknown error");
                return Err(SandboxError::Execution(message.to_string()));
            }
            Some("executed") => {}
            _ => return Err(SandboxError::Protocol(format!("unexpected response from wrapper: {response}"))),
        }

        let stdout = response.get("stdout").and_then(Value::as_str).unwrap_or("");
        let stderr = response.get("stderr").and_then(Value::as_str).unwrap_or("");
        let exit_code = response.get("exitCode").and_then(Value::as_i64).unwrap_or(0);

        let mut parts = Vec::new();
        if !stdout.is_empty() {
            parts.push(stdout.to_string());
        }
        if !stderr.is_empty() {
            parts.push(format!("STDERR:\n{stderr}"));
        }
        if exit_code != 0 {
            parts.push(format!("\nExit code: {exit_code}"));
        }
        let mut result = if parts.is_empty() { "(no output)".to_string() } else { parts.join("\n") };

        if let Some(violations) = response.get("violations") {
            if violations.as_array().map(|a| !a.is_empty()).unwrap_or(false) {
                warn!(?violations, "sandbox violations during command execution");
            }
        }

        debug!(result = %truncate_for_log(&result), "SRT execution result");

        if result.chars().count() > MAX_OUTPUT_LEN {
            let truncated: String = result.chars().take(MAX_OUTPUT_LEN).collect();
            let remaining = result.chars().count() - MAX_OUTPUT_LEN;
            result = format!("{truncated}\n... (truncated, {remaining} more chars)");
        }

        Ok(result)
    }

    async fn stop(&self) -> Result<(), SandboxError> {
        let mut guard = self.process.lock().await;
        let Some(mut proc) = guard.take() else {
            return Ok(());
        };

        proc.reader_task.abort();
        proc.stderr_task.abort();

        let _ = Self::send_message(&mut proc, &json!({"type": "reset"})).await;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        let _ = proc.child.start_kill();
        match tokio::time::timeout(std::time::Duration::from_secs(5), proc.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                let _ = proc.child.kill().await;
            }
        }
        Ok(())
    }

    async fn is_running(&self) -> bool {
        let mut guard = self.process.lock().await;
        match guard.as_mut() {
            Some(proc) => matches!(proc.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn workspace(&self) -> &Path {
        &self.workspace
    }
}

fn truncate_for_log(s: &str) -> String {
    if s.chars().count() > 2000 {
        let head: String = s.chars().take(2000).collect();
        format!("{head}... (truncated)")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxibot_core::config::schema::SandboxConfig;

    fn test_config() -> SandboxConfig {
        SandboxConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_path_sanitizes_colon() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("HOME", dir.path());
        let path = SrtBackend::generate_settings(&test_config(), "telegram:12345");
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("telegram_12345"));
    }

    #[tokio::test]
    async fn test_execute_pwd_shortcut_without_process() {
        let backend = SrtBackend::new(test_config(), "test:1".to_string(), PathBuf::from("/tmp/oxibot-test-ws"));
        let result = backend.execute("pwd", 5).await.unwrap();
        assert_eq!(result, "/");
    }

    #[tokio::test]
    async fn test_execute_without_start_fails() {
        let backend = SrtBackend::new(test_config(), "test:2".to_string(), PathBuf::from("/tmp/oxibot-test-ws2"));
        let result = backend.execute("echo hi", 5).await;
        assert!(matches!(result, Err(SandboxError::NotStarted)));
    }

    #[tokio::test]
    async fn test_is_running_false_before_start() {
        let backend = SrtBackend::new(test_config(), "test:3".to_string(), PathBuf::from("/tmp/oxibot-test-ws3"));
        assert!(!backend.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let backend = SrtBackend::new(test_config(), "test:4".to_string(), PathBuf::from("/tmp/oxibot-test-ws4"));
        backend.stop().await.unwrap();
    }

    #[test]
    fn test_load_config_injects_workspace_and_tmp() {
        let backend = SrtBackend::new(test_config(), "test:5".to_string(), PathBuf::from("/tmp/oxibot-test-ws5"));
        let cfg = backend.load_config();
        let allow_write = cfg["filesystem"]["allowWrite"].as_array().unwrap();
        let strs: Vec<&str> = allow_write.iter().filter_map(Value::as_str).collect();
        assert!(strs.contains(&"/tmp"));
    }
}
