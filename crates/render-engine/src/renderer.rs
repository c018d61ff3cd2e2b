//! External renderer process management.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Notify;

use cutline_common::{CutlineError, CutlineResult};

/// Everything a renderer needs to start one job.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub job_id: String,
    pub program: String,
    pub args: Vec<String>,

    /// Receives the process's stdout and stderr.
    pub log_path: PathBuf,

    /// Written on a zero exit status.
    pub done_path: PathBuf,

    /// Written with a diagnostic on failure.
    pub error_path: PathBuf,
}

/// Handle to a launched render. Cloneable; terminating is best effort.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    pid: Option<u32>,
    kill: Arc<Notify>,
}

impl RenderHandle {
    pub fn new(pid: Option<u32>) -> Self {
        Self {
            pid,
            kill: Arc::new(Notify::new()),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the render to stop. A request made before the watcher waits is kept.
    pub fn terminate(&self) {
        self.kill.notify_one();
    }

    /// Resolves once [`Self::terminate`] has been called.
    pub async fn terminated(&self) {
        self.kill.notified().await;
    }
}

/// Starts render processes.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn launch(&self, request: LaunchRequest) -> CutlineResult<RenderHandle>;
}

/// Spawns FFmpeg with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer;

impl FfmpegRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    async fn launch(&self, request: LaunchRequest) -> CutlineResult<RenderHandle> {
        let log = tokio::fs::File::create(&request.log_path)
            .await
            .with_context(|| format!("Failed to create log {}", request.log_path.display()))?;
        let stderr_log = log
            .try_clone()
            .await
            .context("Failed to share the log handle")?;

        let mut child = tokio::process::Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(log.into_std().await)
            .stderr(stderr_log.into_std().await)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", request.program))?;

        let handle = RenderHandle::new(child.id());
        tracing::info!(
            job_id = %request.job_id,
            pid = ?handle.pid(),
            args_len = request.args.len(),
            "Render process started"
        );

        let watcher = handle.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let result = match status {
                        Ok(status) if status.success() => {
                            write_marker(&request.done_path, "").await
                        }
                        Ok(status) => {
                            tracing::warn!(job_id = %request.job_id, %status, "Render failed");
                            write_marker(
                                &request.error_path,
                                &format!("FFmpeg failed with {status}"),
                            )
                            .await
                        }
                        Err(e) => {
                            write_marker(
                                &request.error_path,
                                &format!("Failed to wait on renderer: {e}"),
                            )
                            .await
                        }
                    };
                    if let Err(e) = result {
                        tracing::warn!(job_id = %request.job_id, error = %e, "Failed to write job marker");
                    }
                }
                _ = watcher.terminated() => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(job_id = %request.job_id, error = %e, "Failed to kill render process");
                    }
                    tracing::info!(job_id = %request.job_id, "Render process terminated");
                }
            }
        });

        Ok(handle)
    }
}

/// Stop a render process by pid when no handle to it exists in this process.
pub async fn kill_process(pid: u32) -> CutlineResult<()> {
    let pid_arg = pid.to_string();

    #[cfg(not(windows))]
    let mut command = {
        let mut command = tokio::process::Command::new("kill");
        command.args(["-TERM", &pid_arg]);
        command
    };
    #[cfg(windows)]
    let mut command = {
        let mut command = tokio::process::Command::new("taskkill");
        command.args(["/PID", &pid_arg, "/T", "/F"]);
        command
    };

    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .context("Failed to run kill")?;

    if status.success() {
        tracing::info!(pid, "Render process killed by pid");
        Ok(())
    } else {
        Err(CutlineError::render(format!(
            "Could not kill render process {pid}: {status}"
        )))
    }
}

async fn write_marker(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await
}
