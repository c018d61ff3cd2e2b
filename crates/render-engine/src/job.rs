//! Render job manager.
//!
//! A job moves `starting → processing → complete | error`, and may be
//! cancelled from `starting` or `processing`. State lives on disk as
//! `<job_id>.<ext>` files in the job namespace directory, so a fresh
//! manager can still answer for jobs started by another process:
//!
//! | file                | meaning                                  |
//! |---------------------|------------------------------------------|
//! | `<id>.json`         | manifest (duration, output name, sources)|
//! | `<id>.log`          | renderer stdout/stderr                   |
//! | `<id>.mp4` etc.     | the artifact                             |
//! | `<id>.done`         | renderer exited successfully             |
//! | `<id>.error`        | renderer failed, with diagnostic text    |
//! | `<id>.cancelled`    | cancelled, listing what was deleted      |
//!
//! In-memory state only adds the process handle and the two facts that
//! must win races: a cancel request, and an observed completion.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cutline_common::{CutlineError, CutlineResult, RenderDefaults};
use cutline_project_model::{BlobId, ExportFormat, ExportSettings};

use crate::blob::ResolvedInputs;
use crate::cleanup::{self, CleanupReport, FileRemover, FsRemover, RetryPolicy};
use crate::compiler::RenderPlan;
use crate::ffmpeg::{log_tail, FfmpegCommand, ProgressState};
use crate::renderer::{kill_process, LaunchRequest, RenderHandle, Renderer};

pub type JobId = Uuid;

const MANIFEST_EXT: &str = "json";
const LOG_EXT: &str = "log";
const DONE_EXT: &str = "done";
const ERROR_EXT: &str = "error";
const CANCELLED_EXT: &str = "cancelled";

/// Job manager settings.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Job namespace directory.
    pub temp_dir: PathBuf,

    /// Where persisted artifacts go.
    pub renders_dir: PathBuf,

    pub ffmpeg_path: String,
    pub fonts_dir: PathBuf,

    /// Wait after terminating a process before deleting its files.
    pub kill_grace: Duration,

    pub retry: RetryPolicy,
    pub log_tail_lines: usize,
}

impl JobManagerConfig {
    /// Settings for a project directory, taking tunables from `defaults`.
    pub fn for_project(root: &Path, defaults: &RenderDefaults) -> Self {
        Self {
            temp_dir: root.join(&defaults.temp_dir_name),
            renders_dir: root.join(&defaults.renders_dir_name),
            ffmpeg_path: defaults.ffmpeg_path.clone(),
            fonts_dir: defaults.fonts_dir.clone(),
            kill_grace: Duration::from_millis(defaults.kill_grace_ms),
            retry: RetryPolicy::from(defaults),
            log_tail_lines: defaults.log_tail_lines,
        }
    }
}

/// A compiled render ready to submit.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub plan: RenderPlan,
    pub inputs: ResolvedInputs,
    pub settings: ExportSettings,
}

/// Written next to every job so status can be recovered from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    pub job_id: JobId,
    pub duration: f64,

    /// Artifact file name inside the job namespace.
    pub output: String,

    pub format: ExportFormat,
    pub sources: Vec<BlobId>,
    pub created_at: DateTime<Utc>,

    /// Renderer process id, once launched. Lets another manager stop it.
    #[serde(default)]
    pub renderer_pid: Option<u32>,
}

/// Observable job state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing {
        progress_percent: u8,
        log_tail: Vec<String>,
    },
    Complete {
        artifact: PathBuf,
    },
    Error {
        message: String,
    },
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Complete { .. } | JobStatus::Error { .. } | JobStatus::Cancelled
        )
    }
}

/// Files a cancel removed and could not remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

/// Where a persisted artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedArtifact {
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct JobEntry {
    handle: Option<RenderHandle>,
    cancelled: bool,
    completed: bool,
}

/// Submits, tracks, cancels, and cleans up render jobs.
pub struct JobManager {
    config: JobManagerConfig,
    renderer: Arc<dyn Renderer>,
    remover: Arc<dyn FileRemover>,
    jobs: Mutex<HashMap<JobId, JobEntry>>,
}

impl JobManager {
    pub fn new(config: JobManagerConfig, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            remover: Arc::new(FsRemover),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_remover(mut self, remover: Arc<dyn FileRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn config(&self) -> &JobManagerConfig {
        &self.config
    }

    fn job_path(&self, id: JobId, ext: &str) -> PathBuf {
        self.config.temp_dir.join(format!("{id}.{ext}"))
    }

    /// Write the manifest and start the renderer.
    ///
    /// Errors building the command are returned. Once the manifest exists a
    /// job id is always returned; a launch failure shows up as `error` status.
    pub async fn submit(&self, request: RenderRequest) -> CutlineResult<JobId> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;

        let id = Uuid::new_v4();
        let ext = request.settings.format.extension();
        let output = self.job_path(id, ext);
        let command = FfmpegCommand::build(
            &request.plan,
            &request.inputs,
            &request.settings,
            &self.config.fonts_dir,
            &output,
        )?
        .with_program(&self.config.ffmpeg_path);

        let manifest = JobManifest {
            job_id: id,
            duration: request.plan.duration,
            output: format!("{id}.{ext}"),
            format: request.settings.format,
            sources: request.plan.sources(),
            created_at: Utc::now(),
            renderer_pid: None,
        };
        self.write_manifest(&manifest).await?;
        self.jobs.lock().insert(id, JobEntry::default());

        tracing::info!(job_id = %id, duration = manifest.duration, format = ext, "Render job submitted");

        let launch = LaunchRequest {
            job_id: id.to_string(),
            program: command.program,
            args: command.args,
            log_path: self.job_path(id, LOG_EXT),
            done_path: self.job_path(id, DONE_EXT),
            error_path: self.job_path(id, ERROR_EXT),
        };
        match self.renderer.launch(launch).await {
            Ok(handle) => {
                let pid = handle.pid();
                {
                    let mut jobs = self.jobs.lock();
                    let entry = jobs.entry(id).or_default();
                    if entry.cancelled {
                        handle.terminate();
                        return Ok(id);
                    }
                    entry.handle = Some(handle);
                }
                if pid.is_some() {
                    self.write_manifest(&JobManifest {
                        renderer_pid: pid,
                        ..manifest
                    })
                    .await?;
                    let cancelled = self.jobs.lock().get(&id).map_or(false, |e| e.cancelled);
                    if cancelled {
                        // A cancel finished while the manifest was being rewritten.
                        cleanup::remove_with_retry(
                            self.remover.as_ref(),
                            &self.job_path(id, MANIFEST_EXT),
                            self.config.retry,
                        )
                        .await
                        .ok();
                    }
                }
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Render launch failed");
                tokio::fs::write(self.job_path(id, ERROR_EXT), e.to_string()).await?;
            }
        }
        Ok(id)
    }

    /// Current state of a job.
    pub async fn poll_status(&self, id: JobId) -> CutlineResult<JobStatus> {
        let (known, cancelled) = {
            let jobs = self.jobs.lock();
            match jobs.get(&id) {
                Some(entry) => (true, entry.cancelled),
                None => (false, false),
            }
        };

        if cancelled || exists(&self.job_path(id, CANCELLED_EXT)).await {
            return Ok(JobStatus::Cancelled);
        }

        let manifest = self.read_manifest(id).await;

        if exists(&self.job_path(id, DONE_EXT)).await {
            let artifact = match self.find_artifact(id, manifest.as_ref()).await {
                Some(path) => path,
                None => {
                    return Ok(JobStatus::Error {
                        message: "renderer finished but the artifact is missing".into(),
                    })
                }
            };
            self.jobs.lock().entry(id).or_default().completed = true;
            tracing::info!(job_id = %id, artifact = %artifact.display(), "Render job complete");
            return Ok(JobStatus::Complete { artifact });
        }

        if let Ok(message) = tokio::fs::read_to_string(self.job_path(id, ERROR_EXT)).await {
            return Ok(JobStatus::Error {
                message: message.trim().to_string(),
            });
        }

        let log = match tokio::fs::read(self.job_path(id, LOG_EXT)).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) if known || manifest.is_some() => return Ok(JobStatus::Starting),
            Err(_) => return Err(CutlineError::not_found(format!("render job {id}"))),
        };

        let duration = manifest.as_ref().map_or(0.0, |m| m.duration);
        let progress = ProgressState::from_log(&log);
        let progress_percent = progress.percent(duration);
        tracing::debug!(job_id = %id, progress = progress_percent, "Render job progress");

        Ok(JobStatus::Processing {
            progress_percent,
            log_tail: log_tail(&log, self.config.log_tail_lines),
        })
    }

    /// Stop a job and delete its files.
    ///
    /// Once called, every later poll reports `cancelled`. A job already
    /// observed as complete is left alone. Repeating a cancel is harmless.
    pub async fn cancel(&self, id: JobId) -> CutlineResult<CancelReport> {
        let manifest = self.read_manifest(id).await;
        let handle = {
            let mut jobs = self.jobs.lock();
            match jobs.get_mut(&id) {
                Some(entry) if entry.completed => {
                    tracing::info!(job_id = %id, "Cancel ignored for completed job");
                    return Ok(CancelReport::default());
                }
                Some(entry) => {
                    entry.cancelled = true;
                    entry.handle.take()
                }
                None if manifest.is_some() => {
                    jobs.insert(
                        id,
                        JobEntry {
                            cancelled: true,
                            ..JobEntry::default()
                        },
                    );
                    None
                }
                None => {
                    tracing::warn!(job_id = %id, "Cancel ignored for unknown job");
                    return Ok(CancelReport::default());
                }
            }
        };

        if let Some(handle) = handle {
            handle.terminate();
            tokio::time::sleep(self.config.kill_grace).await;
        } else if let Some(pid) = manifest.as_ref().and_then(|m| m.renderer_pid) {
            // A finished process's pid may already belong to something else.
            let exited = exists(&self.job_path(id, DONE_EXT)).await
                || exists(&self.job_path(id, ERROR_EXT)).await;
            if !exited {
                if let Err(e) = kill_process(pid).await {
                    tracing::warn!(job_id = %id, pid, error = %e, "Failed to stop renderer");
                }
                tokio::time::sleep(self.config.kill_grace).await;
            }
        }

        let marker = self.job_path(id, CANCELLED_EXT);
        let marker_name = cleanup::file_name(&marker);
        let removed = cleanup::remove_job_files(
            self.remover.as_ref(),
            &self.config.temp_dir,
            &id.to_string(),
            &[marker_name.as_str()],
            self.config.retry,
        )
        .await?;
        let report = CancelReport {
            deleted: removed.deleted,
            failed: removed.failed,
        };

        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        tokio::fs::write(&marker, cancel_marker(&report)).await?;

        tracing::info!(
            job_id = %id,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Render job cancelled"
        );
        Ok(report)
    }

    /// Remove a finished job's files, optionally keeping the artifact.
    pub async fn cleanup_finished(
        &self,
        id: JobId,
        preserve_artifact: bool,
    ) -> CutlineResult<CleanupReport> {
        let keep: Vec<String> = if preserve_artifact {
            ExportFormat::ALL
                .iter()
                .map(|f| format!("{id}.{}", f.extension()))
                .collect()
        } else {
            Vec::new()
        };
        let keep: Vec<&str> = keep.iter().map(String::as_str).collect();

        let report = cleanup::remove_job_files(
            self.remover.as_ref(),
            &self.config.temp_dir,
            &id.to_string(),
            &keep,
            self.config.retry,
        )
        .await?;
        self.jobs.lock().remove(&id);

        tracing::info!(
            job_id = %id,
            deleted = report.deleted.len(),
            preserved = report.preserved.len(),
            failed = report.failed.len(),
            "Render job cleaned up"
        );
        Ok(report)
    }

    /// Move the artifact into the renders directory under a non-colliding name.
    pub async fn persist_artifact(
        &self,
        id: JobId,
        project_name: &str,
    ) -> CutlineResult<PersistedArtifact> {
        self.persist_artifact_on(id, project_name, Local::now().date_naive())
            .await
    }

    /// [`Self::persist_artifact`] with an explicit date for the name.
    pub async fn persist_artifact_on(
        &self,
        id: JobId,
        project_name: &str,
        date: NaiveDate,
    ) -> CutlineResult<PersistedArtifact> {
        let manifest = self.read_manifest(id).await;
        let source = self
            .find_artifact(id, manifest.as_ref())
            .await
            .ok_or_else(|| CutlineError::FileNotFound {
                path: self.job_path(id, ExportFormat::Mp4.extension()),
            })?;
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| ExportFormat::Mp4.extension().to_string());

        tokio::fs::create_dir_all(&self.config.renders_dir).await?;
        let base = sanitize_name(project_name);
        let stamp = date.format("%m%d");
        let mut version = 1u32;
        let (file_name, path) = loop {
            let file_name = format!("{base}_{stamp}_v{version:03}.{ext}");
            let path = self.config.renders_dir.join(&file_name);
            if !exists(&path).await {
                break (file_name, path);
            }
            version += 1;
        };

        if tokio::fs::rename(&source, &path).await.is_err() {
            // Rename fails across filesystems.
            tokio::fs::copy(&source, &path).await?;
            tokio::fs::remove_file(&source).await?;
        }

        tracing::info!(job_id = %id, file_name = %file_name, "Render artifact persisted");
        Ok(PersistedArtifact { file_name, path })
    }

    /// Drop in-memory state for a job. Files are untouched.
    pub fn forget(&self, id: JobId) {
        self.jobs.lock().remove(&id);
    }

    async fn write_manifest(&self, manifest: &JobManifest) -> CutlineResult<()> {
        tokio::fs::write(
            self.job_path(manifest.job_id, MANIFEST_EXT),
            serde_json::to_vec_pretty(manifest)?,
        )
        .await?;
        Ok(())
    }

    async fn read_manifest(&self, id: JobId) -> Option<JobManifest> {
        let bytes = tokio::fs::read(self.job_path(id, MANIFEST_EXT)).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Unreadable job manifest");
                None
            }
        }
    }

    async fn find_artifact(&self, id: JobId, manifest: Option<&JobManifest>) -> Option<PathBuf> {
        if let Some(manifest) = manifest {
            let path = self.config.temp_dir.join(&manifest.output);
            if exists(&path).await {
                return Some(path);
            }
        }
        for format in ExportFormat::ALL {
            let path = self.job_path(id, format.extension());
            if exists(&path).await {
                return Some(path);
            }
        }
        None
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

fn cancel_marker(report: &CancelReport) -> String {
    let mut text = format!("Cancelled at {}\nDeleted:\n", Utc::now().to_rfc3339());
    for name in &report.deleted {
        text.push_str(&format!("  {name}\n"));
    }
    text.push_str("Failed:\n");
    for name in &report.failed {
        text.push_str(&format!("  {name}\n"));
    }
    text
}

/// Strip path separators so the name stays inside the renders directory.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Film"), "My Film");
        assert_eq!(sanitize_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_name("a\\b"), "ab");
        assert_eq!(sanitize_name("  "), "untitled");
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(JobStatus::Processing {
            progress_percent: 42,
            log_tail: vec!["frame=1".into()],
        })
        .unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress_percent"], 42);

        let json = serde_json::to_value(JobStatus::Cancelled).unwrap();
        assert_eq!(json, serde_json::json!({"status": "cancelled"}));
    }

    #[test]
    fn test_cancel_marker_lists_files() {
        let text = cancel_marker(&CancelReport {
            deleted: vec!["a.mp4".into()],
            failed: vec!["a.log: busy".into()],
        });
        assert!(text.contains("Deleted:\n  a.mp4\n"));
        assert!(text.contains("Failed:\n  a.log: busy\n"));
    }

    #[test]
    fn test_config_for_project() {
        let defaults = RenderDefaults::default();
        let config = JobManagerConfig::for_project(Path::new("/p"), &defaults);
        assert_eq!(config.temp_dir, Path::new("/p/.tmp"));
        assert_eq!(config.renders_dir, Path::new("/p/renders"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.log_tail_lines, 20);
    }
}
