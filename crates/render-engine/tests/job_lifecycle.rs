use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use tempfile::TempDir;
use uuid::Uuid;

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::{ClipSet, MediaClip, MediaKind, Project, ProjectStore, TrackKind};
use cutline_render_engine::{
    compile, FileRemover, JobManager, JobManagerConfig, JobStatus, LaunchRequest, RenderHandle,
    RenderRequest, Renderer, ResolvedInputs, RetryPolicy,
};

/// Records launches; the test drives the job by writing files.
#[derive(Default)]
struct FakeRenderer {
    launched: Mutex<Vec<LaunchRequest>>,
    handles: Mutex<Vec<RenderHandle>>,
    fail: bool,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn launch(&self, request: LaunchRequest) -> CutlineResult<RenderHandle> {
        if self.fail {
            return Err(CutlineError::render("ffmpeg not found"));
        }
        let handle = RenderHandle::new(None);
        self.launched.lock().push(request);
        self.handles.lock().push(handle.clone());
        Ok(handle)
    }
}

impl FakeRenderer {
    fn last(&self) -> LaunchRequest {
        self.launched.lock().last().cloned().unwrap()
    }
}

/// Refuses to delete artifacts, as if another process held them open.
struct LockedArtifacts;

impl FileRemover for LockedArtifacts {
    fn remove(&self, path: &Path) -> io::Result<()> {
        if path.extension().map_or(false, |e| e == "mp4") {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        std::fs::remove_file(path)
    }
}

fn config(root: &Path) -> JobManagerConfig {
    JobManagerConfig {
        temp_dir: root.join(".tmp"),
        renders_dir: root.join("renders"),
        ffmpeg_path: "ffmpeg".into(),
        fonts_dir: root.join("fonts"),
        kill_grace: Duration::from_millis(5),
        retry: RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
        log_tail_lines: 20,
    }
}

fn request() -> RenderRequest {
    let mut store = ProjectStore::new(Project::new("jobs"));
    let track = store.add_track(TrackKind::Video);
    let clip = MediaClip::new(MediaKind::Video, track, Uuid::new_v4(), "a.mp4", 10.0);
    store.upsert_clips(ClipSet::media(vec![clip])).unwrap();
    let project = store.into_project();

    let plan = compile(&project).unwrap();
    let inputs = ResolvedInputs::new(vec![PathBuf::from("/media/a")]);
    RenderRequest {
        plan,
        inputs,
        settings: project.export_settings().clone(),
    }
}

fn setup(renderer: FakeRenderer) -> (TempDir, Arc<FakeRenderer>, JobManager) {
    let dir = tempfile::tempdir().unwrap();
    let renderer = Arc::new(renderer);
    let manager = JobManager::new(config(dir.path()), renderer.clone());
    (dir, renderer, manager)
}

fn temp_file(dir: &TempDir, id: Uuid, ext: &str) -> PathBuf {
    dir.path().join(".tmp").join(format!("{id}.{ext}"))
}

#[tokio::test]
async fn submit_writes_manifest_and_starts() {
    let (dir, renderer, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();

    let manifest = std::fs::read_to_string(temp_file(&dir, id, "json")).unwrap();
    assert!(manifest.contains(&format!("\"output\": \"{id}.mp4\"")));
    assert!(manifest.contains("\"duration\": 10.0"));

    let launch = renderer.last();
    assert_eq!(launch.log_path, temp_file(&dir, id, "log"));
    assert_eq!(launch.args.last().unwrap(), &temp_file(&dir, id, "mp4").display().to_string());

    assert_eq!(manager.poll_status(id).await.unwrap(), JobStatus::Starting);
}

#[tokio::test]
async fn progress_is_read_from_the_log() {
    let (dir, _, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();

    std::fs::write(
        temp_file(&dir, id, "log"),
        "Input #0, mov\nframe=1\nout_time_us=2500000\nprogress=continue\n",
    )
    .unwrap();
    match manager.poll_status(id).await.unwrap() {
        JobStatus::Processing {
            progress_percent,
            log_tail,
        } => {
            assert_eq!(progress_percent, 25);
            assert_eq!(log_tail.last().map(String::as_str), Some("progress=continue"));
        }
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn cancel_wins_after_progress_was_observed() {
    let (dir, renderer, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();

    std::fs::write(temp_file(&dir, id, "log"), "out_time_us=8000000\n").unwrap();
    std::fs::write(temp_file(&dir, id, "mp4"), b"partial").unwrap();
    assert!(matches!(
        manager.poll_status(id).await.unwrap(),
        JobStatus::Processing { progress_percent: 80, .. }
    ));

    let report = manager.cancel(id).await.unwrap();
    assert!(report.failed.is_empty());
    assert!(report.deleted.contains(&format!("{id}.mp4")));
    assert!(report.deleted.contains(&format!("{id}.log")));
    assert!(report.deleted.contains(&format!("{id}.json")));

    // The renderer finishing late must not resurrect the job.
    std::fs::write(temp_file(&dir, id, "done"), b"").unwrap();
    assert_eq!(manager.poll_status(id).await.unwrap(), JobStatus::Cancelled);

    let marker = std::fs::read_to_string(temp_file(&dir, id, "cancelled")).unwrap();
    assert!(marker.contains("Deleted:"));
    assert!(marker.contains(&format!("{id}.mp4")));
    assert!(!temp_file(&dir, id, "mp4").exists());

    let handle = renderer.handles.lock()[0].clone();
    tokio::time::timeout(Duration::from_secs(1), handle.terminated())
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_marker_survives_restart() {
    let (dir, renderer, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();
    manager.cancel(id).await.unwrap();

    let fresh = JobManager::new(config(dir.path()), renderer);
    assert_eq!(fresh.poll_status(id).await.unwrap(), JobStatus::Cancelled);
}

#[tokio::test]
async fn cancel_is_idempotent() {
    let (_dir, _, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();

    manager.cancel(id).await.unwrap();
    let again = manager.cancel(id).await.unwrap();
    assert!(again.deleted.is_empty());
    assert!(again.failed.is_empty());
    assert_eq!(manager.poll_status(id).await.unwrap(), JobStatus::Cancelled);
}

#[tokio::test]
async fn locked_files_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let manager = JobManager::new(config(dir.path()), Arc::new(FakeRenderer::default()))
        .with_remover(Arc::new(LockedArtifacts));
    let id = manager.submit(request()).await.unwrap();
    std::fs::write(temp_file(&dir, id, "mp4"), b"held").unwrap();

    let report = manager.cancel(id).await.unwrap();
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].starts_with(&format!("{id}.mp4")));
    assert!(temp_file(&dir, id, "cancelled").exists());
    assert_eq!(manager.poll_status(id).await.unwrap(), JobStatus::Cancelled);
}

#[tokio::test]
async fn completion_then_persist() {
    let (dir, _, manager) = setup(FakeRenderer::default());
    let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();

    let first = manager.submit(request()).await.unwrap();
    std::fs::write(temp_file(&dir, first, "mp4"), b"video").unwrap();
    std::fs::write(temp_file(&dir, first, "done"), b"").unwrap();

    let status = manager.poll_status(first).await.unwrap();
    assert_eq!(
        status,
        JobStatus::Complete {
            artifact: temp_file(&dir, first, "mp4")
        }
    );

    // Cancel after an observed completion leaves the artifact alone.
    let report = manager.cancel(first).await.unwrap();
    assert!(report.deleted.is_empty());
    assert!(temp_file(&dir, first, "mp4").exists());

    let saved = manager
        .persist_artifact_on(first, "My/Film", date)
        .await
        .unwrap();
    assert_eq!(saved.file_name, "MyFilm_0307_v001.mp4");
    assert_eq!(std::fs::read(&saved.path).unwrap(), b"video");
    assert!(!temp_file(&dir, first, "mp4").exists());

    let second = manager.submit(request()).await.unwrap();
    std::fs::write(temp_file(&dir, second, "mp4"), b"again").unwrap();
    let saved = manager
        .persist_artifact_on(second, "My/Film", date)
        .await
        .unwrap();
    assert_eq!(saved.file_name, "MyFilm_0307_v002.mp4");
}

#[tokio::test]
async fn persist_without_artifact_is_file_not_found() {
    let (_dir, _, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();
    assert!(matches!(
        manager.persist_artifact(id, "x").await,
        Err(CutlineError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn launch_failure_still_returns_job_id() {
    let (_dir, _, manager) = setup(FakeRenderer {
        fail: true,
        ..FakeRenderer::default()
    });
    let id = manager.submit(request()).await.unwrap();
    match manager.poll_status(id).await.unwrap() {
        JobStatus::Error { message } => assert!(message.contains("ffmpeg not found")),
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (_dir, _, manager) = setup(FakeRenderer::default());
    assert!(matches!(
        manager.poll_status(Uuid::new_v4()).await,
        Err(CutlineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn cleanup_can_preserve_the_artifact() {
    let (dir, _, manager) = setup(FakeRenderer::default());
    let id = manager.submit(request()).await.unwrap();
    for ext in ["mp4", "log", "done"] {
        std::fs::write(temp_file(&dir, id, ext), b"").unwrap();
    }

    let report = manager.cleanup_finished(id, true).await.unwrap();
    assert_eq!(report.preserved, vec![format!("{id}.mp4")]);
    assert_eq!(report.deleted.len(), 3);
    assert!(temp_file(&dir, id, "mp4").exists());

    let report = manager.cleanup_finished(id, false).await.unwrap();
    assert_eq!(report.deleted, vec![format!("{id}.mp4")]);
}

#[tokio::test]
async fn cancelling_an_unknown_job_leaves_no_marker() {
    let (dir, _, manager) = setup(FakeRenderer::default());
    let id = Uuid::new_v4();

    let report = manager.cancel(id).await.unwrap();
    assert!(report.deleted.is_empty());
    assert!(report.failed.is_empty());
    assert!(!temp_file(&dir, id, "cancelled").exists());
    assert!(matches!(
        manager.poll_status(id).await,
        Err(CutlineError::NotFound { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn cancel_from_a_fresh_manager_stops_the_renderer() {
    use std::os::unix::fs::PermissionsExt;

    use cutline_render_engine::FfmpegRenderer;

    let dir = tempfile::tempdir().unwrap();
    let sentinel = dir.path().join("still_ran");
    let script = dir.path().join("fake-ffmpeg");
    std::fs::write(
        &script,
        format!("#!/bin/sh\nsleep 2\ntouch {}\n", sentinel.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut cfg = config(dir.path());
    cfg.ffmpeg_path = script.display().to_string();

    let submitter = JobManager::new(cfg.clone(), Arc::new(FfmpegRenderer::new()));
    let id = submitter.submit(request()).await.unwrap();
    let manifest = std::fs::read_to_string(temp_file(&dir, id, "json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();
    assert!(manifest["renderer_pid"].as_u64().is_some());

    let fresh = JobManager::new(cfg, Arc::new(FfmpegRenderer::new()));
    fresh.cancel(id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!sentinel.exists());
    assert!(!temp_file(&dir, id, "done").exists());
    assert_eq!(fresh.poll_status(id).await.unwrap(), JobStatus::Cancelled);
}
