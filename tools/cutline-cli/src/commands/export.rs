//! Render a project through FFmpeg.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use cutline_common::AppConfig;
use cutline_project_model::ExportFormat;
use cutline_render_engine::{
    compile, ffmpeg_available, log_tail, resolve_inputs, DirBlobStore, JobStatus, RenderRequest,
};

pub async fn run(
    path: PathBuf,
    format: Option<String>,
    fps: Option<u32>,
    persist: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = super::load(&path)?;

    let mut settings = project.project.export_settings().clone();
    if let Some(format) = format {
        settings.format = format
            .parse::<ExportFormat>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(fps) = fps {
        settings.fps = fps;
    }

    if !ffmpeg_available(&config.render.ffmpeg_path) {
        anyhow::bail!(
            "FFmpeg not found at '{}'. Install it or set FFMPEG_PATH.",
            config.render.ffmpeg_path
        );
    }

    let plan = compile(&project.project)?;
    let blobs = DirBlobStore::new(project.media_dir());
    let inputs = resolve_inputs(&plan, &blobs)?;

    let (width, height) = (plan.width, plan.height);
    println!("  Format: {:?}", settings.format);
    println!("  Resolution: {width}x{height} @ {}fps", settings.fps);
    println!("  Duration: {:.3}s", plan.duration);

    let manager = super::job_manager(&project.root, config);
    let job = manager
        .submit(RenderRequest {
            plan,
            inputs,
            settings,
        })
        .await?;
    println!("  Job: {job}");

    let poll_interval = Duration::from_millis(config.render.poll_interval_ms.max(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let artifact = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!("\nCancelling...");
                let report = manager.cancel(job).await?;
                println!("Export cancelled ({} file(s) removed)", report.deleted.len());
                for reason in &report.failed {
                    println!("  Could not delete {reason}");
                }
                return Ok(());
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        match manager.poll_status(job).await? {
            JobStatus::Starting => {}
            JobStatus::Processing {
                progress_percent, ..
            } => {
                print!("\r  Progress: {progress_percent:>3}%  ");
                std::io::stdout().flush().ok();
            }
            JobStatus::Complete { artifact } => break artifact,
            JobStatus::Error { message } => {
                println!("\nExport failed: {message}");
                let log_path = manager.config().temp_dir.join(format!("{job}.log"));
                if let Ok(log) = std::fs::read_to_string(log_path) {
                    for line in log_tail(&log, manager.config().log_tail_lines) {
                        println!("  | {line}");
                    }
                }
                anyhow::bail!("Render job {job} failed");
            }
            JobStatus::Cancelled => {
                println!("\nExport was cancelled");
                return Ok(());
            }
        }
    };

    println!("\r  Progress: 100%  ");
    if !persist {
        println!("Export complete: {}", artifact.display());
        return Ok(());
    }

    let saved = manager
        .persist_artifact(job, project.project.name())
        .await?;
    let report = manager.cleanup_finished(job, false).await?;
    tracing::debug!(job_id = %job, deleted = report.deleted.len(), "Job files removed");
    println!("Export complete: {}", saved.path.display());
    Ok(())
}
