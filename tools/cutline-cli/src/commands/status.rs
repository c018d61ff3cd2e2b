//! Show the status of a render job.

use std::path::PathBuf;

use cutline_common::AppConfig;
use cutline_render_engine::JobStatus;
use uuid::Uuid;

pub async fn run(path: PathBuf, job: Uuid, config: &AppConfig) -> anyhow::Result<()> {
    let manager = super::job_manager(&path, config);
    let status = manager.poll_status(job).await?;

    match &status {
        JobStatus::Starting => println!("Job {job}: starting"),
        JobStatus::Processing {
            progress_percent,
            log_tail,
        } => {
            println!("Job {job}: processing ({progress_percent}%)");
            for line in log_tail {
                println!("  | {line}");
            }
        }
        JobStatus::Complete { artifact } => {
            println!("Job {job}: complete");
            println!("  Artifact: {}", artifact.display());
        }
        JobStatus::Error { message } => {
            println!("Job {job}: error");
            println!("  {message}");
        }
        JobStatus::Cancelled => println!("Job {job}: cancelled"),
    }
    Ok(())
}
