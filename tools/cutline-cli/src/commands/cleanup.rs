//! Remove the files of a finished render job.

use std::path::PathBuf;

use cutline_common::AppConfig;
use uuid::Uuid;

pub async fn run(
    path: PathBuf,
    job: Uuid,
    preserve_artifact: bool,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let manager = super::job_manager(&path, config);
    let status = manager.poll_status(job).await?;
    if !status.is_terminal() {
        anyhow::bail!("Job {job} is still running; cancel it instead");
    }

    let report = manager.cleanup_finished(job, preserve_artifact).await?;
    println!(
        "Cleaned up job {job}: {} deleted, {} preserved, {} failed",
        report.deleted.len(),
        report.preserved.len(),
        report.failed.len()
    );
    for reason in &report.failed {
        println!("  - {reason}");
    }
    Ok(())
}
