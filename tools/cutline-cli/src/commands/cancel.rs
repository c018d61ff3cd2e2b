//! Cancel a render job.

use std::path::PathBuf;

use cutline_common::AppConfig;
use uuid::Uuid;

pub async fn run(path: PathBuf, job: Uuid, config: &AppConfig) -> anyhow::Result<()> {
    let manager = super::job_manager(&path, config);
    let report = manager.cancel(job).await?;

    println!("Cancelled job {job}");
    println!("  Deleted: {}", report.deleted.len());
    for name in &report.deleted {
        println!("    {name}");
    }
    if !report.failed.is_empty() {
        println!("  Could not delete:");
        for reason in &report.failed {
            println!("    {reason}");
        }
    }
    Ok(())
}
