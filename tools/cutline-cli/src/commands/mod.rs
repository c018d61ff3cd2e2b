pub mod cancel;
pub mod cleanup;
pub mod compile;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod status;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use cutline_common::AppConfig;
use cutline_project_model::LoadedProject;
use cutline_render_engine::{FfmpegRenderer, JobManager, JobManagerConfig};

pub(crate) fn load(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

/// Job manager rooted at a project directory.
pub(crate) fn job_manager(root: &Path, config: &AppConfig) -> JobManager {
    JobManager::new(
        JobManagerConfig::for_project(root, &config.render),
        Arc::new(FfmpegRenderer::new()),
    )
}
