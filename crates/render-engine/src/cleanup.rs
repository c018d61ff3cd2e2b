//! Job-scoped file removal with bounded retry.
//!
//! Every file a job creates is named `<job_id>.<ext>` inside the job
//! namespace directory. Deleting a file that another process still holds
//! can fail transiently, so removals retry with a linearly growing delay
//! and report what could not be removed instead of failing.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cutline_common::{CutlineResult, RenderDefaults};

/// Removes files. Swappable so tests can simulate locked files.
pub trait FileRemover: Send + Sync {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Plain filesystem removal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

impl FileRemover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RenderDefaults> for RetryPolicy {
    fn from(defaults: &RenderDefaults) -> Self {
        Self {
            max_attempts: defaults.delete_max_attempts.max(1),
            base_delay: Duration::from_millis(defaults.delete_backoff_ms),
        }
    }
}

/// Result of [`crate::job::JobManager::cleanup_finished`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub preserved: Vec<String>,
    pub failed: Vec<String>,
}

/// Busy, locked, or permission errors that may clear on their own.
pub fn is_transient(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // EBUSY and ETXTBSY.
    #[cfg(unix)]
    let busy = matches!(err.raw_os_error(), Some(16) | Some(26));
    // ERROR_SHARING_VIOLATION and ERROR_LOCK_VIOLATION.
    #[cfg(windows)]
    let busy = matches!(err.raw_os_error(), Some(32) | Some(33));
    #[cfg(not(any(unix, windows)))]
    let busy = false;
    busy
}

/// Remove one file. A missing file counts as removed.
pub async fn remove_with_retry(
    remover: &dyn FileRemover,
    path: &Path,
    policy: RetryPolicy,
) -> Result<(), String> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match remover.remove(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if is_transient(&e) && attempt < attempts => {
                tracing::warn!(
                    path = %path.display(),
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "File busy, retrying delete"
                );
                tokio::time::sleep(policy.base_delay * attempt).await;
            }
            Err(e) => {
                return Err(format!("{}: {e}", file_name(path)));
            }
        }
    }
    Err(format!("{}: delete retries exhausted", file_name(path)))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Every `<job_id>.*` file in `dir`, sorted by name.
pub fn job_files(dir: &Path, job_id: &str) -> CutlineResult<Vec<PathBuf>> {
    let prefix = format!("{job_id}.");
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Delete every file of a job except `keep`.
pub async fn remove_job_files(
    remover: &dyn FileRemover,
    dir: &Path,
    job_id: &str,
    keep: &[&str],
    policy: RetryPolicy,
) -> CutlineResult<CleanupReport> {
    let mut report = CleanupReport::default();
    for path in job_files(dir, job_id)? {
        let name = file_name(&path);
        if keep.contains(&name.as_str()) {
            report.preserved.push(name);
            continue;
        }
        match remove_with_retry(remover, &path, policy).await {
            Ok(()) => report.deleted.push(name),
            Err(reason) => report.failed.push(reason),
        }
    }
    Ok(report)
}
