//! Source blob storage and input resolution.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::BlobId;

use crate::compiler::RenderPlan;

/// Storage for source media referenced by clips.
pub trait BlobStore: Send + Sync {
    /// Store bytes under a fresh id.
    fn put(&self, bytes: &[u8]) -> CutlineResult<BlobId>;

    fn get(&self, id: BlobId) -> CutlineResult<Vec<u8>>;

    /// Remove a blob. Returns `false` when it did not exist.
    fn delete(&self, id: BlobId) -> CutlineResult<bool>;

    /// Filesystem location a decoder can read, if the blob exists.
    fn locate(&self, id: BlobId) -> Option<PathBuf>;
}

/// Blobs stored as `<dir>/<uuid>` files.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    dir: PathBuf,
}

impl DirBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: BlobId) -> PathBuf {
        self.dir.join(id.to_string())
    }

    /// Copy an existing file into the store.
    pub fn import_file(&self, source: &Path) -> CutlineResult<BlobId> {
        if !source.exists() {
            return Err(CutlineError::FileNotFound {
                path: source.to_path_buf(),
            });
        }
        std::fs::create_dir_all(&self.dir)?;
        let id = Uuid::new_v4();
        std::fs::copy(source, self.path_for(id))?;
        tracing::debug!(blob_id = %id, source = %source.display(), "Blob imported");
        Ok(id)
    }
}

impl BlobStore for DirBlobStore {
    fn put(&self, bytes: &[u8]) -> CutlineResult<BlobId> {
        std::fs::create_dir_all(&self.dir)?;
        let id = Uuid::new_v4();
        std::fs::write(self.path_for(id), bytes)?;
        tracing::debug!(blob_id = %id, size = bytes.len(), "Blob stored");
        Ok(id)
    }

    fn get(&self, id: BlobId) -> CutlineResult<Vec<u8>> {
        match std::fs::read(self.path_for(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CutlineError::not_found(format!("blob {id}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: BlobId) -> CutlineResult<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn locate(&self, id: BlobId) -> Option<PathBuf> {
        let path = self.path_for(id);
        path.is_file().then_some(path)
    }
}

/// Decoder paths for a plan's inputs, index-aligned with `plan.inputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    paths: Vec<PathBuf>,
}

impl ResolvedInputs {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Map every plan input to a readable path. A missing source fails the whole render.
pub fn resolve_inputs(plan: &RenderPlan, store: &dyn BlobStore) -> CutlineResult<ResolvedInputs> {
    let mut paths = Vec::with_capacity(plan.inputs.len());
    for input in &plan.inputs {
        let path = store.locate(input.source).ok_or_else(|| {
            CutlineError::not_found(format!(
                "source for {} (blob {})",
                input.file_name, input.source
            ))
        })?;
        paths.push(path);
    }
    Ok(ResolvedInputs::new(paths))
}
