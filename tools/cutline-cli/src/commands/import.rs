//! Import a media file onto the timeline.

use std::path::PathBuf;

use cutline_common::AppConfig;
use cutline_project_model::{ClipSet, MediaClip, MediaKind, ProjectStore};
use cutline_render_engine::DirBlobStore;

pub fn run(
    path: PathBuf,
    file: PathBuf,
    kind: MediaKind,
    duration: f64,
    config: &AppConfig,
) -> anyhow::Result<()> {
    if !(duration > 0.0) {
        anyhow::bail!("Duration must be positive, got {duration}");
    }
    let mut loaded = super::load(&path)?;

    let blobs = DirBlobStore::new(loaded.media_dir());
    let source = blobs.import_file(&file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string());

    let mut store =
        ProjectStore::with_history_limit(loaded.project.clone(), config.editor.history_limit);
    let track_kind = kind.track_kind();
    let existing = store
        .project()
        .tracks()
        .iter()
        .find(|t| t.kind == track_kind)
        .map(|t| t.id);
    let track_id = match existing {
        Some(id) => id,
        None => store.add_track(track_kind),
    };
    let start = store
        .project()
        .media()
        .iter()
        .filter(|c| c.track_id == track_id)
        .map(|c| c.position_end)
        .fold(0.0, f64::max);

    let clip = MediaClip::new(kind, track_id, source, &file_name, duration).at(start);
    let clip_id = clip.id;
    let mut media = store.project().media().to_vec();
    media.push(clip);
    store.upsert_clips_labeled("Import media", ClipSet::media(media))?;
    loaded.project = store.into_project();
    loaded.save()?;

    tracing::info!(clip_id = %clip_id, blob_id = %source, "Media imported");
    println!("Imported {} as clip {}", file_name, clip_id);
    println!("  Track start: {:.3}s", start);
    println!("  Project duration: {:.3}s", loaded.project.duration());
    Ok(())
}
