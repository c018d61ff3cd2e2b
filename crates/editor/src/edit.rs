//! Discrete edits driven by the selection, the playhead, or the active gap.
//!
//! Each operation validates first and records exactly one history entry.

use std::collections::HashSet;

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::{
    Clip, ClipId, ClipSet, MediaClip, MediaKind, ProjectStore, TextClip, MAX_ZOOM, MIN_ZOOM,
};
use uuid::Uuid;

/// Playhead step for a single arrow-key press (seconds).
pub const PLAYHEAD_NUDGE_SECS: f64 = 0.01;

/// Zoom step for zoom in/out (pixels per second).
pub const ZOOM_STEP: f64 = 50.0;

/// What [`delete_selection`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Selected clips were removed.
    Removed(usize),

    /// The active gap was closed by shifting later clips on its track.
    Rippled { shifted: usize, gap: f64 },
}

/// Split the single selected clip at the playhead.
///
/// Returns the ids of the two halves in timeline order.
pub fn split_at_playhead(store: &mut ProjectStore) -> CutlineResult<(ClipId, ClipId)> {
    let project = store.project();
    let selected = project.selected_clips();
    let clip = match selected.as_slice() {
        [clip] => clip.clone(),
        [] => return Err(CutlineError::validation("select a clip to split")),
        _ => return Err(CutlineError::validation("select exactly one clip to split")),
    };

    let at = project.current_time();
    if !(clip.position_start() < at && at < clip.position_end()) {
        return Err(CutlineError::validation(format!(
            "playhead {at:.3}s is not inside clip {}",
            clip.id()
        )));
    }

    let ids = match clip {
        Clip::Media(media) => {
            let (first, second) = split_media(&media, at);
            let ids = (first.id, second.id);
            let clips = replace_with(project.media(), media.id, vec![first, second]);
            store.upsert_clips_labeled("Split clip", ClipSet::media(clips))?;
            ids
        }
        Clip::Text(text) => {
            let (first, second) = split_text(&text, at);
            let ids = (first.id, second.id);
            let clips = replace_with(project.text(), text.id, vec![first, second]);
            store.upsert_clips_labeled("Split clip", ClipSet::text(clips))?;
            ids
        }
    };

    tracing::debug!(at, first = %ids.0, second = %ids.1, "Clip split");
    Ok(ids)
}

fn split_media(clip: &MediaClip, at: f64) -> (MediaClip, MediaClip) {
    let mut first = clip.clone();
    let mut second = clip.clone();
    first.id = Uuid::new_v4();
    second.id = Uuid::new_v4();
    first.position_end = at;
    second.position_start = at;

    if clip.kind == MediaKind::Image {
        first.source_trim_start = 0.0;
        first.source_trim_end = first.duration();
        second.source_trim_start = 0.0;
        second.source_trim_end = second.duration();
    } else {
        let ratio = (at - clip.position_start) / clip.duration();
        let split_point = clip.source_trim_start + ratio * clip.trim_len();
        first.source_trim_end = split_point;
        second.source_trim_start = split_point;
    }
    (first, second)
}

fn split_text(clip: &TextClip, at: f64) -> (TextClip, TextClip) {
    let mut first = clip.clone();
    let mut second = clip.clone();
    first.id = Uuid::new_v4();
    second.id = Uuid::new_v4();
    first.position_end = at;
    second.position_start = at;
    (first, second)
}

trait HasId {
    fn clip_id(&self) -> ClipId;
}

impl HasId for MediaClip {
    fn clip_id(&self) -> ClipId {
        self.id
    }
}

impl HasId for TextClip {
    fn clip_id(&self) -> ClipId {
        self.id
    }
}

fn replace_with<C: HasId + Clone>(clips: &[C], id: ClipId, replacement: Vec<C>) -> Vec<C> {
    let mut out = Vec::with_capacity(clips.len() + replacement.len());
    let mut replacement = Some(replacement);
    for clip in clips {
        if clip.clip_id() == id {
            out.extend(replacement.take().into_iter().flatten());
        } else {
            out.push(clip.clone());
        }
    }
    out
}

/// Copy the selection so its earliest clip starts at the playhead.
pub fn duplicate_selection(store: &mut ProjectStore) -> CutlineResult<Vec<ClipId>> {
    let project = store.project();
    let selected = project.selected_clips();
    let earliest = selected
        .iter()
        .map(Clip::position_start)
        .min_by(f64::total_cmp)
        .ok_or_else(|| CutlineError::validation("select clips to duplicate"))?;
    let shift = project.current_time() - earliest;
    let ids: HashSet<ClipId> = selected.iter().map(Clip::id).collect();

    let mut created = Vec::new();
    let mut media = Vec::with_capacity(project.media().len());
    for clip in project.media() {
        media.push(clip.clone());
        if ids.contains(&clip.id) {
            let copy = MediaClip {
                id: Uuid::new_v4(),
                position_start: clip.position_start + shift,
                position_end: clip.position_end + shift,
                ..clip.clone()
            };
            created.push(copy.id);
            media.push(copy);
        }
    }
    let mut text = Vec::with_capacity(project.text().len());
    for clip in project.text() {
        text.push(clip.clone());
        if ids.contains(&clip.id) {
            let copy = TextClip {
                id: Uuid::new_v4(),
                position_start: clip.position_start + shift,
                position_end: clip.position_end + shift,
                ..clip.clone()
            };
            created.push(copy.id);
            text.push(copy);
        }
    }

    store.upsert_clips_labeled("Duplicate clips", ClipSet::both(media, text))?;
    tracing::debug!(count = created.len(), shift, "Clips duplicated");
    Ok(created)
}

/// Remove the selected clips, or ripple-close the active gap when nothing is selected.
pub fn delete_selection(store: &mut ProjectStore) -> CutlineResult<DeleteOutcome> {
    let project = store.project();

    if !project.selection().is_empty() {
        let ids: HashSet<ClipId> = project.selection().iter().map(|c| c.id).collect();
        let media: Vec<MediaClip> = project
            .media()
            .iter()
            .filter(|c| !ids.contains(&c.id))
            .cloned()
            .collect();
        let text: Vec<TextClip> = project
            .text()
            .iter()
            .filter(|c| !ids.contains(&c.id))
            .cloned()
            .collect();
        let removed = project.media().len() + project.text().len() - media.len() - text.len();

        store.upsert_clips_labeled("Delete clips", ClipSet::both(media, text))?;
        tracing::debug!(removed, "Clips deleted");
        return Ok(DeleteOutcome::Removed(removed));
    }

    let gap = *project
        .active_gap()
        .ok_or_else(|| CutlineError::validation("nothing selected to delete"))?;
    let shift = gap.duration();
    let mut shifted = 0;

    let media: Vec<MediaClip> = project
        .media()
        .iter()
        .map(|c| {
            if c.track_id == gap.track_id && c.position_start >= gap.end {
                shifted += 1;
                MediaClip {
                    position_start: c.position_start - shift,
                    position_end: c.position_end - shift,
                    ..c.clone()
                }
            } else {
                c.clone()
            }
        })
        .collect();
    let text: Vec<TextClip> = project
        .text()
        .iter()
        .map(|c| {
            if c.track_id == gap.track_id && c.position_start >= gap.end {
                shifted += 1;
                TextClip {
                    position_start: c.position_start - shift,
                    position_end: c.position_end - shift,
                    ..c.clone()
                }
            } else {
                c.clone()
            }
        })
        .collect();

    store.upsert_clips_labeled("Ripple delete", ClipSet::both(media, text))?;
    store.set_active_gap(None);
    tracing::debug!(shifted, gap = shift, track_id = %gap.track_id, "Gap closed");
    Ok(DeleteOutcome::Rippled { shifted, gap: shift })
}

/// Move the playhead by `delta`. Past the end wraps to zero; before zero clamps.
pub fn nudge_playhead(store: &mut ProjectStore, delta: f64) {
    let project = store.project();
    let target = project.current_time() + delta;
    let target = if target > project.duration() { 0.0 } else { target.max(0.0) };
    store.set_current_time(target);
}

pub fn zoom_in(store: &mut ProjectStore) {
    let zoom = (store.project().zoom() + ZOOM_STEP).min(MAX_ZOOM);
    store.set_zoom(zoom);
}

pub fn zoom_out(store: &mut ProjectStore) {
    let zoom = (store.project().zoom() - ZOOM_STEP).max(MIN_ZOOM);
    store.set_zoom(zoom);
}
