//! The project state container.
//!
//! [`ProjectStore`] owns the live [`Project`] and its [`History`]. Every
//! mutation goes through a method here. Recorded edits push exactly one
//! history entry; `*_internal` updates and view-state setters push none.
//! Each mutator validates before applying, so an error leaves the project
//! untouched.

use std::collections::HashSet;
use std::sync::Arc;

use crate::clip::{ClipId, ClipKind, ClipRef, MediaClip, TextClip};
use crate::geometry::Gap;
use crate::history::{History, DEFAULT_HISTORY_LIMIT};
use crate::project::{ExportSettings, Project, ProjectError, MAX_ZOOM, MIN_ZOOM};
use crate::track::{Track, TrackId, TrackKind};

/// A replacement for one or both clip collections.
///
/// `None` leaves that collection untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSet {
    pub media: Option<Vec<MediaClip>>,
    pub text: Option<Vec<TextClip>>,
}

impl ClipSet {
    pub fn media(media: Vec<MediaClip>) -> Self {
        Self {
            media: Some(media),
            text: None,
        }
    }

    pub fn text(text: Vec<TextClip>) -> Self {
        Self {
            media: None,
            text: Some(text),
        }
    }

    pub fn both(media: Vec<MediaClip>, text: Vec<TextClip>) -> Self {
        Self {
            media: Some(media),
            text: Some(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_none() && self.text.is_none()
    }
}

/// Owner of the live project and its undo/redo history.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    project: Project,
    history: History<Project>,
}

impl ProjectStore {
    pub fn new(project: Project) -> Self {
        Self::with_history_limit(project, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(mut project: Project, limit: usize) -> Self {
        project.recompute_duration();
        Self {
            project,
            history: History::new(limit),
        }
    }

    /// The live project.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// A cheap copy of the live project.
    pub fn snapshot(&self) -> Project {
        self.project.clone()
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn history(&self) -> &History<Project> {
        &self.history
    }

    fn record(&mut self, label: &str) {
        self.history.record(label, self.project.clone());
    }

    // ---- history -------------------------------------------------------

    /// Revert the last recorded edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.project.clone()) {
            Some(previous) => {
                self.project = previous;
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone edit. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.project.clone()) {
            Some(next) => {
                self.project = next;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ---- tracks --------------------------------------------------------

    /// Append a track named `"<Kind> <n>"`.
    pub fn add_track(&mut self, kind: TrackKind) -> TrackId {
        let track = Track::new(kind, Track::next_name(kind, &self.project.tracks));
        let id = track.id;

        self.record("Add track");
        Arc::make_mut(&mut self.project.tracks).push(track);

        tracing::debug!(track_id = %id, kind = %kind, "Track added");
        id
    }

    /// Remove a track and every clip on it.
    pub fn remove_track(&mut self, id: TrackId) -> Result<(), ProjectError> {
        if self.project.track(id).is_none() {
            return Err(ProjectError::TrackNotFound { id });
        }

        self.record("Remove track");
        Arc::make_mut(&mut self.project.tracks).retain(|t| t.id != id);
        if self.project.media.iter().any(|c| c.track_id == id) {
            Arc::make_mut(&mut self.project.media).retain(|c| c.track_id != id);
        }
        if self.project.text.iter().any(|c| c.track_id == id) {
            Arc::make_mut(&mut self.project.text).retain(|c| c.track_id != id);
        }

        let project = &self.project;
        let live: Vec<ClipRef> = project
            .selection
            .iter()
            .copied()
            .filter(|s| project.clip(*s).is_some())
            .collect();
        self.project.selection = live;
        if self.project.active_gap.is_some_and(|g| g.track_id == id) {
            self.project.active_gap = None;
        }
        self.project.recompute_duration();

        tracing::debug!(track_id = %id, "Track removed");
        Ok(())
    }

    /// Move `moving` to the index `target` occupies once `moving` is taken out.
    pub fn reorder_track(&mut self, moving: TrackId, target: TrackId) -> Result<(), ProjectError> {
        let from = self
            .project
            .track_index(moving)
            .ok_or(ProjectError::TrackNotFound { id: moving })?;
        if self.project.track(target).is_none() {
            return Err(ProjectError::TrackNotFound { id: target });
        }
        if moving == target {
            return Ok(());
        }

        let mut tracks = (*self.project.tracks).clone();
        let track = tracks.remove(from);
        let to = tracks
            .iter()
            .position(|t| t.id == target)
            .ok_or(ProjectError::TrackNotFound { id: target })?;
        tracks.insert(to, track);

        self.record("Reorder track");
        self.project.tracks = Arc::new(tracks);
        Ok(())
    }

    /// Set mute/solo flags. Not recorded.
    pub fn set_track_flags(
        &mut self,
        id: TrackId,
        muted: bool,
        soloed: bool,
    ) -> Result<(), ProjectError> {
        let index = self
            .project
            .track_index(id)
            .ok_or(ProjectError::TrackNotFound { id })?;
        let track = &mut Arc::make_mut(&mut self.project.tracks)[index];
        track.muted = muted;
        track.soloed = soloed;
        Ok(())
    }

    // ---- clips ---------------------------------------------------------

    /// Replace clip collections as one recorded edit and clear the selection.
    pub fn upsert_clips(&mut self, set: ClipSet) -> Result<(), ProjectError> {
        self.upsert_clips_labeled("Update clips", set)
    }

    /// [`Self::upsert_clips`] with a history label.
    pub fn upsert_clips_labeled(&mut self, label: &str, set: ClipSet) -> Result<(), ProjectError> {
        self.validate_set(&set)?;
        self.record(label);
        self.apply(set);
        self.project.selection.clear();
        Ok(())
    }

    /// Replace clip collections without recording history. Used for live previews.
    pub fn update_clips_internal(&mut self, set: ClipSet) -> Result<(), ProjectError> {
        self.validate_set(&set)?;
        self.apply(set);
        Ok(())
    }

    /// Finish a gesture: `origin` (the pre-gesture state) becomes the undo point.
    pub fn commit_gesture(
        &mut self,
        origin: Project,
        label: &str,
        set: ClipSet,
    ) -> Result<(), ProjectError> {
        self.validate_set(&set)?;
        self.history.record(label, origin);
        self.apply(set);
        tracing::debug!(label, undo_depth = self.history.undo_depth(), "Gesture committed");
        Ok(())
    }

    /// Put back a pre-gesture state without touching history.
    pub fn restore_internal(&mut self, origin: Project) {
        self.project = origin;
    }

    /// Retarget clips to another track. Any incompatible clip rejects the whole call.
    pub fn move_clips_to_track(
        &mut self,
        clips: &[ClipRef],
        track_id: TrackId,
    ) -> Result<(), ProjectError> {
        let track_kind = self
            .project
            .track(track_id)
            .ok_or(ProjectError::TrackNotFound { id: track_id })?
            .kind;

        for clip_ref in clips {
            let clip = self
                .project
                .clip(*clip_ref)
                .ok_or(ProjectError::ClipNotFound { id: clip_ref.id })?;
            if clip.track_kind() != track_kind {
                return Err(ProjectError::IncompatibleTrack {
                    clip_id: clip_ref.id,
                    track_kind,
                });
            }
        }

        let ids: HashSet<_> = clips.iter().map(|c| c.id).collect();
        self.record("Move to track");
        if clips.iter().any(|c| c.kind == ClipKind::Media) {
            for clip in Arc::make_mut(&mut self.project.media) {
                if ids.contains(&clip.id) {
                    clip.track_id = track_id;
                }
            }
        }
        if clips.iter().any(|c| c.kind == ClipKind::Text) {
            for clip in Arc::make_mut(&mut self.project.text) {
                if ids.contains(&clip.id) {
                    clip.track_id = track_id;
                }
            }
        }
        Ok(())
    }

    fn validate_set(&self, set: &ClipSet) -> Result<(), ProjectError> {
        let mut seen = HashSet::new();

        if let Some(media) = &set.media {
            for clip in media {
                clip.check().map_err(ProjectError::validation)?;
                if !seen.insert(clip.id) {
                    return Err(ProjectError::validation(format!("duplicate clip id {}", clip.id)));
                }
                self.check_track(clip.id, clip.track_id, clip.kind.track_kind())?;
            }
        }
        if let Some(text) = &set.text {
            for clip in text {
                clip.check().map_err(ProjectError::validation)?;
                if !seen.insert(clip.id) {
                    return Err(ProjectError::validation(format!("duplicate clip id {}", clip.id)));
                }
                self.check_track(clip.id, clip.track_id, TrackKind::Text)?;
            }
        }
        Ok(())
    }

    fn check_track(
        &self,
        clip_id: ClipId,
        track_id: TrackId,
        required: TrackKind,
    ) -> Result<(), ProjectError> {
        let track = self
            .project
            .track(track_id)
            .ok_or(ProjectError::TrackNotFound { id: track_id })?;
        if track.kind != required {
            return Err(ProjectError::IncompatibleTrack {
                clip_id,
                track_kind: track.kind,
            });
        }
        Ok(())
    }

    fn apply(&mut self, set: ClipSet) {
        if let Some(media) = set.media {
            self.project.media = Arc::new(media);
        }
        if let Some(text) = set.text {
            self.project.text = Arc::new(text);
        }
        self.project.recompute_duration();
    }

    // ---- view state (not recorded) --------------------------------------

    /// Move the playhead, clamped to `[0, duration]`.
    pub fn set_current_time(&mut self, seconds: f64) {
        self.project.current_time = seconds.clamp(0.0, self.project.duration.max(0.0));
    }

    /// Set pixels-per-second, clamped to `[1, 1000]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.project.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn set_snapping(&mut self, enabled: bool) {
        self.project.snapping = enabled;
    }

    /// Click-selection semantics.
    ///
    /// With `additive` (meta/shift held) the clip is added or removed. Without
    /// it the clip becomes the only selection, or the selection clears if it
    /// already was. The active gap always clears.
    pub fn toggle_selection(&mut self, clip: ClipRef, additive: bool) {
        let selection = &mut self.project.selection;
        let is_selected = selection.iter().any(|s| s.id == clip.id);

        if additive {
            if is_selected {
                selection.retain(|s| s.id != clip.id);
            } else {
                selection.push(clip);
            }
        } else if is_selected && selection.len() == 1 {
            selection.clear();
        } else {
            *selection = vec![clip];
        }
        self.project.active_gap = None;
    }

    pub fn set_selection(&mut self, selection: Vec<ClipRef>) {
        self.project.selection = selection;
        self.project.active_gap = None;
    }

    /// Clear both the clip selection and the active gap.
    pub fn clear_selection(&mut self) {
        self.project.selection.clear();
        self.project.active_gap = None;
    }

    /// Highlight a gap. Clears the clip selection.
    pub fn set_active_gap(&mut self, gap: Option<Gap>) {
        self.project.active_gap = gap;
        self.project.selection.clear();
    }

    pub fn set_export_settings(&mut self, settings: ExportSettings) {
        self.project.export = settings;
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.project.name = name.into();
    }
}
