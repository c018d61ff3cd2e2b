//! Pointer gestures: drag and edge resize.
//!
//! A gesture runs in two phases. During the live phase every pointer move
//! recomputes clip positions from the state captured at pointer-down and
//! returns them as a [`LivePreview`]; a [`RateController`] decides when the
//! store also receives an un-recorded internal update. On pointer-up the
//! final values are recomputed once more from the captured origin and
//! committed as a single history entry whose undo point is the pre-gesture
//! snapshot.
//!
//! ```text
//! Idle --pointer_down_drag--> Dragging --pointer_up/cancel--> Idle
//! Idle --pointer_down_resize--> Resizing --pointer_up/cancel--> Idle
//! ```

use std::collections::{HashMap, HashSet};

use cutline_common::{CutlineError, CutlineResult, EditorDefaults, RateController};
use cutline_project_model::{
    geometry, Clip, ClipId, ClipRef, ClipSet, MediaClip, Project, ProjectStore, TextClip, TrackId,
};

use crate::resize::{resize_media, resize_text, trim_ratio, Edge, DEFAULT_MIN_CLIP_DURATION};
use crate::snap::{collect_candidates, find_snap, DEFAULT_SNAP_THRESHOLD_PX};

/// Tunables for the interaction engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub snap_threshold_px: f64,
    pub min_clip_duration: f64,
    pub live_update_hz: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snap_threshold_px: DEFAULT_SNAP_THRESHOLD_PX,
            min_clip_duration: DEFAULT_MIN_CLIP_DURATION,
            live_update_hz: 60,
        }
    }
}

impl From<&EditorDefaults> for EngineSettings {
    fn from(defaults: &EditorDefaults) -> Self {
        Self {
            snap_threshold_px: defaults.snap_threshold_px,
            min_clip_duration: defaults.min_clip_duration_secs,
            live_update_hz: defaults.live_update_hz,
        }
    }
}

/// Current engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Dragging,
    Resizing,
}

/// Result of a pointer move.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePreview {
    /// Manipulated clips at their current visual positions.
    pub clips: Vec<Clip>,

    /// Time of the active snap line, if an edge snapped.
    pub snap_line: Option<f64>,

    /// Whether this move was also pushed to the store.
    pub published: bool,
}

/// Result of finishing a gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureOutcome {
    /// Whether a history entry was recorded. A gesture that changed nothing records none.
    pub committed: bool,

    /// Clips the gesture touched.
    pub clips: Vec<ClipRef>,

    /// Clips whose kind did not match the drop track; they kept their track.
    pub rejected_drops: Vec<ClipId>,

    pub snap_line: Option<f64>,
}

#[derive(Debug, Clone)]
struct DragState {
    origin: Project,
    grabbed: ClipId,
    pointer_start_x: f64,
    zoom: f64,
    /// Dragged clips with their left edge in pixels at pointer-down.
    clips: Vec<(Clip, f64)>,
    candidates: Vec<f64>,
}

#[derive(Debug, Clone)]
struct ResizeState {
    origin: Project,
    clip: Clip,
    edge: Edge,
    pointer_start_x: f64,
    zoom: f64,
    ratio: f64,
    candidates: Vec<f64>,
}

#[derive(Debug, Clone)]
enum Gesture {
    Drag(DragState),
    Resize(ResizeState),
}

impl Gesture {
    fn origin(&self) -> &Project {
        match self {
            Gesture::Drag(d) => &d.origin,
            Gesture::Resize(r) => &r.origin,
        }
    }
}

/// Drives drag and resize gestures against a [`ProjectStore`].
#[derive(Debug)]
pub struct InteractionEngine {
    settings: EngineSettings,
    rate: RateController,
    gesture: Option<Gesture>,
}

impl Default for InteractionEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl InteractionEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let rate = RateController::new(settings.live_update_hz);
        Self {
            settings,
            rate,
            gesture: None,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn state(&self) -> GestureState {
        match self.gesture {
            None => GestureState::Idle,
            Some(Gesture::Drag(_)) => GestureState::Dragging,
            Some(Gesture::Resize(_)) => GestureState::Resizing,
        }
    }

    /// Start dragging `grabbed`. A selected clip drags the whole selection.
    pub fn pointer_down_drag(
        &mut self,
        store: &ProjectStore,
        grabbed: ClipRef,
        pointer_x: f64,
    ) -> CutlineResult<()> {
        self.ensure_idle()?;
        let origin = store.snapshot();
        let grabbed_clip = origin
            .clip(grabbed)
            .ok_or_else(|| CutlineError::not_found(format!("clip {}", grabbed.id)))?;

        let dragged: Vec<Clip> = if origin.is_selected(grabbed.id) {
            origin.selected_clips()
        } else {
            vec![grabbed_clip]
        };

        let zoom = origin.zoom();
        let clips: Vec<(Clip, f64)> = dragged
            .into_iter()
            .map(|c| {
                let left_px = geometry::to_pixels(c.position_start(), zoom);
                (c, left_px)
            })
            .collect();
        let exclude: HashSet<ClipId> = clips.iter().map(|(c, _)| c.id()).collect();
        let candidates = collect_candidates(&origin, &exclude);

        tracing::debug!(clip_id = %grabbed.id, count = clips.len(), "Drag started");
        self.rate.reset();
        self.gesture = Some(Gesture::Drag(DragState {
            origin,
            grabbed: grabbed.id,
            pointer_start_x: pointer_x,
            zoom,
            clips,
            candidates,
        }));
        Ok(())
    }

    /// Start resizing one edge of `clip`.
    pub fn pointer_down_resize(
        &mut self,
        store: &ProjectStore,
        clip: ClipRef,
        edge: Edge,
        pointer_x: f64,
    ) -> CutlineResult<()> {
        self.ensure_idle()?;
        let origin = store.snapshot();
        let target = origin
            .clip(clip)
            .ok_or_else(|| CutlineError::not_found(format!("clip {}", clip.id)))?;

        let ratio = match &target {
            Clip::Media(m) => trim_ratio(m),
            Clip::Text(_) => 1.0,
        };
        let exclude: HashSet<ClipId> = [clip.id].into_iter().collect();
        let candidates = collect_candidates(&origin, &exclude);

        tracing::debug!(clip_id = %clip.id, ?edge, ratio, "Resize started");
        self.rate.reset();
        self.gesture = Some(Gesture::Resize(ResizeState {
            zoom: origin.zoom(),
            origin,
            clip: target,
            edge,
            pointer_start_x: pointer_x,
            ratio,
            candidates,
        }));
        Ok(())
    }

    /// Live phase: compute visual positions and maybe publish them to the store.
    pub fn pointer_move(
        &mut self,
        store: &mut ProjectStore,
        pointer_x: f64,
        now_ns: u64,
    ) -> CutlineResult<LivePreview> {
        let gesture = self
            .gesture
            .as_ref()
            .ok_or_else(|| CutlineError::validation("no gesture in progress"))?;

        let (clips, snap_line) = self.compute(gesture, pointer_x);
        let published = if self.rate.should_tick(now_ns) {
            store.update_clips_internal(merge_into(gesture.origin(), &clips))?;
            true
        } else {
            false
        };

        Ok(LivePreview {
            clips,
            snap_line,
            published,
        })
    }

    /// Commit phase: recompute from the origin, apply any drop, and record one entry.
    pub fn pointer_up(
        &mut self,
        store: &mut ProjectStore,
        pointer_x: f64,
        drop_track: Option<TrackId>,
    ) -> CutlineResult<GestureOutcome> {
        let gesture = self
            .gesture
            .take()
            .ok_or_else(|| CutlineError::validation("no gesture in progress"))?;
        self.rate.reset();

        let (mut clips, snap_line) = self.compute(&gesture, pointer_x);
        let mut rejected_drops = Vec::new();
        let label = match &gesture {
            Gesture::Drag(_) => {
                if let Some(track_id) = drop_track {
                    rejected_drops = retarget(gesture.origin(), &mut clips, track_id);
                }
                "Move clips"
            }
            Gesture::Resize(_) => "Resize clip",
        };

        let refs: Vec<ClipRef> = clips.iter().map(Clip::clip_ref).collect();
        let origin = match gesture {
            Gesture::Drag(d) => d.origin,
            Gesture::Resize(r) => r.origin,
        };

        let unchanged = clips
            .iter()
            .all(|c| origin.clip(c.clip_ref()).as_ref() == Some(c));
        if unchanged {
            store.restore_internal(origin);
            return Ok(GestureOutcome {
                committed: false,
                clips: refs,
                rejected_drops,
                snap_line: None,
            });
        }

        let set = merge_into(&origin, &clips);
        if let Err(e) = store.commit_gesture(origin.clone(), label, set) {
            store.restore_internal(origin);
            return Err(e.into());
        }

        if !rejected_drops.is_empty() {
            tracing::warn!(
                rejected = rejected_drops.len(),
                "Drop rejected for clips with an incompatible track kind"
            );
        }
        Ok(GestureOutcome {
            committed: true,
            clips: refs,
            rejected_drops,
            snap_line,
        })
    }

    /// Abort the gesture and restore the pre-gesture state. Returns `false` when idle.
    pub fn cancel_gesture(&mut self, store: &mut ProjectStore) -> bool {
        match self.gesture.take() {
            Some(gesture) => {
                let origin = match gesture {
                    Gesture::Drag(d) => d.origin,
                    Gesture::Resize(r) => r.origin,
                };
                store.restore_internal(origin);
                self.rate.reset();
                tracing::debug!("Gesture cancelled");
                true
            }
            None => false,
        }
    }

    fn ensure_idle(&self) -> CutlineResult<()> {
        if self.gesture.is_some() {
            return Err(CutlineError::validation("a gesture is already in progress"));
        }
        Ok(())
    }

    fn compute(&self, gesture: &Gesture, pointer_x: f64) -> (Vec<Clip>, Option<f64>) {
        match gesture {
            Gesture::Drag(d) => self.compute_drag(d, pointer_x),
            Gesture::Resize(r) => self.compute_resize(r, pointer_x),
        }
    }

    fn compute_drag(&self, drag: &DragState, pointer_x: f64) -> (Vec<Clip>, Option<f64>) {
        let delta_px = pointer_x - drag.pointer_start_x;
        if delta_px == 0.0 {
            return (drag.clips.iter().map(|(c, _)| c.clone()).collect(), None);
        }
        let raw_start =
            |left_px: f64| geometry::to_seconds((left_px + delta_px).max(0.0), drag.zoom);

        let (grabbed, grabbed_left) = match drag.clips.iter().find(|(c, _)| c.id() == drag.grabbed) {
            Some((c, left)) => (c, *left),
            None => return (Vec::new(), None),
        };
        let grabbed_duration = grabbed.position_end() - grabbed.position_start();
        let grabbed_raw = raw_start(grabbed_left);

        let mut grabbed_start = grabbed_raw;
        let mut snap_line = None;
        if drag.origin.snapping_enabled() {
            let edges = [grabbed_raw, grabbed_raw + grabbed_duration];
            if let Some(hit) = find_snap(
                &edges,
                &drag.candidates,
                drag.zoom,
                self.settings.snap_threshold_px,
            ) {
                let snapped = if hit.edge == 0 {
                    hit.target
                } else {
                    hit.target - grabbed_duration
                };
                if snapped >= 0.0 {
                    grabbed_start = snapped;
                    snap_line = Some(hit.target);
                }
            }
        }
        let adjust = grabbed_start - grabbed_raw;

        let clips = drag
            .clips
            .iter()
            .map(|(clip, left_px)| {
                let start = if clip.id() == drag.grabbed {
                    grabbed_start
                } else {
                    (raw_start(*left_px) + adjust).max(0.0)
                };
                move_clip(clip, start)
            })
            .collect();
        (clips, snap_line)
    }

    fn compute_resize(&self, resize: &ResizeState, pointer_x: f64) -> (Vec<Clip>, Option<f64>) {
        if pointer_x == resize.pointer_start_x {
            return (vec![resize.clip.clone()], None);
        }
        let delta_secs = geometry::to_seconds(pointer_x - resize.pointer_start_x, resize.zoom);
        let origin_edge = match resize.edge {
            Edge::Left => resize.clip.position_start(),
            Edge::Right => resize.clip.position_end(),
        };
        let mut edge_time = origin_edge + delta_secs;

        let mut snap_target = None;
        if resize.origin.snapping_enabled() {
            if let Some(hit) = find_snap(
                &[edge_time],
                &resize.candidates,
                resize.zoom,
                self.settings.snap_threshold_px,
            ) {
                edge_time = hit.target;
                snap_target = Some(hit.target);
            }
        }

        let min = self.settings.min_clip_duration;
        let resized = match &resize.clip {
            Clip::Media(m) => Clip::Media(resize_media(m, resize.ratio, resize.edge, edge_time, min)),
            Clip::Text(t) => Clip::Text(resize_text(t, resize.edge, edge_time, min)),
        };

        let final_edge = match resize.edge {
            Edge::Left => resized.position_start(),
            Edge::Right => resized.position_end(),
        };
        let snap_line = snap_target.filter(|t| *t == final_edge);
        (vec![resized], snap_line)
    }
}

fn move_clip(clip: &Clip, start: f64) -> Clip {
    match clip {
        Clip::Media(m) => {
            let duration = m.duration();
            Clip::Media(MediaClip {
                position_start: start,
                position_end: start + duration,
                ..m.clone()
            })
        }
        Clip::Text(t) => {
            let duration = t.duration();
            Clip::Text(TextClip {
                position_start: start,
                position_end: start + duration,
                ..t.clone()
            })
        }
    }
}

/// Move compatible clips onto `track_id`; return the ids that could not move.
fn retarget(project: &Project, clips: &mut [Clip], track_id: TrackId) -> Vec<ClipId> {
    let track_kind = project.track(track_id).map(|t| t.kind);
    let mut rejected = Vec::new();
    for clip in clips.iter_mut() {
        if Some(clip.track_kind()) != track_kind {
            rejected.push(clip.id());
            continue;
        }
        match clip {
            Clip::Media(m) => m.track_id = track_id,
            Clip::Text(t) => t.track_id = track_id,
        }
    }
    rejected
}

/// Replace `changed` clips inside the origin collections, keeping order.
pub(crate) fn merge_into(origin: &Project, changed: &[Clip]) -> ClipSet {
    let mut media_changes: HashMap<ClipId, &MediaClip> = HashMap::new();
    let mut text_changes: HashMap<ClipId, &TextClip> = HashMap::new();
    for clip in changed {
        match clip {
            Clip::Media(m) => {
                media_changes.insert(m.id, m);
            }
            Clip::Text(t) => {
                text_changes.insert(t.id, t);
            }
        }
    }

    let media = (!media_changes.is_empty()).then(|| {
        origin
            .media()
            .iter()
            .map(|c| media_changes.get(&c.id).map_or_else(|| c.clone(), |m| (*m).clone()))
            .collect()
    });
    let text = (!text_changes.is_empty()).then(|| {
        origin
            .text()
            .iter()
            .map(|c| text_changes.get(&c.id).map_or_else(|| c.clone(), |t| (*t).clone()))
            .collect()
    });
    ClipSet { media, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_project_model::{MediaKind, TrackKind};
    use proptest::prelude::*;
    use uuid::Uuid;

    const FRAME_NS: u64 = 20_000_000;

    fn video_on(track: TrackId, start: f64, len: f64) -> MediaClip {
        MediaClip::new(MediaKind::Video, track, Uuid::new_v4(), "v.mp4", len).at(start)
    }

    /// A video track with a clip at 0..4.97 and a clip at 5..7.
    fn scenario() -> (ProjectStore, TrackId, MediaClip, MediaClip) {
        let mut store = ProjectStore::new(Project::new("drag"));
        let track = store.add_track(TrackKind::Video);
        let anchor = video_on(track, 0.0, 4.97);
        let moving = video_on(track, 5.0, 2.0);
        store
            .upsert_clips(ClipSet::media(vec![anchor.clone(), moving.clone()]))
            .unwrap();
        store.set_current_time(0.0);
        store.clear_history();
        (store, track, anchor, moving)
    }

    #[test]
    fn test_drag_snaps_exactly_to_candidate() {
        let (mut store, _, _, moving) = scenario();
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let preview = engine.pointer_move(&mut store, 499.0, 0).unwrap();
        assert_eq!(preview.snap_line, Some(4.97));

        let outcome = engine.pointer_up(&mut store, 499.0, None).unwrap();
        assert!(outcome.committed);
        let clip = store.project().media_clip(moving.id).unwrap();
        assert_eq!(clip.position_start, 4.97);
        assert!((clip.duration() - 2.0).abs() < 1e-9);
        assert_eq!(engine.state(), GestureState::Idle);
    }

    #[test]
    fn test_drag_without_snapping_uses_raw_position() {
        let (mut store, _, _, moving) = scenario();
        store.set_snapping(false);
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        engine.pointer_up(&mut store, 499.0, None).unwrap();
        let clip = store.project().media_clip(moving.id).unwrap();
        assert!((clip.position_start - 4.99).abs() < 1e-9);
    }

    #[test]
    fn test_drag_clamps_at_zero() {
        let (mut store, _, _, moving) = scenario();
        store.set_snapping(false);
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        engine.pointer_up(&mut store, -400.0, None).unwrap();
        assert_eq!(store.project().media_clip(moving.id).unwrap().position_start, 0.0);
    }

    #[test]
    fn test_gesture_records_single_history_entry() {
        let (mut store, _, anchor, moving) = scenario();
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        for (i, x) in [520.0, 560.0, 600.0, 640.0].into_iter().enumerate() {
            engine
                .pointer_move(&mut store, x, i as u64 * FRAME_NS)
                .unwrap();
        }
        assert!(!store.can_undo());
        engine.pointer_up(&mut store, 700.0, None).unwrap();

        assert_eq!(store.history().undo_depth(), 1);
        assert!(store.undo());
        assert_eq!(store.project().media_clip(moving.id).unwrap().position_start, 5.0);
        assert_eq!(store.project().media_clip(anchor.id).unwrap().position_start, 0.0);
    }

    #[test]
    fn test_live_updates_are_throttled() {
        let (mut store, _, _, moving) = scenario();
        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();

        assert!(engine.pointer_move(&mut store, 600.0, 0).unwrap().published);
        assert!(!engine.pointer_move(&mut store, 610.0, 1_000_000).unwrap().published);
        let preview = engine.pointer_move(&mut store, 620.0, 2_000_000).unwrap();
        assert!(!preview.published);
        assert_eq!(preview.clips.len(), 1);
        assert_eq!(store.project().media_clip(moving.id).unwrap().position_start, 6.0);
        assert!(engine.pointer_move(&mut store, 630.0, FRAME_NS).unwrap().published);
    }

    #[test]
    fn test_multi_selection_moves_together() {
        let (mut store, track, anchor, moving) = scenario();
        store.set_snapping(false);
        let third = video_on(track, 10.0, 1.0);
        let mut media = store.project().media().to_vec();
        media.push(third.clone());
        store.upsert_clips(ClipSet::media(media)).unwrap();
        store.set_selection(vec![ClipRef::media(moving.id), ClipRef::media(third.id)]);

        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let outcome = engine.pointer_up(&mut store, 600.0, None).unwrap();
        assert_eq!(outcome.clips.len(), 2);

        let project = store.project();
        assert!((project.media_clip(moving.id).unwrap().position_start - 6.0).abs() < 1e-9);
        assert!((project.media_clip(third.id).unwrap().position_start - 11.0).abs() < 1e-9);
        assert_eq!(project.media_clip(anchor.id).unwrap().position_start, 0.0);
    }

    #[test]
    fn test_unselected_grab_drags_only_that_clip() {
        let (mut store, _, anchor, moving) = scenario();
        store.set_snapping(false);
        store.set_selection(vec![ClipRef::media(anchor.id)]);

        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let outcome = engine.pointer_up(&mut store, 600.0, None).unwrap();
        assert_eq!(outcome.clips, vec![ClipRef::media(moving.id)]);
        assert_eq!(store.project().media_clip(anchor.id).unwrap().position_start, 0.0);
    }

    #[test]
    fn test_drop_on_matching_track_retargets() {
        let (mut store, _, _, moving) = scenario();
        let second = store.add_track(TrackKind::Video);
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let outcome = engine.pointer_up(&mut store, 500.0, Some(second)).unwrap();
        assert!(outcome.committed);
        assert!(outcome.rejected_drops.is_empty());
        assert_eq!(store.project().media_clip(moving.id).unwrap().track_id, second);
    }

    #[test]
    fn test_drop_on_mismatched_track_is_rejected() {
        let (mut store, track, _, moving) = scenario();
        let text_track = store.add_track(TrackKind::Text);
        store.set_snapping(false);
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let outcome = engine.pointer_up(&mut store, 600.0, Some(text_track)).unwrap();
        assert_eq!(outcome.rejected_drops, vec![moving.id]);
        let clip = store.project().media_clip(moving.id).unwrap();
        assert_eq!(clip.track_id, track);
        assert!((clip.position_start - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_click_without_move_records_nothing() {
        let (mut store, _, _, moving) = scenario();
        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        let outcome = engine.pointer_up(&mut store, 500.0, None).unwrap();
        assert!(!outcome.committed);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_cancel_restores_origin() {
        let (mut store, _, _, moving) = scenario();
        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        engine.pointer_move(&mut store, 900.0, 0).unwrap();
        assert!(engine.cancel_gesture(&mut store));
        assert_eq!(store.project().media_clip(moving.id).unwrap().position_start, 5.0);
        assert!(!store.can_undo());
        assert!(!engine.cancel_gesture(&mut store));
    }

    #[test]
    fn test_second_pointer_down_is_rejected() {
        let (store, _, anchor, moving) = scenario();
        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_drag(&store, ClipRef::media(moving.id), 500.0)
            .unwrap();
        assert!(engine
            .pointer_down_resize(&store, ClipRef::media(anchor.id), Edge::Right, 0.0)
            .is_err());
        assert_eq!(engine.state(), GestureState::Dragging);
    }

    #[test]
    fn test_move_without_gesture_is_error() {
        let (mut store, _, _, _) = scenario();
        let mut engine = InteractionEngine::default();
        assert!(engine.pointer_move(&mut store, 10.0, 0).is_err());
        assert!(engine.pointer_up(&mut store, 10.0, None).is_err());
    }

    #[test]
    fn test_right_resize_trims_source() {
        let (mut store, _, _, moving) = scenario();
        store.set_snapping(false);
        let mut engine = InteractionEngine::default();

        engine
            .pointer_down_resize(&store, ClipRef::media(moving.id), Edge::Right, 700.0)
            .unwrap();
        assert_eq!(engine.state(), GestureState::Resizing);
        engine.pointer_up(&mut store, 650.0, None).unwrap();

        let clip = store.project().media_clip(moving.id).unwrap();
        assert!((clip.position_end - 6.5).abs() < 1e-9);
        assert!((clip.source_trim_end - 1.5).abs() < 1e-9);
        assert_eq!(store.history().undo_depth(), 1);
    }

    #[test]
    fn test_left_resize_snaps_to_neighbor_end() {
        let (mut store, _, _, moving) = scenario();
        let mut engine = InteractionEngine::default();

        // Clip source is exactly its length, so extending left is blocked by trim_start = 0.
        engine
            .pointer_down_resize(&store, ClipRef::media(moving.id), Edge::Left, 500.0)
            .unwrap();
        let preview = engine.pointer_move(&mut store, 498.0, 0).unwrap();
        assert_eq!(preview.snap_line, None);
        engine.cancel_gesture(&mut store);

        let mut media = store.project().media().to_vec();
        let idx = media.iter().position(|c| c.id == moving.id).unwrap();
        media[idx].source_duration = 4.0;
        media[idx].source_trim_start = 1.0;
        media[idx].source_trim_end = 3.0;
        store.upsert_clips(ClipSet::media(media)).unwrap();

        engine
            .pointer_down_resize(&store, ClipRef::media(moving.id), Edge::Left, 500.0)
            .unwrap();
        let preview = engine.pointer_move(&mut store, 498.0, 0).unwrap();
        assert_eq!(preview.snap_line, Some(4.97));
        engine.pointer_up(&mut store, 498.0, None).unwrap();

        let clip = store.project().media_clip(moving.id).unwrap();
        assert_eq!(clip.position_start, 4.97);
        assert!((clip.source_trim_start - 0.97).abs() < 1e-9);
        assert!(clip.check().is_ok());
    }

    #[test]
    fn test_text_resize_respects_min_duration() {
        let mut store = ProjectStore::new(Project::new("text"));
        let track = store.add_track(TrackKind::Text);
        let title = TextClip::new(track, "Title", 1.0, 3.0);
        store.upsert_clips(ClipSet::text(vec![title.clone()])).unwrap();
        store.set_snapping(false);

        let mut engine = InteractionEngine::default();
        engine
            .pointer_down_resize(&store, ClipRef::text(title.id), Edge::Right, 300.0)
            .unwrap();
        engine.pointer_up(&mut store, 0.0, None).unwrap();

        let clip = store.project().text_clip(title.id).unwrap();
        assert_eq!(clip.position_start, 1.0);
        assert!((clip.position_end - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_settings_from_editor_defaults() {
        let defaults = EditorDefaults {
            snap_threshold_px: 15.0,
            ..EditorDefaults::default()
        };
        let settings = EngineSettings::from(&defaults);
        assert_eq!(settings.snap_threshold_px, 15.0);
        assert_eq!(settings.live_update_hz, 60);
    }

    proptest! {
        #[test]
        fn prop_chained_resizes_keep_clip_valid(
            speed in prop::sample::select(vec![0.5f64, 1.0, 2.0]),
            snapping in any::<bool>(),
            steps in prop::collection::vec((any::<bool>(), -1500.0f64..1500.0), 2..8),
        ) {
            let mut store = ProjectStore::new(Project::new("chain"));
            let track = store.add_track(TrackKind::Video);
            let mut clip = video_on(track, 3.0, 20.0);
            clip.playback_speed = speed;
            clip.source_trim_start = 2.0;
            clip.source_trim_end = 12.0;
            clip.position_end = 3.0 + 10.0 / speed;
            let neighbour = video_on(track, 0.0, 1.5);
            store
                .upsert_clips(ClipSet::media(vec![neighbour, clip.clone()]))
                .unwrap();
            store.set_snapping(snapping);

            let mut engine = InteractionEngine::default();
            for (left, delta_px) in steps {
                let current = store.project().media_clip(clip.id).unwrap().clone();
                let edge = if left { Edge::Left } else { Edge::Right };
                let edge_time = match edge {
                    Edge::Left => current.position_start,
                    Edge::Right => current.position_end,
                };
                let x = edge_time * store.project().zoom();
                engine
                    .pointer_down_resize(&store, ClipRef::media(clip.id), edge, x)
                    .unwrap();
                engine.pointer_up(&mut store, x + delta_px, None).unwrap();

                let after = store.project().media_clip(clip.id).unwrap();
                prop_assert!(after.check().is_ok(), "{:?}", after.check());
                prop_assert!(after.duration() >= DEFAULT_MIN_CLIP_DURATION - 1e-9);
                prop_assert!(after.position_start >= 0.0);
            }
        }
    }
}
