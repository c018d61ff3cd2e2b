//! Project → render plan compiler.
//!
//! The plan is an ordered list of operations that a backend turns into a
//! filter graph. Compilation is pure: the same project snapshot always
//! yields an equal plan.
//!
//! Stacking uses an effective z-index of
//! `(total_tracks - track_index - 1) * 10 + layer_order`, so a track declared
//! earlier paints above every later track while `layer_order` orders clips
//! inside one track's band.

use serde::Serialize;

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::{BlobId, Clip, ClipId, MediaClip, MediaKind, Project, TextClip};

/// Width of one track's stacking band.
pub const Z_BAND: i32 = 10;

/// Canvas background color.
pub const CANVAS_COLOR: &str = "black";

/// Active interval on the master timeline, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

/// Window into a source, in source seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrimWindow {
    pub start: f64,
    pub duration: f64,
}

/// One decoder input, in the order inputs are passed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInput {
    pub clip_id: ClipId,
    pub source: BlobId,
    pub file_name: String,
    pub kind: MediaKind,

    /// Stills are looped for this long.
    pub loop_duration: Option<f64>,
}

/// A single step of the render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderOp {
    /// Background every composite starts from.
    Canvas {
        width: u32,
        height: u32,
        duration: f64,
        color: String,
    },

    /// Trim, scale, retime and fade one visual input.
    PrepareVisual {
        input: usize,
        clip_id: ClipId,
        trim: Option<TrimWindow>,
        width: u32,
        height: u32,
        offset: f64,
        speed: f64,
        alpha: f64,
    },

    /// Paint a prepared visual input over the running composite.
    Overlay {
        input: usize,
        clip_id: ClipId,
        x: i32,
        y: i32,
        window: TimeWindow,
    },

    /// Draw a text clip over the running composite.
    DrawText {
        clip_id: ClipId,
        content: String,
        font: String,
        font_size: u32,
        color: String,
        x: i32,
        y: i32,
        window: TimeWindow,
    },

    /// Trim, retime, delay and gain one audio stream.
    PrepareAudio {
        input: usize,
        clip_id: ClipId,
        trim: TrimWindow,
        speed: f64,
        delay_ms: u64,
        volume: f64,
    },

    /// Sum every prepared audio stream without normalization.
    AudioMix { inputs: Vec<usize> },
}

/// Compiled render of a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub width: u32,
    pub height: u32,

    /// Output length; equals the project duration.
    pub duration: f64,

    pub inputs: Vec<PlanInput>,
    pub ops: Vec<RenderOp>,
}

impl RenderPlan {
    /// Clip ids of the composite operations, bottom first.
    pub fn composite_order(&self) -> Vec<ClipId> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::Overlay { clip_id, .. } | RenderOp::DrawText { clip_id, .. } => {
                    Some(*clip_id)
                }
                _ => None,
            })
            .collect()
    }

    /// Input indices that feed the audio mix.
    pub fn audio_inputs(&self) -> &[usize] {
        self.ops
            .iter()
            .find_map(|op| match op {
                RenderOp::AudioMix { inputs } => Some(inputs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_inputs().is_empty()
    }

    /// Distinct sources in input order.
    pub fn sources(&self) -> Vec<BlobId> {
        let mut seen = Vec::new();
        for input in &self.inputs {
            if !seen.contains(&input.source) {
                seen.push(input.source);
            }
        }
        seen
    }
}

/// Effective z-index of a clip.
pub fn effective_z(total_tracks: usize, track_index: usize, layer_order: i32) -> i32 {
    (total_tracks as i32 - track_index as i32 - 1) * Z_BAND + layer_order
}

/// Compile a project snapshot into a render plan.
pub fn compile(project: &Project) -> CutlineResult<RenderPlan> {
    let clips = project.all_clips();
    if clips.is_empty() {
        return Err(CutlineError::validation("nothing to render: the project has no clips"));
    }
    if project.duration() <= 0.0 {
        return Err(CutlineError::validation("nothing to render: the project duration is zero"));
    }
    if let Some(violation) = project.invariant_violations().into_iter().next() {
        return Err(CutlineError::validation(violation));
    }

    let total_tracks = project.tracks().len();
    let mut stacked: Vec<(i32, Clip)> = Vec::with_capacity(clips.len());
    for clip in clips {
        let track_index = project
            .track_index(clip.track_id())
            .ok_or_else(|| CutlineError::not_found(format!("track {}", clip.track_id())))?;
        stacked.push((effective_z(total_tracks, track_index, clip.layer_order()), clip));
    }
    // Stable: equal z keeps merge order, so text follows media.
    stacked.sort_by_key(|(z, _)| *z);

    let (width, height) = project.export_settings().resolution.dimensions();
    let mut inputs = Vec::new();
    let mut prepare = Vec::new();
    let mut composite = Vec::new();
    let mut audio = Vec::new();
    let mut mixed = Vec::new();
    let any_soloed = project.any_soloed();

    for (_, clip) in &stacked {
        match clip {
            Clip::Media(media) => {
                let input = inputs.len();
                inputs.push(plan_input(media));

                if media.kind.is_visual() {
                    prepare.push(prepare_visual(input, media));
                    composite.push(RenderOp::Overlay {
                        input,
                        clip_id: media.id,
                        x: media.x,
                        y: media.y,
                        window: window(media.position_start, media.position_end),
                    });
                }

                let carries_audio = match media.kind {
                    MediaKind::Audio => true,
                    MediaKind::Video => media.volume > 0.0,
                    MediaKind::Image => false,
                };
                let audible = project.track(media.track_id).map_or(false, |track| {
                    !track.muted && (!any_soloed || track.soloed)
                });
                if carries_audio && audible {
                    audio.push(prepare_audio(input, media));
                    mixed.push(input);
                }
            }
            Clip::Text(text) => composite.push(draw_text(text)),
        }
    }

    let mut ops = Vec::with_capacity(1 + prepare.len() + composite.len() + audio.len() + 1);
    ops.push(RenderOp::Canvas {
        width,
        height,
        duration: project.duration(),
        color: CANVAS_COLOR.to_string(),
    });
    ops.extend(prepare);
    ops.extend(composite);
    ops.extend(audio);
    if !mixed.is_empty() {
        ops.push(RenderOp::AudioMix { inputs: mixed });
    }

    tracing::debug!(
        inputs = inputs.len(),
        ops = ops.len(),
        duration = project.duration(),
        "Render plan compiled"
    );

    Ok(RenderPlan {
        width,
        height,
        duration: project.duration(),
        inputs,
        ops,
    })
}

fn window(start: f64, end: f64) -> TimeWindow {
    TimeWindow { start, end }
}

fn alpha(opacity: f64) -> f64 {
    (opacity / 100.0).clamp(0.0, 1.0)
}

fn plan_input(media: &MediaClip) -> PlanInput {
    PlanInput {
        clip_id: media.id,
        source: media.source,
        file_name: media.file_name.clone(),
        kind: media.kind,
        loop_duration: (media.kind == MediaKind::Image).then(|| media.duration()),
    }
}

fn prepare_visual(input: usize, media: &MediaClip) -> RenderOp {
    let trim = (media.kind == MediaKind::Video).then(|| TrimWindow {
        start: media.source_trim_start,
        duration: media.trim_len(),
    });
    RenderOp::PrepareVisual {
        input,
        clip_id: media.id,
        trim,
        width: media.width,
        height: media.height,
        offset: media.position_start,
        speed: if media.kind == MediaKind::Image { 1.0 } else { media.playback_speed },
        alpha: alpha(media.opacity),
    }
}

fn prepare_audio(input: usize, media: &MediaClip) -> RenderOp {
    RenderOp::PrepareAudio {
        input,
        clip_id: media.id,
        trim: TrimWindow {
            start: media.source_trim_start,
            duration: media.trim_len(),
        },
        speed: media.playback_speed,
        delay_ms: (media.position_start * 1000.0).round() as u64,
        volume: media.volume / 100.0,
    }
}

fn draw_text(text: &TextClip) -> RenderOp {
    let color = if text.color.contains('@') {
        text.color.clone()
    } else {
        format!("{}@{}", text.color, alpha(text.opacity))
    };
    RenderOp::DrawText {
        clip_id: text.id,
        content: text.content.clone(),
        font: text.font.clone(),
        font_size: text.font_size,
        color: color.split_whitespace().collect(),
        x: text.x,
        y: text.y,
        window: window(text.position_start, text.position_end),
    }
}
