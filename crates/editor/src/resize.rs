//! Edge resize (trim) math.
//!
//! All functions are pure: they take the clip as it was when the resize
//! started plus the requested edge time, and return the resized clip. The
//! source/timeline ratio is captured once at resize start so repeated moves
//! never accumulate error.

use cutline_project_model::{MediaClip, MediaKind, TextClip};

/// Default shortest clip a resize may produce (seconds).
pub const DEFAULT_MIN_CLIP_DURATION: f64 = 0.1;

/// Which edge of a clip is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

/// Seconds of source consumed per second of timeline.
pub fn trim_ratio(clip: &MediaClip) -> f64 {
    let duration = clip.duration();
    if duration <= 0.0 {
        return clip.playback_speed;
    }
    clip.trim_len() / duration
}

/// Resize a media clip so `edge` lands as close to `edge_time` as the source allows.
pub fn resize_media(
    origin: &MediaClip,
    ratio: f64,
    edge: Edge,
    edge_time: f64,
    min_duration: f64,
) -> MediaClip {
    if origin.kind == MediaKind::Image {
        return resize_image(origin, edge, edge_time, min_duration);
    }

    let mut clip = origin.clone();
    match edge {
        Edge::Left => {
            let lower = (origin.position_start - origin.source_trim_start / ratio).max(0.0);
            let upper = origin.position_end - min_duration;
            let start = edge_time.min(upper).max(lower);

            clip.position_start = start;
            clip.source_trim_start =
                (origin.source_trim_start + (start - origin.position_start) * ratio).max(0.0);
        }
        Edge::Right => {
            let lower = origin.position_start + min_duration;
            let upper = origin.position_start
                + (origin.source_duration - origin.source_trim_start) / ratio;
            let end = edge_time.max(lower).min(upper);

            clip.position_end = end;
            clip.source_trim_end = (origin.source_trim_start + (end - origin.position_start) * ratio)
                .min(origin.source_duration);
        }
    }
    clip
}

/// Stills have no timed source: the trim window follows the clip length.
fn resize_image(origin: &MediaClip, edge: Edge, edge_time: f64, min_duration: f64) -> MediaClip {
    let mut clip = origin.clone();
    let (start, end) = clamp_positions(origin.position_start, origin.position_end, edge, edge_time, min_duration);
    clip.position_start = start;
    clip.position_end = end;

    let duration = end - start;
    clip.source_trim_start = 0.0;
    clip.source_trim_end = duration;
    clip.source_duration = origin.source_duration.max(duration);
    clip
}

/// Resize a text clip. Only positions change.
pub fn resize_text(origin: &TextClip, edge: Edge, edge_time: f64, min_duration: f64) -> TextClip {
    let mut clip = origin.clone();
    let (start, end) = clamp_positions(origin.position_start, origin.position_end, edge, edge_time, min_duration);
    clip.position_start = start;
    clip.position_end = end;
    clip
}

fn clamp_positions(
    start: f64,
    end: f64,
    edge: Edge,
    edge_time: f64,
    min_duration: f64,
) -> (f64, f64) {
    match edge {
        Edge::Left => (edge_time.min(end - min_duration).max(0.0), end),
        Edge::Right => (start, edge_time.max(start + min_duration)),
    }
}
