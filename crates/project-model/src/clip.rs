//! Media and text clips.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::track::{TrackId, TrackKind};

/// Identifier of a clip.
pub type ClipId = Uuid;

/// Identifier of a stored media blob.
pub type BlobId = Uuid;

/// Tolerance used when checking the speed/trim relation of a media clip.
pub const TRIM_EPSILON: f64 = 1e-6;

/// Kind of media a [`MediaClip`] plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// The only track kind this media may live on.
    pub fn track_kind(self) -> TrackKind {
        match self {
            MediaKind::Video => TrackKind::Video,
            MediaKind::Audio => TrackKind::Audio,
            MediaKind::Image => TrackKind::Image,
        }
    }

    /// Whether the clip draws pixels.
    pub fn is_visual(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Image)
    }
}

/// Which clip collection an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Media,
    Text,
}

/// Reference to a clip in either collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipRef {
    pub id: ClipId,
    pub kind: ClipKind,
}

impl ClipRef {
    pub fn media(id: ClipId) -> Self {
        Self {
            id,
            kind: ClipKind::Media,
        }
    }

    pub fn text(id: ClipId) -> Self {
        Self {
            id,
            kind: ClipKind::Text,
        }
    }
}

/// A clip backed by a media blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaClip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub kind: MediaKind,

    /// Blob holding the source media.
    pub source: BlobId,

    /// Original file name, for display.
    pub file_name: String,

    /// Timeline placement (seconds).
    pub position_start: f64,
    pub position_end: f64,

    /// Window of the source that plays (seconds into the source).
    pub source_trim_start: f64,
    pub source_trim_end: f64,

    /// Length of the underlying source (seconds).
    pub source_duration: f64,

    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,

    /// 0..=100.
    #[serde(default = "full_scale")]
    pub opacity: f64,

    /// 0..=100.
    #[serde(default = "full_scale")]
    pub volume: f64,

    #[serde(default)]
    pub layer_order: i32,

    #[serde(default = "unit_speed")]
    pub playback_speed: f64,
}

fn full_scale() -> f64 {
    100.0
}

fn unit_speed() -> f64 {
    1.0
}

impl MediaClip {
    /// Create a clip that plays the whole source from time zero.
    pub fn new(
        kind: MediaKind,
        track_id: TrackId,
        source: BlobId,
        file_name: impl Into<String>,
        source_duration: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id,
            kind,
            source,
            file_name: file_name.into(),
            position_start: 0.0,
            position_end: source_duration,
            source_trim_start: 0.0,
            source_trim_end: source_duration,
            source_duration,
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
            opacity: 100.0,
            volume: 100.0,
            layer_order: 0,
            playback_speed: 1.0,
        }
    }

    /// Move the clip so it starts at `start`, keeping its duration.
    pub fn at(mut self, start: f64) -> Self {
        let duration = self.duration();
        self.position_start = start;
        self.position_end = start + duration;
        self
    }

    pub fn duration(&self) -> f64 {
        self.position_end - self.position_start
    }

    pub fn trim_len(&self) -> f64 {
        self.source_trim_end - self.source_trim_start
    }

    /// Check the clip's own invariants.
    pub fn check(&self) -> Result<(), String> {
        if !(self.position_start < self.position_end) {
            return Err(format!(
                "clip {} has non-positive duration ({} .. {})",
                self.id, self.position_start, self.position_end
            ));
        }
        if self.position_start < 0.0 {
            return Err(format!("clip {} starts before zero", self.id));
        }
        if !(self.source_trim_start >= 0.0
            && self.source_trim_start < self.source_trim_end
            && self.source_trim_end <= self.source_duration + TRIM_EPSILON)
        {
            return Err(format!(
                "clip {} trim window {}..{} is outside source of {}s",
                self.id, self.source_trim_start, self.source_trim_end, self.source_duration
            ));
        }
        if self.playback_speed <= 0.0 {
            return Err(format!("clip {} has non-positive playback speed", self.id));
        }
        if self.kind != MediaKind::Image {
            let expected = self.duration() * self.playback_speed;
            if (expected - self.trim_len()).abs() > TRIM_EPSILON {
                return Err(format!(
                    "clip {} plays {}s of source over {}s at {}x",
                    self.id,
                    self.trim_len(),
                    self.duration(),
                    self.playback_speed
                ));
            }
        }
        Ok(())
    }
}

/// A text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub position_start: f64,
    pub position_end: f64,
    pub content: String,

    /// Font family; resolved to `<font>.ttf` in the fonts directory.
    pub font: String,
    pub font_size: u32,
    pub color: String,
    pub x: i32,
    pub y: i32,

    #[serde(default = "full_scale")]
    pub opacity: f64,

    #[serde(default)]
    pub layer_order: i32,
}

impl TextClip {
    pub fn new(track_id: TrackId, content: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            track_id,
            position_start: start,
            position_end: end,
            content: content.into(),
            font: "Arial".to_string(),
            font_size: 24,
            color: "white".to_string(),
            x: 0,
            y: 0,
            opacity: 100.0,
            layer_order: 0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.position_end - self.position_start
    }

    pub fn check(&self) -> Result<(), String> {
        if !(self.position_start < self.position_end) {
            return Err(format!(
                "text {} has non-positive duration ({} .. {})",
                self.id, self.position_start, self.position_end
            ));
        }
        if self.position_start < 0.0 {
            return Err(format!("text {} starts before zero", self.id));
        }
        Ok(())
    }
}

/// Either kind of clip.
#[derive(Debug, Clone, PartialEq)]
pub enum Clip {
    Media(MediaClip),
    Text(TextClip),
}

impl Clip {
    pub fn id(&self) -> ClipId {
        match self {
            Clip::Media(m) => m.id,
            Clip::Text(t) => t.id,
        }
    }

    pub fn kind(&self) -> ClipKind {
        match self {
            Clip::Media(_) => ClipKind::Media,
            Clip::Text(_) => ClipKind::Text,
        }
    }

    pub fn clip_ref(&self) -> ClipRef {
        ClipRef {
            id: self.id(),
            kind: self.kind(),
        }
    }

    pub fn track_id(&self) -> TrackId {
        match self {
            Clip::Media(m) => m.track_id,
            Clip::Text(t) => t.track_id,
        }
    }

    /// The track kind this clip requires.
    pub fn track_kind(&self) -> TrackKind {
        match self {
            Clip::Media(m) => m.kind.track_kind(),
            Clip::Text(_) => TrackKind::Text,
        }
    }

    pub fn position_start(&self) -> f64 {
        match self {
            Clip::Media(m) => m.position_start,
            Clip::Text(t) => t.position_start,
        }
    }

    pub fn position_end(&self) -> f64 {
        match self {
            Clip::Media(m) => m.position_end,
            Clip::Text(t) => t.position_end,
        }
    }

    pub fn layer_order(&self) -> i32 {
        match self {
            Clip::Media(m) => m.layer_order,
            Clip::Text(t) => t.layer_order,
        }
    }
}
