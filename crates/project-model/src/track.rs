//! Timeline tracks.
//!
//! Tracks are ordered. The first track renders on top; later tracks sit
//! underneath it in bands of ten z-levels per track.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a track.
pub type TrackId = Uuid;

/// What a track may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Image,
    Text,
}

impl TrackKind {
    /// Human-readable label used in generated track names.
    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Audio => "Audio",
            TrackKind::Image => "Image",
            TrackKind::Text => "Text",
        }
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single timeline track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,

    /// Display name, e.g. "Video 1".
    pub name: String,

    /// Muted tracks contribute no audio to a render.
    #[serde(default)]
    pub muted: bool,

    /// When any track is soloed, only soloed tracks contribute audio.
    #[serde(default)]
    pub soloed: bool,
}

impl Track {
    pub fn new(kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            name: name.into(),
            muted: false,
            soloed: false,
        }
    }

    /// Name for the next track of `kind` given the existing tracks.
    pub fn next_name(kind: TrackKind, existing: &[Track]) -> String {
        let count = existing.iter().filter(|t| t.kind == kind).count();
        format!("{} {}", kind.label(), count + 1)
    }
}
