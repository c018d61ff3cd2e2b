//! Project snapshot, export settings, and the on-disk project bundle.
//!
//! A [`Project`] is an immutable-from-outside value: it is read through
//! getters and only changed by [`crate::store::ProjectStore`]. Clip and track
//! collections sit behind `Arc`, so cloning a project for history is cheap
//! and untouched collections are shared between snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cutline_common::CutlineError;

use crate::clip::{BlobId, Clip, ClipId, ClipKind, ClipRef, MediaClip, TextClip};
use crate::geometry::Gap;
use crate::track::{Track, TrackId, TrackKind};

/// Zoom bounds (pixels per second).
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 1000.0;

/// Project file name inside a bundle.
pub const PROJECT_FILE: &str = "project.json";

/// The full editable state of a project at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub(crate) version: String,
    pub(crate) id: Uuid,
    pub(crate) name: String,

    /// Creation timestamp (ISO 8601).
    pub(crate) created_at: String,

    /// Last saved timestamp (ISO 8601).
    pub(crate) modified_at: String,

    pub(crate) tracks: Arc<Vec<Track>>,
    pub(crate) media: Arc<Vec<MediaClip>>,
    pub(crate) text: Arc<Vec<TextClip>>,

    /// `max(0, max position_end)` over all clips.
    pub(crate) duration: f64,

    /// Playhead (seconds).
    pub(crate) current_time: f64,

    /// Pixels per second.
    pub(crate) zoom: f64,

    pub(crate) snapping: bool,

    #[serde(skip)]
    pub(crate) selection: Vec<ClipRef>,

    #[serde(skip)]
    pub(crate) active_gap: Option<Gap>,

    #[serde(default)]
    pub(crate) export: ExportSettings,
}

impl Project {
    /// Create an empty project with defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
            tracks: Arc::new(Vec::new()),
            media: Arc::new(Vec::new()),
            text: Arc::new(Vec::new()),
            duration: 0.0,
            current_time: 0.0,
            zoom: 100.0,
            snapping: true,
            selection: Vec::new(),
            active_gap: None,
            export: ExportSettings::default(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn modified_at(&self) -> &str {
        &self.modified_at
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn media(&self) -> &[MediaClip] {
        &self.media
    }

    pub fn text(&self) -> &[TextClip] {
        &self.text
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn snapping_enabled(&self) -> bool {
        self.snapping
    }

    pub fn selection(&self) -> &[ClipRef] {
        &self.selection
    }

    pub fn active_gap(&self) -> Option<&Gap> {
        self.active_gap.as_ref()
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.export
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn media_clip(&self, id: ClipId) -> Option<&MediaClip> {
        self.media.iter().find(|c| c.id == id)
    }

    pub fn text_clip(&self, id: ClipId) -> Option<&TextClip> {
        self.text.iter().find(|c| c.id == id)
    }

    /// Look up a clip by reference, cloning it into a [`Clip`].
    pub fn clip(&self, clip: ClipRef) -> Option<Clip> {
        match clip.kind {
            ClipKind::Media => self.media_clip(clip.id).cloned().map(Clip::Media),
            ClipKind::Text => self.text_clip(clip.id).cloned().map(Clip::Text),
        }
    }

    /// Every clip, media first, in collection order.
    pub fn all_clips(&self) -> Vec<Clip> {
        self.media
            .iter()
            .cloned()
            .map(Clip::Media)
            .chain(self.text.iter().cloned().map(Clip::Text))
            .collect()
    }

    pub fn is_selected(&self, id: ClipId) -> bool {
        self.selection.iter().any(|s| s.id == id)
    }

    /// Selected clips that still exist, in selection order.
    pub fn selected_clips(&self) -> Vec<Clip> {
        self.selection.iter().filter_map(|s| self.clip(*s)).collect()
    }

    /// Whether any track is soloed.
    pub fn any_soloed(&self) -> bool {
        self.tracks.iter().any(|t| t.soloed)
    }

    /// Distinct source blobs referenced by media clips, in first-use order.
    pub fn sources(&self) -> Vec<BlobId> {
        let mut seen = Vec::new();
        for clip in self.media.iter() {
            if !seen.contains(&clip.source) {
                seen.push(clip.source);
            }
        }
        seen
    }

    /// Check every clip invariant and track reference.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for clip in self.media.iter() {
            if let Err(e) = clip.check() {
                errors.push(e);
            }
            match self.track(clip.track_id) {
                None => errors.push(format!("clip {} references a missing track", clip.id)),
                Some(track) if track.kind != clip.kind.track_kind() => errors.push(format!(
                    "clip {} ({:?}) sits on a {} track",
                    clip.id, clip.kind, track.kind
                )),
                Some(_) => {}
            }
        }
        for clip in self.text.iter() {
            if let Err(e) = clip.check() {
                errors.push(e);
            }
            match self.track(clip.track_id) {
                None => errors.push(format!("text {} references a missing track", clip.id)),
                Some(track) if track.kind != TrackKind::Text => errors.push(format!(
                    "text {} sits on a {} track",
                    clip.id, track.kind
                )),
                Some(_) => {}
            }
        }
        errors
    }

    pub(crate) fn recompute_duration(&mut self) {
        self.duration = self
            .media
            .iter()
            .map(|c| c.position_end)
            .chain(self.text.iter().map(|c| c.position_end))
            .fold(0.0, f64::max);
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Webm,
    Gif,
    Mov,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Webm => "webm",
            ExportFormat::Gif => "gif",
            ExportFormat::Mov => "mov",
        }
    }

    /// Every artifact extension a render job may produce.
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Mp4,
        ExportFormat::Webm,
        ExportFormat::Gif,
        ExportFormat::Mov,
    ];
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(ExportFormat::Mp4),
            "webm" => Ok(ExportFormat::Webm),
            "gif" => Ok(ExportFormat::Gif),
            "mov" => Ok(ExportFormat::Mov),
            other => Err(format!("Unknown format: {other}. Use: mp4, webm, gif, mov")),
        }
    }
}

/// Encode quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl Quality {
    pub fn crf(self) -> u32 {
        match self {
            Quality::Low => 28,
            Quality::Medium => 23,
            Quality::High => 18,
            Quality::Ultra => 14,
        }
    }

    pub fn audio_bitrate_kbps(self) -> u32 {
        match self {
            Quality::Low => 128,
            Quality::Medium => 192,
            Quality::High => 256,
            Quality::Ultra => 320,
        }
    }
}

/// Encoder speed/efficiency trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncodeSpeed {
    #[default]
    Fastest,
    Fast,
    Balanced,
    Slow,
    Slowest,
}

impl EncodeSpeed {
    /// x264/x265 preset name.
    pub fn preset(self) -> &'static str {
        match self {
            EncodeSpeed::Fastest => "ultrafast",
            EncodeSpeed::Fast => "veryfast",
            EncodeSpeed::Balanced => "medium",
            EncodeSpeed::Slow => "slow",
            EncodeSpeed::Slowest => "veryslow",
        }
    }
}

/// Output canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "2k")]
    K2,
    #[serde(rename = "4k")]
    K4,
}

impl Resolution {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::P480 => (854, 480),
            Resolution::P720 => (1280, 720),
            Resolution::P1080 => (1920, 1080),
            Resolution::K2 => (2560, 1440),
            Resolution::K4 => (3840, 2160),
        }
    }
}

/// Export settings stored with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub quality: Quality,
    pub speed: EncodeSpeed,
    pub fps: u32,
    pub resolution: Resolution,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4,
            quality: Quality::High,
            speed: EncodeSpeed::Fastest,
            fps: 30,
            resolution: Resolution::P1080,
        }
    }
}

/// A project together with the directory it lives in.
///
/// ```text
/// <root>/
///   project.json
///   media/      (source blobs, one file per blob id)
///   renders/    (persisted render artifacts)
///   .tmp/       (render job namespace)
/// ```
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    pub project: Project,
}

impl LoadedProject {
    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = root.join(PROJECT_FILE);

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let mut project: Project =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;
        project.recompute_duration();

        Ok(Self { root, project })
    }

    /// Save the project to disk, stamping the modification time.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        std::fs::create_dir_all(&self.root).map_err(|e| ProjectError::IoError {
            path: self.root.clone(),
            source: e,
        })?;

        self.project.modified_at = chrono::Utc::now().to_rfc3339();

        let project_path = self.root.join(PROJECT_FILE);
        let project_json =
            serde_json::to_string_pretty(&self.project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        tracing::debug!(root = %self.root.display(), "Project saved");
        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in ["media", "renders", ".tmp"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let mut loaded = Self {
            root,
            project: Project::new(name),
        };
        loaded.save()?;
        Ok(loaded)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    pub fn renders_dir(&self) -> PathBuf {
        self.root.join("renders")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(".tmp")
    }

    /// Path a source blob is stored at.
    pub fn media_path(&self, source: BlobId) -> PathBuf {
        self.media_dir().join(source.to_string())
    }

    /// Report missing source blobs and broken clip invariants.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        for clip in self.project.media() {
            if !self.media_path(clip.source).exists() {
                errors.push(format!(
                    "Source missing for {}: media/{}",
                    clip.file_name, clip.source
                ));
            }
        }

        errors.extend(self.project.invariant_violations());
        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },

    #[error("Track not found: {id}")]
    TrackNotFound { id: TrackId },

    #[error("Clip not found: {id}")]
    ClipNotFound { id: ClipId },

    #[error("Clip {clip_id} cannot be placed on a {track_kind} track")]
    IncompatibleTrack {
        clip_id: ClipId,
        track_kind: TrackKind,
    },
}

impl ProjectError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<ProjectError> for CutlineError {
    fn from(err: ProjectError) -> Self {
        let display = err.to_string();
        match err {
            ProjectError::ValidationError { message } => CutlineError::validation(message),
            ProjectError::IncompatibleTrack { .. } => CutlineError::validation(display),
            ProjectError::TrackNotFound { id } => CutlineError::not_found(format!("track {id}")),
            ProjectError::ClipNotFound { id } => CutlineError::not_found(format!("clip {id}")),
            ProjectError::IoError { .. } | ProjectError::ParseError { .. } => {
                CutlineError::project(display)
            }
        }
    }
}
