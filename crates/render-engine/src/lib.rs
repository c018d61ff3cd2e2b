//! Cutline Render Engine
//!
//! Turns a project snapshot into a rendered file through an external
//! FFmpeg process, and manages the resulting jobs.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Project ──compile──▶ RenderPlan ──resolve_inputs──▶ ResolvedInputs
//!                          │                               │
//!                          └──────── FfmpegCommand ◀───────┘
//!                                        │
//!                              JobManager::submit
//!                                        │
//!                         Renderer (tokio::process ffmpeg)
//!                                        │
//!          <job>.log ── poll_status ──▶ starting/processing/complete/error
//!                                        │
//!                       cancel / cleanup_finished / persist_artifact
//! ```

pub mod blob;
pub mod cleanup;
pub mod compiler;
pub mod ffmpeg;
pub mod job;
pub mod renderer;

pub use blob::*;
pub use cleanup::*;
pub use compiler::*;
pub use ffmpeg::*;
pub use job::*;
pub use renderer::*;
