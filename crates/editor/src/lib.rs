//! Cutline Editor
//!
//! Turns pointer and keyboard input into project edits:
//! - **Snapping:** Candidate collection and nearest-edge search
//! - **Resize:** Edge trimming math that keeps source trims consistent
//! - **Gestures:** Two-phase drag/resize (live preview, single commit)
//! - **Edits:** Split, duplicate, delete/ripple-delete, playhead and zoom nudges
//!
//! Everything here is synchronous and performs no I/O. All changes reach
//! the project through [`cutline_project_model::ProjectStore`].

pub mod edit;
pub mod gesture;
pub mod resize;
pub mod snap;

pub use edit::*;
pub use gesture::*;
pub use resize::*;
pub use snap::*;
