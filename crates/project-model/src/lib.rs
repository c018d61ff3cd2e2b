//! Cutline Project Model
//!
//! Defines the core data contracts for Cutline projects:
//! - **Geometry:** Seconds/pixels conversion, intervals, and gap detection
//! - **Tracks & clips:** Ordered tracks holding media and text clips
//! - **Project:** The snapshot value, export settings, and the on-disk bundle
//! - **History:** Bounded undo/redo stacks of snapshots
//! - **Store:** The only place a project is mutated
//!
//! Times are in seconds (`f64`). Opacity and volume use a `0..=100` scale.

pub mod clip;
pub mod geometry;
pub mod history;
pub mod project;
pub mod store;
pub mod track;

pub use clip::*;
pub use geometry::*;
pub use history::*;
pub use project::*;
pub use store::*;
pub use track::*;
