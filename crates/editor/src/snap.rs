//! Edge snapping.
//!
//! Candidates are collected once per gesture: zero, the playhead, then the
//! start and end of every clip that is not being manipulated (media first,
//! then text, in collection order). The moving edges are tested in priority
//! order and the closest candidate under the pixel threshold wins. Strict
//! comparison keeps the first hit on ties.

use std::collections::HashSet;

use cutline_project_model::{geometry, ClipId, Project};

/// Default snap distance in pixels.
pub const DEFAULT_SNAP_THRESHOLD_PX: f64 = 10.0;

/// A successful snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapHit {
    /// Index into the edge list passed to [`find_snap`].
    pub edge: usize,

    /// Candidate time the edge lands on (seconds).
    pub target: f64,

    /// Pixel distance between the raw edge and the target.
    pub distance_px: f64,
}

/// Snap candidates for a gesture that manipulates `exclude`.
pub fn collect_candidates(project: &Project, exclude: &HashSet<ClipId>) -> Vec<f64> {
    let mut candidates = vec![0.0, project.current_time()];
    for clip in project.media().iter().filter(|c| !exclude.contains(&c.id)) {
        candidates.push(clip.position_start);
        candidates.push(clip.position_end);
    }
    for clip in project.text().iter().filter(|c| !exclude.contains(&c.id)) {
        candidates.push(clip.position_start);
        candidates.push(clip.position_end);
    }
    candidates
}

/// Find the closest candidate to any of `edges` within `threshold_px`.
pub fn find_snap(edges: &[f64], candidates: &[f64], zoom: f64, threshold_px: f64) -> Option<SnapHit> {
    let mut best: Option<SnapHit> = None;
    for (edge_index, &edge) in edges.iter().enumerate() {
        for &candidate in candidates {
            let distance_px = (geometry::to_pixels(edge, zoom) - geometry::to_pixels(candidate, zoom)).abs();
            if distance_px >= threshold_px {
                continue;
            }
            if best.map_or(true, |b| distance_px < b.distance_px) {
                best = Some(SnapHit {
                    edge: edge_index,
                    target: candidate,
                    distance_px,
                });
            }
        }
    }
    best
}
