//! Time geometry for the timeline.
//!
//! The timeline maps seconds to pixels linearly through a zoom factor
//! (pixels per second). Gaps are derived on demand from clip intervals and
//! never stored.

use serde::{Deserialize, Serialize};

use crate::project::Project;
use crate::track::TrackId;

/// Convert a time to a horizontal pixel offset.
pub fn to_pixels(seconds: f64, zoom: f64) -> f64 {
    seconds * zoom
}

/// Convert a horizontal pixel offset to a time. Returns 0 for a non-positive zoom.
pub fn to_seconds(pixels: f64, zoom: f64) -> f64 {
    if zoom <= 0.0 {
        return 0.0;
    }
    pixels / zoom
}

/// A half-open time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An empty span on one track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub start: f64,
    pub end: f64,
    pub track_id: TrackId,
}

impl Gap {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Find the uncovered spans between zero and the last interval end.
///
/// Intervals may overlap and arrive in any order.
pub fn compute_gaps(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut gaps = Vec::new();
    let mut last_end = 0.0f64;
    for interval in &sorted {
        if interval.start > last_end {
            gaps.push(Interval::new(last_end, interval.start));
        }
        last_end = last_end.max(interval.end);
    }
    gaps
}

/// Gaps on a single track, considering both media and text clips.
pub fn gaps_on_track(project: &Project, track_id: TrackId) -> Vec<Gap> {
    let intervals: Vec<Interval> = project
        .media()
        .iter()
        .filter(|c| c.track_id == track_id)
        .map(|c| Interval::new(c.position_start, c.position_end))
        .chain(
            project
                .text()
                .iter()
                .filter(|c| c.track_id == track_id)
                .map(|c| Interval::new(c.position_start, c.position_end)),
        )
        .collect();

    compute_gaps(&intervals)
        .into_iter()
        .map(|g| Gap {
            start: g.start,
            end: g.end,
            track_id,
        })
        .collect()
}

/// Tick spacing for a time ruler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulerTicks {
    /// Seconds between minor ticks.
    pub interval_secs: f64,

    /// Every `interval_secs * major_multiplier` seconds gets a labelled tick.
    pub major_multiplier: f64,

    /// Decimal places shown in labels.
    pub label_precision: usize,
}

/// Ruler tick spacing for a zoom level (pixels per second).
pub fn ruler_ticks(zoom: f64) -> RulerTicks {
    const TABLE: &[(f64, f64, f64, usize)] = &[
        (2.0, 45.0, 2.0, 0),
        (3.0, 30.0, 2.0, 0),
        (4.0, 20.0, 3.0, 0),
        (5.0, 15.0, 2.0, 0),
        (6.0, 12.0, 2.5, 0),
        (10.0, 10.0, 2.0, 0),
        (15.0, 5.0, 2.0, 0),
        (25.0, 2.0, 2.5, 0),
        (50.0, 1.0, 5.0, 0),
        (100.0, 0.5, 2.0, 1),
        (200.0, 0.2, 2.5, 1),
        (400.0, 0.1, 5.0, 1),
        (800.0, 0.05, 4.0, 2),
    ];

    for &(below, interval_secs, major_multiplier, label_precision) in TABLE {
        if zoom < below {
            return RulerTicks {
                interval_secs,
                major_multiplier,
                label_precision,
            };
        }
    }
    RulerTicks {
        interval_secs: 0.02,
        major_multiplier: 5.0,
        label_precision: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pixel_round_trip() {
        assert_eq!(to_pixels(2.5, 100.0), 250.0);
        assert_eq!(to_seconds(250.0, 100.0), 2.5);
    }

    #[test]
    fn test_to_seconds_zero_zoom() {
        assert_eq!(to_seconds(100.0, 0.0), 0.0);
        assert_eq!(to_seconds(100.0, -5.0), 0.0);
    }

    #[test]
    fn test_compute_gaps_basic() {
        let gaps = compute_gaps(&[Interval::new(5.0, 8.0), Interval::new(1.0, 3.0)]);
        assert_eq!(gaps, vec![Interval::new(0.0, 1.0), Interval::new(3.0, 5.0)]);
    }

    #[test]
    fn test_compute_gaps_overlapping_and_nested() {
        let gaps = compute_gaps(&[
            Interval::new(0.0, 10.0),
            Interval::new(2.0, 4.0),
            Interval::new(12.0, 13.0),
        ]);
        assert_eq!(gaps, vec![Interval::new(10.0, 12.0)]);
    }

    #[test]
    fn test_compute_gaps_empty() {
        assert!(compute_gaps(&[]).is_empty());
    }

    #[test]
    fn test_interval_overlap_is_half_open() {
        let a = Interval::new(0.0, 2.0);
        assert!(!a.overlaps(&Interval::new(2.0, 3.0)));
        assert!(a.overlaps(&Interval::new(1.9, 3.0)));
    }

    #[test]
    fn test_ruler_ticks_breakpoints() {
        assert_eq!(ruler_ticks(1.0).interval_secs, 45.0);
        assert_eq!(ruler_ticks(100.0).interval_secs, 0.2);
        assert_eq!(ruler_ticks(99.9).interval_secs, 0.5);
        assert_eq!(ruler_ticks(1000.0).interval_secs, 0.02);
        assert_eq!(ruler_ticks(1000.0).label_precision, 2);
    }

    proptest! {
        #[test]
        fn prop_gaps_and_intervals_tile_the_timeline(
            raw in prop::collection::vec((0.0f64..100.0, 0.01f64..20.0), 1..12)
        ) {
            let intervals: Vec<Interval> =
                raw.iter().map(|&(s, d)| Interval::new(s, s + d)).collect();
            let gaps = compute_gaps(&intervals);

            for gap in &gaps {
                prop_assert!(gap.start < gap.end);
                for interval in &intervals {
                    prop_assert!(!gap.overlaps(interval));
                }
            }
            for pair in gaps.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }

            // Sampled points up to the last end are covered by exactly one side.
            let max_end = intervals.iter().map(|i| i.end).fold(0.0, f64::max);
            let mut t = 0.0;
            while t < max_end {
                let in_clip = intervals.iter().any(|i| i.start <= t && t < i.end);
                let in_gap = gaps.iter().any(|g| g.start <= t && t < g.end);
                prop_assert!(in_clip ^ in_gap);
                t += 0.37;
            }
        }
    }
}
