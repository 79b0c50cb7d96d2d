//! Core trace types: per-frame samples and trim regions.
//!
//! A [`Trace`] is what the video processing pipeline hands us: a frame
//! rate plus one `{x, y, z}` sample per video frame, where `x`/`y` are
//! the lateral/longitudinal marker coordinates (arbitrary device units)
//! and `z` is the frame index. Trim regions are stored alongside the
//! trace and re-applied when the trace is loaded.

use serde::{Deserialize, Serialize};

/// One accelerometer sample extracted from a single video frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    pub x: f64,
    pub y: f64,
    /// Frame index the sample was extracted from.
    pub z: f64,
}

/// Frame/time bounds of a trim region.
///
/// `start_time`/`end_time` are derived from the frame bounds and the
/// trace frame rate; the frame bounds are authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimRange {
    pub start_frame: usize,
    pub end_frame: usize,
    pub start_time: f64,
    pub end_time: f64,
}

impl TrimRange {
    /// Build a range from frame bounds, deriving the time bounds from `fps`.
    pub fn from_frames(start_frame: usize, end_frame: usize, fps: f64) -> Self {
        Self {
            start_frame,
            end_frame,
            start_time: start_frame as f64 / fps,
            end_time: end_frame as f64 / fps,
        }
    }

    /// Number of frames covered by the half-open interval `[start, end)`.
    pub fn len(&self) -> usize {
        self.end_frame.saturating_sub(self.start_frame)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A labeled trim region on a trace timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimRegion {
    pub label: String,
    pub range: TrimRange,
}

/// A loaded G-force trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub title: Option<String>,
    pub fps: f64,
    pub frames: Vec<FrameSample>,
    #[serde(default)]
    pub trim: Vec<TrimRegion>,
}

impl Trace {
    /// Playback duration implied by the frame count and frame rate.
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frames.len() as f64 / self.fps
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_range_derives_times_from_fps() {
        let r = TrimRange::from_frames(20, 80, 25.0);
        assert_eq!(r.start_frame, 20);
        assert_eq!(r.end_frame, 80);
        assert_eq!(r.start_time, 0.8);
        assert_eq!(r.end_time, 3.2);
        assert_eq!(r.len(), 60);
    }

    #[test]
    fn trace_duration() {
        let trace = Trace {
            title: None,
            fps: 25.0,
            frames: vec![FrameSample { x: 0.0, y: 0.0, z: 0.0 }; 100],
            trim: Vec::new(),
        };
        assert_eq!(trace.duration(), 4.0);
    }

    #[test]
    fn trim_region_round_trips_through_json() {
        let region = TrimRegion {
            label: "Turn 3".into(),
            range: TrimRange::from_frames(10, 50, 30.0),
        };
        let json = serde_json::to_string(&region).unwrap();
        assert!(json.contains("startFrame"), "range keys should be camelCase: {json}");
        let back: TrimRegion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, region);
    }
}
