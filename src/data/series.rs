//! Plot-ready trace geometry.
//!
//! The extractor reports marker positions in template-image pixel
//! coordinates, so the raw values are meaningless as G-force magnitudes.
//! For display we standardize each lateral axis (population z-score) and
//! rescale to `[-1, 1]`; the shape of the curve is preserved and the two
//! axes become directly comparable. The frame-index axis is the timeline
//! and is never normalized — it must stay an exact integer sequence for
//! frame lookups.

use crate::data::trace::FrameSample;

/// Standardize `series` and rescale the result to `[-1, 1]`.
///
/// A constant series has zero standard deviation; rather than letting
/// the division produce NaN, it maps to a flat line at `0.0`. An empty
/// series maps to an empty vector.
pub fn normalize(series: &[f64]) -> Vec<f64> {
    if series.is_empty() {
        return Vec::new();
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return vec![0.0; series.len()];
    }

    let standardized: Vec<f64> = series.iter().map(|v| (v - mean) / std_dev).collect();

    let min = standardized.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = standardized.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    standardized
        .iter()
        .map(|v| -1.0 + 2.0 * (v - min) / (max - min))
        .collect()
}

/// Normalized coordinate series for one trace, ready to plot.
///
/// `x` and `y` are the normalized lateral/longitudinal axes; `z` is the
/// raw frame-index sequence `0..len`. All three have the same length.
/// Built once per trace load and replaced wholesale by a trim commit.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDataSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl GraphDataSeries {
    pub fn from_frames(frames: &[FrameSample]) -> Self {
        let xs: Vec<f64> = frames.iter().map(|f| f.x).collect();
        let ys: Vec<f64> = frames.iter().map(|f| f.y).collect();
        Self {
            x: normalize(&xs),
            y: normalize(&ys),
            z: (0..frames.len()).map(|i| i as f64).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Slice the series to the half-open frame interval `[start, end)`.
    ///
    /// The normalized values are carried over unchanged; the frame axis
    /// is rebased so the slice plots as `0..(end - start)`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            x: self.x[start..end].to_vec(),
            y: self.y[start..end].to_vec(),
            z: (0..end - start).map(|i| i as f64).collect(),
        }
    }
}
