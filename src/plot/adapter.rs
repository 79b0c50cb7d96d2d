//! Uniform adapter over the 2D and 3D plot surfaces.
//!
//! A [`PlotAdapter`] owns one plot's worth of state — the plot-ready
//! series, the marker position, overlays, and trim bounds — and drives a
//! [`PlotSurface`] through the shared operation set. The variant tag
//! decides how the series projects into the figure: a 2D strip plots one
//! lateral axis against the frame index, the 3D scene plots all three.

use std::str::FromStr;

use crate::data::series::GraphDataSeries;
use crate::data::trace::{TrimRange, TrimRegion};
use crate::plot::camera::CameraPreset;
use crate::plot::surface::{PlotFigure, PlotSeries, PlotSurface, SurfaceHandle};

/// Which lateral axis a 2D strip shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripAxis {
    /// Cornering forces (the normalized x axis).
    Corner,
    /// Acceleration/braking forces (the normalized y axis).
    Accel,
}

impl StripAxis {
    fn axis_title(self) -> &'static str {
        match self {
            StripAxis::Corner => "Corner",
            StripAxis::Accel => "Acceleration",
        }
    }
}

/// Variant tag: how the held series projects onto the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Strip(StripAxis),
    Scene3d,
}

/// One plot: held series plus the surface it renders to.
pub struct PlotAdapter {
    kind: PlotKind,
    surface: SurfaceHandle,
    series: GraphDataSeries,
    fps: f64,
    title: Option<String>,
    /// Last playback time applied to the marker; repeat updates for the
    /// same time are no-ops (the upstream clock tick fires redundantly).
    prev_time: Option<f64>,
    trim_enabled: bool,
    trim_bounds: Option<(f64, f64)>,
    /// Frame offset of the held (possibly sliced) series within the
    /// original trace; marker updates shift by it.
    trim_offset: usize,
    overlay_names: Vec<String>,
    rendered: bool,
}

impl PlotAdapter {
    pub fn new(kind: PlotKind, surface: SurfaceHandle) -> Self {
        Self {
            kind,
            surface,
            series: GraphDataSeries { x: Vec::new(), y: Vec::new(), z: Vec::new() },
            fps: 0.0,
            title: None,
            prev_time: None,
            trim_enabled: false,
            trim_bounds: None,
            trim_offset: 0,
            overlay_names: Vec::new(),
            rendered: false,
        }
    }

    pub fn kind(&self) -> PlotKind {
        self.kind
    }

    /// Replace the held series (a fresh trace load resets any trim).
    pub fn set_data(&mut self, series: GraphDataSeries, fps: f64, title: Option<String>) {
        self.series = series;
        self.fps = fps;
        self.title = title;
        self.trim_offset = 0;
        self.trim_bounds = None;
        self.prev_time = None;
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
        if self.rendered {
            self.render();
        }
    }

    pub fn series_len(&self) -> usize {
        self.series.len()
    }

    pub fn trim_offset(&self) -> usize {
        self.trim_offset
    }

    /// Map a clicked timeline coordinate to a playback time, accounting
    /// for the trim offset of the held series.
    pub fn playback_time_for_frame(&self, frame: f64) -> Option<f64> {
        if self.fps <= 0.0 || frame < 0.0 {
            return None;
        }
        Some((frame + self.trim_offset as f64) / self.fps)
    }

    fn figure_title(&self) -> String {
        match self.kind {
            PlotKind::Strip(axis) => match &self.title {
                Some(t) => format!("{} G-forces {}", axis.axis_title(), t),
                None => format!("{} G-forces", axis.axis_title()),
            },
            PlotKind::Scene3d => self
                .title
                .clone()
                .unwrap_or_else(|| "G-forces Visualization".to_string()),
        }
    }

    fn project(&self, series: &GraphDataSeries) -> Vec<[f64; 3]> {
        match self.kind {
            PlotKind::Strip(axis) => {
                let values = match axis {
                    StripAxis::Corner => &series.x,
                    StripAxis::Accel => &series.y,
                };
                series
                    .z
                    .iter()
                    .zip(values.iter())
                    .map(|(f, v)| [*f, *v, 0.0])
                    .collect()
            }
            PlotKind::Scene3d => series
                .z
                .iter()
                .enumerate()
                .map(|(i, f)| [series.x[i], series.y[i], *f])
                .collect(),
        }
    }

    /// Build the line+marker figure from the held series and push it to
    /// the surface.
    pub fn render(&mut self) {
        if self.series.is_empty() {
            log::warn!("plot: refusing to render an empty series");
            return;
        }
        let points = self.project(&self.series);
        let marker = points[0];
        let figure = PlotFigure {
            title: self.figure_title(),
            primary: PlotSeries { name: "G-force".into(), points },
            marker,
            overlays: Vec::new(),
        };
        self.surface.borrow_mut().render(figure);
        self.overlay_names.clear();
        self.prev_time = None;
        self.rendered = true;
    }

    /// Move the marker to the frame implied by `current_time`.
    ///
    /// An out-of-range frame is a silent no-op: with playback sync on, a
    /// longer video legitimately plays past a shorter trace.
    pub fn update_marker(&mut self, current_time: f64) {
        if !self.rendered || self.fps <= 0.0 {
            return;
        }
        if self.prev_time == Some(current_time) {
            return;
        }
        let frame = (current_time * self.fps).floor() as i64 - self.trim_offset as i64;
        if frame < 0 || frame as usize >= self.series.len() {
            return;
        }
        let i = frame as usize;
        let point = match self.kind {
            PlotKind::Strip(StripAxis::Corner) => [self.series.z[i], self.series.x[i], 0.0],
            PlotKind::Strip(StripAxis::Accel) => [self.series.z[i], self.series.y[i], 0.0],
            PlotKind::Scene3d => [self.series.x[i], self.series.y[i], self.series.z[i]],
        };
        self.surface.borrow_mut().restyle_marker(point);
        self.prev_time = Some(current_time);
    }

    /// Add secondary traces keyed by name; a name that is already shown
    /// is skipped.
    pub fn overlay(&mut self, named: &[(String, GraphDataSeries)]) {
        if !self.rendered {
            return;
        }
        for (name, series) in named {
            if self.overlay_names.iter().any(|n| n == name) {
                continue;
            }
            let points = self.project(series);
            self.surface
                .borrow_mut()
                .add_overlay(PlotSeries { name: name.clone(), points });
            self.overlay_names.push(name.clone());
        }
    }

    /// Drop everything past the two reserved traces (line and marker).
    pub fn remove_overlays(&mut self) {
        self.overlay_names.clear();
        self.surface.borrow_mut().truncate_overlays();
    }

    pub fn set_trim_mode(&mut self, enabled: bool) {
        self.trim_enabled = enabled;
        if !enabled {
            self.trim_bounds = None;
            self.surface.borrow_mut().set_trim_planes(None);
        }
    }

    pub fn trim_mode(&self) -> bool {
        self.trim_enabled
    }

    /// Position the trim bound planes; they are moved in place, not
    /// re-added, as the slider drags.
    pub fn draw_trim_bounds(&mut self, start_raw: f64, end_raw: f64) {
        if !self.trim_enabled {
            return;
        }
        let planes = (start_raw.floor(), end_raw.ceil());
        self.trim_bounds = Some(planes);
        self.surface.borrow_mut().set_trim_planes(Some(planes));
    }

    /// Slice the held series to the drawn bounds, re-render, and return
    /// the committed region in absolute trace frames.
    pub fn commit_trim(&mut self, label: &str) -> Option<TrimRegion> {
        let (start_raw, end_raw) = self.trim_bounds.take()?;
        let start = start_raw.max(0.0) as usize;
        let end = (end_raw as usize).min(self.series.len());
        if start >= end {
            log::warn!("plot: ignoring degenerate trim bounds {start_raw}..{end_raw}");
            return None;
        }

        let abs_start = self.trim_offset + start;
        let abs_end = self.trim_offset + end;
        let region = TrimRegion {
            label: label.to_string(),
            range: TrimRange::from_frames(abs_start, abs_end, self.fps),
        };

        self.series = self.series.slice(start, end);
        self.trim_offset = abs_start;
        self.surface.borrow_mut().set_trim_planes(None);
        self.render();
        Some(region)
    }

    /// Show a previously saved region. The held series must be the full
    /// trace (callers re-load it before applying a different region).
    pub fn apply_region(&mut self, region: &TrimRegion) {
        let r = &region.range;
        if r.is_empty() || r.end_frame > self.series.len() + self.trim_offset {
            log::warn!("plot: region '{}' does not fit the held series", region.label);
            return;
        }
        let start = r.start_frame.saturating_sub(self.trim_offset);
        let end = r.end_frame.saturating_sub(self.trim_offset);
        self.series = self.series.slice(start, end);
        self.trim_offset = r.start_frame;
        self.render();
    }

    /// Jump the 3D camera to a named preset. 2D strips no-op.
    pub fn change_camera(&mut self, preset_name: &str) {
        if !matches!(self.kind, PlotKind::Scene3d) {
            return;
        }
        match CameraPreset::from_str(preset_name) {
            Ok(preset) => self.surface.borrow_mut().relayout_camera(preset.camera()),
            Err(()) => log::error!("plot: unknown camera preset '{preset_name}'"),
        }
    }

    /// Tear down the rendered figure; safe to call repeatedly and before
    /// the first render.
    pub fn clear(&mut self) {
        self.surface.borrow_mut().purge();
        self.rendered = false;
        self.prev_time = None;
        self.trim_bounds = None;
        self.overlay_names.clear();
    }
}
