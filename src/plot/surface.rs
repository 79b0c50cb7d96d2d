//! The plot rendering capability boundary.
//!
//! Adapters never call a rendering library directly; they drive a
//! [`PlotSurface`]: build a line+marker figure, restyle the marker
//! subset, relayout the camera or axis ranges, purge. The crate ships an
//! egui_plot-backed 2D strip surface and a painter-projection 3D scene
//! surface; tests substitute recording surfaces.
//!
//! Surfaces also own the re-entrancy guard used by the view relay: a
//! programmatic relayout raises the guard, and the surface lowers it
//! once the relayout has actually been applied, so the resulting
//! view-change echo is distinguishable from a user interaction.

use std::cell::RefCell;
use std::rc::Rc;

use crate::plot::camera::CameraState;

/// One named line trace. Points are `[x, y, z]`; 2D surfaces plot the
/// first two columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub name: String,
    pub points: Vec<[f64; 3]>,
}

/// A complete figure: primary line at slot 0, marker at slot 1, named
/// overlays after that.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFigure {
    pub title: String,
    pub primary: PlotSeries,
    pub marker: [f64; 3],
    pub overlays: Vec<PlotSeries>,
}

/// Visible axis ranges of a 2D plot, forwarded verbatim between rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRanges {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

/// Which plot family a view parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    TwoD,
    ThreeD,
}

/// View parameter relayed between plots of the same mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewParam {
    Camera(CameraState),
    Axes(AxisRanges),
}

/// Interaction reported by a surface back to the app shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// The user clicked a data point; `frame` is its timeline coordinate.
    PointClicked { frame: f64 },
    /// The user moved the camera / changed the axis ranges.
    ViewChanged(ViewParam),
}

/// Rendering capability contract shared by the 2D and 3D surfaces.
pub trait PlotSurface {
    /// Replace the figure wholesale and (re)draw from scratch.
    fn render(&mut self, figure: PlotFigure);
    /// Move only the marker trace.
    fn restyle_marker(&mut self, point: [f64; 3]);
    /// Append a named overlay trace.
    fn add_overlay(&mut self, series: PlotSeries);
    /// Drop every trace past the two reserved slots.
    fn truncate_overlays(&mut self);
    /// Show/hide the trim bound planes at the given timeline positions.
    fn set_trim_planes(&mut self, planes: Option<(f64, f64)>);
    /// Programmatic camera relayout (3D surfaces; 2D surfaces ignore it).
    fn relayout_camera(&mut self, camera: CameraState);
    /// Programmatic axis-range relayout (2D surfaces; 3D surfaces ignore it).
    fn relayout_axes(&mut self, ranges: AxisRanges);
    /// Raise/lower the re-entrancy guard.
    fn set_programmatic_guard(&mut self, on: bool);
    fn programmatic_guard(&self) -> bool;
    /// Tear the figure down; must be safe to call repeatedly and before
    /// the first render.
    fn purge(&mut self);
    fn has_figure(&self) -> bool;
}

pub type SurfaceHandle = Rc<RefCell<dyn PlotSurface>>;
