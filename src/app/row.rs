//! One comparison row: a video player paired with its plots.
//!
//! A row owns the plot surfaces and adapters for its trace and the UI
//! state hanging off them (view mode, trim editing, save dialog input).
//! The player itself lives in the app's player table so the synchronizer
//! can drive all rows through one registry; the row only remembers its
//! [`PlayerId`].

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::data::series::GraphDataSeries;
use crate::data::trace::{Trace, TrimRegion};
use crate::player::PlayerId;
use crate::plot::adapter::{PlotAdapter, PlotKind, StripAxis};
use crate::plot::scene3d::Scene3dSurface;
use crate::plot::strip2d::Strip2dSurface;
use crate::plot::surface::{SurfaceHandle, ViewMode};
use crate::relay::ViewSyncRelay;

/// Trace data currently shown in a row.
pub struct RowTrace {
    pub trace: Trace,
    pub video_path: Option<PathBuf>,
    /// Extractor result file, needed when the trace is saved later.
    pub json_path: Option<PathBuf>,
    /// Set once the trace is (or was loaded from) a stored bundle.
    pub trace_id: Option<String>,
}

/// Trim editing state for one row.
#[derive(Default)]
pub struct TrimUi {
    pub enabled: bool,
    /// Raw slider bounds in (possibly sliced) series frames.
    pub bounds: (f64, f64),
    pub label: String,
    /// Index into the trace's saved trim regions currently applied.
    pub selected_region: Option<usize>,
}

pub struct Row {
    pub id: u64,
    pub player: PlayerId,
    pub view: ViewMode,

    pub scene: Rc<RefCell<Scene3dSurface>>,
    pub strip_top: Rc<RefCell<Strip2dSurface>>,
    pub strip_bottom: Rc<RefCell<Strip2dSurface>>,
    pub adapter_3d: PlotAdapter,
    pub adapter_corner: PlotAdapter,
    pub adapter_accel: PlotAdapter,

    pub loaded: Option<RowTrace>,
    pub processing: bool,
    pub trim: TrimUi,
    pub camera_label: String,
}

impl Row {
    pub fn new(id: u64, player: PlayerId) -> Self {
        let scene = Rc::new(RefCell::new(Scene3dSurface::new()));
        let strip_top = Rc::new(RefCell::new(Strip2dSurface::new(format!("strip-corner-{id}"))));
        let strip_bottom = Rc::new(RefCell::new(Strip2dSurface::new(format!("strip-accel-{id}"))));

        let scene_handle: SurfaceHandle = scene.clone();
        let top_handle: SurfaceHandle = strip_top.clone();
        let bottom_handle: SurfaceHandle = strip_bottom.clone();

        Self {
            id,
            player,
            view: ViewMode::ThreeD,
            adapter_3d: PlotAdapter::new(PlotKind::Scene3d, scene_handle),
            adapter_corner: PlotAdapter::new(PlotKind::Strip(StripAxis::Corner), top_handle),
            adapter_accel: PlotAdapter::new(PlotKind::Strip(StripAxis::Accel), bottom_handle),
            scene,
            strip_top,
            strip_bottom,
            loaded: None,
            processing: false,
            trim: TrimUi::default(),
            camera_label: "Camera angles".to_string(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn fps(&self) -> f64 {
        self.loaded.as_ref().map(|t| t.trace.fps).unwrap_or(0.0)
    }

    /// Timeline start for a stop action: the selected trim region's
    /// start when one is applied, else absolute zero.
    pub fn timeline_start(&self) -> f64 {
        self.trim
            .selected_region
            .and_then(|i| self.loaded.as_ref().and_then(|t| t.trace.trim.get(i)))
            .map(|r| r.range.start_time)
            .unwrap_or(0.0)
    }

    fn series(&self) -> Option<GraphDataSeries> {
        self.loaded
            .as_ref()
            .filter(|t| !t.trace.frames.is_empty())
            .map(|t| GraphDataSeries::from_frames(&t.trace.frames))
    }

    /// The adapters backing the currently visible plots.
    pub fn active_adapters(&mut self) -> Vec<&mut PlotAdapter> {
        match self.view {
            ViewMode::ThreeD => vec![&mut self.adapter_3d],
            ViewMode::TwoD => vec![&mut self.adapter_corner, &mut self.adapter_accel],
        }
    }

    /// Install a trace into the row and render the active view.
    pub fn set_trace(&mut self, row_trace: RowTrace, relay: &mut ViewSyncRelay) {
        self.loaded = Some(row_trace);
        self.trim = TrimUi::default();
        self.reset_adapters();
        self.render_active(relay);
    }

    fn reset_adapters(&mut self) {
        let Some(series) = self.series() else { return };
        let (fps, title) = {
            let t = self.loaded.as_ref().unwrap();
            (t.trace.fps, t.trace.title.clone())
        };
        self.adapter_3d.set_data(series.clone(), fps, title.clone());
        self.adapter_corner.set_data(series.clone(), fps, title.clone());
        self.adapter_accel.set_data(series, fps, title);
    }

    /// Render the active view's adapters and point the relay at the
    /// surfaces that are now live.
    pub fn render_active(&mut self, relay: &mut ViewSyncRelay) {
        if !self.has_data() {
            return;
        }
        match self.view {
            ViewMode::ThreeD => {
                self.adapter_corner.clear();
                self.adapter_accel.clear();
                self.adapter_3d.render();
                relay.register_row(self.id, self.scene.clone(), self.strip_bottom.clone());
            }
            ViewMode::TwoD => {
                self.adapter_3d.clear();
                self.adapter_corner.render();
                self.adapter_accel.render();
                relay.register_row(self.id, self.strip_top.clone(), self.strip_bottom.clone());
            }
        }
    }

    pub fn switch_view(&mut self, view: ViewMode, relay: &mut ViewSyncRelay) {
        if self.view == view {
            return;
        }
        self.view = view;
        self.render_active(relay);
        // the new surfaces start from the full series again
        if let Some(i) = self.trim.selected_region {
            self.apply_saved_region(i);
        }
    }

    /// Re-slice the active adapters to a saved trim region.
    pub fn apply_saved_region(&mut self, index: usize) {
        let Some(region) = self
            .loaded
            .as_ref()
            .and_then(|t| t.trace.trim.get(index))
            .cloned()
        else {
            log::warn!("row {}: no trim region {index}", self.id);
            return;
        };
        // start from the full series so re-selecting regions composes
        self.reset_adapters();
        for adapter in self.active_adapters() {
            adapter.apply_region(&region);
        }
        self.trim.selected_region = Some(index);
    }

    /// Back to the full, untrimmed series.
    pub fn show_full_series(&mut self, relay: &mut ViewSyncRelay) {
        self.trim.selected_region = None;
        self.reset_adapters();
        self.render_active(relay);
    }

    /// Commit the drawn trim bounds on the active adapters; returns the
    /// region reported by the first of them.
    pub fn commit_trim(&mut self, label: &str) -> Option<TrimRegion> {
        let mut committed = None;
        for adapter in self.active_adapters() {
            let region = adapter.commit_trim(label);
            if committed.is_none() {
                committed = region;
            }
        }
        if let (Some(region), Some(loaded)) = (&committed, self.loaded.as_mut()) {
            loaded.trace.trim.push(region.clone());
            self.trim.selected_region = Some(loaded.trace.trim.len() - 1);
        }
        committed
    }

    /// Tear the row back down to its empty state.
    pub fn clear(&mut self, relay: &mut ViewSyncRelay) {
        self.loaded = None;
        self.processing = false;
        self.trim = TrimUi::default();
        self.adapter_3d.clear();
        self.adapter_corner.clear();
        self.adapter_accel.clear();
        self.view = ViewMode::ThreeD;
        self.camera_label = "Camera angles".to_string();
        relay.unregister_row(self.id);
    }
}
