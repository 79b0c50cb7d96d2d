//! egui_plot-backed 2D strip surface.
//!
//! Plots one lateral axis against the frame index: primary line in red,
//! the video-frame marker in blue, overlays in muted colors, trim bounds
//! as vertical lines. User pan/zoom surfaces as a
//! [`SurfaceEvent::ViewChanged`] with the new axis ranges; a click snaps
//! to the nearest data point and reports its frame coordinate.

use egui::Color32;
use egui_plot::{Legend, Line, Plot, Points, VLine};

use crate::plot::camera::CameraState;
use crate::plot::surface::{
    AxisRanges, PlotFigure, PlotSeries, PlotSurface, SurfaceEvent, ViewParam,
};

const OVERLAY_COLORS: [Color32; 4] = [
    Color32::from_rgb(120, 160, 255),
    Color32::from_rgb(120, 220, 140),
    Color32::from_rgb(240, 200, 100),
    Color32::from_rgb(200, 130, 220),
];

pub struct Strip2dSurface {
    plot_id: String,
    figure: Option<PlotFigure>,
    marker: Option<[f64; 3]>,
    trim_planes: Option<(f64, f64)>,
    guard: bool,
    /// Ranges handed to us programmatically, applied on the next draw.
    pending_ranges: Option<AxisRanges>,
    last_ranges: Option<AxisRanges>,
    events: Vec<SurfaceEvent>,
}

impl Strip2dSurface {
    pub fn new(plot_id: impl Into<String>) -> Self {
        Self {
            plot_id: plot_id.into(),
            figure: None,
            marker: None,
            trim_planes: None,
            guard: false,
            pending_ranges: None,
            last_ranges: None,
            events: Vec::new(),
        }
    }

    /// Interactions reported since the last drain.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn draw(&mut self, ui: &mut egui::Ui) {
        let Some(figure) = self.figure.clone() else {
            ui.centered_and_justified(|ui| ui.weak("No trace data"));
            return;
        };

        let frame_count = figure.primary.points.len() as f64;
        let pending = self.pending_ranges.take();

        ui.label(egui::RichText::new(&figure.title).strong());

        let plot = Plot::new(self.plot_id.as_str())
            .allow_scroll(false)
            .legend(Legend::default())
            .x_axis_label("Frame")
            .y_axis_label("Force")
            .include_x(0.0)
            .include_x(frame_count)
            .include_y(-1.25)
            .include_y(1.25);

        let marker = self.marker.unwrap_or(figure.marker);
        let trim_planes = self.trim_planes;

        let response = plot.show(ui, |plot_ui| {
            if let Some(ranges) = pending {
                plot_ui.set_plot_bounds_x(ranges.x[0]..=ranges.x[1]);
                plot_ui.set_plot_bounds_y(ranges.y[0]..=ranges.y[1]);
            }

            let line: Vec<[f64; 2]> = figure.primary.points.iter().map(|p| [p[0], p[1]]).collect();
            plot_ui.line(
                Line::new(figure.primary.name.clone(), line)
                    .color(Color32::RED)
                    .width(2.5),
            );

            for (i, overlay) in figure.overlays.iter().enumerate() {
                let pts: Vec<[f64; 2]> = overlay.points.iter().map(|p| [p[0], p[1]]).collect();
                plot_ui.line(
                    Line::new(overlay.name.clone(), pts)
                        .color(OVERLAY_COLORS[i % OVERLAY_COLORS.len()])
                        .width(1.5),
                );
            }

            plot_ui.points(
                Points::new("Video frame", vec![[marker[0], marker[1]]])
                    .color(Color32::BLUE)
                    .radius(5.0),
            );

            if let Some((start, end)) = trim_planes {
                plot_ui.vline(VLine::new("", start).color(Color32::LIGHT_BLUE).width(1.5));
                plot_ui.vline(VLine::new("", end).color(Color32::LIGHT_BLUE).width(1.5));
            }
        });

        if pending.is_some() {
            // the relayout has now been applied; confirm it
            self.guard = false;
        }

        let bounds = response.transform.bounds();
        let rx = bounds.range_x();
        let ry = bounds.range_y();
        let ranges = AxisRanges {
            x: [*rx.start(), *rx.end()],
            y: [*ry.start(), *ry.end()],
        };

        let scroll = response.response.ctx.input(|i| i.raw_scroll_delta);
        let user_moved = response.response.dragged()
            || response.response.drag_stopped_by(egui::PointerButton::Secondary)
            || (response.response.hovered() && (scroll.x != 0.0 || scroll.y != 0.0));
        let changed = self.last_ranges.map_or(false, |prev| prev != ranges);
        if user_moved && changed && !self.guard {
            self.events.push(SurfaceEvent::ViewChanged(ViewParam::Axes(ranges)));
        }
        self.last_ranges = Some(ranges);

        if response.response.clicked() {
            if let Some(screen_pos) = response.response.interact_pointer_pos() {
                let plot_pos = response.transform.value_from_position(screen_pos);
                let mut best: Option<(f64, f64)> = None;
                for p in &figure.primary.points {
                    let dx = p[0] - plot_pos.x;
                    let dy = p[1] - plot_pos.y;
                    let d2 = dx * dx + dy * dy;
                    if best.map_or(true, |(bd, _)| d2 < bd) {
                        best = Some((d2, p[0]));
                    }
                }
                if let Some((_, frame)) = best {
                    self.events.push(SurfaceEvent::PointClicked { frame });
                }
            }
        }
    }
}

impl PlotSurface for Strip2dSurface {
    fn render(&mut self, figure: PlotFigure) {
        self.marker = Some(figure.marker);
        self.figure = Some(figure);
        self.last_ranges = None;
    }

    fn restyle_marker(&mut self, point: [f64; 3]) {
        self.marker = Some(point);
    }

    fn add_overlay(&mut self, series: PlotSeries) {
        if let Some(figure) = &mut self.figure {
            figure.overlays.push(series);
        }
    }

    fn truncate_overlays(&mut self) {
        if let Some(figure) = &mut self.figure {
            figure.overlays.clear();
        }
    }

    fn set_trim_planes(&mut self, planes: Option<(f64, f64)>) {
        self.trim_planes = planes;
    }

    fn relayout_camera(&mut self, _camera: CameraState) {
        // strips have no camera
    }

    fn relayout_axes(&mut self, ranges: AxisRanges) {
        self.pending_ranges = Some(ranges);
    }

    fn set_programmatic_guard(&mut self, on: bool) {
        self.guard = on;
    }

    fn programmatic_guard(&self) -> bool {
        self.guard
    }

    fn purge(&mut self) {
        self.figure = None;
        self.marker = None;
        self.trim_planes = None;
        self.pending_ranges = None;
        self.last_ranges = None;
        self.events.clear();
        self.guard = false;
    }

    fn has_figure(&self) -> bool {
        self.figure.is_some()
    }
}
