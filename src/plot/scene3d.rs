//! Painter-projection 3D scene surface.
//!
//! Projects the trace ribbon through a look-at camera onto the panel and
//! draws it with the egui painter: bounding box, primary polyline in
//! red, frame marker in blue, trim bounds as translucent planes across
//! the lateral extent. Dragging orbits the camera around the scene
//! center and reports the new pose as a view-change event; a click snaps
//! to the nearest projected point and reports its frame coordinate.
//!
//! Scene coordinates: the two lateral axes stay in their normalized
//! `[-1, 1]` range, the frame axis is stretched onto `[-3, 3]` so the
//! ribbon reads as a timeline.

use egui::{Color32, Pos2, Sense, Stroke, Vec2};

use crate::plot::camera::CameraState;
use crate::plot::surface::{
    AxisRanges, PlotFigure, PlotSeries, PlotSurface, SurfaceEvent, ViewParam,
};

const FRAME_AXIS_HALF_SPAN: f64 = 3.0;
const FOCAL: f32 = 2.2;
const CLICK_SNAP_PX: f32 = 14.0;

const OVERLAY_COLORS: [Color32; 4] = [
    Color32::from_rgb(120, 160, 255),
    Color32::from_rgb(120, 220, 140),
    Color32::from_rgb(240, 200, 100),
    Color32::from_rgb(200, 130, 220),
];

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalized(v: [f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    if len < 1e-9 {
        [0.0, 0.0, 1.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

struct Projector {
    eye: [f64; 3],
    right: [f64; 3],
    up: [f64; 3],
    forward: [f64; 3],
    origin: Pos2,
    scale: f32,
}

impl Projector {
    fn new(camera: &CameraState, rect: egui::Rect) -> Self {
        let forward = normalized(sub(camera.center, camera.eye));
        let right = normalized(cross(forward, camera.up));
        let up = cross(right, forward);
        Self {
            eye: camera.eye,
            right,
            up,
            forward,
            origin: rect.center(),
            scale: rect.width().min(rect.height()) * 0.5,
        }
    }

    /// Project a scene point; `None` when it is behind the camera.
    fn project(&self, p: [f64; 3]) -> Option<Pos2> {
        let rel = sub(p, self.eye);
        let depth = dot(rel, self.forward);
        if depth < 0.1 {
            return None;
        }
        let sx = (dot(rel, self.right) / depth) as f32 * FOCAL;
        let sy = (dot(rel, self.up) / depth) as f32 * FOCAL;
        Some(self.origin + Vec2::new(sx * self.scale, -sy * self.scale))
    }
}

pub struct Scene3dSurface {
    figure: Option<PlotFigure>,
    marker: Option<[f64; 3]>,
    camera: CameraState,
    trim_planes: Option<(f64, f64)>,
    guard: bool,
    pending_camera: Option<CameraState>,
    events: Vec<SurfaceEvent>,
}

impl Scene3dSurface {
    pub fn new() -> Self {
        Self {
            figure: None,
            marker: None,
            camera: CameraState::default(),
            trim_planes: None,
            guard: false,
            pending_camera: None,
            events: Vec::new(),
        }
    }

    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn frame_span(&self) -> f64 {
        self.figure
            .as_ref()
            .map(|f| (f.primary.points.len() as f64 - 1.0).max(1.0))
            .unwrap_or(1.0)
    }

    /// Map a data point `[corner, accel, frame]` into scene coordinates.
    fn to_scene(&self, p: [f64; 3]) -> [f64; 3] {
        [
            p[0],
            p[1],
            (p[2] / self.frame_span()) * 2.0 * FRAME_AXIS_HALF_SPAN - FRAME_AXIS_HALF_SPAN,
        ]
    }

    /// Rotate the eye around the scene center from a drag delta.
    fn orbit(&mut self, delta: Vec2) {
        let yaw = (-delta.x * 0.01) as f64;
        let pitch = (delta.y * 0.01) as f64;

        let mut eye = sub(self.camera.eye, self.camera.center);

        // yaw around the world Y axis
        let (sin_y, cos_y) = yaw.sin_cos();
        eye = [
            eye[0] * cos_y + eye[2] * sin_y,
            eye[1],
            -eye[0] * sin_y + eye[2] * cos_y,
        ];

        // pitch around the camera right axis (Rodrigues), clamped off the poles
        let forward = normalized([-eye[0], -eye[1], -eye[2]]);
        let k = normalized(cross(forward, self.camera.up));
        let (sin_p, cos_p) = pitch.sin_cos();
        let k_cross = cross(k, eye);
        let k_dot = dot(k, eye) * (1.0 - cos_p);
        let rotated = [
            eye[0] * cos_p + k_cross[0] * sin_p + k[0] * k_dot,
            eye[1] * cos_p + k_cross[1] * sin_p + k[1] * k_dot,
            eye[2] * cos_p + k_cross[2] * sin_p + k[2] * k_dot,
        ];
        if normalized(rotated)[1].abs() < 0.97 {
            eye = rotated;
        }

        self.camera.eye = [
            self.camera.center[0] + eye[0],
            self.camera.center[1] + eye[1],
            self.camera.center[2] + eye[2],
        ];
        self.camera.up = [0.0, 1.0, 0.0];
    }

    fn draw_bounding_box(&self, painter: &egui::Painter, projector: &Projector) {
        let h = FRAME_AXIS_HALF_SPAN;
        let corners = [
            [-1.0, -1.0, -h],
            [1.0, -1.0, -h],
            [1.0, 1.0, -h],
            [-1.0, 1.0, -h],
            [-1.0, -1.0, h],
            [1.0, -1.0, h],
            [1.0, 1.0, h],
            [-1.0, 1.0, h],
        ];
        let edges = [
            (0, 1), (1, 2), (2, 3), (3, 0),
            (4, 5), (5, 6), (6, 7), (7, 4),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];
        let stroke = Stroke::new(0.5, Color32::from_gray(90));
        for (a, b) in edges {
            if let (Some(pa), Some(pb)) = (projector.project(corners[a]), projector.project(corners[b])) {
                painter.line_segment([pa, pb], stroke);
            }
        }
        if let Some(pos) = projector.project([1.2, 0.0, -h]) {
            painter.text(pos, egui::Align2::CENTER_CENTER, "Corner", egui::FontId::proportional(11.0), Color32::GRAY);
        }
        if let Some(pos) = projector.project([0.0, 1.2, -h]) {
            painter.text(pos, egui::Align2::CENTER_CENTER, "Accel", egui::FontId::proportional(11.0), Color32::GRAY);
        }
        if let Some(pos) = projector.project([0.0, -1.2, h]) {
            painter.text(pos, egui::Align2::CENTER_CENTER, "Frame", egui::FontId::proportional(11.0), Color32::GRAY);
        }
    }

    fn draw_polyline(
        &self,
        painter: &egui::Painter,
        projector: &Projector,
        points: &[[f64; 3]],
        stroke: Stroke,
    ) {
        let mut prev: Option<Pos2> = None;
        for p in points {
            let projected = projector.project(self.to_scene(*p));
            if let (Some(a), Some(b)) = (prev, projected) {
                painter.line_segment([a, b], stroke);
            }
            prev = projected;
        }
    }

    fn draw_trim_plane(&self, painter: &egui::Painter, projector: &Projector, frame: f64) {
        let z = self.to_scene([0.0, 0.0, frame])[2];
        let quad = [
            [-1.0, -1.0, z],
            [1.0, -1.0, z],
            [1.0, 1.0, z],
            [-1.0, 1.0, z],
        ];
        let projected: Vec<Pos2> = quad.iter().filter_map(|p| projector.project(*p)).collect();
        if projected.len() == 4 {
            painter.add(egui::Shape::convex_polygon(
                projected,
                Color32::from_rgba_unmultiplied(120, 180, 255, 40),
                Stroke::new(1.0, Color32::from_rgb(120, 180, 255)),
            ));
        }
    }

    pub fn draw(&mut self, ui: &mut egui::Ui) {
        let Some(figure) = self.figure.clone() else {
            ui.centered_and_justified(|ui| ui.weak("No trace data"));
            return;
        };

        if let Some(camera) = self.pending_camera.take() {
            self.camera = camera;
            // relayout applied; confirm it
            self.guard = false;
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);
        painter.text(
            rect.left_top() + Vec2::new(8.0, 8.0),
            egui::Align2::LEFT_TOP,
            &figure.title,
            egui::FontId::proportional(14.0),
            ui.visuals().strong_text_color(),
        );

        if response.dragged() && response.drag_delta() != Vec2::ZERO {
            self.orbit(response.drag_delta());
            if !self.guard {
                self.events
                    .push(SurfaceEvent::ViewChanged(ViewParam::Camera(self.camera)));
            }
        }

        let projector = Projector::new(&self.camera, rect);
        self.draw_bounding_box(&painter, &projector);

        self.draw_polyline(
            &painter,
            &projector,
            &figure.primary.points,
            Stroke::new(2.0, Color32::RED),
        );
        for (i, overlay) in figure.overlays.iter().enumerate() {
            self.draw_polyline(
                &painter,
                &projector,
                &overlay.points,
                Stroke::new(1.2, OVERLAY_COLORS[i % OVERLAY_COLORS.len()]),
            );
        }

        if let Some((start, end)) = self.trim_planes {
            self.draw_trim_plane(&painter, &projector, start);
            self.draw_trim_plane(&painter, &projector, end);
        }

        let marker = self.marker.unwrap_or(figure.marker);
        if let Some(pos) = projector.project(self.to_scene(marker)) {
            painter.circle_filled(pos, 5.0, Color32::BLUE);
        }

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let mut best: Option<(f32, f64)> = None;
                for p in &figure.primary.points {
                    if let Some(projected) = projector.project(self.to_scene(*p)) {
                        let d = projected.distance(pointer);
                        if best.map_or(true, |(bd, _)| d < bd) {
                            best = Some((d, p[2]));
                        }
                    }
                }
                if let Some((d, frame)) = best {
                    if d <= CLICK_SNAP_PX {
                        self.events.push(SurfaceEvent::PointClicked { frame });
                    }
                }
            }
        }
    }
}

impl Default for Scene3dSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotSurface for Scene3dSurface {
    fn render(&mut self, figure: PlotFigure) {
        self.marker = Some(figure.marker);
        self.figure = Some(figure);
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

    fn relayout_camera(&mut self, camera: CameraState) {
        self.pending_camera = Some(camera);
    }

    fn relayout_axes(&mut self, _ranges: AxisRanges) {
        // the scene has no 2D axis ranges
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
        self.pending_camera = None;
        self.events.clear();
        self.guard = false;
        self.camera = CameraState::default();
    }

    fn has_figure(&self) -> bool {
        self.figure.is_some()
    }
}
