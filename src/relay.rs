//! Cross-row view synchronization.
//!
//! When the user orbits one row's 3D camera or zooms one 2D strip, the
//! relay replays the same view parameter onto every other row's relevant
//! plot(s). A programmatic relayout raises the target surface's guard
//! flag; the surface lowers it only after the relayout is applied, and
//! the relay treats a view-change report from a guarded surface as the
//! echo of its own update — without this, two rows mirroring each other
//! would relay forever.

use std::rc::Rc;

use crate::config::SharedSyncContext;
use crate::plot::surface::{PlotSurface, SurfaceHandle, ViewMode, ViewParam};

/// One row's plot pair as the relay sees it: `top` carries the 3D scene
/// or the first 2D strip, `bottom` the second strip.
struct RelayRow {
    row: u64,
    top: SurfaceHandle,
    bottom: SurfaceHandle,
}

/// Fans a view change out to the other rows' plots.
pub struct ViewSyncRelay {
    ctx: SharedSyncContext,
    rows: Vec<RelayRow>,
}

impl ViewSyncRelay {
    pub fn new(ctx: SharedSyncContext) -> Self {
        Self { ctx, rows: Vec::new() }
    }

    pub fn register_row(&mut self, row: u64, top: SurfaceHandle, bottom: SurfaceHandle) {
        self.rows.retain(|r| r.row != row);
        self.rows.push(RelayRow { row, top, bottom });
    }

    pub fn unregister_row(&mut self, row: u64) {
        self.rows.retain(|r| r.row != row);
    }

    /// A surface reported a view change. Replays `param` onto every
    /// other relevant plot, skipping the origin.
    pub fn view_changed(&self, origin: &SurfaceHandle, mode: ViewMode, param: &ViewParam) {
        if !self.ctx.borrow().sync_views {
            return;
        }
        if origin.borrow().programmatic_guard() {
            // the echo of a relayout we issued ourselves
            return;
        }

        for row in &self.rows {
            match mode {
                ViewMode::TwoD => {
                    // within the origin's own row only the *other* strip
                    // needs the update; foreign rows update both strips
                    if Rc::ptr_eq(origin, &row.top) {
                        Self::apply(&row.bottom, param);
                    } else if Rc::ptr_eq(origin, &row.bottom) {
                        Self::apply(&row.top, param);
                    } else {
                        Self::apply(&row.top, param);
                        Self::apply(&row.bottom, param);
                    }
                }
                ViewMode::ThreeD => {
                    // one 3D scene per row, on the top surface
                    if Rc::ptr_eq(origin, &row.top) {
                        continue;
                    }
                    Self::apply(&row.top, param);
                }
            }
        }
    }

    fn apply(target: &SurfaceHandle, param: &ViewParam) {
        let mut surface = target.borrow_mut();
        if surface.programmatic_guard() {
            // still applying a previous relayout; don't stack another
            return;
        }
        surface.set_programmatic_guard(true);
        match param {
            ViewParam::Camera(camera) => surface.relayout_camera(*camera),
            ViewParam::Axes(ranges) => surface.relayout_axes(*ranges),
        }
        // the guard comes down when the surface confirms the relayout
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::config::shared_sync_context;
    use crate::plot::camera::CameraState;
    use crate::plot::surface::{AxisRanges, PlotFigure, PlotSeries, PlotSurface};

    #[derive(Default)]
    struct GuardedSurface {
        guard: bool,
        camera_relayouts: usize,
        axes_relayouts: usize,
    }

    impl PlotSurface for GuardedSurface {
        fn render(&mut self, _figure: PlotFigure) {}
        fn restyle_marker(&mut self, _point: [f64; 3]) {}
        fn add_overlay(&mut self, _series: PlotSeries) {}
        fn truncate_overlays(&mut self) {}
        fn set_trim_planes(&mut self, _planes: Option<(f64, f64)>) {}
        fn relayout_camera(&mut self, _camera: CameraState) {
            self.camera_relayouts += 1;
        }
        fn relayout_axes(&mut self, _ranges: AxisRanges) {
            self.axes_relayouts += 1;
        }
        fn set_programmatic_guard(&mut self, on: bool) {
            self.guard = on;
        }
        fn programmatic_guard(&self) -> bool {
            self.guard
        }
        fn purge(&mut self) {}
        fn has_figure(&self) -> bool {
            true
        }
    }

    fn handle() -> (SurfaceHandle, Rc<RefCell<GuardedSurface>>) {
        let concrete = Rc::new(RefCell::new(GuardedSurface::default()));
        let dynamic: SurfaceHandle = concrete.clone();
        (dynamic, concrete)
    }

    fn two_row_relay() -> (
        ViewSyncRelay,
        [Rc<RefCell<GuardedSurface>>; 4],
        [SurfaceHandle; 4],
    ) {
        let ctx = shared_sync_context();
        ctx.borrow_mut().sync_views = true;
        let mut relay = ViewSyncRelay::new(ctx);
        let (t1, c1) = handle();
        let (b1, c2) = handle();
        let (t2, c3) = handle();
        let (b2, c4) = handle();
        relay.register_row(1, t1.clone(), b1.clone());
        relay.register_row(2, t2.clone(), b2.clone());
        (relay, [c1, c2, c3, c4], [t1, b1, t2, b2])
    }

    #[test]
    fn disabled_toggle_means_no_fanout() {
        let (relay, concrete, handles) = two_row_relay();
        relay.ctx.borrow_mut().sync_views = false;
        relay.view_changed(&handles[0], ViewMode::ThreeD, &ViewParam::Camera(CameraState::default()));
        assert_eq!(concrete[2].borrow().camera_relayouts, 0);
    }

    #[test]
    fn three_d_change_skips_the_origin_row() {
        let (relay, concrete, handles) = two_row_relay();
        relay.view_changed(&handles[0], ViewMode::ThreeD, &ViewParam::Camera(CameraState::default()));
        assert_eq!(concrete[0].borrow().camera_relayouts, 0, "origin must not be re-applied");
        assert_eq!(concrete[2].borrow().camera_relayouts, 1);
    }

    #[test]
    fn two_d_change_updates_sibling_and_both_foreign_strips() {
        let (relay, concrete, handles) = two_row_relay();
        let ranges = AxisRanges { x: [0.0, 50.0], y: [-1.0, 1.0] };
        relay.view_changed(&handles[0], ViewMode::TwoD, &ViewParam::Axes(ranges));
        assert_eq!(concrete[0].borrow().axes_relayouts, 0);
        assert_eq!(concrete[1].borrow().axes_relayouts, 1, "sibling strip");
        assert_eq!(concrete[2].borrow().axes_relayouts, 1, "foreign top strip");
        assert_eq!(concrete[3].borrow().axes_relayouts, 1, "foreign bottom strip");
    }

    #[test]
    fn guarded_origin_echo_does_not_relay_again() {
        let (relay, concrete, handles) = two_row_relay();
        let camera = ViewParam::Camera(CameraState::default());
        relay.view_changed(&handles[0], ViewMode::ThreeD, &camera);
        assert_eq!(concrete[2].borrow().camera_relayouts, 1);
        assert!(concrete[2].borrow().guard, "target guard stays up until confirmed");

        // the programmatic update surfaces as a view change on the target;
        // its guard is still up, so the relay must fire at most once
        relay.view_changed(&handles[2], ViewMode::ThreeD, &camera);
        assert_eq!(concrete[0].borrow().camera_relayouts, 0, "echo must not bounce back");
        assert_eq!(concrete[2].borrow().camera_relayouts, 1);
    }

    #[test]
    fn unregistered_row_is_left_alone() {
        let (mut relay, concrete, handles) = two_row_relay();
        relay.unregister_row(2);
        relay.view_changed(&handles[0], ViewMode::ThreeD, &ViewParam::Camera(CameraState::default()));
        assert_eq!(concrete[2].borrow().camera_relayouts, 0);
    }
}
