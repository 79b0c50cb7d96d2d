//! View relay behavior against the real plot surfaces: fan-out rules,
//! origin skipping, and the re-entrancy guard that stops relay echoes.

use std::cell::RefCell;
use std::rc::Rc;

use apextrace::config::shared_sync_context;
use apextrace::plot::scene3d::Scene3dSurface;
use apextrace::plot::strip2d::Strip2dSurface;
use apextrace::plot::surface::{AxisRanges, SurfaceHandle};
use apextrace::{CameraPreset, PlotSurface, ViewMode, ViewParam, ViewSyncRelay};

struct Setup {
    relay: ViewSyncRelay,
    scenes: Vec<Rc<RefCell<Scene3dSurface>>>,
    strips: Vec<(Rc<RefCell<Strip2dSurface>>, Rc<RefCell<Strip2dSurface>>)>,
}

/// Two rows in 3D mode, two more rows in 2D mode.
fn setup() -> Setup {
    let ctx = shared_sync_context();
    ctx.borrow_mut().sync_views = true;
    let mut relay = ViewSyncRelay::new(ctx);

    let mut scenes = Vec::new();
    for row in 0..2u64 {
        let scene = Rc::new(RefCell::new(Scene3dSurface::new()));
        let bottom = Rc::new(RefCell::new(Strip2dSurface::new(format!("b{row}"))));
        let scene_handle: SurfaceHandle = scene.clone();
        let bottom_handle: SurfaceHandle = bottom.clone();
        relay.register_row(row, scene_handle, bottom_handle);
        scenes.push(scene);
    }

    let mut strips = Vec::new();
    for row in 2..4u64 {
        let top = Rc::new(RefCell::new(Strip2dSurface::new(format!("t{row}"))));
        let bottom = Rc::new(RefCell::new(Strip2dSurface::new(format!("b{row}"))));
        let top_handle: SurfaceHandle = top.clone();
        let bottom_handle: SurfaceHandle = bottom.clone();
        relay.register_row(row, top_handle, bottom_handle);
        strips.push((top, bottom));
    }

    Setup { relay, scenes, strips }
}

#[test]
fn camera_change_reaches_other_scenes_and_raises_their_guards() {
    let s = setup();
    let camera = CameraPreset::Iso.camera();
    let origin: SurfaceHandle = s.scenes[0].clone();

    s.relay.view_changed(&origin, ViewMode::ThreeD, &ViewParam::Camera(camera));

    assert!(
        !s.scenes[0].borrow().programmatic_guard(),
        "the origin is skipped entirely"
    );
    assert!(
        s.scenes[1].borrow().programmatic_guard(),
        "the target holds its guard until the relayout is applied"
    );
}

#[test]
fn echo_from_a_guarded_target_fires_no_second_relay() {
    let s = setup();
    let camera = CameraPreset::Front.camera();
    let origin: SurfaceHandle = s.scenes[0].clone();
    s.relay.view_changed(&origin, ViewMode::ThreeD, &ViewParam::Camera(camera));
    assert!(s.scenes[1].borrow().programmatic_guard());

    // the programmatic relayout on scene 1 surfaces as a view change;
    // its guard is still up, so the relay must ignore it
    let echo_origin: SurfaceHandle = s.scenes[1].clone();
    s.relay.view_changed(&echo_origin, ViewMode::ThreeD, &ViewParam::Camera(camera));
    assert!(
        !s.scenes[0].borrow().programmatic_guard(),
        "the echo must not bounce back onto the first scene"
    );
}

#[test]
fn axis_change_updates_the_sibling_strip_and_foreign_rows() {
    let s = setup();
    let ranges = AxisRanges { x: [10.0, 90.0], y: [-1.0, 1.0] };
    let origin: SurfaceHandle = s.strips[0].0.clone();

    s.relay.view_changed(&origin, ViewMode::TwoD, &ViewParam::Axes(ranges));

    assert!(!s.strips[0].0.borrow().programmatic_guard(), "origin untouched");
    assert!(s.strips[0].1.borrow().programmatic_guard(), "sibling strip updated");
    assert!(s.strips[1].0.borrow().programmatic_guard(), "foreign top updated");
    assert!(s.strips[1].1.borrow().programmatic_guard(), "foreign bottom updated");
}

#[test]
fn sync_views_off_is_a_complete_noop() {
    let ctx = shared_sync_context();
    let mut relay = ViewSyncRelay::new(ctx.clone());
    let a = Rc::new(RefCell::new(Scene3dSurface::new()));
    let b = Rc::new(RefCell::new(Scene3dSurface::new()));
    let a_handle: SurfaceHandle = a.clone();
    let b_handle: SurfaceHandle = b.clone();
    relay.register_row(0, a_handle.clone(), b_handle.clone());
    relay.register_row(1, b_handle, a_handle.clone());

    relay.view_changed(
        &a_handle,
        ViewMode::ThreeD,
        &ViewParam::Camera(CameraPreset::Back.camera()),
    );
    assert!(!b.borrow().programmatic_guard(), "toggle off: nothing may change");
}
