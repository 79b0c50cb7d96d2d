pub mod adapter;
pub mod camera;
pub mod scene3d;
pub mod strip2d;
pub mod surface;
