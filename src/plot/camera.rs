//! 3D camera state and the named view presets.

use std::str::FromStr;

use once_cell::sync::Lazy;

/// Camera pose forwarded verbatim between 3D plots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub eye: [f64; 3],
    pub center: [f64; 3],
    pub up: [f64; 3],
}

/// Named camera angles offered in the per-row dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPreset {
    Front,
    Back,
    Corner,
    Accel,
    Iso,
}

impl CameraPreset {
    pub const ALL: [CameraPreset; 5] = [
        CameraPreset::Front,
        CameraPreset::Back,
        CameraPreset::Corner,
        CameraPreset::Accel,
        CameraPreset::Iso,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CameraPreset::Front => "Front",
            CameraPreset::Back => "Back",
            CameraPreset::Corner => "Corner",
            CameraPreset::Accel => "Accel",
            CameraPreset::Iso => "Iso",
        }
    }

    pub fn camera(self) -> CameraState {
        PRESET_CAMERAS[self as usize].1
    }
}

impl FromStr for CameraPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CameraPreset::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or(())
    }
}

static PRESET_CAMERAS: Lazy<[(CameraPreset, CameraState); 5]> = Lazy::new(|| {
    let center = [0.0, 0.0, 0.0];
    [
        (
            CameraPreset::Front,
            CameraState { eye: [0.0, 0.0, -5.0], center, up: [0.0, 1.0, 0.0] },
        ),
        (
            CameraPreset::Back,
            CameraState { eye: [0.0, 0.0, 5.0], center, up: [0.0, 1.0, 0.0] },
        ),
        (
            CameraPreset::Corner,
            CameraState { eye: [0.0, 5.0, 0.0], center, up: [1.0, 0.0, 0.0] },
        ),
        (
            CameraPreset::Accel,
            CameraState { eye: [-5.0, 0.0, 0.0], center, up: [0.0, 1.0, 0.0] },
        ),
        (
            CameraPreset::Iso,
            CameraState { eye: [-2.5, 1.5, -5.0], center, up: [0.15, 1.0, 0.2] },
        ),
    ]
});

impl Default for CameraState {
    fn default() -> Self {
        CameraPreset::Front.camera()
    }
}
