//! ApexTrace crate root: re-exports and module wiring.
//!
//! A desktop app for importing, visualizing, trimming and comparing
//! G-force traces extracted from dashcam video. The modules:
//! - `data`: trace samples, trim regions, plot-ready series
//! - `player`: the video player boundary and its lifecycle events
//! - `sync`: the playback synchronization state machine
//! - `relay`: cross-row camera/axis view synchronization
//! - `plot`: plot adapters and the rendering capability surfaces
//! - `storage`: trace bundle CRUD on disk
//! - `processing`: the external trace-extraction pipeline
//! - `app`: egui application shell

pub mod app;
pub mod config;
pub mod data;
pub mod notify;
pub mod player;
pub mod plot;
pub mod processing;
pub mod relay;
pub mod storage;
pub mod sync;

// Public re-exports for a compact external API
pub use config::{AppConfig, SyncContext};
pub use data::series::{normalize, GraphDataSeries};
pub use data::trace::{FrameSample, Trace, TrimRange, TrimRegion};
pub use player::{ClockPlayer, PlayerEvent, PlayerId, PlayerRegistry, VideoPlayer};
pub use plot::adapter::{PlotAdapter, PlotKind, StripAxis};
pub use plot::camera::{CameraPreset, CameraState};
pub use plot::surface::{PlotFigure, PlotSeries, PlotSurface, SurfaceEvent, ViewMode, ViewParam};
pub use relay::ViewSyncRelay;
pub use sync::{PlaybackSynchronizer, SyncMode};
