//! Application configuration and the shared synchronization context.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Cross-row synchronization toggles.
///
/// One instance exists per app; the synchronizer and the view relay hold
/// shared handles, rows only ever read it. This replaces what would
/// otherwise be ambient mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncContext {
    /// Mirror play/pause/stop/seek across all rows.
    pub sync_playback: bool,
    /// Mirror camera moves / axis ranges across all rows.
    pub sync_views: bool,
}

pub type SharedSyncContext = Rc<RefCell<SyncContext>>;

pub fn shared_sync_context() -> SharedSyncContext {
    Rc::new(RefCell::new(SyncContext::default()))
}

/// Static application configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory for stored trace bundles and temp output.
    pub data_root: PathBuf,
    /// Path to the trace extraction binary.
    pub extractor_binary: PathBuf,
    /// Template image handed to the extractor.
    pub extractor_template: PathBuf,
    /// How long a sync session may wait on one participant's lifecycle
    /// event before the watchdog skips it.
    pub sync_watchdog: Duration,
}

impl AppConfig {
    /// Resolve the configuration from the environment, falling back to
    /// paths relative to the working directory.
    pub fn from_env() -> Self {
        let data_root = std::env::var_os("APEXTRACE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("apextrace-data"));
        let extractor_binary = std::env::var_os("APEXTRACE_EXTRACTOR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("processing/trace_extractor"));
        let extractor_template = std::env::var_os("APEXTRACE_TEMPLATE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("processing/gforce_template.png"));
        Self {
            data_root,
            extractor_binary,
            extractor_template,
            sync_watchdog: Duration::from_secs(2),
        }
    }

    pub fn traces_dir(&self) -> PathBuf {
        self.data_root.join("traces")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.data_root.join("temp")
    }
}
