//! Trace bundle storage: CRUD over JSON+video bundles on disk.
//!
//! Each stored trace lives in its own uuid-named directory under the
//! traces root as a `trace.json` (the extractor result plus title, video
//! path and trim regions) and, when the user opted to cache it, a copy
//! of the source video. Malformed bundles are skipped with a warning
//! when listing, never a hard failure.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::trace::{FrameSample, Trace, TrimRegion};

const TRACE_FILE: &str = "trace.json";
const VIDEO_FILE: &str = "video.mp4";

/// The extractor's result payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleData {
    #[serde(rename = "numFrames", alias = "num_frames")]
    pub num_frames: usize,
    pub fps: f64,
    pub trace: Vec<FrameSample>,
}

/// On-disk shape of `trace.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBundle {
    pub data: BundleData,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub trim: Vec<TrimRegion>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Request to persist a freshly processed trace.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub title: String,
    /// Copy the video into the bundle so it survives the source moving.
    pub cache_video: bool,
    pub video_path: PathBuf,
    /// Extractor result file to ingest.
    pub json_path: PathBuf,
}

/// One row of the load-trace list.
#[derive(Debug, Clone)]
pub struct TraceSummary {
    pub trace_id: String,
    pub title: String,
    pub trace_path: PathBuf,
    pub video_path: Option<PathBuf>,
    pub video_found: bool,
}

/// Everything a row needs to display a stored trace.
#[derive(Debug, Clone)]
pub struct LoadedTrace {
    pub trace: Trace,
    pub num_frames: usize,
    pub video_path: Option<PathBuf>,
}

/// Mutations supported by [`TraceStore::update`].
#[derive(Debug, Clone)]
pub enum UpdateAction {
    Title(String),
    VideoPath(PathBuf),
    AddTrim(TrimRegion),
    DeleteTrim(usize),
}

pub struct TraceStore {
    traces_dir: PathBuf,
}

impl TraceStore {
    pub fn new(traces_dir: impl Into<PathBuf>) -> Result<Self> {
        let traces_dir = traces_dir.into();
        fs::create_dir_all(&traces_dir)
            .with_context(|| format!("creating traces dir {}", traces_dir.display()))?;
        Ok(Self { traces_dir })
    }

    fn bundle_path(&self, trace_id: &str) -> PathBuf {
        self.traces_dir.join(trace_id).join(TRACE_FILE)
    }

    fn read_bundle(path: &Path) -> Result<TraceBundle> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    fn write_bundle(path: &Path, bundle: &TraceBundle) -> Result<()> {
        let raw = serde_json::to_string(bundle)?;
        fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
    }

    /// Ingest an extractor result file as a new stored trace. Returns
    /// the new trace id and the bundle path.
    pub fn create(&self, request: &CreateRequest) -> Result<(String, PathBuf)> {
        let mut bundle = Self::read_bundle(&request.json_path)?;

        let trace_id = uuid::Uuid::new_v4().to_string();
        let bundle_dir = self.traces_dir.join(&trace_id);
        fs::create_dir_all(&bundle_dir)
            .with_context(|| format!("creating {}", bundle_dir.display()))?;

        if request.cache_video {
            let cached = bundle_dir.join(VIDEO_FILE);
            fs::copy(&request.video_path, &cached).with_context(|| {
                format!("caching video {} into bundle", request.video_path.display())
            })?;
            bundle.video_path = Some(cached);
        } else {
            bundle.video_path = Some(request.video_path.clone());
        }
        bundle.title = Some(request.title.clone());
        bundle.created_at = Some(chrono::Local::now().to_rfc3339());

        let bundle_path = bundle_dir.join(TRACE_FILE);
        Self::write_bundle(&bundle_path, &bundle)?;
        log::debug!("storage: created trace {trace_id} ({})", request.title);
        Ok((trace_id, bundle_path))
    }

    /// Load a stored trace from its bundle path.
    pub fn read(&self, trace_path: &Path) -> Result<LoadedTrace> {
        let bundle = Self::read_bundle(trace_path)?;
        if bundle.data.fps <= 0.0 {
            bail!("trace {} has a non-positive fps", trace_path.display());
        }
        Ok(LoadedTrace {
            num_frames: bundle.data.num_frames,
            video_path: bundle.video_path,
            trace: Trace {
                title: bundle.title,
                fps: bundle.data.fps,
                frames: bundle.data.trace,
                trim: bundle.trim,
            },
        })
    }

    /// Summaries of every stored trace, sorted by title. Bundles that
    /// fail to parse are skipped with a warning.
    pub fn read_all(&self) -> Result<Vec<TraceSummary>> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.traces_dir)
            .with_context(|| format!("listing {}", self.traces_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let trace_id = entry.file_name().to_string_lossy().to_string();
            let trace_path = entry.path().join(TRACE_FILE);
            let bundle = match Self::read_bundle(&trace_path) {
                Ok(b) => b,
                Err(err) => {
                    log::warn!("storage: skipping unreadable bundle {trace_id}: {err:#}");
                    continue;
                }
            };
            let video_found = bundle
                .video_path
                .as_deref()
                .map(Path::exists)
                .unwrap_or(false);
            summaries.push(TraceSummary {
                trace_id,
                title: bundle.title.unwrap_or_else(|| "(untitled)".to_string()),
                trace_path,
                video_path: bundle.video_path,
                video_found,
            });
        }
        summaries.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(summaries)
    }

    pub fn update(&self, trace_id: &str, action: UpdateAction) -> Result<()> {
        Self::update_file(&self.bundle_path(trace_id), action)
    }

    /// Apply an update to a bundle file directly. Used for traces that
    /// only exist as an extractor result so far: edits made before the
    /// first save ride along when the result file is ingested.
    pub fn update_file(path: &Path, action: UpdateAction) -> Result<()> {
        let mut bundle = Self::read_bundle(path)?;
        match action {
            UpdateAction::Title(title) => bundle.title = Some(title),
            UpdateAction::VideoPath(video_path) => bundle.video_path = Some(video_path),
            UpdateAction::AddTrim(region) => bundle.trim.push(region),
            UpdateAction::DeleteTrim(index) => {
                if index < bundle.trim.len() {
                    bundle.trim.remove(index);
                } else {
                    log::warn!(
                        "storage: no trim region {index} in {}",
                        path.display()
                    );
                }
            }
        }
        Self::write_bundle(path, &bundle)
    }

    pub fn delete(&self, trace_id: &str) -> Result<()> {
        let dir = self.traces_dir.join(trace_id);
        fs::remove_dir_all(&dir).with_context(|| format!("deleting {}", dir.display()))?;
        log::debug!("storage: deleted trace {trace_id}");
        Ok(())
    }
}
