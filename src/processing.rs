//! External video-processing pipeline boundary.
//!
//! The extractor is a separate program: given a content file, a template
//! asset and an output directory it computes the per-frame trace, writes
//! it to a result file, and prints that file's path as the sole line on
//! stdout. Anything on stderr is fatal for the invocation. The spawn
//! runs on a worker thread and the parsed outcome comes back to the UI
//! loop over a channel.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc::Sender;

use anyhow::{bail, Context, Result};

use crate::config::AppConfig;
use crate::storage::TraceBundle;

/// Parsed extractor result for one video.
#[derive(Debug, Clone)]
pub struct ProcessedTrace {
    pub fps: f64,
    pub num_frames: usize,
    pub frames: Vec<crate::data::trace::FrameSample>,
    /// The extractor result file, kept for a later save.
    pub json_path: PathBuf,
}

/// Delivered to the UI loop when an extraction finishes.
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub row: u64,
    pub video_path: PathBuf,
    pub result: Result<ProcessedTrace>,
}

/// Parse an extractor result file.
pub fn parse_result_file(path: &Path) -> Result<ProcessedTrace> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading extractor result {}", path.display()))?;
    let bundle: TraceBundle = serde_json::from_str(&raw)
        .with_context(|| format!("parsing extractor result {}", path.display()))?;
    if bundle.data.fps <= 0.0 {
        bail!("extractor reported a non-positive fps");
    }
    if bundle.data.trace.is_empty() {
        bail!("extractor reported an empty trace");
    }
    Ok(ProcessedTrace {
        fps: bundle.data.fps,
        num_frames: bundle.data.num_frames,
        frames: bundle.data.trace,
        json_path: path.to_path_buf(),
    })
}

fn run_extractor(config: &AppConfig, video_path: &Path) -> Result<ProcessedTrace> {
    let output = Command::new(&config.extractor_binary)
        .arg("--data-source")
        .arg("gforce-overlay")
        .arg("--data-file-path")
        .arg(video_path)
        .arg("--template-path")
        .arg(&config.extractor_template)
        .arg("--output-path")
        .arg(config.temp_dir())
        .output()
        .with_context(|| {
            format!("spawning extractor {}", config.extractor_binary.display())
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        bail!("extractor error: {}", stderr.trim());
    }
    if !output.status.success() {
        bail!("extractor exited with {}", output.status);
    }

    // the sole stdout line is the result file path
    let stdout = String::from_utf8_lossy(&output.stdout);
    let result_path = stdout.trim();
    if result_path.is_empty() {
        bail!("extractor produced no result path");
    }
    parse_result_file(Path::new(result_path))
}

/// Run the extractor for `video_path` on a worker thread; the outcome
/// arrives on `tx` tagged with the requesting row.
pub fn spawn_extraction(
    config: &AppConfig,
    video_path: PathBuf,
    row: u64,
    tx: Sender<ProcessingOutcome>,
) {
    let config = config.clone();
    std::thread::spawn(move || {
        if let Err(err) = std::fs::create_dir_all(config.temp_dir()) {
            log::error!("processing: cannot create temp dir: {err}");
        }
        log::debug!(
            "processing: extracting {} for row {row}",
            video_path.display()
        );
        let result = run_extractor(&config, &video_path);
        if let Err(err) = &result {
            log::error!("processing: row {row} failed: {err:#}");
        }
        let _ = tx.send(ProcessingOutcome { row, video_path, result });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_extractor_shaped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(
            &path,
            r#"{"data":{"num_frames":3,"fps":30.0,"trace":[
                {"x":1.0,"y":2.0,"z":0},
                {"x":1.5,"y":2.5,"z":1},
                {"x":2.0,"y":3.0,"z":2}]}}"#,
        )
        .unwrap();

        let parsed = parse_result_file(&path).unwrap();
        assert_eq!(parsed.num_frames, 3);
        assert_eq!(parsed.fps, 30.0);
        assert_eq!(parsed.frames.len(), 3);
        assert_eq!(parsed.json_path, path);
    }

    #[test]
    fn parse_rejects_empty_trace_and_bad_fps() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, r#"{"data":{"num_frames":0,"fps":30.0,"trace":[]}}"#).unwrap();
        assert!(parse_result_file(&empty).is_err());

        let bad_fps = dir.path().join("fps.json");
        std::fs::write(
            &bad_fps,
            r#"{"data":{"num_frames":1,"fps":0.0,"trace":[{"x":0,"y":0,"z":0}]}}"#,
        )
        .unwrap();
        assert!(parse_result_file(&bad_fps).is_err());
    }
}
