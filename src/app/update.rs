//! Per-frame work for [`ApexApp`]: processing outcomes, player ticks,
//! lifecycle dispatch, the debounced click-seek, and the marker loop.

use std::time::Duration;

use crate::app::row::RowTrace;
use crate::app::{ApexApp, PendingSeek};
use crate::data::trace::Trace;
use crate::player::{PlayerId, VideoPlayer};
use crate::plot::surface::{SurfaceEvent, SurfaceHandle, ViewMode, ViewParam};

/// How long a graph click may be superseded by another before it fires.
const CLICK_DEBOUNCE: Duration = Duration::from_millis(100);

impl ApexApp {
    pub(crate) fn process_frame(&mut self) {
        self.drain_processing();

        // lifecycle events feed the synchronizer in arrival order
        let events = self.players.tick_all();
        for (id, event) in events {
            self.sync.handle_event(id, event, &mut self.players);
        }

        self.fire_due_seek();
        self.sync.tick(&mut self.players);
        self.update_markers();
    }

    fn drain_processing(&mut self) {
        let outcomes: Vec<_> = self.processing_rx.try_iter().collect();
        for outcome in outcomes {
            let Some(row) = self.rows.iter_mut().find(|r| r.id == outcome.row) else {
                log::warn!("processing finished for removed row {}", outcome.row);
                continue;
            };
            row.processing = false;
            match outcome.result {
                Ok(processed) => {
                    let trace = Trace {
                        title: None,
                        fps: processed.fps,
                        frames: processed.frames,
                        trim: Vec::new(),
                    };
                    let duration = trace.duration();
                    let player = row.player;
                    row.set_trace(
                        RowTrace {
                            trace,
                            video_path: Some(outcome.video_path),
                            json_path: Some(processed.json_path),
                            trace_id: None,
                        },
                        &mut self.relay,
                    );
                    if let Some(p) = self.players.get_mut(player) {
                        p.open(duration);
                    }
                    self.refresh_overlays();
                }
                Err(err) => {
                    log::error!("processing failed: {err:#}");
                    self.notify.error("There was a problem processing the video");
                }
            }
        }
    }

    /// Apply the debounced graph click once its window has passed.
    fn fire_due_seek(&mut self) {
        let due = self
            .pending_seek
            .take_if(|p| p.at.elapsed() >= CLICK_DEBOUNCE);
        if let Some(PendingSeek { player, time, .. }) = due {
            self.sync.request_seek(player, time, &mut self.players);
        }
    }

    /// Pull-based marker loop: each row reads its own player's clock and
    /// moves only its own plots' markers. Independent of any session.
    fn update_markers(&mut self) {
        for row in &mut self.rows {
            if !row.has_data() {
                continue;
            }
            let Some(time) = self.players.get(row.player).map(|p| p.current_time()) else {
                continue;
            };
            for adapter in row.active_adapters() {
                adapter.update_marker(time);
            }
        }
    }

    /// Route interactions the plot surfaces reported during drawing.
    pub(crate) fn drain_surface_events(&mut self) {
        struct Click {
            player: PlayerId,
            time: f64,
        }
        let mut clicks = Vec::new();
        let mut view_changes: Vec<(SurfaceHandle, ViewMode, ViewParam)> = Vec::new();

        for row in &self.rows {
            let scene_events = row.scene.borrow_mut().take_events();
            for event in scene_events {
                match event {
                    SurfaceEvent::PointClicked { frame } => {
                        if let Some(time) = row.adapter_3d.playback_time_for_frame(frame) {
                            clicks.push(Click { player: row.player, time });
                        }
                    }
                    SurfaceEvent::ViewChanged(param) => {
                        let origin: SurfaceHandle = row.scene.clone();
                        view_changes.push((origin, ViewMode::ThreeD, param));
                    }
                }
            }

            for (surface, is_top) in [(row.strip_top.clone(), true), (row.strip_bottom.clone(), false)] {
                let events = surface.borrow_mut().take_events();
                for event in events {
                    match event {
                        SurfaceEvent::PointClicked { frame } => {
                            let adapter = if is_top { &row.adapter_corner } else { &row.adapter_accel };
                            if let Some(time) = adapter.playback_time_for_frame(frame) {
                                clicks.push(Click { player: row.player, time });
                            }
                        }
                        SurfaceEvent::ViewChanged(param) => {
                            let origin: SurfaceHandle = surface.clone();
                            view_changes.push((origin, ViewMode::TwoD, param));
                        }
                    }
                }
            }
        }

        for (origin, mode, param) in view_changes {
            self.relay.view_changed(&origin, mode, &param);
        }

        // the newest click restarts the debounce window
        if let Some(click) = clicks.into_iter().last() {
            self.pending_seek = Some(PendingSeek {
                player: click.player,
                time: click.time,
                at: std::time::Instant::now(),
            });
        }
    }

    /// Rebuild the overlay traces on every row from the current toggle.
    pub(crate) fn refresh_overlays(&mut self) {
        let shared: Vec<(u64, String, crate::data::series::GraphDataSeries)> = self
            .rows
            .iter()
            .filter_map(|row| {
                row.loaded.as_ref().map(|t| {
                    let name = t
                        .trace
                        .title
                        .clone()
                        .unwrap_or_else(|| format!("Trace {}", row.id));
                    (
                        row.id,
                        name,
                        crate::data::series::GraphDataSeries::from_frames(&t.trace.frames),
                    )
                })
            })
            .collect();

        for row in &mut self.rows {
            if !row.has_data() {
                continue;
            }
            if self.overlay_all {
                let others: Vec<(String, crate::data::series::GraphDataSeries)> = shared
                    .iter()
                    .filter(|(id, _, _)| *id != row.id)
                    .map(|(_, name, series)| (name.clone(), series.clone()))
                    .collect();
                for adapter in row.active_adapters() {
                    adapter.overlay(&others);
                }
            } else {
                for adapter in row.active_adapters() {
                    adapter.remove_overlays();
                }
            }
        }
    }
}
