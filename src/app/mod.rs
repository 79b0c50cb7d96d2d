//! Application shell: rows, players, and the main update loop.
//!
//! | Sub-module   | Responsibility |
//! | ------------ | -------------- |
//! | [`row`]      | One (video, plot-pair) comparison row |
//! | [`update`]   | Per-frame work: player ticks, lifecycle dispatch, marker loop |
//! | [`rows_ui`]  | Header bar and row rendering |
//! | [`load_ui`]  | Stored-trace list view (search, rename, delete) |
//! | [`run`]      | eframe entry point |

pub mod load_ui;
pub mod row;
pub mod rows_ui;
pub mod run;
pub mod update;

use std::sync::mpsc::{Receiver, Sender};
use std::time::Instant;

use crate::config::{shared_sync_context, AppConfig, SharedSyncContext};
use crate::notify::Notifications;
use crate::player::{ClockPlayer, PlayerEvent, PlayerId, PlayerRegistry, VideoPlayer};
use crate::processing::ProcessingOutcome;
use crate::relay::ViewSyncRelay;
use crate::storage::{TraceStore, TraceSummary};
use crate::sync::PlaybackSynchronizer;

use row::Row;

pub const MAX_ROWS: usize = 10;

/// The app's player table; the one [`PlayerRegistry`] the synchronizer
/// drives.
#[derive(Default)]
pub struct RowPlayers {
    players: Vec<(PlayerId, ClockPlayer)>,
}

impl RowPlayers {
    pub fn add(&mut self, id: PlayerId) {
        self.players.push((id, ClockPlayer::new(0.0)));
    }

    pub fn remove(&mut self, id: PlayerId) {
        self.players.retain(|(pid, _)| *pid != id);
    }

    pub fn get(&self, id: PlayerId) -> Option<&ClockPlayer> {
        self.players
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut ClockPlayer> {
        self.players
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
    }

    /// Advance every playhead and collect the lifecycle events that fell
    /// out, in per-player order.
    pub fn tick_all(&mut self) -> Vec<(PlayerId, PlayerEvent)> {
        let mut events = Vec::new();
        for (id, player) in &mut self.players {
            player.tick();
            for event in player.drain_events() {
                events.push((*id, event));
            }
        }
        events
    }

    pub fn any_playing(&self) -> bool {
        self.players.iter().any(|(_, p)| p.is_playing())
    }
}

impl PlayerRegistry for RowPlayers {
    fn player_mut(&mut self, id: PlayerId) -> Option<&mut dyn VideoPlayer> {
        self.players
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p as &mut dyn VideoPlayer)
    }

    fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|(pid, _)| *pid).collect()
    }
}

/// Which top-level screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Landing,
    Main,
    LoadList,
}

/// State of the save-trace dialog.
pub struct SaveDialog {
    pub row: u64,
    pub title: String,
    pub cache_video: bool,
}

/// A graph click waiting out the debounce window.
pub struct PendingSeek {
    pub player: PlayerId,
    pub time: f64,
    pub at: Instant,
}

pub struct ApexApp {
    pub(crate) config: AppConfig,
    pub(crate) sync_ctx: SharedSyncContext,
    pub(crate) players: RowPlayers,
    pub(crate) rows: Vec<Row>,
    pub(crate) next_row_id: u64,
    pub(crate) sync: PlaybackSynchronizer,
    pub(crate) relay: ViewSyncRelay,
    pub(crate) store: Option<TraceStore>,
    pub(crate) notify: Notifications,

    pub(crate) view: AppView,
    pub(crate) load_list: Vec<TraceSummary>,
    pub(crate) load_for_row: u64,
    pub(crate) search: String,
    pub(crate) rename_edit: Option<(String, String)>,
    pub(crate) save_dialog: Option<SaveDialog>,
    pub(crate) pending_seek: Option<PendingSeek>,
    pub(crate) overlay_all: bool,

    pub(crate) processing_tx: Sender<ProcessingOutcome>,
    pub(crate) processing_rx: Receiver<ProcessingOutcome>,
}

impl ApexApp {
    pub fn new(config: AppConfig) -> Self {
        let sync_ctx = shared_sync_context();
        let (processing_tx, processing_rx) = std::sync::mpsc::channel();
        let store = match TraceStore::new(config.traces_dir()) {
            Ok(store) => Some(store),
            Err(err) => {
                log::error!("app: trace storage unavailable: {err:#}");
                None
            }
        };
        let mut app = Self {
            sync: PlaybackSynchronizer::new(sync_ctx.clone(), config.sync_watchdog),
            relay: ViewSyncRelay::new(sync_ctx.clone()),
            sync_ctx,
            config,
            players: RowPlayers::default(),
            rows: Vec::new(),
            next_row_id: 1,
            store,
            notify: Notifications::default(),
            view: AppView::Landing,
            load_list: Vec::new(),
            load_for_row: 0,
            search: String::new(),
            rename_edit: None,
            save_dialog: None,
            pending_seek: None,
            overlay_all: false,
            processing_tx,
            processing_rx,
        };
        app.add_row();
        app
    }

    pub fn add_row(&mut self) {
        if self.rows.len() >= MAX_ROWS {
            return;
        }
        let id = self.next_row_id;
        self.next_row_id += 1;
        let player = PlayerId(id);
        self.players.add(player);
        self.sync.add_participant(player);
        self.rows.push(Row::new(id, player));
    }

    /// Remove the bottom row (the first row always stays).
    pub fn remove_last_row(&mut self) {
        if self.rows.len() <= 1 {
            return;
        }
        let Some(row) = self.rows.pop() else { return };
        self.relay.unregister_row(row.id);
        self.sync.remove_participant(row.player, &mut self.players);
        self.players.remove(row.player);
        if self.rows.len() == 1 {
            // sync toggles only make sense with something to sync against
            let mut ctx = self.sync_ctx.borrow_mut();
            ctx.sync_playback = false;
            ctx.sync_views = false;
        }
    }

}

impl eframe::App for ApexApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_frame();

        match self.view {
            AppView::Landing => rows_ui::landing_view(self, ctx),
            AppView::Main => rows_ui::main_view(self, ctx),
            AppView::LoadList => load_ui::load_view(self, ctx),
        }

        self.drain_surface_events();
        self.notify.ui(ctx);

        if self.players.any_playing() || !self.sync.is_idle() {
            // keep the markers and the session watchdog moving
            ctx.request_repaint_after(std::time::Duration::from_millis(33));
        }
    }
}
