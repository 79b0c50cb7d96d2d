//! Multi-video playback synchronization.
//!
//! Commanding several video decoders to pause or seek at the same
//! instant is empirically unreliable on at least one target platform:
//! concurrent seeks trip spurious decoder faults. The synchronizer
//! therefore serializes every cross-row state change. When a user action
//! on one player has to be mirrored onto the others, it queues the other
//! participants and drives them through the required state one at a
//! time, using each player's own lifecycle notification as the
//! continuation point for the next.
//!
//! The waiting is not blocking: the machine simply stays in
//! [`AwaitingConfirm`](SyncState) until [`handle_event`] delivers the
//! next notification. At most one session exists at a time; triggers
//! arriving mid-session are rejected. Participants are serviced in
//! strict enqueue (row) order, and a participant that disappears
//! mid-session is skipped at dequeue time rather than faulting the
//! session.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::SharedSyncContext;
use crate::player::{PlayerEvent, PlayerId, PlayerRegistry, VideoPlayer};

/// Why a participant is holding for a lifecycle notification.
///
/// Typed per-participant state in place of ad-hoc flags on UI widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingReason {
    #[default]
    None,
    /// Part of a pause-all fan-out.
    PauseAll,
    /// Being reset to the timeline start.
    Stopping,
    /// Click-seek on a playing video: seek deferred until the pause
    /// confirmation arrives.
    ClickPause,
    /// Click-seek on an already-paused video.
    ClickAlreadyPaused,
}

/// What the active session is mirroring across participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    PauseAll,
    PlayAll,
    StopAll,
    ClickPause,
    ClickAlreadyPaused,
}

#[derive(Debug, Clone, Copy, Default)]
struct ParticipantState {
    pending: PendingReason,
    /// Seek target stashed until the right lifecycle event arrives; also
    /// the restore point for out-of-session error recovery.
    resume_time: Option<f64>,
    last_known_time: f64,
}

/// One in-flight fan-out. Created by a trigger action, consumed one
/// participant per lifecycle notification, destroyed when the queue
/// empties.
#[derive(Debug)]
pub struct SyncSession {
    mode: SyncMode,
    trigger: PlayerId,
    target_time: f64,
    resume_after: bool,
    pending: VecDeque<PlayerId>,
    /// Participant whose lifecycle notification advances the queue next.
    awaiting: Option<PlayerId>,
    /// ClickPause only: the trigger's own deferred seek has been issued.
    trigger_seek_issued: bool,
    last_progress: Instant,
}

enum SyncState {
    Idle,
    AwaitingConfirm(SyncSession),
}

/// Serializes play/pause/stop/seek across all registered participants.
pub struct PlaybackSynchronizer {
    ctx: SharedSyncContext,
    /// Participants in row order; this order is the enqueue order.
    participants: Vec<(PlayerId, ParticipantState)>,
    state: SyncState,
    watchdog: Duration,
}

impl PlaybackSynchronizer {
    pub fn new(ctx: SharedSyncContext, watchdog: Duration) -> Self {
        Self {
            ctx,
            participants: Vec::new(),
            state: SyncState::Idle,
            watchdog,
        }
    }

    pub fn add_participant(&mut self, id: PlayerId) {
        if !self.participants.iter().any(|(pid, _)| *pid == id) {
            self.participants.push((id, ParticipantState::default()));
        }
    }

    /// Drop a participant. If a session is currently waiting on it, the
    /// queue advances immediately; if it is merely enqueued, the
    /// existence check at dequeue time skips it.
    pub fn remove_participant(&mut self, id: PlayerId, registry: &mut dyn PlayerRegistry) {
        self.participants.retain(|(pid, _)| *pid != id);
        if let SyncState::AwaitingConfirm(session) = &mut self.state {
            if session.awaiting == Some(id) {
                log::debug!("sync: awaited participant {id:?} removed, advancing");
                session.awaiting = None;
                self.advance(registry);
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SyncState::Idle)
    }

    /// Mode of the active session, if any.
    pub fn session_mode(&self) -> Option<SyncMode> {
        match &self.state {
            SyncState::Idle => None,
            SyncState::AwaitingConfirm(s) => Some(s.mode),
        }
    }

    fn fan_out(&self) -> bool {
        self.ctx.borrow().sync_playback && self.participants.len() > 1
    }

    fn state_of(&mut self, id: PlayerId) -> Option<&mut ParticipantState> {
        self.participants
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, st)| st)
    }

    fn others_of(&self, trigger: PlayerId) -> VecDeque<PlayerId> {
        self.participants
            .iter()
            .map(|(pid, _)| *pid)
            .filter(|pid| *pid != trigger)
            .collect()
    }

    fn set_all_pending(&mut self, reason: PendingReason) {
        for (_, st) in &mut self.participants {
            st.pending = reason;
        }
    }

    fn clear_all_pending(&mut self) {
        for (_, st) in &mut self.participants {
            st.pending = PendingReason::None;
            st.resume_time = None;
        }
    }

    fn note_time(&mut self, id: PlayerId, registry: &mut dyn PlayerRegistry) {
        let time = registry.player_mut(id).map(|p| p.current_time());
        if let (Some(t), Some(st)) = (time, self.state_of(id)) {
            st.last_known_time = t;
        }
    }

    // ── Trigger actions ──────────────────────────────────────────────────

    /// User paused participant `trigger`. Returns `false` when rejected
    /// because a session is already in flight.
    pub fn request_pause(&mut self, trigger: PlayerId, registry: &mut dyn PlayerRegistry) -> bool {
        if !self.is_idle() {
            log::debug!("sync: pause on {trigger:?} rejected, session active");
            return false;
        }
        self.note_time(trigger, registry);

        if !self.fan_out() {
            if let Some(p) = registry.player_mut(trigger) {
                p.pause();
            }
            return true;
        }

        self.set_all_pending(PendingReason::PauseAll);
        self.state = SyncState::AwaitingConfirm(SyncSession {
            mode: SyncMode::PauseAll,
            trigger,
            target_time: 0.0,
            resume_after: false,
            pending: self.others_of(trigger),
            awaiting: Some(trigger),
            trigger_seek_issued: false,
            last_progress: Instant::now(),
        });

        let was_playing = match registry.player_mut(trigger) {
            Some(p) => {
                let playing = p.is_playing();
                p.pause();
                playing
            }
            None => false,
        };
        if !was_playing {
            // no pause notification will come from an already-paused
            // trigger; start servicing the queue directly
            self.advance(registry);
        }
        true
    }

    /// User pressed play on participant `trigger`.
    ///
    /// An ended element implicitly seeks back to the start when told to
    /// play; letting N of them do that concurrently is the exact fault
    /// pattern this module exists to avoid, so the end-of-stream case is
    /// serialized. A plain mid-stream play is commanded on everyone
    /// directly.
    pub fn request_play(&mut self, trigger: PlayerId, registry: &mut dyn PlayerRegistry) -> bool {
        if !self.is_idle() {
            log::debug!("sync: play on {trigger:?} rejected, session active");
            return false;
        }

        let at_end = registry
            .player_mut(trigger)
            .map(|p| p.at_end())
            .unwrap_or(false);

        if !self.fan_out() {
            if let Some(p) = registry.player_mut(trigger) {
                p.play();
            }
            return true;
        }

        if at_end {
            self.state = SyncState::AwaitingConfirm(SyncSession {
                mode: SyncMode::PlayAll,
                trigger,
                target_time: 0.0,
                resume_after: true,
                pending: self.others_of(trigger),
                awaiting: Some(trigger),
                trigger_seek_issued: false,
                last_progress: Instant::now(),
            });
            if let Some(p) = registry.player_mut(trigger) {
                p.seek(0.0);
            }
        } else {
            for id in self.participants.iter().map(|(pid, _)| *pid).collect::<Vec<_>>() {
                if let Some(p) = registry.player_mut(id) {
                    p.play();
                }
            }
        }
        true
    }

    /// User pressed stop on `trigger`. `timeline_start` is the trim
    /// region start when one is active and selected, else `0.0`.
    pub fn request_stop(
        &mut self,
        trigger: PlayerId,
        timeline_start: f64,
        registry: &mut dyn PlayerRegistry,
    ) -> bool {
        if !self.is_idle() {
            log::debug!("sync: stop on {trigger:?} rejected, session active");
            return false;
        }

        let fan = self.fan_out();
        if fan {
            self.set_all_pending(PendingReason::Stopping);
            for (_, st) in &mut self.participants {
                st.resume_time = Some(timeline_start);
            }
        } else if let Some(st) = self.state_of(trigger) {
            st.pending = PendingReason::Stopping;
            st.resume_time = Some(timeline_start);
        }

        if fan {
            self.state = SyncState::AwaitingConfirm(SyncSession {
                mode: SyncMode::StopAll,
                trigger,
                target_time: timeline_start,
                resume_after: false,
                pending: self.others_of(trigger),
                awaiting: Some(trigger),
                trigger_seek_issued: false,
                last_progress: Instant::now(),
            });
        }

        if let Some(p) = registry.player_mut(trigger) {
            if p.is_playing() {
                p.pause();
            }
            p.seek(timeline_start);
        }
        true
    }

    /// A plotted point owned by `trigger` was clicked; `time` is the
    /// playback time it maps to. The caller debounces repeat clicks.
    pub fn request_seek(
        &mut self,
        trigger: PlayerId,
        time: f64,
        registry: &mut dyn PlayerRegistry,
    ) -> bool {
        if !self.is_idle() {
            log::debug!("sync: seek on {trigger:?} rejected, session active");
            return false;
        }

        let fan = self.fan_out();
        let playing = match registry.player_mut(trigger) {
            Some(p) => p.is_playing(),
            None => return false,
        };

        if playing {
            // pause first; the seek happens once the pause confirmation
            // arrives, never racing the decoder
            if fan {
                self.set_all_pending(PendingReason::ClickPause);
            }
            if let Some(st) = self.state_of(trigger) {
                st.pending = PendingReason::ClickPause;
                st.resume_time = Some(time);
            }
            if fan {
                self.state = SyncState::AwaitingConfirm(SyncSession {
                    mode: SyncMode::ClickPause,
                    trigger,
                    target_time: time,
                    resume_after: true,
                    pending: self.others_of(trigger),
                    awaiting: Some(trigger),
                    trigger_seek_issued: false,
                    last_progress: Instant::now(),
                });
            }
            if let Some(p) = registry.player_mut(trigger) {
                p.pause();
            }
        } else {
            if let Some(st) = self.state_of(trigger) {
                st.pending = PendingReason::ClickAlreadyPaused;
            }
            if fan {
                self.set_all_pending(PendingReason::ClickAlreadyPaused);
                self.state = SyncState::AwaitingConfirm(SyncSession {
                    mode: SyncMode::ClickAlreadyPaused,
                    trigger,
                    target_time: time,
                    resume_after: false,
                    pending: self.others_of(trigger),
                    awaiting: Some(trigger),
                    trigger_seek_issued: false,
                    last_progress: Instant::now(),
                });
            }
            if let Some(p) = registry.player_mut(trigger) {
                p.seek(time);
            }
        }
        true
    }

    // ── Lifecycle event dispatch ─────────────────────────────────────────

    /// Feed one participant lifecycle notification into the machine.
    pub fn handle_event(
        &mut self,
        id: PlayerId,
        event: PlayerEvent,
        registry: &mut dyn PlayerRegistry,
    ) {
        match event {
            PlayerEvent::Paused => {
                self.note_time(id, registry);
                self.on_paused(id, registry);
            }
            PlayerEvent::ReadyToPlay => {
                self.note_time(id, registry);
                self.on_ready(id, registry);
            }
            PlayerEvent::Ended => {
                if let Some(st) = self.state_of(id) {
                    st.pending = PendingReason::None;
                    st.resume_time = None;
                }
            }
            PlayerEvent::Errored => self.on_error(id, registry),
            PlayerEvent::Seeking | PlayerEvent::Playing => {
                log::debug!("sync: {id:?} {event:?}");
            }
        }
    }

    fn on_paused(&mut self, id: PlayerId, registry: &mut dyn PlayerRegistry) {
        enum Action {
            Advance,
            SeekTrigger(f64),
            None,
        }

        let action = match &mut self.state {
            SyncState::AwaitingConfirm(s) if s.awaiting == Some(id) => match s.mode {
                SyncMode::PauseAll => Action::Advance,
                SyncMode::ClickPause if id == s.trigger && !s.trigger_seek_issued => {
                    s.trigger_seek_issued = true;
                    s.last_progress = Instant::now();
                    Action::SeekTrigger(s.target_time)
                }
                _ => Action::None,
            },
            _ => Action::None,
        };

        match action {
            Action::Advance => self.advance(registry),
            Action::SeekTrigger(t) => {
                if let Some(st) = self.state_of(id) {
                    st.resume_time = None;
                }
                if let Some(p) = registry.player_mut(id) {
                    p.seek(t);
                }
            }
            Action::None => {
                // sync disabled: a click-seek on a playing video applies
                // its stashed target once the pause lands
                if self.is_idle() {
                    let stashed = self.state_of(id).and_then(|st| {
                        (st.pending == PendingReason::ClickPause)
                            .then_some(st.resume_time)
                            .flatten()
                    });
                    if let Some(t) = stashed {
                        if let Some(st) = self.state_of(id) {
                            st.resume_time = None;
                        }
                        if let Some(p) = registry.player_mut(id) {
                            p.seek(t);
                        }
                    }
                }
            }
        }
    }

    fn on_ready(&mut self, id: PlayerId, registry: &mut dyn PlayerRegistry) {
        let advance = match &self.state {
            SyncState::AwaitingConfirm(s) if s.awaiting == Some(id) => match s.mode {
                SyncMode::PlayAll | SyncMode::StopAll | SyncMode::ClickAlreadyPaused => true,
                SyncMode::ClickPause => s.trigger_seek_issued || id != s.trigger,
                // a pause never produces ReadyToPlay; this is a reload
                // confirmation after a fault, which also means "paused"
                SyncMode::PauseAll => true,
            },
            _ => false,
        };

        if advance {
            self.advance(registry);
            return;
        }

        if self.is_idle() {
            let pending = self.state_of(id).map(|st| st.pending);
            match pending {
                Some(PendingReason::ClickPause) => {
                    // sync off: resume the video the user click-seeked
                    if let Some(st) = self.state_of(id) {
                        st.pending = PendingReason::None;
                    }
                    if let Some(p) = registry.player_mut(id) {
                        p.play();
                    }
                }
                Some(PendingReason::ClickAlreadyPaused) | Some(PendingReason::Stopping) => {
                    if let Some(st) = self.state_of(id) {
                        st.pending = PendingReason::None;
                        st.resume_time = None;
                    }
                }
                _ => {}
            }
        }
    }

    fn on_error(&mut self, id: PlayerId, registry: &mut dyn PlayerRegistry) {
        let Some(p) = registry.player_mut(id) else {
            return;
        };
        p.reload();

        match &mut self.state {
            SyncState::AwaitingConfirm(session) => {
                // never drop a faulted participant: it rejoins at the tail
                // so the session still converges
                log::warn!("sync: {id:?} decoder fault mid-session, reloaded and re-enqueued");
                session.pending.push_back(id);
                if session.awaiting == Some(id) {
                    session.last_progress = Instant::now();
                }
            }
            SyncState::Idle => {
                let restore = self
                    .state_of(id)
                    .map(|st| st.resume_time.unwrap_or(st.last_known_time))
                    .unwrap_or(0.0);
                log::warn!("sync: {id:?} decoder fault, reloaded, restoring t={restore:.2}");
                if let Some(p) = registry.player_mut(id) {
                    p.seek(restore);
                }
            }
        }
    }

    // ── Queue advancement ────────────────────────────────────────────────

    /// Service the next queued participant, skipping ones that no longer
    /// exist, and finish the session when the queue is empty.
    fn advance(&mut self, registry: &mut dyn PlayerRegistry) {
        let SyncState::AwaitingConfirm(mut session) =
            std::mem::replace(&mut self.state, SyncState::Idle)
        else {
            return;
        };

        loop {
            let Some(next) = session.pending.pop_front() else {
                self.finish_session(session, registry);
                return;
            };
            let Some(player) = registry.player_mut(next) else {
                log::debug!("sync: {next:?} no longer exists, skipping");
                continue;
            };
            match session.mode {
                SyncMode::PauseAll => {
                    if !player.is_playing() {
                        // an already-paused element never emits a pause
                        // notification; waiting on it would stall
                        continue;
                    }
                    player.pause();
                }
                SyncMode::PlayAll | SyncMode::StopAll | SyncMode::ClickPause => {
                    player.pause();
                    player.seek(session.target_time);
                }
                SyncMode::ClickAlreadyPaused => {
                    player.seek(session.target_time);
                }
            }
            session.awaiting = Some(next);
            session.last_progress = Instant::now();
            self.state = SyncState::AwaitingConfirm(session);
            return;
        }
    }

    fn finish_session(&mut self, session: SyncSession, registry: &mut dyn PlayerRegistry) {
        log::debug!("sync: session {:?} drained", session.mode);
        let resume = match session.mode {
            SyncMode::PlayAll => true,
            SyncMode::ClickPause => session.resume_after,
            _ => false,
        };
        if resume {
            for id in self.participants.iter().map(|(pid, _)| *pid).collect::<Vec<_>>() {
                if let Some(p) = registry.player_mut(id) {
                    p.play();
                }
            }
        }
        self.clear_all_pending();
        self.state = SyncState::Idle;
    }

    /// Watchdog: call once per UI frame. A session stuck waiting on a
    /// notification that never arrives skips that participant instead of
    /// stalling forever.
    pub fn tick(&mut self, registry: &mut dyn PlayerRegistry) {
        let expired = match &self.state {
            SyncState::AwaitingConfirm(s) => s.last_progress.elapsed() >= self.watchdog,
            SyncState::Idle => false,
        };
        if expired {
            if let SyncState::AwaitingConfirm(s) = &self.state {
                log::warn!(
                    "sync: watchdog expired waiting on {:?} in {:?} session, skipping",
                    s.awaiting,
                    s.mode
                );
            }
            self.advance(registry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::shared_sync_context;
    use crate::player::VideoPlayer;

    /// Minimal scripted player: records commands, emits nothing on its
    /// own — tests deliver lifecycle events by hand.
    struct ScriptedPlayer {
        playing: bool,
        time: f64,
        ended: bool,
        commands: Vec<&'static str>,
    }

    impl ScriptedPlayer {
        fn new() -> Self {
            Self {
                playing: false,
                time: 0.0,
                ended: false,
                commands: Vec::new(),
            }
        }
    }

    impl VideoPlayer for ScriptedPlayer {
        fn play(&mut self) {
            self.playing = true;
            self.commands.push("play");
        }
        fn pause(&mut self) {
            self.playing = false;
            self.commands.push("pause");
        }
        fn seek(&mut self, time: f64) {
            self.time = time;
            self.commands.push("seek");
        }
        fn reload(&mut self) {
            self.time = 0.0;
            self.playing = false;
            self.commands.push("reload");
        }
        fn current_time(&self) -> f64 {
            self.time
        }
        fn duration(&self) -> f64 {
            100.0
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn at_end(&self) -> bool {
            self.ended
        }
        fn set_muted(&mut self, _muted: bool) {}
        fn is_muted(&self) -> bool {
            false
        }
        fn drain_events(&mut self) -> Vec<PlayerEvent> {
            Vec::new()
        }
    }

    struct Rig {
        players: Vec<(PlayerId, ScriptedPlayer)>,
    }

    impl PlayerRegistry for Rig {
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

    fn rig(n: u64, playing: bool) -> (PlaybackSynchronizer, Rig) {
        let ctx = shared_sync_context();
        ctx.borrow_mut().sync_playback = true;
        let mut sync = PlaybackSynchronizer::new(ctx, Duration::from_secs(2));
        let mut players = Vec::new();
        for i in 0..n {
            let id = PlayerId(i);
            sync.add_participant(id);
            let mut p = ScriptedPlayer::new();
            p.playing = playing;
            players.push((id, p));
        }
        (sync, Rig { players })
    }

    fn commands(rig: &Rig, id: PlayerId) -> Vec<&'static str> {
        rig.players
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p.commands.clone())
            .unwrap()
    }

    #[test]
    fn second_trigger_is_rejected_while_awaiting() {
        let (mut sync, mut rig) = rig(3, true);
        assert!(sync.request_pause(PlayerId(0), &mut rig));
        assert!(!sync.is_idle());
        assert!(!sync.request_pause(PlayerId(1), &mut rig), "concurrent sessions are disallowed");
        assert!(!sync.request_play(PlayerId(1), &mut rig));
        assert!(!sync.request_stop(PlayerId(1), 0.0, &mut rig));
        assert!(!sync.request_seek(PlayerId(1), 1.0, &mut rig));
    }

    #[test]
    fn pause_without_fanout_touches_only_trigger() {
        let (mut sync, mut rig) = rig(3, true);
        sync.ctx.borrow_mut().sync_playback = false;
        assert!(sync.request_pause(PlayerId(1), &mut rig));
        assert!(sync.is_idle(), "no session without the playback-sync toggle");
        assert_eq!(commands(&rig, PlayerId(1)), vec!["pause"]);
        assert!(commands(&rig, PlayerId(0)).is_empty());
        assert!(commands(&rig, PlayerId(2)).is_empty());
    }

    #[test]
    fn midstream_play_fans_out_without_session() {
        let (mut sync, mut rig) = rig(3, false);
        assert!(sync.request_play(PlayerId(0), &mut rig));
        assert!(sync.is_idle(), "plain play needs no serialization");
        for i in 0..3 {
            assert_eq!(commands(&rig, PlayerId(i)), vec!["play"]);
        }
    }

    #[test]
    fn already_paused_queue_entries_are_skipped_in_pause_all() {
        let (mut sync, mut rig) = rig(3, true);
        rig.players[1].1.playing = false; // row 1 already paused
        sync.request_pause(PlayerId(0), &mut rig);
        sync.handle_event(PlayerId(0), PlayerEvent::Paused, &mut rig);
        // row 1 never emits Paused, so it must not be waited on
        assert!(commands(&rig, PlayerId(1)).is_empty());
        assert_eq!(commands(&rig, PlayerId(2)), vec!["pause"]);
        sync.handle_event(PlayerId(2), PlayerEvent::Paused, &mut rig);
        assert!(sync.is_idle());
    }

    #[test]
    fn watchdog_skips_a_silent_participant() {
        let ctx = shared_sync_context();
        ctx.borrow_mut().sync_playback = true;
        let mut sync = PlaybackSynchronizer::new(ctx, Duration::ZERO);
        let mut players = Vec::new();
        for i in 0..3u64 {
            let id = PlayerId(i);
            sync.add_participant(id);
            let mut p = ScriptedPlayer::new();
            p.playing = true;
            players.push((id, p));
        }
        let mut rig = Rig { players };

        sync.request_pause(PlayerId(0), &mut rig);
        // trigger never confirms; the zero-length watchdog moves on
        sync.tick(&mut rig);
        assert_eq!(commands(&rig, PlayerId(1)), vec!["pause"]);
        sync.tick(&mut rig);
        assert_eq!(commands(&rig, PlayerId(2)), vec!["pause"]);
        sync.tick(&mut rig);
        assert!(sync.is_idle(), "watchdog must drain the session to Idle");
    }

    #[test]
    fn error_outside_session_restores_last_known_time() {
        let (mut sync, mut rig) = rig(1, true);
        rig.players[0].1.time = 7.5;
        sync.handle_event(PlayerId(0), PlayerEvent::Paused, &mut rig); // records t=7.5
        sync.handle_event(PlayerId(0), PlayerEvent::Errored, &mut rig);
        assert_eq!(commands(&rig, PlayerId(0)), vec!["reload", "seek"]);
        assert_eq!(rig.players[0].1.time, 7.5);
    }
}
