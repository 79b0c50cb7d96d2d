//! Video player abstraction and the clock-driven implementation.
//!
//! The playback synchronizer never talks to a concrete decoder; it
//! drives players through the [`VideoPlayer`] trait and consumes the
//! lifecycle events they emit. The events mirror what a real video
//! element produces — and just like a real element, they arrive in
//! arbitrary relative order across players, which is exactly the
//! situation the synchronizer exists to serialize.
//!
//! The shipped implementation, [`ClockPlayer`], advances a playhead from
//! the wall clock (frame-accurate decoding is out of scope). Seeks and
//! reloads complete asynchronously on the next tick so the lifecycle
//! sequence matches a decoder-backed element: `seek` emits `Seeking`
//! now and `ReadyToPlay` later, never both in the same call.

use std::collections::VecDeque;
use std::time::Instant;

/// Identity of one playback participant (one row's video player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

/// Lifecycle notification emitted by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback was paused (not emitted when already paused).
    Paused,
    /// A seek started.
    Seeking,
    /// The player finished a seek or reload and can resume playback.
    ReadyToPlay,
    /// Playback started.
    Playing,
    /// The playhead reached the end of the stream.
    Ended,
    /// The decoder faulted; the player needs a reload.
    Errored,
}

/// Command/state surface of one video player.
pub trait VideoPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time: f64);
    /// Reload the source in place, keeping the playhead at zero until
    /// the caller restores it. Used for decoder-fault recovery.
    fn reload(&mut self);

    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn at_end(&self) -> bool;

    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;

    /// Take all lifecycle events emitted since the last drain, in order.
    fn drain_events(&mut self) -> Vec<PlayerEvent>;
}

/// Lookup of live players by id.
///
/// The synchronizer observes and drives participants by reference only;
/// a lookup returning `None` means the row was removed, and any queued
/// work for that id is skipped.
pub trait PlayerRegistry {
    fn player_mut(&mut self, id: PlayerId) -> Option<&mut dyn VideoPlayer>;
    /// All live participant ids, in row order.
    fn ids(&self) -> Vec<PlayerId>;
}

/// Wall-clock playhead standing in for a decoder-backed video element.
pub struct ClockPlayer {
    duration: f64,
    playhead: f64,
    playing: bool,
    muted: bool,
    seek_target: Option<f64>,
    reloading: bool,
    last_tick: Option<Instant>,
    ended: bool,
    events: VecDeque<PlayerEvent>,
}

impl ClockPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            playhead: 0.0,
            playing: false,
            muted: false,
            seek_target: None,
            reloading: false,
            last_tick: None,
            ended: false,
            events: VecDeque::new(),
        }
    }

    /// Swap in a new source, resetting all playback state.
    pub fn open(&mut self, duration: f64) {
        *self = Self::new(duration);
    }

    /// Advance the playhead; call once per UI frame.
    ///
    /// Pending seeks and reloads complete here, emitting `ReadyToPlay`
    /// one tick after they were requested.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        let elapsed = self
            .last_tick
            .map(|t| now.saturating_duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        if self.reloading {
            self.reloading = false;
            self.events.push_back(PlayerEvent::ReadyToPlay);
        }

        if let Some(target) = self.seek_target.take() {
            self.playhead = target.clamp(0.0, self.duration);
            if self.ended && self.playhead < self.duration {
                self.ended = false;
            }
            self.events.push_back(PlayerEvent::ReadyToPlay);
        }

        if self.playing {
            self.playhead += elapsed;
            if self.playhead >= self.duration {
                self.playhead = self.duration;
                self.playing = false;
                self.ended = true;
                // a real element fires pause before ended
                self.events.push_back(PlayerEvent::Paused);
                self.events.push_back(PlayerEvent::Ended);
            }
        }
    }

    /// Simulate a decoder fault (the platform bug the synchronizer
    /// recovers from). Test hook; real backends surface their own.
    pub fn inject_decode_fault(&mut self) {
        self.playing = false;
        self.events.push_back(PlayerEvent::Errored);
    }
}

impl VideoPlayer for ClockPlayer {
    fn play(&mut self) {
        if !self.playing {
            if self.ended {
                // a real element implicitly seeks home when played again
                self.playhead = 0.0;
                self.ended = false;
            }
            self.playing = true;
            self.last_tick = Some(Instant::now());
            self.events.push_back(PlayerEvent::Playing);
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.events.push_back(PlayerEvent::Paused);
        }
    }

    fn seek(&mut self, time: f64) {
        self.seek_target = Some(time);
        self.events.push_back(PlayerEvent::Seeking);
    }

    fn reload(&mut self) {
        self.playing = false;
        self.playhead = 0.0;
        self.seek_target = None;
        self.ended = false;
        self.reloading = true;
    }

    fn current_time(&self) -> f64 {
        // report the in-flight target so marker updates don't jump back
        self.seek_target.unwrap_or(self.playhead)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_when_already_paused_emits_nothing() {
        let mut p = ClockPlayer::new(10.0);
        p.pause();
        assert!(p.drain_events().is_empty(), "no Paused event without a state change");
        p.play();
        p.pause();
        assert_eq!(p.drain_events(), vec![PlayerEvent::Playing, PlayerEvent::Paused]);
    }

    #[test]
    fn seek_completes_on_next_tick() {
        let mut p = ClockPlayer::new(10.0);
        p.seek(3.0);
        assert_eq!(p.drain_events(), vec![PlayerEvent::Seeking]);
        assert_eq!(p.current_time(), 3.0, "in-flight target is reported immediately");
        p.tick();
        assert_eq!(p.drain_events(), vec![PlayerEvent::ReadyToPlay]);
        assert_eq!(p.current_time(), 3.0);
    }

    #[test]
    fn reload_resets_and_signals_ready() {
        let mut p = ClockPlayer::new(10.0);
        p.seek(5.0);
        p.tick();
        p.drain_events();
        p.reload();
        assert_eq!(p.current_time(), 0.0);
        p.tick();
        assert_eq!(p.drain_events(), vec![PlayerEvent::ReadyToPlay]);
    }

    #[test]
    fn injected_fault_stops_playback_and_reports_error() {
        let mut p = ClockPlayer::new(10.0);
        p.play();
        p.drain_events();
        p.inject_decode_fault();
        assert!(!p.is_playing());
        assert_eq!(p.drain_events(), vec![PlayerEvent::Errored]);
    }

    #[test]
    fn seek_clamps_to_duration() {
        let mut p = ClockPlayer::new(4.0);
        p.seek(99.0);
        p.tick();
        assert_eq!(p.current_time(), 4.0);
    }

    #[test]
    fn playback_ends_at_duration_and_seek_clears_ended() {
        use std::time::Duration;

        let mut p = ClockPlayer::new(2.0);
        p.play();
        let start = Instant::now();
        p.tick_at(start);
        p.tick_at(start + Duration::from_secs(5));
        assert!(p.at_end());
        assert!(!p.is_playing());
        assert_eq!(
            p.drain_events(),
            vec![PlayerEvent::Playing, PlayerEvent::Paused, PlayerEvent::Ended]
        );

        p.seek(0.5);
        p.tick_at(start + Duration::from_secs(6));
        assert!(!p.at_end(), "seeking off the end must clear the ended state");
    }
}
