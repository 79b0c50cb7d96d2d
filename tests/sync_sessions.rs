//! Session-level scenarios for the playback synchronizer: strict FIFO
//! fan-out, mid-session participant removal, click-to-seek ordering,
//! end-of-stream play serialization, and fault recovery.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use apextrace::config::shared_sync_context;
use apextrace::{
    PlaybackSynchronizer, PlayerEvent, PlayerId, PlayerRegistry, SyncMode, VideoPlayer,
};

type CommandLog = Rc<RefCell<Vec<(u64, String)>>>;

/// Scripted stand-in for a video element: records every command into a
/// shared log; lifecycle events are delivered by the test, the way the
/// app delivers drained events in arrival order.
struct MockPlayer {
    id: u64,
    playing: bool,
    time: f64,
    ended: bool,
    log: CommandLog,
}

impl MockPlayer {
    fn new(id: u64, playing: bool, log: CommandLog) -> Self {
        Self { id, playing, time: 0.0, ended: false, log }
    }
}

impl VideoPlayer for MockPlayer {
    fn play(&mut self) {
        self.playing = true;
        self.ended = false;
        self.log.borrow_mut().push((self.id, "play".into()));
    }
    fn pause(&mut self) {
        self.playing = false;
        self.log.borrow_mut().push((self.id, "pause".into()));
    }
    fn seek(&mut self, time: f64) {
        self.time = time;
        self.log.borrow_mut().push((self.id, format!("seek@{time:.2}")));
    }
    fn reload(&mut self) {
        self.playing = false;
        self.time = 0.0;
        self.log.borrow_mut().push((self.id, "reload".into()));
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
    players: Vec<(PlayerId, MockPlayer)>,
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

fn rig(n: u64, playing: bool) -> (PlaybackSynchronizer, Rig, CommandLog) {
    let ctx = shared_sync_context();
    ctx.borrow_mut().sync_playback = true;
    let mut sync = PlaybackSynchronizer::new(ctx, Duration::from_secs(60));
    let log: CommandLog = Rc::new(RefCell::new(Vec::new()));
    let mut players = Vec::new();
    for i in 1..=n {
        let id = PlayerId(i);
        sync.add_participant(id);
        players.push((id, MockPlayer::new(i, playing, log.clone())));
    }
    (sync, Rig { players }, log)
}

fn commands(log: &CommandLog) -> Vec<(u64, String)> {
    log.borrow().clone()
}

#[test]
fn pause_all_is_strictly_serialized_in_enqueue_order() {
    let (mut sync, mut r, log) = rig(3, true);

    assert!(sync.request_pause(PlayerId(1), &mut r));
    assert_eq!(
        commands(&log),
        vec![(1, "pause".to_string())],
        "only the trigger may be commanded before its pause confirms"
    );

    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    assert_eq!(commands(&log).last(), Some(&(2, "pause".to_string())));
    assert_eq!(commands(&log).len(), 2, "participant 3 must wait for 2's confirmation");

    sync.handle_event(PlayerId(2), PlayerEvent::Paused, &mut r);
    assert_eq!(commands(&log).last(), Some(&(3, "pause".to_string())));

    sync.handle_event(PlayerId(3), PlayerEvent::Paused, &mut r);
    assert!(sync.is_idle(), "drained queue must return the machine to Idle");

    let order: Vec<u64> = commands(&log).iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![1, 2, 3], "strict FIFO of the enqueue order");
}

#[test]
fn removing_a_queued_participant_still_drains_to_idle() {
    let (mut sync, mut r, log) = rig(4, true);

    sync.request_pause(PlayerId(1), &mut r);
    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    // participant 3 is still queued; its row goes away now
    r.players.retain(|(pid, _)| *pid != PlayerId(3));
    sync.remove_participant(PlayerId(3), &mut r);

    sync.handle_event(PlayerId(2), PlayerEvent::Paused, &mut r);
    // 3 was skipped silently; 4 is serviced directly
    assert_eq!(commands(&log).last(), Some(&(4, "pause".to_string())));
    sync.handle_event(PlayerId(4), PlayerEvent::Paused, &mut r);

    assert!(sync.is_idle());
    assert!(
        !commands(&log).iter().any(|(id, _)| *id == 3),
        "a removed participant must never be commanded"
    );
}

#[test]
fn removing_the_awaited_participant_advances_immediately() {
    let (mut sync, mut r, log) = rig(3, true);

    sync.request_pause(PlayerId(1), &mut r);
    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    // participant 2 was just commanded and is now awaited; remove it
    r.players.retain(|(pid, _)| *pid != PlayerId(2));
    sync.remove_participant(PlayerId(2), &mut r);

    assert_eq!(commands(&log).last(), Some(&(3, "pause".to_string())));
    sync.handle_event(PlayerId(3), PlayerEvent::Paused, &mut r);
    assert!(sync.is_idle());
}

#[test]
fn click_seek_while_playing_never_seeks_before_the_pause_confirms() {
    let (mut sync, mut r, log) = rig(2, true);

    assert!(sync.request_seek(PlayerId(1), 2.0, &mut r));
    assert_eq!(
        commands(&log),
        vec![(1, "pause".to_string())],
        "the seek must wait for the pause notification"
    );

    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    assert_eq!(commands(&log).last(), Some(&(1, "seek@2.00".to_string())));

    // the trigger's seek completes; the fan-out starts
    sync.handle_event(PlayerId(1), PlayerEvent::ReadyToPlay, &mut r);
    assert_eq!(
        &commands(&log)[2..],
        &[(2, "pause".to_string()), (2, "seek@2.00".to_string())]
    );

    sync.handle_event(PlayerId(2), PlayerEvent::Paused, &mut r);
    sync.handle_event(PlayerId(2), PlayerEvent::ReadyToPlay, &mut r);

    // trigger was playing before the click, so everyone resumes together
    let tail: Vec<(u64, String)> = commands(&log)[4..].to_vec();
    assert_eq!(tail, vec![(1, "play".to_string()), (2, "play".to_string())]);
    assert!(sync.is_idle());
}

#[test]
fn click_seek_while_paused_fans_out_without_resuming() {
    let (mut sync, mut r, log) = rig(2, false);

    sync.request_seek(PlayerId(1), 1.5, &mut r);
    assert_eq!(commands(&log), vec![(1, "seek@1.50".to_string())], "already paused: safe to seek at once");

    sync.handle_event(PlayerId(1), PlayerEvent::Seeking, &mut r);
    sync.handle_event(PlayerId(1), PlayerEvent::ReadyToPlay, &mut r);
    assert_eq!(commands(&log).last(), Some(&(2, "seek@1.50".to_string())));

    sync.handle_event(PlayerId(2), PlayerEvent::ReadyToPlay, &mut r);
    assert!(sync.is_idle());
    assert!(
        !commands(&log).iter().any(|(_, c)| c == "play"),
        "nothing was playing, so nothing may resume"
    );
}

#[test]
fn play_after_end_of_stream_serializes_the_implicit_seeks() {
    let (mut sync, mut r, log) = rig(3, false);
    r.players[0].1.ended = true;

    sync.request_play(PlayerId(1), &mut r);
    assert_eq!(
        commands(&log),
        vec![(1, "seek@0.00".to_string())],
        "an ended trigger seeks home before anyone else moves"
    );

    sync.handle_event(PlayerId(1), PlayerEvent::ReadyToPlay, &mut r);
    assert_eq!(
        &commands(&log)[1..],
        &[(2, "pause".to_string()), (2, "seek@0.00".to_string())]
    );
    sync.handle_event(PlayerId(2), PlayerEvent::ReadyToPlay, &mut r);
    sync.handle_event(PlayerId(3), PlayerEvent::ReadyToPlay, &mut r);

    let plays: Vec<u64> = commands(&log)
        .iter()
        .filter(|(_, c)| c == "play")
        .map(|(id, _)| *id)
        .collect();
    assert_eq!(plays, vec![1, 2, 3], "play is commanded on everyone once the queue drains");
    assert!(sync.is_idle());
}

#[test]
fn stop_resets_everyone_to_the_timeline_start() {
    let (mut sync, mut r, log) = rig(2, true);

    // a trim region is active: its start is the timeline start
    sync.request_stop(PlayerId(1), 0.8, &mut r);
    assert_eq!(
        commands(&log),
        vec![(1, "pause".to_string()), (1, "seek@0.80".to_string())]
    );

    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    sync.handle_event(PlayerId(1), PlayerEvent::ReadyToPlay, &mut r);
    assert_eq!(
        &commands(&log)[2..],
        &[(2, "pause".to_string()), (2, "seek@0.80".to_string())]
    );
    sync.handle_event(PlayerId(2), PlayerEvent::ReadyToPlay, &mut r);
    assert!(sync.is_idle());
    assert_eq!(r.players[1].1.time, 0.8);
}

#[test]
fn fault_mid_session_reenqueues_and_the_session_converges() {
    let (mut sync, mut r, log) = rig(3, true);

    sync.request_pause(PlayerId(1), &mut r);
    sync.handle_event(PlayerId(1), PlayerEvent::Paused, &mut r);
    assert_eq!(commands(&log).last(), Some(&(2, "pause".to_string())));

    // participant 2's decoder faults instead of confirming
    sync.handle_event(PlayerId(2), PlayerEvent::Errored, &mut r);
    assert_eq!(commands(&log).last(), Some(&(2, "reload".to_string())));

    // the reload confirmation advances; 3 is serviced, then the
    // re-enqueued 2 (now already paused) is skipped and the queue drains
    sync.handle_event(PlayerId(2), PlayerEvent::ReadyToPlay, &mut r);
    assert_eq!(commands(&log).last(), Some(&(3, "pause".to_string())));
    sync.handle_event(PlayerId(3), PlayerEvent::Paused, &mut r);
    assert!(sync.is_idle(), "a faulted participant must not wedge the session");
}

#[test]
fn triggers_during_a_session_are_rejected_not_interleaved() {
    let (mut sync, mut r, log) = rig(3, true);

    sync.request_pause(PlayerId(1), &mut r);
    assert_eq!(sync.session_mode(), Some(SyncMode::PauseAll));
    let before = commands(&log).len();
    assert!(!sync.request_play(PlayerId(2), &mut r));
    assert!(!sync.request_seek(PlayerId(3), 5.0, &mut r));
    assert_eq!(commands(&log).len(), before, "rejected triggers must not touch any player");
    assert_eq!(sync.session_mode(), Some(SyncMode::PauseAll), "the original session is untouched");
}
