use crate::config::PlaybackSettings;
use crate::library::LibraryStore;
use crate::model::LibraryState;
use crate::player::{MediaPlayer, PlayerEvent};
use crate::timer::{Scheduler, TimerId};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSlot {
    Embedded,
    FullScreen,
}

/// Host capabilities decided once at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformPolicy {
    /// Media started without a user gesture may silently fail to play.
    pub blocks_autoplay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    SeekFullScreen(f64),
    ForcePlayFullScreen,
    SeekEmbedded(f64),
    ReconcilePlaying(bool),
    AutoplayWatchdog { started_at: f64 },
}

/// Simulated backlight. Activity turns it on, idling turns it off, and an
/// explicit user "off" is not undone by the activity of that same interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Backlight {
    on: bool,
    last_activity_ms: u64,
    user_off_at: Option<u64>,
}

impl Backlight {
    pub fn new(on: bool, now_ms: u64) -> Self {
        Self {
            on,
            last_activity_ms: now_ms,
            user_off_at: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// Returns whether the light changed.
    pub fn register_activity(&mut self, now_ms: u64) -> bool {
        self.last_activity_ms = now_ms;
        if self.user_off_at.is_some_and(|at| at != now_ms) {
            self.user_off_at = None;
        }
        if self.on || self.user_off_at.is_some() {
            return false;
        }
        self.on = true;
        true
    }

    pub fn set_by_user(&mut self, on: bool, now_ms: u64) -> bool {
        let changed = self.on != on;
        self.on = on;
        self.last_activity_ms = now_ms;
        self.user_off_at = (!on).then_some(now_ms);
        changed
    }

    pub fn check_idle(&mut self, now_ms: u64, idle_ms: u64, keep_awake: bool) -> bool {
        if !self.on || keep_awake {
            return false;
        }
        if now_ms.saturating_sub(self.last_activity_ms) < idle_ms {
            return false;
        }
        self.on = false;
        true
    }
}

/// Keeps the embedded and full-screen players in step.
///
/// Exactly one slot is active. Switching slots captures the playback position
/// from the outgoing player and hands it to the incoming one after a settle
/// delay; at most one such transition is in flight at a time.
pub struct PlaybackSession {
    embedded: Box<dyn MediaPlayer>,
    fullscreen: Box<dyn MediaPlayer>,
    slot: PlayerSlot,
    elapsed_seconds: f64,
    total_seconds: f64,
    loaded_id: Option<String>,
    backlight: Backlight,
    policy: PlatformPolicy,
    user_interacted: bool,
    last_playing: bool,
    settings: PlaybackSettings,
    timers: Scheduler<Deferred>,
    watchdog: Option<TimerId>,
    transition: Vec<TimerId>,
    reconcile: Option<TimerId>,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("slot", &self.slot)
            .field("elapsed_seconds", &self.elapsed_seconds)
            .field("total_seconds", &self.total_seconds)
            .field("loaded_id", &self.loaded_id)
            .field("backlight", &self.backlight)
            .field("policy", &self.policy)
            .field("user_interacted", &self.user_interacted)
            .field("pending_timers", &self.timers.len())
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    pub fn new(
        embedded: Box<dyn MediaPlayer>,
        fullscreen: Box<dyn MediaPlayer>,
        settings: PlaybackSettings,
        policy: PlatformPolicy,
        backlight_on: bool,
        now_ms: u64,
    ) -> Self {
        Self {
            embedded,
            fullscreen,
            slot: PlayerSlot::Embedded,
            elapsed_seconds: 0.0,
            total_seconds: 0.0,
            loaded_id: None,
            backlight: Backlight::new(backlight_on, now_ms),
            policy,
            user_interacted: false,
            last_playing: false,
            settings,
            timers: Scheduler::new(),
            watchdog: None,
            transition: Vec::new(),
            reconcile: None,
        }
    }

    pub fn slot(&self) -> PlayerSlot {
        self.slot
    }

    pub fn is_full_screen(&self) -> bool {
        self.slot == PlayerSlot::FullScreen
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    pub fn backlight(&self) -> &Backlight {
        &self.backlight
    }

    pub fn user_interacted(&self) -> bool {
        self.user_interacted
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog.is_some_and(|id| self.timers.is_pending(id))
    }

    pub fn transition_in_flight(&self) -> bool {
        self.transition.iter().any(|id| self.timers.is_pending(*id))
    }

    pub fn player(&self, slot: PlayerSlot) -> &dyn MediaPlayer {
        match slot {
            PlayerSlot::Embedded => self.embedded.as_ref(),
            PlayerSlot::FullScreen => self.fullscreen.as_ref(),
        }
    }

    fn player_mut(&mut self, slot: PlayerSlot) -> &mut dyn MediaPlayer {
        match slot {
            PlayerSlot::Embedded => self.embedded.as_mut(),
            PlayerSlot::FullScreen => self.fullscreen.as_mut(),
        }
    }

    fn active_mut(&mut self) -> &mut dyn MediaPlayer {
        self.player_mut(self.slot)
    }

    /// Marks a user gesture. Returns whether the backlight turned on.
    pub fn register_activity(&mut self, now_ms: u64) -> bool {
        self.user_interacted = true;
        self.backlight.register_activity(now_ms)
    }

    pub fn set_backlight(&mut self, on: bool, now_ms: u64) -> bool {
        info!(on, "backlight set by user");
        self.backlight.set_by_user(on, now_ms)
    }

    /// Pushes library state into the players: the current track, the
    /// loop-current flag and the playing flag.
    pub fn sync_library(&mut self, state: &LibraryState, now_ms: u64) {
        match state.current_track() {
            Some(track) if self.loaded_id.as_deref() != Some(track.id.as_str()) => {
                debug!(id = %track.id, "loading track");
                self.cancel_transition();
                self.elapsed_seconds = 0.0;
                self.total_seconds = 0.0;
                self.loaded_id = Some(track.id.clone());
                self.embedded.mount(&track.url, state.loop_current);
                if self.slot == PlayerSlot::FullScreen {
                    self.fullscreen.mount(&track.url, state.loop_current);
                }
            }
            Some(_) => {}
            None => {
                if self.loaded_id.take().is_some() {
                    debug!("library empty, unloading players");
                    self.cancel_transition();
                    self.embedded.unmount();
                    self.fullscreen.unmount();
                    self.slot = PlayerSlot::Embedded;
                    self.elapsed_seconds = 0.0;
                    self.total_seconds = 0.0;
                }
            }
        }

        self.embedded.set_loop(state.loop_current);
        self.fullscreen.set_loop(state.loop_current);

        let inactive = match self.slot {
            PlayerSlot::Embedded => PlayerSlot::FullScreen,
            PlayerSlot::FullScreen => PlayerSlot::Embedded,
        };
        self.player_mut(inactive).set_playing(false);
        self.active_mut().set_playing(state.is_playing);

        if state.is_playing && !self.last_playing {
            self.arm_watchdog(now_ms);
        } else if !state.is_playing {
            self.cancel_watchdog();
        }
        self.last_playing = state.is_playing;
    }

    fn arm_watchdog(&mut self, now_ms: u64) {
        if !self.policy.blocks_autoplay || self.user_interacted {
            return;
        }
        self.cancel_watchdog();
        let started_at = self.elapsed_seconds;
        self.watchdog = Some(self.timers.schedule(
            now_ms,
            self.settings.autoplay_watchdog_ms,
            Deferred::AutoplayWatchdog { started_at },
        ));
        debug!(started_at, "autoplay watchdog armed");
    }

    fn cancel_watchdog(&mut self) {
        if let Some(id) = self.watchdog.take() {
            self.timers.cancel(id);
        }
    }

    /// Drops every pending hand-off step. Positions captured for the previous
    /// track must never reach the next one.
    pub fn cancel_transition(&mut self) {
        for id in self.transition.drain(..) {
            self.timers.cancel(id);
        }
        self.reconcile = None;
    }

    /// A user command decided the playing flag, so a pending hand-off must
    /// not restore the value captured before it.
    pub fn supersede_playing(&mut self) {
        if let Some(id) = self.reconcile.take() {
            debug!("playing flag superseded during hand-off");
            self.timers.cancel(id);
        }
    }

    pub fn enter_full_screen(&mut self, state: &LibraryState, now_ms: u64) -> bool {
        if self.slot == PlayerSlot::FullScreen || self.transition_in_flight() {
            return false;
        }
        let Some(track) = state.current_track() else {
            return false;
        };

        let captured = self
            .embedded
            .current_time()
            .unwrap_or(self.elapsed_seconds);
        self.elapsed_seconds = captured;
        self.slot = PlayerSlot::FullScreen;
        self.embedded.set_playing(false);
        self.fullscreen.mount(&track.url, state.loop_current);
        self.fullscreen.set_playing(state.is_playing);

        let settle = self.settings.settle_delay_ms;
        let mut transition = vec![self.timers.schedule(
            now_ms,
            settle,
            Deferred::SeekFullScreen(captured),
        )];
        if state.is_playing && self.policy.blocks_autoplay && self.user_interacted {
            transition.push(self.timers.schedule(
                now_ms,
                settle + self.settings.play_settle_delay_ms,
                Deferred::ForcePlayFullScreen,
            ));
        }
        self.transition = transition;
        info!(position = captured, "entering full screen");
        true
    }

    pub fn exit_full_screen(&mut self, state: &LibraryState, now_ms: u64) -> bool {
        if self.slot != PlayerSlot::FullScreen || self.transition_in_flight() {
            return false;
        }

        let captured = self
            .fullscreen
            .current_time()
            .unwrap_or(self.elapsed_seconds);
        self.elapsed_seconds = captured;
        self.fullscreen.unmount();
        self.slot = PlayerSlot::Embedded;

        let settle = self.settings.settle_delay_ms;
        let reconcile = self.timers.schedule(
            now_ms,
            settle + self.settings.reconcile_delay_ms,
            Deferred::ReconcilePlaying(state.is_playing),
        );
        self.transition = vec![
            self.timers
                .schedule(now_ms, settle, Deferred::SeekEmbedded(captured)),
            reconcile,
        ];
        self.reconcile = Some(reconcile);
        info!(position = captured, "leaving full screen");
        true
    }

    /// Relative seek on the active player, clamped to the known duration.
    pub fn seek_by(&mut self, delta_seconds: f64) {
        let from = self
            .player(self.slot)
            .current_time()
            .unwrap_or(self.elapsed_seconds);
        let mut target = (from + delta_seconds).max(0.0);
        if self.total_seconds > 0.0 {
            target = target.min(self.total_seconds);
        }
        self.active_mut().seek_to(target);
        self.elapsed_seconds = target;
        debug!(target, "seek");
    }

    pub fn poll_players(&mut self, now_ms: u64) -> Vec<(PlayerSlot, PlayerEvent)> {
        let mut events: Vec<_> = self
            .embedded
            .poll_events(now_ms)
            .into_iter()
            .map(|event| (PlayerSlot::Embedded, event))
            .collect();
        events.extend(
            self.fullscreen
                .poll_events(now_ms)
                .into_iter()
                .map(|event| (PlayerSlot::FullScreen, event)),
        );
        events
    }

    pub fn handle_event(&mut self, slot: PlayerSlot, event: PlayerEvent, store: &mut LibraryStore) {
        let active = slot == self.slot;
        match event {
            PlayerEvent::Ready => debug!(?slot, "player ready"),
            PlayerEvent::Duration(total) if active => self.total_seconds = total,
            PlayerEvent::Progress(played) if active => self.elapsed_seconds = played,
            PlayerEvent::Duration(_) | PlayerEvent::Progress(_) => {}
            // Last writer wins, so a silently blocked start shows as paused.
            PlayerEvent::Play => store.set_playing(true),
            PlayerEvent::Pause => store.set_playing(false),
            PlayerEvent::Ended if active => self.on_track_ended(store),
            PlayerEvent::Ended => {}
        }
    }

    fn on_track_ended(&mut self, store: &mut LibraryStore) {
        let state = store.state();
        let len = state.tracks.len();
        if state.loop_current {
            debug!("track ended, repeating current");
            self.restart_active();
            store.set_playing(true);
        } else if state.current_index + 1 < len || (state.loop_all && len > 0) {
            store.next_track();
            let same_track = store
                .state()
                .current_track()
                .is_some_and(|track| self.loaded_id.as_deref() == Some(track.id.as_str()));
            if same_track {
                self.restart_active();
            }
        } else {
            debug!("reached end of library");
            store.set_playing(false);
        }
    }

    fn restart_active(&mut self) {
        self.elapsed_seconds = 0.0;
        let player = self.active_mut();
        player.seek_to(0.0);
        player.set_playing(true);
    }

    /// Runs due timers and the idle check. Returns whether the backlight
    /// changed.
    pub fn tick(&mut self, store: &mut LibraryStore, now_ms: u64) -> bool {
        for (id, action) in self.timers.take_due(now_ms) {
            match action {
                Deferred::SeekFullScreen(position) => {
                    self.fullscreen.seek_to(position);
                    self.elapsed_seconds = position;
                }
                Deferred::ForcePlayFullScreen => {
                    debug!("issuing native play after full-screen seek");
                    self.fullscreen.play();
                }
                Deferred::SeekEmbedded(position) => {
                    self.embedded.seek_to(position);
                    self.elapsed_seconds = position;
                    self.embedded.set_playing(store.state().is_playing);
                }
                Deferred::ReconcilePlaying(expected) => {
                    if self.reconcile == Some(id) {
                        self.reconcile = None;
                    }
                    if store.state().is_playing != expected {
                        debug!(expected, "reconciling playing flag after hand-off");
                        store.set_playing(expected);
                    }
                    self.embedded.set_playing(expected);
                }
                Deferred::AutoplayWatchdog { started_at } => {
                    if self.watchdog == Some(id) {
                        self.watchdog = None;
                    }
                    if store.state().is_playing && self.elapsed_seconds <= started_at {
                        warn!("playback did not start, autoplay appears blocked");
                        store.set_playing(false);
                    }
                }
            }
        }

        let keep_awake = self.slot == PlayerSlot::FullScreen && store.state().is_playing;
        self.backlight
            .check_idle(now_ms, self.settings.idle_timeout_ms, keep_awake)
    }

    /// Cancels every pending timer.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.watchdog = None;
        self.transition.clear();
        self.reconcile = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Track;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Mount(String),
        Unmount,
        SetPlaying(bool),
        Play,
        Seek(f64),
    }

    #[derive(Clone, Default)]
    struct Probe {
        calls: Rc<RefCell<Vec<Call>>>,
        time: Rc<Cell<Option<f64>>>,
    }

    impl Probe {
        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn clear(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    struct RecordingPlayer {
        probe: Probe,
    }

    impl MediaPlayer for RecordingPlayer {
        fn mount(&mut self, url: &str, _looping: bool) {
            self.probe.calls.borrow_mut().push(Call::Mount(url.to_string()));
        }

        fn unmount(&mut self) {
            self.probe.calls.borrow_mut().push(Call::Unmount);
        }

        fn is_mounted(&self) -> bool {
            true
        }

        fn set_playing(&mut self, playing: bool) {
            self.probe.calls.borrow_mut().push(Call::SetPlaying(playing));
        }

        fn play(&mut self) {
            self.probe.calls.borrow_mut().push(Call::Play);
        }

        fn seek_to(&mut self, seconds: f64) {
            self.probe.calls.borrow_mut().push(Call::Seek(seconds));
        }

        fn set_loop(&mut self, _looping: bool) {}

        fn current_time(&self) -> Option<f64> {
            self.probe.time.get()
        }

        fn poll_events(&mut self, _now_ms: u64) -> Vec<PlayerEvent> {
            Vec::new()
        }
    }

    struct Rig {
        session: PlaybackSession,
        store: LibraryStore,
        embedded: Probe,
        fullscreen: Probe,
    }

    fn rig(policy: PlatformPolicy, len: usize) -> Rig {
        let embedded = Probe::default();
        let fullscreen = Probe::default();
        let tracks = (0..len)
            .map(|n| Track::new(format!("id{n}"), format!("url{n}"), format!("Song {n}")))
            .collect();
        let store = LibraryStore::with_rng(
            LibraryState::with_tracks(tracks),
            SmallRng::seed_from_u64(3),
        );
        let mut session = PlaybackSession::new(
            Box::new(RecordingPlayer {
                probe: embedded.clone(),
            }),
            Box::new(RecordingPlayer {
                probe: fullscreen.clone(),
            }),
            PlaybackSettings::default(),
            policy,
            true,
            0,
        );
        session.sync_library(store.state(), 0);
        Rig {
            session,
            store,
            embedded,
            fullscreen,
        }
    }

    fn settle() -> u64 {
        PlaybackSettings::default().settle_delay_ms
    }

    #[test]
    fn full_screen_prefers_live_player_time() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Progress(42.0), &mut rig.store);
        rig.embedded.time.set(Some(42.7));

        assert!(rig.session.enter_full_screen(rig.store.state(), 1_000));
        assert!(!rig.fullscreen.calls().contains(&Call::Seek(42.7)));
        assert!(rig.session.transition_in_flight());

        rig.session.tick(&mut rig.store, 1_000 + settle());
        assert!(rig.fullscreen.calls().contains(&Call::Seek(42.7)));
        assert!(!rig.session.transition_in_flight());
    }

    #[test]
    fn full_screen_falls_back_to_cached_time() {
        let mut rig = rig(PlatformPolicy::default(), 1);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Progress(42.0), &mut rig.store);

        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.tick(&mut rig.store, settle());
        assert!(rig.fullscreen.calls().contains(&Call::Seek(42.0)));
    }

    #[test]
    fn second_transition_waits_for_the_first() {
        let mut rig = rig(PlatformPolicy::default(), 1);
        assert!(rig.session.enter_full_screen(rig.store.state(), 0));
        assert!(!rig.session.exit_full_screen(rig.store.state(), 10));
        rig.session.tick(&mut rig.store, settle());
        assert!(rig.session.exit_full_screen(rig.store.state(), settle()));
    }

    #[test]
    fn blocked_platform_gets_native_play_after_seek() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.session.register_activity(0);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.fullscreen.clear();

        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.tick(&mut rig.store, settle());
        assert!(!rig.fullscreen.calls().contains(&Call::Play));

        rig.session
            .tick(&mut rig.store, settle() + PlaybackSettings::default().play_settle_delay_ms);
        let calls = rig.fullscreen.calls();
        let seek = calls.iter().position(|c| matches!(c, Call::Seek(_)));
        let play = calls.iter().position(|c| *c == Call::Play);
        assert!(seek < play);
    }

    #[test]
    fn no_native_play_without_prior_interaction() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.tick(&mut rig.store, 1_000);
        assert!(!rig.fullscreen.calls().contains(&Call::Play));
    }

    #[test]
    fn leaving_full_screen_reconciles_playing_drift() {
        let mut rig = rig(PlatformPolicy::default(), 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.tick(&mut rig.store, settle());
        rig.fullscreen.time.set(Some(12.5));

        let start = 1_000;
        rig.session.exit_full_screen(rig.store.state(), start);
        assert!(rig.fullscreen.calls().contains(&Call::Unmount));
        rig.session
            .handle_event(PlayerSlot::FullScreen, PlayerEvent::Pause, &mut rig.store);
        assert!(!rig.store.state().is_playing);

        rig.session.tick(&mut rig.store, start + settle());
        assert!(rig.embedded.calls().contains(&Call::Seek(12.5)));

        rig.session.tick(
            &mut rig.store,
            start + settle() + PlaybackSettings::default().reconcile_delay_ms,
        );
        assert!(rig.store.state().is_playing);
        assert_eq!(rig.embedded.calls().last(), Some(&Call::SetPlaying(true)));
    }

    #[test]
    fn watchdog_reverts_silently_blocked_start() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        assert!(rig.session.watchdog_armed());

        rig.session.tick(&mut rig.store, 5_000);
        assert!(!rig.store.state().is_playing);
        assert!(!rig.session.watchdog_armed());
    }

    #[test]
    fn watchdog_leaves_progressing_playback_alone() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Progress(1.5), &mut rig.store);

        rig.session.tick(&mut rig.store, 5_000);
        assert!(rig.store.state().is_playing);
    }

    #[test]
    fn watchdog_not_armed_after_interaction() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.session.register_activity(0);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        assert!(!rig.session.watchdog_armed());
    }

    #[test]
    fn pausing_cancels_watchdog() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.store.set_playing(false);
        rig.session.sync_library(rig.store.state(), 10);
        assert!(!rig.session.watchdog_armed());
    }

    #[test]
    fn backlight_dims_after_idle_unless_video_playing() {
        let mut rig = rig(PlatformPolicy::default(), 1);
        assert!(!rig.session.tick(&mut rig.store, 4_999));
        assert!(rig.session.tick(&mut rig.store, 5_000));
        assert!(!rig.session.backlight().is_on());

        assert!(rig.session.register_activity(6_000));
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 6_000);
        rig.session.enter_full_screen(rig.store.state(), 6_000);
        rig.session.tick(&mut rig.store, 20_000);
        assert!(rig.session.backlight().is_on());
    }

    #[test]
    fn explicit_off_survives_same_interaction() {
        let mut backlight = Backlight::new(true, 0);
        assert!(backlight.set_by_user(false, 100));
        assert!(!backlight.register_activity(100));
        assert!(!backlight.is_on());
        assert!(backlight.register_activity(200));
        assert!(backlight.is_on());
    }

    #[test]
    fn ended_with_loop_current_restarts() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.toggle_loop_current();
        rig.store.play_index(0);
        rig.embedded.clear();

        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Ended, &mut rig.store);
        assert_eq!(rig.store.state().current_index, 0);
        assert!(rig.store.state().is_playing);
        assert_eq!(
            rig.embedded.calls(),
            vec![Call::Seek(0.0), Call::SetPlaying(true)]
        );
    }

    #[test]
    fn ended_advances_then_stops_at_end() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Ended, &mut rig.store);
        assert_eq!(rig.store.state().current_index, 1);

        rig.session.sync_library(rig.store.state(), 0);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Ended, &mut rig.store);
        assert_eq!(rig.store.state().current_index, 1);
        assert!(!rig.store.state().is_playing);
    }

    #[test]
    fn ended_wraps_with_loop_all() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.toggle_loop_all();
        rig.store.play_index(1);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Ended, &mut rig.store);
        assert_eq!(rig.store.state().current_index, 0);
        assert!(rig.store.state().is_playing);
    }

    #[test]
    fn ended_from_inactive_player_is_ignored() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session
            .handle_event(PlayerSlot::FullScreen, PlayerEvent::Ended, &mut rig.store);
        assert_eq!(rig.store.state().current_index, 0);
    }

    #[test]
    fn track_change_resets_elapsed() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Progress(30.0), &mut rig.store);
        rig.store.next_track();
        rig.session.sync_library(rig.store.state(), 0);
        assert_eq!(rig.session.elapsed_seconds(), 0.0);
        assert!(rig.embedded.calls().contains(&Call::Mount("url1".into())));
    }

    #[test]
    fn track_change_drops_pending_full_screen_seek() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.embedded.time.set(Some(100.0));
        rig.session.enter_full_screen(rig.store.state(), 100_000);
        rig.fullscreen.clear();

        rig.store.next_track();
        rig.session.sync_library(rig.store.state(), 100_010);
        assert!(!rig.session.transition_in_flight());

        rig.session.tick(&mut rig.store, 100_000 + settle() + 50);
        assert_eq!(rig.session.elapsed_seconds(), 0.0);
        let calls = rig.fullscreen.calls();
        assert!(calls.contains(&Call::Mount("url1".into())));
        assert!(!calls.contains(&Call::Seek(100.0)));
    }

    #[test]
    fn track_change_drops_pending_embedded_seek() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.tick(&mut rig.store, settle());
        rig.fullscreen.time.set(Some(80.0));
        rig.session.exit_full_screen(rig.store.state(), 1_000);
        rig.embedded.clear();

        rig.store.next_track();
        rig.session.sync_library(rig.store.state(), 1_010);
        rig.session.tick(&mut rig.store, 2_000);
        assert!(!rig.embedded.calls().contains(&Call::Seek(80.0)));
        assert_eq!(rig.session.elapsed_seconds(), 0.0);
    }

    #[test]
    fn clearing_during_hand_off_stays_stopped() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 1_000);
        rig.session.tick(&mut rig.store, 2_000);
        rig.session.exit_full_screen(rig.store.state(), 3_000);

        rig.store.clear_library();
        rig.session.sync_library(rig.store.state(), 3_010);
        rig.session.tick(&mut rig.store, 3_400);
        assert!(rig.store.state().tracks.is_empty());
        assert!(!rig.store.state().is_playing);
    }

    #[test]
    fn user_pause_during_hand_off_is_kept() {
        let mut rig = rig(PlatformPolicy::default(), 2);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 1_000);
        rig.session.tick(&mut rig.store, 2_000);
        rig.fullscreen.time.set(Some(30.0));
        rig.session.exit_full_screen(rig.store.state(), 3_000);

        rig.session.supersede_playing();
        rig.store.set_playing(false);
        rig.session.sync_library(rig.store.state(), 3_010);
        rig.session.tick(&mut rig.store, 3_400);
        assert!(!rig.store.state().is_playing);
        assert!(rig.embedded.calls().contains(&Call::Seek(30.0)));
        assert_eq!(rig.embedded.calls().last(), Some(&Call::SetPlaying(false)));
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let mut rig = rig(PlatformPolicy::default(), 1);
        rig.session
            .handle_event(PlayerSlot::Embedded, PlayerEvent::Duration(100.0), &mut rig.store);
        rig.embedded.time.set(Some(97.0));
        rig.session.seek_by(5.0);
        assert_eq!(rig.session.elapsed_seconds(), 100.0);

        rig.embedded.time.set(Some(2.0));
        rig.session.seek_by(-5.0);
        assert_eq!(rig.session.elapsed_seconds(), 0.0);
    }

    #[test]
    fn shutdown_cancels_pending_work() {
        let mut rig = rig(PlatformPolicy { blocks_autoplay: true }, 1);
        rig.store.play_index(0);
        rig.session.sync_library(rig.store.state(), 0);
        rig.session.enter_full_screen(rig.store.state(), 0);
        rig.session.shutdown();
        rig.fullscreen.clear();

        rig.session.tick(&mut rig.store, 10_000);
        assert!(rig.fullscreen.calls().is_empty());
        assert!(rig.store.state().is_playing);
    }
}
