//! The media player collaborator.
//!
//! The core never decodes media; it drives something that can load a URL,
//! play, pause and seek, and that reports progress back as events.

use tracing::trace;

const DEFAULT_SIMULATED_DURATION: f64 = 210.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Ready,
    Duration(f64),
    Progress(f64),
    Play,
    Pause,
    Ended,
}

pub trait MediaPlayer {
    fn mount(&mut self, url: &str, looping: bool);
    fn unmount(&mut self);
    fn is_mounted(&self) -> bool;
    /// The declarative "should be playing" flag.
    fn set_playing(&mut self, playing: bool);
    /// An explicit native play call, which counts as user-initiated.
    fn play(&mut self);
    fn seek_to(&mut self, seconds: f64);
    fn set_loop(&mut self, looping: bool);
    /// `None` while nothing is mounted.
    fn current_time(&self) -> Option<f64>;
    fn poll_events(&mut self, now_ms: u64) -> Vec<PlayerEvent>;
}

/// A clock-driven stand-in for a real player, used by the terminal host and
/// by tests. With `autoplay_blocked`, flag-driven starts are silently ignored
/// until [`MediaPlayer::play`] has been called once.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    url: Option<String>,
    playing: bool,
    looping: bool,
    position: f64,
    duration: f64,
    last_poll_ms: Option<u64>,
    autoplay_blocked: bool,
    unlocked: bool,
    events: Vec<PlayerEvent>,
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_SIMULATED_DURATION)
    }
}

impl SimulatedPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            url: None,
            playing: false,
            looping: false,
            position: 0.0,
            duration: duration.max(0.0),
            last_poll_ms: None,
            autoplay_blocked: false,
            unlocked: false,
            events: Vec::new(),
        }
    }

    pub fn with_autoplay_blocked(mut self) -> Self {
        self.autoplay_blocked = true;
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    fn start(&mut self) {
        if !self.playing && self.url.is_some() {
            self.playing = true;
            self.events.push(PlayerEvent::Play);
        }
    }

    fn stop(&mut self) {
        if self.playing {
            self.playing = false;
            self.events.push(PlayerEvent::Pause);
        }
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn mount(&mut self, url: &str, looping: bool) {
        trace!(url, looping, "simulated player mounted");
        self.url = Some(url.to_string());
        self.looping = looping;
        self.position = 0.0;
        self.playing = false;
        self.last_poll_ms = None;
        self.events.push(PlayerEvent::Ready);
        self.events.push(PlayerEvent::Duration(self.duration));
    }

    fn unmount(&mut self) {
        self.stop();
        self.url = None;
        self.position = 0.0;
    }

    fn is_mounted(&self) -> bool {
        self.url.is_some()
    }

    fn set_playing(&mut self, playing: bool) {
        if !playing {
            self.stop();
        } else if !self.autoplay_blocked || self.unlocked {
            self.start();
        }
    }

    fn play(&mut self) {
        self.unlocked = true;
        self.start();
    }

    fn seek_to(&mut self, seconds: f64) {
        if self.url.is_some() {
            self.position = seconds.clamp(0.0, self.duration);
        }
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn current_time(&self) -> Option<f64> {
        self.url.as_ref().map(|_| self.position)
    }

    fn poll_events(&mut self, now_ms: u64) -> Vec<PlayerEvent> {
        let elapsed_ms = self
            .last_poll_ms
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(0);
        self.last_poll_ms = Some(now_ms);

        if self.playing && elapsed_ms > 0 {
            self.position += elapsed_ms as f64 / 1000.0;
            if self.position >= self.duration {
                if self.looping {
                    self.position = 0.0;
                } else {
                    self.position = self.duration;
                    self.playing = false;
                    self.events.push(PlayerEvent::Progress(self.position));
                    self.events.push(PlayerEvent::Ended);
                    return std::mem::take(&mut self.events);
                }
            }
            self.events.push(PlayerEvent::Progress(self.position));
        }
        std::mem::take(&mut self.events)
    }
}
