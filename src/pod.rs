use crate::config::Settings;
use crate::library::LibraryStore;
use crate::lookup::{self, LookupError, MetadataSource};
use crate::menu::{BackOutcome, Dialog, MenuCommand, MenuContext, MenuNavigator};
use crate::model::{LibraryState, Theme, Track};
use crate::playback::{PlatformPolicy, PlaybackSession};
use crate::player::{MediaPlayer, PlayerEvent, SimulatedPlayer};
use crate::storage::{self, PodSnapshot, Storage, StoreKey};
use crate::wheel::{ClickWheel, Rotation, WheelGeometry, WheelInput, WheelZone};
use tracing::{debug, info, warn};

/// The user-facing command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenMenu,
    /// The menu button: back one screen, or into the menu from now playing.
    Back,
    SelectUp,
    SelectDown,
    Activate,
    PlayPause,
    NextTrack,
    PreviousTrack,
    ToggleShuffle,
    CycleRepeat,
    ToggleBacklight,
    CycleTheme,
    SeekForward,
    SeekBackward,
    EnterFullScreen,
    ExitFullScreen,
    ClearLibrary,
    RemoveCurrent,
    NudgeLyrics(i64),
    /// The host window regained focus.
    Focus,
}

/// An add-track lookup in flight. Results for a library that has since been
/// cleared or replaced are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    pub url: String,
    pub video_id: String,
    generation: u64,
}

pub struct PodParts {
    pub storage: Box<dyn Storage>,
    pub embedded: Box<dyn MediaPlayer>,
    pub fullscreen: Box<dyn MediaPlayer>,
    pub settings: Settings,
    pub geometry: WheelGeometry,
}

impl PodParts {
    /// Clock-driven players standing in for real media.
    pub fn simulated(storage: Box<dyn Storage>, settings: Settings) -> Self {
        let blocked = settings.platform_blocks_autoplay;
        let player = move || {
            let player = SimulatedPlayer::default();
            if blocked {
                player.with_autoplay_blocked()
            } else {
                player
            }
        };
        Self {
            storage,
            embedded: Box::new(player()),
            fullscreen: Box::new(player()),
            geometry: WheelGeometry::centered(50.0, 50.0, 40.0),
            settings,
        }
    }
}

pub struct PodCore {
    library: LibraryStore,
    menu: MenuNavigator,
    session: PlaybackSession,
    wheel: ClickWheel,
    storage: Box<dyn Storage>,
    theme: Theme,
    settings: Settings,
    dialog: Option<Dialog>,
    pub dirty: bool,
    pub status: String,
}

impl std::fmt::Debug for PodCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodCore")
            .field("library", &self.library)
            .field("menu", &self.menu)
            .field("session", &self.session)
            .field("theme", &self.theme)
            .field("dialog", &self.dialog)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

fn menu_context<'a>(
    library: &'a LibraryStore,
    session: &PlaybackSession,
    theme: Theme,
) -> MenuContext<'a> {
    MenuContext {
        library: library.state(),
        backlight_on: session.backlight().is_on(),
        theme,
    }
}

impl PodCore {
    pub fn new(parts: PodParts, now_ms: u64) -> Self {
        let persisted = storage::load_persisted(parts.storage.as_ref());
        let library = LibraryStore::create(persisted.library);
        let session = PlaybackSession::new(
            parts.embedded,
            parts.fullscreen,
            parts.settings.playback.clone(),
            PlatformPolicy {
                blocks_autoplay: parts.settings.platform_blocks_autoplay,
            },
            persisted.backlight_on,
            now_ms,
        );
        let mut core = Self {
            library,
            menu: MenuNavigator::new(),
            session,
            wheel: ClickWheel::new(parts.geometry, &parts.settings.wheel),
            storage: parts.storage,
            theme: persisted.theme,
            settings: parts.settings,
            dialog: None,
            dirty: true,
            status: String::from("Ready"),
        };
        core.session.sync_library(core.library.state(), now_ms);
        let ctx = menu_context(&core.library, &core.session, core.theme);
        core.menu.enter_menu_mode(&ctx);
        info!(tracks = core.library.state().tracks.len(), "pod ready");
        core
    }

    pub fn library(&self) -> &LibraryState {
        self.library.state()
    }

    pub fn menu(&self) -> &MenuNavigator {
        &self.menu
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn backlight_on(&self) -> bool {
        self.session.backlight().is_on()
    }

    pub fn is_menu_mode(&self) -> bool {
        self.menu.is_menu_mode()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.library.state().current_track()
    }

    pub fn set_wheel_geometry(&mut self, geometry: WheelGeometry) {
        self.wheel.set_geometry(geometry);
    }

    pub fn take_dialog(&mut self) -> Option<Dialog> {
        self.dialog.take()
    }

    /// One user interaction: wakes the backlight, applies the command, then
    /// persists and re-derives whatever changed.
    pub fn dispatch(&mut self, command: Command, now_ms: u64) {
        if self.session.register_activity(now_ms) {
            self.refresh_menus();
        }
        self.apply(command, now_ms);
        self.commit(now_ms);
        self.dirty = true;
    }

    fn apply(&mut self, command: Command, now_ms: u64) {
        if matches!(
            command,
            Command::PlayPause
                | Command::NextTrack
                | Command::PreviousTrack
                | Command::ClearLibrary
                | Command::RemoveCurrent
        ) {
            self.session.supersede_playing();
        }
        match command {
            Command::OpenMenu => self.open_menu(),
            Command::Back => self.back(),
            Command::SelectUp => {
                if self.menu.select_up() {
                    self.dirty = true;
                }
            }
            Command::SelectDown => {
                if self.menu.select_down() {
                    self.dirty = true;
                }
            }
            Command::Activate => {
                if self.menu.is_menu_mode() {
                    if let Some(command) = self.menu.activate_selected() {
                        self.run_menu_command(command, now_ms);
                    }
                } else if self.session.is_full_screen() {
                    self.exit_full_screen(now_ms);
                } else {
                    self.enter_full_screen(now_ms);
                }
            }
            Command::PlayPause => {
                if self.library.state().tracks.is_empty() {
                    self.set_status("Library is empty");
                } else {
                    self.library.toggle_playing();
                }
            }
            Command::NextTrack => self.library.next_track(),
            Command::PreviousTrack => self.library.previous_track(),
            Command::ToggleShuffle => {
                self.library.toggle_shuffle();
                let label = if self.library.state().is_shuffled { "On" } else { "Off" };
                self.set_status(&format!("Shuffle {label}"));
            }
            Command::CycleRepeat => {
                self.library.cycle_repeat();
                let label = self.library.state().repeat_mode().label();
                self.set_status(&format!("Repeat {label}"));
            }
            Command::ToggleBacklight => self.toggle_backlight(now_ms),
            Command::CycleTheme => {
                self.theme = self.theme.next();
                self.persist(&[StoreKey::Theme]);
                self.refresh_menus();
                self.set_status(&format!("Theme {}", self.theme.label()));
            }
            Command::SeekForward => self.session.seek_by(self.settings.playback.seek_step_seconds),
            Command::SeekBackward => {
                self.session.seek_by(-self.settings.playback.seek_step_seconds)
            }
            Command::EnterFullScreen => self.enter_full_screen(now_ms),
            Command::ExitFullScreen => self.exit_full_screen(now_ms),
            Command::ClearLibrary => {
                self.library.clear_library();
                self.set_status("Library cleared");
            }
            Command::RemoveCurrent => {
                let index = self.library.state().current_index;
                match self.library.remove_track(index) {
                    Some(track) => self.set_status(&format!("Removed {}", track.title)),
                    None => self.set_status("Nothing to remove"),
                }
            }
            Command::NudgeLyrics(delta_ms) => {
                let index = self.library.state().current_index;
                self.library.adjust_lyric_offset(index, delta_ms);
            }
            Command::Focus => {}
        }
    }

    pub fn handle_wheel(&mut self, input: WheelInput, now_ms: u64) {
        let command = match input {
            WheelInput::Menu | WheelInput::Click(WheelZone::Top) => Command::Back,
            WheelInput::Click(WheelZone::Center) => Command::Activate,
            WheelInput::Click(WheelZone::Right) => Command::NextTrack,
            WheelInput::Click(WheelZone::Left) => Command::PreviousTrack,
            WheelInput::Click(WheelZone::Bottom) => Command::PlayPause,
            WheelInput::Rotate(rotation) => match (self.menu.is_menu_mode(), rotation) {
                (true, Rotation::Clockwise) => Command::SelectDown,
                (true, Rotation::Counterclockwise) => Command::SelectUp,
                (false, Rotation::Clockwise) => Command::SeekForward,
                (false, Rotation::Counterclockwise) => Command::SeekBackward,
            },
        };
        debug!(?input, ?command, "wheel input");
        self.dispatch(command, now_ms);
    }

    pub fn pointer_click(&mut self, x: f64, y: f64, now_ms: u64) {
        if let Some(input) = self.wheel.click(x, y) {
            self.handle_wheel(input, now_ms);
        }
    }

    pub fn pointer_scroll(&mut self, x: f64, y: f64, delta: f64, now_ms: u64) {
        if let Some(input) = self.wheel.scroll(x, y, delta) {
            self.handle_wheel(input, now_ms);
        }
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        self.wheel.touch_start(x, y);
    }

    pub fn touch_move(&mut self, x: f64, y: f64, now_ms: u64) {
        for input in self.wheel.touch_move(x, y) {
            self.handle_wheel(input, now_ms);
        }
    }

    pub fn touch_end(&mut self) {
        self.wheel.touch_end();
    }

    /// Checks the link and claims it for a lookup. `None` means the request
    /// was rejected and `status` says why.
    pub fn begin_add_track(&mut self, url: &str) -> Option<AddRequest> {
        let video_id = match lookup::extract_video_id(url) {
            Ok(id) => id,
            Err(err) => {
                self.set_status(&err.to_string());
                return None;
            }
        };
        if self.library.state().contains_id(&video_id) {
            self.set_status("Track already in library");
            return None;
        }
        self.set_status("Looking up track...");
        Some(AddRequest {
            url: url.trim().to_string(),
            video_id,
            generation: self.library.generation(),
        })
    }

    /// Returns whether the track landed in the library.
    pub fn finish_add_track(
        &mut self,
        request: AddRequest,
        result: Result<Track, LookupError>,
        now_ms: u64,
    ) -> bool {
        if request.generation != self.library.generation() {
            info!(id = %request.video_id, "dropping add for a replaced library");
            self.set_status("Library changed, add discarded");
            return false;
        }
        let track = match result {
            Ok(track) => track,
            Err(err) => {
                warn!(url = %request.url, error = %err, "add track failed");
                self.set_status(&err.to_string());
                return false;
            }
        };
        if self.library.state().contains_id(&track.id) {
            self.set_status("Track already in library");
            return false;
        }

        let title = track.title.clone();
        self.library.add_track(track);
        self.set_status(&format!("Added {title}"));
        self.commit(now_ms);
        true
    }

    pub fn add_track_blocking(
        &mut self,
        source: &dyn MetadataSource,
        url: &str,
        now_ms: u64,
    ) -> bool {
        let Some(request) = self.begin_add_track(url) else {
            return false;
        };
        let result = lookup::resolve_track(source, &request.url);
        self.finish_add_track(request, result, now_ms)
    }

    /// Feeds player events and due timers through the session.
    pub fn tick(&mut self, now_ms: u64) {
        for (slot, event) in self.session.poll_players(now_ms) {
            self.session.handle_event(slot, event, &mut self.library);
            if matches!(event, PlayerEvent::Progress(_) | PlayerEvent::Duration(_)) {
                self.dirty = true;
            }
        }
        if self.session.tick(&mut self.library, now_ms) {
            debug!(on = self.session.backlight().is_on(), "backlight idle change");
            self.refresh_menus();
            self.dirty = true;
        }
        self.commit(now_ms);
    }

    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }

    fn open_menu(&mut self) {
        let ctx = menu_context(&self.library, &self.session, self.theme);
        self.menu.enter_menu_mode(&ctx);
    }

    fn back(&mut self) {
        if !self.menu.is_menu_mode() {
            self.open_menu();
            return;
        }
        let available = !self.library.state().tracks.is_empty();
        if self.menu.go_back(available) == BackOutcome::ExitedToNowPlaying {
            self.set_status("Now Playing");
        }
    }

    fn run_menu_command(&mut self, command: MenuCommand, now_ms: u64) {
        match command {
            MenuCommand::Open(kind) => {
                let ctx = menu_context(&self.library, &self.session, self.theme);
                self.menu.push(kind, &ctx);
            }
            MenuCommand::PlayTrack { index } => {
                self.session.supersede_playing();
                self.library.play_index(index);
                if let Some(track) = self.library.state().tracks.get(index) {
                    let (id, title) = (track.id.clone(), track.title.clone());
                    self.menu.exit_after_play(id);
                    self.set_status(&format!("Playing {title}"));
                }
            }
            MenuCommand::ShowNowPlaying => {
                if self.library.state().tracks.is_empty() {
                    self.set_status("Library is empty");
                } else {
                    self.menu.show_now_playing();
                }
            }
            MenuCommand::ShuffleSongs => {
                if self.library.state().tracks.is_empty() {
                    self.set_status("Library is empty");
                } else {
                    self.session.supersede_playing();
                    self.library.shuffle_from_start();
                    self.menu.show_now_playing();
                    self.set_status("Shuffling all songs");
                }
            }
            MenuCommand::ToggleShuffle => self.apply(Command::ToggleShuffle, now_ms),
            MenuCommand::CycleRepeat => self.apply(Command::CycleRepeat, now_ms),
            MenuCommand::ToggleBacklight => self.apply(Command::ToggleBacklight, now_ms),
            MenuCommand::CycleTheme => self.apply(Command::CycleTheme, now_ms),
            MenuCommand::OpenDialog(dialog) => {
                debug!(?dialog, "dialog requested");
                self.dialog = Some(dialog);
            }
        }
    }

    fn toggle_backlight(&mut self, now_ms: u64) {
        let on = !self.session.backlight().is_on();
        self.session.set_backlight(on, now_ms);
        self.persist(&[StoreKey::Backlight]);
        self.refresh_menus();
        self.set_status(if on { "Backlight on" } else { "Backlight off" });
    }

    fn enter_full_screen(&mut self, now_ms: u64) {
        if self.session.enter_full_screen(self.library.state(), now_ms) {
            self.set_status("Full screen");
        }
    }

    fn exit_full_screen(&mut self, now_ms: u64) {
        if self.session.exit_full_screen(self.library.state(), now_ms) {
            self.set_status("Windowed");
        }
    }

    fn commit(&mut self, now_ms: u64) {
        let changes = self.library.take_changes();
        if changes.is_empty() {
            return;
        }
        let mut keys: Vec<StoreKey> = Vec::new();
        for field in &changes {
            for key in StoreKey::for_field(*field) {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        self.persist(&keys);
        self.session.sync_library(self.library.state(), now_ms);
        self.refresh_menus();
        self.dirty = true;
    }

    fn persist(&mut self, keys: &[StoreKey]) {
        if keys.is_empty() {
            return;
        }
        let snapshot = PodSnapshot {
            library: self.library.state(),
            backlight_on: self.session.backlight().is_on(),
            theme: self.theme,
        };
        storage::save_keys(self.storage.as_mut(), keys, &snapshot);
    }

    fn refresh_menus(&mut self) {
        let ctx = menu_context(&self.library, &self.session, self.theme);
        self.menu.rebuild(&ctx);
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
