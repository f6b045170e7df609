use crate::model::{LibraryState, Theme, Track};
use std::cmp::Ordering;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const ROOT_TITLE: &str = "iPod";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Root,
    Music,
    AllSongs,
    Artist(String),
    Extras,
    Settings,
}

impl ScreenKind {
    pub fn title(&self) -> &str {
        match self {
            Self::Root => ROOT_TITLE,
            Self::Music => "Music",
            Self::AllSongs => "All Songs",
            Self::Artist(name) => name,
            Self::Extras => "Extras",
            Self::Settings => "Settings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    AddMusic,
    ClearLibrary,
}

/// What activating a menu item does. Interpreted by the owner of the
/// navigator; menu data never carries behaviour of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    Open(ScreenKind),
    PlayTrack { index: usize },
    ShowNowPlaying,
    ShuffleSongs,
    ToggleShuffle,
    CycleRepeat,
    ToggleBacklight,
    CycleTheme,
    OpenDialog(Dialog),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub command: MenuCommand,
    pub show_chevron: bool,
    pub value: Option<String>,
}

impl MenuItem {
    fn submenu(label: impl Into<String>, kind: ScreenKind) -> Self {
        Self {
            label: label.into(),
            command: MenuCommand::Open(kind),
            show_chevron: true,
            value: None,
        }
    }

    fn action(label: impl Into<String>, command: MenuCommand) -> Self {
        Self {
            label: label.into(),
            command,
            show_chevron: false,
            value: None,
        }
    }

    fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn with_chevron(mut self) -> Self {
        self.show_chevron = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuScreen {
    pub kind: ScreenKind,
    pub title: String,
    pub items: Vec<MenuItem>,
    pub selected_index: usize,
}

impl MenuScreen {
    pub fn selected_item(&self) -> Option<&MenuItem> {
        self.items.get(self.selected_index)
    }

    fn position_of(&self, command: &MenuCommand) -> Option<usize> {
        self.items.iter().position(|item| item.command == *command)
    }

    fn clamp_selection(&mut self) {
        self.selected_index = clamp(self.selected_index, self.items.len());
    }
}

/// Everything a screen's content is derived from.
#[derive(Debug, Clone, Copy)]
pub struct MenuContext<'a> {
    pub library: &'a LibraryState,
    pub backlight_on: bool,
    pub theme: Theme,
}

fn on_off(flag: bool) -> &'static str {
    if flag { "On" } else { "Off" }
}

/// Builds a screen from scratch with nothing selected yet.
pub fn build_screen(kind: &ScreenKind, ctx: &MenuContext<'_>) -> MenuScreen {
    let library = ctx.library;
    let items = match kind {
        ScreenKind::Root => vec![
            MenuItem::submenu("Music", ScreenKind::Music),
            MenuItem::submenu("Extras", ScreenKind::Extras),
            MenuItem::submenu("Settings", ScreenKind::Settings),
            MenuItem::action("Shuffle Songs", MenuCommand::ShuffleSongs),
            MenuItem::action("Backlight", MenuCommand::ToggleBacklight)
                .with_value(on_off(ctx.backlight_on)),
            MenuItem::action("Now Playing", MenuCommand::ShowNowPlaying).with_chevron(),
        ],
        ScreenKind::Music => {
            let mut items = vec![MenuItem::submenu("All Songs", ScreenKind::AllSongs)];
            items.extend(
                artist_names(&library.tracks)
                    .into_iter()
                    .map(|artist| MenuItem::submenu(artist.clone(), ScreenKind::Artist(artist))),
            );
            items
        }
        ScreenKind::AllSongs => library
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| track_item(track, index))
            .collect(),
        ScreenKind::Artist(artist) => library
            .original_order
            .iter()
            .filter(|track| track.artist_label() == artist)
            .filter_map(|track| {
                library
                    .position_of(&track.id)
                    .map(|index| track_item(track, index))
            })
            .collect(),
        ScreenKind::Extras => vec![
            MenuItem::action("Add Music", MenuCommand::OpenDialog(Dialog::AddMusic)),
            MenuItem::action("Clear Library", MenuCommand::OpenDialog(Dialog::ClearLibrary)),
        ],
        ScreenKind::Settings => vec![
            MenuItem::action("Repeat", MenuCommand::CycleRepeat)
                .with_value(library.repeat_mode().label()),
            MenuItem::action("Shuffle", MenuCommand::ToggleShuffle)
                .with_value(on_off(library.is_shuffled)),
            MenuItem::action("Backlight", MenuCommand::ToggleBacklight)
                .with_value(on_off(ctx.backlight_on)),
            MenuItem::action("Theme", MenuCommand::CycleTheme).with_value(ctx.theme.label()),
        ],
    };

    MenuScreen {
        title: kind.title().to_string(),
        kind: kind.clone(),
        items,
        selected_index: 0,
    }
}

fn track_item(track: &Track, index: usize) -> MenuItem {
    MenuItem::action(track.title.clone(), MenuCommand::PlayTrack { index })
}

/// Distinct artist labels, ordered ignoring case and accents.
pub fn artist_names(tracks: &[Track]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for track in tracks {
        let label = track.artist_label();
        if !names.iter().any(|name| name == label) {
            names.push(label.to_string());
        }
    }
    names.sort_by(|a, b| compare_names(a, b));
    names
}

fn compare_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

fn sort_key(name: &str) -> String {
    name.nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

fn clamp(index: usize, len: usize) -> usize {
    if len == 0 { 0 } else { index.min(len - 1) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    Popped,
    ExitedToNowPlaying,
    Stayed,
}

/// The submenu chain a track was played from, minus the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedPath {
    pub screens: Vec<ScreenKind>,
    pub track_id: String,
}

impl PlayedPath {
    pub fn titles(&self) -> Vec<String> {
        self.screens
            .iter()
            .map(|kind| kind.title().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resume {
    Root { selected: usize },
    Played(PlayedPath),
}

/// Menu history stack. Menu mode is exactly "history is non-empty".
#[derive(Debug, Clone)]
pub struct MenuNavigator {
    history: Vec<MenuScreen>,
    direction: TransitionDirection,
    resume: Resume,
    came_from_now_playing_item: bool,
}

impl Default for MenuNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuNavigator {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
            direction: TransitionDirection::Forward,
            resume: Resume::Root { selected: 0 },
            came_from_now_playing_item: false,
        }
    }

    pub fn is_menu_mode(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn history(&self) -> &[MenuScreen] {
        &self.history
    }

    pub fn current(&self) -> Option<&MenuScreen> {
        self.history.last()
    }

    pub fn direction(&self) -> TransitionDirection {
        self.direction
    }

    pub fn came_from_now_playing_item(&self) -> bool {
        self.came_from_now_playing_item
    }

    pub fn last_played_path(&self) -> Option<&PlayedPath> {
        match &self.resume {
            Resume::Played(path) => Some(path),
            Resume::Root { .. } => None,
        }
    }

    pub fn path_titles(&self) -> Vec<String> {
        self.history.iter().map(|screen| screen.title.clone()).collect()
    }

    /// Returns false if already in menu mode.
    pub fn enter_menu_mode(&mut self, ctx: &MenuContext<'_>) -> bool {
        if self.is_menu_mode() {
            return false;
        }
        let mut root = build_screen(&ScreenKind::Root, ctx);
        match self.resume.clone() {
            Resume::Played(path) => {
                self.history = restore_path(root, &path, ctx);
            }
            Resume::Root { selected } => {
                root.selected_index = clamp(selected, root.items.len());
                self.history = vec![root];
            }
        }
        self.came_from_now_playing_item = false;
        self.direction = TransitionDirection::Backward;
        debug!(path = ?self.path_titles(), "entered menu mode");
        true
    }

    pub fn push(&mut self, kind: ScreenKind, ctx: &MenuContext<'_>) {
        if !self.is_menu_mode() {
            return;
        }
        debug!(screen = kind.title(), "push screen");
        self.history.push(build_screen(&kind, ctx));
        self.direction = TransitionDirection::Forward;
    }

    /// Clamped. Returns whether the selection moved.
    pub fn select_item(&mut self, index: usize) -> bool {
        let Some(screen) = self.history.last_mut() else {
            return false;
        };
        let index = clamp(index, screen.items.len());
        let moved = index != screen.selected_index;
        screen.selected_index = index;
        moved
    }

    pub fn select_up(&mut self) -> bool {
        let index = self
            .current()
            .map(|screen| screen.selected_index.saturating_sub(1))
            .unwrap_or(0);
        self.select_item(index)
    }

    pub fn select_down(&mut self) -> bool {
        let index = self
            .current()
            .map(|screen| screen.selected_index.saturating_add(1))
            .unwrap_or(0);
        self.select_item(index)
    }

    /// The selected item's command; `None` on an empty screen.
    pub fn activate_selected(&self) -> Option<MenuCommand> {
        self.current()
            .and_then(MenuScreen::selected_item)
            .map(|item| item.command.clone())
    }

    pub fn go_back(&mut self, now_playing_available: bool) -> BackOutcome {
        match self.history.len() {
            0 => BackOutcome::Stayed,
            1 if now_playing_available => {
                let selected = self.history[0].selected_index;
                self.history.clear();
                self.resume = Resume::Root { selected };
                self.came_from_now_playing_item = false;
                self.direction = TransitionDirection::Forward;
                debug!("left root menu for now playing");
                BackOutcome::ExitedToNowPlaying
            }
            1 => BackOutcome::Stayed,
            _ => {
                self.history.pop();
                self.direction = TransitionDirection::Backward;
                BackOutcome::Popped
            }
        }
    }

    /// Leaves menu mode after a track was chosen, remembering where from.
    pub fn exit_after_play(&mut self, track_id: impl Into<String>) {
        let path = PlayedPath {
            screens: self
                .history
                .iter()
                .skip(1)
                .map(|screen| screen.kind.clone())
                .collect(),
            track_id: track_id.into(),
        };
        debug!(path = ?path.titles(), "exit menu after play");
        self.resume = Resume::Played(path);
        self.came_from_now_playing_item = false;
        self.history.clear();
        self.direction = TransitionDirection::Forward;
    }

    /// Leaves menu mode from a root item. The next entry lands on the root
    /// again, whatever was played before.
    pub fn show_now_playing(&mut self) {
        let selected = self
            .history
            .first()
            .map(|root| root.selected_index)
            .unwrap_or(0);
        self.resume = Resume::Root { selected };
        self.came_from_now_playing_item = true;
        self.history.clear();
        self.direction = TransitionDirection::Forward;
    }

    /// Re-derives every screen in the stack in place, keeping selections.
    pub fn rebuild(&mut self, ctx: &MenuContext<'_>) {
        for screen in &mut self.history {
            let fresh = build_screen(&screen.kind, ctx);
            screen.title = fresh.title;
            screen.items = fresh.items;
            screen.clamp_selection();
        }
    }
}

fn restore_path(mut root: MenuScreen, path: &PlayedPath, ctx: &MenuContext<'_>) -> Vec<MenuScreen> {
    if ctx.library.tracks.is_empty() {
        return vec![root];
    }
    root.selected_index = root
        .position_of(&MenuCommand::Open(ScreenKind::Music))
        .unwrap_or(0);
    let mut screens = vec![root];

    for kind in &path.screens {
        let next = {
            let Some(parent) = screens.last_mut() else {
                break;
            };
            let wanted = MenuCommand::Open(kind.clone());
            let fallback = MenuCommand::Open(ScreenKind::AllSongs);
            let found = parent
                .position_of(&wanted)
                .map(|pos| (kind.clone(), pos))
                .or_else(|| {
                    parent
                        .position_of(&fallback)
                        .map(|pos| (ScreenKind::AllSongs, pos))
                });
            match found {
                Some((kind, pos)) => {
                    parent.selected_index = pos;
                    kind
                }
                None => break,
            }
        };
        let fell_back = next != *kind;
        screens.push(build_screen(&next, ctx));
        if fell_back {
            break;
        }
    }

    if screens.len() > 1
        && let Some(index) = ctx.library.position_of(&path.track_id)
        && let Some(last) = screens.last_mut()
        && let Some(pos) = last.position_of(&MenuCommand::PlayTrack { index })
    {
        last.selected_index = pos;
    }
    screens
}
