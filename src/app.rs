use crate::config;
use crate::logging;
use crate::lookup::{self, LookupError, OEmbedClient};
use crate::menu::Dialog;
use crate::model::Track;
use crate::pod::{AddRequest, Command, PodCore, PodParts};
use crate::storage::JsonFileStorage;
use crate::ui::{self, PromptView};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One mouse-wheel notch, in scroll delta units.
const SCROLL_NOTCH_DELTA: f64 = 50.0;
const LYRIC_NUDGE_MS: i64 = 100;

#[derive(Debug, Default, Clone)]
pub struct AppOptions {
    pub config_dir: Option<PathBuf>,
    pub blocks_autoplay: bool,
}

type LookupResult = (AddRequest, Result<Track, LookupError>);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
    AddMusic(String),
    ConfirmClear,
}

impl Prompt {
    fn view(&self) -> PromptView {
        match self {
            Prompt::AddMusic(input) => PromptView {
                title: String::from("Add Music"),
                hint: String::from("Paste a video link. Enter add, Ctrl+V paste, Esc cancel"),
                input: Some(input.clone()),
            },
            Prompt::ConfirmClear => PromptView {
                title: String::from("Clear Library"),
                hint: String::from("Remove every track? y confirm, n cancel"),
                input: None,
            },
        }
    }
}

#[derive(Debug, Default)]
struct PointerState {
    pressed: bool,
    dragged: bool,
}

pub fn run(options: AppOptions) -> Result<()> {
    let root = match options.config_dir {
        Some(dir) => dir,
        None => config::config_root()?,
    };
    config::ensure_dir(&root)?;
    let _log_guard = logging::init(&root)?;

    let mut settings = config::load_settings(&root)?;
    settings.platform_blocks_autoplay |= options.blocks_autoplay;
    let client = OEmbedClient::new(&settings.lookup);
    let storage = JsonFileStorage::open(config::state_path(&root))
        .context("failed to open library state")?;
    info!(path = %storage.path().display(), "library state opened");

    let started = Instant::now();
    let clock = move || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut core = PodCore::new(PodParts::simulated(Box::new(storage), settings), clock());
    let (lookup_tx, lookup_rx) = mpsc::channel::<LookupResult>();

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut prompt: Option<Prompt> = None;
    let mut pointer = PointerState::default();
    let mut wheel_rect = Rect::default();
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        drain_lookups(&mut core, &lookup_rx, clock());
        core.tick(clock());
        if let Some(dialog) = core.take_dialog() {
            prompt = Some(match dialog {
                Dialog::AddMusic => Prompt::AddMusic(String::new()),
                Dialog::ClearLibrary => Prompt::ConfirmClear,
            });
            core.dirty = true;
        }

        if core.dirty || last_draw.elapsed() > Duration::from_millis(250) {
            let view = prompt.as_ref().map(Prompt::view);
            terminal.draw(|frame| {
                wheel_rect = ui::areas(frame.area()).wheel;
                ui::draw(frame, &core, view.as_ref())
            })?;
            core.set_wheel_geometry(ui::wheel_geometry(wheel_rect));
            core.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        match event::read()? {
            Event::Mouse(mouse) if prompt.is_none() => {
                handle_mouse(&mut core, &mut pointer, mouse, clock());
            }
            Event::FocusGained => core.dispatch(Command::Focus, clock()),
            Event::Paste(text) => {
                if let Some(Prompt::AddMusic(input)) = prompt.as_mut() {
                    input.push_str(text.trim());
                    core.dirty = true;
                }
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(active) = prompt.take() {
                    prompt = handle_prompt_key(&mut core, active, key, &client, &lookup_tx, clock());
                    core.dirty = true;
                    continue;
                }
                if is_quit(key) {
                    break Ok(());
                }
                match key.code {
                    KeyCode::Char('a') => {
                        prompt = Some(Prompt::AddMusic(String::new()));
                        core.dirty = true;
                    }
                    KeyCode::Char('x') => {
                        prompt = Some(Prompt::ConfirmClear);
                        core.dirty = true;
                    }
                    KeyCode::Char('f') => {
                        let command = if core.session().is_full_screen() {
                            Command::ExitFullScreen
                        } else {
                            Command::EnterFullScreen
                        };
                        core.dispatch(command, clock());
                    }
                    _ => {
                        if let Some(command) = key_command(key) {
                            core.dispatch(command, clock());
                        }
                    }
                }
            }
            _ => {}
        }
    };

    core.shutdown();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;
    info!("shutting down");
    result
}

fn is_quit(key: KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn key_command(key: KeyEvent) -> Option<Command> {
    let command = match key.code {
        KeyCode::Up => Command::SelectUp,
        KeyCode::Down => Command::SelectDown,
        KeyCode::Left => Command::PreviousTrack,
        KeyCode::Right => Command::NextTrack,
        KeyCode::Enter => Command::Activate,
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('m') => Command::Back,
        KeyCode::Char(' ') => Command::PlayPause,
        KeyCode::Char('s') => Command::ToggleShuffle,
        KeyCode::Char('r') => Command::CycleRepeat,
        KeyCode::Char('b') => Command::ToggleBacklight,
        KeyCode::Char('t') => Command::CycleTheme,
        KeyCode::Char('.') => Command::SeekForward,
        KeyCode::Char(',') => Command::SeekBackward,
        KeyCode::Char('d') => Command::RemoveCurrent,
        KeyCode::Char('[') => Command::NudgeLyrics(-LYRIC_NUDGE_MS),
        KeyCode::Char(']') => Command::NudgeLyrics(LYRIC_NUDGE_MS),
        _ => return None,
    };
    Some(command)
}

fn handle_prompt_key(
    core: &mut PodCore,
    prompt: Prompt,
    key: KeyEvent,
    client: &OEmbedClient,
    lookup_tx: &Sender<LookupResult>,
    now_ms: u64,
) -> Option<Prompt> {
    match prompt {
        Prompt::ConfirmClear => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                core.dispatch(Command::ClearLibrary, now_ms);
                None
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
            _ => Some(Prompt::ConfirmClear),
        },
        Prompt::AddMusic(mut input) => match key.code {
            KeyCode::Esc => None,
            KeyCode::Enter => {
                if let Some(request) = core.begin_add_track(&input) {
                    spawn_lookup(client.clone(), request, lookup_tx.clone());
                }
                None
            }
            KeyCode::Char('v') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                match paste_from_clipboard() {
                    Ok(text) => input.push_str(text.trim()),
                    Err(err) => core.status = format!("clipboard error: {err:#}"),
                }
                Some(Prompt::AddMusic(input))
            }
            KeyCode::Backspace => {
                input.pop();
                Some(Prompt::AddMusic(input))
            }
            KeyCode::Char(ch) => {
                input.push(ch);
                Some(Prompt::AddMusic(input))
            }
            _ => Some(Prompt::AddMusic(input)),
        },
    }
}

fn paste_from_clipboard() -> Result<String> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
    clipboard.get_text().context("clipboard holds no text")
}

fn spawn_lookup(client: OEmbedClient, request: AddRequest, tx: Sender<LookupResult>) {
    thread::spawn(move || {
        let result = lookup::resolve_track(&client, &request.url);
        if tx.send((request, result)).is_err() {
            warn!("lookup finished after shutdown");
        }
    });
}

fn drain_lookups(core: &mut PodCore, rx: &Receiver<LookupResult>, now_ms: u64) {
    while let Ok((request, result)) = rx.try_recv() {
        core.finish_add_track(request, result, now_ms);
    }
}

fn handle_mouse(core: &mut PodCore, pointer: &mut PointerState, mouse: MouseEvent, now_ms: u64) {
    let (x, y) = ui::pointer_position(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            pointer.pressed = true;
            pointer.dragged = false;
            core.touch_start(x, y);
        }
        MouseEventKind::Drag(MouseButton::Left) if pointer.pressed => {
            pointer.dragged = true;
            core.touch_move(x, y, now_ms);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if pointer.pressed && !pointer.dragged {
                core.pointer_click(x, y, now_ms);
            }
            pointer.pressed = false;
            pointer.dragged = false;
            core.touch_end();
        }
        MouseEventKind::ScrollDown => core.pointer_scroll(x, y, SCROLL_NOTCH_DELTA, now_ms),
        MouseEventKind::ScrollUp => core.pointer_scroll(x, y, -SCROLL_NOTCH_DELTA, now_ms),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LookupSettings, Settings};
    use crate::storage::MemoryStorage;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn core() -> PodCore {
        PodCore::new(
            PodParts::simulated(Box::new(MemoryStorage::new()), Settings::default()),
            0,
        )
    }

    #[test]
    fn keys_map_onto_wheel_commands() {
        assert_eq!(key_command(key(KeyCode::Down)), Some(Command::SelectDown));
        assert_eq!(key_command(key(KeyCode::Esc)), Some(Command::Back));
        assert_eq!(key_command(key(KeyCode::Char(']'))), Some(Command::NudgeLyrics(100)));
        assert_eq!(key_command(key(KeyCode::Char('z'))), None);
        assert!(is_quit(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn add_prompt_edits_and_rejects_bad_links() {
        let mut core = core();
        let client = OEmbedClient::new(&LookupSettings::default());
        let (tx, rx) = mpsc::channel();

        let mut prompt = Some(Prompt::AddMusic(String::new()));
        for ch in "nope!".chars() {
            prompt = handle_prompt_key(&mut core, prompt.expect("open"), key(KeyCode::Char(ch)), &client, &tx, 0);
        }
        prompt = handle_prompt_key(&mut core, prompt.expect("open"), key(KeyCode::Backspace), &client, &tx, 0);
        assert_eq!(prompt, Some(Prompt::AddMusic(String::from("nope"))));

        let closed = handle_prompt_key(&mut core, prompt.expect("open"), key(KeyCode::Enter), &client, &tx, 0);
        assert_eq!(closed, None);
        assert!(core.status.contains("not a recognizable video link"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clear_prompt_needs_confirmation() {
        let mut core = core();
        let client = OEmbedClient::new(&LookupSettings::default());
        let (tx, _rx) = mpsc::channel();

        let kept = handle_prompt_key(&mut core, Prompt::ConfirmClear, key(KeyCode::Char('k')), &client, &tx, 0);
        assert_eq!(kept, Some(Prompt::ConfirmClear));
        let done = handle_prompt_key(&mut core, Prompt::ConfirmClear, key(KeyCode::Char('y')), &client, &tx, 0);
        assert_eq!(done, None);
        assert_eq!(core.status, "Library cleared");
    }
}
