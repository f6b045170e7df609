use crate::menu::MenuScreen;
use crate::model::Theme;
use crate::pod::PodCore;
use crate::wheel::WheelGeometry;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "podwheel  ";
/// Terminal cells are roughly twice as tall as they are wide.
pub const CELL_ASPECT: f64 = 2.0;

/// A modal text prompt or confirmation drawn over the screen.
pub struct PromptView {
    pub title: String,
    pub hint: String,
    pub input: Option<String>,
}

#[derive(Clone, Copy)]
struct ThemePalette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    selected_bg: Color,
    selected_fg: Color,
    wheel_bg: Color,
    wheel_text: Color,
}

fn palette(theme: Theme, backlight_on: bool) -> ThemePalette {
    let lit = match theme {
        Theme::Classic => ThemePalette {
            bg: Color::Rgb(226, 228, 232),
            panel_bg: Color::Rgb(198, 216, 228),
            border: Color::Rgb(92, 104, 116),
            text: Color::Rgb(18, 22, 28),
            muted: Color::Rgb(84, 94, 106),
            accent: Color::Rgb(28, 96, 176),
            selected_bg: Color::Rgb(52, 112, 196),
            selected_fg: Color::Rgb(250, 250, 250),
            wheel_bg: Color::Rgb(244, 244, 246),
            wheel_text: Color::Rgb(140, 144, 152),
        },
        Theme::Black => ThemePalette {
            bg: Color::Rgb(12, 12, 12),
            panel_bg: Color::Rgb(176, 196, 210),
            border: Color::Rgb(70, 70, 70),
            text: Color::Rgb(16, 20, 24),
            muted: Color::Rgb(72, 80, 90),
            accent: Color::Rgb(24, 84, 160),
            selected_bg: Color::Rgb(40, 96, 176),
            selected_fg: Color::Rgb(245, 245, 245),
            wheel_bg: Color::Rgb(28, 28, 28),
            wheel_text: Color::Rgb(200, 200, 200),
        },
        Theme::U2 => ThemePalette {
            bg: Color::Rgb(8, 8, 8),
            panel_bg: Color::Rgb(176, 196, 210),
            border: Color::Rgb(160, 24, 24),
            text: Color::Rgb(16, 20, 24),
            muted: Color::Rgb(72, 80, 90),
            accent: Color::Rgb(176, 20, 20),
            selected_bg: Color::Rgb(176, 20, 20),
            selected_fg: Color::Rgb(250, 250, 250),
            wheel_bg: Color::Rgb(196, 18, 18),
            wheel_text: Color::Rgb(20, 20, 20),
        },
    };
    if backlight_on {
        lit
    } else {
        ThemePalette {
            panel_bg: Color::Rgb(96, 104, 110),
            selected_bg: Color::Rgb(60, 66, 72),
            ..lit
        }
    }
}

pub struct Areas {
    pub header: Rect,
    pub screen: Rect,
    pub wheel: Rect,
    pub footer: Rect,
}

pub fn areas(area: Rect) -> Areas {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(vertical[1]);

    Areas {
        header: vertical[0],
        screen: body[0],
        wheel: body[1],
        footer: vertical[2],
    }
}

/// Wheel geometry in pointer space: columns as-is, rows scaled by
/// [`CELL_ASPECT`].
pub fn wheel_geometry(rect: Rect) -> WheelGeometry {
    let center_x = f64::from(rect.x) + f64::from(rect.width) / 2.0;
    let center_y = (f64::from(rect.y) + f64::from(rect.height) / 2.0) * CELL_ASPECT;
    let radius = (f64::from(rect.width) / 2.0)
        .min(f64::from(rect.height) * CELL_ASPECT / 2.0)
        .max(1.0)
        - 1.0;
    WheelGeometry::centered(center_x, center_y, radius.max(1.0))
}

pub fn pointer_position(column: u16, row: u16) -> (f64, f64) {
    (f64::from(column) + 0.5, (f64::from(row) + 0.5) * CELL_ASPECT)
}

pub fn draw(frame: &mut Frame, core: &PodCore, prompt: Option<&PromptView>) {
    let colors = palette(core.theme(), core.backlight_on());
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );
    let areas = areas(frame.area());

    let library = core.library();
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", library.tracks.len()),
            Style::default().fg(colors.text),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            format!(
                "Repeat {}  Shuffle {}",
                library.repeat_mode().label(),
                if library.is_shuffled { "On" } else { "Off" }
            ),
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(
            if library.is_playing { "Playing" } else { "Paused" },
            Style::default().fg(colors.accent),
        ),
    ]))
    .block(panel_block("Status", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(header, areas.header);

    match core.menu().current() {
        Some(screen) => draw_menu(frame, screen, areas.screen, &colors),
        None => draw_now_playing(frame, core, areas.screen, &colors),
    }
    draw_wheel(frame, areas.wheel, &colors);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Keys: arrows/wheel scroll, Enter select, Esc menu, Space play, a add, q quit",
            Style::default().fg(colors.muted),
        ),
        Span::styled("  |  ", Style::default().fg(colors.muted)),
        Span::styled(core.status.as_str(), Style::default().fg(colors.text)),
    ]))
    .block(panel_block("Message", colors.panel_bg, colors.text, colors.border));
    frame.render_widget(footer, areas.footer);

    if let Some(prompt) = prompt {
        draw_prompt(frame, prompt, &colors);
    }
}

fn draw_menu(frame: &mut Frame, screen: &MenuScreen, area: Rect, colors: &ThemePalette) {
    let width = usize::from(area.width.saturating_sub(6));
    let items: Vec<ListItem> = screen
        .items
        .iter()
        .map(|item| {
            let trailer = match (&item.value, item.show_chevron) {
                (Some(value), _) => value.clone(),
                (None, true) => String::from(">"),
                (None, false) => String::new(),
            };
            let gap = width.saturating_sub(item.label.chars().count() + trailer.chars().count());
            ListItem::new(Line::from(vec![
                Span::styled(item.label.as_str(), Style::default().fg(colors.text)),
                Span::raw(" ".repeat(gap)),
                Span::styled(trailer, Style::default().fg(colors.muted)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select((!screen.items.is_empty()).then_some(screen.selected_index));

    let list = List::new(items)
        .block(panel_block(&screen.title, colors.panel_bg, colors.text, colors.border))
        .highlight_style(
            Style::default()
                .bg(colors.selected_bg)
                .fg(colors.selected_fg)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_now_playing(frame: &mut Frame, core: &PodCore, area: Rect, colors: &ThemePalette) {
    let library = core.library();
    let session = core.session();
    let title = if session.is_full_screen() { "Video" } else { "Now Playing" };

    let mut lines = Vec::new();
    match core.current_track() {
        Some(track) => {
            lines.push(Line::from(Span::styled(
                format!("{} of {}", library.current_index + 1, library.tracks.len()),
                Style::default().fg(colors.muted),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                track.title.as_str(),
                Style::default()
                    .fg(colors.text)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                track.artist_label(),
                Style::default().fg(colors.text),
            )));
            if let Some(album) = &track.album {
                lines.push(Line::from(Span::styled(
                    album.as_str(),
                    Style::default().fg(colors.muted),
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                timeline_line(
                    session.elapsed_seconds(),
                    session.total_seconds(),
                    usize::from(area.width.saturating_sub(20)).max(4),
                ),
                Style::default().fg(colors.accent),
            )));
            if let Some(offset) = track.lyric_offset_ms.filter(|offset| *offset != 0) {
                lines.push(Line::from(Span::styled(
                    format!("Lyrics offset {offset:+} ms"),
                    Style::default().fg(colors.muted),
                )));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "No tracks. Extras > Add Music",
            Style::default().fg(colors.muted),
        ))),
    }

    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(panel_block(title, colors.panel_bg, colors.text, colors.border))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn draw_wheel(frame: &mut Frame, area: Rect, colors: &ThemePalette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border))
        .style(Style::default().bg(colors.wheel_bg));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = usize::from(inner.height);
    let label = Style::default()
        .fg(colors.wheel_text)
        .add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line> = (0..rows).map(|_| Line::from("")).collect();
    if rows >= 3 {
        let middle = rows / 2;
        lines[0] = Line::from(Span::styled("MENU", label));
        lines[middle] = Line::from(vec![
            Span::styled("|<<", label),
            Span::raw(" ".repeat(usize::from(inner.width / 3))),
            Span::styled("( )", label),
            Span::raw(" ".repeat(usize::from(inner.width / 3))),
            Span::styled(">>|", label),
        ]);
        lines[rows - 1] = Line::from(Span::styled(">||", label));
    }
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn draw_prompt(frame: &mut Frame, prompt: &PromptView, colors: &ThemePalette) {
    let popup = centered_rect(frame.area(), 62, 30);
    frame.render_widget(Clear, popup);

    let mut lines = Vec::new();
    if let Some(input) = &prompt.input {
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(colors.accent)),
            Span::styled(input.as_str(), Style::default().fg(colors.text)),
        ]));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        prompt.hint.as_str(),
        Style::default().fg(colors.muted),
    )));

    let body = Paragraph::new(lines)
        .block(panel_block(&prompt.title, colors.panel_bg, colors.text, colors.border))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, popup);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(elapsed: f64, total: f64, width: usize) -> String {
    let elapsed = elapsed.max(0.0);
    let ratio = (total > 0.0).then(|| (elapsed / total).clamp(0.0, 1.0));
    format!(
        "{} {} {}",
        format_duration(Duration::from_secs_f64(elapsed)),
        progress_bar(ratio, width),
        if total > 0.0 {
            format!("-{}", format_duration(Duration::from_secs_f64((total - elapsed).max(0.0))))
        } else {
            String::from("--:--")
        }
    )
}
