use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::Song;

/// Frames cycled by the loading indicator.
const SPINNER_FRAMES: &[&str] = &["|", "/", "-", "\\"];

/// Prefix of the link line on every card.
pub(crate) const LISTEN_PREFIX: &str = "Listen: ";

/// Build the text of one song card: name, artist, optional album, optional
/// genre/year tags, and the link.
pub(crate) fn song_card_lines(song: &Song, selected: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::with_capacity(5);

    let name = if selected {
        format!("▶ {}", song.name)
    } else {
        song.name.clone()
    };
    lines.push(Line::from(Span::styled(
        name,
        Style::default().add_modifier(Modifier::BOLD),
    )));

    lines.push(Line::from(Span::styled(
        song.artist.clone(),
        Style::default().fg(Color::Gray),
    )));

    if let Some(album) = song.album_text() {
        lines.push(Line::from(Span::styled(
            format!("Album: {album}"),
            Style::default().fg(Color::Gray),
        )));
    }

    let mut tags = Vec::new();
    if let Some(genre) = song.genre_text() {
        tags.push(format!("[{genre}]"));
    }
    if let Some(year) = song.year {
        tags.push(format!("[{year}]"));
    }
    if !tags.is_empty() {
        lines.push(Line::from(Span::styled(
            tags.join(" "),
            Style::default().fg(Color::Magenta),
        )));
    }

    lines.push(Line::from(Span::styled(
        format!("{LISTEN_PREFIX}{}", song.url.trim()),
        Style::default().fg(Color::Cyan),
    )));

    lines
}

/// Frame of the loading indicator for the given tick.
pub(crate) fn spinner_frame(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
