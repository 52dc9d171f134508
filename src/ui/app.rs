use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use log::{error, info, warn};
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::{ApiError, Request, Response};
use crate::models::{HealthReport, Song};

use super::fetcher::Fetcher;
use super::forms::{ConfirmSongDelete, FormMode, SongField, SongForm};
use super::helpers::{centered_rect, song_card_lines, spinner_frame, surface_error};
use super::screens::SongList;

/// Header space for the title and API indicator.
const HEADER_HEIGHT: u16 = 3;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of one song card: up to five text lines plus borders.
const SONG_CARD_HEIGHT: u16 = 7;
const SAVE_ERROR: &str = "Could not save the song.";
const DELETE_ERROR: &str = "Could not delete the song.";

/// Overlay states on top of the song list. At most one popup is interactive.
#[derive(Debug)]
enum Mode {
    Normal,
    Form(SongForm),
    ConfirmDelete(ConfirmSongDelete),
    /// Blocking message. Dismissing it restores `resume`.
    Alert {
        message: String,
        resume: Box<Mode>,
    },
}

impl Mode {
    /// The slot holding the form whose save is in flight, looking beneath any
    /// alerts stacked on top of it.
    fn pending_save(&mut self) -> Option<&mut Mode> {
        let pending = match &*self {
            Mode::Form(form) => form.submitting,
            Mode::Alert { .. } => false,
            _ => return None,
        };
        if pending {
            return Some(self);
        }
        match self {
            Mode::Alert { resume, .. } => resume.pending_save(),
            _ => None,
        }
    }
}

/// Last known answer from the API's health probe.
#[derive(Debug, PartialEq, Eq)]
enum ApiHealth {
    Unknown,
    Healthy,
    Unhealthy,
    Unreachable,
}

impl ApiHealth {
    fn label(&self) -> (&'static str, Color) {
        match self {
            ApiHealth::Unknown => ("checking", Color::DarkGray),
            ApiHealth::Healthy => ("healthy", Color::Green),
            ApiHealth::Unhealthy => ("unhealthy", Color::Red),
            ApiHealth::Unreachable => ("unreachable", Color::Red),
        }
    }
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// The song manager: list state, the draft form, and the fetcher that talks
/// to the API through the request worker.
pub struct App {
    fetcher: Fetcher,
    list: SongList,
    api_url: String,
    health: ApiHealth,
    mode: Mode,
    status: Option<StatusMessage>,
    tick: usize,
}

impl App {
    pub fn new(requests: UnboundedSender<Request>, api_url: impl Into<String>) -> Self {
        Self {
            fetcher: Fetcher::new(requests),
            list: SongList::default(),
            api_url: api_url.into(),
            health: ApiHealth::Unknown,
            mode: Mode::Normal,
            status: None,
            tick: 0,
        }
    }

    /// Kick off the initial fetch and health probe.
    pub fn start(&mut self) -> Result<()> {
        self.refresh()
    }

    /// Advance animations. Called once per loop iteration.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Form(form) => self.handle_form_key(code, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::Alert { message, resume } => match code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => *resume,
                _ => Mode::Alert { message, resume },
            },
        };

        Ok(exit)
    }

    /// Ctrl-C and Ctrl-Q quit from anywhere, even while a save is in flight.
    pub fn handle_ctrl_key(&self, code: KeyCode) -> bool {
        matches!(code, KeyCode::Char('c') | KeyCode::Char('q'))
    }

    /// Apply the outcome of a request issued earlier.
    pub fn handle_response(&mut self, response: Response) -> Result<()> {
        match response {
            Response::Loaded { generation, result } => {
                if let Some(songs) = self.fetcher.finish_load(generation, result) {
                    self.list.replace(songs);
                }
            }
            Response::Created(result) => self.finish_save(result, "created")?,
            Response::Updated(result) => self.finish_save(result, "updated")?,
            Response::Deleted { id, result } => match result {
                Ok(()) => {
                    info!("deleted song {id}");
                    self.fetcher.load_all()?;
                    self.set_status("Song deleted.", StatusKind::Info);
                }
                Err(err) => {
                    error!("failed to delete song {id}: {:#}", anyhow::Error::from(err));
                    self.clear_status();
                    self.raise_alert(DELETE_ERROR);
                }
            },
            Response::Health(result) => self.record_health(result),
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.list.move_selection(-1),
            KeyCode::Down => self.list.move_selection(1),
            KeyCode::PageUp => self.list.move_selection(-5),
            KeyCode::PageDown => self.list.move_selection(5),
            KeyCode::Home => self.list.select_first(),
            KeyCode::End => self.list.select_last(),
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.clear_status();
                self.refresh()?;
            }
            KeyCode::Char('+') | KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                return Ok(Mode::Form(SongForm::for_create()));
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                if let Some(song) = self.selected_song().cloned() {
                    self.clear_status();
                    return Ok(Mode::Form(SongForm::for_edit(&song)));
                }
                self.set_status("No song selected to edit.", StatusKind::Error);
            }
            KeyCode::Char('-') | KeyCode::Char('d') | KeyCode::Char('D') => {
                if let Some(song) = self.selected_song().cloned() {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(ConfirmSongDelete { song }));
                }
                self.set_status("No song selected to delete.", StatusKind::Error);
            }
            KeyCode::Enter => {
                if let Some(song) = self.selected_song().cloned() {
                    let link = song.url.trim().to_string();
                    if link.is_empty() {
                        self.set_status("This song does not have a link.", StatusKind::Error);
                    } else if let Err(err) = open_link(&link) {
                        warn!("failed to open {link}: {err}");
                        self.set_status(format!("Failed to open link: {err}"), StatusKind::Error);
                    } else {
                        self.set_status(
                            format!("Opened {}.", song.display_title()),
                            StatusKind::Info,
                        );
                    }
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form_key(&mut self, code: KeyCode, mut form: SongForm) -> Result<Mode> {
        if form.submitting {
            if code == KeyCode::Esc {
                self.set_status(
                    "Form closed; the pending save may still finish.",
                    StatusKind::Info,
                );
                return Ok(Mode::Normal);
            }
            return Ok(Mode::Form(form));
        }

        match code {
            KeyCode::Esc => {
                self.set_status("Changes discarded.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => return self.submit_form(form),
            KeyCode::Char(ch) => {
                form.push_char(ch);
            }
            _ => {}
        }
        Ok(Mode::Form(form))
    }

    /// Validate the draft and dispatch a create or update. The popup stays up,
    /// ignoring everything but Esc, until the response arrives.
    fn submit_form(&mut self, mut form: SongForm) -> Result<Mode> {
        match form.to_payload() {
            Ok(payload) => {
                match form.mode() {
                    FormMode::Create => self.fetcher.create(payload)?,
                    FormMode::Edit(id) => self.fetcher.update(id, payload)?,
                }
                form.submitting = true;
                form.error = None;
                self.set_status("Saving...", StatusKind::Info);
            }
            Err(err) => {
                let message = surface_error(&err);
                form.error = Some(message.clone());
                self.set_status(message, StatusKind::Error);
            }
        }
        Ok(Mode::Form(form))
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmSongDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.fetcher.remove(confirm.song.id)?;
                self.set_status(
                    format!("Deleting {}...", confirm.song.display_title()),
                    StatusKind::Info,
                );
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn finish_save(&mut self, result: Result<Song, ApiError>, verb: &str) -> Result<()> {
        match result {
            Ok(song) => {
                info!("{verb} song {} ({})", song.id, song.display_title());
                self.fetcher.load_all()?;
                if let Some(slot) = self.mode.pending_save() {
                    *slot = Mode::Normal;
                }
                self.set_status(
                    format!("Song {verb}: {}.", song.display_title()),
                    StatusKind::Info,
                );
            }
            Err(err) => {
                error!("failed to save song: {:#}", anyhow::Error::from(err));
                match self.mode.pending_save() {
                    Some(Mode::Form(form)) => {
                        form.submitting = false;
                        self.clear_status();
                        self.raise_alert(SAVE_ERROR);
                    }
                    _ => self.set_status(SAVE_ERROR, StatusKind::Error),
                }
            }
        }
        Ok(())
    }

    fn record_health(&mut self, result: Result<HealthReport, ApiError>) {
        self.health = match result {
            Ok(report) if report.is_healthy() => ApiHealth::Healthy,
            Ok(report) => {
                warn!(
                    "API reports {}: {}",
                    report.status,
                    report.error.as_deref().unwrap_or("no detail")
                );
                ApiHealth::Unhealthy
            }
            Err(err) => {
                warn!("health check failed: {:#}", anyhow::Error::from(err));
                ApiHealth::Unreachable
            }
        };
    }

    fn refresh(&mut self) -> Result<()> {
        self.fetcher.load_all()?;
        self.fetcher.check_health()
    }

    /// Show a blocking message over whatever is currently open.
    fn raise_alert(&mut self, message: &str) {
        let resume = mem::replace(&mut self.mode, Mode::Normal);
        self.mode = Mode::Alert {
            message: message.to_string(),
            resume: Box::new(resume),
        };
    }

    /// Cards are only actionable while the list itself is on screen.
    fn selected_song(&self) -> Option<&Song> {
        if self.fetcher.is_loading() || self.fetcher.error().is_some() {
            None
        } else {
            self.list.current_song()
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT.min(area.height)),
                Constraint::Min(0),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_content(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
        self.draw_overlay(frame, area, &self.mode);
    }

    fn draw_overlay(&self, frame: &mut Frame, area: Rect, mode: &Mode) {
        match mode {
            Mode::Normal => {}
            Mode::Form(form) => self.draw_song_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::Alert { message, resume } => {
                self.draw_overlay(frame, area, resume);
                self.draw_alert(frame, area, message);
            }
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::BOTTOM);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (health, color) = self.health.label();
        let lines = vec![
            Line::from(vec![
                Span::styled(
                    "Favorite Songs",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {} songs", self.list.songs.len()),
                    Style::default().fg(Color::Gray),
                ),
            ]),
            Line::from(vec![
                Span::styled(
                    format!("API {} ", self.api_url),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(health, Style::default().fg(color)),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_content(&self, frame: &mut Frame, area: Rect) {
        if self.fetcher.is_loading() {
            let message = Paragraph::new(format!(
                "{} Loading songs...",
                spinner_frame(self.tick)
            ))
            .alignment(Alignment::Center);
            frame.render_widget(message, area);
            return;
        }

        if let Some(message) = self.fetcher.error() {
            let popup = centered_rect(70, 40, area);
            let block = Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red));
            let lines = vec![
                Line::from(message.to_string()),
                Line::from(""),
                Line::from(Span::styled(
                    "[r] Retry",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
            ];
            let panel = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(panel, popup);
            return;
        }

        if self.list.songs.is_empty() {
            let message = Paragraph::new("No songs yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::NONE));
            frame.render_widget(message, area);
            return;
        }

        self.render_song_cards(frame, area);
    }

    fn render_song_cards(&self, frame: &mut Frame, area: Rect) {
        let songs = &self.list.songs;
        let selected = self.list.selected;
        if area.height == 0 {
            return;
        }

        let card_height = SONG_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let len = songs.len();
        let mut start = if selected >= capacity {
            selected + 1 - capacity
        } else {
            0
        };
        if start + capacity > len {
            start = len.saturating_sub(capacity);
        }
        let end = min(start + capacity, len);

        let constraints: Vec<Constraint> = (start..end)
            .map(|_| Constraint::Length(SONG_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (chunk, song_index) in rows.iter().zip(start..end) {
            if chunk.height == 0 {
                continue;
            }

            let is_selected = song_index == selected;
            let mut block = Block::default().borders(Borders::ALL);
            let mut paragraph_style = Style::default();
            if is_selected {
                block = block.style(Style::default().fg(Color::Yellow));
                paragraph_style = Style::default().fg(Color::Yellow);
            }

            let paragraph = Paragraph::new(song_card_lines(&songs[song_index], is_selected))
                .block(block)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Left)
                .style(paragraph_style);

            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions()])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match &self.mode {
            Mode::Normal => &[
                ("[↑↓]", " Navigate   "),
                ("[Enter]", " Listen   "),
                ("[+]", " Add   "),
                ("[e]", " Edit   "),
                ("[-]", " Delete   "),
                ("[r]", " Refresh   "),
                ("[q]", " Quit"),
            ],
            Mode::Form(_) => &[
                ("[Tab]", " Next field   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            Mode::ConfirmDelete(_) => &[("[y]", " Delete   "), ("[n]", " Keep")],
            Mode::Alert { .. } => &[("[Enter]", " Dismiss")],
        };

        let spans: Vec<Span<'static>> = keys
            .iter()
            .flat_map(|(key, label)| [Span::styled(*key, key_style), Span::raw(*label)])
            .collect();
        Line::from(spans)
    }

    fn draw_song_form(&self, frame: &mut Frame, area: Rect, form: &SongForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(form.title()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = SongField::ALL
            .iter()
            .map(|field| form.build_line(*field))
            .collect();
        lines.push(Line::from(""));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else if form.submitting {
            lines.push(Line::from(Span::styled(
                format!("{} Saving... (Esc to close)", spinner_frame(self.tick)),
                Style::default().fg(Color::Gray),
            )));
        } else {
            let action = match form.mode() {
                FormMode::Create => "save",
                FormMode::Edit(_) => "update",
            };
            lines.push(Line::from(Span::styled(
                format!("Enter to {action} • Tab to switch • Esc to cancel"),
                Style::default().fg(Color::Gray),
            )));
        }

        // Wrapping would shift rows and break cursor placement.
        frame.render_widget(Paragraph::new(lines), inner);

        if !form.submitting {
            let row = SongField::ALL
                .iter()
                .position(|field| *field == form.active)
                .unwrap_or_default() as u16;
            let prefix = format!("{}: ", form.active.label()).len() as u16;
            let cursor_x = inner.x + prefix + form.value_len(form.active) as u16;
            frame.set_cursor_position((cursor_x.min(inner.right()), inner.y + row));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmSongDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete Song").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete '{}' permanently?",
                confirm.song.display_title()
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_alert(&self, frame: &mut Frame, area: Rect, message: &str) {
        let popup_area = centered_rect(50, 25, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Red));
        let lines = vec![
            Line::from(message.to_string()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Enter to continue.",
                Style::default().fg(Color::Gray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}

#[cfg(test)]
mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use reqwest::StatusCode;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::models::SongPayload;
    use crate::ui::fetcher::LOAD_ERROR;

    fn song(id: i64, name: &str, artist: &str) -> Song {
        Song {
            id,
            name: name.into(),
            artist: artist.into(),
            album: None,
            url: format!("https://example.com/{id}"),
            genre: None,
            year: None,
        }
    }

    fn catalog() -> Vec<Song> {
        vec![
            song(1, "Bohemian Rhapsody", "Queen"),
            song(2, "Clair de Lune", "Debussy"),
            song(3, "So What", "Miles Davis"),
        ]
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Request>) -> Vec<Request> {
        let mut requests = Vec::new();
        while let Ok(request) = rx.try_recv() {
            requests.push(request);
        }
        requests
    }

    fn load_all_count(requests: &[Request]) -> usize {
        requests
            .iter()
            .filter(|request| matches!(request, Request::LoadAll { .. }))
            .count()
    }

    /// App that has finished its first fetch with `songs`.
    fn loaded_app(songs: Vec<Song>) -> (App, UnboundedReceiver<Request>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(tx, "http://localhost:8000");
        app.start().unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![Request::LoadAll { generation: 1 }, Request::Health]
        );
        app.handle_response(Response::Loaded {
            generation: 1,
            result: Ok(songs),
        })
        .unwrap();
        (app, rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(code).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    fn form(app: &App) -> &SongForm {
        match &app.mode {
            Mode::Form(form) => form,
            other => panic!("expected form, found {other:?}"),
        }
    }

    fn render(app: &App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    #[test]
    fn test_renders_one_card_per_song() {
        let (app, _rx) = loaded_app(catalog());
        let rows = render(&app, 80, 40);

        let cards = rows.iter().filter(|row| row.contains("Listen: ")).count();
        assert_eq!(cards, 3);
        for song in catalog() {
            assert!(rows.iter().any(|row| row.contains(&song.name)));
            assert!(rows.iter().any(|row| row.contains(&song.artist)));
        }
    }

    #[test]
    fn test_renders_spinner_while_loading() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(tx, "http://localhost:8000");
        app.start().unwrap();

        let rows = render(&app, 80, 20);
        assert!(rows.iter().any(|row| row.contains("Loading songs...")));
    }

    #[test]
    fn test_create_submits_then_refreshes_and_resets() {
        let (mut app, mut rx) = loaded_app(Vec::new());

        press(&mut app, KeyCode::Char('+'));
        assert_eq!(form(&app).mode(), FormMode::Create);
        type_text(&mut app, "Clair de Lune");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Debussy");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "https://example.com/clair");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "1905");
        press(&mut app, KeyCode::Enter);

        let expected = SongPayload {
            name: "Clair de Lune".into(),
            artist: "Debussy".into(),
            album: None,
            url: "https://example.com/clair".into(),
            genre: None,
            year: Some(1905),
        };
        assert_eq!(drain(&mut rx), vec![Request::Create(expected)]);
        assert!(form(&app).submitting);

        app.handle_response(Response::Created(Ok(song(9, "Clair de Lune", "Debussy"))))
            .unwrap();
        assert_eq!(drain(&mut rx), vec![Request::LoadAll { generation: 2 }]);
        assert!(matches!(app.mode, Mode::Normal));

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(form(&app), &SongForm::for_create());
    }

    #[test]
    fn test_invalid_form_sends_nothing() {
        let (mut app, mut rx) = loaded_app(Vec::new());

        press(&mut app, KeyCode::Char('+'));
        type_text(&mut app, "Only a name");
        press(&mut app, KeyCode::Enter);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(form(&app).error.as_deref(), Some("Artist is required."));
    }

    #[test]
    fn test_edit_populates_draft_and_updates() {
        let mut songs = catalog();
        songs[1].album = Some("Suite bergamasque".into());
        songs[1].year = Some(1905);
        let (mut app, mut rx) = loaded_app(songs.clone());

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('e'));
        let draft = form(&app);
        assert_eq!(draft.editing_id, Some(2));
        assert_eq!(draft.name.as_bytes(), songs[1].name.as_bytes());
        assert_eq!(draft.artist.as_bytes(), songs[1].artist.as_bytes());
        assert_eq!(draft.url.as_bytes(), songs[1].url.as_bytes());
        assert_eq!(draft.album, "Suite bergamasque");
        assert_eq!(draft.genre, "");
        assert_eq!(draft.year, "1905");

        press(&mut app, KeyCode::Enter);
        let requests = drain(&mut rx);
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            Request::Update { id, payload } => {
                assert_eq!(*id, 2);
                assert_eq!(payload.album.as_deref(), Some("Suite bergamasque"));
            }
            other => panic!("expected update, found {other:?}"),
        }

        app.handle_response(Response::Updated(Ok(songs[1].clone())))
            .unwrap();
        assert_eq!(load_all_count(&drain(&mut rx)), 1);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_cancel_discards_draft() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, " (live)");
        press(&mut app, KeyCode::Esc);

        assert!(matches!(app.mode, Mode::Normal));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(app.list.songs[0].name, "Bohemian Rhapsody");
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('n'));
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(app.mode, Mode::Normal));

        press(&mut app, KeyCode::End);
        press(&mut app, KeyCode::Char('-'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(drain(&mut rx), vec![Request::Delete { id: 3 }]);

        app.handle_response(Response::Deleted {
            id: 3,
            result: Ok(()),
        })
        .unwrap();
        assert_eq!(drain(&mut rx), vec![Request::LoadAll { generation: 2 }]);
    }

    #[test]
    fn test_fetch_failure_keeps_list_and_retry_fetches_once() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(load_all_count(&drain(&mut rx)), 1);
        app.handle_response(Response::Loaded {
            generation: 2,
            result: Err(server_error()),
        })
        .unwrap();

        assert_eq!(app.list.songs, catalog());
        assert_eq!(app.fetcher.error(), Some(LOAD_ERROR));
        let rows = render(&app, 100, 30);
        assert!(rows.iter().any(|row| row.contains("Could not load songs.")));
        assert!(!rows.iter().any(|row| row.contains("Listen: ")));

        press(&mut app, KeyCode::Char('e'));
        assert!(matches!(app.mode, Mode::Normal));

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(
            load_all_count(&drain(&mut rx)),
            1,
            "retry should issue exactly one fetch"
        );
    }

    #[test]
    fn test_stale_listing_does_not_overwrite_newer() {
        let (mut app, mut rx) = loaded_app(Vec::new());
        press(&mut app, KeyCode::Char('r'));
        press(&mut app, KeyCode::Char('r'));
        drain(&mut rx);

        app.handle_response(Response::Loaded {
            generation: 3,
            result: Ok(vec![song(1, "Newer", "A")]),
        })
        .unwrap();
        app.handle_response(Response::Loaded {
            generation: 2,
            result: Ok(vec![song(2, "Older", "B")]),
        })
        .unwrap();

        assert_eq!(app.list.songs.len(), 1);
        assert_eq!(app.list.songs[0].name, "Newer");
    }

    #[test]
    fn test_save_failure_alerts_and_preserves_draft() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Opera");
        press(&mut app, KeyCode::Enter);
        drain(&mut rx);

        app.handle_response(Response::Updated(Err(server_error())))
            .unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(&app.mode, Mode::Alert { message, .. } if message == SAVE_ERROR));

        // Typing into the alert does nothing.
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);

        let draft = form(&app);
        assert!(!draft.submitting);
        assert_eq!(draft.album, "Opera");
        assert_eq!(draft.editing_id, Some(1));
    }

    #[test]
    fn test_delete_failure_alerts() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Enter);
        drain(&mut rx);

        app.handle_response(Response::Deleted {
            id: 1,
            result: Err(server_error()),
        })
        .unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(&app.mode, Mode::Alert { message, .. } if message == DELETE_ERROR));

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.list.songs.len(), 3);
    }

    #[test]
    fn test_health_indicator() {
        let (mut app, _rx) = loaded_app(Vec::new());
        app.handle_response(Response::Health(Ok(HealthReport {
            status: "healthy".into(),
            database: Some("connected".into()),
            error: None,
        })))
        .unwrap();
        assert_eq!(app.health, ApiHealth::Healthy);

        app.handle_response(Response::Health(Err(server_error())))
            .unwrap();
        assert_eq!(app.health, ApiHealth::Unreachable);
        let rows = render(&app, 80, 20);
        assert!(rows.iter().any(|row| row.contains("unreachable")));
    }

    /// Opens the create form with a valid draft and submits it.
    fn submit_new_song(app: &mut App) {
        press(app, KeyCode::Char('+'));
        type_text(app, "So What");
        press(app, KeyCode::Tab);
        type_text(app, "Miles Davis");
        press(app, KeyCode::Tab);
        press(app, KeyCode::Tab);
        type_text(app, "https://example.com/so-what");
        press(app, KeyCode::Enter);
        assert!(form(app).submitting);
    }

    #[test]
    fn test_save_success_under_delete_alert_closes_form() {
        let (mut app, mut rx) = loaded_app(vec![song(1, "Clair de Lune", "Debussy")]);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        submit_new_song(&mut app);
        drain(&mut rx);

        app.handle_response(Response::Deleted {
            id: 1,
            result: Err(server_error()),
        })
        .unwrap();
        assert!(matches!(&app.mode, Mode::Alert { message, .. } if message == DELETE_ERROR));

        app.handle_response(Response::Created(Ok(song(2, "So What", "Miles Davis"))))
            .unwrap();
        assert_eq!(drain(&mut rx), vec![Request::LoadAll { generation: 2 }]);

        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn test_save_failure_under_delete_alert_reenables_form() {
        let (mut app, mut rx) = loaded_app(vec![song(1, "Clair de Lune", "Debussy")]);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        submit_new_song(&mut app);
        drain(&mut rx);

        app.handle_response(Response::Deleted {
            id: 1,
            result: Err(server_error()),
        })
        .unwrap();
        app.handle_response(Response::Created(Err(server_error())))
            .unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(matches!(&app.mode, Mode::Alert { message, .. } if message == SAVE_ERROR));

        press(&mut app, KeyCode::Enter);
        assert!(matches!(&app.mode, Mode::Alert { message, .. } if message == DELETE_ERROR));
        press(&mut app, KeyCode::Enter);

        let draft = form(&app);
        assert!(!draft.submitting);
        assert_eq!(draft.name, "So What");

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_esc_closes_submitting_form() {
        let (mut app, mut rx) = loaded_app(Vec::new());

        submit_new_song(&mut app);
        drain(&mut rx);

        // Other keys stay ignored while the save is in flight.
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(form(&app).name, "So What");

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));

        app.handle_response(Response::Created(Ok(song(1, "So What", "Miles Davis"))))
            .unwrap();
        assert_eq!(load_all_count(&drain(&mut rx)), 1);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn test_late_save_failure_after_close_reports_in_footer() {
        let (mut app, mut rx) = loaded_app(catalog());

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Esc);
        drain(&mut rx);

        app.handle_response(Response::Updated(Err(server_error())))
            .unwrap();
        assert!(matches!(app.mode, Mode::Normal));
        assert!(drain(&mut rx).is_empty());
        let rows = render(&app, 100, 30);
        assert!(rows.iter().any(|row| row.contains(SAVE_ERROR)));
    }

    #[test]
    fn test_ctrl_quit_works_from_any_mode() {
        let (mut app, mut rx) = loaded_app(Vec::new());
        submit_new_song(&mut app);
        drain(&mut rx);

        assert!(app.handle_ctrl_key(KeyCode::Char('c')));
        assert!(app.handle_ctrl_key(KeyCode::Char('q')));
        assert!(!app.handle_ctrl_key(KeyCode::Char('s')));
    }

    #[test]
    fn test_quit() {
        let (mut app, _rx) = loaded_app(Vec::new());
        assert!(!app.handle_key(KeyCode::Down).unwrap());
        assert!(app.handle_key(KeyCode::Char('q')).unwrap());
    }
}
