use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use reqwest::Url;

use crate::models::{Song, SongPayload};

/// Lowest year the form accepts.
pub(crate) const MIN_YEAR: i32 = 1900;
/// Highest year the form accepts.
pub(crate) const MAX_YEAR: i32 = 2025;

/// Draft backing the add/edit popup. `editing_id` alone decides whether a
/// submit creates a new song or replaces an existing one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SongForm {
    pub(crate) name: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) url: String,
    pub(crate) genre: String,
    pub(crate) year: String,
    pub(crate) editing_id: Option<i64>,
    pub(crate) active: SongField,
    pub(crate) error: Option<String>,
    /// Set while the create/update request is in flight.
    pub(crate) submitting: bool,
}

/// Fields of the song form, in focus order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum SongField {
    #[default]
    Name,
    Artist,
    Album,
    Url,
    Genre,
    Year,
}

impl SongField {
    pub(crate) const ALL: [SongField; 6] = [
        SongField::Name,
        SongField::Artist,
        SongField::Album,
        SongField::Url,
        SongField::Genre,
        SongField::Year,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            SongField::Name => "Name",
            SongField::Artist => "Artist",
            SongField::Album => "Album",
            SongField::Url => "URL",
            SongField::Genre => "Genre",
            SongField::Year => "Year",
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            SongField::Name => "<required> e.g. Bohemian Rhapsody",
            SongField::Artist => "<required> e.g. Queen",
            SongField::Album => "<optional> e.g. A Night at the Opera",
            SongField::Url => "<required> https://www.youtube.com/watch?v=...",
            SongField::Genre => "<optional> e.g. Rock",
            SongField::Year => "<optional> 1900-2025",
        }
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or_default()
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Which kind of submit the draft will perform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum FormMode {
    Create,
    Edit(i64),
}

impl SongForm {
    /// An empty draft in create mode.
    pub(crate) fn for_create() -> Self {
        Self::default()
    }

    /// Copy a song into the draft. Missing optionals become empty strings.
    pub(crate) fn for_edit(song: &Song) -> Self {
        Self {
            name: song.name.clone(),
            artist: song.artist.clone(),
            album: song.album.clone().unwrap_or_default(),
            url: song.url.clone(),
            genre: song.genre.clone().unwrap_or_default(),
            year: song.year.map(|year| year.to_string()).unwrap_or_default(),
            editing_id: Some(song.id),
            ..Self::default()
        }
    }

    pub(crate) fn mode(&self) -> FormMode {
        match self.editing_id {
            Some(id) => FormMode::Edit(id),
            None => FormMode::Create,
        }
    }

    pub(crate) fn title(&self) -> &'static str {
        match self.mode() {
            FormMode::Create => "New Song",
            FormMode::Edit(_) => "Edit Song",
        }
    }

    pub(crate) fn value(&self, field: SongField) -> &str {
        match field {
            SongField::Name => &self.name,
            SongField::Artist => &self.artist,
            SongField::Album => &self.album,
            SongField::Url => &self.url,
            SongField::Genre => &self.genre,
            SongField::Year => &self.year,
        }
    }

    fn value_mut(&mut self, field: SongField) -> &mut String {
        match field {
            SongField::Name => &mut self.name,
            SongField::Artist => &mut self.artist,
            SongField::Album => &mut self.album,
            SongField::Url => &mut self.url,
            SongField::Genre => &mut self.genre,
            SongField::Year => &mut self.year,
        }
    }

    /// Replace one field of the draft.
    pub(crate) fn update_field(&mut self, field: SongField, value: impl Into<String>) {
        *self.value_mut(field) = value.into();
        self.error = None;
    }

    pub(crate) fn focus_next(&mut self) {
        self.active = self.active.next();
    }

    pub(crate) fn focus_previous(&mut self) {
        self.active = self.active.previous();
    }

    /// Append a character to the focused field. The year only takes digits.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() || (self.active == SongField::Year && !ch.is_ascii_digit()) {
            return false;
        }
        let mut value = self.value(self.active).to_string();
        value.push(ch);
        self.update_field(self.active, value);
        true
    }

    pub(crate) fn backspace(&mut self) {
        let mut value = self.value(self.active).to_string();
        if value.pop().is_some() {
            self.update_field(self.active, value);
        }
    }

    /// Check the form constraints and build the request body.
    pub(crate) fn to_payload(&self) -> Result<SongPayload> {
        let name = required(&self.name, "Song name is required.")?;
        let artist = required(&self.artist, "Artist is required.")?;
        let url = required(&self.url, "URL is required.")?;
        if Url::parse(&url).is_err() {
            return Err(anyhow!("URL must be a full address, e.g. https://..."));
        }

        let year = match self.year.trim() {
            "" => None,
            raw => {
                let year = raw
                    .parse::<i32>()
                    .map_err(|_| anyhow!("Year must be a number."))?;
                if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                    return Err(anyhow!("Year must be between {MIN_YEAR} and {MAX_YEAR}."));
                }
                Some(year)
            }
        };

        Ok(SongPayload {
            name,
            artist,
            album: optional(&self.album),
            url,
            genre: optional(&self.genre),
            year,
        })
    }

    /// Render a single labelled line of the popup.
    pub(crate) fn build_line(&self, field: SongField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;

        let display = if value.is_empty() {
            field.placeholder().to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, style),
        ])
    }

    /// Character count of the requested field, for cursor placement.
    pub(crate) fn value_len(&self, field: SongField) -> usize {
        self.value(field).chars().count()
    }
}

fn required(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(anyhow!(message.to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Song awaiting a yes/no before it is deleted.
#[derive(Debug, Clone)]
pub(crate) struct ConfirmSongDelete {
    pub(crate) song: Song,
}
