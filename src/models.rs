//! Domain models exchanged with the songs API and passed throughout the TUI.
//! Field names on the wire follow the API (`nombre`, `artista`, ...) while the
//! Rust side uses plain English names.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
/// A song as stored by the remote API.
pub struct Song {
    /// Server-assigned identifier. Edit and delete flows send it back in the
    /// item path.
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "artista")]
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Link to a playable copy of the song.
    pub url: String,
    #[serde(rename = "genero", default)]
    pub genre: Option<String>,
    #[serde(rename = "anio", default)]
    pub year: Option<i32>,
}

impl Song {
    /// Album text when present and not blank.
    pub fn album_text(&self) -> Option<&str> {
        non_blank(self.album.as_deref())
    }

    /// Genre text when present and not blank.
    pub fn genre_text(&self) -> Option<&str> {
        non_blank(self.genre.as_deref())
    }

    /// Compose a `Name - Artist` string for dialogs and status messages.
    pub fn display_title(&self) -> String {
        if self.artist.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.artist)
        }
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_title())
    }
}

/// Body of create and update requests: a song minus its id.
///
/// `anio` is always serialized, as `null` when the year was left blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongPayload {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "artista")]
    pub artist: String,
    pub album: Option<String>,
    pub url: String,
    #[serde(rename = "genero")]
    pub genre: Option<String>,
    #[serde(rename = "anio")]
    pub year: Option<i32>,
}

/// Result of the API's `/health` probe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
