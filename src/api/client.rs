use log::debug;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;

use crate::models::{HealthReport, Song, SongPayload};

/// Collection endpoint relative to the API base URL.
const SONGS_PATH: &str = "/canciones";
const HEALTH_PATH: &str = "/health";

/// Thin async client over the songs REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}{}", detail_suffix(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("invalid API base URL '{0}'")]
    InvalidBaseUrl(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!(": {detail}"),
        None => String::new(),
    }
}

/// Error body shape used by the API for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed =
            Url::parse(trimmed).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: trimmed.to_string(),
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, SONGS_PATH)
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}{}/{}", self.base_url, SONGS_PATH, id)
    }

    /// GET the full song collection.
    pub async fn list_songs(&self) -> Result<Vec<Song>, ApiError> {
        let url = self.collection_url();
        debug!("GET {url}");
        let response = check_status(self.http.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// POST a new song and return the server's copy.
    pub async fn create_song(&self, payload: &SongPayload) -> Result<Song, ApiError> {
        let url = self.collection_url();
        debug!("POST {url}");
        let response = check_status(self.http.post(&url).json(payload).send().await?).await?;
        Ok(response.json().await?)
    }

    /// PUT replacement fields for an existing song.
    pub async fn update_song(&self, id: i64, payload: &SongPayload) -> Result<Song, ApiError> {
        let url = self.item_url(id);
        debug!("PUT {url}");
        let response = check_status(self.http.put(&url).json(payload).send().await?).await?;
        Ok(response.json().await?)
    }

    /// DELETE a song. The acknowledgement body is ignored.
    pub async fn delete_song(&self, id: i64) -> Result<(), ApiError> {
        let url = self.item_url(id);
        debug!("DELETE {url}");
        check_status(self.http.delete(&url).send().await?).await?;
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        debug!("GET {url}");
        let response = check_status(self.http.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }
}

/// Turn non-2xx responses into `ApiError::Status`, keeping the API's `detail`
/// message when one is present.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|parsed| match parsed.detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

    Err(ApiError::Status { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.collection_url(), "http://localhost:8000/canciones");
        assert_eq!(client.item_url(42), "http://localhost:8000/canciones/42");
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.com"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            detail: Some("Canción no encontrada".into()),
        };
        assert_eq!(
            err.to_string(),
            "server returned 404 Not Found: Canción no encontrada"
        );

        let bare = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: None,
        };
        assert_eq!(bare.to_string(), "server returned 500 Internal Server Error");
    }
}
