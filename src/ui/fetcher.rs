use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::api::{ApiError, Request};
use crate::models::{Song, SongPayload};

/// Message shown in the error panel when the collection cannot be loaded.
pub(crate) const LOAD_ERROR: &str =
    "Could not load songs. Check that the API is running, then press r to retry.";

/// Issues API requests and owns the loading/error flags of the song list.
///
/// Every collection fetch gets a new generation; only the listing for the
/// newest generation is accepted, so overlapping refreshes cannot clobber a
/// fresher result with an older one.
pub(crate) struct Fetcher {
    requests: UnboundedSender<Request>,
    latest_generation: u64,
    loading: bool,
    error: Option<String>,
}

impl Fetcher {
    pub(crate) fn new(requests: UnboundedSender<Request>) -> Self {
        Self {
            requests,
            latest_generation: 0,
            loading: false,
            error: None,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Request a fresh copy of the collection.
    pub(crate) fn load_all(&mut self) -> Result<()> {
        self.latest_generation += 1;
        self.loading = true;
        debug!("loading songs (generation {})", self.latest_generation);
        self.send(Request::LoadAll {
            generation: self.latest_generation,
        })
    }

    pub(crate) fn create(&self, payload: SongPayload) -> Result<()> {
        self.send(Request::Create(payload))
    }

    pub(crate) fn update(&self, id: i64, payload: SongPayload) -> Result<()> {
        self.send(Request::Update { id, payload })
    }

    pub(crate) fn remove(&self, id: i64) -> Result<()> {
        self.send(Request::Delete { id })
    }

    pub(crate) fn check_health(&self) -> Result<()> {
        self.send(Request::Health)
    }

    /// Apply a listing response. Returns the songs to install when the
    /// response belongs to the newest fetch and succeeded.
    pub(crate) fn finish_load(
        &mut self,
        generation: u64,
        result: Result<Vec<Song>, ApiError>,
    ) -> Option<Vec<Song>> {
        if generation != self.latest_generation {
            debug!(
                "discarding stale listing (generation {generation}, latest {})",
                self.latest_generation
            );
            return None;
        }

        self.loading = false;
        match result {
            Ok(songs) => {
                info!("loaded {} songs", songs.len());
                self.error = None;
                Some(songs)
            }
            Err(err) => {
                warn!("failed to load songs: {:#}", anyhow::Error::from(err));
                self.error = Some(LOAD_ERROR.to_string());
                None
            }
        }
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| anyhow!("request worker has shut down"))
    }
}
