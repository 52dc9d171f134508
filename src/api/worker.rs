use log::{debug, info};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::models::{HealthReport, Song, SongPayload};

use super::client::{ApiClient, ApiError};

/// Work the UI asks the network layer to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch the collection. `generation` is echoed back so the UI can tell
    /// which fetch a listing belongs to.
    LoadAll { generation: u64 },
    Create(SongPayload),
    Update { id: i64, payload: SongPayload },
    Delete { id: i64 },
    Health,
}

/// Outcome of a `Request`, delivered back to the UI loop.
#[derive(Debug)]
pub enum Response {
    Loaded {
        generation: u64,
        result: Result<Vec<Song>, ApiError>,
    },
    Created(Result<Song, ApiError>),
    Updated(Result<Song, ApiError>),
    Deleted {
        id: i64,
        result: Result<(), ApiError>,
    },
    Health(Result<HealthReport, ApiError>),
}

/// Drain the request channel, running every request on its own task so a
/// slow listing never holds up a mutation. Responses may therefore arrive out
/// of order.
pub async fn serve(
    client: ApiClient,
    mut requests: UnboundedReceiver<Request>,
    responses: UnboundedSender<Response>,
) {
    info!("request worker started for {}", client.base_url());
    while let Some(request) = requests.recv().await {
        let client = client.clone();
        let responses = responses.clone();
        tokio::spawn(async move {
            let response = perform(&client, request).await;
            if responses.send(response).is_err() {
                debug!("UI loop gone; dropping response");
            }
        });
    }
    info!("request channel closed; worker stopping");
}

/// Execute a single request against the API.
async fn perform(client: &ApiClient, request: Request) -> Response {
    match request {
        Request::LoadAll { generation } => Response::Loaded {
            generation,
            result: client.list_songs().await,
        },
        Request::Create(payload) => Response::Created(client.create_song(&payload).await),
        Request::Update { id, payload } => {
            Response::Updated(client.update_song(id, &payload).await)
        }
        Request::Delete { id } => Response::Deleted {
            id,
            result: client.delete_song(id).await,
        },
        Request::Health => Response::Health(client.health().await),
    }
}
