//! Core library surface for the Favorite Songs terminal client.
//!
//! The `bin` target wires these pieces together: configuration, logging, the
//! API worker running on tokio, and the Ratatui front end.
pub mod api;
pub mod config;
pub mod logging;
pub mod models;
pub mod ui;

/// HTTP client and the request/response types exchanged with the worker.
pub use api::{serve, ApiClient, ApiError, Request, Response};

pub use config::Config;

/// The domain types passed between the API and the UI.
pub use models::{HealthReport, Song, SongPayload};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
