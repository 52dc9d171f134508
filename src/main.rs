//! Binary entry point: resolve configuration, start the API worker on a tokio
//! runtime, and drive the Ratatui event loop until the user exits.
use anyhow::Context;
use log::info;
use tokio::sync::mpsc;

use favorite_songs::{logging, run_app, serve, ApiClient, App, Config};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    logging::init(&config.log_path)?;
    info!("starting against {}", config.api_url);

    let client = ApiClient::new(&config.api_url).context("failed to build API client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;

    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, mut response_rx) = mpsc::unbounded_channel();
    runtime.spawn(serve(client, request_rx, response_tx));

    let mut app = App::new(request_tx, config.api_url);
    app.start()?;
    let result = run_app(&mut app, &mut response_rx);

    info!("shutting down");
    result
}
