//! Ratatui front end: the song list, the add/edit popup, and the loop that
//! feeds key presses and API responses into `App`.

mod app;
mod fetcher;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
