//! Network layer split across logical submodules.

mod client;
mod worker;

pub use client::{ApiClient, ApiError};
pub use worker::{serve, Request, Response};
