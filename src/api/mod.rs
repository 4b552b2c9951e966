//! HTTP API for presentation clients.

pub mod routes;
mod tasks;

pub use routes::{router, serve, AppState};
