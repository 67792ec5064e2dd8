//! Photo gallery backend: photo records and their image blobs kept
//! consistent across upload, edit and delete, with paginated listings and a
//! session-gated admin surface.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
