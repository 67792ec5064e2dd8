//! Core data models for the photo gallery.
//!
//! Photo records and site settings serialize as camelCase JSON documents;
//! blob attributes map onto the `blobs` table via `sqlx::FromRow`.

pub mod blob;
pub mod photo;
pub mod settings;
