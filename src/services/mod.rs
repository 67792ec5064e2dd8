//! Gallery core: the two stores, the photo repository built on them, the
//! settings singleton and the pagination engine.

pub mod blob_store;
pub mod error;
pub mod image_variants;
pub mod metadata_store;
pub mod pagination;
pub mod photo_repository;
pub mod session;
pub mod settings_store;

#[cfg(test)]
pub(crate) mod testing;
