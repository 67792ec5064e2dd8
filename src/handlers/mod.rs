pub mod auth_handlers;
pub mod health_handlers;
pub mod image_handlers;
pub mod photo_handlers;
pub mod settings_handlers;
