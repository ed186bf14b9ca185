pub mod blob_handlers;
pub mod file_handlers;
pub mod health_handlers;
pub mod publication_handlers;
pub mod user_handlers;
