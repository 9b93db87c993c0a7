pub mod health_handlers;
pub mod note_handlers;
