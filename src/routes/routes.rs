//! Defines routes for note capture and retrieval.
//!
//! ## Structure
//! - **Collection endpoints**
//!   - `GET    /notes`        : recent notes (supports `limit`)
//!   - `POST   /notes`        : multipart upload (`file`, optional `description`)
//!   - `GET    /notes/search` : ranked search (`q`)
//!
//! - **Note endpoints**
//!   - `GET    /notes/{id}`             : summary (`inline=true` embeds the payload)
//!   - `GET    /notes/{id}/blob`        : raw payload
//!   - `PUT    /notes/{id}/description` : replace the description
//!   - `DELETE /notes/{id}`             : delete (idempotent)

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        note_handlers::{
            create_note, delete_note, get_note, get_note_blob, list_notes, search_notes,
            update_description,
        },
    },
    services::library::NoteLibrary,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
};

/// Build the router for all note routes.
///
/// The router carries shared state (`NoteLibrary`) to all handlers;
/// request bodies are capped at `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<NoteLibrary> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Collection routes
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/search", get(search_notes))
        // Note routes
        .route("/notes/{id}", get(get_note).delete(delete_note))
        .route("/notes/{id}/blob", get(get_note_blob))
        .route("/notes/{id}/description", put(update_description))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
