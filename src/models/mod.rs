//! Core data models for the note service.
//!
//! `NoteDocument` maps onto the `notes` table via `sqlx::FromRow`;
//! `NoteDraft` is what a client submits before an id is assigned.

pub mod draft;
pub mod note;
