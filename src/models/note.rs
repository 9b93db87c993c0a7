//! Represents a captured note: an image payload plus a short description.

use serde::Serialize;
use sqlx::FromRow;

/// A single persisted note record.
///
/// The id and timestamp are assigned by the caller before the record reaches
/// the store; the store only ever replaces whole records.
#[derive(Clone, FromRow, Debug, PartialEq, Eq)]
pub struct NoteDocument {
    /// Unique identifier (primary key).
    pub id: String,

    /// Creation time in epoch milliseconds.
    pub created_at: i64,

    /// Free-text description used for search.
    pub description: String,

    /// MIME type of `blob`.
    pub mime_type: String,

    /// Stored image bytes.
    pub blob: Vec<u8>,
}

impl NoteDocument {
    pub fn size_bytes(&self) -> usize {
        self.blob.len()
    }

    /// Hex MD5 digest of the payload, used as the entity tag.
    pub fn etag(&self) -> String {
        format!("{:x}", md5::compute(&self.blob))
    }
}

/// Payload-free view of a note, as returned by listing endpoints.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteSummary {
    pub id: String,
    pub created_at: i64,
    pub description: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

impl From<&NoteDocument> for NoteSummary {
    fn from(doc: &NoteDocument) -> Self {
        Self {
            id: doc.id.clone(),
            created_at: doc.created_at,
            description: doc.description.clone(),
            mime_type: doc.mime_type.clone(),
            size_bytes: doc.size_bytes(),
        }
    }
}
