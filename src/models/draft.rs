//! An unsaved note as submitted by a client, before it has an id.

use bytes::Bytes;
use thiserror::Error;

/// Reasons a draft or description edit is rejected before it reaches storage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("description exceeds {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("an image payload is required")]
    MissingPayload,
    #[error("payload content type is missing")]
    MissingMimeType,
}

/// Note contents collected from an upload.
#[derive(Clone, Debug)]
pub struct NoteDraft {
    pub description: String,
    pub mime_type: String,
    pub blob: Bytes,
}

impl NoteDraft {
    /// Check the draft and return its trimmed description.
    pub fn validate(&self, max_description_len: usize) -> Result<&str, ValidationError> {
        let description = validate_description(&self.description, max_description_len)?;
        if self.blob.is_empty() {
            return Err(ValidationError::MissingPayload);
        }
        if self.mime_type.trim().is_empty() {
            return Err(ValidationError::MissingMimeType);
        }
        Ok(description)
    }
}

/// Trim `raw` and check it is non-empty and within `max` characters.
pub fn validate_description(raw: &str, max: usize) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::DescriptionTooLong { max });
    }
    Ok(trimmed)
}
