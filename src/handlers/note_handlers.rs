//! HTTP handlers for note capture, lookup and search.
//! Everything goes through `NoteLibrary`; handlers only translate between
//! HTTP and library calls.

use crate::{
    errors::AppError,
    models::{
        draft::{NoteDraft, ValidationError},
        note::{NoteDocument, NoteSummary},
    },
    services::library::{NoteLibrary, SearchOutcome, default_description_now},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchNotesQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteDetailQuery {
    /// Embed the payload as a `data:` URL.
    pub inline: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDescriptionReq {
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetail {
    #[serde(flatten)]
    pub summary: NoteSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

/// `POST /notes`: multipart upload with a `file` part and optional `description`.
pub async fn create_note(
    State(library): State<NoteLibrary>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut description = None;
    let mut payload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "description" => description = Some(field.text().await?),
            "file" => {
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                payload = Some((mime_type, data));
            }
            other => debug!("ignoring multipart field `{}`", other),
        }
    }

    let (mime_type, blob) = payload.ok_or(ValidationError::MissingPayload)?;
    let draft = NoteDraft {
        description: description.unwrap_or_else(default_description_now),
        mime_type,
        blob,
    };

    let doc = library.create(draft).await?;
    Ok((StatusCode::CREATED, Json(NoteSummary::from(&doc))))
}

/// `GET /notes`: newest notes first.
pub async fn list_notes(
    State(library): State<NoteLibrary>,
    Query(q): Query<ListNotesQuery>,
) -> Json<Vec<NoteSummary>> {
    let limit = q.limit.unwrap_or(library.settings().recent_limit);
    Json(library.recent(limit).await)
}

/// `GET /notes/search?q=`: ranked matches on the description.
pub async fn search_notes(
    State(library): State<NoteLibrary>,
    Query(q): Query<SearchNotesQuery>,
) -> Json<SearchOutcome> {
    Json(library.search(q.q.as_deref().unwrap_or_default()).await)
}

/// `GET /notes/{id}`
pub async fn get_note(
    State(library): State<NoteLibrary>,
    Path(id): Path<String>,
    Query(q): Query<NoteDetailQuery>,
) -> Result<Json<NoteDetail>, AppError> {
    let doc = fetch_note(&library, &id).await?;
    let data_url = q.inline.unwrap_or(false).then(|| {
        format!(
            "data:{};base64,{}",
            doc.mime_type,
            general_purpose::STANDARD.encode(&doc.blob)
        )
    });

    Ok(Json(NoteDetail {
        summary: NoteSummary::from(&doc),
        data_url,
    }))
}

/// `GET /notes/{id}/blob`: the raw payload.
pub async fn get_note_blob(
    State(library): State<NoteLibrary>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let doc = fetch_note(&library, &id).await?;
    let etag = format!("\"{}\"", doc.etag());

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| if_none_match(v, &etag));

    let mut response = if not_modified {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NOT_MODIFIED;
        response
    } else {
        Response::new(Body::from(doc.blob.clone()))
    };
    set_note_headers(response.headers_mut(), &doc, &etag, !not_modified);
    Ok(response)
}

/// `PUT /notes/{id}/description`
pub async fn update_description(
    State(library): State<NoteLibrary>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateDescriptionReq>,
) -> Result<Json<NoteSummary>, AppError> {
    let doc = library
        .update_description(&id, &payload.description)
        .await?
        .ok_or_else(|| AppError::not_found(format!("note `{}` not found", id)))?;
    Ok(Json(NoteSummary::from(&doc)))
}

/// `DELETE /notes/{id}`: idempotent.
pub async fn delete_note(
    State(library): State<NoteLibrary>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    library.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_note(library: &NoteLibrary, id: &str) -> Result<NoteDocument, AppError> {
    library
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("note `{}` not found", id)))
}

/// True when an `If-None-Match` value names `etag`, either as `*` or as
/// one entry of a comma-separated list. Weak tags compare by their opaque part.
fn if_none_match(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag)
}

fn set_note_headers(headers: &mut HeaderMap, doc: &NoteDocument, etag: &str, with_body: bool) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&doc.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    if with_body {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(doc.size_bytes()));
    }

    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(header::ETAG, value);
    }

    if let Some(created) = Utc.timestamp_millis_opt(doc.created_at).single() {
        if let Ok(value) = HeaderValue::from_str(&created.to_rfc2822()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
}
