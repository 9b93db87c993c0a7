//! NoteLibrary: the application layer over `DocumentStore`.
//!
//! Holds an in-memory snapshot of every note, reloaded after each mutation,
//! and answers searches from that snapshot without touching the database.

use crate::{
    models::{
        draft::{NoteDraft, ValidationError},
        note::{NoteDocument, NoteSummary},
    },
    services::{
        document_store::{DEFAULT_RECENT_LIMIT, DocumentStore, StoreError},
        ranking,
    },
};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

#[derive(Clone, Copy, Debug)]
pub struct LibrarySettings {
    /// Size of the recent list kept in the snapshot.
    pub recent_limit: usize,
    pub max_description_len: usize,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
            max_description_len: 120,
        }
    }
}

/// Result of a search, shaped for a find screen.
///
/// `suggestion` and `recent` are only filled when a non-blank query found
/// nothing, so the client can offer something to open instead.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub query: String,
    pub matches: Vec<NoteSummary>,
    pub suggestion: Option<NoteSummary>,
    pub recent: Vec<NoteSummary>,
}

#[derive(Default)]
struct Snapshot {
    /// Every note, newest first.
    docs: Vec<NoteDocument>,
    recent: Vec<NoteDocument>,
}

impl Snapshot {
    fn apply(&mut self, change: SnapshotChange, recent_limit: usize) {
        match change {
            SnapshotChange::Upsert(doc) => {
                self.docs.retain(|d| d.id != doc.id);
                let at = self
                    .docs
                    .partition_point(|d| d.created_at >= doc.created_at);
                self.docs.insert(at, doc);
            }
            SnapshotChange::Remove(id) => self.docs.retain(|d| d.id != id),
        }
        self.recent = self.docs.iter().take(recent_limit).cloned().collect();
    }
}

/// A committed mutation, replayed onto the snapshot when reloading fails.
enum SnapshotChange {
    Upsert(NoteDocument),
    Remove(String),
}

#[derive(Clone)]
pub struct NoteLibrary {
    store: DocumentStore,
    settings: LibrarySettings,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl NoteLibrary {
    /// Build the library and load the initial snapshot.
    pub async fn load(store: DocumentStore, settings: LibrarySettings) -> LibraryResult<Self> {
        let library = Self {
            store,
            settings,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        };
        library.refresh().await?;
        Ok(library)
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn settings(&self) -> LibrarySettings {
        self.settings
    }

    /// Reload the snapshot from the store.
    ///
    /// The write lock is held across the read so concurrent refreshes
    /// install their snapshots in the order they read them.
    pub async fn refresh(&self) -> LibraryResult<()> {
        let mut snapshot = self.snapshot.write().await;
        let mut docs = self.store.list_all().await?;
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent = docs
            .iter()
            .take(self.settings.recent_limit)
            .cloned()
            .collect();

        debug!("snapshot refreshed with {} notes", docs.len());
        *snapshot = Snapshot { docs, recent };
        Ok(())
    }

    /// Refresh after a committed mutation.
    ///
    /// The write already succeeded, so a failed reload only logs and
    /// patches the snapshot with `change` instead of failing the caller.
    async fn refresh_after(&self, change: SnapshotChange) {
        if let Err(err) = self.refresh().await {
            warn!("snapshot refresh failed, applying change in place: {}", err);
            let mut snapshot = self.snapshot.write().await;
            snapshot.apply(change, self.settings.recent_limit);
        }
    }

    /// Validate `draft`, assign it an id and timestamp, and persist it.
    pub async fn create(&self, draft: NoteDraft) -> LibraryResult<NoteDocument> {
        let description = draft.validate(self.settings.max_description_len)?;
        let doc = NoteDocument {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp_millis(),
            description: description.to_string(),
            mime_type: draft.mime_type.trim().to_string(),
            blob: draft.blob.to_vec(),
        };

        self.store.upsert(&doc).await?;
        info!("created note {} ({} bytes)", doc.id, doc.size_bytes());
        self.refresh_after(SnapshotChange::Upsert(doc.clone())).await;
        Ok(doc)
    }

    /// Replace the description of note `id`.
    ///
    /// A blank `description` keeps the current one. Only creation caps the
    /// length. Returns `None` when no note has that id.
    pub async fn update_description(
        &self,
        id: &str,
        description: &str,
    ) -> LibraryResult<Option<NoteDocument>> {
        let Some(mut doc) = self.store.get_by_id(id).await? else {
            return Ok(None);
        };

        let description = description.trim();
        if description.is_empty() || description == doc.description {
            return Ok(Some(doc));
        }

        doc.description = description.to_string();
        self.store.upsert(&doc).await?;
        info!("updated description of note {}", doc.id);
        self.refresh_after(SnapshotChange::Upsert(doc.clone())).await;
        Ok(Some(doc))
    }

    /// Delete note `id`; unknown ids are ignored.
    pub async fn delete(&self, id: &str) -> LibraryResult<()> {
        self.store.delete_by_id(id).await?;
        info!("deleted note {}", id);
        self.refresh_after(SnapshotChange::Remove(id.to_string())).await;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> LibraryResult<Option<NoteDocument>> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn note_count(&self) -> usize {
        self.snapshot.read().await.docs.len()
    }

    /// Newest `limit` notes from the snapshot.
    pub async fn recent(&self, limit: usize) -> Vec<NoteSummary> {
        let snapshot = self.snapshot.read().await;
        snapshot.docs.iter().take(limit).map(NoteSummary::from).collect()
    }

    pub async fn search(&self, query: &str) -> SearchOutcome {
        let snapshot = self.snapshot.read().await;
        let matches: Vec<NoteSummary> = ranking::score(&snapshot.docs, query)
            .into_iter()
            .map(NoteSummary::from)
            .collect();

        let mut outcome = SearchOutcome {
            query: query.trim().to_string(),
            ..SearchOutcome::default()
        };
        if matches.is_empty() && !outcome.query.is_empty() {
            outcome.recent = snapshot.recent.iter().map(NoteSummary::from).collect();
            outcome.suggestion = outcome.recent.first().cloned();
        }
        outcome.matches = matches;
        outcome
    }
}

/// Placeholder description offered for a new note, e.g. `Note - 18.10.2026 09:30`.
pub fn default_description<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Note - {}", now.format("%d.%m.%Y %H:%M"))
}

pub fn default_description_now() -> String {
    default_description(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, NoteLibrary) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("notes.db").display());
        let store = DocumentStore::open(&url).await.unwrap();
        let library = NoteLibrary::load(store, LibrarySettings::default())
            .await
            .unwrap();
        (dir, library)
    }

    fn draft(description: &str) -> NoteDraft {
        NoteDraft {
            description: description.to_string(),
            mime_type: "image/jpeg".to_string(),
            blob: Bytes::from_static(b"\xff\xd8\xff\xe0"),
        }
    }

    async fn seed(library: &NoteLibrary, id: &str, description: &str, created_at: i64) {
        let doc = NoteDocument {
            id: id.to_string(),
            created_at,
            description: description.to_string(),
            mime_type: "image/png".to_string(),
            blob: vec![0x89, 0x50],
        };
        library.store().upsert(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn create_assigns_id_and_persists() {
        let (_dir, library) = setup().await;

        let doc = library.create(draft("  Mueller Rueckruf ")).await.unwrap();

        assert!(Uuid::parse_str(&doc.id).is_ok());
        assert_eq!(doc.description, "Mueller Rueckruf");
        assert!(doc.created_at > 0);
        let stored = library.get(&doc.id).await.unwrap();
        assert_eq!(stored, Some(doc.clone()));
        assert_eq!(library.recent(10).await[0].id, doc.id);
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft_without_writing() {
        let (_dir, library) = setup().await;

        let err = library.create(draft("   ")).await.expect_err("should fail");
        assert!(
            matches!(err, LibraryError::Validation(ValidationError::EmptyDescription)),
            "wrong error type: {err:#?}"
        );
        assert!(library.store().list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_uses_refreshed_snapshot() {
        let (_dir, library) = setup().await;
        seed(&library, "A", "Mueller Rueckruf", 100).await;
        seed(&library, "B", "Schmidt Termin", 200).await;
        seed(&library, "C", "mueller Notiz", 300).await;

        assert!(library.search("mueller").await.matches.is_empty());
        library.refresh().await.unwrap();

        let outcome = library.search("mueller").await;
        let ids: Vec<&str> = outcome.matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A"]);
        assert!(outcome.suggestion.is_none());
        assert!(outcome.recent.is_empty());
    }

    #[tokio::test]
    async fn search_without_matches_offers_suggestion() {
        let (_dir, library) = setup().await;
        seed(&library, "A", "Mueller Rueckruf", 100).await;
        seed(&library, "B", "Schmidt Termin", 200).await;
        library.refresh().await.unwrap();

        let outcome = library.search("xyz").await;
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.suggestion.map(|s| s.id), Some("B".to_string()));
        assert_eq!(outcome.recent.len(), 2);

        let blank = library.search("   ").await;
        assert!(blank.matches.is_empty());
        assert!(blank.suggestion.is_none());
    }

    #[tokio::test]
    async fn update_description_replaces_whole_record() {
        let (_dir, library) = setup().await;
        let doc = library.create(draft("old")).await.unwrap();

        let updated = library
            .update_description(&doc.id, "  new text ")
            .await
            .unwrap()
            .expect("note should exist");

        assert_eq!(updated.description, "new text");
        assert_eq!(updated.created_at, doc.created_at);
        assert_eq!(updated.blob, doc.blob);
        assert_eq!(library.search("new").await.matches.len(), 1);
        assert_eq!(library.store().list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_description_update_keeps_existing() {
        let (_dir, library) = setup().await;
        let doc = library.create(draft("keep me")).await.unwrap();

        let unchanged = library
            .update_description(&doc.id, "   ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.description, "keep me");
    }

    #[tokio::test]
    async fn update_unknown_note_is_none() {
        let (_dir, library) = setup().await;
        assert!(library.update_description("nope", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_drops_note_from_snapshot() {
        let (_dir, library) = setup().await;
        let doc = library.create(draft("Mueller")).await.unwrap();

        library.delete(&doc.id).await.unwrap();
        library.delete(&doc.id).await.expect("second delete is a no-op");

        assert!(library.recent(10).await.is_empty());
        assert!(library.search("mueller").await.matches.is_empty());
    }

    #[tokio::test]
    async fn recent_respects_limit() {
        let (_dir, library) = setup().await;
        for ts in 1..=5 {
            seed(&library, &format!("n{ts}"), "note", ts).await;
        }
        library.refresh().await.unwrap();

        let recent = library.recent(2).await;
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["n5", "n4"]);
    }

    #[test]
    fn default_description_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 0).unwrap();
        assert_eq!(default_description(now), "Note - 07.03.2026 09:05");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_leave_snapshot_in_sync() {
        let (_dir, library) = setup().await;

        let mut tasks = Vec::new();
        for i in 0..16 {
            let creator = library.clone();
            tasks.push(tokio::spawn(async move {
                creator.create(draft(&format!("note {i}"))).await.map(|_| ())
            }));
            let refresher = library.clone();
            tasks.push(tokio::spawn(async move { refresher.refresh().await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = library.store().list_all().await.unwrap();
        assert_eq!(stored.len(), 16);
        assert_eq!(library.note_count().await, 16);
        assert_eq!(library.search("note").await.matches.len(), 16);

        let recent = library.recent(usize::MAX).await;
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn recent_list_follows_sorted_snapshot() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite://{}", dir.path().join("notes.db").display());
        let store = DocumentStore::open(&url).await.unwrap();
        let settings = LibrarySettings {
            recent_limit: 2,
            ..LibrarySettings::default()
        };
        let library = NoteLibrary::load(store, settings).await.unwrap();
        seed(&library, "old", "nothing", 1).await;
        seed(&library, "mid", "nothing", 2).await;
        seed(&library, "new", "nothing", 3).await;
        library.refresh().await.unwrap();

        let outcome = library.search("xyz").await;
        let ids: Vec<&str> = outcome.recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn failed_reload_after_commit_patches_snapshot() {
        let (_dir, library) = setup().await;
        let first = library.create(draft("first")).await.unwrap();
        library.store().close().await;

        let later = NoteDocument {
            id: "later".to_string(),
            created_at: first.created_at + 1,
            description: "later".to_string(),
            mime_type: "image/png".to_string(),
            blob: vec![1],
        };
        library.refresh_after(SnapshotChange::Upsert(later)).await;

        let recent = library.recent(10).await;
        let ids: Vec<&str> = recent.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["later", first.id.as_str()]);

        library
            .refresh_after(SnapshotChange::Remove(first.id.clone()))
            .await;
        assert_eq!(library.note_count().await, 1);
        assert!(library.search("first").await.matches.is_empty());
    }

    #[tokio::test]
    async fn edited_description_is_not_length_capped() {
        let (_dir, library) = setup().await;
        let doc = library.create(draft("short")).await.unwrap();
        let long = "x".repeat(LibrarySettings::default().max_description_len + 50);

        let updated = library
            .update_description(&doc.id, &long)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.description, long);
    }
}
