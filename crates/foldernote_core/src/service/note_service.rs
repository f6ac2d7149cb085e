//! Note use-case service.
//!
//! # Responsibility
//! - Create notes filed into an existing folder, or unfiled.
//! - Edit, move, favorite, and delete single notes.
//! - List notes per folder for the folder view, and favorites.
//!
//! # Invariants
//! - A note's `folder_uuid`, when set, exists at the moment of the write.
//! - Every successful update refreshes `updated_at`; `created_at` never moves.
//! - Folder and favorite listings are ordered by `updated_at DESC`, then
//!   storage order.

use crate::model::folder::FolderId;
use crate::model::note::{FolderAssignment, NewNote, Note, NoteChanges, NoteId, NoteUpdate};
use crate::model::now_epoch_ms;
use crate::repo::hierarchy_repo::HierarchyStore;
use crate::service::hierarchy_service::{
    ensure_exists, log_failure, log_outcome, HierarchyError, HierarchyResult,
};
use log::info;
use std::time::Instant;

/// Note service facade sharing the hierarchy store.
pub struct NoteService<S: HierarchyStore> {
    store: S,
}

impl<S: HierarchyStore> NoteService<S> {
    /// Creates service with store dependency.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one note.
    ///
    /// # Errors
    /// - [`HierarchyError::InvalidTitle`] for a blank title.
    /// - [`HierarchyError::NoteFolderNotFound`] when the owning folder is missing.
    pub fn create_note(&self, mut input: NewNote) -> HierarchyResult<Note> {
        input.title = normalize_title(&input.title)?;
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<Note> {
            if let Some(folder_uuid) = input.folder_uuid {
                ensure_exists(store, folder_uuid, HierarchyError::NoteFolderNotFound)?;
            }
            let note = Note::from_new(input, now_epoch_ms());
            Ok(store.insert_note(&note)?)
        });

        log_outcome("note_create", started_at, &result, |note| {
            format!(
                "note_uuid={} filed={}",
                note.note_uuid,
                note.folder_uuid.is_some()
            )
        });
        result
    }

    /// Applies a partial update to one note.
    ///
    /// # Errors
    /// - [`HierarchyError::InvalidTitle`] for a supplied blank title.
    /// - [`HierarchyError::NoteNotFound`] when the note does not exist.
    /// - [`HierarchyError::NoteFolderNotFound`] when the target folder is missing.
    pub fn update_note(&self, note_uuid: NoteId, update: NoteUpdate) -> HierarchyResult<Note> {
        let title = match update.title {
            Some(title) => Some(normalize_title(&title)?),
            None => None,
        };
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<Note> {
            if store.get_note(note_uuid)?.is_none() {
                return Err(HierarchyError::NoteNotFound(note_uuid));
            }
            if let FolderAssignment::Into(folder_uuid) = update.folder {
                ensure_exists(store, folder_uuid, HierarchyError::NoteFolderNotFound)?;
            }
            let changes = NoteChanges {
                title,
                content: update.content,
                folder_uuid: update.folder.target(),
                is_favorite: update.is_favorite,
                updated_at: now_epoch_ms(),
            };
            Ok(store.update_note(note_uuid, &changes)?)
        });

        log_outcome("note_update", started_at, &result, |note| {
            format!(
                "note_uuid={} moved={} favorite={}",
                note.note_uuid,
                update.folder != FolderAssignment::Keep,
                note.is_favorite
            )
        });
        result
    }

    /// Files a note into `folder_uuid`, or unfiles it for `None`.
    pub fn move_note(
        &self,
        note_uuid: NoteId,
        folder_uuid: Option<FolderId>,
    ) -> HierarchyResult<Note> {
        self.update_note(
            note_uuid,
            NoteUpdate::move_to(FolderAssignment::from_nullable(folder_uuid)),
        )
    }

    /// Sets or clears the favorite flag.
    pub fn set_favorite(&self, note_uuid: NoteId, is_favorite: bool) -> HierarchyResult<Note> {
        self.update_note(note_uuid, NoteUpdate::favorite(is_favorite))
    }

    /// Deletes one note.
    ///
    /// # Errors
    /// - [`HierarchyError::NoteNotFound`] when the note does not exist.
    pub fn delete_note(&self, note_uuid: NoteId) -> HierarchyResult<()> {
        let started_at = Instant::now();
        let result = match self.store.delete_note(note_uuid) {
            Ok(true) => Ok(()),
            Ok(false) => Err(HierarchyError::NoteNotFound(note_uuid)),
            Err(err) => Err(err.into()),
        };

        match &result {
            Ok(()) => info!(
                "event=note_delete module=hierarchy status=ok duration_ms={} note_uuid={note_uuid}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("note_delete", started_at, err),
        }
        result
    }

    /// Lists favorite notes across all folders, newest first.
    pub fn favorite_notes(&self) -> HierarchyResult<Vec<Note>> {
        Ok(self.store.list_favorites()?)
    }

    /// Lists notes in `folder_uuid`, or unfiled notes for `None`.
    ///
    /// An unknown folder yields an empty list.
    pub fn notes_in_folder(&self, folder_uuid: Option<FolderId>) -> HierarchyResult<Vec<Note>> {
        Ok(self.store.list_by_folder(folder_uuid)?)
    }

    /// Loads one note by id.
    pub fn get_note(&self, note_uuid: NoteId) -> HierarchyResult<Option<Note>> {
        Ok(self.store.get_note(note_uuid)?)
    }
}

fn normalize_title(value: &str) -> HierarchyResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}
