//! Combined folder/note store with an explicit atomic-unit boundary.
//!
//! # Responsibility
//! - Expose folder and note row access through one handle.
//! - Own the transaction boundary used by hierarchy read-check-write sequences.
//!
//! # Invariants
//! - Work passed to `atomically` is committed only when it returns `Ok`.
//! - SQLite units take the writer lock up front (`BEGIN IMMEDIATE`), so a
//!   concurrent writer cannot interleave between a check and its write.
//! - `atomically` must not be nested.

use crate::model::folder::{Folder, FolderChanges, FolderId};
use crate::model::note::{Note, NoteChanges, NoteId};
use crate::repo::folder_repo::{FolderStore, RepoError, RepoResult, SqliteFolderRepository};
use crate::repo::note_repo::{NoteStore, SqliteNoteRepository};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;

/// Store seam consumed by the hierarchy service.
pub trait HierarchyStore: FolderStore + NoteStore {
    /// Runs `work` as one all-or-nothing unit against this store.
    ///
    /// Any `Err` returned by `work` discards every write it performed.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed hierarchy store over one connection.
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
    folders: SqliteFolderRepository<'conn>,
    notes: SqliteNoteRepository<'conn>,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            conn,
            folders: SqliteFolderRepository::try_new(conn)?,
            notes: SqliteNoteRepository::try_new(conn)?,
        })
    }
}

impl HierarchyStore for SqliteHierarchyRepository<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        // Statements issued through `self.conn` run inside `tx`; dropping it rolls back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = work(self)?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

impl FolderStore for SqliteHierarchyRepository<'_> {
    fn insert_folder(&self, folder: &Folder) -> RepoResult<Folder> {
        self.folders.insert_folder(folder)
    }

    fn get_folder(&self, folder_uuid: FolderId) -> RepoResult<Option<Folder>> {
        self.folders.get_folder(folder_uuid)
    }

    fn update_folder(
        &self,
        folder_uuid: FolderId,
        changes: &FolderChanges,
    ) -> RepoResult<Folder> {
        self.folders.update_folder(folder_uuid, changes)
    }

    fn delete_folder(&self, folder_uuid: FolderId) -> RepoResult<bool> {
        self.folders.delete_folder(folder_uuid)
    }

    fn list_folders(&self) -> RepoResult<Vec<Folder>> {
        self.folders.list_folders()
    }

    fn list_by_parent(&self, parent_uuid: Option<FolderId>) -> RepoResult<Vec<Folder>> {
        self.folders.list_by_parent(parent_uuid)
    }

    fn reparent_children(
        &self,
        old_parent: FolderId,
        new_parent: Option<FolderId>,
    ) -> RepoResult<usize> {
        self.folders.reparent_children(old_parent, new_parent)
    }
}

impl NoteStore for SqliteHierarchyRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<Note> {
        self.notes.insert_note(note)
    }

    fn get_note(&self, note_uuid: NoteId) -> RepoResult<Option<Note>> {
        self.notes.get_note(note_uuid)
    }

    fn update_note(&self, note_uuid: NoteId, changes: &NoteChanges) -> RepoResult<Note> {
        self.notes.update_note(note_uuid, changes)
    }

    fn delete_note(&self, note_uuid: NoteId) -> RepoResult<bool> {
        self.notes.delete_note(note_uuid)
    }

    fn list_by_folder(&self, folder_uuid: Option<FolderId>) -> RepoResult<Vec<Note>> {
        self.notes.list_by_folder(folder_uuid)
    }

    fn list_favorites(&self) -> RepoResult<Vec<Note>> {
        self.notes.list_favorites()
    }

    fn count_by_folder(&self, folder_uuid: FolderId) -> RepoResult<i64> {
        self.notes.count_by_folder(folder_uuid)
    }

    fn count_per_folder(&self) -> RepoResult<HashMap<FolderId, i64>> {
        self.notes.count_per_folder()
    }

    fn reassign_folder(
        &self,
        old_folder: FolderId,
        new_folder: Option<FolderId>,
    ) -> RepoResult<usize> {
        self.notes.reassign_folder(old_folder, new_folder)
    }
}
