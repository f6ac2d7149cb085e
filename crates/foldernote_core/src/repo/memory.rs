//! In-memory hierarchy store.
//!
//! Mirrors the SQLite repositories closely enough to exercise hierarchy
//! rules without a database: storage-order listing, foreign-key style
//! reference checks on write, and snapshot rollback for `atomically`.
//! Faults can be injected to observe rollback behavior.

use crate::model::folder::{Folder, FolderChanges, FolderId};
use crate::model::note::{Note, NoteChanges, NoteId};
use crate::repo::folder_repo::{FolderStore, RepoError, RepoResult};
use crate::repo::hierarchy_repo::HierarchyStore;
use crate::repo::note_repo::NoteStore;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Write operation that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFault {
    InsertFolder,
    UpdateFolder,
    DeleteFolder,
    ReparentChildren,
    ReassignNotes,
    UpdateNote,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    folders: Vec<Folder>,
    notes: Vec<Note>,
}

/// Hierarchy store backed by in-process vectors.
#[derive(Debug, Default)]
pub struct InMemoryHierarchyRepository {
    state: RefCell<MemoryState>,
    fault: Cell<Option<MemoryFault>>,
    in_unit: Cell<bool>,
}

impl InMemoryHierarchyRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `fault` fail until cleared.
    pub fn inject_fault(&self, fault: MemoryFault) {
        self.fault.set(Some(fault));
    }

    /// Clears any injected fault.
    pub fn clear_fault(&self) {
        self.fault.set(None);
    }

    /// Inserts a folder row without reference checks.
    ///
    /// Lets callers reproduce corrupt stored data (orphans, cycles).
    pub fn insert_unchecked(&self, folder: Folder) {
        self.state.borrow_mut().folders.push(folder);
    }

    /// Returns the number of stored folders.
    pub fn folder_count(&self) -> usize {
        self.state.borrow().folders.len()
    }

    fn check_fault(&self, op: MemoryFault) -> RepoResult<()> {
        if self.fault.get() == Some(op) {
            return Err(RepoError::InvalidData(format!("injected fault on {op:?}")));
        }
        Ok(())
    }

    fn ensure_folder_reference(
        state: &MemoryState,
        folder_uuid: Option<FolderId>,
        column: &str,
    ) -> RepoResult<()> {
        match folder_uuid {
            Some(id) if !state.folders.iter().any(|f| f.folder_uuid == id) => Err(
                RepoError::InvalidData(format!("foreign key violation: {column} -> {id}")),
            ),
            _ => Ok(()),
        }
    }
}

impl HierarchyStore for InMemoryHierarchyRepository {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        if self.in_unit.replace(true) {
            return Err(RepoError::InvalidData("nested atomic unit".to_string()).into());
        }
        let snapshot = self.state.borrow().clone();
        let result = work(self);
        if result.is_err() {
            *self.state.borrow_mut() = snapshot;
        }
        self.in_unit.set(false);
        result
    }
}

impl FolderStore for InMemoryHierarchyRepository {
    fn insert_folder(&self, folder: &Folder) -> RepoResult<Folder> {
        self.check_fault(MemoryFault::InsertFolder)?;
        let mut state = self.state.borrow_mut();
        Self::ensure_folder_reference(&state, folder.parent_uuid, "folders.parent_uuid")?;
        if state
            .folders
            .iter()
            .any(|f| f.folder_uuid == folder.folder_uuid)
        {
            return Err(RepoError::InvalidData(format!(
                "duplicate folder id {}",
                folder.folder_uuid
            )));
        }
        state.folders.push(folder.clone());
        Ok(folder.clone())
    }

    fn get_folder(&self, folder_uuid: FolderId) -> RepoResult<Option<Folder>> {
        Ok(self
            .state
            .borrow()
            .folders
            .iter()
            .find(|f| f.folder_uuid == folder_uuid)
            .cloned())
    }

    fn update_folder(
        &self,
        folder_uuid: FolderId,
        changes: &FolderChanges,
    ) -> RepoResult<Folder> {
        self.check_fault(MemoryFault::UpdateFolder)?;
        let mut state = self.state.borrow_mut();
        if let Some(parent_uuid) = changes.parent_uuid {
            Self::ensure_folder_reference(&state, parent_uuid, "folders.parent_uuid")?;
        }
        let folder = state
            .folders
            .iter_mut()
            .find(|f| f.folder_uuid == folder_uuid)
            .ok_or(RepoError::FolderNotFound(folder_uuid))?;
        if let Some(name) = changes.name.as_ref() {
            folder.name = name.clone();
        }
        if let Some(parent_uuid) = changes.parent_uuid {
            folder.parent_uuid = parent_uuid;
        }
        folder.updated_at = changes.updated_at;
        Ok(folder.clone())
    }

    fn delete_folder(&self, folder_uuid: FolderId) -> RepoResult<bool> {
        self.check_fault(MemoryFault::DeleteFolder)?;
        let mut state = self.state.borrow_mut();
        let referenced = state
            .folders
            .iter()
            .any(|f| f.parent_uuid == Some(folder_uuid))
            || state
                .notes
                .iter()
                .any(|n| n.folder_uuid == Some(folder_uuid));
        if referenced {
            return Err(RepoError::InvalidData(format!(
                "foreign key violation: folder {folder_uuid} still referenced"
            )));
        }
        let before = state.folders.len();
        state.folders.retain(|f| f.folder_uuid != folder_uuid);
        Ok(state.folders.len() < before)
    }

    fn list_folders(&self) -> RepoResult<Vec<Folder>> {
        Ok(self.state.borrow().folders.clone())
    }

    fn list_by_parent(&self, parent_uuid: Option<FolderId>) -> RepoResult<Vec<Folder>> {
        Ok(self
            .state
            .borrow()
            .folders
            .iter()
            .filter(|f| f.parent_uuid == parent_uuid)
            .cloned()
            .collect())
    }

    fn reparent_children(
        &self,
        old_parent: FolderId,
        new_parent: Option<FolderId>,
    ) -> RepoResult<usize> {
        self.check_fault(MemoryFault::ReparentChildren)?;
        let mut state = self.state.borrow_mut();
        Self::ensure_folder_reference(&state, new_parent, "folders.parent_uuid")?;
        let mut changed = 0;
        for folder in state
            .folders
            .iter_mut()
            .filter(|f| f.parent_uuid == Some(old_parent))
        {
            folder.parent_uuid = new_parent;
            changed += 1;
        }
        Ok(changed)
    }
}

impl NoteStore for InMemoryHierarchyRepository {
    fn insert_note(&self, note: &Note) -> RepoResult<Note> {
        let mut state = self.state.borrow_mut();
        Self::ensure_folder_reference(&state, note.folder_uuid, "notes.folder_uuid")?;
        state.notes.push(note.clone());
        Ok(note.clone())
    }

    fn get_note(&self, note_uuid: NoteId) -> RepoResult<Option<Note>> {
        Ok(self
            .state
            .borrow()
            .notes
            .iter()
            .find(|n| n.note_uuid == note_uuid)
            .cloned())
    }

    fn update_note(&self, note_uuid: NoteId, changes: &NoteChanges) -> RepoResult<Note> {
        self.check_fault(MemoryFault::UpdateNote)?;
        let mut state = self.state.borrow_mut();
        if let Some(folder_uuid) = changes.folder_uuid {
            Self::ensure_folder_reference(&state, folder_uuid, "notes.folder_uuid")?;
        }
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.note_uuid == note_uuid)
            .ok_or(RepoError::NoteNotFound(note_uuid))?;
        if let Some(title) = changes.title.as_ref() {
            note.title = title.clone();
        }
        if let Some(content) = changes.content.as_ref() {
            note.content = content.clone();
        }
        if let Some(folder_uuid) = changes.folder_uuid {
            note.folder_uuid = folder_uuid;
        }
        if let Some(is_favorite) = changes.is_favorite {
            note.is_favorite = is_favorite;
        }
        note.updated_at = changes.updated_at;
        Ok(note.clone())
    }

    fn delete_note(&self, note_uuid: NoteId) -> RepoResult<bool> {
        let mut state = self.state.borrow_mut();
        let before = state.notes.len();
        state.notes.retain(|n| n.note_uuid != note_uuid);
        Ok(state.notes.len() < before)
    }

    fn list_favorites(&self) -> RepoResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .state
            .borrow()
            .notes
            .iter()
            .filter(|n| n.is_favorite)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    fn list_by_folder(&self, folder_uuid: Option<FolderId>) -> RepoResult<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .state
            .borrow()
            .notes
            .iter()
            .filter(|n| n.folder_uuid == folder_uuid)
            .cloned()
            .collect();
        // Stable sort keeps storage order among equal timestamps.
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    fn count_by_folder(&self, folder_uuid: FolderId) -> RepoResult<i64> {
        Ok(self
            .state
            .borrow()
            .notes
            .iter()
            .filter(|n| n.folder_uuid == Some(folder_uuid))
            .count() as i64)
    }

    fn count_per_folder(&self) -> RepoResult<HashMap<FolderId, i64>> {
        let mut counts = HashMap::new();
        for folder_uuid in self.state.borrow().notes.iter().filter_map(|n| n.folder_uuid) {
            *counts.entry(folder_uuid).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn reassign_folder(
        &self,
        old_folder: FolderId,
        new_folder: Option<FolderId>,
    ) -> RepoResult<usize> {
        self.check_fault(MemoryFault::ReassignNotes)?;
        let mut state = self.state.borrow_mut();
        Self::ensure_folder_reference(&state, new_folder, "notes.folder_uuid")?;
        let mut changed = 0;
        for note in state
            .notes
            .iter_mut()
            .filter(|n| n.folder_uuid == Some(old_folder))
        {
            note.folder_uuid = new_folder;
            changed += 1;
        }
        Ok(changed)
    }
}
