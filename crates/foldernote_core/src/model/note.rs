//! Note domain model.
//!
//! Notes are referenced by the folder hierarchy only through `folder_uuid`.

use crate::model::folder::FolderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable note identifier.
pub type NoteId = Uuid;

/// Persisted note row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note_uuid: NoteId,
    pub title: String,
    /// Serialized editor document; opaque to core.
    pub content: String,
    /// Owning folder. `None` means unfiled.
    pub folder_uuid: Option<FolderId>,
    pub is_favorite: bool,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Note {
    /// Builds a new note row from creation input with both timestamps at `now`.
    pub fn from_new(input: NewNote, now: i64) -> Self {
        Self {
            note_uuid: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            folder_uuid: input.folder_uuid,
            is_favorite: input.is_favorite,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for note creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub folder_uuid: Option<FolderId>,
    pub is_favorite: bool,
}

impl NewNote {
    /// Creates an unfiled, non-favorite note input.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            folder_uuid: None,
            is_favorite: false,
        }
    }

    /// Places the note into a folder.
    pub fn in_folder(mut self, folder_uuid: FolderId) -> Self {
        self.folder_uuid = Some(folder_uuid);
        self
    }
}

/// Tri-state folder field of a note update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderAssignment {
    /// Leave the owning folder unchanged.
    #[default]
    Keep,
    /// Take the note out of every folder.
    Unfiled,
    /// File the note into this folder.
    Into(FolderId),
}

impl FolderAssignment {
    /// Maps a nullable folder id to `Unfiled` / `Into`.
    pub fn from_nullable(folder_uuid: Option<FolderId>) -> Self {
        match folder_uuid {
            Some(folder_uuid) => Self::Into(folder_uuid),
            None => Self::Unfiled,
        }
    }

    /// Returns the column write: `None` keeps, `Some(value)` sets `value`.
    pub fn target(self) -> Option<Option<FolderId>> {
        match self {
            Self::Keep => None,
            Self::Unfiled => Some(None),
            Self::Into(folder_uuid) => Some(Some(folder_uuid)),
        }
    }
}

/// Partial note update. Unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: FolderAssignment,
    pub is_favorite: Option<bool>,
}

impl NoteUpdate {
    /// Update that only moves the note.
    pub fn move_to(folder: FolderAssignment) -> Self {
        Self {
            folder,
            ..Self::default()
        }
    }

    /// Update that only sets the favorite flag.
    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }
}

/// Column writes applied by the note repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder_uuid: Option<Option<FolderId>>,
    pub is_favorite: Option<bool>,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{FolderAssignment, NoteUpdate};
    use uuid::Uuid;

    #[test]
    fn folder_assignment_target_distinguishes_keep_from_unfiled() {
        let folder = Uuid::new_v4();
        assert_eq!(FolderAssignment::Keep.target(), None);
        assert_eq!(FolderAssignment::Unfiled.target(), Some(None));
        assert_eq!(FolderAssignment::Into(folder).target(), Some(Some(folder)));
        assert_eq!(
            FolderAssignment::from_nullable(Some(folder)),
            FolderAssignment::Into(folder)
        );
    }

    #[test]
    fn update_helpers_touch_single_field() {
        let favorite = NoteUpdate::favorite(true);
        assert_eq!(favorite.is_favorite, Some(true));
        assert!(favorite.title.is_none());
        assert_eq!(favorite.folder, FolderAssignment::Keep);

        let moved = NoteUpdate::move_to(FolderAssignment::Unfiled);
        assert_eq!(moved.folder, FolderAssignment::Unfiled);
        assert!(moved.is_favorite.is_none());
    }
}
