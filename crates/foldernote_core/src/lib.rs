//! Core domain logic for FolderNote.
//! This crate is the single source of truth for folder hierarchy invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::folder::{
    Folder, FolderDeleteOutcome, FolderId, FolderTreeNode, FolderUpdate, ParentUpdate,
};
pub use model::note::{FolderAssignment, NewNote, Note, NoteChanges, NoteId, NoteUpdate};
pub use repo::folder_repo::{FolderStore, RepoError, RepoResult, SqliteFolderRepository};
pub use repo::hierarchy_repo::{HierarchyStore, SqliteHierarchyRepository};
pub use repo::memory::{InMemoryHierarchyRepository, MemoryFault};
pub use repo::note_repo::{NoteStore, SqliteNoteRepository};
pub use service::hierarchy_service::{
    ErrorKind, HierarchyError, HierarchyResult, HierarchyService,
};
pub use service::note_service::NoteService;

/// Returns the core crate version, as reported by `foldernote --version`.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
        assert_eq!(core_version().split('.').count(), 3);
    }
}
