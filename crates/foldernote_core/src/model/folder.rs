//! Folder domain model.
//!
//! # Responsibility
//! - Define the persisted folder record and its derived tree view.
//! - Define update inputs that distinguish "not provided" from "clear".
//!
//! # Invariants
//! - `parent_uuid`, when set, references an existing folder.
//! - The parent relation forms a forest; no folder is its own ancestor.
//! - `notes_count` and `children` exist only on [`FolderTreeNode`] and are
//!   computed on read.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// Persisted folder row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Stable folder id.
    pub folder_uuid: FolderId,
    /// User-facing label, trimmed and non-blank.
    pub name: String,
    /// Parent folder id. `None` means root-level folder.
    pub parent_uuid: Option<FolderId>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Folder {
    /// Creates a new folder row with a generated id and both timestamps at `now`.
    ///
    /// Does not validate `name`; the hierarchy service normalizes it first.
    pub fn new(name: impl Into<String>, parent_uuid: Option<FolderId>, now: i64) -> Self {
        Self {
            folder_uuid: Uuid::new_v4(),
            name: name.into(),
            parent_uuid,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns whether this folder sits at the root level.
    pub fn is_root(&self) -> bool {
        self.parent_uuid.is_none()
    }
}

/// Parent change requested by a folder update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentUpdate {
    /// Leave `parent_uuid` untouched.
    #[default]
    Keep,
    /// Move the folder to the root level.
    Root,
    /// Move the folder under the given parent.
    Under(FolderId),
}

impl ParentUpdate {
    /// Builds an update from a nullable parent value that was explicitly supplied.
    pub fn from_nullable(parent_uuid: Option<FolderId>) -> Self {
        match parent_uuid {
            Some(parent_uuid) => Self::Under(parent_uuid),
            None => Self::Root,
        }
    }

    /// Returns the new `parent_uuid` value, or `None` for [`ParentUpdate::Keep`].
    pub fn target(self) -> Option<Option<FolderId>> {
        match self {
            Self::Keep => None,
            Self::Root => Some(None),
            Self::Under(parent_uuid) => Some(Some(parent_uuid)),
        }
    }
}

/// Partial update for one folder. Only supplied fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderUpdate {
    /// New name, if renaming.
    pub name: Option<String>,
    /// Parent change, if moving.
    pub parent: ParentUpdate,
}

impl FolderUpdate {
    /// Rename-only update.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            parent: ParentUpdate::Keep,
        }
    }

    /// Move-only update.
    pub fn reparent(parent: ParentUpdate) -> Self {
        Self { name: None, parent }
    }
}

/// Column values written by a folder store update.
///
/// Built by the hierarchy service after validation; `updated_at` is always set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderChanges {
    pub name: Option<String>,
    pub parent_uuid: Option<Option<FolderId>>,
    pub updated_at: i64,
}

/// Folder with derived children and note count, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderTreeNode {
    #[serde(flatten)]
    pub folder: Folder,
    /// Number of notes whose `folder_uuid` is this folder.
    pub notes_count: i64,
    /// Direct child folders in storage order.
    pub children: Vec<FolderTreeNode>,
}

impl FolderTreeNode {
    /// Returns the total number of folders in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        let mut pending = vec![self];
        let mut len = 0;
        while let Some(node) = pending.pop() {
            len += 1;
            pending.extend(node.children.iter());
        }
        len
    }

    /// Finds a folder by id in this subtree, depth-first in child order.
    pub fn find(&self, folder_uuid: FolderId) -> Option<&FolderTreeNode> {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            if node.folder.folder_uuid == folder_uuid {
                return Some(node);
            }
            pending.extend(node.children.iter().rev());
        }
        None
    }

    /// Returns direct child ids in order.
    pub fn child_ids(&self) -> Vec<FolderId> {
        self.children
            .iter()
            .map(|child| child.folder.folder_uuid)
            .collect()
    }
}

impl Drop for FolderTreeNode {
    // Flattens nested children so dropping a deep chain never recurses.
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Outcome of a successful folder delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FolderDeleteOutcome {
    /// Deleted folder id.
    pub folder_uuid: FolderId,
    /// Former parent that inherited children and notes.
    pub new_parent_uuid: Option<FolderId>,
    /// Number of direct child folders reattached.
    pub reattached_folders: usize,
    /// Number of notes reattached.
    pub reattached_notes: usize,
}

#[cfg(test)]
mod tests {
    use super::{Folder, FolderTreeNode, ParentUpdate};
    use uuid::Uuid;

    fn node(name: &str, children: Vec<FolderTreeNode>) -> FolderTreeNode {
        FolderTreeNode {
            folder: Folder {
                folder_uuid: Uuid::new_v4(),
                name: name.to_string(),
                parent_uuid: None,
                created_at: 0,
                updated_at: 0,
            },
            notes_count: 0,
            children,
        }
    }

    #[test]
    fn parent_update_target_distinguishes_keep_from_root() {
        let parent = Uuid::new_v4();
        assert_eq!(ParentUpdate::Keep.target(), None);
        assert_eq!(ParentUpdate::Root.target(), Some(None));
        assert_eq!(ParentUpdate::Under(parent).target(), Some(Some(parent)));
        assert_eq!(ParentUpdate::from_nullable(None), ParentUpdate::Root);
    }

    #[test]
    fn tree_node_find_and_len_walk_nested_children() {
        let leaf = node("leaf", Vec::new());
        let leaf_id = leaf.folder.folder_uuid;
        let root = node("root", vec![node("mid", vec![leaf]), node("side", Vec::new())]);

        assert_eq!(root.subtree_len(), 4);
        assert_eq!(root.find(leaf_id).map(|n| n.folder.name.as_str()), Some("leaf"));
        assert!(root.find(Uuid::new_v4()).is_none());
    }

    #[test]
    fn deep_chain_walks_and_drops_without_recursion() {
        let mut chain = node("leaf", Vec::new());
        let leaf_id = chain.folder.folder_uuid;
        for depth in 0..50_000 {
            chain = node(&format!("level-{depth}"), vec![chain]);
        }

        assert_eq!(chain.subtree_len(), 50_001);
        assert!(chain.find(leaf_id).is_some());
        drop(chain);
    }

    #[test]
    fn tree_node_serializes_flat_folder_fields() {
        let root = node("root", Vec::new());
        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["name"], "root");
        assert_eq!(json["notes_count"], 0);
        assert!(json["parent_uuid"].is_null());
        assert!(json["children"].as_array().unwrap().is_empty());
    }
}
