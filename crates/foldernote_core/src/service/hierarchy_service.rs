//! Folder hierarchy use-case service.
//!
//! # Responsibility
//! - Validate hierarchy invariants above the repository layer.
//! - Provide folder create, update (rename/move), delete, and tree reads.
//!
//! # Invariants
//! - A folder's parent, when set, exists at the moment of the write.
//! - Moves never make a folder its own ancestor.
//! - Creates and moves never nest a folder deeper than `max_tree_depth`
//!   levels, counting roots as level 1.
//! - Deleting a folder reattaches its direct children and notes to its
//!   former parent; nothing below it is deleted.
//! - Every check-then-write sequence runs inside one `atomically` unit, so a
//!   failed operation leaves no partial effect.

use crate::config::{CoreConfig, DEFAULT_MAX_TREE_DEPTH};
use crate::model::folder::{
    Folder, FolderChanges, FolderDeleteOutcome, FolderId, FolderTreeNode, FolderUpdate,
    ParentUpdate,
};
use crate::model::note::NoteId;
use crate::model::now_epoch_ms;
use crate::repo::folder_repo::RepoError;
use crate::repo::hierarchy_repo::HierarchyStore;
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Broad failure category, one per distinct caller-facing condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; no store access was attempted.
    Validation,
    /// Target folder or note does not exist.
    NotFound,
    /// A referenced parent/owner folder does not exist.
    Reference,
    /// The change would break the forest shape.
    Invariant,
    /// Underlying storage failure.
    Store,
}

/// Errors from hierarchy and note service operations.
#[derive(Debug)]
pub enum HierarchyError {
    /// Folder name is blank after trim.
    InvalidName,
    /// Note title is blank after trim.
    InvalidTitle,
    /// Target folder does not exist.
    FolderNotFound(FolderId),
    /// Referenced parent folder does not exist.
    ParentNotFound(FolderId),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Folder a note is filed into does not exist.
    NoteFolderNotFound(FolderId),
    /// Folder was asked to become its own parent.
    SelfParent(FolderId),
    /// Requested parent lives inside the folder's own subtree.
    DescendantAsParent {
        folder_uuid: FolderId,
        parent_uuid: FolderId,
    },
    /// Placing a folder under `parent_uuid` would nest deeper than the bound.
    HierarchyTooDeep {
        parent_uuid: FolderId,
        max_depth: usize,
    },
    /// Repository-level failure.
    Store(RepoError),
}

impl HierarchyError {
    /// Returns the failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName | Self::InvalidTitle => ErrorKind::Validation,
            Self::FolderNotFound(_) | Self::NoteNotFound(_) => ErrorKind::NotFound,
            Self::ParentNotFound(_) | Self::NoteFolderNotFound(_) => ErrorKind::Reference,
            Self::SelfParent(_) | Self::DescendantAsParent { .. } | Self::HierarchyTooDeep { .. } => {
                ErrorKind::Invariant
            }
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// Returns a stable machine-readable code for logs and callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName | Self::InvalidTitle => "invalid_input",
            Self::FolderNotFound(_) => "folder_not_found",
            Self::ParentNotFound(_) => "parent_not_found",
            Self::NoteNotFound(_) => "note_not_found",
            Self::NoteFolderNotFound(_) => "note_folder_not_found",
            Self::SelfParent(_) => "self_parent",
            Self::DescendantAsParent { .. } => "descendant_as_parent",
            Self::HierarchyTooDeep { .. } => "hierarchy_too_deep",
            Self::Store(_) => "store_failure",
        }
    }
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "folder name must not be blank"),
            Self::InvalidTitle => write!(f, "note title must not be blank"),
            Self::FolderNotFound(id) => write!(f, "folder not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent folder not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::NoteFolderNotFound(id) => write!(f, "note folder not found: {id}"),
            Self::SelfParent(id) => write!(f, "folder cannot be its own parent: {id}"),
            Self::DescendantAsParent {
                folder_uuid,
                parent_uuid,
            } => write!(
                f,
                "cannot move folder {folder_uuid} into its own subtree (under {parent_uuid})"
            ),
            Self::HierarchyTooDeep {
                parent_uuid,
                max_depth,
            } => write!(
                f,
                "placing a folder under {parent_uuid} would exceed {max_depth} nesting levels"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HierarchyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for HierarchyError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::FolderNotFound(folder_uuid) => Self::FolderNotFound(folder_uuid),
            RepoError::NoteNotFound(note_uuid) => Self::NoteNotFound(note_uuid),
            other => Self::Store(other),
        }
    }
}

/// Folder hierarchy service facade.
pub struct HierarchyService<S: HierarchyStore> {
    store: S,
    max_tree_depth: usize,
}

impl<S: HierarchyStore> HierarchyService<S> {
    /// Creates service with the default nesting bound.
    pub fn new(store: S) -> Self {
        Self::with_max_depth(store, DEFAULT_MAX_TREE_DEPTH)
    }

    /// Creates service using limits from resolved configuration.
    pub fn from_config(store: S, config: &CoreConfig) -> Self {
        Self::with_max_depth(store, config.max_tree_depth)
    }

    /// Creates service with an explicit nesting bound (minimum 1).
    pub fn with_max_depth(store: S, max_tree_depth: usize) -> Self {
        Self {
            store,
            max_tree_depth: max_tree_depth.max(1),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates one folder under an optional parent.
    ///
    /// # Errors
    /// - [`HierarchyError::InvalidName`] for a blank name, before any store access.
    /// - [`HierarchyError::ParentNotFound`] when `parent_uuid` does not exist.
    /// - [`HierarchyError::HierarchyTooDeep`] when the parent already sits at
    ///   the nesting bound.
    pub fn create_folder(
        &self,
        name: impl Into<String>,
        parent_uuid: Option<FolderId>,
    ) -> HierarchyResult<Folder> {
        let name = normalize_name(name.into())?;
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<Folder> {
            if let Some(parent_uuid) = parent_uuid {
                ensure_exists(store, parent_uuid, HierarchyError::ParentNotFound)?;
                self.ensure_fits_under(store, parent_uuid, 1)?;
            }
            let folder = Folder::new(name, parent_uuid, now_epoch_ms());
            Ok(store.insert_folder(&folder)?)
        });

        log_outcome("folder_create", started_at, &result, |folder| {
            format!("folder_uuid={}", folder.folder_uuid)
        });
        result
    }

    /// Applies a partial update: rename, move, or both.
    ///
    /// `updated_at` is refreshed even when no field changes.
    ///
    /// # Errors
    /// - [`HierarchyError::InvalidName`] for a supplied blank name.
    /// - [`HierarchyError::SelfParent`] when moving under itself; checked
    ///   before any store access.
    /// - [`HierarchyError::FolderNotFound`] when the target is missing.
    /// - [`HierarchyError::ParentNotFound`] when the new parent is missing.
    /// - [`HierarchyError::DescendantAsParent`] when the new parent is inside
    ///   the target's subtree.
    /// - [`HierarchyError::HierarchyTooDeep`] when the moved subtree would
    ///   end up deeper than the nesting bound. Moves to the root level never
    ///   deepen anything and skip this check.
    pub fn update_folder(
        &self,
        folder_uuid: FolderId,
        update: FolderUpdate,
    ) -> HierarchyResult<Folder> {
        let name = update.name.map(normalize_name).transpose()?;
        if update.parent == ParentUpdate::Under(folder_uuid) {
            return Err(HierarchyError::SelfParent(folder_uuid));
        }
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<Folder> {
            ensure_exists(store, folder_uuid, HierarchyError::FolderNotFound)?;
            if let ParentUpdate::Under(parent_uuid) = update.parent {
                ensure_exists(store, parent_uuid, HierarchyError::ParentNotFound)?;
                match self.scan_subtree(store, folder_uuid, parent_uuid)? {
                    SubtreeScan::ContainsCandidate => {
                        return Err(HierarchyError::DescendantAsParent {
                            folder_uuid,
                            parent_uuid,
                        });
                    }
                    SubtreeScan::Height(height) => {
                        self.ensure_fits_under(store, parent_uuid, height)?;
                    }
                }
            }

            let changes = FolderChanges {
                name,
                parent_uuid: update.parent.target(),
                updated_at: now_epoch_ms(),
            };
            Ok(store.update_folder(folder_uuid, &changes)?)
        });

        log_outcome("folder_update", started_at, &result, |folder| {
            format!(
                "folder_uuid={} moved={}",
                folder.folder_uuid,
                update.parent != ParentUpdate::Keep
            )
        });
        result
    }

    /// Renames one folder.
    pub fn rename_folder(
        &self,
        folder_uuid: FolderId,
        name: impl Into<String>,
    ) -> HierarchyResult<Folder> {
        self.update_folder(folder_uuid, FolderUpdate::rename(name))
    }

    /// Moves one folder under a new parent, or to the root level for `None`.
    pub fn move_folder(
        &self,
        folder_uuid: FolderId,
        new_parent_uuid: Option<FolderId>,
    ) -> HierarchyResult<Folder> {
        self.update_folder(
            folder_uuid,
            FolderUpdate::reparent(ParentUpdate::from_nullable(new_parent_uuid)),
        )
    }

    /// Deletes one folder, promoting its direct children and notes to its
    /// former parent.
    ///
    /// # Errors
    /// - [`HierarchyError::FolderNotFound`] when the folder is missing,
    ///   including a second delete of the same id.
    /// - [`HierarchyError::Store`] when any cascade step fails; no step is kept.
    pub fn delete_folder(&self, folder_uuid: FolderId) -> HierarchyResult<FolderDeleteOutcome> {
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<FolderDeleteOutcome> {
            let folder = store
                .get_folder(folder_uuid)?
                .ok_or(HierarchyError::FolderNotFound(folder_uuid))?;
            let new_parent_uuid = folder.parent_uuid;

            // Reattach before removing the row so nothing references a deleted folder.
            let reattached_folders = store.reparent_children(folder_uuid, new_parent_uuid)?;
            let reattached_notes = store.reassign_folder(folder_uuid, new_parent_uuid)?;
            if !store.delete_folder(folder_uuid)? {
                return Err(HierarchyError::FolderNotFound(folder_uuid));
            }

            Ok(FolderDeleteOutcome {
                folder_uuid,
                new_parent_uuid,
                reattached_folders,
                reattached_notes,
            })
        });

        log_outcome("folder_delete", started_at, &result, |outcome| {
            format!(
                "folder_uuid={} reattached_folders={} reattached_notes={}",
                outcome.folder_uuid, outcome.reattached_folders, outcome.reattached_notes
            )
        });
        result
    }

    /// Loads one folder by id.
    pub fn get_folder(&self, folder_uuid: FolderId) -> HierarchyResult<Option<Folder>> {
        Ok(self.store.get_folder(folder_uuid)?)
    }

    /// Lists direct child folders of `parent_uuid` (root level for `None`).
    pub fn list_children(&self, parent_uuid: Option<FolderId>) -> HierarchyResult<Vec<Folder>> {
        self.store.atomically(|store| -> HierarchyResult<Vec<Folder>> {
            if let Some(parent_uuid) = parent_uuid {
                ensure_exists(store, parent_uuid, HierarchyError::ParentNotFound)?;
            }
            Ok(store.list_by_parent(parent_uuid)?)
        })
    }

    /// Reads all folders and note counts and assembles the folder forest.
    ///
    /// Folders whose parent is missing, or that are reachable only through a
    /// stored cycle, are left out of every tree and logged at `warn`.
    pub fn get_folder_tree(&self) -> HierarchyResult<Vec<FolderTreeNode>> {
        let started_at = Instant::now();

        let result = self.store.atomically(|store| -> HierarchyResult<_> {
            let folders = store.list_folders()?;
            let counts = store.count_per_folder()?;
            Ok(build_forest(folders, &counts))
        });
        let (roots, excluded) = match result {
            Ok(assembled) => assembled,
            Err(err) => {
                log_failure("folder_tree", started_at, &err);
                return Err(err);
            }
        };

        for skipped in &excluded {
            warn!(
                "event=folder_tree_orphan module=hierarchy status=skipped folder_uuid={} parent_uuid={} reason={}",
                skipped.folder.folder_uuid,
                skipped
                    .folder
                    .parent_uuid
                    .map_or_else(|| "none".to_string(), |id| id.to_string()),
                skipped.reason.as_str()
            );
        }
        info!(
            "event=folder_tree module=hierarchy status=ok duration_ms={} roots={} skipped={}",
            started_at.elapsed().as_millis(),
            roots.len(),
            excluded.len()
        );
        Ok(roots)
    }

    /// Returns the number of levels from a root down to `folder_uuid`,
    /// counting the folder itself.
    ///
    /// Stops once the bound is passed. A stored cycle or a missing ancestor
    /// ends the walk early.
    fn depth_of(&self, store: &S, folder_uuid: FolderId) -> HierarchyResult<usize> {
        let mut visited = HashSet::from([folder_uuid]);
        let mut depth = 1;
        let mut next = store
            .get_folder(folder_uuid)?
            .and_then(|folder| folder.parent_uuid);

        while let Some(parent_uuid) = next {
            if depth > self.max_tree_depth || !visited.insert(parent_uuid) {
                break;
            }
            match store.get_folder(parent_uuid)? {
                Some(parent) => {
                    depth += 1;
                    next = parent.parent_uuid;
                }
                None => break,
            }
        }
        Ok(depth)
    }

    /// Walks the subtree below `folder_uuid` breadth-first.
    ///
    /// Each folder is expanded at most once, so a stored cycle cannot loop.
    fn scan_subtree(
        &self,
        store: &S,
        folder_uuid: FolderId,
        candidate_uuid: FolderId,
    ) -> HierarchyResult<SubtreeScan> {
        let mut visited = HashSet::from([folder_uuid]);
        let mut frontier = vec![folder_uuid];
        let mut height = 0;

        while !frontier.is_empty() {
            height += 1;
            let mut next = Vec::new();
            for parent_uuid in frontier {
                for child in store.list_by_parent(Some(parent_uuid))? {
                    if child.folder_uuid == candidate_uuid {
                        return Ok(SubtreeScan::ContainsCandidate);
                    }
                    if visited.insert(child.folder_uuid) {
                        next.push(child.folder_uuid);
                    }
                }
            }
            frontier = next;
        }
        Ok(SubtreeScan::Height(height))
    }

    /// Fails when hanging `height` levels below `parent_uuid` would pass the
    /// nesting bound.
    fn ensure_fits_under(
        &self,
        store: &S,
        parent_uuid: FolderId,
        height: usize,
    ) -> HierarchyResult<()> {
        if self.depth_of(store, parent_uuid)? + height > self.max_tree_depth {
            return Err(HierarchyError::HierarchyTooDeep {
                parent_uuid,
                max_depth: self.max_tree_depth,
            });
        }
        Ok(())
    }
}

enum SubtreeScan {
    /// The searched folder sits somewhere below the subtree root.
    ContainsCandidate,
    /// Levels in the subtree, 1 for a leaf.
    Height(usize),
}

/// Why a folder was left out of the assembled forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// `parent_uuid` names a folder that does not exist.
    MissingParent,
    /// Parent exists but no root leads here (stored cycle).
    Unreachable,
}

impl ExclusionReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingParent => "missing_parent",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Folder row left out of the assembled forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedFolder {
    pub folder: Folder,
    pub reason: ExclusionReason,
}

/// Assembles folders (in storage order) into a forest.
///
/// Returns the root trees and the folders no root reaches. Uses explicit
/// work stacks, so arbitrarily deep chains assemble without recursion.
pub fn build_forest(
    folders: Vec<Folder>,
    notes_count: &HashMap<FolderId, i64>,
) -> (Vec<FolderTreeNode>, Vec<ExcludedFolder>) {
    let mut children_of: HashMap<FolderId, Vec<usize>> = HashMap::new();
    let mut root_indexes = Vec::new();
    for (index, folder) in folders.iter().enumerate() {
        match folder.parent_uuid {
            None => root_indexes.push(index),
            Some(parent_uuid) => children_of.entry(parent_uuid).or_default().push(index),
        }
    }

    // Pass 1: claim each reachable folder once and record a post-order.
    let mut placed = vec![false; folders.len()];
    let mut tree_children: Vec<Vec<usize>> = vec![Vec::new(); folders.len()];
    let mut post_order = Vec::with_capacity(folders.len());
    for &root_index in &root_indexes {
        placed[root_index] = true;
        let mut stack = vec![(root_index, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                post_order.push(index);
                continue;
            }
            stack.push((index, true));
            let claimed: Vec<usize> = children_of
                .get(&folders[index].folder_uuid)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&child_index| !placed[child_index])
                .collect();
            for &child_index in &claimed {
                placed[child_index] = true;
            }
            stack.extend(claimed.iter().rev().map(|&child_index| (child_index, false)));
            tree_children[index] = claimed;
        }
    }

    // Pass 2: children are always finished before their parent.
    let known: HashSet<FolderId> = folders.iter().map(|folder| folder.folder_uuid).collect();
    let mut rows: Vec<Option<Folder>> = folders.into_iter().map(Some).collect();
    let mut built: Vec<Option<FolderTreeNode>> = (0..rows.len()).map(|_| None).collect();
    for index in post_order {
        let Some(folder) = rows[index].take() else {
            continue;
        };
        let children = tree_children[index]
            .iter()
            .filter_map(|&child_index| built[child_index].take())
            .collect();
        built[index] = Some(FolderTreeNode {
            notes_count: notes_count.get(&folder.folder_uuid).copied().unwrap_or(0),
            folder,
            children,
        });
    }

    let roots = root_indexes
        .into_iter()
        .filter_map(|index| built[index].take())
        .collect();
    let excluded = rows
        .into_iter()
        .flatten()
        .map(|folder| {
            let reason = match folder.parent_uuid {
                Some(parent_uuid) if !known.contains(&parent_uuid) => ExclusionReason::MissingParent,
                _ => ExclusionReason::Unreachable,
            };
            ExcludedFolder { folder, reason }
        })
        .collect();

    (roots, excluded)
}

pub(crate) fn ensure_exists<S: HierarchyStore>(
    store: &S,
    folder_uuid: FolderId,
    missing: fn(FolderId) -> HierarchyError,
) -> HierarchyResult<()> {
    match store.get_folder(folder_uuid)? {
        Some(_) => Ok(()),
        None => Err(missing(folder_uuid)),
    }
}

fn normalize_name(value: String) -> HierarchyResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HierarchyError::InvalidName);
    }
    Ok(trimmed.to_string())
}

pub(crate) fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &HierarchyResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    match result {
        Ok(value) => info!(
            "event={event} module=hierarchy status=ok duration_ms={} {}",
            started_at.elapsed().as_millis(),
            describe(value)
        ),
        Err(err) => log_failure(event, started_at, err),
    }
}

pub(crate) fn log_failure(event: &str, started_at: Instant, err: &HierarchyError) {
    let duration_ms = started_at.elapsed().as_millis();
    if err.kind() == ErrorKind::Store {
        error!(
            "event={event} module=hierarchy status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        );
    } else {
        info!(
            "event={event} module=hierarchy status=rejected duration_ms={duration_ms} error_code={}",
            err.code()
        );
    }
}
