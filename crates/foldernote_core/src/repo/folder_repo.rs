//! Folder repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide plain row access for the `folders` table.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Repository methods do not validate hierarchy rules; the hierarchy
//!   service does that inside one atomic unit.
//! - Listing order is storage order (`rowid ASC`).
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::folder::{Folder, FolderChanges, FolderId};
use crate::model::note::NoteId;
use crate::repo::schema::{ensure_table_ready, parse_uuid};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const FOLDER_SELECT_SQL: &str = "SELECT
    folder_uuid,
    name,
    parent_uuid,
    created_at,
    updated_at
FROM folders";

const FOLDER_COLUMNS: &[&str] = &[
    "folder_uuid",
    "name",
    "parent_uuid",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error shared by folder and note repositories.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target folder row does not exist.
    FolderNotFound(FolderId),
    /// Target note row does not exist.
    NoteNotFound(NoteId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::FolderNotFound(id) => write!(f, "folder row not found: {id}"),
            Self::NoteNotFound(id) => write!(f, "note row not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row access for the folder table.
pub trait FolderStore {
    /// Inserts one folder row and returns it as persisted.
    fn insert_folder(&self, folder: &Folder) -> RepoResult<Folder>;
    /// Loads one folder by id.
    fn get_folder(&self, folder_uuid: FolderId) -> RepoResult<Option<Folder>>;
    /// Applies column changes to one folder and returns the updated row.
    ///
    /// Fails with [`RepoError::FolderNotFound`] when the row is missing.
    fn update_folder(&self, folder_uuid: FolderId, changes: &FolderChanges)
        -> RepoResult<Folder>;
    /// Deletes one folder row. Returns whether a row was removed.
    fn delete_folder(&self, folder_uuid: FolderId) -> RepoResult<bool>;
    /// Lists all folders in storage order.
    fn list_folders(&self) -> RepoResult<Vec<Folder>>;
    /// Lists direct children of `parent_uuid` (root level for `None`).
    fn list_by_parent(&self, parent_uuid: Option<FolderId>) -> RepoResult<Vec<Folder>>;
    /// Moves every direct child of `old_parent` under `new_parent`.
    fn reparent_children(
        &self,
        old_parent: FolderId,
        new_parent: Option<FolderId>,
    ) -> RepoResult<usize>;
}

/// SQLite-backed folder repository.
pub struct SqliteFolderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFolderRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "folders", FOLDER_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl FolderStore for SqliteFolderRepository<'_> {
    fn insert_folder(&self, folder: &Folder) -> RepoResult<Folder> {
        self.conn.execute(
            "INSERT INTO folders (
                folder_uuid,
                name,
                parent_uuid,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                folder.folder_uuid.to_string(),
                folder.name.as_str(),
                folder.parent_uuid.map(|value| value.to_string()),
                folder.created_at,
                folder.updated_at,
            ],
        )?;
        load_required_folder(self.conn, folder.folder_uuid)
    }

    fn get_folder(&self, folder_uuid: FolderId) -> RepoResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE folder_uuid = ?1;"))?;
        let mut rows = stmt.query([folder_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn update_folder(
        &self,
        folder_uuid: FolderId,
        changes: &FolderChanges,
    ) -> RepoResult<Folder> {
        let mut sql = String::from("UPDATE folders SET updated_at = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(changes.updated_at)];

        if let Some(name) = changes.name.as_ref() {
            sql.push_str(", name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(parent_uuid) = changes.parent_uuid {
            sql.push_str(", parent_uuid = ?");
            bind_values.push(match parent_uuid {
                Some(parent_uuid) => Value::Text(parent_uuid.to_string()),
                None => Value::Null,
            });
        }

        sql.push_str(" WHERE folder_uuid = ?;");
        bind_values.push(Value::Text(folder_uuid.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::FolderNotFound(folder_uuid));
        }
        load_required_folder(self.conn, folder_uuid)
    }

    fn delete_folder(&self, folder_uuid: FolderId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM folders WHERE folder_uuid = ?1;",
            [folder_uuid.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn list_folders(&self) -> RepoResult<Vec<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(row)?);
        }
        Ok(folders)
    }

    fn list_by_parent(&self, parent_uuid: Option<FolderId>) -> RepoResult<Vec<Folder>> {
        let mut folders = Vec::new();
        if let Some(parent_uuid) = parent_uuid {
            let mut stmt = self.conn.prepare(&format!(
                "{FOLDER_SELECT_SQL} WHERE parent_uuid = ?1 ORDER BY rowid ASC;"
            ))?;
            let mut rows = stmt.query([parent_uuid.to_string()])?;
            while let Some(row) = rows.next()? {
                folders.push(parse_folder_row(row)?);
            }
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "{FOLDER_SELECT_SQL} WHERE parent_uuid IS NULL ORDER BY rowid ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                folders.push(parse_folder_row(row)?);
            }
        }
        Ok(folders)
    }

    fn reparent_children(
        &self,
        old_parent: FolderId,
        new_parent: Option<FolderId>,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE folders
             SET parent_uuid = ?2
             WHERE parent_uuid = ?1;",
            params![
                old_parent.to_string(),
                new_parent.map(|value| value.to_string()),
            ],
        )?;
        Ok(changed)
    }
}

fn load_required_folder(conn: &Connection, folder_uuid: FolderId) -> RepoResult<Folder> {
    conn.query_row(
        &format!("{FOLDER_SELECT_SQL} WHERE folder_uuid = ?1;"),
        [folder_uuid.to_string()],
        |row| Ok(parse_folder_row(row)),
    )
    .optional()?
    .unwrap_or(Err(RepoError::FolderNotFound(folder_uuid)))
}

fn parse_folder_row(row: &Row<'_>) -> RepoResult<Folder> {
    let folder_uuid_text: String = row.get("folder_uuid")?;
    let parent_uuid = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "folders.parent_uuid"))
        .transpose()?;

    Ok(Folder {
        folder_uuid: parse_uuid(&folder_uuid_text, "folders.folder_uuid")?,
        name: row.get("name")?,
        parent_uuid,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{FolderStore, RepoError, SqliteFolderRepository};
    use crate::db::open_db_in_memory;
    use crate::model::folder::{Folder, FolderChanges};
    use rusqlite::Connection;
    use uuid::Uuid;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteFolderRepository::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn update_applies_only_supplied_columns() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteFolderRepository::try_new(&conn).unwrap();
        let parent = repo.insert_folder(&Folder::new("Parent", None, 10)).unwrap();
        let child = repo
            .insert_folder(&Folder::new("Child", Some(parent.folder_uuid), 10))
            .unwrap();

        let renamed = repo
            .update_folder(
                child.folder_uuid,
                &FolderChanges {
                    name: Some("Renamed".to_string()),
                    parent_uuid: None,
                    updated_at: 20,
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.parent_uuid, Some(parent.folder_uuid));
        assert_eq!(renamed.created_at, 10);
        assert_eq!(renamed.updated_at, 20);

        let moved = repo
            .update_folder(
                child.folder_uuid,
                &FolderChanges {
                    name: None,
                    parent_uuid: Some(None),
                    updated_at: 30,
                },
            )
            .unwrap();
        assert_eq!(moved.name, "Renamed");
        assert_eq!(moved.parent_uuid, None);
    }

    #[test]
    fn update_missing_row_reports_not_found() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteFolderRepository::try_new(&conn).unwrap();
        let missing = Uuid::new_v4();

        let err = repo
            .update_folder(
                missing,
                &FolderChanges {
                    name: None,
                    parent_uuid: None,
                    updated_at: 1,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RepoError::FolderNotFound(id) if id == missing));
    }

    #[test]
    fn list_by_parent_keeps_storage_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteFolderRepository::try_new(&conn).unwrap();
        let root = repo.insert_folder(&Folder::new("Root", None, 1)).unwrap();
        let names = ["zeta", "alpha", "mid"];
        for name in names {
            repo.insert_folder(&Folder::new(name, Some(root.folder_uuid), 1))
                .unwrap();
        }

        let children = repo.list_by_parent(Some(root.folder_uuid)).unwrap();
        let listed: Vec<_> = children.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(listed, names);

        let roots = repo.list_by_parent(None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].folder_uuid, root.folder_uuid);
    }

    #[test]
    fn delete_reports_whether_row_existed() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteFolderRepository::try_new(&conn).unwrap();
        let folder = repo.insert_folder(&Folder::new("Gone", None, 1)).unwrap();

        assert!(repo.delete_folder(folder.folder_uuid).unwrap());
        assert!(!repo.delete_folder(folder.folder_uuid).unwrap());
        assert!(repo.get_folder(folder.folder_uuid).unwrap().is_none());
    }
}
