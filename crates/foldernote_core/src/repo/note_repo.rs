//! Note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide note row access keyed by `folder_uuid`.
//! - Own the bulk reassignment used by folder deletion.
//!
//! # Invariants
//! - `reassign_folder` touches only rows whose `folder_uuid` equals the old id.
//! - Folder and favorite listings are ordered `updated_at DESC`, then
//!   storage order.

use crate::model::folder::FolderId;
use crate::model::note::{Note, NoteChanges, NoteId};
use crate::repo::folder_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_table_ready, parse_uuid};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;

const NOTE_SELECT_SQL: &str = "SELECT
    note_uuid,
    title,
    content,
    folder_uuid,
    is_favorite,
    created_at,
    updated_at
FROM notes";

const NOTE_COLUMNS: &[&str] = &[
    "note_uuid",
    "title",
    "content",
    "folder_uuid",
    "is_favorite",
    "created_at",
    "updated_at",
];

/// Row access for the note table.
pub trait NoteStore {
    /// Inserts one note row and returns it as persisted.
    fn insert_note(&self, note: &Note) -> RepoResult<Note>;
    /// Loads one note by id.
    fn get_note(&self, note_uuid: NoteId) -> RepoResult<Option<Note>>;
    /// Applies column changes to one note and returns the updated row.
    ///
    /// Fails with [`RepoError::NoteNotFound`] when the row is missing.
    fn update_note(&self, note_uuid: NoteId, changes: &NoteChanges) -> RepoResult<Note>;
    /// Deletes one note row. Returns whether a row was removed.
    fn delete_note(&self, note_uuid: NoteId) -> RepoResult<bool>;
    /// Lists notes in `folder_uuid` (unfiled notes for `None`).
    fn list_by_folder(&self, folder_uuid: Option<FolderId>) -> RepoResult<Vec<Note>>;
    /// Lists favorite notes across all folders.
    fn list_favorites(&self) -> RepoResult<Vec<Note>>;
    /// Counts notes whose `folder_uuid` equals `folder_uuid`.
    fn count_by_folder(&self, folder_uuid: FolderId) -> RepoResult<i64>;
    /// Counts notes for every folder that holds at least one note.
    fn count_per_folder(&self) -> RepoResult<HashMap<FolderId, i64>>;
    /// Moves every note in `old_folder` to `new_folder`. Returns rows changed.
    fn reassign_folder(
        &self,
        old_folder: FolderId,
        new_folder: Option<FolderId>,
    ) -> RepoResult<usize>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "notes", NOTE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl NoteStore for SqliteNoteRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<Note> {
        self.conn.execute(
            "INSERT INTO notes (
                note_uuid,
                title,
                content,
                folder_uuid,
                is_favorite,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                note.note_uuid.to_string(),
                note.title.as_str(),
                note.content.as_str(),
                note.folder_uuid.map(|value| value.to_string()),
                i64::from(note.is_favorite),
                note.created_at,
                note.updated_at,
            ],
        )?;
        self.get_note(note.note_uuid)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted note {} not readable", note.note_uuid))
        })
    }

    fn get_note(&self, note_uuid: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE note_uuid = ?1;"))?;
        let mut rows = stmt.query([note_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn update_note(&self, note_uuid: NoteId, changes: &NoteChanges) -> RepoResult<Note> {
        let mut sql = String::from("UPDATE notes SET updated_at = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(changes.updated_at)];

        if let Some(title) = changes.title.as_ref() {
            sql.push_str(", title = ?");
            bind_values.push(Value::Text(title.clone()));
        }
        if let Some(content) = changes.content.as_ref() {
            sql.push_str(", content = ?");
            bind_values.push(Value::Text(content.clone()));
        }
        if let Some(folder_uuid) = changes.folder_uuid {
            sql.push_str(", folder_uuid = ?");
            bind_values.push(match folder_uuid {
                Some(folder_uuid) => Value::Text(folder_uuid.to_string()),
                None => Value::Null,
            });
        }
        if let Some(is_favorite) = changes.is_favorite {
            sql.push_str(", is_favorite = ?");
            bind_values.push(Value::Integer(i64::from(is_favorite)));
        }

        sql.push_str(" WHERE note_uuid = ?;");
        bind_values.push(Value::Text(note_uuid.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NoteNotFound(note_uuid));
        }
        self.get_note(note_uuid)?
            .ok_or(RepoError::NoteNotFound(note_uuid))
    }

    fn delete_note(&self, note_uuid: NoteId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM notes WHERE note_uuid = ?1;",
            [note_uuid.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn list_favorites(&self) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL} WHERE is_favorite = 1 ORDER BY updated_at DESC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn list_by_folder(&self, folder_uuid: Option<FolderId>) -> RepoResult<Vec<Note>> {
        let mut notes = Vec::new();
        match folder_uuid {
            Some(folder_uuid) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{NOTE_SELECT_SQL} WHERE folder_uuid = ?1 ORDER BY updated_at DESC, rowid ASC;"
                ))?;
                let mut rows = stmt.query([folder_uuid.to_string()])?;
                while let Some(row) = rows.next()? {
                    notes.push(parse_note_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{NOTE_SELECT_SQL} WHERE folder_uuid IS NULL ORDER BY updated_at DESC, rowid ASC;"
                ))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    notes.push(parse_note_row(row)?);
                }
            }
        }
        Ok(notes)
    }

    fn count_by_folder(&self, folder_uuid: FolderId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE folder_uuid = ?1;",
            [folder_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_per_folder(&self) -> RepoResult<HashMap<FolderId, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT folder_uuid, COUNT(*)
             FROM notes
             WHERE folder_uuid IS NOT NULL
             GROUP BY folder_uuid;",
        )?;
        let mut rows = stmt.query([])?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let folder_uuid_text: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(parse_uuid(&folder_uuid_text, "notes.folder_uuid")?, count);
        }
        Ok(counts)
    }

    fn reassign_folder(
        &self,
        old_folder: FolderId,
        new_folder: Option<FolderId>,
    ) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET folder_uuid = ?2
             WHERE folder_uuid = ?1;",
            params![
                old_folder.to_string(),
                new_folder.map(|value| value.to_string()),
            ],
        )?;
        Ok(changed)
    }
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let note_uuid_text: String = row.get("note_uuid")?;
    let folder_uuid = row
        .get::<_, Option<String>>("folder_uuid")?
        .map(|value| parse_uuid(&value, "notes.folder_uuid"))
        .transpose()?;

    let is_favorite = match row.get::<_, i64>("is_favorite")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_favorite value `{other}` in notes.is_favorite"
            )));
        }
    };

    Ok(Note {
        note_uuid: parse_uuid(&note_uuid_text, "notes.note_uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        folder_uuid,
        is_favorite,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{NoteStore, SqliteNoteRepository};
    use crate::db::open_db_in_memory;
    use crate::model::folder::Folder;
    use crate::model::note::{NewNote, Note, NoteChanges};
    use crate::repo::folder_repo::{FolderStore, RepoError, SqliteFolderRepository};
    use uuid::Uuid;

    fn changes(updated_at: i64) -> NoteChanges {
        NoteChanges {
            title: None,
            content: None,
            folder_uuid: None,
            is_favorite: None,
            updated_at,
        }
    }

    #[test]
    fn update_applies_only_supplied_columns() {
        let conn = open_db_in_memory().unwrap();
        let folders = SqliteFolderRepository::try_new(&conn).unwrap();
        let notes = SqliteNoteRepository::try_new(&conn).unwrap();
        let folder = folders.insert_folder(&Folder::new("Inbox", None, 1)).unwrap();
        let note = notes
            .insert_note(&Note::from_new(NewNote::new("Draft", "body"), 10))
            .unwrap();

        let updated = notes
            .update_note(
                note.note_uuid,
                &NoteChanges {
                    title: Some("Final".to_string()),
                    folder_uuid: Some(Some(folder.folder_uuid)),
                    is_favorite: Some(true),
                    ..changes(20)
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content, "body");
        assert_eq!(updated.folder_uuid, Some(folder.folder_uuid));
        assert!(updated.is_favorite);
        assert_eq!(updated.created_at, 10);
        assert_eq!(updated.updated_at, 20);

        let unfiled = notes
            .update_note(
                note.note_uuid,
                &NoteChanges {
                    folder_uuid: Some(None),
                    ..changes(30)
                },
            )
            .unwrap();
        assert!(unfiled.folder_uuid.is_none());
        assert!(unfiled.is_favorite);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let conn = open_db_in_memory().unwrap();
        let notes = SqliteNoteRepository::try_new(&conn).unwrap();
        let missing = Uuid::new_v4();

        let err = notes.update_note(missing, &changes(1)).unwrap_err();
        assert!(matches!(err, RepoError::NoteNotFound(id) if id == missing));

        let note = notes
            .insert_note(&Note::from_new(NewNote::new("Gone", ""), 1))
            .unwrap();
        assert!(notes.delete_note(note.note_uuid).unwrap());
        assert!(!notes.delete_note(note.note_uuid).unwrap());
    }

    #[test]
    fn favorites_list_newest_first() {
        let conn = open_db_in_memory().unwrap();
        let notes = SqliteNoteRepository::try_new(&conn).unwrap();
        for (title, updated_at, is_favorite) in
            [("old", 10, true), ("plain", 40, false), ("new", 30, true)]
        {
            let mut input = NewNote::new(title, "");
            input.is_favorite = is_favorite;
            let mut note = Note::from_new(input, 1);
            note.updated_at = updated_at;
            notes.insert_note(&note).unwrap();
        }

        let titles: Vec<_> = notes
            .list_favorites()
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[test]
    fn counts_and_reassignment_follow_folder_uuid() {
        let conn = open_db_in_memory().unwrap();
        let folders = SqliteFolderRepository::try_new(&conn).unwrap();
        let notes = SqliteNoteRepository::try_new(&conn).unwrap();

        let source = folders.insert_folder(&Folder::new("Source", None, 1)).unwrap();
        let target = folders.insert_folder(&Folder::new("Target", None, 1)).unwrap();
        for title in ["a", "b"] {
            notes
                .insert_note(&Note::from_new(
                    NewNote::new(title, "").in_folder(source.folder_uuid),
                    1,
                ))
                .unwrap();
        }
        notes
            .insert_note(&Note::from_new(NewNote::new("loose", ""), 1))
            .unwrap();

        assert_eq!(notes.count_by_folder(source.folder_uuid).unwrap(), 2);
        let per_folder = notes.count_per_folder().unwrap();
        assert_eq!(per_folder.get(&source.folder_uuid), Some(&2));
        assert_eq!(per_folder.get(&target.folder_uuid), None);

        let moved = notes
            .reassign_folder(source.folder_uuid, Some(target.folder_uuid))
            .unwrap();
        assert_eq!(moved, 2);
        assert_eq!(notes.count_by_folder(source.folder_uuid).unwrap(), 0);
        assert_eq!(notes.count_by_folder(target.folder_uuid).unwrap(), 2);
        assert_eq!(notes.list_by_folder(None).unwrap().len(), 1);
    }

    #[test]
    fn list_by_folder_orders_newest_first() {
        let conn = open_db_in_memory().unwrap();
        let notes = SqliteNoteRepository::try_new(&conn).unwrap();

        let older = notes
            .insert_note(&Note::from_new(NewNote::new("older", ""), 100))
            .unwrap();
        let newer = notes
            .insert_note(&Note::from_new(NewNote::new("newer", ""), 200))
            .unwrap();

        let listed = notes.list_by_folder(None).unwrap();
        assert_eq!(listed[0].note_uuid, newer.note_uuid);
        assert_eq!(listed[1].note_uuid, older.note_uuid);
    }
}
