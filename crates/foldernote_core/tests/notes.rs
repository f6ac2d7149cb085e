use foldernote_core::db::open_db_in_memory;
use foldernote_core::{
    ErrorKind, Folder, FolderAssignment, FolderStore, HierarchyError, HierarchyService, NewNote,
    Note, NoteService, NoteStore, NoteUpdate, SqliteFolderRepository, SqliteHierarchyRepository,
    SqliteNoteRepository,
};
use uuid::Uuid;

#[test]
fn notes_in_folder_orders_newest_first_then_storage_order() {
    let conn = open_db_in_memory().unwrap();
    let folders = SqliteFolderRepository::try_new(&conn).unwrap();
    let repo = SqliteNoteRepository::try_new(&conn).unwrap();
    let folder = folders.insert_folder(&Folder::new("Inbox", None, 1)).unwrap();

    let mut stamped = Vec::new();
    for (title, updated_at) in [("old", 10), ("tie-a", 20), ("tie-b", 20), ("new", 30)] {
        let mut note = Note::from_new(NewNote::new(title, "").in_folder(folder.folder_uuid), 1);
        note.updated_at = updated_at;
        stamped.push(repo.insert_note(&note).unwrap());
    }

    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let titles: Vec<_> = service
        .notes_in_folder(Some(folder.folder_uuid))
        .unwrap()
        .into_iter()
        .map(|note| note.title)
        .collect();
    assert_eq!(titles, vec!["new", "tie-a", "tie-b", "old"]);
    assert_eq!(repo.count_by_folder(folder.folder_uuid).unwrap(), 4);
}

#[test]
fn unfiled_notes_are_listed_with_none() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());

    let loose = service
        .create_note(NewNote::new("Loose", "{\"ops\":[]}"))
        .unwrap();
    assert_eq!(service.notes_in_folder(None).unwrap(), vec![loose.clone()]);
    assert_eq!(loose.content, "{\"ops\":[]}");
    assert!(!loose.is_favorite);
}

#[test]
fn create_note_in_missing_folder_is_reference_error() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());

    let err = service
        .create_note(NewNote::new("Orphan", "").in_folder(Uuid::new_v4()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(err.code(), "note_folder_not_found");
    assert!(err.to_string().starts_with("note folder not found"));
    assert!(service.notes_in_folder(None).unwrap().is_empty());
}

#[test]
fn count_per_folder_skips_unfiled_notes() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let folder = service
        .store()
        .insert_folder(&Folder::new("Inbox", None, 1))
        .unwrap();

    service
        .create_note(NewNote::new("a", "").in_folder(folder.folder_uuid))
        .unwrap();
    service
        .create_note(NewNote::new("b", "").in_folder(folder.folder_uuid))
        .unwrap();
    service.create_note(NewNote::new("c", "")).unwrap();

    let counts = service.store().count_per_folder().unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.get(&folder.folder_uuid), Some(&2));
}

#[test]
fn note_moves_between_folders_and_out_of_them() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let folders = HierarchyService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let inbox = folders.create_folder("Inbox", None).unwrap();
    let archive = folders.create_folder("Archive", None).unwrap();
    let note = service
        .create_note(NewNote::new("Plan", "v1").in_folder(inbox.folder_uuid))
        .unwrap();

    let moved = service
        .update_note(
            note.note_uuid,
            NoteUpdate {
                content: Some("v2".to_string()),
                folder: FolderAssignment::Into(archive.folder_uuid),
                ..NoteUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(moved.content, "v2");
    assert_eq!(moved.title, "Plan");
    assert!(service.notes_in_folder(Some(inbox.folder_uuid)).unwrap().is_empty());
    assert_eq!(
        service.notes_in_folder(Some(archive.folder_uuid)).unwrap(),
        vec![moved.clone()]
    );

    let tree = folders.get_folder_tree().unwrap();
    let archive_node = tree
        .iter()
        .find(|node| node.folder.folder_uuid == archive.folder_uuid)
        .unwrap();
    assert_eq!(archive_node.notes_count, 1);

    let unfiled = service.move_note(note.note_uuid, None).unwrap();
    assert!(unfiled.folder_uuid.is_none());
    assert_eq!(service.store().count_by_folder(archive.folder_uuid).unwrap(), 0);
}

#[test]
fn note_update_with_missing_folder_keeps_stored_row() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let note = service.create_note(NewNote::new("Plan", "")).unwrap();
    let missing = Uuid::new_v4();

    let err = service
        .update_note(
            note.note_uuid,
            NoteUpdate {
                title: Some("Renamed".to_string()),
                folder: FolderAssignment::Into(missing),
                ..NoteUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, HierarchyError::NoteFolderNotFound(id) if id == missing));
    assert_eq!(service.get_note(note.note_uuid).unwrap(), Some(note));
}

#[test]
fn favorites_and_delete_on_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteHierarchyRepository::try_new(&conn).unwrap());
    let keep = service.create_note(NewNote::new("Keep", "")).unwrap();
    let drop_me = service.create_note(NewNote::new("Drop", "")).unwrap();

    let keep = service.set_favorite(keep.note_uuid, true).unwrap();
    service.set_favorite(drop_me.note_uuid, true).unwrap();
    assert_eq!(service.favorite_notes().unwrap().len(), 2);

    service.delete_note(drop_me.note_uuid).unwrap();
    assert_eq!(service.favorite_notes().unwrap(), vec![keep]);

    let err = service.delete_note(drop_me.note_uuid).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), "note_not_found");
}
