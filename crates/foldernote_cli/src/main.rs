//! foldernote: command-line frontend for the folder hierarchy.
//!
//! Reads configuration from `FOLDERNOTE_*` environment variables, with
//! flags taking precedence, and prints results as JSON.

use clap::{Parser, Subcommand};
use foldernote_core::db::open_db;
use foldernote_core::{
    core_version, init_logging_from_config, CoreConfig, ErrorKind, FolderAssignment,
    HierarchyError, HierarchyService, NewNote, NoteService, NoteUpdate, SqliteHierarchyRepository,
};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "foldernote")]
#[command(author, version = core_version(), about = "Manage a folder hierarchy of notes")]
#[command(propagate_version = true)]
struct Cli {
    /// SQLite database file (overrides FOLDERNOTE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Absolute log directory (overrides FOLDERNOTE_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (overrides FOLDERNOTE_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the folder forest with note counts
    Tree,

    /// Create a folder
    Mkdir {
        /// Folder name
        name: String,

        /// Parent folder id (root level when omitted)
        #[arg(short, long)]
        parent: Option<Uuid>,
    },

    /// Rename a folder
    Rename {
        /// Folder id
        id: Uuid,

        /// New name
        name: String,
    },

    /// Move a folder under another folder or to the root level
    Mv {
        /// Folder id
        id: Uuid,

        /// New parent folder id
        #[arg(short, long, conflicts_with = "root", required_unless_present = "root")]
        parent: Option<Uuid>,

        /// Move to the root level
        #[arg(long)]
        root: bool,
    },

    /// Delete a folder, moving its children and notes to its parent
    Rm {
        /// Folder id
        id: Uuid,
    },

    /// Create a note
    Note {
        /// Note title
        title: String,

        /// Owning folder id (unfiled when omitted)
        #[arg(short, long)]
        folder: Option<Uuid>,

        /// Note content
        #[arg(short, long, default_value = "")]
        content: String,
    },

    /// Edit, move, or (un)favorite a note
    NoteEdit {
        /// Note id
        id: Uuid,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New content
        #[arg(short, long)]
        content: Option<String>,

        /// File the note into this folder
        #[arg(short, long, conflicts_with = "unfiled")]
        folder: Option<Uuid>,

        /// Take the note out of its folder
        #[arg(long)]
        unfiled: bool,

        /// Set the favorite flag (true|false)
        #[arg(long)]
        favorite: Option<bool>,
    },

    /// Delete a note
    NoteRm {
        /// Note id
        id: Uuid,
    },

    /// List notes in a folder, or unfiled notes
    Notes {
        /// Folder id (unfiled notes when omitted)
        #[arg(short, long)]
        folder: Option<Uuid>,
    },

    /// List favorite notes across all folders
    Favorites,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = match e.downcast_ref::<HierarchyError>() {
                Some(err) => {
                    eprintln!("Error ({}): {}", err.code(), err);
                    exit_code(err.kind())
                }
                None => {
                    eprintln!("Error: {}", e);
                    1
                }
            };
            ExitCode::from(code)
        }
    }
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Reference => 4,
        ErrorKind::Invariant => 5,
        ErrorKind::Store => 6,
    }
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig, Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(db) = cli.db.as_ref() {
        config.db_path = db.clone();
    }
    if let Some(log_dir) = cli.log_dir.as_ref() {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = cli.log_level.as_ref() {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    init_logging_from_config(&config)?;

    let conn = open_db(&config.db_path)?;
    let folders = HierarchyService::from_config(SqliteHierarchyRepository::try_new(&conn)?, &config);
    let notes = NoteService::new(SqliteHierarchyRepository::try_new(&conn)?);
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Commands::Tree => print_json(&folders.get_folder_tree()?)?,
        Commands::Mkdir { name, parent } => print_json(&folders.create_folder(name, parent)?)?,
        Commands::Rename { id, name } => print_json(&folders.rename_folder(id, name)?)?,
        Commands::Mv { id, parent, root } => {
            let target = if root { None } else { parent };
            print_json(&folders.move_folder(id, target)?)?;
        }
        Commands::Rm { id } => print_json(&folders.delete_folder(id)?)?,
        Commands::Note {
            title,
            folder,
            content,
        } => {
            let mut input = NewNote::new(title, content);
            input.folder_uuid = folder;
            print_json(&notes.create_note(input)?)?;
        }
        Commands::NoteEdit {
            id,
            title,
            content,
            folder,
            unfiled,
            favorite,
        } => {
            let folder = match (folder, unfiled) {
                (Some(folder_uuid), _) => FolderAssignment::Into(folder_uuid),
                (None, true) => FolderAssignment::Unfiled,
                (None, false) => FolderAssignment::Keep,
            };
            let update = NoteUpdate {
                title,
                content,
                folder,
                is_favorite: favorite,
            };
            print_json(&notes.update_note(id, update)?)?;
        }
        Commands::NoteRm { id } => {
            notes.delete_note(id)?;
            print_json(&serde_json::json!({ "deleted": id.to_string() }))?;
        }
        Commands::Notes { folder } => print_json(&notes.notes_in_folder(folder)?)?,
        Commands::Favorites => print_json(&notes.favorite_notes()?)?,
    }
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Tree => "tree",
        Commands::Mkdir { .. } => "mkdir",
        Commands::Rename { .. } => "rename",
        Commands::Mv { .. } => "mv",
        Commands::Rm { .. } => "rm",
        Commands::Note { .. } => "note",
        Commands::NoteEdit { .. } => "note_edit",
        Commands::NoteRm { .. } => "note_rm",
        Commands::Notes { .. } => "notes",
        Commands::Favorites => "favorites",
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{exit_code, Cli, Commands};
    use clap::{CommandFactory, Parser};
    use foldernote_core::{core_version, ErrorKind};
    use std::collections::HashSet;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mv_requires_exactly_one_destination() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["foldernote", "mv", &id]).is_err());
        assert!(Cli::try_parse_from(["foldernote", "mv", &id, "--root", "--parent", &id]).is_err());

        let cli = Cli::try_parse_from(["foldernote", "mv", &id, "--root"]).unwrap();
        assert!(matches!(cli.command, Commands::Mv { root: true, parent: None, .. }));
    }

    #[test]
    fn version_flag_reports_core_version() {
        assert_eq!(
            Cli::command().get_version().map(|v| v.to_string()),
            Some(core_version().to_string())
        );

        let err = Cli::try_parse_from(["foldernote", "--version"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn note_edit_folder_flags_are_exclusive() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(
            Cli::try_parse_from(["foldernote", "note-edit", &id, "--folder", &id, "--unfiled"])
                .is_err()
        );

        let cli =
            Cli::try_parse_from(["foldernote", "note-edit", &id, "--favorite", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::NoteEdit {
                favorite: Some(true),
                unfiled: false,
                folder: None,
                ..
            }
        ));
    }

    #[test]
    fn malformed_ids_are_rejected_by_parser() {
        assert!(Cli::try_parse_from(["foldernote", "rm", "not-a-uuid"]).is_err());
    }

    #[test]
    fn every_error_kind_has_its_own_exit_code() {
        let kinds = [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Reference,
            ErrorKind::Invariant,
            ErrorKind::Store,
        ];
        let codes: HashSet<u8> = kinds.into_iter().map(exit_code).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(!codes.contains(&0) && !codes.contains(&1));
    }
}
