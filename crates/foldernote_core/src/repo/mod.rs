//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define plain row-access contracts for folders and notes.
//! - Isolate SQLite query details from hierarchy orchestration.
//!
//! # Invariants
//! - Repositories apply writes as given; hierarchy rules live in services.
//! - Repository APIs return semantic errors (`FolderNotFound`) in addition
//!   to DB transport errors.

pub mod folder_repo;
pub mod hierarchy_repo;
pub mod memory;
pub mod note_repo;
mod schema;
