//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own hierarchy validation so frontends stay thin.

pub mod hierarchy_service;
pub mod note_service;
