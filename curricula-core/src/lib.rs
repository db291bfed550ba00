//! Core library for Curricula.
//!
//! This crate provides the program/template association models and the
//! transactional database operations behind them, independent of any
//! transport layer (HTTP, client queue, etc.).
//!
//! # Usage
//!
//! ```no_run
//! use curricula_core::db::Database;
//! use curricula_core::models::*;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let program = db.create_program(CreateProgramInput {
//!     title: "Backend onboarding".into(),
//!     total_weeks: 4,
//!     description: None,
//! })?;
//! let panel = db.list_program_templates(program.id, &ListTemplatesQuery::default())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::LinkError;
