//! Error types for migration generation.

use std::path::PathBuf;

use oxide_schema::diff::DiffError;
use oxide_schema::introspect::IntrospectionError;
use oxide_schema::parser::ParseError;
use oxide_schema::replay::ReplayError;
use oxide_schema::synth::UnsupportedChange;

/// Errors that can occur while generating migrations.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The desired-state schema file could not be parsed.
    #[error("Failed to parse schema file '{}': {source}", .path.display())]
    Parse {
        /// Path to the schema file.
        path: PathBuf,
        /// Parser error, including line and column.
        source: ParseError,
    },

    /// The desired schema is invalid or the changes cannot be ordered.
    #[error("Diff failed: {0}")]
    Diff(#[from] DiffError),

    /// The dialect cannot express one of the changes.
    #[error("Unsupported change: {0}")]
    Unsupported(#[from] UnsupportedChange),

    /// Existing migrations could not be replayed.
    #[error("Failed to replay existing migrations: {0}")]
    Replay(#[from] ReplayError),

    /// Catalog rows could not be folded into a schema.
    #[error("Failed to read database catalog: {0}")]
    Catalog(#[from] IntrospectionError),

    /// The catalog could not be queried.
    #[error("Introspection failed: {0}")]
    Introspection(String),

    /// The migration directory contains a file that breaks its layout.
    #[error("Invalid migration '{}': {reason}", .path.display())]
    InvalidMigration {
        /// Offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },

    /// Check mode found changes that no migration covers yet.
    #[error(
        "Schema drift detected; missing statements:\n{}",
        .statements.iter().map(|s| format!("  {s};")).collect::<Vec<_>>().join("\n")
    )]
    DriftDetected {
        /// Forward statements that would bring the migrations up to date.
        statements: Vec<String>,
    },

    /// The sandbox database could not be provisioned.
    #[error("Failed to acquire sandbox: {0}")]
    ResourceAcquisition(String),

    /// An external step did not finish in time, even after a retry.
    #[error("Timed out after {seconds}s: {step}")]
    Timeout {
        /// The step that timed out.
        step: String,
        /// The per-attempt limit.
        seconds: u64,
    },

    /// The run was interrupted by Ctrl-C.
    #[error("Interrupted")]
    Interrupted,

    /// IO error (reading the schema, writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error while applying migrations or querying the catalog.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl GenerateError {
    /// Returns whether retrying the failed step may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Introspection(_) | Self::Database(_))
    }
}

/// Result type for generation.
pub type Result<T> = std::result::Result<T, GenerateError>;
