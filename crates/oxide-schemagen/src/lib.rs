//! Reversible PostgreSQL migrations from a declarative schema.
//!
//! `oxide-schemagen` compares a desired-state schema file against what a
//! directory of `golang-migrate` files already produces, and writes the
//! difference as a new `<version>_<slug>.up.sql` / `.down.sql` pair.
//!
//! # Architecture
//!
//! - **Migrations** - Scans the directory and validates its layout
//! - **Current state** - Replays the existing `up` files in memory, or
//!   applies them to a disposable PostgreSQL container and reads its catalog
//! - **Sandbox** - Starts, waits for and always removes that container
//! - **Writer** - Picks the next version and writes both files or neither
//! - **Generate** - Ties it together, with check and dry-run modes
//!
//! Diffing and SQL synthesis live in [`oxide_schema`].
//!
//! # CLI Usage
//!
//! ```bash
//! # Write a new migration pair for pending changes
//! oxide-schemagen generate --input schema.sql --output-dir migrations
//!
//! # Fail in CI when the migrations do not reach schema.sql
//! oxide-schemagen generate --input schema.sql --output-dir migrations --check
//!
//! # Compare against a real database instead of the in-memory replay
//! oxide-schemagen generate --input schema.sql --output-dir migrations --current sandbox
//! ```

pub mod applier;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generate;
pub mod migrations;
pub mod retry;
pub mod sandbox;
pub mod writer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::applier::{Applied, MigrationApplier, PgApplier};
    pub use crate::catalog::{CatalogIntrospector, CatalogSnapshot, PgCatalog};
    pub use crate::config::{CurrentSource, GenerateOptions, DEFAULT_IMAGE, DEFAULT_TIMEOUT_SECS};
    pub use crate::error::{GenerateError, Result};
    pub use crate::generate::{generate, Backends, Outcome};
    pub use crate::migrations::{Direction, MigrationFile, MigrationPair, MigrationSet};
    pub use crate::sandbox::{with_sandbox, with_sandbox_until, ConnectionInfo, DockerSandbox, Sandbox};
    pub use crate::writer::{migration_slug, next_version, MigrationWriter, WrittenPair};
}
