//! The generate workflow.
//!
//! 1. Parse the desired schema file.
//! 2. Recover the current schema from the migration directory, either by
//!    replaying it in memory or by applying it to a sandbox database and
//!    reading the catalog back.
//! 3. Diff, synthesize, and then write, print or check the result.

use std::path::Path;

use chrono::Utc;
use oxide_schema::diff::{diff, SchemaDelta};
use oxide_schema::model::Schema;
use oxide_schema::parser::parse_schema;
use oxide_schema::replay::replay;
use oxide_schema::synth::{synthesize, Migration, PostgresDialect};
use tracing::{debug, info, warn};

use crate::applier::{MigrationApplier, PgApplier};
use crate::catalog::{CatalogIntrospector, PgCatalog};
use crate::config::{CurrentSource, GenerateOptions};
use crate::error::{GenerateError, Result};
use crate::migrations::MigrationSet;
use crate::retry::with_retry;
use crate::sandbox::{with_sandbox, DockerSandbox, Sandbox};
use crate::writer::{migration_slug, next_version, MigrationWriter, WrittenPair};

/// The external collaborators used by the sandbox source.
pub struct Backends {
    pub sandbox: Box<dyn Sandbox>,
    pub catalog: Box<dyn CatalogIntrospector>,
    pub applier: Box<dyn MigrationApplier>,
}

impl Backends {
    /// Docker sandbox, `sqlx` catalog queries and `sqlx` applier.
    #[must_use]
    pub fn docker(options: &GenerateOptions) -> Self {
        Self {
            sandbox: Box::new(DockerSandbox::new(options.image.clone(), options.timeout)),
            catalog: Box::new(PgCatalog::new()),
            applier: Box::new(PgApplier::new()),
        }
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The migrations already reach the desired schema.
    UpToDate,
    /// Dry run: the changes that would be written.
    Planned {
        delta: SchemaDelta,
        migration: Migration,
    },
    /// A new migration pair was written.
    Written {
        delta: SchemaDelta,
        migration: Migration,
        files: WrittenPair,
    },
}

impl Outcome {
    /// Returns the delta, if there is one.
    #[must_use]
    pub const fn delta(&self) -> Option<&SchemaDelta> {
        match self {
            Self::UpToDate => None,
            Self::Planned { delta, .. } | Self::Written { delta, .. } => Some(delta),
        }
    }
}

/// Runs one generation.
///
/// # Errors
///
/// Returns [`GenerateError::DriftDetected`] in check mode when changes are
/// pending, and any error raised by parsing, recovering the current
/// schema, diffing, synthesis or writing.
pub async fn generate(options: &GenerateOptions, backends: &mut Backends) -> Result<Outcome> {
    let desired = load_desired(&options.input).await?;
    info!(tables = desired.tables.len(), input = %options.input.display(), "parsed desired schema");

    let set = MigrationSet::scan(&options.output_dir)?;
    debug!(migrations = set.pairs().len(), "scanned migrations directory");

    let current = match options.current {
        CurrentSource::Replay => replay(set.read_up_scripts()?)?,
        CurrentSource::Sandbox => introspect(options, backends).await?,
    };

    let delta = diff(&current, &desired)?;
    for warning in delta.warnings() {
        warn!("{warning}");
    }
    let migration = synthesize(&delta, &PostgresDialect::new())?;

    if delta.is_empty() {
        info!("no changes detected");
        return Ok(Outcome::UpToDate);
    }
    info!(changes = delta.len(), "changes detected");

    if options.check {
        return Err(GenerateError::DriftDetected {
            statements: migration.forward.iter().map(|s| s.sql.clone()).collect(),
        });
    }
    if options.dry_run {
        return Ok(Outcome::Planned { delta, migration });
    }

    let version = next_version(Utc::now(), set.latest_version());
    let slug = migration_slug(options.name.as_deref(), &delta);
    let files = MigrationWriter::new(&options.output_dir).write_pair(
        version,
        &slug,
        &migration.up_script(),
        &migration.down_script(),
    )?;
    Ok(Outcome::Written {
        delta,
        migration,
        files,
    })
}

async fn load_desired(path: &Path) -> Result<Schema> {
    let source = tokio::fs::read_to_string(path).await?;
    parse_schema(&source).map_err(|source| GenerateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

async fn introspect(options: &GenerateOptions, backends: &mut Backends) -> Result<Schema> {
    let Backends {
        sandbox,
        catalog,
        applier,
    } = backends;
    let (catalog, applier) = (catalog.as_ref(), applier.as_ref());
    let dir = options.output_dir.as_path();
    let limit = options.timeout;

    with_sandbox(sandbox.as_mut(), |conn| async move {
        let conn = &conn;
        with_retry("apply migrations", limit, || applier.apply_all(dir, conn)).await?;
        let snapshot = with_retry("introspect catalog", limit, || catalog.describe(conn)).await?;
        snapshot.fold()
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn options(dir: &Path, schema: &str) -> GenerateOptions {
        let input = dir.join("schema.sql");
        fs::write(&input, schema).unwrap();
        GenerateOptions::new(input, dir.join("migrations"))
    }

    #[tokio::test]
    async fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = GenerateOptions::new(dir.path().join("missing.sql"), dir.path());
        let mut backends = Backends::docker(&options);
        let err = generate(&options, &mut backends).await.unwrap_err();
        assert!(matches!(err, GenerateError::Io(_)));
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "CREATE TABLE t (id integer;");
        let mut backends = Backends::docker(&options);
        let err = generate(&options, &mut backends).await.unwrap_err();
        assert!(matches!(err, GenerateError::Parse { ref source, .. } if source.line == 1));
        assert!(err.to_string().contains("schema.sql"));
    }

    #[tokio::test]
    async fn test_outcome_delta() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(dir.path(), "CREATE TABLE t (id integer);").dry_run(true);
        let mut backends = Backends::docker(&options);
        let outcome = generate(&options, &mut backends).await.unwrap();
        assert_eq!(outcome.delta().map(SchemaDelta::len), Some(1));
        assert_eq!(Outcome::UpToDate.delta(), None);
    }
}
