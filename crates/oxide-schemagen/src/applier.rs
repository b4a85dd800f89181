//! Applying existing migrations to a sandbox database.

use std::path::Path;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use crate::error::{GenerateError, Result};
use crate::migrations::MigrationSet;
use crate::sandbox::ConnectionInfo;

/// Number of migrations applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    pub count: usize,
}

/// Runs every `up` migration of a directory against a database.
#[async_trait]
pub trait MigrationApplier: Send + Sync {
    /// Applies the `up` files in version order.
    async fn apply_all(&self, dir: &Path, conn: &ConnectionInfo) -> Result<Applied>;
}

/// Applier that executes each file as one multi-statement script.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgApplier;

impl PgApplier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MigrationApplier for PgApplier {
    async fn apply_all(&self, dir: &Path, conn: &ConnectionInfo) -> Result<Applied> {
        let set = MigrationSet::scan(dir)?;
        if set.is_empty() {
            return Ok(Applied::default());
        }

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&conn.url())
            .await
            .map_err(|e| GenerateError::Introspection(format!("cannot connect: {e}")))?;

        let mut applied = Applied::default();
        for (name, sql) in set.read_up_scripts()? {
            debug!(file = %name, "applying migration");
            if let Err(e) = sqlx::raw_sql(&sql).execute(&pool).await {
                pool.close().await;
                return Err(GenerateError::InvalidMigration {
                    path: dir.join(&name),
                    reason: e.to_string(),
                });
            }
            applied.count += 1;
        }
        pool.close().await;

        info!(count = applied.count, "applied existing migrations");
        Ok(applied)
    }
}
