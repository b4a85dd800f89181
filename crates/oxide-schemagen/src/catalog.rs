//! Reading the current schema from a live database catalog.

use async_trait::async_trait;
use oxide_schema::introspect::{fold_catalog, ColumnRecord, ConstraintRecord, IndexRecord};
use oxide_schema::model::Schema;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{GenerateError, Result};
use crate::sandbox::ConnectionInfo;

const COLUMNS_SQL: &str = r"
SELECT
    c.table_name::text,
    c.column_name::text,
    c.data_type::text,
    c.udt_name::text,
    c.is_nullable::text,
    c.column_default::text,
    c.character_maximum_length::int4,
    c.numeric_precision::int4,
    c.numeric_scale::int4,
    c.is_identity::text,
    c.identity_generation::text,
    c.ordinal_position::int4
FROM information_schema.columns c
JOIN information_schema.tables t
    ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = 'public' AND t.table_type = 'BASE TABLE'
ORDER BY c.table_name, c.ordinal_position
";

const CONSTRAINTS_SQL: &str = r"
SELECT
    rel.relname::text,
    con.conname::text,
    con.contype::text,
    ARRAY(
        SELECT a.attname::text
        FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        ORDER BY k.ord
    ),
    frel.relname::text,
    ARRAY(
        SELECT a.attname::text
        FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = con.confrelid AND a.attnum = k.attnum
        ORDER BY k.ord
    ),
    NULLIF(con.confdeltype, ' ')::text,
    NULLIF(con.confupdtype, ' ')::text,
    CASE WHEN con.contype = 'c' THEN pg_get_constraintdef(con.oid) END
FROM pg_constraint con
JOIN pg_class rel ON rel.oid = con.conrelid
JOIN pg_namespace ns ON ns.oid = rel.relnamespace
LEFT JOIN pg_class frel ON frel.oid = con.confrelid
WHERE ns.nspname = 'public' AND con.contype IN ('p', 'u', 'f', 'c')
ORDER BY rel.relname, con.conname
";

// Constraint-backed indexes are reported as constraints above.
const INDEXES_SQL: &str = r"
SELECT
    t.relname::text,
    i.relname::text,
    ARRAY(
        SELECT a.attname::text
        FROM unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = k.attnum
        ORDER BY k.ord
    ),
    ix.indisunique
FROM pg_index ix
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_namespace ns ON ns.oid = t.relnamespace
WHERE ns.nspname = 'public'
  AND NOT EXISTS (
      SELECT 1 FROM pg_constraint c
      WHERE c.conrelid = ix.indrelid
        AND c.conindid = ix.indexrelid
        AND c.contype IN ('p', 'u', 'x')
  )
ORDER BY t.relname, i.relname
";

type ColumnRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    String,
    Option<String>,
    i32,
);

type ConstraintRow = (
    String,
    String,
    String,
    Vec<String>,
    Option<String>,
    Vec<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

type IndexRow = (String, String, Vec<String>, bool);

/// Raw catalog rows for the `public` schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub columns: Vec<ColumnRecord>,
    pub constraints: Vec<ConstraintRecord>,
    pub indexes: Vec<IndexRecord>,
}

impl CatalogSnapshot {
    /// Folds the rows into a schema.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Catalog`] when the rows do not fold into a
    /// valid schema.
    pub fn fold(&self) -> Result<Schema> {
        Ok(fold_catalog(&self.columns, &self.constraints, &self.indexes)?)
    }
}

/// Describes the catalog of a database.
#[async_trait]
pub trait CatalogIntrospector: Send + Sync {
    /// Reads columns, constraints and indexes of the `public` schema.
    async fn describe(&self, conn: &ConnectionInfo) -> Result<CatalogSnapshot>;
}

/// Introspector backed by a `sqlx` PostgreSQL pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgCatalog;

impl PgCatalog {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn query(pool: &PgPool) -> Result<CatalogSnapshot> {
        let columns: Vec<ColumnRow> = sqlx::query_as(COLUMNS_SQL).fetch_all(pool).await?;
        let constraints: Vec<ConstraintRow> = sqlx::query_as(CONSTRAINTS_SQL).fetch_all(pool).await?;
        let indexes: Vec<IndexRow> = sqlx::query_as(INDEXES_SQL).fetch_all(pool).await?;
        debug!(
            columns = columns.len(),
            constraints = constraints.len(),
            indexes = indexes.len(),
            "read catalog"
        );

        Ok(CatalogSnapshot {
            columns: columns.into_iter().map(column_record).collect(),
            constraints: constraints.into_iter().map(constraint_record).collect(),
            indexes: indexes
                .into_iter()
                .map(|(table_name, index_name, columns, unique)| IndexRecord {
                    table_name,
                    index_name,
                    columns,
                    unique,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl CatalogIntrospector for PgCatalog {
    async fn describe(&self, conn: &ConnectionInfo) -> Result<CatalogSnapshot> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&conn.url())
            .await
            .map_err(|e| GenerateError::Introspection(format!("cannot connect: {e}")))?;
        let snapshot = Self::query(&pool).await;
        pool.close().await;
        snapshot
    }
}

fn column_record(row: ColumnRow) -> ColumnRecord {
    let (
        table_name,
        column_name,
        data_type,
        udt_name,
        is_nullable,
        column_default,
        character_maximum_length,
        numeric_precision,
        numeric_scale,
        is_identity,
        identity_generation,
        ordinal_position,
    ) = row;
    ColumnRecord {
        table_name,
        column_name,
        data_type,
        udt_name,
        is_nullable,
        column_default,
        character_maximum_length: character_maximum_length.and_then(|n| u32::try_from(n).ok()),
        numeric_precision: numeric_precision.and_then(|n| u32::try_from(n).ok()),
        numeric_scale: numeric_scale.and_then(|n| u32::try_from(n).ok()),
        is_identity,
        identity_generation,
        ordinal_position: u32::try_from(ordinal_position).unwrap_or_default(),
    }
}

fn constraint_record(row: ConstraintRow) -> ConstraintRecord {
    let (
        table_name,
        constraint_name,
        constraint_type,
        columns,
        foreign_table,
        foreign_columns,
        on_delete,
        on_update,
        definition,
    ) = row;
    let code = |text: Option<String>| text.and_then(|t| t.chars().next());
    ConstraintRecord {
        table_name,
        constraint_name,
        constraint_type: constraint_type.chars().next().unwrap_or_default(),
        columns,
        foreign_table,
        foreign_columns,
        on_delete: code(on_delete),
        on_update: code(on_update),
        definition,
    }
}
