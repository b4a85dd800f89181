//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL DDL dialect. Supports every change the differ produces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_drop_column(&self) -> bool {
        true
    }

    fn supports_add_constraint(&self) -> bool {
        true
    }

    fn supports_identity(&self) -> bool {
        true
    }
}
