//! DDL synthesis.
//!
//! Renders a [`SchemaDelta`] into paired forward and reverse statements.
//! Each operation becomes exactly one statement. The reverse list holds the
//! inverse of every operation in reverse order, so running forward then
//! reverse restores the starting schema.

mod dialect;
mod postgres;

pub use dialect::Dialect;
pub use postgres::PostgresDialect;

use serde::Serialize;

use crate::diff::{ChangeOp, SchemaDelta, Warning};

/// A rendered DDL statement, without its terminating semicolon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub warnings: Vec<Warning>,
}

/// Forward and reverse statements for one delta.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Migration {
    pub forward: Vec<Statement>,
    pub reverse: Vec<Statement>,
}

impl Migration {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Renders the forward statements as the contents of an `up` file.
    #[must_use]
    pub fn up_script(&self) -> String {
        render_script(&self.forward)
    }

    /// Renders the reverse statements as the contents of a `down` file.
    #[must_use]
    pub fn down_script(&self) -> String {
        render_script(&self.reverse)
    }
}

/// A change the dialect has no way to express.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dialect '{dialect}' does not support {capability}: {change}")]
pub struct UnsupportedChange {
    /// Name of the dialect.
    pub dialect: &'static str,
    /// The missing capability.
    pub capability: &'static str,
    /// Description of the change.
    pub change: String,
}

/// Renders `delta` as forward and reverse statements.
///
/// # Errors
///
/// Returns [`UnsupportedChange`] when an operation, or its inverse, needs a
/// capability the dialect lacks.
pub fn synthesize(delta: &SchemaDelta, dialect: &dyn Dialect) -> Result<Migration, UnsupportedChange> {
    let forward = delta
        .changes
        .iter()
        .map(|change| render(&change.op, change.warnings.clone(), dialect))
        .collect::<Result<_, _>>()?;

    let reverse = delta
        .changes
        .iter()
        .rev()
        .map(|change| {
            let inverse = change.op.inverse();
            let warnings = inverse.warnings();
            render(&inverse, warnings, dialect)
        })
        .collect::<Result<_, _>>()?;

    Ok(Migration { forward, reverse })
}

/// Joins statements into a script: each ends with `;`, statements are
/// separated by a blank line, and warnings precede their statement as
/// `-- WARNING:` comments.
#[must_use]
pub fn render_script(statements: &[Statement]) -> String {
    let mut script = String::new();
    for (i, statement) in statements.iter().enumerate() {
        if i > 0 {
            script.push('\n');
        }
        for warning in &statement.warnings {
            script.push_str("-- WARNING: ");
            script.push_str(&warning.to_string());
            script.push('\n');
        }
        script.push_str(&statement.sql);
        script.push_str(";\n");
    }
    script
}

fn render(op: &ChangeOp, warnings: Vec<Warning>, dialect: &dyn Dialect) -> Result<Statement, UnsupportedChange> {
    if let Some(capability) = missing_capability(op, dialect) {
        return Err(UnsupportedChange {
            dialect: dialect.name(),
            capability,
            change: op.description(),
        });
    }
    Ok(Statement {
        sql: dialect.generate_sql(op),
        warnings,
    })
}

fn missing_capability(op: &ChangeOp, dialect: &dyn Dialect) -> Option<&'static str> {
    let uses_identity = match op {
        ChangeOp::CreateTable { table } => table.columns.iter().any(|c| c.identity.is_identity()),
        ChangeOp::AddColumn { column, .. } => column.identity.is_identity(),
        ChangeOp::AlterColumnIdentity { .. } => true,
        _ => false,
    };
    if uses_identity && !dialect.supports_identity() {
        return Some("identity columns");
    }

    match op {
        ChangeOp::DropColumn { .. } if !dialect.supports_drop_column() => Some("DROP COLUMN"),
        ChangeOp::AlterColumnType { .. }
        | ChangeOp::AlterColumnNullability { .. }
        | ChangeOp::AlterColumnDefault { .. }
        | ChangeOp::AlterColumnIdentity { .. }
            if !dialect.supports_alter_column() =>
        {
            Some("ALTER COLUMN")
        }
        ChangeOp::AddConstraint { .. } | ChangeOp::DropConstraint { .. }
            if !dialect.supports_add_constraint() =>
        {
            Some("ALTER TABLE ... ADD/DROP CONSTRAINT")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff, Change};
    use crate::model::{Column, Constraint, DataType, Schema, Table};
    use crate::parser::parse_schema;

    /// A dialect that can only create and drop whole tables.
    struct CreateOnlyDialect;

    impl Dialect for CreateOnlyDialect {
        fn name(&self) -> &'static str {
            "create-only"
        }

        fn supports_alter_column(&self) -> bool {
            false
        }

        fn supports_drop_column(&self) -> bool {
            false
        }

        fn supports_add_constraint(&self) -> bool {
            false
        }

        fn supports_identity(&self) -> bool {
            false
        }
    }

    fn users() -> Schema {
        parse_schema("CREATE TABLE users (id integer PRIMARY KEY, email varchar(255) NOT NULL);")
            .unwrap()
    }

    #[test]
    fn test_create_table_example() {
        let delta = diff(&Schema::new(), &users()).unwrap();
        let migration = synthesize(&delta, &PostgresDialect::new()).unwrap();

        assert_eq!(migration.forward.len(), 1);
        assert_eq!(
            migration.forward[0].sql,
            "CREATE TABLE users (\n  id integer NOT NULL,\n  email varchar(255) NOT NULL,\n  \
             CONSTRAINT users_pkey PRIMARY KEY (id)\n)"
        );
        assert_eq!(migration.reverse.len(), 1);
        assert_eq!(migration.reverse[0].sql, "DROP TABLE users");
    }

    #[test]
    fn test_reverse_runs_inverses_backwards() {
        let desired = parse_schema(
            "CREATE TABLE users (id integer PRIMARY KEY);
             CREATE TABLE posts (id integer PRIMARY KEY, author_id integer REFERENCES users);",
        )
        .unwrap();
        let delta = diff(&Schema::new(), &desired).unwrap();
        let migration = synthesize(&delta, &PostgresDialect::new()).unwrap();

        let reverse: Vec<&str> = migration.reverse.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            reverse,
            vec![
                "ALTER TABLE posts DROP CONSTRAINT posts_author_id_fkey",
                "DROP TABLE users",
                "DROP TABLE posts",
            ]
        );
    }

    #[test]
    fn test_warnings_follow_statements() {
        let current = parse_schema("CREATE TABLE users (id integer PRIMARY KEY, age integer);").unwrap();
        let desired =
            parse_schema("CREATE TABLE users (id integer PRIMARY KEY, age integer NOT NULL);").unwrap();
        let delta = diff(&current, &desired).unwrap();
        let migration = synthesize(&delta, &PostgresDialect::new()).unwrap();

        assert_eq!(migration.forward.len(), 1);
        assert!(matches!(
            migration.forward[0].warnings.as_slice(),
            [Warning::RequiresBackfill { .. }]
        ));
        assert!(migration.reverse[0].warnings.is_empty());
        assert_eq!(
            migration.up_script(),
            "-- WARNING: users.age becomes NOT NULL without a default; backfill existing rows first\n\
             ALTER TABLE users ALTER COLUMN age SET NOT NULL;\n"
        );
    }

    #[test]
    fn test_script_separates_statements() {
        let statements = vec![
            Statement {
                sql: "DROP INDEX a_idx".to_string(),
                warnings: Vec::new(),
            },
            Statement {
                sql: "DROP TABLE a".to_string(),
                warnings: Vec::new(),
            },
        ];
        assert_eq!(render_script(&statements), "DROP INDEX a_idx;\n\nDROP TABLE a;\n");
        assert_eq!(render_script(&[]), "");
    }

    #[test]
    fn test_unsupported_change_is_reported() {
        let delta = SchemaDelta {
            changes: vec![Change::new(ChangeOp::AddConstraint {
                table: "users".to_string(),
                constraint: Constraint::unique("users_email_key", &["email"]),
            })],
        };
        let err = synthesize(&delta, &CreateOnlyDialect).unwrap_err();
        assert_eq!(err.dialect, "create-only");
        assert_eq!(err.capability, "ALTER TABLE ... ADD/DROP CONSTRAINT");
    }

    #[test]
    fn test_inverse_capability_is_checked() {
        // Adding a column is fine, but the reverse needs DROP COLUMN.
        let delta = SchemaDelta {
            changes: vec![Change::new(ChangeOp::AddColumn {
                table: "users".to_string(),
                column: Column::new("bio", DataType::Text),
            })],
        };
        let err = synthesize(&delta, &CreateOnlyDialect).unwrap_err();
        assert_eq!(err.capability, "DROP COLUMN");
    }

    #[test]
    fn test_create_only_dialect_creates_tables() {
        let delta = SchemaDelta {
            changes: vec![Change::new(ChangeOp::CreateTable {
                table: Table::new("t").with_column(Column::new("v", DataType::Text)),
            })],
        };
        let migration = synthesize(&delta, &CreateOnlyDialect).unwrap();
        assert_eq!(migration.forward[0].sql, "CREATE TABLE t (\n  v text\n)");
        assert_eq!(migration.reverse[0].sql, "DROP TABLE t");
    }
}
