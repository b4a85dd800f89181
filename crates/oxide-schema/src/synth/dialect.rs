//! Dialect abstraction for DDL rendering.

use std::borrow::Cow;

use crate::diff::ChangeOp;
use crate::model::{ident, Column, Constraint, ConstraintKind, DataType, ReferentialAction, Table};

/// Trait for database-specific DDL generation.
///
/// Capability flags let [`synthesize`](super::synthesize) refuse changes a
/// dialect cannot express instead of silently dropping them. Every
/// rendering method has a PostgreSQL-flavored default.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns whether this dialect supports ALTER COLUMN.
    fn supports_alter_column(&self) -> bool;

    /// Returns whether this dialect supports DROP COLUMN.
    fn supports_drop_column(&self) -> bool;

    /// Returns whether this dialect supports adding constraints after table creation.
    fn supports_add_constraint(&self) -> bool;

    /// Returns whether this dialect supports identity columns.
    fn supports_identity(&self) -> bool;

    /// Quotes an identifier when it is not a plain lower-case name or
    /// collides with a keyword.
    fn quote_identifier<'a>(&self, name: &'a str) -> Cow<'a, str> {
        ident::quote_identifier(name)
    }

    /// Returns the SQL type name for the given type.
    fn type_name(&self, data_type: &DataType) -> String {
        match data_type {
            DataType::Custom { name } => self.quote_identifier(name).into_owned(),
            other => other.to_sql(),
        }
    }

    /// Quotes and joins a column list.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![
            self.quote_identifier(&column.name).into_owned(),
            self.type_name(&column.data_type),
        ];
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {default}"));
        }
        if let Some(generation) = column.identity.generation_sql() {
            parts.push(format!("GENERATED {generation} AS IDENTITY"));
        }
        parts.join(" ")
    }

    /// Generates `CONSTRAINT name ...` SQL.
    fn constraint_definition(&self, constraint: &Constraint) -> String {
        let body = match &constraint.kind {
            ConstraintKind::PrimaryKey { columns } => {
                format!("PRIMARY KEY ({})", self.column_list(columns))
            }
            ConstraintKind::Unique { columns } => format!("UNIQUE ({})", self.column_list(columns)),
            ConstraintKind::Check { expression } => format!("CHECK ({expression})"),
            ConstraintKind::ForeignKey(fk) => {
                let mut sql = format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.column_list(&fk.columns),
                    self.quote_identifier(&fk.ref_table),
                    self.column_list(&fk.ref_columns)
                );
                if fk.on_delete != ReferentialAction::NoAction {
                    sql.push_str(" ON DELETE ");
                    sql.push_str(fk.on_delete.as_sql());
                }
                if fk.on_update != ReferentialAction::NoAction {
                    sql.push_str(" ON UPDATE ");
                    sql.push_str(fk.on_update.as_sql());
                }
                sql
            }
        };
        format!(
            "CONSTRAINT {} {body}",
            self.quote_identifier(&constraint.name)
        )
    }

    /// Generates `CREATE TABLE` with columns and inline constraints.
    fn create_table_sql(&self, table: &Table) -> String {
        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();
        elements.extend(
            table
                .constraints
                .iter()
                .map(|c| self.constraint_definition(c)),
        );

        let mut sql = format!("CREATE TABLE {} (", self.quote_identifier(&table.name));
        if !elements.is_empty() {
            sql.push_str("\n  ");
            sql.push_str(&elements.join(",\n  "));
            sql.push('\n');
        }
        sql.push(')');
        sql
    }

    /// Generates SQL for a single change.
    fn generate_sql(&self, op: &ChangeOp) -> String {
        let table = self.quote_identifier(op.table());
        let alter_column = |column: &str, action: &str| {
            format!(
                "ALTER TABLE {table} ALTER COLUMN {} {action}",
                self.quote_identifier(column)
            )
        };

        match op {
            ChangeOp::CreateTable { table } => self.create_table_sql(table),
            ChangeOp::DropTable { .. } => format!("DROP TABLE {table}"),
            ChangeOp::AddColumn { column, .. } => {
                format!("ALTER TABLE {table} ADD COLUMN {}", self.column_definition(column))
            }
            ChangeOp::DropColumn { column, .. } => format!(
                "ALTER TABLE {table} DROP COLUMN {}",
                self.quote_identifier(&column.name)
            ),
            ChangeOp::AlterColumnType { column, to, .. } => {
                alter_column(column, &format!("TYPE {}", self.type_name(to)))
            }
            ChangeOp::AlterColumnNullability {
                column, nullable, ..
            } => alter_column(
                column,
                if *nullable { "DROP NOT NULL" } else { "SET NOT NULL" },
            ),
            ChangeOp::AlterColumnDefault { column, to, .. } => match to {
                Some(expression) => alter_column(column, &format!("SET DEFAULT {expression}")),
                None => alter_column(column, "DROP DEFAULT"),
            },
            ChangeOp::AlterColumnIdentity {
                column, from, to, ..
            } => match (from.generation_sql(), to.generation_sql()) {
                (None, Some(generation)) => {
                    alter_column(column, &format!("ADD GENERATED {generation} AS IDENTITY"))
                }
                (Some(_), Some(generation)) => {
                    alter_column(column, &format!("SET GENERATED {generation}"))
                }
                (_, None) => alter_column(column, "DROP IDENTITY"),
            },
            ChangeOp::AddConstraint { constraint, .. } => format!(
                "ALTER TABLE {table} ADD {}",
                self.constraint_definition(constraint)
            ),
            ChangeOp::DropConstraint { constraint, .. } => format!(
                "ALTER TABLE {table} DROP CONSTRAINT {}",
                self.quote_identifier(&constraint.name)
            ),
            ChangeOp::AddIndex { index, .. } => format!(
                "CREATE {}INDEX {} ON {table} ({})",
                if index.unique { "UNIQUE " } else { "" },
                self.quote_identifier(&index.name),
                self.column_list(&index.columns)
            ),
            ChangeOp::DropIndex { index, .. } => {
                format!("DROP INDEX {}", self.quote_identifier(&index.name))
            }
        }
    }
}
