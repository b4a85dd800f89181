//! Structural changes between two schemas.

use std::fmt;

use serde::Serialize;

use crate::model::{Column, Constraint, DataType, Identity, Index, Table};

/// A single structural change. Every variant carries the old and new
/// values it needs, so it renders in both directions without the models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOp {
    /// Creates a table with its primary key, unique and check constraints.
    /// Foreign keys and indexes are separate changes.
    CreateTable { table: Table },
    /// Drops a table. Its foreign keys and indexes are dropped by
    /// preceding changes.
    DropTable { table: Table },
    AddColumn {
        table: String,
        column: Column,
    },
    DropColumn {
        table: String,
        column: Column,
    },
    AlterColumnType {
        table: String,
        column: String,
        from: DataType,
        to: DataType,
    },
    /// `nullable` is the new state. The default flags tell whether the
    /// column has a default before and after the change.
    AlterColumnNullability {
        table: String,
        column: String,
        nullable: bool,
        had_default: bool,
        has_default: bool,
    },
    AlterColumnDefault {
        table: String,
        column: String,
        from: Option<String>,
        to: Option<String>,
    },
    AlterColumnIdentity {
        table: String,
        column: String,
        from: Identity,
        to: Identity,
    },
    AddConstraint {
        table: String,
        constraint: Constraint,
    },
    DropConstraint {
        table: String,
        constraint: Constraint,
    },
    AddIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        index: Index,
    },
}

impl ChangeOp {
    /// Returns the change that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self {
            Self::CreateTable { table } => Self::DropTable {
                table: table.clone(),
            },
            Self::DropTable { table } => Self::CreateTable {
                table: table.clone(),
            },
            Self::AddColumn { table, column } => Self::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Self::DropColumn { table, column } => Self::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnType {
                table: table.clone(),
                column: column.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::AlterColumnNullability {
                table,
                column,
                nullable,
                had_default,
                has_default,
            } => Self::AlterColumnNullability {
                table: table.clone(),
                column: column.clone(),
                nullable: !nullable,
                had_default: *has_default,
                has_default: *had_default,
            },
            Self::AlterColumnDefault {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnDefault {
                table: table.clone(),
                column: column.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Self::AlterColumnIdentity {
                table,
                column,
                from,
                to,
            } => Self::AlterColumnIdentity {
                table: table.clone(),
                column: column.clone(),
                from: *to,
                to: *from,
            },
            Self::AddConstraint { table, constraint } => Self::DropConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            },
            Self::DropConstraint { table, constraint } => Self::AddConstraint {
                table: table.clone(),
                constraint: constraint.clone(),
            },
            Self::AddIndex { table, index } => Self::DropIndex {
                table: table.clone(),
                index: index.clone(),
            },
            Self::DropIndex { table, index } => Self::AddIndex {
                table: table.clone(),
                index: index.clone(),
            },
        }
    }

    /// Returns the table this change applies to.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => &table.name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::AlterColumnNullability { table, .. }
            | Self::AlterColumnDefault { table, .. }
            | Self::AlterColumnIdentity { table, .. }
            | Self::AddConstraint { table, .. }
            | Self::DropConstraint { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. } => table,
        }
    }

    /// Returns the name of the object the change is about: the table,
    /// column, constraint or index.
    #[must_use]
    pub fn object_name(&self) -> &str {
        match self {
            Self::CreateTable { table } | Self::DropTable { table } => &table.name,
            Self::AddColumn { column, .. } | Self::DropColumn { column, .. } => &column.name,
            Self::AlterColumnType { column, .. }
            | Self::AlterColumnNullability { column, .. }
            | Self::AlterColumnDefault { column, .. }
            | Self::AlterColumnIdentity { column, .. } => column,
            Self::AddConstraint { constraint, .. } | Self::DropConstraint { constraint, .. } => {
                &constraint.name
            }
            Self::AddIndex { index, .. } | Self::DropIndex { index, .. } => &index.name,
        }
    }

    /// Returns `(table, column)` for in-place column alterations.
    #[must_use]
    pub fn altered_column(&self) -> Option<(&str, &str)> {
        match self {
            Self::AlterColumnType { table, column, .. }
            | Self::AlterColumnNullability { table, column, .. }
            | Self::AlterColumnDefault { table, column, .. }
            | Self::AlterColumnIdentity { table, column, .. } => Some((table, column)),
            _ => None,
        }
    }

    /// Warnings attached to this change.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        match self {
            Self::AddColumn { table, column }
                if !column.nullable && column.default.is_none() && !column.identity.is_identity() =>
            {
                vec![Warning::RequiresBackfill {
                    table: table.clone(),
                    column: column.name.clone(),
                }]
            }
            Self::AlterColumnNullability {
                table,
                column,
                nullable: false,
                has_default: false,
                ..
            } => vec![Warning::RequiresBackfill {
                table: table.clone(),
                column: column.clone(),
            }],
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } if !from.widens_to(to) => vec![Warning::ManualCastReview {
                table: table.clone(),
                column: column.clone(),
                from: from.clone(),
                to: to.clone(),
            }],
            _ => Vec::new(),
        }
    }

    /// Returns a short snake_case summary, used to derive file names.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("create_{}", table.name),
            Self::DropTable { table } => format!("drop_{}", table.name),
            Self::AddColumn { table, column } => format!("add_{table}_{}", column.name),
            Self::DropColumn { table, column } => format!("drop_{table}_{}", column.name),
            Self::AlterColumnType { table, column, .. }
            | Self::AlterColumnNullability { table, column, .. }
            | Self::AlterColumnDefault { table, column, .. }
            | Self::AlterColumnIdentity { table, column, .. } => format!("alter_{table}_{column}"),
            Self::AddConstraint { constraint, .. } => format!("add_{}", constraint.name),
            Self::DropConstraint { constraint, .. } => format!("drop_{}", constraint.name),
            Self::AddIndex { index, .. } => format!("add_{}", index.name),
            Self::DropIndex { index, .. } => format!("drop_{}", index.name),
        }
    }

    /// Returns a human-readable description of this change.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table '{}'", table.name),
            Self::DropTable { table } => format!("Drop table '{}'", table.name),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{table}'", column.name)
            }
            Self::DropColumn { table, column } => {
                format!("Drop column '{}' from table '{table}'", column.name)
            }
            Self::AlterColumnType {
                table,
                column,
                from,
                to,
            } => format!("Change type of '{table}.{column}' from {from} to {to}"),
            Self::AlterColumnNullability {
                table,
                column,
                nullable,
                ..
            } => {
                let state = if *nullable { "nullable" } else { "NOT NULL" };
                format!("Make '{table}.{column}' {state}")
            }
            Self::AlterColumnDefault {
                table, column, to, ..
            } => match to {
                Some(expression) => format!("Set default of '{table}.{column}' to {expression}"),
                None => format!("Drop default of '{table}.{column}'"),
            },
            Self::AlterColumnIdentity {
                table, column, to, ..
            } => match to.generation_sql() {
                Some(generation) => {
                    format!("Make '{table}.{column}' an identity column generated {generation}")
                }
                None => format!("Drop identity of '{table}.{column}'"),
            },
            Self::AddConstraint { table, constraint } => {
                format!("Add constraint '{}' to table '{table}'", constraint.name)
            }
            Self::DropConstraint { table, constraint } => {
                format!("Drop constraint '{}' from table '{table}'", constraint.name)
            }
            Self::AddIndex { table, index } => {
                format!("Create index '{}' on table '{table}'", index.name)
            }
            Self::DropIndex { index, .. } => format!("Drop index '{}'", index.name),
        }
    }
}

/// A non-blocking concern about a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Existing rows may hold NULLs that the new NOT NULL rejects.
    RequiresBackfill { table: String, column: String },
    /// The type change is not an implicit assignment cast.
    ManualCastReview {
        table: String,
        column: String,
        from: DataType,
        to: DataType,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiresBackfill { table, column } => write!(
                f,
                "{table}.{column} becomes NOT NULL without a default; backfill existing rows first"
            ),
            Self::ManualCastReview {
                table,
                column,
                from,
                to,
            } => write!(
                f,
                "{table}.{column} changes from {from} to {to}, which is not an implicit cast; review the conversion"
            ),
        }
    }
}

/// A change together with its warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub op: ChangeOp,
    pub warnings: Vec<Warning>,
}

impl Change {
    /// Wraps an operation, computing its warnings.
    #[must_use]
    pub fn new(op: ChangeOp) -> Self {
        let warnings = op.warnings();
        Self { op, warnings }
    }
}

/// The dependency-ordered changes turning one schema into another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaDelta {
    pub changes: Vec<Change>,
}

impl SchemaDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over the operations in order.
    pub fn ops(&self) -> impl Iterator<Item = &ChangeOp> {
        self.changes.iter().map(|c| &c.op)
    }

    /// Iterates over every warning in order.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.changes.iter().flat_map(|c| &c.warnings)
    }
}
