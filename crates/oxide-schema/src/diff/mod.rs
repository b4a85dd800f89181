//! Schema diffing.
//!
//! [`diff`] compares a current and a desired [`Schema`] and returns the
//! ordered changes that turn the first into the second. Renames are never
//! guessed: a renamed table or column is a drop plus an add.

mod operations;
mod order;

pub use operations::{Change, ChangeOp, SchemaDelta, Warning};

use crate::model::{Constraint, Index, ModelError, Schema, Table};

/// Errors raised while diffing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// The desired schema references a missing table or column.
    #[error("invalid desired schema: {0}")]
    InvalidDesired(#[source] ModelError),

    /// No order satisfies the dependencies between changes.
    #[error("dependency cycle between changes: {}", .remaining.join("; "))]
    DependencyCycle {
        /// Descriptions of the changes that could not be placed.
        remaining: Vec<String>,
    },
}

/// Computes the changes that turn `current` into `desired`.
///
/// The result is deterministic, including its order.
///
/// # Errors
///
/// Returns [`DiffError::InvalidDesired`] when a foreign key, constraint or
/// index of `desired` names a missing table or column, and
/// [`DiffError::DependencyCycle`] when the changes cannot be ordered.
pub fn diff(current: &Schema, desired: &Schema) -> Result<SchemaDelta, DiffError> {
    desired.validate().map_err(DiffError::InvalidDesired)?;

    let mut ops = Vec::new();
    for (name, table) in &desired.tables {
        match current.table(name) {
            Some(existing) => diff_table(existing, table, desired, &mut ops),
            None => create_table(table, &mut ops),
        }
    }
    for (name, table) in &current.tables {
        if desired.table(name).is_none() {
            drop_table(table, &mut ops);
        }
    }

    let changes = order::sort(ops.into_iter().map(Change::new).collect())?;
    Ok(SchemaDelta { changes })
}

/// The part of a table that `CREATE TABLE` / `DROP TABLE` carry: columns and
/// constraints other than foreign keys.
fn table_body(table: &Table) -> Table {
    Table {
        name: table.name.clone(),
        columns: table.columns.clone(),
        constraints: table
            .constraints
            .iter()
            .filter(|c| c.as_foreign_key().is_none())
            .cloned()
            .collect(),
        indexes: Vec::new(),
    }
}

fn create_table(table: &Table, ops: &mut Vec<ChangeOp>) {
    ops.push(ChangeOp::CreateTable {
        table: table_body(table),
    });
    for (constraint, _) in table.foreign_keys() {
        ops.push(ChangeOp::AddConstraint {
            table: table.name.clone(),
            constraint: constraint.clone(),
        });
    }
    for index in &table.indexes {
        ops.push(ChangeOp::AddIndex {
            table: table.name.clone(),
            index: index.clone(),
        });
    }
}

fn drop_table(table: &Table, ops: &mut Vec<ChangeOp>) {
    for (constraint, _) in table.foreign_keys() {
        ops.push(ChangeOp::DropConstraint {
            table: table.name.clone(),
            constraint: constraint.clone(),
        });
    }
    for index in &table.indexes {
        ops.push(ChangeOp::DropIndex {
            table: table.name.clone(),
            index: index.clone(),
        });
    }
    ops.push(ChangeOp::DropTable {
        table: table_body(table),
    });
}

fn diff_table(current: &Table, desired: &Table, schema: &Schema, ops: &mut Vec<ChangeOp>) {
    let name = &desired.name;

    for column in &desired.columns {
        let Some(existing) = current.column(&column.name) else {
            ops.push(ChangeOp::AddColumn {
                table: name.clone(),
                column: column.clone(),
            });
            continue;
        };

        if existing.data_type != column.data_type {
            ops.push(ChangeOp::AlterColumnType {
                table: name.clone(),
                column: column.name.clone(),
                from: existing.data_type.clone(),
                to: column.data_type.clone(),
            });
        }
        if existing.nullable != column.nullable {
            ops.push(ChangeOp::AlterColumnNullability {
                table: name.clone(),
                column: column.name.clone(),
                nullable: column.nullable,
                had_default: existing.default.is_some(),
                has_default: column.default.is_some(),
            });
        }
        if existing.default != column.default {
            ops.push(ChangeOp::AlterColumnDefault {
                table: name.clone(),
                column: column.name.clone(),
                from: existing.default.clone(),
                to: column.default.clone(),
            });
        }
        if existing.identity != column.identity {
            ops.push(ChangeOp::AlterColumnIdentity {
                table: name.clone(),
                column: column.name.clone(),
                from: existing.identity,
                to: column.identity,
            });
        }
    }
    for column in &current.columns {
        if !desired.has_column(&column.name) {
            ops.push(ChangeOp::DropColumn {
                table: name.clone(),
                column: column.clone(),
            });
        }
    }

    let (dropped, added) = pair_up(
        &current.constraints,
        &desired.constraints,
        |c| c.name.as_str(),
        Constraint::same_definition,
        |n| desired.constraint(n).is_some(),
    );
    for constraint in dropped {
        ops.push(ChangeOp::DropConstraint {
            table: name.clone(),
            constraint: constraint.clone(),
        });
    }
    for constraint in added {
        ops.push(ChangeOp::AddConstraint {
            table: name.clone(),
            constraint: constraint.clone(),
        });
    }

    // Index names are schema-wide.
    let (dropped, added) = pair_up(
        &current.indexes,
        &desired.indexes,
        |i| i.name.as_str(),
        Index::same_definition,
        |n| schema.index_owner(n).is_some(),
    );
    for index in dropped {
        ops.push(ChangeOp::DropIndex {
            table: name.clone(),
            index: index.clone(),
        });
    }
    for index in added {
        ops.push(ChangeOp::AddIndex {
            table: name.clone(),
            index: index.clone(),
        });
    }
}

/// Pairs current objects with desired ones, each used at most once, and
/// returns the unpaired `(current, desired)` objects.
///
/// Objects with the same name and definition pair first. The rest pair by
/// definition alone, which keeps an object under its old name, unless a
/// desired object `claims` that name.
fn pair_up<'a, T>(
    current: &'a [T],
    desired: &'a [T],
    name: impl Fn(&T) -> &str,
    same: impl Fn(&T, &T) -> bool,
    claims: impl Fn(&str) -> bool,
) -> (Vec<&'a T>, Vec<&'a T>) {
    let mut current_paired = vec![false; current.len()];
    let mut desired_paired = vec![false; desired.len()];

    for (d, wanted) in desired.iter().enumerate() {
        let found = (0..current.len())
            .find(|&c| !current_paired[c] && name(&current[c]) == name(wanted) && same(&current[c], wanted));
        if let Some(c) = found {
            current_paired[c] = true;
            desired_paired[d] = true;
        }
    }
    for (d, wanted) in desired.iter().enumerate() {
        if desired_paired[d] {
            continue;
        }
        let found = (0..current.len()).find(|&c| {
            !current_paired[c] && !claims(name(&current[c])) && same(&current[c], wanted)
        });
        if let Some(c) = found {
            current_paired[c] = true;
            desired_paired[d] = true;
        }
    }

    let unpaired = |items: &'a [T], paired: &[bool]| -> Vec<&'a T> {
        items.iter().zip(paired).filter(|(_, p)| !**p).map(|(item, _)| item).collect()
    };
    (unpaired(current, &current_paired), unpaired(desired, &desired_paired))
}
