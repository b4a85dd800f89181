//! Dependency ordering of changes.
//!
//! Changes are sorted topologically with Kahn's algorithm. Among the changes
//! whose dependencies are satisfied, the smallest `(phase, table, object)`
//! key goes next, which makes the result deterministic and keeps unrelated
//! changes grouped: drops first, then creations, then column alterations,
//! then added constraints and indexes.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use super::operations::{Change, ChangeOp};
use super::DiffError;
use crate::model::{Constraint, Identity};

/// Sorts changes so that every change runs after the ones it depends on.
///
/// # Errors
///
/// Returns [`DiffError::DependencyCycle`] if no valid order exists.
pub fn sort(changes: Vec<Change>) -> Result<Vec<Change>, DiffError> {
    let n = changes.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for (a, before) in changes.iter().enumerate() {
        for (b, after) in changes.iter().enumerate() {
            if a != b && must_precede(&before.op, &after.op) {
                successors[a].push(b);
                in_degree[b] += 1;
            }
        }
    }

    let key = |i: usize| {
        let op = &changes[i].op;
        Reverse((phase(op), op.table().to_string(), op.object_name().to_string(), i))
    };
    let mut ready: BinaryHeap<_> = (0..n).filter(|&i| in_degree[i] == 0).map(key).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse((_, _, _, i))) = ready.pop() {
        order.push(i);
        for &next in &successors[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(key(next));
            }
        }
    }

    if order.len() != n {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let remaining = (0..n)
            .filter(|i| !placed.contains(i))
            .map(|i| changes[i].op.description())
            .collect();
        return Err(DiffError::DependencyCycle { remaining });
    }

    let mut slots: Vec<Option<Change>> = changes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Tie-break rank. Identity removal runs before other alterations on the
/// column and identity addition after them, since PostgreSQL rejects
/// defaults and DROP NOT NULL on identity columns.
const fn phase(op: &ChangeOp) -> u8 {
    match op {
        ChangeOp::DropConstraint { .. } => 0,
        ChangeOp::DropIndex { .. } => 1,
        ChangeOp::DropColumn { .. } => 2,
        ChangeOp::DropTable { .. } => 3,
        ChangeOp::CreateTable { .. } => 4,
        ChangeOp::AddColumn { .. } => 5,
        ChangeOp::AlterColumnIdentity {
            to: Identity::None, ..
        } => 6,
        ChangeOp::AlterColumnType { .. } => 7,
        ChangeOp::AlterColumnNullability { .. } => 8,
        ChangeOp::AlterColumnDefault { .. } => 9,
        ChangeOp::AlterColumnIdentity { .. } => 10,
        ChangeOp::AddConstraint { .. } => 11,
        ChangeOp::AddIndex { .. } => 12,
    }
}

/// Returns true when `a` must run before `b`.
fn must_precede(a: &ChangeOp, b: &ChangeOp) -> bool {
    use ChangeOp::{
        AddColumn, AddConstraint, AddIndex, CreateTable, DropColumn, DropConstraint, DropIndex,
        DropTable,
    };

    // Constraints and indexes on a column are dropped before it is altered
    // and re-added afterwards.
    if let Some((table, column)) = b.altered_column() {
        match a {
            DropConstraint { table: t, constraint } if touches(t, constraint, table, column) => {
                return true;
            }
            DropIndex { table: t, index } if t == table && index.columns.iter().any(|c| c == column) => {
                return true;
            }
            _ => {}
        }
    }
    if let Some((table, column)) = a.altered_column() {
        match b {
            AddConstraint { table: t, constraint } if touches(t, constraint, table, column) => {
                return true;
            }
            AddIndex { table: t, index } if t == table && index.columns.iter().any(|c| c == column) => {
                return true;
            }
            _ => {}
        }
    }

    match (a, b) {
        // A name is free again only once its old holder is gone. Index names
        // are schema-wide, constraint names are per table.
        (DropConstraint { table: t, constraint: old }, AddConstraint { table, constraint }) => {
            t == table && old.name == constraint.name
        }
        (DropIndex { index: old, .. }, AddIndex { index, .. }) => old.name == index.name,

        (CreateTable { table }, AddColumn { table: t, .. } | AddIndex { table: t, .. }) => {
            table.name == *t
        }
        (CreateTable { table }, AddConstraint { table: t, constraint }) => {
            table.name == *t || references(constraint, &table.name)
        }
        (AddColumn { table, column }, AddConstraint { table: t, constraint }) => {
            touches(t, constraint, table, &column.name)
        }
        (AddColumn { table, column }, AddIndex { table: t, index }) => {
            table == t && index.columns.contains(&column.name)
        }
        (AddConstraint { table, constraint: key }, AddConstraint { constraint: fk, .. })
            if key.is_key() =>
        {
            relies_on(fk, table, key.columns())
        }
        (AddIndex { table, index }, AddConstraint { constraint: fk, .. }) if index.unique => {
            relies_on(fk, table, &index.columns)
        }

        (DropConstraint { table: t, constraint }, DropColumn { table, column }) => {
            touches(t, constraint, table, &column.name)
        }
        (DropIndex { table: t, index }, DropColumn { table, column }) => {
            t == table && index.columns.contains(&column.name)
        }
        (DropConstraint { table: t, constraint }, DropTable { table }) => {
            *t == table.name || references(constraint, &table.name)
        }
        (DropIndex { table: t, .. }, DropTable { table }) => *t == table.name,
        (DropConstraint { constraint: fk, .. }, DropConstraint { table, constraint: key })
            if key.is_key() =>
        {
            relies_on(fk, table, key.columns())
        }
        (DropConstraint { constraint: fk, .. }, DropIndex { table, index }) if index.unique => {
            relies_on(fk, table, &index.columns)
        }
        _ => false,
    }
}

/// True when the constraint owned by `owner` involves `table.column`, either
/// directly or as the target of a foreign key.
fn touches(owner: &str, constraint: &Constraint, table: &str, column: &str) -> bool {
    (owner == table && constraint.involves_column(column))
        || constraint
            .as_foreign_key()
            .is_some_and(|fk| fk.ref_table == table && fk.ref_columns.iter().any(|c| c == column))
}

fn references(constraint: &Constraint, table: &str) -> bool {
    constraint
        .as_foreign_key()
        .is_some_and(|fk| fk.ref_table == table)
}

/// True when `constraint` is a foreign key whose target is exactly the key
/// `columns` of `table`.
fn relies_on(constraint: &Constraint, table: &str, columns: &[String]) -> bool {
    constraint.as_foreign_key().is_some_and(|fk| {
        fk.ref_table == table
            && fk.ref_columns.iter().collect::<BTreeSet<_>>() == columns.iter().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, DataType, Index, Table};

    fn create(name: &str) -> Change {
        Change::new(ChangeOp::CreateTable {
            table: Table::new(name)
                .with_column(Column::new("id", DataType::Integer))
                .with_constraint(Constraint::primary_key(format!("{name}_pkey"), &["id"])),
        })
    }

    fn fk(table: &str, target: &str) -> Constraint {
        Constraint::foreign_key(format!("{table}_{target}_id_fkey"), &["target_id"], target, &["id"])
    }

    fn names(changes: &[Change]) -> Vec<String> {
        changes.iter().map(|c| c.op.summary()).collect()
    }

    #[test]
    fn test_name_is_freed_before_reuse() {
        let changes = vec![
            Change::new(ChangeOp::AddIndex {
                table: "a".to_string(),
                index: Index::new("shared_idx", &["x"], false),
            }),
            Change::new(ChangeOp::AddConstraint {
                table: "t".to_string(),
                constraint: Constraint::check("c", "y > 0"),
            }),
            Change::new(ChangeOp::DropConstraint {
                table: "t".to_string(),
                constraint: Constraint::check("c", "x > 0"),
            }),
            Change::new(ChangeOp::DropIndex {
                table: "z".to_string(),
                index: Index::new("shared_idx", &["y"], false),
            }),
        ];
        let ops: Vec<ChangeOp> = changes.iter().map(|c| c.op.clone()).collect();
        assert!(must_precede(&ops[3], &ops[0]));
        assert!(must_precede(&ops[2], &ops[1]));
        assert!(!must_precede(&ops[0], &ops[3]));

        let sorted = sort(changes).unwrap();
        let position = |summary: &str| names(&sorted).iter().position(|n| n == summary).unwrap();
        assert!(position("drop_shared_idx") < position("add_shared_idx"));
        assert!(position("drop_c") < position("add_c"));
    }

    #[test]
    fn test_constraint_names_are_per_table() {
        let drop = ChangeOp::DropConstraint {
            table: "t".to_string(),
            constraint: Constraint::check("c", "x > 0"),
        };
        let add = ChangeOp::AddConstraint {
            table: "u".to_string(),
            constraint: Constraint::check("c", "y > 0"),
        };
        assert!(!must_precede(&drop, &add));
    }

    #[test]
    fn test_foreign_key_follows_both_tables() {
        let changes = vec![
            Change::new(ChangeOp::AddConstraint {
                table: "a".to_string(),
                constraint: fk("a", "z"),
            }),
            create("z"),
            create("a"),
        ];
        let sorted = sort(changes).unwrap();
        assert_eq!(names(&sorted), vec!["create_a", "create_z", "add_a_z_id_fkey"]);
    }

    #[test]
    fn test_foreign_key_dropped_before_key() {
        let changes = vec![
            Change::new(ChangeOp::DropConstraint {
                table: "users".to_string(),
                constraint: Constraint::primary_key("users_pkey", &["id"]),
            }),
            Change::new(ChangeOp::DropConstraint {
                table: "posts".to_string(),
                constraint: Constraint::foreign_key("posts_fkey", &["author"], "users", &["id"]),
            }),
        ];
        let sorted = sort(changes).unwrap();
        assert_eq!(names(&sorted), vec!["drop_posts_fkey", "drop_users_pkey"]);
    }

    #[test]
    fn test_unique_index_precedes_dependent_foreign_key() {
        let changes = vec![
            Change::new(ChangeOp::AddConstraint {
                table: "b".to_string(),
                constraint: Constraint::foreign_key("b_code_fkey", &["code"], "a", &["code"]),
            }),
            Change::new(ChangeOp::AddIndex {
                table: "a".to_string(),
                index: Index::new("a_code_idx", &["code"], true),
            }),
        ];
        let sorted = sort(changes).unwrap();
        assert_eq!(names(&sorted), vec!["add_a_code_idx", "add_b_code_fkey"]);
    }

    #[test]
    fn test_index_wraps_type_change() {
        let changes = vec![
            Change::new(ChangeOp::AlterColumnType {
                table: "t".to_string(),
                column: "c".to_string(),
                from: DataType::Integer,
                to: DataType::Bigint,
            }),
            Change::new(ChangeOp::AddIndex {
                table: "t".to_string(),
                index: Index::new("t_c_idx", &["c"], false),
            }),
            Change::new(ChangeOp::DropIndex {
                table: "t".to_string(),
                index: Index::new("t_c_old_idx", &["c"], false),
            }),
        ];
        let sorted = sort(changes).unwrap();
        assert_eq!(names(&sorted), vec!["drop_t_c_old_idx", "alter_t_c", "add_t_c_idx"]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let build = || vec![create("c"), create("a"), create("b")];
        let first = sort(build()).unwrap();
        let second = sort(build().into_iter().rev().collect()).unwrap();
        assert_eq!(names(&first), names(&second));
        assert_eq!(names(&first), vec!["create_a", "create_b", "create_c"]);
    }
}
