//! Applying parsed DDL statements to a schema model.
//!
//! [`SchemaState::apply`] follows PostgreSQL's statement-by-statement
//! semantics closely enough that replaying a broken migration (a foreign
//! key added before its target, a table dropped while still referenced)
//! fails the same way the database would.

use std::collections::BTreeSet;

use crate::model::{
    naming, Column, Constraint, ConstraintKind, ForeignKey, Index, ModelError, Schema, Table,
};
use crate::parser::ast::{
    AlterAction, AlterTable, ColumnDef, CreateIndex, CreateTable, DropIndex, DropTable, Statement,
    TableConstraint, TableConstraintKind,
};

/// A schema that statements are applied to one at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaState {
    schema: Schema,
}

impl SchemaState {
    /// Starts from an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing schema.
    #[must_use]
    pub const fn from_schema(schema: Schema) -> Self {
        Self { schema }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// Applies every statement in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first statement that cannot be applied.
    pub fn apply_all(&mut self, statements: &[Statement]) -> Result<(), ModelError> {
        statements.iter().try_for_each(|s| self.apply(s))
    }

    /// Applies one statement.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] when the statement is invalid against the
    /// current state. The state may be partially modified in that case.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), ModelError> {
        match statement {
            Statement::CreateTable(create) => {
                if create_table(&mut self.schema, create)? {
                    for constraint in create.constraints.iter().filter(|c| c.is_foreign_key()) {
                        add_constraint(&mut self.schema, &create.name, constraint)?;
                    }
                }
                Ok(())
            }
            Statement::CreateIndex(index) => add_index(&mut self.schema, index),
            Statement::AlterTable(alter) => self.alter_table(alter),
            Statement::DropTable(drop) => self.drop_tables(drop),
            Statement::DropIndex(drop) => self.drop_indexes(drop),
            Statement::Transaction(_) => Ok(()),
        }
    }

    fn alter_table(&mut self, alter: &AlterTable) -> Result<(), ModelError> {
        if self.schema.table(&alter.table).is_none() {
            if alter.if_exists {
                return Ok(());
            }
            return Err(ModelError::UnknownTable(alter.table.clone()));
        }
        for action in &alter.actions {
            self.alter(&alter.table, action)?;
        }
        Ok(())
    }

    fn alter(&mut self, table: &str, action: &AlterAction) -> Result<(), ModelError> {
        match action {
            AlterAction::AddColumn {
                column,
                constraints,
                if_not_exists,
            } => {
                let owner = table_mut(&mut self.schema, table)?;
                if owner.has_column(&column.name) {
                    if *if_not_exists {
                        return Ok(());
                    }
                    return Err(ModelError::AlreadyExists {
                        kind: "column",
                        name: format!("{table}.{}", column.name),
                    });
                }
                owner.columns.push(column_from_def(column));
                owner.validate()?;
                for constraint in constraints {
                    add_constraint(&mut self.schema, table, constraint)?;
                }
                Ok(())
            }
            AlterAction::DropColumn { name, if_exists } => {
                self.drop_column(table, name, *if_exists)
            }
            AlterAction::AlterColumnType { column, data_type } => {
                column_mut(&mut self.schema, table, column)?.data_type = data_type.clone();
                table_mut(&mut self.schema, table)?.validate()
            }
            AlterAction::SetNotNull { column } => {
                column_mut(&mut self.schema, table, column)?.nullable = false;
                Ok(())
            }
            AlterAction::DropNotNull { column } => {
                let in_primary_key = self
                    .schema
                    .table(table)
                    .and_then(Table::primary_key)
                    .is_some_and(|pk| pk.columns().contains(column));
                if in_primary_key {
                    return Err(invalid(table, column, "column is in a primary key"));
                }
                let target = column_mut(&mut self.schema, table, column)?;
                if target.identity.is_identity() {
                    return Err(invalid(table, column, "column is an identity column"));
                }
                target.nullable = true;
                Ok(())
            }
            AlterAction::SetDefault { column, expression } => {
                let target = column_mut(&mut self.schema, table, column)?;
                if target.identity.is_identity() && expression.is_some() {
                    return Err(invalid(table, column, "column is an identity column"));
                }
                target.default.clone_from(expression);
                Ok(())
            }
            AlterAction::DropDefault { column } => {
                column_mut(&mut self.schema, table, column)?.default = None;
                Ok(())
            }
            AlterAction::AddIdentity { column, identity } => {
                let target = column_mut(&mut self.schema, table, column)?;
                if target.identity.is_identity() {
                    return Err(invalid(table, column, "column is already an identity column"));
                }
                if target.nullable {
                    return Err(invalid(
                        table,
                        column,
                        "column must be declared NOT NULL before identity can be added",
                    ));
                }
                if target.default.is_some() {
                    return Err(invalid(table, column, "column already has a default value"));
                }
                target.identity = *identity;
                table_mut(&mut self.schema, table)?.validate()
            }
            AlterAction::SetIdentity { column, identity } => {
                let target = column_mut(&mut self.schema, table, column)?;
                if !target.identity.is_identity() {
                    return Err(invalid(table, column, "column is not an identity column"));
                }
                target.identity = *identity;
                Ok(())
            }
            AlterAction::DropIdentity { column, if_exists } => {
                let target = column_mut(&mut self.schema, table, column)?;
                if !target.identity.is_identity() {
                    if *if_exists {
                        return Ok(());
                    }
                    return Err(invalid(table, column, "column is not an identity column"));
                }
                target.identity = crate::model::Identity::None;
                Ok(())
            }
            AlterAction::AddConstraint(constraint) => {
                add_constraint(&mut self.schema, table, constraint)
            }
            AlterAction::DropConstraint { name, if_exists } => {
                self.drop_constraint(table, name, *if_exists)
            }
        }
    }

    fn drop_column(&mut self, table: &str, name: &str, if_exists: bool) -> Result<(), ModelError> {
        let owner = table_ref(&self.schema, table)?;
        if !owner.has_column(name) {
            if if_exists {
                return Ok(());
            }
            return Err(ModelError::UnknownColumn {
                table: table.to_string(),
                column: name.to_string(),
            });
        }

        for (referencing, constraint) in self.schema.references_to(table) {
            let relies_on_column = constraint
                .as_foreign_key()
                .is_some_and(|fk| fk.ref_columns.iter().any(|c| c == name));
            if relies_on_column {
                let key = owner
                    .constraints
                    .iter()
                    .find(|c| c.is_key() && c.involves_column(name))
                    .map_or_else(|| name.to_string(), |c| c.name.clone());
                return Err(ModelError::KeyInUse {
                    table: table.to_string(),
                    name: key,
                    referencing: referencing.to_string(),
                    constraint: constraint.name.clone(),
                });
            }
        }

        let owner = table_mut(&mut self.schema, table)?;
        owner.columns.retain(|c| c.name != name);
        owner.constraints.retain(|c| {
            let self_reference = c
                .as_foreign_key()
                .is_some_and(|fk| fk.ref_table == table && fk.ref_columns.iter().any(|r| r == name));
            !c.involves_column(name) && !self_reference
        });
        owner.indexes.retain(|i| !i.columns.iter().any(|c| c == name));
        Ok(())
    }

    fn drop_constraint(&mut self, table: &str, name: &str, if_exists: bool) -> Result<(), ModelError> {
        let owner = table_ref(&self.schema, table)?;
        let Some(constraint) = owner.constraint(name) else {
            if if_exists {
                return Ok(());
            }
            return Err(ModelError::UnknownConstraint {
                table: table.to_string(),
                name: name.to_string(),
            });
        };

        if constraint.is_key() {
            let mut remaining = owner.clone();
            remaining.constraints.retain(|c| c.name != name);
            for referencing in self.schema.tables.values() {
                for (fk_constraint, fk) in referencing.foreign_keys() {
                    if fk.ref_table == table
                        && same_column_set(&fk.ref_columns, constraint.columns())
                        && !has_matching_key(&remaining, &fk.ref_columns)
                    {
                        return Err(ModelError::KeyInUse {
                            table: table.to_string(),
                            name: name.to_string(),
                            referencing: referencing.name.clone(),
                            constraint: fk_constraint.name.clone(),
                        });
                    }
                }
            }
        }

        table_mut(&mut self.schema, table)?
            .constraints
            .retain(|c| c.name != name);
        Ok(())
    }

    fn drop_tables(&mut self, drop: &DropTable) -> Result<(), ModelError> {
        let mut targets = Vec::new();
        for name in &drop.names {
            if self.schema.table(name).is_some() {
                targets.push(name.as_str());
            } else if !drop.if_exists {
                return Err(ModelError::UnknownTable(name.clone()));
            }
        }

        for target in &targets {
            let outside = self
                .schema
                .references_to(target)
                .into_iter()
                .find(|(referencing, _)| !targets.contains(referencing));
            if let Some((referencing, constraint)) = outside {
                return Err(ModelError::StillReferenced {
                    table: (*target).to_string(),
                    referencing: referencing.to_string(),
                    constraint: constraint.name.clone(),
                });
            }
        }

        for target in targets {
            self.schema.tables.remove(target);
        }
        Ok(())
    }

    fn drop_indexes(&mut self, drop: &DropIndex) -> Result<(), ModelError> {
        for name in &drop.names {
            let Some(owner) = self.schema.index_owner(name).map(str::to_string) else {
                if drop.if_exists {
                    continue;
                }
                return Err(ModelError::UnknownIndex(name.clone()));
            };
            table_mut(&mut self.schema, &owner)?
                .indexes
                .retain(|i| &i.name != name);
        }
        Ok(())
    }
}

/// Builds a table from `CREATE TABLE` with every constraint except foreign
/// keys, which the caller attaches once their targets exist. Returns false
/// when the table already exists and `IF NOT EXISTS` was given.
pub(crate) fn create_table(schema: &mut Schema, create: &CreateTable) -> Result<bool, ModelError> {
    if schema.table(&create.name).is_some() {
        if create.if_not_exists {
            return Ok(false);
        }
        return Err(ModelError::AlreadyExists {
            kind: "table",
            name: create.name.clone(),
        });
    }

    let mut table = Table::new(&create.name);
    table.columns = create.columns.iter().map(column_from_def).collect();
    table.validate()?;
    for constraint in create.constraints.iter().filter(|c| !c.is_foreign_key()) {
        let resolved = resolve_constraint(schema, &table, constraint)?;
        table.add_constraint(resolved);
        table.validate()?;
    }
    schema.add_table(table)?;
    Ok(true)
}

/// Names, resolves and attaches a constraint to an existing table.
pub(crate) fn add_constraint(
    schema: &mut Schema,
    table: &str,
    constraint: &TableConstraint,
) -> Result<(), ModelError> {
    let resolved = resolve_constraint(schema, table_ref(schema, table)?, constraint)?;
    let owner = table_mut(schema, table)?;
    owner.add_constraint(resolved);
    owner.validate()
}

/// Attaches an index, naming it `{table}_{cols}_idx` when unnamed.
pub(crate) fn add_index(schema: &mut Schema, index: &CreateIndex) -> Result<(), ModelError> {
    if let Some(name) = &index.name {
        if schema.index_owner(name).is_some() {
            if index.if_not_exists {
                return Ok(());
            }
            return Err(ModelError::AlreadyExists {
                kind: "index",
                name: name.clone(),
            });
        }
    }

    let owner = table_ref(schema, &index.table)?;
    let name = match &index.name {
        Some(name) => name.clone(),
        None => naming::default_name(&owner.name, &index.columns, "idx", &index_names(schema)),
    };
    let owner = table_mut(schema, &index.table)?;
    owner.indexes.push(Index {
        name,
        columns: index.columns.clone(),
        unique: index.unique,
    });
    owner.validate()
}

/// Turns a written constraint into a model constraint: assigns the default
/// name and resolves a foreign key's target columns against `schema`.
/// `table` is the owner and may not be in `schema` yet.
fn resolve_constraint(
    schema: &Schema,
    table: &Table,
    constraint: &TableConstraint,
) -> Result<Constraint, ModelError> {
    let name = constraint
        .name
        .clone()
        .unwrap_or_else(|| default_constraint_name(table, &constraint.kind));

    let kind = match &constraint.kind {
        TableConstraintKind::PrimaryKey { columns } => ConstraintKind::PrimaryKey {
            columns: columns.clone(),
        },
        TableConstraintKind::Unique { columns } => ConstraintKind::Unique {
            columns: columns.clone(),
        },
        TableConstraintKind::Check { expression, .. } => ConstraintKind::Check {
            expression: expression.clone(),
        },
        TableConstraintKind::ForeignKey {
            columns,
            ref_table,
            ref_columns,
            on_delete,
            on_update,
        } => {
            let target = if *ref_table == table.name {
                Some(table)
            } else {
                schema.table(ref_table)
            };
            let Some(target) = target else {
                return Err(ModelError::MissingReferencedTable {
                    table: table.name.clone(),
                    name,
                    target: ref_table.clone(),
                });
            };

            let ref_columns = match ref_columns {
                Some(columns) => columns.clone(),
                None => target
                    .primary_key()
                    .map(|pk| pk.columns().to_vec())
                    .ok_or_else(|| ModelError::NoPrimaryKey(target.name.clone()))?,
            };
            if let Some(missing) = ref_columns.iter().find(|c| !target.has_column(c)) {
                return Err(ModelError::UnknownColumn {
                    table: target.name.clone(),
                    column: missing.clone(),
                });
            }
            if !has_matching_key(target, &ref_columns) {
                return Err(ModelError::NoMatchingKey {
                    table: target.name.clone(),
                    columns: ref_columns,
                });
            }

            ConstraintKind::ForeignKey(ForeignKey {
                columns: columns.clone(),
                ref_table: ref_table.clone(),
                ref_columns,
                on_delete: *on_delete,
                on_update: *on_update,
            })
        }
    };

    Ok(Constraint { name, kind })
}

fn default_constraint_name(table: &Table, kind: &TableConstraintKind) -> String {
    let taken = table.constraint_names();
    let (columns, suffix): (&[String], &str) = match kind {
        TableConstraintKind::PrimaryKey { .. } => (&[], "pkey"),
        TableConstraintKind::Unique { columns } => (columns, "key"),
        TableConstraintKind::ForeignKey { columns, .. } => (columns, "fkey"),
        TableConstraintKind::Check {
            column: Some(column),
            ..
        } => (std::slice::from_ref(column), "check"),
        TableConstraintKind::Check { column: None, .. } => (&[], "check"),
    };
    naming::default_name(&table.name, columns, suffix, &taken)
}

/// A foreign key may only point at columns covered by a primary key, a
/// unique constraint or a unique index.
fn has_matching_key(target: &Table, columns: &[String]) -> bool {
    target
        .constraints
        .iter()
        .filter(|c| c.is_key())
        .any(|c| same_column_set(c.columns(), columns))
        || target
            .indexes
            .iter()
            .any(|i| i.unique && same_column_set(&i.columns, columns))
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    let a: BTreeSet<&String> = a.iter().collect();
    let b: BTreeSet<&String> = b.iter().collect();
    a == b
}

fn column_from_def(def: &ColumnDef) -> Column {
    Column {
        name: def.name.clone(),
        data_type: def.data_type.clone(),
        nullable: !def.not_null,
        default: def.default.clone(),
        identity: def.identity,
    }
}

fn index_names(schema: &Schema) -> BTreeSet<String> {
    schema
        .tables
        .values()
        .flat_map(|t| t.indexes.iter().map(|i| i.name.clone()))
        .collect()
}

fn table_ref<'s>(schema: &'s Schema, table: &str) -> Result<&'s Table, ModelError> {
    schema
        .table(table)
        .ok_or_else(|| ModelError::UnknownTable(table.to_string()))
}

fn table_mut<'s>(schema: &'s mut Schema, table: &str) -> Result<&'s mut Table, ModelError> {
    schema
        .table_mut(table)
        .ok_or_else(|| ModelError::UnknownTable(table.to_string()))
}

fn column_mut<'s>(
    schema: &'s mut Schema,
    table: &str,
    column: &str,
) -> Result<&'s mut Column, ModelError> {
    table_mut(schema, table)?
        .column_mut(column)
        .ok_or_else(|| ModelError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn invalid(table: &str, column: &str, reason: &str) -> ModelError {
    ModelError::InvalidAlteration {
        table: table.to_string(),
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, Identity};
    use crate::parser::parse_statements;

    fn replay(sql: &str) -> Result<Schema, ModelError> {
        let mut state = SchemaState::new();
        state.apply_all(&parse_statements(sql).unwrap())?;
        Ok(state.into_schema())
    }

    const USERS: &str = "CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL UNIQUE);";

    #[test]
    fn test_create_table_names_constraints() {
        let schema = replay(USERS).unwrap();
        let users = schema.table("users").unwrap();
        assert!(users.constraint("users_pkey").is_some());
        assert!(users.constraint("users_email_key").is_some());
        assert!(!users.column("id").unwrap().nullable);
    }

    #[test]
    fn test_foreign_key_requires_existing_target() {
        let err = replay("CREATE TABLE posts (author_id int REFERENCES users);").unwrap_err();
        assert!(matches!(err, ModelError::MissingReferencedTable { ref target, .. } if target == "users"));
    }

    #[test]
    fn test_foreign_key_defaults_to_primary_key() {
        let schema = replay(&format!(
            "{USERS} CREATE TABLE posts (id int PRIMARY KEY, author_id int REFERENCES users);"
        ))
        .unwrap();
        let fk = schema
            .table("posts")
            .unwrap()
            .constraint("posts_author_id_fkey")
            .and_then(Constraint::as_foreign_key)
            .cloned()
            .unwrap();
        assert_eq!(fk.ref_columns, vec!["id".to_string()]);
    }

    #[test]
    fn test_foreign_key_needs_unique_target() {
        let err = replay(
            "CREATE TABLE a (id int PRIMARY KEY, code text); \
             CREATE TABLE b (code text REFERENCES a (code));",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::NoMatchingKey { .. }));
    }

    #[test]
    fn test_drop_referenced_table_fails() {
        let err = replay(&format!(
            "{USERS} CREATE TABLE posts (author_id int REFERENCES users); DROP TABLE users;"
        ))
        .unwrap_err();
        assert!(matches!(err, ModelError::StillReferenced { .. }));

        let schema = replay(&format!(
            "{USERS} CREATE TABLE posts (author_id int REFERENCES users); DROP TABLE posts, users;"
        ))
        .unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn test_drop_key_in_use_fails() {
        let err = replay(&format!(
            "{USERS} CREATE TABLE posts (author_id int REFERENCES users); \
             ALTER TABLE users DROP CONSTRAINT users_pkey;"
        ))
        .unwrap_err();
        assert!(matches!(err, ModelError::KeyInUse { ref constraint, .. } if constraint == "posts_author_id_fkey"));
    }

    #[test]
    fn test_drop_column_removes_dependents() {
        let schema = replay(&format!(
            "{USERS} CREATE INDEX ON users (email); \
             ALTER TABLE users ADD CONSTRAINT email_lower CHECK (email = lower(email)); \
             ALTER TABLE users DROP COLUMN email;"
        ))
        .unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.columns.len(), 1);
        assert_eq!(users.constraints.len(), 1);
        assert!(users.indexes.is_empty());
    }

    #[test]
    fn test_alter_column_actions() {
        let schema = replay(&format!(
            "{USERS} ALTER TABLE users ADD COLUMN age smallint, \
             ALTER COLUMN age TYPE integer, \
             ALTER COLUMN age SET DEFAULT 0, \
             ALTER COLUMN age SET NOT NULL;"
        ))
        .unwrap();
        let age = schema.table("users").unwrap().column("age").unwrap().clone();
        assert_eq!(age.data_type, DataType::Integer);
        assert_eq!(age.default.as_deref(), Some("0"));
        assert!(!age.nullable);
    }

    #[test]
    fn test_identity_requires_not_null() {
        let err = replay(
            "CREATE TABLE t (id int); ALTER TABLE t ALTER COLUMN id ADD GENERATED ALWAYS AS IDENTITY;",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAlteration { .. }));

        let schema = replay(
            "CREATE TABLE t (id int NOT NULL); \
             ALTER TABLE t ALTER COLUMN id ADD GENERATED ALWAYS AS IDENTITY;",
        )
        .unwrap();
        assert_eq!(
            schema.table("t").unwrap().column("id").unwrap().identity,
            Identity::Always
        );
    }

    #[test]
    fn test_drop_not_null_on_primary_key_fails() {
        let err = replay(&format!("{USERS} ALTER TABLE users ALTER COLUMN id DROP NOT NULL;"))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAlteration { .. }));
    }

    #[test]
    fn test_if_exists_variants_are_no_ops() {
        let schema = replay(
            "DROP TABLE IF EXISTS ghost; DROP INDEX IF EXISTS ghost_idx; \
             ALTER TABLE IF EXISTS ghost ADD COLUMN a int; \
             CREATE TABLE t (a int); CREATE TABLE IF NOT EXISTS t (b int); \
             ALTER TABLE t ADD COLUMN IF NOT EXISTS a text;",
        )
        .unwrap();
        let t = schema.table("t").unwrap();
        assert_eq!(t.columns.len(), 1);
        assert_eq!(t.columns[0].data_type, DataType::Integer);
    }

    #[test]
    fn test_duplicate_table_fails() {
        let err = replay("CREATE TABLE t (a int); CREATE TABLE t (a int);").unwrap_err();
        assert!(matches!(err, ModelError::AlreadyExists { kind: "table", .. }));
    }
}
