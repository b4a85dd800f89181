//! Tables, columns, constraints and indexes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{DataType, ModelError};
use crate::expr;

/// Identity generation mode of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    /// Not an identity column.
    #[default]
    None,
    /// `GENERATED ALWAYS AS IDENTITY`
    Always,
    /// `GENERATED BY DEFAULT AS IDENTITY`
    ByDefault,
}

impl Identity {
    /// Returns true for `Always` and `ByDefault`.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the `ALWAYS` / `BY DEFAULT` clause, or `None` for plain columns.
    #[must_use]
    pub const fn generation_sql(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Always => Some("ALWAYS"),
            Self::ByDefault => Some("BY DEFAULT"),
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    /// Normalized default expression text.
    pub default: Option<String>,
    pub identity: Identity,
}

impl Column {
    /// Creates a nullable column without default or identity.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
            identity: Identity::None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default expression. The text is stored as given; callers
    /// pass normalized expressions.
    #[must_use]
    pub fn default_expr(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    /// Makes this an identity column, which also makes it NOT NULL.
    #[must_use]
    pub const fn identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        if identity.is_identity() {
            self.nullable = false;
        }
        self
    }
}

/// Action taken on the referencing rows when a referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Returns the SQL spelling of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Decodes the single-letter codes stored in `pg_constraint`.
    #[must_use]
    pub const fn from_catalog_code(code: char) -> Option<Self> {
        match code {
            'a' => Some(Self::NoAction),
            'r' => Some(Self::Restrict),
            'c' => Some(Self::Cascade),
            'n' => Some(Self::SetNull),
            'd' => Some(Self::SetDefault),
            _ => None,
        }
    }
}

/// Foreign key details.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// What a constraint enforces. Equality of two kinds is the structural
/// equality used by the differ; names are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey { columns: Vec<String> },
    Unique { columns: Vec<String> },
    ForeignKey(ForeignKey),
    Check { expression: String },
}

/// A named table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
}

impl Constraint {
    #[must_use]
    pub fn primary_key(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::PrimaryKey {
                columns: to_strings(columns),
            },
        }
    }

    #[must_use]
    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Unique {
                columns: to_strings(columns),
            },
        }
    }

    #[must_use]
    pub fn check(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Check {
                expression: expression.into(),
            },
        }
    }

    #[must_use]
    pub fn foreign_key(
        name: impl Into<String>,
        columns: &[&str],
        ref_table: impl Into<String>,
        ref_columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::ForeignKey(ForeignKey {
                columns: to_strings(columns),
                ref_table: ref_table.into(),
                ref_columns: to_strings(ref_columns),
                on_delete: ReferentialAction::NoAction,
                on_update: ReferentialAction::NoAction,
            }),
        }
    }

    /// Sets the referential actions of a foreign key; no-op for other kinds.
    #[must_use]
    pub fn on_actions(mut self, on_delete: ReferentialAction, on_update: ReferentialAction) -> Self {
        if let ConstraintKind::ForeignKey(fk) = &mut self.kind {
            fk.on_delete = on_delete;
            fk.on_update = on_update;
        }
        self
    }

    /// Returns the constrained column list; empty for check constraints.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        match &self.kind {
            ConstraintKind::PrimaryKey { columns } | ConstraintKind::Unique { columns } => columns,
            ConstraintKind::ForeignKey(fk) => &fk.columns,
            ConstraintKind::Check { .. } => &[],
        }
    }

    /// Returns the foreign key details if this is a foreign key.
    #[must_use]
    pub const fn as_foreign_key(&self) -> Option<&ForeignKey> {
        match &self.kind {
            ConstraintKind::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }

    /// Returns true for primary key and unique constraints, the ones a
    /// foreign key can point at.
    #[must_use]
    pub const fn is_key(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::PrimaryKey { .. } | ConstraintKind::Unique { .. }
        )
    }

    /// Returns true when the constraint involves `column`, including columns
    /// mentioned inside a check expression.
    #[must_use]
    pub fn involves_column(&self, column: &str) -> bool {
        match &self.kind {
            ConstraintKind::Check { expression } => expr::mentions_identifier(expression, column),
            _ => self.columns().iter().any(|c| c == column),
        }
    }

    /// Structural equality, ignoring the name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.kind == other.kind
    }

    /// Short label of the kind, used in slugs and messages.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self.kind {
            ConstraintKind::PrimaryKey { .. } => "pkey",
            ConstraintKind::Unique { .. } => "key",
            ConstraintKind::ForeignKey(_) => "fkey",
            ConstraintKind::Check { .. } => "check",
        }
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.into(),
            columns: to_strings(columns),
            unique,
        }
    }

    /// Structural equality, ignoring the name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub indexes: Vec<Index>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends a constraint. Primary key columns become NOT NULL.
    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    /// Appends an index.
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a constraint in place. Primary key columns become NOT NULL.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        if let ConstraintKind::PrimaryKey { columns } = &constraint.kind {
            for name in columns {
                if let Some(column) = self.column_mut(name) {
                    column.nullable = false;
                }
            }
        }
        self.constraints.push(constraint);
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns the primary key constraint, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey { .. }))
    }

    /// Iterates over the foreign keys declared on this table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Constraint, &ForeignKey)> {
        self.constraints
            .iter()
            .filter_map(|c| c.as_foreign_key().map(|fk| (c, fk)))
    }

    /// Returns every constraint and index name in use on this table.
    #[must_use]
    pub fn constraint_names(&self) -> BTreeSet<String> {
        self.constraints.iter().map(|c| c.name.clone()).collect()
    }

    /// Checks the per-table invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ModelError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
            if column.identity.is_identity() {
                if !column.data_type.is_integer() {
                    return Err(ModelError::IdentityRequiresInteger {
                        table: self.name.clone(),
                        column: column.name.clone(),
                    });
                }
                if column.default.is_some() {
                    return Err(ModelError::IdentityWithDefault {
                        table: self.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        let mut names = BTreeSet::new();
        let mut primary_keys = 0;
        for constraint in &self.constraints {
            if !names.insert(constraint.name.as_str()) {
                return Err(ModelError::DuplicateConstraint {
                    table: self.name.clone(),
                    name: constraint.name.clone(),
                });
            }
            match &constraint.kind {
                ConstraintKind::PrimaryKey { .. } => primary_keys += 1,
                ConstraintKind::ForeignKey(fk) if fk.columns.len() != fk.ref_columns.len() => {
                    return Err(ModelError::ForeignKeyArity {
                        table: self.name.clone(),
                        name: constraint.name.clone(),
                        local: fk.columns.len(),
                        remote: fk.ref_columns.len(),
                    });
                }
                _ => {}
            }
            if constraint.is_key() || constraint.as_foreign_key().is_some() {
                self.check_columns(&constraint.name, constraint.columns())?;
            }
        }
        if primary_keys > 1 {
            return Err(ModelError::MultiplePrimaryKeys(self.name.clone()));
        }

        for index in &self.indexes {
            self.check_columns(&index.name, &index.columns)?;
        }
        Ok(())
    }

    fn check_columns(&self, owner: &str, columns: &[String]) -> Result<(), ModelError> {
        if columns.is_empty() {
            return Err(ModelError::EmptyColumnList {
                table: self.name.clone(),
                name: owner.to_string(),
            });
        }
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(ModelError::UnknownColumn {
                table: self.name.clone(),
                column: missing.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// A relational schema: tables keyed by normalized name, iterated in name order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Schema {
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTable`] if the name is taken.
    pub fn add_table(&mut self, table: Table) -> Result<(), ModelError> {
        if self.tables.contains_key(&table.name) {
            return Err(ModelError::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Builder form of [`Schema::add_table`] for tests and fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DuplicateTable`] if the name is taken.
    pub fn with_table(mut self, table: Table) -> Result<Self, ModelError> {
        self.add_table(table)?;
        Ok(self)
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns the table owning the index called `name`.
    #[must_use]
    pub fn index_owner(&self, name: &str) -> Option<&str> {
        self.tables
            .values()
            .find(|t| t.index(name).is_some())
            .map(|t| t.name.as_str())
    }

    /// Returns `(table, constraint)` pairs of foreign keys pointing at `target`
    /// from other tables.
    #[must_use]
    pub fn references_to(&self, target: &str) -> Vec<(&str, &Constraint)> {
        self.tables
            .values()
            .filter(|t| t.name != target)
            .flat_map(|t| {
                t.foreign_keys()
                    .filter(|(_, fk)| fk.ref_table == target)
                    .map(move |(c, _)| (t.name.as_str(), c))
            })
            .collect()
    }

    /// Checks every invariant: per-table rules, schema-wide index name
    /// uniqueness and foreign key targets.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut index_names = BTreeSet::new();
        for table in self.tables.values() {
            table.validate()?;
            for index in &table.indexes {
                if !index_names.insert(index.name.as_str()) {
                    return Err(ModelError::DuplicateIndex(index.name.clone()));
                }
            }
        }
        self.validate_references()
    }

    /// Checks that every foreign key targets an existing table and columns.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingReferencedTable`] or
    /// [`ModelError::UnknownColumn`].
    pub fn validate_references(&self) -> Result<(), ModelError> {
        for table in self.tables.values() {
            for (constraint, fk) in table.foreign_keys() {
                let Some(target) = self.table(&fk.ref_table) else {
                    return Err(ModelError::MissingReferencedTable {
                        table: table.name.clone(),
                        name: constraint.name.clone(),
                        target: fk.ref_table.clone(),
                    });
                };
                if let Some(missing) = fk.ref_columns.iter().find(|c| !target.has_column(c)) {
                    return Err(ModelError::UnknownColumn {
                        table: target.name.clone(),
                        column: missing.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", DataType::Integer))
            .with_column(Column::new("email", DataType::Text).not_null())
            .with_constraint(Constraint::primary_key("users_pkey", &["id"]))
    }

    #[test]
    fn test_primary_key_columns_become_not_null() {
        let table = users();
        assert!(!table.column("id").unwrap().nullable);
    }

    #[test]
    fn test_identity_implies_not_null() {
        let column = Column::new("id", DataType::Bigint).identity(Identity::Always);
        assert!(!column.nullable);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut schema = Schema::new();
        schema.add_table(users()).unwrap();
        assert_eq!(
            schema.add_table(users()),
            Err(ModelError::DuplicateTable("users".to_string()))
        );
    }

    #[test]
    fn test_validate_duplicate_column() {
        let table = users().with_column(Column::new("email", DataType::Text));
        assert!(matches!(
            table.validate(),
            Err(ModelError::DuplicateColumn { column, .. }) if column == "email"
        ));
    }

    #[test]
    fn test_validate_multiple_primary_keys() {
        let table = users().with_constraint(Constraint::primary_key("other_pkey", &["email"]));
        assert_eq!(
            table.validate(),
            Err(ModelError::MultiplePrimaryKeys("users".to_string()))
        );
    }

    #[test]
    fn test_validate_identity_requires_integer() {
        let mut table = users();
        table.columns.push(Column::new("code", DataType::Text).identity(Identity::ByDefault));
        assert!(matches!(
            table.validate(),
            Err(ModelError::IdentityRequiresInteger { .. })
        ));
    }

    #[test]
    fn test_validate_unknown_index_column() {
        let table = users().with_index(Index::new("users_name_idx", &["name"], false));
        assert!(matches!(
            table.validate(),
            Err(ModelError::UnknownColumn { column, .. }) if column == "name"
        ));
    }

    #[test]
    fn test_validate_missing_reference_target() {
        let posts = Table::new("posts")
            .with_column(Column::new("author_id", DataType::Integer))
            .with_constraint(Constraint::foreign_key(
                "posts_author_id_fkey",
                &["author_id"],
                "authors",
                &["id"],
            ));
        let schema = Schema::new().with_table(posts).unwrap();
        assert!(matches!(
            schema.validate(),
            Err(ModelError::MissingReferencedTable { target, .. }) if target == "authors"
        ));
    }

    #[test]
    fn test_validate_duplicate_index_across_tables() {
        let a = users().with_index(Index::new("idx", &["email"], false));
        let b = Table::new("b")
            .with_column(Column::new("x", DataType::Integer))
            .with_index(Index::new("idx", &["x"], false));
        let schema = Schema::new().with_table(a).unwrap().with_table(b).unwrap();
        assert_eq!(
            schema.validate(),
            Err(ModelError::DuplicateIndex("idx".to_string()))
        );
    }

    #[test]
    fn test_references_to() {
        let posts = Table::new("posts")
            .with_column(Column::new("author_id", DataType::Integer))
            .with_constraint(Constraint::foreign_key(
                "posts_author_id_fkey",
                &["author_id"],
                "users",
                &["id"],
            ));
        let schema = Schema::new()
            .with_table(users())
            .unwrap()
            .with_table(posts)
            .unwrap();
        let refs = schema.references_to("users");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "posts");
        assert!(schema.references_to("posts").is_empty());
    }

    #[test]
    fn test_constraint_structural_equality_ignores_name() {
        let a = Constraint::unique("a", &["email"]);
        let b = Constraint::unique("users_email_key", &["email"]);
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&Constraint::unique("a", &["id"])));
    }

    #[test]
    fn test_check_involves_mentioned_column() {
        let check = Constraint::check("users_age_check", "age >= 0");
        assert!(check.involves_column("age"));
        assert!(!check.involves_column("email"));
    }
}
