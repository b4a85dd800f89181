//! Schema model invariant violations.

/// A structural invariant of the schema model was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Two tables share a normalized name.
    #[error("table '{0}' is defined more than once")]
    DuplicateTable(String),

    /// Two columns in one table share a name.
    #[error("column '{column}' is defined more than once in table '{table}'")]
    DuplicateColumn {
        /// Owning table.
        table: String,
        /// Repeated column name.
        column: String,
    },

    /// Two constraints in one table share a name.
    #[error("constraint '{name}' is defined more than once on table '{table}'")]
    DuplicateConstraint {
        /// Owning table.
        table: String,
        /// Repeated constraint name.
        name: String,
    },

    /// Two indexes share a name within the schema.
    #[error("index '{0}' is defined more than once")]
    DuplicateIndex(String),

    /// More than one primary key was declared.
    #[error("table '{0}' has more than one primary key")]
    MultiplePrimaryKeys(String),

    /// An identity column does not use an integer type.
    #[error("identity column '{table}.{column}' must be smallint, integer or bigint")]
    IdentityRequiresInteger {
        /// Owning table.
        table: String,
        /// Identity column.
        column: String,
    },

    /// An identity column also declares a default.
    #[error("identity column '{table}.{column}' cannot also have a default")]
    IdentityWithDefault {
        /// Owning table.
        table: String,
        /// Identity column.
        column: String,
    },

    /// A table could not be found.
    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    /// A constraint, index or alteration names a column the table lacks.
    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn {
        /// Owning table.
        table: String,
        /// Missing column.
        column: String,
    },

    /// A named constraint could not be found.
    #[error("constraint '{name}' does not exist on table '{table}'")]
    UnknownConstraint {
        /// Owning table.
        table: String,
        /// Missing constraint.
        name: String,
    },

    /// A named index could not be found.
    #[error("index '{0}' does not exist")]
    UnknownIndex(String),

    /// A foreign key references a table that does not exist.
    #[error("foreign key '{name}' on '{table}' references missing table '{target}'")]
    MissingReferencedTable {
        /// Owning table.
        table: String,
        /// Constraint name.
        name: String,
        /// Referenced table.
        target: String,
    },

    /// A foreign key omits its referenced columns and the target has no primary key.
    #[error("table '{0}' has no primary key to reference")]
    NoPrimaryKey(String),

    /// Local and referenced column lists of a foreign key differ in length.
    #[error("foreign key '{name}' on '{table}' has {local} columns but references {remote}")]
    ForeignKeyArity {
        /// Owning table.
        table: String,
        /// Constraint name.
        name: String,
        /// Number of local columns.
        local: usize,
        /// Number of referenced columns.
        remote: usize,
    },

    /// A constraint or index lists no columns.
    #[error("'{name}' on table '{table}' lists no columns")]
    EmptyColumnList {
        /// Owning table.
        table: String,
        /// Constraint or index name.
        name: String,
    },

    /// A table was dropped while other tables still reference it.
    #[error("cannot drop table '{table}': constraint '{constraint}' on '{referencing}' depends on it")]
    StillReferenced {
        /// Table being dropped.
        table: String,
        /// Table holding the foreign key.
        referencing: String,
        /// Foreign key name.
        constraint: String,
    },

    /// The object already exists.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// Object kind, e.g. "table".
        kind: &'static str,
        /// Object name.
        name: String,
    },

    /// A referenced column list matches no primary key, unique constraint or
    /// unique index of the target table.
    #[error("there is no unique constraint matching columns ({}) of table '{table}'", .columns.join(", "))]
    NoMatchingKey {
        /// Referenced table.
        table: String,
        /// Referenced columns.
        columns: Vec<String>,
    },

    /// A key was dropped while a foreign key still relies on it.
    #[error("cannot drop constraint '{name}' on '{table}': constraint '{constraint}' on '{referencing}' depends on it")]
    KeyInUse {
        /// Table owning the key.
        table: String,
        /// Key constraint name.
        name: String,
        /// Table holding the foreign key.
        referencing: String,
        /// Foreign key name.
        constraint: String,
    },

    /// A column alteration is not valid in the column's current state.
    #[error("cannot alter column '{table}.{column}': {reason}")]
    InvalidAlteration {
        /// Owning table.
        table: String,
        /// Altered column.
        column: String,
        /// What is wrong with the alteration.
        reason: String,
    },
}
