//! Declarative schema diffing for PostgreSQL.
//!
//! `oxide-schema` compares a desired schema, written as plain DDL, with the
//! current state of a database and produces reversible migrations, where:
//! - Both sides are folded into one typed model, so `int`, `int4` and
//!   `integer` never show up as a change
//! - Every change has an exact inverse, so each forward script comes with
//!   a down script that restores the previous schema
//! - Changes are ordered by their dependencies, so tables exist before the
//!   foreign keys that point at them
//!
//! The crate is pure: no I/O, no async, no logging. Talking to a database
//! and writing files is left to `oxide-schemagen`.
//!
//! # Architecture
//!
//! - **Lexer / Parser** - DDL text into statements and a desired [`Schema`]
//! - **Model** - Canonical tables, columns, constraints and indexes
//! - **Introspection** - Folds catalog rows into the same model
//! - **State / Replay** - Applies statements to a model, e.g. existing
//!   migration files, to recover the current schema without a database
//! - **Diff** - Ordered [`ChangeOp`]s between two schemas, with warnings
//! - **Synth** - Forward and reverse DDL through a [`Dialect`]
//!
//! # Example
//!
//! ```rust
//! use oxide_schema::prelude::*;
//!
//! let current = Schema::new();
//! let desired = parse_schema(
//!     "CREATE TABLE users (id integer PRIMARY KEY, email varchar(255) NOT NULL);",
//! )
//! .unwrap();
//!
//! let delta = diff(&current, &desired).unwrap();
//! let migration = synthesize(&delta, &PostgresDialect::new()).unwrap();
//!
//! assert!(migration.up_script().starts_with("CREATE TABLE users ("));
//! assert_eq!(migration.down_script(), "DROP TABLE users;\n");
//! ```

pub mod diff;
pub mod expr;
pub mod introspect;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod replay;
pub mod state;
pub mod synth;

pub use diff::{diff, ChangeOp, DiffError, SchemaDelta};
pub use model::Schema;
pub use synth::{synthesize, Dialect};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::diff::{diff, Change, ChangeOp, DiffError, SchemaDelta, Warning};
    pub use crate::introspect::{
        fold_catalog, ColumnRecord, ConstraintRecord, IndexRecord, IntrospectionError,
    };
    pub use crate::model::{
        Column, Constraint, ConstraintKind, DataType, ForeignKey, Identity, Index, ModelError,
        ReferentialAction, Schema, Table,
    };
    pub use crate::parser::{parse_schema, parse_statements, ParseError};
    pub use crate::replay::{replay, ReplayError};
    pub use crate::state::SchemaState;
    pub use crate::synth::{
        render_script, synthesize, Dialect, Migration, PostgresDialect, UnsupportedChange,
    };
}
