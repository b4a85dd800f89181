//! Canonical schema model.
//!
//! Both the DDL parser and the catalog adapter produce a [`Schema`]; the
//! differ only ever compares two values of this type.

mod error;
pub mod ident;
pub mod naming;
mod schema;
mod types;

pub use error::ModelError;
pub use schema::{
    Column, Constraint, ConstraintKind, ForeignKey, Identity, Index, ReferentialAction, Schema,
    Table,
};
pub use types::DataType;
