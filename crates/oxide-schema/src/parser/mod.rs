//! DDL parser.
//!
//! A hand-written recursive descent parser for the PostgreSQL DDL subset a
//! desired-state schema file may use, plus the statements the synthesizer
//! emits so that generated migrations can be replayed.

pub mod ast;
mod error;
#[allow(clippy::module_inception)]
mod parser;

pub use error::ParseError;
pub use parser::Parser;

use ast::{AlterAction, Statement, TableConstraint};

use crate::lexer::Span;
use crate::model::{ModelError, Schema};
use crate::state;

/// Parses every statement in `source`.
///
/// # Errors
///
/// Returns the first syntax error.
pub fn parse_statements(source: &str) -> Result<Vec<Statement>, ParseError> {
    Parser::new(source).parse_statements()
}

/// Parses a desired-state schema file into a [`Schema`].
///
/// Statement order does not matter: tables are built first, then key
/// constraints declared with `ALTER TABLE ... ADD`, then indexes, then every
/// foreign key, so forward and cyclic references resolve.
///
/// # Errors
///
/// Returns a [`ParseError`] for syntax errors, for statements that have no
/// place in a declaration (`DROP`, column alterations), and for model
/// invariant violations, positioned at the offending statement.
pub fn parse_schema(source: &str) -> Result<Schema, ParseError> {
    let statements = parse_statements(source)?;

    let mut schema = Schema::new();
    let mut constraints: Vec<(&str, &TableConstraint)> = Vec::new();
    let mut indexes = Vec::new();

    for statement in &statements {
        match statement {
            Statement::CreateTable(create) => {
                let created = state::create_table(&mut schema, create)
                    .map_err(model_error(source, create.span))?;
                if created {
                    constraints.extend(
                        create
                            .constraints
                            .iter()
                            .filter(|c| c.is_foreign_key())
                            .map(|c| (create.name.as_str(), c)),
                    );
                }
            }
            Statement::CreateIndex(index) => indexes.push(index),
            Statement::AlterTable(alter) => {
                for action in &alter.actions {
                    let AlterAction::AddConstraint(constraint) = action else {
                        return Err(ParseError::at(
                            source,
                            alter.span,
                            "only ALTER TABLE ... ADD CONSTRAINT is allowed in a desired-state schema",
                        ));
                    };
                    constraints.push((alter.table.as_str(), constraint));
                }
            }
            Statement::DropTable(drop) => {
                return Err(ParseError::at(
                    source,
                    drop.span,
                    "DROP TABLE is not allowed in a desired-state schema",
                ));
            }
            Statement::DropIndex(drop) => {
                return Err(ParseError::at(
                    source,
                    drop.span,
                    "DROP INDEX is not allowed in a desired-state schema",
                ));
            }
            Statement::Transaction(_) => {}
        }
    }

    let (foreign_keys, keys): (Vec<_>, Vec<_>) = constraints
        .into_iter()
        .partition(|(_, constraint)| constraint.is_foreign_key());

    for (table, constraint) in keys {
        state::add_constraint(&mut schema, table, constraint)
            .map_err(model_error(source, constraint.span))?;
    }
    for index in indexes {
        state::add_index(&mut schema, index).map_err(model_error(source, index.span))?;
    }
    for (table, constraint) in foreign_keys {
        state::add_constraint(&mut schema, table, constraint)
            .map_err(model_error(source, constraint.span))?;
    }

    Ok(schema)
}

fn model_error(source: &str, span: Span) -> impl Fn(ModelError) -> ParseError + '_ {
    move |err| ParseError::at(source, span, err.to_string())
}
