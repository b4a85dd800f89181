//! Folding PostgreSQL catalog rows into the schema model.
//!
//! The records mirror what `information_schema.columns`, `pg_constraint`
//! and `pg_index` report, with vendor spellings left untouched. All
//! normalization happens here so that a live database and a schema file
//! produce comparable models.

use std::collections::BTreeMap;

use crate::expr::normalize_expression;
use crate::model::{
    Column, Constraint, ConstraintKind, DataType, ForeignKey, Identity, Index, ModelError,
    ReferentialAction, Schema, Table,
};
use crate::parser::ParseError;

/// One row of `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRecord {
    pub table_name: String,
    pub column_name: String,
    /// e.g. `integer`, `character varying`, `USER-DEFINED`, `ARRAY`.
    pub data_type: String,
    /// Underlying type name, used for `USER-DEFINED` types.
    pub udt_name: String,
    /// `YES` or `NO`.
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<u32>,
    pub numeric_precision: Option<u32>,
    pub numeric_scale: Option<u32>,
    /// `YES` or `NO`.
    pub is_identity: String,
    /// `ALWAYS` or `BY DEFAULT` for identity columns.
    pub identity_generation: Option<String>,
    pub ordinal_position: u32,
}

/// One constraint from `pg_constraint`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstraintRecord {
    pub table_name: String,
    pub constraint_name: String,
    /// `p`, `u`, `f` or `c`.
    pub constraint_type: char,
    /// Constrained columns in key order.
    pub columns: Vec<String>,
    pub foreign_table: Option<String>,
    pub foreign_columns: Vec<String>,
    /// Action codes `a`, `r`, `c`, `n`, `d`.
    pub on_delete: Option<char>,
    pub on_update: Option<char>,
    /// `pg_get_constraintdef` output, used for check constraints.
    pub definition: Option<String>,
}

/// One index from `pg_index` that does not back a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexRecord {
    pub table_name: String,
    pub index_name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Errors raised while folding catalog records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntrospectionError {
    /// The column type has no counterpart in the model.
    #[error("column '{table}.{column}' has unsupported type: {reason}")]
    UnsupportedType {
        /// Owning table.
        table: String,
        /// Column name.
        column: String,
        /// Why the type was rejected.
        reason: String,
    },

    /// A default or check expression could not be tokenized.
    #[error("cannot normalize expression of '{table}.{name}': {source}")]
    InvalidExpression {
        /// Owning table.
        table: String,
        /// Column or constraint name.
        name: String,
        /// Underlying lexer error.
        source: ParseError,
    },

    /// A constraint type code other than `p`, `u`, `f` or `c`.
    #[error("constraint '{name}' on '{table}' has unsupported type '{code}'")]
    UnsupportedConstraint {
        /// Owning table.
        table: String,
        /// Constraint name.
        name: String,
        /// Catalog type code.
        code: char,
    },

    /// A foreign key row lacks its target or uses an unknown action code.
    #[error("foreign key '{name}' on '{table}' is malformed: {reason}")]
    MalformedForeignKey {
        /// Owning table.
        table: String,
        /// Constraint name.
        name: String,
        /// What is missing or wrong.
        reason: String,
    },

    /// The folded schema violates a model invariant.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Folds catalog records into a [`Schema`].
///
/// Columns are grouped by table and ordered by ordinal position. Empty
/// constraint or index lists simply leave those parts of the model empty.
///
/// # Errors
///
/// Returns an [`IntrospectionError`] for unsupported types, malformed
/// constraint rows, or a result that violates a model invariant.
pub fn fold_catalog(
    columns: &[ColumnRecord],
    constraints: &[ConstraintRecord],
    indexes: &[IndexRecord],
) -> Result<Schema, IntrospectionError> {
    let mut grouped: BTreeMap<&str, Vec<&ColumnRecord>> = BTreeMap::new();
    for record in columns {
        grouped.entry(&record.table_name).or_default().push(record);
    }

    let mut schema = Schema::new();
    for (name, mut records) in grouped {
        records.sort_by_key(|r| r.ordinal_position);
        let mut table = Table::new(name);
        for record in records {
            table.columns.push(fold_column(record)?);
        }
        schema.add_table(table)?;
    }

    let mut constraints: Vec<&ConstraintRecord> = constraints.iter().collect();
    constraints.sort_by(|a, b| {
        (&a.table_name, &a.constraint_name).cmp(&(&b.table_name, &b.constraint_name))
    });
    for record in constraints {
        let constraint = fold_constraint(record)?;
        owner(&mut schema, &record.table_name)?.add_constraint(constraint);
    }

    let mut indexes: Vec<&IndexRecord> = indexes.iter().collect();
    indexes.sort_by(|a, b| (&a.table_name, &a.index_name).cmp(&(&b.table_name, &b.index_name)));
    for record in indexes {
        owner(&mut schema, &record.table_name)?.indexes.push(Index {
            name: record.index_name.clone(),
            columns: record.columns.clone(),
            unique: record.unique,
        });
    }

    schema.validate()?;
    Ok(schema)
}

fn owner<'s>(schema: &'s mut Schema, table: &str) -> Result<&'s mut Table, ModelError> {
    schema
        .table_mut(table)
        .ok_or_else(|| ModelError::UnknownTable(table.to_string()))
}

fn fold_column(record: &ColumnRecord) -> Result<Column, IntrospectionError> {
    let unsupported = |reason: String| IntrospectionError::UnsupportedType {
        table: record.table_name.clone(),
        column: record.column_name.clone(),
        reason,
    };

    let data_type = match record.data_type.as_str() {
        "USER-DEFINED" => DataType::Custom {
            name: record.udt_name.clone(),
        },
        "ARRAY" => return Err(unsupported("array types are not supported".to_string())),
        reported => {
            let name = reported.to_lowercase();
            // Precision is reported for every numeric type; only `numeric`
            // and character types carry it in their declaration.
            let modifiers = match name.as_str() {
                "character varying" | "character" => {
                    record.character_maximum_length.into_iter().collect()
                }
                "numeric" => match (record.numeric_precision, record.numeric_scale) {
                    (Some(precision), Some(scale)) => vec![precision, scale],
                    (Some(precision), None) => vec![precision],
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            DataType::resolve(&name, &modifiers).map_err(unsupported)?
        }
    };

    let default = record
        .column_default
        .as_deref()
        .map(normalize_expression)
        .transpose()
        .map_err(|source| IntrospectionError::InvalidExpression {
            table: record.table_name.clone(),
            name: record.column_name.clone(),
            source,
        })?
        .filter(|d| *d != "NULL");

    let identity = if record.is_identity.eq_ignore_ascii_case("yes") {
        match record.identity_generation.as_deref() {
            Some(g) if g.eq_ignore_ascii_case("always") => Identity::Always,
            _ => Identity::ByDefault,
        }
    } else {
        Identity::None
    };

    Ok(Column {
        name: record.column_name.clone(),
        data_type,
        nullable: !record.is_nullable.eq_ignore_ascii_case("no"),
        default,
        identity,
    })
}

fn fold_constraint(record: &ConstraintRecord) -> Result<Constraint, IntrospectionError> {
    let kind = match record.constraint_type {
        'p' => ConstraintKind::PrimaryKey {
            columns: record.columns.clone(),
        },
        'u' => ConstraintKind::Unique {
            columns: record.columns.clone(),
        },
        'f' => ConstraintKind::ForeignKey(fold_foreign_key(record)?),
        'c' => ConstraintKind::Check {
            expression: check_expression(record)?,
        },
        code => {
            return Err(IntrospectionError::UnsupportedConstraint {
                table: record.table_name.clone(),
                name: record.constraint_name.clone(),
                code,
            })
        }
    };
    Ok(Constraint {
        name: record.constraint_name.clone(),
        kind,
    })
}

fn fold_foreign_key(record: &ConstraintRecord) -> Result<ForeignKey, IntrospectionError> {
    let malformed = |reason: String| IntrospectionError::MalformedForeignKey {
        table: record.table_name.clone(),
        name: record.constraint_name.clone(),
        reason,
    };
    let action = |code: Option<char>| match code {
        None => Ok(ReferentialAction::NoAction),
        Some(c) => ReferentialAction::from_catalog_code(c)
            .ok_or_else(|| malformed(format!("unknown action code '{c}'"))),
    };

    let ref_table = record
        .foreign_table
        .clone()
        .ok_or_else(|| malformed("missing referenced table".to_string()))?;
    Ok(ForeignKey {
        columns: record.columns.clone(),
        ref_table,
        ref_columns: record.foreign_columns.clone(),
        on_delete: action(record.on_delete)?,
        on_update: action(record.on_update)?,
    })
}

/// Extracts the expression from `CHECK ((expr)) [NOT VALID]`.
fn check_expression(record: &ConstraintRecord) -> Result<String, IntrospectionError> {
    let definition = record.definition.as_deref().unwrap_or_default().trim();
    let body = definition
        .strip_prefix("CHECK")
        .unwrap_or(definition)
        .trim_end_matches(" NOT VALID")
        .trim_end_matches(" NO INHERIT");
    normalize_expression(body).map_err(|source| IntrospectionError::InvalidExpression {
        table: record.table_name.clone(),
        name: record.constraint_name.clone(),
        source,
    })
}
