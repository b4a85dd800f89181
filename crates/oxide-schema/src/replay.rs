//! Migration replay.
//!
//! Rebuilds the net schema of a migration directory without a database by
//! parsing each `up` script and applying it to an initially empty model.

use crate::model::{ModelError, Schema};
use crate::parser::{parse_statements, ParseError};
use crate::state::SchemaState;

/// Errors raised while replaying migration scripts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// A script could not be parsed.
    #[error("{file}: {source}")]
    Parse {
        /// Name of the script.
        file: String,
        /// The underlying parse error.
        source: ParseError,
    },

    /// A statement is invalid against the state built so far.
    #[error("{file}: line {line}, column {column}: {source}")]
    Apply {
        /// Name of the script.
        file: String,
        /// 1-based line of the failing statement.
        line: usize,
        /// 1-based column of the failing statement.
        column: usize,
        /// The underlying model error.
        source: ModelError,
    },
}

impl SchemaState {
    /// Parses `sql` and applies its statements in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Parse`] when the script does not parse and
    /// [`ReplayError::Apply`] at the first statement that cannot be applied.
    pub fn apply_script(&mut self, file: &str, sql: &str) -> Result<(), ReplayError> {
        let statements = parse_statements(sql).map_err(|source| ReplayError::Parse {
            file: file.to_string(),
            source,
        })?;
        for statement in &statements {
            self.apply(statement).map_err(|source| {
                let (line, column) = statement.span().line_column(sql);
                ReplayError::Apply {
                    file: file.to_string(),
                    line,
                    column,
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Replays scripts, given as `(name, sql)` pairs in version order, onto an
/// empty schema.
///
/// # Errors
///
/// Returns the first [`ReplayError`] encountered.
pub fn replay<I, N, S>(scripts: I) -> Result<Schema, ReplayError>
where
    I: IntoIterator<Item = (N, S)>,
    N: AsRef<str>,
    S: AsRef<str>,
{
    let mut state = SchemaState::new();
    for (name, sql) in scripts {
        state.apply_script(name.as_ref(), sql.as_ref())?;
    }
    Ok(state.into_schema())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DataType;

    #[test]
    fn test_replay_in_order() {
        let schema = replay([
            ("1_create_users.up.sql", "CREATE TABLE users (id integer PRIMARY KEY);"),
            (
                "2_add_email.up.sql",
                "ALTER TABLE users ADD COLUMN email text NOT NULL;\n\n\
                 CREATE UNIQUE INDEX users_email_idx ON users (email);",
            ),
        ])
        .unwrap();

        let users = schema.table("users").unwrap();
        assert_eq!(users.column("email").unwrap().data_type, DataType::Text);
        assert!(users.index("users_email_idx").unwrap().unique);
    }

    #[test]
    fn test_transaction_wrappers_are_ignored() {
        let schema = replay([(
            "1_init.up.sql",
            "BEGIN;\nCREATE TABLE t (id integer);\nCOMMIT;",
        )])
        .unwrap();
        assert!(schema.table("t").is_some());
    }

    #[test]
    fn test_apply_error_reports_file_and_line() {
        let err = replay([
            ("1_create.up.sql", "CREATE TABLE t (id integer);"),
            ("2_broken.up.sql", "-- adds a column\n\nALTER TABLE missing ADD COLUMN x text;"),
        ])
        .unwrap_err();

        match err {
            ReplayError::Apply {
                file, line, column, ..
            } => {
                assert_eq!(file, "2_broken.up.sql");
                assert_eq!((line, column), (3, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = replay([("1_data.up.sql", "INSERT INTO t VALUES (1);")]).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { ref file, .. } if file == "1_data.up.sql"));
        assert!(err.to_string().starts_with("1_data.up.sql: line 1, column 1:"));
    }

    #[test]
    fn test_replay_of_nothing_is_empty() {
        let schema = replay(Vec::<(String, String)>::new()).unwrap();
        assert!(schema.is_empty());
    }
}
