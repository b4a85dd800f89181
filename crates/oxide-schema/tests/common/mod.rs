#![allow(dead_code)]

use oxide_schema::prelude::*;

pub fn schema(sql: &str) -> Schema {
    parse_schema(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"))
}

pub fn schema_err(sql: &str) -> ParseError {
    parse_schema(sql).expect_err(&format!("Expected parse error for: {sql}"))
}

pub fn plan(current: &Schema, desired: &Schema) -> Migration {
    let delta = diff(current, desired).unwrap_or_else(|e| panic!("Diff failed: {e}"));
    synthesize(&delta, &PostgresDialect::new()).unwrap_or_else(|e| panic!("Synthesis failed: {e}"))
}

/// Applies a rendered script on top of `start`, the way replay would.
pub fn apply(start: &Schema, script: &str) -> Schema {
    let mut state = SchemaState::from_schema(start.clone());
    state
        .apply_script("script.sql", script)
        .unwrap_or_else(|e| panic!("Failed to apply:\n{script}\nError: {e}"));
    state.into_schema()
}

/// Compares two models directly. Tables and columns must match exactly
/// (column order aside); constraints and indexes must match one for one by
/// definition, since their names carry no structure.
pub fn assert_equivalent(actual: &Schema, expected: &Schema) {
    let names = |s: &Schema| s.tables.keys().cloned().collect::<Vec<_>>();
    assert_eq!(names(actual), names(expected), "Table sets differ");

    for (name, want) in &expected.tables {
        let got = &actual.tables[name];
        assert_eq!(sorted_columns(got), sorted_columns(want), "Columns of '{name}' differ");
        assert_same_objects(name, "constraint", &got.constraints, &want.constraints, Constraint::same_definition);
        assert_same_objects(name, "index", &got.indexes, &want.indexes, Index::same_definition);
    }
}

fn sorted_columns(table: &Table) -> Vec<Column> {
    let mut columns = table.columns.clone();
    columns.sort_by(|a, b| a.name.cmp(&b.name));
    columns
}

fn assert_same_objects<T: std::fmt::Debug>(
    table: &str,
    kind: &str,
    actual: &[T],
    expected: &[T],
    same: impl Fn(&T, &T) -> bool,
) {
    let mut unmatched: Vec<&T> = actual.iter().collect();
    for want in expected {
        let Some(position) = unmatched.iter().position(|got| same(got, want)) else {
            panic!("Missing {kind} on '{table}': {want:?}\nHave: {unmatched:?}");
        };
        unmatched.remove(position);
    }
    assert!(unmatched.is_empty(), "Unexpected {kind}s on '{table}': {unmatched:?}");
}

pub fn statements(statements: &[oxide_schema::synth::Statement]) -> Vec<&str> {
    statements.iter().map(|s| s.sql.as_str()).collect()
}
