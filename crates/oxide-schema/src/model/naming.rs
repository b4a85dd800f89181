//! Default names for constraints and indexes, following PostgreSQL's
//! `{table}_{columns}_{suffix}` convention.

use std::collections::BTreeSet;

/// Builds a name from `table`, `columns` and `suffix`, appending a counter
/// when the result is already in `taken`.
#[must_use]
pub fn default_name(table: &str, columns: &[String], suffix: &str, taken: &BTreeSet<String>) -> String {
    let mut base = table.to_string();
    for column in columns {
        base.push('_');
        base.push_str(column);
    }
    base.push('_');
    base.push_str(suffix);

    let mut candidate = base.clone();
    let mut counter = 0u32;
    while taken.contains(&candidate) {
        counter += 1;
        candidate = format!("{base}{counter}");
    }
    candidate
}
