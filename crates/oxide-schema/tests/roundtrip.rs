//! Round-trip tests: forward scripts reach the desired schema and reverse
//! scripts restore the starting one.

mod common;
use common::*;

use oxide_schema::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

const V1: &str = "
CREATE TABLE users (
    id integer PRIMARY KEY,
    email varchar(100),
    legacy text,
    score integer DEFAULT 0
);

CREATE TABLE sessions (
    id integer PRIMARY KEY,
    user_id integer REFERENCES users (id)
);

CREATE INDEX users_legacy_idx ON users (legacy);
";

const V2: &str = "
CREATE TABLE users (
    id bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    email text NOT NULL,
    score integer NOT NULL DEFAULT 0 CHECK (score >= 0),
    created_at timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE posts (
    id bigint GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
    author_id bigint NOT NULL REFERENCES users ON DELETE CASCADE,
    title text NOT NULL,
    body text
);

CREATE INDEX posts_author_id_idx ON posts (author_id);
CREATE UNIQUE INDEX users_email_idx ON users (email);
";

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn forward_then_reverse_restores_start() {
    let v1 = schema(V1);
    let v2 = schema(V2);
    let migration = plan(&v1, &v2);

    let upgraded = apply(&v1, &migration.up_script());
    assert_equivalent(&upgraded, &v2);

    let downgraded = apply(&upgraded, &migration.down_script());
    assert_equivalent(&downgraded, &v1);
}

#[test]
fn reverse_direction_round_trips_too() {
    let v1 = schema(V1);
    let v2 = schema(V2);
    let migration = plan(&v2, &v1);

    let downgraded = apply(&v2, &migration.up_script());
    assert_equivalent(&downgraded, &v1);
    assert_equivalent(&apply(&downgraded, &migration.down_script()), &v2);
}

#[test]
fn from_empty_database() {
    let v2 = schema(V2);
    let migration = plan(&Schema::new(), &v2);

    let created = replay([("1_init.up.sql", migration.up_script())]).unwrap();
    assert_equivalent(&created, &v2);

    let dropped = apply(&created, &migration.down_script());
    assert!(dropped.is_empty());
}

#[test]
fn chained_migrations_replay_to_latest() {
    let v1 = schema(V1);
    let v2 = schema(V2);
    let first = plan(&Schema::new(), &v1);
    let second = plan(&v1, &v2);

    let net = replay([
        ("20240101000000_init.up.sql", first.up_script()),
        ("20240102000000_evolve.up.sql", second.up_script()),
    ])
    .unwrap();
    assert_equivalent(&net, &v2);
    assert!(plan(&net, &v2).is_empty());
}

#[test]
fn quoted_identifiers_survive_replay() {
    let desired = schema(
        r#"CREATE TABLE "Accounts" ("Id" integer PRIMARY KEY, "order" text, "select" text);
           CREATE INDEX "Accounts_order_idx" ON "Accounts" ("order");"#,
    );
    let migration = plan(&Schema::new(), &desired);
    assert!(migration.up_script().contains(r#"CREATE TABLE "Accounts" ("#));

    let replayed = apply(&Schema::new(), &migration.up_script());
    assert_equivalent(&replayed, &desired);
}

#[test]
fn cyclic_foreign_keys_round_trip() {
    let desired = schema(
        "CREATE TABLE a (id integer PRIMARY KEY, b_id integer);
         CREATE TABLE b (id integer PRIMARY KEY, a_id integer REFERENCES a);
         ALTER TABLE a ADD CONSTRAINT a_b_id_fkey FOREIGN KEY (b_id) REFERENCES b (id);",
    );
    let migration = plan(&Schema::new(), &desired);

    let created = apply(&Schema::new(), &migration.up_script());
    assert_equivalent(&created, &desired);
    assert!(apply(&created, &migration.down_script()).is_empty());
}

#[test]
fn redundant_duplicate_index_is_dropped() {
    let current = schema(
        "CREATE TABLE t (a integer, b integer);
         CREATE INDEX i1 ON t (a);
         CREATE INDEX i2 ON t (a);",
    );
    let desired = schema("CREATE TABLE t (a integer, b integer); CREATE INDEX i1 ON t (a);");
    let migration = plan(&current, &desired);
    assert_eq!(statements(&migration.forward), vec!["DROP INDEX i2"]);

    let upgraded = apply(&current, &migration.up_script());
    assert_eq!(upgraded.table("t").unwrap().indexes.len(), 1);
    assert_equivalent(&upgraded, &desired);
    assert_equivalent(&apply(&upgraded, &migration.down_script()), &current);
}

#[test]
fn index_name_moved_to_new_definition() {
    let current = schema("CREATE TABLE t (x integer, y integer); CREATE INDEX a_idx ON t (x);");
    let desired = schema(
        "CREATE TABLE t (x integer, y integer);
         CREATE INDEX b_idx ON t (x);
         CREATE INDEX a_idx ON t (y);",
    );
    let migration = plan(&current, &desired);

    let upgraded = apply(&current, &migration.up_script());
    assert_equivalent(&upgraded, &desired);
    assert_eq!(upgraded.table("t").unwrap().index("a_idx").unwrap().columns, vec!["y"]);
    assert_equivalent(&apply(&upgraded, &migration.down_script()), &current);
}

#[test]
fn index_name_moved_to_another_table() {
    let current = schema(
        "CREATE TABLE t (x integer);
         CREATE TABLE u (y integer);
         CREATE INDEX a_idx ON t (x);",
    );
    let desired = schema(
        "CREATE TABLE t (x integer);
         CREATE TABLE u (y integer);
         CREATE INDEX b_idx ON t (x);
         CREATE INDEX a_idx ON u (y);",
    );
    let migration = plan(&current, &desired);

    let upgraded = apply(&current, &migration.up_script());
    assert_equivalent(&upgraded, &desired);
    assert_equivalent(&apply(&upgraded, &migration.down_script()), &current);
}

#[test]
fn check_name_moved_to_new_definition() {
    let current = schema("CREATE TABLE t (x integer, y integer, CONSTRAINT c CHECK (x > 0));");
    let desired = schema(
        "CREATE TABLE t (
             x integer,
             y integer,
             CONSTRAINT d CHECK (x > 0),
             CONSTRAINT c CHECK (y > 0)
         );",
    );
    let migration = plan(&current, &desired);
    assert_eq!(
        statements(&migration.forward),
        vec![
            "ALTER TABLE t DROP CONSTRAINT c",
            "ALTER TABLE t ADD CONSTRAINT c CHECK (y > 0)",
            "ALTER TABLE t ADD CONSTRAINT d CHECK (x > 0)",
        ]
    );

    let upgraded = apply(&current, &migration.up_script());
    assert_equivalent(&upgraded, &desired);
    assert_equivalent(&apply(&upgraded, &migration.down_script()), &current);
}

// =============================================================================
// Ordering safety
// =============================================================================

#[test]
fn table_creation_precedes_foreign_key() {
    let v2 = schema(V2);
    let migration = plan(&Schema::new(), &v2);
    let forward = statements(&migration.forward);

    let create_users = forward
        .iter()
        .position(|s| s.starts_with("CREATE TABLE users"))
        .unwrap();
    let add_fk = forward
        .iter()
        .position(|s| s.contains("FOREIGN KEY (author_id) REFERENCES users"))
        .unwrap();
    assert!(create_users < add_fk);
}

#[test]
fn constraint_drop_precedes_table_drop_in_reverse() {
    let v2 = schema(V2);
    let migration = plan(&Schema::new(), &v2);
    let reverse = statements(&migration.reverse);

    let drop_fk = reverse
        .iter()
        .position(|s| *s == "ALTER TABLE posts DROP CONSTRAINT posts_author_id_fkey")
        .unwrap();
    let drop_users = reverse.iter().position(|s| *s == "DROP TABLE users").unwrap();
    assert!(drop_fk < drop_users);
}

#[test]
fn identity_is_removed_before_default_is_set() {
    let current = schema("CREATE TABLE t (id integer GENERATED ALWAYS AS IDENTITY);");
    let desired = schema("CREATE TABLE t (id integer DEFAULT 0);");
    let migration = plan(&current, &desired);

    assert_eq!(
        statements(&migration.forward),
        vec![
            "ALTER TABLE t ALTER COLUMN id DROP IDENTITY",
            "ALTER TABLE t ALTER COLUMN id DROP NOT NULL",
            "ALTER TABLE t ALTER COLUMN id SET DEFAULT 0",
        ]
    );
    assert_equivalent(&apply(&current, &migration.up_script()), &desired);
    assert_equivalent(
        &apply(&desired, &migration.down_script()),
        &current,
    );
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn output_is_byte_identical_across_runs() {
    let v1 = schema(V1);
    let v2 = schema(V2);
    let first = plan(&v1, &v2);
    let second = plan(&v1, &v2);
    assert_eq!(first.up_script(), second.up_script());
    assert_eq!(first.down_script(), second.down_script());
}

#[test]
fn statement_order_in_source_does_not_matter() {
    let shuffled = schema(
        "CREATE UNIQUE INDEX users_email_idx ON users (email);
         CREATE INDEX posts_author_id_idx ON posts (author_id);
         CREATE TABLE posts (
             id bigint GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
             author_id bigint NOT NULL REFERENCES users ON DELETE CASCADE,
             title text NOT NULL,
             body text
         );
         CREATE TABLE users (
             id bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
             email text NOT NULL,
             score integer NOT NULL DEFAULT 0 CHECK (score >= 0),
             created_at timestamptz NOT NULL DEFAULT now()
         );",
    );
    let v1 = schema(V1);
    assert_eq!(
        plan(&v1, &schema(V2)).up_script(),
        plan(&v1, &shuffled).up_script()
    );
}
