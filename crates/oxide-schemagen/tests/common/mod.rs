#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oxide_schema::introspect::{ColumnRecord, ConstraintRecord};
use oxide_schemagen::prelude::*;
use tempfile::TempDir;

/// A schema file and a migrations directory inside a temporary directory.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    pub fn input(&self) -> PathBuf {
        self.root.path().join("schema.sql")
    }

    pub fn migrations(&self) -> PathBuf {
        self.root.path().join("migrations")
    }

    pub fn write_schema(&self, sql: &str) {
        fs::write(self.input(), sql).unwrap();
    }

    pub fn write_migration(&self, file_name: &str, sql: &str) {
        fs::create_dir_all(self.migrations()).unwrap();
        fs::write(self.migrations().join(file_name), sql).unwrap();
    }

    pub fn options(&self) -> GenerateOptions {
        GenerateOptions::new(self.input(), self.migrations())
    }

    /// Sorted file names in the migrations directory.
    pub fn files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.migrations()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn read(&self, file_name: &str) -> String {
        fs::read_to_string(self.migrations().join(file_name)).unwrap()
    }
}

/// Call counters shared with the fakes after they are boxed.
#[derive(Default)]
pub struct Calls {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub applied: AtomicUsize,
    pub described: AtomicUsize,
    pub applied_dirs: Mutex<Vec<PathBuf>>,
}

impl Calls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeSandbox {
    calls: Arc<Calls>,
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn acquire(&mut self) -> Result<ConnectionInfo> {
        self.calls.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionInfo {
            host: "127.0.0.1".to_string(),
            port: 55432,
            user: "postgres".to_string(),
            password: "schemagen".to_string(),
            database: "postgres".to_string(),
        })
    }

    async fn release(&mut self) -> Result<()> {
        self.calls.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeApplier {
    calls: Arc<Calls>,
}

#[async_trait]
impl MigrationApplier for FakeApplier {
    async fn apply_all(&self, dir: &Path, _conn: &ConnectionInfo) -> Result<Applied> {
        self.calls.applied.fetch_add(1, Ordering::SeqCst);
        self.calls.applied_dirs.lock().unwrap().push(dir.to_path_buf());
        Ok(Applied {
            count: MigrationSet::scan(dir)?.pairs().len(),
        })
    }
}

/// Returns a fixed snapshot, or a transient error when `snapshot` is `None`.
pub struct FakeCatalog {
    calls: Arc<Calls>,
    snapshot: Option<CatalogSnapshot>,
}

#[async_trait]
impl CatalogIntrospector for FakeCatalog {
    async fn describe(&self, _conn: &ConnectionInfo) -> Result<CatalogSnapshot> {
        self.calls.described.fetch_add(1, Ordering::SeqCst);
        self.snapshot
            .clone()
            .ok_or_else(|| GenerateError::Introspection("connection reset".to_string()))
    }
}

pub fn fake_backends(snapshot: Option<CatalogSnapshot>) -> (Backends, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let backends = Backends {
        sandbox: Box::new(FakeSandbox {
            calls: Arc::clone(&calls),
        }),
        catalog: Box::new(FakeCatalog {
            calls: Arc::clone(&calls),
            snapshot,
        }),
        applier: Box::new(FakeApplier {
            calls: Arc::clone(&calls),
        }),
    };
    (backends, calls)
}

/// Backends for runs that stay on the replay path.
pub fn replay_backends() -> Backends {
    fake_backends(None).0
}

/// Catalog rows for `users (id integer PRIMARY KEY, email varchar(255) NOT NULL)`.
pub fn users_snapshot() -> CatalogSnapshot {
    let column = |name: &str, data_type: &str, ordinal: u32| ColumnRecord {
        table_name: "users".to_string(),
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: "NO".to_string(),
        is_identity: "NO".to_string(),
        ordinal_position: ordinal,
        ..ColumnRecord::default()
    };
    let mut email = column("email", "character varying", 2);
    email.character_maximum_length = Some(255);

    CatalogSnapshot {
        columns: vec![column("id", "integer", 1), email],
        constraints: vec![ConstraintRecord {
            table_name: "users".to_string(),
            constraint_name: "users_pkey".to_string(),
            constraint_type: 'p',
            columns: vec!["id".to_string()],
            ..ConstraintRecord::default()
        }],
        indexes: Vec::new(),
    }
}
