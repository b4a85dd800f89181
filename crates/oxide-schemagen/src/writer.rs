//! Writes migration file pairs.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use oxide_schema::diff::SchemaDelta;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::migrations::{Direction, MigrationFile};

/// Slug used when neither a name nor a change is available.
const FALLBACK_SLUG: &str = "migration";

/// Returns the version for a new migration: the UTC timestamp as
/// `YYYYMMDDHHMMSS`, or one past `latest` when the clock is not ahead of it.
#[must_use]
pub fn next_version(now: DateTime<Utc>, latest: Option<u64>) -> u64 {
    let stamp = now
        .format("%Y%m%d%H%M%S")
        .to_string()
        .parse::<u64>()
        .unwrap_or_default();
    match latest {
        Some(latest) if stamp <= latest => latest + 1,
        _ => stamp,
    }
}

/// Returns the file slug: the sanitized `name` if given, otherwise the
/// summary of the first change, with `_and_more` when there are several.
#[must_use]
pub fn migration_slug(name: Option<&str>, delta: &SchemaDelta) -> String {
    let raw = match name {
        Some(name) => name.to_string(),
        None => delta.ops().next().map_or_else(String::new, |op| {
            let summary = op.summary();
            if delta.len() > 1 {
                format!("{summary}_and_more")
            } else {
                summary
            }
        }),
    };
    let slug = sanitize_slug(&raw);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Lower-cases `raw`, maps every character outside `[a-z0-9_]` to `_`,
/// collapses runs of `_` and trims them from both ends.
#[must_use]
pub fn sanitize_slug(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if !(c == '_' && (slug.is_empty() || slug.ends_with('_'))) {
            slug.push(c);
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Paths of a written migration pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPair {
    pub version: u64,
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Writes migration pairs into a directory.
#[derive(Debug, Clone)]
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    /// Creates a writer for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes `<version>_<slug>.up.sql` and `<version>_<slug>.down.sql`.
    ///
    /// Both files are staged as temporary files in the target directory and
    /// only moved into place once both are fully written. If the second
    /// move fails the first file is removed again, so either both files
    /// exist afterwards or neither does.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`](crate::error::GenerateError::Io) when
    /// staging or persisting fails, including when a file with the same
    /// name already exists.
    pub fn write_pair(&self, version: u64, slug: &str, up: &str, down: &str) -> Result<WrittenPair> {
        fs::create_dir_all(&self.dir)?;

        let up_path = self.dir.join(MigrationFile::file_name(version, slug, Direction::Up));
        let down_path = self.dir.join(MigrationFile::file_name(version, slug, Direction::Down));

        let staged_up = self.stage(up)?;
        let staged_down = self.stage(down)?;
        debug!(dir = %self.dir.display(), "staged migration files");

        staged_up
            .persist_noclobber(&up_path)
            .map_err(|e| e.error)?;
        if let Err(e) = staged_down.persist_noclobber(&down_path) {
            roll_back(&up_path);
            return Err(e.error.into());
        }

        info!(version = %version, up = %up_path.display(), "wrote migration");
        Ok(WrittenPair {
            version,
            up: up_path,
            down: down_path,
        })
    }

    fn stage(&self, contents: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        Ok(file)
    }

    /// Returns the target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Removes a file written by an unfinished pair. Returns `false` and logs
/// when the file could not be removed.
fn roll_back(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to roll back migration file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use oxide_schema::diff::{Change, ChangeOp};
    use oxide_schema::model::{Column, DataType, Table};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn create(name: &str) -> Change {
        Change::new(ChangeOp::CreateTable {
            table: Table::new(name).with_column(Column::new("id", DataType::Integer)),
        })
    }

    #[test]
    fn test_next_version_from_clock() {
        assert_eq!(next_version(at(2024, 3, 9, 7, 5, 1), None), 20_240_309_070_501);
        assert_eq!(
            next_version(at(2024, 3, 9, 7, 5, 1), Some(20_240_101_000_000)),
            20_240_309_070_501
        );
    }

    #[test]
    fn test_next_version_bumps_past_latest() {
        let now = at(2024, 3, 9, 7, 5, 1);
        assert_eq!(next_version(now, Some(20_240_309_070_501)), 20_240_309_070_502);
        assert_eq!(next_version(now, Some(20_990_101_000_000)), 20_990_101_000_001);
    }

    #[test]
    fn test_slug_from_changes() {
        let one = SchemaDelta {
            changes: vec![create("users")],
        };
        assert_eq!(migration_slug(None, &one), "create_users");

        let many = SchemaDelta {
            changes: vec![create("users"), create("posts")],
        };
        assert_eq!(migration_slug(None, &many), "create_users_and_more");
        assert_eq!(migration_slug(None, &SchemaDelta::default()), "migration");
    }

    #[test]
    fn test_slug_from_name() {
        let delta = SchemaDelta::default();
        assert_eq!(migration_slug(Some("Add Users!"), &delta), "add_users");
        assert_eq!(migration_slug(Some("--"), &delta), "migration");
    }

    #[test]
    fn test_sanitize_slug() {
        assert_eq!(sanitize_slug("create_Order-Items"), "create_order_items");
        assert_eq!(sanitize_slug("  add  email  "), "add_email");
        assert_eq!(sanitize_slug("café"), "caf");
        assert_eq!(sanitize_slug("v2.1"), "v2_1");
    }

    #[test]
    fn test_write_pair() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path().join("migrations"));
        let written = writer
            .write_pair(20_240_101_000_000, "create_users", "CREATE TABLE users ();\n", "DROP TABLE users;\n")
            .unwrap();

        assert_eq!(
            written.up.file_name().unwrap(),
            "20240101000000_create_users.up.sql"
        );
        assert_eq!(fs::read_to_string(&written.up).unwrap(), "CREATE TABLE users ();\n");
        assert_eq!(fs::read_to_string(&written.down).unwrap(), "DROP TABLE users;\n");

        // Only the two migration files remain; no staged leftovers.
        assert_eq!(fs::read_dir(writer.dir()).unwrap().count(), 2);
    }

    #[test]
    fn test_write_pair_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MigrationWriter::new(dir.path());
        fs::write(dir.path().join("7_x.down.sql"), "existing").unwrap();

        assert!(writer.write_pair(7, "x", "up", "down").is_err());
        assert!(!dir.path().join("7_x.up.sql").exists());
        assert_eq!(fs::read_to_string(dir.path().join("7_x.down.sql")).unwrap(), "existing");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_roll_back_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("7_x.up.sql");
        fs::write(&path, "up").unwrap();

        assert!(roll_back(&path));
        assert!(!path.exists());
        // Already gone: the removal fails and is reported.
        assert!(!roll_back(&path));
    }
}
