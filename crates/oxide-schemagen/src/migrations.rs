//! Discovery of existing golang-migrate files.
//!
//! Files are named `<version>_<slug>.up.sql` / `<version>_<slug>.down.sql`.
//! Other files in the directory are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{GenerateError, Result};

static FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_(.+)\.(up|down)\.sql$").expect("Invalid migration file name regex")
});

/// Direction of a migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A parsed migration file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub version: u64,
    pub slug: String,
    pub direction: Direction,
}

impl MigrationFile {
    /// Parses a file name, returning `None` for files that are not
    /// migrations.
    #[must_use]
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = FILE_NAME.captures(file_name)?;
        let version = captures[1].parse().ok()?;
        let direction = if &captures[3] == "up" {
            Direction::Up
        } else {
            Direction::Down
        };
        Some(Self {
            version,
            slug: captures[2].to_string(),
            direction,
        })
    }

    /// Returns the file name for a version, slug and direction.
    #[must_use]
    pub fn file_name(version: u64, slug: &str, direction: Direction) -> String {
        let suffix = match direction {
            Direction::Up => "up",
            Direction::Down => "down",
        };
        format!("{version}_{slug}.{suffix}.sql")
    }
}

/// One version with its up file and optional down file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPair {
    pub version: u64,
    pub slug: String,
    pub up: PathBuf,
    pub down: Option<PathBuf>,
}

/// The migrations found in a directory, ordered by version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSet {
    pairs: Vec<MigrationPair>,
}

impl MigrationSet {
    /// Scans `dir`. A missing directory is an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::InvalidMigration`] when a version has two
    /// files for the same direction or a down file without an up file.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            debug!(dir = %dir.display(), "migrations directory does not exist yet");
            return Ok(Self::default());
        }

        let mut ups: BTreeMap<u64, (String, PathBuf)> = BTreeMap::new();
        let mut downs: BTreeMap<u64, PathBuf> = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(file) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(MigrationFile::parse)
            else {
                debug!(path = %path.display(), "skipping non-migration file");
                continue;
            };

            let duplicate = match file.direction {
                Direction::Up => ups.insert(file.version, (file.slug, path.clone())).is_some(),
                Direction::Down => downs.insert(file.version, path.clone()).is_some(),
            };
            if duplicate {
                return Err(GenerateError::InvalidMigration {
                    path,
                    reason: format!("duplicate version {}", file.version),
                });
            }
        }

        if let Some((version, path)) = downs.iter().find(|(v, _)| !ups.contains_key(*v)) {
            return Err(GenerateError::InvalidMigration {
                path: path.clone(),
                reason: format!("version {version} has no up file"),
            });
        }

        let pairs = ups
            .into_iter()
            .map(|(version, (slug, up))| MigrationPair {
                version,
                slug,
                up,
                down: downs.remove(&version),
            })
            .collect();
        Ok(Self { pairs })
    }

    /// Returns the pairs in version order.
    #[must_use]
    pub fn pairs(&self) -> &[MigrationPair] {
        &self.pairs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the newest version, if any.
    #[must_use]
    pub fn latest_version(&self) -> Option<u64> {
        self.pairs.last().map(|p| p.version)
    }

    /// Reads every up file in version order as `(file name, contents)`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Io`] when a file cannot be read.
    pub fn read_up_scripts(&self) -> Result<Vec<(String, String)>> {
        self.pairs
            .iter()
            .map(|pair| {
                let name = pair
                    .up
                    .file_name()
                    .map_or_else(|| pair.up.display().to_string(), |n| n.to_string_lossy().into_owned());
                Ok((name, fs::read_to_string(&pair.up)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_name() {
        let file = MigrationFile::parse("20240105120000_create_users.up.sql").unwrap();
        assert_eq!(file.version, 20_240_105_120_000);
        assert_eq!(file.slug, "create_users");
        assert_eq!(file.direction, Direction::Up);

        let file = MigrationFile::parse("1_init.down.sql").unwrap();
        assert_eq!(file.direction, Direction::Down);

        assert!(MigrationFile::parse("README.md").is_none());
        assert!(MigrationFile::parse("v1_init.up.sql").is_none());
        assert!(MigrationFile::parse("1_init.sql").is_none());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            MigrationFile::file_name(20_240_105_120_000, "create_users", Direction::Down),
            "20240105120000_create_users.down.sql"
        );
    }

    #[test]
    fn test_scan_orders_by_version() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "20240102000000_b.up.sql",
            "20240102000000_b.down.sql",
            "20240101000000_a.up.sql",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "").unwrap();
        }

        let set = MigrationSet::scan(dir.path()).unwrap();
        let versions: Vec<u64> = set.pairs().iter().map(|p| p.version).collect();
        assert_eq!(versions, vec![20_240_101_000_000, 20_240_102_000_000]);
        assert!(set.pairs()[0].down.is_none());
        assert!(set.pairs()[1].down.is_some());
        assert_eq!(set.latest_version(), Some(20_240_102_000_000));
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let set = MigrationSet::scan(&dir.path().join("missing")).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.latest_version(), None);
    }

    #[test]
    fn test_scan_rejects_orphan_down() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("3_x.down.sql"), "").unwrap();
        let err = MigrationSet::scan(dir.path()).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidMigration { .. }));
    }

    #[test]
    fn test_scan_rejects_duplicate_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("3_x.up.sql"), "").unwrap();
        fs::write(dir.path().join("3_y.up.sql"), "").unwrap();
        let err = MigrationSet::scan(dir.path()).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidMigration { .. }));
    }

    #[test]
    fn test_read_up_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2_b.up.sql"), "DROP TABLE a;").unwrap();
        fs::write(dir.path().join("1_a.up.sql"), "CREATE TABLE a (id integer);").unwrap();
        let scripts = MigrationSet::scan(dir.path()).unwrap().read_up_scripts().unwrap();
        assert_eq!(
            scripts,
            vec![
                ("1_a.up.sql".to_string(), "CREATE TABLE a (id integer);".to_string()),
                ("2_b.up.sql".to_string(), "DROP TABLE a;".to_string()),
            ]
        );
    }
}
