//! Options for a generation run.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

/// Image used for the sandbox database.
pub const DEFAULT_IMAGE: &str = "postgres:16-bookworm";

/// Per-attempt limit for external steps.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where the current schema is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CurrentSource {
    /// Parse and apply the existing `up` files in memory.
    #[default]
    Replay,
    /// Apply the existing `up` files to a disposable PostgreSQL container
    /// and read its catalog.
    Sandbox,
}

/// Everything a generation run needs, independent of the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Desired-state schema file.
    pub input: PathBuf,
    /// Directory holding the `<version>_<slug>.{up,down}.sql` files.
    pub output_dir: PathBuf,
    /// Fail when the migrations do not reach the desired schema.
    pub check: bool,
    /// Print the statements instead of writing files.
    pub dry_run: bool,
    /// Slug for the new files; derived from the changes when absent.
    pub name: Option<String>,
    pub current: CurrentSource,
    /// Sandbox image.
    pub image: String,
    /// Limit for each external step.
    pub timeout: Duration,
    /// Print the delta as JSON.
    pub json: bool,
}

impl GenerateOptions {
    /// Creates options with defaults for everything but the paths.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            check: false,
            dry_run: false,
            name: None,
            current: CurrentSource::default(),
            image: DEFAULT_IMAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            json: false,
        }
    }

    /// Enables check mode.
    #[must_use]
    pub const fn check(mut self, enabled: bool) -> Self {
        self.check = enabled;
        self
    }

    /// Enables dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Sets the slug of the generated files.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Selects the current-state source.
    #[must_use]
    pub const fn current(mut self, current: CurrentSource) -> Self {
        self.current = current;
        self
    }
}
