//! oxide-schemagen CLI
//!
//! Command-line tool for generating migrations from a schema file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schemagen::config::{DEFAULT_IMAGE, DEFAULT_TIMEOUT_SECS};
use oxide_schemagen::prelude::*;

/// Reversible PostgreSQL migrations from a declarative schema.
#[derive(Parser)]
#[command(name = "oxide-schemagen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a migration pair for the changes between the existing
    /// migrations and the schema file.
    Generate {
        /// Desired-state schema file.
        #[arg(short, long, env = "SCHEMAGEN_INPUT")]
        input: PathBuf,

        /// Migrations directory.
        #[arg(short, long, env = "SCHEMAGEN_OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Fail if the migrations do not reach the schema file.
        #[arg(long, conflicts_with = "dry_run")]
        check: bool,

        /// Show SQL without writing files (dry run).
        #[arg(long)]
        dry_run: bool,

        /// Migration name/description.
        #[arg(short, long)]
        name: Option<String>,

        /// How to recover the current schema.
        #[arg(long, env = "SCHEMAGEN_CURRENT", value_enum, default_value_t = CurrentSource::Replay)]
        current: CurrentSource,

        /// Docker image for `--current sandbox`.
        #[arg(long, env = "SCHEMAGEN_IMAGE", default_value = DEFAULT_IMAGE)]
        image: String,

        /// Limit in seconds for each external step.
        #[arg(long, env = "SCHEMAGEN_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn into_options(self) -> GenerateOptions {
        let Self::Generate {
            input,
            output_dir,
            check,
            dry_run,
            name,
            current,
            image,
            timeout_secs,
            json,
        } = self;
        GenerateOptions {
            input,
            output_dir,
            check,
            dry_run,
            name,
            current,
            image,
            timeout: Duration::from_secs(timeout_secs),
            json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = cli.command.into_options();
    let mut backends = Backends::docker(&options);
    let outcome = generate(&options, &mut backends).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
        return Ok(());
    }

    match outcome {
        Outcome::UpToDate => {
            if options.check {
                info!("Migrations are up to date.");
            } else {
                info!("No changes detected.");
            }
        }
        Outcome::Planned { migration, .. } => {
            println!("-- up");
            print!("{}", migration.up_script());
            println!("\n-- down");
            print!("{}", migration.down_script());
        }
        Outcome::Written { files, .. } => {
            info!("Created migration: {}", files.up.display());
            info!("Created migration: {}", files.down.display());
        }
    }

    Ok(())
}

fn outcome_json(outcome: &Outcome) -> serde_json::Value {
    match outcome {
        Outcome::UpToDate => json!({ "status": "up_to_date" }),
        Outcome::Planned { delta, migration } => json!({
            "status": "planned",
            "delta": delta,
            "up": migration.up_script(),
            "down": migration.down_script(),
        }),
        Outcome::Written {
            delta,
            migration,
            files,
        } => json!({
            "status": "written",
            "version": files.version,
            "files": [files.up.display().to_string(), files.down.display().to_string()],
            "delta": delta,
            "up": migration.up_script(),
            "down": migration.down_script(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_and_output_dir_are_required() {
        if std::env::var_os("SCHEMAGEN_INPUT").is_some()
            || std::env::var_os("SCHEMAGEN_OUTPUT_DIR").is_some()
        {
            return;
        }
        assert!(Cli::try_parse_from(["oxide-schemagen", "generate"]).is_err());
        assert!(Cli::try_parse_from(["oxide-schemagen", "generate", "--input", "a.sql"]).is_err());
    }

    #[test]
    fn test_generate_options_from_flags() {
        let cli = Cli::try_parse_from([
            "oxide-schemagen",
            "generate",
            "--input",
            "a.sql",
            "--output-dir",
            "m",
            "--dry-run",
        ])
        .unwrap();
        let options = cli.command.into_options();
        assert_eq!(options.input, PathBuf::from("a.sql"));
        assert_eq!(options.output_dir, PathBuf::from("m"));
        assert!(options.dry_run);
        assert!(!options.check);
    }
}
