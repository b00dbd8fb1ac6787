//! # Agri Station Library
//!
//! Core library for the Agri Station command-line shell. Parses the command
//! line, loads configuration, opens the registry and runs one command.
//!
//! ## Module Organization
//! ```text
//! station/
//! ├── lib.rs          ◄─── You are here (CLI, tracing, dispatch)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   └── config.rs   ◄─── StationConfig (toml + env)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── farmer.rs   ◄─── Registry CRUD
//! │   ├── label.rs    ◄─── Label rendering and printing
//! │   └── scan.rs     ◄─── Scan sessions and verification
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Output
//! Results go to stdout (text, or JSON with `--json`); logs go to stderr so
//! scripts can pipe command output.

pub mod commands;
pub mod error;
pub mod state;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use agri_core::FarmerPatch;

use commands::{farmer, label, scan};
use error::{ApiError, ApiResult};
use state::{DbState, StationConfig};

// =============================================================================
// Command Line
// =============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "station",
    version,
    about = "Agri Station: farmer registry, QR identity labels and scan verification"
)]
pub struct Cli {
    /// Path to station.toml (default: platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides config and AGRI_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the suggested crops
    Crops,
    #[command(flatten)]
    Registry(RegistryCommand),
}

/// Commands that open the registry.
#[derive(Subcommand, Debug)]
pub enum RegistryCommand {
    /// Register a farmer
    Register {
        id: String,
        name: String,
        /// Assigned crop; repeat or comma-separate
        #[arg(short = 'c', long = "crop", value_delimiter = ',', required = true)]
        crops: Vec<String>,
    },
    /// List registered farmers
    List,
    /// Show one farmer
    Show { id: String },
    /// Change a farmer's name or crops
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        /// Replacement crop list; repeat or comma-separate
        #[arg(short = 'c', long = "crop", value_delimiter = ',')]
        crops: Vec<String>,
        /// Explicit timestamp (RFC 3339); defaults to now
        #[arg(long)]
        last_updated: Option<DateTime<Utc>>,
    },
    /// Delete a farmer
    Delete { id: String },
    /// Show a farmer's label, optionally writing the SVG card
    Label {
        id: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Write an SVG label card for every farmer
    Print {
        #[arg(short, long, default_value = "labels")]
        out_dir: PathBuf,
    },
    /// Read labels from the scanner and verify them against the registry
    Scan {
        /// Scanner device path, or "-" for stdin (overrides config)
        #[arg(long)]
        device: Option<String>,
        /// Stop after the first label
        #[arg(long)]
        once: bool,
    },
    /// Decode a label photo (PNG or JPEG) and verify it
    ScanImage { path: PathBuf },
}

// =============================================================================
// Entry Point
// =============================================================================

/// Parses the command line, runs the command and maps the outcome to an
/// exit code.
pub async fn run() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let out = Output { json: cli.json };

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Runs one parsed command.
pub async fn execute(cli: Cli) -> ApiResult<()> {
    let out = Output { json: cli.json };
    let config = StationConfig::load(cli.config.as_deref())?.with_database_path(cli.db);

    let command = match cli.command {
        Command::Crops => return out.many(&farmer::crop_options()),
        Command::Registry(command) => command,
    };

    let db = DbState::open(&config.database).await?;
    let result = dispatch(&db, &config, command, out).await;
    db.close().await;
    result
}

async fn dispatch(
    db: &DbState,
    config: &StationConfig,
    command: RegistryCommand,
    out: Output,
) -> ApiResult<()> {
    debug!(?command, "Dispatching command");

    match command {
        RegistryCommand::Register { id, name, crops } => {
            out.one(&farmer::register_farmer(db, &id, &name, crops).await?)
        }
        RegistryCommand::List => out.many(&farmer::list_farmers(db).await?),
        RegistryCommand::Show { id } => out.one(&farmer::get_farmer(db, &id).await?),
        RegistryCommand::Update {
            id,
            name,
            crops,
            last_updated,
        } => {
            let patch = FarmerPatch {
                name,
                assigned_crops: (!crops.is_empty()).then_some(crops),
                last_updated,
            };
            out.one(&farmer::update_farmer(db, &id, patch).await?)
        }
        RegistryCommand::Delete { id } => out.one(&farmer::delete_farmer(db, &id).await?),
        RegistryCommand::Label { id, out: file } => {
            let size_px = config.label.size_px;
            out.one(&label::label_farmer(db, &id, file.as_deref(), size_px).await?)
        }
        RegistryCommand::Print { out_dir } => {
            out.one(&label::print_labels(db, &out_dir, config.label.size_px).await?)
        }
        RegistryCommand::Scan { device, once } => {
            let device = device.unwrap_or_else(|| config.scanner.device.clone());
            let mut printed = Ok(());
            let handled = scan::scan_labels(db, config.scan_config(), &device, once, |outcome| {
                if printed.is_ok() {
                    printed = out.one(outcome);
                }
            })
            .await?;
            info!(handled, "Scan finished");
            printed
        }
        RegistryCommand::ScanImage { path } => {
            out.one(&scan::scan_image(db, config.scan_config(), &path).await?)
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// Prints results as text or JSON.
#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn one<T: Serialize + Display>(&self, value: &T) -> ApiResult<()> {
        if self.json {
            println!("{}", to_json(value)?);
        } else {
            println!("{}", value);
        }
        Ok(())
    }

    fn many<T: Serialize + Display>(&self, values: &[T]) -> ApiResult<()> {
        if self.json {
            println!("{}", to_json(&values)?);
        } else if values.is_empty() {
            println!("(none)");
        } else {
            for value in values {
                println!("{}", value);
            }
        }
        Ok(())
    }

    fn error(&self, err: &ApiError) {
        match to_json(err) {
            Ok(json) if self.json => println!("{}", json),
            _ => eprintln!("error: {}", err.message),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> ApiResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ApiError::internal(format!("JSON output failed: {}", e)))
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=agri_scan=trace` - Trace the scan session only
/// - Default: `info,agri=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agri=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_register_accepts_repeated_and_comma_crops() {
        let cli = parse(&[
            "station", "register", "F001", "Jane Doe", "-c", "Maize,Rice", "--crop", "Wheat",
        ]);
        match cli.command {
            Command::Registry(RegistryCommand::Register { id, name, crops }) => {
                assert_eq!(id, "F001");
                assert_eq!(name, "Jane Doe");
                assert_eq!(crops, ["Maize", "Rice", "Wheat"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_register_requires_a_crop() {
        assert!(Cli::try_parse_from(["station", "register", "F001", "Jane"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["station", "list", "--json", "--db", "/tmp/a.db"]);
        assert!(cli.json);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
    }

    #[test]
    fn test_update_parses_timestamp() {
        let cli = parse(&[
            "station",
            "update",
            "F001",
            "--last-updated",
            "2024-03-01T08:00:00Z",
        ]);
        match cli.command {
            Command::Registry(RegistryCommand::Update {
                crops,
                last_updated,
                ..
            }) => {
                assert!(crops.is_empty());
                assert_eq!(
                    last_updated.unwrap().to_rfc3339(),
                    "2024-03-01T08:00:00+00:00"
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_crops_runs_without_registry() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("untouched.db");

        let cli = parse(&["station", "crops", "--db", db_path.to_str().unwrap()]);
        assert!(matches!(cli.command, Command::Crops));
        execute(cli).await.unwrap();

        assert!(!db_path.exists());
        assert!(matches!(
            parse(&["station", "list"]).command,
            Command::Registry(RegistryCommand::List)
        ));
    }

    #[tokio::test]
    async fn test_execute_against_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("station.db");
        let config_path = dir.path().join("station.toml");
        std::fs::write(&config_path, "[label]\nsize_px = 240\n").unwrap();
        let base = [
            "station",
            "--config",
            config_path.to_str().unwrap(),
            "--db",
            db_path.to_str().unwrap(),
        ];
        let with = |rest: &[&str]| {
            let args: Vec<&str> = base.iter().chain(rest).copied().collect();
            Cli::try_parse_from(args).unwrap()
        };

        execute(with(&["register", "F001", "Jane Doe", "-c", "Maize"]))
            .await
            .unwrap();
        execute(with(&["show", "F001"])).await.unwrap();

        let err = execute(with(&["register", "F001", "Again", "-c", "Rice"]))
            .await
            .unwrap_err();
        assert_eq!(err.code, error::ErrorCode::Conflict);

        let err = execute(with(&["delete", "F404"])).await.unwrap_err();
        assert_eq!(err.code, error::ErrorCode::NotFound);
        assert!(db_path.exists());
    }
}
