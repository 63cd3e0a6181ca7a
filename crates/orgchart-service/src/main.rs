//! CLI binary entry point for the orgchart hierarchy engine.
//!
//! Usage:
//!   orgchart [OPTIONS] <COMMAND>
//!
//! Options:
//!   -c, --config <FILE>     Path to configuration TOML file
//!   -s, --snapshot <FILE>   JSON snapshot to load (overrides config)
//!   -v, --verbose           Increase logging verbosity
//!   --as-of <DATE>          Evaluate as of this date instead of today
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use orgchart_protocol::{DateWindow, Dimension, EmployeeId, PositionId};
use orgchart_service::{OrgChartService, ServiceConfig, Snapshot};

/// Orgchart - query reporting lines and assignment history.
#[derive(Parser, Debug)]
#[command(name = "orgchart")]
#[command(about = "Resolve organizational hierarchies from a JSON snapshot")]
#[command(version)]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// JSON snapshot of positions and assignment history.
    #[arg(short, long, value_name = "FILE", global = true)]
    snapshot: Option<PathBuf>,

    /// Increase logging verbosity (can be repeated: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Evaluation date (YYYY-MM-DD); defaults to today.
    #[arg(long, value_name = "DATE", global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the snapshot, check every invariant and print record counts.
    Validate,
    /// Positions under a position, the position itself at level 0.
    Subtree {
        #[arg(long, value_name = "ID")]
        position: PositionId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Employees currently below an employee's position.
    Subordinates {
        #[arg(long, value_name = "ID")]
        employee: EmployeeId,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Everyone who held a position below an employee's current position
    /// during a date range.
    SubordinatesInRange {
        #[arg(long, value_name = "ID")]
        employee: EmployeeId,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    /// An employee's assignment history.
    History {
        #[arg(long, value_name = "ID")]
        employee: EmployeeId,
        /// "position" or "post".
        #[arg(long, default_value = "position")]
        dimension: Dimension,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Assignment history of everyone currently reporting to a manager.
    TeamHistory {
        #[arg(long, value_name = "ID")]
        manager: EmployeeId,
        /// "position" or "post".
        #[arg(long, default_value = "position")]
        dimension: Dimension,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,
    /// Items per page; defaults to the configured page size.
    #[arg(long)]
    size: Option<usize>,
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// First day of the range (inclusive).
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,
    /// Last day of the range (inclusive).
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,
}

impl WindowArgs {
    fn window(&self) -> DateWindow {
        DateWindow::new(self.from, self.to)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration.
    let mut config = ServiceConfig::load(cli.config.as_deref())?;

    // Apply CLI overrides.
    if let Some(snapshot) = cli.snapshot.clone() {
        config.snapshot.path = Some(snapshot);
    }
    if let Some(date) = cli.as_of {
        config.evaluation_date = Some(date);
    }

    init_logging(&config, cli.verbose);

    let snapshot_path = config
        .snapshot
        .path
        .clone()
        .context("no snapshot given: pass --snapshot or set [snapshot] path")?;

    let service = OrgChartService::from_config(&config);
    tracing::info!(
        snapshot = %snapshot_path.display(),
        as_of = %service.today(),
        "Starting orgchart"
    );

    let snapshot = Snapshot::read(&snapshot_path)?;
    let summary = service.load_snapshot(snapshot).await?;

    let size = |page: &PageArgs| page.size.unwrap_or(service.default_page_size());

    match cli.command {
        Command::Validate => print_json(&summary)?,
        Command::Subtree { position, page } => {
            print_json(&service.get_subtree(position, page.page, size(&page)).await?)?
        }
        Command::Subordinates { employee, page } => print_json(
            &service
                .get_current_subordinates(employee, page.page, size(&page))
                .await?,
        )?,
        Command::SubordinatesInRange {
            employee,
            window,
            page,
        } => print_json(
            &service
                .get_subordinates_in_range(employee, page.page, size(&page), window.from, window.to)
                .await?,
        )?,
        Command::History {
            employee,
            dimension,
            window,
            page,
        } => match dimension {
            Dimension::Position => print_json(
                &service
                    .get_employee_position_history(employee, page.page, size(&page), window.window())
                    .await?,
            )?,
            Dimension::Post => print_json(
                &service
                    .get_employee_post_history(employee, page.page, size(&page), window.window())
                    .await?,
            )?,
        },
        Command::TeamHistory {
            manager,
            dimension,
            window,
            page,
        } => match dimension {
            Dimension::Position => print_json(
                &service
                    .get_subordinates_position_history(
                        manager,
                        page.page,
                        size(&page),
                        window.window(),
                    )
                    .await?,
            )?,
            Dimension::Post => print_json(
                &service
                    .get_subordinates_post_history(manager, page.page, size(&page), window.window())
                    .await?,
            )?,
        },
    }

    Ok(())
}

fn init_logging(config: &ServiceConfig, verbose: u8) {
    // Adjust log level based on verbosity.
    let log_level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over both.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
