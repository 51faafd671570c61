//! Schedule Crawler CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use schedule_crawler::{
    error::{AppError, Result},
    models::{Config, Filter, RecordKind, ScheduleConfig, SchedulerConfig, Slot},
    pipeline::{Crawler, Rebuilder, run_all},
    services::{self, ScheduleExtractor},
    storage::{self, ScheduleReader, SlotStores, SlotSwitch},
    utils::http::{Fetcher, HttpFetcher},
};

/// Course schedule crawler with double-buffered storage
#[derive(Parser, Debug)]
#[command(
    name = "schedule-crawler",
    version,
    about = "Crawls a course time schedule into A/B SQLite stores"
)]
struct Cli {
    /// Path to storage directory containing config.toml and the data directory
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Restrict to one configured schedule; `list` defaults to the first
    #[arg(long, global = true)]
    schedule: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the control row and both slot schemas for each schedule
    Setup,

    /// Delete each schedule's control and slot databases
    Teardown,

    /// Run one pass per schedule: rebuild the inactive slot and flip to it
    Crawl,

    /// Run passes per the [scheduler] settings
    Run,

    /// Query the active slot
    List {
        /// department, class, or section
        kind: RecordKind,

        /// Equality condition, repeatable
        #[arg(long = "where", value_name = "COLUMN=VALUE")]
        conditions: Vec<String>,

        /// Sort ascending by this column
        #[arg(long)]
        order_by: Option<String>,

        /// Maximum number of records
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show the active slot and record counts
    Info,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn open_stores(
    config: &Config,
    base: &Path,
    schedule: &ScheduleConfig,
) -> Result<(SlotSwitch, SlotStores)> {
    let db = &config.database;
    let switch = SlotSwitch::open(&db.control_path(base, &schedule.name)).await?;
    let stores = SlotStores::open(db, base, &schedule.name).await?;
    Ok((switch, stores))
}

/// Schedules a command applies to: the one named by `--schedule`, or all.
fn selected<'c>(config: &'c Config, name: Option<&str>) -> Result<Vec<&'c ScheduleConfig>> {
    match name {
        Some(_) => Ok(vec![config.schedule(name)?]),
        None => Ok(config.schedules.iter().collect()),
    }
}

async fn rebuilders(config: &Config, base: &Path, name: Option<&str>) -> Result<Vec<Rebuilder>> {
    config.validate()?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config.crawler)?);
    let extractor = Arc::new(ScheduleExtractor::from_config(config)?);
    let crawler = Crawler::from_config(&config.crawler, fetcher, extractor);

    let mut rebuilders = Vec::new();
    for schedule in selected(config, name)? {
        let (switch, stores) = open_stores(config, base, schedule).await?;
        let rebuilder = Rebuilder::new(crawler.clone(), switch, stores, services::root_url(schedule)?)
            .with_schedule_name(&schedule.name);
        rebuilders.push(rebuilder);
    }
    Ok(rebuilders)
}

fn build_filter(
    kind: RecordKind,
    conditions: &[String],
    order_by: Option<String>,
    limit: Option<u32>,
) -> Result<Filter> {
    let schema = kind.schema();
    let mut filter = Filter::new();
    for condition in conditions {
        let (column, raw) = condition.split_once('=').ok_or_else(|| {
            AppError::validation(format!("expected COLUMN=VALUE, got '{condition}'"))
        })?;
        let column = column.trim();
        filter = filter.eq(column, schema.parse_value(column, raw)?);
    }
    if let Some(column) = order_by {
        filter = filter.order_by(column);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }
    filter.validate(schema)?;
    Ok(filter)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::debug!("Loaded configuration from {}", config_path.display());

    let base = cli.storage_dir.as_path();
    let name = cli.schedule.as_deref();

    match cli.command {
        Command::Setup => {
            config.validate()?;
            for schedule in selected(&config, name)? {
                let (switch, _stores) = open_stores(&config, base, schedule).await?;
                let active = switch.get_active_slot().await?;
                log::info!(
                    "[{}] Storage ready under {} (active slot {active})",
                    schedule.name,
                    config.database.schedule_dir(base, &schedule.name).display()
                );
            }
        }

        Command::Teardown => {
            config.validate()?;
            for schedule in selected(&config, name)? {
                let removed = storage::teardown(&config.database, base, &schedule.name).await?;
                log::info!("[{}] Removed {} database files", schedule.name, removed.len());
            }
        }

        Command::Crawl => {
            let once = SchedulerConfig {
                loop_enabled: false,
                ..config.scheduler.clone()
            };
            run_all(&rebuilders(&config, base, name).await?, &once).await?;
        }

        Command::Run => {
            run_all(&rebuilders(&config, base, name).await?, &config.scheduler).await?;
        }

        Command::List {
            kind,
            conditions,
            order_by,
            limit,
        } => {
            let filter = build_filter(kind, &conditions, order_by, limit)?;
            let (switch, stores) = open_stores(&config, base, config.schedule(name)?).await?;
            let reader = ScheduleReader::new(switch, stores);
            for record in reader.select(kind, &filter).await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }

        Command::Info => {
            log::info!("Storage directory: {}", base.display());
            for schedule in selected(&config, name)? {
                let (switch, stores) = open_stores(&config, base, schedule).await?;
                let active = switch.get_active_slot().await?;
                log::info!("[{}] {} (active slot {active})", schedule.name, schedule.root_url);
                for slot in [Slot::A, Slot::B] {
                    let store = stores.get(slot);
                    let mut counts = Vec::with_capacity(RecordKind::ALL.len());
                    for kind in RecordKind::ALL {
                        counts.push(format!("{} {}", store.count(kind).await?, kind.schema().table));
                    }
                    let marker = if slot == active { " (active)" } else { "" };
                    log::info!("[{}] Slot {slot}{marker}: {}", schedule.name, counts.join(", "));
                }
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (includes extraction patterns)");
        }
    }

    Ok(())
}
