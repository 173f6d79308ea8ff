//! Aarogya - offline-first medication adherence client.

mod app;

use std::path::PathBuf;

use aarogya_config_and_utils::{init_logging, parse_level, Config, Paths};
use clap::{Parser, Subcommand, ValueEnum};

/// Aarogya command-line interface.
#[derive(Parser)]
#[command(name = "aarogya")]
#[command(about = "Record medication doses offline and sync them when connected")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (database, logs, config). Defaults to ~/.aarogya
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a dose confirmation locally and sync if online
    Record(app::RecordArgs),
    /// Print every record in a collection as JSON
    List {
        #[arg(short, long, value_enum, default_value = "dose-events")]
        collection: CollectionArg,
    },
    /// Show how many dose events await sync
    Pending,
    /// Run one sync pass
    Sync,
    /// Keep syncing on reconnect until interrupted
    Watch,
    /// Cache medications or reminders from a JSON array file
    Cache {
        #[arg(value_enum)]
        collection: CacheArg,
        /// Path to a JSON file holding an array of records
        file: PathBuf,
    },
    /// Reminder queries
    Reminders {
        #[command(subcommand)]
        command: RemindersCommand,
    },
    /// Notification permission and push subscription
    Notifications {
        #[command(subcommand)]
        command: app::NotificationsCommand,
    },
}

/// One year.
const MAX_UPCOMING_HOURS: i64 = 8760;

#[derive(Subcommand)]
enum RemindersCommand {
    /// Reminders due within the next hours
    Upcoming {
        #[arg(
            long,
            default_value_t = aarogya_database::DEFAULT_UPCOMING_HOURS,
            value_parser = clap::value_parser!(i64).range(0..=MAX_UPCOMING_HOURS)
        )]
        hours: i64,
        /// Show a notification for each upcoming reminder
        #[arg(long)]
        notify: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CollectionArg {
    DoseEvents,
    Medications,
    Reminders,
}

#[derive(Clone, Copy, ValueEnum)]
enum CacheArg {
    Medications,
    Reminders,
}

impl From<CollectionArg> for aarogya_database::Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::DoseEvents => Self::DoseEvents,
            CollectionArg::Medications => Self::Medications,
            CollectionArg::Reminders => Self::Reminders,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = parse_level(cli.log_level.as_deref().unwrap_or(&config.log_level));
    init_logging("aarogya", &level.to_string().to_lowercase(), &paths);

    let state = app::AppState::init(config, &paths).await?;

    match cli.command {
        Commands::Record(args) => app::record(&state, args).await?,
        Commands::List { collection } => app::list(&state, collection.into()).await?,
        Commands::Pending => app::pending(&state).await?,
        Commands::Sync => app::sync_once(&state).await?,
        Commands::Watch => app::watch(&state).await?,
        Commands::Cache { collection, file } => match collection {
            CacheArg::Medications => app::cache_medications(&state, &file).await?,
            CacheArg::Reminders => app::cache_reminders(&state, &file).await?,
        },
        Commands::Reminders {
            command: RemindersCommand::Upcoming { hours, notify },
        } => app::upcoming_reminders(&state, hours, notify).await?,
        Commands::Notifications { command } => app::notifications(&state, command).await?,
    }

    Ok(())
}
