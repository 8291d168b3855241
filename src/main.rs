use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posvault::backup::BackupService;
use posvault::cli::{
    handle_backup_command, handle_config_command, handle_store_command, run_scheduler,
    BackupCommands, ConfigCommands, StoreCommands,
};
use posvault::clock::SystemClock;
use posvault::config::VaultPaths;
use posvault::notify::LogNotifier;
use posvault::storage::FileStore;

#[derive(Parser)]
#[command(
    name = "posvault",
    author = "Kaylee Beyene",
    version,
    about = "Snapshot backups for point-of-sale record stores",
    long_about = "posvault captures every record category of a point-of-sale store \
                  into versioned snapshots, keeps a catalog of backups, prunes old \
                  ones and restores them on demand."
)]
struct Cli {
    /// Advertised store capacity in KiB; usage above 80% raises a warning
    #[arg(long, global = true, env = "POSVAULT_STORE_CAPACITY_KB")]
    store_capacity_kb: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Backup configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Record store commands
    #[command(subcommand)]
    Store(StoreCommands),

    /// Run scheduled backups until stopped
    Run {
        /// Run any backup the cadence already owes, poll once and exit
        #[arg(long)]
        once: bool,
    },
}

/// Initialize tracing with the POSVAULT_LOG environment variable.
///
/// Defaults to "info" level if POSVAULT_LOG is not set.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("POSVAULT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_service(store: FileStore) -> Result<BackupService<FileStore>> {
    Ok(BackupService::new(
        store,
        Box::new(LogNotifier),
        Box::new(SystemClock),
    )?)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let paths = VaultPaths::new()?;
    paths.ensure_directories()?;
    let mut store = FileStore::open(paths.store_dir())?;
    if let Some(kb) = cli.store_capacity_kb {
        store = store.with_capacity_hint(kb.saturating_mul(1024));
    }

    match cli.command {
        Some(Commands::Backup(cmd)) => {
            let mut service = open_service(store)?;
            handle_backup_command(&mut service, &paths, cmd)?;
        }
        Some(Commands::Config(cmd)) => {
            let mut service = open_service(store)?;
            handle_config_command(&mut service, &paths, cmd)?;
        }
        Some(Commands::Store(cmd)) => {
            handle_store_command(&mut store, cmd)?;
        }
        Some(Commands::Run { once }) => {
            let mut service = open_service(store)?;
            let attempted = run_scheduler(&mut service, once);
            println!("Automatic backups attempted: {}", attempted);
        }
        None => {
            println!("posvault - snapshot backups for point-of-sale stores");
            println!();
            println!("Run 'posvault --help' for usage information.");
        }
    }

    Ok(())
}
