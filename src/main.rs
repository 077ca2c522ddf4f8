use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::error;

use debit_manager::backup::MetadataStore;
use debit_manager::cli::{
    handle_auth_command, handle_backup_command, handle_debtor_command, handle_logs_command,
    handle_restore_command, handle_txn_command, AuthCommands, BackupCommands, DebtorCommands, TxnCommands,
};
use debit_manager::config::{paths::LedgerPaths, settings::Settings};
use debit_manager::error::LedgerResult;
use debit_manager::logging::DbLogJournal;
use debit_manager::remote::Authenticator;
use debit_manager::services::AppContext;

#[derive(Parser)]
#[command(
    name = "debitmanager",
    author = "Kaylee Beyene",
    version,
    about = "Personal debt ledger with snapshot backup and restore",
    long_about = "debitmanager keeps track of who owes you what in a local SQLite \
                  ledger, and backs that ledger up to cloud storage, an upload \
                  endpoint or a local snapshot folder."
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, settings and database
    Init,

    /// Show database, backup and sign-in status
    Status,

    /// Debtor management commands
    #[command(subcommand)]
    Debtor(DebtorCommands),

    /// Transaction commands
    #[command(subcommand, alias = "transaction")]
    Txn(TxnCommands),

    /// Backup commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Replace the database with the newest backup
    Restore {
        /// Restore this local snapshot instead of asking
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Cloud storage sign-in
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Show recent database, backup and recovery log entries
    Logs {
        /// Delete all entries instead of showing them
        #[arg(long)]
        clear: bool,

        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 50)]
        limit: usize,
    },

    /// Show current configuration and paths
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = LedgerPaths::new()?;
    let journal = Arc::new(DbLogJournal::open(paths.db_log_file()));
    debit_manager::logging::init(cli.verbose, Some(Arc::clone(&journal)));

    let settings = Settings::load_or_create(&paths)?;

    run(cli.command, paths, settings, &journal).await.map_err(|e| {
        error!(error = %e, "command failed");
        anyhow!(e.user_message())
    })
}

async fn run(
    command: Option<Commands>,
    paths: LedgerPaths,
    settings: Settings,
    journal: &DbLogJournal,
) -> LedgerResult<()> {
    match command {
        Some(Commands::Init) => {
            println!("Initializing debitmanager at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            let ctx = AppContext::open(paths.clone(), settings).await?;
            let status = ctx.database().status().await?;
            ctx.shutdown().await;
            println!("Database: {}", status.path.display());
            println!("Backups:  {}", paths.backup_dir().display());
            println!("Initialization complete!");
        }
        Some(Commands::Status) => {
            let ctx = AppContext::open(paths, settings).await?;
            print_status(&ctx).await?;
            ctx.shutdown().await;
        }
        Some(Commands::Debtor(cmd)) => {
            let ctx = AppContext::open(paths, settings).await?;
            let result = handle_debtor_command(&ctx.ledger(), cmd).await;
            ctx.shutdown().await;
            result?;
        }
        Some(Commands::Txn(cmd)) => {
            let ctx = AppContext::open(paths, settings).await?;
            let result = handle_txn_command(&ctx.ledger(), cmd).await;
            ctx.shutdown().await;
            result?;
        }
        Some(Commands::Backup(cmd)) => {
            let ctx = AppContext::open(paths, settings).await?;
            let result = handle_backup_command(&ctx, cmd).await;
            ctx.shutdown().await;
            result?;
        }
        Some(Commands::Restore { file, force }) => {
            let ctx = AppContext::open(paths, settings).await?;
            let result = handle_restore_command(&ctx, file, force).await;
            ctx.shutdown().await;
            result?;
        }
        Some(Commands::Auth(cmd)) => {
            handle_auth_command(&paths, &settings, cmd).await?;
        }
        Some(Commands::Logs { clear, limit }) => {
            handle_logs_command(journal, clear, limit)?;
        }
        Some(Commands::Config) => {
            println!("debitmanager Configuration");
            println!("==========================");
            println!("Data directory:   {}", paths.base_dir().display());
            println!("Database dir:     {}", paths.sqlite_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Log journal:      {}", paths.db_log_file().display());
            println!();
            println!("Settings:");
            println!("  Cloud storage:    {}", if settings.remote.enabled { "enabled" } else { "disabled" });
            println!("  Cloud folder:     {}", settings.remote.folder_name);
            println!(
                "  Upload endpoint:  {}",
                settings.upload.url.as_deref().unwrap_or("(none)")
            );
            println!("  Share fallback:   {}", if settings.share.enabled { "enabled" } else { "disabled" });
            println!("  Keep snapshots:   {}", settings.backup_retention.keep_count);
            println!("  Schedule:         every {} minute(s)", settings.schedule.interval_minutes);
        }
        None => {
            println!("debitmanager - personal debt ledger");
            println!();
            println!("Run 'debitmanager --help' for usage information.");
            println!("Run 'debitmanager init' to get started.");
        }
    }
    Ok(())
}

async fn print_status(ctx: &AppContext) -> LedgerResult<()> {
    let status = ctx.database().status().await?;
    let ledger = ctx.ledger();
    let debtors = ledger.list_debtors().await;

    println!("Database:     {}", status.path.display());
    println!("Schema:       v{} ({})", status.user_version, status.journal_mode);
    println!("Debtors:      {}", debtors.len());
    println!("Outstanding:  {}", ledger.total_outstanding().await);

    let last = MetadataStore::new(ctx.paths().metadata_file()).get_last_backup_timestamp();
    match last {
        Some(at) => println!("Last backup:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Last backup:  never"),
    }

    let settings = ctx.settings();
    let signed_in = settings.remote.enabled
        && Authenticator::new(
            reqwest::Client::new(),
            settings.remote.clone(),
            ctx.paths().session_file(),
        )
        .is_signed_in();
    println!("Cloud:        {}", if signed_in { "signed in" } else { "not signed in" });
    Ok(())
}
