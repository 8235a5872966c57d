mod config;
mod matcher;
mod message;
mod reminder;
mod scheduler;
mod store;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;

use reminder::Reminder;
use store::BirthdayStore;
use telegram::{Notifier, TelegramClient};

#[derive(Parser)]
#[command(
    name = "born2wish",
    version,
    about = "Birthday reminders delivered to a Telegram chat"
)]
struct Cli {
    #[command(flatten)]
    config: config::ConfigArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduled reminder service (default)
    Run,
    /// Send one test message and exit
    Test,
    /// Print how tomorrow's check would match, without sending
    Debug,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let reminder = init(cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(reminder).await?,
        Commands::Test => {
            tracing::info!("Testing reminder system");
            reminder.send_test().await;
        }
        Commands::Debug => {
            let today = matcher::today_in(reminder.config().timezone);
            println!("{}", reminder.debug_report(today));
        }
    }
    Ok(())
}

/// Build components in dependency order: config, store, delivery.
fn init(args: config::ConfigArgs) -> Result<Reminder> {
    tracing::info!("Initializing birthday reminder service");
    let cfg = config::load(args)?;

    let store = BirthdayStore::new(cfg.data_file.clone(), cfg.backup_dir.clone());
    store.ensure()?;
    store.ensure_backup_dir()?;

    let client = TelegramClient::from_config(&cfg)?;
    let reminder = Reminder::new(cfg, store, Notifier::new(Box::new(client)));
    reminder.log_status();
    Ok(reminder)
}

async fn run(reminder: Reminder) -> Result<()> {
    let reminder = Arc::new(reminder);
    let scheduler = scheduler::Scheduler::new(reminder.clone())?;
    tracing::info!("Birthday reminder service running, press Ctrl+C to stop");

    tokio::select! {
        res = scheduler.start() => res?,
        _ = shutdown_signal() => {
            shutdown(&reminder);
        }
    }
    Ok(())
}

/// Best-effort final backup before exit.
fn shutdown(reminder: &Reminder) -> Option<PathBuf> {
    tracing::info!("Shutting down, creating final backup");
    let backup = reminder.store().snapshot();
    tracing::info!("Service stopped");
    backup
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::try_parse_from(["born2wish"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_directives() {
        let cli = Cli::try_parse_from(["born2wish", "test"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Test)));

        let cli = Cli::try_parse_from(["born2wish", "debug", "--chat-id", "42"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Debug)));
        assert_eq!(cli.config.chat_id.as_deref(), Some("42"));
    }

    fn args_in(dir: &std::path::Path) -> config::ConfigArgs {
        config::ConfigArgs {
            bot_token: Some("123456:ABCDEFGHIJ".into()),
            chat_id: Some("42".into()),
            data_file: Some(dir.join("data.json")),
            backup_dir: Some(dir.join("backups")),
            ..Default::default()
        }
    }

    #[test]
    fn test_init_creates_store_and_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        init(args_in(dir.path())).unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("data.json")).unwrap(), "[]");
        assert!(dir.path().join("backups").is_dir());
    }

    #[test]
    fn test_shutdown_takes_final_backup() {
        let dir = tempfile::tempdir().unwrap();
        let reminder = init(args_in(dir.path())).unwrap();
        let content = r#"[{"name":"Amy","date":"15-03"}]"#;
        std::fs::write(dir.path().join("data.json"), content).unwrap();

        let backup = shutdown(&reminder).unwrap();
        assert_eq!(backup.parent().unwrap(), dir.path().join("backups"));
        assert_eq!(std::fs::read_to_string(backup).unwrap(), content);
    }

    #[test]
    fn test_cli_rejects_unknown_directive() {
        assert!(Cli::try_parse_from(["born2wish", "explode"]).is_err());
    }
}
