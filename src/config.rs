use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Args;
use std::path::PathBuf;

/// Shortest bot token accepted at startup.
pub const MIN_TOKEN_LEN: usize = 10;

/// Settings as given on the command line, each falling back to its
/// environment variable. Anything still absent gets a default in [`load`].
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigArgs {
    /// Telegram bot token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true, global = true)]
    pub bot_token: Option<String>,
    /// Chat that receives the reminders
    #[arg(long, env = "CHAT_ID", global = true)]
    pub chat_id: Option<String>,
    /// Name shown in the reminder header
    #[arg(long, env = "USERNAME", global = true)]
    pub username: Option<String>,
    /// Bot API base URL; the token is appended directly
    #[arg(long, env = "BOT_API", global = true)]
    pub bot_api: Option<String>,
    /// JSON file holding the birthday list
    #[arg(long, env = "DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,
    /// IANA timezone the schedule and dates are evaluated in
    #[arg(long, env = "TIMEZONE", global = true)]
    pub timezone: Option<String>,
    /// Directory for weekly snapshots
    #[arg(long, env = "BACKUP_DIR", global = true)]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: String,
    pub username: String,
    pub bot_api: String,
    pub data_file: PathBuf,
    pub timezone: Tz,
    pub backup_dir: PathBuf,
}

impl Config {
    /// Token prefix safe to print in status output.
    pub fn masked_token(&self) -> String {
        let prefix: String = self.bot_token.chars().take(MIN_TOKEN_LEN).collect();
        format!("{prefix}...")
    }
}

fn default_username() -> String {
    "User".to_string()
}

fn default_bot_api() -> String {
    "https://api.telegram.org/bot".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("./data.json")
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

pub fn load(args: ConfigArgs) -> Result<Config> {
    let mut missing = Vec::new();

    let bot_token = present(args.bot_token, "BOT_TOKEN", &mut missing);
    let chat_id = present(args.chat_id, "CHAT_ID", &mut missing);
    let username =
        present(args.username, "USERNAME", &mut missing).unwrap_or_else(default_username);
    let bot_api = present(args.bot_api, "BOT_API", &mut missing).unwrap_or_else(default_bot_api);
    let timezone =
        present(args.timezone, "TIMEZONE", &mut missing).unwrap_or_else(default_timezone);
    let data_file = args.data_file.unwrap_or_else(|| {
        missing.push("DATA_FILE");
        default_data_file()
    });
    let backup_dir = args.backup_dir.unwrap_or_else(|| {
        missing.push("BACKUP_DIR");
        default_backup_dir()
    });

    if missing.is_empty() {
        tracing::info!("All environment variables loaded");
    } else {
        tracing::warn!(
            missing = %missing.join(", "),
            "Missing environment variables, falling back to defaults where possible"
        );
    }

    let bot_token = match bot_token {
        Some(token) if token.len() >= MIN_TOKEN_LEN => token,
        Some(_) => {
            anyhow::bail!("Invalid BOT_TOKEN: expected at least {MIN_TOKEN_LEN} characters")
        }
        None => anyhow::bail!("Invalid BOT_TOKEN: not set"),
    };
    let chat_id = chat_id.context("Invalid CHAT_ID: not set")?;
    let timezone: Tz = timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid TIMEZONE '{timezone}': {e}"))?;

    Ok(Config {
        bot_token,
        chat_id,
        username,
        bot_api,
        data_file,
        timezone,
        backup_dir,
    })
}

fn present(
    value: Option<String>,
    var: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            missing.push(var);
            None
        }
    }
}
