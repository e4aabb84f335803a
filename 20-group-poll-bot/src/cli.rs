use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::{bot::BotSettings, dispatch::DispatchConfig, store::UserId};

#[derive(Parser, Debug)]
#[command(author, version, about = "Group poll bot with a live status monitor")]
pub struct Cli {
    /// Bot API token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Logging profile.
    #[arg(long, env = "POLL_BOT_ENV", value_enum, default_value_t = Environment::Dev)]
    pub env: Environment,

    /// File the prod profile appends JSON logs to.
    #[arg(long, env = "POLL_BOT_LOG_PATH", default_value = "poll-bot.log")]
    pub log_path: PathBuf,

    /// Directory holding the users, items and util snapshots.
    #[arg(long, env = "POLL_BOT_STORAGE", default_value = "./data")]
    pub storage: PathBuf,

    /// Chat whose administrators may run admin commands.
    #[arg(long, env = "POLL_BOT_MAIN_CHAT_ID", allow_negative_numbers = true)]
    pub main_chat_id: Option<i64>,

    /// Extra admin user ids, comma separated.
    #[arg(long = "admin", env = "POLL_BOT_ADMINS", value_delimiter = ',')]
    pub admins: Vec<UserId>,

    /// Delay between update fetches.
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Maximum updates fetched per request.
    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    /// Update id to start fetching from.
    #[arg(long, default_value_t = 0)]
    pub offset: i64,

    #[arg(long, default_value = "https://api.telegram.org")]
    pub api_url: String,

    #[arg(long, default_value_t = 5)]
    pub request_timeout_secs: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Human-readable logs on stdout.
    Dev,
    /// JSON logs appended to `--log-path`.
    Prod,
}

impl Cli {
    pub fn bot_settings(&self) -> BotSettings {
        BotSettings {
            main_chat_id: self.main_chat_id,
            admins: self.admins.clone(),
            ..BotSettings::default()
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "poll-bot",
            "--token",
            "123:abc",
            "--env",
            "prod",
            "--main-chat-id",
            "-1001",
            "--admin",
            "7,9",
            "--poll-interval-ms",
            "250",
        ])
        .expect("parse");

        assert_eq!(cli.env, Environment::Prod);
        assert_eq!(cli.bot_settings().main_chat_id, Some(-1001));
        assert_eq!(cli.bot_settings().admins, vec![7, 9]);
        assert_eq!(cli.dispatch_config().poll_interval, Duration::from_millis(250));
        assert_eq!(cli.dispatch_config().limit, 100);
        assert_eq!(cli.request_timeout(), Duration::from_secs(5));
    }
}
