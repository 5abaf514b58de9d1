use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;

use crate::models::deadline::parse_utc_offset;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub google: GoogleConfig,
    pub team: TeamConfig,
    pub journal: JournalConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Register commands for a single guild (instant) instead of globally.
    pub guild_id: Option<u64>,
    /// How long the create modal waits for a submission.
    pub modal_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub sheet_id: String,
    pub credentials_path: PathBuf,
    pub calendar_id: String,
    /// Local offset for deadlines and calendar times (read from `CALENDAR_UTC_OFFSET`).
    pub utc_offset: FixedOffset,
    /// Optional IANA zone name sent alongside calendar date-times.
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TeamConfig {
    /// Role that may run the team commands. Updated at runtime by `/configure`.
    pub role_id: Option<u64>,
    /// Env file rewritten when the team role changes.
    pub env_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Number of recent actions kept for operators.
    pub capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("PORT", env::var("PORT").ok(), 8080)?,
            },
            discord: DiscordConfig {
                bot_token: env::var("DISCORD_BOT_TOKEN")
                    .map_err(|_| ConfigError::MissingEnv("DISCORD_BOT_TOKEN".to_string()))?,
                guild_id: match env::var("DISCORD_GUILD_ID") {
                    Ok(v) if !v.trim().is_empty() => Some(
                        v.trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidValue("DISCORD_GUILD_ID".to_string()))?,
                    ),
                    _ => None,
                },
                modal_timeout: Duration::from_secs(parse_or(
                    "MODAL_TIMEOUT_SECONDS",
                    env::var("MODAL_TIMEOUT_SECONDS").ok(),
                    3600,
                )?),
            },
            google: GoogleConfig {
                sheet_id: env::var("GOOGLE_SHEET_ID")
                    .map_err(|_| ConfigError::MissingEnv("GOOGLE_SHEET_ID".to_string()))?,
                credentials_path: env::var("GOOGLE_SHEETS_CREDENTIALS_PATH")
                    .map(PathBuf::from)
                    .map_err(|_| {
                        ConfigError::MissingEnv("GOOGLE_SHEETS_CREDENTIALS_PATH".to_string())
                    })?,
                calendar_id: env::var("GOOGLE_CALENDAR_ID")
                    .map_err(|_| ConfigError::MissingEnv("GOOGLE_CALENDAR_ID".to_string()))?,
                utc_offset: parse_utc_offset(
                    &env::var("CALENDAR_UTC_OFFSET").unwrap_or_else(|_| "+01:00".to_string()),
                )
                .ok_or_else(|| ConfigError::InvalidValue("CALENDAR_UTC_OFFSET".to_string()))?,
                time_zone: env::var("CALENDAR_TIME_ZONE")
                    .ok()
                    .filter(|v| !v.trim().is_empty()),
            },
            team: TeamConfig {
                role_id: match env::var("TEAM_ROLE_ID") {
                    Ok(v) if !v.trim().is_empty() => Some(
                        v.trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidValue("TEAM_ROLE_ID".to_string()))?,
                    ),
                    _ => None,
                },
                env_file: env::var("ENV_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".env")),
            },
            journal: JournalConfig {
                capacity: parse_or("JOURNAL_CAPACITY", env::var("JOURNAL_CAPACITY").ok(), 200)?,
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Parse an optional setting, falling back to `default` only when it is unset or blank.
fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        _ => Ok(default),
    }
}
