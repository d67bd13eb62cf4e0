//! Rebalancer configuration.
//!
//! Settings come from CLI flags with environment fallbacks (a `.env` file is
//! loaded first) and are validated once at startup into an immutable [`Config`].

use std::str::FromStr;
use std::time::Duration;

use clap::Args;
use rust_decimal::Decimal;

use crate::api::{auth, Credentials, OKX_URL};
use crate::error::ConfigError;
use crate::notify::TelegramConfig;

use super::scheduler::Schedule;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Raw settings as provided on the command line or in the environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// OKX API key
    #[arg(long, env = "OKX_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OKX secret key
    #[arg(long, env = "OKX_SECRET_KEY", hide_env_values = true, global = true)]
    pub secret_key: Option<String>,

    /// OKX API passphrase
    #[arg(long, env = "OKX_PASSPHRASE", hide_env_values = true, global = true)]
    pub passphrase: Option<String>,

    /// Instrument to rebalance
    #[arg(long, env = "SYMBOL", default_value = "ETH-USDT-SWAP", global = true)]
    pub symbol: String,

    /// Target notional value as a multiple of equity
    #[arg(long, env = "LEVERAGE", default_value = "3", global = true)]
    pub leverage: String,

    /// Smallest position adjustment worth trading, in base currency
    #[arg(long, env = "MIN_ADJUSTMENT", default_value = "0.01", global = true)]
    pub min_adjustment: String,

    /// Daily schedule as "M H * * *" (UTC)
    #[arg(long, env = "CRON_SCHEDULE", default_value = "5 0 * * *", global = true)]
    pub schedule: String,

    /// Compute and record decisions without submitting orders
    #[arg(long, env = "DRY_RUN", global = true)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_parser = LOG_LEVELS,
        ignore_case = true,
        global = true
    )]
    pub log_level: String,

    /// OKX REST base URL
    #[arg(long, env = "OKX_BASE_URL", default_value = OKX_URL, global = true)]
    pub base_url: String,

    /// Use OKX demo trading
    #[arg(long, env = "OKX_SIMULATED", global = true)]
    pub simulated: bool,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10", global = true)]
    pub http_timeout: u64,

    /// Trade journal database
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:./rebalancer.db?mode=rwc", global = true)]
    pub database: String,

    /// Send a Telegram message for every rebalance
    #[arg(long, env = "TELEGRAM_ENABLED", global = true)]
    pub telegram_enabled: bool,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, global = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID", global = true)]
    pub telegram_chat_id: Option<String>,
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Instrument identifier, e.g. "ETH-USDT-SWAP"
    pub instrument: String,

    /// Target notional / equity ratio (> 0)
    pub leverage: Decimal,

    /// Deltas smaller than this are not traded (>= 0)
    pub min_adjustment: Decimal,

    pub schedule: Schedule,

    pub dry_run: bool,

    pub credentials: Credentials,

    pub base_url: String,

    pub simulated: bool,

    pub http_timeout: Duration,

    pub database_url: String,

    /// Present only when notifications are enabled
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    /// Validate raw settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let credentials = Credentials::new(
            &required("OKX_API_KEY", &settings.api_key)?,
            &required("OKX_SECRET_KEY", &settings.secret_key)?,
            &required("OKX_PASSPHRASE", &settings.passphrase)?,
        );

        let instrument = settings.symbol.trim().to_string();
        if instrument.is_empty() {
            return Err(ConfigError::Invalid {
                key: "SYMBOL",
                reason: "must not be empty".to_string(),
            });
        }

        let leverage = parse_decimal("LEVERAGE", &settings.leverage)?;
        if leverage <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "LEVERAGE",
                reason: format!("must be positive, got {}", leverage),
            });
        }

        let min_adjustment = parse_decimal("MIN_ADJUSTMENT", &settings.min_adjustment)?;
        if min_adjustment < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                key: "MIN_ADJUSTMENT",
                reason: format!("must not be negative, got {}", min_adjustment),
            });
        }

        let schedule = Schedule::parse(&settings.schedule)?;

        if settings.http_timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }

        let telegram = if settings.telegram_enabled {
            Some(TelegramConfig {
                bot_token: required("TELEGRAM_BOT_TOKEN", &settings.telegram_bot_token)?,
                chat_id: required("TELEGRAM_CHAT_ID", &settings.telegram_chat_id)?,
            })
        } else {
            None
        };

        Ok(Self {
            instrument,
            leverage,
            min_adjustment,
            schedule,
            dry_run: settings.dry_run,
            credentials,
            base_url: settings.base_url.clone(),
            simulated: settings.simulated,
            http_timeout: Duration::from_secs(settings.http_timeout),
            database_url: settings.database.clone(),
            telegram,
        })
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Rebalancer Configuration ===")?;
        writeln!(f, "Instrument:       {}", self.instrument)?;
        writeln!(f, "Leverage:         {}x", self.leverage)?;
        writeln!(f, "Min Adjustment:   {}", self.min_adjustment)?;
        writeln!(f, "Schedule:         daily at {}", self.schedule)?;
        writeln!(f, "Mode:             {}", if self.dry_run { "DRY RUN" } else { "LIVE" })?;
        writeln!(f, "API Key:          {}", auth::redact(&self.credentials.api_key))?;
        writeln!(f, "Endpoint:         {}{}", self.base_url, if self.simulated { " (demo)" } else { "" })?;
        writeln!(f, "HTTP Timeout:     {}s", self.http_timeout.as_secs())?;
        writeln!(f, "Journal:          {}", self.database_url)?;
        write!(
            f,
            "Telegram:         {}",
            if self.telegram.is_some() { "enabled" } else { "disabled" }
        )
    }
}

fn required(key: &'static str, value: &Option<String>) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::Missing { key }),
    }
}

fn parse_decimal(key: &'static str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("'{}' is not a number: {}", value, e),
    })
}
