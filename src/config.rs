use std::str::FromStr;

use chrono::Duration;

use crate::errors::{Result, RollCallError};

pub const DEFAULT_DB_PATH: &str = "data/roll_call.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;
pub const DEFAULT_CORRECTION_WINDOW_MINUTES: i64 = 10;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: String,
    pub pool_size: u32,
    pub manager: ManagerConfig,
    pub seed_demo: bool,
}

/// Knobs consumed by the roll-call manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Zero disables the absent -> late correction path.
    pub correction_window: Duration,
    /// Close a session as soon as no record is left `not-called`.
    pub auto_close: bool,
    /// Fixed seed for the random selection strategy.
    pub rng_seed: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            correction_window: Duration::minutes(DEFAULT_CORRECTION_WINDOW_MINUTES),
            auto_close: true,
            rng_seed: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            manager: ManagerConfig::default(),
            seed_demo: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; the process environment still applies.
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let db_path = lookup("ROLLCALL_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.db_path);

        let pool_size = parse_or("ROLLCALL_POOL_SIZE", &lookup, defaults.pool_size)?;
        if pool_size == 0 {
            return Err(RollCallError::Config(
                "ROLLCALL_POOL_SIZE must be at least 1".to_string(),
            ));
        }

        let window_minutes = parse_or(
            "ROLLCALL_CORRECTION_WINDOW_MINUTES",
            &lookup,
            DEFAULT_CORRECTION_WINDOW_MINUTES,
        )?;
        if window_minutes < 0 {
            return Err(RollCallError::Config(format!(
                "ROLLCALL_CORRECTION_WINDOW_MINUTES must not be negative, got {window_minutes}"
            )));
        }

        let auto_close = parse_bool("ROLLCALL_AUTO_CLOSE", &lookup, true)?;
        let seed_demo = parse_bool("ROLLCALL_SEED_DEMO", &lookup, false)?;
        let rng_seed = match lookup("ROLLCALL_RNG_SEED") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_value("ROLLCALL_RNG_SEED", &raw)?),
            _ => None,
        };

        Ok(Settings {
            db_path,
            pool_size,
            manager: ManagerConfig {
                correction_window: Duration::minutes(window_minutes),
                auto_close,
                rng_seed,
            },
            seed_demo,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RollCallError::Config(format!("{key}: cannot parse {raw:?}")))
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => parse_value(key, &raw),
        _ => Ok(default),
    }
}

fn parse_bool<F>(key: &str, lookup: &F, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(RollCallError::Config(format!("{key}: expected a boolean, got {v:?}"))),
        },
    }
}
