use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FoodcrawlError, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.dine4fit.com";
pub const DEFAULT_LANG: &str = "ru";
pub const DEFAULT_INPUT: &str = "data-0.json";
pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_QUEUE_FACTOR: usize = 2;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Harvester configuration loaded from environment variables.
/// The binary's command-line flags override individual fields afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    // Detail endpoint
    pub base_url: String,
    pub lang: String,
    pub access_key: String,
    pub request_timeout: Duration,

    // Input / output
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub cache_snapshot: Option<PathBuf>,

    // Pipeline
    pub batch_size: usize,
    pub worker_count: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub queue_factor: usize,
    pub deadline: Option<Duration>,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys take defaults,
    /// except `DINE4FIT_PID`, which is required.
    ///
    /// Values are parsed but not range-checked; call [`Config::validate`]
    /// once every override has been applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key = lookup("DINE4FIT_PID")
            .filter(|v| !v.trim().is_empty())
            .ok_or(FoodcrawlError::MissingSetting("DINE4FIT_PID"))?;

        let inputs = lookup("FOODCRAWL_INPUTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(PathBuf::from)
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![PathBuf::from(DEFAULT_INPUT)]);

        let deadline_secs: Option<u64> = optional_parsed(&lookup, "FOODCRAWL_DEADLINE_SECS")?;

        Ok(Self {
            base_url: lookup("DINE4FIT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            lang: lookup("DINE4FIT_LANG").unwrap_or_else(|| DEFAULT_LANG.to_string()),
            access_key,
            request_timeout: Duration::from_secs(parsed_or(
                &lookup,
                "FOODCRAWL_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            inputs,
            output_dir: lookup("FOODCRAWL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            cache_snapshot: lookup("FOODCRAWL_CACHE_SNAPSHOT").map(PathBuf::from),
            batch_size: parsed_or(&lookup, "FOODCRAWL_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            worker_count: parsed_or(&lookup, "FOODCRAWL_WORKERS", DEFAULT_WORKERS)?,
            max_attempts: parsed_or(&lookup, "FOODCRAWL_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            backoff_base: Duration::from_millis(parsed_or(
                &lookup,
                "FOODCRAWL_BACKOFF_MS",
                DEFAULT_BACKOFF_MS,
            )?),
            queue_factor: parsed_or(&lookup, "FOODCRAWL_QUEUE_FACTOR", DEFAULT_QUEUE_FACTOR)?,
            deadline: deadline_secs.map(Duration::from_secs),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("batch_size", self.batch_size),
            ("worker_count", self.worker_count),
            ("max_attempts", self.max_attempts as usize),
            ("queue_factor", self.queue_factor),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(FoodcrawlError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.inputs.is_empty() {
            return Err(FoodcrawlError::Config("at least one input feed is required".into()));
        }
        Ok(())
    }

    /// Log the effective configuration with the access key redacted.
    pub fn log_redacted(&self) {
        let key_preview = format!(
            "{}...({} chars)",
            self.access_key.chars().take(2).collect::<String>(),
            self.access_key.chars().count()
        );

        tracing::info!("Config loaded:");
        tracing::info!("  DINE4FIT_BASE_URL: {}", self.base_url);
        tracing::info!("  DINE4FIT_LANG: {}", self.lang);
        tracing::info!("  DINE4FIT_PID: {}", key_preview);
        tracing::info!(
            inputs = self.inputs.len(),
            output_dir = %self.output_dir.display(),
            batch_size = self.batch_size,
            workers = self.worker_count,
            max_attempts = self.max_attempts,
            backoff_ms = self.backoff_base.as_millis() as u64,
            queue_factor = self.queue_factor,
            "  Pipeline settings"
        );
    }
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(optional_parsed(lookup, key)?.unwrap_or(default))
}

fn optional_parsed<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FoodcrawlError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}
