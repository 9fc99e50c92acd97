use std::env;
use std::str::FromStr;

use tracing::info;

use crate::error::JobwatchError;

/// Which parts of the projection a reducer maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerConfig {
    /// Keep a minion table fed by `grains.items` results.
    pub track_grains: bool,
    /// Mark jobs complete once every minion succeeded. Also makes pending
    /// minion entries start out as `{"success": false}`.
    pub track_completion: bool,
    /// Evict the oldest jobs beyond this many. `None` keeps every job for the
    /// lifetime of the reducer.
    pub max_jobs: Option<usize>,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            track_grains: true,
            track_completion: true,
            max_jobs: None,
        }
    }
}

impl ReducerConfig {
    /// Jobs only: no grains, no completion tracking, no bound.
    pub fn jobs_only() -> Self {
        Self {
            track_grains: false,
            track_completion: false,
            max_jobs: None,
        }
    }

    pub fn with_track_grains(mut self, on: bool) -> Self {
        self.track_grains = on;
        self
    }

    pub fn with_track_completion(mut self, on: bool) -> Self {
        self.track_completion = on;
        self
    }

    pub fn with_max_jobs(mut self, max: usize) -> Self {
        self.max_jobs = Some(max);
        self
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Event feed: `host:port` to read from, stdin when unset
    pub event_source: Option<String>,
    pub event_buffer: usize,

    pub reducer: ReducerConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, JobwatchError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Unset keys take their
    /// defaults; set keys that fail to parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, JobwatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reducer = ReducerConfig {
            track_grains: parse_bool(&lookup, "JOBWATCH_TRACK_GRAINS", true)?,
            track_completion: parse_bool(&lookup, "JOBWATCH_TRACK_COMPLETION", true)?,
            max_jobs: parse_optional(&lookup, "JOBWATCH_MAX_JOBS")?,
        };

        if reducer.max_jobs == Some(0) {
            return Err(JobwatchError::Config(
                "JOBWATCH_MAX_JOBS must be at least 1".to_string(),
            ));
        }

        let event_buffer = parse_or(&lookup, "JOBWATCH_EVENT_BUFFER", 1024)?;
        if event_buffer == 0 {
            return Err(JobwatchError::Config(
                "JOBWATCH_EVENT_BUFFER must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            web_host: lookup("JOBWATCH_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_or(&lookup, "JOBWATCH_PORT", 8000)?,
            event_source: lookup("JOBWATCH_EVENT_SOURCE").filter(|s| !s.trim().is_empty()),
            event_buffer,
            reducer,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }

    pub fn log_summary(&self) {
        info!(
            addr = %self.bind_addr(),
            event_source = self.event_source.as_deref().unwrap_or("stdin"),
            event_buffer = self.event_buffer,
            track_grains = self.reducer.track_grains,
            track_completion = self.reducer.track_completion,
            max_jobs = ?self.reducer.max_jobs,
            "Loaded config"
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, JobwatchError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, JobwatchError>
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
            .map_err(|_| JobwatchError::Config(format!("{key} has an invalid value: {raw:?}"))),
    }
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, JobwatchError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(JobwatchError::Config(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}
