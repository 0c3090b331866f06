//! Runtime configuration for the sync engine.
//!
//! Supabase credentials are optional: without them the engine runs in pure
//! offline mode and keeps queuing mutations until a backend is configured.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const ENV_SUPABASE_URL: [&str; 2] = ["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
const ENV_SUPABASE_ANON_KEY: [&str; 2] = ["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"];
const ENV_SYNC_INTERVAL_SECS: &str = "EPI_SYNC_INTERVAL_SECS";
const ENV_REMOTE_TIMEOUT_SECS: &str = "EPI_REMOTE_TIMEOUT_SECS";

/// Default period of the background sync scheduler
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);
/// Default upper bound for a single remote call
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

/// Supabase project endpoint and public key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key
    pub anon_key: String,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::InvalidInput("Supabase URL must not be empty".into()))?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "Supabase URL must include http:// or https://".into(),
            ));
        }
        let anon_key = normalize_text_option(Some(anon_key.into()))
            .ok_or_else(|| Error::InvalidInput("Supabase anon key must not be empty".into()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for the sync engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote backend; `None` means offline-only mode
    pub supabase: Option<SupabaseConfig>,
    /// Period of the background scheduler
    pub sync_interval: Duration,
    /// Upper bound for each remote call
    pub remote_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            supabase: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns an offline configuration when no Supabase variable is set and
    /// an error when only one of URL / anon key is provided.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    /// Set the remote backend
    #[must_use]
    pub fn with_supabase(mut self, supabase: SupabaseConfig) -> Self {
        self.supabase = Some(supabase);
        self
    }

    /// Set the scheduler period
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Set the per-call remote timeout
    #[must_use]
    pub const fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Check if a remote backend is configured
    pub const fn is_configured(&self) -> bool {
        self.supabase.is_some()
    }
}

fn first_present(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| normalize_text_option(lookup(key)))
}

fn parse_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration> {
    let Some(raw) = normalize_text_option(lookup(key)) else {
        return Ok(default);
    };

    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::InvalidInput(format!(
            "{key} must be a positive number of seconds, got '{raw}'"
        ))),
        Ok(seconds) => Ok(Duration::from_secs(seconds)),
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<SyncConfig> {
    let url = first_present(&lookup, &ENV_SUPABASE_URL);
    let anon_key = first_present(&lookup, &ENV_SUPABASE_ANON_KEY);

    let supabase = match (url, anon_key) {
        (None, None) => None,
        (Some(url), Some(anon_key)) => Some(SupabaseConfig::new(url, anon_key)?),
        (Some(_), None) => {
            return Err(Error::InvalidInput(format!(
                "Supabase configuration is incomplete. Missing: {}",
                ENV_SUPABASE_ANON_KEY[0]
            )))
        }
        (None, Some(_)) => {
            return Err(Error::InvalidInput(format!(
                "Supabase configuration is incomplete. Missing: {}",
                ENV_SUPABASE_URL[0]
            )))
        }
    };

    Ok(SyncConfig {
        supabase,
        sync_interval: parse_seconds(&lookup, ENV_SYNC_INTERVAL_SECS, DEFAULT_SYNC_INTERVAL)?,
        remote_timeout: parse_seconds(&lookup, ENV_REMOTE_TIMEOUT_SECS, DEFAULT_REMOTE_TIMEOUT)?,
    })
}
