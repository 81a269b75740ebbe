use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::retry::RetryPolicy;
use crate::session::{LaunchProfile, PageProfile, SessionTimeouts};

pub const DEFAULT_BASE_URL: &str = "https://www.koreabaseball.com";

/// Desktop browser identity shared by static requests and browser pages.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.8,en-US;q=0.5,en;q=0.3";

/// Crawler settings.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Site origin; also the `source` stamped on every envelope.
    pub base_url: String,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub http_timeout: Duration,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub retry: RetryPolicy,
    /// Pause between consecutive dates of a range crawl.
    pub range_pause: Duration,
    pub chrome_executable: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            http_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            selector_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            range_pause: Duration::from_secs(1),
            chrome_executable: None,
        }
    }
}

impl CrawlerConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// - `KBO_BASE_URL`, `KBO_USER_AGENT`
    /// - `KBO_HTTP_TIMEOUT_SECS`, `KBO_NAVIGATION_TIMEOUT_SECS`, `KBO_SELECTOR_TIMEOUT_SECS`
    /// - `KBO_MAX_ATTEMPTS` (at least 1), `KBO_RETRY_DELAY_MS`
    /// - `KBO_RANGE_PAUSE_MS`
    /// - `CHROME_BIN`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("KBO_BASE_URL") {
            url::Url::parse(&url).map_err(|e| {
                AppError::ConfigError(format!("Invalid KBO_BASE_URL '{url}': {e}"))
            })?;
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ua) = lookup("KBO_USER_AGENT") {
            config.user_agent = ua;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "KBO_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "KBO_NAVIGATION_TIMEOUT_SECS")? {
            config.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "KBO_SELECTOR_TIMEOUT_SECS")? {
            config.selector_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "KBO_MAX_ATTEMPTS")? {
            if attempts == 0 {
                return Err(AppError::ConfigError(
                    "KBO_MAX_ATTEMPTS must be at least 1".into(),
                ));
            }
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "KBO_RETRY_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "KBO_RANGE_PAUSE_MS")? {
            config.range_pause = Duration::from_millis(ms);
        }
        if let Some(bin) = lookup("CHROME_BIN") {
            config.chrome_executable = Some(PathBuf::from(bin));
        }

        Ok(config)
    }

    pub fn launch_profile(&self) -> LaunchProfile {
        LaunchProfile {
            executable: self.chrome_executable.clone(),
            ..LaunchProfile::default()
        }
    }

    pub fn page_profile(&self) -> PageProfile {
        PageProfile::new(self.user_agent.clone())
    }

    pub fn session_timeouts(&self) -> SessionTimeouts {
        SessionTimeouts {
            navigation: self.navigation_timeout,
            selector: self.selector_timeout,
        }
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {key} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}
