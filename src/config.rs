use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Secondary API host used once the primary API is considered unreachable.
pub const FALLBACK_API_URL: &str = "https://dd8e7oi3be60r.cloudfront.net";

const THIRTY_SECONDS_MS: u64 = 30_000;

/// Runtime configuration. This file should never contain secrets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix for every API request. Empty means same origin.
    pub url: String,
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries of a failing request; total attempts are one greater.
    #[serde(default = "default_request_retries")]
    pub request_retries: u32,
    /// Extra key resolution attempts made against the fallback host.
    #[serde(default = "default_fallback_attempts")]
    pub fallback_attempts: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub min_delay_ms: u64,
    pub factor: u32,
    /// Upper bound of a single backoff delay. Defaults to the request timeout.
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub collection_ratio: f64,
    /// Mail providers whose users may be asked for creative feedback.
    pub domains: Vec<String>,
    /// Local part that always collects feedback, for manual testing.
    pub always_collect: String,
    /// Local part that never collects feedback, for manual testing.
    pub never_collect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// ISO country codes the backend can sanitise.
    pub accepted_country_codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_fallback_url() -> String {
    FALLBACK_API_URL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    THIRTY_SECONDS_MS
}

fn default_request_retries() -> u32 {
    2
}

fn default_fallback_attempts() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("optout-landing/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            fallback_url: default_fallback_url(),
            request_timeout_ms: default_request_timeout_ms(),
            request_retries: default_request_retries(),
            fallback_attempts: default_fallback_attempts(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            factor: 10,
            max_delay_ms: None,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            collection_ratio: 0.4,
            domains: ["yahoo", "gmail", "hotmail", "live", "aol", "optestmo"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            always_collect: "testclb".to_string(),
            never_collect: "testnotclb".to_string(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            accepted_country_codes: vec!["US".to_string(), "GB".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
            feedback: FeedbackConfig::default(),
            sms: SmsConfig::default(),
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Preset for a deployment target (`development`, `staging`, `production`).
    pub fn for_target_env(target: &str) -> Self {
        let mut config = Self::default();
        config.api.url = match target {
            "staging" => normalize_api_url("//api.optoutdomain.optizmo.reviews"),
            "production" => normalize_api_url("//api.optoutsystem.com"),
            // development proxies through the local origin
            _ => String::new(),
        };
        config
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(
            self.retry
                .max_delay_ms
                .unwrap_or(self.api.request_timeout_ms),
        )
    }
}

/// Protocol-relative hosts have no scheme outside a browser.
pub fn normalize_api_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        trimmed.to_string()
    }
}
