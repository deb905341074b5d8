use crate::error::ConfigError;
use aixmon_collector::CollectorOptions;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// One of `debug`, `info`, `warn`, `error`; anything else logs errors only.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Address the exposition endpoints listen on.
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    pub remote_write_url: String,
    #[serde(default)]
    pub remote_write_user: String,
    #[serde(default)]
    pub remote_write_password: String,
    /// Scrape URL override; defaults to this agent's own `/metrics`.
    pub scrape_target: Option<String>,
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_secs: u64,
    #[serde(default = "default_send_interval")]
    pub send_interval_secs: u64,
    /// Pause after a recoverable delivery failure.
    #[serde(default = "default_retry_wait")]
    pub retry_wait_secs: u64,
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub retry_on_rate_limit: bool,
    #[serde(default = "default_true")]
    pub collect_cpu: bool,
    #[serde(default = "default_true")]
    pub collect_mem: bool,
    #[serde(default = "default_true")]
    pub collect_disk: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_scrape_interval() -> u64 {
    10
}

fn default_send_interval() -> u64 {
    5
}

fn default_retry_wait() -> u64 {
    5
}

fn default_remote_timeout() -> u64 {
    20
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.remote_url()?;

        for (field, secs) in [
            ("scrape_interval_secs", self.scrape_interval_secs),
            ("send_interval_secs", self.send_interval_secs),
            ("remote_timeout_secs", self.remote_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Parsed remote write endpoint; only `http` and `https` are accepted.
    pub fn remote_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.remote_write_url.trim()).map_err(|e| ConfigError::Invalid {
            field: "remote_write_url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "remote_write_url",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    pub fn scrape_url(&self) -> String {
        match &self.scrape_target {
            Some(target) => target.trim().to_string(),
            None => format!("http://{}/metrics", self.listen_address.trim()),
        }
    }

    /// Tracing filter directive for the configured log level.
    pub fn log_directive(&self) -> String {
        let level = match self.log_level.trim().to_ascii_lowercase().as_str() {
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            _ => "error",
        };
        format!("aixmon={level}")
    }

    pub fn collector_options(&self) -> CollectorOptions {
        CollectorOptions {
            cpu: self.collect_cpu,
            memory: self.collect_mem,
            disk: self.collect_disk,
        }
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_secs)
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(self.send_interval_secs)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}
