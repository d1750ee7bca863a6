use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    pub mongo: Mongo,
    #[serde(default)]
    pub jobs: Jobs,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Deserialize)]
pub struct Mongo {
    pub url: String,
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_database() -> String {
    "matchstats".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jobs {
    /// Attempt budget for jobs whose payload does not set one
    #[serde(default = "default_attempts")]
    pub default_attempts: u32,
    /// Base delay of the exponential backoff between attempts
    #[serde(default = "default_backoff_delay_secs")]
    pub backoff_delay_secs: u64,
    /// How often the Mongo-backed queue re-reads a watched job
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_attempts() -> u32 {
    15
}

fn default_backoff_delay_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    2
}

impl Default for Jobs {
    fn default() -> Self {
        Self {
            default_attempts: default_attempts(),
            backoff_delay_secs: default_backoff_delay_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl Jobs {
    pub fn backoff_delay(&self) -> Duration {
        Duration::from_secs(self.backoff_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
