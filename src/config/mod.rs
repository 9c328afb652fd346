use serde::Deserialize;
use std::time::Duration;

/// Environment variable prefix for every setting below.
pub const ENV_PREFIX: &str = "ORCHESTRATOR_";

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Listening port (`ORCHESTRATOR_PORT`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind host (`ORCHESTRATOR_HOST`).
    #[serde(default = "default_host")]
    pub host: String,

    /// Upper bound on a single job run, in seconds (`ORCHESTRATOR_RUN_TIMEOUT_SECS`).
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

fn default_port() -> u16 {
    4300
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_run_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}
