//! Layered application configuration.
//!
//! Resolution order, later layers winning: built-in defaults, a TOML file
//! (`scand.toml`, overridable via `SCAND_CONFIG`), `SCAND_*` environment
//! variables (`__` separates nesting, e.g. `SCAND_RATE_LIMIT__REQUESTS`),
//! and finally CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub scanning: ScanningConfig,
    pub tools: ToolPaths,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "scand.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Maximum submissions per identifier inside one window.
    pub requests: u32,
    pub window_secs: u64,
    /// Redis URL for counters shared across instances. Without one the
    /// counters are process-local.
    pub redis_url: Option<String>,
    pub key_prefix: String,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_secs: 900,
            redis_url: None,
            key_prefix: "ratelimit".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Simulated work time when a tool binary is missing and a mock
    /// result is produced instead.
    pub mock_delay_ms: u64,
    /// Cap on concurrently running scans. Unset means unbounded, matching
    /// the submission-rate-only backpressure model.
    pub max_concurrent: Option<usize>,
    /// Deadline for a single tool run. Unset means the tool runs to
    /// completion.
    pub tool_timeout_secs: Option<u64>,
    pub default_ports: String,
    pub default_wordlist: String,
}

impl ScanningConfig {
    pub fn mock_delay(&self) -> Duration {
        Duration::from_millis(self.mock_delay_ms)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            mock_delay_ms: 2000,
            max_concurrent: None,
            tool_timeout_secs: None,
            default_ports: "1-1000".to_string(),
            default_wordlist: "/usr/share/wordlists/dirb/common.txt".to_string(),
        }
    }
}

/// Where each scanning tool lives. A path that does not exist on this
/// host makes the matching invoker fall back to mock output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub nmap: PathBuf,
    pub nikto: PathBuf,
    pub gobuster: PathBuf,
    pub sqlmap: PathBuf,
    pub wpscan: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            nmap: PathBuf::from("/usr/bin/nmap"),
            nikto: PathBuf::from("/usr/bin/nikto"),
            gobuster: PathBuf::from("/usr/local/bin/gobuster"),
            sqlmap: PathBuf::from("/usr/bin/sqlmap"),
            wpscan: PathBuf::from("/usr/bin/wpscan"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
}

/// CLI overrides for `serve`, applied on top of file and env config.
#[derive(Debug, Default, clap::Args)]
pub struct ServeOverrides {
    /// Address to bind the HTTP API on.
    #[arg(long)]
    pub bind: Option<String>,

    /// Path to the SQLite scan database.
    #[arg(long)]
    pub database: Option<String>,

    /// Redis URL for shared admission counters.
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Maximum submissions per identifier per window.
    #[arg(long)]
    pub rate_limit_requests: Option<u32>,

    /// Admission window length in seconds.
    #[arg(long)]
    pub rate_limit_window_secs: Option<u64>,

    /// Cap on concurrently running scans.
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    #[arg(long)]
    pub verbose: Option<bool>,

    #[arg(long)]
    pub json_logs: Option<bool>,
}

impl AppConfig {
    pub fn new(cli: Option<&ServeOverrides>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_path()))
            .merge(Env::prefixed("SCAND_").split("__"));

        let mut config: Self = figment.extract().context("invalid configuration")?;
        if let Some(cli) = cli {
            config.apply(cli);
        }
        Ok(config)
    }

    fn apply(&mut self, cli: &ServeOverrides) {
        if let Some(bind) = &cli.bind {
            self.server.bind = bind.clone();
        }
        if let Some(database) = &cli.database {
            self.database.path = database.clone();
        }
        if let Some(redis_url) = &cli.redis_url {
            self.rate_limit.redis_url = Some(redis_url.clone());
        }
        if let Some(requests) = cli.rate_limit_requests {
            self.rate_limit.requests = requests;
        }
        if let Some(window_secs) = cli.rate_limit_window_secs {
            self.rate_limit.window_secs = window_secs;
        }
        if let Some(max_concurrent) = cli.max_concurrent {
            self.scanning.max_concurrent = Some(max_concurrent);
        }
        if let Some(verbose) = cli.verbose {
            self.logging.verbose = verbose;
        }
        if let Some(json) = cli.json_logs {
            self.logging.json = json;
        }
    }
}

fn config_path() -> String {
    std::env::var("SCAND_CONFIG").unwrap_or_else(|_| "scand.toml".to_string())
}
