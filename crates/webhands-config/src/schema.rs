//! Configuration schema definitions.
//!
//! Every section and field is optional; missing values take the defaults
//! below.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// `~/.webhands/<name>`, or `./.webhands/<name>` without a home directory.
pub fn webhands_dir(name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".webhands")
        .join(name)
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub dom: DomConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chrome connection and launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default)]
    pub headless: bool,

    /// Persistent profile; defaults to `~/.webhands/browser-profile`.
    #[serde(default)]
    pub profile_dir: Option<PathBuf>,

    /// Chrome executable; discovered when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// JSON cookie jar loaded on start and written on close.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: false,
            profile_dir: None,
            chrome_path: None,
            cookies_file: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl BrowserConfig {
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir
            .clone()
            .unwrap_or_else(|| webhands_dir("browser-profile"))
    }

    /// HTTP endpoint of the DevTools server.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

/// Snapshot and observer options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub highlight_elements: bool,

    /// Pixels beyond the viewport still indexed; `-1` indexes the whole page.
    #[serde(default = "default_viewport_expansion")]
    pub viewport_expansion: i64,

    #[serde(default)]
    pub include_shadow_roots: bool,

    #[serde(default = "default_find_timeout_ms")]
    pub find_timeout_ms: u64,
}

impl Default for DomConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            highlight_elements: true,
            viewport_expansion: default_viewport_expansion(),
            include_shadow_roots: false,
            find_timeout_ms: default_find_timeout_ms(),
        }
    }
}

impl DomConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn find_timeout(&self) -> Duration {
        Duration::from_millis(self.find_timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_viewport_expansion() -> i64 {
    500
}

fn default_find_timeout_ms() -> u64 {
    5000
}

/// Index lookup retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ResolverConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// Action pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_wait_between_actions_ms")]
    pub wait_between_actions_ms: u64,

    #[serde(default = "default_minimum_wait_page_load_ms")]
    pub minimum_wait_page_load_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wait_between_actions_ms: default_wait_between_actions_ms(),
            minimum_wait_page_load_ms: default_minimum_wait_page_load_ms(),
        }
    }
}

impl AgentConfig {
    pub fn wait_between_actions(&self) -> Duration {
        Duration::from_millis(self.wait_between_actions_ms)
    }

    pub fn minimum_wait_page_load(&self) -> Duration {
        Duration::from_millis(self.minimum_wait_page_load_ms)
    }
}

fn default_wait_between_actions_ms() -> u64 {
    500
}

fn default_minimum_wait_page_load_ms() -> u64 {
    250
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Defaults to `~/.webhands/logs`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| webhands_dir("logs"))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
