//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `hub.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides (API_URL, PORT).
//!
//! structure:
//!     - SourceConfig: Where readings are pulled from, and how long to wait.
//!     - ServerConfig: Bind address for the REST surface.
//!     - PollingConfig: Whether/how often the hub pulls on its own.
//!     - LoggingConfig: Default tracing filter (RUST_LOG wins if set).
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "default_api_url";
pub const DEFAULT_PORT: u16 = 5000;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    pub source: SourceConfig,
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub api_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.to_string(), timeout_seconds: 10 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: DEFAULT_PORT }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { enabled: true, interval_seconds: 300 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl HubConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let config: HubConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))?;

        Ok(config)
    }

    /// Load with default fallback, then apply env overrides
    ///
    /// runs before the tracing subscriber exists, so it reports on stdout
    pub fn load_or_default() -> Self {
        let paths = [
            std::path::PathBuf::from("config").join("hub.toml"),
            std::path::PathBuf::from("..").join("config").join("hub.toml"),
        ];

        let mut config = None;
        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(c) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        config = Some(c);
                        break;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        let mut config = config.unwrap_or_else(|| {
            println!("[CONFIG] No config file found - using defaults");
            Self::default()
        });
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// overlay `API_URL` / `PORT`; `lookup` is injectable for tests
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("API_URL").filter(|u| !u.trim().is_empty()) {
            self.source.api_url = url;
        }
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => println!("[CONFIG] Warning: ignoring invalid PORT {:?}", port),
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│            HUB CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Source: {}", self.source.api_url);
        println!("│ Listen: {}", self.bind_addr());
        if self.polling.enabled {
            println!("│ Poll Interval: {}s", self.polling.interval_seconds);
        } else {
            println!("│ Polling: disabled (use /update_data)");
        }
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
