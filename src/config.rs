// Configuration management for the WAN route audit
// Supports CLI arguments, config file (TOML), and environment variables

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::audit::SiteKey;
use crate::audit::metric::DEFAULT_ALLOWED_METRICS;
use crate::error::{AuditError, AuditResult};

/// WAN route audit - compare routing tables of devices sharing a site
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "wan-route-audit")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, env = "WRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "WRA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Where to write the JSON report
    #[arg(short, long, env = "WRA_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Allowed OSPF default-originate metrics, comma separated
    #[arg(long, value_delimiter = ',', env = "WRA_ALLOWED_METRICS")]
    pub allowed_metrics: Vec<u32>,

    /// Session log with captured show commands (repeatable)
    #[arg(long = "capture")]
    pub captures: Vec<PathBuf>,

    /// Write the report without indentation
    #[arg(long, env = "WRA_COMPACT")]
    pub compact: bool,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Audit policy settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Session logs to read device output from
    #[serde(default)]
    pub captures: Vec<PathBuf>,

    /// Device inventory
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// OSPF default-information-originate metrics considered standard
    #[serde(default = "default_allowed_metrics")]
    pub allowed_ospf_metrics: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Indent the JSON report
    #[serde(default = "default_true")]
    pub pretty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub country: String,
    pub site: String,

    /// File holding the device's `show ip route` / `show route` output.
    /// When absent the output is taken from a session capture.
    #[serde(default)]
    pub routes: Option<PathBuf>,

    /// File holding the device's running-config
    #[serde(default)]
    pub running_config: Option<PathBuf>,
}

impl DeviceConfig {
    pub fn site_key(&self) -> SiteKey {
        SiteKey::new(self.country.clone(), self.site.clone())
    }
}

// Default value functions
fn default_allowed_metrics() -> Vec<u32> {
    DEFAULT_ALLOWED_METRICS.to_vec()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_output_path() -> PathBuf {
    PathBuf::from("route-audit.json")
}
fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            allowed_ospf_metrics: default_allowed_metrics(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: default_output_path(),
            pretty: default_true(),
        }
    }
}

impl ConfigFile {
    /// Read a config file, resolving relative device and capture paths
    /// against the file's directory
    pub fn from_path(path: &Path) -> AuditResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config_file = toml::from_str::<ConfigFile>(&content)?;
        if let Some(base) = path.parent() {
            config_file.resolve_paths(base);
        }
        Ok(config_file)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.output.path = resolve(base, &self.output.path);
        for capture in &mut self.captures {
            *capture = resolve(base, capture);
        }
        for device in &mut self.devices {
            device.routes = device.routes.as_deref().map(|p| resolve(base, p));
            device.running_config = device.running_config.as_deref().map(|p| resolve(base, p));
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: Level,
    pub output_path: PathBuf,
    pub pretty: bool,
    pub allowed_metrics: Vec<u32>,
    pub captures: Vec<PathBuf>,
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args > Config file > Environment variables > Defaults
    pub fn load() -> AuditResult<Self> {
        let cli_args = CliArgs::parse();

        let config_file = match &cli_args.config {
            Some(config_path) => {
                tracing::info!("Loading configuration from: {}", config_path.display());
                ConfigFile::from_path(config_path)?
            }
            None => {
                // Try loading from default locations
                let default_paths = vec![
                    PathBuf::from("wan-route-audit.toml"),
                    PathBuf::from("config.toml"),
                ];

                let mut loaded_config = None;
                for path in default_paths {
                    if path.exists() {
                        tracing::info!("Loading configuration from: {}", path.display());
                        loaded_config = Some(ConfigFile::from_path(&path)?);
                        break;
                    }
                }

                loaded_config.unwrap_or_default()
            }
        };

        Config::merge(cli_args, config_file)
    }

    /// Merge configuration (CLI args override config file)
    pub fn merge(cli_args: CliArgs, config_file: ConfigFile) -> AuditResult<Self> {
        let level = cli_args
            .log_level
            .unwrap_or(config_file.logging.level);
        let log_level = parse_log_level(&level)?;

        let output_path = cli_args.output.unwrap_or(config_file.output.path);
        let pretty = !cli_args.compact && config_file.output.pretty;

        let allowed_metrics = if cli_args.allowed_metrics.is_empty() {
            config_file.audit.allowed_ospf_metrics
        } else {
            cli_args.allowed_metrics
        };

        let mut captures = config_file.captures;
        captures.extend(cli_args.captures);

        let mut names = std::collections::HashSet::new();
        for device in &config_file.devices {
            if !names.insert(device.name.as_str()) {
                return Err(AuditError::Inventory(format!(
                    "device {} is listed more than once",
                    device.name
                )));
            }
            if device.name.trim().is_empty()
                || device.country.trim().is_empty()
                || device.site.trim().is_empty()
            {
                return Err(AuditError::Inventory(format!(
                    "device entry {:?} is missing a name, country or site",
                    device.name
                )));
            }
        }

        Ok(Config {
            log_level,
            output_path,
            pretty,
            allowed_metrics,
            captures,
            devices: config_file.devices,
        })
    }
}

fn parse_log_level(level_str: &str) -> AuditResult<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(AuditError::Config(format!("Invalid log level: {}", level_str))),
    }
}
