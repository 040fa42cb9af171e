//! Configuration loading and typed config structures for Lifecast.
//!
//! The configuration lives in `lifecast-config.yaml` next to the binary's
//! working directory. Every field has a default, so an empty or missing
//! file yields a runnable 256x256 world served on port 8080.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an unusable setup.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Lifecast configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LifecastConfig {
    /// Listen address and static assets.
    #[serde(default)]
    pub server: ServerSettings,

    /// Plane dimensions.
    #[serde(default)]
    pub grid: GridConfig,

    /// Initial population.
    #[serde(default)]
    pub seed: SeedConfig,

    /// Loop cadence and queue timeouts.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LifecastConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listen address:
    /// - `LIFECAST_HOST` overrides `server.host`
    /// - `LIFECAST_PORT` overrides `server.port` (ignored if not a port)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty map.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.server.apply_env_overrides();
        Ok(config)
    }

    /// Reject configurations the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero grid dimensions, any zero
    /// interval, or a snapshot offer that is not shorter than the snapshot
    /// interval. Deliveries run off-loop, so overlapping ones could hand a
    /// session an older snapshot after a newer one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid.width, self.grid.height
            )));
        }
        let intervals = [
            ("tick_interval_ms", self.timing.tick_interval_ms),
            ("snapshot_interval_ms", self.timing.snapshot_interval_ms),
            ("inbound_offer_ms", self.timing.inbound_offer_ms),
            ("snapshot_offer_ms", self.timing.snapshot_offer_ms),
            ("command_offer_ms", self.timing.command_offer_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::Invalid(format!("timing.{name} must be positive")));
        }
        if self.timing.snapshot_offer_ms >= self.timing.snapshot_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "timing.snapshot_offer_ms ({}) must be less than timing.snapshot_interval_ms ({})",
                self.timing.snapshot_offer_ms, self.timing.snapshot_interval_ms
            )));
        }
        Ok(())
    }
}

/// Listen address and static asset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every path that is not an API route.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl ServerSettings {
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LIFECAST_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("LIFECAST_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.port = port;
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Plane dimensions. Both axes wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_extent")]
    pub width: u32,

    /// Number of rows.
    #[serde(default = "default_extent")]
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_extent(),
            height: default_extent(),
        }
    }
}

/// Initial random population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    /// Upper bound on cells brought to life at startup.
    #[serde(default = "default_seed_cell_count")]
    pub cell_count: usize,

    /// Side of the square, anchored at the origin, that seeds land in.
    #[serde(default = "default_seed_spread")]
    pub spread: u32,

    /// Fixed RNG seed. When absent the seed is taken from the clock.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            cell_count: default_seed_cell_count(),
            spread: default_seed_spread(),
            rng_seed: None,
        }
    }
}

/// Loop cadence and queue timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Time between generations.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Idle time after which a session asks for a snapshot.
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    /// How long a session's reader waits to hand off an inbound message.
    #[serde(default = "default_inbound_offer_ms")]
    pub inbound_offer_ms: u64,

    /// How long the loop's delivery waits on a session's outbound queue.
    #[serde(default = "default_snapshot_offer_ms")]
    pub snapshot_offer_ms: u64,

    /// How long a producer waits on a full command stream.
    #[serde(default = "default_command_offer_ms")]
    pub command_offer_ms: u64,
}

impl TimingConfig {
    /// [`Self::tick_interval_ms`] as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// [`Self::snapshot_interval_ms`] as a [`Duration`].
    pub const fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }

    /// [`Self::inbound_offer_ms`] as a [`Duration`].
    pub const fn inbound_offer(&self) -> Duration {
        Duration::from_millis(self.inbound_offer_ms)
    }

    /// [`Self::snapshot_offer_ms`] as a [`Duration`].
    pub const fn snapshot_offer(&self) -> Duration {
        Duration::from_millis(self.snapshot_offer_ms)
    }

    /// [`Self::command_offer_ms`] as a [`Duration`].
    pub const fn command_offer(&self) -> Duration {
        Duration::from_millis(self.command_offer_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            inbound_offer_ms: default_inbound_offer_ms(),
            snapshot_offer_ms: default_snapshot_offer_ms(),
            command_offer_ms: default_command_offer_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "static".to_owned()
}

const fn default_extent() -> u32 {
    256
}

const fn default_seed_cell_count() -> usize {
    100
}

const fn default_seed_spread() -> u32 {
    100
}

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_snapshot_interval_ms() -> u64 {
    100
}

const fn default_inbound_offer_ms() -> u64 {
    100
}

const fn default_snapshot_offer_ms() -> u64 {
    50
}

const fn default_command_offer_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LifecastConfig::default();
        assert_eq!(config.grid.width, 256);
        assert_eq!(config.grid.height, 256);
        assert_eq!(config.seed.cell_count, 100);
        assert_eq!(config.seed.spread, 100);
        assert_eq!(config.timing.tick_interval_ms, 50);
        assert_eq!(config.timing.snapshot_interval_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  static_dir: "public"

grid:
  width: 64
  height: 32

seed:
  cell_count: 500
  spread: 40
  rng_seed: 9

timing:
  tick_interval_ms: 20
  snapshot_interval_ms: 200
  inbound_offer_ms: 10
  snapshot_offer_ms: 15
  command_offer_ms: 25

logging:
  level: "debug"
"#;

        let config = LifecastConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.static_dir, "public");
        assert_eq!(config.grid.width, 64);
        assert_eq!(config.grid.height, 32);
        assert_eq!(config.seed.rng_seed, Some(9));
        assert_eq!(config.timing.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.timing.command_offer(), Duration::from_millis(25));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = LifecastConfig::parse("grid:\n  width: 12\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.grid.width, 12);
        // Everything else uses defaults
        assert_eq!(config.grid.height, 256);
        assert_eq!(config.timing.snapshot_offer_ms, 50);
        assert!(config.seed.rng_seed.is_none());
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(LifecastConfig::parse("").is_ok());
    }

    #[test]
    fn parse_rejects_bad_yaml() {
        let result = LifecastConfig::parse("grid: [1, 2");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let mut config = LifecastConfig::default();
        config.grid.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut config = LifecastConfig::default();
        config.timing.snapshot_offer_ms = 0;
        let err = config.validate();
        assert!(
            matches!(&err, Err(ConfigError::Invalid(msg)) if msg.contains("snapshot_offer_ms")),
            "{err:?}"
        );
    }

    #[test]
    fn validate_rejects_snapshot_offer_not_below_interval() {
        let mut config = LifecastConfig::default();
        config.timing.snapshot_interval_ms = 40;
        config.timing.snapshot_offer_ms = 40;
        let err = config.validate();
        assert!(
            matches!(&err, Err(ConfigError::Invalid(msg)) if msg.contains("snapshot_interval_ms")),
            "{err:?}"
        );

        config.timing.snapshot_offer_ms = 39;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = LifecastConfig::from_file(Path::new("does-not-exist/lifecast-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
