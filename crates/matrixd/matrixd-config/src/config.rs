use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MatrixdConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::bus_path")]
    pub bus_path: PathBuf,
    #[serde(default = "defaults::device_address")]
    pub device_address: u16,
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "defaults::heartbeat_ms")]
    pub heartbeat_ms: u64,
    #[serde(default = "defaults::self_test")]
    pub self_test: bool,
    #[serde(default)]
    pub delivery: DeliveryMode,
    pub demo: Option<DemoConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    #[default]
    Blocking,
    DropWhenFull,
}

/// Built-in random frame producers and a logging subscriber, for running
/// the daemon without an external producer.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    #[serde(default = "defaults::demo_producers")]
    pub producers: usize,
    #[serde(default = "defaults::demo_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "defaults::demo_log_frames")]
    pub log_frames: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("queue_capacity must be at least 1")]
    ZeroQueue,

    #[error("heartbeat_ms must be at least 1")]
    ZeroHeartbeat,

    #[error("device_address {0:#x} is not a 7-bit i2c address")]
    BadAddress(u16),
}

mod defaults {
    use std::path::PathBuf;

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn bus_path() -> PathBuf {
        PathBuf::from("/dev/i2c-1")
    }

    pub fn device_address() -> u16 {
        0x46
    }

    pub fn queue_capacity() -> usize {
        3
    }

    pub fn heartbeat_ms() -> u64 {
        1_000
    }

    pub fn self_test() -> bool {
        true
    }

    pub fn demo_producers() -> usize {
        1
    }

    pub fn demo_interval_ms() -> u64 {
        1_100
    }

    pub fn demo_log_frames() -> bool {
        true
    }
}

impl Default for MatrixdConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            bus_path: defaults::bus_path(),
            device_address: defaults::device_address(),
            queue_capacity: defaults::queue_capacity(),
            heartbeat_ms: defaults::heartbeat_ms(),
            self_test: defaults::self_test(),
            delivery: DeliveryMode::default(),
            demo: None,
        }
    }
}

impl MatrixdConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: MatrixdConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueue);
        }
        if self.heartbeat_ms == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        if self.device_address > 0x7f {
            return Err(ConfigError::BadAddress(self.device_address));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = MatrixdConfig::parse("").unwrap();

        assert_eq!(config, MatrixdConfig::default());
        assert_eq!(config.device_address, 0x46);
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.heartbeat_ms, 1_000);
        assert_eq!(config.delivery, DeliveryMode::Blocking);
        assert!(config.demo.is_none());
    }

    #[test]
    fn full_file_overrides_everything() {
        let config = MatrixdConfig::parse(
            r#"
            log_level = "debug"
            bus_path = "/dev/i2c-0"
            device_address = 0x47
            queue_capacity = 8
            heartbeat_ms = 250
            self_test = false
            delivery = "drop_when_full"

            [demo]
            producers = 2
            interval_ms = 500
            log_frames = false
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.bus_path, PathBuf::from("/dev/i2c-0"));
        assert_eq!(config.device_address, 0x47);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.heartbeat_ms, 250);
        assert!(!config.self_test);
        assert_eq!(config.delivery, DeliveryMode::DropWhenFull);
        assert_eq!(
            config.demo,
            Some(DemoConfig {
                producers: 2,
                interval_ms: 500,
                log_frames: false,
            })
        );
    }

    #[test]
    fn demo_table_fills_its_own_defaults() {
        let config = MatrixdConfig::parse("[demo]").unwrap();
        let demo = config.demo.unwrap();

        assert_eq!(demo.producers, 1);
        assert_eq!(demo.interval_ms, 1_100);
        assert!(demo.log_frames);
    }

    #[test]
    fn zero_queue_is_rejected() {
        let err = MatrixdConfig::parse("queue_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroQueue));
    }

    #[test]
    fn zero_heartbeat_is_rejected() {
        // A zero-period ticker is always ready and would spin the control loop.
        let err = MatrixdConfig::parse("heartbeat_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroHeartbeat));

        assert_eq!(MatrixdConfig::parse("heartbeat_ms = 1").unwrap().heartbeat_ms, 1);
    }

    #[test]
    fn wide_address_is_rejected() {
        let err = MatrixdConfig::parse("device_address = 0x146").unwrap_err();
        assert!(matches!(err, ConfigError::BadAddress(0x146)));
    }

    #[test]
    fn unknown_keys_and_bad_values_fail_to_parse() {
        assert!(matches!(
            MatrixdConfig::parse("colour_space = \"srgb\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            MatrixdConfig::parse("delivery = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = MatrixdConfig::load("/nonexistent/matrixd.toml").unwrap_err();
        assert_eq!(err.to_string(), "failed to read '/nonexistent/matrixd.toml'");
    }
}
