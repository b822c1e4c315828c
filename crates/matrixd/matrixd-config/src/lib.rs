mod config;

pub use config::{ConfigError, DeliveryMode, DemoConfig, MatrixdConfig};
