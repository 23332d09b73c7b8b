//! Configuration management for SmartCharge
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Defaults mirror the station's factory
//! calibration and timing values.

use crate::error::{Result, StationError};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Station identity
    pub station: StationConfig,

    /// Cloud telemetry endpoint configuration
    pub api: ApiConfig,

    /// MQTT broker configuration
    pub mqtt: MqttConfig,

    /// Current sensor calibration
    pub sensor: SensorConfig,

    /// Safety thresholds
    pub safety: SafetyConfig,

    /// Solar charge controller (Modbus) configuration
    pub solar: SolarConfig,

    /// Scheduling cadences for the fast and slow paths
    pub timing: TimingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Station identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Database station ID used in the telemetry endpoint path
    pub id: u32,
}

/// Cloud telemetry endpoint parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `https://smartcharge.example.com`
    pub base_url: String,

    /// Shared secret sent as the `x-api-key` header
    pub api_key: String,

    /// Whether the telemetry reporter runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// MQTT broker parameters and topic layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: String,

    /// Broker TCP port
    pub port: u16,

    /// Client ID used on connect
    pub client_id: String,

    /// Topic for periodic state snapshots (publish)
    pub state_topic: String,

    /// Topic for inbound ON/OFF commands (subscribe)
    pub command_topic: String,

    /// Topic for retained online/offline availability (publish + last will)
    pub availability_topic: String,

    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,

    /// Whether the bridge runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// ACS712-style current sensor calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Sensor output voltage at 0 A
    pub zero_voltage: f32,

    /// Sensitivity in V/A
    pub sensitivity: f32,

    /// ADC reference voltage
    pub vref: f32,

    /// ADC full-scale count (12-bit: 4095)
    pub adc_resolution: f32,

    /// Samples averaged per reading
    pub oversample: u32,

    /// Magnitudes below this clamp to zero (A)
    pub noise_floor: f32,
}

/// Safety thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Cooling trigger threshold in amperes (strict greater-than)
    pub current_limit: f32,

    /// Consecutive over-limit ticks before the fault latch trips.
    /// 0 disables the latch.
    pub fault_latch_ticks: u32,
}

/// Solar charge controller connection and register layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarConfig {
    /// Modbus gateway hostname or IP
    pub host: String,

    /// Modbus gateway TCP port
    pub port: u16,

    /// Modbus slave ID of the charge controller
    pub slave_id: u8,

    /// Base address of the realtime input register block (0x3100)
    pub register_base: u16,

    /// Poll period in milliseconds
    pub poll_interval_ms: u64,

    /// Whether the sampler runs at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Scheduling cadences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Fast control tick in milliseconds (relay, safety, button)
    pub fast_tick_ms: u64,

    /// Cloud telemetry period in milliseconds
    pub telemetry_interval_ms: u64,

    /// MQTT state publish period in milliseconds
    pub publish_interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self { id: 1 }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            api_key: String::new(),
            enabled: true,
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "smartcharge-station1".to_string(),
            state_topic: "smartcharge/station1/state".to_string(),
            command_topic: "smartcharge/station1/set".to_string(),
            availability_topic: "smartcharge/station1/availability".to_string(),
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            zero_voltage: 1.496,
            sensitivity: 0.122,
            vref: 3.3,
            adc_resolution: 4095.0,
            oversample: 50,
            noise_floor: 0.05,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            current_limit: 3.0,
            fault_latch_ticks: 250,
        }
    }
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.200".to_string(),
            port: 502,
            slave_id: 1,
            register_base: 0x3100,
            poll_interval_ms: 2000,
            enabled: true,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: 20,
            telemetry_interval_ms: 5000,
            publish_interval_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/smartcharge.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station: StationConfig::default(),
            api: ApiConfig::default(),
            mqtt: MqttConfig::default(),
            sensor: SensorConfig::default(),
            safety: SafetyConfig::default(),
            solar: SolarConfig::default(),
            timing: TimingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations, falling back to defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "smartcharge_config.yaml",
            "/data/smartcharge_config.yaml",
            "/etc/smartcharge/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.enabled && self.api.base_url.is_empty() {
            return Err(StationError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.mqtt.enabled && self.mqtt.host.is_empty() {
            return Err(StationError::validation(
                "mqtt.host",
                "Broker host cannot be empty",
            ));
        }

        if self.mqtt.port == 0 {
            return Err(StationError::validation(
                "mqtt.port",
                "Port must be greater than 0",
            ));
        }

        if self.safety.current_limit <= 0.0 {
            return Err(StationError::validation(
                "safety.current_limit",
                "Must be positive",
            ));
        }

        if self.sensor.sensitivity <= 0.0 {
            return Err(StationError::validation(
                "sensor.sensitivity",
                "Must be positive",
            ));
        }

        if self.sensor.oversample == 0 {
            return Err(StationError::validation(
                "sensor.oversample",
                "Must be greater than 0",
            ));
        }

        if self.timing.fast_tick_ms == 0 {
            return Err(StationError::validation(
                "timing.fast_tick_ms",
                "Must be greater than 0",
            ));
        }

        if self.timing.telemetry_interval_ms == 0 || self.timing.publish_interval_ms == 0 {
            return Err(StationError::validation(
                "timing",
                "Telemetry and publish intervals must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.station.id, 1);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.timing.fast_tick_ms, 20);
        assert!((config.safety.current_limit - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.solar.register_base, 0x3100);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.safety.current_limit = 0.0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.mqtt.port = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.timing.fast_tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.mqtt.state_topic, deserialized.mqtt.state_topic);
        assert_eq!(config.solar.poll_interval_ms, deserialized.solar.poll_interval_ms);
    }
}
