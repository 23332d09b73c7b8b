//! Error types and handling for SmartCharge
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for SmartCharge operations
pub type Result<T> = std::result::Result<T, StationError>;

/// Main error type for SmartCharge
#[derive(Debug, Error)]
pub enum StationError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Modbus communication errors (solar charge controller)
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// MQTT broker errors
    #[error("MQTT error: {message}")]
    Mqtt { message: String },

    /// Cloud telemetry transport errors
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// Sensor read errors
    #[error("Sensor error: {message}")]
    Sensor { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl StationError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        StationError::Config {
            message: message.into(),
        }
    }

    /// Create a new Modbus error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        StationError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new MQTT error
    pub fn mqtt<S: Into<String>>(message: S) -> Self {
        StationError::Mqtt {
            message: message.into(),
        }
    }

    /// Create a new HTTP error
    pub fn http<S: Into<String>>(message: S) -> Self {
        StationError::Http {
            message: message.into(),
        }
    }

    /// Create a new sensor error
    pub fn sensor<S: Into<String>>(message: S) -> Self {
        StationError::Sensor {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        StationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        StationError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        StationError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        StationError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for StationError {
    fn from(err: std::io::Error) -> Self {
        StationError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for StationError {
    fn from(err: serde_yaml::Error) -> Self {
        StationError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StationError {
    fn from(err: serde_json::Error) -> Self {
        StationError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for StationError {
    fn from(err: reqwest::Error) -> Self {
        StationError::http(err.to_string())
    }
}

impl From<rumqttc::ClientError> for StationError {
    fn from(err: rumqttc::ClientError) -> Self {
        StationError::mqtt(err.to_string())
    }
}
