//! # SmartCharge - Single-Outlet EV Charging Station Controller
//!
//! A Rust implementation of the control and telemetry core of a
//! single-outlet EV charging station: local and remote charge control,
//! overcurrent safety, cloud telemetry, and MQTT state publishing.
//!
//! ## Features
//!
//! - **Fast Control Path**: Strict-tick safety and relay control, isolated
//!   from all network I/O
//! - **Command Arbitration**: Local button, MQTT broker, and cloud commands
//!   share one last-writer-wins charge request
//! - **Overcurrent Safety**: Threshold-driven cooling plus a latched fault
//!   on sustained overcurrent
//! - **Cloud Telemetry**: Periodic HTTPS reports with piggybacked remote
//!   commands
//! - **MQTT Bridge**: State publishing, ON/OFF command topic, retained
//!   availability with last-will
//! - **Solar Sampling**: Modbus TCP polling of the auxiliary charge
//!   controller
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! The application follows a modular architecture with clear separation of concerns:
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `hw`: Hardware collaborator traits and simulations
//! - `safety`: Overcurrent evaluation and the fault latch
//! - `arbiter`: Shared charge request with source attribution
//! - `controller`: Relay state machine and the fast control tick
//! - `telemetry`: Snapshot building and wire-format mapping
//! - `solar`: Modbus sampler for the solar charge controller
//! - `reporter`: Cloud telemetry reporting and command handling
//! - `bridge`: MQTT broker bridge
//! - `station`: Top-level orchestration

pub mod arbiter;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod hw;
pub mod logging;
pub mod reporter;
pub mod safety;
pub mod solar;
pub mod station;
pub mod telemetry;

pub use config::Config;
pub use error::{Result, StationError};
pub use station::{StationDriver, StationHardware};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
