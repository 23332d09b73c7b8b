//! Telemetry snapshot type and protocol mapping
//!
//! One internal snapshot feeds both upstream sinks: the cloud telemetry
//! endpoint and the MQTT state topic each get their own serializer, so the
//! two wire shapes stay consistent by construction. Snapshots are built
//! fresh on every publish/report tick and are immutable once built.

use crate::controller::{ChargeState, ControlStatus};
use crate::solar::SolarSample;
use serde_json::json;

/// Point-in-time bundle of measured and derived values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    /// Outlet current magnitude in amperes
    pub current: f32,
    /// Reporting voltage, scaled from battery voltage
    pub scaled_voltage: f32,
    /// Derived power in kW
    pub power_kw: f32,
    /// Solar array power in watts
    pub pv_power: f32,
    /// Battery voltage in volts
    pub batt_voltage: f32,
    /// Controller state at build time
    pub state: ChargeState,
    /// Whether the main relay was energized at build time
    pub relay_on: bool,
    /// Station identifier
    pub station_id: u32,
}

impl TelemetrySnapshot {
    /// Build a snapshot from the latest controller status and solar sample
    pub fn build(status: &ControlStatus, solar: &SolarSample, station_id: u32) -> Self {
        let scaled_voltage = solar.batt_voltage * 10.0;
        let power_kw = (scaled_voltage * status.current) / 1000.0;
        Self {
            current: status.current,
            scaled_voltage,
            power_kw,
            pv_power: solar.pv_power,
            batt_voltage: solar.batt_voltage,
            state: status.state,
            relay_on: status.relay_on,
            station_id,
        }
    }

    /// Device identifier used on the cloud wire
    pub fn device_id(&self) -> String {
        format!("station-{}", self.station_id)
    }

    /// Cloud payload: camelCase fields plus the backend status enum
    pub fn to_cloud_json(&self) -> serde_json::Value {
        json!({
            "voltage": self.scaled_voltage,
            "current": self.current,
            "power": self.power_kw,
            "pvPower": self.pv_power,
            "battVoltage": self.batt_voltage,
            "deviceId": self.device_id(),
            "status": wire_status(self.state),
        })
    }

    /// Broker payload: snake_case fields plus the relay state
    pub fn to_broker_json(&self) -> serde_json::Value {
        json!({
            "voltage": self.scaled_voltage,
            "current": self.current,
            "power": self.power_kw,
            "pv_power": self.pv_power,
            "batt_voltage": self.batt_voltage,
            "relay": if self.relay_on { "ON" } else { "OFF" },
        })
    }
}

/// Map internal state to the backend status enum. Total and deterministic:
/// Charging maps to OCCUPIED, Fault to FAULT, everything else is AVAILABLE.
pub fn wire_status(state: ChargeState) -> &'static str {
    match state {
        ChargeState::Charging => "OCCUPIED",
        ChargeState::Fault => "FAULT",
        ChargeState::Available => "AVAILABLE",
    }
}

/// Remote command decoded from a telemetry response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Start,
    Stop,
}

impl RemoteCommand {
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "START" => Some(RemoteCommand::Start),
            "STOP" => Some(RemoteCommand::Stop),
            _ => None,
        }
    }
}

/// Extract a remote command from a telemetry response body.
///
/// The backend may place `command` at the top level or nested one level
/// under `data`; the nested one wins when both are present. Malformed JSON
/// or an unknown command string yields `None`.
pub fn parse_remote_command(body: &str) -> Option<RemoteCommand> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let mut raw = value.get("command").and_then(|v| v.as_str());
    if let Some(nested) = value.get("data").and_then(|d| d.get("command")).and_then(|v| v.as_str()) {
        raw = Some(nested);
    }

    raw.and_then(RemoteCommand::from_wire)
}
