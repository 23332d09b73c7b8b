//! Solar charge controller sampler
//!
//! Polls the auxiliary energy controller's realtime register block over
//! Modbus TCP (the RS-485 leg sits behind a gateway) and exposes the latest
//! values to the snapshot builder. A failed poll retains the previous
//! sample unchanged; failure is never surfaced to callers.

use crate::config::SolarConfig;
use crate::error::{Result, StationError};
use crate::logging::get_logger;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, timeout};
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Latest values read from the solar charge controller. Overwritten
/// wholesale on each successful poll; stale values persist on failure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SolarSample {
    pub pv_voltage: f32,
    pub pv_current: f32,
    pub pv_power: f32,
    pub batt_voltage: f32,
    pub batt_current: f32,
}

/// Number of input registers in the realtime block
pub const SOLAR_REGISTER_COUNT: u16 = 6;

/// Decode the realtime register block into a sample.
///
/// Voltages and currents are single scaled registers; PV power is a 32-bit
/// value reconstructed from low word then high word. All values are scaled
/// by a fixed divisor of 100.
pub fn decode_sample(registers: &[u16]) -> Result<SolarSample> {
    if registers.len() < SOLAR_REGISTER_COUNT as usize {
        return Err(StationError::modbus(format!(
            "Insufficient registers for solar sample: got {}",
            registers.len()
        )));
    }

    let power_raw = (registers[2] as u32) | ((registers[3] as u32) << 16);

    Ok(SolarSample {
        pv_voltage: registers[0] as f32 / 100.0,
        pv_current: registers[1] as f32 / 100.0,
        pv_power: power_raw as f32 / 100.0,
        batt_voltage: registers[4] as f32 / 100.0,
        batt_current: registers[5] as f32 / 100.0,
    })
}

/// Source of the auxiliary controller's input registers
#[async_trait]
pub trait RegisterSource: Send {
    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;
}

/// Modbus TCP client for the solar charge controller
pub struct SolarClient {
    client: Option<tokio_modbus::client::Context>,
    config: SolarConfig,
    connection_timeout: Duration,
    operation_timeout: Duration,
    logger: crate::logging::StructuredLogger,
}

impl SolarClient {
    pub fn new(config: &SolarConfig) -> Self {
        Self {
            client: None,
            config: config.clone(),
            connection_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
            logger: get_logger("solar_modbus"),
        }
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: std::net::SocketAddr = address
            .parse()
            .map_err(|e| StationError::modbus(format!("Invalid socket address: {}", e)))?;

        self.logger
            .info(&format!("Connecting to solar controller at {}", address));

        match timeout(
            self.connection_timeout,
            tcp::connect_slave(socket_addr, Slave(self.config.slave_id)),
        )
        .await
        {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Connected to solar controller");
                Ok(())
            }
            Ok(Err(e)) => Err(StationError::modbus(format!(
                "Failed to connect to solar controller: {}",
                e
            ))),
            Err(_) => Err(StationError::timeout("Solar controller connection timeout")),
        }
    }
}

#[async_trait]
impl RegisterSource for SolarClient {
    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        if self.client.is_none() {
            self.connect().await?;
        }
        let ctx = self
            .client
            .as_mut()
            .ok_or_else(|| StationError::modbus("Not connected to solar controller"))?;

        let request = ctx.read_input_registers(address, count);

        match timeout(self.operation_timeout, request).await {
            Ok(Ok(Ok(words))) => Ok(words),
            Ok(Ok(Err(e))) => {
                // Drop the connection so the next poll reconnects
                self.client = None;
                Err(StationError::modbus(format!(
                    "Failed to read input registers: {}",
                    e
                )))
            }
            Ok(Err(e)) => {
                // Drop the connection so the next poll reconnects
                self.client = None;
                Err(StationError::modbus(format!(
                    "Failed to read input registers: {}",
                    e
                )))
            }
            Err(_) => {
                self.client = None;
                Err(StationError::timeout("Read operation timeout"))
            }
        }
    }
}

/// Periodic sampler publishing the latest sample over a watch channel
pub struct SolarSampler {
    source: Box<dyn RegisterSource>,
    register_base: u16,
    sample_tx: watch::Sender<SolarSample>,
    logger: crate::logging::StructuredLogger,
}

impl SolarSampler {
    pub fn new(source: Box<dyn RegisterSource>, register_base: u16) -> Self {
        let (sample_tx, _) = watch::channel(SolarSample::default());
        Self {
            source,
            register_base,
            sample_tx,
            logger: get_logger("solar"),
        }
    }

    /// Subscribe to the latest sample (last-known-good on poll failure)
    pub fn subscribe(&self) -> watch::Receiver<SolarSample> {
        self.sample_tx.subscribe()
    }

    /// One poll: overwrite the sample wholesale on success, keep the
    /// previous one on failure.
    pub async fn poll_once(&mut self) {
        match self
            .source
            .read_input_registers(self.register_base, SOLAR_REGISTER_COUNT)
            .await
        {
            Ok(registers) => match decode_sample(&registers) {
                Ok(sample) => {
                    self.logger.trace(&format!(
                        "solar sample: pv={:.1}W batt={:.2}V",
                        sample.pv_power, sample.batt_voltage
                    ));
                    let _ = self.sample_tx.send(sample);
                }
                Err(e) => {
                    self.logger
                        .debug(&format!("solar decode failed, keeping last sample: {}", e));
                }
            },
            Err(e) => {
                self.logger
                    .debug(&format!("solar poll failed, keeping last sample: {}", e));
            }
        }
    }

    /// Poll on the configured period until the task is cancelled
    pub async fn run(mut self, poll_interval_ms: u64) {
        let mut ticker = interval(Duration::from_millis(poll_interval_ms));
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sample() {
        // 18.00 V PV, 1.50 A PV, 27.00 W, 12.80 V batt, 2.10 A batt
        let regs = [1800u16, 150, 2700, 0, 1280, 210];
        let sample = decode_sample(&regs).unwrap();
        assert!((sample.pv_voltage - 18.0).abs() < 1e-4);
        assert!((sample.pv_current - 1.5).abs() < 1e-4);
        assert!((sample.pv_power - 27.0).abs() < 1e-4);
        assert!((sample.batt_voltage - 12.8).abs() < 1e-4);
        assert!((sample.batt_current - 2.1).abs() < 1e-4);
    }

    #[test]
    fn test_decode_sample_high_word_power() {
        // power raw = 0x0001_0000 + 100 = 65636 -> 656.36 W
        let regs = [0u16, 0, 100, 1, 0, 0];
        let sample = decode_sample(&regs).unwrap();
        assert!((sample.pv_power - 656.36).abs() < 1e-2);
    }

    #[test]
    fn test_decode_sample_short_block() {
        let regs = [1800u16, 150, 2700];
        assert!(decode_sample(&regs).is_err());
    }

    #[test]
    fn test_solar_client_starts_disconnected() {
        let client = SolarClient::new(&SolarConfig::default());
        assert!(!client.is_connected());
    }
}
