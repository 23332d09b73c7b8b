//! Hardware collaborator interfaces
//!
//! The control core drives its actuators and reads its inputs through these
//! traits. Pin-level GPIO/ADC access lives behind them; the simulated
//! implementations here back development runs and tests.

use crate::config::SensorConfig;
use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Relay or other on/off actuator (main contactor, cooling fan)
pub trait RelayActuator: Send {
    fn on(&mut self);
    fn off(&mut self);
    fn is_on(&self) -> bool;
}

/// Calibrated, oversampled current sensor; returns a magnitude in amperes
pub trait CurrentSensor: Send {
    fn read_magnitude(&mut self) -> Result<f32>;
}

/// Edge-triggered local input (momentary button, debounced by the impl)
pub trait LocalInput: Send {
    /// Returns true exactly once per press
    fn poll_pressed(&mut self) -> bool;
}

/// Status LED intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    Breathing,
}

/// Status LED driver
pub trait StatusLed: Send {
    fn set_mode(&mut self, mode: LedMode);
}

/// Convert a calibrated sensor voltage to a current magnitude.
///
/// `(volts - zero_voltage) / sensitivity`, absolute value, with readings
/// below the noise floor clamped to zero.
pub fn voltage_to_magnitude(cfg: &SensorConfig, volts: f32) -> f32 {
    let current = (volts - cfg.zero_voltage) / cfg.sensitivity;
    let magnitude = current.abs();
    if magnitude < cfg.noise_floor {
        0.0
    } else {
        magnitude
    }
}

/// Average raw ADC counts and convert the result to a sensor voltage
pub fn counts_to_voltage(cfg: &SensorConfig, counts: &[u16]) -> f32 {
    if counts.is_empty() {
        return 0.0;
    }
    let sum: u64 = counts.iter().map(|c| u64::from(*c)).sum();
    let average = sum as f32 / counts.len() as f32;
    average / cfg.adc_resolution * cfg.vref
}

fn lock_ignore_poison<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Simulated relay with externally observable state
#[derive(Clone, Default)]
pub struct SimRelay {
    state: Arc<AtomicBool>,
}

impl SimRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelayActuator for SimRelay {
    fn on(&mut self) {
        self.state.store(true, Ordering::SeqCst);
    }

    fn off(&mut self) {
        self.state.store(false, Ordering::SeqCst);
    }

    fn is_on(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }
}

/// Simulated current sensor fed by a shared raw ADC count cell
#[derive(Clone)]
pub struct SimCurrentSensor {
    counts: Arc<Mutex<u16>>,
    cfg: SensorConfig,
}

impl SimCurrentSensor {
    pub fn new(cfg: SensorConfig) -> Self {
        let zero_count = (cfg.zero_voltage / cfg.vref * cfg.adc_resolution).round() as u16;
        Self {
            counts: Arc::new(Mutex::new(zero_count)),
            cfg,
        }
    }

    /// Set the ADC output so the next reading yields `amps` (subject to
    /// ADC quantization)
    pub fn set_magnitude(&self, amps: f32) {
        let volts = self.cfg.zero_voltage + amps * self.cfg.sensitivity;
        let count = (volts / self.cfg.vref * self.cfg.adc_resolution).round() as u16;
        *lock_ignore_poison(&self.counts) = count;
    }
}

impl CurrentSensor for SimCurrentSensor {
    fn read_magnitude(&mut self) -> Result<f32> {
        // The count cell stands in for the ADC pin; one reading averages
        // `oversample` samples of it
        let samples: Vec<u16> = (0..self.cfg.oversample.max(1))
            .map(|_| *lock_ignore_poison(&self.counts))
            .collect();
        let volts = counts_to_voltage(&self.cfg, &samples);
        Ok(voltage_to_magnitude(&self.cfg, volts))
    }
}

/// Simulated button; each queued press is reported once
#[derive(Clone, Default)]
pub struct SimButton {
    presses: Arc<Mutex<u32>>,
}

impl SimButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        *lock_ignore_poison(&self.presses) += 1;
    }
}

impl LocalInput for SimButton {
    fn poll_pressed(&mut self) -> bool {
        let mut n = lock_ignore_poison(&self.presses);
        if *n > 0 {
            *n -= 1;
            true
        } else {
            false
        }
    }
}

/// Simulated status LED recording the last requested mode
#[derive(Clone)]
pub struct SimLed {
    mode: Arc<Mutex<LedMode>>,
}

impl Default for SimLed {
    fn default() -> Self {
        Self {
            mode: Arc::new(Mutex::new(LedMode::Off)),
        }
    }
}

impl SimLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> LedMode {
        *lock_ignore_poison(&self.mode)
    }
}

impl StatusLed for SimLed {
    fn set_mode(&mut self, mode: LedMode) {
        *lock_ignore_poison(&self.mode) = mode;
    }
}
