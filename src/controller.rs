//! Charge controller state machine
//!
//! Owns the relay state machine (Available / Charging / Fault) and applies
//! the safety monitor's verdict before honoring any charge request. Runs on
//! every fast tick; never retries, never blocks.

use crate::arbiter::ChargeArbiter;
use crate::config::SafetyConfig;
use crate::hw::{CurrentSensor, RelayActuator};
use crate::logging::get_logger;
use crate::safety::{FaultLatch, SafetyMonitor};
use std::sync::Arc;
use tokio::sync::watch;

/// Relay state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeState {
    #[default]
    Available,
    Charging,
    Fault,
}

impl ChargeState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChargeState::Available => "AVAILABLE",
            ChargeState::Charging => "CHARGING",
            ChargeState::Fault => "FAULT",
        }
    }
}

/// Point-in-time controller status for slow-path consumers
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlStatus {
    pub state: ChargeState,
    pub current: f32,
    pub relay_on: bool,
    pub cooling_on: bool,
}

/// The charge controller. Exclusive owner of `ChargeState`; transitions
/// happen only inside `tick()`.
pub struct ChargeController {
    relay: Box<dyn RelayActuator>,
    cooling: Box<dyn RelayActuator>,
    sensor: Box<dyn CurrentSensor>,
    monitor: SafetyMonitor,
    latch: FaultLatch,
    arbiter: Arc<ChargeArbiter>,
    state: ChargeState,
    last_current: f32,
    status_tx: watch::Sender<ControlStatus>,
    logger: crate::logging::StructuredLogger,
}

impl ChargeController {
    pub fn new(
        relay: Box<dyn RelayActuator>,
        cooling: Box<dyn RelayActuator>,
        sensor: Box<dyn CurrentSensor>,
        safety: &SafetyConfig,
        arbiter: Arc<ChargeArbiter>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ControlStatus::default());
        Self {
            relay,
            cooling,
            sensor,
            monitor: SafetyMonitor::new(safety.current_limit),
            latch: FaultLatch::new(safety.fault_latch_ticks),
            arbiter,
            state: ChargeState::Available,
            last_current: 0.0,
            status_tx,
            logger: get_logger("controller"),
        }
    }

    /// One fast control tick: read the request and the current reading,
    /// evaluate safety, drive the relay and cooling outputs, publish status.
    pub fn tick(&mut self) {
        // Sensor failure keeps the previous reading; safety evaluation
        // continues on schedule either way.
        let current = match self.sensor.read_magnitude() {
            Ok(m) => m,
            Err(e) => {
                self.logger.warn(&format!("current sensor read failed: {}", e));
                self.last_current
            }
        };

        let verdict = self.monitor.evaluate(current);
        let was_latched = self.latch.is_latched();
        if self.latch.observe(verdict.cooling_active) && !was_latched {
            self.logger.error(&format!(
                "sustained overcurrent ({:.2} A > {:.2} A limit), latching fault",
                current,
                self.monitor.limit()
            ));
        }
        let fault = self.latch.is_latched();

        let requested = self.arbiter.requested();
        let relay_on = requested && !fault;

        if relay_on {
            if !self.relay.is_on() {
                self.logger.info("energizing main relay");
            }
            self.relay.on();
        } else {
            if self.relay.is_on() {
                self.logger.info("de-energizing main relay");
            }
            self.relay.off();
        }

        // Cooling follows the relay state decided this tick, so it can never
        // be on while the main relay is off.
        let cooling_on = verdict.cooling_active && relay_on;
        if cooling_on {
            self.cooling.on();
        } else {
            self.cooling.off();
        }

        let new_state = if fault {
            ChargeState::Fault
        } else if relay_on {
            ChargeState::Charging
        } else {
            ChargeState::Available
        };
        if new_state != self.state {
            self.logger.info(&format!(
                "state {} -> {}",
                self.state.as_str(),
                new_state.as_str()
            ));
        }
        self.state = new_state;
        self.last_current = current;

        let _ = self.status_tx.send(ControlStatus {
            state: self.state,
            current,
            relay_on,
            cooling_on,
        });
    }

    /// Current state machine state
    pub fn status(&self) -> ChargeState {
        self.state
    }

    /// Most recent current magnitude in amperes
    pub fn last_current(&self) -> f32 {
        self.last_current
    }

    /// Whether the main relay is currently energized
    pub fn relay_on(&self) -> bool {
        self.relay.is_on()
    }

    /// Whether the cooling output is currently energized
    pub fn cooling_on(&self) -> bool {
        self.cooling.is_on()
    }

    /// Clear a latched fault. The relay stays off until a fresh request.
    pub fn reset_fault(&mut self) {
        if self.latch.is_latched() {
            self.logger.info("fault latch cleared");
        }
        self.latch.reset();
    }

    /// Subscribe to per-tick status snapshots
    pub fn subscribe_status(&self) -> watch::Receiver<ControlStatus> {
        self.status_tx.subscribe()
    }
}
