//! Station orchestrator
//!
//! Wires the fast control path (button, safety, relay) to the slow network
//! services (solar sampler, cloud reporter, broker bridge). The fast loop
//! runs in the driver task on a strict tick; each network service runs in
//! its own spawned task so a stalled broker or backend can never delay a
//! safety decision.

use crate::arbiter::{ChargeArbiter, CommandSource};
use crate::bridge::BrokerBridge;
use crate::config::Config;
use crate::controller::ChargeController;
use crate::error::Result;
use crate::hw::{
    CurrentSensor, LedMode, LocalInput, RelayActuator, SimButton, SimCurrentSensor, SimLed,
    SimRelay, StatusLed,
};
use crate::logging::{LogContext, get_logger_with_context};
use crate::reporter::{HttpTransport, TelemetryReporter};
use crate::solar::{SolarClient, SolarSample, SolarSampler};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// The physical collaborators of one station
pub struct StationHardware {
    pub relay: Box<dyn RelayActuator>,
    pub cooling: Box<dyn RelayActuator>,
    pub sensor: Box<dyn CurrentSensor>,
    pub button: Box<dyn LocalInput>,
    pub led: Box<dyn StatusLed>,
}

impl StationHardware {
    /// Fully simulated hardware for development runs and tests
    pub fn simulated(sensor_cfg: &crate::config::SensorConfig) -> Self {
        Self {
            relay: Box::new(SimRelay::new()),
            cooling: Box::new(SimRelay::new()),
            sensor: Box::new(SimCurrentSensor::new(sensor_cfg.clone())),
            button: Box::new(SimButton::new()),
            led: Box::new(SimLed::new()),
        }
    }
}

/// Top-level station driver owning the fast loop and the service tasks
pub struct StationDriver {
    config: Config,
    controller: ChargeController,
    arbiter: Arc<ChargeArbiter>,
    button: Box<dyn LocalInput>,
    led: Box<dyn StatusLed>,
    solar_rx: watch::Receiver<SolarSample>,
    solar_sampler: Option<SolarSampler>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
    tasks: Vec<JoinHandle<()>>,
    logger: crate::logging::StructuredLogger,
}

impl StationDriver {
    /// Assemble the station from a validated configuration
    pub fn with_config(config: Config, hardware: StationHardware) -> Result<Self> {
        config.validate()?;
        crate::logging::init_logging(&config.logging)?;

        let logger = get_logger_with_context(
            LogContext::new("station").with_station_id(config.station.id),
        );
        logger.info("Initializing charging station");

        let arbiter = Arc::new(ChargeArbiter::new());
        let controller = ChargeController::new(
            hardware.relay,
            hardware.cooling,
            hardware.sensor,
            &config.safety,
            Arc::clone(&arbiter),
        );

        let solar_sampler = SolarSampler::new(
            Box::new(SolarClient::new(&config.solar)),
            config.solar.register_base,
        );
        let solar_rx = solar_sampler.subscribe();

        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            controller,
            arbiter,
            button: hardware.button,
            led: hardware.led,
            solar_rx,
            solar_sampler: Some(solar_sampler),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
            logger,
        })
    }

    /// Shared charge request flag
    pub fn arbiter(&self) -> Arc<ChargeArbiter> {
        Arc::clone(&self.arbiter)
    }

    fn spawn_services(&mut self) -> Result<()> {
        if self.config.solar.enabled {
            if let Some(sampler) = self.solar_sampler.take() {
                let poll_ms = self.config.solar.poll_interval_ms;
                self.tasks.push(tokio::spawn(sampler.run(poll_ms)));
                self.logger.info("Solar sampler started");
            }
        }

        if self.config.api.enabled {
            let reporter = TelemetryReporter::new(
                Box::new(HttpTransport::new()?),
                &self.config.api,
                self.config.station.id,
                Arc::clone(&self.arbiter),
                self.controller.subscribe_status(),
                self.solar_rx.clone(),
            );
            let report_ms = self.config.timing.telemetry_interval_ms;
            self.tasks.push(tokio::spawn(reporter.run(report_ms)));
            self.logger.info("Telemetry reporter started");
        }

        if self.config.mqtt.enabled {
            let bridge = BrokerBridge::new(
                &self.config.mqtt,
                self.config.station.id,
                Arc::clone(&self.arbiter),
                self.controller.subscribe_status(),
                self.solar_rx.clone(),
            );
            let publish_ms = self.config.timing.publish_interval_ms;
            self.tasks.push(tokio::spawn(bridge.run(publish_ms)));
            self.logger.info("Broker bridge started");
        }

        Ok(())
    }

    /// One fast tick: poll the button, run the control tick, update the LED
    fn fast_tick(&mut self) {
        if self.button.poll_pressed() {
            self.arbiter.toggle(CommandSource::LocalButton);
        }

        self.controller.tick();

        let mode = if self.arbiter.requested() {
            LedMode::Breathing
        } else {
            LedMode::Off
        };
        self.led.set_mode(mode);
    }

    /// Run the station until a shutdown request arrives
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting station main loop");
        self.spawn_services()?;

        let mut fast_interval = interval(Duration::from_millis(self.config.timing.fast_tick_ms));

        loop {
            tokio::select! {
                _ = fast_interval.tick() => {
                    self.fast_tick();
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.arbiter.set_request(false, CommandSource::LocalButton);
        self.controller.tick();
        self.led.set_mode(LedMode::Off);
        self.logger.info("Station shutdown complete");
    }

    /// Handle for requesting shutdown after `run()` has been started
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }
}
