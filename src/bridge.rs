//! MQTT broker bridge
//!
//! Publishes the station state to the broker on a fixed interval and accepts
//! ON/OFF commands on the command topic. Availability is handled with a
//! retained last-will: "offline" is queued at connect time and "online" is
//! published on every successful (re)connection.

use crate::arbiter::{ChargeArbiter, CommandSource};
use crate::config::MqttConfig;
use crate::controller::ControlStatus;
use crate::logging::get_logger;
use crate::solar::SolarSample;
use crate::telemetry::TelemetrySnapshot;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep};

/// Decode a command topic payload. Exact match only; anything other than
/// "ON" or "OFF" is ignored.
pub fn decode_command(payload: &[u8]) -> Option<bool> {
    match payload {
        b"ON" => Some(true),
        b"OFF" => Some(false),
        _ => None,
    }
}

/// Bridge between the station and the MQTT broker
pub struct BrokerBridge {
    config: MqttConfig,
    station_id: u32,
    arbiter: Arc<ChargeArbiter>,
    status_rx: watch::Receiver<ControlStatus>,
    solar_rx: watch::Receiver<SolarSample>,
    logger: crate::logging::StructuredLogger,
}

impl BrokerBridge {
    pub fn new(
        config: &MqttConfig,
        station_id: u32,
        arbiter: Arc<ChargeArbiter>,
        status_rx: watch::Receiver<ControlStatus>,
        solar_rx: watch::Receiver<SolarSample>,
    ) -> Self {
        Self {
            config: config.clone(),
            station_id,
            arbiter,
            status_rx,
            solar_rx,
            logger: get_logger("bridge"),
        }
    }

    fn apply_command(&self, payload: &[u8]) {
        match decode_command(payload) {
            Some(on) => {
                self.logger.info(&format!(
                    "broker command: {}",
                    if on { "start charging" } else { "stop charging" }
                ));
                self.arbiter.set_request(on, CommandSource::Broker);
            }
            None => {
                self.logger.warn(&format!(
                    "ignoring unknown broker payload ({} bytes)",
                    payload.len()
                ));
            }
        }
    }

    fn state_payload(&self) -> String {
        let status = *self.status_rx.borrow();
        let solar = *self.solar_rx.borrow();
        TelemetrySnapshot::build(&status, &solar, self.station_id)
            .to_broker_json()
            .to_string()
    }

    /// Enqueue one state snapshot without waiting for queue capacity. The
    /// event loop is only polled by `run`'s select, so nothing in a select
    /// branch may await the request queue; a full queue means the broker is
    /// down and the snapshot is dropped, the next tick builds a fresh one.
    fn publish_state(&self, client: &AsyncClient) {
        let payload = self.state_payload();
        if let Err(e) =
            client.try_publish(&self.config.state_topic, QoS::AtLeastOnce, false, payload)
        {
            self.logger.warn(&format!("state publish dropped: {}", e));
        }
    }

    /// Connect to the broker and run the publish/command loop until the
    /// task is cancelled. Connection loss is retried with a short backoff.
    pub async fn run(self, publish_interval_ms: u64) {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        options.set_last_will(LastWill::new(
            &self.config.availability_topic,
            b"offline".to_vec(),
            QoS::AtLeastOnce,
            true,
        ));

        let (client, mut eventloop) = AsyncClient::new(options, 16);
        let mut ticker = interval(Duration::from_millis(publish_interval_ms));

        loop {
            tokio::select! {
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            self.logger.info(&format!(
                                "connected to broker at {}:{}",
                                self.config.host, self.config.port
                            ));
                            if let Err(e) =
                                client.try_subscribe(&self.config.command_topic, QoS::AtLeastOnce)
                            {
                                self.logger.warn(&format!("subscribe failed: {}", e));
                            }
                            if let Err(e) = client.try_publish(
                                &self.config.availability_topic,
                                QoS::AtLeastOnce,
                                true,
                                b"online".to_vec(),
                            ) {
                                self.logger.warn(&format!("availability publish failed: {}", e));
                            }
                        }
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            if publish.topic == self.config.command_topic {
                                self.apply_command(&publish.payload);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            self.logger.warn(&format!("broker connection error: {}", e));
                            sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.publish_state(&client);
                }
            }
        }
    }
}
