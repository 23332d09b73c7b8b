//! Cloud telemetry reporter
//!
//! Posts a telemetry snapshot to the backend on a fixed interval and decodes
//! the command the backend piggybacks on the response. The HTTP exchange is
//! behind a trait so the loop is testable without a server.

use crate::arbiter::{ChargeArbiter, CommandSource};
use crate::config::ApiConfig;
use crate::controller::ControlStatus;
use crate::error::{Result, StationError};
use crate::logging::get_logger;
use crate::solar::SolarSample;
use crate::telemetry::{parse_remote_command, RemoteCommand, TelemetrySnapshot};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

/// One request/response exchange with the telemetry backend
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    async fn exchange(&self, url: &str, api_key: &str, body: &serde_json::Value)
        -> Result<String>;
}

/// reqwest-backed transport posting JSON with an API key header
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StationError::http(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TelemetryTransport for HttpTransport {
    async fn exchange(
        &self,
        url: &str,
        api_key: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("x-api-key", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StationError::http(format!(
                "Telemetry POST failed with status {}",
                status
            )));
        }

        Ok(response.text().await?)
    }
}

/// Periodic telemetry reporter and cloud command receiver
pub struct TelemetryReporter {
    transport: Box<dyn TelemetryTransport>,
    config: ApiConfig,
    station_id: u32,
    arbiter: Arc<ChargeArbiter>,
    status_rx: watch::Receiver<ControlStatus>,
    solar_rx: watch::Receiver<SolarSample>,
    logger: crate::logging::StructuredLogger,
}

impl TelemetryReporter {
    pub fn new(
        transport: Box<dyn TelemetryTransport>,
        config: &ApiConfig,
        station_id: u32,
        arbiter: Arc<ChargeArbiter>,
        status_rx: watch::Receiver<ControlStatus>,
        solar_rx: watch::Receiver<SolarSample>,
    ) -> Self {
        Self {
            transport,
            config: config.clone(),
            station_id,
            arbiter,
            status_rx,
            solar_rx,
            logger: get_logger("reporter"),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/iot/stations/{}",
            self.config.base_url.trim_end_matches('/'),
            self.station_id
        )
    }

    /// One report cycle: snapshot, POST, apply any command in the response.
    /// A failed exchange is logged and dropped; the next tick retries.
    pub async fn report_once(&mut self) {
        let status = *self.status_rx.borrow();
        let solar = *self.solar_rx.borrow();
        let snapshot = TelemetrySnapshot::build(&status, &solar, self.station_id);
        let body = snapshot.to_cloud_json();

        match self
            .transport
            .exchange(&self.endpoint(), &self.config.api_key, &body)
            .await
        {
            Ok(response_body) => match parse_remote_command(&response_body) {
                Some(RemoteCommand::Start) => {
                    self.logger.info("cloud command: start charging");
                    self.arbiter.set_request(true, CommandSource::Cloud);
                }
                Some(RemoteCommand::Stop) => {
                    self.logger.info("cloud command: stop charging");
                    self.arbiter.set_request(false, CommandSource::Cloud);
                }
                None => {}
            },
            Err(e) => {
                self.logger
                    .warn(&format!("telemetry report failed: {}", e));
            }
        }
    }

    /// Report on the configured period until the task is cancelled
    pub async fn run(mut self, report_interval_ms: u64) {
        let mut ticker = interval(Duration::from_millis(report_interval_ms));
        loop {
            ticker.tick().await;
            self.report_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ChargeState;
    use std::sync::Mutex;

    type RecordedRequests = Arc<Mutex<Vec<(String, String, serde_json::Value)>>>;

    struct MockTransport {
        response: String,
        requests: RecordedRequests,
    }

    impl MockTransport {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl TelemetryTransport for MockTransport {
        async fn exchange(
            &self,
            url: &str,
            api_key: &str,
            body: &serde_json::Value,
        ) -> Result<String> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push((url.to_string(), api_key.to_string(), body.clone()));
            }
            Ok(self.response.clone())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl TelemetryTransport for FailingTransport {
        async fn exchange(&self, _: &str, _: &str, _: &serde_json::Value) -> Result<String> {
            Err(StationError::http("connection refused"))
        }
    }

    fn api_config() -> ApiConfig {
        ApiConfig {
            base_url: "https://backend.example.com".to_string(),
            api_key: "test-key".to_string(),
            enabled: true,
        }
    }

    fn channels() -> (
        watch::Sender<ControlStatus>,
        watch::Receiver<ControlStatus>,
        watch::Sender<SolarSample>,
        watch::Receiver<SolarSample>,
    ) {
        let (status_tx, status_rx) = watch::channel(ControlStatus::default());
        let (solar_tx, solar_rx) = watch::channel(SolarSample::default());
        (status_tx, status_rx, solar_tx, solar_rx)
    }

    #[tokio::test]
    async fn test_report_posts_snapshot_with_key() {
        let (status_tx, status_rx, _solar_tx, solar_rx) = channels();
        status_tx
            .send(ControlStatus {
                state: ChargeState::Charging,
                current: 2.0,
                relay_on: true,
                cooling_on: false,
            })
            .unwrap();

        let transport = MockTransport::new(r#"{"ok":true}"#);
        let requests = Arc::clone(&transport.requests);
        let mut reporter = TelemetryReporter::new(
            Box::new(transport),
            &api_config(),
            1,
            Arc::new(ChargeArbiter::new()),
            status_rx,
            solar_rx,
        );
        reporter.report_once().await;

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (url, key, body) = &requests[0];
        assert_eq!(url, "https://backend.example.com/api/iot/stations/1");
        assert_eq!(key, "test-key");
        assert_eq!(body["status"], "OCCUPIED");
        assert_eq!(body["deviceId"], "station-1");
    }

    #[tokio::test]
    async fn test_start_command_sets_request() {
        let (_status_tx, status_rx, _solar_tx, solar_rx) = channels();
        let arbiter = Arc::new(ChargeArbiter::new());
        let mut reporter = TelemetryReporter::new(
            Box::new(MockTransport::new(r#"{"command":"START"}"#)),
            &api_config(),
            1,
            Arc::clone(&arbiter),
            status_rx,
            solar_rx,
        );
        reporter.report_once().await;
        assert!(arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::Cloud));
    }

    #[tokio::test]
    async fn test_stop_command_clears_request_unconditionally() {
        let (_status_tx, status_rx, _solar_tx, solar_rx) = channels();
        let arbiter = Arc::new(ChargeArbiter::new());
        arbiter.set_request(true, CommandSource::LocalButton);
        let mut reporter = TelemetryReporter::new(
            Box::new(MockTransport::new(r#"{"data":{"command":"STOP"}}"#)),
            &api_config(),
            1,
            Arc::clone(&arbiter),
            status_rx,
            solar_rx,
        );
        reporter.report_once().await;
        assert!(!arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::Cloud));
    }

    #[tokio::test]
    async fn test_no_command_leaves_request_untouched() {
        let (_status_tx, status_rx, _solar_tx, solar_rx) = channels();
        let arbiter = Arc::new(ChargeArbiter::new());
        arbiter.set_request(true, CommandSource::Broker);
        let mut reporter = TelemetryReporter::new(
            Box::new(MockTransport::new(r#"{"ok":true}"#)),
            &api_config(),
            1,
            Arc::clone(&arbiter),
            status_rx,
            solar_rx,
        );
        reporter.report_once().await;
        assert!(arbiter.requested());
        assert_eq!(arbiter.last_source(), Some(CommandSource::Broker));
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_request_untouched() {
        let (_status_tx, status_rx, _solar_tx, solar_rx) = channels();
        let arbiter = Arc::new(ChargeArbiter::new());
        arbiter.set_request(true, CommandSource::Cloud);
        let mut reporter = TelemetryReporter::new(
            Box::new(FailingTransport),
            &api_config(),
            1,
            Arc::clone(&arbiter),
            status_rx,
            solar_rx,
        );
        reporter.report_once().await;
        assert!(arbiter.requested());
    }
}
