use smartcharge::arbiter::{ChargeArbiter, CommandSource};
use smartcharge::config::{SafetyConfig, SensorConfig};
use smartcharge::controller::{ChargeController, ChargeState};
use smartcharge::hw::{RelayActuator, SimCurrentSensor, SimRelay};
use smartcharge::telemetry::wire_status;
use std::sync::Arc;

fn build(
    latch_ticks: u32,
) -> (
    ChargeController,
    Arc<ChargeArbiter>,
    SimRelay,
    SimRelay,
    SimCurrentSensor,
) {
    let relay = SimRelay::new();
    let cooling = SimRelay::new();
    let sensor = SimCurrentSensor::new(SensorConfig::default());
    let arbiter = Arc::new(ChargeArbiter::new());
    let controller = ChargeController::new(
        Box::new(relay.clone()),
        Box::new(cooling.clone()),
        Box::new(sensor.clone()),
        &SafetyConfig {
            current_limit: 3.0,
            fault_latch_ticks: latch_ticks,
        },
        Arc::clone(&arbiter),
    );
    (controller, arbiter, relay, cooling, sensor)
}

#[tokio::test]
async fn last_writer_wins_across_sources() {
    let (mut controller, arbiter, relay, _, _) = build(0);

    // Local on, broker off, cloud on: the final write decides
    arbiter.set_request(true, CommandSource::LocalButton);
    arbiter.set_request(false, CommandSource::Broker);
    arbiter.set_request(true, CommandSource::Cloud);

    controller.tick();
    assert!(relay.is_on());
    assert_eq!(controller.status(), ChargeState::Charging);
    assert_eq!(wire_status(controller.status()), "OCCUPIED");
}

#[tokio::test]
async fn cooling_engages_and_releases_with_the_reading() {
    let (mut controller, arbiter, relay, cooling, sensor) = build(0);
    arbiter.set_request(true, CommandSource::LocalButton);

    sensor.set_magnitude(2.5);
    controller.tick();
    assert!(relay.is_on());
    assert!(!cooling.is_on());

    sensor.set_magnitude(3.5);
    controller.tick();
    assert!(cooling.is_on());

    sensor.set_magnitude(2.5);
    controller.tick();
    assert!(!cooling.is_on());
}

#[tokio::test]
async fn cooling_drops_with_the_relay_in_one_tick() {
    let (mut controller, arbiter, relay, cooling, sensor) = build(0);
    arbiter.set_request(true, CommandSource::Broker);
    sensor.set_magnitude(4.0);
    controller.tick();
    assert!(relay.is_on());
    assert!(cooling.is_on());

    arbiter.set_request(false, CommandSource::Broker);
    controller.tick();
    assert!(!relay.is_on());
    assert!(!cooling.is_on());
}

#[tokio::test]
async fn sustained_overcurrent_latches_and_reset_recovers() {
    let (mut controller, arbiter, relay, _, sensor) = build(5);
    arbiter.set_request(true, CommandSource::LocalButton);
    sensor.set_magnitude(6.0);

    for _ in 0..4 {
        controller.tick();
        assert_eq!(controller.status(), ChargeState::Charging);
    }
    controller.tick();
    assert_eq!(controller.status(), ChargeState::Fault);
    assert!(!relay.is_on());
    assert_eq!(wire_status(controller.status()), "FAULT");

    // Remote writes cannot clear the fault
    arbiter.set_request(true, CommandSource::Cloud);
    controller.tick();
    assert_eq!(controller.status(), ChargeState::Fault);

    sensor.set_magnitude(1.0);
    controller.reset_fault();
    controller.tick();
    assert_eq!(controller.status(), ChargeState::Charging);
    assert!(relay.is_on());
}

#[tokio::test]
async fn brief_spikes_do_not_latch() {
    let (mut controller, arbiter, _, cooling, sensor) = build(5);
    arbiter.set_request(true, CommandSource::LocalButton);

    // Alternating over/under keeps resetting the streak
    for _ in 0..20 {
        sensor.set_magnitude(6.0);
        controller.tick();
        assert!(cooling.is_on());
        sensor.set_magnitude(1.0);
        controller.tick();
        assert!(!cooling.is_on());
    }
    assert_eq!(controller.status(), ChargeState::Charging);
}
