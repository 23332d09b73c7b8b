use smartcharge::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.mqtt.host = "10.0.0.5".to_string();
    cfg.api.base_url = "https://backend.example.com".to_string();
    cfg.safety.current_limit = 2.5;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.mqtt.host, "10.0.0.5");
    assert_eq!(loaded.api.base_url, "https://backend.example.com");
    assert!((loaded.safety.current_limit - 2.5).abs() < f32::EPSILON);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn enabled_flags_default_to_true() {
    let yaml = r#"
station:
  id: 4
api:
  base_url: "https://backend.example.com"
  api_key: "key"
mqtt:
  host: "broker.local"
  port: 1883
  client_id: "smartcharge-station4"
  state_topic: "smartcharge/station4/state"
  command_topic: "smartcharge/station4/set"
  availability_topic: "smartcharge/station4/availability"
  keep_alive_secs: 30
sensor:
  zero_voltage: 1.496
  sensitivity: 0.122
  vref: 3.3
  adc_resolution: 4095.0
  oversample: 50
  noise_floor: 0.05
safety:
  current_limit: 3.0
  fault_latch_ticks: 250
solar:
  host: "192.168.1.200"
  port: 502
  slave_id: 1
  register_base: 12544
  poll_interval_ms: 2000
timing:
  fast_tick_ms: 20
  telemetry_interval_ms: 5000
  publish_interval_ms: 5000
logging:
  level: "INFO"
  file: "/tmp/smartcharge.log"
  backup_count: 5
  console_output: true
  json_format: false
"#;
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), yaml).unwrap();
    let cfg = Config::from_file(tmp.path()).unwrap();
    assert!(cfg.api.enabled);
    assert!(cfg.mqtt.enabled);
    assert!(cfg.solar.enabled);
    assert_eq!(cfg.station.id, 4);
    assert!(cfg.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    cfg.api.base_url.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.mqtt.host.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.safety.current_limit = -1.0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.sensor.oversample = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.timing.telemetry_interval_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
