use anyhow::Result;
use smartcharge::station::{StationDriver, StationHardware};
use smartcharge::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // Pin-level GPIO/ADC backends plug in behind StationHardware; this
    // binary runs the simulated set.
    let hardware = StationHardware::simulated(&config.sensor);

    let mut driver = StationDriver::with_config(config, hardware)
        .map_err(|e| anyhow::anyhow!("Failed to create station driver: {}", e))?;

    info!("SmartCharge station controller starting up");

    let shutdown = driver.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.send(()).ok();
        }
    });

    match driver.run().await {
        Ok(()) => {
            info!("Station shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Station failed with error: {}", e);
            Err(anyhow::anyhow!("Station error: {}", e))
        }
    }
}
