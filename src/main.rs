use anyhow::{anyhow, Result};
use log::info;

use netrunner_server::logging::init_logger;
use netrunner_server::settings::ServerSettings;

#[rocket::main]
async fn main() -> Result<()> {
    let settings = ServerSettings::from_env()?;
    let _logger = init_logger(&settings)?;
    info!(
        "starting NetRunner Cloud API v{} ({:?} store)",
        env!("CARGO_PKG_VERSION"),
        settings.store_backend
    );

    let rocket = netrunner_server::build_rocket(&settings)?;
    // Displaying a rocket::Error marks it handled.
    rocket
        .launch()
        .await
        .map_err(|e| anyhow!("server failed: {e}"))?;

    Ok(())
}
