//! NetRunner Cloud API.
//!
//! Devices check in with heartbeats, pull their polling plan and upload probe
//! results. Admins replace a device's URL set and read its recent results.

use std::sync::Arc;

use rocket::{Build, Rocket};

pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod payload;
pub mod routes;
pub mod schema;
pub mod settings;
pub mod state;

use crate::db::DeviceStore;
use crate::settings::ServerSettings;
use crate::state::AppState;

/// Open the configured store and assemble the server.
pub fn build_rocket(settings: &ServerSettings) -> anyhow::Result<Rocket<Build>> {
    let store = db::open_store(settings)?;
    Ok(rocket_with_store(store))
}

/// Assemble the server around an already opened store, or none at all.
pub fn rocket_with_store(store: Option<Arc<dyn DeviceStore>>) -> Rocket<Build> {
    rocket::build()
        .manage(AppState::new(store))
        .mount("/", routes::api_routes())
        .register("/", routes::api_catchers())
        .attach(logging::RequestLogger)
}
