use rocket::{catchers, routes, Catcher, Route};

pub mod admin;
pub mod catchers;
pub mod devices;
pub mod health;

/// API routes, mounted at `/`.
pub fn api_routes() -> Vec<Route> {
    routes![
        // Health
        health::health,

        // Device-facing
        devices::heartbeat,
        devices::get_config,
        devices::upload_results,

        // Admin
        admin::set_config,
        admin::view_results,
        admin::list_devices,
    ]
}

pub fn api_catchers() -> Vec<Catcher> {
    catchers![catchers::json_default]
}
