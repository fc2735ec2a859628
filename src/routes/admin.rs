use chrono::Utc;
use log::info;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, put, State};

use crate::error::ApiResult;
use crate::models::LATEST_RESULTS_LIMIT;
use crate::payload::ConfigUpdate;
use crate::state::AppState;

/// Replace a device's whole URL set, creating the device if needed.
#[put("/v1/admin/config/<device_id>", data = "<body>")]
pub async fn set_config(
    state: &State<AppState>,
    device_id: &str,
    body: Json<Value>,
) -> ApiResult<Json<Value>> {
    let update = ConfigUpdate::from_body(body.into_inner())?;

    let owner = device_id.to_string();
    let written = state
        .with_store(move |store| store.replace_device_urls(&owner, &update.urls, Utc::now()))
        .await?;
    info!("config for {} replaced with {} urls", device_id, written);

    Ok(Json(json!({ "ok": true, "device_id": device_id, "urls": written })))
}

/// Last 50 results for a device, oldest first.
#[get("/v1/admin/results/<device_id>")]
pub async fn view_results(state: &State<AppState>, device_id: &str) -> ApiResult<Json<Value>> {
    let owner = device_id.to_string();
    let latest = state
        .with_store(move |store| store.latest_results(&owner, LATEST_RESULTS_LIMIT))
        .await?;

    Ok(Json(json!({
        "device_id": device_id,
        "count": latest.len(),
        "latest": latest,
    })))
}

#[get("/v1/admin/devices")]
pub async fn list_devices(state: &State<AppState>) -> ApiResult<Json<Value>> {
    let devices = state.with_store(|store| store.devices()).await?;

    Ok(Json(json!({ "count": devices.len(), "devices": devices })))
}
