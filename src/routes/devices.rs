use chrono::Utc;
use log::{debug, info};
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};

use crate::error::{ApiError, ApiResult};
use crate::models::{DeviceConfig, Heartbeat};
use crate::payload;
use crate::state::AppState;

/// Device check-in. Creates the device on first contact.
#[post("/v1/device/heartbeat?<device_id>&<node_role>&<hostname>")]
pub async fn heartbeat(
    state: &State<AppState>,
    device_id: String,
    node_role: Option<String>,
    hostname: Option<String>,
) -> ApiResult<Json<Value>> {
    if device_id.is_empty() {
        return Err(ApiError::bad_request("device_id must not be empty"));
    }

    let now = Utc::now();
    let hb = Heartbeat::new(device_id.clone(), node_role, hostname, now);
    state
        .with_store(move |store| store.record_heartbeat(&hb, now))
        .await?;
    debug!("heartbeat from {}", device_id);

    Ok(Json(json!({ "ok": true, "device_id": device_id })))
}

/// Polling plan for a device. Unconfigured devices get the default plan,
/// which is not persisted.
#[get("/v1/device/config?<device_id>")]
pub async fn get_config(state: &State<AppState>, device_id: String) -> ApiResult<Json<DeviceConfig>> {
    let lookup = device_id.clone();
    let urls = state
        .with_store(move |store| store.device_urls(&lookup))
        .await?;

    Ok(Json(DeviceConfig::from_urls(device_id, urls)))
}

/// Batch upload of probe results. The whole batch is stored or none of it.
#[post("/v1/device/results?<device_id>", data = "<body>")]
pub async fn upload_results(
    state: &State<AppState>,
    device_id: String,
    body: Json<Value>,
) -> ApiResult<Json<Value>> {
    let batch = payload::parse_results(body.into_inner())?
        .into_iter()
        .enumerate()
        .map(|(i, entry)| entry.into_result(i, Utc::now()))
        .collect::<ApiResult<Vec<_>>>()?;

    let owner = device_id.clone();
    let count = state
        .with_store(move |store| store.insert_results(&owner, &batch))
        .await?;
    info!("stored {} results for {}", count, device_id);

    Ok(Json(json!({ "ok": true, "count": count })))
}
