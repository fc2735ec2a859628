use chrono::Utc;
use rocket::get;
use rocket::serde::json::{json, Json, Value};

use crate::models::format_utc;

/// Liveness check. Never touches the store.
#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time_utc": format_utc(&Utc::now()),
    }))
}
