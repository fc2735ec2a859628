mod common;

use rocket::http::Status;
use serde_json::json;

use common::{get_json, heartbeat, post_json, put_json, unconfigured_client};

#[test]
fn health_works_without_a_store() {
    let client = unconfigured_client();
    let (status, body) = get_json(&client, "/health");
    assert_eq!(status, Status::Ok);
    assert_eq!(body["status"], "ok");
}

#[test]
fn data_endpoints_report_missing_database_url() {
    let client = unconfigured_client();
    let responses = [
        heartbeat(&client, "device_id=pi-1"),
        get_json(&client, "/v1/device/config?device_id=pi-1"),
        post_json(&client, "/v1/device/results?device_id=pi-1", &json!([{}])),
        put_json(&client, "/v1/admin/config/pi-1", &json!({"urls": []})),
        get_json(&client, "/v1/admin/results/pi-1"),
        get_json(&client, "/v1/admin/devices"),
    ];
    for (status, body) in responses {
        assert_eq!(status, Status::InternalServerError);
        assert_eq!(body, json!({"detail": "DATABASE_URL not set"}));
    }
}

#[test]
fn validation_runs_before_the_store_check() {
    let client = unconfigured_client();
    let (status, _) = post_json(&client, "/v1/device/results?device_id=pi-1", &json!("nope"));
    assert_eq!(status, Status::BadRequest);
}
