use rocket::http::Status;
use rocket::serde::json::{Json, Value};
use rocket::{catch, Request};

use crate::error::error_body;

/// JSON stand-in for Rocket's HTML error pages. Covers failed query and body
/// guards as well as unknown routes.
#[catch(default)]
pub fn json_default(status: Status, _req: &Request<'_>) -> (Status, Json<Value>) {
    (status, error_body(status.reason().unwrap_or("request failed")))
}
