#![allow(dead_code)]

use std::sync::Arc;

use netrunner_server::db::{DeviceStore, MemoryStore, SqliteStore};
use netrunner_server::rocket_with_store;
use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use serde_json::Value;

pub fn memory_client() -> Client {
    client_for(Some(Arc::new(MemoryStore::default())))
}

pub fn sqlite_client() -> Client {
    let store = SqliteStore::open(":memory:", 1).expect("open sqlite store");
    client_for(Some(Arc::new(store)))
}

pub fn unconfigured_client() -> Client {
    client_for(None)
}

pub fn client_for(store: Option<Arc<dyn DeviceStore>>) -> Client {
    Client::tracked(rocket_with_store(store)).expect("valid rocket instance")
}

/// Both backends, labelled for assertion messages.
pub fn clients() -> Vec<(&'static str, Client)> {
    vec![("memory", memory_client()), ("sqlite", sqlite_client())]
}

pub fn get_json(client: &Client, uri: &str) -> (Status, Value) {
    let res = client.get(uri.to_string()).dispatch();
    let status = res.status();
    (status, res.into_json().unwrap_or(Value::Null))
}

pub fn post_json(client: &Client, uri: &str, body: &Value) -> (Status, Value) {
    let res = client
        .post(uri.to_string())
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    let status = res.status();
    (status, res.into_json().unwrap_or(Value::Null))
}

pub fn put_json(client: &Client, uri: &str, body: &Value) -> (Status, Value) {
    let res = client
        .put(uri.to_string())
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    let status = res.status();
    (status, res.into_json().unwrap_or(Value::Null))
}

pub fn heartbeat(client: &Client, query: &str) -> (Status, Value) {
    let res = client
        .post(format!("/v1/device/heartbeat?{query}"))
        .dispatch();
    let status = res.status();
    (status, res.into_json().unwrap_or(Value::Null))
}
