diesel::table! {
    devices (device_id) {
        device_id -> Text,
        device_secret -> Text,         // placeholder, never returned by the API
        hostname -> Nullable<Text>,
        node_role -> Nullable<Text>,
        last_seen_at -> Timestamp,
        last_heartbeat -> Nullable<Text>, // JSON snapshot of the latest heartbeat
    }
}

diesel::table! {
    device_urls (device_id, url_id) {
        device_id -> Text,
        url_id -> Text,
        url -> Text,
        enabled -> Bool,
        interval_sec -> BigInt,
    }
}

diesel::table! {
    results (id) {
        id -> Integer,
        device_id -> Text,             // not a foreign key, devices may be unknown
        url_id -> Nullable<Text>,
        url -> Nullable<Text>,
        timestamp_utc -> Timestamp,
        success -> Nullable<Bool>,
        http_status -> Nullable<Integer>,
        total_ms -> Nullable<Double>,
        error -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    devices,
    device_urls,
    results,
);

/// DDL run once when the SQLite store is opened.
pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS devices (
    device_id TEXT PRIMARY KEY NOT NULL,
    device_secret TEXT NOT NULL,
    hostname TEXT,
    node_role TEXT,
    last_seen_at TIMESTAMP NOT NULL,
    last_heartbeat TEXT
);

CREATE TABLE IF NOT EXISTS device_urls (
    device_id TEXT NOT NULL,
    url_id TEXT NOT NULL,
    url TEXT NOT NULL,
    enabled BOOLEAN NOT NULL DEFAULT 1,
    interval_sec BIGINT NOT NULL,
    PRIMARY KEY (device_id, url_id)
);

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    device_id TEXT NOT NULL,
    url_id TEXT,
    url TEXT,
    timestamp_utc TIMESTAMP NOT NULL,
    success BOOLEAN,
    http_status INTEGER,
    total_ms DOUBLE,
    error TEXT
);

CREATE INDEX IF NOT EXISTS results_device_time ON results (device_id, timestamp_utc);
";
