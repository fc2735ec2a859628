use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize, Serializer};

use crate::schema::{device_urls, devices, results};

/// Secret stored for every device until real device credentials exist.
pub const PLACEHOLDER_SECRET: &str = "dev-secret";

/// Polling interval used when neither an entry nor the request names one.
pub const DEFAULT_INTERVAL_SEC: i64 = 60;

/// Size of the window returned by the admin results view.
pub const LATEST_RESULTS_LIMIT: usize = 50;

/// Render a UTC timestamp as ISO-8601 with an explicit `+00:00` offset.
pub fn format_utc(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn serialize_utc<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_utc(ts))
}

/// Snapshot stored in `devices.last_heartbeat`. Absent fields stay `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub device_id: String,
    pub node_role: Option<String>,
    pub hostname: Option<String>,
    pub time_utc: String,
}

impl Heartbeat {
    pub fn new(
        device_id: String,
        node_role: Option<String>,
        hostname: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            device_id,
            node_role,
            hostname,
            time_utc: format_utc(&now),
        }
    }
}

/// A device as exposed to admins. The secret is deliberately not a field.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub device_id: String,
    pub hostname: Option<String>,
    pub node_role: Option<String>,
    #[serde(serialize_with = "serialize_utc")]
    pub last_seen_at: DateTime<Utc>,
    pub last_heartbeat: Option<serde_json::Value>,
}

/// One polling target configured for a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceUrl {
    pub id: String,
    pub url: String,
    pub enabled: bool,
    pub interval_sec: i64,
}

/// Polling plan handed to a device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceConfig {
    pub device_id: String,
    pub urls: Vec<DeviceUrl>,
    pub default_interval_sec: i64,
}

impl DeviceConfig {
    /// Plan for a device nobody has configured yet.
    pub fn fallback(device_id: String) -> Self {
        Self {
            device_id,
            urls: vec![DeviceUrl {
                id: "u1".to_string(),
                url: "https://example.org".to_string(),
                enabled: true,
                interval_sec: DEFAULT_INTERVAL_SEC,
            }],
            default_interval_sec: DEFAULT_INTERVAL_SEC,
        }
    }

    pub fn from_urls(device_id: String, urls: Vec<DeviceUrl>) -> Self {
        if urls.is_empty() {
            return Self::fallback(device_id);
        }
        Self {
            device_id,
            urls,
            default_interval_sec: DEFAULT_INTERVAL_SEC,
        }
    }
}

/// One recorded probe outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    #[serde(serialize_with = "serialize_utc")]
    pub timestamp_utc: DateTime<Utc>,
    pub url_id: Option<String>,
    pub url: Option<String>,
    pub success: Option<bool>,
    pub http_status: Option<i32>,
    pub total_ms: Option<f64>,
    pub error: Option<String>,
}

// ---- diesel rows ----

#[derive(Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice<'a> {
    pub device_id: &'a str,
    pub device_secret: &'a str,
    pub hostname: Option<&'a str>,
    pub node_role: Option<&'a str>,
    pub last_seen_at: NaiveDateTime,
    pub last_heartbeat: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeviceRow {
    pub device_id: String,
    pub hostname: Option<String>,
    pub node_role: Option<String>,
    pub last_seen_at: NaiveDateTime,
    pub last_heartbeat: Option<String>,
}

impl DeviceRow {
    pub fn into_device(self) -> Result<Device, serde_json::Error> {
        let last_heartbeat = self
            .last_heartbeat
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Device {
            device_id: self.device_id,
            hostname: self.hostname,
            node_role: self.node_role,
            last_seen_at: self.last_seen_at.and_utc(),
            last_heartbeat,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug)]
#[diesel(table_name = device_urls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DeviceUrlRow {
    pub device_id: String,
    pub url_id: String,
    pub url: String,
    pub enabled: bool,
    pub interval_sec: i64,
}

impl DeviceUrlRow {
    pub fn new(device_id: &str, entry: &DeviceUrl) -> Self {
        Self {
            device_id: device_id.to_string(),
            url_id: entry.id.clone(),
            url: entry.url.clone(),
            enabled: entry.enabled,
            interval_sec: entry.interval_sec,
        }
    }
}

impl From<DeviceUrlRow> for DeviceUrl {
    fn from(row: DeviceUrlRow) -> Self {
        Self {
            id: row.url_id,
            url: row.url,
            enabled: row.enabled,
            interval_sec: row.interval_sec,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = results)]
pub struct NewResultRow<'a> {
    pub device_id: &'a str,
    pub url_id: Option<&'a str>,
    pub url: Option<&'a str>,
    pub timestamp_utc: NaiveDateTime,
    pub success: Option<bool>,
    pub http_status: Option<i32>,
    pub total_ms: Option<f64>,
    pub error: Option<&'a str>,
}

impl<'a> NewResultRow<'a> {
    pub fn new(device_id: &'a str, result: &'a ProbeResult) -> Self {
        Self {
            device_id,
            url_id: result.url_id.as_deref(),
            url: result.url.as_deref(),
            timestamp_utc: result.timestamp_utc.naive_utc(),
            success: result.success,
            http_status: result.http_status,
            total_ms: result.total_ms,
            error: result.error.as_deref(),
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ResultRow {
    pub timestamp_utc: NaiveDateTime,
    pub url_id: Option<String>,
    pub url: Option<String>,
    pub success: Option<bool>,
    pub http_status: Option<i32>,
    pub total_ms: Option<f64>,
    pub error: Option<String>,
}

impl From<ResultRow> for ProbeResult {
    fn from(row: ResultRow) -> Self {
        Self {
            timestamp_utc: row.timestamp_utc.and_utc(),
            url_id: row.url_id,
            url: row.url,
            success: row.success,
            http_status: row.http_status,
            total_ms: row.total_ms,
            error: row.error,
        }
    }
}
