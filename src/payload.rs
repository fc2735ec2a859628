//! Request bodies accepted by the upload and admin endpoints.
//!
//! Bodies arrive as loose JSON. Only the outer shape is checked here; field
//! values are coerced to their column types, and the documented defaults are
//! applied before anything reaches a store.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::models::{DeviceUrl, ProbeResult, DEFAULT_INTERVAL_SEC};

/// Keeps an explicit `null` as `Some(Value::Null)` so it can be told apart
/// from an absent key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// One entry of a device's result upload. Every field may be missing and
/// none is type-checked until it is coerced into its column.
#[derive(Debug, Default, Deserialize)]
pub struct ResultUpload {
    #[serde(default)]
    pub timestamp_utc: Option<Value>,
    #[serde(default)]
    pub url_id: Option<Value>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub http_status: Option<Value>,
    #[serde(default)]
    pub total_ms: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResultUpload {
    /// Resolve entry `index` into a stored result. A missing, null or empty
    /// timestamp becomes `now`.
    pub fn into_result(self, index: usize, now: DateTime<Utc>) -> ApiResult<ProbeResult> {
        let field = |name: &str| format!("results[{index}].{name}");

        let timestamp_utc = match self.timestamp_utc {
            None => now,
            Some(Value::String(raw)) if raw.trim().is_empty() => now,
            Some(Value::String(raw)) => parse_timestamp(raw.trim())
                .ok_or_else(|| unstorable(&field("timestamp_utc"), &Value::String(raw)))?,
            Some(other) => return Err(unstorable(&field("timestamp_utc"), &other)),
        };

        Ok(ProbeResult {
            timestamp_utc,
            url_id: coerce_text(self.url_id, &field("url_id"))?,
            url: coerce_text(self.url, &field("url"))?,
            success: coerce_flag(self.success, &field("success"))?,
            http_status: coerce_status(self.http_status, &field("http_status"))?,
            total_ms: coerce_millis(self.total_ms, &field("total_ms"))?,
            error: coerce_text(self.error, &field("error"))?,
        })
    }
}

/// Check that an upload body is an array of objects and decode each entry.
pub fn parse_results(body: Value) -> ApiResult<Vec<ResultUpload>> {
    let Value::Array(entries) = body else {
        return Err(ApiError::bad_request("results must be a list"));
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            if !entry.is_object() {
                return Err(unstorable(&format!("results[{i}]"), &entry));
            }
            serde_json::from_value(entry)
                .map_err(|e| ApiError::Unstorable(format!("results[{i}]: {e}")))
        })
        .collect()
}

fn unstorable(field: &str, value: &Value) -> ApiError {
    ApiError::Unstorable(format!("{field}: cannot store {value}"))
}

/// Scalars are stored as their text form; arrays and objects are refused.
fn coerce_text(value: Option<Value>, field: &str) -> ApiResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(other) => Err(unstorable(field, &other)),
    }
}

/// Booleans, or the textual spellings a boolean column accepts.
fn coerce_flag(value: Option<Value>, field: &str) -> ApiResult<Option<bool>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Some(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Some(false)),
            _ => Err(unstorable(field, &Value::String(s))),
        },
        Some(other) => Err(unstorable(field, &other)),
    }
}

/// Integers, integral floats and integer strings that fit an `i32`.
fn coerce_status(value: Option<Value>, field: &str) -> ApiResult<Option<i32>> {
    let v = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let coerced = match &v {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && (i32::MIN as f64..=i32::MAX as f64).contains(f))
                .map(|f| f as i32),
        },
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    coerced.map(Some).ok_or_else(|| unstorable(field, &v))
}

/// Any finite number, or a string holding one.
fn coerce_millis(value: Option<Value>, field: &str) -> ApiResult<Option<f64>> {
    let v = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let coerced = match &v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    coerced
        .filter(|f| f.is_finite())
        .map(Some)
        .ok_or_else(|| unstorable(field, &v))
}

/// Accepts RFC 3339, or an ISO-8601 date-time without offset which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    url: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    enabled: Option<Value>,
    #[serde(default)]
    interval_sec: Option<Value>,
}

/// Admin replacement of a device's URL set.
#[derive(Debug, PartialEq)]
pub struct ConfigUpdate {
    pub urls: Vec<DeviceUrl>,
}

impl ConfigUpdate {
    /// Missing `urls` means an empty set. Entries fall back to the body's
    /// `default_interval_sec`, then to 60.
    pub fn from_body(body: Value) -> ApiResult<Self> {
        let Value::Object(mut body) = body else {
            return Err(ApiError::bad_request("body must be an object"));
        };

        let default_interval = match body.get("default_interval_sec") {
            None | Some(Value::Null) => DEFAULT_INTERVAL_SEC,
            Some(v) => coerce_interval(v, "default_interval_sec")?,
        };

        let entries = match body.remove("urls") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(ApiError::bad_request("body.urls must be a list")),
        };

        let urls = entries
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let entry: UrlEntry = serde_json::from_value(raw)
                    .map_err(|e| ApiError::bad_request(format!("urls[{i}]: {e}")))?;
                let interval_sec = match &entry.interval_sec {
                    None | Some(Value::Null) => default_interval,
                    Some(v) => coerce_interval(v, &format!("urls[{i}].interval_sec"))?,
                };
                Ok(DeviceUrl {
                    id: required_text(entry.id, &format!("urls[{i}].id"))?,
                    url: required_text(entry.url, &format!("urls[{i}].url"))?,
                    enabled: entry.enabled.as_ref().map_or(true, truthy),
                    interval_sec,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(Self { urls })
    }
}

fn required_text(value: Option<Value>, field: &str) -> ApiResult<String> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        _ => Err(ApiError::bad_request(format!("{field} is required"))),
    }
}

/// JSON truthiness: null, false, 0, "" and empty containers are false.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Integers pass through, floats are truncated, numeric strings are parsed.
/// Anything outside the `i64` range is refused.
fn coerce_interval(value: &Value, field: &str) -> ApiResult<i64> {
    let coerced = match value {
        Value::Number(n) if n.is_u64() => n.as_u64().and_then(|u| i64::try_from(u).ok()),
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                // i64::MAX as f64 rounds up to 2^63, which is already out of range.
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| ApiError::bad_request(format!("{field} must be an integer, got {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn resolve(entry: Value) -> ApiResult<ProbeResult> {
        let now = Utc.with_ymd_and_hms(2025, 2, 2, 8, 0, 0).unwrap();
        parse_results(json!([entry]))?.remove(0).into_result(0, now)
    }

    #[test]
    fn non_array_results_are_rejected() {
        let err = parse_results(json!({"url_id": "u1"})).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m == "results must be a list"));
    }

    #[test]
    fn sparse_entries_are_tolerated() {
        let now = Utc.with_ymd_and_hms(2025, 2, 2, 8, 0, 0).unwrap();
        let mut parsed =
            parse_results(json!([{}, {"timestamp_utc": ""}, {"timestamp_utc": null}])).unwrap();
        assert_eq!(parsed.len(), 3);
        let first = parsed.remove(0).into_result(0, now).unwrap();
        assert_eq!(first.timestamp_utc, now);
        assert_eq!(first.url_id, None);
        assert_eq!(first.success, None);
        for (i, entry) in parsed.into_iter().enumerate() {
            assert_eq!(entry.into_result(i + 1, now).unwrap().timestamp_utc, now);
        }
    }

    #[test]
    fn loosely_typed_fields_are_coerced() {
        let r = resolve(json!({
            "url_id": 1, "url": "https://example.org", "success": "true",
            "http_status": "200", "total_ms": "12.5", "error": false
        }))
        .unwrap();
        assert_eq!(r.url_id.as_deref(), Some("1"));
        assert_eq!(r.success, Some(true));
        assert_eq!(r.http_status, Some(200));
        assert_eq!(r.total_ms, Some(12.5));
        assert_eq!(r.error.as_deref(), Some("false"));

        let r = resolve(json!({"http_status": 204.0, "total_ms": 3, "success": "False"})).unwrap();
        assert_eq!(r.http_status, Some(204));
        assert_eq!(r.total_ms, Some(3.0));
        assert_eq!(r.success, Some(false));
    }

    #[test]
    fn values_no_column_can_hold_are_unstorable() {
        for entry in [
            json!({"http_status": "two hundred"}),
            json!({"http_status": 200.5}),
            json!({"http_status": 3_000_000_000u64}),
            json!({"success": 1}),
            json!({"url": ["a"]}),
            json!({"total_ms": "fast"}),
            json!({"timestamp_utc": "yesterday"}),
            json!({"timestamp_utc": 1700000000}),
        ] {
            let err = resolve(entry.clone()).unwrap_err();
            assert!(
                matches!(&err, ApiError::Unstorable(m) if m.starts_with("results[0]")),
                "{entry}: {err:?}"
            );
        }
        assert!(matches!(parse_results(json!([1])), Err(ApiError::Unstorable(_))));
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2025, 2, 2, 8, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-02-02T08:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-02-02T09:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-02-02T08:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-02-02 08:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn config_defaults_are_applied() {
        let update = ConfigUpdate::from_body(json!({
            "urls": [
                {"id": "u1", "url": "https://a.example"},
                {"id": "u2", "url": "https://b.example", "enabled": false, "interval_sec": "15"},
                {"id": "u3", "url": "https://c.example", "interval_sec": 7.9}
            ],
            "default_interval_sec": 120
        }))
        .unwrap();

        let summary: Vec<_> = update
            .urls
            .iter()
            .map(|u| (u.id.as_str(), u.enabled, u.interval_sec))
            .collect();
        assert_eq!(summary, [("u1", true, 120), ("u2", false, 15), ("u3", true, 7)]);
    }

    #[test]
    fn enabled_follows_truthiness() {
        let update = ConfigUpdate::from_body(json!({"urls": [
            {"id": "a", "url": "x", "enabled": null},
            {"id": "b", "url": "x", "enabled": 0},
            {"id": "c", "url": "x", "enabled": 1},
            {"id": "d", "url": "x", "enabled": ""},
            {"id": "e", "url": "x", "enabled": "no"},
            {"id": "f", "url": "x"}
        ]}))
        .unwrap();
        let flags: Vec<bool> = update.urls.iter().map(|u| u.enabled).collect();
        assert_eq!(flags, [false, false, true, false, true, true]);
    }

    #[test]
    fn interval_falls_back_to_sixty() {
        let update = ConfigUpdate::from_body(json!({"urls": [{"id": "u1", "url": "x"}]})).unwrap();
        assert_eq!(update.urls[0].interval_sec, 60);
    }

    #[test]
    fn interval_outside_i64_is_rejected() {
        for interval in [json!(1e300), json!(9.3e18), json!(u64::MAX), json!(-1e19)] {
            let body = json!({"urls": [{"id": "u1", "url": "x", "interval_sec": interval}]});
            assert!(
                matches!(ConfigUpdate::from_body(body), Err(ApiError::BadRequest(_))),
                "{interval}"
            );
        }
        let body = json!({"urls": [], "default_interval_sec": 1e300});
        assert!(ConfigUpdate::from_body(body).is_err());

        let body = json!({"urls": [{"id": "u1", "url": "x", "interval_sec": i64::MAX}]});
        assert_eq!(ConfigUpdate::from_body(body).unwrap().urls[0].interval_sec, i64::MAX);
    }

    #[test]
    fn missing_urls_is_an_empty_set() {
        assert!(ConfigUpdate::from_body(json!({})).unwrap().urls.is_empty());
    }

    #[test]
    fn malformed_config_bodies() {
        assert!(matches!(
            ConfigUpdate::from_body(json!({"urls": "u1"})),
            Err(ApiError::BadRequest(m)) if m == "body.urls must be a list"
        ));
        assert!(ConfigUpdate::from_body(json!([])).is_err());
        assert!(ConfigUpdate::from_body(json!({
            "urls": [{"id": "u1", "url": "x", "interval_sec": "soon"}]
        }))
        .is_err());
        assert!(ConfigUpdate::from_body(json!({"urls": [], "default_interval_sec": true})).is_err());
        assert!(matches!(
            ConfigUpdate::from_body(json!({"urls": [{"url": "no id"}]})),
            Err(ApiError::BadRequest(m)) if m == "urls[0].id is required"
        ));
    }
}
