use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{DeviceStore, StoreError, StoreResult};
use crate::models::{Device, DeviceUrl, Heartbeat, ProbeResult, PLACEHOLDER_SECRET};

struct DeviceRecord {
    device: Device,
    // Mirrors devices.device_secret. Only tests read it until devices authenticate.
    #[allow(dead_code)]
    device_secret: String,
}

#[derive(Default)]
struct Tables {
    devices: BTreeMap<String, DeviceRecord>,
    urls: HashMap<String, BTreeMap<String, DeviceUrl>>,
    results: HashMap<String, Vec<ProbeResult>>,
}

/// Process-local backend. One lock covers all three tables, so each call is
/// atomic with respect to concurrent requests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> StoreResult<T> {
        let guard = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }
}

impl DeviceStore for MemoryStore {
    fn record_heartbeat(&self, heartbeat: &Heartbeat, seen_at: DateTime<Utc>) -> StoreResult<()> {
        let snapshot = serde_json::to_value(heartbeat)?;
        self.write(|tables| {
            let record = tables
                .devices
                .entry(heartbeat.device_id.clone())
                .or_insert_with(|| DeviceRecord {
                    device: Device {
                        device_id: heartbeat.device_id.clone(),
                        hostname: None,
                        node_role: None,
                        last_seen_at: seen_at,
                        last_heartbeat: None,
                    },
                    device_secret: PLACEHOLDER_SECRET.to_string(),
                });

            let device = &mut record.device;
            device.hostname = heartbeat.hostname.clone();
            device.node_role = heartbeat.node_role.clone();
            device.last_seen_at = seen_at;
            device.last_heartbeat = Some(snapshot);
            Ok(())
        })
    }

    fn device_urls(&self, device_id: &str) -> StoreResult<Vec<DeviceUrl>> {
        self.read(|tables| {
            tables
                .urls
                .get(device_id)
                .map(|set| set.values().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn replace_device_urls(
        &self,
        device_id: &str,
        urls: &[DeviceUrl],
        seen_at: DateTime<Utc>,
    ) -> StoreResult<usize> {
        // Build the new set before touching anything so a bad batch changes nothing.
        let mut set = BTreeMap::new();
        for entry in urls {
            if set.insert(entry.id.clone(), entry.clone()).is_some() {
                return Err(StoreError::Constraint(format!(
                    "duplicate url id {} for device {}",
                    entry.id, device_id
                )));
            }
        }

        self.write(|tables| {
            tables
                .devices
                .entry(device_id.to_string())
                .or_insert_with(|| DeviceRecord {
                    device: Device {
                        device_id: device_id.to_string(),
                        hostname: None,
                        node_role: None,
                        last_seen_at: seen_at,
                        last_heartbeat: None,
                    },
                    device_secret: PLACEHOLDER_SECRET.to_string(),
                });
            tables.urls.insert(device_id.to_string(), set);
            Ok(urls.len())
        })
    }

    fn insert_results(&self, device_id: &str, batch: &[ProbeResult]) -> StoreResult<usize> {
        self.write(|tables| {
            tables
                .results
                .entry(device_id.to_string())
                .or_default()
                .extend_from_slice(batch);
            Ok(batch.len())
        })
    }

    fn latest_results(&self, device_id: &str, limit: usize) -> StoreResult<Vec<ProbeResult>> {
        self.read(|tables| {
            let mut rows = tables.results.get(device_id).cloned().unwrap_or_default();
            // Stable, so equal timestamps keep insertion order.
            rows.sort_by_key(|r| r.timestamp_utc);
            let skip = rows.len().saturating_sub(limit);
            rows.split_off(skip)
        })
    }

    fn device(&self, device_id: &str) -> StoreResult<Option<Device>> {
        self.read(|tables| tables.devices.get(device_id).map(|r| r.device.clone()))
    }

    fn devices(&self) -> StoreResult<Vec<Device>> {
        self.read(|tables| tables.devices.values().map(|r| r.device.clone()).collect())
    }
}
