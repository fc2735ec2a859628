use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;

use super::pool::{self, DbConn, DbPool};
use super::{DeviceStore, StoreError, StoreResult};
use crate::models::{
    Device, DeviceRow, DeviceUrl, DeviceUrlRow, Heartbeat, NewDevice, NewResultRow, ProbeResult,
    ResultRow, PLACEHOLDER_SECRET,
};
use crate::schema::{self, device_urls, devices, results};

/// Relational backend on SQLite through diesel and an r2d2 pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Connect and create any missing tables.
    pub fn open(database_url: &str, pool_size: u32) -> StoreResult<Self> {
        let store = Self {
            pool: pool::init_pool(database_url, pool_size)?,
        };
        store.conn()?.batch_execute(schema::CREATE_TABLES)?;
        Ok(store)
    }

    /// Checked-out connections go back to the pool when dropped.
    fn conn(&self) -> StoreResult<DbConn> {
        Ok(self.pool.get()?)
    }
}

impl DeviceStore for SqliteStore {
    fn record_heartbeat(&self, heartbeat: &Heartbeat, seen_at: DateTime<Utc>) -> StoreResult<()> {
        let snapshot = serde_json::to_string(heartbeat)?;
        let seen_at = seen_at.naive_utc();
        let mut conn = self.conn()?;

        diesel::insert_into(devices::table)
            .values(&NewDevice {
                device_id: &heartbeat.device_id,
                device_secret: PLACEHOLDER_SECRET,
                hostname: heartbeat.hostname.as_deref(),
                node_role: heartbeat.node_role.as_deref(),
                last_seen_at: seen_at,
                last_heartbeat: Some(&snapshot),
            })
            .on_conflict(devices::device_id)
            .do_update()
            .set((
                devices::hostname.eq(heartbeat.hostname.as_deref()),
                devices::node_role.eq(heartbeat.node_role.as_deref()),
                devices::last_seen_at.eq(seen_at),
                devices::last_heartbeat.eq(Some(snapshot.as_str())),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    fn device_urls(&self, device_id: &str) -> StoreResult<Vec<DeviceUrl>> {
        let mut conn = self.conn()?;
        let rows = device_urls::table
            .filter(device_urls::device_id.eq(device_id))
            .order(device_urls::url_id.asc())
            .select(DeviceUrlRow::as_select())
            .load::<DeviceUrlRow>(&mut conn)?;

        Ok(rows.into_iter().map(DeviceUrl::from).collect())
    }

    fn replace_device_urls(
        &self,
        device_id: &str,
        urls: &[DeviceUrl],
        seen_at: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut conn = self.conn()?;

        conn.transaction::<_, StoreError, _>(|conn| {
            diesel::insert_into(devices::table)
                .values(&NewDevice {
                    device_id,
                    device_secret: PLACEHOLDER_SECRET,
                    hostname: None,
                    node_role: None,
                    last_seen_at: seen_at.naive_utc(),
                    last_heartbeat: None,
                })
                .on_conflict_do_nothing()
                .execute(conn)?;

            diesel::delete(device_urls::table.filter(device_urls::device_id.eq(device_id)))
                .execute(conn)?;

            for entry in urls {
                diesel::insert_into(device_urls::table)
                    .values(&DeviceUrlRow::new(device_id, entry))
                    .execute(conn)?;
            }

            Ok(urls.len())
        })
    }

    fn insert_results(&self, device_id: &str, batch: &[ProbeResult]) -> StoreResult<usize> {
        let mut conn = self.conn()?;

        conn.transaction::<_, StoreError, _>(|conn| {
            let mut inserted = 0;
            for result in batch {
                inserted += diesel::insert_into(results::table)
                    .values(&NewResultRow::new(device_id, result))
                    .execute(conn)?;
            }
            Ok(inserted)
        })
    }

    fn latest_results(&self, device_id: &str, limit: usize) -> StoreResult<Vec<ProbeResult>> {
        let mut conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut rows = results::table
            .filter(results::device_id.eq(device_id))
            .order((results::timestamp_utc.desc(), results::id.desc()))
            .limit(limit)
            .select(ResultRow::as_select())
            .load::<ResultRow>(&mut conn)?;
        rows.reverse();

        Ok(rows.into_iter().map(ProbeResult::from).collect())
    }

    fn device(&self, device_id: &str) -> StoreResult<Option<Device>> {
        let mut conn = self.conn()?;
        let row = devices::table
            .filter(devices::device_id.eq(device_id))
            .select(DeviceRow::as_select())
            .first::<DeviceRow>(&mut conn)
            .optional()?;

        Ok(row.map(DeviceRow::into_device).transpose()?)
    }

    fn devices(&self) -> StoreResult<Vec<Device>> {
        let mut conn = self.conn()?;
        let rows = devices::table
            .order(devices::device_id.asc())
            .select(DeviceRow::as_select())
            .load::<DeviceRow>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(DeviceRow::into_device)
            .collect::<Result<_, _>>()?)
    }
}
