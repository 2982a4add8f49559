use anyhow::Result;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::{Sqlite, SqliteConnection};

use common::state::{DeviceSnapshot, HistoryRecord};

use crate::query::{HistoryFilter, HISTORY_LIMIT};
use crate::schema::{devices, history};

pub mod models {
    use chrono::{DateTime, TimeZone, Utc};
    use diesel::prelude::*;

    use common::reading::{ChannelSample, PowerStatus};
    use common::state::{DeviceSnapshot, HistoryRecord};

    use crate::schema::{devices, history};

    #[derive(Debug, Clone, Queryable, Insertable)]
    #[diesel(table_name = devices)]
    pub struct DeviceRow {
        pub name: String,
        pub timestamp: i64,
        pub ch0_t: Option<f32>,
        pub ch0_rh: Option<f32>,
        pub ch1_t: Option<f32>,
        pub ch1_rh: Option<f32>,
        pub vsol: Option<f32>,
        pub vbat: Option<f32>,
        pub isol: Option<f32>,
        pub ibat: Option<f32>,
        pub is_charging: Option<bool>,
        pub pgood: Option<bool>,
        pub gps: Option<String>,
        pub last_image: Option<String>,
        pub pollen_count: Option<i64>,
        pub detections: Option<String>,
    }

    #[derive(Debug, Clone, Insertable)]
    #[diesel(table_name = history)]
    pub struct NewHistoryRow {
        pub name: String,
        pub timestamp: i64,
        pub ch0_t: Option<f32>,
        pub ch0_rh: Option<f32>,
        pub ch1_t: Option<f32>,
        pub ch1_rh: Option<f32>,
        pub vsol: Option<f32>,
        pub vbat: Option<f32>,
        pub isol: Option<f32>,
        pub ibat: Option<f32>,
        pub is_charging: Option<bool>,
        pub pgood: Option<bool>,
        pub gps: Option<String>,
        pub image: Option<String>,
        pub pollen_count: Option<i64>,
        pub detections: Option<String>,
    }

    #[derive(Debug, Clone, Queryable)]
    pub struct HistoryRow {
        pub id: i32,
        pub name: String,
        pub timestamp: i64,
        pub ch0_t: Option<f32>,
        pub ch0_rh: Option<f32>,
        pub ch1_t: Option<f32>,
        pub ch1_rh: Option<f32>,
        pub vsol: Option<f32>,
        pub vbat: Option<f32>,
        pub isol: Option<f32>,
        pub ibat: Option<f32>,
        pub is_charging: Option<bool>,
        pub pgood: Option<bool>,
        pub gps: Option<String>,
        pub image: Option<String>,
        pub pollen_count: Option<i64>,
        pub detections: Option<String>,
    }

    fn channel(t: Option<f32>, rh: Option<f32>) -> Option<ChannelSample> {
        (t.is_some() || rh.is_some()).then_some(ChannelSample { t, rh })
    }

    fn power(
        vsol: Option<f32>,
        vbat: Option<f32>,
        isol: Option<f32>,
        ibat: Option<f32>,
        is_charging: Option<bool>,
        pgood: Option<bool>,
    ) -> Option<PowerStatus> {
        let any = vsol.is_some()
            || vbat.is_some()
            || isol.is_some()
            || ibat.is_some()
            || is_charging.is_some()
            || pgood.is_some();
        any.then_some(PowerStatus {
            vsol,
            vbat,
            isol,
            ibat,
            is_charging,
            pgood,
        })
    }

    fn from_millis(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
    }

    fn detections_to_json(detections: &Option<serde_json::Value>) -> Option<String> {
        detections.as_ref().map(|value| value.to_string())
    }

    fn detections_from_json(detections: Option<String>) -> Option<serde_json::Value> {
        detections.and_then(|raw| serde_json::from_str(&raw).ok())
    }

    impl From<&DeviceSnapshot> for DeviceRow {
        fn from(snapshot: &DeviceSnapshot) -> Self {
            let [ch0, ch1] = snapshot.dht22;
            let power = snapshot.power.unwrap_or_default();
            Self {
                name: snapshot.name.clone(),
                timestamp: snapshot.timestamp.timestamp_millis(),
                ch0_t: ch0.and_then(|sample| sample.t),
                ch0_rh: ch0.and_then(|sample| sample.rh),
                ch1_t: ch1.and_then(|sample| sample.t),
                ch1_rh: ch1.and_then(|sample| sample.rh),
                vsol: power.vsol,
                vbat: power.vbat,
                isol: power.isol,
                ibat: power.ibat,
                is_charging: power.is_charging,
                pgood: power.pgood,
                gps: snapshot.gps.clone(),
                last_image: snapshot.last_image.clone(),
                pollen_count: snapshot.pollen_count,
                detections: detections_to_json(&snapshot.detections),
            }
        }
    }

    impl From<DeviceRow> for DeviceSnapshot {
        fn from(row: DeviceRow) -> Self {
            Self {
                name: row.name,
                timestamp: from_millis(row.timestamp),
                dht22: [
                    channel(row.ch0_t, row.ch0_rh),
                    channel(row.ch1_t, row.ch1_rh),
                ],
                power: power(
                    row.vsol,
                    row.vbat,
                    row.isol,
                    row.ibat,
                    row.is_charging,
                    row.pgood,
                ),
                gps: row.gps,
                last_image: row.last_image,
                pollen_count: row.pollen_count,
                detections: detections_from_json(row.detections),
            }
        }
    }

    impl From<&HistoryRecord> for NewHistoryRow {
        fn from(record: &HistoryRecord) -> Self {
            let [ch0, ch1] = record.dht22;
            let power = record.power.unwrap_or_default();
            Self {
                name: record.name.clone(),
                timestamp: record.timestamp.timestamp_millis(),
                ch0_t: ch0.and_then(|sample| sample.t),
                ch0_rh: ch0.and_then(|sample| sample.rh),
                ch1_t: ch1.and_then(|sample| sample.t),
                ch1_rh: ch1.and_then(|sample| sample.rh),
                vsol: power.vsol,
                vbat: power.vbat,
                isol: power.isol,
                ibat: power.ibat,
                is_charging: power.is_charging,
                pgood: power.pgood,
                gps: record.gps.clone(),
                image: record.image.clone(),
                pollen_count: record.pollen_count,
                detections: detections_to_json(&record.detections),
            }
        }
    }

    impl From<HistoryRow> for HistoryRecord {
        fn from(row: HistoryRow) -> Self {
            Self {
                name: row.name,
                timestamp: from_millis(row.timestamp),
                dht22: [
                    channel(row.ch0_t, row.ch0_rh),
                    channel(row.ch1_t, row.ch1_rh),
                ],
                power: power(
                    row.vsol,
                    row.vbat,
                    row.isol,
                    row.ibat,
                    row.is_charging,
                    row.pgood,
                ),
                gps: row.gps,
                image: row.image,
                pollen_count: row.pollen_count,
                detections: detections_from_json(row.detections),
            }
        }
    }
}

const INIT_SQL: &str = "
CREATE TABLE IF NOT EXISTS devices (
    name TEXT PRIMARY KEY NOT NULL,
    timestamp BIGINT NOT NULL,
    ch0_t FLOAT,
    ch0_rh FLOAT,
    ch1_t FLOAT,
    ch1_rh FLOAT,
    vsol FLOAT,
    vbat FLOAT,
    isol FLOAT,
    ibat FLOAT,
    is_charging BOOLEAN,
    pgood BOOLEAN,
    gps TEXT,
    last_image TEXT,
    pollen_count BIGINT,
    detections TEXT
);
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    name TEXT NOT NULL,
    timestamp BIGINT NOT NULL,
    ch0_t FLOAT,
    ch0_rh FLOAT,
    ch1_t FLOAT,
    ch1_rh FLOAT,
    vsol FLOAT,
    vbat FLOAT,
    isol FLOAT,
    ibat FLOAT,
    is_charging BOOLEAN,
    pgood BOOLEAN,
    gps TEXT,
    image TEXT,
    pollen_count BIGINT,
    detections TEXT
);
CREATE INDEX IF NOT EXISTS history_timestamp ON history (timestamp);
CREATE INDEX IF NOT EXISTS history_name ON history (name);
";

pub struct Db {
    conn: SqliteConnection,
}

impl Db {
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)?;
        conn.batch_execute(INIT_SQL)?;
        Ok(Self { conn })
    }

    pub fn find_snapshot(&mut self, device: &str) -> Result<Option<DeviceSnapshot>> {
        use crate::schema::devices::dsl::*;
        let row = devices
            .filter(name.eq(device))
            .first::<models::DeviceRow>(&mut self.conn)
            .optional()?;
        Ok(row.map(DeviceSnapshot::from))
    }

    /// Single statement REPLACE INTO, the whole read-modify-write of one
    /// reading happens under the caller's lock anyway.
    pub fn upsert_snapshot(&mut self, snapshot: &DeviceSnapshot) -> Result<()> {
        diesel::replace_into(devices::table)
            .values(models::DeviceRow::from(snapshot))
            .execute(&mut self.conn)?;
        Ok(())
    }

    pub fn all_snapshots(&mut self) -> Result<Vec<DeviceSnapshot>> {
        use crate::schema::devices::dsl::*;
        let rows = devices
            .order(name.asc())
            .load::<models::DeviceRow>(&mut self.conn)?;
        Ok(rows.into_iter().map(DeviceSnapshot::from).collect())
    }

    pub fn append_history(&mut self, record: &HistoryRecord) -> Result<()> {
        diesel::insert_into(history::table)
            .values(models::NewHistoryRow::from(record))
            .execute(&mut self.conn)?;
        Ok(())
    }

    /// Newest first, at most [`HISTORY_LIMIT`] records.
    pub fn query_history(&mut self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>> {
        use crate::schema::history::dsl::*;

        let mut query = history.into_boxed::<Sqlite>();
        if let Some(device) = &filter.device {
            query = query.filter(name.eq(device.clone()));
        }
        if let Some((from, until)) = filter.range {
            query = query
                .filter(timestamp.ge(from.timestamp_millis()))
                .filter(timestamp.lt(until.timestamp_millis()));
        }

        let rows = query
            .order(timestamp.desc())
            .limit(HISTORY_LIMIT)
            .load::<models::HistoryRow>(&mut self.conn)?;
        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }
}
