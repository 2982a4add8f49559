use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reading::{ChannelSample, PowerStatus, CHANNEL_COUNT};

/// Latest known state of one device, keyed by name. Upserted on every
/// reading or upload, never deleted.
///
/// The channel values are not necessarily the most recent ones from history:
/// an implausible sample leaves the previous value in place, so this record
/// can diverge from the newest history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub dht22: [Option<ChannelSample>; CHANNEL_COUNT],
    pub power: Option<PowerStatus>,
    pub gps: Option<String>,
    #[serde(rename = "lastImage")]
    pub last_image: Option<String>,
    #[serde(rename = "detectedPollenCount")]
    pub pollen_count: Option<i64>,
    pub detections: Option<serde_json::Value>,
}

impl DeviceSnapshot {
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            timestamp,
            dht22: [None; CHANNEL_COUNT],
            power: None,
            gps: None,
            last_image: None,
            pollen_count: None,
            detections: None,
        }
    }
}

/// One append-only log entry per ingested reading or upload. Carries the
/// raw post-validation values, never carried-forward ones, and is immutable
/// once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub dht22: [Option<ChannelSample>; CHANNEL_COUNT],
    pub power: Option<PowerStatus>,
    pub gps: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "detectedPollenCount")]
    pub pollen_count: Option<i64>,
    pub detections: Option<serde_json::Value>,
}
