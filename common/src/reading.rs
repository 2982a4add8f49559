use serde::{Deserialize, Serialize};

/// Number of DHT22 channels a device reports (0 = box, 1 = outside).
pub const CHANNEL_COUNT: usize = 2;

/// One temperature/humidity sample. Either value may be missing when the
/// sensor did not deliver it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    pub t: Option<f32>,  // °C
    pub rh: Option<f32>, // percent
}

impl ChannelSample {
    /// Sample with both values cleared, written to history in place of an
    /// implausible reading.
    pub fn nulled() -> Self {
        Self::default()
    }
}

/// Charger telemetry, replaced wholesale on every reading that carries it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerStatus {
    #[serde(rename = "Vsol")]
    pub vsol: Option<f32>, // mV
    #[serde(rename = "Vbat")]
    pub vbat: Option<f32>, // mV
    #[serde(rename = "Isol")]
    pub isol: Option<f32>, // mA
    #[serde(rename = "Ibat")]
    pub ibat: Option<f32>, // mA
    pub is_charging: Option<bool>,
    pub pgood: Option<bool>,
}

/// A decoded device payload. Every field is optional, a device only sends
/// what it currently has. `image` is never set by the device itself, the
/// upload endpoint fills it in after storing the file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub dht22: Option<Vec<Option<ChannelSample>>>,
    pub power: Option<PowerStatus>,
    pub gps: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "detectedPollenCount")]
    pub pollen_count: Option<i64>,
    pub detections: Option<serde_json::Value>,
}

impl Reading {
    /// Build a reading from upload metadata so uploads run through the same
    /// reconcile path as streamed readings. The single temperature/humidity
    /// pair of the camera unit maps to channel 0.
    pub fn from_upload(meta: UploadMetadata, image: String) -> Self {
        let dht22 = (meta.temperature.is_some() || meta.humidity.is_some()).then(|| {
            vec![Some(ChannelSample {
                t: meta.temperature,
                rh: meta.humidity,
            })]
        });

        Self {
            dht22,
            power: None,
            gps: meta.gps,
            image: Some(image),
            pollen_count: meta.detected_pollen_count,
            detections: meta.detections,
        }
    }
}

/// JSON carried in the `data` field of a multipart upload.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UploadMetadata {
    /// RFC 3339. Unparseable or missing means the server receipt time is
    /// used instead.
    pub timestamp: Option<String>,
    pub temperature: Option<f32>, // °C
    pub humidity: Option<f32>,    // percent
    pub gps: Option<String>,
    #[serde(rename = "detectedPollenCount")]
    pub detected_pollen_count: Option<i64>,
    pub detections: Option<serde_json::Value>,
}
