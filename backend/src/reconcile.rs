use chrono::{DateTime, Utc};

use common::reading::{ChannelSample, Reading, CHANNEL_COUNT};
use common::state::{DeviceSnapshot, HistoryRecord};

/// Humidity readings above this are sensor glitches, the DHT22 cannot
/// report more than 100 percent.
const MAX_HUMIDITY: f32 = 100.0;

/// What an incoming reading says about one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ChannelUpdate {
    /// Plausible sample, both snapshot and history take it.
    Valid(ChannelSample),
    /// Humidity above 100 percent. History gets a nulled sample, the
    /// snapshot keeps whatever it already held for this channel.
    Invalid,
    /// No humidity sample for this channel, nothing to update.
    Absent,
}

fn classify(entry: Option<&ChannelSample>) -> ChannelUpdate {
    match entry {
        None => ChannelUpdate::Absent,
        Some(sample) => match sample.rh {
            Some(rh) if rh > MAX_HUMIDITY => ChannelUpdate::Invalid,
            Some(_) => ChannelUpdate::Valid(*sample),
            None => ChannelUpdate::Absent,
        },
    }
}

/// Merge one reading into the stored device state.
///
/// Returns the updated snapshot and the history record to append. Pure,
/// persistence of both outputs is the caller's job. Missing fields in the
/// reading mean "no update", this function never fails.
///
/// The history record always carries the raw post-validation values, so an
/// invalid sample shows up there as a nulled channel while the snapshot
/// carries the previous value forward.
pub fn reconcile(
    name: &str,
    previous: Option<DeviceSnapshot>,
    incoming: Reading,
    now: DateTime<Utc>,
) -> (DeviceSnapshot, HistoryRecord) {
    let mut snapshot = previous.unwrap_or_else(|| DeviceSnapshot::new(name, now));
    snapshot.name = name.to_owned();
    snapshot.timestamp = now;

    let mut history_channels: [Option<ChannelSample>; CHANNEL_COUNT] = [None; CHANNEL_COUNT];

    if let Some(entries) = &incoming.dht22 {
        for idx in 0..CHANNEL_COUNT {
            let raw = entries.get(idx).and_then(|entry| entry.as_ref());
            match classify(raw) {
                ChannelUpdate::Valid(sample) => {
                    snapshot.dht22[idx] = Some(sample);
                    history_channels[idx] = Some(sample);
                }
                ChannelUpdate::Invalid => {
                    history_channels[idx] = Some(ChannelSample::nulled());
                }
                ChannelUpdate::Absent => {
                    history_channels[idx] = raw.copied();
                }
            }
        }
    }

    if incoming.power.is_some() {
        snapshot.power = incoming.power;
    }
    if incoming.gps.is_some() {
        snapshot.gps = incoming.gps.clone();
    }
    if incoming.image.is_some() {
        snapshot.last_image = incoming.image.clone();
    }
    if incoming.pollen_count.is_some() {
        snapshot.pollen_count = incoming.pollen_count;
    }
    if incoming.detections.is_some() {
        snapshot.detections = incoming.detections.clone();
    }

    let record = HistoryRecord {
        name: name.to_owned(),
        timestamp: now,
        dht22: history_channels,
        power: incoming.power,
        gps: incoming.gps,
        image: incoming.image,
        pollen_count: incoming.pollen_count,
        detections: incoming.detections,
    };

    (snapshot, record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::reading::PowerStatus;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample(t: f32, rh: f32) -> ChannelSample {
        ChannelSample {
            t: Some(t),
            rh: Some(rh),
        }
    }

    #[test]
    fn first_reading_populates_snapshot() {
        let reading = Reading {
            dht22: Some(vec![Some(sample(21.0, 45.0)), Some(sample(15.5, 80.0))]),
            gps: Some("$GPGGA".into()),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("BoxA", None, reading, ts(1_000));

        assert_eq!(snapshot.name, "BoxA");
        assert_eq!(snapshot.timestamp, ts(1_000));
        assert_eq!(snapshot.dht22[0], Some(sample(21.0, 45.0)));
        assert_eq!(snapshot.dht22[1], Some(sample(15.5, 80.0)));
        assert_eq!(snapshot.gps.as_deref(), Some("$GPGGA"));
        assert_eq!(record.dht22, snapshot.dht22);
        assert_eq!(record.timestamp, ts(1_000));
    }

    #[test]
    fn invalid_humidity_carries_previous_value_forward() {
        let mut previous = DeviceSnapshot::new("A", ts(0));
        previous.dht22 = [Some(sample(20.0, 50.0)), None];

        let reading = Reading {
            dht22: Some(vec![Some(sample(22.0, 150.0)), Some(sample(18.0, 40.0))]),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", Some(previous), reading, ts(60));

        assert_eq!(snapshot.dht22[0], Some(sample(20.0, 50.0)));
        assert_eq!(snapshot.dht22[1], Some(sample(18.0, 40.0)));
        assert_eq!(record.dht22[0], Some(ChannelSample::nulled()));
        assert_eq!(record.dht22[1], Some(sample(18.0, 40.0)));
    }

    #[test]
    fn invalid_humidity_without_previous_leaves_channel_empty() {
        let reading = Reading {
            dht22: Some(vec![Some(sample(22.0, 130.0))]),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", None, reading, ts(60));

        assert_eq!(snapshot.dht22[0], None);
        assert_eq!(record.dht22[0], Some(ChannelSample::nulled()));
    }

    #[test]
    fn boundary_humidity_is_valid() {
        let reading = Reading {
            dht22: Some(vec![Some(sample(25.0, 100.0))]),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", None, reading, ts(60));

        assert_eq!(snapshot.dht22[0], Some(sample(25.0, 100.0)));
        assert_eq!(record.dht22[0], Some(sample(25.0, 100.0)));
    }

    #[test]
    fn absent_channel_keeps_previous_value() {
        let mut previous = DeviceSnapshot::new("A", ts(0));
        previous.dht22 = [Some(sample(20.0, 50.0)), Some(sample(10.0, 70.0))];

        let reading = Reading {
            dht22: Some(vec![Some(sample(21.0, 51.0))]),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", Some(previous), reading, ts(60));

        assert_eq!(snapshot.dht22[0], Some(sample(21.0, 51.0)));
        assert_eq!(snapshot.dht22[1], Some(sample(10.0, 70.0)));
        assert_eq!(record.dht22[1], None);
    }

    #[test]
    fn extra_channels_are_dropped() {
        let reading = Reading {
            dht22: Some(vec![
                Some(sample(1.0, 10.0)),
                Some(sample(2.0, 20.0)),
                Some(sample(3.0, 30.0)),
            ]),
            ..Default::default()
        };

        let (snapshot, _) = reconcile("A", None, reading, ts(0));

        assert_eq!(snapshot.dht22.len(), CHANNEL_COUNT);
        assert_eq!(snapshot.dht22[1], Some(sample(2.0, 20.0)));
    }

    #[test]
    fn power_and_gps_replace_wholesale() {
        let mut previous = DeviceSnapshot::new("A", ts(0));
        previous.power = Some(PowerStatus {
            vbat: Some(4100.0),
            is_charging: Some(true),
            ..Default::default()
        });
        previous.gps = Some("old fix".into());

        let reading = Reading {
            power: Some(PowerStatus {
                vsol: Some(5000.0),
                ..Default::default()
            }),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", Some(previous), reading, ts(60));

        // power is replaced as a whole, no field level merge
        let power = snapshot.power.unwrap();
        assert_eq!(power.vsol, Some(5000.0));
        assert_eq!(power.vbat, None);
        // gps was absent from the reading, previous value stays
        assert_eq!(snapshot.gps.as_deref(), Some("old fix"));
        assert_eq!(record.gps, None);
    }

    #[test]
    fn empty_reading_only_touches_timestamp() {
        let mut previous = DeviceSnapshot::new("A", ts(0));
        previous.dht22 = [Some(sample(20.0, 50.0)), None];
        previous.pollen_count = Some(7);
        let expected_channels = previous.dht22;

        let (snapshot, record) = reconcile("A", Some(previous), Reading::default(), ts(60));

        assert_eq!(snapshot.timestamp, ts(60));
        assert_eq!(snapshot.dht22, expected_channels);
        assert_eq!(snapshot.pollen_count, Some(7));
        assert_eq!(record.dht22, [None, None]);
        assert_eq!(record.pollen_count, None);
    }

    #[test]
    fn upload_fields_update_snapshot() {
        let previous = DeviceSnapshot::new("A", ts(0));
        let reading = Reading {
            image: Some("A_2024-01-01T00-00-00.jpg".into()),
            pollen_count: Some(42),
            detections: Some(serde_json::json!([{ "x": 1 }])),
            ..Default::default()
        };

        let (snapshot, record) = reconcile("A", Some(previous), reading, ts(60));

        assert_eq!(
            snapshot.last_image.as_deref(),
            Some("A_2024-01-01T00-00-00.jpg")
        );
        assert_eq!(snapshot.pollen_count, Some(42));
        assert_eq!(record.image, snapshot.last_image);
        assert_eq!(record.detections, snapshot.detections);
    }
}
