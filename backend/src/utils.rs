use chrono::{DateTime, Utc};

/// Filename for a stored upload. Colons are not safe on every filesystem,
/// so the time part uses dashes throughout.
pub fn image_filename(device: &str, timestamp: DateTime<Utc>) -> String {
    format!("{}_{}.jpg", device, timestamp.format("%Y-%m-%dT%H-%M-%S"))
}

/// Client declared upload time when present and parseable, else `fallback`
/// (the server receipt time).
pub fn upload_timestamp(declared: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    declared
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn image_filename_has_no_colons() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(image_filename("BoxA", at), "BoxA_2024-01-02T03-04-05.jpg");
    }

    #[test]
    fn declared_timestamp_wins_when_parseable() {
        let fallback = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let declared = upload_timestamp(Some("2024-01-02T03:04:05Z"), fallback);
        assert_eq!(declared, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_receipt_time() {
        let fallback = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(upload_timestamp(Some("yesterday"), fallback), fallback);
        assert_eq!(upload_timestamp(None, fallback), fallback);
    }
}
