use chrono::{DateTime, Utc};

/// History queries never return more than this many records.
pub const HISTORY_LIMIT: i64 = 100;

/// Restriction over the history table, built from the optional HTTP query
/// parameters. Consumers apply it newest first, capped at [`HISTORY_LIMIT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Exact, case sensitive device name match.
    pub device: Option<String>,
    /// Half open interval, `from <= timestamp < until`.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl HistoryFilter {
    /// A time restriction only applies when both bounds are given. A
    /// one-sided range is dropped entirely rather than treated as an open
    /// ended bound, which is what the dashboard API has always done.
    pub fn new(
        device: Option<String>,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            device,
            range: from.zip(until),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn builds_same_filter_for_same_arguments() {
        let a = HistoryFilter::new(Some("BoxA".into()), Some(ts(0)), Some(ts(100)));
        let b = HistoryFilter::new(Some("BoxA".into()), Some(ts(0)), Some(ts(100)));
        assert_eq!(a, b);
    }

    #[test]
    fn one_sided_range_is_ignored() {
        let from_only = HistoryFilter::new(Some("BoxA".into()), Some(ts(0)), None);
        let until_only = HistoryFilter::new(Some("BoxA".into()), None, Some(ts(100)));
        let unbounded = HistoryFilter::new(Some("BoxA".into()), None, None);

        assert_eq!(from_only, unbounded);
        assert_eq!(until_only, unbounded);
    }

    #[test]
    fn full_range_is_kept() {
        let filter = HistoryFilter::new(None, Some(ts(10)), Some(ts(20)));
        assert_eq!(filter.device, None);
        assert_eq!(filter.range, Some((ts(10), ts(20))));
    }
}
