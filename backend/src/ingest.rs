use anyhow::Result;
use chrono::{DateTime, Utc};

use common::reading::Reading;

use crate::db::Db;
use crate::reconcile;

/// Apply one decoded reading: look up the stored snapshot, reconcile,
/// persist both outputs. Shared by the datagram loop and the upload
/// endpoint. A store error aborts this one reading, nothing is retried.
pub fn apply_reading(
    db: &mut Db,
    device: &str,
    reading: Reading,
    now: DateTime<Utc>,
) -> Result<()> {
    let previous = db.find_snapshot(device)?;
    let (snapshot, record) = reconcile::reconcile(device, previous, reading, now);
    db.upsert_snapshot(&snapshot)?;
    db.append_history(&record)?;
    Ok(())
}
