use chrono::{DateTime, Utc};

/// Converts floating-point epoch seconds into a UTC timestamp
pub fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Formats epoch seconds as a `YYYY.MM.DD` UTC date stamp
///
/// Out-of-range values file under the epoch, like records without any timestamp.
pub fn date_stamp(secs: f64) -> String {
    epoch_to_datetime(secs)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .format("%Y.%m.%d")
        .to_string()
}
