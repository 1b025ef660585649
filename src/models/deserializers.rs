use chrono::DateTime;
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Lenient deserializer for epoch timestamps stored as seconds
///
/// Export files carry `create_time`/`update_time` as floating-point seconds, but older
/// exports and hand-edited files also show integers, numeric strings, RFC3339 strings and
/// `null`. Anything unrecognised becomes `None` instead of failing the whole record.
pub fn deserialize_epoch_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|secs| secs.is_finite()),
        Some(Value::String(s)) => parse_epoch_string(&s),
        _ => None,
    })
}

fn parse_epoch_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if let Ok(secs) = trimmed.parse::<f64>() {
        return secs.is_finite().then_some(secs);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_millis()) / 1000.0)
}

/// Deserializer for string ids that may be missing, `null`, or numeric
pub fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::custom(format!("id must be a string, found {}", other))),
    }
}

/// Treats an explicit `null` like a missing field
///
/// Exports occasionally null out collections and nested objects (`"mapping": null`,
/// `"children": null`); those read as the type's default.
pub fn deserialize_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
