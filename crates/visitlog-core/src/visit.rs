use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder for a field whose value could not be determined.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder IP recorded when the lookup itself blew up.
pub const ERROR: &str = "Error";

/// One logged visit, as persisted in the visit slot.
///
/// Field order matches the stored JSON object. Missing or `null` string
/// fields read back as `"Unknown"` and extra fields are ignored, so older and
/// newer writers can share one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub id: String,
    /// RFC 3339 rendering of `timestamp`; display only.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub time: String,
    #[serde(default = "unknown", deserialize_with = "string_or_unknown")]
    pub ip: String,
    #[serde(default = "unknown", deserialize_with = "string_or_unknown")]
    pub browser: String,
    #[serde(default = "unknown", deserialize_with = "string_or_unknown")]
    pub platform: String,
    /// Milliseconds since the Unix epoch. Drives ordering and dedup.
    #[serde(default, deserialize_with = "millis_or_zero")]
    pub timestamp: i64,
}

impl VisitRecord {
    pub fn new(ip: &str, browser: &str, platform: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_visit_id(now),
            time: format_time(now),
            ip: ip.to_string(),
            browser: browser.to_string(),
            platform: platform.to_string(),
            timestamp: now.timestamp_millis(),
        }
    }

    /// Fill whichever of `timestamp`/`time` is missing from the other, and
    /// give a record stored without an `id` one derived from its timestamp
    /// and IP so it reads back the same every time and can be deleted.
    pub fn normalized(mut self) -> Self {
        if self.timestamp == 0 {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.time) {
                self.timestamp = parsed.timestamp_millis();
            }
        }
        if self.time.is_empty() || DateTime::parse_from_rfc3339(&self.time).is_err() {
            if let Some(at) = self.visited_at() {
                self.time = format_time(at);
            }
        }
        if self.id.trim().is_empty() {
            self.id = derived_visit_id(self.timestamp, &self.ip);
        }
        self
    }

    /// The visit instant, if `timestamp` holds a usable value.
    pub fn visited_at(&self) -> Option<DateTime<Utc>> {
        if self.timestamp == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Aggregates shown above the visit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitStats {
    pub total: usize,
    pub unique_ips: usize,
}

impl VisitStats {
    pub fn from_visits(visits: &[VisitRecord]) -> Self {
        let unique: HashSet<&str> = visits.iter().map(|v| v.ip.as_str()).collect();
        Self {
            total: visits.len(),
            unique_ips: unique.len(),
        }
    }
}

/// Generate a visit ID: base-36 wall-clock millis followed by a base-36
/// random 64-bit suffix.
///
/// The random half alone makes collisions within a 1000-entry slot
/// negligible; the time prefix keeps IDs roughly sortable when eyeballed.
pub fn generate_visit_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let suffix: u64 = rand::thread_rng().gen();
    let mut id = to_base36(millis);
    id.push_str(&to_base36(suffix));
    id
}

/// Stable id for a record persisted without one: base-36 timestamp followed
/// by the IP's alphanumerics, lowercased.
fn derived_visit_id(timestamp: i64, ip: &str) -> String {
    let mut id = to_base36(u64::try_from(timestamp).unwrap_or(0));
    id.extend(
        ip.chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase()),
    );
    id
}

/// `2024-05-01T12:00:00.000Z`
pub fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn string_or_unknown<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown))
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn millis_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}
