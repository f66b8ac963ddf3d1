use chrono::{DateTime, Local, TimeZone};

use crate::constants::SNAPSHOT_KEY_FORMAT;

/// Object key for a snapshot taken at `at`, e.g. `2024_03_07__15_04.raft`.
///
/// Minute granularity: two runs within the same minute produce the same key
/// and the later upload replaces the earlier object.
pub fn snapshot_key<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(SNAPSHOT_KEY_FORMAT).to_string()
}

/// Key for a snapshot taken now, in local time.
pub fn current_snapshot_key() -> String {
    snapshot_key(&Local::now())
}
