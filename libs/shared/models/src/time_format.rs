//! Lenient wall-clock parsing for request bodies: clients send both `09:00`
//! and `09:00:00`.

use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer};

const FORMATS: [&str; 3] = ["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}'", raw)))
}

pub fn deserialize_many<'de, D>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|raw| parse_time(raw).ok_or_else(|| de::Error::custom(format!("invalid time '{}'", raw))))
        .collect()
}
