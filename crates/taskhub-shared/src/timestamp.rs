//! Serde helpers for backend
//! timestamps. Rows fetched over REST
//! carry RFC 3339 text while realtime
//! payloads may carry the Postgres text
//! form (`2024-05-01 10:00:00.5+00`).
//! Values without an offset come from
//! `timestamp` columns and are read as
//! UTC.

use chrono::{
  DateTime,
  NaiveDateTime,
  Utc
};
use serde::{
  Deserialize,
  Deserializer,
  Serializer
};

pub fn parse(
  raw: &str
) -> Option<DateTime<Utc>> {
  let trimmed = raw.trim();
  if let Ok(parsed) =
    DateTime::parse_from_rfc3339(trimmed)
  {
    return Some(
      parsed.with_timezone(&Utc)
    );
  }

  if let Ok(parsed) =
    DateTime::parse_from_str(
      trimmed,
      "%Y-%m-%d %H:%M:%S%.f%#z"
    )
  {
    return Some(
      parsed.with_timezone(&Utc)
    );
  }

  [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f"
  ]
  .iter()
  .find_map(|fmt| {
    NaiveDateTime::parse_from_str(
      trimmed, fmt
    )
    .ok()
  })
  .map(|naive| naive.and_utc())
}

pub fn serialize<S>(
  value: &DateTime<Utc>,
  serializer: S
) -> Result<S::Ok, S::Error>
where
  S: Serializer
{
  serializer
    .serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D>(
  deserializer: D
) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>
{
  let raw =
    String::deserialize(deserializer)?;
  parse(&raw).ok_or_else(|| {
    serde::de::Error::custom(format!(
      "invalid timestamp: {raw}"
    ))
  })
}
