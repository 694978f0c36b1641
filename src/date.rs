use crate::error::{PipelineError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Source timestamp for a comment: either naive (no offset recorded) or zoned.
/// Serialized as ISO-8601; naive values carry no offset suffix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishedAt {
    Naive(PrimitiveDateTime),
    Zoned(OffsetDateTime),
}

impl PublishedAt {
    /// Naive values are assumed to already be UTC (offset attached, no shift);
    /// zoned values are converted.
    pub fn to_utc(self) -> OffsetDateTime {
        match self {
            PublishedAt::Naive(dt) => dt.assume_utc(),
            PublishedAt::Zoned(dt) => dt.to_offset(UtcOffset::UTC),
        }
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, PublishedAt::Naive(_))
    }
}

impl From<OffsetDateTime> for PublishedAt {
    fn from(dt: OffsetDateTime) -> Self {
        PublishedAt::Zoned(dt)
    }
}

impl From<PrimitiveDateTime> for PublishedAt {
    fn from(dt: PrimitiveDateTime) -> Self {
        PublishedAt::Naive(dt)
    }
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishedAt::Zoned(dt) => dt.format(&Rfc3339),
            PublishedAt::Naive(dt) if dt.nanosecond() == 0 => {
                dt.format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
            }
            // Same subsecond digits as Rfc3339 emits for zoned values, without the `Z`.
            PublishedAt::Naive(dt) => dt
                .assume_utc()
                .format(&Rfc3339)
                .map(|s| s.trim_end_matches('Z').to_string()),
        };
        f.write_str(&s.map_err(|_| fmt::Error)?)
    }
}

impl FromStr for PublishedAt {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
            return Ok(PublishedAt::Zoned(dt));
        }
        if let Ok(dt) = PrimitiveDateTime::parse(
            s,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        ) {
            return Ok(PublishedAt::Naive(dt));
        }
        PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
            .map(PublishedAt::Naive)
            .map_err(|e| format!("expected ISO-8601 timestamp, got {s:?}: {e}"))
    }
}

impl Serialize for PublishedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublishedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// `1970-01-01T00:00:00Z`, the sentinel for comments without a publish time.
pub fn epoch_utc() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

/// Drop sub-microsecond precision so values survive a Parquet round trip unchanged.
pub fn truncate_to_micros(dt: OffsetDateTime) -> OffsetDateTime {
    dt.replace_nanosecond(dt.nanosecond() / 1_000 * 1_000).unwrap_or(dt)
}

/// Current wall clock in UTC at microsecond precision.
pub fn now_utc() -> OffsetDateTime {
    truncate_to_micros(OffsetDateTime::now_utc())
}

pub fn to_unix_micros(dt: OffsetDateTime) -> i64 {
    dt.unix_timestamp_nanos().div_euclid(1_000) as i64
}

pub fn from_unix_micros(micros: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|e| PipelineError::Timestamp(format!("{micros}us out of range: {e}")))
}
