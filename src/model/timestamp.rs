use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{invalid_argument, FirestoreResult};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Layouts accepted by [`Timestamp::parse_lenient`] for offset-less date-times, read as UTC.
const NAIVE_LAYOUTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// A point in time with nanosecond precision, stored as seconds and nanos since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let mut timestamp = Self { seconds, nanos };
        timestamp.normalize();
        timestamp
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime.timestamp(), datetime.timestamp_subsec_nanos() as i32)
    }

    /// Returns `None` when the timestamp lies outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos as u32).single()
    }

    /// RFC 3339 rendering in UTC with nanosecond precision, as the REST API expects.
    pub fn to_rfc3339(&self) -> String {
        let datetime = self.to_datetime().unwrap_or_else(|| {
            log::debug!(
                "timestamp {}s/{}ns is out of range; encoding as the Unix epoch",
                self.seconds,
                self.nanos
            );
            DateTime::<Utc>::default()
        });
        datetime.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn parse_rfc3339(value: &str) -> FirestoreResult<Self> {
        let datetime = DateTime::parse_from_rfc3339(value.trim())
            .map_err(|err| invalid_argument(format!("Invalid timestamp '{value}': {err}")))?;
        Ok(Self::from_datetime(datetime.with_timezone(&Utc)))
    }

    /// Strict RFC 3339 first, then epoch seconds (`1700000000`, `1700000000.25`,
    /// `@1700000000`), offset-less date-times, RFC 2822 and bare dates.
    pub fn parse_lenient(value: &str) -> FirestoreResult<Self> {
        if let Ok(timestamp) = Self::parse_rfc3339(value) {
            return Ok(timestamp);
        }

        let trimmed = value.trim();
        if let Some(timestamp) = parse_epoch(trimmed.strip_prefix('@').unwrap_or(trimmed)) {
            return Ok(timestamp);
        }
        for layout in NAIVE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Ok(Self::from_datetime(naive.and_utc()));
            }
        }
        if let Ok(datetime) = DateTime::parse_from_rfc2822(trimmed) {
            return Ok(Self::from_datetime(datetime.with_timezone(&Utc)));
        }
        if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::from_datetime(midnight.and_utc()));
        }

        Err(invalid_argument(format!("Unrecognised timestamp '{value}'")))
    }

    /// Folds out-of-range nanos into seconds. Seconds saturate at the `i64` bounds.
    fn normalize(&mut self) {
        let nanos = self.nanos as i64;
        let carry = nanos.div_euclid(NANOS_PER_SECOND);
        match self.seconds.checked_add(carry) {
            Some(seconds) => {
                self.seconds = seconds;
                self.nanos = nanos.rem_euclid(NANOS_PER_SECOND) as i32;
            }
            None if carry > 0 => {
                self.seconds = i64::MAX;
                self.nanos = (NANOS_PER_SECOND - 1) as i32;
            }
            None => {
                self.seconds = i64::MIN;
                self.nanos = 0;
            }
        }
    }
}

fn parse_epoch(value: &str) -> Option<Timestamp> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(Timestamp::new(seconds, 0));
    }
    let float = value.parse::<f64>().ok().filter(|f| f.is_finite())?;
    let seconds = float.floor();
    let nanos = ((float - seconds) * NANOS_PER_SECOND as f64).round() as i32;
    Some(Timestamp::new(seconds as i64, nanos))
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds
            .cmp(&other.seconds)
            .then(self.nanos.cmp(&other.nanos))
    }
}
