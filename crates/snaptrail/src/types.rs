use crate::error::TimeError;
use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A decoded snapshot: top-level fields in document order.
pub type Document = serde_json::Map<String, Value>;

/// The columns of one row before it is tagged with its revision.
pub type Fields = serde_json::Map<String, Value>;

// ── Revisions ────────────────────────────────────────────────────────

/// Time recorded by a revision: epoch seconds plus the author's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitTime {
    pub seconds: i64,
    pub offset_minutes: i32,
}

impl CommitTime {
    pub fn new(seconds: i64, offset_minutes: i32) -> Self {
        CommitTime {
            seconds,
            offset_minutes,
        }
    }

    /// The commit instant expressed in the given zone.
    ///
    /// The instant is the same for every [`TimeZoneMode`]; only the offset used
    /// for rendering changes.
    pub fn in_zone(&self, zone: TimeZoneMode) -> Result<DateTime<FixedOffset>, TimeError> {
        let out_of_range = || TimeError {
            seconds: self.seconds,
            offset_minutes: self.offset_minutes,
        };
        let utc = DateTime::<Utc>::from_timestamp(self.seconds, 0).ok_or_else(out_of_range)?;
        match zone {
            TimeZoneMode::Local => Ok(utc.with_timezone(&Local).fixed_offset()),
            TimeZoneMode::Utc => Ok(utc.fixed_offset()),
            TimeZoneMode::Commit => {
                let offset = self
                    .offset_minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or_else(out_of_range)?;
                Ok(utc.with_timezone(&offset))
            }
        }
    }
}

/// One revision of the tracked path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Opaque unique identity (a full commit hash for git).
    pub id: String,
    pub time: CommitTime,
}

impl Revision {
    pub fn new(id: impl Into<String>, time: CommitTime) -> Self {
        Revision {
            id: id.into(),
            time,
        }
    }
}

/// Zone in which commit times are expressed in the output table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeZoneMode {
    /// The host's local clock, as naive timestamps were historically produced.
    #[default]
    Local,
    Utc,
    /// The offset recorded in the commit itself.
    Commit,
}

impl fmt::Display for TimeZoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneMode::Local => write!(f, "local"),
            TimeZoneMode::Utc => write!(f, "utc"),
            TimeZoneMode::Commit => write!(f, "commit"),
        }
    }
}

impl FromStr for TimeZoneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(TimeZoneMode::Local),
            "utc" => Ok(TimeZoneMode::Utc),
            "commit" => Ok(TimeZoneMode::Commit),
            other => Err(format!(
                "unknown time zone mode '{}' (expected local, utc or commit)",
                other
            )),
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

/// One flattened observation tagged with the revision it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub revision: String,
    pub commit_time: DateTime<FixedOffset>,
    /// Observation and metadata columns; never holds the reserved columns.
    pub fields: Fields,
}

impl Row {
    /// Value of a data column. `None` when the row lacks the column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_zone_utc() {
        let time = CommitTime::new(1_700_000_000, 120);
        let dt = time.in_zone(TimeZoneMode::Utc).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_in_zone_commit_offset() {
        let time = CommitTime::new(1_700_000_000, 120);
        let dt = time.in_zone(TimeZoneMode::Commit).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        assert_eq!(dt.offset().local_minus_utc(), 7200);
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-11-15 00:13:20");
    }

    #[test]
    fn test_in_zone_local_keeps_instant() {
        let time = CommitTime::new(1_700_000_000, -300);
        let dt = time.in_zone(TimeZoneMode::Local).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_in_zone_out_of_range() {
        let time = CommitTime::new(i64::MAX, 0);
        assert!(time.in_zone(TimeZoneMode::Utc).is_err());

        let time = CommitTime::new(0, 100_000);
        assert!(time.in_zone(TimeZoneMode::Commit).is_err());
        // The bad offset only matters when it is used.
        assert!(time.in_zone(TimeZoneMode::Utc).is_ok());
    }

    #[test]
    fn test_time_zone_mode_parse() {
        assert_eq!("local".parse::<TimeZoneMode>().unwrap(), TimeZoneMode::Local);
        assert_eq!("UTC".parse::<TimeZoneMode>().unwrap(), TimeZoneMode::Utc);
        assert_eq!("commit".parse::<TimeZoneMode>().unwrap(), TimeZoneMode::Commit);
        assert!("mars".parse::<TimeZoneMode>().is_err());
    }

    #[test]
    fn test_time_zone_mode_display_roundtrip() {
        for mode in [TimeZoneMode::Local, TimeZoneMode::Utc, TimeZoneMode::Commit] {
            assert_eq!(mode.to_string().parse::<TimeZoneMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_row_get() {
        let mut fields = Fields::new();
        fields.insert("t".into(), Value::from(1));
        let row = Row {
            revision: "abc".into(),
            commit_time: CommitTime::new(0, 0).in_zone(TimeZoneMode::Utc).unwrap(),
            fields,
        };
        assert_eq!(row.get("t"), Some(&Value::from(1)));
        assert_eq!(row.get("v"), None);
    }
}
