//! Deadline values as they travel between the collaborator and the board.
//!
//! The raw text is kept verbatim so an edit round-trips exactly what the
//! collaborator stored. Text that cannot be read as a point in time is still a
//! deadline; it just has no instant and evaluates as already expired.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Naive forms produced by HTML `datetime-local` inputs and similar.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Column format for a deadline shown to people.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    raw: String,
    instant: Option<DateTime<Utc>>,
}

impl Deadline {
    /// Parse deadline text. Blank input means "no deadline" and yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            raw: trimmed.to_string(),
            instant: parse_instant(trimmed),
        })
    }

    /// A deadline at an exact instant, rendered as RFC 3339.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339(),
            instant: Some(instant),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The instant this deadline falls on, if the text was understood.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    pub fn is_parseable(&self) -> bool {
        self.instant.is_some()
    }

    /// Local wall-clock rendering, e.g. `2025-01-10 14:30`.
    pub fn display(&self) -> Option<String> {
        self.display_in(&Local)
    }

    pub fn display_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<String>
    where
        Tz::Offset: std::fmt::Display,
    {
        self.instant
            .map(|at| at.with_timezone(tz).format(DISPLAY_FORMAT).to_string())
    }
}

impl From<DateTime<Utc>> for Deadline {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::at(instant)
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    LOCAL_FORMATS.iter().find_map(|fmt| {
        let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
        resolve_local(&Local, &naive)
    })
}

/// Pin a wall-clock time in `tz` to an instant.
///
/// Repeated times take the earlier instant. Times skipped by a forward
/// transition keep the offset in force before it, which lands them the
/// length of the gap later on the new wall clock.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let before = tz
                .from_local_datetime(&(*naive - Duration::days(1)))
                .earliest()?;
            let offset = i64::from(before.offset().fix().local_minus_utc());
            Some(Utc.from_utc_datetime(&(*naive - Duration::seconds(offset))))
        }
    }
}

impl Serialize for Deadline {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("deadline is blank"))
    }
}

/// Reads an optional deadline, folding `null`, missing and blank text into `None`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<Deadline>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Deadline::parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{evaluate, StatusLabel};
    use chrono::{FixedOffset, NaiveDate};

    #[test]
    fn test_parse_rfc3339() {
        let deadline = Deadline::parse("2025-01-10T14:30:00Z").unwrap();
        assert_eq!(
            deadline.instant(),
            Some(Utc.with_ymd_and_hms(2025, 1, 10, 14, 30, 0).unwrap())
        );
        assert_eq!(deadline.raw(), "2025-01-10T14:30:00Z");
    }

    #[test]
    fn test_parse_offset_is_normalized() {
        let deadline = Deadline::parse("2025-01-10T21:30:00+07:00").unwrap();
        assert_eq!(
            deadline.instant(),
            Some(Utc.with_ymd_and_hms(2025, 1, 10, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_datetime_local() {
        let deadline = Deadline::parse("2025-01-10T14:30").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 1, 10, 14, 30, 0)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        assert_eq!(deadline.instant(), expected);
    }

    /// Eastern time with the 2030 spring-forward at 02:00 local.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn est() -> FixedOffset {
            FixedOffset::west_opt(5 * 3_600).unwrap()
        }

        fn edt() -> FixedOffset {
            FixedOffset::west_opt(4 * 3_600).unwrap()
        }

        fn gap_start() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2030, 3, 10)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::gap_start();
            if *local < gap_start {
                LocalResult::Single(Self::est())
            } else if *local < gap_start + Duration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::edt())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            // 02:00 EST is 07:00 UTC.
            if *utc < Self::gap_start() + Duration::hours(5) {
                Self::est()
            } else {
                Self::edt()
            }
        }
    }

    fn local(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn test_time_inside_spring_gap_moves_forward() {
        let at = resolve_local(&SpringForward, &local("2030-03-10T02:30")).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2030, 3, 10, 7, 30, 0).unwrap());

        let deadline = Deadline {
            raw: "2030-03-10T02:30".to_string(),
            instant: Some(at),
        };
        let new_year = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            evaluate(Some(&deadline), false, new_year),
            StatusLabel::Relative(_)
        ));
        assert_eq!(
            deadline.display_in(&SpringForward).as_deref(),
            Some("2030-03-10 03:30")
        );
    }

    #[test]
    fn test_times_around_spring_gap() {
        let before = resolve_local(&SpringForward, &local("2030-03-10T01:59")).unwrap();
        assert_eq!(before, Utc.with_ymd_and_hms(2030, 3, 10, 6, 59, 0).unwrap());
        let after = resolve_local(&SpringForward, &local("2030-03-10T03:00")).unwrap();
        assert_eq!(after, Utc.with_ymd_and_hms(2030, 3, 10, 7, 0, 0).unwrap());
    }

    #[test]
    fn test_display_uses_column_format() {
        let deadline = Deadline::parse("2025-01-10T21:30:00+07:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(deadline.display_in(&utc).as_deref(), Some("2025-01-10 14:30"));

        let deadline = Deadline::parse("2025-01-10T14:30").unwrap();
        assert_eq!(deadline.display().as_deref(), Some("2025-01-10 14:30"));

        let garbage = Deadline::parse("soon").unwrap();
        assert!(garbage.display().is_none());
    }

    #[test]
    fn test_blank_is_no_deadline() {
        assert!(Deadline::parse("").is_none());
        assert!(Deadline::parse("   ").is_none());
    }

    #[test]
    fn test_garbage_is_kept_unparsed() {
        let deadline = Deadline::parse("next tuesday-ish").unwrap();
        assert!(!deadline.is_parseable());
        assert_eq!(deadline.raw(), "next tuesday-ish");
    }

    #[test]
    fn test_optional_field_folding() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "deserialize_optional")]
            deadline: Option<Deadline>,
        }

        let row: Row = serde_json::from_str(r#"{"deadline": null}"#).unwrap();
        assert!(row.deadline.is_none());
        let row: Row = serde_json::from_str(r#"{"deadline": ""}"#).unwrap();
        assert!(row.deadline.is_none());
        let row: Row = serde_json::from_str(r#"{}"#).unwrap();
        assert!(row.deadline.is_none());
        let row: Row = serde_json::from_str(r#"{"deadline": "2025-01-10T14:30:00Z"}"#).unwrap();
        assert!(row.deadline.unwrap().is_parseable());
    }
}
