//! Time-window filtering relative to the local calendar day.
//!
//! Windows are anchored at the start of the current local day. `ThisWeek`
//! and `ThisMonth` reach back a fixed 7×24h / 30×24h from that anchor; they
//! are not calendar-week or calendar-month aware.

use chrono::{DateTime, Duration, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::{MONTH_WINDOW_DAYS, WEEK_WINDOW_DAYS};

/// Named time windows selectable in the filter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Timeframe {
    /// No temporal restriction
    #[default]
    All,
    /// Since local midnight
    Today,
    /// Since local midnight minus 7 days
    ThisWeek,
    /// Since local midnight minus 30 days
    ThisMonth,
}

impl Timeframe {
    /// Inclusive lower bound for `date_added`, or `None` for [`Timeframe::All`].
    pub fn window_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let day_start = start_of_day(now);
        match self {
            Self::All => None,
            Self::Today => Some(day_start),
            Self::ThisWeek => Some(day_start - Duration::days(WEEK_WINDOW_DAYS)),
            Self::ThisMonth => Some(day_start - Duration::days(MONTH_WINDOW_DAYS)),
        }
    }

    /// True when `date_added` falls inside the window evaluated at `now`.
    pub fn contains<Tz: TimeZone>(&self, date_added: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        match self.window_start(now) {
            Some(start) => *date_added >= start,
            None => true,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Today => write!(f, "today"),
            Self::ThisWeek => write!(f, "thisWeek"),
            Self::ThisMonth => write!(f, "thisMonth"),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "all" => Ok(Self::All),
            "today" => Ok(Self::Today),
            "thisweek" => Ok(Self::ThisWeek),
            "thismonth" => Ok(Self::ThisMonth),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

/// Midnight of `now`'s calendar day in `now`'s own time zone, as a UTC instant.
///
/// When local midnight does not exist (a DST gap), the offset in effect at
/// `now` is applied to the naive midnight instead.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.with_timezone(&Utc),
        None => {
            let offset_secs = i64::from(now.offset().fix().local_minus_utc());
            Utc.from_utc_datetime(&(midnight - Duration::seconds(offset_secs)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn utc(rfc3339: &str) -> DateTime<Utc> {
        at(rfc3339).with_timezone(&Utc)
    }

    #[test]
    fn test_start_of_day_in_offset_zone() {
        let now = at("2024-06-10T01:00:00+02:00");
        assert_eq!(start_of_day(&now), utc("2024-06-09T22:00:00Z"));
    }

    #[test]
    fn test_all_has_no_window() {
        let now = at("2024-06-10T01:00:00+00:00");
        assert_eq!(Timeframe::All.window_start(&now), None);
        assert!(Timeframe::All.contains(&utc("1970-01-01T00:00:00Z"), &now));
    }

    #[test]
    fn test_today_excludes_twenty_five_hours_ago() {
        let now = at("2024-06-10T01:00:00+00:00");
        let yesterday = utc("2024-06-09T00:00:00Z");
        assert!(!Timeframe::Today.contains(&yesterday, &now));
        assert!(Timeframe::Today.contains(&utc("2024-06-10T00:00:00Z"), &now));
    }

    #[test]
    fn test_week_window_is_seven_days_before_midnight() {
        let now = at("2024-06-10T15:30:00+00:00");
        assert_eq!(
            Timeframe::ThisWeek.window_start(&now),
            Some(utc("2024-06-03T00:00:00Z"))
        );
        assert!(Timeframe::ThisWeek.contains(&utc("2024-06-03T00:00:00Z"), &now));
        assert!(!Timeframe::ThisWeek.contains(&utc("2024-06-02T23:59:59Z"), &now));
    }

    #[test]
    fn test_month_window_is_thirty_days_not_calendar_month() {
        let now = at("2024-03-31T12:00:00+00:00");
        assert_eq!(
            Timeframe::ThisMonth.window_start(&now),
            Some(utc("2024-03-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_timeframe_parse_and_display() {
        assert_eq!("thisWeek".parse::<Timeframe>().unwrap(), Timeframe::ThisWeek);
        assert_eq!("this_month".parse::<Timeframe>().unwrap(), Timeframe::ThisMonth);
        assert_eq!(Timeframe::ThisMonth.to_string(), "thisMonth");
        assert!("yesterday".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_timeframe_serde_uses_camel_case() {
        let json = serde_json::to_string(&Timeframe::ThisWeek).unwrap();
        assert_eq!(json, "\"thisWeek\"");
    }
}
