//! Resolution tags, canonical durations and bin alignment.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `2016-07-31T00:00:00Z`. Calendar units are measured from here so that
/// month and year durations are the same wherever they are compared.
pub const REFERENCE_INSTANT: i64 = 1_469_923_200;

/// `1970-01-05T00:00:00Z`, the first Monday after the epoch.
const FIRST_MONDAY: i64 = 4 * 86_400;

/// Time unit of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// Seconds in one unit, `None` for calendar units.
    fn fixed_seconds(self) -> Option<i64> {
        match self {
            TimeUnit::Second => Some(1),
            TimeUnit::Minute => Some(60),
            TimeUnit::Hour => Some(3_600),
            TimeUnit::Day => Some(86_400),
            TimeUnit::Week => Some(7 * 86_400),
            TimeUnit::Month | TimeUnit::Year => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Second => "s",
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Week => "w",
            TimeUnit::Month => "M",
            TimeUnit::Year => "y",
        }
    }

    fn parse_suffix(s: &str) -> Option<Self> {
        let unit = match s {
            "s" | "sec" | "S" => TimeUnit::Second,
            "min" | "T" | "minute" => TimeUnit::Minute,
            "h" | "H" | "hour" => TimeUnit::Hour,
            "d" | "D" | "day" => TimeUnit::Day,
            "w" | "W" | "week" => TimeUnit::Week,
            // Bare "m" means month, matching the `1m` ladder button.
            "m" | "M" | "mo" | "month" => TimeUnit::Month,
            "y" | "Y" | "year" => TimeUnit::Year,
            _ => return None,
        };
        Some(unit)
    }
}

/// A bin width such as `1min`, `4h` or `1M`.
///
/// Resolutions are totally ordered by [`Resolution::duration_seconds`]; equal
/// durations with different spellings (`60min` and `1h`) fall back to unit
/// and count so the order stays consistent with equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    count: u32,
    unit: TimeUnit,
}

impl Resolution {
    pub const fn new(count: u32, unit: TimeUnit) -> Self {
        Self { count, unit }
    }

    pub const fn seconds(count: u32) -> Self {
        Self::new(count, TimeUnit::Second)
    }

    pub const fn minutes(count: u32) -> Self {
        Self::new(count, TimeUnit::Minute)
    }

    pub const fn hours(count: u32) -> Self {
        Self::new(count, TimeUnit::Hour)
    }

    pub const fn days(count: u32) -> Self {
        Self::new(count, TimeUnit::Day)
    }

    pub const fn weeks(count: u32) -> Self {
        Self::new(count, TimeUnit::Week)
    }

    pub const fn months(count: u32) -> Self {
        Self::new(count, TimeUnit::Month)
    }

    pub const fn years(count: u32) -> Self {
        Self::new(count, TimeUnit::Year)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Canonical duration in seconds.
    ///
    /// Months and years are measured by adding them once to
    /// [`REFERENCE_INSTANT`]: `1M` is 31 days and `1y` is 365 days.
    pub fn duration_seconds(&self) -> i64 {
        match self.unit.fixed_seconds() {
            Some(unit) => unit * i64::from(self.count),
            None => {
                let months = self.calendar_months();
                DateTime::from_timestamp(REFERENCE_INSTANT, 0)
                    .and_then(|reference| reference.checked_add_months(Months::new(months)))
                    .map(|shifted| shifted.timestamp() - REFERENCE_INSTANT)
                    .unwrap_or(i64::from(months) * 30 * 86_400)
            }
        }
    }

    /// Whether both resolutions have the same canonical duration.
    pub fn same_duration(&self, other: &Resolution) -> bool {
        self.duration_seconds() == other.duration_seconds()
    }

    /// Left edge of the bin containing `time`.
    ///
    /// Fixed units align to the epoch, weeks to Monday 00:00 UTC, months and
    /// years to the first day of the calendar period.
    pub fn bin_start(&self, time: i64) -> i64 {
        match self.unit {
            TimeUnit::Month | TimeUnit::Year => self
                .calendar_bin_start(time)
                .unwrap_or_else(|| floor_to(time, self.duration_seconds(), 0)),
            TimeUnit::Week => floor_to(time, self.duration_seconds(), FIRST_MONDAY),
            _ => floor_to(time, self.duration_seconds(), 0),
        }
    }

    fn calendar_months(&self) -> u32 {
        match self.unit {
            TimeUnit::Year => self.count.saturating_mul(12),
            _ => self.count,
        }
    }

    fn calendar_bin_start(&self, time: i64) -> Option<i64> {
        let at = DateTime::from_timestamp(time, 0)?;
        let width = i64::from(self.calendar_months());
        let elapsed = (i64::from(at.year()) - 1970) * 12 + i64::from(at.month0());
        let bin = elapsed.div_euclid(width) * width;
        let year = i32::try_from(1970 + bin.div_euclid(12)).ok()?;
        let month = u32::try_from(bin.rem_euclid(12) + 1).ok()?;
        let start = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
        Some(start.and_utc().timestamp())
    }
}

fn floor_to(time: i64, width: i64, origin: i64) -> i64 {
    if width <= 0 {
        return time;
    }
    origin + (time - origin).div_euclid(width) * width
}

impl Ord for Resolution {
    fn cmp(&self, other: &Self) -> Ordering {
        self.duration_seconds()
            .cmp(&other.duration_seconds())
            .then(self.unit.cmp(&other.unit))
            .then(self.count.cmp(&other.count))
    }
}

impl PartialOrd for Resolution {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    /// Parses `<count><unit>`; the count defaults to 1 (`"h"` is `1h`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoreError::InvalidResolution(s.to_string()))?;
        let (digits, suffix) = trimmed.split_at(split);
        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| CoreError::InvalidResolution(s.to_string()))?
        };
        if count == 0 {
            return Err(CoreError::InvalidResolution(s.to_string()));
        }
        let unit = TimeUnit::parse_suffix(suffix)
            .ok_or_else(|| CoreError::InvalidResolution(s.to_string()))?;
        Ok(Self::new(count, unit))
    }
}

impl TryFrom<String> for Resolution {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1min".parse::<Resolution>().unwrap(), Resolution::minutes(1));
        assert_eq!("15min".parse::<Resolution>().unwrap(), Resolution::minutes(15));
        assert_eq!("4h".parse::<Resolution>().unwrap(), Resolution::hours(4));
        assert_eq!("1m".parse::<Resolution>().unwrap(), Resolution::months(1));
        assert_eq!("1y".parse::<Resolution>().unwrap(), Resolution::years(1));
        assert_eq!("d".parse::<Resolution>().unwrap(), Resolution::days(1));
        assert_eq!(Resolution::minutes(5).to_string(), "5min");
        assert_eq!(Resolution::months(1).to_string(), "1M");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Resolution>().is_err());
        assert!("15".parse::<Resolution>().is_err());
        assert!("0h".parse::<Resolution>().is_err());
        assert!("3 parsecs".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_fixed_durations() {
        assert_eq!(Resolution::minutes(1).duration_seconds(), 60);
        assert_eq!(Resolution::hours(4).duration_seconds(), 14_400);
        assert_eq!(Resolution::weeks(1).duration_seconds(), 604_800);
    }

    #[test]
    fn test_calendar_durations_from_reference_instant() {
        // 2016-07-31 -> 2016-08-31
        assert_eq!(Resolution::months(1).duration_seconds(), 31 * 86_400);
        // 2016-07-31 -> 2017-07-31
        assert_eq!(Resolution::years(1).duration_seconds(), 365 * 86_400);
    }

    #[test]
    fn test_ordering_by_duration() {
        let mut tags: Vec<Resolution> = ["1y", "1min", "1M", "1h", "1w", "4h"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        tags.sort();
        let labels: Vec<String> = tags.iter().map(|r| r.to_string()).collect();
        assert_eq!(labels, ["1min", "1h", "4h", "1w", "1M", "1y"]);
        assert!(Resolution::minutes(60).same_duration(&Resolution::hours(1)));
        assert_ne!(Resolution::minutes(60), Resolution::hours(1));
    }

    #[test]
    fn test_bin_start_fixed_and_weekly() {
        assert_eq!(Resolution::minutes(5).bin_start(1_000), 900);
        assert_eq!(Resolution::hours(1).bin_start(-1), -3_600);
        // 2024-01-03 (Wednesday) 12:00 -> Monday 2024-01-01 00:00
        assert_eq!(Resolution::weeks(1).bin_start(1_704_283_200), 1_704_067_200);
    }

    #[test]
    fn test_bin_start_calendar() {
        // 2024-02-15 -> 2024-02-01
        assert_eq!(Resolution::months(1).bin_start(1_707_955_200), 1_706_745_600);
        // 2024-02-15 -> 2024-01-01
        assert_eq!(Resolution::years(1).bin_start(1_707_955_200), 1_704_067_200);
        // quarters start in Jan/Apr/Jul/Oct
        assert_eq!(Resolution::months(3).bin_start(1_707_955_200), 1_704_067_200);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Resolution::hours(4)).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Resolution = serde_json::from_str("\"1w\"").unwrap();
        assert_eq!(back, Resolution::weeks(1));
    }
}
