//! Date parsing and date-window classification.
//!
//! Spreadsheet cells carry dates in whatever format the person typing chose.
//! [`parse_date`] accepts the formats seen in practice and returns `None`
//! instead of failing; callers treat `None` as "outside every date window".
//!
//! All window checks are calendar-day based and take `today` explicitly. The
//! server derives `today` from the wall clock in the configured time zone.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    static ref MONTH_NAME_PATTERN: Regex = Regex::new(
        r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})(?:,?\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]\.?m\.?))?$"
    )
    .expect("month name date pattern");
    static ref SLASH_PATTERN: Regex = Regex::new(
        r"(?i)^(\d{1,2})/(\d{1,2})/(\d{4})(?:,?\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]\.?m\.?)?)?$"
    )
    .expect("slash date pattern");
    static ref DASH_PATTERN: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$"
    )
    .expect("dash date pattern");
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%a %b %d %Y %H:%M:%S",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%a %b %d %Y",
    "%A, %B %d, %Y",
];

// ============================================================================
// PARSING
// ============================================================================

/// Parses a date cell. Tries, in order: ISO 8601, `Mon D YYYY [h:mm AM/PM]`,
/// `M/D/YYYY [H:MM[:SS] [AM/PM]]`, `YYYY-MM-DD [HH:MM[:SS]]`, then a list of
/// generic formats. Offsets in ISO/RFC 2822 input are converted to `tz`.
pub fn parse_date(text: &str, tz: Tz) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    parse_iso(text, tz)
        .or_else(|| parse_month_name(text))
        .or_else(|| parse_slash(text))
        .or_else(|| parse_dash(text))
        .or_else(|| parse_fallback(text, tz))
}

fn parse_iso(text: &str, tz: Tz) -> Option<NaiveDateTime> {
    if !text.contains('T') || !text.as_bytes().first()?.is_ascii_digit() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&tz).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn parse_month_name(text: &str) -> Option<NaiveDateTime> {
    let caps = MONTH_NAME_PATTERN.captures(text)?;
    let name = caps.get(1)?.as_str().to_lowercase();
    let month = month_number(&name)?;
    let day = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    build(year, month, day, time_parts(&caps))
}

fn parse_slash(text: &str) -> Option<NaiveDateTime> {
    let caps = SLASH_PATTERN.captures(text)?;
    let month = caps.get(1)?.as_str().parse().ok()?;
    let day = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    build(year, month, day, time_parts(&caps))
}

fn parse_dash(text: &str) -> Option<NaiveDateTime> {
    let caps = DASH_PATTERN.captures(text)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    build(year, month, day, time_parts(&caps))
}

fn parse_fallback(text: &str, tz: Tz) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&tz).naive_local());
    }
    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(start_of_day)
        })
}

/// Month lookup by the first three letters; the rest of the word must extend
/// a real month name ("Sept", "September").
fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?;
    let index = MONTHS.iter().position(|m| *m == prefix)?;
    const FULL: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
    ];
    if FULL[index].starts_with(name) {
        Some(index as u32 + 1)
    } else {
        None
    }
}

/// (hour, minute, second) from capture groups 4..=7, 24h clock.
fn time_parts(caps: &regex::Captures<'_>) -> Option<(u32, u32, u32)> {
    let hour: u32 = match caps.get(4) {
        Some(h) => h.as_str().parse().ok()?,
        None => return Some((0, 0, 0)),
    };
    let minute: u32 = caps.get(5)?.as_str().parse().ok()?;
    let second: u32 = caps
        .get(6)
        .and_then(|s| s.as_str().parse().ok())
        .unwrap_or(0);

    let hour = match caps.get(7).map(|m| m.as_str().to_lowercase()) {
        Some(meridiem) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            match (meridiem.starts_with('p'), hour) {
                (false, 12) => 0,
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, h) => h,
            }
        }
        None => hour,
    };
    Some((hour, minute, second))
}

fn build(year: i32, month: u32, day: u32, time: Option<(u32, u32, u32)>) -> Option<NaiveDateTime> {
    let (h, m, s) = time?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(h, m, s)
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN))
}

/// Wall-clock timestamp in the report time zone.
pub fn now_in(tz: Tz) -> NaiveDateTime {
    tz.from_utc_datetime(&Utc::now().naive_utc()).naive_local()
}

/// Timestamp text in the slash layout the sheets use.
pub fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format("%m/%d/%Y %H:%M:%S").to_string()
}

// ============================================================================
// WINDOWS
// ============================================================================

/// Calendar-day windows relative to a fixed `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    today: NaiveDate,
}

impl DateWindow {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn now(tz: Tz) -> Self {
        Self::new(now_in(tz).date())
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn yesterday(&self) -> NaiveDate {
        self.today - Duration::days(1)
    }

    pub fn tomorrow(&self) -> NaiveDate {
        self.today + Duration::days(1)
    }

    pub fn is_today(&self, d: NaiveDate) -> bool {
        d == self.today
    }

    pub fn is_yesterday(&self, d: NaiveDate) -> bool {
        d == self.yesterday()
    }

    pub fn is_tomorrow(&self, d: NaiveDate) -> bool {
        d == self.tomorrow()
    }

    /// today <= d <= today + 7
    pub fn is_in_next_7_days(&self, d: NaiveDate) -> bool {
        d >= self.today && d <= self.today + Duration::days(7)
    }

    /// today < d <= today + 7
    pub fn is_strictly_next_7_days(&self, d: NaiveDate) -> bool {
        d > self.today && d <= self.today + Duration::days(7)
    }

    /// today - n + 1 <= d <= today
    pub fn is_in_last_n_days(&self, d: NaiveDate, n: u32) -> bool {
        n > 0 && d <= self.today && d > self.today - Duration::days(n as i64)
    }

    /// The range [today - n + 1, today].
    pub fn last_n_days(&self, n: u32) -> DateRange {
        let back = Duration::days(n.max(1) as i64 - 1);
        let start = self.today.checked_sub_signed(back).unwrap_or(NaiveDate::MIN);
        DateRange::from_dates(start, self.today)
    }
}

/// Caller-supplied ranges must fall inside these years.
pub const MIN_RANGE_YEAR: i32 = 1900;
pub const MAX_RANGE_YEAR: i32 = 2200;
/// Longest caller-supplied range, in days.
pub const MAX_RANGE_DAYS: i64 = 3660;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("date {date} is outside the supported years {}-{}", MIN_RANGE_YEAR, MAX_RANGE_YEAR)]
    OutOfBounds { date: NaiveDate },

    #[error("range spans {days} days, at most {} are allowed", MAX_RANGE_DAYS)]
    TooWide { days: i64 },
}

/// Inclusive timestamp range: start at 00:00:00.000, end at 23:59:59.999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Caller-supplied range. Rejects an end before the start, dates outside
    /// the supported years, and spans longer than [`MAX_RANGE_DAYS`].
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        for date in [start, end] {
            if !(MIN_RANGE_YEAR..=MAX_RANGE_YEAR).contains(&date.year()) {
                return Err(DateRangeError::OutOfBounds { date });
            }
        }
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        let days = (end - start).num_days() + 1;
        if days > MAX_RANGE_DAYS {
            return Err(DateRangeError::TooWide { days });
        }
        Ok(Self::from_dates(start, end))
    }

    fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start_of_day(start),
            end: end_of_day(end),
        }
    }

    /// First day of the month of `today` through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        Self::from_dates(first, today)
    }

    /// The last `months` calendar months ending today.
    pub fn last_months(today: NaiveDate, months: u32) -> Self {
        let start = today
            .checked_sub_months(Months::new(months))
            .and_then(|d| d.succ_opt())
            .unwrap_or(today);
        Self::from_dates(start, today)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    pub fn contains(&self, dt: NaiveDateTime) -> bool {
        dt >= self.start && dt <= self.end
    }

    pub fn contains_date(&self, d: NaiveDate) -> bool {
        d >= self.start_date() && d <= self.end_date()
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date() - self.start_date()).num_days() + 1
    }

    /// The equal-length range ending the day before this one starts, or
    /// `None` when it would fall before the earliest representable date.
    pub fn previous(&self) -> Option<Self> {
        let end = self.start_date().pred_opt()?;
        let start = end.checked_sub_signed(Duration::days(self.days() - 1))?;
        Some(Self::from_dates(start, end))
    }

    /// Splits at the midpoint; the first half gets the extra day of an odd
    /// span. A one-day range has no second half.
    pub fn split_halves(&self) -> (Self, Option<Self>) {
        let first_len = (self.days() + 1) / 2;
        let first_end = self
            .start_date()
            .checked_add_signed(Duration::days(first_len - 1))
            .unwrap_or(self.end_date())
            .min(self.end_date());
        let first = Self::from_dates(self.start_date(), first_end);
        match first_end.succ_opt() {
            Some(next) if first_end < self.end_date() => {
                (first, Some(Self::from_dates(next, self.end_date())))
            }
            _ => (first, None),
        }
    }
}
