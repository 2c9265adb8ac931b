//! Due-date text parsing.
//!
//! Upstream sources write due dates in several human formats. Each accepted
//! date format is one entry in [`DATE_MATCHERS`], tried in order; the first
//! match is normalized to `YYYY/MM/DD` and validated as a calendar date.
//! Anything unmatched or invalid yields `None`, which callers treat exactly
//! like an empty due cell.
//!
//! Whether a time-of-day was given is decided on the raw text on its own,
//! independent of which date format matched.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// A parsed due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate {
    /// The instant written in the source text, local time. Date-only input
    /// resolves to midnight.
    pub at: DateTime<Local>,
    /// Whether the raw text carried an `HH:MM` or `H時MM分` time.
    pub has_explicit_time: bool,
}

impl DueDate {
    /// The effective deadline: `at`, or 23:59:00 local on the same day when
    /// no time-of-day was given.
    pub fn deadline(&self) -> DateTime<Local> {
        if self.has_explicit_time {
            return self.at;
        }
        end_of_day(self.at.date_naive()).unwrap_or(self.at)
    }
}

struct DateMatcher {
    label: &'static str,
    re: Regex,
}

static DATE_MATCHERS: Lazy<Vec<DateMatcher>> = Lazy::new(|| {
    vec![
        DateMatcher {
            label: "ascii slash (YYYY/MM/DD)",
            re: Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})").expect("valid slash date regex"),
        },
        DateMatcher {
            label: "localized (YYYY年MM月DD日)",
            re: Regex::new(r"(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日?")
                .expect("valid localized date regex"),
        },
        DateMatcher {
            label: "iso (YYYY-MM-DD)",
            re: Regex::new(r"(\d{4})-(\d{1,2})-(\d{1,2})").expect("valid iso date regex"),
        },
    ]
});

static CLOCK_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::(\d{2}))?").expect("valid clock time regex"));
static LOCALIZED_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*時\s*(\d{1,2})\s*分").expect("valid localized time regex"));
static EXPLICIT_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}:\d{2}|\d{1,2}時\d{2}分").expect("valid explicit time regex"));

/// Parse raw due-date text.
///
/// Returns `None` for empty, unrecognized, or calendar-invalid input.
pub fn parse_due(raw: &str) -> Option<DueDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let has_explicit_time = EXPLICIT_TIME_RE.is_match(text);

    let (date, rest) = match_date(text)?;
    let time = if has_explicit_time {
        match_time(&rest)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };

    let at = to_local(date.and_time(time))?;
    Some(DueDate {
        at,
        has_explicit_time,
    })
}

/// Try each date matcher in order. Returns the validated date plus the text
/// with the matched date removed, for time extraction.
fn match_date(text: &str) -> Option<(NaiveDate, String)> {
    for matcher in DATE_MATCHERS.iter() {
        let Some(caps) = matcher.re.captures(text) else {
            continue;
        };
        let normalized = format!("{}/{:0>2}/{:0>2}", &caps[1], &caps[2], &caps[3]);
        let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y/%m/%d") else {
            log::debug!("due text matched {} but is not a calendar date: {text}", matcher.label);
            return None;
        };
        let whole = caps.get(0)?;
        let mut rest = String::with_capacity(text.len());
        rest.push_str(&text[..whole.start()]);
        rest.push(' ');
        rest.push_str(&text[whole.end()..]);
        return Some((date, rest));
    }
    None
}

fn match_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = CLOCK_TIME_RE.captures(text) {
        let h = caps[1].parse().ok()?;
        let m = caps[2].parse().ok()?;
        let s = caps.get(3).map_or(Some(0), |s| s.as_str().parse().ok())?;
        return NaiveTime::from_hms_opt(h, m, s);
    }
    let caps = LOCALIZED_TIME_RE.captures(text)?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

fn to_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).earliest()
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Local>> {
    to_local(date.and_hms_opt(23, 59, 0)?)
}
