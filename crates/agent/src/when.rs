//! Time-expression extraction for live-data questions.
//!
//! Recognises ISO dates with an optional time, "now", "today"/"tomorrow"
//! with an optional time, "at 6pm" style times and bare clock times.
//! Anything else means "now".

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(20\d{2}-\d{2}-\d{2})(?:[ T](\d{1,2})(?::(\d{2}))?\s*(am|pm)?)?\b")
        .expect("date regex is valid")
});

static AT_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("at-time regex is valid")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("time regex is valid")
});

static NOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnow\b").expect("now regex is valid"));

/// When a question asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenExpr {
    /// A specific wall-clock instant (interpreted as UTC by the tool)
    At(NaiveDateTime),
    /// The current moment
    Now,
}

/// Extract the time a query refers to, relative to `now`.
pub fn extract_when(query: &str, now: NaiveDateTime) -> WhenExpr {
    let s = query.trim().to_lowercase();
    let today = now.date();

    if let Some(caps) = DATE_RE.captures(&s) {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok();
        let time = match caps.get(2) {
            Some(hour) => clock_time(
                hour.as_str(),
                caps.get(3).map(|m| m.as_str()),
                caps.get(4).map(|m| m.as_str()),
            ),
            None => NaiveTime::from_hms_opt(0, 0, 0),
        };
        return at(date, time);
    }

    if NOW_RE.is_match(&s) {
        return WhenExpr::Now;
    }

    if s.contains("tomorrow") {
        return at(today.succ_opt(), first_time(&s).or_else(evening));
    }

    if s.contains("today") {
        return at(Some(today), first_time(&s).or_else(evening));
    }

    if let Some(caps) = AT_TIME_RE.captures(&s) {
        return at(Some(today), captured_time(&caps));
    }

    if let Some(time) = first_time(&s) {
        return WhenExpr::At(today.and_time(time));
    }

    WhenExpr::Now
}

fn at(date: Option<NaiveDate>, time: Option<NaiveTime>) -> WhenExpr {
    match (date, time) {
        (Some(date), Some(time)) => WhenExpr::At(date.and_time(time)),
        _ => WhenExpr::Now,
    }
}

fn evening() -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(18, 0, 0)
}

fn first_time(s: &str) -> Option<NaiveTime> {
    TIME_RE.captures(s).and_then(|caps| captured_time(&caps))
}

fn captured_time(caps: &regex::Captures<'_>) -> Option<NaiveTime> {
    clock_time(
        caps.get(1)?.as_str(),
        caps.get(2).map(|m| m.as_str()),
        caps.get(3).map(|m| m.as_str()),
    )
}

/// 12am is midnight, 12pm is noon, other pm hours gain twelve.
fn clock_time(hour: &str, minute: Option<&str>, meridiem: Option<&str>) -> Option<NaiveTime> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.parse().ok()?,
        None => 0,
    };

    match meridiem.map(str::to_ascii_lowercase).as_deref() {
        Some("pm") if hour != 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}
