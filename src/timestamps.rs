use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

pub const INVALID_DATE: &str = "Invalid date";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses webhook timestamps. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc())
}

pub fn display_offset(minutes_east: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes_east.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// `Jan 5, 2025`
pub fn format_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%b %-d, %Y").to_string()
}

/// `2:30 PM`
pub fn format_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%-I:%M %p").to_string()
}

/// `Jan 5, 2025 2:30 PM`
pub fn format_date_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    format!("{} {}", format_date(at, offset), format_time(at, offset))
}

/// File name stamp, `2025-01-05_14-30-00`.
pub fn format_file_stamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Splits a raw start time into display date and time, or the invalid placeholder.
pub fn date_and_time(raw: &str, offset: FixedOffset) -> (String, String) {
    match parse_timestamp(raw) {
        Some(at) => (format_date(at, offset), format_time(at, offset)),
        None => (INVALID_DATE.to_string(), String::new()),
    }
}

pub fn date_time_or_invalid(raw: &str, offset: FixedOffset) -> String {
    parse_timestamp(raw)
        .map(|at| format_date_time(at, offset))
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

/// Human distance such as `5 minutes ago` or `in about 2 hours`.
pub fn format_relative(raw: &str, now: DateTime<Utc>) -> String {
    let Some(at) = parse_timestamp(raw) else {
        return INVALID_DATE.to_string();
    };

    let diff = now.signed_duration_since(at).num_seconds();
    let seconds = diff.unsigned_abs();
    let minutes = (seconds as f64 / 60.0).round() as u64;
    let hours = (minutes as f64 / 60.0).round() as u64;
    let days = (hours as f64 / 24.0).round() as u64;

    let distance = if seconds < 30 {
        "less than a minute".to_string()
    } else if minutes <= 1 {
        "1 minute".to_string()
    } else if minutes < 45 {
        format!("{} minutes", minutes)
    } else if minutes < 90 {
        "about 1 hour".to_string()
    } else if minutes < 24 * 60 {
        format!("about {} hours", hours.max(2))
    } else if minutes < 42 * 60 {
        "1 day".to_string()
    } else if days < 30 {
        format!("{} days", days.max(2))
    } else if days < 45 {
        "about 1 month".to_string()
    } else if days < 60 {
        "about 2 months".to_string()
    } else if days < 365 {
        format!("{} months", (days / 30).max(2))
    } else {
        let years = days / 365;
        if years <= 1 {
            "about 1 year".to_string()
        } else {
            format!("about {} years", years)
        }
    };

    if diff >= 0 {
        format!("{} ago", distance)
    } else {
        format!("in {}", distance)
    }
}
