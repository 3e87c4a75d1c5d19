//! Timestamp enrichment and relative time rendering.
//!
//! Every function here fails soft: parse or conversion problems produce an
//! empty string, `false`, `None`, or leave the record untouched. Nothing is
//! propagated to the caller.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use tracing::warn;

use crate::models::{Record, TimeOfDay, TimestampFields};

/// Storage format of `TimestampFields::timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S:%6f";

const TIMESTAMP_ID_FORMAT: &str = "%Y%m%d%H%M%S%6f";

/// Date format accepted from forms and range bounds.
pub const FORM_DATE_FORMAT: &str = "%Y-%m-%d";

/// Elapsed-time thresholds: each unit holds this many of the previous one.
const TIME_UNITS: [(f64, &str); 7] = [
    (60.0, "second"),
    (60.0, "minute"),
    (24.0, "hour"),
    (30.0, "day"),
    (12.0, "month"),
    (10.0, "year"),
    (10.0, "decade"),
];

/// Local wall-clock time, the reference for every stored timestamp.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Ordinal suffix for a day of the month.
pub fn day_suffix(day: u32) -> &'static str {
    match day {
        1 | 21 | 31 => "st",
        2 | 22 => "nd",
        3 | 23 => "rd",
        _ => "th",
    }
}

/// Build the timestamp object for an instant.
pub fn current_timestamp_fields(now: NaiveDateTime) -> TimestampFields {
    let suffix = day_suffix(now.day());
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    // Millisecond precision: drop the last three microsecond digits.
    let date = timestamp[..timestamp.len() - 3].to_string();

    TimestampFields {
        timestamp_id: now.format(TIMESTAMP_ID_FORMAT).to_string(),
        date,
        formatted_date_short: now.format(&format!("%d{} %b %Y", suffix)).to_string(),
        formatted_date_long: now.format(&format!("%d{} %B %Y", suffix)).to_string(),
        formatted_date_time: now.format("%I:%M %p").to_string(),
        time_of_the_day: TimeOfDay::from_hour(now.hour()),
        day: now.day(),
        day_suffix: suffix.to_string(),
        day_name_short: now.format("%a").to_string(),
        day_name_long: now.format("%A").to_string(),
        hour: now.hour(),
        hour_formatted: now.format("%I:%p").to_string(),
        minute: now.minute(),
        month_number: now.month(),
        month_short: now.format("%b").to_string(),
        month_long: now.format("%B").to_string(),
        year: now.year(),
        week_number: now.iso_week().week(),
        timestamp,
    }
}

/// Parse a `YYYY-MM-DD` form date and move it to the clock time of `now`,
/// so records back-dated to the same day still order by insertion.
pub fn parse_form_date(value: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(value.trim(), FORM_DATE_FORMAT).ok()?;
    Some(date.and_time(now.time()))
}

/// Timestamp object for a caller-supplied historical date.
pub fn backdated_timestamp_fields(
    explicit_date: &str,
    now: NaiveDateTime,
) -> Option<TimestampFields> {
    parse_form_date(explicit_date, now).map(current_timestamp_fields)
}

/// Attach a timestamp object under `column`.
pub fn stamp(record: &mut Record, column: &str, fields: &TimestampFields) {
    match serde_json::to_value(fields) {
        Ok(value) => {
            record.insert(column.to_string(), value);
        }
        Err(e) => warn!("Failed to serialize timestamp for {}: {}", column, e),
    }
}

/// Attach the current timestamp under `column`.
pub fn add_current_timestamp(mut record: Record, column: &str, now: NaiveDateTime) -> Record {
    stamp(&mut record, column, &current_timestamp_fields(now));
    record
}

/// Attach a back-dated timestamp under `column`.
///
/// The record is returned unchanged when `explicit_date` does not parse.
pub fn add_backdated_timestamp(
    mut record: Record,
    explicit_date: &str,
    column: &str,
    now: NaiveDateTime,
) -> Record {
    match backdated_timestamp_fields(explicit_date, now) {
        Some(fields) => stamp(&mut record, column, &fields),
        None => warn!("Unparseable date {:?} for {}, leaving record as is", explicit_date, column),
    }
    record
}

/// Read the raw `timestamp` string out of a stored timestamp object.
pub fn stored_timestamp(record: &Record, column: &str) -> Option<String> {
    record
        .get(column)
        .and_then(|v| v.get("timestamp"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Render how long ago `stored` was, relative to `now`.
///
/// Returns "in the future" for instants after `now` and an empty string for
/// input that does not parse.
pub fn relative_time(stored: &str, now: NaiveDateTime) -> String {
    let Ok(then) = NaiveDateTime::parse_from_str(stored, TIMESTAMP_FORMAT) else {
        return String::new();
    };

    let delta = now - then;
    let mut seconds = match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    };

    if seconds < 0.0 {
        return "in the future".to_string();
    }

    for (threshold, unit) in TIME_UNITS {
        if seconds < threshold {
            return format_ago(seconds as u64, unit);
        }
        seconds /= threshold;
    }

    if seconds as u64 == 1 {
        "1 century ago".to_string()
    } else {
        format!("{} centuries ago", seconds as u64)
    }
}

fn format_ago(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("{} {} ago", count, unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// `"false"`, `"0"` and blank bounds mean "unbounded".
fn active_bound(bound: Option<&str>) -> Option<&str> {
    bound.map(str::trim).filter(|b| {
        !b.is_empty() && !b.eq_ignore_ascii_case("false") && *b != "0"
    })
}

/// Whether a stored timestamp falls inside `[start, end]`, by calendar date.
pub fn is_date_in_range(date_value: &str, start: Option<&str>, end: Option<&str>) -> bool {
    let Ok(value) = NaiveDateTime::parse_from_str(date_value, TIMESTAMP_FORMAT) else {
        return false;
    };
    let date = value.date();

    let parse = |b: &str| NaiveDate::parse_from_str(b, FORM_DATE_FORMAT).ok();

    match (active_bound(start), active_bound(end)) {
        (None, None) => true,
        (Some(s), None) => parse(s).is_some_and(|s| date >= s),
        (None, Some(e)) => parse(e).is_some_and(|e| date <= e),
        (Some(s), Some(e)) => match (parse(s), parse(e)) {
            (Some(s), Some(e)) => s <= date && date <= e,
            _ => false,
        },
    }
}
