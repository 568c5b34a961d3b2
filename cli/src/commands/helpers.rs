use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use pacer_core::models::{BodyType, SportType, TargetKey};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Parses `HH:MM` into a time of day.
pub(crate) fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .with_context(|| format!("Invalid time '{s}'. Use HH:MM (24h)"))
}

/// Epoch milliseconds for `date` at `time` in the local zone.
/// Without a time, today uses the current clock and other days use noon.
pub(crate) fn timestamp_ms(date: NaiveDate, time: Option<&str>) -> Result<i64> {
    let now = Local::now();
    let time = match time {
        Some(t) => parse_time(t)?,
        None if date == now.date_naive() => now.time(),
        None => NaiveTime::from_hms_opt(12, 0, 0).context("invalid noon")?,
    };
    local_ms(date, time)
}

fn local_ms(date: NaiveDate, time: NaiveTime) -> Result<i64> {
    let local = Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .with_context(|| format!("{date} {time} does not exist in the local time zone"))?;
    Ok(local.timestamp_millis())
}

pub(crate) fn local_datetime(ms: i64) -> Result<DateTime<Local>> {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local))
        .with_context(|| format!("Stored time {ms} is out of range"))
}

/// Moves `ms` to another local date and/or time of day. The part not given
/// is kept from `ms`.
pub(crate) fn shift_ms(ms: i64, date: Option<String>, time: Option<&str>) -> Result<i64> {
    if date.is_none() && time.is_none() {
        return Ok(ms);
    }
    let current = local_datetime(ms)?;
    let date = match date {
        Some(d) => parse_date(Some(d))?,
        None => current.date_naive(),
    };
    let time = match time {
        Some(t) => parse_time(t)?,
        None => current.time(),
    };
    local_ms(date, time)
}

/// Inclusive millisecond range covering the `days` days ending at `end`.
pub(crate) fn day_range_ms(end: NaiveDate, days: u32) -> Result<(i64, i64)> {
    if days == 0 {
        bail!("Number of days must be at least 1");
    }
    let start = end - chrono::Duration::days(i64::from(days) - 1);
    let from = local_midnight_ms(start)?;
    let to = local_midnight_ms(end + chrono::Duration::days(1))? - 1;
    Ok((from, to))
}

fn local_midnight_ms(date: NaiveDate) -> Result<i64> {
    Ok(Local
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .with_context(|| format!("midnight of {date} does not exist in the local time zone"))?
        .timestamp_millis())
}

pub(crate) fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn format_duration(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m {s:02}s")
    }
}

pub(crate) fn parse_sport(s: &str) -> Result<SportType> {
    SportType::parse(s).with_context(|| {
        format!(
            "Invalid sport '{s}'. Use indoor-run, outdoor-run, walk, hike, climb, cycling, fitness, other"
        )
    })
}

pub(crate) fn sport_label(code: i64) -> String {
    SportType::from_code(code).map_or_else(|| format!("type {code}"), |t| t.label().to_string())
}

pub(crate) fn parse_body_type(s: &str) -> Result<BodyType> {
    BodyType::parse(s).with_context(|| {
        format!("Invalid measurement '{s}'. Use height, weight, chest, waist, hip, arm, thigh, calf, body")
    })
}

pub(crate) fn parse_target_key(s: &str) -> Result<TargetKey> {
    TargetKey::parse(s).with_context(|| {
        format!("Invalid target '{s}'. Use steps, calories, exercise-time, activity-count, distance, weight")
    })
}

/// Validates a decimal measurement and returns it trimmed as entered.
pub(crate) fn parse_measurement(value: &str) -> Result<String> {
    let trimmed = value.trim();
    let parsed: f64 = trimmed
        .parse()
        .with_context(|| format!("Invalid value '{value}'. Use a number like 70.5"))?;
    if parsed <= 0.0 {
        bail!("Value must be greater than 0");
    }
    Ok(trimmed.to_string())
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
        assert!(parse_date(Some("2024-13-01".to_string())).is_err());
    }

    #[test]
    fn test_timestamp_with_explicit_time() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ms = timestamp_ms(date, Some("07:30")).unwrap();
        assert_eq!(format_ms(ms), "2024-06-15 07:30");
        assert!(timestamp_ms(date, Some("7h30")).is_err());
    }

    #[test]
    fn test_shift_keeps_missing_parts() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let ms = timestamp_ms(date, Some("07:30")).unwrap();
        assert_eq!(shift_ms(ms, None, None).unwrap(), ms);
        assert_eq!(format_ms(shift_ms(ms, None, Some("21:05")).unwrap()), "2024-06-15 21:05");
        assert_eq!(
            format_ms(shift_ms(ms, Some("2024-06-01".into()), None).unwrap()),
            "2024-06-01 07:30"
        );
        assert!(shift_ms(ms, None, Some("25:00")).is_err());
    }

    #[test]
    fn test_day_range_covers_whole_days() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (from, to) = day_range_ms(date, 1).unwrap();
        assert_eq!(format_ms(from), "2024-06-15 00:00");
        assert_eq!(format_ms(to), "2024-06-15 23:59");
        let (week_from, _) = day_range_ms(date, 7).unwrap();
        assert_eq!(format_ms(week_from), "2024-06-09 00:00");
        assert!(day_range_ms(date, 0).is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(75), "1m 15s");
        assert_eq!(format_duration(3720), "1h 02m");
    }

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement(" 70.5 ").unwrap(), "70.5");
        assert!(parse_measurement("abc").is_err());
        assert!(parse_measurement("0").is_err());
    }

    #[test]
    fn test_parsers_reject_unknown_names() {
        assert_eq!(parse_sport("walk").unwrap(), SportType::Walk);
        assert!(parse_sport("swim").is_err());
        assert_eq!(parse_body_type("bust").unwrap(), BodyType::Chest);
        assert!(parse_target_key("sleep").is_err());
        assert_eq!(sport_label(42), "type 42");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }
}
