use std::ops::Range;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::mapper::Record;
use pacer_core::models::{BowelLog, MenstruationLog, MoodLog, SleepLog, WaterLog};
use pacer_core::schema::{bowel_log, menstruation_log, mood_log, sleep_log, water_log};
use pacer_core::service::PacerService;

use super::helpers::{
    day_range_ms, format_duration, format_ms, local_datetime, parse_date, parse_time, print_json,
    shift_ms, timestamp_ms, truncate,
};

const MIN_MOOD: i64 = 1;
const MAX_MOOD: i64 = 5;
const MAX_SLEEP_QUALITY: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogKind {
    Water,
    Bowel,
    Mood,
    Sleep,
    Period,
}

impl LogKind {
    fn table(self) -> &'static str {
        match self {
            LogKind::Water => water_log::TABLE,
            LogKind::Bowel => bowel_log::TABLE,
            LogKind::Mood => mood_log::TABLE,
            LogKind::Sleep => sleep_log::TABLE,
            LogKind::Period => menstruation_log::TABLE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            LogKind::Water => "water",
            LogKind::Bowel => "bowel",
            LogKind::Mood => "mood",
            LogKind::Sleep => "sleep",
            LogKind::Period => "period",
        }
    }
}

fn check_amount(amount_ml: i64) -> Result<()> {
    if amount_ml <= 0 {
        bail!("Amount must be greater than 0 ml");
    }
    Ok(())
}

fn check_status(status: &str) -> Result<String> {
    if status.trim().is_empty() {
        bail!("Status cannot be empty");
    }
    Ok(status.trim().to_string())
}

fn check_mood(score: i64) -> Result<()> {
    if !(MIN_MOOD..=MAX_MOOD).contains(&score) {
        bail!("Mood score must be between {MIN_MOOD} and {MAX_MOOD}");
    }
    Ok(())
}

fn check_quality(quality: i64) -> Result<()> {
    if !(0..=MAX_SLEEP_QUALITY).contains(&quality) {
        bail!("Sleep quality must be between 0 and {MAX_SLEEP_QUALITY}");
    }
    Ok(())
}

fn check_cycle(cycle_length: i64) -> Result<()> {
    if cycle_length <= 0 {
        bail!("Cycle length must be greater than 0 days");
    }
    Ok(())
}

/// Start and end of a night ending on `wake_date`. A bedtime later than the
/// wake time falls on the day before.
fn sleep_span(bedtime: &str, wake: &str, wake_date: NaiveDate) -> Result<(i64, i64)> {
    let bed_date = if parse_time(bedtime)? > parse_time(wake)? {
        wake_date - chrono::Duration::days(1)
    } else {
        wake_date
    };
    let start_time = timestamp_ms(bed_date, Some(bedtime))?;
    let end_time = timestamp_ms(wake_date, Some(wake))?;
    if end_time <= start_time {
        bail!("Wake time must be after bedtime");
    }
    Ok((start_time, end_time))
}

fn period_span(start: NaiveDate, end: NaiveDate) -> Result<(i64, i64)> {
    if end < start {
        bail!("End date must not be before start date");
    }
    Ok((
        timestamp_ms(start, Some("00:00"))?,
        timestamp_ms(end, Some("23:59"))?,
    ))
}

pub(crate) fn cmd_water_log(
    svc: &PacerService,
    amount_ml: i64,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    check_amount(amount_ml)?;
    let mut log = WaterLog {
        time: timestamp_ms(parse_date(date)?, time)?,
        amount: amount_ml,
        note: note.unwrap_or_default(),
        ..WaterLog::default()
    };
    log.id = svc.log_record(&log)?;

    if json {
        print_json(&log)?;
    } else {
        println!("Logged {amount_ml} ml of water (#{}) at {}", log.id, format_ms(log.time));
    }
    Ok(())
}

pub(crate) fn cmd_bowel_log(
    svc: &PacerService,
    status: &str,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut log = BowelLog {
        time: timestamp_ms(parse_date(date)?, time)?,
        status: check_status(status)?,
        note: note.unwrap_or_default(),
        ..BowelLog::default()
    };
    log.id = svc.log_record(&log)?;

    if json {
        print_json(&log)?;
    } else {
        println!("Logged bowel movement #{} ({}) at {}", log.id, log.status, format_ms(log.time));
    }
    Ok(())
}

pub(crate) fn cmd_mood_log(
    svc: &PacerService,
    score: i64,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    check_mood(score)?;
    let mut log = MoodLog {
        time: timestamp_ms(parse_date(date)?, time)?,
        score,
        note: note.unwrap_or_default(),
        ..MoodLog::default()
    };
    log.id = svc.log_record(&log)?;

    if json {
        print_json(&log)?;
    } else {
        println!("Logged mood {score}/{MAX_MOOD} (#{}) at {}", log.id, format_ms(log.time));
    }
    Ok(())
}

/// `date` is the wake-up day.
pub(crate) fn cmd_sleep_log(
    svc: &PacerService,
    bedtime: &str,
    wake: &str,
    quality: i64,
    note: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    check_quality(quality)?;
    let (start_time, end_time) = sleep_span(bedtime, wake, parse_date(date)?)?;

    let mut log = SleepLog {
        start_time,
        end_time,
        quality,
        note: note.unwrap_or_default(),
        ..SleepLog::default()
    };
    log.id = svc.log_record(&log)?;

    if json {
        print_json(&log)?;
    } else {
        println!(
            "Logged sleep #{}: {} ({} to {})",
            log.id,
            format_duration((end_time - start_time) / 1000),
            format_ms(start_time),
            format_ms(end_time)
        );
    }
    Ok(())
}

pub(crate) fn cmd_period_log(
    svc: &PacerService,
    start: &str,
    end: Option<String>,
    cycle_length: i64,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    check_cycle(cycle_length)?;
    let start_date = parse_date(Some(start.to_string()))?;
    let end_date: NaiveDate = match end {
        Some(e) => parse_date(Some(e))?,
        None => start_date,
    };
    let (start_time, end_time) = period_span(start_date, end_date)?;

    let mut log = MenstruationLog {
        start_time,
        end_time,
        cycle_length,
        note: note.unwrap_or_default(),
        ..MenstruationLog::default()
    };
    log.id = svc.log_record(&log)?;

    if json {
        print_json(&log)?;
    } else {
        println!(
            "Logged period #{}: {start_date} to {end_date}, {cycle_length}-day cycle",
            log.id
        );
    }
    Ok(())
}

/// Loads entry `id`, applies `edit` and writes every field back.
fn edit_entry<R: Record + Serialize>(
    svc: &PacerService,
    kind: LogKind,
    id: i64,
    json: bool,
    edit: impl FnOnce(&mut R) -> Result<()>,
) -> Result<()> {
    let Some(mut entry) = svc.get_record::<R>(id)? else {
        bail!("No {} entry #{id}", kind.name());
    };
    edit(&mut entry)?;
    if !svc.update_record(&entry, id)? {
        bail!("No {} entry #{id}", kind.name());
    }

    if json {
        print_json(&entry)?;
    } else {
        println!("Updated {} entry #{id}", kind.name());
    }
    Ok(())
}

pub(crate) fn cmd_water_update(
    svc: &PacerService,
    id: i64,
    amount_ml: Option<i64>,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    edit_entry(svc, LogKind::Water, id, json, |log: &mut WaterLog| {
        if let Some(amount) = amount_ml {
            check_amount(amount)?;
            log.amount = amount;
        }
        log.time = shift_ms(log.time, date, time)?;
        if let Some(note) = note {
            log.note = note;
        }
        Ok(())
    })
}

pub(crate) fn cmd_bowel_update(
    svc: &PacerService,
    id: i64,
    status: Option<&str>,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    edit_entry(svc, LogKind::Bowel, id, json, |log: &mut BowelLog| {
        if let Some(status) = status {
            log.status = check_status(status)?;
        }
        log.time = shift_ms(log.time, date, time)?;
        if let Some(note) = note {
            log.note = note;
        }
        Ok(())
    })
}

pub(crate) fn cmd_mood_update(
    svc: &PacerService,
    id: i64,
    score: Option<i64>,
    note: Option<String>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    edit_entry(svc, LogKind::Mood, id, json, |log: &mut MoodLog| {
        if let Some(score) = score {
            check_mood(score)?;
            log.score = score;
        }
        log.time = shift_ms(log.time, date, time)?;
        if let Some(note) = note {
            log.note = note;
        }
        Ok(())
    })
}

/// Times not given are kept from the stored night.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_sleep_update(
    svc: &PacerService,
    id: i64,
    bedtime: Option<String>,
    wake: Option<String>,
    quality: Option<i64>,
    note: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    edit_entry(svc, LogKind::Sleep, id, json, |log: &mut SleepLog| {
        if let Some(quality) = quality {
            check_quality(quality)?;
            log.quality = quality;
        }
        if bedtime.is_some() || wake.is_some() || date.is_some() {
            let start = local_datetime(log.start_time)?;
            let end = local_datetime(log.end_time)?;
            let bedtime = bedtime.unwrap_or_else(|| start.format("%H:%M").to_string());
            let wake = wake.unwrap_or_else(|| end.format("%H:%M").to_string());
            let wake_date = match date {
                Some(d) => parse_date(Some(d))?,
                None => end.date_naive(),
            };
            (log.start_time, log.end_time) = sleep_span(&bedtime, &wake, wake_date)?;
        }
        if let Some(note) = note {
            log.note = note;
        }
        Ok(())
    })
}

pub(crate) fn cmd_period_update(
    svc: &PacerService,
    id: i64,
    start: Option<String>,
    end: Option<String>,
    cycle_length: Option<i64>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    edit_entry(svc, LogKind::Period, id, json, |log: &mut MenstruationLog| {
        if let Some(cycle) = cycle_length {
            check_cycle(cycle)?;
            log.cycle_length = cycle;
        }
        if start.is_some() || end.is_some() {
            let start = match start {
                Some(s) => parse_date(Some(s))?,
                None => local_datetime(log.start_time)?.date_naive(),
            };
            let end = match end {
                Some(e) => parse_date(Some(e))?,
                None => local_datetime(log.end_time)?.date_naive(),
            };
            (log.start_time, log.end_time) = period_span(start, end)?;
        }
        if let Some(note) = note {
            log.note = note;
        }
        Ok(())
    })
}

#[derive(Tabled)]
struct WaterRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "ml")]
    amount: i64,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Tabled)]
struct SpanRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Note")]
    note: String,
}

fn render<T: Serialize, R: Tabled>(
    kind: LogKind,
    records: &[T],
    json: bool,
    right: Range<usize>,
    to_row: impl Fn(&T) -> R,
) -> Result<()> {
    if json {
        print_json(records)?;
    } else if records.is_empty() {
        let name = kind.name();
        eprintln!("No {name} entries found. Use `pacer {name} log` to add one.");
    } else {
        let rows: Vec<R> = records.iter().map(to_row).collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(right)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_log_list(svc: &PacerService, kind: LogKind, days: u32, json: bool) -> Result<()> {
    let (from, to) = day_range_ms(parse_date(None)?, days)?;

    match kind {
        LogKind::Water => render(kind, &svc.water_logs(from, to)?, json, 2..3, |l: &WaterLog| WaterRow {
            id: l.id,
            time: format_ms(l.time),
            amount: l.amount,
            note: truncate(&l.note, 30),
        }),
        LogKind::Bowel => render(kind, &svc.bowel_logs(from, to)?, json, 0..1, |l: &BowelLog| EventRow {
            id: l.id,
            time: format_ms(l.time),
            value: l.status.clone(),
            note: truncate(&l.note, 30),
        }),
        LogKind::Mood => render(kind, &svc.mood_logs(from, to)?, json, 2..3, |l: &MoodLog| EventRow {
            id: l.id,
            time: format_ms(l.time),
            value: format!("{}/{MAX_MOOD}", l.score),
            note: truncate(&l.note, 30),
        }),
        LogKind::Sleep => render(kind, &svc.sleep_logs(from, to)?, json, 3..4, |l: &SleepLog| SpanRow {
            id: l.id,
            from: format_ms(l.start_time),
            to: format_ms(l.end_time),
            value: format!(
                "{} q{}",
                format_duration((l.end_time - l.start_time) / 1000),
                l.quality
            ),
            note: truncate(&l.note, 30),
        }),
        LogKind::Period => cmd_period_list(svc, days, json),
    }
}

/// Periods are listed by count, not by time window. A limit of 0 lists all.
pub(crate) fn cmd_period_list(svc: &PacerService, limit: u32, json: bool) -> Result<()> {
    render(
        LogKind::Period,
        &svc.menstruation_logs(limit as usize)?,
        json,
        3..4,
        |l: &MenstruationLog| SpanRow {
            id: l.id,
            from: format_ms(l.start_time),
            to: format_ms(l.end_time),
            value: format!("{}-day cycle", l.cycle_length),
            note: truncate(&l.note, 30),
        },
    )
}

pub(crate) fn cmd_log_delete(svc: &PacerService, kind: LogKind, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_record(kind.table(), id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted, "id": id }));
    } else if deleted {
        println!("Deleted {} entry #{id}", kind.name());
    } else {
        bail!("No {} entry #{id}", kind.name());
    }
    Ok(())
}
