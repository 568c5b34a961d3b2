use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Utc};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::models::{DailyStepAggregate, distance_km};
use pacer_core::service::PacerService;

use super::helpers::{parse_date, print_json};

/// Stores today's count and pushes the refreshed snapshot when logged in.
async fn store_and_refresh(
    svc: &PacerService,
    date: NaiveDate,
    steps: i64,
) -> Result<DailyStepAggregate> {
    let row = svc.record_daily_steps(date, steps, Utc::now().timestamp_millis())?;
    if date == Local::now().date_naive() {
        if let Some(push) = svc.refresh_today(date)? {
            if !push.await? {
                eprintln!("Warning: today's steps were saved locally but could not be synced");
            }
        }
    }
    Ok(row)
}

pub(crate) async fn cmd_daily_record(
    svc: &PacerService,
    steps: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    if steps < 0 {
        bail!("Steps cannot be negative");
    }
    let date = parse_date(date)?;
    let row = store_and_refresh(svc, date, steps).await?;

    if json {
        print_json(&row)?;
    } else {
        println!(
            "{}: {} steps ({} km)",
            row.date,
            row.steps,
            distance_km(row.steps)
        );
    }
    Ok(())
}

/// Feeds a cumulative pedometer reading through the step counter.
pub(crate) async fn cmd_daily_reading(svc: &PacerService, reading: i64, json: bool) -> Result<()> {
    if reading < 0 {
        bail!("Sensor reading cannot be negative");
    }
    let today = Local::now().date_naive();
    let mut counter = svc.step_counter(today).await?;
    let steps = counter.on_reading(reading, today).await?;
    let row = svc.flush_counter(&counter, Utc::now().timestamp_millis())?;
    if let Some(push) = svc.refresh_today(today)? {
        push.await?;
    }

    if json {
        print_json(&row)?;
    } else {
        println!("{}: {steps} steps today (sensor total {reading})", row.date);
    }
    Ok(())
}

pub(crate) fn cmd_daily_show(svc: &PacerService, date: Option<String>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let row = svc.daily_steps(date)?;

    if json {
        print_json(&row)?;
        return Ok(());
    }
    let target = svc.targets().step_target;
    let steps = row.map_or(0, |r| r.steps);
    println!(
        "{}: {steps} / {target} steps ({} km)",
        date.format("%Y-%m-%d"),
        distance_km(steps)
    );
    Ok(())
}

pub(crate) fn cmd_daily_week(svc: &PacerService, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let week = svc.week(today)?;

    if json {
        print_json(&week)?;
        return Ok(());
    }

    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Steps")]
        steps: i64,
        #[tabled(rename = "km")]
        distance: String,
        #[tabled(rename = "Goal")]
        goal: &'static str,
    }

    let target = svc.targets().step_target;
    let rows: Vec<DayRow> = week
        .iter()
        .map(|d| DayRow {
            date: d.date.clone(),
            steps: d.steps,
            distance: distance_km(d.steps),
            goal: if d.steps >= target { "yes" } else { "" },
        })
        .collect();
    let total: i64 = week.iter().map(|d| d.steps).sum();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("Total: {total} steps ({} km)", distance_km(total));
    Ok(())
}

pub(crate) fn cmd_daily_month(svc: &PacerService, month: Option<String>, json: bool) -> Result<()> {
    let month = match month {
        Some(m) => {
            NaiveDate::parse_from_str(&format!("{m}-01"), "%Y-%m-%d")
                .with_context(|| format!("Invalid month '{m}'. Use YYYY-MM"))?;
            m
        }
        None => Local::now().format("%Y-%m").to_string(),
    };
    let total = svc.month_total(&month)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "month": month, "steps": total, "distance_km": distance_km(total) })
        );
    } else {
        println!("{month}: {total} steps ({} km)", distance_km(total));
    }
    Ok(())
}
