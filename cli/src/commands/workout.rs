use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::models::{QueryLimit, SportFilter, StepRecord, distance_km};
use pacer_core::schema::steps_count;
use pacer_core::service::PacerService;

use super::helpers::{
    day_range_ms, format_duration, format_ms, parse_date, parse_sport, print_json, sport_label,
    timestamp_ms,
};

#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_workout_log(
    svc: &PacerService,
    sport: &str,
    steps: i64,
    minutes: i64,
    calories: Option<f64>,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    if steps < 0 {
        bail!("Steps cannot be negative");
    }
    if minutes <= 0 {
        bail!("Duration must be greater than 0 minutes");
    }
    let sport = parse_sport(sport)?;
    let date = parse_date(date)?;

    let record = StepRecord {
        start_time: timestamp_ms(date, time)?,
        use_time: minutes * 60,
        steps,
        sport_type: sport.code(),
        calories: calories.map(|c| format!("{c:.1}")).unwrap_or_default(),
        ..StepRecord::default()
    };
    let stored = svc.record_workout(&record).await?;

    if json {
        print_json(&stored)?;
    } else {
        println!(
            "Logged {} #{}: {} steps ({} km) in {} on {}",
            sport.label(),
            stored.id,
            stored.steps,
            distance_km(stored.steps),
            format_duration(stored.use_time),
            format_ms(stored.start_time)
        );
    }
    Ok(())
}

pub(crate) fn cmd_workout_list(
    svc: &PacerService,
    sport: Option<&str>,
    days: Option<u32>,
    first: bool,
    json: bool,
) -> Result<()> {
    let filter = match sport {
        Some(s) => SportFilter::Only(parse_sport(s)?),
        None => SportFilter::All,
    };

    let records = if let Some(days) = days {
        let (from, to) = day_range_ms(parse_date(None)?, days)?;
        let mut records = svc.workouts_between(filter, from, to)?;
        if first {
            records.truncate(1);
        }
        records
    } else {
        let limit = if first {
            QueryLimit::FirstOnly
        } else {
            QueryLimit::All
        };
        svc.workouts(filter, limit)?
    };

    if json {
        print_json(&records)?;
    } else if records.is_empty() {
        eprintln!("No workouts found. Use `pacer workout log` to record one.");
    } else {
        print_workout_table(&records);
    }
    Ok(())
}

pub(crate) fn cmd_workout_totals(svc: &PacerService, json: bool) -> Result<()> {
    let totals = svc.sport_totals()?;

    if json {
        print_json(&totals)?;
    } else {
        #[derive(Tabled)]
        struct TotalRow {
            #[tabled(rename = "Sport")]
            sport: &'static str,
            #[tabled(rename = "Steps")]
            steps: i64,
            #[tabled(rename = "Distance (km)")]
            distance: String,
        }

        let rows: Vec<TotalRow> = totals
            .iter()
            .map(|t| TotalRow {
                sport: t.sport_type.label(),
                steps: t.steps,
                distance: t.distance_km.clone(),
            })
            .collect();
        let table = Table::new(&rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_workout_delete(svc: &PacerService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_record(steps_count::TABLE, id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted, "id": id }));
    } else if deleted {
        println!("Deleted workout #{id}");
    } else {
        bail!("Workout #{id} not found");
    }
    Ok(())
}

fn print_workout_table(records: &[StepRecord]) {
    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Start")]
        start: String,
        #[tabled(rename = "Sport")]
        sport: String,
        #[tabled(rename = "Duration")]
        duration: String,
        #[tabled(rename = "Steps")]
        steps: i64,
        #[tabled(rename = "km")]
        distance: String,
        #[tabled(rename = "kcal")]
        calories: String,
    }

    let rows: Vec<WorkoutRow> = records
        .iter()
        .map(|r| WorkoutRow {
            id: r.id,
            start: format_ms(r.start_time),
            sport: sport_label(r.sport_type),
            duration: format_duration(r.use_time),
            steps: r.steps,
            distance: distance_km(r.steps),
            calories: if r.calories.is_empty() {
                "-".into()
            } else {
                r.calories.clone()
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
