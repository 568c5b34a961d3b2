use anyhow::{Context, Result, bail};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::metrics::{Bmi, Gender, MetricsUpdate, UserMetrics};
use pacer_core::models::{BodyRecord, BodyType};
use pacer_core::schema::body_record;
use pacer_core::service::PacerService;

use super::helpers::{
    day_range_ms, format_ms, parse_body_type, parse_date, parse_measurement, print_json,
    timestamp_ms,
};

pub(crate) async fn cmd_body_log(
    svc: &PacerService,
    kind: &str,
    value: &str,
    unit: Option<&str>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let body_type = parse_body_type(kind)?;
    let value = parse_measurement(value)?;
    let time = timestamp_ms(parse_date(date)?, None)?;
    let record = svc.log_body(body_type, &value, unit, time).await?;

    if json {
        print_json(&record)?;
    } else {
        println!(
            "Logged {kind} #{}: {} {} on {}",
            record.id,
            record.data,
            record.unit,
            format_ms(record.time)
        );
    }
    Ok(())
}

pub(crate) fn cmd_body_list(
    svc: &PacerService,
    kind: &str,
    limit: usize,
    days: Option<u32>,
    json: bool,
) -> Result<()> {
    let body_type = parse_body_type(kind)?;
    let records = match days {
        Some(days) => {
            let (from, to) = day_range_ms(parse_date(None)?, days)?;
            svc.body_between(body_type, from, to)?
        }
        None => svc.body_history(body_type, limit)?,
    };

    if json {
        print_json(&records)?;
    } else if records.is_empty() {
        eprintln!("No {kind} entries found. Use `pacer body log {kind} <value>` to add one.");
    } else {
        print_body_table(body_type, &records);
    }
    Ok(())
}

pub(crate) fn cmd_body_update(
    svc: &PacerService,
    id: i64,
    value: &str,
    unit: Option<&str>,
    json: bool,
) -> Result<()> {
    let value = parse_measurement(value)?;
    let Some(record) = svc.update_body(id, &value, unit)? else {
        bail!("Body record #{id} not found");
    };

    if json {
        print_json(&record)?;
    } else {
        println!("Updated #{}: {} {}", record.id, record.data, record.unit);
    }
    Ok(())
}

pub(crate) fn cmd_body_delete(svc: &PacerService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_record(body_record::TABLE, id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted, "id": id }));
    } else if deleted {
        println!("Deleted body record #{id}");
    } else {
        bail!("Body record #{id} not found");
    }
    Ok(())
}

#[derive(Serialize)]
struct MetricsReport {
    #[serde(flatten)]
    metrics: UserMetrics,
    bmi: Option<Bmi>,
    bmr: Option<i64>,
}

/// Shows height, weight, age, gender and weight goal with BMI and BMR,
/// after applying any of the given edits.
pub(crate) async fn cmd_body_metrics(
    svc: &mut PacerService,
    height: Option<f64>,
    weight: Option<f64>,
    age: Option<i64>,
    gender: Option<&str>,
    weight_target: Option<i64>,
    json: bool,
) -> Result<()> {
    if height.is_some_and(|h| h <= 0.0) || weight.is_some_and(|w| w <= 0.0) {
        bail!("Height and weight must be greater than 0");
    }
    if age.is_some_and(|a| a <= 0) || weight_target.is_some_and(|t| t <= 0) {
        bail!("Age and weight target must be greater than 0");
    }
    let gender = gender
        .map(|g| {
            Gender::parse(g).with_context(|| format!("Invalid gender '{g}'. Use male or female"))
        })
        .transpose()?;

    let update = MetricsUpdate {
        height,
        weight,
        age,
        gender,
        weight_target,
    };
    let metrics = if update.is_empty() {
        svc.metrics()
    } else {
        svc.update_metrics(&update).await?
    };
    let report = MetricsReport {
        bmi: metrics.bmi(),
        bmr: metrics.bmr(),
        metrics,
    };

    if json {
        print_json(&report)?;
    } else {
        print_metrics_table(&report);
    }
    Ok(())
}

fn print_metrics_table(report: &MetricsReport) {
    #[derive(Tabled)]
    struct MetricRow {
        #[tabled(rename = "Metric")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let unset = || "-".to_string();
    let m = &report.metrics;
    let rows = vec![
        MetricRow {
            name: "Height",
            value: if m.height > 0.0 { format!("{} cm", m.height) } else { unset() },
        },
        MetricRow {
            name: "Weight",
            value: if m.weight > 0.0 { format!("{} kg", m.weight) } else { unset() },
        },
        MetricRow {
            name: "Age",
            value: if m.age > 0 { m.age.to_string() } else { unset() },
        },
        MetricRow {
            name: "Gender",
            value: m.gender.as_str().to_string(),
        },
        MetricRow {
            name: "Weight goal",
            value: m.weight_target.map_or_else(unset, |t| format!("{t} kg")),
        },
        MetricRow {
            name: "BMI",
            value: report
                .bmi
                .map_or_else(unset, |b| format!("{:.1} ({})", b.value, b.status.label())),
        },
        MetricRow {
            name: "BMR",
            value: report.bmr.map_or_else(unset, |b| format!("{b} kcal/day")),
        },
    ];

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn print_body_table(body_type: BodyType, records: &[BodyRecord]) {
    #[derive(Tabled)]
    struct BodyRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<BodyRow> = records
        .iter()
        .map(|r| BodyRow {
            id: r.id,
            time: format_ms(r.time),
            value: r.data.clone(),
            unit: if r.unit.is_empty() {
                body_type.default_unit().to_string()
            } else {
                r.unit.clone()
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
