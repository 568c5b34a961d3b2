use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pacer_core::models::{TargetKey, TargetSet};
use pacer_core::service::PacerService;

use super::helpers::{parse_target_key, print_json};

fn unit(key: TargetKey) -> &'static str {
    match key {
        TargetKey::Steps => "steps",
        TargetKey::Calories => "kcal",
        TargetKey::ExerciseTime => "min",
        TargetKey::ActivityCount => "times",
        TargetKey::Distance => "m",
        TargetKey::Weight => "kg",
    }
}

fn print_targets(targets: &TargetSet) {
    #[derive(Tabled)]
    struct TargetRow {
        #[tabled(rename = "Target")]
        name: &'static str,
        #[tabled(rename = "Value")]
        value: i64,
        #[tabled(rename = "Unit")]
        unit: &'static str,
    }

    let rows: Vec<TargetRow> = TargetKey::ALL
        .iter()
        .map(|&key| TargetRow {
            name: key.pref_key(),
            value: targets.get(key),
            unit: unit(key),
        })
        .collect();
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) async fn cmd_target_set(
    svc: &mut PacerService,
    key: &str,
    value: i64,
    json: bool,
) -> Result<()> {
    if value <= 0 {
        bail!("Target must be greater than 0");
    }
    let key = parse_target_key(key)?;
    svc.set_target(key, value).await?;

    if json {
        print_json(&svc.targets())?;
    } else {
        println!("{}: {value} {}", key.pref_key(), unit(key));
    }
    Ok(())
}

pub(crate) fn cmd_target_show(svc: &PacerService, json: bool) -> Result<()> {
    let targets = svc.targets();

    if json {
        print_json(&targets)?;
    } else {
        print_targets(&targets);
    }
    Ok(())
}
