//! Conversion between typed records and column maps keyed by the on-disk
//! column names.
//!
//! Mapping is deliberately loose: missing integer columns read as 0 and
//! NULL text columns read as an empty string. No value validation happens
//! here.

use std::collections::BTreeMap;

use rusqlite::types::Value;

use crate::models::{
    BodyRecord, BowelLog, DailyStepAggregate, MenstruationLog, MoodLog, SleepLog, StepRecord,
    WaterLog,
};
use crate::schema::{
    body_record, bowel_log, menstruation_log, mood_log, sleep_log, step_per_day, steps_count,
    water_log,
};

/// Column name to value, ordered by column name.
pub type ColumnMap = BTreeMap<String, Value>;

/// Column name of the primary key shared by every table.
pub const ID_COLUMN: &str = "ID";

pub trait Record: Sized {
    const TABLE: &'static str;

    fn to_row(&self) -> ColumnMap;
    fn from_row(row: &ColumnMap) -> Self;
}

/// Reads every column of a result row into a [`ColumnMap`].
pub fn column_map(row: &rusqlite::Row) -> rusqlite::Result<ColumnMap> {
    let stmt = row.as_ref();
    let mut map = ColumnMap::new();
    for (i, name) in stmt.column_names().into_iter().enumerate() {
        map.insert(name.to_string(), row.get::<_, Value>(i)?);
    }
    Ok(map)
}

#[allow(clippy::cast_possible_truncation)]
fn get_int(row: &ColumnMap, column: &str) -> i64 {
    match row.get(column) {
        Some(Value::Integer(v)) => *v,
        Some(Value::Real(v)) => *v as i64,
        Some(Value::Text(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn get_text(row: &ColumnMap, column: &str) -> String {
    match row.get(column) {
        Some(Value::Text(s)) => s.clone(),
        Some(Value::Integer(v)) => v.to_string(),
        Some(Value::Real(v)) => v.to_string(),
        _ => String::new(),
    }
}

fn put_int(row: &mut ColumnMap, column: &str, value: i64) {
    row.insert(column.to_string(), Value::Integer(value));
}

fn put_text(row: &mut ColumnMap, column: &str, value: &str) {
    row.insert(column.to_string(), Value::Text(value.to_string()));
}

impl Record for StepRecord {
    const TABLE: &'static str = steps_count::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, steps_count::ID, self.id);
        put_int(&mut row, steps_count::START_TIME, self.start_time);
        put_int(&mut row, steps_count::USE_TIME, self.use_time);
        put_int(&mut row, steps_count::STEPS, self.steps);
        put_int(&mut row, steps_count::TYPE, self.sport_type);
        put_int(&mut row, steps_count::SUB_TYPE, self.sub_type);
        put_text(&mut row, steps_count::CAL, &self.calories);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, steps_count::ID),
            start_time: get_int(row, steps_count::START_TIME),
            use_time: get_int(row, steps_count::USE_TIME),
            steps: get_int(row, steps_count::STEPS),
            sport_type: get_int(row, steps_count::TYPE),
            sub_type: get_int(row, steps_count::SUB_TYPE),
            calories: get_text(row, steps_count::CAL),
        }
    }
}

impl Record for DailyStepAggregate {
    const TABLE: &'static str = step_per_day::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, step_per_day::ID, self.id);
        put_text(&mut row, step_per_day::DATE, &self.date);
        put_int(&mut row, step_per_day::TIME, self.time);
        put_int(&mut row, step_per_day::STEP_COUNT, self.steps);
        put_int(&mut row, step_per_day::STATE, self.state);
        put_int(&mut row, step_per_day::BACKUP1, self.backup);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, step_per_day::ID),
            date: get_text(row, step_per_day::DATE),
            steps: get_int(row, step_per_day::STEP_COUNT),
            state: get_int(row, step_per_day::STATE),
            backup: get_int(row, step_per_day::BACKUP1),
            time: get_int(row, step_per_day::TIME),
        }
    }
}

impl Record for BodyRecord {
    const TABLE: &'static str = body_record::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, body_record::ID, self.id);
        put_int(&mut row, body_record::TIME, self.time);
        put_int(&mut row, body_record::TYPE, self.body_type);
        put_text(&mut row, body_record::DATA, &self.data);
        put_text(&mut row, body_record::UNIT, &self.unit);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, body_record::ID),
            time: get_int(row, body_record::TIME),
            body_type: get_int(row, body_record::TYPE),
            data: get_text(row, body_record::DATA),
            unit: get_text(row, body_record::UNIT),
        }
    }
}

impl Record for WaterLog {
    const TABLE: &'static str = water_log::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, water_log::ID, self.id);
        put_int(&mut row, water_log::TIME, self.time);
        put_int(&mut row, water_log::AMOUNT, self.amount);
        put_text(&mut row, water_log::NOTE, &self.note);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, water_log::ID),
            time: get_int(row, water_log::TIME),
            amount: get_int(row, water_log::AMOUNT),
            note: get_text(row, water_log::NOTE),
        }
    }
}

impl Record for BowelLog {
    const TABLE: &'static str = bowel_log::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, bowel_log::ID, self.id);
        put_int(&mut row, bowel_log::TIME, self.time);
        put_text(&mut row, bowel_log::STATUS, &self.status);
        put_text(&mut row, bowel_log::NOTE, &self.note);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, bowel_log::ID),
            time: get_int(row, bowel_log::TIME),
            status: get_text(row, bowel_log::STATUS),
            note: get_text(row, bowel_log::NOTE),
        }
    }
}

impl Record for MenstruationLog {
    const TABLE: &'static str = menstruation_log::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, menstruation_log::ID, self.id);
        put_int(&mut row, menstruation_log::START_TIME, self.start_time);
        put_int(&mut row, menstruation_log::END_TIME, self.end_time);
        put_int(&mut row, menstruation_log::CYCLE_LENGTH, self.cycle_length);
        put_text(&mut row, menstruation_log::NOTE, &self.note);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, menstruation_log::ID),
            start_time: get_int(row, menstruation_log::START_TIME),
            end_time: get_int(row, menstruation_log::END_TIME),
            cycle_length: get_int(row, menstruation_log::CYCLE_LENGTH),
            note: get_text(row, menstruation_log::NOTE),
        }
    }
}

impl Record for SleepLog {
    const TABLE: &'static str = sleep_log::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, sleep_log::ID, self.id);
        put_int(&mut row, sleep_log::START_TIME, self.start_time);
        put_int(&mut row, sleep_log::END_TIME, self.end_time);
        put_int(&mut row, sleep_log::QUALITY, self.quality);
        put_text(&mut row, sleep_log::NOTE, &self.note);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, sleep_log::ID),
            start_time: get_int(row, sleep_log::START_TIME),
            end_time: get_int(row, sleep_log::END_TIME),
            quality: get_int(row, sleep_log::QUALITY),
            note: get_text(row, sleep_log::NOTE),
        }
    }
}

impl Record for MoodLog {
    const TABLE: &'static str = mood_log::TABLE;

    fn to_row(&self) -> ColumnMap {
        let mut row = ColumnMap::new();
        put_int(&mut row, mood_log::ID, self.id);
        put_int(&mut row, mood_log::TIME, self.time);
        put_int(&mut row, mood_log::SCORE, self.score);
        put_text(&mut row, mood_log::NOTE, &self.note);
        row
    }

    fn from_row(row: &ColumnMap) -> Self {
        Self {
            id: get_int(row, mood_log::ID),
            time: get_int(row, mood_log::TIME),
            score: get_int(row, mood_log::SCORE),
            note: get_text(row, mood_log::NOTE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_step() -> StepRecord {
        StepRecord {
            id: 7,
            start_time: 1_718_000_000_000,
            use_time: 1800,
            steps: 3200,
            sport_type: 2,
            sub_type: 0,
            calories: "142.5".to_string(),
        }
    }

    #[test]
    fn test_step_record_roundtrip() {
        let record = sample_step();
        assert_eq!(StepRecord::from_row(&record.to_row()), record);
        assert_eq!(
            StepRecord::from_row(&StepRecord::default().to_row()),
            StepRecord::default()
        );
    }

    #[test]
    fn test_step_record_uses_stored_column_names() {
        let row = sample_step().to_row();
        assert_eq!(row.get("steps_num"), Some(&Value::Integer(3200)));
        assert_eq!(row.get("type"), Some(&Value::Integer(2)));
        assert_eq!(row.get("cal"), Some(&Value::Text("142.5".to_string())));
        assert_eq!(row.get("ID"), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_canonical_row_roundtrip() {
        let mut row = ColumnMap::new();
        row.insert("ID".into(), Value::Integer(3));
        row.insert("date".into(), Value::Text("2024-06-15".into()));
        row.insert("time".into(), Value::Integer(1_718_400_000_000));
        row.insert("step_count".into(), Value::Integer(8421));
        row.insert("state".into(), Value::Integer(1));
        row.insert("backup1".into(), Value::Integer(0));
        assert_eq!(DailyStepAggregate::from_row(&row).to_row(), row);
    }

    fn row(columns: &[(&str, Value)]) -> ColumnMap {
        columns
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    fn assert_canonical<R: Record>(row: &ColumnMap) {
        assert_eq!(&R::from_row(row).to_row(), row, "table {}", R::TABLE);
    }

    #[test]
    fn test_canonical_rows_survive_every_table() {
        let int = Value::Integer;
        let text = |s: &str| Value::Text(s.to_string());

        assert_canonical::<StepRecord>(&row(&[
            ("ID", int(1)),
            ("start_time", int(1_718_000_000_000)),
            ("use_time", int(900)),
            ("steps_num", int(1200)),
            ("type", int(3)),
            ("sub_type", int(1)),
            ("cal", text("60.0")),
        ]));
        assert_canonical::<DailyStepAggregate>(&row(&[
            ("ID", int(2)),
            ("date", text("2024-06-14")),
            ("time", int(1_718_300_000_000)),
            ("step_count", int(5000)),
            ("state", int(0)),
            ("backup1", int(7)),
        ]));
        assert_canonical::<BodyRecord>(&row(&[
            ("ID", int(3)),
            ("target_time", int(1_718_000_000_000)),
            ("target_type", int(0)),
            ("data", text("63.4")),
            ("unit", text("kg")),
        ]));
        assert_canonical::<WaterLog>(&row(&[
            ("ID", int(4)),
            ("time", int(100)),
            ("amount", int(300)),
            ("note", text("tea")),
        ]));
        assert_canonical::<BowelLog>(&row(&[
            ("ID", int(5)),
            ("time", int(200)),
            ("status", text("normal")),
            ("note", text("")),
        ]));
        assert_canonical::<MenstruationLog>(&row(&[
            ("ID", int(6)),
            ("start_time", int(1)),
            ("end_time", int(2)),
            ("cycle_length", int(29)),
            ("note", text("light")),
        ]));
        assert_canonical::<SleepLog>(&row(&[
            ("ID", int(7)),
            ("start_time", int(10)),
            ("end_time", int(30)),
            ("quality", int(5)),
            ("note", text("")),
        ]));
        assert_canonical::<MoodLog>(&row(&[
            ("ID", int(8)),
            ("time", int(400)),
            ("score", int(2)),
            ("note", text("tired")),
        ]));
    }

    #[test]
    fn test_missing_columns_default() {
        let mut row = ColumnMap::new();
        row.insert("data".into(), Value::Null);
        let body = BodyRecord::from_row(&row);
        assert_eq!(body.id, 0);
        assert_eq!(body.time, 0);
        assert_eq!(body.data, "");
        assert_eq!(body.unit, "");
    }

    #[test]
    fn test_log_records_roundtrip() {
        let water = WaterLog {
            id: 1,
            time: 100,
            amount: 250,
            note: "after run".into(),
        };
        assert_eq!(WaterLog::from_row(&water.to_row()), water);

        let sleep = SleepLog {
            id: 2,
            start_time: 10,
            end_time: 20,
            quality: 4,
            note: String::new(),
        };
        assert_eq!(SleepLog::from_row(&sleep.to_row()), sleep);

        let period = MenstruationLog {
            id: 3,
            start_time: 1,
            end_time: 5,
            cycle_length: 28,
            note: "n".into(),
        };
        assert_eq!(MenstruationLog::from_row(&period.to_row()), period);
        assert_eq!(MoodLog::from_row(&MoodLog::default().to_row()), MoodLog::default());
        assert_eq!(BowelLog::from_row(&BowelLog::default().to_row()), BowelLog::default());
    }
}
