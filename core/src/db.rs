use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Params, params, params_from_iter};

use crate::error::{Error, Result};
use crate::mapper::{ID_COLUMN, Record, column_map};
use crate::models::{
    BodyRecord, BodyType, BowelLog, DailyStepAggregate, MenstruationLog, MoodLog, QueryLimit,
    SleepLog, SportFilter, SportTotal, SportType, StepRecord, WaterLog, distance_km,
};
use crate::schema::{
    self, body_record, bowel_log, menstruation_log, mood_log, sleep_log, step_per_day,
    steps_count, water_log,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened step database");
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version = self.schema_version()?;

        if version > schema::CURRENT_VERSION {
            return Err(Error::UnsupportedSchemaVersion {
                found: version,
                supported: schema::CURRENT_VERSION,
            });
        }

        if version < schema::CURRENT_VERSION {
            let tx = self.conn.unchecked_transaction()?;
            for table in schema::tables_to_create(version) {
                tx.execute_batch(&table.create_sql())?;
            }
            tx.pragma_update(None, "user_version", schema::CURRENT_VERSION)?;
            tx.commit()?;
            tracing::info!(
                from = version,
                to = schema::CURRENT_VERSION,
                "migrated step database"
            );
        }

        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    // --- Generic record access ---

    fn query_records<R: Record, P: Params>(&self, sql: &str, params: P) -> Result<Vec<R>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, column_map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.iter().map(R::from_row).collect())
    }

    /// Inserts `record`, letting the store assign the primary key.
    pub fn insert<R: Record>(&self, record: &R) -> Result<i64> {
        let mut row = record.to_row();
        row.remove(ID_COLUMN);

        let columns: Vec<&str> = row.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );
        self.conn.execute(&sql, params_from_iter(row.values()))?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(table = R::TABLE, id, "inserted record");
        Ok(id)
    }

    /// Overwrites every mapped column of row `id`. Returns the number of rows changed.
    pub fn update<R: Record>(&self, record: &R, id: i64) -> Result<usize> {
        let mut row = record.to_row();
        row.remove(ID_COLUMN);

        let assignments: Vec<String> = row
            .keys()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {ID_COLUMN} = ?{}",
            R::TABLE,
            assignments.join(", "),
            row.len() + 1
        );
        let mut values: Vec<rusqlite::types::Value> = row.into_values().collect();
        values.push(rusqlite::types::Value::Integer(id));
        Ok(self.conn.execute(&sql, params_from_iter(values))?)
    }

    pub fn delete(&self, table: &str, id: i64) -> Result<usize> {
        let def = schema::table(table).ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        let rows = self.conn.execute(
            &format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1", def.name),
            params![id],
        )?;
        Ok(rows)
    }

    pub fn get<R: Record>(&self, id: i64) -> Result<Option<R>> {
        let sql = format!("SELECT * FROM {} WHERE {ID_COLUMN} = ?1", R::TABLE);
        Ok(self
            .conn
            .query_row(&sql, params![id], column_map)
            .optional()?
            .map(|row| R::from_row(&row)))
    }

    // --- Sport records ---

    /// Sport records of one type, oldest first. [`SportFilter::All`] matches every type.
    pub fn query_steps_by_type(
        &self,
        filter: SportFilter,
        limit: QueryLimit,
    ) -> Result<Vec<StepRecord>> {
        let mut sql = format!("SELECT * FROM {}", steps_count::TABLE);
        if filter != SportFilter::All {
            sql.push_str(&format!(" WHERE {} = ?1", steps_count::TYPE));
        }
        sql.push_str(&format!(" ORDER BY {} ASC", steps_count::START_TIME));
        if limit == QueryLimit::FirstOnly {
            sql.push_str(" LIMIT 1");
        }

        let records = match filter {
            SportFilter::All => self.query_records(&sql, [])?,
            SportFilter::Only(t) => self.query_records(&sql, params![t.code()])?,
        };
        tracing::debug!(count = records.len(), "queried sport records");
        Ok(records)
    }

    /// Sport records with `start <= start_time <= end`, oldest first.
    pub fn query_steps_by_type_and_range(
        &self,
        filter: SportFilter,
        start: i64,
        end: i64,
    ) -> Result<Vec<StepRecord>> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE {} BETWEEN ?1 AND ?2",
            steps_count::TABLE,
            steps_count::START_TIME
        );
        if filter != SportFilter::All {
            sql.push_str(&format!(" AND {} = ?3", steps_count::TYPE));
        }
        sql.push_str(&format!(" ORDER BY {} ASC", steps_count::START_TIME));

        match filter {
            SportFilter::All => self.query_records(&sql, params![start, end]),
            SportFilter::Only(t) => self.query_records(&sql, params![start, end, t.code()]),
        }
    }

    /// Step totals and distance for each aggregated sport type, zero when a type has no rows.
    pub fn aggregate_steps_by_type(&self) -> Result<Vec<SportTotal>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {t}, COALESCE(SUM({s}), 0) FROM {table} WHERE {t} BETWEEN 1 AND 5 GROUP BY {t}",
            t = steps_count::TYPE,
            s = steps_count::STEPS,
            table = steps_count::TABLE
        ))?;
        let sums: Vec<(i64, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(SportType::AGGREGATED
            .iter()
            .map(|&sport_type| {
                let steps = sums
                    .iter()
                    .find(|(code, _)| *code == sport_type.code())
                    .map_or(0, |(_, s)| *s);
                SportTotal {
                    sport_type,
                    steps,
                    distance_km: distance_km(steps),
                }
            })
            .collect())
    }

    // --- Daily aggregates ---

    pub fn get_daily_aggregate(&self, date: &str) -> Result<Option<DailyStepAggregate>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {ID_COLUMN} ASC LIMIT 1",
            step_per_day::TABLE,
            step_per_day::DATE
        );
        Ok(self
            .conn
            .query_row(&sql, params![date], column_map)
            .optional()?
            .map(|row| DailyStepAggregate::from_row(&row)))
    }

    /// Writes the step count for `date`, updating the existing row if there is one.
    pub fn record_daily_steps(
        &self,
        date: &str,
        steps: i64,
        time: i64,
    ) -> Result<DailyStepAggregate> {
        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                &format!(
                    "SELECT {ID_COLUMN} FROM {} WHERE {} = ?1 ORDER BY {ID_COLUMN} ASC LIMIT 1",
                    step_per_day::TABLE,
                    step_per_day::DATE
                ),
                params![date],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                tx.execute(
                    &format!(
                        "UPDATE {} SET {} = ?1, {} = ?2 WHERE {ID_COLUMN} = ?3",
                        step_per_day::TABLE,
                        step_per_day::STEP_COUNT,
                        step_per_day::TIME
                    ),
                    params![steps, time, id],
                )?;
            }
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
                        step_per_day::TABLE,
                        step_per_day::DATE,
                        step_per_day::STEP_COUNT,
                        step_per_day::TIME
                    ),
                    params![date, steps, time],
                )?;
            }
        }
        tx.commit()?;
        tracing::debug!(date, steps, "recorded daily steps");

        self.get_daily_aggregate(date)?
            .ok_or_else(|| Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Aggregates for the given dates, ordered by date. Dates without a row are skipped.
    pub fn daily_aggregates_for_dates(&self, dates: &[String]) -> Result<Vec<DailyStepAggregate>> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=dates.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT * FROM {} WHERE {} IN ({}) ORDER BY {} ASC",
            step_per_day::TABLE,
            step_per_day::DATE,
            placeholders.join(", "),
            step_per_day::DATE
        );
        self.query_records(&sql, params_from_iter(dates.iter()))
    }

    /// Total steps for a `YYYY-MM` month.
    pub fn steps_for_month(&self, month: &str) -> Result<i64> {
        let sql = format!(
            "SELECT COALESCE(SUM({}), 0) FROM {} WHERE {} LIKE ?1",
            step_per_day::STEP_COUNT,
            step_per_day::TABLE,
            step_per_day::DATE
        );
        Ok(self
            .conn
            .query_row(&sql, params![format!("{month}-%")], |row| row.get(0))?)
    }

    // --- Body records ---

    /// Newest first. `limit == 0` returns every row.
    pub fn query_body_by_type(&self, body_type: BodyType, limit: usize) -> Result<Vec<BodyRecord>> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {} DESC",
            body_record::TABLE,
            body_record::TYPE,
            body_record::TIME
        );
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        self.query_records(&sql, params![body_type.code()])
    }

    pub fn query_body_by_type_and_range(
        &self,
        body_type: BodyType,
        start: i64,
        end: i64,
    ) -> Result<Vec<BodyRecord>> {
        let sql = format!(
            "SELECT * FROM {table} WHERE {ty} = ?1 AND {time} BETWEEN ?2 AND ?3 ORDER BY {time} DESC",
            table = body_record::TABLE,
            ty = body_record::TYPE,
            time = body_record::TIME
        );
        self.query_records(&sql, params![body_type.code(), start, end])
    }

    // --- Logs ---

    fn logs_between<R: Record>(&self, time_column: &str, start: i64, end: i64) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {time_column} BETWEEN ?1 AND ?2 ORDER BY {time_column} DESC",
            R::TABLE
        );
        self.query_records(&sql, params![start, end])
    }

    pub fn water_logs_between(&self, start: i64, end: i64) -> Result<Vec<WaterLog>> {
        self.logs_between(water_log::TIME, start, end)
    }

    pub fn bowel_logs_between(&self, start: i64, end: i64) -> Result<Vec<BowelLog>> {
        self.logs_between(bowel_log::TIME, start, end)
    }

    pub fn sleep_logs_between(&self, start: i64, end: i64) -> Result<Vec<SleepLog>> {
        self.logs_between(sleep_log::START_TIME, start, end)
    }

    pub fn mood_logs_between(&self, start: i64, end: i64) -> Result<Vec<MoodLog>> {
        self.logs_between(mood_log::TIME, start, end)
    }

    /// Newest first by start time. `limit == 0` returns every row.
    pub fn menstruation_logs(&self, limit: usize) -> Result<Vec<MenstruationLog>> {
        let mut sql = format!(
            "SELECT * FROM {} ORDER BY {} DESC",
            menstruation_log::TABLE,
            menstruation_log::START_TIME
        );
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        self.query_records(&sql, [])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sport(start_time: i64, steps: i64, sport_type: SportType) -> StepRecord {
        StepRecord {
            start_time,
            steps,
            sport_type: sport_type.code(),
            use_time: 600,
            calories: "20".to_string(),
            ..StepRecord::default()
        }
    }

    fn table_names(db: &Database) -> Vec<String> {
        let mut stmt = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name != 'sqlite_sequence' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_has_all_tables() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
        assert_eq!(
            table_names(&db),
            vec![
                "boday_record",
                "bowel_log",
                "menstruation_log",
                "mood_log",
                "sleep_log",
                "step_per_day",
                "steps_count",
                "target",
                "water_log"
            ]
        );
    }

    #[test]
    fn test_upgrade_from_version_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DB_NAME);
        {
            let conn = Connection::open(&path).unwrap();
            for table in schema::tables_to_create(0)
                .into_iter()
                .filter(|t| t.since_version == 1)
            {
                conn.execute_batch(&table.create_sql()).unwrap();
            }
            conn.execute(
                "INSERT INTO steps_count (start_time, steps_num, type) VALUES (1, 500, 3)",
                [],
            )
            .unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
        let names = table_names(&db);
        for log in ["water_log", "bowel_log", "menstruation_log", "sleep_log", "mood_log"] {
            assert!(names.iter().any(|n| n == log), "missing {log}");
        }
        // existing data survives
        let all = db
            .query_steps_by_type(SportFilter::All, QueryLimit::All)
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].steps, 500);
    }

    #[test]
    fn test_newer_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DB_NAME);
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 3).unwrap();
        }
        match Database::open(&path) {
            Err(Error::UnsupportedSchemaVersion { found, supported }) => {
                assert_eq!(found, 3);
                assert_eq!(supported, 2);
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("expected newer schema to be rejected"),
        }
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DB_NAME);
        {
            let db = Database::open(&path).unwrap();
            db.insert(&sport(1, 10, SportType::Walk)).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), 2);
        assert_eq!(
            db.query_steps_by_type(SportFilter::All, QueryLimit::All)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_insert_and_get_record() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert(&sport(1000, 2500, SportType::OutdoorRun)).unwrap();
        assert!(id > 0);

        let fetched: StepRecord = db.get(id).unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.steps, 2500);
        assert_eq!(fetched.sport_type, 2);
        assert_eq!(fetched.calories, "20");

        assert!(db.get::<StepRecord>(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_insert_returns_increasing_ids() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(&WaterLog::default()).unwrap();
        let b = db.insert(&WaterLog::default()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .insert(&BodyRecord {
                time: 100,
                body_type: BodyType::Weight.code(),
                data: "70.5".into(),
                unit: "kg".into(),
                ..BodyRecord::default()
            })
            .unwrap();

        let changed = db
            .update(
                &BodyRecord {
                    time: 100,
                    body_type: BodyType::Weight.code(),
                    data: "69.8".into(),
                    unit: "kg".into(),
                    ..BodyRecord::default()
                },
                id,
            )
            .unwrap();
        assert_eq!(changed, 1);
        let fetched: BodyRecord = db.get(id).unwrap().unwrap();
        assert_eq!(fetched.data, "69.8");

        assert_eq!(db.update(&BodyRecord::default(), id + 50).unwrap(), 0);

        assert_eq!(db.delete("boday_record", id).unwrap(), 1);
        assert_eq!(db.delete("boday_record", id).unwrap(), 0);
        assert!(matches!(
            db.delete("foods", id),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn test_query_steps_all_sentinel_and_first_only() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&sport(300, 30, SportType::Walk)).unwrap();
        db.insert(&sport(100, 10, SportType::IndoorRun)).unwrap();
        db.insert(&sport(200, 20, SportType::Walk)).unwrap();

        let all = db
            .query_steps_by_type(SportFilter::All, QueryLimit::All)
            .unwrap();
        let starts: Vec<i64> = all.iter().map(|r| r.start_time).collect();
        assert_eq!(starts, vec![100, 200, 300]);

        let walks = db
            .query_steps_by_type(SportFilter::Only(SportType::Walk), QueryLimit::All)
            .unwrap();
        assert_eq!(walks.len(), 2);
        assert_eq!(walks[0].start_time, 200);

        let first = db
            .query_steps_by_type(SportFilter::Only(SportType::Walk), QueryLimit::FirstOnly)
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].start_time, 200);

        let none = db
            .query_steps_by_type(SportFilter::Only(SportType::Climb), QueryLimit::All)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_query_steps_range_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        for t in [100, 200, 300, 400] {
            db.insert(&sport(t, 1, SportType::Hike)).unwrap();
        }
        db.insert(&sport(250, 1, SportType::Walk)).unwrap();

        let hikes = db
            .query_steps_by_type_and_range(SportFilter::Only(SportType::Hike), 200, 300)
            .unwrap();
        let starts: Vec<i64> = hikes.iter().map(|r| r.start_time).collect();
        assert_eq!(starts, vec![200, 300]);

        let any = db
            .query_steps_by_type_and_range(SportFilter::All, 200, 300)
            .unwrap();
        assert_eq!(any.len(), 3);
    }

    #[test]
    fn test_aggregate_steps_by_type() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&sport(1, 1000, SportType::OutdoorRun)).unwrap();
        db.insert(&sport(2, 1000, SportType::OutdoorRun)).unwrap();
        db.insert(&sport(3, 500, SportType::Walk)).unwrap();
        db.insert(&sport(4, 9999, SportType::Cycling)).unwrap();

        let totals = db.aggregate_steps_by_type().unwrap();
        assert_eq!(totals.len(), 5);
        assert_eq!(totals[0].sport_type, SportType::IndoorRun);
        assert_eq!(totals[0].steps, 0);
        assert_eq!(totals[0].distance_km, "0.00");
        assert_eq!(totals[1].steps, 2000);
        assert_eq!(totals[1].distance_km, "1.20");
        assert_eq!(totals[2].steps, 500);
        assert_eq!(totals[2].distance_km, "0.30");
        assert!(totals.iter().all(|t| t.sport_type != SportType::Cycling));
    }

    #[test]
    fn test_record_daily_steps_keeps_one_row_per_date() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_daily_aggregate("2024-06-15").unwrap().is_none());

        let first = db.record_daily_steps("2024-06-15", 1200, 10).unwrap();
        let second = db.record_daily_steps("2024-06-15", 4800, 20).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.steps, 4800);
        assert_eq!(second.time, 20);

        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM step_per_day WHERE date = '2024-06-15'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_weekly_and_monthly_queries() {
        let db = Database::open_in_memory().unwrap();
        db.record_daily_steps("2024-06-14", 3000, 0).unwrap();
        db.record_daily_steps("2024-06-15", 5000, 0).unwrap();
        db.record_daily_steps("2024-05-31", 7000, 0).unwrap();

        let week = db
            .daily_aggregates_for_dates(&[
                "2024-06-15".to_string(),
                "2024-06-13".to_string(),
                "2024-06-14".to_string(),
            ])
            .unwrap();
        let dates: Vec<&str> = week.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-06-14", "2024-06-15"]);

        assert_eq!(db.steps_for_month("2024-06").unwrap(), 8000);
        assert_eq!(db.steps_for_month("2024-05").unwrap(), 7000);
        assert_eq!(db.steps_for_month("2023-01").unwrap(), 0);
        assert!(db.daily_aggregates_for_dates(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_body_queries_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for (time, data) in [(100, "70"), (300, "68"), (200, "69")] {
            db.insert(&BodyRecord {
                time,
                body_type: BodyType::Weight.code(),
                data: data.into(),
                unit: "kg".into(),
                ..BodyRecord::default()
            })
            .unwrap();
        }
        db.insert(&BodyRecord {
            time: 250,
            body_type: BodyType::Waist.code(),
            data: "80".into(),
            unit: "cm".into(),
            ..BodyRecord::default()
        })
        .unwrap();

        let weights = db.query_body_by_type(BodyType::Weight, 0).unwrap();
        let times: Vec<i64> = weights.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![300, 200, 100]);

        let latest = db.query_body_by_type(BodyType::Weight, 1).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].data, "68");

        let ranged = db
            .query_body_by_type_and_range(BodyType::Weight, 100, 200)
            .unwrap();
        let times: Vec<i64> = ranged.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![200, 100]);
    }

    #[test]
    fn test_log_queries_descending_within_range() {
        let db = Database::open_in_memory().unwrap();
        for time in [10, 20, 30, 40] {
            db.insert(&WaterLog {
                time,
                amount: 250,
                ..WaterLog::default()
            })
            .unwrap();
            db.insert(&SleepLog {
                start_time: time,
                end_time: time + 5,
                quality: 3,
                ..SleepLog::default()
            })
            .unwrap();
        }

        let water = db.water_logs_between(20, 30).unwrap();
        let times: Vec<i64> = water.iter().map(|w| w.time).collect();
        assert_eq!(times, vec![30, 20]);

        let sleep = db.sleep_logs_between(0, 100).unwrap();
        assert_eq!(sleep.len(), 4);
        assert_eq!(sleep[0].start_time, 40);

        assert!(db.mood_logs_between(0, 100).unwrap().is_empty());
        assert!(db.bowel_logs_between(0, 100).unwrap().is_empty());
    }

    #[test]
    fn test_menstruation_logs_limit() {
        let db = Database::open_in_memory().unwrap();
        for start in 1..=25 {
            db.insert(&MenstruationLog {
                start_time: start,
                end_time: start + 4,
                cycle_length: 28,
                ..MenstruationLog::default()
            })
            .unwrap();
        }
        let recent = db.menstruation_logs(20).unwrap();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0].start_time, 25);
        assert_eq!(db.menstruation_logs(0).unwrap().len(), 25);
    }
}
