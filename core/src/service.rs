use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::task::JoinHandle;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::mapper::Record;
use crate::metrics::{MetricsManager, MetricsUpdate, UserMetrics};
use crate::models::{
    AccountIdentity, BodyRecord, BodyType, BowelLog, DailyStepAggregate, MenstruationLog, MoodLog,
    QueryLimit, SleepLog, SnapshotUpdate, SportFilter, SportTotal, SportType, StepRecord,
    TargetKey, TargetSet, WaterLog, METERS_PER_STEP, format_date,
};
use crate::prefs::{PreferenceCache, SETTINGS_NAMESPACE};
use crate::remote::PreferenceRemoteStore;
use crate::schema;
use crate::state::AppStateStore;
use crate::steps::StepCounter;
use crate::sync::{BodyUpload, SportUpload, SyncConfig, SyncService, last_days};
use crate::targets::{TargetManager, TargetUpdate};

pub const DEFAULT_SIGN_IN_REWARD: i64 = 10;
pub const PREFS_DIR: &str = "prefs";

const SESSION_KEY: &str = "session_identity";

/// Entry point for front ends: local store, preferences, goals and app state.
pub struct PacerService {
    db: Arc<Mutex<Database>>,
    prefs: PreferenceCache,
    targets: TargetManager,
    metrics: MetricsManager,
    store: AppStateStore,
}

impl PacerService {
    /// Opens `steps.db` and the `prefs/` directory under `data_dir`.
    pub async fn open(data_dir: &Path, sync_config: SyncConfig, today: NaiveDate) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db = Database::open(&data_dir.join(schema::DB_NAME))?;
        let prefs = PreferenceCache::new(data_dir.join(PREFS_DIR));
        Self::build(db, prefs, sync_config, today).await
    }

    pub async fn open_in_memory(today: NaiveDate) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Self::build(db, PreferenceCache::in_memory(), SyncConfig::default(), today).await
    }

    async fn build(
        db: Database,
        prefs: PreferenceCache,
        sync_config: SyncConfig,
        today: NaiveDate,
    ) -> Result<Self> {
        prefs.open(SETTINGS_NAMESPACE).await?;
        let remote = PreferenceRemoteStore::open(prefs.clone()).await?;
        let sync = SyncService::with_config(Arc::new(remote), sync_config);
        let targets = TargetManager::load(prefs.clone()).await?;
        let metrics = MetricsManager::load(prefs.clone()).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            prefs,
            targets,
            metrics,
            store: AppStateStore::new(sync, today),
        })
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn store(&self) -> &AppStateStore {
        &self.store
    }

    // --- Generic records ---

    pub fn log_record<R: Record>(&self, record: &R) -> Result<i64> {
        self.db().insert(record)
    }

    pub fn get_record<R: Record>(&self, id: i64) -> Result<Option<R>> {
        self.db().get(id)
    }

    /// Overwrites every column of row `id` with `record`. The record's own id
    /// is ignored. Returns false when no such row exists.
    pub fn update_record<R: Record>(&self, record: &R, id: i64) -> Result<bool> {
        Ok(self.db().update(record, id)? > 0)
    }

    pub fn delete_record(&self, table: &str, id: i64) -> Result<bool> {
        Ok(self.db().delete(table, id)? > 0)
    }

    // --- Workouts ---

    /// Stores a workout and, when logged in, pushes a summary to the remote store.
    pub async fn record_workout(&self, record: &StepRecord) -> Result<StepRecord> {
        let id = self.db().insert(record)?;
        let stored = StepRecord {
            id,
            ..record.clone()
        };
        if self.store.is_logged_in() {
            self.store.sync_sport_record(&sport_upload(&stored)).await;
        }
        Ok(stored)
    }

    pub fn workouts(&self, filter: SportFilter, limit: QueryLimit) -> Result<Vec<StepRecord>> {
        self.db().query_steps_by_type(filter, limit)
    }

    pub fn workouts_between(&self, filter: SportFilter, start: i64, end: i64) -> Result<Vec<StepRecord>> {
        self.db().query_steps_by_type_and_range(filter, start, end)
    }

    pub fn sport_totals(&self) -> Result<Vec<SportTotal>> {
        self.db().aggregate_steps_by_type()
    }

    // --- Daily steps ---

    pub fn record_daily_steps(&self, date: NaiveDate, steps: i64, now_ms: i64) -> Result<DailyStepAggregate> {
        self.db().record_daily_steps(&format_date(date), steps, now_ms)
    }

    pub fn daily_steps(&self, date: NaiveDate) -> Result<Option<DailyStepAggregate>> {
        self.db().get_daily_aggregate(&format_date(date))
    }

    /// The seven days ending at `today`, oldest first, with zero rows for missing days.
    pub fn week(&self, today: NaiveDate) -> Result<Vec<DailyStepAggregate>> {
        let dates = last_days(today, 7);
        let rows = self.db().daily_aggregates_for_dates(&dates)?;
        Ok(dates
            .into_iter()
            .map(|date| {
                rows.iter()
                    .find(|r| r.date == date)
                    .cloned()
                    .unwrap_or(DailyStepAggregate {
                        date,
                        ..DailyStepAggregate::default()
                    })
            })
            .collect())
    }

    pub fn month_total(&self, month: &str) -> Result<i64> {
        self.db().steps_for_month(month)
    }

    pub async fn step_counter(&self, today: NaiveDate) -> Result<StepCounter> {
        StepCounter::restore(self.prefs.clone(), today).await
    }

    pub fn flush_counter(&self, counter: &StepCounter, now_ms: i64) -> Result<DailyStepAggregate> {
        counter.flush_to_store(&self.db(), now_ms)
    }

    /// Copies today's stored step count into the app state, refreshing step tasks.
    pub fn refresh_today(&self, today: NaiveDate) -> Result<Option<JoinHandle<bool>>> {
        let steps = self.daily_steps(today)?.map_or(0, |d| d.steps);
        #[allow(clippy::cast_precision_loss)]
        let distance_km = steps as f64 * METERS_PER_STEP / 1000.0;
        Ok(self.store.update_today_snapshot(&SnapshotUpdate {
            steps: Some(steps),
            distance_km: Some(distance_km),
            ..SnapshotUpdate::default()
        }))
    }

    // --- Body records ---

    /// Stores a measurement, using the type's default unit when `unit` is `None`.
    pub async fn log_body(
        &self,
        body_type: BodyType,
        value: &str,
        unit: Option<&str>,
        time: i64,
    ) -> Result<BodyRecord> {
        let mut record = BodyRecord {
            id: 0,
            time,
            body_type: body_type.code(),
            data: value.to_string(),
            unit: unit.unwrap_or(body_type.default_unit()).to_string(),
        };
        record.id = self.db().insert(&record)?;
        if self.store.is_logged_in() {
            if let Some(upload) = body_upload(&record) {
                self.store.sync_body_record(&upload).await;
            }
        }
        Ok(record)
    }

    pub fn body_history(&self, body_type: BodyType, limit: usize) -> Result<Vec<BodyRecord>> {
        self.db().query_body_by_type(body_type, limit)
    }

    pub fn body_between(&self, body_type: BodyType, start: i64, end: i64) -> Result<Vec<BodyRecord>> {
        self.db().query_body_by_type_and_range(body_type, start, end)
    }

    /// Replaces the value (and optionally the unit) of an existing measurement.
    pub fn update_body(&self, id: i64, value: &str, unit: Option<&str>) -> Result<Option<BodyRecord>> {
        let db = self.db();
        let Some(mut record) = db.get::<BodyRecord>(id)? else {
            return Ok(None);
        };
        record.data = value.to_string();
        if let Some(unit) = unit {
            record.unit = unit.to_string();
        }
        db.update(&record, id)?;
        Ok(Some(record))
    }

    // --- Logs ---

    pub fn water_logs(&self, start: i64, end: i64) -> Result<Vec<WaterLog>> {
        self.db().water_logs_between(start, end)
    }

    pub fn bowel_logs(&self, start: i64, end: i64) -> Result<Vec<BowelLog>> {
        self.db().bowel_logs_between(start, end)
    }

    pub fn sleep_logs(&self, start: i64, end: i64) -> Result<Vec<SleepLog>> {
        self.db().sleep_logs_between(start, end)
    }

    pub fn mood_logs(&self, start: i64, end: i64) -> Result<Vec<MoodLog>> {
        self.db().mood_logs_between(start, end)
    }

    pub fn menstruation_logs(&self, limit: usize) -> Result<Vec<MenstruationLog>> {
        self.db().menstruation_logs(limit)
    }

    // --- Targets ---

    #[must_use]
    pub fn targets(&self) -> TargetSet {
        self.targets.targets()
    }

    pub async fn set_target(&mut self, key: TargetKey, value: i64) -> Result<()> {
        self.targets.update_target(key, value).await?;
        if key == TargetKey::Weight {
            self.metrics.refresh().await?;
        }
        Ok(())
    }

    pub async fn set_targets(&mut self, update: &TargetUpdate) -> Result<()> {
        self.targets.update_targets(update).await?;
        if update.weight_target.is_some() {
            self.metrics.refresh().await?;
        }
        Ok(())
    }

    // --- Body metrics ---

    #[must_use]
    pub fn metrics(&self) -> UserMetrics {
        self.metrics.metrics()
    }

    /// For subscribing to metric changes.
    #[must_use]
    pub fn metrics_manager(&self) -> &MetricsManager {
        &self.metrics
    }

    /// The weight target is shared with the goals, which are reloaded when it changes.
    pub async fn update_metrics(&mut self, update: &MetricsUpdate) -> Result<UserMetrics> {
        let metrics = self.metrics.update(update).await?;
        if update.weight_target.is_some() {
            self.targets = TargetManager::load(self.prefs.clone()).await?;
        }
        Ok(metrics)
    }

    // --- Account ---

    /// Logs in and remembers the identity for [`Self::resume_session`].
    pub async fn login(&self, identity: &AccountIdentity, today: NaiveDate) -> Result<()> {
        self.store.login(identity, today).await?;
        self.prefs.put(SETTINGS_NAMESPACE, SESSION_KEY, identity).await
    }

    /// Restores the remembered session, if any.
    pub async fn resume_session(&self, today: NaiveDate) -> Result<bool> {
        let Some(identity) = self
            .prefs
            .get_opt::<AccountIdentity>(SETTINGS_NAMESPACE, SESSION_KEY)
            .await?
        else {
            return Ok(false);
        };
        Ok(self.store.auto_login(&identity, today).await)
    }

    pub async fn logout(&self, today: NaiveDate) -> Result<()> {
        self.prefs.delete(SETTINGS_NAMESPACE, SESSION_KEY).await?;
        self.store.logout(today);
        Ok(())
    }

    pub async fn sign_in(&self, today: NaiveDate, reward: i64) -> Result<()> {
        if !self.store.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        self.store.mark_sign(today, reward).await
    }

    /// Claims a completed task. Returns false when there was nothing to claim.
    pub async fn claim_task(&self, task_id: i64) -> Result<bool> {
        if !self.store.is_logged_in() {
            return Err(Error::NotLoggedIn);
        }
        self.store.claim_task_reward(task_id).await
    }
}

fn millis_to_rfc3339(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

#[allow(clippy::cast_precision_loss)]
fn sport_upload(record: &StepRecord) -> SportUpload {
    SportUpload {
        sport_type: SportType::from_code(record.sport_type)
            .map_or("other", SportType::label)
            .to_string(),
        begin_time: millis_to_rfc3339(record.start_time),
        end_time: millis_to_rfc3339(
            record
                .start_time
                .saturating_add(record.use_time.saturating_mul(1000)),
        ),
        duration_secs: record.use_time,
        steps: record.steps,
        distance_m: record.steps as f64 * METERS_PER_STEP,
        calories: record.calories.trim().parse().unwrap_or(0.0),
    }
}

/// Remote body documents only have fields for some measurement types.
fn body_upload(record: &BodyRecord) -> Option<BodyUpload> {
    let value: f64 = record.data.trim().parse().ok()?;
    let mut upload = BodyUpload {
        record_time: millis_to_rfc3339(record.time),
        ..BodyUpload::default()
    };
    match BodyType::from_code(record.body_type)? {
        BodyType::Height => upload.height = value,
        BodyType::Weight => upload.weight = value,
        BodyType::Chest => upload.bust = value,
        BodyType::Waist => upload.waistline = value,
        BodyType::Hip => upload.hipline = value,
        _ => return None,
    }
    Some(upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn identity() -> AccountIdentity {
        AccountIdentity {
            union_id: "u1".to_string(),
            open_id: "o1".to_string(),
            display_name: "Mia".to_string(),
            avatar_uri: String::new(),
        }
    }

    #[tokio::test]
    async fn test_record_workout_assigns_id() {
        let svc = PacerService::open_in_memory(today()).await.unwrap();
        let stored = svc
            .record_workout(&StepRecord {
                start_time: 1_718_440_000_000,
                use_time: 1200,
                steps: 1800,
                sport_type: SportType::Walk.code(),
                ..StepRecord::default()
            })
            .await
            .unwrap();
        assert!(stored.id > 0);
        let all = svc.workouts(SportFilter::All, QueryLimit::All).unwrap();
        assert_eq!(all, vec![stored]);
        assert_eq!(svc.sport_totals().unwrap()[2].steps, 1800);
    }

    #[tokio::test]
    async fn test_week_fills_missing_days() {
        let svc = PacerService::open_in_memory(today()).await.unwrap();
        svc.record_daily_steps(today(), 6000, 0).unwrap();
        let week = svc.week(today()).unwrap();
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, "2024-06-09");
        assert_eq!(week[0].steps, 0);
        assert_eq!(week[6].steps, 6000);
        assert_eq!(svc.month_total("2024-06").unwrap(), 6000);
    }

    #[tokio::test]
    async fn test_log_body_default_unit_and_update() {
        let svc = PacerService::open_in_memory(today()).await.unwrap();
        let rec = svc.log_body(BodyType::Weight, "71.2", None, 100).await.unwrap();
        assert_eq!(rec.unit, "kg");
        let updated = svc.update_body(rec.id, "70.4", None).unwrap().unwrap();
        assert_eq!(updated.data, "70.4");
        assert_eq!(svc.body_history(BodyType::Weight, 0).unwrap()[0].data, "70.4");
        assert!(svc.update_body(999, "1", None).unwrap().is_none());
        assert!(svc.delete_record("boday_record", rec.id).unwrap());
    }

    #[tokio::test]
    async fn test_update_record_replaces_log_fields() {
        let svc = PacerService::open_in_memory(today()).await.unwrap();
        let id = svc
            .log_record(&MoodLog {
                time: 500,
                score: 2,
                note: "tired".into(),
                ..MoodLog::default()
            })
            .unwrap();

        let edited = MoodLog {
            id: 0,
            time: 500,
            score: 4,
            note: "after nap".into(),
        };
        assert!(svc.update_record(&edited, id).unwrap());
        let stored: MoodLog = svc.get_record(id).unwrap().unwrap();
        assert_eq!(stored, MoodLog { id, ..edited.clone() });

        assert!(!svc.update_record(&edited, id + 1).unwrap());
        assert_eq!(svc.mood_logs(0, 1000).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_targets_roundtrip() {
        let mut svc = PacerService::open_in_memory(today()).await.unwrap();
        assert_eq!(svc.targets().step_target, 5000);
        svc.set_target(TargetKey::Steps, 9000).await.unwrap();
        assert_eq!(svc.targets().step_target, 9000);
    }

    #[tokio::test]
    async fn test_weight_goal_shared_with_metrics() {
        let mut svc = PacerService::open_in_memory(today()).await.unwrap();
        let metrics = svc
            .update_metrics(&MetricsUpdate {
                height: Some(170.0),
                weight: Some(65.0),
                weight_target: Some(60),
                ..MetricsUpdate::default()
            })
            .await
            .unwrap();
        assert!((metrics.bmi().unwrap().value - 22.5).abs() < 1e-9);
        assert_eq!(svc.targets().weight_target, 60);

        svc.set_target(TargetKey::Weight, 58).await.unwrap();
        assert_eq!(svc.metrics().weight_target, Some(58));
    }

    #[tokio::test]
    async fn test_account_flow() {
        let svc = PacerService::open_in_memory(today()).await.unwrap();
        assert!(matches!(
            svc.sign_in(today(), DEFAULT_SIGN_IN_REWARD).await,
            Err(Error::NotLoggedIn)
        ));
        assert!(!svc.resume_session(today()).await.unwrap());

        svc.login(&identity(), today()).await.unwrap();
        svc.sign_in(today(), DEFAULT_SIGN_IN_REWARD).await.unwrap();

        svc.record_daily_steps(today(), 1600, 0).unwrap();
        if let Some(handle) = svc.refresh_today(today()).unwrap() {
            assert!(handle.await.unwrap());
        }
        assert!(svc.claim_task(5).await.unwrap());
        assert!(!svc.claim_task(24).await.unwrap());

        let state = svc.store().state();
        let user = state.user.as_ref().unwrap();
        assert_eq!(user.balance, DEFAULT_SIGN_IN_REWARD + 66);
        let task = state.tasks.iter().find(|t| t.id == 5).unwrap();
        assert_eq!(task.status, TaskStatus::Claimed);

        svc.logout(today()).await.unwrap();
        assert!(!svc.store().is_logged_in());
        assert!(!svc.resume_session(today()).await.unwrap());
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let svc = PacerService::open(dir.path(), SyncConfig::default(), today())
                .await
                .unwrap();
            svc.login(&identity(), today()).await.unwrap();
            svc.sign_in(today(), 10).await.unwrap();
        }
        assert!(dir.path().join("steps.db").exists());

        let svc = PacerService::open(dir.path(), SyncConfig::default(), today())
            .await
            .unwrap();
        assert!(svc.resume_session(today()).await.unwrap());
        assert_eq!(svc.store().state().user.as_ref().unwrap().balance, 10);
        let err = svc.sign_in(today(), 10).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_body_upload_only_for_mapped_types() {
        let weight = BodyRecord {
            body_type: BodyType::Weight.code(),
            data: "70.5".into(),
            ..BodyRecord::default()
        };
        assert!((body_upload(&weight).unwrap().weight - 70.5).abs() < f64::EPSILON);

        let calf = BodyRecord {
            body_type: BodyType::Calf.code(),
            data: "35".into(),
            ..BodyRecord::default()
        };
        assert!(body_upload(&calf).is_none());
    }

    #[test]
    fn test_sport_upload_fields() {
        let upload = sport_upload(&StepRecord {
            start_time: 0,
            use_time: 60,
            steps: 1000,
            sport_type: 2,
            calories: "41.5".into(),
            ..StepRecord::default()
        });
        assert_eq!(upload.sport_type, "outdoor-run");
        assert_eq!(upload.duration_secs, 60);
        assert!((upload.distance_m - 600.0).abs() < 1e-9);
        assert!((upload.calories - 41.5).abs() < 1e-9);
        assert_eq!(upload.end_time, "1970-01-01T00:01:00+00:00");
    }

    #[test]
    fn test_sport_upload_extreme_duration_does_not_overflow() {
        let upload = sport_upload(&StepRecord {
            start_time: i64::MAX - 10,
            use_time: i64::MAX,
            ..StepRecord::default()
        });
        assert_eq!(upload.duration_secs, i64::MAX);
        assert!(upload.end_time.is_empty());
    }
}
