use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};

use crate::error::{Error, Result};
use crate::models::{
    AccountIdentity, AppState, CoinHistoryItem, CoinKind, SignRecord, StepSnapshot, TaskReward,
    TaskStatus, UserProfile, format_date,
};
use crate::remote::{
    CloudBodyRecord, CloudCoinHistory, CloudDailyStep, CloudSignRecord, CloudSportRecord,
    CloudTaskRecord, CloudUser, RemoteStore, generate_id, generate_invite_code,
};
use crate::tasks;

pub const DEFAULT_NICKNAME: &str = "Pacer";
pub const NEW_USER_STEP_TARGET: i64 = 10_000;
pub const NEW_USER_WEIGHT_TARGET: i64 = 65;
pub const SIGN_IN_TITLE: &str = "Daily sign-in";

const TREND_DAYS: u64 = 7;
pub const COIN_HISTORY_LIMIT: usize = 50;

/// Retry policy for background pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Workout summary pushed to the remote store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SportUpload {
    pub sport_type: String,
    pub begin_time: String,
    pub end_time: String,
    pub duration_secs: i64,
    pub steps: i64,
    pub distance_m: f64,
    pub calories: f64,
}

/// Body measurement pushed to the remote store. Unmeasured fields stay 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyUpload {
    pub record_time: String,
    pub height: f64,
    pub weight: f64,
    pub bust: f64,
    pub waistline: f64,
    pub hipline: f64,
    pub systolic_pressure: f64,
    pub diastolic_pressure: f64,
    pub heart_rate: f64,
}

/// Moves user, reward and step data between the app and a [`RemoteStore`].
#[derive(Clone)]
pub struct SyncService {
    remote: Arc<dyn RemoteStore>,
    config: SyncConfig,
}

impl SyncService {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_config(remote, SyncConfig::default())
    }

    pub fn with_config(remote: Arc<dyn RemoteStore>, config: SyncConfig) -> Self {
        Self { remote, config }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self
            .remote
            .get_user(user_id)
            .await?
            .as_ref()
            .map(UserProfile::from))
    }

    /// Creates the remote profile for a first login. Callers check for an
    /// existing profile first; this does not deduplicate.
    pub async fn on_first_login(&self, identity: &AccountIdentity) -> Result<UserProfile> {
        let now = Utc::now();
        let nickname = if identity.display_name.trim().is_empty() {
            DEFAULT_NICKNAME.to_string()
        } else {
            identity.display_name.clone()
        };
        let user = CloudUser {
            user_id: identity.union_id.clone(),
            nickname,
            avatar: identity.avatar_uri.clone(),
            invite_code: generate_invite_code(),
            balance: 0,
            total_coins: 0,
            step_target: NEW_USER_STEP_TARGET,
            weight_target: NEW_USER_WEIGHT_TARGET,
            persisted_days: 1,
            consecutive_sign_days: 0,
            created_at: now,
            updated_at: now,
        };
        self.remote.upsert_user(&user).await?;
        tracing::info!(user_id = %user.user_id, "created user profile");
        Ok(UserProfile::from(&user))
    }

    /// Stores profile edits made locally.
    pub async fn save_user(&self, profile: &UserProfile) -> Result<()> {
        let mut user = self
            .remote
            .get_user(&profile.id)
            .await?
            .ok_or_else(|| Error::UserNotFound(profile.id.clone()))?;
        user.nickname.clone_from(&profile.nickname);
        user.avatar.clone_from(&profile.avatar);
        user.balance = profile.balance;
        user.total_coins = profile.total_coins;
        user.step_target = profile.step_target;
        user.persisted_days = profile.persisted_days;
        user.consecutive_sign_days = profile.consecutive_sign_days;
        user.updated_at = Utc::now();
        self.remote.upsert_user(&user).await
    }

    pub async fn load_user_data(&self, user_id: &str, today: NaiveDate) -> Result<AppState> {
        let user = self
            .remote
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let today_str = format_date(today);
        let today_snapshot = self
            .remote
            .get_daily_step(user_id, &today_str)
            .await?
            .map_or_else(|| StepSnapshot::empty(&today_str), |r| snapshot_from(&r));

        let days = last_days(today, TREND_DAYS);
        let mut daily = HashMap::new();
        let mut sign_records = Vec::new();
        for date in &days {
            if let Some(record) = self.remote.get_daily_step(user_id, date).await? {
                daily.insert(date.clone(), record);
            }
            if let Some(record) = self.remote.get_sign_record(user_id, date).await? {
                sign_records.push(SignRecord::from(&record));
            }
        }
        let weekly_trend = days
            .iter()
            .map(|date| {
                daily
                    .get(date)
                    .map_or_else(|| StepSnapshot::empty(date), snapshot_from)
            })
            .collect();

        let coin_history = self
            .remote
            .coin_history(user_id, COIN_HISTORY_LIMIT)
            .await?
            .iter()
            .map(CoinHistoryItem::from)
            .collect();

        let tasks = self.build_task_list(user_id).await?;

        tracing::debug!(user_id, "loaded user data");
        Ok(AppState {
            user: Some(UserProfile::from(&user)),
            today_snapshot: Some(today_snapshot),
            weekly_trend,
            sign_records,
            tasks,
            coin_history,
        })
    }

    async fn build_task_list(&self, user_id: &str) -> Result<Vec<TaskReward>> {
        let mut tasks = tasks::default_tasks();
        for task in &mut tasks {
            if let Some(record) = self.remote.get_task_record(user_id, task.id).await? {
                task.progress = record.progress;
                task.status = record.status;
            }
        }
        Ok(tasks)
    }

    /// Returns true when the push eventually succeeded. Failures are logged only.
    pub async fn sync_today_steps(&self, user_id: &str, snapshot: &StepSnapshot) -> bool {
        let record = CloudDailyStep {
            record_id: generate_id("daily_"),
            user_id: user_id.to_string(),
            date: snapshot.date.clone(),
            steps: snapshot.steps,
            calories: snapshot.calories,
            distance: (snapshot.distance_km * 1000.0).round(),
            created_at: Utc::now(),
        };
        self.push_with_retry("daily steps", || self.remote.save_daily_step(&record))
            .await
    }

    pub async fn sync_sport_record(&self, user_id: &str, upload: &SportUpload) -> bool {
        let record = CloudSportRecord {
            record_id: generate_id("sport_"),
            user_id: user_id.to_string(),
            sport_type: upload.sport_type.clone(),
            begin_time: upload.begin_time.clone(),
            end_time: upload.end_time.clone(),
            duration: upload.duration_secs,
            steps: upload.steps,
            distance: upload.distance_m,
            calories: upload.calories,
            created_at: Utc::now(),
        };
        self.push_with_retry("sport record", || self.remote.save_sport_record(&record))
            .await
    }

    pub async fn sync_body_record(&self, user_id: &str, upload: &BodyUpload) -> bool {
        let record = CloudBodyRecord {
            record_id: generate_id("body_"),
            user_id: user_id.to_string(),
            record_time: upload.record_time.clone(),
            height: upload.height,
            weight: upload.weight,
            bust: upload.bust,
            waistline: upload.waistline,
            hipline: upload.hipline,
            systolic_pressure: upload.systolic_pressure,
            diastolic_pressure: upload.diastolic_pressure,
            heart_rate: upload.heart_rate,
            created_at: Some(Utc::now()),
        };
        self.push_with_retry("body record", || self.remote.save_body_record(&record))
            .await
    }

    async fn push_with_retry<F, Fut>(&self, what: &str, mut op: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.initial_backoff;
        for attempt in 1..=attempts {
            match op().await {
                Ok(()) => {
                    tracing::debug!(what, attempt, "pushed to remote");
                    return true;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(what, attempt, error = %e, "remote push failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    tracing::warn!(what, attempt, error = %e, "remote push failed, giving up");
                }
            }
        }
        false
    }

    /// Records today's sign-in and credits `reward`.
    ///
    /// The four writes are not atomic; a failure part way leaves the earlier
    /// writes in place and returns the error.
    pub async fn sign_in(&self, user_id: &str, reward: i64, today: NaiveDate) -> Result<UserProfile> {
        let date = format_date(today);
        if let Some(existing) = self.remote.get_sign_record(user_id, &date).await? {
            if existing.completed {
                return Err(Error::AlreadySignedToday { date });
            }
        }

        let now = Utc::now();
        self.remote
            .save_sign_record(&CloudSignRecord {
                sign_id: generate_id("sign_"),
                user_id: user_id.to_string(),
                date: date.clone(),
                reward,
                completed: true,
                created_at: now,
            })
            .await?;

        let mut user = self.remote.update_user_balance(user_id, reward, true).await?;
        user.consecutive_sign_days += 1;
        user.updated_at = now;
        self.remote.upsert_user(&user).await?;

        self.add_income(user_id, SIGN_IN_TITLE, reward).await?;
        tracing::info!(user_id, date = %date, reward, "signed in");
        Ok(UserProfile::from(&user))
    }

    /// Credits a task reward and stores the task as claimed. The task's
    /// status is not checked here.
    pub async fn claim_task_reward(
        &self,
        user_id: &str,
        task_id: i64,
        reward: i64,
        title: &str,
    ) -> Result<UserProfile> {
        let user = self.remote.update_user_balance(user_id, reward, true).await?;
        self.add_income(user_id, title, reward).await?;

        let now = Utc::now();
        let progress = self
            .remote
            .get_task_record(user_id, task_id)
            .await?
            .map_or(0, |r| r.progress);
        self.remote
            .save_task_record(&CloudTaskRecord {
                task_record_id: generate_id("task_"),
                user_id: user_id.to_string(),
                task_id,
                progress,
                status: TaskStatus::Claimed,
                claimed_at: Some(now),
                created_at: now,
            })
            .await?;
        tracing::info!(user_id, task_id, reward, "claimed task reward");
        Ok(UserProfile::from(&user))
    }

    pub async fn save_task_progress(&self, user_id: &str, task: &TaskReward) -> Result<()> {
        self.remote
            .save_task_record(&CloudTaskRecord {
                task_record_id: generate_id("task_"),
                user_id: user_id.to_string(),
                task_id: task.id,
                progress: task.progress,
                status: task.status,
                claimed_at: None,
                created_at: Utc::now(),
            })
            .await
    }

    async fn add_income(&self, user_id: &str, title: &str, amount: i64) -> Result<()> {
        self.remote
            .add_coin_history(&CloudCoinHistory {
                coin_id: generate_id("coin_"),
                user_id: user_id.to_string(),
                title: title.to_string(),
                amount,
                kind: CoinKind::Income,
                created_at: Utc::now(),
            })
            .await
    }
}

fn snapshot_from(record: &CloudDailyStep) -> StepSnapshot {
    StepSnapshot {
        date: record.date.clone(),
        steps: record.steps,
        calories: record.calories,
        distance_km: record.distance / 1000.0,
        duration_minutes: 0,
    }
}

/// The `days` dates ending at `today`, oldest first.
#[must_use]
pub fn last_days(today: NaiveDate, days: u64) -> Vec<String> {
    (0..days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(format_date)
        .collect()
}
