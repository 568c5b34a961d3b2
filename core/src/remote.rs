//! Remote user/reward store.
//!
//! [`RemoteStore`] is the seam to a cloud backend. [`PreferenceRemoteStore`]
//! keeps the same documents in the local `cloud_db` preference namespace so
//! the app works without a backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CoinHistoryItem, CoinKind, SignRecord, TaskStatus, UserProfile};
use crate::prefs::PreferenceCache;

pub const CLOUD_NAMESPACE: &str = "cloud_db";

const SPORT_LIST_CAP: usize = 100;
const BODY_LIST_CAP: usize = 100;
const COIN_LIST_CAP: usize = 100;
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudUser {
    pub user_id: String,
    pub nickname: String,
    pub avatar: String,
    pub invite_code: String,
    pub balance: i64,
    pub total_coins: i64,
    pub step_target: i64,
    pub weight_target: i64,
    pub persisted_days: i64,
    pub consecutive_sign_days: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CloudUser> for UserProfile {
    fn from(user: &CloudUser) -> Self {
        Self {
            id: user.user_id.clone(),
            nickname: user.nickname.clone(),
            avatar: user.avatar.clone(),
            invite_code: user.invite_code.clone(),
            balance: user.balance,
            total_coins: user.total_coins,
            step_target: user.step_target,
            persisted_days: user.persisted_days,
            consecutive_sign_days: user.consecutive_sign_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDailyStep {
    pub record_id: String,
    pub user_id: String,
    pub date: String,
    pub steps: i64,
    pub calories: f64,
    /// Metres.
    pub distance: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSportRecord {
    pub record_id: String,
    pub user_id: String,
    pub sport_type: String,
    pub begin_time: String,
    pub end_time: String,
    /// Seconds.
    pub duration: i64,
    pub steps: i64,
    pub distance: f64,
    pub calories: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudBodyRecord {
    pub record_id: String,
    pub user_id: String,
    pub record_time: String,
    pub height: f64,
    pub weight: f64,
    pub bust: f64,
    pub waistline: f64,
    pub hipline: f64,
    pub systolic_pressure: f64,
    pub diastolic_pressure: f64,
    pub heart_rate: f64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSignRecord {
    pub sign_id: String,
    pub user_id: String,
    pub date: String,
    pub reward: i64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&CloudSignRecord> for SignRecord {
    fn from(record: &CloudSignRecord) -> Self {
        Self {
            date: record.date.clone(),
            reward: record.reward,
            completed: record.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCoinHistory {
    pub coin_id: String,
    pub user_id: String,
    pub title: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: CoinKind,
    pub created_at: DateTime<Utc>,
}

impl From<&CloudCoinHistory> for CoinHistoryItem {
    fn from(history: &CloudCoinHistory) -> Self {
        Self {
            id: history.coin_id.clone(),
            title: history.title.clone(),
            amount: history.amount,
            kind: history.kind,
            created_at: history.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudTaskRecord {
    pub task_record_id: String,
    pub user_id: String,
    pub task_id: i64,
    pub progress: i64,
    pub status: TaskStatus,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// `prefix` followed by the current epoch milliseconds and a random suffix.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..10_000);
    format!("{prefix}{}{suffix}", Utc::now().timestamp_millis())
}

/// `WB` followed by six characters from an alphabet without look-alikes.
#[must_use]
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::from("WB");
    for _ in 0..6 {
        let i = rng.random_range(0..INVITE_ALPHABET.len());
        code.push(char::from(INVITE_ALPHABET[i]));
    }
    code
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upsert_user(&self, user: &CloudUser) -> Result<()>;
    async fn get_user(&self, user_id: &str) -> Result<Option<CloudUser>>;

    async fn save_daily_step(&self, record: &CloudDailyStep) -> Result<()>;
    async fn get_daily_step(&self, user_id: &str, date: &str) -> Result<Option<CloudDailyStep>>;

    async fn save_sport_record(&self, record: &CloudSportRecord) -> Result<()>;
    async fn sport_records(&self, user_id: &str, limit: usize) -> Result<Vec<CloudSportRecord>>;

    async fn save_body_record(&self, record: &CloudBodyRecord) -> Result<()>;
    async fn body_records(&self, user_id: &str, limit: usize) -> Result<Vec<CloudBodyRecord>>;

    async fn save_task_record(&self, record: &CloudTaskRecord) -> Result<()>;
    async fn get_task_record(&self, user_id: &str, task_id: i64) -> Result<Option<CloudTaskRecord>>;

    async fn add_coin_history(&self, history: &CloudCoinHistory) -> Result<()>;
    async fn coin_history(&self, user_id: &str, limit: usize) -> Result<Vec<CloudCoinHistory>>;

    async fn save_sign_record(&self, record: &CloudSignRecord) -> Result<()>;
    async fn get_sign_record(&self, user_id: &str, date: &str) -> Result<Option<CloudSignRecord>>;

    /// Adds `amount` to the balance (and lifetime total) or subtracts it from
    /// the balance only.
    async fn update_user_balance(&self, user_id: &str, amount: i64, add: bool) -> Result<CloudUser> {
        let mut user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        if add {
            user.balance += amount;
            user.total_coins += amount;
        } else {
            user.balance -= amount;
        }
        user.updated_at = Utc::now();
        self.upsert_user(&user).await?;
        Ok(user)
    }
}

/// [`RemoteStore`] backed by the `cloud_db` preference namespace.
#[derive(Clone)]
pub struct PreferenceRemoteStore {
    prefs: PreferenceCache,
}

impl PreferenceRemoteStore {
    pub async fn open(prefs: PreferenceCache) -> Result<Self> {
        prefs.open(CLOUD_NAMESPACE).await?;
        Ok(Self { prefs })
    }

    async fn get_doc<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.prefs.get_opt(CLOUD_NAMESPACE, key).await
    }

    async fn put_doc<T: Serialize + Sync>(&self, key: &str, doc: &T) -> Result<()> {
        self.prefs.put(CLOUD_NAMESPACE, key, doc).await
    }

    async fn list_docs<T: serde::de::DeserializeOwned>(
        &self,
        list_key: &str,
        doc_prefix: &str,
        limit: usize,
    ) -> Result<Vec<T>> {
        let ids: Vec<String> = self.prefs.get(CLOUD_NAMESPACE, list_key, Vec::new()).await?;
        let mut docs = Vec::new();
        for id in ids.iter().take(limit) {
            if let Some(doc) = self.get_doc(&format!("{doc_prefix}{id}")).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Prepends `id` to a capped id list and deletes the documents of the
    /// ids that fell off its tail.
    async fn push_capped(&self, list_key: &str, doc_prefix: &str, id: &str, cap: usize) -> Result<()> {
        let dropped = self
            .prefs
            .prepend_capped(CLOUD_NAMESPACE, list_key, id, Some(cap))
            .await?;
        for old in dropped {
            self.prefs
                .delete(CLOUD_NAMESPACE, &format!("{doc_prefix}{old}"))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for PreferenceRemoteStore {
    async fn upsert_user(&self, user: &CloudUser) -> Result<()> {
        self.put_doc(&format!("user_{}", user.user_id), user).await?;
        tracing::debug!(user_id = %user.user_id, "stored user");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<CloudUser>> {
        self.get_doc(&format!("user_{user_id}")).await
    }

    async fn save_daily_step(&self, record: &CloudDailyStep) -> Result<()> {
        self.put_doc(&format!("daily_step_{}_{}", record.user_id, record.date), record)
            .await
    }

    async fn get_daily_step(&self, user_id: &str, date: &str) -> Result<Option<CloudDailyStep>> {
        self.get_doc(&format!("daily_step_{user_id}_{date}")).await
    }

    async fn save_sport_record(&self, record: &CloudSportRecord) -> Result<()> {
        self.put_doc(&format!("sport_{}", record.record_id), record).await?;
        self.push_capped(
            &format!("sport_list_{}", record.user_id),
            "sport_",
            &record.record_id,
            SPORT_LIST_CAP,
        )
        .await
    }

    async fn sport_records(&self, user_id: &str, limit: usize) -> Result<Vec<CloudSportRecord>> {
        self.list_docs(&format!("sport_list_{user_id}"), "sport_", limit)
            .await
    }

    async fn save_body_record(&self, record: &CloudBodyRecord) -> Result<()> {
        self.put_doc(&format!("body_{}", record.record_id), record).await?;
        self.push_capped(
            &format!("body_list_{}", record.user_id),
            "body_",
            &record.record_id,
            BODY_LIST_CAP,
        )
        .await
    }

    async fn body_records(&self, user_id: &str, limit: usize) -> Result<Vec<CloudBodyRecord>> {
        self.list_docs(&format!("body_list_{user_id}"), "body_", limit)
            .await
    }

    async fn save_task_record(&self, record: &CloudTaskRecord) -> Result<()> {
        self.put_doc(&format!("task_{}_{}", record.user_id, record.task_id), record)
            .await
    }

    async fn get_task_record(&self, user_id: &str, task_id: i64) -> Result<Option<CloudTaskRecord>> {
        self.get_doc(&format!("task_{user_id}_{task_id}")).await
    }

    async fn add_coin_history(&self, history: &CloudCoinHistory) -> Result<()> {
        self.put_doc(&format!("coin_{}", history.coin_id), history).await?;
        self.push_capped(
            &format!("coin_list_{}", history.user_id),
            "coin_",
            &history.coin_id,
            COIN_LIST_CAP,
        )
        .await
    }

    async fn coin_history(&self, user_id: &str, limit: usize) -> Result<Vec<CloudCoinHistory>> {
        self.list_docs(&format!("coin_list_{user_id}"), "coin_", limit)
            .await
    }

    async fn save_sign_record(&self, record: &CloudSignRecord) -> Result<()> {
        self.put_doc(&format!("sign_{}_{}", record.user_id, record.date), record)
            .await
    }

    async fn get_sign_record(&self, user_id: &str, date: &str) -> Result<Option<CloudSignRecord>> {
        self.get_doc(&format!("sign_{user_id}_{date}")).await
    }
}
