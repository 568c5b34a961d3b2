use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stride length used to turn a step count into a distance.
pub const METERS_PER_STEP: f64 = 0.6;

/// Distance in kilometres for `steps`, formatted with two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn distance_km(steps: i64) -> String {
    format!("{:.2}", steps as f64 * METERS_PER_STEP / 1000.0)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// --- Sport / step records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportType {
    IndoorRun,
    OutdoorRun,
    Walk,
    Hike,
    Climb,
    Cycling,
    Fitness,
    Other,
}

impl SportType {
    /// Sport types reported by the distance aggregate.
    pub const AGGREGATED: [SportType; 5] = [
        SportType::IndoorRun,
        SportType::OutdoorRun,
        SportType::Walk,
        SportType::Hike,
        SportType::Climb,
    ];

    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            SportType::IndoorRun => 1,
            SportType::OutdoorRun => 2,
            SportType::Walk => 3,
            SportType::Hike => 4,
            SportType::Climb => 5,
            SportType::Cycling => 6,
            SportType::Fitness => 7,
            SportType::Other => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(SportType::IndoorRun),
            2 => Some(SportType::OutdoorRun),
            3 => Some(SportType::Walk),
            4 => Some(SportType::Hike),
            5 => Some(SportType::Climb),
            6 => Some(SportType::Cycling),
            7 => Some(SportType::Fitness),
            8 => Some(SportType::Other),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SportType::IndoorRun => "indoor-run",
            SportType::OutdoorRun => "outdoor-run",
            SportType::Walk => "walk",
            SportType::Hike => "hike",
            SportType::Climb => "climb",
            SportType::Cycling => "cycling",
            SportType::Fitness => "fitness",
            SportType::Other => "other",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        [
            SportType::IndoorRun,
            SportType::OutdoorRun,
            SportType::Walk,
            SportType::Hike,
            SportType::Climb,
            SportType::Cycling,
            SportType::Fitness,
            SportType::Other,
        ]
        .into_iter()
        .find(|t| t.label() == s)
    }
}

/// Type filter for step queries. `All` is stored as the sentinel code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SportFilter {
    All,
    Only(SportType),
}

impl SportFilter {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            SportFilter::All => 0,
            SportFilter::Only(t) => t.code(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLimit {
    FirstOnly,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: i64,
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Seconds.
    pub use_time: i64,
    pub steps: i64,
    pub sport_type: i64,
    pub sub_type: i64,
    pub calories: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStepAggregate {
    pub id: i64,
    pub date: String,
    pub steps: i64,
    pub state: i64,
    pub backup: i64,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SportTotal {
    pub sport_type: SportType,
    pub steps: i64,
    pub distance_km: String,
}

// --- Body records ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Body,
    Height,
    Weight,
    Chest,
    Waist,
    Hip,
    UpperArm,
    Thigh,
    Calf,
}

impl BodyType {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            BodyType::Body => 0,
            BodyType::Height => 1,
            BodyType::Weight => 2,
            BodyType::Chest => 3,
            BodyType::Waist => 4,
            BodyType::Hip => 5,
            BodyType::UpperArm => 6,
            BodyType::Thigh => 7,
            BodyType::Calf => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(BodyType::Body),
            1 => Some(BodyType::Height),
            2 => Some(BodyType::Weight),
            3 => Some(BodyType::Chest),
            4 => Some(BodyType::Waist),
            5 => Some(BodyType::Hip),
            6 => Some(BodyType::UpperArm),
            7 => Some(BodyType::Thigh),
            8 => Some(BodyType::Calf),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_unit(self) -> &'static str {
        match self {
            BodyType::Body => "",
            BodyType::Weight => "kg",
            _ => "cm",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "body" => Some(BodyType::Body),
            "height" => Some(BodyType::Height),
            "weight" => Some(BodyType::Weight),
            "chest" | "bust" => Some(BodyType::Chest),
            "waist" => Some(BodyType::Waist),
            "hip" => Some(BodyType::Hip),
            "upper-arm" | "arm" => Some(BodyType::UpperArm),
            "thigh" => Some(BodyType::Thigh),
            "calf" => Some(BodyType::Calf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRecord {
    pub id: i64,
    pub time: i64,
    pub body_type: i64,
    /// Decimal value kept as entered.
    pub data: String,
    pub unit: String,
}

// --- Logs ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterLog {
    pub id: i64,
    pub time: i64,
    pub amount: i64,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowelLog {
    pub id: i64,
    pub time: i64,
    pub status: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenstruationLog {
    pub id: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub cycle_length: i64,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepLog {
    pub id: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub quality: i64,
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodLog {
    pub id: i64,
    pub time: i64,
    pub score: i64,
    pub note: String,
}

// --- Targets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    pub step_target: i64,
    pub calorie_target: i64,
    pub exercise_time_target: i64,
    pub activity_count_target: i64,
    pub distance_target: i64,
    pub weight_target: i64,
}

impl Default for TargetSet {
    fn default() -> Self {
        Self {
            step_target: 5000,
            calorie_target: 300,
            exercise_time_target: 25,
            activity_count_target: 12,
            distance_target: 3000,
            weight_target: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKey {
    Steps,
    Calories,
    ExerciseTime,
    ActivityCount,
    Distance,
    Weight,
}

impl TargetKey {
    pub const ALL: [TargetKey; 6] = [
        TargetKey::Steps,
        TargetKey::Calories,
        TargetKey::ExerciseTime,
        TargetKey::ActivityCount,
        TargetKey::Distance,
        TargetKey::Weight,
    ];

    /// Preference key the value is stored under.
    #[must_use]
    pub fn pref_key(self) -> &'static str {
        match self {
            TargetKey::Steps => "step_target",
            TargetKey::Calories => "calorie_target",
            TargetKey::ExerciseTime => "exercise_time_target",
            TargetKey::ActivityCount => "activity_count_target",
            TargetKey::Distance => "distance_target",
            TargetKey::Weight => "weight_target",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "steps" | "step" | "step_target" => Some(TargetKey::Steps),
            "calories" | "calorie" | "calorie_target" => Some(TargetKey::Calories),
            "exercise-time" | "exercise_time" | "exercise_time_target" => {
                Some(TargetKey::ExerciseTime)
            }
            "activity-count" | "activity_count" | "activity_count_target" => {
                Some(TargetKey::ActivityCount)
            }
            "distance" | "distance_target" => Some(TargetKey::Distance),
            "weight" | "weight_target" => Some(TargetKey::Weight),
            _ => None,
        }
    }
}

impl TargetSet {
    #[must_use]
    pub fn get(&self, key: TargetKey) -> i64 {
        match key {
            TargetKey::Steps => self.step_target,
            TargetKey::Calories => self.calorie_target,
            TargetKey::ExerciseTime => self.exercise_time_target,
            TargetKey::ActivityCount => self.activity_count_target,
            TargetKey::Distance => self.distance_target,
            TargetKey::Weight => self.weight_target,
        }
    }

    pub fn set(&mut self, key: TargetKey, value: i64) {
        match key {
            TargetKey::Steps => self.step_target = value,
            TargetKey::Calories => self.calorie_target = value,
            TargetKey::ExerciseTime => self.exercise_time_target = value,
            TargetKey::ActivityCount => self.activity_count_target = value,
            TargetKey::Distance => self.distance_target = value,
            TargetKey::Weight => self.weight_target = value,
        }
    }
}

// --- Account / rewards ---

/// Identity handed over by the external account provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub union_id: String,
    pub open_id: String,
    pub display_name: String,
    pub avatar_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub nickname: String,
    pub avatar: String,
    pub invite_code: String,
    pub balance: i64,
    pub total_coins: i64,
    pub step_target: i64,
    pub persisted_days: i64,
    pub consecutive_sign_days: i64,
}

/// Partial profile edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub balance: Option<i64>,
    pub total_coins: Option<i64>,
    pub step_target: Option<i64>,
    pub persisted_days: Option<i64>,
    pub consecutive_sign_days: Option<i64>,
}

impl UserProfile {
    #[must_use]
    pub fn with_update(&self, update: &UserUpdate) -> Self {
        Self {
            id: self.id.clone(),
            nickname: update
                .nickname
                .clone()
                .unwrap_or_else(|| self.nickname.clone()),
            avatar: update.avatar.clone().unwrap_or_else(|| self.avatar.clone()),
            invite_code: self.invite_code.clone(),
            balance: update.balance.unwrap_or(self.balance),
            total_coins: update.total_coins.unwrap_or(self.total_coins),
            step_target: update.step_target.unwrap_or(self.step_target),
            persisted_days: update.persisted_days.unwrap_or(self.persisted_days),
            consecutive_sign_days: update
                .consecutive_sign_days
                .unwrap_or(self.consecutive_sign_days),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub date: String,
    pub steps: i64,
    pub calories: f64,
    pub distance_km: f64,
    pub duration_minutes: i64,
}

impl StepSnapshot {
    #[must_use]
    pub fn empty(date: &str) -> Self {
        Self {
            date: date.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_update(&self, update: &SnapshotUpdate) -> Self {
        Self {
            date: update.date.clone().unwrap_or_else(|| self.date.clone()),
            steps: update.steps.unwrap_or(self.steps),
            calories: update.calories.unwrap_or(self.calories),
            distance_km: update.distance_km.unwrap_or(self.distance_km),
            duration_minutes: update.duration_minutes.unwrap_or(self.duration_minutes),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotUpdate {
    pub date: Option<String>,
    pub steps: Option<i64>,
    pub calories: Option<f64>,
    pub distance_km: Option<f64>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRecord {
    pub date: String,
    pub reward: i64,
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Step,
    Invite,
    Ad,
    Daily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Locked,
    Available,
    Completed,
    Claimed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Locked => "locked",
            TaskStatus::Available => "available",
            TaskStatus::Completed => "completed",
            TaskStatus::Claimed => "claimed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReward {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub reward: i64,
    pub progress: i64,
    pub target: i64,
    pub task_type: TaskType,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinHistoryItem {
    pub id: String,
    pub title: String,
    pub amount: i64,
    pub kind: CoinKind,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub user: Option<UserProfile>,
    pub today_snapshot: Option<StepSnapshot>,
    pub weekly_trend: Vec<StepSnapshot>,
    pub sign_records: Vec<SignRecord>,
    pub tasks: Vec<TaskReward>,
    pub coin_history: Vec<CoinHistoryItem>,
}

impl AppState {
    /// Logged-out state with a zeroed snapshot for `today`.
    #[must_use]
    pub fn logged_out(today: NaiveDate) -> Self {
        Self {
            today_snapshot: Some(StepSnapshot::empty(&format_date(today))),
            ..Self::default()
        }
    }
}
