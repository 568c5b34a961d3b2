//! Body metrics kept in the settings namespace: height, weight, age, gender
//! and the weight goal, with change listeners and the derived BMI and BMR.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::TargetKey;
use crate::prefs::{PreferenceCache, SETTINGS_NAMESPACE};

const HEIGHT_KEY: &str = "height";
const WEIGHT_KEY: &str = "weight";
const AGE_KEY: &str = "age";
const GENDER_KEY: &str = "gender";
const WEIGHT_TARGET_UPDATED_KEY: &str = "weight_target_update_time";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Height in cm, weight in kg, age in years. Zero means not entered yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetrics {
    pub height: f64,
    pub weight: f64,
    pub age: i64,
    pub gender: Gender,
    /// Whole kilograms, shared with the weight goal.
    pub weight_target: Option<i64>,
}

/// Partial metrics edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsUpdate {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub weight_target: Option<i64>,
}

impl MetricsUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.height.is_none()
            && self.weight.is_none()
            && self.age.is_none()
            && self.gender.is_none()
            && self.weight_target.is_none()
    }
}

impl UserMetrics {
    #[must_use]
    pub fn with_update(&self, update: &MetricsUpdate) -> Self {
        Self {
            height: update.height.unwrap_or(self.height),
            weight: update.weight.unwrap_or(self.weight),
            age: update.age.unwrap_or(self.age),
            gender: update.gender.unwrap_or(self.gender),
            weight_target: update.weight_target.or(self.weight_target),
        }
    }

    #[must_use]
    pub fn bmi(&self) -> Option<Bmi> {
        bmi(self.height, self.weight)
    }

    #[must_use]
    pub fn bmr(&self) -> Option<i64> {
        bmr(self.height, self.weight, self.age, self.gender)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiStatus {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BmiStatus::Underweight => "underweight",
            BmiStatus::Normal => "normal",
            BmiStatus::Overweight => "overweight",
            BmiStatus::Obese => "obese",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bmi {
    /// Rounded to one decimal.
    pub value: f64,
    pub status: BmiStatus,
}

/// Body mass index with the 18.5 / 24 / 28 bands. `None` unless both
/// inputs are positive.
#[must_use]
pub fn bmi(height_cm: f64, weight_kg: f64) -> Option<Bmi> {
    if height_cm <= 0.0 || weight_kg <= 0.0 {
        return None;
    }
    let meters = height_cm / 100.0;
    let value = (weight_kg / (meters * meters) * 10.0).round() / 10.0;
    let status = if value < 18.5 {
        BmiStatus::Underweight
    } else if value < 24.0 {
        BmiStatus::Normal
    } else if value < 28.0 {
        BmiStatus::Overweight
    } else {
        BmiStatus::Obese
    };
    Some(Bmi { value, status })
}

/// Basal metabolic rate in kcal/day (Mifflin-St Jeor), rounded.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bmr(height_cm: f64, weight_kg: f64, age: i64, gender: Gender) -> Option<i64> {
    if height_cm <= 0.0 || weight_kg <= 0.0 || age <= 0 {
        return None;
    }
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age as f64;
    let adjusted = match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    };
    Some(adjusted.round() as i64)
}

type Listener = Arc<dyn Fn(&UserMetrics) + Send + Sync>;

struct Inner {
    metrics: UserMetrics,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

/// Cached metrics over the settings namespace. Clones share the cache and
/// the listeners.
#[derive(Clone)]
pub struct MetricsManager {
    prefs: PreferenceCache,
    inner: Arc<Mutex<Inner>>,
}

impl MetricsManager {
    pub async fn load(prefs: PreferenceCache) -> Result<Self> {
        prefs.open(SETTINGS_NAMESPACE).await?;
        let metrics = read(&prefs).await?;
        Ok(Self {
            prefs,
            inner: Arc::new(Mutex::new(Inner {
                metrics,
                listeners: Vec::new(),
                next_listener_id: 0,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn metrics(&self) -> UserMetrics {
        self.lock().metrics.clone()
    }

    /// Registers `listener` and calls it once with the current metrics.
    /// Returns an id for [`MetricsManager::unsubscribe`].
    pub fn subscribe(&self, listener: impl Fn(&UserMetrics) + Send + Sync + 'static) -> u64 {
        let listener: Listener = Arc::new(listener);
        let (id, metrics) = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, listener.clone()));
            (id, inner.metrics.clone())
        };
        listener(&metrics);
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.lock().listeners.retain(|(l, _)| *l != id);
    }

    /// Writes the given fields, then notifies listeners with the merged metrics.
    pub async fn update(&self, update: &MetricsUpdate) -> Result<UserMetrics> {
        if let Some(height) = update.height {
            self.prefs.put(SETTINGS_NAMESPACE, HEIGHT_KEY, &height).await?;
        }
        if let Some(weight) = update.weight {
            self.prefs.put(SETTINGS_NAMESPACE, WEIGHT_KEY, &weight).await?;
        }
        if let Some(age) = update.age {
            self.prefs.put(SETTINGS_NAMESPACE, AGE_KEY, &age).await?;
        }
        if let Some(gender) = update.gender {
            self.prefs
                .put(SETTINGS_NAMESPACE, GENDER_KEY, gender.as_str())
                .await?;
        }
        if let Some(target) = update.weight_target {
            self.prefs
                .put(SETTINGS_NAMESPACE, TargetKey::Weight.pref_key(), &target)
                .await?;
            self.prefs
                .put(
                    SETTINGS_NAMESPACE,
                    WEIGHT_TARGET_UPDATED_KEY,
                    &Utc::now().timestamp_millis(),
                )
                .await?;
        }

        let stored = read(&self.prefs).await?;
        let merged = stored.with_update(update);
        tracing::info!(?update, "updated body metrics");
        self.emit(merged.clone());
        Ok(merged)
    }

    /// Re-reads the stored metrics and notifies listeners.
    pub async fn refresh(&self) -> Result<UserMetrics> {
        let metrics = read(&self.prefs).await?;
        self.emit(metrics.clone());
        Ok(metrics)
    }

    fn emit(&self, metrics: UserMetrics) {
        let listeners: Vec<Listener> = {
            let mut inner = self.lock();
            inner.metrics = metrics.clone();
            inner.listeners.iter().map(|(_, l)| l.clone()).collect()
        };
        for listener in listeners {
            listener(&metrics);
        }
    }
}

async fn read(prefs: &PreferenceCache) -> Result<UserMetrics> {
    let gender: String = prefs
        .get(SETTINGS_NAMESPACE, GENDER_KEY, Gender::Male.as_str().to_string())
        .await?;
    let weight_target: i64 = prefs
        .get(SETTINGS_NAMESPACE, TargetKey::Weight.pref_key(), 0)
        .await?;
    Ok(UserMetrics {
        height: prefs.get(SETTINGS_NAMESPACE, HEIGHT_KEY, 0.0).await?,
        weight: prefs.get(SETTINGS_NAMESPACE, WEIGHT_KEY, 0.0).await?,
        age: prefs.get(SETTINGS_NAMESPACE, AGE_KEY, 0).await?,
        gender: Gender::parse(&gender).unwrap_or_default(),
        weight_target: (weight_target > 0).then_some(weight_target),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_bmi_bands() {
        let cases = [
            (170.0, 50.0, Some((17.3, BmiStatus::Underweight))),
            (170.0, 53.5, Some((18.5, BmiStatus::Normal))),
            (170.0, 65.0, Some((22.5, BmiStatus::Normal))),
            (170.0, 69.4, Some((24.0, BmiStatus::Overweight))),
            (170.0, 80.0, Some((27.7, BmiStatus::Overweight))),
            (170.0, 81.0, Some((28.0, BmiStatus::Obese))),
            (0.0, 70.0, None),
            (170.0, -1.0, None),
        ];
        for (height, weight, expected) in cases {
            let got = bmi(height, weight).map(|b| (b.value, b.status));
            assert_eq!(got, expected, "height {height} weight {weight}");
        }
    }

    #[test]
    fn test_bmr_mifflin_st_jeor() {
        let cases = [
            (180.0, 80.0, 30, Gender::Male, Some(1780)),
            (165.0, 60.0, 25, Gender::Female, Some(1345)),
            (170.0, 65.0, 40, Gender::Male, Some(1518)),
            (170.0, 65.0, 0, Gender::Female, None),
            (0.0, 65.0, 30, Gender::Male, None),
        ];
        for (height, weight, age, gender, expected) in cases {
            assert_eq!(
                bmr(height, weight, age, gender),
                expected,
                "{height}cm {weight}kg {age}y {gender:?}"
            );
        }
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("m"), Some(Gender::Male));
        assert_eq!(Gender::parse("other"), None);
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let manager = MetricsManager::load(PreferenceCache::in_memory()).await.unwrap();
        let metrics = manager.metrics();
        assert_eq!(metrics, UserMetrics::default());
        assert!(metrics.bmi().is_none());
        assert!(metrics.bmr().is_none());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let prefs = PreferenceCache::in_memory();
        let manager = MetricsManager::load(prefs.clone()).await.unwrap();
        manager
            .update(&MetricsUpdate {
                height: Some(172.0),
                weight: Some(68.5),
                age: Some(31),
                ..MetricsUpdate::default()
            })
            .await
            .unwrap();
        let merged = manager
            .update(&MetricsUpdate {
                weight: Some(67.0),
                gender: Some(Gender::Female),
                weight_target: Some(62),
                ..MetricsUpdate::default()
            })
            .await
            .unwrap();
        assert!((merged.height - 172.0).abs() < f64::EPSILON);
        assert!((merged.weight - 67.0).abs() < f64::EPSILON);
        assert_eq!(merged.age, 31);
        assert_eq!(merged.gender, Gender::Female);
        assert_eq!(merged.weight_target, Some(62));

        let stamp: i64 = prefs
            .get(SETTINGS_NAMESPACE, WEIGHT_TARGET_UPDATED_KEY, 0)
            .await
            .unwrap();
        assert!(stamp > 0);

        let reloaded = MetricsManager::load(prefs).await.unwrap();
        assert_eq!(reloaded.metrics(), merged);
    }

    #[tokio::test]
    async fn test_subscribe_fires_immediately_and_on_update() {
        let manager = MetricsManager::load(PreferenceCache::in_memory()).await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let id = manager.subscribe(move |m| s.lock().unwrap().push(m.weight));
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);

        manager
            .update(&MetricsUpdate {
                weight: Some(70.0),
                ..MetricsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 70.0]);

        manager.unsubscribe(id);
        manager.refresh().await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_listeners() {
        let manager = MetricsManager::load(PreferenceCache::in_memory()).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        manager.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        manager
            .clone()
            .update(&MetricsUpdate {
                age: Some(20),
                ..MetricsUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(manager.metrics().age, 20);
    }
}
