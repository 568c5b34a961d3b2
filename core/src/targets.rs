//! User goals stored in the settings namespace, one key per goal.

use crate::error::Result;
use crate::models::{TargetKey, TargetSet};
use crate::prefs::{PreferenceCache, SETTINGS_NAMESPACE};

/// Partial goal edit; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetUpdate {
    pub step_target: Option<i64>,
    pub calorie_target: Option<i64>,
    pub exercise_time_target: Option<i64>,
    pub activity_count_target: Option<i64>,
    pub distance_target: Option<i64>,
    pub weight_target: Option<i64>,
}

impl TargetUpdate {
    fn entries(&self) -> impl Iterator<Item = (TargetKey, i64)> {
        [
            (TargetKey::Steps, self.step_target),
            (TargetKey::Calories, self.calorie_target),
            (TargetKey::ExerciseTime, self.exercise_time_target),
            (TargetKey::ActivityCount, self.activity_count_target),
            (TargetKey::Distance, self.distance_target),
            (TargetKey::Weight, self.weight_target),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
    }
}

pub struct TargetManager {
    prefs: PreferenceCache,
    targets: TargetSet,
}

impl TargetManager {
    /// Reads every goal, falling back to the defaults for missing keys.
    pub async fn load(prefs: PreferenceCache) -> Result<Self> {
        prefs.open(SETTINGS_NAMESPACE).await?;
        let defaults = TargetSet::default();
        let mut targets = defaults;
        for key in TargetKey::ALL {
            let value = prefs
                .get(SETTINGS_NAMESPACE, key.pref_key(), defaults.get(key))
                .await?;
            targets.set(key, value);
        }
        Ok(Self { prefs, targets })
    }

    #[must_use]
    pub fn targets(&self) -> TargetSet {
        self.targets
    }

    pub async fn update_target(&mut self, key: TargetKey, value: i64) -> Result<()> {
        self.prefs
            .put(SETTINGS_NAMESPACE, key.pref_key(), &value)
            .await?;
        self.targets.set(key, value);
        tracing::info!(key = key.pref_key(), value, "updated target");
        Ok(())
    }

    pub async fn update_targets(&mut self, update: &TargetUpdate) -> Result<()> {
        for (key, value) in update.entries() {
            self.update_target(key, value).await?;
        }
        Ok(())
    }
}
