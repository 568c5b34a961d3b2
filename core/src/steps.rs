//! Turns cumulative pedometer readings into today's step count.
//!
//! The sensor reports a running total since boot. The counter keeps the
//! previous reading as a baseline and adds the difference; a reading below
//! the baseline means the sensor was reset and becomes the new baseline.

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::{DailyStepAggregate, format_date};
use crate::prefs::{PreferenceCache, SETTINGS_NAMESPACE};

const KEY_COUNTER_DATE: &str = "is_today_first_time";
const KEY_LAST_READING: &str = "lastCallbackSteps";
const KEY_TODAY_STEPS: &str = "TODAY_TODAY_STEP_NUM";

pub struct StepCounter {
    prefs: PreferenceCache,
    date: String,
    today_steps: i64,
    /// -1 until the first reading is seen.
    last_reading: i64,
    needs_baseline: bool,
}

impl StepCounter {
    /// Resumes today's count, or starts a new day at zero.
    pub async fn restore(prefs: PreferenceCache, today: NaiveDate) -> Result<Self> {
        prefs.open(SETTINGS_NAMESPACE).await?;
        let date = format_date(today);
        let stored_date: String = prefs
            .get(SETTINGS_NAMESPACE, KEY_COUNTER_DATE, String::new())
            .await?;
        let last_reading: i64 = prefs.get(SETTINGS_NAMESPACE, KEY_LAST_READING, -1).await?;

        let (today_steps, needs_baseline) = if stored_date == date {
            let steps = prefs.get(SETTINGS_NAMESPACE, KEY_TODAY_STEPS, 0i64).await?;
            (steps, false)
        } else {
            prefs.put(SETTINGS_NAMESPACE, KEY_TODAY_STEPS, &0i64).await?;
            tracing::info!(date = %date, "starting a new step day");
            (0, true)
        };

        Ok(Self {
            prefs,
            date,
            today_steps,
            last_reading,
            needs_baseline,
        })
    }

    #[must_use]
    pub fn today_steps(&self) -> i64 {
        self.today_steps
    }

    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Folds a cumulative sensor reading into today's count and persists the counters.
    pub async fn on_reading(&mut self, reading: i64, today: NaiveDate) -> Result<i64> {
        let date = format_date(today);
        if date != self.date {
            self.date = date;
            self.today_steps = 0;
            self.needs_baseline = true;
        }

        if self.needs_baseline {
            self.needs_baseline = false;
            self.last_reading = reading;
            self.prefs
                .put(SETTINGS_NAMESPACE, KEY_COUNTER_DATE, &self.date)
                .await?;
        }
        if self.last_reading < 0 || reading < self.last_reading {
            self.last_reading = reading;
        }

        self.today_steps += reading - self.last_reading;
        self.last_reading = reading;

        self.prefs
            .put(SETTINGS_NAMESPACE, KEY_TODAY_STEPS, &self.today_steps)
            .await?;
        self.prefs
            .put(SETTINGS_NAMESPACE, KEY_LAST_READING, &self.last_reading)
            .await?;
        tracing::debug!(reading, today = self.today_steps, "step reading");
        Ok(self.today_steps)
    }

    /// Writes today's count to the per-day aggregate table.
    pub fn flush_to_store(&self, db: &Database, now_ms: i64) -> Result<DailyStepAggregate> {
        db.record_daily_steps(&self.date, self.today_steps, now_ms)
    }
}
