use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{NaiveDate, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    AccountIdentity, AppState, CoinHistoryItem, CoinKind, SignRecord, SnapshotUpdate, UserUpdate,
    format_date,
};
use crate::sync::{BodyUpload, COIN_HISTORY_LIMIT, SIGN_IN_TITLE, SportUpload, SyncService};
use crate::tasks;

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

struct Inner {
    state: Arc<AppState>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    logged_in: bool,
}

/// Single owner of the in-memory [`AppState`].
///
/// Every mutation replaces the whole state and then calls each listener,
/// in subscription order, on the calling thread.
///
/// Mutations that write through the sync service before committing hold
/// `writes` for the whole read, push and commit sequence, so two clones
/// cannot both act on the same snapshot.
#[derive(Clone)]
pub struct AppStateStore {
    inner: Arc<Mutex<Inner>>,
    writes: Arc<tokio::sync::Mutex<()>>,
    sync: SyncService,
}

/// Handle returned by [`AppStateStore::subscribe`].
pub struct Subscription {
    inner: Weak<Mutex<Inner>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl AppStateStore {
    pub fn new(sync: SyncService, today: NaiveDate) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: Arc::new(AppState::logged_out(today)),
                listeners: Vec::new(),
                next_listener_id: 0,
                logged_in: false,
            })),
            writes: Arc::new(tokio::sync::Mutex::new(())),
            sync,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        self.lock().state.clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&AppState) + Send + Sync + 'static) -> Subscription {
        let listener: Listener = Arc::new(listener);
        let (id, state) = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.push((id, listener.clone()));
            (id, inner.state.clone())
        };
        listener(&state);
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Applies `f` to a copy of the state. When `f` returns true the copy
    /// replaces the state and listeners are notified.
    fn mutate(&self, f: impl FnOnce(&mut AppState) -> bool) -> bool {
        let (state, listeners) = {
            let mut inner = self.lock();
            let mut next = AppState::clone(&inner.state);
            if !f(&mut next) {
                return false;
            }
            inner.state = Arc::new(next);
            let listeners: Vec<Listener> = inner.listeners.iter().map(|(_, l)| l.clone()).collect();
            (inner.state.clone(), listeners)
        };
        for listener in listeners {
            listener(&state);
        }
        true
    }

    fn replace(&self, next: AppState, logged_in: bool) {
        self.lock().logged_in = logged_in;
        self.mutate(|state| {
            *state = next;
            true
        });
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        let inner = self.lock();
        inner.logged_in && inner.state.user.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.lock().state.user.as_ref().map(|u| u.id.clone())
    }

    // --- Session ---

    /// Loads the user's data, creating the remote profile on first login.
    pub async fn login(&self, identity: &AccountIdentity, today: NaiveDate) -> Result<()> {
        if self.sync.get_user(&identity.union_id).await?.is_none() {
            tracing::info!(user_id = %identity.union_id, "first login");
            self.sync.on_first_login(identity).await?;
        }
        let state = self.sync.load_user_data(&identity.union_id, today).await?;
        self.replace(state, true);
        tracing::info!(user_id = %identity.union_id, "logged in");
        Ok(())
    }

    /// Restores a known user without creating one. Failures leave the store logged out.
    pub async fn auto_login(&self, identity: &AccountIdentity, today: NaiveDate) -> bool {
        match self.sync.load_user_data(&identity.union_id, today).await {
            Ok(state) => {
                self.replace(state, true);
                true
            }
            Err(e) => {
                tracing::warn!(user_id = %identity.union_id, error = %e, "auto login failed");
                false
            }
        }
    }

    pub fn logout(&self, today: NaiveDate) {
        self.replace(AppState::logged_out(today), false);
        tracing::info!("logged out");
    }

    // --- Mutations ---

    /// Saves the edited profile remotely, then commits it locally.
    pub async fn update_user(&self, update: &UserUpdate) -> Result<()> {
        let _writes = self.writes.lock().await;
        let profile = self
            .state()
            .user
            .as_ref()
            .map(|u| u.with_update(update))
            .ok_or(Error::NotLoggedIn)?;
        self.sync.save_user(&profile).await?;

        self.mutate(|state| {
            if !state.user.as_ref().is_some_and(|u| u.id == profile.id) {
                return false;
            }
            state.user = Some(profile);
            true
        });
        Ok(())
    }

    /// Merges `update` into today's snapshot and refreshes step tasks.
    ///
    /// When a user is logged in the snapshot is pushed in the background;
    /// the returned handle resolves to whether that push succeeded.
    pub fn update_today_snapshot(&self, update: &SnapshotUpdate) -> Option<JoinHandle<bool>> {
        let mut pushed = None;
        let changed = self.mutate(|state| {
            let Some(snapshot) = &state.today_snapshot else {
                return false;
            };
            let next = snapshot.with_update(update);
            state.tasks = tasks::recalculate_step_tasks(&state.tasks, next.steps);
            pushed = Some(next.clone());
            state.today_snapshot = Some(next);
            true
        });
        if !changed {
            return None;
        }

        let (user_id, snapshot) = (self.user_id()?, pushed?);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, skipping step push");
            return None;
        };
        let sync = self.sync.clone();
        Some(handle.spawn(async move { sync.sync_today_steps(&user_id, &snapshot).await }))
    }

    pub fn recalculate_task_statuses(&self, steps: i64) {
        self.mutate(|state| {
            state.tasks = tasks::recalculate_step_tasks(&state.tasks, steps);
            true
        });
    }

    pub fn push_coin_record(&self, record: CoinHistoryItem) {
        self.mutate(|state| {
            prepend_coin(state, record);
            true
        });
    }

    /// Signs in for `date` remotely, then credits the local state.
    pub async fn mark_sign(&self, day: NaiveDate, reward: i64) -> Result<()> {
        let _writes = self.writes.lock().await;
        let user_id = self.user_id().ok_or(Error::NotLoggedIn)?;
        let date = format_date(day);
        if self
            .state()
            .sign_records
            .iter()
            .any(|r| r.date == date && r.completed)
        {
            return Err(Error::AlreadySignedToday { date });
        }
        self.sync.sign_in(&user_id, reward, day).await?;

        self.mutate(|state| {
            let Some(user) = &mut state.user else {
                return false;
            };
            user.consecutive_sign_days += 1;
            user.balance += reward;
            user.total_coins += reward;

            match state.sign_records.iter_mut().find(|r| r.date == date) {
                Some(record) => {
                    record.completed = true;
                    record.reward = reward;
                }
                None => state.sign_records.push(SignRecord {
                    date: date.clone(),
                    reward,
                    completed: true,
                }),
            }
            prepend_coin(state, income(SIGN_IN_TITLE, reward));
            true
        });
        Ok(())
    }

    /// Stores the task's new progress remotely, then commits it locally.
    /// Unknown task ids are ignored.
    pub async fn update_task_progress(&self, task_id: i64, progress: i64) -> Result<()> {
        let _writes = self.writes.lock().await;
        let user_id = self.user_id().ok_or(Error::NotLoggedIn)?;
        let Some(updated) = self
            .state()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| tasks::apply_progress(t, progress))
        else {
            return Ok(());
        };
        self.sync.save_task_progress(&user_id, &updated).await?;

        self.mutate(|state| {
            for task in &mut state.tasks {
                if task.id == task_id {
                    *task = updated.clone();
                }
            }
            true
        });
        Ok(())
    }

    /// Claims a completed task. Returns false, without touching anything,
    /// when no user is logged in or the task is not `Completed`.
    pub async fn claim_task_reward(&self, task_id: i64) -> Result<bool> {
        let _writes = self.writes.lock().await;
        let Some(user_id) = self.user_id() else {
            return Ok(false);
        };
        let Some(claimed) = self
            .state()
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .and_then(tasks::claim)
        else {
            return Ok(false);
        };

        self.sync
            .claim_task_reward(&user_id, task_id, claimed.reward, &claimed.title)
            .await?;

        self.mutate(|state| {
            for task in &mut state.tasks {
                if task.id == task_id {
                    *task = claimed.clone();
                }
            }
            if let Some(user) = &mut state.user {
                user.balance += claimed.reward;
                user.total_coins += claimed.reward;
            }
            prepend_coin(state, income(&claimed.title, claimed.reward));
            true
        });
        Ok(true)
    }

    // --- Passthrough pushes ---

    pub async fn sync_sport_record(&self, upload: &SportUpload) -> bool {
        let Some(user_id) = self.user_id() else {
            tracing::warn!("not logged in, sport record not pushed");
            return false;
        };
        self.sync.sync_sport_record(&user_id, upload).await
    }

    pub async fn sync_body_record(&self, upload: &BodyUpload) -> bool {
        let Some(user_id) = self.user_id() else {
            tracing::warn!("not logged in, body record not pushed");
            return false;
        };
        self.sync.sync_body_record(&user_id, upload).await
    }
}

fn prepend_coin(state: &mut AppState, item: CoinHistoryItem) {
    state.coin_history.insert(0, item);
    state.coin_history.truncate(COIN_HISTORY_LIMIT);
}

/// Local entry shown until the next reload replaces it with the stored one.
fn income(title: &str, amount: i64) -> CoinHistoryItem {
    CoinHistoryItem {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        amount,
        kind: CoinKind::Income,
        created_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::TaskStatus;
    use crate::prefs::PreferenceCache;
    use crate::remote::{CLOUD_NAMESPACE, PreferenceRemoteStore, RemoteStore};

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

    async fn store() -> (AppStateStore, Arc<PreferenceRemoteStore>) {
        let remote = Arc::new(
            PreferenceRemoteStore::open(PreferenceCache::in_memory())
                .await
                .unwrap(),
        );
        let store = AppStateStore::new(SyncService::new(remote.clone()), today());
        (store, remote)
    }

    fn steps(n: i64) -> SnapshotUpdate {
        SnapshotUpdate {
            steps: Some(n),
            ..SnapshotUpdate::default()
        }
    }

    #[tokio::test]
    async fn test_subscribe_fires_immediately() {
        let (store, _) = store().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _sub = store.subscribe(move |state| {
            assert!(state.user.is_none());
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listeners_notified_in_order_until_unsubscribed() {
        let (store, _) = store().await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        let first = store.subscribe(move |_| s.lock().unwrap().push("a"));
        let s = seen.clone();
        let _second = store.subscribe(move |_| s.lock().unwrap().push("b"));
        seen.lock().unwrap().clear();

        store.recalculate_task_statuses(0);
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);

        first.unsubscribe();
        seen.lock().unwrap().clear();
        store.recalculate_task_statuses(0);
        assert_eq!(*seen.lock().unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_listener_can_read_state() {
        let (store, _) = store().await;
        let reader = store.clone();
        let _sub = store.subscribe(move |state| {
            assert_eq!(reader.state().today_snapshot, state.today_snapshot);
        });
        store.update_today_snapshot(&steps(10));
    }

    #[tokio::test]
    async fn test_login_creates_then_loads_user() {
        let (store, remote) = store().await;
        assert!(!store.is_logged_in());
        store.login(&identity(), today()).await.unwrap();
        assert!(store.is_logged_in());
        assert_eq!(store.user_id().as_deref(), Some("u1"));
        assert!(remote.get_user("u1").await.unwrap().is_some());

        let state = store.state();
        assert_eq!(state.tasks.len(), 5);
        assert_eq!(state.weekly_trend.len(), 7);
    }

    #[tokio::test]
    async fn test_auto_login_requires_existing_user() {
        let (store, _) = store().await;
        assert!(!store.auto_login(&identity(), today()).await);
        assert!(!store.is_logged_in());

        store.login(&identity(), today()).await.unwrap();
        store.logout(today());
        assert!(!store.is_logged_in());
        assert!(store.auto_login(&identity(), today()).await);
    }

    #[tokio::test]
    async fn test_logout_resets_state() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();
        store.logout(today());
        let state = store.state();
        assert!(state.user.is_none());
        assert!(state.tasks.is_empty());
        assert_eq!(state.today_snapshot.as_ref().unwrap().steps, 0);
    }

    #[tokio::test]
    async fn test_snapshot_at_task_target_completes_and_notifies_tasks() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = store.subscribe(move |state| {
            if let Some(task) = state.tasks.iter().find(|t| t.id == 5) {
                s.lock().unwrap().push((task.progress, task.status));
            }
        });

        let handle = store.update_today_snapshot(&steps(1500));
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[0].0, 0);
            assert_eq!(seen[1], (1500, TaskStatus::Completed));
        }

        let state = store.state();
        let walk_1500 = state.tasks.iter().find(|t| t.id == 5).unwrap();
        assert_eq!(walk_1500.progress, 1500);
        assert_eq!(walk_1500.status, TaskStatus::Completed);
        let walk_3000 = state.tasks.iter().find(|t| t.id == 23).unwrap();
        assert_eq!(walk_3000.progress, 1500);
        assert_eq!(walk_3000.status, TaskStatus::Available);
        assert!(handle.unwrap().await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_update_recalculates_and_notifies_once() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let handle = store.update_today_snapshot(&steps(2000));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let state = store.state();
        assert_eq!(state.today_snapshot.as_ref().unwrap().steps, 2000);
        let walk_1500 = state.tasks.iter().find(|t| t.id == 5).unwrap();
        assert_eq!(walk_1500.status, TaskStatus::Completed);

        assert!(handle.unwrap().await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_push_reaches_remote() {
        let (store, remote) = store().await;
        store.login(&identity(), today()).await.unwrap();
        let handle = store.update_today_snapshot(&steps(3100)).unwrap();
        assert!(handle.await.unwrap());
        let stored = remote.get_daily_step("u1", "2024-06-15").await.unwrap().unwrap();
        assert_eq!(stored.steps, 3100);
    }

    #[tokio::test]
    async fn test_snapshot_update_logged_out_does_not_push() {
        let (store, _) = store().await;
        assert!(store.update_today_snapshot(&steps(500)).is_none());
        assert_eq!(store.state().today_snapshot.as_ref().unwrap().steps, 500);
    }

    #[tokio::test]
    async fn test_claim_requires_completed_task() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();
        assert!(!store.claim_task_reward(5).await.unwrap());
        assert_eq!(store.state().user.as_ref().unwrap().balance, 0);

        store.update_today_snapshot(&steps(1600));
        assert!(store.claim_task_reward(5).await.unwrap());
        let state = store.state();
        assert_eq!(state.user.as_ref().unwrap().balance, 66);
        assert_eq!(state.coin_history[0].amount, 66);
        let task = state.tasks.iter().find(|t| t.id == 5).unwrap();
        assert_eq!(task.status, TaskStatus::Claimed);

        // second claim is a no-op
        assert!(!store.claim_task_reward(5).await.unwrap());
        assert_eq!(store.state().user.as_ref().unwrap().balance, 66);
    }

    #[tokio::test]
    async fn test_concurrent_claims_credit_once() {
        let (store, remote) = store().await;
        store.login(&identity(), today()).await.unwrap();
        store.update_today_snapshot(&steps(1600));

        let other = store.clone();
        let (a, b) = tokio::join!(store.claim_task_reward(5), other.claim_task_reward(5));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a ^ b);

        let state = store.state();
        assert_eq!(state.user.as_ref().unwrap().balance, 66);
        assert_eq!(state.coin_history.iter().filter(|c| c.amount == 66).count(), 1);

        assert_eq!(remote.get_user("u1").await.unwrap().unwrap().balance, 66);
    }

    #[tokio::test]
    async fn test_concurrent_sign_ins_credit_once() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();

        let other = store.clone();
        let (a, b) = tokio::join!(store.mark_sign(today(), 10), other.mark_sign(today(), 10));
        let failed = match (a, b) {
            (Ok(()), Err(e)) | (Err(e), Ok(())) => e,
            results => panic!("expected exactly one sign-in, got {results:?}"),
        };
        assert!(failed.is_conflict());
        assert_eq!(store.state().user.as_ref().unwrap().balance, 10);
        assert_eq!(store.state().user.as_ref().unwrap().consecutive_sign_days, 1);
    }

    #[tokio::test]
    async fn test_mark_sign_credits_and_rejects_repeat() {
        let (store, _) = store().await;
        assert!(matches!(
            store.mark_sign(today(), 10).await,
            Err(Error::NotLoggedIn)
        ));

        store.login(&identity(), today()).await.unwrap();
        store.mark_sign(today(), 10).await.unwrap();
        let state = store.state();
        let user = state.user.as_ref().unwrap();
        assert_eq!(user.balance, 10);
        assert_eq!(user.total_coins, 10);
        assert_eq!(user.consecutive_sign_days, 1);
        assert!(state.sign_records.iter().any(|r| r.date == "2024-06-15" && r.completed));
        assert_eq!(state.coin_history[0].title, SIGN_IN_TITLE);

        let err = store.mark_sign(today(), 10).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.state().user.as_ref().unwrap().balance, 10);
    }

    #[tokio::test]
    async fn test_update_task_progress_clamps() {
        let (store, _) = store().await;
        store.login(&identity(), today()).await.unwrap();
        store
            .update_task_progress(tasks::SIGN_IN_TASK_ID, 9)
            .await
            .unwrap();
        let state = store.state();
        let task = state
            .tasks
            .iter()
            .find(|t| t.id == tasks::SIGN_IN_TASK_ID)
            .unwrap();
        assert_eq!(task.progress, 7);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_user_requires_login() {
        let (store, _) = store().await;
        let err = store
            .update_user(&UserUpdate {
                nickname: Some("X".into()),
                ..UserUpdate::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotLoggedIn));
        assert!(store.state().user.is_none());
    }

    #[tokio::test]
    async fn test_profile_and_progress_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(
            PreferenceRemoteStore::open(PreferenceCache::new(dir.path()))
                .await
                .unwrap(),
        );
        let store = AppStateStore::new(SyncService::new(remote), today());
        store.login(&identity(), today()).await.unwrap();
        store
            .update_user(&UserUpdate {
                nickname: Some("Runner".into()),
                ..UserUpdate::default()
            })
            .await
            .unwrap();
        store
            .update_task_progress(tasks::SIGN_IN_TASK_ID, 3)
            .await
            .unwrap();
        assert_eq!(store.state().user.as_ref().unwrap().nickname, "Runner");

        let remote = Arc::new(
            PreferenceRemoteStore::open(PreferenceCache::new(dir.path()))
                .await
                .unwrap(),
        );
        let reloaded = AppStateStore::new(SyncService::new(remote), today());
        reloaded.login(&identity(), today()).await.unwrap();
        let state = reloaded.state();
        assert_eq!(state.user.as_ref().unwrap().nickname, "Runner");
        let task = state
            .tasks
            .iter()
            .find(|t| t.id == tasks::SIGN_IN_TASK_ID)
            .unwrap();
        assert_eq!(task.progress, 3);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_state_untouched() {
        let prefs = PreferenceCache::in_memory();
        let remote = Arc::new(PreferenceRemoteStore::open(prefs.clone()).await.unwrap());
        let store = AppStateStore::new(SyncService::new(remote), today());
        store.login(&identity(), today()).await.unwrap();
        assert!(prefs.delete(CLOUD_NAMESPACE, "user_u1").await.unwrap());

        let err = store
            .update_user(&UserUpdate {
                nickname: Some("X".into()),
                ..UserUpdate::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
        assert_eq!(store.state().user.as_ref().unwrap().nickname, "Mia");
    }

    #[tokio::test]
    async fn test_local_coin_history_is_capped() {
        let (store, _) = store().await;
        for i in 0..=COIN_HISTORY_LIMIT {
            store.push_coin_record(income(&format!("entry {i}"), 1));
        }
        let state = store.state();
        assert_eq!(state.coin_history.len(), COIN_HISTORY_LIMIT);
        assert_eq!(state.coin_history[0].title, format!("entry {COIN_HISTORY_LIMIT}"));
    }

    #[tokio::test]
    async fn test_push_coin_record_prepends() {
        let (store, _) = store().await;
        store.push_coin_record(income("first", 1));
        store.push_coin_record(income("second", 2));
        let state = store.state();
        assert_eq!(state.coin_history[0].title, "second");
        assert_eq!(state.coin_history[1].title, "first");
        assert_ne!(state.coin_history[0].id, state.coin_history[1].id);
    }

    #[tokio::test]
    async fn test_passthrough_pushes_need_login() {
        let (store, _) = store().await;
        assert!(!store.sync_sport_record(&SportUpload::default()).await);
        store.login(&identity(), today()).await.unwrap();
        assert!(store.sync_body_record(&BodyUpload::default()).await);
    }
}
