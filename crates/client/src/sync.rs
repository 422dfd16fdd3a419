//! Periodic refresh-and-diff of collection resources.
//!
//! A [`SyncLoop`] polls one resource (the group list, the unread
//! notifications) and only records whether the *set of ids* changed since
//! the last observation. Surfacing a "new items" hint and pulling the full
//! payload is left to the caller.
//!
//! The cache is published through a `watch` channel that is only touched
//! when its content changes, so identical polls never wake subscribers.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger::Group;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use crate::{DomainError, Repository};

/// Per-resource state kept between ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncCache {
    pub last_seen_ids: BTreeSet<i64>,
    pub has_pending_change: bool,
    /// Failed ticks since the loop started.
    pub failures: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Flag state reported by a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeSignal {
    /// The id set changed and the change was not consumed yet.
    Pending,
    Idle,
    /// Another tick of the same loop is still running; nothing was fetched.
    Busy,
}

impl ChangeSignal {
    pub fn is_pending(self) -> bool {
        self == ChangeSignal::Pending
    }
}

/// A collection the sync loop can poll.
#[async_trait]
pub trait SyncResource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_ids(&self) -> Result<BTreeSet<i64>, DomainError>;
}

pub struct SyncLoop<R> {
    resource: R,
    cache: watch::Sender<SyncCache>,
    in_flight: AtomicBool,
    ticks: AtomicU64,
    cancel: CancellationToken,
}

/// Clears the in-flight flag when the tick ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: SyncResource> SyncLoop<R> {
    /// `cancel` is the owner's token: once cancelled, results are discarded.
    pub fn new(resource: R, cancel: CancellationToken) -> Self {
        let (cache, _) = watch::channel(SyncCache::default());
        Self {
            resource,
            cache,
            in_flight: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            cancel,
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncCache> {
        self.cache.subscribe()
    }

    pub fn snapshot(&self) -> SyncCache {
        self.cache.borrow().clone()
    }

    /// Completed ticks, failed ones included.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn signal(&self) -> ChangeSignal {
        if self.cache.borrow().has_pending_change {
            ChangeSignal::Pending
        } else {
            ChangeSignal::Idle
        }
    }

    /// Resets the pending flag, returning whether it was set.
    pub fn consume(&self) -> bool {
        let mut was_pending = false;
        self.cache.send_if_modified(|cache| {
            was_pending = cache.has_pending_change;
            cache.has_pending_change = false;
            was_pending
        });
        was_pending
    }

    /// Like [`SyncLoop::consume`], but only once the caller pulled every id
    /// the loop has seen.
    ///
    /// A tick that lands while the caller is pulling may record ids the
    /// pull missed; the change then stays pending for the next pull.
    pub fn consume_seen(&self, pulled: &BTreeSet<i64>) -> bool {
        let mut consumed = false;
        self.cache.send_if_modified(|cache| {
            consumed = cache.has_pending_change && cache.last_seen_ids.is_subset(pulled);
            if consumed {
                cache.has_pending_change = false;
            }
            consumed
        });
        consumed
    }

    /// One fetch-and-compare cycle.
    ///
    /// Failures are recorded in the cache and logged, never returned.
    pub async fn tick(&self) -> ChangeSignal {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("{} sync tick skipped: previous tick in flight", self.resource.name());
            return ChangeSignal::Busy;
        };
        if !self.is_active() {
            return self.signal();
        }

        let fetched = self.resource.fetch_ids().await;
        self.ticks.fetch_add(1, Ordering::Relaxed);

        // The owner may have gone away while the fetch was running.
        if !self.is_active() {
            tracing::debug!(
                "{} sync loop cancelled, discarding fetch result",
                self.resource.name()
            );
            return self.signal();
        }

        match fetched {
            Ok(ids) => {
                let changed = self.cache.send_if_modified(|cache| {
                    if cache.last_seen_ids == ids {
                        return false;
                    }
                    cache.last_seen_ids = ids;
                    cache.has_pending_change = true;
                    true
                });
                if changed {
                    tracing::debug!("{} changed on the server", self.resource.name());
                }
            }
            Err(err) => {
                let mut failures = 0;
                self.cache.send_modify(|cache| {
                    cache.failures += 1;
                    cache.last_failure_at = Some(Utc::now());
                    cache.last_error = Some(err.to_string());
                    failures = cache.failures;
                });
                tracing::warn!(
                    "{} sync tick failed ({failures} failures so far): {err}",
                    self.resource.name()
                );
            }
        }

        self.signal()
    }
}

impl<R: SyncResource + 'static> SyncLoop<R> {
    /// Ticks every `period` until the owner's token is cancelled.
    ///
    /// A tick already running when cancellation arrives completes, but its
    /// result is discarded.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "{} sync loop started (interval: {}ms)",
                self.resource.name(),
                period.as_millis()
            );
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = timer.tick() => {
                        self.tick().await;
                    }
                }
            }
            tracing::info!("{} sync loop stopped", self.resource.name());
        })
    }
}

/// Ids of the groups the session user belongs to.
///
/// The groups behind the last successful fetch are kept so that a change
/// can be applied without pulling the list a second time.
pub struct GroupList {
    repository: Repository,
    latest: Mutex<Option<Vec<Group>>>,
}

impl GroupList {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            latest: Mutex::new(None),
        }
    }

    /// Groups from the last successful fetch, if not taken yet.
    pub fn take_latest(&self) -> Option<Vec<Group>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl SyncResource for GroupList {
    fn name(&self) -> &'static str {
        "groups"
    }

    async fn fetch_ids(&self) -> Result<BTreeSet<i64>, DomainError> {
        let groups = self.repository.fetch_groups().await?;
        let ids = groups.iter().map(|group| group.id()).collect();
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(groups);
        Ok(ids)
    }
}

/// Ids of the session user's unread notifications.
#[derive(Clone)]
pub struct UnreadNotifications {
    repository: Repository,
}

impl UnreadNotifications {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl SyncResource for UnreadNotifications {
    fn name(&self) -> &'static str {
        "notifications"
    }

    async fn fetch_ids(&self) -> Result<BTreeSet<i64>, DomainError> {
        let notifications = self.repository.fetch_unread_notifications().await?;
        Ok(notifications.iter().map(|n| n.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::VecDeque, sync::Mutex};

    /// Replays canned id sets.
    struct Scripted {
        results: Mutex<VecDeque<Result<Vec<i64>, DomainError>>>,
    }

    impl Scripted {
        fn new(results: Vec<Result<Vec<i64>, DomainError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait]
    impl SyncResource for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_ids(&self) -> Result<BTreeSet<i64>, DomainError> {
            let next = self.results.lock().unwrap().pop_front();
            next.unwrap_or(Ok(Vec::new()))
                .map(|ids| ids.into_iter().collect())
        }
    }

    fn sync_loop(results: Vec<Result<Vec<i64>, DomainError>>) -> SyncLoop<Scripted> {
        SyncLoop::new(Scripted::new(results), CancellationToken::new())
    }

    #[tokio::test]
    async fn identical_fetches_stay_idle() {
        let sync = sync_loop(vec![Ok(vec![]), Ok(vec![])]);
        assert_eq!(sync.tick().await, ChangeSignal::Idle);
        assert_eq!(sync.tick().await, ChangeSignal::Idle);
        assert!(!sync.snapshot().has_pending_change);
    }

    #[tokio::test]
    async fn change_is_flagged_once_until_consumed() {
        let sync = sync_loop(vec![
            Ok(vec![1, 2]),
            Ok(vec![2, 1]),
            Ok(vec![1, 2, 3]),
            Ok(vec![1, 2, 3]),
        ]);

        assert_eq!(sync.tick().await, ChangeSignal::Pending);
        // Same set, different order.
        assert_eq!(sync.tick().await, ChangeSignal::Pending);
        assert!(sync.consume());
        assert!(!sync.consume());

        assert_eq!(sync.tick().await, ChangeSignal::Pending);
        assert!(sync.consume());
        assert_eq!(sync.tick().await, ChangeSignal::Idle);
        assert_eq!(sync.snapshot().last_seen_ids, BTreeSet::from([1, 2, 3]));
    }

    #[tokio::test]
    async fn consume_seen_keeps_ids_the_caller_missed() {
        let sync = sync_loop(vec![Ok(vec![5, 6])]);
        assert_eq!(sync.tick().await, ChangeSignal::Pending);

        assert!(!sync.consume_seen(&BTreeSet::from([5])));
        assert_eq!(sync.signal(), ChangeSignal::Pending);

        assert!(sync.consume_seen(&BTreeSet::from([4, 5, 6])));
        assert_eq!(sync.signal(), ChangeSignal::Idle);
        assert!(!sync.consume_seen(&BTreeSet::from([4, 5, 6])));
    }

    #[tokio::test]
    async fn failures_are_recorded_not_returned() {
        let sync = sync_loop(vec![
            Ok(vec![5]),
            Err(DomainError::Connection("offline".to_string())),
            Ok(vec![5]),
        ]);

        assert_eq!(sync.tick().await, ChangeSignal::Pending);
        sync.consume();
        assert_eq!(sync.tick().await, ChangeSignal::Idle);

        let cache = sync.snapshot();
        assert_eq!(cache.failures, 1);
        assert!(cache.last_failure_at.is_some());
        assert_eq!(
            cache.last_error.as_deref(),
            Some("connection error: offline")
        );
        assert_eq!(cache.last_seen_ids, BTreeSet::from([5]));

        assert_eq!(sync.tick().await, ChangeSignal::Idle);
        assert_eq!(sync.ticks(), 3);
    }

    #[tokio::test]
    async fn cancelled_loop_does_not_fetch() {
        let cancel = CancellationToken::new();
        let sync = SyncLoop::new(Scripted::new(vec![Ok(vec![1])]), cancel.clone());
        cancel.cancel();

        assert_eq!(sync.tick().await, ChangeSignal::Idle);
        assert_eq!(sync.ticks(), 0);
        assert!(sync.snapshot().last_seen_ids.is_empty());
    }
}
