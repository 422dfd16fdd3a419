//! The session context.
//!
//! One `Session` per signed-in user. It owns everything the ledger core
//! keeps in memory (group snapshots, sync caches) and every background task
//! it starts; nothing is shared across sessions.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    time::Duration,
};

use ledger::{Balance, Group, MemberKey, Money};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
    ChangeSignal, Notification, Repository, Settlements, SyncCache, SyncLoop,
    error::Result,
    sync::{GroupList, UnreadNotifications},
};

pub const DEFAULT_NOTIFICATIONS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Registered member id of the signed-in user.
    pub user_id: i64,
    pub notifications_interval: Duration,
}

impl SessionConfig {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            notifications_interval: DEFAULT_NOTIFICATIONS_INTERVAL,
        }
    }
}

pub struct Session {
    config: SessionConfig,
    repository: Repository,
    settlements: Settlements,
    groups: Vec<Group>,
    loaded: HashMap<i64, Group>,
    group_sync: Arc<SyncLoop<GroupList>>,
    notification_sync: Arc<SyncLoop<UnreadNotifications>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    pub fn new(config: SessionConfig, repository: Repository) -> Self {
        let cancel = CancellationToken::new();
        let group_sync = Arc::new(SyncLoop::new(
            GroupList::new(repository.clone()),
            cancel.child_token(),
        ));
        let notification_sync = Arc::new(SyncLoop::new(
            UnreadNotifications::new(repository.clone()),
            cancel.child_token(),
        ));

        Self {
            config,
            settlements: Settlements::new(repository.clone()),
            repository,
            groups: Vec::new(),
            loaded: HashMap::new(),
            group_sync,
            notification_sync,
            cancel,
            tasks: Vec::new(),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.config.user_id
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn settlements(&self) -> &Settlements {
        &self.settlements
    }

    /// Starts the notification polling loop.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            return;
        }
        tracing::info!("session for user {} started", self.config.user_id);
        let handle = self
            .notification_sync
            .clone()
            .spawn(self.config.notifications_interval);
        self.tasks.push(handle);
    }

    /// Cancels every owned loop and waits for them to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.tasks.drain(..) {
            if let Err(err) = handle.await {
                tracing::error!("sync task failed: {err}");
            }
        }
        tracing::info!("session for user {} closed", self.config.user_id);
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Group list as of the last successful refresh.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group with its expenses, if it was opened.
    pub fn group(&self, group_id: i64) -> Option<&Group> {
        self.loaded.get(&group_id)
    }

    /// Single-shot group sync, run when the group list is shown.
    ///
    /// The list is only replaced when the set of group ids changed, using
    /// the groups the tick already fetched. The change stays pending if
    /// they have to be pulled again and that fails.
    pub async fn refresh_groups(&mut self) -> Result<ChangeSignal> {
        let signal = self.group_sync.tick().await;
        let latest = self.group_sync.resource().take_latest();
        if signal.is_pending() {
            let groups = match latest {
                Some(groups) => groups,
                None => self.repository.fetch_groups().await?,
            };
            if !self.is_active() {
                return Ok(signal);
            }
            let ids: BTreeSet<i64> = groups.iter().map(Group::id).collect();
            self.loaded.retain(|id, _| ids.contains(id));
            self.groups = groups;
            self.group_sync.consume_seen(&ids);
        }
        Ok(signal)
    }

    /// Loads (or reloads) a group with its expenses, replacing any
    /// previous snapshot.
    pub async fn open_group(&mut self, group_id: i64) -> Result<&Group> {
        let group = self.repository.load_group(group_id).await?;
        if let Some(summary) = self.groups.iter_mut().find(|g| g.id() == group_id) {
            *summary = group.clone();
        }
        Ok(self.loaded.entry(group_id).insert_entry(group).into_mut())
    }

    /// Drops a group after the user left or deleted it.
    pub fn forget_group(&mut self, group_id: i64) {
        self.loaded.remove(&group_id);
        self.groups.retain(|g| g.id() != group_id);
    }

    pub async fn leave_group(&mut self, group_id: i64) -> Result<()> {
        self.repository.leave_group(group_id).await?;
        self.forget_group(group_id);
        Ok(())
    }

    pub async fn delete_group(&mut self, group_id: i64) -> Result<()> {
        self.repository.delete_group(group_id).await?;
        self.forget_group(group_id);
        Ok(())
    }

    /// Balances of an opened group. `None` if the group was not opened.
    pub fn balances(&self, group_id: i64) -> Option<Result<Vec<Balance>>> {
        self.loaded
            .get(&group_id)
            .map(|group| group.balances().map_err(Into::into))
    }

    /// Net balance of the signed-in user in an opened group.
    pub fn my_balance(&self, group_id: i64) -> Option<Result<Money>> {
        self.loaded.get(&group_id).map(|group| {
            group
                .balance_of(MemberKey::Registered(self.config.user_id))
                .map_err(Into::into)
        })
    }

    pub fn subscribe_groups(&self) -> watch::Receiver<SyncCache> {
        self.group_sync.subscribe()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<SyncCache> {
        self.notification_sync.subscribe()
    }

    pub fn notification_sync(&self) -> &SyncLoop<UnreadNotifications> {
        &self.notification_sync
    }

    pub fn group_sync(&self) -> &SyncLoop<GroupList> {
        &self.group_sync
    }

    /// Pulls the unread notifications and clears the pending flag.
    ///
    /// The flag stays set if the poller saw ids this pull did not return.
    pub async fn unread_notifications(&self) -> Result<Vec<Notification>> {
        let notifications = self.repository.fetch_unread_notifications().await?;
        let pulled: BTreeSet<i64> = notifications.iter().map(|n| n.id).collect();
        self.notification_sync.consume_seen(&pulled);
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, notification_id: i64) -> Result<()> {
        Ok(self
            .repository
            .mark_notification_read(notification_id)
            .await?)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
