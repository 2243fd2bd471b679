use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;
use crate::views::{
    admin_pces::PcesPage, admin_workspaces::WorkspacesPage, users::UsersPage, workspace::WorkspacePage,
    FamilyTable,
};

type Slot<P> = Option<Arc<Mutex<P>>>;

/// The stateful pages of one browser session.
#[derive(Debug)]
struct SessionPages {
    touched: Instant,
    workspace: Slot<WorkspacePage>,
    users: Slot<UsersPage>,
    admin_workspaces: Slot<WorkspacesPage>,
    admin_pces: Slot<PcesPage>,
}

impl SessionPages {
    fn new() -> Self {
        Self {
            touched: Instant::now(),
            workspace: None,
            users: None,
            admin_workspaces: None,
            admin_pces: None,
        }
    }
}

/// In-memory page state, keyed by the session's view key.
///
/// Handlers take a page's lock only to apply actions. It is never held
/// while an upstream request is in flight. Entries go away on logout, on
/// the next login from the same browser, or once idle past the session
/// timeout.
#[derive(Clone)]
pub struct PageStore {
    pages: Arc<RwLock<HashMap<Uuid, SessionPages>>>,
    families: FamilyTable,
}

impl PageStore {
    pub fn new(families: FamilyTable) -> Self {
        Self {
            pages: Arc::new(RwLock::new(HashMap::new())),
            families,
        }
    }

    async fn page<P>(
        &self,
        key: Uuid,
        slot: impl FnOnce(&mut SessionPages) -> &mut Slot<P>,
        make: impl FnOnce() -> P,
    ) -> Arc<Mutex<P>> {
        let mut pages = self.pages.write().await;
        let entry = pages.entry(key).or_insert_with(SessionPages::new);
        entry.touched = Instant::now();
        slot(entry)
            .get_or_insert_with(|| Arc::new(Mutex::new(make())))
            .clone()
    }

    pub async fn workspace(&self, key: Uuid) -> Arc<Mutex<WorkspacePage>> {
        let families = self.families.clone();
        self.page(key, |pages| &mut pages.workspace, || WorkspacePage::new(families))
            .await
    }

    pub async fn users(&self, key: Uuid) -> Arc<Mutex<UsersPage>> {
        self.page(key, |pages| &mut pages.users, UsersPage::default).await
    }

    pub async fn admin_workspaces(&self, key: Uuid) -> Arc<Mutex<WorkspacesPage>> {
        self.page(key, |pages| &mut pages.admin_workspaces, WorkspacesPage::default)
            .await
    }

    pub async fn admin_pces(&self, key: Uuid) -> Arc<Mutex<PcesPage>> {
        self.page(key, |pages| &mut pages.admin_pces, PcesPage::default).await
    }

    /// Drops every page of a session, as on logout.
    pub async fn evict(&self, key: Uuid) -> bool {
        let removed = self.pages.write().await.remove(&key).is_some();
        if removed {
            tracing::debug!("Evicted page state of session {}", key);
        }
        removed
    }

    /// Drops sessions untouched for at least `max_idle` and returns how many went.
    pub async fn sweep(&self, max_idle: Duration) -> usize {
        let mut pages = self.pages.write().await;
        let before = pages.len();
        pages.retain(|_, session| session.touched.elapsed() < max_idle);
        let removed = before - pages.len();
        if removed > 0 {
            tracing::info!("Swept {} idle sessions, {} remain", removed, pages.len());
        }
        removed
    }

    /// Sweeps idle sessions on a timer for as long as the server runs.
    pub fn spawn_sweeper(&self, max_idle: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                store.sweep(max_idle).await;
            }
        })
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }
}
