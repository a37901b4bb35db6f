use crate::models::{DashboardState, StateBroadcast, StatePatch};
use crate::query;
use crate::storage::SnapshotStore;
use crate::store::{StateStore, SubscriberError, diff_states};
use crate::sync::DataSync;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

// One per process, built at startup and handed to whatever needs shared
// state. Owns the store, the snapshot slot, and the sync channel.
pub struct SharedContext {
    store: Mutex<StateStore>,
    slot: SnapshotStore,
    sync: DataSync,
}

impl SharedContext {
    pub async fn init(slot: SnapshotStore, channel: &str, initial_query: Option<&str>) -> Arc<Self> {
        let mut store = StateStore::new();

        let stored = slot.load().await;
        if !stored.is_empty() {
            store.apply(&stored);
        }
        // URL parameters outrank the persisted snapshot.
        if let Some(query) = initial_query {
            let from_url = query::patch_from_query(query);
            if !from_url.is_empty() {
                store.apply(&from_url);
            }
        }

        let sync = DataSync::new(channel, &slot);
        let context = Arc::new(Self {
            store: Mutex::new(store),
            slot,
            sync,
        });
        Self::spawn_pump(&context);
        context
    }

    fn spawn_pump(context: &Arc<Self>) {
        let context = Arc::clone(context);
        let mut receiver = context.sync.receiver();
        tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                context.apply_remote(payload).await;
            }
        });
    }

    async fn apply_remote(&self, payload: StateBroadcast) {
        if payload.origin == self.sync.origin() {
            return;
        }
        let mut store = self.store.lock().await;
        if payload.state == store.state() {
            return;
        }
        let new = store.replace(payload.state);
        drop(store);
        // Remote applications persist but never re-broadcast; the origin
        // stamp already keeps the sender from hearing itself.
        self.slot.save(&new).await;
    }

    pub async fn state(&self) -> DashboardState {
        self.store.lock().await.state()
    }

    pub async fn update(&self, patch: &StatePatch) -> DashboardState {
        let mut store = self.store.lock().await;
        let old = store.state();
        let new = store.apply(patch);
        drop(store);

        let changes = diff_states(&old, &new);
        if !changes.is_empty() {
            debug!("state changed: {:?}", changes.keys().collect::<Vec<_>>());
        }

        self.slot.save(&new).await;
        self.sync.publish(&new);
        new
    }

    pub async fn reset(&self) -> DashboardState {
        let mut store = self.store.lock().await;
        let new = store.reset();
        drop(store);

        self.slot.clear().await;
        self.sync.publish(&new);
        new
    }

    pub async fn subscribe<F>(&self, subscriber: F) -> u64
    where
        F: Fn(&DashboardState, &DashboardState) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.store.lock().await.subscribe(subscriber)
    }

    pub async fn unsubscribe(&self, id: u64) -> bool {
        self.store.lock().await.unsubscribe(id)
    }

    pub fn storage(&self) -> &SnapshotStore {
        &self.slot
    }
}
