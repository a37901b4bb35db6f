use crate::models::{DashboardState, StateBroadcast};
use crate::storage::SnapshotStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, OnceLock};
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 16;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// Origin 0 is reserved for payloads whose sender is unknown (storage polling).
static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

pub fn next_origin() -> u64 {
    NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed)
}

fn named_channel(name: &str) -> Result<broadcast::Sender<StateBroadcast>, String> {
    static CHANNELS: OnceLock<StdMutex<HashMap<String, broadcast::Sender<StateBroadcast>>>> =
        OnceLock::new();
    let registry = CHANNELS.get_or_init(|| StdMutex::new(HashMap::new()));
    let mut registry = registry
        .lock()
        .map_err(|_| "channel registry poisoned".to_string())?;
    Ok(registry
        .entry(name.to_string())
        .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
        .clone())
}

pub enum SyncTransport {
    Broadcast {
        sender: broadcast::Sender<StateBroadcast>,
    },
    StoragePoll {
        slot: SnapshotStore,
    },
}

impl SyncTransport {
    // Same channel name, same medium: every context connecting with this name
    // shares one broadcast channel. If the registry is unusable the transport
    // degrades to watching the snapshot slot.
    pub fn connect(channel: &str, slot: &SnapshotStore) -> Self {
        match named_channel(channel) {
            Ok(sender) => Self::Broadcast { sender },
            Err(err) => {
                warn!("broadcast channel unavailable ({err}), falling back to storage polling");
                Self::StoragePoll { slot: slot.clone() }
            }
        }
    }

    pub fn send(&self, payload: &StateBroadcast) {
        match self {
            Self::Broadcast { sender } => {
                // No receivers is not a failure, just an empty room.
                let _ = sender.send(payload.clone());
            }
            // The snapshot write that precedes every broadcast already is the
            // message; pollers pick it up from the slot.
            Self::StoragePoll { .. } => {}
        }
    }

    pub fn receiver(&self) -> SyncReceiver {
        match self {
            Self::Broadcast { sender } => SyncReceiver::Broadcast(sender.subscribe()),
            Self::StoragePoll { slot } => SyncReceiver::StoragePoll {
                slot: slot.clone(),
                last_seen: None,
            },
        }
    }
}

pub enum SyncReceiver {
    Broadcast(broadcast::Receiver<StateBroadcast>),
    StoragePoll {
        slot: SnapshotStore,
        last_seen: Option<String>,
    },
}

impl SyncReceiver {
    pub async fn recv(&mut self) -> Option<StateBroadcast> {
        match self {
            Self::Broadcast(receiver) => loop {
                match receiver.recv().await {
                    Ok(payload) => return Some(payload),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("sync receiver lagged, skipped {skipped} updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            Self::StoragePoll { slot, last_seen } => loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                let Some(raw) = slot.read_raw().await else {
                    continue;
                };
                if last_seen.as_deref() == Some(raw.as_str()) {
                    continue;
                }
                *last_seen = Some(raw.clone());
                match serde_json::from_str::<DashboardState>(&raw) {
                    Ok(state) => return Some(StateBroadcast { origin: 0, state }),
                    Err(err) => warn!("malformed snapshot while polling: {err}"),
                }
            },
        }
    }
}

pub struct DataSync {
    origin: u64,
    transport: SyncTransport,
}

impl DataSync {
    pub fn new(channel: &str, slot: &SnapshotStore) -> Self {
        Self {
            origin: next_origin(),
            transport: SyncTransport::connect(channel, slot),
        }
    }

    pub fn with_transport(transport: SyncTransport) -> Self {
        Self {
            origin: next_origin(),
            transport,
        }
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    pub fn publish(&self, state: &DashboardState) {
        self.transport.send(&StateBroadcast {
            origin: self.origin,
            state: state.clone(),
        });
    }

    pub fn receiver(&self) -> SyncReceiver {
        self.transport.receiver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn unique_slot(tag: &str) -> SnapshotStore {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("fitdash_sync_{tag}_{}_{}.json", std::process::id(), nanos));
        SnapshotStore::new(path)
    }

    #[tokio::test]
    async fn broadcast_reaches_other_contexts_on_same_channel() {
        let slot = unique_slot("broadcast");
        let sender = DataSync::new("test-channel-shared", &slot);
        let receiver_side = DataSync::new("test-channel-shared", &slot);
        let mut receiver = receiver_side.receiver();

        let mut state = DashboardState::default();
        state.location = "giang-vo".to_string();
        sender.publish(&state);

        let payload = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("no payload within timeout")
            .expect("channel closed");
        assert_eq!(payload.origin, sender.origin());
        assert_ne!(payload.origin, receiver_side.origin());
        assert_eq!(payload.state.location, "giang-vo");
    }

    #[tokio::test]
    async fn distinct_channel_names_are_isolated() {
        let slot = unique_slot("isolated");
        let sender = DataSync::new("test-channel-a", &slot);
        let other = DataSync::new("test-channel-b", &slot);
        let mut receiver = other.receiver();

        sender.publish(&DashboardState::default());
        assert!(
            timeout(Duration::from_millis(300), receiver.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn storage_poll_picks_up_slot_changes() {
        let slot = unique_slot("poll");
        let sync = DataSync::with_transport(SyncTransport::StoragePoll { slot: slot.clone() });
        let mut receiver = sync.receiver();

        let mut state = DashboardState::default();
        state.department = "personal-training".to_string();
        slot.save(&state).await;

        let payload = timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("no payload within timeout")
            .expect("poll stream ended");
        assert_eq!(payload.origin, 0);
        assert_eq!(payload.state.department, "personal-training");
        slot.clear().await;
    }
}
