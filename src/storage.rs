use crate::models::{DashboardState, STORAGE_KEY, StatePatch};
use std::{
    env,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::{error, warn};

pub fn resolve_storage_path() -> PathBuf {
    let dir = env::var("APP_STORAGE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    dir.join(format!("{STORAGE_KEY}.json"))
}

// The single fixed slot the snapshot lives in. Storage failures are logged
// and swallowed; readers treat anything unreadable as "no data".
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, state: &DashboardState) {
        let payload = match serde_json::to_vec_pretty(state) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to serialize state snapshot: {err}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent).await {
                error!("failed to create storage directory: {err}");
                return;
            }
        }
        if let Err(err) = fs::write(&self.path, payload).await {
            error!("failed to write state snapshot: {err}");
        }
    }

    pub async fn load(&self) -> StatePatch {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(patch) => patch,
                Err(err) => {
                    error!("failed to parse state snapshot: {err}");
                    StatePatch::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StatePatch::default(),
            Err(err) => {
                error!("failed to read state snapshot: {err}");
                StatePatch::default()
            }
        }
    }

    pub async fn clear(&self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => error!("failed to clear state snapshot: {err}"),
        }
    }

    pub async fn read_raw(&self) -> Option<String> {
        fs::read_to_string(&self.path).await.ok()
    }
}

pub fn export_state(state: &DashboardState) -> String {
    serde_json::to_string_pretty(state).unwrap_or_else(|err| {
        error!("failed to export state: {err}");
        String::new()
    })
}

pub fn import_state(payload: &str) -> Option<StatePatch> {
    match serde_json::from_str(payload) {
        Ok(patch) => Some(patch),
        Err(err) => {
            warn!("failed to import state payload: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_slot() -> SnapshotStore {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("fitdash_slot_{}_{}.json", std::process::id(), nanos));
        SnapshotStore::new(path)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let slot = unique_slot();
        let mut state = DashboardState::default();
        state.location = "giang-vo".to_string();
        state.page = 3;
        slot.save(&state).await;

        let patch = slot.load().await;
        assert_eq!(patch.location.as_deref(), Some("giang-vo"));
        assert_eq!(patch.page, Some(3));

        slot.clear().await;
        assert!(slot.load().await.is_empty());
    }

    #[tokio::test]
    async fn missing_slot_loads_empty() {
        let slot = unique_slot();
        assert!(slot.load().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_slot_loads_empty() {
        let slot = unique_slot();
        tokio::fs::create_dir_all(slot.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(slot.path(), b"{not json").await.unwrap();
        assert!(slot.load().await.is_empty());
        slot.clear().await;
    }

    #[test]
    fn import_rejects_malformed_payload() {
        assert!(import_state("{broken").is_none());

        let mut state = DashboardState::default();
        state.service = "spa".to_string();
        let exported = export_state(&state);
        let imported = import_state(&exported).expect("exported state should import");
        assert_eq!(imported.service.as_deref(), Some("spa"));
    }
}
