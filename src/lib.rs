pub mod app;
pub mod components;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod nav;
pub mod query;
pub mod router;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod ui;

pub use context::SharedContext;
pub use models::{CHANNEL_NAME, DashboardState, STORAGE_KEY, StatePatch, TimeKey};
pub use state::AppState;
pub use storage::{SnapshotStore, resolve_storage_path};
