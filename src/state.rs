use crate::components::ComponentRegistry;
use crate::context::SharedContext;
use crate::router::{RouterStore, SpaRouter};
use crate::ui;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub context: Arc<SharedContext>,
    pub registry: Arc<ComponentRegistry>,
    pub router: Arc<Mutex<SpaRouter>>,
    pub router_store: Arc<Mutex<RouterStore>>,
}

impl AppState {
    pub fn new(context: Arc<SharedContext>) -> Self {
        let router_store = Arc::new(Mutex::new(RouterStore::new()));

        let mut router = SpaRouter::new();
        router.attach_store(Arc::clone(&router_store));
        for page in ui::PAGES {
            router.register(page.path, move |_| {
                debug!("serving {}", page.title);
                Ok(())
            });
        }
        router.register("/locations/:id", |params| {
            debug!("serving location {:?}", params.get("id"));
            Ok(())
        });

        Self {
            context,
            registry: Arc::new(ui::default_registry()),
            router: Arc::new(Mutex::new(router)),
            router_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::NavigateOptions;
    use crate::storage::SnapshotStore;

    fn unique_slot() -> SnapshotStore {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("fitdash_app_{}_{}.json", std::process::id(), nanos));
        SnapshotStore::new(path)
    }

    #[tokio::test]
    async fn page_routes_are_registered_and_tracked_in_the_store() {
        let context = SharedContext::init(unique_slot(), "app-state-test", None).await;
        let app = AppState::new(context);

        let router = app.router.lock().unwrap();
        assert!(router.navigate("/revenue", &NavigateOptions::default()));
        drop(router);
        let snapshot = app.router_store.lock().unwrap().snapshot();
        assert_eq!(snapshot.route.as_deref(), Some("/revenue"));

        let router = app.router.lock().unwrap();
        assert!(router.navigate("/locations/giang-vo", &NavigateOptions::default()));
        drop(router);
        let snapshot = app.router_store.lock().unwrap().snapshot();
        assert_eq!(snapshot.params["id"], "giang-vo");
    }
}
