use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::warn;

const EVENT_CAPACITY: usize = 16;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type RouteParams = HashMap<String, String>;
type RouteHandler = Box<dyn Fn(&RouteParams) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct NavigationEvent {
    pub path: String,
    pub params: RouteParams,
    pub success: bool,
    pub error: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NavigateOptions {
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub pattern: String,
    pub params: RouteParams,
}

pub struct SpaRouter {
    routes: HashMap<String, RouteHandler>,
    events: broadcast::Sender<NavigationEvent>,
    store: Option<Arc<Mutex<RouterStore>>>,
}

impl Default for SpaRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            events: broadcast::channel(EVENT_CAPACITY).0,
            store: None,
        }
    }

    pub fn attach_store(&mut self, store: Arc<Mutex<RouterStore>>) {
        self.store = Some(store);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NavigationEvent> {
        self.events.subscribe()
    }

    pub fn register<F>(&mut self, path: &str, handler: F)
    where
        F: Fn(&RouteParams) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.routes.insert(normalize(path), Box::new(handler));
    }

    pub fn unregister(&mut self, path: &str) -> bool {
        self.routes.remove(&normalize(path)).is_some()
    }

    // Exact match first, then dynamic-segment patterns. A miss is a None,
    // never an error.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let normalized = normalize(path);
        if self.routes.contains_key(&normalized) {
            return Some(RouteMatch {
                pattern: normalized,
                params: RouteParams::new(),
            });
        }
        for pattern in self.routes.keys() {
            if let Some(params) = match_pattern(pattern, &normalized) {
                return Some(RouteMatch {
                    pattern: pattern.clone(),
                    params,
                });
            }
        }
        None
    }

    pub fn navigate(&self, path: &str, options: &NavigateOptions) -> bool {
        let normalized = normalize(path);
        let Some(matched) = self.resolve(&normalized) else {
            self.dispatch(NavigationEvent {
                path: normalized,
                params: RouteParams::new(),
                success: false,
                error: Some("no matching route".to_string()),
                source: options.source.clone(),
            });
            return false;
        };

        let mut error = None;
        if let Some(handler) = self.routes.get(&matched.pattern) {
            if let Err(err) = handler(&matched.params) {
                warn!("route handler for {} failed: {err}", matched.pattern);
                error = Some(err.to_string());
            }
        }
        let success = error.is_none();

        self.dispatch(NavigationEvent {
            path: normalized.clone(),
            params: matched.params.clone(),
            success,
            error,
            source: options.source.clone(),
        });

        if let Some(store) = &self.store {
            match store.lock() {
                Ok(mut store) => store.set_route(&normalized, matched.params),
                Err(_) => warn!("router store lock poisoned, skipping route update"),
            }
        }
        success
    }

    fn dispatch(&self, event: NavigationEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    let without_query = trimmed.split('?').next().unwrap_or("");
    if without_query.is_empty() {
        return "/".to_string();
    }
    if without_query.starts_with('/') {
        without_query.to_string()
    } else {
        format!("/{without_query}")
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<RouteParams> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = RouteParams::new();
    for (pattern_segment, path_segment) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pattern_segment.strip_prefix(':') {
            let decoded = percent_decode_str(path_segment)
                .decode_utf8()
                .map(|value| value.into_owned())
                .unwrap_or_else(|_| (*path_segment).to_string());
            params.insert(name.to_string(), decoded);
        } else if pattern_segment != path_segment {
            return None;
        }
    }
    Some(params)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterSnapshot {
    pub route: Option<String>,
    pub params: RouteParams,
    pub context: HashMap<String, Value>,
}

type StoreSubscriber = Box<dyn Fn(&RouterSnapshot) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Default)]
pub struct RouterStore {
    route: Option<String>,
    params: RouteParams,
    context: HashMap<String, Value>,
    subscribers: Vec<(u64, StoreSubscriber)>,
    next_subscription: u64,
}

impl RouterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            route: self.route.clone(),
            params: self.params.clone(),
            context: self.context.clone(),
        }
    }

    pub fn set_route(&mut self, route: &str, params: RouteParams) {
        self.route = Some(route.to_string());
        self.params = params;
        self.notify();
    }

    // The context map is a side-channel for cross-component data; it never
    // touches route or params.
    pub fn set_context(&mut self, key: &str, value: Value) {
        self.context.insert(key.to_string(), value);
        self.notify();
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> u64
    where
        F: Fn(&RouterSnapshot) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        for (id, subscriber) in &self.subscribers {
            if let Err(err) = subscriber(&snapshot) {
                warn!("router store subscriber {id} failed: {err}");
            }
        }
    }
}
