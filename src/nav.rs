use crate::context::SharedContext;
use crate::models::StatePatch;
use crate::query;
use crate::router::{NavigateOptions, SpaRouter};
use std::sync::{Arc, Mutex};
use tracing::warn;
use url::form_urlencoded;

const PARENT_FALLBACK: &str = "/";

#[derive(Debug, Clone, Default)]
pub struct NavOptions {
    pub params: Vec<(String, String)>,
    pub replace: bool,
}

// Navigation is a value the embedding layer executes: either a full page
// load or a delegation to the SPA router that already ran.
#[derive(Debug, Clone, PartialEq)]
pub enum NavOutcome {
    Load { url: String, replace: bool },
    Spa { path: String },
}

impl NavOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Load { url, .. } => url,
            Self::Spa { path } => path,
        }
    }
}

pub struct Navigator {
    context: Option<Arc<SharedContext>>,
    router: Option<Arc<Mutex<SpaRouter>>>,
    history: Vec<String>,
}

impl Navigator {
    pub fn new(context: Option<Arc<SharedContext>>) -> Self {
        Self {
            context,
            router: None,
            history: Vec::new(),
        }
    }

    pub fn with_router(mut self, router: Arc<Mutex<SpaRouter>>) -> Self {
        self.router = Some(router);
        self
    }

    pub async fn navigate_to(&mut self, path: &str, options: &NavOptions) -> NavOutcome {
        if let Some(router) = &self.router {
            match router.lock() {
                Ok(router) => {
                    router.navigate(
                        path,
                        &NavigateOptions {
                            source: Some("legacy".to_string()),
                        },
                    );
                    return NavOutcome::Spa {
                        path: path.to_string(),
                    };
                }
                Err(_) => warn!("router lock poisoned, falling back to full navigation"),
            }
        }

        // Without an initialized sync layer this is a plain location change.
        let Some(context) = self.context.clone() else {
            return self.finish(path.to_string(), options.replace);
        };

        let state = context.state().await;
        match query::navigation_url(path, &state) {
            Ok(url) => {
                let url = overlay_params(&url, &options.params);
                self.finish(url, options.replace)
            }
            Err(err) => {
                warn!("failed to build navigation URL for {path:?}: {err}");
                // Degrade to the original, unmodified target.
                self.finish(path.to_string(), options.replace)
            }
        }
    }

    pub async fn navigate_with_state(&mut self, path: &str, updates: &StatePatch) -> NavOutcome {
        if let Some(context) = &self.context {
            context.update(updates).await;
        }
        self.navigate_to(path, &NavOptions::default()).await
    }

    pub fn navigate_back(&mut self) -> NavOutcome {
        self.history.pop();
        let url = self
            .history
            .last()
            .cloned()
            .unwrap_or_else(|| PARENT_FALLBACK.to_string());
        NavOutcome::Load {
            url,
            replace: false,
        }
    }

    fn finish(&mut self, url: String, replace: bool) -> NavOutcome {
        if !replace {
            self.history.push(url.clone());
        }
        NavOutcome::Load { url, replace }
    }
}

fn overlay_params(url: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let (path, existing) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(existing.as_bytes()) {
        if !params.iter().any(|(extra, _)| *extra == key) {
            serializer.append_pair(&key, &value);
        }
    }
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    format!("{path}?{}", serializer.finish())
}
