use crate::models::{DashboardState, StatePatch};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;
type Subscriber = Box<dyn Fn(&DashboardState, &DashboardState) -> Result<(), SubscriberError> + Send + Sync>;

pub struct StateStore {
    state: DashboardState,
    // Id-keyed list, not a set: the same callback subscribed twice stays
    // two independent registrations.
    subscribers: Vec<(u64, Subscriber)>,
    next_subscription: u64,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let mut state = DashboardState::default();
        state.recompute_dates();
        Self {
            state,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> DashboardState {
        self.state.clone()
    }

    pub fn apply(&mut self, patch: &StatePatch) -> DashboardState {
        let old = self.state.clone();
        patch.merge_into(&mut self.state);
        self.state.recompute_dates();
        let new = self.state.clone();
        self.notify(&new, &old);
        new
    }

    pub fn replace(&mut self, mut state: DashboardState) -> DashboardState {
        let old = self.state.clone();
        state.recompute_dates();
        self.state = state;
        let new = self.state.clone();
        self.notify(&new, &old);
        new
    }

    pub fn reset(&mut self) -> DashboardState {
        self.replace(DashboardState::default())
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> u64
    where
        F: Fn(&DashboardState, &DashboardState) -> Result<(), SubscriberError> + Send + Sync + 'static,
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

    fn notify(&self, new: &DashboardState, old: &DashboardState) {
        for (id, subscriber) in &self.subscribers {
            if let Err(err) = subscriber(new, old) {
                warn!("state subscriber {id} failed: {err}");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

pub fn diff_states(old: &DashboardState, new: &DashboardState) -> BTreeMap<String, FieldChange> {
    let (Ok(Value::Object(old_map)), Ok(Value::Object(new_map))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return BTreeMap::new();
    };

    let mut changes = BTreeMap::new();
    for (key, new_value) in &new_map {
        let old_value = old_map.get(key).cloned().unwrap_or(Value::Null);
        if old_value != *new_value {
            changes.insert(
                key.clone(),
                FieldChange {
                    old: old_value,
                    new: new_value.clone(),
                },
            );
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WILDCARD;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn apply_merges_patch_and_keeps_other_fields() {
        let mut store = StateStore::new();
        let before = store.state();
        store.apply(&StatePatch {
            location: Some("giang-vo".to_string()),
            ..StatePatch::default()
        });

        let after = store.state();
        assert_eq!(after.location, "giang-vo");
        assert_eq!(after.department, before.department);
        assert_eq!(after.time_key, before.time_key);
        assert_eq!(after.page, before.page);
    }

    #[test]
    fn reset_restores_default_record() {
        let mut store = StateStore::new();
        store.apply(&StatePatch {
            location: Some("giang-vo".to_string()),
            search: Some("yoga".to_string()),
            page: Some(7),
            ..StatePatch::default()
        });

        let state = store.reset();
        let mut expected = DashboardState::default();
        expected.recompute_dates();
        assert_eq!(state, expected);
        assert_eq!(store.state(), expected);
    }

    #[test]
    fn subscribers_observe_new_and_old_state() {
        let mut store = StateStore::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store.subscribe(move |new, old| {
            sink.lock().unwrap().push((new.location.clone(), old.location.clone()));
            Ok(())
        });

        store.apply(&StatePatch {
            location: Some("cau-giay".to_string()),
            ..StatePatch::default()
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), [("cau-giay".to_string(), WILDCARD.to_string())]);
    }

    #[test]
    fn failing_subscriber_does_not_block_later_ones() {
        let mut store = StateStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        store.subscribe(|_, _| Err("boom".into()));
        let counter = Arc::clone(&calls);
        store.subscribe(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        store.apply(&StatePatch {
            page: Some(2),
            ..StatePatch::default()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_subscriptions_are_independent() {
        let mut store = StateStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let subscriber = move |_: &DashboardState, _: &DashboardState| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let first = store.subscribe(subscriber.clone());
        store.subscribe(subscriber);

        store.apply(&StatePatch {
            page: Some(2),
            ..StatePatch::default()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(first));
        store.apply(&StatePatch {
            page: Some(3),
            ..StatePatch::default()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn diff_reports_only_changed_keys() {
        let mut old = DashboardState::default();
        old.recompute_dates_at(chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        let mut new = old.clone();
        new.location = "giang-vo".to_string();
        new.page = 4;

        let changes = diff_states(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["location"].old, "all");
        assert_eq!(changes["location"].new, "giang-vo");
        assert_eq!(changes["page"].new, 4);
        assert!(!changes.contains_key("department"));
    }
}
