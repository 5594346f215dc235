//! Observable single-slot holder for the current session.
//!
//! The store does no validation: it keeps whatever it was last given and
//! tells every subscriber, synchronously and in publish order. New
//! subscribers receive the latest value immediately.
//!
//! A publish made from inside an observer is queued and delivered once the
//! publish in progress has reached every observer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;
use tracing::debug;

use super::Session;

type Observer = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: AtomicU64,
    list: Mutex<Vec<(u64, Observer)>>,
}

#[derive(Default)]
struct PublishState {
    publishing: bool,
    pending: VecDeque<Option<Session>>,
}

pub struct SessionStore {
    current: watch::Sender<Option<Session>>,
    observers: Arc<Observers>,
    // Serializes publish + notify across threads. Reentrant so an observer
    // may publish from inside its callback; that value joins `pending`.
    publish: ReentrantMutex<RefCell<PublishState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            observers: Arc::new(Observers::default()),
            publish: ReentrantMutex::new(RefCell::new(PublishState::default())),
        }
    }

    /// Snapshot of the current session, if any.
    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Replace the held value and notify every subscriber.
    ///
    /// Called from inside an observer, the value is delivered after the
    /// current publish finishes, so every observer sees the same order.
    pub fn set(&self, session: Option<Session>) {
        let state = self.publish.lock();
        {
            let mut state = state.borrow_mut();
            state.pending.push_back(session);
            if state.publishing {
                debug!(queued = state.pending.len(), "Queued nested session publish");
                return;
            }
            state.publishing = true;
        }

        loop {
            // Borrow released before delivering; observers may call back into set
            let next = state.borrow_mut().pending.pop_front();
            let Some(session) = next else {
                break;
            };
            self.deliver(session);
        }
        state.borrow_mut().publishing = false;
    }

    fn deliver(&self, session: Option<Session>) {
        debug!(authenticated = session.is_some(), "Publishing session");
        self.current.send_replace(session.clone());

        // Call observers outside the list lock so they may subscribe or drop subscriptions
        let observers: Vec<Observer> = self
            .observers
            .list
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(session.as_ref());
        }
    }

    /// Register `observer`, delivering the current value before returning.
    ///
    /// The observer stays registered until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let _guard = self.publish.lock();
        let observer: Observer = Arc::new(observer);
        let id = self.observers.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.list.lock().push((id, Arc::clone(&observer)));

        let current = self.current();
        observer(current.as_ref());

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Async view of the slot. The receiver always starts at the latest value.
    pub fn watch(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.list.lock().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for a registered observer; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.list.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(token: &str) -> Session {
        Session::new("a@b.com", "U1", token, Utc::now() + Duration::hours(1)).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, impl Fn(Option<&Session>) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |s: Option<&Session>| {
            sink.lock().push(s.map(|s| s.raw_token().to_string()));
        };
        (seen, observer)
    }

    #[test]
    fn test_starts_empty() {
        let store = SessionStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_subscribe_replays_latest() {
        let store = SessionStore::new();
        store.set(Some(session("T1")));
        store.set(Some(session("T2")));

        let (seen, observer) = recorder();
        let _sub = store.subscribe(observer);
        assert_eq!(*seen.lock(), vec![Some("T2".to_string())]);
    }

    #[test]
    fn test_subscribe_replays_none() {
        let store = SessionStore::new();
        let (seen, observer) = recorder();
        let _sub = store.subscribe(observer);
        assert_eq!(*seen.lock(), vec![None]);
    }

    #[test]
    fn test_notifies_in_publish_order() {
        let store = SessionStore::new();
        let (seen, observer) = recorder();
        let _sub = store.subscribe(observer);

        store.set(Some(session("T1")));
        store.set(None);
        store.set(Some(session("T2")));

        assert_eq!(
            *seen.lock(),
            vec![None, Some("T1".to_string()), None, Some("T2".to_string())]
        );
    }

    #[test]
    fn test_dropping_subscription_stops_notifications() {
        let store = SessionStore::new();
        let (seen, observer) = recorder();
        let sub = store.subscribe(observer);
        assert_eq!(store.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);

        store.set(Some(session("T1")));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_observer_can_publish_reentrantly() {
        let store = Arc::new(SessionStore::new());
        let inner = Arc::clone(&store);
        // Clears any session it sees
        let _sub = store.subscribe(move |s| {
            if s.is_some() {
                inner.set(None);
            }
        });

        store.set(Some(session("T1")));
        assert!(store.current().is_none());
    }

    #[test]
    fn test_nested_publish_reaches_all_observers_in_order() {
        let store = Arc::new(SessionStore::new());
        let inner = Arc::clone(&store);
        let _clearer = store.subscribe(move |s| {
            if s.is_some() {
                inner.set(None);
            }
        });
        let (seen, observer) = recorder();
        let _recorder = store.subscribe(observer);

        store.set(Some(session("T1")));

        assert!(store.current().is_none());
        assert_eq!(*seen.lock(), vec![None, Some("T1".to_string()), None]);
        // Last value delivered matches what the store holds
        assert_eq!(seen.lock().last().cloned().flatten(), None);
    }

    #[test]
    fn test_publishing_resumes_after_nested_publish() {
        let store = Arc::new(SessionStore::new());
        let inner = Arc::clone(&store);
        let _clearer = store.subscribe(move |s| {
            if s.is_some() {
                inner.set(None);
            }
        });
        store.set(Some(session("T1")));

        let (seen, observer) = recorder();
        let _recorder = store.subscribe(observer);
        store.set(None);
        assert_eq!(*seen.lock(), vec![None, None]);
    }

    #[tokio::test]
    async fn test_watch_starts_at_latest() {
        let store = SessionStore::new();
        store.set(Some(session("T1")));

        let mut rx = store.watch();
        assert_eq!(rx.borrow().as_ref().map(|s| s.raw_token().to_string()), Some("T1".to_string()));

        store.set(None);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
