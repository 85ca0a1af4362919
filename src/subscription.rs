use crate::lock::lock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};

/// Handle for a registered listener
///
/// Unsubscribing is idempotent, and once `unsubscribe()` returns the listener
/// is never called again. Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Combine several subscriptions into one handle
    pub(crate) fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || {
            for subscription in subscriptions {
                subscription.unsubscribe();
            }
        })
    }

    /// Stop receiving notifications
    pub fn unsubscribe(&self) {
        let cancel = lock(&self.cancel).take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether `unsubscribe()` has already run
    pub fn is_active(&self) -> bool {
        lock(&self.cancel).is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

type Listener<E> = Arc<dyn Fn(E) + Send + Sync>;

/// Keyed listener sets: notifying one key only reaches that key's listeners
pub(crate) struct ListenerRegistry<K, E> {
    shared: Arc<Shared<K, E>>,
}

struct Shared<K, E> {
    listeners: Mutex<HashMap<K, BTreeMap<u64, Listener<E>>>>,
    next_id: AtomicU64,
    /// Held for the duration of a fan-out
    dispatch: Mutex<()>,
    /// Thread currently running a fan-out, if any
    dispatcher: Mutex<Option<ThreadId>>,
    /// Events raised by listeners, delivered once the running fan-out ends
    queued: Mutex<VecDeque<(K, E)>>,
}

struct DispatchGuard<'a, K, E> {
    shared: &'a Shared<K, E>,
    _dispatch: MutexGuard<'a, ()>,
}

impl<K, E> Drop for DispatchGuard<'_, K, E> {
    fn drop(&mut self) {
        *lock(&self.shared.dispatcher) = None;
    }
}

impl<K, E> Shared<K, E>
where
    K: Eq + Hash,
{
    fn is_dispatching_here(&self) -> bool {
        *lock(&self.dispatcher) == Some(thread::current().id())
    }

    /// Serialize fan-outs. Returns `None` when called from inside a listener.
    fn begin_dispatch(&self) -> Option<DispatchGuard<'_, K, E>> {
        if self.is_dispatching_here() {
            return None;
        }
        let guard = lock(&self.dispatch);
        *lock(&self.dispatcher) = Some(thread::current().id());
        Some(DispatchGuard {
            shared: self,
            _dispatch: guard,
        })
    }

    fn deliver(&self, key: &K, event: &E)
    where
        E: Clone,
    {
        let ids: Vec<u64> = match lock(&self.listeners).get(key) {
            Some(set) => set.keys().copied().collect(),
            None => return,
        };
        for id in ids {
            if let Some(listener) = self.listener(key, id) {
                listener(event.clone());
            }
        }
    }

    fn listener(&self, key: &K, id: u64) -> Option<Listener<E>> {
        lock(&self.listeners)
            .get(key)
            .and_then(|set| set.get(&id))
            .cloned()
    }

    fn remove(&self, key: &K, id: u64) {
        {
            let mut listeners = lock(&self.listeners);
            if let Some(set) = listeners.get_mut(key) {
                set.remove(&id);
                if set.is_empty() {
                    listeners.remove(key);
                }
            }
        }

        // Wait out a fan-out running on another thread so the listener
        // cannot be called after we return
        if !self.is_dispatching_here() {
            drop(lock(&self.dispatch));
        }
    }
}

impl<K, E> ListenerRegistry<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                listeners: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                dispatch: Mutex::new(()),
                dispatcher: Mutex::new(None),
                queued: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Register a listener for one key
    pub(crate) fn subscribe(
        &self,
        key: K,
        listener: impl Fn(E) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners)
            .entry(key.clone())
            .or_default()
            .insert(id, Arc::new(listener));

        let shared: Weak<Shared<K, E>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.remove(&key, id);
            }
        })
    }

    /// Notify listeners of each key with its event
    ///
    /// Every listener is re-checked right before it is called, so one removed
    /// mid fan-out is skipped. Called from inside a listener, the events are
    /// queued and delivered after the current fan-out has reached everyone.
    pub(crate) fn notify_all(&self, events: impl IntoIterator<Item = (K, E)>) {
        let Some(_guard) = self.shared.begin_dispatch() else {
            lock(&self.shared.queued).extend(events);
            return;
        };

        for (key, event) in events {
            self.shared.deliver(&key, &event);
        }

        loop {
            let next = lock(&self.shared.queued).pop_front();
            match next {
                Some((key, event)) => self.shared.deliver(&key, &event),
                None => break,
            }
        }
    }

    pub(crate) fn notify(&self, key: K, event: E) {
        self.notify_all(std::iter::once((key, event)));
    }

    /// Number of listeners registered for a key
    pub(crate) fn count(&self, key: &K) -> usize {
        lock(&self.shared.listeners)
            .get(key)
            .map_or(0, |set| set.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(u8) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        (hits, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn only_listeners_of_the_key_are_notified() {
        let registry: ListenerRegistry<&'static str, u8> = ListenerRegistry::new();
        let (five, on_five) = counter();
        let (six, on_six) = counter();
        let _a = registry.subscribe("1:5", on_five);
        let _b = registry.subscribe("1:6", on_six);

        registry.notify("1:6", 10);

        assert_eq!(five.load(Ordering::SeqCst), 0);
        assert_eq!(six.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_twice_is_a_noop() {
        let registry: ListenerRegistry<&'static str, u8> = ListenerRegistry::new();
        let (hits, on_hit) = counter();
        let subscription = registry.subscribe("1:1", on_hit);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        registry.notify("1:1", 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(registry.count(&"1:1"), 0);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let registry: ListenerRegistry<&'static str, u8> = ListenerRegistry::new();
        let (hits, on_hit) = counter();
        drop(registry.subscribe("1:1", on_hit));

        registry.notify("1:1", 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_removed_mid_fan_out_is_skipped() {
        let registry: Arc<ListenerRegistry<&'static str, u8>> = Arc::new(ListenerRegistry::new());
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_clone = victim.clone();
        let _first = registry.subscribe("1:1", move |_| {
            if let Some(subscription) = victim_clone.lock().unwrap().take() {
                subscription.unsubscribe();
            }
        });
        let (hits, on_hit) = counter();
        *victim.lock().unwrap() = Some(registry.subscribe("1:1", on_hit));

        registry.notify("1:1", 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_can_unsubscribe_itself() {
        let registry: ListenerRegistry<&'static str, u8> = ListenerRegistry::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let (hits, on_hit) = counter();

        let slot_clone = slot.clone();
        let subscription = registry.subscribe("1:1", move |value| {
            on_hit(value);
            if let Some(me) = slot_clone.lock().unwrap().take() {
                me.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(subscription);

        registry.notify("1:1", 1);
        registry.notify("1:1", 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notifications_raised_by_a_listener_wait_their_turn() {
        let registry: Arc<ListenerRegistry<&'static str, u8>> = Arc::new(ListenerRegistry::new());
        let first_seen = Arc::new(Mutex::new(Vec::new()));
        let second_seen = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::downgrade(&registry);
        let seen = first_seen.clone();
        let _first = registry.subscribe("status", move |value| {
            seen.lock().unwrap().push(value);
            if value == 1 {
                if let Some(registry) = inner.upgrade() {
                    registry.notify("status", 2);
                }
            }
        });
        let seen = second_seen.clone();
        let _second = registry.subscribe("status", move |value| seen.lock().unwrap().push(value));

        registry.notify("status", 1);

        assert_eq!(*first_seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(*second_seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn merged_subscription_releases_every_part() {
        let registry: ListenerRegistry<&'static str, u8> = ListenerRegistry::new();
        let (hits, on_hit) = counter();
        let on_hit = Arc::new(on_hit);
        let parts = ["1:1", "1:2"]
            .into_iter()
            .map(|key| {
                let on_hit = on_hit.clone();
                registry.subscribe(key, move |value| on_hit(value))
            })
            .collect();
        let merged = Subscription::merge(parts);

        merged.unsubscribe();
        registry.notify_all([("1:1", 1), ("1:2", 2)]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
