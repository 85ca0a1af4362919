use crate::addressing::ChannelAddressing;
use crate::aggregator::Aggregator;
use crate::lock::lock;
use crate::subscription::{ListenerRegistry, Subscription};
use crate::types::{ChannelKey, ChannelLevel, ChannelRef, ChannelValue, WireId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Destination for immediate channel writes
pub trait ChannelWriter: Send + Sync {
    /// Send a channel level to the server. Writes that cannot be sent are dropped.
    fn write_channel(&self, id: WireId, level: ChannelValue);
}

type Batch = HashMap<WireId, ChannelValue>;

/// Latest known level of every channel, with per-channel change notification
///
/// Inbound levels are coalesced by an [`Aggregator`] and applied in one pass
/// when the quiet window elapses; only listeners of channels present in the
/// batch are notified. Writes skip the aggregator and go straight to the
/// [`ChannelWriter`].
pub struct ChannelStore {
    values: Mutex<HashMap<ChannelKey, ChannelValue>>,
    listeners: ListenerRegistry<ChannelKey, ChannelValue>,
    aggregator: Aggregator<ChannelLevel, Batch>,
    addressing: Arc<dyn ChannelAddressing>,
    writer: Arc<dyn ChannelWriter>,
}

impl ChannelStore {
    /// Create a store. Must be called inside a tokio runtime.
    pub fn new(
        writer: Arc<dyn ChannelWriter>,
        addressing: Arc<dyn ChannelAddressing>,
        window: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|store: &Weak<ChannelStore>| {
            let store = store.clone();
            let aggregator = Aggregator::new(
                |level: ChannelLevel, mut batch: Batch| {
                    batch.insert(level.id, level.level);
                    batch
                },
                Batch::new,
                window,
                move |batch| {
                    if let Some(store) = store.upgrade() {
                        store.apply_batch(batch);
                    }
                },
            );

            Self {
                values: Mutex::new(HashMap::new()),
                listeners: ListenerRegistry::new(),
                aggregator,
                addressing,
                writer,
            }
        })
    }

    /// Current level of a channel, `0` if the server never reported it
    pub fn get(&self, channel: &ChannelRef) -> ChannelValue {
        lock(&self.values)
            .get(&self.canonical(channel).key())
            .copied()
            .unwrap_or(0)
    }

    /// Current level by key
    pub fn get_key(&self, key: &ChannelKey) -> ChannelValue {
        lock(&self.values)
            .get(&self.canonical_key(key))
            .copied()
            .unwrap_or(0)
    }

    /// The reference the server's echo of `channel` comes back as
    ///
    /// Refs outside the addressing scheme (universe below the first one,
    /// channel past the end of its universe) alias another channel's wire id;
    /// reads and subscriptions follow that alias so they agree with writes.
    pub fn canonical(&self, channel: &ChannelRef) -> ChannelRef {
        self.addressing.from_wire(self.addressing.to_wire(channel))
    }

    fn canonical_key(&self, key: &ChannelKey) -> ChannelKey {
        match key.channel() {
            Some(channel) => self.canonical(&channel).key(),
            None => key.clone(),
        }
    }

    /// Write a channel immediately
    ///
    /// The local value is not touched; it changes when the server reports it.
    pub fn update(&self, channel: &ChannelRef, value: ChannelValue) {
        let id = self.addressing.to_wire(channel);
        tracing::debug!("Writing channel {} (wire {}) = {}", channel, id, value);
        self.writer.write_channel(id, value);
    }

    /// Watch one channel. The listener receives the channel's new level.
    pub fn subscribe(
        &self,
        key: ChannelKey,
        listener: impl Fn(ChannelValue) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(self.canonical_key(&key), listener)
    }

    /// Queue levels reported by the server
    pub fn ingest(&self, levels: impl IntoIterator<Item = ChannelLevel>) {
        self.aggregator.push_all(levels);
    }

    /// Apply queued levels now instead of waiting for the quiet window
    pub fn flush(&self) {
        self.aggregator.flush();
    }

    /// Number of channels with a known level
    pub fn len(&self) -> usize {
        lock(&self.values).len()
    }

    /// Whether no channel level has been applied yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of listeners watching a channel
    pub fn listener_count(&self, key: &ChannelKey) -> usize {
        self.listeners.count(&self.canonical_key(key))
    }

    fn apply_batch(&self, batch: Batch) {
        let changes: Vec<(ChannelKey, ChannelValue)> = batch
            .into_iter()
            .map(|(id, level)| (self.addressing.from_wire(id).key(), level))
            .collect();

        {
            let mut values = lock(&self.values);
            for (key, level) in &changes {
                values.insert(key.clone(), *level);
            }
        }

        tracing::debug!("Applied batch of {} channel(s)", changes.len());
        self.listeners.notify_all(changes);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(store: &ChannelStore, channel: ChannelRef) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let subscription = store.subscribe(channel.key(), move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, subscription)
    }

    #[tokio::test]
    async fn unknown_channels_read_as_zero() {
        let (store, _) = store();
        assert_eq!(store.get(&ch(5)), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn batch_is_applied_after_flush() {
        let (store, _) = store();
        store.ingest([ChannelLevel::new(5, 10), ChannelLevel::new(5, 99)]);
        assert_eq!(store.get(&ch(5)), 0);

        store.flush();
        assert_eq!(store.get(&ch(5)), 99);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_is_applied_after_the_quiet_window() {
        let (store, _) = store();
        store.ingest([ChannelLevel::new(7, 42)]);

        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        assert_eq!(store.get(&ch(7)), 42);
    }

    #[tokio::test]
    async fn listeners_only_hear_their_own_channel() {
        let (store, _) = store();
        let (five, _five_sub) = counting(&store, ch(5));

        set(&store, &[(6, 100)]);
        assert_eq!(five.load(Ordering::SeqCst), 0);

        set(&store, &[(5, 1)]);
        assert_eq!(five.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_notification_per_channel_per_batch() {
        let (store, _) = store();
        let (five, _five_sub) = counting(&store, ch(5));

        store.ingest((0..50).map(|level| ChannelLevel::new(5, level)));
        store.flush();
        assert_eq!(five.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(&ch(5)), 49);
    }

    #[tokio::test]
    async fn unsubscribe_before_a_scheduled_flush_is_terminal() {
        let (store, _) = store();
        let (five, subscription) = counting(&store, ch(5));

        store.ingest([ChannelLevel::new(5, 200)]);
        subscription.unsubscribe();
        store.flush();

        assert_eq!(five.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(&ch(5)), 200);
        assert_eq!(store.listener_count(&ch(5).key()), 0);
    }

    #[tokio::test]
    async fn unregistered_ids_are_still_recorded() {
        let (store, _) = store();
        set(&store, &[(9000, 3)]);
        assert_eq!(store.get(&ChannelRef::new(18, 296)), 3);
    }

    #[tokio::test]
    async fn refs_outside_the_scheme_read_back_what_they_write() {
        let (store, writer) = store();
        let below_first = ChannelRef::new(0, 5);
        let past_end = ChannelRef::new(1, 600);
        let (hits, _sub) = counting(&store, past_end);

        store.update(&below_first, 42);
        store.update(&past_end, 7);
        assert_eq!(writer.writes(), vec![(5, 42), (600, 7)]);

        // Server echoes the written wire ids
        set(&store, &[(5, 42), (600, 7)]);
        assert_eq!(store.get(&below_first), 42);
        assert_eq!(store.get(&past_end), 7);
        assert_eq!(store.get_key(&past_end.key()), 7);
        assert_eq!(store.canonical(&past_end), ChannelRef::new(2, 88));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(&past_end.key()), 1);
    }

    #[tokio::test]
    async fn writes_bypass_the_aggregator() {
        let (store, writer) = store();
        store.update(&ChannelRef::new(2, 1), 77);
        store.update(&ch(3), 4);

        assert_eq!(writer.writes(), vec![(513, 77), (3, 4)]);
        assert_eq!(store.get(&ch(3)), 0);
    }
}
