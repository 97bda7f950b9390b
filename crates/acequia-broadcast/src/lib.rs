// In-process fan-out bus for accepted readings.
// The ingestion path publishes every accepted reading here; each live-stream
// connection holds one subscription, optionally filtered to a single channel.
use acequia_model::{ChannelId, Reading};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use slab::Slab;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

pub type Result<T> = std::result::Result<T, BusError>;

#[derive(thiserror::Error, Debug)]
pub enum BusError {
    #[error("subscriber queue capacity must be at least 1")]
    InvalidCapacity,
}

const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// One broadcast event: the channel it concerns plus the accepted reading.
#[derive(Debug, Clone)]
pub struct ReadingEvent {
    pub channel_id: ChannelId,
    pub reading: Arc<Reading>,
}

#[derive(Debug)]
struct SubscriberSlot {
    filter: Option<ChannelId>,
    sender: mpsc::Sender<ReadingEvent>,
}

#[derive(Debug, Clone)]
struct SubscriberEntry {
    id: usize,
    filter: Option<ChannelId>,
    sender: mpsc::Sender<ReadingEvent>,
}

#[derive(Debug)]
struct BusInner {
    // Snapshot used by the publish hot path: lock-free read, rebuilt only on
    // subscribe/unsubscribe.
    snapshot: ArcSwap<Vec<SubscriberEntry>>,
    // Registry mutated only on subscribe/unsubscribe paths.
    registry: Mutex<Slab<SubscriberSlot>>,
}

impl BusInner {
    fn remove_subscriber(&self, id: usize) {
        let mut registry = self.registry.lock();
        if registry.contains(id) {
            registry.remove(id);
            self.rebuild_snapshot(&registry);
        }
    }

    fn remove_subscribers(&self, ids: &[usize]) {
        let mut registry = self.registry.lock();
        let mut removed = false;
        for &id in ids {
            if registry.contains(id) {
                registry.remove(id);
                removed = true;
            }
        }
        if removed {
            self.rebuild_snapshot(&registry);
        }
    }

    fn rebuild_snapshot(&self, registry: &Slab<SubscriberSlot>) {
        let mut snapshot = Vec::with_capacity(registry.len());
        for (id, slot) in registry.iter() {
            snapshot.push(SubscriberEntry {
                id,
                filter: slot.filter.clone(),
                sender: slot.sender.clone(),
            });
        }
        metrics::gauge!("acequia_bus_subscribers").set(snapshot.len() as f64);
        self.snapshot.store(Arc::new(snapshot));
    }
}

/// RAII handle that unregisters a subscriber on drop. Dropping twice-removed
/// state is a no-op, so teardown stays idempotent even when disconnect and
/// error paths race.
#[derive(Debug)]
pub struct SubscriptionGuard {
    bus: Weak<BusInner>,
    subscriber_id: usize,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove_subscriber(self.subscriber_id);
        }
    }
}

/// Receiver plus its unsubscribe guard; dropping the subscription removes
/// the subscriber from the bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<ReadingEvent>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<ReadingEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<ReadingEvent, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Publish/subscribe bus scoped to the single "reading" event kind.
///
/// Each subscriber has a bounded queue and publish uses `try_reserve`, so a
/// slow consumer drops locally instead of stalling the ingestion path.
/// Subscribers registered after a publish do not receive it; the streaming
/// gateway covers that gap with its initial buffer snapshot.
#[derive(Debug)]
pub struct ReadingBus {
    inner: Arc<BusInner>,
    queue_capacity: usize,
}

impl Default for ReadingBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                snapshot: ArcSwap::from_pointee(Vec::new()),
                registry: Mutex::new(Slab::new()),
            }),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Override the per-subscriber queue depth. Zero is rejected.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BusError::InvalidCapacity);
        }
        self.queue_capacity = capacity;
        Ok(self)
    }

    /// Register a subscriber. `filter: None` receives every channel;
    /// `Some(id)` receives only that channel's readings.
    pub fn subscribe(&self, filter: Option<ChannelId>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let mut registry = self.inner.registry.lock();
        let id = registry.insert(SubscriberSlot {
            filter,
            sender: tx,
        });
        self.inner.rebuild_snapshot(&registry);
        drop(registry);
        Subscription {
            receiver: rx,
            _guard: SubscriptionGuard {
                bus: Arc::downgrade(&self.inner),
                subscriber_id: id,
            },
        }
    }

    /// Deliver a reading to every matching subscriber registered right now.
    ///
    /// Returns the number of queues the event was placed on. Full queues
    /// drop the event for that subscriber (counted, never blocking); closed
    /// receivers are pruned as a side effect.
    pub fn publish(&self, channel_id: &ChannelId, reading: Arc<Reading>) -> usize {
        let snapshot = self.inner.snapshot.load_full();
        let mut delivered = 0usize;
        let mut closed = Vec::new();
        for subscriber in snapshot.iter() {
            let matches = subscriber
                .filter
                .as_ref()
                .map_or(true, |filter| filter == channel_id);
            if !matches {
                continue;
            }
            match subscriber.sender.try_reserve() {
                Ok(permit) => {
                    permit.send(ReadingEvent {
                        channel_id: channel_id.clone(),
                        reading: Arc::clone(&reading),
                    });
                    delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(())) => {
                    metrics::counter!("acequia_bus_dropped_total").increment(1);
                }
                Err(mpsc::error::TrySendError::Closed(())) => {
                    closed.push(subscriber.id);
                }
            }
        }
        if !closed.is_empty() {
            closed.sort_unstable();
            closed.dedup();
            self.inner.remove_subscribers(&closed);
        }
        metrics::counter!("acequia_bus_delivered_total").increment(delivered as u64);
        delivered
    }

    /// Live subscriber count; used to verify teardown releases registrations.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().len()
    }
}
