use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde_json::Value;
use tokio::sync::mpsc;

static NEXT_ORIGIN: AtomicU64 = AtomicU64::new(1);

/// Identity of the window a message was posted from.
///
/// Listeners compare it against their own origin so that messages relayed
/// from other frames sharing the channel stay inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextOrigin(u64);

impl ContextOrigin {
    /// Allocates an origin distinct from every other one in this process.
    pub fn unique() -> Self {
        Self(NEXT_ORIGIN.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// One message on the channel: untyped data plus the posting origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: ContextOrigin,
    pub data: Value,
}

impl Envelope {
    pub fn new(origin: ContextOrigin, data: Value) -> Self {
        Self { origin, data }
    }
}

pub type MessageFilter = Box<dyn Fn(&Envelope) -> bool + Send + Sync>;

/// Unaddressed broadcast channel.
pub trait MessageBus: Send + Sync {
    /// Delivers `envelope` to every subscriber whose filter accepts it.
    fn publish(&self, envelope: Envelope);

    /// Registers `filter`; matching messages queue on the returned handle
    /// until it is dropped or [`Subscription::unsubscribe`] is called.
    fn subscribe(&self, filter: MessageFilter) -> Subscription;
}

/// Receiving end of a bus subscription. Dropping it unsubscribes.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Envelope>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Envelope>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Waits for the next matching message. Returns `None` once the bus
    /// is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

struct Subscriber {
    filter: MessageFilter,
    tx: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
struct LocalBusInner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl LocalBusInner {
    fn remove(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// In-process bus. Cloning shares the same channel.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<LocalBusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, envelope: Envelope) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|_, subscriber| !subscriber.tx.is_closed());
        for subscriber in subscribers.values() {
            if (subscriber.filter)(&envelope) {
                let _ = subscriber.tx.send(envelope.clone());
            }
        }
    }

    fn subscribe(&self, filter: MessageFilter) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Subscriber { filter, tx });

        let inner: Weak<LocalBusInner> = Arc::downgrade(&self.inner);
        Subscription::new(rx, move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove(id);
            }
        })
    }
}
