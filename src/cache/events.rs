use std::sync::Arc;
use tokio::sync::mpsc;

use crate::model::Task;

/// Change notification emitted by [`LocalCache`](super::LocalCache).
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    /// The whole snapshot was replaced or merged; carries the full new state
    BulkUpdated(Vec<Task>),
    Added(Task),
    Updated(Task),
    Deleted(String),
}

impl CacheEvent {
    /// Id of the single task concerned, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            CacheEvent::BulkUpdated(_) => None,
            CacheEvent::Added(task) | CacheEvent::Updated(task) => Some(&task.id),
            CacheEvent::Deleted(id) => Some(id),
        }
    }
}

/// Observer of cache changes.
///
/// Callbacks run synchronously on the mutating thread, after the mutation is
/// visible. They may read and mutate the cache; an event raised from inside a
/// callback is delivered to every listener once the current event has been
/// handled, so all listeners observe events in mutation order.
pub trait CacheListener: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

impl<F> CacheListener for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}

/// Forwards cache events into an unbounded channel for async consumers.
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<CacheEvent>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { sender: tx }), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl CacheListener for ChannelListener {
    fn on_event(&self, event: &CacheEvent) {
        // Receiver gone means the consumer has shut down.
        let _ = self.sender.send(event.clone());
    }
}

pub(super) fn same_listener(a: &Arc<dyn CacheListener>, b: &Arc<dyn CacheListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
