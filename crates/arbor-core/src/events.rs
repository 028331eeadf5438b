//! Change notifications for node state.
//!
//! Control-thread changes are delivered to listeners immediately. Changes
//! made by the audio thread (a one-shot reaching its end) are queued on a
//! bounded lock-free channel and delivered by `dispatch_events`.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Capacity of the per-node audio-thread event queue.
const RT_QUEUE_CAPACITY: usize = 16;

/// Something observable changed on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    MuteChanged(bool),
    ActiveChanged(bool),
    ChannelsChanged { inputs: usize, outputs: usize },
    /// Content ran out during a block; the node deactivated itself.
    EndOfContent,
}

pub type Listener = Arc<dyn Fn(&NodeEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

pub(crate) struct EventHub {
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    rt_tx: Sender<NodeEvent>,
    rt_rx: Receiver<NodeEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (rt_tx, rt_rx) = crossbeam_channel::bounded(RT_QUEUE_CAPACITY);
        Self {
            listeners: Mutex::new(Vec::new()),
            rt_tx,
            rt_rx,
        }
    }

    pub(crate) fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Control thread only.
    pub(crate) fn emit(&self, event: NodeEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    /// Audio thread. Never blocks; drops the event if the queue is full.
    #[inline]
    pub(crate) fn post(&self, event: NodeEvent) {
        let _ = self.rt_tx.try_send(event);
    }

    pub(crate) fn dispatch(&self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rt_rx.try_recv() {
            self.emit(event);
            delivered += 1;
        }
        delivered
    }
}
