//! The Dispatcher's bounded event queue.
//!
//! A plain `tokio::sync::mpsc` channel can't implement "drop the oldest
//! non-lifecycle event on overflow" — it only lets the producer refuse the
//! newest item. This queue is a small `Mutex<VecDeque>` + `Notify` instead,
//! so overflow can evict from the front while still treating
//! connect/disconnect transitions as undroppable lifecycle events.

use monitor_core::{Event, EventKind};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

fn is_lifecycle(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::SerialConnect
            | EventKind::SerialDisconnect
            | EventKind::BleConnect
            | EventKind::BleDisconnect
    )
}

pub struct EventQueue {
    inner: Mutex<VecDeque<Event>>,
    bound: usize,
    notify: Notify,
    next_seq: Mutex<u64>,
}

impl EventQueue {
    pub fn new(bound: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(VecDeque::with_capacity(bound.max(1))),
            bound: bound.max(1),
            notify: Notify::new(),
            next_seq: Mutex::new(0),
        })
    }

    /// Assigns the next monotonic sequence number and enqueues the event,
    /// applying back-pressure on overflow.
    pub fn push(&self, mut event: Event) {
        {
            let mut seq = self.next_seq.lock();
            event.seq = *seq;
            *seq += 1;
        }

        let mut queue = self.inner.lock();
        if queue.len() >= self.bound {
            if let Some(pos) = queue.iter().position(|e| !is_lifecycle(e.kind)) {
                queue.remove(pos);
                tracing::warn!("event queue full, dropped oldest non-lifecycle event");
            } else {
                tracing::warn!("event queue full of lifecycle events, dropping newest event");
                return;
            }
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    /// Waits for at least one event, then drains everything currently
    /// queued in arrival order.
    pub async fn drain(&self) -> Vec<Event> {
        loop {
            {
                let mut queue = self.inner.lock();
                if !queue.is_empty() {
                    return queue.drain(..).collect();
                }
            }
            self.notify.notified().await;
        }
    }
}
