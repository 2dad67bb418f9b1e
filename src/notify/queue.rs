//! Bounded notification queue with a background delivery worker

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{format_signal_message, Notifier};
use crate::core::{ScanError, Signal};

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// What `push` does when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest pending message
    #[default]
    DropOldest,
    /// Wait for the worker to make room
    Block,
}

impl FromStr for OverflowPolicy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            "block" => Ok(OverflowPolicy::Block),
            other => Err(ScanError::config(format!("unknown overflow policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// Enqueued after evicting the oldest pending message
    DroppedOldest,
    /// Queue already shut down; message discarded
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// FIFO buffer with a hard capacity
#[derive(Debug)]
pub struct BoundedBuffer {
    items: VecDeque<String>,
    capacity: usize,
}

impl BoundedBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append, evicting the oldest entry when full
    pub fn push_evicting(&mut self, message: String) -> PushOutcome {
        let outcome = if self.is_full() {
            self.items.pop_front();
            PushOutcome::DroppedOldest
        } else {
            PushOutcome::Enqueued
        };
        self.items.push_back(message);
        outcome
    }

    pub fn pop(&mut self) -> Option<String> {
        self.items.pop_front()
    }
}

struct State {
    buffer: BoundedBuffer,
    closed: bool,
    stats: QueueStats,
}

struct Shared {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// Decouples scanning from delivery: producers push rendered messages, one
/// worker thread sends them in order.
pub struct NotificationQueue {
    shared: Arc<Shared>,
    policy: OverflowPolicy,
    worker: Option<JoinHandle<()>>,
}

impl NotificationQueue {
    pub fn start<N: Notifier>(notifier: N, capacity: usize, policy: OverflowPolicy) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                buffer: BoundedBuffer::new(capacity),
                closed: false,
                stats: QueueStats::default(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("notify-{}", notifier.name()))
            .spawn(move || run_worker(worker_shared, notifier))
            .ok();

        if worker.is_none() {
            tracing::error!("Failed to spawn notification worker; messages will be dropped");
            shared.state.lock().closed = true;
        }

        Self {
            shared,
            policy,
            worker,
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn push(&self, message: String) -> PushOutcome {
        let mut state = self.shared.state.lock();

        if self.policy == OverflowPolicy::Block {
            while state.buffer.is_full() && !state.closed {
                self.shared.not_full.wait(&mut state);
            }
        }
        if state.closed {
            return PushOutcome::Closed;
        }

        let outcome = state.buffer.push_evicting(message);
        if outcome == PushOutcome::DroppedOldest {
            state.stats.dropped += 1;
            tracing::warn!("Notification queue full, dropped oldest message");
        }
        drop(state);

        self.shared.not_empty.notify_one();
        outcome
    }

    pub fn notify_signal(&self, signal: &Signal) -> PushOutcome {
        self.push(format_signal_message(signal))
    }

    /// Messages waiting for delivery
    pub fn pending(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.state.lock().stats
    }

    /// Stop accepting messages, deliver what is pending, join the worker
    pub fn shutdown(mut self) -> QueueStats {
        self.close_and_join();
        self.stats()
    }

    fn close_and_join(&mut self) {
        self.shared.state.lock().closed = true;
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("Notification worker panicked");
            }
        }
    }
}

impl Drop for NotificationQueue {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

fn run_worker<N: Notifier>(shared: Arc<Shared>, notifier: N) {
    loop {
        let message = {
            let mut state = shared.state.lock();
            while state.buffer.is_empty() && !state.closed {
                shared.not_empty.wait(&mut state);
            }
            match state.buffer.pop() {
                Some(m) => m,
                // Closed and drained
                None => break,
            }
        };
        shared.not_full.notify_one();

        let result = notifier.send(&message);

        let mut state = shared.state.lock();
        match result {
            Ok(()) => state.stats.delivered += 1,
            Err(e) => {
                state.stats.failed += 1;
                tracing::warn!(notifier = notifier.name(), "Notification failed: {}", e);
            }
        }
    }
    tracing::debug!(notifier = notifier.name(), "Notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScanResult;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recording {
        sent: Arc<Mutex<Vec<String>>>,
        delay: Option<Duration>,
    }

    impl Notifier for Recording {
        fn send(&self, message: &str) -> ScanResult<()> {
            if let Some(d) = self.delay {
                thread::sleep(d);
            }
            self.sent.lock().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    struct Failing;

    impl Notifier for Failing {
        fn send(&self, _message: &str) -> ScanResult<()> {
            Err(ScanError::notification("down"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_delivers_in_order_and_drains_on_shutdown() {
        let notifier = Recording::default();
        let sent = Arc::clone(&notifier.sent);
        let queue = NotificationQueue::start(notifier, 8, OverflowPolicy::DropOldest);

        for i in 0..5 {
            assert_eq!(queue.push(format!("m{i}")), PushOutcome::Enqueued);
        }
        let stats = queue.shutdown();

        assert_eq!(stats.delivered, 5);
        assert_eq!(*sent.lock(), vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_buffer_drops_oldest() {
        let mut buffer = BoundedBuffer::new(2);
        assert_eq!(buffer.push_evicting("a".into()), PushOutcome::Enqueued);
        assert_eq!(buffer.push_evicting("b".into()), PushOutcome::Enqueued);
        assert_eq!(buffer.push_evicting("c".into()), PushOutcome::DroppedOldest);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pop().as_deref(), Some("b"));
        assert_eq!(buffer.pop().as_deref(), Some("c"));
        assert!(buffer.pop().is_none());

        // Zero capacity is clamped to one slot
        assert!(!BoundedBuffer::new(0).is_full());
    }

    #[test]
    fn test_block_policy_loses_nothing() {
        let notifier = Recording {
            delay: Some(Duration::from_millis(5)),
            ..Default::default()
        };
        let sent = Arc::clone(&notifier.sent);
        let queue = NotificationQueue::start(notifier, 1, OverflowPolicy::Block);

        for i in 0..6 {
            assert_ne!(queue.push(format!("m{i}")), PushOutcome::DroppedOldest);
        }
        let stats = queue.shutdown();

        assert_eq!(stats.delivered, 6);
        assert_eq!(stats.dropped, 0);
        assert_eq!(sent.lock().len(), 6);
    }

    #[test]
    fn test_failures_are_counted_not_fatal() {
        let queue = NotificationQueue::start(Failing, 4, OverflowPolicy::DropOldest);
        queue.push("x".into());
        queue.push("y".into());
        let stats = queue.shutdown();

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn test_overflow_policy_parsing() {
        assert_eq!("block".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::Block);
        assert_eq!("drop-oldest".parse::<OverflowPolicy>().unwrap(), OverflowPolicy::DropOldest);
        assert!("newest".parse::<OverflowPolicy>().is_err());
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
    }
}
