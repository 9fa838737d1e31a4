//! Bounded delivery of committed transitions to observers.

use crate::config::NotifyPolicy;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Record of one committed transition.
///
/// `is_last` marks the terminal record published by `Machine::stop`; it has
/// `from == to` and no cause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateChange<S, E> {
    pub from: S,
    pub to: S,
    pub cause: Option<E>,
    pub is_last: bool,
    /// Position in commit order, starting at 1.
    pub seq: u64,
    pub committed_at: DateTime<Utc>,
}

/// Outcome of publishing one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Sent,
    Dropped,
}

/// How long `Subscription::recv` holds the shared receiver before letting
/// other clones in.
const RECV_SLICE: Duration = Duration::from_millis(20);

struct Shared<S, E> {
    receiver: Mutex<Receiver<StateChange<S, E>>>,
    finished: AtomicBool,
}

/// Producer side, owned by the machine. Also owns the receiving end, so
/// the channel stays open for as long as the machine exists.
pub(crate) struct Notifier<S, E> {
    sender: SyncSender<StateChange<S, E>>,
    shared: Arc<Shared<S, E>>,
    policy: NotifyPolicy,
    dropped: AtomicU64,
}

impl<S, E> Notifier<S, E> {
    pub(crate) fn new(capacity: usize, policy: NotifyPolicy) -> Self {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        Self {
            sender,
            shared: Arc::new(Shared {
                receiver: Mutex::new(receiver),
                finished: AtomicBool::new(false),
            }),
            policy,
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn subscribe(&self) -> Subscription<S, E> {
        Subscription {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Publish following the configured policy.
    pub(crate) fn publish(&self, change: StateChange<S, E>) -> Delivery {
        match self.policy {
            NotifyPolicy::Block => self.publish_blocking(change),
            NotifyPolicy::DropWhenFull => match self.sender.try_send(change) {
                Ok(()) => Delivery::Sent,
                Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    Delivery::Dropped
                }
            },
        }
    }

    /// Publish the terminal record. It is never dropped: `Block` waits for
    /// room, `DropWhenFull` evicts the oldest queued records instead.
    pub(crate) fn publish_terminal(&self, change: StateChange<S, E>) -> Delivery {
        match self.policy {
            NotifyPolicy::Block => self.publish_blocking(change),
            NotifyPolicy::DropWhenFull => {
                let mut change = change;
                loop {
                    match self.sender.try_send(change) {
                        Ok(()) => return Delivery::Sent,
                        Err(TrySendError::Full(back)) => {
                            change = back;
                            self.evict_oldest();
                        }
                        Err(TrySendError::Disconnected(_)) => return Delivery::Dropped,
                    }
                }
            }
        }
    }

    fn evict_oldest(&self) {
        match self.shared.receiver.try_lock() {
            Some(receiver) => {
                if receiver.try_recv().is_ok() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            // A reader holds the receiver and is about to take a record.
            None => thread::yield_now(),
        }
    }

    fn publish_blocking(&self, change: StateChange<S, E>) -> Delivery {
        match self.sender.send(change) {
            Ok(()) => Delivery::Sent,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
        }
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Read-only handle to a machine's transition notifications.
///
/// Clones share one queue: each record goes to exactly one reader. Once
/// any clone has received the terminal record, every clone returns `None`.
pub struct Subscription<S, E> {
    shared: Arc<Shared<S, E>>,
}

impl<S, E> Clone for Subscription<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, E> Subscription<S, E> {
    /// Whether the terminal record has been received.
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    fn observe(&self, change: StateChange<S, E>) -> StateChange<S, E> {
        if change.is_last {
            self.shared.finished.store(true, Ordering::Release);
        }
        change
    }

    /// Block until the next record arrives.
    ///
    /// Waits in short slices and releases the receiver between them, so
    /// other clones can still poll.
    pub fn recv(&self) -> Option<StateChange<S, E>> {
        loop {
            if self.is_finished() {
                return None;
            }
            let receiver = self.shared.receiver.lock();
            // Another clone may have taken the terminal record while we waited.
            if self.is_finished() {
                return None;
            }
            match receiver.recv_timeout(RECV_SLICE) {
                Ok(change) => return Some(self.observe(change)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Next record if one is queued. Returns `None` without waiting when
    /// another clone is reading.
    pub fn try_recv(&self) -> Option<StateChange<S, E>> {
        if self.is_finished() {
            return None;
        }
        let receiver = self.shared.receiver.try_lock()?;
        receiver.try_recv().ok().map(|change| self.observe(change))
    }

    /// Wait up to `timeout` for the next record, including any time spent
    /// waiting for another clone to release the receiver.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<StateChange<S, E>> {
        if self.is_finished() {
            return None;
        }
        let deadline = Instant::now() + timeout;
        let receiver = self.shared.receiver.try_lock_for(timeout)?;
        if self.is_finished() {
            return None;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(remaining) {
            Ok(change) => Some(self.observe(change)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every record currently queued, without blocking.
    pub fn drain(&self) -> Vec<StateChange<S, E>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Yields records up to and including the terminal one.
impl<S, E> Iterator for Subscription<S, E> {
    type Item = StateChange<S, E>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(seq: u64, is_last: bool) -> StateChange<u8, u8> {
        StateChange {
            from: 0,
            to: 1,
            cause: (!is_last).then_some(9),
            is_last,
            seq,
            committed_at: Utc::now(),
        }
    }

    #[test]
    fn delivers_in_publish_order() {
        let notifier = Notifier::new(4, NotifyPolicy::Block);
        for seq in 1..=3 {
            assert_eq!(notifier.publish(change(seq, false)), Delivery::Sent);
        }

        let seqs: Vec<u64> = notifier.subscribe().drain().iter().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn drop_policy_counts_overflow() {
        let notifier = Notifier::new(1, NotifyPolicy::DropWhenFull);
        let subscription = notifier.subscribe();
        assert_eq!(notifier.publish(change(1, false)), Delivery::Sent);
        assert_eq!(notifier.publish(change(2, false)), Delivery::Dropped);
        assert_eq!(notifier.dropped(), 1);

        assert_eq!(subscription.try_recv().map(|c| c.seq), Some(1));
        assert!(subscription.try_recv().is_none());
    }

    #[test]
    fn terminal_record_evicts_under_drop_policy() {
        let notifier = Notifier::new(2, NotifyPolicy::DropWhenFull);
        notifier.publish(change(1, false));
        notifier.publish(change(2, false));

        assert_eq!(notifier.publish_terminal(change(3, true)), Delivery::Sent);
        assert_eq!(notifier.dropped(), 1);

        let seqs: Vec<u64> = notifier.subscribe().map(|c| c.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn terminal_record_finishes_every_clone() {
        let notifier = Notifier::new(4, NotifyPolicy::Block);
        let subscription = notifier.subscribe();
        let other = subscription.clone();
        notifier.publish(change(1, false));
        notifier.publish_terminal(change(2, true));

        let all: Vec<_> = subscription.clone().collect();
        assert_eq!(all.len(), 2);
        assert!(all[1].is_last);

        assert!(other.is_finished());
        assert!(other.recv().is_none());
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn polling_clones_are_not_held_up_by_a_blocked_reader() {
        let notifier = Notifier::new(1, NotifyPolicy::Block);
        let waiting = notifier.subscribe();
        let polling = waiting.clone();

        let reader = thread::spawn(move || waiting.recv().map(|c| c.seq));
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        assert!(polling.try_recv().is_none());
        assert!(polling.recv_timeout(Duration::from_millis(30)).is_none());
        assert!(started.elapsed() < Duration::from_secs(1));

        notifier.publish(change(7, false));
        assert_eq!(reader.join().unwrap(), Some(7));
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let notifier = Notifier::<u8, u8>::new(1, NotifyPolicy::Block);
        assert!(notifier
            .subscribe()
            .recv_timeout(Duration::from_millis(10))
            .is_none());
    }
}
