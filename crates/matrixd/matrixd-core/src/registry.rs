//! Fan-out of accepted frames to subscribers.
//!
//! Subscribers register a `crossbeam_channel::Sender<Frame>` under a caller
//! chosen id. Ids are not required to be unique; removal takes the first
//! match in registration order.
//!
//! # Locking
//! The subscriber list has its own mutex, separate from the controller's
//! display state. `broadcast` copies the list under the lock and sends on
//! the copy, so `add` and `remove` from other threads never wait on a slow
//! subscriber. A subscriber removed while a broadcast is in flight may still
//! receive that one frame.
//!
//! # Delivery
//! See [`DeliveryPolicy`]. Under the default blocking policy a subscriber
//! that stops draining its channel stalls the control loop.

use crossbeam_channel::{Sender, TrySendError};
use matrixd_frame::Frame;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// How `broadcast` hands a frame to each subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Blocking send. Every subscriber gets every frame; a full or
    /// unbuffered channel holds up the broadcast until it is drained.
    #[default]
    Blocking,
    /// `try_send`. A subscriber whose channel is full misses that frame.
    DropWhenFull,
}

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Frames skipped because a channel was full (`DropWhenFull` only).
    pub dropped: usize,
    /// Subscribers removed because their receiver was gone.
    pub pruned: usize,
}

#[derive(Clone)]
struct Observer {
    id: String,
    tx: Sender<Frame>,
}

pub struct ObserverRegistry {
    observers: Mutex<Vec<Observer>>,
    policy: DeliveryPolicy,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new(DeliveryPolicy::default())
    }
}

impl ObserverRegistry {
    pub fn new(policy: DeliveryPolicy) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            policy,
        }
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Appends a subscriber. Duplicate ids are allowed.
    pub fn add(&self, id: impl Into<String>, tx: Sender<Frame>) {
        let id = id.into();
        info!(observer = %id, "add observer");
        self.lock().push(Observer { id, tx });
    }

    /// Removes the first subscriber registered under `id`.
    ///
    /// Returns `false`, leaving the list untouched, when nothing matches.
    pub fn remove(&self, id: &str) -> bool {
        let mut observers = self.lock();
        match observers.iter().position(|o| o.id == id) {
            Some(index) => {
                observers.remove(index);
                info!(observer = %id, "remove observer");
                true
            }
            None => {
                debug!(observer = %id, "remove: no such observer");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Subscriber ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.lock().iter().map(|o| o.id.clone()).collect()
    }

    /// Sends `frame` to every subscriber in registration order.
    ///
    /// May block under [`DeliveryPolicy::Blocking`]; see the module docs.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let targets = self.lock().clone();
        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            return report;
        }

        let mut gone: Vec<Sender<Frame>> = Vec::new();
        for observer in &targets {
            let disconnected = match self.policy {
                DeliveryPolicy::Blocking => observer.tx.send(*frame).is_err(),
                DeliveryPolicy::DropWhenFull => match observer.tx.try_send(*frame) {
                    Ok(()) => false,
                    Err(TrySendError::Full(_)) => {
                        debug!(observer = %observer.id, "observer channel full, frame dropped");
                        report.dropped += 1;
                        continue;
                    }
                    Err(TrySendError::Disconnected(_)) => true,
                },
            };

            if disconnected {
                info!(observer = %observer.id, "observer disconnected, pruning");
                gone.push(observer.tx.clone());
            } else {
                report.delivered += 1;
            }
        }

        if !gone.is_empty() {
            // Match on the channel, not the id: ids may repeat.
            self.lock()
                .retain(|o| !gone.iter().any(|tx| tx.same_channel(&o.tx)));
            report.pruned = gone.len();
        }
        report
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Observer>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{RecvTimeoutError, bounded, unbounded};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn broadcast_without_subscribers_is_a_no_op() {
        let registry = ObserverRegistry::default();

        let report = registry.broadcast(&Frame::filled(1, 2, 3));

        assert_eq!(report, BroadcastReport::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn every_subscriber_gets_the_same_frame() {
        let registry = ObserverRegistry::default();
        let receivers: Vec<_> = (0..4)
            .map(|n| {
                let (tx, rx) = unbounded();
                registry.add(format!("obs-{n}"), tx);
                rx
            })
            .collect();
        let frame = Frame::from_fn(|row, col| (row as u8, col as u8, 7));

        let report = registry.broadcast(&frame);

        assert_eq!(report.delivered, 4);
        for rx in &receivers {
            assert_eq!(rx.try_recv(), Ok(frame));
        }
    }

    #[test]
    fn delivery_follows_registration_order() {
        // Rendezvous channels make the broadcast wait on each subscriber in
        // turn, so the second one can't see the frame before the first.
        let registry = std::sync::Arc::new(ObserverRegistry::default());
        let (tx_a, rx_a) = bounded(0);
        let (tx_b, rx_b) = bounded(0);
        registry.add("a", tx_a);
        registry.add("b", tx_b);
        assert_eq!(registry.ids(), ["a", "b"]);

        let frame = Frame::filled(9, 9, 9);
        let worker = {
            let registry = registry.clone();
            thread::spawn(move || registry.broadcast(&frame))
        };

        assert_eq!(
            rx_b.recv_timeout(Duration::from_millis(100)),
            Err(RecvTimeoutError::Timeout),
            "b must not be served while a is still pending"
        );
        assert_eq!(rx_a.recv_timeout(Duration::from_secs(5)), Ok(frame));
        assert_eq!(rx_b.recv_timeout(Duration::from_secs(5)), Ok(frame));
        assert_eq!(worker.join().unwrap().delivered, 2);
    }

    #[test]
    fn blocking_broadcast_stalls_on_a_full_subscriber() {
        let registry = std::sync::Arc::new(ObserverRegistry::default());
        let (tx, rx) = bounded(1);
        registry.add("slow", tx);
        registry.broadcast(&Frame::blank());

        let (done_tx, done_rx) = bounded(1);
        let worker = {
            let registry = registry.clone();
            thread::spawn(move || {
                registry.broadcast(&Frame::filled(1, 1, 1));
                let _ = done_tx.send(());
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());
        // The registry stays usable for other callers while the broadcast waits.
        registry.add("late", unbounded().0);
        assert_eq!(registry.len(), 2);

        assert_eq!(rx.recv(), Ok(Frame::blank()));
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
        worker.join().unwrap();
    }

    #[test]
    fn drop_when_full_skips_instead_of_blocking() {
        let registry = ObserverRegistry::new(DeliveryPolicy::DropWhenFull);
        let (tx_full, rx_full) = bounded(1);
        let (tx_free, rx_free) = unbounded();
        registry.add("full", tx_full);
        registry.add("free", tx_free);

        registry.broadcast(&Frame::blank());
        let report = registry.broadcast(&Frame::filled(5, 5, 5));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(rx_full.len(), 1);
        assert_eq!(rx_free.len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn policy_is_fixed_at_construction() {
        assert_eq!(ObserverRegistry::default().policy(), DeliveryPolicy::Blocking);

        let registry = ObserverRegistry::new(DeliveryPolicy::DropWhenFull);
        registry.add("a", unbounded().0);
        registry.broadcast(&Frame::blank());
        assert_eq!(registry.policy(), DeliveryPolicy::DropWhenFull);
    }

    #[test]
    fn add_then_remove_leaves_nobody() {
        let registry = ObserverRegistry::default();
        let (tx, rx) = unbounded();
        registry.add("a", tx);

        assert!(registry.remove("a"));
        assert!(registry.is_empty());

        let report = registry.broadcast(&Frame::filled(1, 1, 1));
        assert_eq!(report.delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn removing_an_unknown_id_changes_nothing() {
        let registry = ObserverRegistry::default();
        registry.add("a", unbounded().0);
        let (tx_b, _rx_b) = unbounded();
        let (tx_c, _rx_c) = unbounded();
        registry.add("b", tx_b);
        registry.add("c", tx_c);

        assert!(!registry.remove("zzz"));
        assert_eq!(registry.ids(), ["a", "b", "c"]);
    }

    #[test]
    fn removing_from_an_empty_registry_is_a_no_op() {
        let registry = ObserverRegistry::default();
        assert!(!registry.remove("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_ids_are_removed_one_at_a_time() {
        let registry = ObserverRegistry::default();
        let (tx_first, rx_first) = unbounded();
        let (tx_second, rx_second) = unbounded();
        registry.add("dup", tx_first);
        registry.add("other", unbounded().0);
        registry.add("dup", tx_second);

        assert!(registry.remove("dup"));
        assert_eq!(registry.ids(), ["other", "dup"]);

        registry.broadcast(&Frame::blank());
        assert!(rx_first.try_recv().is_err());
        assert_eq!(rx_second.try_recv(), Ok(Frame::blank()));
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let registry = ObserverRegistry::default();
        let (tx_gone, rx_gone) = unbounded();
        let (tx_live, rx_live) = unbounded();
        registry.add("gone", tx_gone);
        registry.add("live", tx_live);
        drop(rx_gone);

        let report = registry.broadcast(&Frame::blank());

        assert_eq!(report.delivered, 1);
        assert_eq!(report.pruned, 1);
        assert_eq!(registry.ids(), ["live"]);
        assert_eq!(rx_live.len(), 1);
    }
}
