//! Single-slot mailbox between the camera callback thread and the render thread.
//!
//! Only the most recent frame is kept. Submitting while a frame is still queued
//! drops (and so releases) the older one; the consumer never sees a backlog.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

struct Slot<T> {
    frame: Option<T>,
    shutdown: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub submitted: u64,
    pub replaced: u64,
    pub delivered: u64,
}

pub struct FrameRelay<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
    submitted: AtomicU64,
    replaced: AtomicU64,
    delivered: AtomicU64,
}

impl<T> Default for FrameRelay<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameRelay<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: None,
                shutdown: false,
            }),
            ready: Condvar::new(),
            submitted: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    /// Installs `frame` as the latest one and wakes the consumer.
    ///
    /// Returns `true` if an unconsumed frame was replaced. After shutdown the
    /// frame is released immediately, nothing is queued and nothing counted.
    pub fn submit(&self, frame: T) -> bool {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.shutdown {
                drop(slot);
                drop(frame);
                return false;
            }
            self.submitted.fetch_add(1, Ordering::Relaxed);
            let previous = slot.frame.replace(frame);
            self.ready.notify_one();
            previous
        };

        // release the superseded frame outside the lock
        match previous {
            Some(old) => {
                self.replaced.fetch_add(1, Ordering::Relaxed);
                drop(old);
                trace!("Replaced unconsumed frame");
                true
            }
            None => false,
        }
    }

    /// Blocks until a frame is queued or the relay is shut down.
    ///
    /// Returns `None` once shut down, even if woken with a frame pending.
    pub fn take(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        loop {
            if slot.shutdown {
                return None;
            }
            if let Some(frame) = slot.frame.take() {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                return Some(frame);
            }
            self.ready.wait(&mut slot);
        }
    }

    pub fn try_take(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        if slot.shutdown {
            return None;
        }
        let frame = slot.frame.take();
        if frame.is_some() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Wakes every waiter and releases any queued frame. Idempotent.
    pub fn shutdown(&self) {
        let pending = {
            let mut slot = self.slot.lock();
            slot.shutdown = true;
            self.ready.notify_all();
            slot.frame.take()
        };
        drop(pending);
    }

    pub fn is_shutdown(&self) -> bool {
        self.slot.lock().shutdown
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    use super::*;

    struct Tracked {
        id: u32,
        released: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(id: u32, released: &Arc<AtomicUsize>) -> Tracked {
        Tracked {
            id,
            released: released.clone(),
        }
    }

    #[test]
    fn second_submit_releases_first() {
        let relay = FrameRelay::new();
        let released = Arc::new(AtomicUsize::new(0));

        assert!(!relay.submit(tracked(1, &released)));
        assert!(relay.submit(tracked(2, &released)));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let frame = relay.try_take().unwrap();
        assert_eq!(frame.id, 2);
        assert!(relay.try_take().is_none());
        drop(frame);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn take_blocks_until_submit() {
        let relay = Arc::new(FrameRelay::<Tracked>::new());
        let released = Arc::new(AtomicUsize::new(0));

        let consumer = {
            let relay = relay.clone();
            thread::spawn(move || relay.take().map(|f| f.id))
        };
        thread::sleep(Duration::from_millis(50));
        relay.submit(tracked(7, &released));

        assert_eq!(consumer.join().unwrap(), Some(7));
    }

    #[test]
    fn shutdown_unblocks_waiter() {
        let relay: Arc<FrameRelay<Tracked>> = Arc::new(FrameRelay::new());
        let consumer = {
            let relay = relay.clone();
            thread::spawn(move || relay.take().is_none())
        };
        thread::sleep(Duration::from_millis(50));
        relay.shutdown();

        assert!(consumer.join().unwrap());
        assert!(relay.take().is_none());
    }

    #[test]
    fn shutdown_releases_pending_and_later_submits() {
        let relay = FrameRelay::new();
        let released = Arc::new(AtomicUsize::new(0));

        relay.submit(tracked(1, &released));
        relay.shutdown();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        assert!(!relay.submit(tracked(2, &released)));
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(relay.is_shutdown());
        assert_eq!(relay.stats().submitted, 1);
    }

    #[test]
    fn ten_rapid_submits_keep_only_the_last() {
        let relay = FrameRelay::new();
        let released = Arc::new(AtomicUsize::new(0));

        for id in 0..10 {
            relay.submit(tracked(id, &released));
        }
        assert_eq!(released.load(Ordering::SeqCst), 9);

        let frame = relay.try_take().unwrap();
        assert_eq!(frame.id, 9);
        assert!(relay.try_take().is_none());
        drop(frame);

        assert_eq!(released.load(Ordering::SeqCst), 10);
        assert_eq!(
            relay.stats(),
            RelayStats {
                submitted: 10,
                replaced: 9,
                delivered: 1,
            }
        );
    }

    #[test]
    fn stats_count_each_path() {
        let relay = FrameRelay::new();
        relay.submit(1u32);
        relay.submit(2);
        relay.submit(3);
        relay.try_take();

        assert_eq!(
            relay.stats(),
            RelayStats {
                submitted: 3,
                replaced: 2,
                delivered: 1,
            }
        );
    }
}
