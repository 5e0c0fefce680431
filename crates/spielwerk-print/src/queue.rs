// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thread-safe FIFO with pause/resume, promotion and interruptible pop.
//
// One mutex guards the items and both flags; a single condition variable
// wakes poppers.  Each added item wakes at most one popper, and nothing
// wakes while paused.  Interruption is sticky
// until `clear_interrupt`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use spielwerk_core::error::{Result, SpielwerkError};

struct QueueInner<T> {
    /// Queued items, head first.
    items: VecDeque<T>,
    /// While set, `pop` blocks even when items are queued.
    paused: bool,
    /// While set, every `pop` fails with `Interrupted`.
    interrupted: bool,
}

/// A FIFO whose consumers can be held back and woken up.
///
/// Producers never block.  Consumers block in [`PausingQueue::pop`] until
/// an item is available and the queue is not paused, or until the queue is
/// interrupted.
pub struct PausingQueue<T> {
    inner: Mutex<QueueInner<T>>,
    /// Signalled when an item arrives, on resume and on interrupt.
    ready: Condvar,
}

impl<T> Default for PausingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PausingQueue<T> {
    /// An empty, running queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                paused: false,
                interrupted: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake_one(&self, inner: &QueueInner<T>) {
        if !inner.paused {
            self.ready.notify_one();
        }
    }

    /// Add `item` at the tail.
    pub fn push(&self, item: T) {
        let mut inner = self.lock();
        inner.items.push_back(item);
        self.wake_one(&inner);
    }

    /// Add every item at the tail, in order, waking one popper per item.
    pub fn append(&self, items: impl IntoIterator<Item = T>) {
        let mut inner = self.lock();
        let before = inner.items.len();
        inner.items.extend(items);
        if inner.paused {
            return;
        }
        for _ in before..inner.items.len() {
            self.ready.notify_one();
        }
    }

    /// Insert at `index`, clamped to the queue length.
    pub fn insert(&self, index: usize, item: T) {
        let mut inner = self.lock();
        let index = index.min(inner.items.len());
        inner.items.insert(index, item);
        self.wake_one(&inner);
    }

    /// Block until the queue is unpaused and non-empty, then take the head.
    pub fn pop(&self) -> Result<T> {
        let mut inner = self.lock();
        loop {
            if inner.interrupted {
                return Err(SpielwerkError::Interrupted);
            }
            if !inner.paused {
                if let Some(item) = inner.items.pop_front() {
                    return Ok(item);
                }
            }
            inner = self
                .ready
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// [`PausingQueue::pop`] with a deadline; `Ok(None)` on timeout.  A
    /// timeout too large to represent waits without a deadline.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.pop().map(Some);
        };
        let mut inner = self.lock();
        loop {
            if inner.interrupted {
                return Err(SpielwerkError::Interrupted);
            }
            if !inner.paused {
                if let Some(item) = inner.items.pop_front() {
                    return Ok(Some(item));
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            inner = self
                .ready
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Hold every popper.  Items can still be added.
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    /// Release the poppers held by [`PausingQueue::pause`].
    pub fn resume(&self) {
        self.lock().paused = false;
        self.ready.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// Wake every blocked popper with [`SpielwerkError::Interrupted`].
    pub fn interrupt(&self) {
        self.lock().interrupted = true;
        self.ready.notify_all();
    }

    /// Let `pop` block again after an [`PausingQueue::interrupt`].
    pub fn clear_interrupt(&self) {
        self.lock().interrupted = false;
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}

impl<T: PartialEq> PausingQueue<T> {
    /// Move `item` to the front.  Returns false if it is not queued.
    pub fn promote(&self, item: &T) -> bool {
        self.move_to(item, 0)
    }

    /// Move `item` to `index` (clamped).  Returns false if it is not queued.
    pub fn move_to(&self, item: &T, index: usize) -> bool {
        let mut inner = self.lock();
        let Some(pos) = inner.items.iter().position(|i| i == item) else {
            return false;
        };
        if let Some(taken) = inner.items.remove(pos) {
            let index = index.min(inner.items.len());
            inner.items.insert(index, taken);
        }
        true
    }

    /// Drop the first occurrence of `item`.  Returns false if it is not queued.
    pub fn remove(&self, item: &T) -> bool {
        let mut inner = self.lock();
        match inner.items.iter().position(|i| i == item) {
            Some(pos) => inner.items.remove(pos).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.lock().items.contains(item)
    }
}

impl<T: Clone> PausingQueue<T> {
    /// Current contents, head first.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order() {
        let queue = PausingQueue::new();
        queue.push('a');
        queue.push('b');
        queue.push('c');
        assert_eq!(queue.pop().expect("pop"), 'a');
        assert_eq!(queue.pop().expect("pop"), 'b');
        assert_eq!(queue.pop().expect("pop"), 'c');
    }

    #[test]
    fn promote_moves_to_front() {
        let queue = PausingQueue::new();
        queue.append(['a', 'b', 'c']);
        assert!(queue.promote(&'c'));
        assert_eq!(queue.snapshot(), vec!['c', 'a', 'b']);
        assert!(!queue.promote(&'z'));
    }

    #[test]
    fn insert_and_move_to_clamp() {
        let queue = PausingQueue::new();
        queue.append([1, 2]);
        queue.insert(99, 3);
        queue.insert(0, 0);
        assert_eq!(queue.snapshot(), vec![0, 1, 2, 3]);
        assert!(queue.move_to(&0, 10));
        assert_eq!(queue.snapshot(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn remove_and_contains() {
        let queue = PausingQueue::new();
        queue.append([1, 2, 3]);
        assert!(queue.remove(&2));
        assert!(!queue.remove(&2));
        assert!(!queue.contains(&2));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn paused_queue_holds_items() {
        let queue = PausingQueue::new();
        queue.push(1);
        queue.pause();
        assert!(queue.is_paused());
        assert_eq!(queue.pop_timeout(Duration::from_millis(50)).expect("pop"), None);
        queue.resume();
        assert_eq!(queue.pop_timeout(Duration::from_millis(50)).expect("pop"), Some(1));
    }

    #[test]
    fn resume_wakes_blocked_popper() {
        let queue = Arc::new(PausingQueue::new());
        queue.pause();
        let popper = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        queue.push(7);
        thread::sleep(Duration::from_millis(50));
        assert!(!popper.is_finished());
        queue.resume();
        assert_eq!(popper.join().expect("join").expect("pop"), 7);
    }

    #[test]
    fn push_wakes_blocked_popper() {
        let queue = Arc::new(PausingQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push("job");
        assert_eq!(popper.join().expect("join").expect("pop"), "job");
    }

    #[test]
    fn interrupt_wakes_all_poppers() {
        let queue: Arc<PausingQueue<u32>> = Arc::new(PausingQueue::new());
        let poppers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.interrupt();
        for popper in poppers {
            assert!(matches!(
                popper.join().expect("join"),
                Err(SpielwerkError::Interrupted)
            ));
        }
        queue.clear_interrupt();
        queue.push(1);
        assert_eq!(queue.pop().expect("pop after clear"), 1);
    }

    #[test]
    fn append_wakes_one_popper_per_item() {
        let queue: Arc<PausingQueue<u32>> = Arc::new(PausingQueue::new());
        let poppers: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop_timeout(Duration::from_secs(5)))
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        queue.append([1, 2, 3]);
        let mut got: Vec<u32> = poppers
            .into_iter()
            .map(|p| p.join().expect("join").expect("pop").expect("woken before timeout"))
            .collect();
        got.sort_unstable();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn huge_timeout_waits_without_deadline() {
        let queue = PausingQueue::new();
        queue.push(5);
        assert_eq!(queue.pop_timeout(Duration::MAX).expect("pop"), Some(5));

        let queue: Arc<PausingQueue<u32>> = Arc::new(PausingQueue::new());
        let popper = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_timeout(Duration::MAX))
        };
        thread::sleep(Duration::from_millis(20));
        queue.interrupt();
        assert!(matches!(
            popper.join().expect("join"),
            Err(SpielwerkError::Interrupted)
        ));
    }
}
