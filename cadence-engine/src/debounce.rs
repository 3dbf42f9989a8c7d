//! Per-key debouncing
//!
//! A key becomes due once its quiet period has elapsed without another
//! `touch`. Touching a pending key restarts its timer.

use futures::StreamExt;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio_util::time::{delay_queue, DelayQueue};

pub struct Debouncer<K> {
    quiet_period: Duration,
    queue: DelayQueue<K>,
    pending: HashMap<K, delay_queue::Key>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            queue: DelayQueue::new(),
            pending: HashMap::new(),
        }
    }

    /// Schedule `key`, or push back its deadline if already scheduled
    pub fn touch(&mut self, key: K) {
        match self.pending.get(&key) {
            Some(queue_key) => self.queue.reset(queue_key, self.quiet_period),
            None => {
                let queue_key = self.queue.insert(key.clone(), self.quiet_period);
                self.pending.insert(key, queue_key);
            }
        }
    }

    /// Drop `key` without it ever becoming due
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(queue_key) => {
                self.queue.remove(&queue_key);
                true
            }
            None => false,
        }
    }

    /// Next key whose quiet period elapsed
    ///
    /// Resolves to `None` immediately when nothing is pending; callers in a
    /// `select!` loop guard the branch with [`Debouncer::is_empty`].
    pub async fn next_due(&mut self) -> Option<K> {
        let expired = self.queue.next().await?;
        let key = expired.into_inner();
        self.pending.remove(&key);
        Some(key)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_key_due_after_quiet_period() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));
        let start = Instant::now();
        debouncer.touch("a.rs");

        assert_eq!(debouncer.next_due().await, Some("a.rs"));
        assert!(Instant::now() - start >= Duration::from_millis(1500));
        assert!(debouncer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_restarts_timer() {
        let mut debouncer = Debouncer::new(Duration::from_millis(1500));
        let start = Instant::now();
        debouncer.touch("a.rs");
        advance(Duration::from_millis(1000)).await;
        debouncer.touch("a.rs");
        assert_eq!(debouncer.len(), 1);

        assert_eq!(debouncer.next_due().await, Some("a.rs"));
        assert!(Instant::now() - start >= Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.touch("a");
        advance(Duration::from_millis(50)).await;
        debouncer.touch("b");

        assert_eq!(debouncer.next_due().await, Some("a"));
        assert!(debouncer.is_pending(&"b"));
        assert_eq!(debouncer.next_due().await, Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_removes_key() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.touch("a");
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        assert!(debouncer.is_empty());
        assert_eq!(debouncer.next_due().await, None);
    }
}
