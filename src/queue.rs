// Handoff buffer between the network receiver and the actuation loop
//
// This is a latest-pose control channel, not a message log: when the queue
// is full the oldest entry is evicted so the freshest intent always wins.
// Pops use a bounded wait so the consumer stays schedulable while idle.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::messages::PoseMessage;

/// Bounded FIFO of pose commands, safe to share between tasks.
pub struct CommandQueue {
    inner: Mutex<VecDeque<PoseMessage>>,
    available: Condvar,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "command queue needs room for at least one pose");
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue a pose. If the queue is at capacity the oldest entry is
    /// evicted and returned so the caller can log the drop.
    pub fn push(&self, msg: PoseMessage) -> Option<PoseMessage> {
        let mut queue = self.inner.lock().expect("command queue poisoned");
        let evicted = if queue.len() == self.capacity {
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(msg);
        drop(queue);
        self.available.notify_one();
        evicted
    }

    /// Dequeue the oldest pose, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<PoseMessage> {
        let queue = self.inner.lock().expect("command queue poisoned");
        let (mut queue, _) = self
            .available
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .expect("command queue poisoned");
        queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("command queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
