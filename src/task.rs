//! Notification tasks and the bounded, drop-oldest queue they live in.

use std::collections::VecDeque;
use std::time::SystemTime;

use rand::Rng;

/// Bound shared by both `queue` and `in_flight` on every [`crate::user::User`].
pub const QUEUE_MAX: usize = 8;

/// A single dispatched notification, tracked from enqueue until ack or eviction.
#[derive(Debug, Clone)]
pub struct NotificationTask {
    pub id: u64,
    pub user: String,
    /// The already-serialized `notification` envelope to write to the wire.
    pub payload: String,
    pub sent_at: Option<SystemTime>,
}

impl NotificationTask {
    pub fn new(id: u64, user: impl Into<String>, payload: String) -> Self {
        NotificationTask {
            id,
            user: user.into(),
            payload,
            sent_at: None,
        }
    }
}

/// Draws a fresh random task id.
///
/// Collisions are vanishingly improbable at this scale and are not defended
/// against; an implementation may substitute a monotonic counter.
pub fn new_task_id() -> u64 {
    rand::thread_rng().gen()
}

/// A FIFO queue bounded at [`QUEUE_MAX`]; pushing past the bound drops the
/// oldest element.
#[derive(Debug, Default)]
pub struct BoundedQueue {
    items: VecDeque<NotificationTask>,
}

impl BoundedQueue {
    pub fn new() -> Self {
        BoundedQueue {
            items: VecDeque::with_capacity(QUEUE_MAX),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationTask> {
        self.items.iter()
    }

    /// Appends `task`, dropping the oldest entry first if already at capacity.
    pub fn push_bounded(&mut self, task: NotificationTask) {
        if self.items.len() >= QUEUE_MAX {
            self.items.pop_front();
        }
        self.items.push_back(task);
    }

    /// Removes and returns all items in FIFO order, leaving the queue empty.
    pub fn drain_all(&mut self) -> Vec<NotificationTask> {
        self.items.drain(..).collect()
    }

    /// Removes the first task matching `id`, if any.
    pub fn remove_by_id(&mut self, id: u64) -> Option<NotificationTask> {
        let pos = self.items.iter().position(|t| t.id == id)?;
        self.items.remove(pos)
    }
}
