//! The narrow interface a [`crate::user::User`] actor uses to talk to a
//! connected WebSocket session, without knowing anything about sockets.

use std::fmt;

use crate::task::NotificationTask;

/// One attached WebSocket session, as seen by the dispatcher and user actors.
///
/// Implementations own the underlying socket and the outbound mailbox; the
/// relay core only ever calls these three methods.
pub trait ClientHandle: Send + Sync {
    /// Stable identity used to recognize this handle in `clients` lists.
    fn identity(&self) -> &str;

    /// Non-blocking enqueue of `task` onto this client's outbound mailbox.
    ///
    /// Returns `false` if the mailbox is full. A full mailbox means this
    /// client isn't keeping up; callers evict rather than retry.
    fn try_send(&self, task: &NotificationTask) -> bool;

    /// Closes the mailbox, which causes the writer loop to emit a Close
    /// frame and exit. Idempotent.
    fn disconnect(&self);

    /// Enqueues a `hello` envelope. Sent exactly once, right after a
    /// successful registration.
    fn hello(&self);
}

impl fmt::Debug for dyn ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientHandle({})", self.identity())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// An in-memory stand-in for a connection session, used by unit tests
    /// across `user` and `dispatcher`.
    pub struct FakeClient {
        identity: String,
        capacity: usize,
        mailbox: Mutex<Vec<String>>,
        hello_count: AtomicUsize,
        disconnected: AtomicBool,
    }

    impl FakeClient {
        pub fn new(identity: impl Into<String>, capacity: usize) -> Self {
            FakeClient {
                identity: identity.into(),
                capacity,
                mailbox: Mutex::new(Vec::new()),
                hello_count: AtomicUsize::new(0),
                disconnected: AtomicBool::new(false),
            }
        }

        pub fn received_ids(&self) -> Vec<u64> {
            self.mailbox
                .lock()
                .unwrap()
                .iter()
                .map(|payload| {
                    let env = crate::codec::Envelope::from_json(payload).unwrap();
                    env.id
                })
                .collect()
        }

        pub fn hello_count(&self) -> usize {
            self.hello_count.load(Ordering::SeqCst)
        }

        pub fn is_disconnected(&self) -> bool {
            self.disconnected.load(Ordering::SeqCst)
        }
    }

    impl ClientHandle for FakeClient {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn try_send(&self, task: &NotificationTask) -> bool {
            if self.disconnected.load(Ordering::SeqCst) {
                return false;
            }
            let mut mailbox = self.mailbox.lock().unwrap();
            if mailbox.len() >= self.capacity {
                return false;
            }
            mailbox.push(task.payload.clone());
            true
        }

        fn disconnect(&self) {
            self.disconnected.store(true, Ordering::SeqCst);
        }

        fn hello(&self) {
            self.hello_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
