//! The per-user actor: owns a user's pending queue, in-flight set, and the
//! set of currently attached client sessions. Runs single-threaded; every
//! field here is touched only from [`User::run`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::ClientHandle;
use crate::task::{BoundedQueue, NotificationTask};

/// A read-only snapshot of a [`User`]'s state, used for introspection and
/// tests without reaching across the actor boundary.
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    pub name: String,
    pub queue_ids: Vec<u64>,
    pub in_flight_ids: Vec<u64>,
    pub client_identities: Vec<String>,
}

/// A cloneable front for sending events into a running [`User`] actor.
#[derive(Clone)]
pub struct UserHandle {
    name: String,
    msg_tx: mpsc::UnboundedSender<NotificationTask>,
    ack_tx: mpsc::UnboundedSender<u64>,
    join_tx: mpsc::UnboundedSender<Arc<dyn ClientHandle>>,
    leave_tx: mpsc::UnboundedSender<Arc<dyn ClientHandle>>,
    snapshot_tx: mpsc::UnboundedSender<oneshot::Sender<UserSnapshot>>,
}

impl UserHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hands a freshly constructed task to the actor. Never blocks the caller.
    pub fn dispatch(&self, task: NotificationTask) {
        let _ = self.msg_tx.send(task);
    }

    pub fn ack(&self, id: u64) {
        let _ = self.ack_tx.send(id);
    }

    pub fn join(&self, client: Arc<dyn ClientHandle>) {
        let _ = self.join_tx.send(client);
    }

    pub fn leave(&self, client: Arc<dyn ClientHandle>) {
        let _ = self.leave_tx.send(client);
    }

    /// Asks the actor for a point-in-time snapshot of its state.
    pub async fn snapshot(&self) -> Option<UserSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.snapshot_tx.send(tx).ok()?;
        rx.await.ok()
    }
}

struct User {
    name: String,
    queue: BoundedQueue,
    in_flight: BoundedQueue,
    clients: Vec<Arc<dyn ClientHandle>>,
    msg_rx: mpsc::UnboundedReceiver<NotificationTask>,
    ack_rx: mpsc::UnboundedReceiver<u64>,
    join_rx: mpsc::UnboundedReceiver<Arc<dyn ClientHandle>>,
    leave_rx: mpsc::UnboundedReceiver<Arc<dyn ClientHandle>>,
    snapshot_rx: mpsc::UnboundedReceiver<oneshot::Sender<UserSnapshot>>,
}

/// Spawns a new `User` actor and returns a handle to it. The actor runs
/// until every handle clone (and the task itself) is dropped.
pub fn spawn(name: String) -> UserHandle {
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let (join_tx, join_rx) = mpsc::unbounded_channel();
    let (leave_tx, leave_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();

    let user = User {
        name: name.clone(),
        queue: BoundedQueue::new(),
        in_flight: BoundedQueue::new(),
        clients: Vec::new(),
        msg_rx,
        ack_rx,
        join_rx,
        leave_rx,
        snapshot_rx,
    };
    tokio::spawn(user.run());

    UserHandle {
        name,
        msg_tx,
        ack_tx,
        join_tx,
        leave_tx,
        snapshot_tx,
    }
}

impl User {
    async fn run(mut self) {
        loop {
            tokio::select! {
                msg = self.msg_rx.recv() => match msg {
                    Some(task) => self.on_dispatch(task),
                    None => break,
                },
                id = self.ack_rx.recv() => match id {
                    Some(id) => self.on_ack(id),
                    None => break,
                },
                client = self.join_rx.recv() => match client {
                    Some(client) => self.on_join(client),
                    None => break,
                },
                client = self.leave_rx.recv() => match client {
                    Some(client) => self.on_leave(&client),
                    None => break,
                },
                reply = self.snapshot_rx.recv() => match reply {
                    Some(reply) => { let _ = reply.send(self.snapshot()); },
                    None => break,
                },
            }
        }
        debug!(user = %self.name, "user actor exiting");
    }

    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            name: self.name.clone(),
            queue_ids: self.queue.iter().map(|t| t.id).collect(),
            in_flight_ids: self.in_flight.iter().map(|t| t.id).collect(),
            client_identities: self.clients.iter().map(|c| c.identity().to_owned()).collect(),
        }
    }

    fn on_dispatch(&mut self, task: NotificationTask) {
        if self.clients.is_empty() {
            self.queue.push_bounded(task);
            return;
        }

        let mut sent = false;
        let mut failed = None;
        for client in &self.clients {
            if client.try_send(&task) {
                sent = true;
            } else {
                failed = Some(client.clone());
                break;
            }
        }

        if let Some(bad) = failed {
            warn!(user = %self.name, client = %bad.identity(), "client failed to keep up, evicting");
            self.deregister(&bad);
        }

        if sent {
            self.in_flight.push_bounded(task);
        } else {
            self.queue.push_bounded(task);
        }
    }

    fn on_ack(&mut self, id: u64) {
        if self.in_flight.remove_by_id(id).is_none() {
            debug!(user = %self.name, id, "ack for unknown or already-removed task, ignoring");
        }
    }

    fn on_join(&mut self, client: Arc<dyn ClientHandle>) {
        if self.clients.is_empty() {
            for task in self.in_flight.iter().chain(self.queue.iter()) {
                if !client.try_send(task) {
                    warn!(user = %self.name, client = %client.identity(), "newcomer can't keep up with backlog, dropping");
                    client.disconnect();
                    return;
                }
            }
            for task in self.queue.drain_all() {
                self.in_flight.push_bounded(task);
            }
        }

        info!(user = %self.name, client = %client.identity(), "client attached");
        self.clients.push(client.clone());
        client.hello();
    }

    fn on_leave(&mut self, client: &Arc<dyn ClientHandle>) {
        self.deregister(client);
    }

    fn deregister(&mut self, client: &Arc<dyn ClientHandle>) {
        self.clients.retain(|c| !Arc::ptr_eq(c, client));
        client.disconnect();
    }
}
