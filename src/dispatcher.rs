//! The dispatcher: a single registry actor mapping user names to `User`
//! actors, routing webhook dispatches and WebSocket registrations to them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::error;

use crate::client::ClientHandle;
use crate::codec::Envelope;
use crate::task::{new_task_id, NotificationTask};
use crate::user::{self, UserHandle};

/// Inbound channels are bounded at this capacity; bursts above it make the
/// HTTP webhook handler or the WebSocket upgrade briefly await a free slot.
const DISPATCHER_CHANNEL_CAPACITY: usize = 8;

struct JoinRequest {
    user: String,
    client: Arc<dyn ClientHandle>,
    reply: oneshot::Sender<UserHandle>,
}

struct DispatchRequest {
    user: String,
    payload: serde_json::Value,
}

/// A cloneable front for the dispatcher actor.
#[derive(Clone)]
pub struct DispatcherHandle {
    join_tx: mpsc::Sender<JoinRequest>,
    dispatch_tx: mpsc::Sender<DispatchRequest>,
}

impl DispatcherHandle {
    /// Registers `client` under `user`, creating the user's actor on first
    /// sight of that name. Returns the handle to that user's actor.
    pub async fn register(&self, user: String, client: Arc<dyn ClientHandle>) -> UserHandle {
        let (reply, reply_rx) = oneshot::channel();
        self.join_tx
            .send(JoinRequest { user, client, reply })
            .await
            .expect("dispatcher actor should not have exited");
        reply_rx
            .await
            .expect("dispatcher actor should always reply to a join")
    }

    /// Routes a webhook's extracted `(user, payload)` pair to that user's
    /// actor, creating it if this is the first notification for that user.
    pub async fn dispatch(&self, user: String, payload: serde_json::Value) {
        if self
            .dispatch_tx
            .send(DispatchRequest { user, payload })
            .await
            .is_err()
        {
            error!("dispatcher actor has exited, dropping dispatch");
        }
    }
}

struct Dispatcher {
    users: HashMap<String, UserHandle>,
    join_rx: mpsc::Receiver<JoinRequest>,
    dispatch_rx: mpsc::Receiver<DispatchRequest>,
}

/// Spawns the dispatcher actor and returns a handle to it. There is exactly
/// one of these per process.
pub fn spawn() -> DispatcherHandle {
    let (join_tx, join_rx) = mpsc::channel(DISPATCHER_CHANNEL_CAPACITY);
    let (dispatch_tx, dispatch_rx) = mpsc::channel(DISPATCHER_CHANNEL_CAPACITY);

    let dispatcher = Dispatcher {
        users: HashMap::new(),
        join_rx,
        dispatch_rx,
    };
    tokio::spawn(dispatcher.run());

    DispatcherHandle { join_tx, dispatch_tx }
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            tokio::select! {
                req = self.join_rx.recv() => match req {
                    Some(req) => self.on_join(req),
                    None => break,
                },
                req = self.dispatch_rx.recv() => match req {
                    Some(req) => self.on_dispatch(req),
                    None => break,
                },
            }
        }
    }

    fn user_handle(&mut self, name: &str) -> UserHandle {
        self.users
            .entry(name.to_owned())
            .or_insert_with(|| user::spawn(name.to_owned()))
            .clone()
    }

    fn on_join(&mut self, req: JoinRequest) {
        let user = self.user_handle(&req.user);
        user.join(req.client);
        let _ = req.reply.send(user);
    }

    fn on_dispatch(&mut self, req: DispatchRequest) {
        let user = self.user_handle(&req.user);
        let id = new_task_id();
        let envelope = Envelope::make_notification(id, req.payload);
        let payload = match envelope.to_json() {
            Ok(json) => json,
            Err(err) => {
                error!(error = %err, "failed to serialize notification envelope");
                return;
            }
        };
        user.dispatch(NotificationTask::new(id, req.user, payload));
    }
}
