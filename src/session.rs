//! One connection session per WebSocket: owns the socket, implements
//! [`ClientHandle`] for the user actor, and runs the reader/writer pumps
//! described in the protocol state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::ClientHandle;
use crate::codec::{Envelope, EnvelopeType};
use crate::state::AppState;
use crate::task::NotificationTask;

/// Time allowed to write a message to the peer.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);
/// Time allowed to wait for the next frame (reset on every successful read).
pub const PONG_WAIT: Duration = Duration::from_secs(60);
/// Ping cadence; must be comfortably under `PONG_WAIT`.
pub const PING_PERIOD: Duration = Duration::from_secs(54);

/// Capacity of a session's outbound mailbox. Once full, the client is
/// considered unable to keep up and is evicted rather than blocked on.
const OUTBOUND_MAILBOX_CAPACITY: usize = 32;

/// The [`ClientHandle`] implementation backing one live WebSocket session.
///
/// `mailbox` doubles as the disconnect signal: `disconnect()` drops the
/// sender half, which makes the writer pump's next `recv()` return `None`
/// so it can emit a Close frame and exit.
struct WsClient {
    identity: String,
    mailbox: Mutex<Option<mpsc::Sender<String>>>,
    closed: AtomicBool,
}

impl ClientHandle for WsClient {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn try_send(&self, task: &NotificationTask) -> bool {
        let guard = self.mailbox.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.try_send(task.payload.clone()).is_ok(),
            None => false,
        }
    }

    fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mailbox.lock().unwrap().take();
    }

    fn hello(&self) {
        let Ok(json) = Envelope::make_hello().to_json() else {
            return;
        };
        let guard = self.mailbox.lock().unwrap();
        if let Some(tx) = guard.as_ref() {
            let _ = tx.try_send(json);
        }
    }
}

/// Drives one upgraded WebSocket end to end: authenticates, registers with
/// the dispatcher, then pumps notifications out and acks in until either
/// side closes or the connection goes quiet.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let registration = match await_registration(&mut stream).await {
        Some(env) => env,
        None => {
            let _ = sink.close().await;
            return;
        }
    };

    let fields = match registration.registration_fields() {
        Ok(f) if !f.user.is_empty() && f.password == state.config.password => f,
        Ok(f) if f.user.is_empty() => {
            info!("registration rejected: empty user");
            let _ = sink.close().await;
            return;
        }
        Ok(_) => {
            info!("registration rejected: bad password");
            let _ = sink.close().await;
            return;
        }
        Err(err) => {
            info!(error = %err, "registration rejected: malformed payload");
            let _ = sink.close().await;
            return;
        }
    };

    let identity = Uuid::new_v4().to_string();
    let (mailbox_tx, mut mailbox_rx) = mpsc::channel(OUTBOUND_MAILBOX_CAPACITY);
    let client: Arc<dyn ClientHandle> = Arc::new(WsClient {
        identity: identity.clone(),
        mailbox: Mutex::new(Some(mailbox_tx)),
        closed: AtomicBool::new(false),
    });

    let user = state
        .dispatcher
        .register(fields.user.clone(), client.clone())
        .await;
    info!(user = %fields.user, client = %identity, "session authenticated");

    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_PERIOD);
        ping_interval.tick().await;
        loop {
            tokio::select! {
                msg = mailbox_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if tokio::time::timeout(WRITE_WAIT, sink.send(Message::Text(text))).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            let _ = tokio::time::timeout(WRITE_WAIT, sink.send(Message::Close(None))).await;
                            break;
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    if tokio::time::timeout(WRITE_WAIT, sink.send(Message::Ping(Vec::new()))).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    loop {
        match tokio::time::timeout(PONG_WAIT, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match Envelope::from_json(&text) {
                Ok(env) if env.kind == EnvelopeType::Ack => user.ack(env.id),
                Ok(_) => {
                    warn!(client = %identity, "unexpected message type after authentication, closing");
                    break;
                }
                Err(err) => {
                    warn!(client = %identity, error = %err, "malformed frame, closing");
                    break;
                }
            },
            Ok(Some(Ok(Message::Pong(_) | Message::Ping(_)))) => {}
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                info!(client = %identity, "client closed connection");
                break;
            }
            Ok(Some(Ok(Message::Binary(_)))) => {
                warn!(client = %identity, "binary frames are not supported, closing");
                break;
            }
            Ok(Some(Err(err))) => {
                warn!(client = %identity, error = %err, "transport error, closing");
                break;
            }
            Err(_) => {
                warn!(client = %identity, "read timed out, closing");
                break;
            }
        }
    }

    user.leave(client.clone());
    client.disconnect();
    writer.abort();
}

/// Reads the first frame off `stream` and returns it as an [`Envelope`],
/// provided it parses and is a `registration` message. Anything else —
/// malformed JSON, a non-registration message, a timeout, or a closed
/// stream — is treated as an authentication failure.
async fn await_registration(
    stream: &mut (impl futures_util::Stream<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<Envelope> {
    let msg = tokio::time::timeout(PONG_WAIT, stream.next()).await.ok()??;
    let Message::Text(text) = msg.ok()? else {
        return None;
    };
    let env = Envelope::from_json(&text).ok()?;
    if env.kind != EnvelopeType::Registration {
        return None;
    }
    Some(env)
}
