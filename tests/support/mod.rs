//! Shared scaffolding for black-box integration tests: a live server bound
//! to an ephemeral port plus a thin WebSocket client.

use futures_util::{SinkExt, StreamExt};
use semrelay::codec::Envelope;
use semrelay::config::Config;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::MaybeTlsStream;

pub const PASSWORD: &str = "test-password";
pub const TOKEN: &str = "test-token";

pub struct TestServer {
    pub addr: std::net::SocketAddr,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn hook_url(&self) -> String {
        format!("http://{}/hook?token={}", self.addr, TOKEN)
    }
}

pub async fn start_server() -> TestServer {
    let config = Config {
        domain: None,
        password: PASSWORD.to_owned(),
        token: TOKEN.to_owned(),
        email: None,
        staging: false,
        http_only: true,
        port: 0,
        verbose: false,
        test_user: None,
    };
    let state = semrelay::AppState::new(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, semrelay::build_router(state))
            .await
            .unwrap();
    });
    TestServer { addr }
}

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A minimal WebSocket client speaking the relay's envelope subprotocol,
/// used in place of a real client implementation in tests.
pub struct WsTestClient {
    stream: WsStream,
}

impl WsTestClient {
    pub async fn connect(url: &str) -> Self {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await.unwrap();
        WsTestClient { stream }
    }

    pub async fn register(url: &str, user: &str, password: &str) -> Self {
        let mut client = Self::connect(url).await;
        client.send(&Envelope::make_registration(user, password)).await;
        client
    }

    pub async fn send(&mut self, env: &Envelope) {
        let text = env.to_json().unwrap();
        self.stream.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn ack(&mut self, id: u64) {
        self.send(&Envelope::make_ack(id)).await;
    }

    /// Reads the next non-control frame, skipping pings/pongs.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Envelope::from_json(&text).unwrap()),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return None,
            }
        }
    }

    /// Reads the next non-control frame with a short deadline, returning
    /// `None` on timeout rather than blocking forever.
    pub async fn try_recv(&mut self, timeout: std::time::Duration) -> Option<Envelope> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    pub async fn closed(&mut self) -> bool {
        matches!(
            tokio::time::timeout(std::time::Duration::from_millis(500), self.stream.next()).await,
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_)))
        )
    }
}

pub async fn post_webhook(url: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new().post(url).json(&body).send().await.unwrap()
}

pub fn webhook_body(user: &str) -> serde_json::Value {
    serde_json::json!({
        "revision": {"sender": {"login": user}},
        "repository": {"slug": "acme/widgets"},
        "pipeline": {"id": "pl-1", "result": "passed", "done_at": "2026-07-30T00:00:00Z"},
    })
}
