//! `GET /ws` — upgrades to the client subprotocol handled in [`crate::session`].

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::codec::MAX_MESSAGE_SIZE;
use crate::session;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| session::handle_socket(socket, state))
}
