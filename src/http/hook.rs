//! `POST /hook` — the webhook ingress. Token-gated, then handed to the
//! dispatcher for fan-out to whichever user the payload names.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::http::response::bad_request;
use crate::state::AppState;
use crate::webhook;

pub async fn hook_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let token = params.get("token").map(String::as_str).unwrap_or("");
    if token != state.config.token {
        return bad_request("invalid or missing token").into_response();
    }

    let extracted = match webhook::extract(&body) {
        Ok(extracted) => extracted,
        Err(err) => return bad_request(err.to_string()).into_response(),
    };

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => return bad_request(err.to_string()).into_response(),
    };

    tracing::info!(
        user = %extracted.user,
        repository = %extracted.repository_slug,
        pipeline = %extracted.pipeline_id,
        result = %extracted.pipeline_result,
        "webhook received"
    );

    state.dispatcher.dispatch(extracted.user, payload).await;

    (StatusCode::OK, "Roger\n").into_response()
}
