//! Extracts just enough from an upstream CI webhook body to route it: the
//! sender's login. Everything else about the payload is opaque to the
//! relay core — a few extra fields are parsed best-effort purely to
//! enrich one log line.

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct Sender {
    #[serde(default)]
    login: String,
}

#[derive(Debug, Deserialize, Default)]
struct Revision {
    #[serde(default)]
    sender: Sender,
}

#[derive(Debug, Deserialize, Default)]
struct Repository {
    #[serde(default)]
    slug: String,
}

#[derive(Debug, Deserialize, Default)]
struct Pipeline {
    #[serde(default)]
    id: String,
    #[serde(default)]
    result: String,
    #[serde(default)]
    done_at: String,
}

#[derive(Debug, Deserialize, Default)]
struct Notification {
    #[serde(default)]
    revision: Revision,
    #[serde(default)]
    repository: Repository,
    #[serde(default)]
    pipeline: Pipeline,
}

/// The routing key plus a handful of fields worth a log line.
pub struct ExtractedWebhook {
    pub user: String,
    pub repository_slug: String,
    pub pipeline_id: String,
    pub pipeline_result: String,
    pub pipeline_done_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("no user in webhook message")]
    MissingUser,
}

/// Parses `body` and extracts the routing key (`revision.sender.login`).
/// Fails only if the body isn't JSON or the login is empty — every other
/// field is best-effort.
pub fn extract(body: &[u8]) -> Result<ExtractedWebhook, WebhookError> {
    let parsed: Notification = serde_json::from_slice(body)?;
    if parsed.revision.sender.login.is_empty() {
        return Err(WebhookError::MissingUser);
    }
    Ok(ExtractedWebhook {
        user: parsed.revision.sender.login,
        repository_slug: parsed.repository.slug,
        pipeline_id: parsed.pipeline.id,
        pipeline_result: parsed.pipeline.result,
        pipeline_done_at: parsed.pipeline.done_at,
    })
}
