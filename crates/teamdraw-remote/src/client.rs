// Roster service client over HTTP.
//
// Every request carries the session's bearer credential. Responses use the
// `{ success, player | players | message }` envelope; statuses and envelope
// failures are mapped onto `ServiceError` so the remote adapter never sees
// HTTP details.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

use teamdraw_core::error::ServiceError;
use teamdraw_core::persistence::{PlayerPatch, RemotePlayer, RosterService};
use teamdraw_core::session::Session;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    player: Option<RemotePlayer>,
    #[serde(default)]
    players: Option<Vec<RemotePlayer>>,
    #[serde(default)]
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// HttpRosterService
// ---------------------------------------------------------------------------

/// `RosterService` backed by the REST roster API rooted at `base_url`.
pub struct HttpRosterService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRosterService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn list_request(&self, session: &Session) -> RequestBuilder {
        self.http
            .get(self.url(&format!("players/{}", session.account_id)))
            .bearer_auth(&session.credential)
    }

    fn create_request(&self, session: &Session, name: &str, level: u8) -> RequestBuilder {
        self.http
            .post(self.url("players"))
            .bearer_auth(&session.credential)
            .json(&serde_json::json!({ "name": name, "level": level }))
    }

    fn update_request(&self, session: &Session, id: i64, patch: &PlayerPatch) -> RequestBuilder {
        self.http
            .patch(self.url(&format!("players/update/{id}")))
            .bearer_auth(&session.credential)
            .json(patch)
    }

    fn delete_request(&self, session: &Session, id: i64) -> RequestBuilder {
        self.http
            .delete(self.url(&format!("players/update/{id}")))
            .bearer_auth(&session.credential)
    }

    /// Send the request and read the envelope. Connection and body-read
    /// failures are `Transport`; everything after is `interpret`'s job.
    async fn send(&self, request: RequestBuilder) -> Result<Envelope, ServiceError> {
        let response = request.send().await.map_err(|e| {
            warn!("Roster service request failed: {e}");
            ServiceError::Transport(e.to_string())
        })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        debug!(status, "Roster service responded");
        interpret(status, &body)
    }
}

#[async_trait]
impl RosterService for HttpRosterService {
    async fn list_players(&self, session: &Session) -> Result<Vec<RemotePlayer>, ServiceError> {
        debug!("GET players for account {}", session.account_id);
        let envelope = self.send(self.list_request(session)).await?;
        envelope
            .players
            .ok_or_else(|| ServiceError::Decode("response has no `players` field".into()))
    }

    async fn create_player(
        &self,
        session: &Session,
        name: &str,
        level: u8,
    ) -> Result<RemotePlayer, ServiceError> {
        debug!("POST player {name:?} level {level}");
        let envelope = self.send(self.create_request(session, name, level)).await?;
        expect_player(envelope)
    }

    async fn update_player(
        &self,
        session: &Session,
        id: i64,
        patch: &PlayerPatch,
    ) -> Result<RemotePlayer, ServiceError> {
        debug!("PATCH player {id} with {patch:?}");
        let envelope = self.send(self.update_request(session, id, patch)).await?;
        expect_player(envelope)
    }

    async fn delete_player(&self, session: &Session, id: i64) -> Result<(), ServiceError> {
        debug!("DELETE player {id}");
        let envelope = self.send(self.delete_request(session, id)).await?;
        if let Some(message) = envelope.message {
            debug!("Delete confirmed: {message}");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

/// Map a status code and raw body onto an envelope or a typed failure.
fn interpret(status: u16, body: &str) -> Result<Envelope, ServiceError> {
    match status {
        401 => return Err(ServiceError::Unauthorized),
        404 => return Err(ServiceError::NotFound),
        200..=299 => {}
        _ => {
            return Err(ServiceError::Server {
                status,
                message: error_message(body),
            })
        }
    }

    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ServiceError::Decode(format!("invalid response body: {e}")))?;
    if !envelope.success {
        return Err(ServiceError::Server {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| "request was not successful".into()),
        });
    }
    Ok(envelope)
}

fn expect_player(envelope: Envelope) -> Result<RemotePlayer, ServiceError> {
    envelope
        .player
        .ok_or_else(|| ServiceError::Decode("response has no `player` field".into()))
}

/// Pull a human-readable message out of an error body: the envelope's
/// `message` when present, otherwise the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
