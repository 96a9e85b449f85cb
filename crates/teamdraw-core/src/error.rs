// Error types for roster mutations and the remote roster service.

use thiserror::Error;

use crate::draw::DrawError;
use crate::player::{PlayerId, ValidationError};

/// Typed failure returned by a [`RosterService`](crate::persistence::remote::RosterService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The credential was rejected (expired or invalid).
    #[error("credential rejected by roster service")]
    Unauthorized,

    #[error("player not found on roster service")]
    NotFound,

    #[error("roster service error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("could not reach roster service: {0}")]
    Transport(String),

    #[error("unexpected response from roster service: {0}")]
    Decode(String),
}

/// Outcome of a failed roster operation. Every variant leaves the in-memory
/// roster exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no player with id {0}")]
    NotFound(PlayerId),

    #[error(transparent)]
    Draw(#[from] DrawError),

    /// The session was rejected or revoked. The controller has already
    /// dropped back to anonymous mode by the time the caller sees this.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Network or server failure. Not retried.
    #[error("roster service unavailable: {0}")]
    Service(ServiceError),

    #[error("this operation requires an authenticated session")]
    NotAuthenticated,

    /// The local write-through failed; the change was not applied.
    #[error("could not save roster locally: {0}")]
    Storage(String),
}

impl RosterError {
    /// Whether this error should force the session back to anonymous mode.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, RosterError::SessionExpired)
    }
}

impl From<ServiceError> for RosterError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthorized => RosterError::SessionExpired,
            other => RosterError::Service(other),
        }
    }
}
