//! HTTP client for the registrar API and the dashboard reconciliation loop.
//!
//! - [`Session`] holds the bearer token explicitly; it is established by
//!   login or registration and cleared on logout.
//! - [`ApiClient`] speaks the JSON surface over reqwest and implements
//!   [`RegistrarGateway`].
//! - [`DashboardController`] re-fetches a role's whole dashboard after every
//!   mutation and keeps the last good snapshot when the re-fetch fails.

mod gateway;
mod http;
pub mod reconcile;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Actor, Error as ApiError, ErrorCode, User};

#[cfg(test)]
pub use gateway::MockRegistrarGateway;
pub use gateway::{CourseInput, NewUserInput, RegistrarGateway, UpdateUserInput};
pub use http::ApiClient;
pub use reconcile::{Dashboard, DashboardController, MutationReport};

/// Explicit client-side session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

/// Body returned by login and registration.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionPayload {
    pub token: String,
    pub user: User,
}

impl Session {
    /// A session for `token` and `user`.
    pub fn established(token: impl Into<String>, user: User) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub(crate) fn from_payload(payload: SessionPayload) -> Self {
        Self::established(payload.token, payload.user)
    }

    /// Forget the token and user.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn actor(&self) -> Option<Actor> {
        self.user.as_ref().map(User::actor)
    }

    pub fn is_established(&self) -> bool {
        self.token.is_some()
    }
}

/// Failures surfaced by the client. None are retried automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// A success response could not be decoded.
    #[error("invalid response body: {message}")]
    Decode { message: String },
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        error: Option<ApiError>,
    },
    /// The operation needs a session and none is established.
    #[error("login required")]
    NotLoggedIn,
}

impl ClientError {
    /// Server error code, when the body carried the standard envelope.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api {
                error: Some(error), ..
            } => Some(error.code()),
            _ => None,
        }
    }

    /// Conflict reason such as `capacity_exceeded`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Api {
                error: Some(error), ..
            } => error.reason(),
            _ => None,
        }
    }

    /// Transport and decode failures may succeed when re-issued.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Decode { .. })
    }

    /// Build an error from a non-success response. Absent or unparseable
    /// bodies are treated as empty.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let value: Option<Value> = serde_json::from_slice(body).ok();
        let message = value
            .as_ref()
            .and_then(|v| {
                ["error", "message"]
                    .into_iter()
                    .find_map(|key| v.get(key).and_then(Value::as_str))
            })
            .filter(|text| !text.trim().is_empty())
            .map_or_else(
                || format!("Request failed: {}", status.as_u16()),
                str::to_owned,
            );
        let error = value.and_then(|v| serde_json::from_value::<ApiError>(v).ok());
        Self::Api {
            status: status.as_u16(),
            message,
            error,
        }
    }
}
