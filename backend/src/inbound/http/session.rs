//! Bearer-token session extraction.
//!
//! Handlers take a [`SessionContext`] and call [`SessionContext::require_actor`]
//! to resolve the caller. A missing, malformed, or unknown token yields
//! `401 Unauthorized`; role checks inside the services yield `403`.

use std::sync::Arc;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};

use crate::domain::ports::AccountService;
use crate::domain::{Actor, Error, SessionToken};

use super::state::HttpState;

const BEARER: &str = "bearer";

/// Parse `Authorization: Bearer <token>`. The scheme is case-insensitive.
fn bearer_token(req: &HttpRequest) -> Option<SessionToken> {
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    SessionToken::parse(token)
}

/// Request-scoped view of the caller's bearer session.
#[derive(Clone)]
pub struct SessionContext {
    token: Option<SessionToken>,
    accounts: Arc<dyn AccountService>,
}

impl SessionContext {
    pub fn new(token: Option<SessionToken>, accounts: Arc<dyn AccountService>) -> Self {
        Self { token, accounts }
    }

    /// Presented token, if any.
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Require a presented token or return `401 Unauthorized`.
    pub fn require_token(&self) -> Result<SessionToken, Error> {
        self.token
            .clone()
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Resolve the authenticated actor or return `401 Unauthorized`.
    pub async fn require_actor(&self) -> Result<Actor, Error> {
        let token = self.require_token()?;
        self.accounts.authenticate(token).await
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .app_data::<web::Data<HttpState>>()
            .map(|state| Self::new(bearer_token(req), Arc::clone(&state.accounts)))
            .ok_or_else(|| Error::internal("HTTP state is not configured").into());
        ready(result)
    }
}
