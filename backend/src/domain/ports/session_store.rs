//! Port for bearer session storage.

use async_trait::async_trait;

use crate::domain::{Actor, SessionToken};

use super::define_port_error;

define_port_error! {
    /// Errors raised by session store adapters.
    pub enum SessionStoreError for "session store" {}
}

/// Maps opaque bearer tokens to the identity they authenticate.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a new session.
    async fn issue(&self, token: &SessionToken, actor: Actor) -> Result<(), SessionStoreError>;

    /// Identity bound to `token`, if the session is live.
    async fn resolve(&self, token: &SessionToken) -> Result<Option<Actor>, SessionStoreError>;

    /// End a session. Unknown tokens are ignored.
    async fn revoke(&self, token: &SessionToken) -> Result<(), SessionStoreError>;
}
