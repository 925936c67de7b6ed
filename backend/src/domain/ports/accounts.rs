//! Driving ports for authentication and the user directory.
//!
//! Inbound adapters authenticate through [`AccountService`] without knowing
//! where credentials or sessions are stored, so handler tests can substitute
//! a mock.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AccountUpdate, Actor, Error, LoginCredentials, NewAccount, Role, SessionToken, User, UserId,
};

/// A freshly established session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedSession {
    #[schema(value_type = String)]
    #[serde(serialize_with = "serialize_token")]
    pub token: SessionToken,
    pub user: User,
}

fn serialize_token<S>(token: &SessionToken, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(token.as_str())
}

/// Login, registration, and session resolution.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Verify credentials and open a session.
    async fn login(&self, credentials: LoginCredentials) -> Result<AuthenticatedSession, Error>;

    /// Create a student account and open a session for it.
    async fn register(&self, account: NewAccount) -> Result<AuthenticatedSession, Error>;

    /// Close a session.
    async fn logout(&self, token: SessionToken) -> Result<(), Error>;

    /// Identity bound to a bearer token. Unknown tokens yield `Unauthorized`.
    async fn authenticate(&self, token: SessionToken) -> Result<Actor, Error>;
}

/// User directory use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Students matching `query`; teachers and admins only.
    async fn search_students(&self, actor: Actor, query: String) -> Result<Vec<User>, Error>;

    /// Users matching `query`, optionally filtered by role; admins only.
    async fn list_users(
        &self,
        actor: Actor,
        query: String,
        role: Option<Role>,
    ) -> Result<Vec<User>, Error>;

    /// Create an account of any role; admins only.
    async fn create_user(&self, actor: Actor, account: NewAccount) -> Result<User, Error>;

    /// Replace an account's attributes; admins only. A role change is refused
    /// while the user still teaches courses or holds seats, and an admin may
    /// not change their own role.
    async fn update_user(
        &self,
        actor: Actor,
        user_id: UserId,
        update: AccountUpdate,
    ) -> Result<User, Error>;

    /// Delete an account; admins only and never their own.
    async fn delete_user(&self, actor: Actor, user_id: UserId) -> Result<(), Error>;
}
