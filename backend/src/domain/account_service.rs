//! Account service: login, registration, bearer sessions, and the user
//! directory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::ports::{
    AccountService, AuthenticatedSession, SessionStore, UserDirectory, UserPersistenceError,
    UserRepository,
};
use crate::domain::service_support::require_role;
use crate::domain::{
    AccountUpdate, Actor, Error, LoginCredentials, NewAccount, PasswordDigest, Role, SessionToken,
    User, UserId,
};

fn map_user_write_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::DuplicateEmail { email } => Error::conflict(
            "duplicate_email",
            format!("email {email} is already registered"),
        ),
        UserPersistenceError::OwnsCourses => Error::conflict(
            "owns_courses",
            "reassign or delete this teacher's courses first",
        ),
        UserPersistenceError::HoldsEnrollments => Error::conflict(
            "holds_enrollments",
            "drop this student's enrollments before changing their role",
        ),
        other => Error::from(other),
    }
}

/// Service implementing [`AccountService`] and [`UserDirectory`].
#[derive(Clone)]
pub struct AccountDirectoryService<U, S> {
    users: Arc<U>,
    sessions: Arc<S>,
}

impl<U, S> AccountDirectoryService<U, S> {
    pub fn new(users: Arc<U>, sessions: Arc<S>) -> Self {
        Self { users, sessions }
    }
}

impl<U, S> AccountDirectoryService<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    async fn insert(&self, account: NewAccount) -> Result<User, Error> {
        let user = User::new(
            UserId::random(),
            account.name.clone(),
            account.email.clone(),
            account.profile.clone(),
        );
        self.users
            .create(&user, &account.digest()?)
            .await
            .map_err(map_user_write_error)?;
        info!(user_id = %user.id(), role = %user.role(), "account created");
        Ok(user)
    }

    async fn open_session(&self, user: User) -> Result<AuthenticatedSession, Error> {
        let token = SessionToken::generate();
        self.sessions
            .issue(&token, user.actor())
            .await
            .map_err(Error::from)?;
        Ok(AuthenticatedSession { token, user })
    }
}

#[async_trait]
impl<U, S> AccountService for AccountDirectoryService<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    async fn login(&self, credentials: LoginCredentials) -> Result<AuthenticatedSession, Error> {
        let found = self
            .users
            .find_credentials(credentials.email())
            .await
            .map_err(Error::from)?;
        let user = match found {
            Some((user, digest)) if digest.verify(credentials.password()) => user,
            _ => {
                warn!("login rejected");
                return Err(Error::unauthorized("invalid credentials"));
            }
        };
        info!(user_id = %user.id(), "login succeeded");
        self.open_session(user).await
    }

    async fn register(&self, account: NewAccount) -> Result<AuthenticatedSession, Error> {
        if account.profile.role() != Role::Student {
            return Err(Error::invalid_request(
                "self-registration creates student accounts only",
            ));
        }
        let user = self.insert(account).await?;
        self.open_session(user).await
    }

    async fn logout(&self, token: SessionToken) -> Result<(), Error> {
        self.sessions
            .revoke(&token)
            .await
            .map_err(Error::from)
    }

    async fn authenticate(&self, token: SessionToken) -> Result<Actor, Error> {
        self.sessions
            .resolve(&token)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::unauthorized("login required"))
    }
}

#[async_trait]
impl<U, S> UserDirectory for AccountDirectoryService<U, S>
where
    U: UserRepository,
    S: SessionStore,
{
    async fn search_students(&self, actor: Actor, query: String) -> Result<Vec<User>, Error> {
        require_role(&actor, &[Role::Teacher, Role::Admin], "search students")?;
        self.users
            .search(&query, Some(Role::Student))
            .await
            .map_err(Error::from)
    }

    async fn list_users(
        &self,
        actor: Actor,
        query: String,
        role: Option<Role>,
    ) -> Result<Vec<User>, Error> {
        require_role(&actor, &[Role::Admin], "list users")?;
        self.users.search(&query, role).await.map_err(Error::from)
    }

    async fn create_user(&self, actor: Actor, account: NewAccount) -> Result<User, Error> {
        require_role(&actor, &[Role::Admin], "create users")?;
        self.insert(account).await
    }

    async fn update_user(
        &self,
        actor: Actor,
        user_id: UserId,
        update: AccountUpdate,
    ) -> Result<User, Error> {
        require_role(&actor, &[Role::Admin], "update users")?;
        if actor.user_id == user_id && update.profile.role() != Role::Admin {
            return Err(Error::invalid_request("admins may not change their own role"));
        }
        let digest = update.digest()?;
        let resets_password = digest.is_some();
        let user = User::new(user_id, update.name, update.email, update.profile);
        let updated = self
            .users
            .update(&user, digest.as_ref())
            .await
            .map_err(map_user_write_error)?;
        if !updated {
            return Err(Error::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, role = user.role().as_str(), resets_password, "account updated");
        Ok(user)
    }

    async fn delete_user(&self, actor: Actor, user_id: UserId) -> Result<(), Error> {
        require_role(&actor, &[Role::Admin], "delete users")?;
        if actor.user_id == user_id {
            return Err(Error::invalid_request("admins may not delete themselves"));
        }
        let removed = self
            .users
            .delete(user_id)
            .await
            .map_err(map_user_write_error)?;
        if !removed {
            return Err(Error::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, "account deleted");
        Ok(())
    }
}

/// Ensures an administrator account exists at startup.
pub struct AdminBootstrap<U> {
    users: Arc<U>,
}

impl<U> AdminBootstrap<U>
where
    U: UserRepository,
{
    pub fn new(users: Arc<U>) -> Self {
        Self { users }
    }

    /// Create the account unless the email is already registered. Returns
    /// whether an account was created.
    pub async fn ensure(&self, account: NewAccount) -> Result<bool, Error> {
        let existing = self
            .users
            .find_credentials(&account.email)
            .await
            .map_err(Error::from)?;
        if existing.is_some() {
            return Ok(false);
        }
        let user = User::new(
            UserId::random(),
            account.name.clone(),
            account.email.clone(),
            account.profile.clone(),
        );
        let digest: PasswordDigest = account.digest()?;
        match self.users.create(&user, &digest).await {
            Ok(()) => {
                info!(user_id = %user.id(), "bootstrap administrator created");
                Ok(true)
            }
            Err(UserPersistenceError::DuplicateEmail { .. }) => Ok(false),
            Err(other) => Err(Error::from(other)),
        }
    }
}
