//! Port abstraction for user account persistence adapters and their errors.

use async_trait::async_trait;

use crate::domain::{EmailAddress, PasswordDigest, Role, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError for "user repository" {
        /// Another account already uses this email.
        DuplicateEmail { email: String } => "email {email} is already registered",
        /// The user still owns courses and cannot be removed or change role.
        OwnsCourses => "user still owns courses",
        /// The student still holds enrollments and cannot change role.
        HoldsEnrollments => "user still holds enrollments",
    }
}

/// User account storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account with its password digest.
    async fn create(&self, user: &User, digest: &PasswordDigest)
    -> Result<(), UserPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch a user and stored digest by login email.
    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(User, PasswordDigest)>, UserPersistenceError>;

    /// Users matching `query` on name, email, or student code, optionally
    /// restricted to one role, ordered by name.
    async fn search(
        &self,
        query: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>, UserPersistenceError>;

    /// Replace an account's name, email, and profile, and its digest when
    /// one is given. A role change is refused while the user teaches a
    /// course or holds an enrollment. A role change or a password reset
    /// revokes the user's sessions. Returns `false` when the account does
    /// not exist.
    async fn update<'a>(
        &self,
        user: &User,
        digest: Option<&'a PasswordDigest>,
    ) -> Result<bool, UserPersistenceError>;

    /// Delete an account along with its enrollments and sessions. Returns
    /// `false` when the account does not exist.
    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError>;
}
