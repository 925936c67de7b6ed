//! PostgreSQL-backed `UserRepository`.
//!
//! Emails are unique through `users_email_key`. Deleting a user who still
//! teaches a course fails on the `courses.teacher_id` foreign key; their
//! enrollments and sessions cascade. Updates lock the user row so a role
//! change cannot interleave with a concurrent admission check.

use async_trait::async_trait;
use diesel::dsl::{Find, ForUpdate, Select};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{EmailAddress, PasswordDigest, Role, User, UserId};

use super::diesel_basic_error_mapping::{DieselFailure, classify, map_basic_pool_error};
use super::models::{NewUserRow, UserChangeset, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{courses, enrollments, sessions, users};
use super::search::like_pattern;

/// Diesel implementation of [`UserRepository`].
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    map_basic_pool_error(error, UserPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    match classify(&error) {
        DieselFailure::Connection(message) => UserPersistenceError::connection(message),
        DieselFailure::Query(message) => UserPersistenceError::query(message),
        DieselFailure::UniqueViolation => UserPersistenceError::query("unique constraint violated"),
        DieselFailure::ForeignKeyViolation => UserPersistenceError::owns_courses(),
    }
}

/// Result of the update transaction before it is mapped onto the port.
enum UpdateOutcome {
    Updated,
    Missing,
    OwnsCourses,
    HoldsEnrollments,
}

/// Current role of the user, locked until the transaction ends.
fn lock_role(id: Uuid) -> ForUpdate<Select<Find<users::table, Uuid>, users::role>> {
    users::table.find(id).select(users::role).for_update()
}

fn to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    row.into_user().map_err(UserPersistenceError::query)
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(
        &self,
        user: &User,
        digest: &PasswordDigest,
    ) -> Result<(), UserPersistenceError> {
        let row = NewUserRow::new(user, digest);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| match classify(&error) {
                DieselFailure::UniqueViolation => {
                    UserPersistenceError::duplicate_email(user.email().to_string())
                }
                _ => map_diesel_error(error),
            })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_user).transpose()
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(User, PasswordDigest)>, UserPersistenceError> {
        let email: &str = email.as_ref();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| row.split().map_err(UserPersistenceError::query))
            .transpose()
    }

    async fn search(
        &self,
        query: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rows = users::table
            .select(UserRow::as_select())
            .order_by((users::name, users::id))
            .into_boxed();
        if let Some(role) = role {
            rows = rows.filter(users::role.eq(role.as_str()));
        }
        if let Some(pattern) = like_pattern(query) {
            rows = rows.filter(
                users::name
                    .ilike(pattern.clone())
                    .or(users::email.ilike(pattern.clone()))
                    .or(users::student_code.ilike(pattern).assume_not_null()),
            );
        }
        let rows: Vec<UserRow> = rows.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(to_user).collect()
    }

    async fn update<'a>(
        &self,
        user: &User,
        digest: Option<&'a PasswordDigest>,
    ) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id: Uuid = *user.id().as_uuid();
        let role = user.role().as_str();
        let changes = UserChangeset::new(user);
        let digest = digest.map(PasswordDigest::as_str);

        let outcome = conn
            .transaction(|conn| {
                async move {
                    let current: Option<String> = lock_role(id)
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(current) = current else {
                        return Ok(UpdateOutcome::Missing);
                    };
                    let role_changed = current != role;
                    if role_changed {
                        let owned: i64 = courses::table
                            .filter(courses::teacher_id.eq(id))
                            .count()
                            .get_result(conn)
                            .await?;
                        if owned > 0 {
                            return Ok(UpdateOutcome::OwnsCourses);
                        }
                        let held: i64 = enrollments::table
                            .filter(enrollments::student_id.eq(id))
                            .count()
                            .get_result(conn)
                            .await?;
                        if held > 0 {
                            return Ok(UpdateOutcome::HoldsEnrollments);
                        }
                    }
                    diesel::update(users::table.find(id))
                        .set(&changes)
                        .execute(conn)
                        .await?;
                    if let Some(digest) = digest {
                        diesel::update(users::table.find(id))
                            .set(users::password_digest.eq(digest))
                            .execute(conn)
                            .await?;
                    }
                    if role_changed || digest.is_some() {
                        diesel::delete(sessions::table.filter(sessions::user_id.eq(id)))
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, diesel::result::Error>(UpdateOutcome::Updated)
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| match classify(&error) {
                DieselFailure::UniqueViolation => {
                    UserPersistenceError::duplicate_email(user.email().to_string())
                }
                _ => map_diesel_error(error),
            })?;

        match outcome {
            UpdateOutcome::Updated => Ok(true),
            UpdateOutcome::Missing => Ok(false),
            UpdateOutcome::OwnsCourses => Err(UserPersistenceError::owns_courses()),
            UpdateOutcome::HoldsEnrollments => Err(UserPersistenceError::holds_enrollments()),
        }
    }

    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(users::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }
}
