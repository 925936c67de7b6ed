//! PostgreSQL-backed bearer session store.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{SessionStore, SessionStoreError};
use crate::domain::{Actor, SessionToken};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewSessionRow, SessionRow};
use super::pool::{DbPool, PoolError};
use super::schema::sessions;

/// Diesel implementation of [`SessionStore`].
#[derive(Clone)]
pub struct DieselSessionStore {
    pool: DbPool,
}

impl DieselSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SessionStoreError {
    map_basic_pool_error(error, SessionStoreError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> SessionStoreError {
    map_basic_diesel_error(error, SessionStoreError::query, SessionStoreError::connection)
}

#[async_trait]
impl SessionStore for DieselSessionStore {
    async fn issue(&self, token: &SessionToken, actor: Actor) -> Result<(), SessionStoreError> {
        let row = NewSessionRow {
            token: token.as_str(),
            user_id: *actor.user_id.as_uuid(),
            role: actor.role.as_str(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(sessions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn resolve(&self, token: &SessionToken) -> Result<Option<Actor>, SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = sessions::table
            .find(token.as_str())
            .select(SessionRow::as_select())
            .first::<SessionRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| Actor::try_from(row).map_err(SessionStoreError::query))
            .transpose()
    }

    async fn revoke(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(sessions::table.find(token.as_str()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }
}
