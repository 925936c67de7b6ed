//! PostgreSQL-backed append-only grade ledger.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{GradeLedgerError, GradeLedgerRepository};
use crate::domain::{GradeEvent, NewGradeEvent, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{GradeEventRow, NewGradeEventRow};
use super::pool::{DbPool, PoolError};
use super::schema::grade_events;

/// Diesel implementation of [`GradeLedgerRepository`]. Rows are only ever
/// inserted; the `BIGSERIAL` id records insertion order.
#[derive(Clone)]
pub struct DieselGradeLedgerRepository {
    pool: DbPool,
}

impl DieselGradeLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> GradeLedgerError {
    map_basic_pool_error(error, GradeLedgerError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> GradeLedgerError {
    map_basic_diesel_error(error, GradeLedgerError::query, GradeLedgerError::connection)
}

pub(crate) fn to_event(row: GradeEventRow) -> Result<GradeEvent, String> {
    GradeEvent::try_from(row)
}

#[async_trait]
impl GradeLedgerRepository for DieselGradeLedgerRepository {
    async fn append(&self, event: NewGradeEvent) -> Result<GradeEvent, GradeLedgerError> {
        let row = NewGradeEventRow {
            student_id: *event.student_id.as_uuid(),
            course_id: event.course_id,
            value: event.value.as_str(),
            assigned_at: Some(event.assigned_at),
            assigned_by: *event.assigned_by.as_uuid(),
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let stored = diesel::insert_into(grade_events::table)
            .values(&row)
            .returning(GradeEventRow::as_returning())
            .get_result::<GradeEventRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        to_event(stored).map_err(GradeLedgerError::query)
    }

    async fn history(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<Vec<GradeEvent>, GradeLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<GradeEventRow> = grade_events::table
            .filter(grade_events::student_id.eq(student_id.as_uuid()))
            .filter(grade_events::course_id.eq(course_id))
            .order_by(grade_events::id)
            .select(GradeEventRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter()
            .map(|row| to_event(row).map_err(GradeLedgerError::query))
            .collect()
    }
}
