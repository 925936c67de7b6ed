//! PostgreSQL-backed read model for rosters and transcripts.
//!
//! Each snapshot is read inside a `REPEATABLE READ`, read-only transaction
//! so the enrollment rows and grade events it returns come from one MVCC
//! snapshot.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use crate::domain::ports::{
    AcademicRecordError, AcademicRecordRepository, RosterSnapshot, TranscriptSnapshot,
};
use crate::domain::{Course, Enrollment, GradeEvent, User, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::diesel_grade_ledger_repository::to_event;
use super::models::{CourseRow, EnrollmentRow, GradeEventRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{courses, enrollments, grade_events, users};

/// Diesel implementation of [`AcademicRecordRepository`].
#[derive(Clone)]
pub struct DieselAcademicRecordRepository {
    pool: DbPool,
}

impl DieselAcademicRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AcademicRecordError {
    map_basic_pool_error(error, AcademicRecordError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> AcademicRecordError {
    map_basic_diesel_error(
        error,
        AcademicRecordError::query,
        AcademicRecordError::connection,
    )
}

fn to_events(rows: Vec<GradeEventRow>) -> Result<Vec<GradeEvent>, AcademicRecordError> {
    rows.into_iter()
        .map(|row| to_event(row).map_err(AcademicRecordError::query))
        .collect()
}

fn to_courses(rows: Vec<CourseRow>) -> Result<Vec<Course>, AcademicRecordError> {
    rows.into_iter()
        .map(|row| Course::try_from(row).map_err(AcademicRecordError::query))
        .collect()
}

type RosterRows = (CourseRow, Vec<(EnrollmentRow, UserRow)>, Vec<GradeEventRow>);

#[async_trait]
impl AcademicRecordRepository for DieselAcademicRecordRepository {
    async fn roster_snapshot(
        &self,
        course_id: Uuid,
    ) -> Result<Option<RosterSnapshot>, AcademicRecordError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Option<RosterRows> = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                async move {
                    let Some(course) = courses::table
                        .find(course_id)
                        .select(CourseRow::as_select())
                        .first::<CourseRow>(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let students: Vec<(EnrollmentRow, UserRow)> = enrollments::table
                        .inner_join(users::table)
                        .filter(enrollments::course_id.eq(course_id))
                        .order_by((users::name, users::id))
                        .select((EnrollmentRow::as_select(), UserRow::as_select()))
                        .load(conn)
                        .await?;
                    let events: Vec<GradeEventRow> = grade_events::table
                        .filter(grade_events::course_id.eq(course_id))
                        .order_by(grade_events::id)
                        .select(GradeEventRow::as_select())
                        .load(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(Some((course, students, events)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((course, students, events)) = rows else {
            return Ok(None);
        };
        let students = students
            .into_iter()
            .map(|(enrollment, user)| {
                let user: User = user.into_user().map_err(AcademicRecordError::query)?;
                Ok((Enrollment::from(enrollment), user))
            })
            .collect::<Result<Vec<_>, AcademicRecordError>>()?;
        Ok(Some(RosterSnapshot {
            course: Course::try_from(course).map_err(AcademicRecordError::query)?,
            students,
            events: to_events(events)?,
        }))
    }

    async fn transcript_snapshot(
        &self,
        student_id: UserId,
    ) -> Result<TranscriptSnapshot, AcademicRecordError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let student = *student_id.as_uuid();
        let (events, courses) = conn
            .build_transaction()
            .repeatable_read()
            .read_only()
            .run(|conn| {
                async move {
                    let events: Vec<GradeEventRow> = grade_events::table
                        .filter(grade_events::student_id.eq(student))
                        .order_by(grade_events::id)
                        .select(GradeEventRow::as_select())
                        .load(conn)
                        .await?;
                    let course_ids: Vec<Uuid> = events.iter().map(|e| e.course_id).collect();
                    let courses: Vec<CourseRow> = courses::table
                        .filter(courses::id.eq_any(course_ids))
                        .order_by(courses::id)
                        .select(CourseRow::as_select())
                        .load(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>((events, courses))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(TranscriptSnapshot {
            events: to_events(events)?,
            courses: to_courses(courses)?,
        })
    }
}
