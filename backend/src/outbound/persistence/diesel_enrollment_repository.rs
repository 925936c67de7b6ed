//! PostgreSQL-backed `EnrollmentRepository`.
//!
//! Admission runs in one transaction that first takes a row lock on the
//! course (`SELECT ... FOR UPDATE`). Concurrent admissions to the same course
//! therefore queue on that lock, and each one counts active seats only after
//! the previous one has committed. The unique `(student_id, course_id)`
//! constraint backs up the duplicate check.

use async_trait::async_trait;
use diesel::dsl::{Find, ForUpdate, Select};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{EnrollmentRepository, EnrollmentRepositoryError};
use crate::domain::{
    AdmissionCheck, AdmissionOutcome, AdmissionRequest, Course, EnrolledCourse, Role,
    SeatSnapshot, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{CourseRow, EnrollmentRow, from_db_count};
use super::pool::{DbPool, PoolError};
use super::schema::{courses, enrollments, users};

/// Diesel implementation of [`EnrollmentRepository`].
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EnrollmentRepositoryError {
    map_basic_pool_error(error, EnrollmentRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> EnrollmentRepositoryError {
    map_basic_diesel_error(
        error,
        EnrollmentRepositoryError::query,
        EnrollmentRepositoryError::connection,
    )
}

/// Row-locking read of a course's enrollment limit. Admission runs this
/// first in its transaction; seats are counted only once the lock is held.
fn lock_course(
    course_id: Uuid,
) -> ForUpdate<Select<Find<courses::table, Uuid>, courses::enrollment_limit>> {
    courses::table
        .find(course_id)
        .select(courses::enrollment_limit)
        .for_update()
}

fn to_enrolled(
    (enrollment, course): (EnrollmentRow, CourseRow),
) -> Result<EnrolledCourse, EnrollmentRepositoryError> {
    Ok(EnrolledCourse {
        enrollment: enrollment.into(),
        course: Course::try_from(course).map_err(EnrollmentRepositoryError::query)?,
    })
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let request = *request;
        let student = *request.student_id.as_uuid();
        let course_id = request.course_id;

        let (check, outcome) = conn
            .transaction(|conn| {
                async move {
                    let limit: Option<i32> = lock_course(course_id)
                        .first(conn)
                        .await
                        .optional()?;

                    let seats = match limit {
                        Some(limit) => {
                            let active: i64 = enrollments::table
                                .filter(enrollments::course_id.eq(course_id))
                                .count()
                                .get_result(conn)
                                .await?;
                            Some((limit, active))
                        }
                        None => None,
                    };

                    let students: i64 = users::table
                        .filter(users::id.eq(student))
                        .filter(users::role.eq(Role::Student.as_str()))
                        .count()
                        .get_result(conn)
                        .await?;

                    let held: i64 = enrollments::table
                        .filter(enrollments::course_id.eq(course_id))
                        .filter(enrollments::student_id.eq(student))
                        .count()
                        .get_result(conn)
                        .await?;

                    let seats = seats
                        .map(|(limit, active)| {
                            Ok::<_, String>(SeatSnapshot {
                                enrollment_limit: u32::try_from(limit)
                                    .map_err(|_| format!("negative limit {limit}"))?,
                                active: from_db_count(active)?,
                            })
                        })
                        .transpose()
                        .map_err(|message| {
                            diesel::result::Error::DeserializationError(message.into())
                        })?;

                    let check = AdmissionCheck {
                        seats,
                        student_is_known: students > 0,
                        already_enrolled: held > 0,
                    };
                    let outcome = AdmissionOutcome::decide(&request, &check);
                    if let AdmissionOutcome::Admitted { enrollment, .. } = &outcome {
                        diesel::insert_into(enrollments::table)
                            .values(EnrollmentRow::from(enrollment))
                            .execute(conn)
                            .await?;
                    }
                    Ok::<_, diesel::result::Error>((check, outcome))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(%course_id, ?check, "admission evaluated");
        Ok(outcome)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EnrolledCourse>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = enrollments::table
            .inner_join(courses::table)
            .filter(enrollments::id.eq(id))
            .select((EnrollmentRow::as_select(), CourseRow::as_select()))
            .first::<(EnrollmentRow, CourseRow)>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_enrolled).transpose()
    }

    async fn remove(&self, id: Uuid) -> Result<bool, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(enrollments::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }

    async fn for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<(EnrollmentRow, CourseRow)> = enrollments::table
            .inner_join(courses::table)
            .filter(enrollments::student_id.eq(student_id.as_uuid()))
            .order_by(courses::code)
            .select((EnrollmentRow::as_select(), CourseRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(to_enrolled).collect()
    }

    async fn is_enrolled(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<bool, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let held: i64 = enrollments::table
            .filter(enrollments::student_id.eq(student_id.as_uuid()))
            .filter(enrollments::course_id.eq(course_id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(held > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    #[rstest]
    fn closed_connection_is_a_connection_error() {
        let error = map_diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("gone".to_owned()),
        ));
        assert!(matches!(error, EnrollmentRepositoryError::Connection { .. }));
    }

    #[rstest]
    fn admission_locks_the_course_row() {
        let course_id = Uuid::new_v4();
        let sql = diesel::debug_query::<diesel::pg::Pg, _>(&lock_course(course_id)).to_string();
        assert!(sql.contains(r#"FROM "courses""#), "{sql}");
        assert!(sql.contains(r#""courses"."id" = $1"#), "{sql}");
        assert!(sql.contains("FOR UPDATE"), "{sql}");
    }

    #[rstest]
    fn racing_duplicate_insert_is_a_query_error() {
        let error = map_diesel_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("enrollments_student_course_key".to_owned()),
        ));
        assert!(matches!(error, EnrollmentRepositoryError::Query { .. }));
    }
}
