//! PostgreSQL-backed `CourseRepository`.
//!
//! Headcounts are computed with a grouped `COUNT(*)` over `enrollments`;
//! deleting a course cascades to its enrollments through the foreign key
//! while grade events are left in place.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{CourseRepository, CourseRepositoryError};
use crate::domain::{Course, CourseListing};

use super::diesel_basic_error_mapping::{DieselFailure, classify, map_basic_pool_error};
use super::models::{CourseRow, CourseWrite, from_db_count};
use super::pool::{DbPool, PoolError};
use super::schema::{courses, enrollments};
use super::search::like_pattern;

/// Diesel implementation of [`CourseRepository`].
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CourseRepositoryError {
    map_basic_pool_error(error, CourseRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> CourseRepositoryError {
    match classify(&error) {
        DieselFailure::Connection(message) => CourseRepositoryError::connection(message),
        DieselFailure::Query(message) => CourseRepositoryError::query(message),
        DieselFailure::UniqueViolation => CourseRepositoryError::query("unique constraint violated"),
        DieselFailure::ForeignKeyViolation => CourseRepositoryError::unknown_teacher(),
    }
}

/// Writes additionally map a unique violation to the duplicate code error.
fn map_write_error(course: &Course) -> impl FnOnce(diesel::result::Error) -> CourseRepositoryError {
    let code = course.code.clone();
    move |error| match classify(&error) {
        DieselFailure::UniqueViolation => CourseRepositoryError::duplicate_code(code),
        _ => map_diesel_error(error),
    }
}

fn to_course(row: CourseRow) -> Result<Course, CourseRepositoryError> {
    Course::try_from(row).map_err(CourseRepositoryError::query)
}

fn to_listing(
    row: CourseRow,
    counts: &HashMap<Uuid, i64>,
) -> Result<CourseListing, CourseRepositoryError> {
    let enrolled = counts.get(&row.id).copied().unwrap_or_default();
    let enrolled = from_db_count(enrolled).map_err(CourseRepositoryError::query)?;
    Ok(CourseListing::new(to_course(row)?, enrolled))
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn create(&self, course: &Course) -> Result<(), CourseRepositoryError> {
        let row = CourseWrite::new(course).map_err(CourseRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(courses::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_write_error(course))
    }

    async fn update(&self, course: &Course) -> Result<bool, CourseRepositoryError> {
        let row = CourseWrite::new(course).map_err(CourseRepositoryError::query)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(courses::table.find(course.id))
            .set(&row)
            .execute(&mut conn)
            .await
            .map_err(map_write_error(course))?;
        Ok(updated > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let removed = diesel::delete(courses::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(removed > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = courses::table
            .find(id)
            .select(CourseRow::as_select())
            .first::<CourseRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_course).transpose()
    }

    async fn find_listing(
        &self,
        id: Uuid,
    ) -> Result<Option<CourseListing>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let Some(row) = courses::table
            .find(id)
            .select(CourseRow::as_select())
            .first::<CourseRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };
        let enrolled: i64 = enrollments::table
            .filter(enrollments::course_id.eq(id))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let counts = HashMap::from([(id, enrolled)]);
        to_listing(row, &counts).map(Some)
    }

    async fn list(&self, query: &str) -> Result<Vec<CourseListing>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut rows = courses::table
            .select(CourseRow::as_select())
            .order_by(courses::code)
            .into_boxed();
        if let Some(pattern) = like_pattern(query) {
            rows = rows.filter(
                courses::code
                    .ilike(pattern.clone())
                    .or(courses::name.ilike(pattern)),
            );
        }
        let rows: Vec<CourseRow> = rows.load(&mut conn).await.map_err(map_diesel_error)?;

        let counts: HashMap<Uuid, i64> = enrollments::table
            .group_by(enrollments::course_id)
            .select((enrollments::course_id, count_star()))
            .load::<(Uuid, i64)>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .collect();

        rows.into_iter()
            .map(|row| to_listing(row, &counts))
            .collect()
    }
}
