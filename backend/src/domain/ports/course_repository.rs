//! Port abstraction for course persistence adapters and their errors.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Course, CourseListing};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by course repository adapters.
    pub enum CourseRepositoryError for "course repository" {
        /// Another course already uses this code.
        DuplicateCode { code: String } => "course code {code} is already in use",
        /// The owning teacher does not exist.
        UnknownTeacher => "course teacher does not exist",
    }
}

/// Course catalogue storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a new course.
    async fn create(&self, course: &Course) -> Result<(), CourseRepositoryError>;

    /// Replace a course's attributes. Returns `false` when the course does not
    /// exist. Serialised with admissions for the same course.
    async fn update(&self, course: &Course) -> Result<bool, CourseRepositoryError>;

    /// Delete a course and its enrollments. Grade events are kept.
    async fn delete(&self, id: Uuid) -> Result<bool, CourseRepositoryError>;

    /// Fetch a course by identifier.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, CourseRepositoryError>;

    /// Fetch a course with its live headcount.
    async fn find_listing(&self, id: Uuid)
    -> Result<Option<CourseListing>, CourseRepositoryError>;

    /// Catalogue listings matching `query` on code or name, ordered by code.
    async fn list(&self, query: &str) -> Result<Vec<CourseListing>, CourseRepositoryError>;
}
