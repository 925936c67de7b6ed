//! Port abstraction for enrollment persistence, including the atomic
//! admission step.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AdmissionOutcome, AdmissionRequest, EnrolledCourse, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by enrollment repository adapters.
    pub enum EnrollmentRepositoryError for "enrollment repository" {}
}

/// Enrollment storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Decide and, when admitted, insert the enrollment as one step.
    ///
    /// Implementations must hold the course's critical section while they
    /// gather the [`crate::domain::AdmissionCheck`] facts, evaluate them, and
    /// insert. Rejections are returned as `Ok(AdmissionOutcome::Rejected)`.
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, EnrollmentRepositoryError>;

    /// Fetch an enrollment joined with its course.
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EnrolledCourse>, EnrollmentRepositoryError>;

    /// Delete an enrollment. Returns `false` when it was already gone.
    async fn remove(&self, id: Uuid) -> Result<bool, EnrollmentRepositoryError>;

    /// Active enrollments held by `student_id`, ordered by course code.
    async fn for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, EnrollmentRepositoryError>;

    /// Whether `student_id` holds a seat in `course_id`.
    async fn is_enrolled(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<bool, EnrollmentRepositoryError>;
}
