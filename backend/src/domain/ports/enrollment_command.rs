//! Driving port for enrollment mutations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, BulkEnrollmentReport, Enrollment, Error, UserId};

/// Enrollment use-cases invoked by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentCommand: Send + Sync {
    /// Take a seat in `course_id` for the acting student.
    async fn request_enrollment(&self, actor: Actor, course_id: Uuid)
    -> Result<Enrollment, Error>;

    /// Release the seat held by `enrollment_id`.
    async fn cancel_enrollment(&self, actor: Actor, enrollment_id: Uuid) -> Result<(), Error>;

    /// Admit each listed student in order, continuing past failures.
    async fn bulk_enroll(
        &self,
        actor: Actor,
        course_id: Uuid,
        student_ids: Vec<UserId>,
    ) -> Result<BulkEnrollmentReport, Error>;
}
