//! Driving port for enrollment reads.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, EnrolledCourse, Error, Roster};

/// Enrollment read models.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentQuery: Send + Sync {
    /// Courses the acting student is enrolled in.
    async fn my_enrollments(&self, actor: Actor) -> Result<Vec<EnrolledCourse>, Error>;

    /// Students enrolled in `course_id` with their canonical grades.
    async fn roster(&self, actor: Actor, course_id: Uuid) -> Result<Roster, Error>;
}
