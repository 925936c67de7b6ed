//! Driving port for grade reads.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, CourseGrade, Error, GpaSummary, GradeEvent, UserId};

/// Grade read models derived from the ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradeQuery: Send + Sync {
    /// Canonical grade per course for the acting student.
    async fn my_grades(&self, actor: Actor) -> Result<Vec<CourseGrade>, Error>;

    /// Credit-weighted GPA for the acting student.
    async fn my_gpa(&self, actor: Actor) -> Result<GpaSummary, Error>;

    /// Full event history for one (student, course) pair.
    async fn grade_history(
        &self,
        actor: Actor,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<Vec<GradeEvent>, Error>;
}
