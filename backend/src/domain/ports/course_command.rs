//! Driving port for course catalogue mutations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, Course, CourseDraft, Error, UserId};

/// Course management use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseCommand: Send + Sync {
    /// Create a course. Teachers own what they create; admins must name the
    /// owning teacher.
    async fn create_course(
        &self,
        actor: Actor,
        draft: CourseDraft,
        teacher_id: Option<UserId>,
    ) -> Result<Course, Error>;

    /// Replace a course's attributes.
    async fn update_course(
        &self,
        actor: Actor,
        course_id: Uuid,
        draft: CourseDraft,
    ) -> Result<Course, Error>;

    /// Delete a course and its enrollments.
    async fn delete_course(&self, actor: Actor, course_id: Uuid) -> Result<(), Error>;
}
