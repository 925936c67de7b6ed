//! Driving port for grade assignment.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Actor, Error, GradeEvent, LetterGrade, UserId};

/// Request to record a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignGradeRequest {
    pub student_id: UserId,
    pub course_id: Uuid,
    pub value: LetterGrade,
}

/// Grade ledger mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradeCommand: Send + Sync {
    /// Append a grade event for an enrolled student.
    async fn assign_grade(
        &self,
        actor: Actor,
        request: AssignGradeRequest,
    ) -> Result<GradeEvent, Error>;
}
