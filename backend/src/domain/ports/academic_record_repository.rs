//! Read-side port returning self-consistent multi-table snapshots.
//!
//! Rosters and transcripts join enrollments, users, courses, and grade
//! events. Each call returns data observed at one point in time so the
//! resolver never mixes rows from two states of the store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Course, Enrollment, GradeEvent, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by academic record adapters.
    pub enum AcademicRecordError for "academic record repository" {}
}

/// Everything a course roster needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSnapshot {
    pub course: Course,
    /// Active enrollments with the enrolled student, ordered by name.
    pub students: Vec<(Enrollment, User)>,
    /// All grade events recorded for the course.
    pub events: Vec<GradeEvent>,
}

/// Everything a student's grade list and GPA need.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSnapshot {
    /// All grade events recorded for the student.
    pub events: Vec<GradeEvent>,
    /// Courses referenced by `events` that still exist.
    pub courses: Vec<Course>,
}

/// Snapshot reads across several tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AcademicRecordRepository: Send + Sync {
    /// Roster for `course_id`, or `None` when the course does not exist.
    async fn roster_snapshot(
        &self,
        course_id: Uuid,
    ) -> Result<Option<RosterSnapshot>, AcademicRecordError>;

    /// Grade history and course credits for `student_id`.
    async fn transcript_snapshot(
        &self,
        student_id: UserId,
    ) -> Result<TranscriptSnapshot, AcademicRecordError>;
}
