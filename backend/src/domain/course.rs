//! Courses and their seat accounting.
//!
//! Seats are never stored. `available_seats` is derived from the enrollment
//! limit and the number of active enrollments so that admitting a student and
//! consuming the seat are one indivisible step.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::{Actor, Role, UserId};

/// Maximum length of a course code.
pub const COURSE_CODE_MAX: usize = 16;
/// Maximum length of a course name.
pub const COURSE_NAME_MAX: usize = 200;

/// Validation errors for course drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseValidationError {
    #[error("course code must not be empty")]
    EmptyCode,
    #[error("course code must be at most {max} characters")]
    CodeTooLong { max: usize },
    #[error("course name must not be empty")]
    EmptyName,
    #[error("course name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("credits must be a positive integer")]
    ZeroCredits,
}

/// Validated course attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDraft {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub enrollment_limit: u32,
}

impl CourseDraft {
    /// Trim and validate the attributes. Codes are upper-cased.
    pub fn try_new(
        code: &str,
        name: &str,
        credits: u32,
        enrollment_limit: u32,
    ) -> Result<Self, CourseValidationError> {
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(CourseValidationError::EmptyCode);
        }
        if code.chars().count() > COURSE_CODE_MAX {
            return Err(CourseValidationError::CodeTooLong {
                max: COURSE_CODE_MAX,
            });
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(CourseValidationError::EmptyName);
        }
        if name.chars().count() > COURSE_NAME_MAX {
            return Err(CourseValidationError::NameTooLong {
                max: COURSE_NAME_MAX,
            });
        }
        if credits == 0 {
            return Err(CourseValidationError::ZeroCredits);
        }
        Ok(Self {
            code,
            name: name.to_owned(),
            credits,
            enrollment_limit,
        })
    }
}

/// A course offered by one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    #[schema(example = "CS101")]
    pub code: String,
    #[schema(example = "Introduction to Programming")]
    pub name: String,
    #[schema(minimum = 1)]
    pub credits: u32,
    pub enrollment_limit: u32,
    pub teacher_id: UserId,
}

impl Course {
    /// Build a course from a validated draft.
    pub fn from_draft(id: Uuid, teacher_id: UserId, draft: CourseDraft) -> Self {
        Self {
            id,
            code: draft.code,
            name: draft.name,
            credits: draft.credits,
            enrollment_limit: draft.enrollment_limit,
            teacher_id,
        }
    }

    /// Copy of this course with the draft's attributes applied.
    #[must_use]
    pub fn with_draft(&self, draft: CourseDraft) -> Self {
        Self::from_draft(self.id, self.teacher_id, draft)
    }

    /// Seats left given `active` enrollments. Never negative: a limit lowered
    /// below the current headcount reports zero.
    pub fn available_seats(&self, active: u32) -> u32 {
        self.enrollment_limit.saturating_sub(active)
    }

    /// Admins manage every course; teachers manage the courses they own.
    pub fn is_managed_by(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Teacher => actor.user_id == self.teacher_id,
            Role::Student => false,
        }
    }

    /// Case-insensitive match against code or name.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.code.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
    }
}

/// Catalogue entry: a course with its live headcount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseListing {
    #[serde(flatten)]
    pub course: Course,
    pub enrolled: u32,
    pub available_seats: u32,
}

impl CourseListing {
    pub fn new(course: Course, enrolled: u32) -> Self {
        let available_seats = course.available_seats(enrolled);
        Self {
            course,
            enrolled,
            available_seats,
        }
    }
}

/// Seat counters captured while a course's admission lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSnapshot {
    pub enrollment_limit: u32,
    pub active: u32,
}

impl SeatSnapshot {
    pub fn available(&self) -> u32 {
        self.enrollment_limit.saturating_sub(self.active)
    }
}
