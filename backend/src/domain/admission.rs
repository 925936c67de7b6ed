//! Admission decisions for single and bulk enrollment requests.
//!
//! The decision is a pure function over a [`AdmissionCheck`] captured while
//! the store holds the course's critical section. Store adapters gather the
//! facts, call [`evaluate_admission`], and insert the enrollment only when it
//! returns `Ok`, all before releasing the lock. That ordering is what makes
//! "N callers race for the last seat, exactly one wins" hold.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::course::SeatSnapshot;
use crate::domain::enrollment::Enrollment;
use crate::domain::user::UserId;

/// Why an admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionRejection {
    /// The course id does not name a course.
    CourseNotFound,
    /// The student id does not name a student account.
    UnknownStudent,
    /// The student already holds a seat in the course.
    AlreadyEnrolled,
    /// No seats remain.
    CapacityExceeded,
    /// The store failed before deciding; retrying may succeed.
    StoreUnavailable,
}

impl AdmissionRejection {
    /// Stable snake-case reason code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CourseNotFound => "course_not_found",
            Self::UnknownStudent => "unknown_student",
            Self::AlreadyEnrolled => "already_enrolled",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::StoreUnavailable => "store_unavailable",
        }
    }
}

impl From<AdmissionRejection> for Error {
    fn from(value: AdmissionRejection) -> Self {
        match value {
            AdmissionRejection::CourseNotFound => Error::not_found("course not found"),
            AdmissionRejection::UnknownStudent => Error::not_found("student not found"),
            AdmissionRejection::AlreadyEnrolled => Error::conflict(
                value.as_str(),
                "student is already enrolled in this course",
            ),
            AdmissionRejection::CapacityExceeded => {
                Error::conflict(value.as_str(), "course has no available seats")
            }
            AdmissionRejection::StoreUnavailable => {
                Error::service_unavailable("enrollment store unavailable")
            }
        }
    }
}

/// Facts observed under the course lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionCheck {
    /// `None` when the course does not exist.
    pub seats: Option<SeatSnapshot>,
    pub student_is_known: bool,
    pub already_enrolled: bool,
}

/// Decide whether the request may take a seat.
///
/// Checks run in a fixed order: course, student, duplicate, capacity. A
/// duplicate request against a full course therefore reports
/// `AlreadyEnrolled`.
///
/// # Examples
/// ```
/// use registrar::domain::{AdmissionCheck, AdmissionRejection, SeatSnapshot, evaluate_admission};
///
/// let full = AdmissionCheck {
///     seats: Some(SeatSnapshot { enrollment_limit: 1, active: 1 }),
///     student_is_known: true,
///     already_enrolled: false,
/// };
/// assert_eq!(evaluate_admission(&full), Err(AdmissionRejection::CapacityExceeded));
/// ```
pub fn evaluate_admission(check: &AdmissionCheck) -> Result<SeatSnapshot, AdmissionRejection> {
    let seats = check.seats.ok_or(AdmissionRejection::CourseNotFound)?;
    if !check.student_is_known {
        return Err(AdmissionRejection::UnknownStudent);
    }
    if check.already_enrolled {
        return Err(AdmissionRejection::AlreadyEnrolled);
    }
    if seats.available() == 0 {
        return Err(AdmissionRejection::CapacityExceeded);
    }
    Ok(seats)
}

/// Parameters for one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRequest {
    pub enrollment_id: Uuid,
    pub student_id: UserId,
    pub course_id: Uuid,
    pub requested_at: DateTime<Utc>,
}

impl AdmissionRequest {
    /// Enrollment that is inserted if the request is admitted.
    pub fn enrollment(&self) -> Enrollment {
        Enrollment {
            id: self.enrollment_id,
            student_id: self.student_id,
            course_id: self.course_id,
            created_at: self.requested_at,
        }
    }
}

/// Result of one admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    Admitted {
        enrollment: Enrollment,
        seats_left: u32,
    },
    Rejected {
        reason: AdmissionRejection,
        /// Seats left at decision time; `None` when the course is missing.
        seats_left: Option<u32>,
    },
}

impl AdmissionOutcome {
    /// Run the decision for `request` against `check`.
    pub fn decide(request: &AdmissionRequest, check: &AdmissionCheck) -> Self {
        match evaluate_admission(check) {
            Ok(seats) => Self::Admitted {
                enrollment: request.enrollment(),
                seats_left: seats.available().saturating_sub(1),
            },
            Err(reason) => Self::Rejected {
                reason,
                seats_left: check.seats.map(|s| s.available()),
            },
        }
    }

    pub fn seats_left(&self) -> Option<u32> {
        match self {
            Self::Admitted { seats_left, .. } => Some(*seats_left),
            Self::Rejected { seats_left, .. } => *seats_left,
        }
    }
}

/// Per-student line of a bulk enrollment report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollmentResult {
    pub student_id: UserId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AdmissionRejection>,
}

/// Outcome of a bulk enrollment call, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollmentReport {
    pub results: Vec<BulkEnrollmentResult>,
    pub seats_left: u32,
}

impl BulkEnrollmentReport {
    /// Append the outcome for `student_id` and track the seats left.
    pub fn record(&mut self, student_id: UserId, outcome: &AdmissionOutcome) {
        let reason = match outcome {
            AdmissionOutcome::Admitted { .. } => None,
            AdmissionOutcome::Rejected { reason, .. } => Some(*reason),
        };
        if let Some(seats) = outcome.seats_left() {
            self.seats_left = seats;
        }
        self.results.push(BulkEnrollmentResult {
            student_id,
            ok: reason.is_none(),
            reason,
        });
    }

    /// Append a failed line for a student whose admission never reached a
    /// decision. Seats left are unchanged.
    pub fn record_failure(&mut self, student_id: UserId, reason: AdmissionRejection) {
        self.results.push(BulkEnrollmentResult {
            student_id,
            ok: false,
            reason: Some(reason),
        });
    }

    pub fn admitted(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.len() - self.admitted()
    }
}
