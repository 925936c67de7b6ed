//! Domain primitives, aggregates, and services.
//!
//! Purpose: define strongly typed entities for courses, enrollments, and the
//! grade ledger; the pure admission and grade-resolution rules; and the
//! services that apply them through ports. Nothing here knows about HTTP or
//! SQL.
//!
//! Public surface:
//! - `Error` and `ErrorCode`: transport-agnostic failure payload.
//! - `Course`, `Enrollment`, `GradeEvent`, `User`: core entities.
//! - `evaluate_admission`, `resolve_latest`, `compute_gpa`: the core rules.
//! - `*Service` types: driving port implementations.

pub mod admission;
pub mod auth;
pub mod course;
pub mod enrollment;
pub mod error;
pub mod grades;
pub mod ports;
pub mod trace_id;
pub mod user;

mod account_service;
mod course_service;
mod enrollment_service;
mod grading_service;
mod service_support;

pub use self::account_service::{AccountDirectoryService, AdminBootstrap};
pub use self::admission::{
    AdmissionCheck, AdmissionOutcome, AdmissionRejection, AdmissionRequest, BulkEnrollmentReport,
    BulkEnrollmentResult, evaluate_admission,
};
pub use self::auth::{
    AccountUpdate, LoginCredentials, LoginValidationError, NewAccount, PASSWORD_MIN,
    PasswordDigest, PasswordHashError, SessionToken,
};
pub use self::course::{
    Course, CourseDraft, CourseListing, CourseValidationError, SeatSnapshot,
};
pub use self::course_service::CourseCatalogueService;
pub use self::enrollment::{EnrolledCourse, Enrollment, Roster, RosterEntry};
pub use self::enrollment_service::{BULK_ENROLL_MAX, EnrollmentService};
pub use self::error::{DomainError, Error, ErrorCode};
pub use self::grades::{
    CourseGrade, GpaSummary, GradeEvent, GradeScale, GradeScaleError, LetterGrade, NewGradeEvent,
    UnknownLetterGrade, compute_gpa, resolve_latest, resolve_latest_by_student,
};
pub use self::grading_service::{GradingService, GradingStores};
pub use self::trace_id::TraceId;
pub use self::user::{
    Actor, EmailAddress, PersonName, Role, RoleProfile, User, UserId, UserValidationError,
};

/// HTTP header name used to propagate trace identifiers.
pub const TRACE_ID_HEADER: &str = "trace-id";
