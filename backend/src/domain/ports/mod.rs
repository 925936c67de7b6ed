//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`SessionStore`]) are implemented by
//! outbound adapters. Driving ports (`*Command`, `*Query`,
//! [`AccountService`], [`UserDirectory`]) are implemented by domain services
//! and called by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod academic_record_repository;
mod accounts;
mod course_command;
mod course_query;
mod course_repository;
mod enrollment_command;
mod enrollment_query;
mod enrollment_repository;
mod grade_command;
mod grade_ledger_repository;
mod grade_query;
mod session_store;
mod user_repository;

#[cfg(test)]
pub use academic_record_repository::MockAcademicRecordRepository;
pub use academic_record_repository::{
    AcademicRecordError, AcademicRecordRepository, RosterSnapshot, TranscriptSnapshot,
};
#[cfg(test)]
pub use accounts::{MockAccountService, MockUserDirectory};
pub use accounts::{AccountService, AuthenticatedSession, UserDirectory};
pub use course_command::CourseCommand;
#[cfg(test)]
pub use course_command::MockCourseCommand;
pub use course_query::CourseQuery;
#[cfg(test)]
pub use course_query::MockCourseQuery;
#[cfg(test)]
pub use course_repository::MockCourseRepository;
pub use course_repository::{CourseRepository, CourseRepositoryError};
pub use enrollment_command::EnrollmentCommand;
#[cfg(test)]
pub use enrollment_command::MockEnrollmentCommand;
pub use enrollment_query::EnrollmentQuery;
#[cfg(test)]
pub use enrollment_query::MockEnrollmentQuery;
#[cfg(test)]
pub use enrollment_repository::MockEnrollmentRepository;
pub use enrollment_repository::{EnrollmentRepository, EnrollmentRepositoryError};
#[cfg(test)]
pub use grade_command::MockGradeCommand;
pub use grade_command::{AssignGradeRequest, GradeCommand};
#[cfg(test)]
pub use grade_ledger_repository::MockGradeLedgerRepository;
pub use grade_ledger_repository::{GradeLedgerError, GradeLedgerRepository};
#[cfg(test)]
pub use grade_query::MockGradeQuery;
pub use grade_query::GradeQuery;
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{SessionStore, SessionStoreError};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserPersistenceError, UserRepository};
