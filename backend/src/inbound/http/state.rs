//! Shared HTTP adapter state.
//!
//! Handlers receive this through `actix_web::web::Data` and depend only on
//! driving ports, so they can be tested against mocks without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AccountService, CourseCommand, CourseQuery, EnrollmentCommand, EnrollmentQuery, GradeCommand,
    GradeQuery, UserDirectory,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountService>,
    pub directory: Arc<dyn UserDirectory>,
    pub courses: Arc<dyn CourseCommand>,
    pub courses_query: Arc<dyn CourseQuery>,
    pub enrollments: Arc<dyn EnrollmentCommand>,
    pub enrollments_query: Arc<dyn EnrollmentQuery>,
    pub grades: Arc<dyn GradeCommand>,
    pub grades_query: Arc<dyn GradeQuery>,
}
