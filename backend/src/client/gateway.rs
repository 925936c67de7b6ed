//! Port through which dashboards reach the registrar API.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    BulkEnrollmentReport, Course, CourseGrade, CourseListing, EnrolledCourse, Enrollment,
    GpaSummary, GradeEvent, LetterGrade, Role, Roster, User, UserId,
};

use super::{ClientError, Session};

/// Course attributes sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub enrollment_limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<UserId>,
}

/// Account attributes sent by administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Replacement attributes for an existing account. `None` for `password`
/// keeps the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Registrar operations as seen from a client. Every call is single-shot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrarGateway: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError>;

    /// Create a student account; `student_code` is minted when omitted.
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        major: Option<String>,
    ) -> Result<Session, ClientError>;

    async fn logout(&self, session: &Session) -> Result<(), ClientError>;

    async fn list_courses(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<CourseListing>, ClientError>;

    async fn create_course(
        &self,
        session: &Session,
        input: &CourseInput,
    ) -> Result<Course, ClientError>;

    async fn update_course(
        &self,
        session: &Session,
        course_id: Uuid,
        input: &CourseInput,
    ) -> Result<Course, ClientError>;

    async fn delete_course(&self, session: &Session, course_id: Uuid) -> Result<(), ClientError>;

    async fn my_enrollments(&self, session: &Session)
    -> Result<Vec<EnrolledCourse>, ClientError>;

    async fn request_enrollment(
        &self,
        session: &Session,
        course_id: Uuid,
    ) -> Result<Enrollment, ClientError>;

    async fn cancel_enrollment(
        &self,
        session: &Session,
        enrollment_id: Uuid,
    ) -> Result<(), ClientError>;

    async fn bulk_enroll(
        &self,
        session: &Session,
        course_id: Uuid,
        student_ids: Vec<UserId>,
    ) -> Result<BulkEnrollmentReport, ClientError>;

    async fn roster(&self, session: &Session, course_id: Uuid) -> Result<Roster, ClientError>;

    async fn assign_grade(
        &self,
        session: &Session,
        student_id: UserId,
        course_id: Uuid,
        value: LetterGrade,
    ) -> Result<GradeEvent, ClientError>;

    async fn my_grades(&self, session: &Session) -> Result<Vec<CourseGrade>, ClientError>;

    async fn my_gpa(&self, session: &Session) -> Result<GpaSummary, ClientError>;

    async fn search_students(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<User>, ClientError>;

    async fn list_users(
        &self,
        session: &Session,
        query: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>, ClientError>;

    async fn create_user(&self, session: &Session, input: &NewUserInput)
    -> Result<User, ClientError>;

    async fn update_user(
        &self,
        session: &Session,
        user_id: UserId,
        input: &UpdateUserInput,
    ) -> Result<User, ClientError>;

    async fn delete_user(&self, session: &Session, user_id: UserId) -> Result<(), ClientError>;
}
