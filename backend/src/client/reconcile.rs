//! Dashboard reconciliation.
//!
//! Views are never patched in place. After every mutation the controller
//! discards the role's dashboard and fetches it again as one snapshot. A
//! failed fetch leaves the previous snapshot untouched, so callers only ever
//! see a view that was read in full.

use std::sync::Arc;

use futures_util::future::try_join_all;
use futures_util::try_join;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{
    BulkEnrollmentReport, Course, CourseGrade, CourseListing, EnrolledCourse, Enrollment,
    GpaSummary, GradeEvent, LetterGrade, Role, Roster, User, UserId,
};

use super::gateway::{CourseInput, NewUserInput, RegistrarGateway, UpdateUserInput};
use super::{ClientError, Session};

/// What a student sees.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentView {
    pub catalogue: Vec<CourseListing>,
    pub enrollments: Vec<EnrolledCourse>,
    pub grades: Vec<CourseGrade>,
    pub gpa: GpaSummary,
}

/// What a teacher sees: owned courses and one roster per course.
#[derive(Debug, Clone, PartialEq)]
pub struct TeacherView {
    pub courses: Vec<CourseListing>,
    pub rosters: Vec<Roster>,
}

/// What an administrator sees.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminView {
    pub catalogue: Vec<CourseListing>,
    pub users: Vec<User>,
}

/// One dashboard per role.
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Student(StudentView),
    Teacher(TeacherView),
    Admin(AdminView),
}

impl Dashboard {
    pub fn role(&self) -> Role {
        match self {
            Self::Student(_) => Role::Student,
            Self::Teacher(_) => Role::Teacher,
            Self::Admin(_) => Role::Admin,
        }
    }
}

/// Outcome of a mutation together with the re-fetch that followed it.
///
/// `outcome` reports the write; `refresh` reports whether the dashboard now
/// reflects it. Both are always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReport<T> {
    pub outcome: Result<T, ClientError>,
    pub refresh: Result<(), ClientError>,
}

impl<T> MutationReport<T> {
    /// True when the write succeeded and the view was re-read.
    pub fn is_reconciled(&self) -> bool {
        self.outcome.is_ok() && self.refresh.is_ok()
    }
}

/// Holds a session and the last dashboard fetched for it.
pub struct DashboardController<G> {
    gateway: Arc<G>,
    session: Session,
    query: String,
    current: Option<Dashboard>,
}

impl<G: RegistrarGateway> DashboardController<G> {
    pub fn new(gateway: Arc<G>, session: Session) -> Self {
        Self {
            gateway,
            session,
            query: String::new(),
            current: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last successfully fetched dashboard.
    pub fn dashboard(&self) -> Option<&Dashboard> {
        self.current.as_ref()
    }

    /// Catalogue search text used by subsequent refreshes.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Fetch the whole dashboard for the session's role.
    ///
    /// # Errors
    ///
    /// Returns the first failing read. The previous snapshot is kept.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let user = self.session.user().ok_or(ClientError::NotLoggedIn)?;
        let fetched = match user.role() {
            Role::Student => self.fetch_student().await.map(Dashboard::Student),
            Role::Teacher => self.fetch_teacher(user.id()).await.map(Dashboard::Teacher),
            Role::Admin => self.fetch_admin().await.map(Dashboard::Admin),
        };
        match fetched {
            Ok(dashboard) => {
                debug!(role = %dashboard.role(), "dashboard refreshed");
                self.current = Some(dashboard);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "dashboard refresh failed; keeping previous view");
                Err(error)
            }
        }
    }

    async fn fetch_student(&self) -> Result<StudentView, ClientError> {
        let gateway = self.gateway.as_ref();
        let session = &self.session;
        let (catalogue, enrollments, grades, gpa) = try_join!(
            gateway.list_courses(session, &self.query),
            gateway.my_enrollments(session),
            gateway.my_grades(session),
            gateway.my_gpa(session),
        )?;
        Ok(StudentView {
            catalogue,
            enrollments,
            grades,
            gpa,
        })
    }

    async fn fetch_teacher(&self, teacher_id: UserId) -> Result<TeacherView, ClientError> {
        let gateway = self.gateway.as_ref();
        let session = &self.session;
        let courses: Vec<CourseListing> = gateway
            .list_courses(session, "")
            .await?
            .into_iter()
            .filter(|listing| listing.course.teacher_id == teacher_id)
            .collect();
        let rosters = try_join_all(
            courses
                .iter()
                .map(|listing| gateway.roster(session, listing.course.id)),
        )
        .await?;
        Ok(TeacherView { courses, rosters })
    }

    async fn fetch_admin(&self) -> Result<AdminView, ClientError> {
        let gateway = self.gateway.as_ref();
        let session = &self.session;
        let (catalogue, users) = try_join!(
            gateway.list_courses(session, &self.query),
            gateway.list_users(session, "", None),
        )?;
        Ok(AdminView { catalogue, users })
    }

    async fn reconcile<T>(&mut self, outcome: Result<T, ClientError>) -> MutationReport<T> {
        if let Err(error) = &outcome {
            debug!(%error, "mutation failed; refreshing anyway");
        }
        let refresh = self.refresh().await;
        MutationReport { outcome, refresh }
    }

    pub async fn enroll(&mut self, course_id: Uuid) -> MutationReport<Enrollment> {
        let outcome = self
            .gateway
            .request_enrollment(&self.session, course_id)
            .await;
        self.reconcile(outcome).await
    }

    pub async fn unenroll(&mut self, enrollment_id: Uuid) -> MutationReport<()> {
        let outcome = self
            .gateway
            .cancel_enrollment(&self.session, enrollment_id)
            .await;
        self.reconcile(outcome).await
    }

    pub async fn bulk_enroll(
        &mut self,
        course_id: Uuid,
        student_ids: Vec<UserId>,
    ) -> MutationReport<BulkEnrollmentReport> {
        let outcome = self
            .gateway
            .bulk_enroll(&self.session, course_id, student_ids)
            .await;
        self.reconcile(outcome).await
    }

    pub async fn assign_grade(
        &mut self,
        student_id: UserId,
        course_id: Uuid,
        value: LetterGrade,
    ) -> MutationReport<GradeEvent> {
        let outcome = self
            .gateway
            .assign_grade(&self.session, student_id, course_id, value)
            .await;
        self.reconcile(outcome).await
    }

    pub async fn create_course(&mut self, input: &CourseInput) -> MutationReport<Course> {
        let outcome = self.gateway.create_course(&self.session, input).await;
        self.reconcile(outcome).await
    }

    pub async fn update_course(
        &mut self,
        course_id: Uuid,
        input: &CourseInput,
    ) -> MutationReport<Course> {
        let outcome = self
            .gateway
            .update_course(&self.session, course_id, input)
            .await;
        self.reconcile(outcome).await
    }

    pub async fn delete_course(&mut self, course_id: Uuid) -> MutationReport<()> {
        let outcome = self.gateway.delete_course(&self.session, course_id).await;
        self.reconcile(outcome).await
    }

    pub async fn create_user(&mut self, input: &NewUserInput) -> MutationReport<User> {
        let outcome = self.gateway.create_user(&self.session, input).await;
        self.reconcile(outcome).await
    }

    pub async fn update_user(
        &mut self,
        user_id: UserId,
        input: &UpdateUserInput,
    ) -> MutationReport<User> {
        let outcome = self.gateway.update_user(&self.session, user_id, input).await;
        self.reconcile(outcome).await
    }

    pub async fn delete_user(&mut self, user_id: UserId) -> MutationReport<()> {
        let outcome = self.gateway.delete_user(&self.session, user_id).await;
        self.reconcile(outcome).await
    }

    /// End the session server-side and forget it locally.
    ///
    /// The local session and snapshot are cleared even when the server call
    /// fails.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let result = self.gateway.logout(&self.session).await;
        self.session.clear();
        self.current = None;
        result
    }
}
