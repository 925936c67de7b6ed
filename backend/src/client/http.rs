//! Reqwest-backed registrar client.
//!
//! Owns transport details only: URL building, bearer headers, status mapping,
//! and JSON decoding. Requests are never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    BulkEnrollmentReport, Course, CourseGrade, CourseListing, EnrolledCourse, Enrollment,
    GpaSummary, GradeEvent, LetterGrade, Role, Roster, User, UserId,
};

use super::gateway::{CourseInput, NewUserInput, RegistrarGateway, UpdateUserInput};
use super::{ClientError, Session, SessionPayload};

const API_PREFIX: &str = "api/v1/";

/// JSON client for one registrar deployment.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
}

impl ApiClient {
    /// Build a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: normalise_base(base),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(API_PREFIX)
            .and_then(|api| api.join(path))
            .map_err(|err| ClientError::Transport {
                message: format!("invalid endpoint {path}: {err}"),
            })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        session: Option<&Session>,
    ) -> Result<RequestBuilder, ClientError> {
        let builder = self.client.request(method, self.endpoint(path)?);
        match session {
            None => Ok(builder),
            Some(session) => session
                .token()
                .map(|token| builder.bearer_auth(token))
                .ok_or(ClientError::NotLoggedIn),
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Vec<u8>, ClientError> {
        let response = builder.send().await.map_err(|err| map_transport_error(&err))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|err| map_transport_error(&err))?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "registrar call failed");
            return Err(ClientError::from_response(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let body = self.execute(builder).await?;
        decode(&body)
    }
}

/// Ensure the base path ends with `/` so relative joins append segments.
fn normalise_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|err| ClientError::Decode {
        message: err.to_string(),
    })
}

fn map_transport_error(error: &reqwest::Error) -> ClientError {
    ClientError::Transport {
        message: error.to_string(),
    }
}

#[async_trait]
impl RegistrarGateway for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = self
            .request(Method::POST, "auth/login", None)?
            .json(&json!({ "email": email, "password": password }));
        let payload: SessionPayload = self.fetch(request).await?;
        Ok(Session::from_payload(payload))
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        major: Option<String>,
    ) -> Result<Session, ClientError> {
        let request = self
            .request(Method::POST, "auth/register", None)?
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
                "major": major,
            }));
        let payload: SessionPayload = self.fetch(request).await?;
        Ok(Session::from_payload(payload))
    }

    async fn logout(&self, session: &Session) -> Result<(), ClientError> {
        let request = self.request(Method::POST, "auth/logout", Some(session))?;
        self.execute(request).await.map(drop)
    }

    async fn list_courses(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<CourseListing>, ClientError> {
        let request = self
            .request(Method::GET, "courses", Some(session))?
            .query(&[("q", query)]);
        self.fetch(request).await
    }

    async fn create_course(
        &self,
        session: &Session,
        input: &CourseInput,
    ) -> Result<Course, ClientError> {
        let request = self
            .request(Method::POST, "courses", Some(session))?
            .json(input);
        self.fetch(request).await
    }

    async fn update_course(
        &self,
        session: &Session,
        course_id: Uuid,
        input: &CourseInput,
    ) -> Result<Course, ClientError> {
        let request = self
            .request(Method::PUT, &format!("courses/{course_id}"), Some(session))?
            .json(input);
        self.fetch(request).await
    }

    async fn delete_course(&self, session: &Session, course_id: Uuid) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &format!("courses/{course_id}"), Some(session))?;
        self.execute(request).await.map(drop)
    }

    async fn my_enrollments(
        &self,
        session: &Session,
    ) -> Result<Vec<EnrolledCourse>, ClientError> {
        let request = self.request(Method::GET, "enrollments/me", Some(session))?;
        self.fetch(request).await
    }

    async fn request_enrollment(
        &self,
        session: &Session,
        course_id: Uuid,
    ) -> Result<Enrollment, ClientError> {
        let request = self
            .request(Method::POST, "enrollments", Some(session))?
            .json(&json!({ "courseId": course_id }));
        self.fetch(request).await
    }

    async fn cancel_enrollment(
        &self,
        session: &Session,
        enrollment_id: Uuid,
    ) -> Result<(), ClientError> {
        let request = self.request(
            Method::DELETE,
            &format!("enrollments/{enrollment_id}"),
            Some(session),
        )?;
        self.execute(request).await.map(drop)
    }

    async fn bulk_enroll(
        &self,
        session: &Session,
        course_id: Uuid,
        student_ids: Vec<UserId>,
    ) -> Result<BulkEnrollmentReport, ClientError> {
        let request = self
            .request(
                Method::POST,
                &format!("courses/{course_id}/bulk-enroll"),
                Some(session),
            )?
            .json(&json!({ "studentIds": student_ids }));
        self.fetch(request).await
    }

    async fn roster(&self, session: &Session, course_id: Uuid) -> Result<Roster, ClientError> {
        let request = self.request(
            Method::GET,
            &format!("courses/{course_id}/roster"),
            Some(session),
        )?;
        self.fetch(request).await
    }

    async fn assign_grade(
        &self,
        session: &Session,
        student_id: UserId,
        course_id: Uuid,
        value: LetterGrade,
    ) -> Result<GradeEvent, ClientError> {
        let request = self
            .request(Method::POST, "grades", Some(session))?
            .json(&json!({
                "studentId": student_id,
                "courseId": course_id,
                "value": value.as_str(),
            }));
        self.fetch(request).await
    }

    async fn my_grades(&self, session: &Session) -> Result<Vec<CourseGrade>, ClientError> {
        let request = self.request(Method::GET, "grades/me", Some(session))?;
        self.fetch(request).await
    }

    async fn my_gpa(&self, session: &Session) -> Result<GpaSummary, ClientError> {
        let request = self.request(Method::GET, "grades/me/gpa", Some(session))?;
        self.fetch(request).await
    }

    async fn search_students(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<User>, ClientError> {
        let request = self
            .request(Method::GET, "students", Some(session))?
            .query(&[("q", query)]);
        self.fetch(request).await
    }

    async fn list_users(
        &self,
        session: &Session,
        query: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>, ClientError> {
        let role = role.map(Role::as_str).unwrap_or_default();
        let request = self
            .request(Method::GET, "admin/users", Some(session))?
            .query(&[("q", query), ("role", role)]);
        self.fetch(request).await
    }

    async fn create_user(
        &self,
        session: &Session,
        input: &NewUserInput,
    ) -> Result<User, ClientError> {
        let request = self
            .request(Method::POST, "admin/users", Some(session))?
            .json(input);
        self.fetch(request).await
    }

    async fn update_user(
        &self,
        session: &Session,
        user_id: UserId,
        input: &UpdateUserInput,
    ) -> Result<User, ClientError> {
        let request = self
            .request(Method::PUT, &format!("admin/users/{user_id}"), Some(session))?
            .json(input);
        self.fetch(request).await
    }

    async fn delete_user(&self, session: &Session, user_id: UserId) -> Result<(), ClientError> {
        let request = self.request(
            Method::DELETE,
            &format!("admin/users/{user_id}"),
            Some(session),
        )?;
        self.execute(request).await.map(drop)
    }
}
