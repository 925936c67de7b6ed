//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{AUTHORIZATION, HeaderName};
use actix_web::{App, test, web};
use serde_json::Value;

use crate::domain::ports::{
    MockAccountService, MockCourseCommand, MockCourseQuery, MockEnrollmentCommand,
    MockEnrollmentQuery, MockGradeCommand, MockGradeQuery, MockUserDirectory,
};
use crate::domain::{Actor, Error, Role, UserId};

use super::configure_api;
use super::error::{json_error_handler, path_error_handler, query_error_handler};
use super::state::HttpState;

/// Token accepted by [`StateBuilder::acting_as`].
pub const TEST_TOKEN: &str = "test-token";

/// `Authorization` header carrying `token`.
pub fn bearer(token: &str) -> (HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

/// A fresh actor with `role`.
pub fn actor(role: Role) -> Actor {
    Actor::new(UserId::random(), role)
}

/// Builds [`HttpState`] over driving-port mocks. Ports without expectations
/// panic when called.
#[derive(Default)]
pub struct StateBuilder {
    accounts: MockAccountService,
    directory: MockUserDirectory,
    courses: MockCourseCommand,
    courses_query: MockCourseQuery,
    enrollments: MockEnrollmentCommand,
    enrollments_query: MockEnrollmentQuery,
    grades: MockGradeCommand,
    grades_query: MockGradeQuery,
}

impl StateBuilder {
    /// Resolve [`TEST_TOKEN`] to `actor`; reject every other token.
    pub fn acting_as(mut self, actor: Actor) -> Self {
        self.accounts.expect_authenticate().returning(move |token| {
            if token.as_str() == TEST_TOKEN {
                Ok(actor)
            } else {
                Err(Error::unauthorized("session expired"))
            }
        });
        self
    }

    pub fn with_accounts(mut self, configure: impl FnOnce(&mut MockAccountService)) -> Self {
        configure(&mut self.accounts);
        self
    }

    pub fn with_directory(mut self, configure: impl FnOnce(&mut MockUserDirectory)) -> Self {
        configure(&mut self.directory);
        self
    }

    pub fn with_courses(mut self, configure: impl FnOnce(&mut MockCourseCommand)) -> Self {
        configure(&mut self.courses);
        self
    }

    pub fn with_courses_query(mut self, configure: impl FnOnce(&mut MockCourseQuery)) -> Self {
        configure(&mut self.courses_query);
        self
    }

    pub fn with_enrollments(
        mut self,
        configure: impl FnOnce(&mut MockEnrollmentCommand),
    ) -> Self {
        configure(&mut self.enrollments);
        self
    }

    pub fn with_enrollments_query(
        mut self,
        configure: impl FnOnce(&mut MockEnrollmentQuery),
    ) -> Self {
        configure(&mut self.enrollments_query);
        self
    }

    pub fn with_grades(mut self, configure: impl FnOnce(&mut MockGradeCommand)) -> Self {
        configure(&mut self.grades);
        self
    }

    pub fn with_grades_query(mut self, configure: impl FnOnce(&mut MockGradeQuery)) -> Self {
        configure(&mut self.grades_query);
        self
    }

    pub fn build(self) -> web::Data<HttpState> {
        web::Data::new(HttpState {
            accounts: Arc::new(self.accounts),
            directory: Arc::new(self.directory),
            courses: Arc::new(self.courses),
            courses_query: Arc::new(self.courses_query),
            enrollments: Arc::new(self.enrollments),
            enrollments_query: Arc::new(self.enrollments_query),
            grades: Arc::new(self.grades),
            grades_query: Arc::new(self.grades_query),
        })
    }
}

/// App wired with the production error handlers and routes over `state`.
pub fn app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .configure(configure_api)
}

/// Decode a JSON response body.
pub async fn read_json(response: ServiceResponse) -> Value {
    let body = test::read_body(response).await;
    serde_json::from_slice(&body).expect("response body is JSON")
}
