//! HTTP inbound adapter exposing the REST API under `/api/v1`.

pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod error;
pub mod grades;
pub mod health;
pub mod schemas;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` endpoint on `cfg`.
///
/// The server and the integration tests share this so both expose the same
/// surface.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(auth::login)
            .service(auth::register)
            .service(auth::logout)
            .service(courses::list_courses)
            .service(courses::create_course)
            .service(courses::update_course)
            .service(courses::delete_course)
            .service(courses::bulk_enroll)
            .service(courses::roster)
            .service(enrollments::my_enrollments)
            .service(enrollments::request_enrollment)
            .service(enrollments::cancel_enrollment)
            .service(grades::assign_grade)
            .service(grades::my_grades)
            .service(grades::my_gpa)
            .service(grades::grade_history)
            .service(users::search_students)
            .service(users::list_users)
            .service(users::create_user)
            .service(users::update_user)
            .service(users::delete_user),
    )
    .service(health::ready)
    .service(health::live);
}
