//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health checks, the
//! request and response bodies, and the bearer-token security scheme. The
//! document backs Swagger UI in debug builds.

use crate::domain::ports::AuthenticatedSession;
use crate::domain::{
    AdmissionRejection, BulkEnrollmentReport, BulkEnrollmentResult, Course, CourseGrade,
    CourseListing, EnrolledCourse, Enrollment, GpaSummary, GradeEvent, LetterGrade, Role,
    RoleProfile, Roster, RosterEntry, User, UserId,
};
use crate::inbound::http::auth::{LoginRequest, RegisterRequest};
use crate::inbound::http::courses::{BulkEnrollRequest, CourseRequest};
use crate::inbound::http::enrollments::EnrollmentRequest;
use crate::inbound::http::grades::GradeRequest;
use crate::inbound::http::schemas::{
    ConflictDetails, ConflictReason, ErrorCodeSchema, ErrorSchema,
};
use crate::inbound::http::users::{CreateUserRequest, UpdateUserRequest};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Name of the bearer scheme referenced by secured operations.
pub const BEARER_SCHEME: &str = "BearerToken";

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some(
                        "Opaque session token issued by POST /api/v1/auth/login or /auth/register.",
                    ))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Registrar API",
        description = "Course catalogue, seat-limited enrollment, and the append-only grade ledger.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::register,
        crate::inbound::http::auth::logout,
        crate::inbound::http::courses::list_courses,
        crate::inbound::http::courses::create_course,
        crate::inbound::http::courses::update_course,
        crate::inbound::http::courses::delete_course,
        crate::inbound::http::courses::bulk_enroll,
        crate::inbound::http::courses::roster,
        crate::inbound::http::enrollments::my_enrollments,
        crate::inbound::http::enrollments::request_enrollment,
        crate::inbound::http::enrollments::cancel_enrollment,
        crate::inbound::http::grades::assign_grade,
        crate::inbound::http::grades::my_grades,
        crate::inbound::http::grades::my_gpa,
        crate::inbound::http::grades::grade_history,
        crate::inbound::http::users::search_students,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        ConflictReason,
        ConflictDetails,
        UserId,
        Role,
        RoleProfile,
        User,
        AuthenticatedSession,
        Course,
        CourseListing,
        Enrollment,
        EnrolledCourse,
        Roster,
        RosterEntry,
        AdmissionRejection,
        BulkEnrollmentResult,
        BulkEnrollmentReport,
        LetterGrade,
        GradeEvent,
        CourseGrade,
        GpaSummary,
        LoginRequest,
        RegisterRequest,
        CourseRequest,
        BulkEnrollRequest,
        EnrollmentRequest,
        GradeRequest,
        CreateUserRequest,
        UpdateUserRequest,
    )),
    tags(
        (name = "auth", description = "Login, registration, and logout"),
        (name = "courses", description = "Course catalogue, rosters, and bulk enrollment"),
        (name = "enrollments", description = "Seat requests and cancellations"),
        (name = "grades", description = "Grade ledger and GPA"),
        (name = "users", description = "Student directory"),
        (name = "admin", description = "Account administration"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
