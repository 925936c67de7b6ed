//! Course catalogue handlers, bulk enrollment, and rosters.
//!
//! ```text
//! GET    /api/v1/courses?q=cs
//! POST   /api/v1/courses                   {"code":"CS101","name":"Intro","credits":3,"enrollmentLimit":30}
//! PUT    /api/v1/courses/{id}
//! DELETE /api/v1/courses/{id}
//! POST   /api/v1/courses/{id}/bulk-enroll  {"studentIds":["..."]}
//! GET    /api/v1/courses/{id}/roster
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{
    BULK_ENROLL_MAX, BulkEnrollmentReport, Course, CourseDraft, CourseListing,
    CourseValidationError, Error, Roster,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field_error, parse_user_id, parse_user_id_list, parse_uuid,
};

const COURSE_ID: FieldName = FieldName::new("courseId");

/// Free-text catalogue filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    /// Matched case-insensitively against course code and name.
    #[serde(default)]
    pub q: Option<String>,
}

/// Course attributes for create and update.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub enrollment_limit: u32,
    /// Owning teacher. Required when an admin creates a course; ignored on
    /// update.
    #[serde(default)]
    pub teacher_id: Option<String>,
}

impl CourseRequest {
    fn draft(&self) -> Result<CourseDraft, Error> {
        CourseDraft::try_new(&self.code, &self.name, self.credits, self.enrollment_limit)
            .map_err(map_course_validation_error)
    }
}

fn map_course_validation_error(error: CourseValidationError) -> Error {
    let field = match error {
        CourseValidationError::EmptyCode | CourseValidationError::CodeTooLong { .. } => "code",
        CourseValidationError::EmptyName | CourseValidationError::NameTooLong { .. } => "name",
        CourseValidationError::ZeroCredits => "credits",
    };
    invalid_field_error(FieldName::new(field), error)
}

/// Students to admit, in processing order.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollRequest {
    pub student_ids: Vec<String>,
}

/// List courses with live seat counts.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching courses", body = [CourseListing]),
        (status = 401, description = "Login required", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "listCourses"
)]
#[get("/courses")]
pub async fn list_courses(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<Vec<CourseListing>>> {
    session.require_actor().await?;
    let needle = query.into_inner().q.unwrap_or_default();
    let listings = state.courses_query.list_courses(&needle).await?;
    Ok(web::Json(listings))
}

/// Create a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Students may not create courses", body = ErrorSchema),
        (status = 409, description = "Duplicate course code", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "createCourse"
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let request = payload.into_inner();
    let draft = request.draft()?;
    let teacher_id = request
        .teacher_id
        .as_deref()
        .map(|raw| parse_user_id(raw, FieldName::new("teacherId")))
        .transpose()?;
    let course = state
        .courses
        .create_course(actor, draft, teacher_id)
        .await?;
    Ok(HttpResponse::Created().json(course))
}

/// Replace a course's attributes.
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course identifier")),
    request_body = CourseRequest,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Not the course owner", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "updateCourse"
)]
#[put("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CourseRequest>,
) -> ApiResult<web::Json<Course>> {
    let actor = session.require_actor().await?;
    let course_id = parse_uuid(&path.into_inner(), COURSE_ID)?;
    let draft = payload.into_inner().draft()?;
    let course = state
        .courses
        .update_course(actor, course_id, draft)
        .await?;
    Ok(web::Json(course))
}

/// Delete a course and its enrollments. Grade history is retained.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course identifier")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 403, description = "Not the course owner", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse"
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let course_id = parse_uuid(&path.into_inner(), COURSE_ID)?;
    state.courses.delete_course(actor, course_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Admit each listed student in order. Per-student failures are reported
/// in the body rather than failing the call.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/bulk-enroll",
    params(("id" = String, Path, description = "Course identifier")),
    request_body = BulkEnrollRequest,
    responses(
        (status = 200, description = "Per-student outcomes", body = BulkEnrollmentReport),
        (status = 400, description = "Malformed id list", body = ErrorSchema),
        (status = 403, description = "Not the course owner", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "bulkEnroll"
)]
#[post("/courses/{id}/bulk-enroll")]
pub async fn bulk_enroll(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<BulkEnrollRequest>,
) -> ApiResult<web::Json<BulkEnrollmentReport>> {
    let actor = session.require_actor().await?;
    let course_id = parse_uuid(&path.into_inner(), COURSE_ID)?;
    let student_ids = parse_user_id_list(
        &payload.student_ids,
        FieldName::new("studentIds"),
        BULK_ENROLL_MAX,
    )?;
    let report = state
        .enrollments
        .bulk_enroll(actor, course_id, student_ids)
        .await?;
    info!(
        %course_id,
        admitted = report.admitted(),
        skipped = report.skipped(),
        "bulk enrollment handled"
    );
    Ok(web::Json(report))
}

/// Students enrolled in a course with their canonical grades.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/roster",
    params(("id" = String, Path, description = "Course identifier")),
    responses(
        (status = 200, description = "Course roster", body = Roster),
        (status = 403, description = "Not the course owner", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "courseRoster"
)]
#[get("/courses/{id}/roster")]
pub async fn roster(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Roster>> {
    let actor = session.require_actor().await?;
    let course_id = parse_uuid(&path.into_inner(), COURSE_ID)?;
    let roster = state.enrollments_query.roster(actor, course_id).await?;
    Ok(web::Json(roster))
}
