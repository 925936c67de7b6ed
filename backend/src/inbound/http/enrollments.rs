//! Student enrollment handlers.
//!
//! ```text
//! GET    /api/v1/enrollments/me
//! POST   /api/v1/enrollments        {"courseId":"..."}
//! DELETE /api/v1/enrollments/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{EnrolledCourse, Enrollment};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid};

/// Seat request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub course_id: String,
}

/// Courses the calling student holds a seat in.
#[utoipa::path(
    get,
    path = "/api/v1/enrollments/me",
    responses(
        (status = 200, description = "Enrolled courses", body = [EnrolledCourse]),
        (status = 401, description = "Login required", body = ErrorSchema),
        (status = 403, description = "Students only", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "myEnrollments"
)]
#[get("/enrollments/me")]
pub async fn my_enrollments(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<EnrolledCourse>>> {
    let actor = session.require_actor().await?;
    let courses = state.enrollments_query.my_enrollments(actor).await?;
    Ok(web::Json(courses))
}

/// Take a seat. Refusals carry `details.reason`: `already_enrolled` or
/// `capacity_exceeded`.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments",
    request_body = EnrollmentRequest,
    responses(
        (status = 201, description = "Seat taken", body = Enrollment),
        (status = 403, description = "Students only", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema),
        (status = 409, description = "Already enrolled or course full", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "requestEnrollment"
)]
#[post("/enrollments")]
pub async fn request_enrollment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<EnrollmentRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let course_id = parse_uuid(&payload.course_id, FieldName::new("courseId"))?;
    let enrollment = state
        .enrollments
        .request_enrollment(actor, course_id)
        .await?;
    Ok(HttpResponse::Created().json(enrollment))
}

/// Release a seat.
#[utoipa::path(
    delete,
    path = "/api/v1/enrollments/{id}",
    params(("id" = String, Path, description = "Enrollment identifier")),
    responses(
        (status = 204, description = "Seat released"),
        (status = 403, description = "Not the seat holder", body = ErrorSchema),
        (status = 404, description = "Unknown enrollment", body = ErrorSchema)
    ),
    tags = ["enrollments"],
    operation_id = "cancelEnrollment"
)]
#[delete("/enrollments/{id}")]
pub async fn cancel_enrollment(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let enrollment_id = parse_uuid(&path.into_inner(), FieldName::new("enrollmentId"))?;
    state
        .enrollments
        .cancel_enrollment(actor, enrollment_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
