//! Grade ledger handlers.
//!
//! ```text
//! POST /api/v1/grades          {"studentId":"...","courseId":"...","value":"B+"}
//! GET  /api/v1/grades/me
//! GET  /api/v1/grades/me/gpa
//! GET  /api/v1/grades/history?studentId=...&courseId=...
//! ```

use std::str::FromStr;

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::ports::AssignGradeRequest;
use crate::domain::{CourseGrade, GpaSummary, GradeEvent, LetterGrade};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_field_error, parse_user_id, parse_uuid, require,
};

const STUDENT_ID: FieldName = FieldName::new("studentId");
const COURSE_ID: FieldName = FieldName::new("courseId");

/// Grade assignment body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub student_id: String,
    pub course_id: String,
    /// Letter grade such as `A-` or `B+`.
    pub value: String,
}

/// Selects one (student, course) ledger.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub student_id: Option<String>,
    pub course_id: Option<String>,
}

/// Append a grade event. The newest event becomes the canonical grade.
#[utoipa::path(
    post,
    path = "/api/v1/grades",
    request_body = GradeRequest,
    responses(
        (status = 201, description = "Grade recorded", body = GradeEvent),
        (status = 400, description = "Invalid grade or student not enrolled", body = ErrorSchema),
        (status = 403, description = "Not the course owner", body = ErrorSchema),
        (status = 404, description = "Unknown course", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "assignGrade"
)]
#[post("/grades")]
pub async fn assign_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<GradeRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let request = AssignGradeRequest {
        student_id: parse_user_id(&payload.student_id, STUDENT_ID)?,
        course_id: parse_uuid(&payload.course_id, COURSE_ID)?,
        value: LetterGrade::from_str(&payload.value)
            .map_err(|err| invalid_field_error(FieldName::new("value"), err))?,
    };
    let event = state.grades.assign_grade(actor, request).await?;
    Ok(HttpResponse::Created().json(event))
}

/// Canonical grade per course for the calling student.
#[utoipa::path(
    get,
    path = "/api/v1/grades/me",
    responses(
        (status = 200, description = "Canonical grades", body = [CourseGrade]),
        (status = 403, description = "Students only", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "myGrades"
)]
#[get("/grades/me")]
pub async fn my_grades(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<CourseGrade>>> {
    let actor = session.require_actor().await?;
    Ok(web::Json(state.grades_query.my_grades(actor).await?))
}

/// Credit-weighted GPA. `gpa` is `null` when nothing is graded.
#[utoipa::path(
    get,
    path = "/api/v1/grades/me/gpa",
    responses(
        (status = 200, description = "GPA summary", body = GpaSummary),
        (status = 403, description = "Students only", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "myGpa"
)]
#[get("/grades/me/gpa")]
pub async fn my_gpa(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<GpaSummary>> {
    let actor = session.require_actor().await?;
    Ok(web::Json(state.grades_query.my_gpa(actor).await?))
}

/// Every event for one (student, course) pair in ledger order.
#[utoipa::path(
    get,
    path = "/api/v1/grades/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Grade events", body = [GradeEvent]),
        (status = 400, description = "Missing or malformed ids", body = ErrorSchema),
        (status = 403, description = "Not permitted to view this ledger", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "gradeHistory"
)]
#[get("/grades/history")]
pub async fn grade_history(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<HistoryQuery>,
) -> ApiResult<web::Json<Vec<GradeEvent>>> {
    let actor = session.require_actor().await?;
    let HistoryQuery {
        student_id,
        course_id,
    } = query.into_inner();
    let student_id = parse_user_id(&require(student_id, STUDENT_ID)?, STUDENT_ID)?;
    let course_id = parse_uuid(&require(course_id, COURSE_ID)?, COURSE_ID)?;
    let events = state
        .grades_query
        .grade_history(actor, student_id, course_id)
        .await?;
    Ok(web::Json(events))
}
