//! OpenAPI shapes for the error envelope.
//!
//! The domain error type carries no utoipa derives, so its wire shape is
//! described here and registered under the domain names.

use utoipa::ToSchema;

/// Error category returned as `code`.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// Malformed body, query, or path parameter.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No valid bearer token was presented.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The caller's role or ownership does not permit the action.
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    /// A registrar rule refused the change. See `details.reason`.
    #[schema(rename = "conflict")]
    Conflict,
    /// The database is unreachable; retrying later may succeed.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// Machine-readable reason attached to `conflict` errors.
#[derive(ToSchema)]
pub enum ConflictReason {
    /// The course has no seats left.
    #[schema(rename = "capacity_exceeded")]
    CapacityExceeded,
    /// The student already holds an active enrollment in the course.
    #[schema(rename = "already_enrolled")]
    AlreadyEnrolled,
    #[schema(rename = "duplicate_email")]
    DuplicateEmail,
    #[schema(rename = "duplicate_code")]
    DuplicateCode,
    /// The teacher still owns courses.
    #[schema(rename = "owns_courses")]
    OwnsCourses,
    /// The student still holds enrollments, so their role cannot change.
    #[schema(rename = "holds_enrollments")]
    HoldsEnrollments,
}

/// `details` payload of a `conflict` error.
#[derive(ToSchema)]
#[expect(dead_code, reason = "only read by utoipa when building the document")]
pub struct ConflictDetails {
    reason: ConflictReason,
}

/// Error envelope returned with every non-success status.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[expect(dead_code, reason = "only read by utoipa when building the document")]
pub struct ErrorSchema {
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    #[schema(example = "course CS101 has no seats left")]
    message: String,
    /// Copy of `message`.
    #[schema(example = "course CS101 has no seats left")]
    error: String,
    /// Same value as the `trace-id` response header.
    #[schema(rename = "traceId", example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    /// `ConflictDetails` for conflicts; field diagnostics for invalid
    /// requests.
    #[schema(example = json!({ "reason": "capacity_exceeded" }))]
    details: Option<serde_json::Value>,
}
