//! Authentication handlers.
//!
//! ```text
//! POST /api/v1/auth/login    {"email":"ada@example.edu","password":"..."}
//! POST /api/v1/auth/register {"name":"Ada","email":"...","password":"...","studentCode":"S-1"}
//! POST /api/v1/auth/logout   Authorization: Bearer <token>
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::ports::AuthenticatedSession;
use crate::domain::{
    Error, LoginCredentials, LoginValidationError, NewAccount, RoleProfile, UserValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_field_error};

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-registration body. Always creates a student account; a code is
/// minted when `studentCode` is omitted.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub student_code: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
}

/// Attach the offending field to an account validation failure.
pub(crate) fn map_account_error(error: LoginValidationError) -> Error {
    let field = match &error {
        LoginValidationError::InvalidEmail
        | LoginValidationError::User(UserValidationError::InvalidEmail) => "email",
        LoginValidationError::EmptyPassword | LoginValidationError::PasswordTooShort { .. } => {
            "password"
        }
        LoginValidationError::User(UserValidationError::EmptyStudentCode) => "studentCode",
        LoginValidationError::User(UserValidationError::UnknownRole) => "role",
        LoginValidationError::User(UserValidationError::InvalidId) => "id",
        LoginValidationError::User(
            UserValidationError::EmptyName | UserValidationError::NameTooLong { .. },
        ) => "name",
    };
    invalid_field_error(FieldName::new(field), error)
}

pub(crate) fn student_profile(code: &str, major: Option<String>) -> Result<RoleProfile, Error> {
    RoleProfile::student(code, major)
        .map_err(|err| map_account_error(LoginValidationError::User(err)))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = AuthenticatedSession),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<AuthenticatedSession>> {
    let LoginRequest { email, password } = payload.into_inner();
    let credentials =
        LoginCredentials::try_from_parts(&email, &password).map_err(map_account_error)?;
    let session = state.accounts.login(credentials).await?;
    Ok(web::Json(session))
}

/// Create a student account and open a session for it.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthenticatedSession),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner();
    let profile = match request.student_code.as_deref() {
        Some(code) => student_profile(code, request.major)?,
        None => RoleProfile::student_with_generated_code(request.major),
    };
    let account = NewAccount::try_new(&request.name, &request.email, &request.password, profile)
        .map_err(map_account_error)?;
    let session = state.accounts.register(account).await?;
    Ok(HttpResponse::Created().json(session))
}

/// End the presented session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "No bearer token", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let token = session.require_token()?;
    state.accounts.logout(token).await?;
    Ok(HttpResponse::NoContent().finish())
}
