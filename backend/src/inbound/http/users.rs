//! Student search and the admin user directory.
//!
//! ```text
//! GET    /api/v1/students?q=ada
//! GET    /api/v1/admin/users?q=&role=TEACHER
//! POST   /api/v1/admin/users   {"name":"...","email":"...","password":"...","role":"TEACHER"}
//! PUT    /api/v1/admin/users/{id}   {"name":"...","email":"...","role":"STUDENT","studentCode":"S-1"}
//! DELETE /api/v1/admin/users/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountUpdate, Error, LoginValidationError, NewAccount, Role, RoleProfile, User,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{map_account_error, student_profile};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_user_id};

/// Free-text directory filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct StudentQuery {
    /// Matched against name, email, and student code.
    #[serde(default)]
    pub q: Option<String>,
}

/// Admin directory filter.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// `ADMIN`, `TEACHER`, or `STUDENT`. Blank means every role.
    #[serde(default)]
    pub role: Option<String>,
}

/// Account creation body for administrators.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[schema(example = "TEACHER")]
    pub role: String,
    #[serde(default)]
    pub student_code: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

fn parse_role(raw: &str) -> Result<Role, Error> {
    raw.parse()
        .map_err(|err| map_account_error(LoginValidationError::User(err)))
}

/// Account edit body for administrators. Every attribute is replaced; a
/// blank or absent password keeps the current one.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    #[schema(example = "STUDENT")]
    pub role: String,
    #[serde(default)]
    pub student_code: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// What to do when a student profile arrives without a code.
#[derive(Clone, Copy)]
enum MissingStudentCode {
    Mint,
    Reject,
}

fn role_profile(
    role: &str,
    student_code: Option<&str>,
    major: Option<&String>,
    department: Option<&str>,
    missing_code: MissingStudentCode,
) -> Result<RoleProfile, Error> {
    let profile = match parse_role(role)? {
        Role::Admin => RoleProfile::Admin,
        Role::Teacher => RoleProfile::Teacher {
            department: department
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
        },
        Role::Student => match (student_code, missing_code) {
            (Some(code), _) => student_profile(code, major.cloned())?,
            (None, MissingStudentCode::Mint) => {
                RoleProfile::student_with_generated_code(major.cloned())
            }
            (None, MissingStudentCode::Reject) => student_profile("", major.cloned())?,
        },
    };
    Ok(profile)
}

impl CreateUserRequest {
    fn profile(&self) -> Result<RoleProfile, Error> {
        role_profile(
            &self.role,
            self.student_code.as_deref(),
            self.major.as_ref(),
            self.department.as_deref(),
            MissingStudentCode::Mint,
        )
    }
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<AccountUpdate, Error> {
        let profile = role_profile(
            &self.role,
            self.student_code.as_deref(),
            self.major.as_ref(),
            self.department.as_deref(),
            MissingStudentCode::Reject,
        )?;
        AccountUpdate::try_new(&self.name, &self.email, profile, self.password.as_deref())
            .map_err(map_account_error)
    }
}

/// Students matching a query. Teachers and admins only.
#[utoipa::path(
    get,
    path = "/api/v1/students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Matching students", body = [User]),
        (status = 403, description = "Students may not search the directory", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "searchStudents"
)]
#[get("/students")]
pub async fn search_students(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<StudentQuery>,
) -> ApiResult<web::Json<Vec<User>>> {
    let actor = session.require_actor().await?;
    let needle = query.into_inner().q.unwrap_or_default();
    Ok(web::Json(state.directory.search_students(actor, needle).await?))
}

/// Every account matching the filters. Admins only.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Matching users", body = [User]),
        (status = 400, description = "Unknown role", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "listUsers"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<UserListQuery>,
) -> ApiResult<web::Json<Vec<User>>> {
    let actor = session.require_actor().await?;
    let UserListQuery { q, role } = query.into_inner();
    let role = role
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(parse_role)
        .transpose()?;
    let users = state
        .directory
        .list_users(actor, q.unwrap_or_default(), role)
        .await?;
    Ok(web::Json(users))
}

/// Create an account of any role. Admins only.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "createUser"
)]
#[post("/admin/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let request = payload.into_inner();
    let account = NewAccount::try_new(
        &request.name,
        &request.email,
        &request.password,
        request.profile()?,
    )
    .map_err(map_account_error)?;
    let user = state.directory.create_user(actor, account).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Replace an account's attributes. Admins only.
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, description = "Invalid request or own role change", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Unknown user", body = ErrorSchema),
        (status = 409, description = "Email taken, or the old role still holds courses or seats", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "updateUser"
)]
#[put("/admin/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<web::Json<User>> {
    let actor = session.require_actor().await?;
    let user_id = parse_user_id(&path.into_inner(), FieldName::new("id"))?;
    let update = payload.into_inner().into_update()?;
    let user = state.directory.update_user(actor, user_id, update).await?;
    Ok(web::Json(user))
}

/// Delete an account with its enrollments and sessions. Admins only.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Admins may not delete themselves", body = ErrorSchema),
        (status = 403, description = "Admins only", body = ErrorSchema),
        (status = 404, description = "Unknown user", body = ErrorSchema),
        (status = 409, description = "Teacher still owns courses", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "deleteUser"
)]
#[delete("/admin/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_actor().await?;
    let user_id = parse_user_id(&path.into_inner(), FieldName::new("id"))?;
    state.directory.delete_user(actor, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
