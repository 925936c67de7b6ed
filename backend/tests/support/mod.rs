//! Shared helpers for registrar integration tests.
//!
//! Every test gets a fresh in-memory store with a bootstrapped administrator
//! and talks to the real Actix app, either in-process or over a socket.

#![allow(
    dead_code,
    reason = "each test crate uses a different subset of these helpers"
)]

use std::net::TcpListener;
use std::sync::Arc;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{HttpServer, test, web};
use mockable::DefaultClock;
use registrar::domain::{GradeScale, NewAccount, RoleProfile};
use registrar::inbound::http::health::HealthState;
use registrar::inbound::http::state::HttpState;
use registrar::outbound::memory::MemoryStore;
use registrar::server::{MemoryStores, build_app};
use serde_json::{Value, json};

pub const ADMIN_EMAIL: &str = "root@example.edu";
pub const ADMIN_PASSWORD: &str = "correct-horse";
pub const PASSWORD: &str = "long-enough-1";

/// Fresh HTTP state over an empty store holding only the administrator.
pub async fn memory_state() -> web::Data<HttpState> {
    let stores = MemoryStores::memory(Arc::new(MemoryStore::new()));
    let admin = NewAccount::try_new("Root", ADMIN_EMAIL, ADMIN_PASSWORD, RoleProfile::Admin)
        .expect("valid admin account");
    stores
        .bootstrap_admin(Some(admin))
        .await
        .expect("admin bootstrap");
    web::Data::new(stores.http_state(Arc::new(GradeScale::standard()), Arc::new(DefaultClock)))
}

/// Ready health state for in-process apps.
pub fn health() -> web::Data<HealthState> {
    let state = web::Data::new(HealthState::new());
    state.mark_ready();
    state
}

/// Build a request with an optional bearer token and JSON body.
pub fn request(
    method: actix_web::http::Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request {
    let mut builder = test::TestRequest::default().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.insert_header((AUTHORIZATION, format!("Bearer {token}")));
    }
    if let Some(body) = body {
        builder = builder.set_json(body);
    }
    builder.to_request()
}

/// Send `req` and decode the body as JSON. Empty bodies decode to `Null`.
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let response = test::call_service(app, req).await;
    let status = response.status();
    let body = test::read_body(response).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("JSON body")
    };
    (status, value)
}

/// Log in and return the bearer token.
pub async fn login<S, B>(app: &S, email: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        request(
            actix_web::http::Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_owned()
}

/// Self-register a student. Returns `(token, user id)`.
pub async fn register_student<S, B>(app: &S, name: &str, email: &str) -> (String, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        request(
            actix_web::http::Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
    (
        body["token"].as_str().expect("token").to_owned(),
        body["user"]["id"].as_str().expect("user id").to_owned(),
    )
}

/// Create a teacher as the administrator and log in. Returns `(token, id)`.
pub async fn teacher<S, B>(app: &S, admin_token: &str, email: &str) -> (String, String)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        request(
            actix_web::http::Method::POST,
            "/api/v1/admin/users",
            Some(admin_token),
            Some(json!({
                "name": "Grace Hopper",
                "email": email,
                "password": PASSWORD,
                "role": "TEACHER",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "teacher creation failed: {body}");
    let id = body["id"].as_str().expect("teacher id").to_owned();
    (login(app, email, PASSWORD).await, id)
}

/// Create a course owned by the calling teacher. Returns the course id.
pub async fn course<S, B>(app: &S, token: &str, code: &str, credits: u32, limit: u32) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        request(
            actix_web::http::Method::POST,
            "/api/v1/courses",
            Some(token),
            Some(json!({
                "code": code,
                "name": format!("{code} seminar"),
                "credits": credits,
                "enrollmentLimit": limit,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "course creation failed: {body}");
    body["id"].as_str().expect("course id").to_owned()
}

/// Serve `state` on an ephemeral local port. Returns the base URL and the
/// handle used to stop the server.
pub fn spawn_server(state: web::Data<HttpState>) -> (url::Url, actix_web::dev::ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    let health = health();
    let server = HttpServer::new(move || build_app(health.clone(), state.clone()))
        .workers(1)
        .listen(listener)
        .expect("listen")
        .run();
    let handle = server.handle();
    actix_web::rt::spawn(server);
    let base = url::Url::parse(&format!("http://{addr}")).expect("base url");
    (base, handle)
}

/// Serve `state` with `workers` worker threads on a dedicated actix system
/// thread, so requests from a multi-threaded runtime are handled in
/// parallel. Returns the base URL and the handle used to stop the server.
pub fn spawn_threaded_server(
    state: web::Data<HttpState>,
    workers: usize,
) -> (url::Url, actix_web::dev::ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local address");
    let (started, handle) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        actix_web::rt::System::new().block_on(async move {
            let health = health();
            let server = HttpServer::new(move || build_app(health.clone(), state.clone()))
                .workers(workers)
                .listen(listener)
                .expect("listen")
                .run();
            started.send(server.handle()).expect("test is waiting");
            server.await.expect("server exits cleanly");
        });
    });
    let handle = handle.recv().expect("server started");
    let base = url::Url::parse(&format!("http://{addr}")).expect("base url");
    (base, handle)
}
