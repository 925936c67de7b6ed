//! Grade ledger resolution and GPA aggregation over the HTTP surface.

mod support;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::test;
use registrar::server::build_app;
use rstest::rstest;
use serde_json::{Value, json};

use support::{
    ADMIN_EMAIL, ADMIN_PASSWORD, course, health, login, memory_state, register_student, request,
    send, teacher,
};

async fn enroll<S, B>(app: &S, token: &str, course_id: &str)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/enrollments",
            Some(token),
            Some(json!({ "courseId": course_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "enrollment failed: {body}");
}

async fn grade<S, B>(
    app: &S,
    token: &str,
    student_id: &str,
    course_id: &str,
    value: &str,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    send(
        app,
        request(
            Method::POST,
            "/api/v1/grades",
            Some(token),
            Some(json!({ "studentId": student_id, "courseId": course_id, "value": value })),
        ),
    )
    .await
}

#[rstest]
#[actix_web::test]
async fn newest_grade_event_is_canonical() {
    let app = test::init_service(build_app(health(), memory_state().await)).await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (teacher_token, _) = teacher(&app, &admin, "grace@example.edu").await;
    let course_id = course(&app, &teacher_token, "CS101", 4, 10).await;
    let (student_token, student_id) = register_student(&app, "Ada", "ada@example.edu").await;
    enroll(&app, &student_token, &course_id).await;

    let (status, first) = grade(&app, &teacher_token, &student_id, &course_id, "A-").await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let (status, second) = grade(&app, &teacher_token, &student_id, &course_id, "b+").await;
    assert_eq!(status, StatusCode::CREATED, "{second}");
    assert_eq!(second["value"], "B+");

    let (status, grades) = send(
        &app,
        request(Method::GET, "/api/v1/grades/me", Some(&student_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let grades = grades.as_array().expect("grades");
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0]["courseCode"], "CS101");
    assert_eq!(grades[0]["grade"]["value"], "B+");

    let (status, history) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/v1/grades/history?studentId={student_id}&courseId={course_id}"),
            Some(&teacher_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<&str> = history
        .as_array()
        .expect("history")
        .iter()
        .filter_map(|event| event["value"].as_str())
        .collect();
    assert_eq!(values, ["A-", "B+"]);
}

#[rstest]
#[actix_web::test]
async fn gpa_weights_canonical_grades_by_credits() {
    let app = test::init_service(build_app(health(), memory_state().await)).await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (teacher_token, _) = teacher(&app, &admin, "grace@example.edu").await;
    let four = course(&app, &teacher_token, "CS201", 4, 10).await;
    let three = course(&app, &teacher_token, "MA202", 3, 10).await;
    let (student_token, student_id) = register_student(&app, "Ada", "ada@example.edu").await;

    let (_, empty) = send(
        &app,
        request(Method::GET, "/api/v1/grades/me/gpa", Some(&student_token), None),
    )
    .await;
    assert_eq!(empty["gpa"], Value::Null);
    assert_eq!(empty["gradedCourses"], 0);

    enroll(&app, &student_token, &four).await;
    enroll(&app, &student_token, &three).await;
    grade(&app, &teacher_token, &student_id, &four, "C").await;
    grade(&app, &teacher_token, &student_id, &four, "B+").await;
    grade(&app, &teacher_token, &student_id, &three, "A").await;

    let (status, summary) = send(
        &app,
        request(Method::GET, "/api/v1/grades/me/gpa", Some(&student_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let gpa = summary["gpa"].as_f64().expect("gpa");
    assert!((gpa - 25.2 / 7.0).abs() < 1e-9, "unexpected gpa {gpa}");
    assert_eq!(summary["gradedCourses"], 2);
    assert_eq!(summary["gradedCredits"], 7);
}

#[rstest]
#[actix_web::test]
async fn only_the_course_teacher_assigns_grades() {
    let app = test::init_service(build_app(health(), memory_state().await)).await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (owner, _) = teacher(&app, &admin, "grace@example.edu").await;
    let (other, _) = teacher(&app, &admin, "edsger@example.edu").await;
    let course_id = course(&app, &owner, "CS301", 3, 10).await;
    let (student_token, student_id) = register_student(&app, "Ada", "ada@example.edu").await;
    enroll(&app, &student_token, &course_id).await;

    let (status, _) = grade(&app, &student_token, &student_id, &course_id, "A+").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = grade(&app, &other, &student_id, &course_id, "A+").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = grade(&app, &admin, &student_id, &course_id, "A+").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[rstest]
#[case("E")]
#[case("A++")]
#[actix_web::test]
async fn unknown_letters_are_rejected(#[case] value: &str) {
    let app = test::init_service(build_app(health(), memory_state().await)).await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (teacher_token, _) = teacher(&app, &admin, "grace@example.edu").await;
    let course_id = course(&app, &teacher_token, "CS401", 3, 10).await;
    let (student_token, student_id) = register_student(&app, "Ada", "ada@example.edu").await;
    enroll(&app, &student_token, &course_id).await;

    let (status, body) = grade(&app, &teacher_token, &student_id, &course_id, value).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[rstest]
#[actix_web::test]
async fn grading_requires_an_enrollment() {
    let app = test::init_service(build_app(health(), memory_state().await)).await;
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (teacher_token, _) = teacher(&app, &admin, "grace@example.edu").await;
    let course_id = course(&app, &teacher_token, "CS501", 3, 10).await;
    let (_, student_id) = register_student(&app, "Ada", "ada@example.edu").await;

    let (status, _) = grade(&app, &teacher_token, &student_id, &course_id, "B").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
