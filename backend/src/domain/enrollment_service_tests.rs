//! Tests for the enrollment service.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    EnrollmentRepositoryError, MockAcademicRecordRepository, MockCourseRepository,
    MockEnrollmentRepository, RosterSnapshot,
};
use crate::domain::{
    AdmissionRejection, Course, CourseDraft, CourseListing, EmailAddress, ErrorCode, GradeEvent,
    LetterGrade, PersonName, User,
};

struct FixtureClock;

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }
}

type Service =
    EnrollmentService<MockEnrollmentRepository, MockCourseRepository, MockAcademicRecordRepository>;

fn service(
    enrollments: MockEnrollmentRepository,
    courses: MockCourseRepository,
    records: MockAcademicRecordRepository,
) -> Service {
    EnrollmentService::new(
        Arc::new(enrollments),
        Arc::new(courses),
        Arc::new(records),
        Arc::new(FixtureClock),
    )
}

#[fixture]
fn teacher() -> Actor {
    Actor::new(UserId::random(), Role::Teacher)
}

#[fixture]
fn student() -> Actor {
    Actor::new(UserId::random(), Role::Student)
}

fn course_owned_by(teacher: UserId, limit: u32) -> Course {
    let draft = CourseDraft::try_new("PHY200", "Mechanics", 4, limit).expect("valid draft");
    Course::from_draft(Uuid::new_v4(), teacher, draft)
}

fn admitted(request: &AdmissionRequest, seats_left: u32) -> AdmissionOutcome {
    AdmissionOutcome::Admitted {
        enrollment: request.enrollment(),
        seats_left,
    }
}

#[rstest]
#[tokio::test]
async fn request_enrollment_returns_new_enrollment(student: Actor) {
    let course_id = Uuid::new_v4();
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_admit()
        .withf(move |request| request.course_id == course_id)
        .times(1)
        .returning(|request| Ok(admitted(request, 4)));

    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let enrollment = svc
        .request_enrollment(student, course_id)
        .await
        .expect("admitted");

    assert_eq!(enrollment.student_id, student.user_id);
    assert_eq!(enrollment.course_id, course_id);
    assert_eq!(enrollment.created_at, FixtureClock.utc());
}

#[rstest]
#[case(AdmissionRejection::AlreadyEnrolled, ErrorCode::Conflict)]
#[case(AdmissionRejection::CapacityExceeded, ErrorCode::Conflict)]
#[case(AdmissionRejection::CourseNotFound, ErrorCode::NotFound)]
#[tokio::test]
async fn request_enrollment_maps_rejections(
    student: Actor,
    #[case] reason: AdmissionRejection,
    #[case] expected: ErrorCode,
) {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().returning(move |_| {
        Ok(AdmissionOutcome::Rejected {
            reason,
            seats_left: Some(0),
        })
    });

    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let error = svc
        .request_enrollment(student, Uuid::new_v4())
        .await
        .expect_err("rejected");
    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn teachers_cannot_self_enroll(teacher: Actor) {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().times(0);
    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let error = svc
        .request_enrollment(teacher, Uuid::new_v4())
        .await
        .expect_err("forbidden");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn store_outage_surfaces_as_service_unavailable(student: Actor) {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_admit()
        .returning(|_| Err(EnrollmentRepositoryError::connection("pool exhausted")));
    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let error = svc
        .request_enrollment(student, Uuid::new_v4())
        .await
        .expect_err("unavailable");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

fn held(student_id: UserId, course: Course) -> EnrolledCourse {
    EnrolledCourse {
        enrollment: Enrollment {
            id: Uuid::new_v4(),
            student_id,
            course_id: course.id,
            created_at: FixtureClock.utc(),
        },
        course,
    }
}

#[rstest]
#[case::holder(true, Role::Student, true)]
#[case::other_student(false, Role::Student, false)]
#[case::other_teacher(false, Role::Teacher, false)]
#[case::admin(false, Role::Admin, true)]
#[tokio::test]
async fn cancel_enrollment_permissions(
    #[case] acting_as_holder: bool,
    #[case] role: Role,
    #[case] allowed: bool,
) {
    let holder = UserId::random();
    let record = held(holder, course_owned_by(UserId::random(), 10));
    let enrollment_id = record.enrollment.id;
    let actor = if acting_as_holder {
        Actor::new(holder, role)
    } else {
        Actor::new(UserId::random(), role)
    };

    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_find_by_id()
        .returning(move |_| Ok(Some(record.clone())));
    enrollments
        .expect_remove()
        .times(usize::from(allowed))
        .returning(|_| Ok(true));

    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let result = svc.cancel_enrollment(actor, enrollment_id).await;
    match result {
        Ok(()) => assert!(allowed),
        Err(error) => {
            assert!(!allowed);
            assert_eq!(error.code(), ErrorCode::Forbidden);
        }
    }
}

#[rstest]
#[tokio::test]
async fn owning_teacher_may_cancel(teacher: Actor) {
    let record = held(UserId::random(), course_owned_by(teacher.user_id, 10));
    let enrollment_id = record.enrollment.id;
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments
        .expect_find_by_id()
        .returning(move |_| Ok(Some(record.clone())));
    enrollments.expect_remove().times(1).returning(|_| Ok(true));

    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    svc.cancel_enrollment(teacher, enrollment_id)
        .await
        .expect("owner cancels");
}

#[rstest]
#[tokio::test]
async fn cancel_missing_enrollment_is_not_found(student: Actor) {
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_find_by_id().returning(|_| Ok(None));
    let svc = service(
        enrollments,
        MockCourseRepository::new(),
        MockAcademicRecordRepository::new(),
    );
    let error = svc
        .cancel_enrollment(student, Uuid::new_v4())
        .await
        .expect_err("missing");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn bulk_enroll_reports_each_student_in_order(teacher: Actor) {
    let course = course_owned_by(teacher.user_id, 2);
    let course_id = course.id;
    let listing = CourseListing::new(course, 0);
    let ids = vec![UserId::random(), UserId::random(), UserId::random()];

    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_listing()
        .returning(move |_| Ok(Some(listing.clone())));

    let mut seats = 2_u32;
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().times(3).returning(move |request| {
        if seats == 0 {
            return Ok(AdmissionOutcome::Rejected {
                reason: AdmissionRejection::CapacityExceeded,
                seats_left: Some(0),
            });
        }
        seats -= 1;
        Ok(admitted(request, seats))
    });

    let svc = service(enrollments, courses, MockAcademicRecordRepository::new());
    let report = svc
        .bulk_enroll(teacher, course_id, ids.clone())
        .await
        .expect("bulk call succeeds");

    let observed: Vec<_> = report
        .results
        .iter()
        .map(|r| (r.student_id, r.ok, r.reason))
        .collect();
    assert_eq!(
        observed,
        vec![
            (ids[0], true, None),
            (ids[1], true, None),
            (ids[2], false, Some(AdmissionRejection::CapacityExceeded)),
        ]
    );
    assert_eq!(report.seats_left, 0);
}

#[rstest]
#[tokio::test]
async fn bulk_enroll_keeps_going_after_a_store_failure(teacher: Actor) {
    let course = course_owned_by(teacher.user_id, 5);
    let course_id = course.id;
    let listing = CourseListing::new(course, 0);
    let ids = vec![UserId::random(), UserId::random(), UserId::random()];
    let flaky = ids[1];

    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_listing()
        .returning(move |_| Ok(Some(listing.clone())));

    let mut seats = 5_u32;
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().times(3).returning(move |request| {
        if request.student_id == flaky {
            return Err(EnrollmentRepositoryError::connection("connection reset"));
        }
        seats -= 1;
        Ok(admitted(request, seats))
    });

    let svc = service(enrollments, courses, MockAcademicRecordRepository::new());
    let report = svc
        .bulk_enroll(teacher, course_id, ids.clone())
        .await
        .expect("bulk call reports per student");

    let observed: Vec<_> = report
        .results
        .iter()
        .map(|r| (r.student_id, r.ok, r.reason))
        .collect();
    assert_eq!(
        observed,
        vec![
            (ids[0], true, None),
            (ids[1], false, Some(AdmissionRejection::StoreUnavailable)),
            (ids[2], true, None),
        ]
    );
    assert_eq!(report.seats_left, 3);
}

#[rstest]
#[tokio::test]
async fn bulk_enroll_with_no_ids_reports_current_seats(teacher: Actor) {
    let course = course_owned_by(teacher.user_id, 5);
    let course_id = course.id;
    let listing = CourseListing::new(course, 2);
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_listing()
        .returning(move |_| Ok(Some(listing.clone())));
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().times(0);

    let svc = service(enrollments, courses, MockAcademicRecordRepository::new());
    let report = svc
        .bulk_enroll(teacher, course_id, Vec::new())
        .await
        .expect("empty bulk call");
    assert!(report.results.is_empty());
    assert_eq!(report.seats_left, 3);
}

#[rstest]
#[tokio::test]
async fn bulk_enroll_requires_course_ownership(teacher: Actor) {
    let listing = CourseListing::new(course_owned_by(UserId::random(), 5), 0);
    let mut courses = MockCourseRepository::new();
    courses
        .expect_find_listing()
        .returning(move |_| Ok(Some(listing.clone())));
    let mut enrollments = MockEnrollmentRepository::new();
    enrollments.expect_admit().times(0);

    let svc = service(enrollments, courses, MockAcademicRecordRepository::new());
    let error = svc
        .bulk_enroll(teacher, Uuid::new_v4(), vec![UserId::random()])
        .await
        .expect_err("not the owner");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn bulk_enroll_unknown_course_is_not_found(teacher: Actor) {
    let mut courses = MockCourseRepository::new();
    courses.expect_find_listing().returning(|_| Ok(None));
    let svc = service(
        MockEnrollmentRepository::new(),
        courses,
        MockAcademicRecordRepository::new(),
    );
    let error = svc
        .bulk_enroll(teacher, Uuid::new_v4(), vec![UserId::random()])
        .await
        .expect_err("missing course");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

fn student_user(name: &str) -> User {
    User::new(
        UserId::random(),
        PersonName::new(name).expect("valid name"),
        EmailAddress::new(format!("{}@example.edu", name.to_lowercase())).expect("valid email"),
        RoleProfile::student(format!("S-{name}"), None).expect("valid profile"),
    )
}

#[rstest]
#[tokio::test]
async fn roster_attaches_canonical_grades(teacher: Actor) {
    let course = course_owned_by(teacher.user_id, 3);
    let course_id = course.id;
    let alice = student_user("Alice");
    let bob = student_user("Bob");
    let enrollment = |user: &User| Enrollment {
        id: Uuid::new_v4(),
        student_id: user.id(),
        course_id,
        created_at: FixtureClock.utc(),
    };
    let event = |id: i64, user: &User, value: LetterGrade, seconds: i64| GradeEvent {
        id,
        student_id: user.id(),
        course_id,
        value,
        assigned_at: Utc.timestamp_opt(seconds, 0).single(),
        assigned_by: teacher.user_id,
    };
    let snapshot = RosterSnapshot {
        course,
        students: vec![
            (enrollment(&alice), alice.clone()),
            (enrollment(&bob), bob.clone()),
        ],
        events: vec![
            event(1, &alice, LetterGrade::AMinus, 1),
            event(2, &alice, LetterGrade::BPlus, 2),
        ],
    };

    let mut records = MockAcademicRecordRepository::new();
    records
        .expect_roster_snapshot()
        .returning(move |_| Ok(Some(snapshot.clone())));

    let svc = service(MockEnrollmentRepository::new(), MockCourseRepository::new(), records);
    let roster = svc.roster(teacher, course_id).await.expect("roster");

    assert_eq!(roster.available_seats, 1);
    assert_eq!(roster.students.len(), 2);
    assert_eq!(roster.students[0].latest_grade, Some(LetterGrade::BPlus));
    assert_eq!(roster.students[0].student_code.as_deref(), Some("S-Alice"));
    assert_eq!(roster.students[1].latest_grade, None);
}

#[rstest]
#[tokio::test]
async fn students_cannot_view_rosters(student: Actor) {
    let course = course_owned_by(UserId::random(), 3);
    let snapshot = RosterSnapshot {
        course,
        students: Vec::new(),
        events: Vec::new(),
    };
    let mut records = MockAcademicRecordRepository::new();
    records
        .expect_roster_snapshot()
        .returning(move |_| Ok(Some(snapshot.clone())));
    let svc = service(MockEnrollmentRepository::new(), MockCourseRepository::new(), records);
    let error = svc
        .roster(student, Uuid::new_v4())
        .await
        .expect_err("forbidden");
    assert_eq!(error.code(), ErrorCode::Forbidden);
}
