//! Tests for the in-memory store, including admission races.

use std::sync::Arc;

use chrono::Utc;
use rstest::rstest;

use super::*;
use crate::domain::{AdmissionRejection, CourseDraft, LetterGrade, PersonName, RoleProfile};

fn user(name: &str, profile: RoleProfile) -> User {
    User::new(
        UserId::random(),
        PersonName::new(name).expect("valid name"),
        EmailAddress::new(format!("{}@example.edu", name.to_lowercase())).expect("valid email"),
        profile,
    )
}

fn student(name: &str) -> User {
    user(name, RoleProfile::student(format!("S-{name}"), None).expect("valid profile"))
}

async fn add_user(store: &MemoryStore, user: &User) {
    UserRepository::create(store, user, &PasswordDigest::generate("password-1").expect("hash"))
        .await
        .expect("user stored");
}

struct Seeded {
    store: Arc<MemoryStore>,
    teacher: User,
    course: Course,
}

async fn seeded(limit: u32) -> Seeded {
    let store = Arc::new(MemoryStore::new());
    let teacher = user("Teacher", RoleProfile::Teacher { department: None });
    add_user(&store, &teacher).await;
    let draft = CourseDraft::try_new("CS101", "Programming", 3, limit).expect("valid draft");
    let course = Course::from_draft(Uuid::new_v4(), teacher.id(), draft);
    CourseRepository::create(store.as_ref(), &course)
        .await
        .expect("course stored");
    Seeded {
        store,
        teacher,
        course,
    }
}

fn request(student_id: UserId, course_id: Uuid) -> AdmissionRequest {
    AdmissionRequest {
        enrollment_id: Uuid::new_v4(),
        student_id,
        course_id,
        requested_at: Utc::now(),
    }
}

fn rejection(outcome: &AdmissionOutcome) -> Option<AdmissionRejection> {
    match outcome {
        AdmissionOutcome::Admitted { .. } => None,
        AdmissionOutcome::Rejected { reason, .. } => Some(*reason),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_seat_goes_to_exactly_one_of_many() {
    let Seeded { store, course, .. } = seeded(1).await;
    let mut students = Vec::new();
    for i in 0..16 {
        let s = student(&format!("Racer{i}"));
        add_user(&store, &s).await;
        students.push(s.id());
    }

    let handles: Vec<_> = students
        .into_iter()
        .map(|student_id| {
            let store = Arc::clone(&store);
            let course_id = course.id;
            tokio::spawn(async move { store.admit(&request(student_id, course_id)).await })
        })
        .collect();

    let mut admitted = 0;
    let mut capacity_rejections = 0;
    for handle in handles {
        let outcome = handle.await.expect("task joins").expect("store call");
        match rejection(&outcome) {
            None => admitted += 1,
            Some(AdmissionRejection::CapacityExceeded) => capacity_rejections += 1,
            Some(other) => panic!("unexpected rejection {other:?}"),
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(capacity_rejections, 15);
    let listing = store
        .find_listing(course.id)
        .await
        .expect("listing")
        .expect("course exists");
    assert_eq!(listing.enrolled, 1);
    assert_eq!(listing.available_seats, 0);
}

#[rstest]
#[tokio::test]
async fn duplicate_admission_is_rejected_and_cancel_frees_seat() {
    let Seeded { store, course, .. } = seeded(1).await;
    let ada = student("Ada");
    add_user(&store, &ada).await;

    let first = store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    let AdmissionOutcome::Admitted { enrollment, seats_left } = first else {
        panic!("first admission should succeed");
    };
    assert_eq!(seats_left, 0);

    let second = store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    assert_eq!(rejection(&second), Some(AdmissionRejection::AlreadyEnrolled));

    assert!(store.remove(enrollment.id).await.expect("remove"));
    assert!(!store.remove(enrollment.id).await.expect("remove twice"));

    let again = store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    assert!(rejection(&again).is_none(), "re-enrollment after cancel succeeds");
}

#[rstest]
#[tokio::test]
async fn unknown_students_and_courses_are_rejected() {
    let Seeded {
        store,
        course,
        teacher,
    } = seeded(5).await;

    let ghost = store
        .admit(&request(UserId::random(), course.id))
        .await
        .expect("store call");
    assert_eq!(rejection(&ghost), Some(AdmissionRejection::UnknownStudent));

    let not_a_student = store
        .admit(&request(teacher.id(), course.id))
        .await
        .expect("store call");
    assert_eq!(
        rejection(&not_a_student),
        Some(AdmissionRejection::UnknownStudent)
    );

    let missing = store
        .admit(&request(teacher.id(), Uuid::new_v4()))
        .await
        .expect("store call");
    assert_eq!(rejection(&missing), Some(AdmissionRejection::CourseNotFound));
    assert_eq!(missing.seats_left(), None);
}

#[rstest]
#[tokio::test]
async fn lowering_the_limit_never_reports_negative_seats() {
    let Seeded { store, course, .. } = seeded(3).await;
    for name in ["Ann", "Ben", "Cat"] {
        let s = student(name);
        add_user(&store, &s).await;
        store
            .admit(&request(s.id(), course.id))
            .await
            .expect("store call");
    }
    let mut smaller = course.clone();
    smaller.enrollment_limit = 1;
    assert!(CourseRepository::update(store.as_ref(), &smaller)
        .await
        .expect("update"));

    let listing = store
        .find_listing(course.id)
        .await
        .expect("listing")
        .expect("exists");
    assert_eq!(listing.enrolled, 3);
    assert_eq!(listing.available_seats, 0);
}

#[rstest]
#[tokio::test]
async fn deleting_a_course_drops_enrollments_but_keeps_grades() {
    let Seeded {
        store,
        course,
        teacher,
    } = seeded(3).await;
    let ada = student("Ada");
    add_user(&store, &ada).await;
    store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    store
        .append(NewGradeEvent {
            student_id: ada.id(),
            course_id: course.id,
            value: LetterGrade::A,
            assigned_at: Utc::now(),
            assigned_by: teacher.id(),
        })
        .await
        .expect("grade stored");

    assert!(CourseRepository::delete(store.as_ref(), course.id)
        .await
        .expect("delete"));
    assert!(store.for_student(ada.id()).await.expect("held").is_empty());
    assert_eq!(
        store.history(ada.id(), course.id).await.expect("history").len(),
        1
    );
    let transcript = store
        .transcript_snapshot(ada.id())
        .await
        .expect("transcript");
    assert_eq!(transcript.events.len(), 1);
    assert!(transcript.courses.is_empty());
}

fn tracked_locks(store: &MemoryStore) -> usize {
    store.course_locks.lock().expect("lock table").len()
}

#[rstest]
#[tokio::test]
async fn course_locks_exist_only_for_live_courses() {
    let Seeded { store, course, .. } = seeded(2).await;
    let ada = student("Ada");
    add_user(&store, &ada).await;

    store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    assert_eq!(tracked_locks(&store), 1);

    let stray = store
        .admit(&request(ada.id(), Uuid::new_v4()))
        .await
        .expect("store call");
    assert_eq!(rejection(&stray), Some(AdmissionRejection::CourseNotFound));
    assert_eq!(tracked_locks(&store), 1);

    assert!(CourseRepository::delete(store.as_ref(), course.id)
        .await
        .expect("delete"));
    assert_eq!(tracked_locks(&store), 0);

    let after = store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    assert_eq!(rejection(&after), Some(AdmissionRejection::CourseNotFound));
    assert_eq!(tracked_locks(&store), 0);
}

#[rstest]
#[tokio::test]
async fn grade_ids_increase_with_insertion() {
    let store = MemoryStore::new();
    let event = |value| NewGradeEvent {
        student_id: UserId::random(),
        course_id: Uuid::new_v4(),
        value,
        assigned_at: Utc::now(),
        assigned_by: UserId::random(),
    };
    let first = store.append(event(LetterGrade::B)).await.expect("append");
    let second = store.append(event(LetterGrade::C)).await.expect("append");
    assert!(second.id > first.id);
}

#[rstest]
#[tokio::test]
async fn roster_snapshot_orders_students_by_name() {
    let Seeded { store, course, .. } = seeded(5).await;
    for name in ["Zed", "Amy"] {
        let s = student(name);
        add_user(&store, &s).await;
        store
            .admit(&request(s.id(), course.id))
            .await
            .expect("store call");
    }
    let snapshot = store
        .roster_snapshot(course.id)
        .await
        .expect("snapshot")
        .expect("course exists");
    let names: Vec<_> = snapshot
        .students
        .iter()
        .map(|(_, u)| u.name().as_ref().to_owned())
        .collect();
    assert_eq!(names, vec!["Amy".to_owned(), "Zed".to_owned()]);
    assert!(store
        .roster_snapshot(Uuid::new_v4())
        .await
        .expect("snapshot")
        .is_none());
}

fn renamed(user: &User, name: &str, profile: RoleProfile) -> User {
    User::new(
        user.id(),
        PersonName::new(name).expect("valid name"),
        user.email().clone(),
        profile,
    )
}

#[rstest]
#[tokio::test]
async fn role_changes_are_refused_while_courses_or_seats_are_held() {
    let Seeded {
        store,
        teacher,
        course,
    } = seeded(2).await;
    let error = UserRepository::update(
        store.as_ref(),
        &renamed(&teacher, "Teacher", RoleProfile::Admin),
        None,
    )
    .await
    .expect_err("owns a course");
    assert_eq!(error, UserPersistenceError::OwnsCourses);

    let ada = student("Ada");
    add_user(&store, &ada).await;
    store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    let error = UserRepository::update(
        store.as_ref(),
        &renamed(&ada, "Ada", RoleProfile::Teacher { department: None }),
        None,
    )
    .await
    .expect_err("holds a seat");
    assert_eq!(error, UserPersistenceError::HoldsEnrollments);

    let kept_role = renamed(
        &ada,
        "Ada King",
        RoleProfile::student("S-Ada", Some("Mathematics".into())).expect("valid profile"),
    );
    assert!(UserRepository::update(store.as_ref(), &kept_role, None)
        .await
        .expect("same role"));
    assert_eq!(
        UserRepository::find_by_id(store.as_ref(), ada.id())
            .await
            .expect("lookup"),
        Some(kept_role)
    );
}

#[rstest]
#[tokio::test]
async fn password_reset_replaces_the_digest_and_revokes_sessions() {
    let store = MemoryStore::new();
    let ada = student("Ada");
    add_user(&store, &ada).await;
    let token = SessionToken::generate();
    store.issue(&token, ada.actor()).await.expect("issued");

    let digest = PasswordDigest::generate("new-password-9").expect("hash");
    assert!(UserRepository::update(&store, &ada, Some(&digest))
        .await
        .expect("updated"));

    assert_eq!(store.resolve(&token).await.expect("resolve"), None);
    let (_, stored) = store
        .find_credentials(ada.email())
        .await
        .expect("lookup")
        .expect("still registered");
    assert!(stored.verify("new-password-9"));
    assert!(!stored.verify("password-1"));
}

#[rstest]
#[tokio::test]
async fn updates_keep_emails_unique_and_report_missing_users() {
    let store = MemoryStore::new();
    let ada = student("Ada");
    let alan = student("Alan");
    add_user(&store, &ada).await;
    add_user(&store, &alan).await;

    let clash = User::new(
        alan.id(),
        alan.name().clone(),
        ada.email().clone(),
        alan.profile().clone(),
    );
    let error = UserRepository::update(&store, &clash, None)
        .await
        .expect_err("email taken");
    assert!(matches!(error, UserPersistenceError::DuplicateEmail { .. }));

    let ghost = student("Ghost");
    assert!(!UserRepository::update(&store, &ghost, None)
        .await
        .expect("store call"));
}

#[rstest]
#[tokio::test]
async fn users_are_unique_by_email_and_owners_cannot_be_deleted() {
    let Seeded { store, teacher, .. } = seeded(1).await;
    let duplicate = user("Teacher", RoleProfile::Admin);
    let error = UserRepository::create(
        store.as_ref(),
        &duplicate,
        &PasswordDigest::generate("password-2").expect("hash"),
    )
    .await
    .expect_err("duplicate email");
    assert!(matches!(error, UserPersistenceError::DuplicateEmail { .. }));

    let owner_error = UserRepository::delete(store.as_ref(), teacher.id())
        .await
        .expect_err("owner");
    assert_eq!(owner_error, UserPersistenceError::OwnsCourses);
}

#[rstest]
#[tokio::test]
async fn deleting_a_student_clears_enrollments_and_sessions() {
    let Seeded { store, course, .. } = seeded(2).await;
    let ada = student("Ada");
    add_user(&store, &ada).await;
    store
        .admit(&request(ada.id(), course.id))
        .await
        .expect("store call");
    let token = SessionToken::generate();
    store.issue(&token, ada.actor()).await.expect("issue");

    assert!(UserRepository::delete(store.as_ref(), ada.id())
        .await
        .expect("delete"));
    assert!(store.resolve(&token).await.expect("resolve").is_none());
    let listing = store
        .find_listing(course.id)
        .await
        .expect("listing")
        .expect("exists");
    assert_eq!(listing.enrolled, 0);
}

#[rstest]
#[tokio::test]
async fn search_filters_by_role_and_query() {
    let Seeded { store, .. } = seeded(1).await;
    for name in ["Ada", "Alan"] {
        add_user(&store, &student(name)).await;
    }
    let students = store
        .search("al", Some(Role::Student))
        .await
        .expect("search");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name().as_ref(), "Alan");
    let everyone = store.search("", None).await.expect("search");
    assert_eq!(everyone.len(), 3);
}

#[rstest]
#[tokio::test]
async fn sessions_resolve_until_revoked() {
    let store = MemoryStore::new();
    let token = SessionToken::generate();
    let actor = Actor::new(UserId::random(), Role::Admin);
    store.issue(&token, actor).await.expect("issue");
    assert_eq!(store.resolve(&token).await.expect("resolve"), Some(actor));
    store.revoke(&token).await.expect("revoke");
    assert_eq!(store.resolve(&token).await.expect("resolve"), None);
}
