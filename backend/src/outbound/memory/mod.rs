//! In-memory store implementing every persistence port.
//!
//! Used when no database URL is configured and by the HTTP integration
//! tests. All entity tables live behind one `RwLock`, so every read observes
//! a single consistent state. Admissions, course updates, and course
//! deletions for the same course additionally queue on a per-course async
//! mutex; the admission check and the insert then run inside one write-lock
//! critical section.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    AcademicRecordError, AcademicRecordRepository, CourseRepository, CourseRepositoryError,
    EnrollmentRepository, EnrollmentRepositoryError, GradeLedgerError, GradeLedgerRepository,
    RosterSnapshot, SessionStore, SessionStoreError, TranscriptSnapshot, UserPersistenceError,
    UserRepository,
};
use crate::domain::{
    Actor, AdmissionCheck, AdmissionOutcome, AdmissionRequest, Course, CourseListing,
    EmailAddress, EnrolledCourse, Enrollment, GradeEvent, NewGradeEvent, PasswordDigest, Role,
    SeatSnapshot, SessionToken, User, UserId,
};

const POISONED: &str = "in-memory store lock poisoned";

/// Marker for a poisoned lock, converted into each port's query error.
#[derive(Debug)]
struct Poisoned;

macro_rules! poisoned_as_query {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<Poisoned> for $error {
                fn from(_: Poisoned) -> Self {
                    <$error>::query(POISONED)
                }
            }
        )*
    };
}

poisoned_as_query!(
    CourseRepositoryError,
    EnrollmentRepositoryError,
    GradeLedgerError,
    AcademicRecordError,
    UserPersistenceError,
    SessionStoreError,
);

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    digest: PasswordDigest,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, StoredUser>,
    courses: HashMap<Uuid, Course>,
    enrollments: HashMap<Uuid, Enrollment>,
    grade_events: Vec<GradeEvent>,
    sessions: HashMap<String, Actor>,
}

impl State {
    fn active_in(&self, course_id: Uuid) -> u32 {
        let count = self
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn listing(&self, course: &Course) -> CourseListing {
        CourseListing::new(course.clone(), self.active_in(course.id))
    }

    fn holds_seat(&self, student_id: UserId, course_id: Uuid) -> bool {
        self.enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_id == course_id)
    }

    fn is_student(&self, id: UserId) -> bool {
        self.users
            .get(&id)
            .is_some_and(|stored| stored.user.role() == Role::Student)
    }

    fn enrolled_course(&self, enrollment: &Enrollment) -> Option<EnrolledCourse> {
        self.courses
            .get(&enrollment.course_id)
            .map(|course| EnrolledCourse {
                enrollment: enrollment.clone(),
                course: course.clone(),
            })
    }
}

/// Thread-safe in-memory implementation of the persistence ports.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    course_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    next_grade_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, Poisoned> {
        self.state.read().map_err(|_| Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, Poisoned> {
        self.state.write().map_err(|_| Poisoned)
    }

    /// Per-course lock, or `None` when the course does not exist.
    ///
    /// The lock table is held while existence is checked, so a concurrent
    /// delete either sees the new entry and removes it or leaves no entry.
    fn course_lock(
        &self,
        course_id: Uuid,
    ) -> Result<Option<Arc<tokio::sync::Mutex<()>>>, Poisoned> {
        let mut locks = self.course_locks.lock().map_err(|_| Poisoned)?;
        if !self.read()?.courses.contains_key(&course_id) {
            return Ok(None);
        }
        Ok(Some(Arc::clone(locks.entry(course_id).or_default())))
    }

    fn release_course_lock(&self, course_id: Uuid) -> Result<(), Poisoned> {
        self.course_locks
            .lock()
            .map_err(|_| Poisoned)?
            .remove(&course_id);
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn create(&self, course: &Course) -> Result<(), CourseRepositoryError> {
        let mut state = self.write()?;
        if state.courses.values().any(|c| c.code == course.code) {
            return Err(CourseRepositoryError::duplicate_code(course.code.clone()));
        }
        if !state.users.contains_key(&course.teacher_id) {
            return Err(CourseRepositoryError::unknown_teacher());
        }
        state.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn update(&self, course: &Course) -> Result<bool, CourseRepositoryError> {
        let Some(lock) = self.course_lock(course.id)? else {
            return Ok(false);
        };
        let _guard = lock.lock().await;
        let mut state = self.write()?;
        if state
            .courses
            .values()
            .any(|c| c.code == course.code && c.id != course.id)
        {
            return Err(CourseRepositoryError::duplicate_code(course.code.clone()));
        }
        match state.courses.get_mut(&course.id) {
            Some(existing) => {
                *existing = course.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, CourseRepositoryError> {
        let Some(lock) = self.course_lock(id)? else {
            return Ok(false);
        };
        let _guard = lock.lock().await;
        {
            let mut state = self.write()?;
            if state.courses.remove(&id).is_none() {
                return Ok(false);
            }
            state.enrollments.retain(|_, e| e.course_id != id);
        }
        self.release_course_lock(id)?;
        Ok(true)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Course>, CourseRepositoryError> {
        Ok(self.read()?.courses.get(&id).cloned())
    }

    async fn find_listing(&self, id: Uuid) -> Result<Option<CourseListing>, CourseRepositoryError> {
        let state = self.read()?;
        Ok(state.courses.get(&id).map(|course| state.listing(course)))
    }

    async fn list(&self, query: &str) -> Result<Vec<CourseListing>, CourseRepositoryError> {
        let state = self.read()?;
        let mut listings: Vec<CourseListing> = state
            .courses
            .values()
            .filter(|course| course.matches(query))
            .map(|course| state.listing(course))
            .collect();
        listings.sort_by(|a, b| a.course.code.cmp(&b.course.code));
        Ok(listings)
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryStore {
    async fn admit(
        &self,
        request: &AdmissionRequest,
    ) -> Result<AdmissionOutcome, EnrollmentRepositoryError> {
        // A missing course needs no lock: the check below rejects it.
        let lock = self.course_lock(request.course_id)?;
        let _guard = match &lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        let mut state = self.write()?;
        let check = AdmissionCheck {
            seats: state.courses.get(&request.course_id).map(|course| SeatSnapshot {
                enrollment_limit: course.enrollment_limit,
                active: state.active_in(course.id),
            }),
            student_is_known: state.is_student(request.student_id),
            already_enrolled: state.holds_seat(request.student_id, request.course_id),
        };
        let outcome = AdmissionOutcome::decide(request, &check);
        if let AdmissionOutcome::Admitted { enrollment, .. } = &outcome {
            state.enrollments.insert(enrollment.id, enrollment.clone());
        }
        debug!(course_id = %request.course_id, ?check, "admission evaluated");
        Ok(outcome)
    }

    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EnrolledCourse>, EnrollmentRepositoryError> {
        let state = self.read()?;
        Ok(state
            .enrollments
            .get(&id)
            .and_then(|e| state.enrolled_course(e)))
    }

    async fn remove(&self, id: Uuid) -> Result<bool, EnrollmentRepositoryError> {
        Ok(self.write()?.enrollments.remove(&id).is_some())
    }

    async fn for_student(
        &self,
        student_id: UserId,
    ) -> Result<Vec<EnrolledCourse>, EnrollmentRepositoryError> {
        let state = self.read()?;
        let mut held: Vec<EnrolledCourse> = state
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .filter_map(|e| state.enrolled_course(e))
            .collect();
        held.sort_by(|a, b| a.course.code.cmp(&b.course.code));
        Ok(held)
    }

    async fn is_enrolled(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<bool, EnrollmentRepositoryError> {
        Ok(self.read()?.holds_seat(student_id, course_id))
    }
}

#[async_trait]
impl GradeLedgerRepository for MemoryStore {
    async fn append(&self, event: NewGradeEvent) -> Result<GradeEvent, GradeLedgerError> {
        let mut state = self.write()?;
        let id = self.next_grade_id.fetch_add(1, Ordering::SeqCst) + 1;
        let event = event.into_event(id);
        state.grade_events.push(event.clone());
        Ok(event)
    }

    async fn history(
        &self,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<Vec<GradeEvent>, GradeLedgerError> {
        Ok(self
            .read()?
            .grade_events
            .iter()
            .filter(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AcademicRecordRepository for MemoryStore {
    async fn roster_snapshot(
        &self,
        course_id: Uuid,
    ) -> Result<Option<RosterSnapshot>, AcademicRecordError> {
        let state = self.read()?;
        let Some(course) = state.courses.get(&course_id).cloned() else {
            return Ok(None);
        };
        let mut students: Vec<(Enrollment, User)> = state
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .filter_map(|e| {
                state
                    .users
                    .get(&e.student_id)
                    .map(|stored| (e.clone(), stored.user.clone()))
            })
            .collect();
        students.sort_by(|(_, a), (_, b)| a.name().as_ref().cmp(b.name().as_ref()));
        let events = state
            .grade_events
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect();
        Ok(Some(RosterSnapshot {
            course,
            students,
            events,
        }))
    }

    async fn transcript_snapshot(
        &self,
        student_id: UserId,
    ) -> Result<TranscriptSnapshot, AcademicRecordError> {
        let state = self.read()?;
        let events: Vec<GradeEvent> = state
            .grade_events
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        let courses: BTreeMap<Uuid, Course> = events
            .iter()
            .filter_map(|e| state.courses.get(&e.course_id))
            .map(|course| (course.id, course.clone()))
            .collect();
        Ok(TranscriptSnapshot {
            events,
            courses: courses.into_values().collect(),
        })
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(
        &self,
        user: &User,
        digest: &PasswordDigest,
    ) -> Result<(), UserPersistenceError> {
        let mut state = self.write()?;
        if state.users.values().any(|s| s.user.email() == user.email()) {
            return Err(UserPersistenceError::duplicate_email(user.email().to_string()));
        }
        state.users.insert(
            user.id(),
            StoredUser {
                user: user.clone(),
                digest: digest.clone(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        Ok(self.read()?.users.get(&id).map(|s| s.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<(User, PasswordDigest)>, UserPersistenceError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|s| s.user.email() == email)
            .map(|s| (s.user.clone(), s.digest.clone())))
    }

    async fn search(
        &self,
        query: &str,
        role: Option<Role>,
    ) -> Result<Vec<User>, UserPersistenceError> {
        let state = self.read()?;
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|s| &s.user)
            .filter(|user| role.is_none_or(|r| user.role() == r))
            .filter(|user| user.matches(query))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name().as_ref().cmp(b.name().as_ref()));
        Ok(users)
    }

    async fn update<'a>(
        &self,
        user: &User,
        digest: Option<&'a PasswordDigest>,
    ) -> Result<bool, UserPersistenceError> {
        let id = user.id();
        let mut state = self.write()?;
        let Some(current) = state.users.get(&id).map(|stored| stored.user.role()) else {
            return Ok(false);
        };
        if state
            .users
            .values()
            .any(|s| s.user.email() == user.email() && s.user.id() != id)
        {
            return Err(UserPersistenceError::duplicate_email(user.email().to_string()));
        }
        let role_changed = current != user.role();
        if role_changed {
            if state.courses.values().any(|c| c.teacher_id == id) {
                return Err(UserPersistenceError::owns_courses());
            }
            if state.enrollments.values().any(|e| e.student_id == id) {
                return Err(UserPersistenceError::holds_enrollments());
            }
        }
        if role_changed || digest.is_some() {
            state.sessions.retain(|_, actor| actor.user_id != id);
        }
        if let Some(stored) = state.users.get_mut(&id) {
            stored.user = user.clone();
            if let Some(digest) = digest {
                stored.digest = digest.clone();
            }
        }
        Ok(true)
    }

    async fn delete(&self, id: UserId) -> Result<bool, UserPersistenceError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        if state.courses.values().any(|c| c.teacher_id == id) {
            return Err(UserPersistenceError::owns_courses());
        }
        state.users.remove(&id);
        state.enrollments.retain(|_, e| e.student_id != id);
        state.sessions.retain(|_, actor| actor.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn issue(&self, token: &SessionToken, actor: Actor) -> Result<(), SessionStoreError> {
        self.write()?
            .sessions
            .insert(token.as_str().to_owned(), actor);
        Ok(())
    }

    async fn resolve(&self, token: &SessionToken) -> Result<Option<Actor>, SessionStoreError> {
        Ok(self.read()?.sessions.get(token.as_str()).copied())
    }

    async fn revoke(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        self.write()?.sessions.remove(token.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
