//! Enrollment admission and bulk orchestration.
//!
//! Every admission, single or bulk, goes through
//! [`EnrollmentRepository::admit`], which evaluates and commits under the
//! course's critical section. Bulk enrollment is a sequence of independent
//! admissions: earlier admissions are never rolled back when a later one
//! fails, and each admission sees the seats consumed by the ones before it.
//! A store failure on one student becomes a `store_unavailable` line; the
//! batch carries on.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    AcademicRecordRepository, CourseRepository, EnrollmentCommand, EnrollmentQuery,
    EnrollmentRepository,
};
use crate::domain::service_support::require_role;
use crate::domain::{
    Actor, AdmissionOutcome, AdmissionRejection, AdmissionRequest, BulkEnrollmentReport, EnrolledCourse, Enrollment,
    Error, Role, Roster, RosterEntry, RoleProfile, UserId, resolve_latest_by_student,
};

/// Upper bound on ids accepted by one bulk call.
pub const BULK_ENROLL_MAX: usize = 500;

/// Enrollment service implementing the enrollment driving ports.
#[derive(Clone)]
pub struct EnrollmentService<E, C, A> {
    enrollments: Arc<E>,
    courses: Arc<C>,
    records: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<E, C, A> EnrollmentService<E, C, A> {
    /// Create a service over the given stores.
    pub fn new(
        enrollments: Arc<E>,
        courses: Arc<C>,
        records: Arc<A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            records,
            clock,
        }
    }
}

impl<E, C, A> EnrollmentService<E, C, A>
where
    E: EnrollmentRepository,
    C: CourseRepository,
{
    fn admission_request(&self, student_id: UserId, course_id: Uuid) -> AdmissionRequest {
        AdmissionRequest {
            enrollment_id: Uuid::new_v4(),
            student_id,
            course_id,
            requested_at: self.clock.utc(),
        }
    }

    async fn admit(&self, request: &AdmissionRequest) -> Result<AdmissionOutcome, Error> {
        let outcome = self
            .enrollments
            .admit(request)
            .await
            .map_err(Error::from)?;
        match &outcome {
            AdmissionOutcome::Admitted { seats_left, .. } => info!(
                student_id = %request.student_id,
                course_id = %request.course_id,
                seats_left,
                "enrollment admitted"
            ),
            AdmissionOutcome::Rejected { reason, .. } => debug!(
                student_id = %request.student_id,
                course_id = %request.course_id,
                reason = reason.as_str(),
                "enrollment rejected"
            ),
        }
        Ok(outcome)
    }
}

#[async_trait]
impl<E, C, A> EnrollmentCommand for EnrollmentService<E, C, A>
where
    E: EnrollmentRepository,
    C: CourseRepository,
    A: AcademicRecordRepository,
{
    async fn request_enrollment(
        &self,
        actor: Actor,
        course_id: Uuid,
    ) -> Result<Enrollment, Error> {
        require_role(&actor, &[Role::Student], "enroll in courses")?;
        let request = self.admission_request(actor.user_id, course_id);
        match self.admit(&request).await? {
            AdmissionOutcome::Admitted { enrollment, .. } => Ok(enrollment),
            AdmissionOutcome::Rejected { reason, .. } => Err(reason.into()),
        }
    }

    async fn cancel_enrollment(&self, actor: Actor, enrollment_id: Uuid) -> Result<(), Error> {
        let held = self
            .enrollments
            .find_by_id(enrollment_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("enrollment {enrollment_id} not found")))?;

        let is_holder = actor.user_id == held.enrollment.student_id;
        if !is_holder && !held.course.is_managed_by(&actor) {
            return Err(Error::forbidden("not permitted to cancel this enrollment"));
        }

        let removed = self
            .enrollments
            .remove(enrollment_id)
            .await
            .map_err(Error::from)?;
        if !removed {
            return Err(Error::not_found(format!(
                "enrollment {enrollment_id} not found"
            )));
        }
        info!(
            %enrollment_id,
            course_id = %held.course.id,
            student_id = %held.enrollment.student_id,
            "enrollment cancelled"
        );
        Ok(())
    }

    async fn bulk_enroll(
        &self,
        actor: Actor,
        course_id: Uuid,
        student_ids: Vec<UserId>,
    ) -> Result<BulkEnrollmentReport, Error> {
        require_role(&actor, &[Role::Teacher, Role::Admin], "bulk enroll students")?;
        if student_ids.len() > BULK_ENROLL_MAX {
            return Err(Error::invalid_request(format!(
                "at most {BULK_ENROLL_MAX} students may be enrolled per request"
            )));
        }
        let listing = self
            .courses
            .find_listing(course_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
        if !listing.course.is_managed_by(&actor) {
            return Err(Error::forbidden("only the course teacher may bulk enroll"));
        }

        let mut report = BulkEnrollmentReport {
            results: Vec::with_capacity(student_ids.len()),
            seats_left: listing.available_seats,
        };
        for student_id in student_ids {
            let request = self.admission_request(student_id, course_id);
            match self.admit(&request).await {
                Ok(outcome) => report.record(student_id, &outcome),
                Err(error) => {
                    warn!(
                        %student_id,
                        %course_id,
                        code = ?error.code(),
                        message = error.message(),
                        "bulk admission failed; continuing"
                    );
                    report.record_failure(student_id, AdmissionRejection::StoreUnavailable);
                }
            }
        }

        info!(
            %course_id,
            admitted = report.admitted(),
            skipped = report.skipped(),
            seats_left = report.seats_left,
            "bulk enrollment finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<E, C, A> EnrollmentQuery for EnrollmentService<E, C, A>
where
    E: EnrollmentRepository,
    C: CourseRepository,
    A: AcademicRecordRepository,
{
    async fn my_enrollments(&self, actor: Actor) -> Result<Vec<EnrolledCourse>, Error> {
        require_role(&actor, &[Role::Student], "hold enrollments")?;
        self.enrollments
            .for_student(actor.user_id)
            .await
            .map_err(Error::from)
    }

    async fn roster(&self, actor: Actor, course_id: Uuid) -> Result<Roster, Error> {
        let snapshot = self
            .records
            .roster_snapshot(course_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
        if !snapshot.course.is_managed_by(&actor) {
            return Err(Error::forbidden("only the course teacher may view the roster"));
        }

        let canonical = resolve_latest_by_student(&snapshot.events);
        let enrolled = u32::try_from(snapshot.students.len()).unwrap_or(u32::MAX);
        let students = snapshot
            .students
            .into_iter()
            .map(|(enrollment, user)| {
                let student_code = match user.profile() {
                    RoleProfile::Student { student_code, .. } => Some(student_code.clone()),
                    _ => None,
                };
                RosterEntry {
                    enrollment_id: enrollment.id,
                    student_id: user.id(),
                    name: user.name().clone(),
                    email: user.email().clone(),
                    student_code,
                    enrolled_at: enrollment.created_at,
                    latest_grade: canonical.get(&user.id()).map(|event| event.value),
                }
            })
            .collect();

        Ok(Roster {
            available_seats: snapshot.course.available_seats(enrolled),
            course: snapshot.course,
            students,
        })
    }
}

#[cfg(test)]
#[path = "enrollment_service_tests.rs"]
mod tests;
