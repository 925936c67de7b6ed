//! Grade assignment and grade reads over the append-only ledger.
//!
//! Reads never trust a stored "current grade". Each call fetches one
//! transcript snapshot and resolves it from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    AcademicRecordRepository, AssignGradeRequest, CourseRepository, EnrollmentRepository,
    GradeCommand, GradeLedgerRepository, GradeQuery, TranscriptSnapshot,
};
use crate::domain::service_support::require_role;
use crate::domain::{
    Actor, CourseGrade, Error, GpaSummary, GradeEvent, GradeScale, NewGradeEvent, Role, UserId,
    resolve_latest,
};

/// Store handles used by [`GradingService`].
#[derive(Clone)]
pub struct GradingStores<L, C, E, A> {
    pub ledger: Arc<L>,
    pub courses: Arc<C>,
    pub enrollments: Arc<E>,
    pub records: Arc<A>,
}

/// Grading service implementing the grade driving ports.
#[derive(Clone)]
pub struct GradingService<L, C, E, A> {
    stores: GradingStores<L, C, E, A>,
    scale: Arc<GradeScale>,
    clock: Arc<dyn Clock>,
}

impl<L, C, E, A> GradingService<L, C, E, A> {
    pub fn new(
        stores: GradingStores<L, C, E, A>,
        scale: Arc<GradeScale>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stores,
            scale,
            clock,
        }
    }
}

impl<L, C, E, A> GradingService<L, C, E, A>
where
    A: AcademicRecordRepository,
{
    async fn transcript(&self, student_id: UserId) -> Result<TranscriptSnapshot, Error> {
        self.stores
            .records
            .transcript_snapshot(student_id)
            .await
            .map_err(Error::from)
    }
}

fn canonical_grades(snapshot: TranscriptSnapshot) -> Vec<CourseGrade> {
    let canonical = resolve_latest(&snapshot.events);
    let mut grades: Vec<CourseGrade> = snapshot
        .courses
        .into_iter()
        .filter_map(|course| {
            let grade = canonical.get(&course.id)?.clone();
            Some(CourseGrade {
                course_id: course.id,
                course_code: course.code,
                course_name: course.name,
                credits: course.credits,
                grade,
            })
        })
        .collect();
    grades.sort_by(|a, b| a.course_code.cmp(&b.course_code));
    grades
}

#[async_trait]
impl<L, C, E, A> GradeCommand for GradingService<L, C, E, A>
where
    L: GradeLedgerRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    A: AcademicRecordRepository,
{
    async fn assign_grade(
        &self,
        actor: Actor,
        request: AssignGradeRequest,
    ) -> Result<GradeEvent, Error> {
        require_role(&actor, &[Role::Teacher, Role::Admin], "assign grades")?;
        let course = self
            .stores
            .courses
            .find_by_id(request.course_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("course {} not found", request.course_id)))?;
        if !course.is_managed_by(&actor) {
            return Err(Error::forbidden("only the course teacher may assign grades"));
        }
        let enrolled = self
            .stores
            .enrollments
            .is_enrolled(request.student_id, request.course_id)
            .await
            .map_err(Error::from)?;
        if !enrolled {
            return Err(Error::invalid_request(
                "student is not enrolled in this course",
            ));
        }

        let event = self
            .stores
            .ledger
            .append(NewGradeEvent {
                student_id: request.student_id,
                course_id: request.course_id,
                value: request.value,
                assigned_at: self.clock.utc(),
                assigned_by: actor.user_id,
            })
            .await
            .map_err(Error::from)?;
        info!(
            event_id = event.id,
            student_id = %event.student_id,
            course_id = %event.course_id,
            grade = %event.value,
            "grade assigned"
        );
        Ok(event)
    }
}

#[async_trait]
impl<L, C, E, A> GradeQuery for GradingService<L, C, E, A>
where
    L: GradeLedgerRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    A: AcademicRecordRepository,
{
    async fn my_grades(&self, actor: Actor) -> Result<Vec<CourseGrade>, Error> {
        require_role(&actor, &[Role::Student], "hold grades")?;
        Ok(canonical_grades(self.transcript(actor.user_id).await?))
    }

    async fn my_gpa(&self, actor: Actor) -> Result<GpaSummary, Error> {
        require_role(&actor, &[Role::Student], "hold grades")?;
        let snapshot = self.transcript(actor.user_id).await?;
        let canonical = resolve_latest(&snapshot.events);
        let credits: HashMap<Uuid, u32> = snapshot
            .courses
            .iter()
            .map(|course| (course.id, course.credits))
            .collect();
        Ok(GpaSummary::from_canonical(&canonical, &credits, &self.scale))
    }

    async fn grade_history(
        &self,
        actor: Actor,
        student_id: UserId,
        course_id: Uuid,
    ) -> Result<Vec<GradeEvent>, Error> {
        if actor.user_id != student_id {
            let course = self
                .stores
                .courses
                .find_by_id(course_id)
                .await
                .map_err(Error::from)?
                .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
            if !course.is_managed_by(&actor) {
                return Err(Error::forbidden("not permitted to view this grade history"));
            }
        }
        let mut events = self
            .stores
            .ledger
            .history(student_id, course_id)
            .await
            .map_err(Error::from)?;
        events.sort_by_key(|event| (event.assigned_at, event.id));
        Ok(events)
    }
}
