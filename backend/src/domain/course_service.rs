//! Course catalogue service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::domain::ports::{
    CourseCommand, CourseQuery, CourseRepository, CourseRepositoryError, UserRepository,
};
use crate::domain::service_support::require_role;
use crate::domain::{Actor, Course, CourseDraft, CourseListing, Error, Role, UserId};

fn map_course_write_error(error: CourseRepositoryError) -> Error {
    match error {
        CourseRepositoryError::DuplicateCode { code } => Error::conflict(
            "duplicate_code",
            format!("course code {code} is already in use"),
        ),
        CourseRepositoryError::UnknownTeacher => {
            Error::invalid_request("course teacher does not exist")
        }
        other => Error::from(other),
    }
}

/// Course service implementing the catalogue driving ports.
#[derive(Clone)]
pub struct CourseCatalogueService<C, U> {
    courses: Arc<C>,
    users: Arc<U>,
}

impl<C, U> CourseCatalogueService<C, U> {
    pub fn new(courses: Arc<C>, users: Arc<U>) -> Self {
        Self { courses, users }
    }
}

impl<C, U> CourseCatalogueService<C, U>
where
    C: CourseRepository,
    U: UserRepository,
{
    async fn owning_teacher(
        &self,
        actor: &Actor,
        requested: Option<UserId>,
    ) -> Result<UserId, Error> {
        match actor.role {
            Role::Teacher => match requested {
                Some(id) if id != actor.user_id => Err(Error::forbidden(
                    "teachers may only create their own courses",
                )),
                _ => Ok(actor.user_id),
            },
            Role::Admin => {
                let id = requested
                    .ok_or_else(|| Error::invalid_request("teacherId is required for admins"))?;
                let teacher = self
                    .users
                    .find_by_id(id)
                    .await
                    .map_err(Error::from)?
                    .filter(|user| user.role() == Role::Teacher);
                teacher
                    .map(|user| user.id())
                    .ok_or_else(|| Error::invalid_request("teacherId must name a teacher"))
            }
            Role::Student => Err(Error::forbidden("student accounts may not create courses")),
        }
    }

    async fn managed_course(&self, actor: &Actor, course_id: Uuid) -> Result<Course, Error> {
        let course = self
            .courses
            .find_by_id(course_id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))?;
        if course.is_managed_by(actor) {
            Ok(course)
        } else {
            Err(Error::forbidden("only the course teacher may change this course"))
        }
    }
}

#[async_trait]
impl<C, U> CourseCommand for CourseCatalogueService<C, U>
where
    C: CourseRepository,
    U: UserRepository,
{
    async fn create_course(
        &self,
        actor: Actor,
        draft: CourseDraft,
        teacher_id: Option<UserId>,
    ) -> Result<Course, Error> {
        require_role(&actor, &[Role::Teacher, Role::Admin], "create courses")?;
        let teacher_id = self.owning_teacher(&actor, teacher_id).await?;
        let course = Course::from_draft(Uuid::new_v4(), teacher_id, draft);
        self.courses
            .create(&course)
            .await
            .map_err(map_course_write_error)?;
        info!(course_id = %course.id, code = %course.code, %teacher_id, "course created");
        Ok(course)
    }

    async fn update_course(
        &self,
        actor: Actor,
        course_id: Uuid,
        draft: CourseDraft,
    ) -> Result<Course, Error> {
        let updated = self.managed_course(&actor, course_id).await?.with_draft(draft);
        let found = self
            .courses
            .update(&updated)
            .await
            .map_err(map_course_write_error)?;
        if !found {
            return Err(Error::not_found(format!("course {course_id} not found")));
        }
        info!(%course_id, limit = updated.enrollment_limit, "course updated");
        Ok(updated)
    }

    async fn delete_course(&self, actor: Actor, course_id: Uuid) -> Result<(), Error> {
        self.managed_course(&actor, course_id).await?;
        let removed = self
            .courses
            .delete(course_id)
            .await
            .map_err(Error::from)?;
        if !removed {
            return Err(Error::not_found(format!("course {course_id} not found")));
        }
        info!(%course_id, "course deleted");
        Ok(())
    }
}

#[async_trait]
impl<C, U> CourseQuery for CourseCatalogueService<C, U>
where
    C: CourseRepository,
    U: UserRepository,
{
    async fn list_courses(&self, query: &str) -> Result<Vec<CourseListing>, Error> {
        self.courses.list(query).await.map_err(Error::from)
    }
}
