//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer. Conversions into domain
//! types go through the validating constructors and fail with a message the
//! caller wraps in its port's query error.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Actor, Course, EmailAddress, Enrollment, GradeEvent, LetterGrade, PasswordDigest, PersonName,
    Role, RoleProfile, User, UserId,
};

use super::schema::{courses, enrollments, grade_events, sessions, users};

/// Convert an unsigned domain count into a Postgres `INTEGER`.
pub(crate) fn to_db_int(value: u32) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("value {value} exceeds INTEGER range"))
}

fn from_db_int(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("negative {column} in database: {value}"))
}

/// Convert a Postgres `COUNT(*)` into a seat count.
pub(crate) fn from_db_count(value: i64) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("count out of range: {value}"))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub student_code: Option<String>,
    pub major: Option<String>,
    pub department: Option<String>,
    pub password_digest: String,
}

impl UserRow {
    pub(crate) fn into_user(self) -> Result<User, String> {
        self.split().map(|(user, _)| user)
    }

    /// Decode the row into the user and their stored password digest.
    pub(crate) fn split(self) -> Result<(User, PasswordDigest), String> {
        let role = Role::from_str(&self.role).map_err(|err| err.to_string())?;
        let profile = match role {
            Role::Student => RoleProfile::student(
                self.student_code.unwrap_or_default(),
                self.major,
            )
            .map_err(|err| err.to_string())?,
            Role::Teacher => RoleProfile::Teacher {
                department: self.department,
            },
            Role::Admin => RoleProfile::Admin,
        };
        let user = User::new(
            UserId::from_uuid(self.id),
            PersonName::new(self.name).map_err(|err| err.to_string())?,
            EmailAddress::new(&self.email).map_err(|err| err.to_string())?,
            profile,
        );
        let digest = PasswordDigest::parse(self.password_digest)
            .ok_or_else(|| format!("malformed password digest for user {}", user.id()))?;
        Ok((user, digest))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'static str,
    pub student_code: Option<&'a str>,
    pub major: Option<&'a str>,
    pub department: Option<&'a str>,
    pub password_digest: &'a str,
}

type ProfileColumns<'a> = (Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// `(student_code, major, department)` for a profile.
fn profile_columns(profile: &RoleProfile) -> ProfileColumns<'_> {
    match profile {
        RoleProfile::Student {
            student_code,
            major,
        } => (Some(student_code.as_str()), major.as_deref(), None),
        RoleProfile::Teacher { department } => (None, None, department.as_deref()),
        RoleProfile::Admin => (None, None, None),
    }
}

impl<'a> NewUserRow<'a> {
    pub(crate) fn new(user: &'a User, digest: &'a PasswordDigest) -> Self {
        let (student_code, major, department) = profile_columns(user.profile());
        Self {
            id: *user.id().as_uuid(),
            name: user.name().as_ref(),
            email: user.email().as_ref(),
            role: user.role().as_str(),
            student_code,
            major,
            department,
            password_digest: digest.as_str(),
        }
    }
}

/// Every editable user column except the password digest. Profile columns
/// that do not apply to the new role are cleared.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserChangeset<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'static str,
    pub student_code: Option<&'a str>,
    pub major: Option<&'a str>,
    pub department: Option<&'a str>,
}

impl<'a> UserChangeset<'a> {
    pub(crate) fn new(user: &'a User) -> Self {
        let (student_code, major, department) = profile_columns(user.profile());
        Self {
            name: user.name().as_ref(),
            email: user.email().as_ref(),
            role: user.role().as_str(),
            student_code,
            major,
            department,
        }
    }
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub enrollment_limit: i32,
    pub teacher_id: Uuid,
}

impl TryFrom<CourseRow> for Course {
    type Error = String;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            code: row.code,
            name: row.name,
            credits: from_db_int(row.credits, "credits")?,
            enrollment_limit: from_db_int(row.enrollment_limit, "enrollment_limit")?,
            teacher_id: UserId::from_uuid(row.teacher_id),
        })
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = courses)]
pub(crate) struct CourseWrite<'a> {
    pub id: Uuid,
    pub code: &'a str,
    pub name: &'a str,
    pub credits: i32,
    pub enrollment_limit: i32,
    pub teacher_id: Uuid,
}

impl<'a> CourseWrite<'a> {
    pub(crate) fn new(course: &'a Course) -> Result<Self, String> {
        Ok(Self {
            id: course.id,
            code: &course.code,
            name: &course.name,
            credits: to_db_int(course.credits)?,
            enrollment_limit: to_db_int(course.enrollment_limit)?,
            teacher_id: *course.teacher_id.as_uuid(),
        })
    }
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            id: row.id,
            student_id: UserId::from_uuid(row.student_id),
            course_id: row.course_id,
            created_at: row.created_at,
        }
    }
}

impl From<&Enrollment> for EnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: enrollment.id,
            student_id: *enrollment.student_id.as_uuid(),
            course_id: enrollment.course_id,
            created_at: enrollment.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Grade events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = grade_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GradeEventRow {
    pub id: i64,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub value: String,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by: Uuid,
}

impl TryFrom<GradeEventRow> for GradeEvent {
    type Error = String;

    fn try_from(row: GradeEventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            student_id: UserId::from_uuid(row.student_id),
            course_id: row.course_id,
            value: LetterGrade::from_str(&row.value).map_err(|err| err.to_string())?,
            assigned_at: row.assigned_at,
            assigned_by: UserId::from_uuid(row.assigned_by),
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = grade_events)]
pub(crate) struct NewGradeEventRow {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub value: &'static str,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assigned_by: Uuid,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SessionRow {
    pub user_id: Uuid,
    pub role: String,
}

impl TryFrom<SessionRow> for Actor {
    type Error = String;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role).map_err(|err| err.to_string())?;
        Ok(Self::new(UserId::from_uuid(row.user_id), role))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub(crate) struct NewSessionRow<'a> {
    pub token: &'a str,
    pub user_id: Uuid,
    pub role: &'static str,
}

#[cfg(test)]
mod tests {
    //! Row decoding coverage.
    use super::*;
    use rstest::rstest;

    fn student_row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.edu".into(),
            role: "STUDENT".into(),
            student_code: Some("S-1".into()),
            major: Some("Mathematics".into()),
            department: None,
            password_digest: PasswordDigest::generate("analytical")
                .expect("hashing succeeds")
                .as_str()
                .to_owned(),
        }
    }

    #[rstest]
    fn student_rows_round_trip_through_insert_shape() {
        let (user, digest) = student_row().split().expect("valid row");
        assert_eq!(user.role(), Role::Student);
        let insert = NewUserRow::new(&user, &digest);
        assert_eq!(insert.role, "STUDENT");
        assert_eq!(insert.student_code, Some("S-1"));
        assert_eq!(insert.department, None);
    }

    #[rstest]
    fn changesets_clear_columns_the_new_role_does_not_use() {
        let (student, _) = student_row().split().expect("valid row");
        let teacher = User::new(
            student.id(),
            student.name().clone(),
            student.email().clone(),
            RoleProfile::Teacher {
                department: Some("Physics".into()),
            },
        );
        let changes = UserChangeset::new(&teacher);
        assert_eq!(changes.role, "TEACHER");
        assert_eq!(changes.student_code, None);
        assert_eq!(changes.major, None);
        assert_eq!(changes.department, Some("Physics"));

        let sql = diesel::debug_query::<diesel::pg::Pg, _>(
            &diesel::update(users::table.find(*teacher.id().as_uuid())).set(&changes),
        )
        .to_string();
        assert!(sql.contains(r#""student_code" = $"#), "{sql}");
        assert!(!sql.contains("password_digest"), "{sql}");
    }

    #[rstest]
    #[case::unknown_role(UserRow { role: "DEAN".into(), ..student_row() })]
    #[case::missing_code(UserRow { student_code: None, ..student_row() })]
    #[case::bad_digest(UserRow { password_digest: "plain".into(), ..student_row() })]
    fn corrupt_user_rows_are_rejected(#[case] row: UserRow) {
        assert!(row.split().is_err());
    }

    #[rstest]
    fn negative_limits_are_rejected() {
        let row = CourseRow {
            id: Uuid::new_v4(),
            code: "CS1".into(),
            name: "Intro".into(),
            credits: 3,
            enrollment_limit: -1,
            teacher_id: Uuid::new_v4(),
        };
        let error = Course::try_from(row).expect_err("negative limit");
        assert!(error.contains("enrollment_limit"));
    }

    #[rstest]
    fn unknown_letters_are_rejected() {
        let row = GradeEventRow {
            id: 1,
            student_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            value: "E".into(),
            assigned_at: None,
            assigned_by: Uuid::new_v4(),
        };
        assert!(GradeEvent::try_from(row).is_err());
    }

    #[rstest]
    fn oversized_values_do_not_fit_integer_columns() {
        assert!(to_db_int(u32::MAX).is_err());
        assert_eq!(to_db_int(40), Ok(40));
    }
}
